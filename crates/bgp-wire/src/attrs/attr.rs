use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::{IResult, Parser};
use nom_derive::*;

use crate::{
    Aggregator, Aggregator2, Aigp, As4Aggregator, As4Path, AsPath, AtomicAggregate, AttrCode,
    AttrEmit, AttrFlags, ClusterList, Community, ExtCommunity, GenericAttr, LargeCommunity,
    LinkState, LocalPref, Med, MpReach, MpUnreach, Negotiated, NextHop, NotifyError, Origin,
    OriginatorId, ParseBe, update_error,
};

/// The collated attribute set of one UPDATE (MP_REACH/MP_UNREACH are
/// carried separately since they describe NLRI, not the route). This
/// is the unit the RIB fingerprints: two routes with an equal `Attrs`
/// may share one UPDATE.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Attrs {
    pub origin: Option<Origin>,
    pub aspath: Option<AsPath>,
    pub nexthop: Option<NextHop>,
    pub med: Option<Med>,
    pub local_pref: Option<LocalPref>,
    pub atomic_aggregate: Option<AtomicAggregate>,
    pub aggregator: Option<Aggregator>,
    pub community: Option<Community>,
    pub originator_id: Option<OriginatorId>,
    pub cluster_list: Option<ClusterList>,
    pub ext_community: Option<ExtCommunity>,
    pub aigp: Option<Aigp>,
    pub link_state: Option<LinkState>,
    pub large_community: Option<LargeCommunity>,
    /// Unmodeled attributes, preserved bit-for-bit.
    pub generic: Vec<GenericAttr>,
}

impl Attrs {
    /// Emit every attribute in ascending type-code order, choosing the
    /// AS width the session negotiated and shadowing with AS4_PATH /
    /// AS4_AGGREGATOR when truncation happened.
    pub fn emit(&self, buf: &mut BytesMut, as4: bool) {
        let mut parts: Vec<(u8, BytesMut)> = Vec::new();
        let mut part = |code: AttrCode, blob: BytesMut| {
            parts.push((code.into(), blob));
        };

        if let Some(v) = &self.origin {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::Origin, blob);
        }
        if let Some(v) = &self.aspath {
            let mut blob = BytesMut::new();
            v.attr_emit_width(&mut blob, as4);
            part(AttrCode::AsPath, blob);
            if !as4 && let Some(shadow) = v.as4_shadow() {
                let mut blob = BytesMut::new();
                shadow.attr_emit(&mut blob);
                part(AttrCode::As4Path, blob);
            }
        }
        if let Some(v) = &self.nexthop {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::NextHop, blob);
        }
        if let Some(v) = &self.med {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::Med, blob);
        }
        if let Some(v) = &self.local_pref {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::LocalPref, blob);
        }
        if let Some(v) = &self.atomic_aggregate {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::AtomicAggregate, blob);
        }
        if let Some(v) = &self.aggregator {
            let mut blob = BytesMut::new();
            if as4 {
                v.attr_emit(&mut blob);
            } else {
                let narrow: Aggregator2 = (*v).into();
                narrow.attr_emit(&mut blob);
            }
            part(AttrCode::Aggregator, blob);
            if !as4 && v.asn > u16::MAX as u32 {
                let mut blob = BytesMut::new();
                As4Aggregator {
                    asn: v.asn,
                    addr: v.addr,
                }
                .attr_emit(&mut blob);
                part(AttrCode::As4Aggregator, blob);
            }
        }
        if let Some(v) = &self.community {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::Community, blob);
        }
        if let Some(v) = &self.originator_id {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::OriginatorId, blob);
        }
        if let Some(v) = &self.cluster_list {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::ClusterList, blob);
        }
        if let Some(v) = &self.ext_community {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::ExtCommunity, blob);
        }
        if let Some(v) = &self.aigp {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::Aigp, blob);
        }
        if let Some(v) = &self.link_state {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::LinkState, blob);
        }
        if let Some(v) = &self.large_community {
            let mut blob = BytesMut::new();
            v.attr_emit(&mut blob);
            part(AttrCode::LargeCommunity, blob);
        }
        for v in self.generic.iter() {
            let mut blob = BytesMut::new();
            v.emit(&mut blob);
            parts.push((v.code, blob));
        }

        parts.sort_by_key(|(code, _)| *code);
        for (_, blob) in parts {
            buf.put(&blob[..]);
        }
    }
}

impl fmt::Display for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = &self.origin {
            writeln!(f, " Origin: {}", v)?;
        }
        if let Some(v) = &self.aspath {
            writeln!(f, " AS Path: {}", v)?;
        }
        if let Some(v) = &self.nexthop {
            writeln!(f, " NextHop: {}", v)?;
        }
        if let Some(v) = &self.med {
            writeln!(f, " MED: {}", v)?;
        }
        if let Some(v) = &self.local_pref {
            writeln!(f, " LocalPref: {}", v)?;
        }
        if self.atomic_aggregate.is_some() {
            writeln!(f, " AtomicAggregate")?;
        }
        if let Some(v) = &self.aggregator {
            writeln!(f, " Aggregator: {}", v)?;
        }
        if let Some(v) = &self.community {
            writeln!(f, " Community: {}", v)?;
        }
        if let Some(v) = &self.originator_id {
            writeln!(f, " OriginatorId: {}", v)?;
        }
        if let Some(v) = &self.cluster_list {
            writeln!(f, " ClusterList: {}", v)?;
        }
        if let Some(v) = &self.ext_community {
            writeln!(f, " ExtCommunity: {}", v)?;
        }
        if let Some(v) = &self.aigp {
            writeln!(f, " AIGP: {}", v)?;
        }
        if let Some(v) = &self.link_state {
            writeln!(f, " LinkState: {}", v)?;
        }
        if let Some(v) = &self.large_community {
            writeln!(f, " LargeCommunity: {}", v)?;
        }
        for v in self.generic.iter() {
            writeln!(f, " {}", v)?;
        }
        Ok(())
    }
}

/// Expected flag bits (optional+transitive only; partial and
/// extended-length are situational) per well-known code.
fn expected_flags(code: AttrCode) -> Option<AttrFlags> {
    use AttrCode::*;
    let flags = match code {
        Origin | AsPath | NextHop | LocalPref | AtomicAggregate => AttrFlags::well_known(),
        Med | OriginatorId | ClusterList | MpReachNlri | MpUnreachNlri | Aigp | LinkState => {
            AttrFlags::optional_non_transitive()
        }
        Aggregator | Community | ExtCommunity | As4Path | As4Aggregator | LargeCommunity => {
            AttrFlags::optional_transitive()
        }
        Unknown(_) => return None,
    };
    Some(flags)
}

struct RawAttr<'a> {
    flags: AttrFlags,
    code: AttrCode,
    value: &'a [u8],
    /// flags + code + length octets, for NOTIFICATION data.
    header: Vec<u8>,
}

fn parse_one_attr(input: &[u8]) -> Result<(&[u8], RawAttr<'_>), NotifyError> {
    let start = input;
    let (input, flags_octet) =
        be_u8::<&[u8], nom::error::Error<&[u8]>>(input).map_err(NotifyError::from)?;
    let flags = AttrFlags::from(flags_octet);
    let (input, code_octet) =
        be_u8::<&[u8], nom::error::Error<&[u8]>>(input).map_err(NotifyError::from)?;
    let code: AttrCode = code_octet.into();

    let (input, length) = if flags.extended() {
        let (input, raw) =
            take::<usize, &[u8], nom::error::Error<&[u8]>>(2usize)
                .parse(input)
                .map_err(NotifyError::from)?;
        (input, u16::from_be_bytes([raw[0], raw[1]]) as usize)
    } else {
        let (input, len) =
            be_u8::<&[u8], nom::error::Error<&[u8]>>(input).map_err(NotifyError::from)?;
        (input, len as usize)
    };

    let header_len = start.len() - input.len();
    if input.len() < length {
        return Err(NotifyError::attribute_length(
            start[..header_len.min(start.len())].to_vec(),
        ));
    }
    let (value, input) = input.split_at(length);

    // Flag discipline (RFC 4271 §5): the fixed bits of a recognized
    // attribute must match its definition.
    if let Some(expected) = expected_flags(code) {
        let got = AttrFlags::from(flags_octet & 0xc0);
        if got != expected {
            let mut data = start[..header_len].to_vec();
            data.extend_from_slice(value);
            return Err(NotifyError::attribute_flags(data));
        }
    }

    Ok((
        input,
        RawAttr {
            flags,
            code,
            value,
            header: start[..header_len].to_vec(),
        },
    ))
}

/// Parsed attribute block of one UPDATE.
#[derive(Debug, Default)]
pub struct ParsedAttrs {
    pub attrs: Option<Attrs>,
    pub mp_reach: Option<MpReach>,
    pub mp_unreach: Option<MpUnreach>,
}

fn subcode_for(code: AttrCode) -> u8 {
    match code {
        AttrCode::AsPath | AttrCode::As4Path => update_error::MALFORMED_AS_PATH,
        AttrCode::MpReachNlri | AttrCode::MpUnreachNlri => update_error::INVALID_NETWORK_FIELD,
        AttrCode::Origin => update_error::INVALID_ORIGIN,
        AttrCode::NextHop => update_error::INVALID_NEXTHOP,
        _ => update_error::OPTIONAL_ATTRIBUTE_ERROR,
    }
}

fn value_error(raw: &RawAttr<'_>) -> NotifyError {
    let mut data = raw.header.clone();
    data.extend_from_slice(raw.value);
    NotifyError::update_data(subcode_for(raw.code), data)
}

fn parse_full<'a, T, F>(raw: &RawAttr<'a>, parser: F) -> Result<T, NotifyError>
where
    F: Fn(&'a [u8]) -> IResult<&'a [u8], T>,
{
    match parser(raw.value) {
        Ok((rest, value)) if rest.is_empty() => Ok(value),
        _ => Err(value_error(raw)),
    }
}

/// Parse the attribute block of an UPDATE. The AS4_PATH and
/// AS4_AGGREGATOR shadows are merged here so callers only ever see
/// 4-octet values.
pub fn parse_update_attrs<'a>(
    input: &'a [u8],
    length: usize,
    negotiated: &Negotiated,
) -> Result<(&'a [u8], ParsedAttrs), NotifyError> {
    if input.len() < length {
        return Err(NotifyError::malformed_attributes());
    }
    let (mut remaining, input) = input.split_at(length);
    let mut out = ParsedAttrs::default();
    let mut attrs = Attrs::default();
    let mut seen = false;
    let mut as4_path: Option<As4Path> = None;
    let mut as4_aggregator: Option<As4Aggregator> = None;

    while !remaining.is_empty() {
        let (rest, raw) = parse_one_attr(remaining)?;
        seen = true;
        match raw.code {
            AttrCode::Origin => {
                attrs.origin = Some(parse_full(&raw, Origin::parse_be)?);
            }
            AttrCode::AsPath => {
                let parser = if negotiated.as4 {
                    AsPath::parse_as4
                } else {
                    AsPath::parse_as2
                };
                attrs.aspath = Some(parse_full(&raw, parser)?);
            }
            AttrCode::As4Path => {
                as4_path = Some(parse_full(&raw, As4Path::parse_be)?);
            }
            AttrCode::NextHop => {
                attrs.nexthop = Some(parse_full(&raw, NextHop::parse_be)?);
            }
            AttrCode::Med => {
                attrs.med = Some(parse_full(&raw, Med::parse_be)?);
            }
            AttrCode::LocalPref => {
                attrs.local_pref = Some(parse_full(&raw, LocalPref::parse_be)?);
            }
            AttrCode::AtomicAggregate => {
                attrs.atomic_aggregate = Some(parse_full(&raw, AtomicAggregate::parse_be)?);
            }
            AttrCode::Aggregator => {
                if negotiated.as4 {
                    attrs.aggregator = Some(parse_full(&raw, Aggregator::parse_be)?);
                } else {
                    let narrow = parse_full(&raw, Aggregator2::parse_be)?;
                    attrs.aggregator = Some(narrow.into());
                }
            }
            AttrCode::As4Aggregator => {
                as4_aggregator = Some(parse_full(&raw, As4Aggregator::parse_be)?);
            }
            AttrCode::Community => {
                attrs.community = Some(parse_full(&raw, Community::parse_be)?);
            }
            AttrCode::OriginatorId => {
                attrs.originator_id = Some(parse_full(&raw, OriginatorId::parse_be)?);
            }
            AttrCode::ClusterList => {
                attrs.cluster_list = Some(parse_full(&raw, ClusterList::parse_be)?);
            }
            AttrCode::ExtCommunity => {
                attrs.ext_community = Some(parse_full(&raw, ExtCommunity::parse_be)?);
            }
            AttrCode::Aigp => {
                attrs.aigp = Some(parse_full(&raw, Aigp::parse_be)?);
            }
            AttrCode::LinkState => {
                attrs.link_state = Some(parse_full(&raw, LinkState::parse_be)?);
            }
            AttrCode::LargeCommunity => {
                attrs.large_community = Some(parse_full(&raw, LargeCommunity::parse_be)?);
            }
            AttrCode::MpReachNlri => {
                out.mp_reach =
                    Some(parse_full(&raw, |i| MpReach::parse_attr(i, negotiated))?);
            }
            AttrCode::MpUnreachNlri => {
                out.mp_unreach =
                    Some(parse_full(&raw, |i| MpUnreach::parse_attr(i, negotiated))?);
            }
            AttrCode::Unknown(code) => {
                attrs.generic.push(GenericAttr {
                    flags: raw.flags,
                    code,
                    value: raw.value.to_vec(),
                });
            }
        }
        remaining = rest;
    }

    // RFC 6793: fold the AS4 shadows into the 2-octet values.
    if let Some(as4) = as4_path
        && let Some(aspath) = attrs.aspath.take()
    {
        attrs.aspath = Some(aspath.merge_as4(&as4.0));
    }
    if let Some(wide) = as4_aggregator {
        attrs.aggregator = Some(Aggregator {
            asn: wide.asn,
            addr: wide.addr,
        });
    }

    if seen {
        out.attrs = Some(attrs);
    }
    Ok((input, out))
}
