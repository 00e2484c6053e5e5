use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::multi::count;
use nom::number::complete::{be_u16, be_u32};
use nom::{IResult, Parser};
use nom_derive::*;

use crate::{AS_TRANS, AttrCode, AttrEmit, AttrFlags, ParseBe, many0_complete};

pub const AS_SET: u8 = 1;
pub const AS_SEQUENCE: u8 = 2;
pub const AS_CONFED_SEQUENCE: u8 = 3;
pub const AS_CONFED_SET: u8 = 4;

#[derive(Debug, NomBE)]
struct AsSegmentHeader {
    typ: u8,
    length: u8,
}

/// One AS_PATH segment. ASNs are held as 4-octet values regardless of
/// what the session negotiated; width is an encoding concern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AsSegment {
    pub typ: u8,
    pub asns: Vec<u32>,
}

impl AsSegment {
    pub fn new(typ: u8) -> Self {
        Self {
            typ,
            asns: Vec::new(),
        }
    }

    /// Path length contribution (RFC 4271 §9.1.2.2, RFC 5065): a
    /// sequence counts per ASN, a set counts one, confed segments zero.
    fn path_length(&self) -> u32 {
        match self.typ {
            AS_SEQUENCE => self.asns.len() as u32,
            AS_SET => 1,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AsPath {
    pub segs: Vec<AsSegment>,
}

impl AsPath {
    pub fn from_sequence<I: IntoIterator<Item = u32>>(asns: I) -> Self {
        let seg = AsSegment {
            typ: AS_SEQUENCE,
            asns: asns.into_iter().collect(),
        };
        if seg.asns.is_empty() {
            Self::default()
        } else {
            Self { segs: vec![seg] }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    pub fn path_length(&self) -> u32 {
        self.segs.iter().map(|seg| seg.path_length()).sum()
    }

    /// Count of ASes for the RFC 6793 merge: sets count one, confed
    /// segments are ignored.
    fn as_count(&self) -> u32 {
        self.path_length()
    }

    /// First AS of the first sequence segment, used for eBGP loop and
    /// neighbor checks.
    pub fn neighboring_as(&self) -> Option<u32> {
        self.segs
            .iter()
            .find(|seg| seg.typ == AS_SEQUENCE)
            .and_then(|seg| seg.asns.first().copied())
    }

    pub fn contains(&self, asn: u32) -> bool {
        self.segs.iter().any(|seg| seg.asns.contains(&asn))
    }

    pub fn prepend(&mut self, asn: u32) {
        match self.segs.first_mut() {
            Some(seg) if seg.typ == AS_SEQUENCE => seg.asns.insert(0, asn),
            _ => self.segs.insert(0, AsSegment {
                typ: AS_SEQUENCE,
                asns: vec![asn],
            }),
        }
    }

    /// True when any ASN needs 4 octets.
    pub fn has_wide_asn(&self) -> bool {
        self.segs
            .iter()
            .any(|seg| seg.asns.iter().any(|asn| *asn > u16::MAX as u32))
    }

    /// The AS4_PATH companion for a 2-octet session, present only when
    /// the real path does not fit.
    pub fn as4_shadow(&self) -> Option<As4Path> {
        self.has_wide_asn().then(|| As4Path(self.clone()))
    }

    /// Merge a received AS4_PATH into an AS_PATH per RFC 6793 §4.2.3:
    /// when AS_PATH is shorter than AS4_PATH the AS4_PATH is ignored;
    /// otherwise the trailing AS4_PATH-sized run of AS_PATH is replaced
    /// by the AS4_PATH contents, keeping the leading AS_TRANS padding.
    pub fn merge_as4(&self, as4: &AsPath) -> AsPath {
        let ours = self.as_count();
        let theirs = as4.as_count();
        if ours < theirs {
            return self.clone();
        }
        let mut keep = ours - theirs;
        let mut segs: Vec<AsSegment> = Vec::new();
        for seg in self.segs.iter() {
            if seg.typ != AS_SEQUENCE {
                if keep > 0 {
                    segs.push(seg.clone());
                    keep = keep.saturating_sub(seg.path_length());
                }
                continue;
            }
            if keep == 0 {
                break;
            }
            let take = (keep as usize).min(seg.asns.len());
            segs.push(AsSegment {
                typ: AS_SEQUENCE,
                asns: seg.asns[..take].to_vec(),
            });
            keep -= take as u32;
            if keep == 0 {
                break;
            }
        }
        segs.extend(as4.segs.iter().cloned());
        AsPath { segs }
    }

    fn parse_segments<F>(input: &[u8], parse_asn: F) -> IResult<&[u8], AsPath>
    where
        F: Fn(&[u8]) -> IResult<&[u8], u32> + Copy,
    {
        let (input, segs) = many0_complete(move |input| {
            let (input, header) = AsSegmentHeader::parse_be(input)?;
            let (input, asns) = count(parse_asn, header.length as usize).parse(input)?;
            Ok((
                input,
                AsSegment {
                    typ: header.typ,
                    asns,
                },
            ))
        })
        .parse(input)?;
        Ok((input, AsPath { segs }))
    }

    /// Parse with 2-octet ASNs (session without ASN4).
    pub fn parse_as2(input: &[u8]) -> IResult<&[u8], AsPath> {
        Self::parse_segments(input, |i| {
            let (i, asn) = be_u16(i)?;
            Ok((i, asn as u32))
        })
    }

    /// Parse with 4-octet ASNs.
    pub fn parse_as4(input: &[u8]) -> IResult<&[u8], AsPath> {
        Self::parse_segments(input, |i| be_u32(i))
    }

    fn emit_as4(&self, buf: &mut BytesMut) {
        for seg in self.segs.iter() {
            buf.put_u8(seg.typ);
            buf.put_u8(seg.asns.len() as u8);
            seg.asns.iter().for_each(|asn| buf.put_u32(*asn));
        }
    }

    fn emit_as2(&self, buf: &mut BytesMut) {
        for seg in self.segs.iter() {
            buf.put_u8(seg.typ);
            buf.put_u8(seg.asns.len() as u8);
            for asn in seg.asns.iter() {
                if *asn > u16::MAX as u32 {
                    buf.put_u16(AS_TRANS);
                } else {
                    buf.put_u16(*asn as u16);
                }
            }
        }
    }

    /// Emit as an AS_PATH attribute at the negotiated width.
    pub fn attr_emit_width(&self, buf: &mut BytesMut, as4: bool) {
        let mut value = BytesMut::new();
        if as4 {
            self.emit_as4(&mut value);
        } else {
            self.emit_as2(&mut value);
        }
        emit_with_header(
            buf,
            AttrFlags::well_known(),
            AttrCode::AsPath,
            &value,
        );
    }
}

fn emit_with_header(buf: &mut BytesMut, flags: AttrFlags, code: AttrCode, value: &BytesMut) {
    if value.len() > 255 {
        buf.put_u8(flags.with_extended(true).into());
        buf.put_u8(code.into());
        buf.put_u16(value.len() as u16);
    } else {
        buf.put_u8(flags.into());
        buf.put_u8(code.into());
        buf.put_u8(value.len() as u8);
    }
    buf.put(&value[..]);
}

impl ParseBe<AsPath> for AsPath {
    fn parse_be(input: &[u8]) -> IResult<&[u8], AsPath> {
        Self::parse_as4(input)
    }
}

pub fn asn_str(val: u32) -> String {
    if val > u16::MAX as u32 {
        format!("{}.{}", val >> 16, val & 0xffff)
    } else {
        val.to_string()
    }
}

impl fmt::Display for AsSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .asns
            .iter()
            .map(|x| asn_str(*x))
            .collect::<Vec<String>>()
            .join(" ");
        match self.typ {
            AS_SET => write!(f, "{{{v}}}"),
            AS_CONFED_SEQUENCE => write!(f, "({v})"),
            AS_CONFED_SET => write!(f, "[{v}]"),
            _ => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for AsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .segs
            .iter()
            .map(|seg| seg.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}

/// AS4_PATH (RFC 6793): the untruncated path carried across 2-octet
/// sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct As4Path(pub AsPath);

impl ParseBe<As4Path> for As4Path {
    fn parse_be(input: &[u8]) -> IResult<&[u8], As4Path> {
        let (input, path) = AsPath::parse_as4(input)?;
        Ok((input, As4Path(path)))
    }
}

impl AttrEmit for As4Path {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::As4Path
    }

    fn attr_len(&self) -> Option<usize> {
        None
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        self.0.emit_as4(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_trailing_run() {
        // AS_PATH 65002 23456 23456, AS4_PATH 655360 70000.
        let path = AsPath::from_sequence([65002, AS_TRANS as u32, AS_TRANS as u32]);
        let as4 = AsPath::from_sequence([655360, 70000]);
        let merged = path.merge_as4(&as4);
        assert_eq!(merged, AsPath::from_sequence([65002, 655360, 70000]));
    }

    #[test]
    fn merge_shorter_as_path_wins() {
        let path = AsPath::from_sequence([65002]);
        let as4 = AsPath::from_sequence([655360, 70000]);
        assert_eq!(path.merge_as4(&as4), path);
    }

    #[test]
    fn merge_keeps_leading_set() {
        let mut path = AsPath::from_sequence([AS_TRANS as u32]);
        path.segs.insert(0, AsSegment {
            typ: AS_SET,
            asns: vec![64496, 64497],
        });
        let as4 = AsPath::from_sequence([655360]);
        let merged = path.merge_as4(&as4);
        assert_eq!(merged.segs.len(), 2);
        assert_eq!(merged.segs[0].typ, AS_SET);
        assert_eq!(merged.segs[1].asns, vec![655360]);
    }

    #[test]
    fn wide_asn_truncates_to_as_trans() {
        let path = AsPath::from_sequence([4200000000, 65001]);
        assert!(path.has_wide_asn());
        let mut buf = BytesMut::new();
        path.attr_emit_width(&mut buf, false);
        // flags, code, len, type, count, 23456, 65001
        assert_eq!(
            &buf[..],
            &[0x40, 0x02, 0x06, 0x02, 0x02, 0x5b, 0xa0, 0xfd, 0xe9][..]
        );
        assert!(path.as4_shadow().is_some());
    }
}
