use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::{IResult, Parser};

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe, many0_complete};

/// BGP-LS attribute TLV types we name (RFC 7752, RFC 9085, RFC 9514).
/// The registry is large; anything else stays numeric and round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LsAttrType {
    MultiTopology,
    NodeFlagBits,
    NodeOpaque,
    NodeName,
    IsisArea,
    LocalRouterId,
    LocalRouterIdV6,
    SrCapabilities,
    SrAlgorithm,
    SrLocalBlock,
    Srv6Capabilities,
    RemoteRouterId,
    RemoteRouterIdV6,
    AdminGroup,
    MaxLinkBandwidth,
    MaxReservableBandwidth,
    UnreservedBandwidth,
    TeDefaultMetric,
    LinkProtection,
    MplsProtocolMask,
    IgpMetric,
    SharedRiskLinkGroup,
    LinkOpaque,
    LinkName,
    AdjacencySid,
    LanAdjacencySid,
    Srv6EndXSid,
    Srv6LanEndXSid,
    IgpFlags,
    IgpRouteTag,
    IgpExtendedRouteTag,
    PrefixMetric,
    OspfForwardingAddress,
    PrefixOpaque,
    PrefixSid,
    PrefixRange,
    Srv6Locator,
    PrefixAttributeFlags,
    SourceRouterId,
    Srv6EndpointBehavior,
    Srv6SidStructure,
    Unknown(u16),
}

impl From<u16> for LsAttrType {
    fn from(v: u16) -> Self {
        use LsAttrType::*;
        match v {
            263 => MultiTopology,
            1024 => NodeFlagBits,
            1025 => NodeOpaque,
            1026 => NodeName,
            1027 => IsisArea,
            1028 => LocalRouterId,
            1029 => LocalRouterIdV6,
            1030 => RemoteRouterId,
            1031 => RemoteRouterIdV6,
            1034 => SrCapabilities,
            1035 => SrAlgorithm,
            1036 => SrLocalBlock,
            1038 => Srv6Capabilities,
            1088 => AdminGroup,
            1089 => MaxLinkBandwidth,
            1090 => MaxReservableBandwidth,
            1091 => UnreservedBandwidth,
            1092 => TeDefaultMetric,
            1093 => LinkProtection,
            1094 => MplsProtocolMask,
            1095 => IgpMetric,
            1096 => SharedRiskLinkGroup,
            1097 => LinkOpaque,
            1098 => LinkName,
            1099 => AdjacencySid,
            1100 => LanAdjacencySid,
            1106 => Srv6EndXSid,
            1107 => Srv6LanEndXSid,
            1152 => IgpFlags,
            1153 => IgpRouteTag,
            1154 => IgpExtendedRouteTag,
            1155 => PrefixMetric,
            1156 => OspfForwardingAddress,
            1157 => PrefixOpaque,
            1158 => PrefixSid,
            1159 => PrefixRange,
            1162 => Srv6Locator,
            1170 => PrefixAttributeFlags,
            1171 => SourceRouterId,
            1250 => Srv6EndpointBehavior,
            1252 => Srv6SidStructure,
            v => Unknown(v),
        }
    }
}

impl From<LsAttrType> for u16 {
    fn from(t: LsAttrType) -> Self {
        use LsAttrType::*;
        match t {
            MultiTopology => 263,
            NodeFlagBits => 1024,
            NodeOpaque => 1025,
            NodeName => 1026,
            IsisArea => 1027,
            LocalRouterId => 1028,
            LocalRouterIdV6 => 1029,
            RemoteRouterId => 1030,
            RemoteRouterIdV6 => 1031,
            SrCapabilities => 1034,
            SrAlgorithm => 1035,
            SrLocalBlock => 1036,
            Srv6Capabilities => 1038,
            AdminGroup => 1088,
            MaxLinkBandwidth => 1089,
            MaxReservableBandwidth => 1090,
            UnreservedBandwidth => 1091,
            TeDefaultMetric => 1092,
            LinkProtection => 1093,
            MplsProtocolMask => 1094,
            IgpMetric => 1095,
            SharedRiskLinkGroup => 1096,
            LinkOpaque => 1097,
            LinkName => 1098,
            AdjacencySid => 1099,
            LanAdjacencySid => 1100,
            Srv6EndXSid => 1106,
            Srv6LanEndXSid => 1107,
            IgpFlags => 1152,
            IgpRouteTag => 1153,
            IgpExtendedRouteTag => 1154,
            PrefixMetric => 1155,
            OspfForwardingAddress => 1156,
            PrefixOpaque => 1157,
            PrefixSid => 1158,
            PrefixRange => 1159,
            Srv6Locator => 1162,
            PrefixAttributeFlags => 1170,
            SourceRouterId => 1171,
            Srv6EndpointBehavior => 1250,
            Srv6SidStructure => 1252,
            Unknown(v) => v,
        }
    }
}

impl fmt::Display for LsAttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LsAttrType::*;
        let name = match self {
            MultiTopology => "multi-topology",
            NodeFlagBits => "node-flags",
            NodeOpaque => "node-opaque",
            NodeName => "node-name",
            IsisArea => "isis-area",
            LocalRouterId => "local-router-id",
            LocalRouterIdV6 => "local-router-id-v6",
            RemoteRouterId => "remote-router-id",
            RemoteRouterIdV6 => "remote-router-id-v6",
            SrCapabilities => "sr-capabilities",
            SrAlgorithm => "sr-algorithm",
            SrLocalBlock => "sr-local-block",
            Srv6Capabilities => "srv6-capabilities",
            AdminGroup => "admin-group",
            MaxLinkBandwidth => "max-link-bandwidth",
            MaxReservableBandwidth => "max-reservable-bandwidth",
            UnreservedBandwidth => "unreserved-bandwidth",
            TeDefaultMetric => "te-metric",
            LinkProtection => "link-protection",
            MplsProtocolMask => "mpls-mask",
            IgpMetric => "igp-metric",
            SharedRiskLinkGroup => "srlg",
            LinkOpaque => "link-opaque",
            LinkName => "link-name",
            AdjacencySid => "adjacency-sid",
            LanAdjacencySid => "lan-adjacency-sid",
            Srv6EndXSid => "srv6-endx-sid",
            Srv6LanEndXSid => "srv6-lan-endx-sid",
            IgpFlags => "igp-flags",
            IgpRouteTag => "igp-route-tag",
            IgpExtendedRouteTag => "igp-extended-route-tag",
            PrefixMetric => "prefix-metric",
            OspfForwardingAddress => "ospf-forwarding-address",
            PrefixOpaque => "prefix-opaque",
            PrefixSid => "prefix-sid",
            PrefixRange => "prefix-range",
            Srv6Locator => "srv6-locator",
            PrefixAttributeFlags => "prefix-attribute-flags",
            SourceRouterId => "source-router-id",
            Srv6EndpointBehavior => "srv6-endpoint-behavior",
            Srv6SidStructure => "srv6-sid-structure",
            Unknown(v) => return write!(f, "tlv-{}", v),
        };
        write!(f, "{name}")
    }
}

/// One (type, length, value) record inside the LINK_STATE container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LsTlv {
    pub typ: LsAttrType,
    pub value: Vec<u8>,
}

impl LsTlv {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, typ) = be_u16(input)?;
        let (input, length) = be_u16(input)?;
        let (input, value) = take(length as usize).parse(input)?;
        Ok((
            input,
            Self {
                typ: typ.into(),
                value: value.to_vec(),
            },
        ))
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        buf.put_u16(self.typ.into());
        buf.put_u16(self.value.len() as u16);
        buf.put(&self.value[..]);
    }
}

/// LINK_STATE path attribute (code 29): a flat sequence of TLVs whose
/// meaning depends on the NLRI they accompany.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LinkState(pub Vec<LsTlv>);

impl ParseBe<LinkState> for LinkState {
    fn parse_be(input: &[u8]) -> IResult<&[u8], LinkState> {
        let (input, tlvs) = many0_complete(LsTlv::parse_be).parse(input)?;
        Ok((input, LinkState(tlvs)))
    }
}

impl AttrEmit for LinkState {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::LinkState
    }

    fn attr_len(&self) -> Option<usize> {
        None
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for tlv in self.0.iter() {
            tlv.emit(buf);
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|tlv| tlv.typ.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}
