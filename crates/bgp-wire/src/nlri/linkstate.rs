use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u16, be_u64};
use nom::{IResult, Parser};

use crate::ParseNlri;

/// BGP-LS NLRI types (RFC 7752 §3.2, RFC 9514 for SRv6 SID).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LsNlriType {
    Node = 1,
    Link = 2,
    Ipv4Prefix = 3,
    Ipv6Prefix = 4,
    Srv6Sid = 6,
    Unknown(u16),
}

impl From<u16> for LsNlriType {
    fn from(v: u16) -> Self {
        use LsNlriType::*;
        match v {
            1 => Node,
            2 => Link,
            3 => Ipv4Prefix,
            4 => Ipv6Prefix,
            6 => Srv6Sid,
            v => Unknown(v),
        }
    }
}

impl From<LsNlriType> for u16 {
    fn from(t: LsNlriType) -> Self {
        use LsNlriType::*;
        match t {
            Node => 1,
            Link => 2,
            Ipv4Prefix => 3,
            Ipv6Prefix => 4,
            Srv6Sid => 6,
            Unknown(v) => v,
        }
    }
}

/// IGP protocol feeding the link-state database (RFC 7752 §3.2.1.4).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LsProtocolId {
    IsisL1 = 1,
    IsisL2 = 2,
    OspfV2 = 3,
    Direct = 4,
    Static = 5,
    OspfV3 = 6,
    Unknown(u8),
}

impl From<u8> for LsProtocolId {
    fn from(v: u8) -> Self {
        use LsProtocolId::*;
        match v {
            1 => IsisL1,
            2 => IsisL2,
            3 => OspfV2,
            4 => Direct,
            5 => Static,
            6 => OspfV3,
            v => Unknown(v),
        }
    }
}

impl From<LsProtocolId> for u8 {
    fn from(p: LsProtocolId) -> Self {
        use LsProtocolId::*;
        match p {
            IsisL1 => 1,
            IsisL2 => 2,
            OspfV2 => 3,
            Direct => 4,
            Static => 5,
            OspfV3 => 6,
            Unknown(v) => v,
        }
    }
}

/// Descriptor TLV types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LsDescriptorType {
    LocalNode,
    RemoteNode,
    LinkLocalRemoteId,
    Ipv4InterfaceAddress,
    Ipv4NeighborAddress,
    Ipv6InterfaceAddress,
    Ipv6NeighborAddress,
    MultiTopologyId,
    OspfRouteType,
    IpReachability,
    Srv6SidInformation,
    Unknown(u16),
}

impl From<u16> for LsDescriptorType {
    fn from(v: u16) -> Self {
        use LsDescriptorType::*;
        match v {
            256 => LocalNode,
            257 => RemoteNode,
            258 => LinkLocalRemoteId,
            259 => Ipv4InterfaceAddress,
            260 => Ipv4NeighborAddress,
            261 => Ipv6InterfaceAddress,
            262 => Ipv6NeighborAddress,
            263 => MultiTopologyId,
            264 => OspfRouteType,
            265 => IpReachability,
            518 => Srv6SidInformation,
            v => Unknown(v),
        }
    }
}

impl From<LsDescriptorType> for u16 {
    fn from(t: LsDescriptorType) -> Self {
        use LsDescriptorType::*;
        match t {
            LocalNode => 256,
            RemoteNode => 257,
            LinkLocalRemoteId => 258,
            Ipv4InterfaceAddress => 259,
            Ipv4NeighborAddress => 260,
            Ipv6InterfaceAddress => 261,
            Ipv6NeighborAddress => 262,
            MultiTopologyId => 263,
            OspfRouteType => 264,
            IpReachability => 265,
            Srv6SidInformation => 518,
            Unknown(v) => v,
        }
    }
}

/// One descriptor TLV. Node descriptors carry nested sub-TLVs (AS,
/// BGP-LS identifier, area, IGP router-id); they are kept as opaque
/// value bytes and compared as such.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LsDescriptor {
    pub typ: LsDescriptorType,
    pub value: Vec<u8>,
}

impl LsDescriptor {
    fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
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

    fn emit(&self, buf: &mut BytesMut) {
        buf.put_u16(self.typ.into());
        buf.put_u16(self.value.len() as u16);
        buf.put(&self.value[..]);
    }
}

/// One BGP-LS NLRI. Equality is structural; the hash is derived from
/// the identifying fields with descriptors order-insensitive, so two
/// advertisements of the same object collide regardless of TLV order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsNlri {
    pub typ: LsNlriType,
    pub protocol_id: LsProtocolId,
    pub identifier: u64,
    pub descriptors: Vec<LsDescriptor>,
}

impl Hash for LsNlri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.typ.hash(state);
        self.protocol_id.hash(state);
        self.identifier.hash(state);
        let mut sorted: Vec<&LsDescriptor> = self.descriptors.iter().collect();
        sorted.sort();
        for descriptor in sorted {
            descriptor.hash(state);
        }
    }
}

impl ParseNlri<LsNlri> for LsNlri {
    fn parse_nlri(input: &[u8], _add_path: bool) -> IResult<&[u8], LsNlri> {
        let (input, typ) = be_u16(input)?;
        let (input, length) = be_u16(input)?;
        if input.len() < length as usize {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let (mut body, input) = input.split_at(length as usize);
        let (rest, protocol_id) = be_u8(body)?;
        body = rest;
        let (rest, identifier) = be_u64(body)?;
        body = rest;
        let mut descriptors = Vec::new();
        while !body.is_empty() {
            let (rest, descriptor) = LsDescriptor::parse_be(body)?;
            descriptors.push(descriptor);
            body = rest;
        }
        Ok((
            input,
            LsNlri {
                typ: typ.into(),
                protocol_id: protocol_id.into(),
                identifier,
                descriptors,
            },
        ))
    }
}

impl LsNlri {
    pub fn emit(&self, buf: &mut BytesMut) {
        let mut body = BytesMut::new();
        body.put_u8(self.protocol_id.into());
        body.put_u64(self.identifier);
        for descriptor in self.descriptors.iter() {
            descriptor.emit(&mut body);
        }
        buf.put_u16(self.typ.into());
        buf.put_u16(body.len() as u16);
        buf.put(&body[..]);
    }
}

impl fmt::Display for LsNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let typ = match self.typ {
            LsNlriType::Node => "node",
            LsNlriType::Link => "link",
            LsNlriType::Ipv4Prefix => "ipv4-prefix",
            LsNlriType::Ipv6Prefix => "ipv6-prefix",
            LsNlriType::Srv6Sid => "srv6-sid",
            LsNlriType::Unknown(_) => "unknown",
        };
        write!(
            f,
            "bgp-ls {} proto {:?} id {:#x} [{} descriptors]",
            typ,
            self.protocol_id,
            self.identifier,
            self.descriptors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(nlri: &LsNlri) -> u64 {
        let mut hasher = DefaultHasher::new();
        nlri.hash(&mut hasher);
        hasher.finish()
    }

    fn descriptor(typ: u16, value: &[u8]) -> LsDescriptor {
        LsDescriptor {
            typ: typ.into(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn node_nlri_roundtrip() {
        let nlri = LsNlri {
            typ: LsNlriType::Node,
            protocol_id: LsProtocolId::IsisL2,
            identifier: 0,
            descriptors: vec![descriptor(256, &[0x02, 0x00, 0x00, 0x04, 0x00, 0x00, 0xfc, 0x00])],
        };
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        let (rest, parsed) = LsNlri::parse_nlri(&buf, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, nlri);
    }

    #[test]
    fn hash_ignores_descriptor_order() {
        let a = LsNlri {
            typ: LsNlriType::Link,
            protocol_id: LsProtocolId::OspfV2,
            identifier: 1,
            descriptors: vec![descriptor(256, &[1]), descriptor(257, &[2])],
        };
        let mut b = a.clone();
        b.descriptors.reverse();
        assert_eq!(hash_of(&a), hash_of(&b));
    }
}
