use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::number::complete::be_u8;
use nom_derive::*;

use crate::{Afi, BGP_HEADER_LEN, Family, Header, MessageType, Safi, patch_length};

/// ROUTE-REFRESH subtypes: 0 is a plain request (RFC 2918), BoRR and
/// EoRR bracket an enhanced refresh (RFC 7313).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSubtype {
    Request = 0,
    Begin = 1,
    End = 2,
    Unknown(u8),
}

impl From<u8> for RefreshSubtype {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Request,
            1 => Self::Begin,
            2 => Self::End,
            v => Self::Unknown(v),
        }
    }
}

impl From<RefreshSubtype> for u8 {
    fn from(v: RefreshSubtype) -> Self {
        match v {
            RefreshSubtype::Request => 0,
            RefreshSubtype::Begin => 1,
            RefreshSubtype::End => 2,
            RefreshSubtype::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRefresh {
    pub family: Family,
    pub subtype: RefreshSubtype,
}

impl RouteRefresh {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            subtype: RefreshSubtype::Request,
        }
    }

    pub fn begin(family: Family) -> Self {
        Self {
            family,
            subtype: RefreshSubtype::Begin,
        }
    }

    pub fn end(family: Family) -> Self {
        Self {
            family,
            subtype: RefreshSubtype::End,
        }
    }

    pub fn parse_packet(input: &[u8]) -> IResult<&[u8], RouteRefresh> {
        let (input, _header) = Header::parse_be(input)?;
        let (input, afi) = Afi::parse_be(input)?;
        let (input, subtype) = be_u8(input)?;
        let (input, safi) = Safi::parse_be(input)?;
        Ok((
            input,
            RouteRefresh {
                family: Family::new(afi, safi),
                subtype: subtype.into(),
            },
        ))
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        Header::new(MessageType::RouteRefresh, BGP_HEADER_LEN).emit(&mut buf);
        buf.put_u16(self.family.afi.into());
        buf.put_u8(self.subtype.into());
        buf.put_u8(self.family.safi.into());
        patch_length(&mut buf);
        buf
    }
}

impl fmt::Display for RouteRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.subtype {
            RefreshSubtype::Request => "request",
            RefreshSubtype::Begin => "begin-of-rib",
            RefreshSubtype::End => "end-of-rib",
            RefreshSubtype::Unknown(_) => "unknown",
        };
        write!(f, "RouteRefresh: {} {}", self.family, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_roundtrip() {
        let refresh = RouteRefresh::begin(Family::IPV4_UNICAST);
        let buf = refresh.encode();
        assert_eq!(buf.len(), 23);
        let (_, parsed) = RouteRefresh::parse_packet(&buf).unwrap();
        assert_eq!(parsed, refresh);
    }
}
