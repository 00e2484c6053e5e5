use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::number::complete::{be_u16, be_u32};

use crate::ParseBe;

/// 8-octet Route Distinguisher (RFC 4364). The two leading octets
/// select how the remaining six split between administrator and
/// assigned number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteDistinguisher {
    /// Type 0: 2-octet ASN + 4-octet number.
    As2 { asn: u16, number: u32 },
    /// Type 1: IPv4 address + 2-octet number.
    Ipv4 { addr: Ipv4Addr, number: u16 },
    /// Type 2: 4-octet ASN + 2-octet number.
    As4 { asn: u32, number: u16 },
}

impl Default for RouteDistinguisher {
    fn default() -> Self {
        Self::As2 { asn: 0, number: 0 }
    }
}

impl RouteDistinguisher {
    pub fn emit(&self, buf: &mut BytesMut) {
        match self {
            Self::As2 { asn, number } => {
                buf.put_u16(0);
                buf.put_u16(*asn);
                buf.put_u32(*number);
            }
            Self::Ipv4 { addr, number } => {
                buf.put_u16(1);
                buf.put(&addr.octets()[..]);
                buf.put_u16(*number);
            }
            Self::As4 { asn, number } => {
                buf.put_u16(2);
                buf.put_u32(*asn);
                buf.put_u16(*number);
            }
        }
    }
}

impl ParseBe<RouteDistinguisher> for RouteDistinguisher {
    fn parse_be(input: &[u8]) -> IResult<&[u8], RouteDistinguisher> {
        let (input, typ) = be_u16(input)?;
        match typ {
            0 => {
                let (input, asn) = be_u16(input)?;
                let (input, number) = be_u32(input)?;
                Ok((input, RouteDistinguisher::As2 { asn, number }))
            }
            1 => {
                let (input, addr) = Ipv4Addr::parse_be(input)?;
                let (input, number) = be_u16(input)?;
                Ok((input, RouteDistinguisher::Ipv4 { addr, number }))
            }
            _ => {
                let (input, asn) = be_u32(input)?;
                let (input, number) = be_u16(input)?;
                Ok((input, RouteDistinguisher::As4 { asn, number }))
            }
        }
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::As2 { asn, number } => write!(f, "{}:{}", asn, number),
            Self::Ipv4 { addr, number } => write!(f, "{}:{}", addr, number),
            Self::As4 { asn, number } => write!(f, "{}:{}", asn, number),
        }
    }
}

impl FromStr for RouteDistinguisher {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (admin, number) = s.rsplit_once(':').ok_or(())?;
        if let Ok(addr) = admin.parse::<Ipv4Addr>() {
            let number = number.parse::<u16>().map_err(|_| ())?;
            return Ok(Self::Ipv4 { addr, number });
        }
        let asn = admin.parse::<u32>().map_err(|_| ())?;
        if asn > u16::MAX as u32 {
            let number = number.parse::<u16>().map_err(|_| ())?;
            Ok(Self::As4 { asn, number })
        } else {
            let number = number.parse::<u32>().map_err(|_| ())?;
            Ok(Self::As2 {
                asn: asn as u16,
                number,
            })
        }
    }
}
