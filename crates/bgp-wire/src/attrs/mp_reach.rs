use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, BytesMut};
use nom::error::{ErrorKind, make_error};
use nom::number::complete::be_u8;
use nom::IResult;

use crate::{
    AttrCode, AttrEmit, AttrFlags, Family, Negotiated, Nlri, ParseBe, RouteDistinguisher,
};

/// Next hop carried inside MP_REACH_NLRI. VPN families wrap the
/// address in an (always-zero) route distinguisher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MpNextHop {
    Ipv4(Ipv4Addr),
    Ipv6 {
        global: Ipv6Addr,
        link_local: Option<Ipv6Addr>,
    },
    VpnIpv4(Ipv4Addr),
    VpnIpv6(Ipv6Addr),
    Empty,
}

impl MpNextHop {
    pub fn addr(&self) -> Option<IpAddr> {
        match self {
            Self::Ipv4(v) | Self::VpnIpv4(v) => Some(IpAddr::V4(*v)),
            Self::Ipv6 { global, .. } => Some(IpAddr::V6(*global)),
            Self::VpnIpv6(v) => Some(IpAddr::V6(*v)),
            Self::Empty => None,
        }
    }

    fn wire_len(&self) -> u8 {
        match self {
            Self::Ipv4(_) => 4,
            Self::Ipv6 { link_local, .. } => {
                if link_local.is_some() {
                    32
                } else {
                    16
                }
            }
            Self::VpnIpv4(_) => 12,
            Self::VpnIpv6(_) => 24,
            Self::Empty => 0,
        }
    }

    fn emit(&self, buf: &mut BytesMut) {
        match self {
            Self::Ipv4(addr) => buf.put(&addr.octets()[..]),
            Self::Ipv6 { global, link_local } => {
                buf.put(&global.octets()[..]);
                if let Some(link_local) = link_local {
                    buf.put(&link_local.octets()[..]);
                }
            }
            Self::VpnIpv4(addr) => {
                buf.put(&[0u8; 8][..]);
                buf.put(&addr.octets()[..]);
            }
            Self::VpnIpv6(addr) => {
                buf.put(&[0u8; 8][..]);
                buf.put(&addr.octets()[..]);
            }
            Self::Empty => {}
        }
    }

    fn parse(input: &[u8], len: u8) -> IResult<&[u8], MpNextHop> {
        match len {
            0 => Ok((input, MpNextHop::Empty)),
            4 => {
                let (input, addr) = Ipv4Addr::parse_be(input)?;
                Ok((input, MpNextHop::Ipv4(addr)))
            }
            16 => {
                let (input, addr) = Ipv6Addr::parse_be(input)?;
                Ok((
                    input,
                    MpNextHop::Ipv6 {
                        global: addr,
                        link_local: None,
                    },
                ))
            }
            32 => {
                let (input, global) = Ipv6Addr::parse_be(input)?;
                let (input, link_local) = Ipv6Addr::parse_be(input)?;
                Ok((
                    input,
                    MpNextHop::Ipv6 {
                        global,
                        link_local: Some(link_local),
                    },
                ))
            }
            12 => {
                let (input, _rd) = RouteDistinguisher::parse_be(input)?;
                let (input, addr) = Ipv4Addr::parse_be(input)?;
                Ok((input, MpNextHop::VpnIpv4(addr)))
            }
            24 => {
                let (input, _rd) = RouteDistinguisher::parse_be(input)?;
                let (input, addr) = Ipv6Addr::parse_be(input)?;
                Ok((input, MpNextHop::VpnIpv6(addr)))
            }
            _ => Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue))),
        }
    }
}

impl From<IpAddr> for MpNextHop {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => MpNextHop::Ipv4(v4),
            IpAddr::V6(v6) => MpNextHop::Ipv6 {
                global: v6,
                link_local: None,
            },
        }
    }
}

impl fmt::Display for MpNextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr() {
            Some(addr) => write!(f, "{}", addr),
            None => write!(f, "-"),
        }
    }
}

/// MP_REACH_NLRI (RFC 4760): family, next hop, reserved octet, NLRIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MpReach {
    pub family: Family,
    pub nexthop: MpNextHop,
    pub nlris: Vec<Nlri>,
}

impl MpReach {
    pub fn new(family: Family, nexthop: MpNextHop) -> Self {
        Self {
            family,
            nexthop,
            nlris: Vec::new(),
        }
    }

    pub fn parse_attr<'a>(input: &'a [u8], negotiated: &Negotiated) -> IResult<&'a [u8], MpReach> {
        let (input, family) = Family::parse_be(input)?;
        let (input, nhop_len) = be_u8(input)?;
        let (input, nexthop) = MpNextHop::parse(input, nhop_len)?;
        let (mut input, _reserved) = be_u8(input)?;
        let add_path = negotiated.addpath_receive(&family);
        let mut nlris = Vec::new();
        while !input.is_empty() {
            let (rest, nlri) = Nlri::parse_family(input, family, add_path)?;
            nlris.push(nlri);
            input = rest;
        }
        Ok((
            input,
            MpReach {
                family,
                nexthop,
                nlris,
            },
        ))
    }
}

impl AttrEmit for MpReach {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::MpReachNlri
    }

    fn attr_len(&self) -> Option<usize> {
        None
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u16(self.family.afi.into());
        buf.put_u8(self.family.safi.into());
        buf.put_u8(self.nexthop.wire_len());
        self.nexthop.emit(buf);
        buf.put_u8(0);
        for nlri in self.nlris.iter() {
            nlri.emit(buf);
        }
    }
}

impl fmt::Display for MpReach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " MP Reach {} nexthop {}", self.family, self.nexthop)?;
        for nlri in self.nlris.iter() {
            writeln!(f, "  {}", nlri)?;
        }
        Ok(())
    }
}
