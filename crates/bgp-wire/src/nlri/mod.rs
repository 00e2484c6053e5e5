pub mod prefix;
pub use prefix::*;

pub mod labeled;
pub use labeled::*;

pub mod vpn;
pub use vpn::*;

pub mod flowspec;
pub use flowspec::*;

pub mod vpls;
pub use vpls::*;

pub mod evpn;
pub use evpn::*;

pub mod linkstate;
pub use linkstate::*;

use std::fmt;

use bytes::BytesMut;
use nom::IResult;
use nom::error::{ErrorKind, make_error};

use crate::{Afi, Family, ParseNlri, Safi};

/// One NLRI, decoded per its (AFI, SAFI).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Nlri {
    Prefix(PrefixNlri),
    Labeled(LabeledNlri),
    Vpn(VpnNlri),
    Flowspec(FlowspecNlri),
    Vpls(VplsNlri),
    Evpn(EvpnRoute),
    LinkState(LsNlri),
}

impl Nlri {
    pub fn parse_family(input: &[u8], family: Family, add_path: bool) -> IResult<&[u8], Nlri> {
        match (family.afi, family.safi) {
            (Afi::Ipv4 | Afi::Ipv6, Safi::Unicast | Safi::Multicast) => {
                let (input, nlri) = PrefixNlri::parse_afi(input, family.afi, add_path)?;
                Ok((input, Nlri::Prefix(nlri)))
            }
            (Afi::Ipv4 | Afi::Ipv6, Safi::LabeledUnicast) => {
                let (input, nlri) = LabeledNlri::parse_afi(input, family.afi, add_path)?;
                Ok((input, Nlri::Labeled(nlri)))
            }
            (Afi::Ipv4 | Afi::Ipv6, Safi::MplsVpn | Safi::MulticastVpn) => {
                let (input, nlri) = VpnNlri::parse_afi(input, family.afi, add_path)?;
                Ok((input, Nlri::Vpn(nlri)))
            }
            (Afi::Ipv4 | Afi::Ipv6, Safi::Flowspec | Safi::FlowspecVpn) => {
                let (input, nlri) =
                    FlowspecNlri::parse_afi(input, family.afi, family.safi == Safi::FlowspecVpn)?;
                Ok((input, Nlri::Flowspec(nlri)))
            }
            (Afi::L2vpn, Safi::Vpls) => {
                let (input, nlri) = VplsNlri::parse_nlri(input, add_path)?;
                Ok((input, Nlri::Vpls(nlri)))
            }
            (Afi::L2vpn, Safi::Evpn) => {
                let (input, nlri) = EvpnRoute::parse_nlri(input, add_path)?;
                Ok((input, Nlri::Evpn(nlri)))
            }
            (Afi::Bgpls, Safi::Bgpls | Safi::BgplsVpn) => {
                let (input, nlri) = LsNlri::parse_nlri(input, add_path)?;
                Ok((input, Nlri::LinkState(nlri)))
            }
            _ => Err(nom::Err::Error(make_error(input, ErrorKind::NoneOf))),
        }
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        match self {
            Nlri::Prefix(v) => v.emit(buf),
            Nlri::Labeled(v) => v.emit(buf),
            Nlri::Vpn(v) => v.emit(buf),
            Nlri::Flowspec(v) => v.emit(buf),
            Nlri::Vpls(v) => v.emit(buf),
            Nlri::Evpn(v) => v.emit(buf),
            Nlri::LinkState(v) => v.emit(buf),
        }
    }

    /// Identity key for de-duplication: the family plus the exact wire
    /// form (including any path-id).
    pub fn key(&self, family: Family) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.emit(&mut buf);
        let mut key = Vec::with_capacity(buf.len() + 3);
        key.extend_from_slice(&u16::from(family.afi).to_be_bytes());
        key.push(family.safi.into());
        key.extend_from_slice(&buf);
        key
    }
}

impl fmt::Display for Nlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nlri::Prefix(v) => write!(f, "{}", v),
            Nlri::Labeled(v) => write!(f, "{}", v),
            Nlri::Vpn(v) => write!(f, "{}", v),
            Nlri::Flowspec(v) => write!(f, "{}", v),
            Nlri::Vpls(v) => write!(f, "{}", v),
            Nlri::Evpn(v) => write!(f, "{}", v),
            Nlri::LinkState(v) => write!(f, "{}", v),
        }
    }
}
