use std::fmt;

use nom::IResult;
use nom::number::complete::{be_u8, be_u16};
use serde::Serialize;
use strum_macros::Display;

/// Address Family Identifier.
#[repr(u16)]
#[derive(Debug, Default, PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Serialize, Display)]
pub enum Afi {
    #[default]
    #[strum(serialize = "ipv4")]
    Ipv4 = 1,
    #[strum(serialize = "ipv6")]
    Ipv6 = 2,
    #[strum(serialize = "l2vpn")]
    L2vpn = 25,
    #[strum(serialize = "bgp-ls")]
    Bgpls = 16388,
    #[strum(to_string = "afi({0})")]
    Unknown(u16),
}

/// Subsequent Address Family Identifier.
#[repr(u8)]
#[derive(Debug, Default, PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Serialize, Display)]
pub enum Safi {
    #[default]
    #[strum(serialize = "unicast")]
    Unicast = 1,
    #[strum(serialize = "multicast")]
    Multicast = 2,
    #[strum(serialize = "nlri-mpls")]
    LabeledUnicast = 4,
    #[strum(serialize = "vpls")]
    Vpls = 65,
    #[strum(serialize = "evpn")]
    Evpn = 70,
    #[strum(serialize = "bgp-ls")]
    Bgpls = 71,
    #[strum(serialize = "bgp-ls-vpn")]
    BgplsVpn = 72,
    #[strum(serialize = "mpls-vpn")]
    MplsVpn = 128,
    #[strum(serialize = "multicast-vpn")]
    MulticastVpn = 129,
    #[strum(serialize = "flow")]
    Flowspec = 133,
    #[strum(serialize = "flow-vpn")]
    FlowspecVpn = 134,
    #[strum(to_string = "safi({0})")]
    Unknown(u8),
}

impl From<Afi> for u16 {
    fn from(afi: Afi) -> Self {
        use Afi::*;
        match afi {
            Ipv4 => 1,
            Ipv6 => 2,
            L2vpn => 25,
            Bgpls => 16388,
            Unknown(v) => v,
        }
    }
}

impl From<u16> for Afi {
    fn from(val: u16) -> Self {
        use Afi::*;
        match val {
            1 => Ipv4,
            2 => Ipv6,
            25 => L2vpn,
            16388 => Bgpls,
            v => Unknown(v),
        }
    }
}

impl From<Safi> for u8 {
    fn from(safi: Safi) -> Self {
        use Safi::*;
        match safi {
            Unicast => 1,
            Multicast => 2,
            LabeledUnicast => 4,
            Vpls => 65,
            Evpn => 70,
            Bgpls => 71,
            BgplsVpn => 72,
            MplsVpn => 128,
            MulticastVpn => 129,
            Flowspec => 133,
            FlowspecVpn => 134,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for Safi {
    fn from(val: u8) -> Self {
        use Safi::*;
        match val {
            1 => Unicast,
            2 => Multicast,
            4 => LabeledUnicast,
            65 => Vpls,
            70 => Evpn,
            71 => Bgpls,
            72 => BgplsVpn,
            128 => MplsVpn,
            129 => MulticastVpn,
            133 => Flowspec,
            134 => FlowspecVpn,
            v => Unknown(v),
        }
    }
}

impl Afi {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, afi) = be_u16(input)?;
        Ok((input, afi.into()))
    }
}

impl Safi {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, safi) = be_u8(input)?;
        Ok((input, safi.into()))
    }
}

/// The (AFI, SAFI) pair selecting an NLRI encoding.
#[derive(Debug, Default, PartialEq, Eq, Ord, PartialOrd, Clone, Copy, Hash, Serialize)]
pub struct Family {
    pub afi: Afi,
    pub safi: Safi,
}

impl Family {
    pub const IPV4_UNICAST: Family = Family {
        afi: Afi::Ipv4,
        safi: Safi::Unicast,
    };

    pub fn new(afi: Afi, safi: Safi) -> Self {
        Self { afi, safi }
    }

    pub fn is_ipv4_unicast(&self) -> bool {
        *self == Self::IPV4_UNICAST
    }

    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, afi) = Afi::parse_be(input)?;
        let (input, safi) = Safi::parse_be(input)?;
        Ok((input, Self { afi, safi }))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.afi, self.safi)
    }
}

pub fn nlri_psize(plen: u8) -> usize {
    plen.div_ceil(8).into()
}
