use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use nom::IResult;

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe, many0_complete};
use nom::Parser;

/// One 8-octet extended community, decoded along the (type, subtype)
/// taxonomy the daemon acts on. Anything else is preserved raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtCommunityValue {
    /// 0x00/0x02 and 0x02/0x02: route target.
    RouteTarget { asn: u32, number: u32, wide: bool },
    /// 0x01/0x02: route target with IPv4 administrator.
    RouteTargetIpv4 { addr: Ipv4Addr, number: u16 },
    /// 0x00/0x03 and 0x02/0x03: route origin (site of origin).
    RouteOrigin { asn: u32, number: u32, wide: bool },
    /// 0x80/0x06: flow-spec traffic-rate, IEEE float bytes preserved.
    TrafficRate { asn: u16, rate_bits: u32 },
    /// 0x80/0x07: flow-spec traffic-action (sample / terminal bits).
    TrafficAction { sample: bool, terminal: bool },
    /// 0x80/0x08: flow-spec redirect to VRF.
    TrafficRedirect { asn: u16, number: u32 },
    /// 0x80/0x09: flow-spec traffic-marking (DSCP).
    TrafficMark { dscp: u8 },
    /// 0x08/0x00: flow-spec redirect to IPv4 next-hop (copy bit in
    /// the low bit of the last octet).
    RedirectNexthop { copy: bool },
    /// 0x80/0x0a: layer2 info (VPLS control flags and MTU).
    L2Info { encaps: u8, control: u8, mtu: u16 },
    Raw([u8; 8]),
}

impl ExtCommunityValue {
    pub fn route_target(asn: u32, number: u32) -> Self {
        Self::RouteTarget {
            asn,
            number,
            wide: asn > u16::MAX as u32,
        }
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut b = [0u8; 8];
        match self {
            Self::RouteTarget { asn, number, wide } => {
                if wide {
                    b[0] = 0x02;
                    b[1] = 0x02;
                    b[2..6].copy_from_slice(&asn.to_be_bytes());
                    b[6..8].copy_from_slice(&(number as u16).to_be_bytes());
                } else {
                    b[0] = 0x00;
                    b[1] = 0x02;
                    b[2..4].copy_from_slice(&(asn as u16).to_be_bytes());
                    b[4..8].copy_from_slice(&number.to_be_bytes());
                }
            }
            Self::RouteTargetIpv4 { addr, number } => {
                b[0] = 0x01;
                b[1] = 0x02;
                b[2..6].copy_from_slice(&addr.octets());
                b[6..8].copy_from_slice(&number.to_be_bytes());
            }
            Self::RouteOrigin { asn, number, wide } => {
                if wide {
                    b[0] = 0x02;
                    b[1] = 0x03;
                    b[2..6].copy_from_slice(&asn.to_be_bytes());
                    b[6..8].copy_from_slice(&(number as u16).to_be_bytes());
                } else {
                    b[0] = 0x00;
                    b[1] = 0x03;
                    b[2..4].copy_from_slice(&(asn as u16).to_be_bytes());
                    b[4..8].copy_from_slice(&number.to_be_bytes());
                }
            }
            Self::TrafficRate { asn, rate_bits } => {
                b[0] = 0x80;
                b[1] = 0x06;
                b[2..4].copy_from_slice(&asn.to_be_bytes());
                b[4..8].copy_from_slice(&rate_bits.to_be_bytes());
            }
            Self::TrafficAction { sample, terminal } => {
                b[0] = 0x80;
                b[1] = 0x07;
                b[7] = ((sample as u8) << 1) | terminal as u8;
            }
            Self::TrafficRedirect { asn, number } => {
                b[0] = 0x80;
                b[1] = 0x08;
                b[2..4].copy_from_slice(&asn.to_be_bytes());
                b[4..8].copy_from_slice(&number.to_be_bytes());
            }
            Self::TrafficMark { dscp } => {
                b[0] = 0x80;
                b[1] = 0x09;
                b[7] = dscp & 0x3f;
            }
            Self::RedirectNexthop { copy } => {
                b[0] = 0x08;
                b[1] = 0x00;
                b[7] = copy as u8;
            }
            Self::L2Info {
                encaps,
                control,
                mtu,
            } => {
                b[0] = 0x80;
                b[1] = 0x0a;
                b[2] = encaps;
                b[3] = control;
                b[4..6].copy_from_slice(&mtu.to_be_bytes());
            }
            Self::Raw(raw) => b = raw,
        }
        b
    }

    pub fn from_bytes(b: [u8; 8]) -> Self {
        match (b[0], b[1]) {
            (0x00, 0x02) => Self::RouteTarget {
                asn: u16::from_be_bytes([b[2], b[3]]) as u32,
                number: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
                wide: false,
            },
            (0x02, 0x02) => Self::RouteTarget {
                asn: u32::from_be_bytes([b[2], b[3], b[4], b[5]]),
                number: u16::from_be_bytes([b[6], b[7]]) as u32,
                wide: true,
            },
            (0x01, 0x02) => Self::RouteTargetIpv4 {
                addr: Ipv4Addr::new(b[2], b[3], b[4], b[5]),
                number: u16::from_be_bytes([b[6], b[7]]),
            },
            (0x00, 0x03) => Self::RouteOrigin {
                asn: u16::from_be_bytes([b[2], b[3]]) as u32,
                number: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
                wide: false,
            },
            (0x02, 0x03) => Self::RouteOrigin {
                asn: u32::from_be_bytes([b[2], b[3], b[4], b[5]]),
                number: u16::from_be_bytes([b[6], b[7]]) as u32,
                wide: true,
            },
            (0x80, 0x06) => Self::TrafficRate {
                asn: u16::from_be_bytes([b[2], b[3]]),
                rate_bits: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
            },
            (0x80, 0x07) => Self::TrafficAction {
                sample: b[7] & 0x02 != 0,
                terminal: b[7] & 0x01 != 0,
            },
            (0x80, 0x08) => Self::TrafficRedirect {
                asn: u16::from_be_bytes([b[2], b[3]]),
                number: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
            },
            (0x80, 0x09) => Self::TrafficMark { dscp: b[7] & 0x3f },
            (0x08, 0x00) => Self::RedirectNexthop {
                copy: b[7] & 0x01 != 0,
            },
            (0x80, 0x0a) => Self::L2Info {
                encaps: b[2],
                control: b[3],
                mtu: u16::from_be_bytes([b[4], b[5]]),
            },
            _ => Self::Raw(b),
        }
    }

    pub fn rate_bps(&self) -> Option<f32> {
        match self {
            Self::TrafficRate { rate_bits, .. } => Some(f32::from_bits(*rate_bits)),
            _ => None,
        }
    }
}

impl fmt::Display for ExtCommunityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteTarget { asn, number, .. } => write!(f, "target:{}:{}", asn, number),
            Self::RouteTargetIpv4 { addr, number } => write!(f, "target:{}:{}", addr, number),
            Self::RouteOrigin { asn, number, .. } => write!(f, "origin:{}:{}", asn, number),
            Self::TrafficRate { asn, rate_bits } => {
                write!(f, "rate-limit:{}:{}", asn, f32::from_bits(*rate_bits))
            }
            Self::TrafficAction { sample, terminal } => {
                write!(f, "action sample:{} terminal:{}", sample, terminal)
            }
            Self::TrafficRedirect { asn, number } => write!(f, "redirect:{}:{}", asn, number),
            Self::TrafficMark { dscp } => write!(f, "mark {}", dscp),
            Self::RedirectNexthop { copy } => write!(f, "redirect-to-nexthop copy:{}", copy),
            Self::L2Info {
                encaps,
                control,
                mtu,
            } => write!(f, "l2info:{}:{}:{}", encaps, control, mtu),
            Self::Raw(b) => {
                let v = b
                    .iter()
                    .map(|x| format!("{:02x}", x))
                    .collect::<Vec<String>>()
                    .join("");
                write!(f, "0x{}", v)
            }
        }
    }
}

impl FromStr for ExtCommunityValue {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s.split_once(':').ok_or(())?;
        let parse_pair = |rest: &str| -> Result<(u32, u32), ()> {
            let (asn, number) = rest.split_once(':').ok_or(())?;
            Ok((
                asn.parse().map_err(|_| ())?,
                number.parse().map_err(|_| ())?,
            ))
        };
        match kind {
            "target" => {
                if let Some((addr, number)) = rest.split_once(':')
                    && let Ok(addr) = addr.parse::<Ipv4Addr>()
                {
                    return Ok(Self::RouteTargetIpv4 {
                        addr,
                        number: number.parse().map_err(|_| ())?,
                    });
                }
                let (asn, number) = parse_pair(rest)?;
                Ok(Self::route_target(asn, number))
            }
            "origin" => {
                let (asn, number) = parse_pair(rest)?;
                Ok(Self::RouteOrigin {
                    asn,
                    number,
                    wide: asn > u16::MAX as u32,
                })
            }
            "redirect" => {
                let (asn, number) = parse_pair(rest)?;
                Ok(Self::TrafficRedirect {
                    asn: asn as u16,
                    number,
                })
            }
            "rate-limit" => {
                let (asn, rate) = rest.split_once(':').ok_or(())?;
                let rate: f32 = rate.parse().map_err(|_| ())?;
                Ok(Self::TrafficRate {
                    asn: asn.parse().map_err(|_| ())?,
                    rate_bits: rate.to_bits(),
                })
            }
            "mark" => Ok(Self::TrafficMark {
                dscp: rest.parse().map_err(|_| ())?,
            }),
            _ => Err(()),
        }
    }
}

/// EXTENDED_COMMUNITY attribute: an unordered list of 8-octet values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExtCommunity(pub Vec<ExtCommunityValue>);

impl ExtCommunity {
    pub fn push(&mut self, value: ExtCommunityValue) {
        self.0.push(value);
    }

    pub fn route_targets(&self) -> impl Iterator<Item = &ExtCommunityValue> {
        self.0.iter().filter(|value| {
            matches!(
                value,
                ExtCommunityValue::RouteTarget { .. } | ExtCommunityValue::RouteTargetIpv4 { .. }
            )
        })
    }
}

fn parse_ext_community_value(input: &[u8]) -> IResult<&[u8], ExtCommunityValue> {
    if input.len() < 8 {
        return Err(nom::Err::Incomplete(nom::Needed::new(8 - input.len())));
    }
    let (value, input) = input.split_at(8);
    let bytes: [u8; 8] = value.try_into().unwrap();
    Ok((input, ExtCommunityValue::from_bytes(bytes)))
}

impl ParseBe<ExtCommunity> for ExtCommunity {
    fn parse_be(input: &[u8]) -> IResult<&[u8], ExtCommunity> {
        let (input, values) = many0_complete(parse_ext_community_value).parse(input)?;
        Ok((input, ExtCommunity(values)))
    }
}

impl AttrEmit for ExtCommunity {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::ExtCommunity
    }

    fn attr_len(&self) -> Option<usize> {
        Some(self.0.len() * 8)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for value in self.0.iter() {
            buf.put(&value.to_bytes()[..]);
        }
    }
}

impl fmt::Display for ExtCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_vrf_bytes() {
        // 65000:12345 redirect, as in a flow-spec "then" action.
        let com = ExtCommunityValue::TrafficRedirect {
            asn: 0xfde8,
            number: 0x3039,
        };
        assert_eq!(
            com.to_bytes(),
            [0x80, 0x08, 0xfd, 0xe8, 0x00, 0x00, 0x30, 0x39]
        );
        assert_eq!(ExtCommunityValue::from_bytes(com.to_bytes()), com);
    }

    #[test]
    fn route_target_widths() {
        let narrow = ExtCommunityValue::route_target(64512, 99);
        assert_eq!(narrow.to_bytes()[0], 0x00);
        let wide = ExtCommunityValue::route_target(4200000000, 1);
        assert_eq!(wide.to_bytes()[0], 0x02);
        assert_eq!(
            ExtCommunityValue::from_bytes(wide.to_bytes()),
            ExtCommunityValue::RouteTarget {
                asn: 4200000000,
                number: 1,
                wide: true
            }
        );
    }
}
