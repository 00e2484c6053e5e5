use std::fmt;
use std::net::IpAddr;

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u32};
use nom::{IResult, Parser};

use crate::{Label, ParseBe, ParseNlri, RouteDistinguisher, nlri_psize};

/// 10-octet Ethernet Segment Identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Esi(pub [u8; 10]);

impl fmt::Display for Esi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| format!("{:02x}", x))
            .collect::<Vec<String>>()
            .join(":");
        write!(f, "{v}")
    }
}

fn parse_esi(input: &[u8]) -> IResult<&[u8], Esi> {
    let (input, raw) = take(10usize).parse(input)?;
    let mut esi = [0u8; 10];
    esi.copy_from_slice(raw);
    Ok((input, Esi(esi)))
}

fn parse_ip(input: &[u8], bits: u8) -> IResult<&[u8], Option<IpAddr>> {
    match bits {
        0 => Ok((input, None)),
        32 => {
            let (input, raw) = take(4usize).parse(input)?;
            let mut addr = [0u8; 4];
            addr.copy_from_slice(raw);
            Ok((input, Some(IpAddr::from(addr))))
        }
        128 => {
            let (input, raw) = take(16usize).parse(input)?;
            let mut addr = [0u8; 16];
            addr.copy_from_slice(raw);
            Ok((input, Some(IpAddr::from(addr))))
        }
        _ => Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue))),
    }
}

fn ip_bits(addr: &Option<IpAddr>) -> u8 {
    match addr {
        None => 0,
        Some(IpAddr::V4(_)) => 32,
        Some(IpAddr::V6(_)) => 128,
    }
}

fn emit_ip(buf: &mut BytesMut, addr: &Option<IpAddr>) {
    match addr {
        None => {}
        Some(IpAddr::V4(v4)) => buf.put(&v4.octets()[..]),
        Some(IpAddr::V6(v6)) => buf.put(&v6.octets()[..]),
    }
}

/// EVPN route (RFC 7432): type, length, then a type-specific payload.
/// Types 1-5 are decoded; anything else is preserved raw.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvpnRoute {
    /// Type 1: Ethernet auto-discovery.
    EthernetAd {
        rd: RouteDistinguisher,
        esi: Esi,
        ether_tag: u32,
        label: Label,
    },
    /// Type 2: MAC/IP advertisement.
    MacIp {
        rd: RouteDistinguisher,
        esi: Esi,
        ether_tag: u32,
        mac: [u8; 6],
        ip: Option<IpAddr>,
        labels: Vec<Label>,
    },
    /// Type 3: inclusive multicast Ethernet tag.
    Multicast {
        rd: RouteDistinguisher,
        ether_tag: u32,
        originator: Option<IpAddr>,
    },
    /// Type 4: Ethernet segment.
    EthernetSegment {
        rd: RouteDistinguisher,
        esi: Esi,
        originator: Option<IpAddr>,
    },
    /// Type 5: IP prefix.
    IpPrefix {
        rd: RouteDistinguisher,
        esi: Esi,
        ether_tag: u32,
        prefix_len: u8,
        prefix: Option<IpAddr>,
        gateway: Option<IpAddr>,
        label: Label,
    },
    Raw {
        route_type: u8,
        payload: Vec<u8>,
    },
}

impl ParseNlri<EvpnRoute> for EvpnRoute {
    fn parse_nlri(input: &[u8], _add_path: bool) -> IResult<&[u8], EvpnRoute> {
        let (input, route_type) = be_u8(input)?;
        let (input, length) = be_u8(input)?;
        if input.len() < length as usize {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let (payload, input) = input.split_at(length as usize);
        let route = match route_type {
            1 => {
                let (payload, rd) = RouteDistinguisher::parse_be(payload)?;
                let (payload, esi) = parse_esi(payload)?;
                let (payload, ether_tag) = be_u32(payload)?;
                let (_, raw) = take(3usize).parse(payload)?;
                EvpnRoute::EthernetAd {
                    rd,
                    esi,
                    ether_tag,
                    label: Label::from(raw),
                }
            }
            2 => {
                let (payload, rd) = RouteDistinguisher::parse_be(payload)?;
                let (payload, esi) = parse_esi(payload)?;
                let (payload, ether_tag) = be_u32(payload)?;
                let (payload, mac_len) = be_u8(payload)?;
                if mac_len != 48 {
                    return Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue)));
                }
                let (payload, raw) = take(6usize).parse(payload)?;
                let mut mac = [0u8; 6];
                mac.copy_from_slice(raw);
                let (payload, ip_len) = be_u8(payload)?;
                let (mut payload, ip) = parse_ip(payload, ip_len)?;
                let mut labels = Vec::new();
                while payload.len() >= 3 {
                    let (rest, raw) = take(3usize).parse(payload)?;
                    labels.push(Label::from(raw));
                    payload = rest;
                }
                EvpnRoute::MacIp {
                    rd,
                    esi,
                    ether_tag,
                    mac,
                    ip,
                    labels,
                }
            }
            3 => {
                let (payload, rd) = RouteDistinguisher::parse_be(payload)?;
                let (payload, ether_tag) = be_u32(payload)?;
                let (payload, ip_len) = be_u8(payload)?;
                let (_, originator) = parse_ip(payload, ip_len)?;
                EvpnRoute::Multicast {
                    rd,
                    ether_tag,
                    originator,
                }
            }
            4 => {
                let (payload, rd) = RouteDistinguisher::parse_be(payload)?;
                let (payload, esi) = parse_esi(payload)?;
                let (payload, ip_len) = be_u8(payload)?;
                let (_, originator) = parse_ip(payload, ip_len)?;
                EvpnRoute::EthernetSegment { rd, esi, originator }
            }
            5 => {
                let (payload, rd) = RouteDistinguisher::parse_be(payload)?;
                let (payload, esi) = parse_esi(payload)?;
                let (payload, ether_tag) = be_u32(payload)?;
                let (payload, prefix_len) = be_u8(payload)?;
                // The prefix and gateway widths follow from the route
                // length: 34 octets for IPv4, 58 for IPv6.
                let bits: u8 = if length == 34 { 32 } else { 128 };
                let (payload, prefix) = parse_ip(payload, bits)?;
                let (payload, gateway) = parse_ip(payload, bits)?;
                let (_, raw) = take(3usize).parse(payload)?;
                EvpnRoute::IpPrefix {
                    rd,
                    esi,
                    ether_tag,
                    prefix_len,
                    prefix,
                    gateway,
                    label: Label::from(raw),
                }
            }
            _ => EvpnRoute::Raw {
                route_type,
                payload: payload.to_vec(),
            },
        };
        Ok((input, route))
    }
}

impl EvpnRoute {
    pub fn route_type(&self) -> u8 {
        match self {
            EvpnRoute::EthernetAd { .. } => 1,
            EvpnRoute::MacIp { .. } => 2,
            EvpnRoute::Multicast { .. } => 3,
            EvpnRoute::EthernetSegment { .. } => 4,
            EvpnRoute::IpPrefix { .. } => 5,
            EvpnRoute::Raw { route_type, .. } => *route_type,
        }
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        match self {
            EvpnRoute::EthernetAd {
                rd,
                esi,
                ether_tag,
                label,
            } => {
                rd.emit(&mut payload);
                payload.put(&esi.0[..]);
                payload.put_u32(*ether_tag);
                payload.put(&label.to_bytes()[..]);
            }
            EvpnRoute::MacIp {
                rd,
                esi,
                ether_tag,
                mac,
                ip,
                labels,
            } => {
                rd.emit(&mut payload);
                payload.put(&esi.0[..]);
                payload.put_u32(*ether_tag);
                payload.put_u8(48);
                payload.put(&mac[..]);
                payload.put_u8(ip_bits(ip));
                emit_ip(&mut payload, ip);
                for label in labels.iter() {
                    payload.put(&label.to_bytes()[..]);
                }
            }
            EvpnRoute::Multicast {
                rd,
                ether_tag,
                originator,
            } => {
                rd.emit(&mut payload);
                payload.put_u32(*ether_tag);
                payload.put_u8(ip_bits(originator));
                emit_ip(&mut payload, originator);
            }
            EvpnRoute::EthernetSegment { rd, esi, originator } => {
                rd.emit(&mut payload);
                payload.put(&esi.0[..]);
                payload.put_u8(ip_bits(originator));
                emit_ip(&mut payload, originator);
            }
            EvpnRoute::IpPrefix {
                rd,
                esi,
                ether_tag,
                prefix_len,
                prefix,
                gateway,
                label,
            } => {
                rd.emit(&mut payload);
                payload.put(&esi.0[..]);
                payload.put_u32(*ether_tag);
                payload.put_u8(*prefix_len);
                emit_ip(&mut payload, prefix);
                emit_ip(&mut payload, gateway);
                payload.put(&label.to_bytes()[..]);
            }
            EvpnRoute::Raw { payload: raw, .. } => {
                payload.put(&raw[..]);
            }
        }
        buf.put_u8(self.route_type());
        buf.put_u8(payload.len() as u8);
        buf.put(&payload[..]);
    }
}

impl fmt::Display for EvpnRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvpnRoute::EthernetAd { rd, esi, .. } => {
                write!(f, "evpn auto-discovery [{}] esi {}", rd, esi)
            }
            EvpnRoute::MacIp { rd, mac, ip, .. } => {
                write!(
                    f,
                    "evpn mac [{}] {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                    rd, mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
                )?;
                if let Some(ip) = ip {
                    write!(f, " ip {}", ip)?;
                }
                Ok(())
            }
            EvpnRoute::Multicast { rd, originator, .. } => {
                write!(f, "evpn multicast [{}]", rd)?;
                if let Some(originator) = originator {
                    write!(f, " originator {}", originator)?;
                }
                Ok(())
            }
            EvpnRoute::EthernetSegment { rd, esi, .. } => {
                write!(f, "evpn segment [{}] esi {}", rd, esi)
            }
            EvpnRoute::IpPrefix {
                rd,
                prefix,
                prefix_len,
                ..
            } => {
                write!(f, "evpn prefix [{}]", rd)?;
                if let Some(prefix) = prefix {
                    write!(f, " {}/{}", prefix, prefix_len)?;
                }
                Ok(())
            }
            EvpnRoute::Raw { route_type, .. } => write!(f, "evpn type-{}", route_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_ip_roundtrip() {
        let route = EvpnRoute::MacIp {
            rd: RouteDistinguisher::As2 {
                asn: 64512,
                number: 1,
            },
            esi: Esi::default(),
            ether_tag: 0,
            mac: [0x00, 0x1c, 0x42, 0x1d, 0x71, 0x53],
            ip: Some("192.0.2.9".parse().unwrap()),
            labels: vec![Label::new(550, 0, true)],
        };
        let mut buf = BytesMut::new();
        route.emit(&mut buf);
        let (rest, parsed) = EvpnRoute::parse_nlri(&buf, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, route);
    }

    #[test]
    fn unknown_type_preserved() {
        let raw = [0x08u8, 0x03, 0xde, 0xad, 0xbf];
        let (rest, parsed) = EvpnRoute::parse_nlri(&raw, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.route_type(), 8);
        let mut buf = BytesMut::new();
        parsed.emit(&mut buf);
        assert_eq!(&buf[..], &raw[..]);
    }
}
