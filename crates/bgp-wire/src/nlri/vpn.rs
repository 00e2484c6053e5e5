use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u32};
use nom::{IResult, Parser};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::{Afi, Label, ParseBe, RouteDistinguisher, nlri_psize};

/// Bits consumed by the route distinguisher inside the on-wire prefix
/// length of a VPN NLRI.
const RD_BITS: u8 = 64;

/// VPN unicast NLRI (RFC 4364): labels, RD, then the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VpnNlri {
    pub path_id: u32,
    pub labels: Vec<Label>,
    pub rd: RouteDistinguisher,
    pub prefix: IpNet,
}

impl VpnNlri {
    pub fn new(prefix: IpNet, rd: RouteDistinguisher, label: Label) -> Self {
        Self {
            path_id: 0,
            labels: vec![label],
            rd,
            prefix,
        }
    }

    pub fn parse_afi(input: &[u8], afi: Afi, add_path: bool) -> IResult<&[u8], VpnNlri> {
        let (input, path_id) = if add_path {
            be_u32(input)?
        } else {
            (input, 0)
        };
        let (mut input, mut plen) = be_u8(input)?;

        let mut labels: Vec<Label> = Vec::new();
        loop {
            if plen < Label::BITS + RD_BITS {
                return Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue)));
            }
            let (rest, raw) = take(3usize).parse(input)?;
            let label = Label::from(raw);
            plen -= Label::BITS;
            input = rest;
            let bos = label.bos;
            labels.push(label);
            if bos || labels.len() >= 8 {
                break;
            }
        }

        let (input, rd) = RouteDistinguisher::parse_be(input)?;
        if plen < RD_BITS {
            return Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue)));
        }
        plen -= RD_BITS;

        let psize = nlri_psize(plen);
        if input.len() < psize {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let prefix = match afi {
            Afi::Ipv4 => {
                if plen > 32 {
                    return Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue)));
                }
                let mut addr = [0u8; 4];
                addr[..psize].copy_from_slice(&input[..psize]);
                IpNet::V4(
                    Ipv4Net::new(Ipv4Addr::from(addr), plen)
                        .map_err(|_| nom::Err::Error(make_error(input, ErrorKind::Verify)))?,
                )
            }
            _ => {
                let mut addr = [0u8; 16];
                addr[..psize].copy_from_slice(&input[..psize]);
                IpNet::V6(
                    Ipv6Net::new(Ipv6Addr::from(addr), plen)
                        .map_err(|_| nom::Err::Error(make_error(input, ErrorKind::Verify)))?,
                )
            }
        };
        let (input, _) = take(psize).parse(input)?;
        Ok((
            input,
            VpnNlri {
                path_id,
                labels,
                rd,
                prefix,
            },
        ))
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        if self.path_id != 0 {
            buf.put_u32(self.path_id);
        }
        let plen = self.prefix.prefix_len() + RD_BITS + Label::BITS * self.labels.len() as u8;
        buf.put_u8(plen);
        for label in self.labels.iter() {
            buf.put(&label.to_bytes()[..]);
        }
        self.rd.emit(buf);
        let psize = nlri_psize(self.prefix.prefix_len());
        match self.prefix {
            IpNet::V4(net) => buf.put(&net.addr().octets()[..psize]),
            IpNet::V6(net) => buf.put(&net.addr().octets()[..psize]),
        }
    }
}

impl fmt::Display for VpnNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self
            .labels
            .iter()
            .map(|l| l.label.to_string())
            .collect::<Vec<String>>()
            .join("/");
        write!(f, "[{}] {} label {}", self.rd, self.prefix, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vpn_prefix_roundtrip() {
        let rd = RouteDistinguisher::As2 {
            asn: 64512,
            number: 7,
        };
        let nlri = VpnNlri::new("10.1.0.0/16".parse().unwrap(), rd, Label::new(1000, 0, true));
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        // 16 prefix bits + 64 RD bits + 24 label bits.
        assert_eq!(buf[0], 104);
        let (rest, parsed) = VpnNlri::parse_afi(&buf, Afi::Ipv4, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, nlri);
    }
}
