use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u32};
use nom::{IResult, Parser};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::{Afi, nlri_psize};

/// Plain prefix NLRI for the unicast and multicast SAFIs, with the
/// optional add-path id (0 when absent).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixNlri {
    pub path_id: u32,
    pub prefix: IpNet,
}

impl PrefixNlri {
    pub fn new(prefix: IpNet) -> Self {
        Self { path_id: 0, prefix }
    }

    pub fn with_path_id(prefix: IpNet, path_id: u32) -> Self {
        Self { path_id, prefix }
    }

    pub fn afi(&self) -> Afi {
        match self.prefix {
            IpNet::V4(_) => Afi::Ipv4,
            IpNet::V6(_) => Afi::Ipv6,
        }
    }

    pub fn parse_afi(input: &[u8], afi: Afi, add_path: bool) -> IResult<&[u8], PrefixNlri> {
        let (input, path_id) = if add_path {
            be_u32(input)?
        } else {
            (input, 0)
        };
        let (input, plen) = be_u8(input)?;
        let psize = nlri_psize(plen);
        if input.len() < psize {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let prefix = match afi {
            Afi::Ipv4 => {
                if plen > 32 {
                    return Err(nom::Err::Error(make_error(input, ErrorKind::Verify)));
                }
                let mut addr = [0u8; 4];
                addr[..psize].copy_from_slice(&input[..psize]);
                IpNet::V4(
                    Ipv4Net::new(Ipv4Addr::from(addr), plen)
                        .map_err(|_| nom::Err::Error(make_error(input, ErrorKind::Verify)))?,
                )
            }
            _ => {
                if plen > 128 {
                    return Err(nom::Err::Error(make_error(input, ErrorKind::Verify)));
                }
                let mut addr = [0u8; 16];
                addr[..psize].copy_from_slice(&input[..psize]);
                IpNet::V6(
                    Ipv6Net::new(Ipv6Addr::from(addr), plen)
                        .map_err(|_| nom::Err::Error(make_error(input, ErrorKind::Verify)))?,
                )
            }
        };
        let (input, _) = take(psize).parse(input)?;
        Ok((input, PrefixNlri { path_id, prefix }))
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        if self.path_id != 0 {
            buf.put_u32(self.path_id);
        }
        let plen = self.prefix.prefix_len();
        buf.put_u8(plen);
        let psize = nlri_psize(plen);
        match self.prefix {
            IpNet::V4(net) => buf.put(&net.addr().octets()[..psize]),
            IpNet::V6(net) => buf.put(&net.addr().octets()[..psize]),
        }
    }

    pub fn wire_len(&self) -> usize {
        let mut len = 1 + nlri_psize(self.prefix.prefix_len());
        if self.path_id != 0 {
            len += 4;
        }
        len
    }
}

impl fmt::Display for PrefixNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path_id != 0 {
            write!(f, "{} path-id {}", self.prefix, self.path_id)
        } else {
            write!(f, "{}", self.prefix)
        }
    }
}

/// Parse a run of top-level UPDATE NLRI (IPv4 unicast only).
pub fn parse_prefix_run(
    input: &[u8],
    length: u16,
    add_path: bool,
) -> IResult<&[u8], Vec<PrefixNlri>> {
    if input.len() < length as usize {
        return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
    }
    let (mut nlri, input) = input.split_at(length as usize);
    let mut out = Vec::new();
    while !nlri.is_empty() {
        let (rest, prefix) = PrefixNlri::parse_afi(nlri, Afi::Ipv4, add_path)?;
        out.push(prefix);
        nlri = rest;
    }
    Ok((input, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_prefix() {
        // 10.0.0.0/24 is three octets on the wire.
        let nlri = PrefixNlri::new("10.0.0.0/24".parse().unwrap());
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        assert_eq!(&buf[..], &[0x18, 0x0a, 0x00, 0x00][..]);

        let (rest, parsed) = PrefixNlri::parse_afi(&buf, Afi::Ipv4, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, nlri);
    }

    #[test]
    fn path_id_prefixes_wire_form() {
        let nlri = PrefixNlri::with_path_id("192.0.2.0/25".parse().unwrap(), 7);
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        assert_eq!(&buf[..4], &7u32.to_be_bytes()[..]);
        let (_, parsed) = PrefixNlri::parse_afi(&buf, Afi::Ipv4, true).unwrap();
        assert_eq!(parsed.path_id, 7);
        assert_eq!(parsed.prefix.prefix_len(), 25);
    }

    #[test]
    fn overlong_mask_rejected() {
        let bytes = [0x21, 0x0a, 0x00, 0x00, 0x00, 0x00];
        assert!(PrefixNlri::parse_afi(&bytes, Afi::Ipv4, false).is_err());
    }
}
