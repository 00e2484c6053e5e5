use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::{be_u8, be_u32};
use nom::{IResult, Parser};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::{Afi, Label, nlri_psize};

/// Labeled unicast NLRI (RFC 8277): a label stack then the prefix; the
/// on-wire prefix length counts the stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabeledNlri {
    pub path_id: u32,
    pub labels: Vec<Label>,
    pub prefix: IpNet,
}

impl LabeledNlri {
    pub fn new(prefix: IpNet, label: Label) -> Self {
        Self {
            path_id: 0,
            labels: vec![label],
            prefix,
        }
    }

    pub fn parse_afi(input: &[u8], afi: Afi, add_path: bool) -> IResult<&[u8], LabeledNlri> {
        let (input, path_id) = if add_path {
            be_u32(input)?
        } else {
            (input, 0)
        };
        let (mut input, mut plen) = be_u8(input)?;

        // Pull 3-octet labels until bottom-of-stack.
        let mut labels: Vec<Label> = Vec::new();
        loop {
            if plen < Label::BITS {
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

        let psize = nlri_psize(plen);
        if input.len() < psize {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let prefix = match afi {
            Afi::Ipv4 => {
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
            LabeledNlri {
                path_id,
                labels,
                prefix,
            },
        ))
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        if self.path_id != 0 {
            buf.put_u32(self.path_id);
        }
        let plen = self.prefix.prefix_len() + Label::BITS * self.labels.len() as u8;
        buf.put_u8(plen);
        for label in self.labels.iter() {
            buf.put(&label.to_bytes()[..]);
        }
        let psize = nlri_psize(self.prefix.prefix_len());
        match self.prefix {
            IpNet::V4(net) => buf.put(&net.addr().octets()[..psize]),
            IpNet::V6(net) => buf.put(&net.addr().octets()[..psize]),
        }
    }
}

impl fmt::Display for LabeledNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self
            .labels
            .iter()
            .map(|l| l.label.to_string())
            .collect::<Vec<String>>()
            .join("/");
        write!(f, "{} label {}", self.prefix, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_stack_roundtrip() {
        let nlri = LabeledNlri::new("203.0.113.0/24".parse().unwrap(), Label::new(24017, 0, true));
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        // 24 prefix bits + 24 label bits.
        assert_eq!(buf[0], 48);
        let (rest, parsed) = LabeledNlri::parse_afi(&buf, Afi::Ipv4, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, nlri);
    }
}
