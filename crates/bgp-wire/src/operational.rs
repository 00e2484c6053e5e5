use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::{IResult, Parser};
use nom_derive::*;

use crate::{Afi, BGP_HEADER_LEN, Family, Header, MessageType, Safi, patch_length};

/// Advisories longer than this are refused at the API boundary and
/// truncated defensively on decode.
pub const MAX_ADVISORY: usize = 2048;

/// OPERATIONAL message subtypes (draft-ietf-idr-operational-message).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalKind {
    /// Advisory static: pinned operator text.
    Asm = 0x01,
    /// Advisory demand: one-shot operator text.
    Adm = 0x02,
    /// Reachable prefix count query / reply.
    Rpcq = 0x03,
    Rpcp = 0x04,
    /// Adj-RIB-out prefix count query / reply.
    Apcq = 0x05,
    Apcp = 0x06,
    /// Loc-RIB prefix count query / reply.
    Lpcq = 0x07,
    Lpcp = 0x08,
    Unknown(u16),
}

impl From<u16> for OperationalKind {
    fn from(v: u16) -> Self {
        use OperationalKind::*;
        match v {
            0x01 => Asm,
            0x02 => Adm,
            0x03 => Rpcq,
            0x04 => Rpcp,
            0x05 => Apcq,
            0x06 => Apcp,
            0x07 => Lpcq,
            0x08 => Lpcp,
            v => Unknown(v),
        }
    }
}

impl From<OperationalKind> for u16 {
    fn from(kind: OperationalKind) -> Self {
        use OperationalKind::*;
        match kind {
            Asm => 0x01,
            Adm => 0x02,
            Rpcq => 0x03,
            Rpcp => 0x04,
            Apcq => 0x05,
            Apcp => 0x06,
            Lpcq => 0x07,
            Lpcp => 0x08,
            Unknown(v) => v,
        }
    }
}

impl OperationalKind {
    pub fn name(&self) -> &'static str {
        use OperationalKind::*;
        match self {
            Asm => "asm",
            Adm => "adm",
            Rpcq => "rpcq",
            Rpcp => "rpcp",
            Apcq => "apcq",
            Apcp => "apcp",
            Lpcq => "lpcq",
            Lpcp => "lpcp",
            Unknown(_) => "unknown",
        }
    }
}

/// One OPERATIONAL message. Advisories carry UTF-8 text; the query
/// and reply subtypes carry a family plus their counters, which we
/// keep as raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Operational {
    Advisory {
        kind: OperationalKind,
        family: Family,
        text: String,
    },
    Query {
        kind: OperationalKind,
        family: Family,
        payload: Vec<u8>,
    },
    Unknown {
        kind: u16,
        payload: Vec<u8>,
    },
}

impl Operational {
    pub fn advisory(kind: OperationalKind, family: Family, text: &str) -> Option<Self> {
        if text.len() > MAX_ADVISORY {
            return None;
        }
        matches!(kind, OperationalKind::Asm | OperationalKind::Adm).then(|| {
            Operational::Advisory {
                kind,
                family,
                text: text.to_string(),
            }
        })
    }

    pub fn kind(&self) -> OperationalKind {
        match self {
            Operational::Advisory { kind, .. } | Operational::Query { kind, .. } => *kind,
            Operational::Unknown { kind, .. } => OperationalKind::from(*kind),
        }
    }

    pub fn parse_packet(input: &[u8]) -> IResult<&[u8], Operational> {
        let (input, _header) = Header::parse_be(input)?;
        let (input, what) = be_u16(input)?;
        let (input, length) = be_u16(input)?;
        let (input, payload) = take(length as usize).parse(input)?;
        let kind: OperationalKind = what.into();
        let operational = match kind {
            OperationalKind::Asm | OperationalKind::Adm => {
                let (rest, afi) = Afi::parse_be(payload)?;
                let (rest, safi) = Safi::parse_be(rest)?;
                let text = String::from_utf8_lossy(&rest[..rest.len().min(MAX_ADVISORY)]);
                Operational::Advisory {
                    kind,
                    family: Family::new(afi, safi),
                    text: text.to_string(),
                }
            }
            OperationalKind::Unknown(v) => Operational::Unknown {
                kind: v,
                payload: payload.to_vec(),
            },
            _ => {
                let (rest, afi) = Afi::parse_be(payload)?;
                let (rest, safi) = Safi::parse_be(rest)?;
                Operational::Query {
                    kind,
                    family: Family::new(afi, safi),
                    payload: rest.to_vec(),
                }
            }
        };
        Ok((input, operational))
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        Header::new(MessageType::Operational, BGP_HEADER_LEN).emit(&mut buf);
        let mut payload = BytesMut::new();
        let what: u16 = match self {
            Operational::Advisory { kind, family, text } => {
                payload.put_u16(family.afi.into());
                payload.put_u8(family.safi.into());
                payload.put(text.as_bytes());
                (*kind).into()
            }
            Operational::Query {
                kind,
                family,
                payload: raw,
            } => {
                payload.put_u16(family.afi.into());
                payload.put_u8(family.safi.into());
                payload.put(&raw[..]);
                (*kind).into()
            }
            Operational::Unknown { kind, payload: raw } => {
                payload.put(&raw[..]);
                *kind
            }
        };
        buf.put_u16(what);
        buf.put_u16(payload.len() as u16);
        buf.put(&payload[..]);
        patch_length(&mut buf);
        buf
    }
}

impl fmt::Display for Operational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operational::Advisory { kind, text, .. } => {
                write!(f, "Operational {} \"{}\"", kind.name(), text)
            }
            Operational::Query { kind, family, .. } => {
                write!(f, "Operational {} {}", kind.name(), family)
            }
            Operational::Unknown { kind, .. } => write!(f, "Operational unknown ({})", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_roundtrip() {
        let adm = Operational::advisory(
            OperationalKind::Adm,
            Family::IPV4_UNICAST,
            "maintenance in 5 minutes",
        )
        .unwrap();
        let buf = adm.encode();
        let (rest, parsed) = Operational::parse_packet(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, adm);
    }

    #[test]
    fn oversized_advisory_refused() {
        let text = "x".repeat(MAX_ADVISORY + 1);
        assert!(Operational::advisory(OperationalKind::Asm, Family::IPV4_UNICAST, &text).is_none());
    }
}
