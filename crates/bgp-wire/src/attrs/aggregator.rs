use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use nom_derive::*;

use crate::{AS_TRANS, AttrCode, AttrEmit, AttrFlags, ParseBe};

/// AGGREGATOR with a 4-octet AS (ASN4 sessions, and the AS4_AGGREGATOR
/// shadow attribute on 2-octet sessions).
#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash)]
pub struct Aggregator {
    pub asn: u32,
    pub addr: Ipv4Addr,
}

impl Aggregator {
    pub fn new(asn: u32, addr: Ipv4Addr) -> Self {
        Self { asn, addr }
    }
}

impl AttrEmit for Aggregator {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::Aggregator
    }

    fn attr_len(&self) -> Option<usize> {
        Some(8)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u32(self.asn);
        buf.put(&self.addr.octets()[..]);
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asn, self.addr)
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aggregator: {}", self)
    }
}

/// AGGREGATOR as sent on a session without ASN4.
#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash)]
pub struct Aggregator2 {
    pub asn: u16,
    pub addr: Ipv4Addr,
}

impl AttrEmit for Aggregator2 {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::Aggregator
    }

    fn attr_len(&self) -> Option<usize> {
        Some(6)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u16(self.asn);
        buf.put(&self.addr.octets()[..]);
    }
}

impl From<Aggregator2> for Aggregator {
    fn from(value: Aggregator2) -> Self {
        Self {
            asn: value.asn.into(),
            addr: value.addr,
        }
    }
}

impl From<Aggregator> for Aggregator2 {
    fn from(value: Aggregator) -> Self {
        let asn: u16 = if value.asn <= u16::MAX as u32 {
            value.asn as u16
        } else {
            AS_TRANS
        };
        Self {
            asn,
            addr: value.addr,
        }
    }
}

/// AS4_AGGREGATOR (RFC 6793), emitted next to a truncated AGGREGATOR.
#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash)]
pub struct As4Aggregator {
    pub asn: u32,
    pub addr: Ipv4Addr,
}

impl AttrEmit for As4Aggregator {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::As4Aggregator
    }

    fn attr_len(&self) -> Option<usize> {
        Some(8)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u32(self.asn);
        buf.put(&self.addr.octets()[..]);
    }
}
