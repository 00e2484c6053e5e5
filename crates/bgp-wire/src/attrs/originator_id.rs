use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use nom_derive::*;

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe};

/// ORIGINATOR_ID, set by route reflectors (RFC 4456).
#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash)]
pub struct OriginatorId {
    pub id: Ipv4Addr,
}

impl AttrEmit for OriginatorId {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::OriginatorId
    }

    fn attr_len(&self) -> Option<usize> {
        Some(4)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put(&self.id.octets()[..]);
    }
}

impl fmt::Display for OriginatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for OriginatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OriginatorId: {}", self)
    }
}
