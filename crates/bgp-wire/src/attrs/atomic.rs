use std::fmt;

use bytes::BytesMut;
use nom_derive::*;

use crate::{AttrCode, AttrEmit, AttrFlags};

#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash, Default)]
pub struct AtomicAggregate {}

impl AttrEmit for AtomicAggregate {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::well_known()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::AtomicAggregate
    }

    fn attr_len(&self) -> Option<usize> {
        Some(0)
    }

    fn emit_value(&self, _buf: &mut BytesMut) {}
}

impl fmt::Debug for AtomicAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomicAggregate")
    }
}
