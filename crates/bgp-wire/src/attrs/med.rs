use std::fmt;

use bytes::{BufMut, BytesMut};
use nom_derive::*;

use crate::{AttrCode, AttrEmit, AttrFlags};

#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash, Default)]
pub struct Med {
    pub med: u32,
}

impl Med {
    pub fn new(med: u32) -> Self {
        Self { med }
    }
}

impl AttrEmit for Med {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::Med
    }

    fn attr_len(&self) -> Option<usize> {
        Some(4)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u32(self.med);
    }
}

impl fmt::Display for Med {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.med)
    }
}

impl fmt::Debug for Med {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Med: {}", self)
    }
}
