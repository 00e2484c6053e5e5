use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::AttrFlags;

/// An attribute we do not model, preserved bit-for-bit with its flag
/// octet. Per RFC 4271 §5 an unknown optional transitive attribute is
/// passed along with the partial bit set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenericAttr {
    pub flags: AttrFlags,
    pub code: u8,
    pub value: Vec<u8>,
}

impl GenericAttr {
    /// The flags to use when propagating this attribute onward.
    pub fn forward_flags(&self) -> AttrFlags {
        if self.flags.optional() && self.flags.transitive() {
            self.flags.with_partial(true)
        } else {
            self.flags
        }
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        let extended = self.flags.extended() || self.value.len() > 255;
        let flags = self.forward_flags().with_extended(extended);
        buf.put_u8(flags.into());
        buf.put_u8(self.code);
        if extended {
            buf.put_u16(self.value.len() as u16);
        } else {
            buf.put_u8(self.value.len() as u8);
        }
        buf.put(&self.value[..]);
    }
}

impl fmt::Display for GenericAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute {} [{} octets]", self.code, self.value.len())
    }
}
