use bytes::{BufMut, BytesMut};

use crate::{AttrCode, AttrFlags};

/// Wire emission of one path attribute: flags, code, one- or two-octet
/// length per the extended-length bit, then the value.
pub trait AttrEmit {
    fn attr_flags(&self) -> AttrFlags;

    fn attr_code(&self) -> AttrCode;

    /// Known value length, or None to have the attribute buffered for
    /// measurement.
    fn attr_len(&self) -> Option<usize>;

    fn emit_value(&self, buf: &mut BytesMut);

    fn attr_emit(&self, buf: &mut BytesMut) {
        let emit_header = |buf: &mut BytesMut, len: usize, extended: bool| {
            if extended {
                buf.put_u8(self.attr_flags().with_extended(true).into());
                buf.put_u8(self.attr_code().into());
                buf.put_u16(len as u16);
            } else {
                buf.put_u8(self.attr_flags().into());
                buf.put_u8(self.attr_code().into());
                buf.put_u8(len as u8);
            }
        };

        if let Some(len) = self.attr_len() {
            emit_header(buf, len, len > 255);
            self.emit_value(buf);
        } else {
            let mut attr_buf = BytesMut::new();
            self.emit_value(&mut attr_buf);
            let len = attr_buf.len();
            emit_header(buf, len, len > 255);
            buf.put(&attr_buf[..]);
        }
    }
}
