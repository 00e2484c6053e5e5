use bytes::{BufMut, BytesMut};

use super::CapCode;

/// Optional parameter type for capabilities (RFC 5492).
const PARAM_CAPABILITIES: u8 = 2;

/// Each capability is emitted wrapped in its own optional parameter.
pub trait CapEmit {
    fn code(&self) -> CapCode;

    fn len(&self) -> u8 {
        0
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit_value(&self, _buf: &mut BytesMut) {}

    fn emit(&self, buf: &mut BytesMut) {
        buf.put_u8(PARAM_CAPABILITIES);
        buf.put_u8(self.len() + 2);
        buf.put_u8(self.code().into());
        buf.put_u8(self.len());
        self.emit_value(buf);
    }
}
