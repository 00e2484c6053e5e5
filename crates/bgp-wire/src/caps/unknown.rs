use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::IResult;

use super::{CapCode, CapEmit};

/// Unrecognized capability, preserved byte-for-byte.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct CapUnknown {
    pub code: u8,
    pub data: Vec<u8>,
}

impl CapUnknown {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let data = input.to_vec();
        Ok((
            &input[input.len()..],
            Self {
                code: 0,
                data,
            },
        ))
    }
}

impl CapEmit for CapUnknown {
    fn code(&self) -> CapCode {
        CapCode::Unknown(self.code)
    }

    fn len(&self) -> u8 {
        self.data.len() as u8
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put(&self.data[..]);
    }
}

impl fmt::Display for CapUnknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown({})", self.code)
    }
}
