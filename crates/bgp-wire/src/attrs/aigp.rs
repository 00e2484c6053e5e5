use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::number::complete::{be_u8, be_u16, be_u64};

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe};

/// AIGP metric TLV (RFC 7311). Only TLV type 1 is defined; the value
/// is a 64-bit accumulated metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Aigp {
    pub metric: u64,
}

impl Aigp {
    const TLV_METRIC: u8 = 1;

    pub fn new(metric: u64) -> Self {
        Self { metric }
    }
}

impl ParseBe<Aigp> for Aigp {
    fn parse_be(input: &[u8]) -> IResult<&[u8], Aigp> {
        let (input, typ) = be_u8(input)?;
        let (input, _length) = be_u16(input)?;
        if typ != Self::TLV_METRIC {
            return Err(nom::Err::Error(nom::error::make_error(
                input,
                nom::error::ErrorKind::Tag,
            )));
        }
        let (input, metric) = be_u64(input)?;
        Ok((input, Aigp { metric }))
    }
}

impl AttrEmit for Aigp {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::Aigp
    }

    fn attr_len(&self) -> Option<usize> {
        Some(11)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u8(Self::TLV_METRIC);
        buf.put_u16(11);
        buf.put_u64(self.metric);
    }
}

impl fmt::Display for Aigp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metric)
    }
}
