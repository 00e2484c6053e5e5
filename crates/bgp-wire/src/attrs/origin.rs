use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use nom::IResult;
use nom::number::complete::be_u8;

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe};

/// ORIGIN (RFC 4271 §5.1.1).
#[repr(u8)]
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Default, Hash)]
pub enum Origin {
    #[default]
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl From<Origin> for u8 {
    fn from(value: Origin) -> Self {
        match value {
            Origin::Igp => 0,
            Origin::Egp => 1,
            Origin::Incomplete => 2,
        }
    }
}

impl AttrEmit for Origin {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::well_known()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::Origin
    }

    fn attr_len(&self) -> Option<usize> {
        Some(1)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u8((*self).into());
    }
}

impl ParseBe<Origin> for Origin {
    fn parse_be(input: &[u8]) -> IResult<&[u8], Origin> {
        let (input, val) = be_u8(input)?;
        let origin = match val {
            0 => Origin::Igp,
            1 => Origin::Egp,
            _ => Origin::Incomplete,
        };
        Ok((input, origin))
    }
}

impl FromStr for Origin {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "igp" => Ok(Origin::Igp),
            "egp" => Ok(Origin::Egp),
            "incomplete" => Ok(Origin::Incomplete),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Igp => write!(f, "igp"),
            Origin::Egp => write!(f, "egp"),
            Origin::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Origin: {}", self)
    }
}
