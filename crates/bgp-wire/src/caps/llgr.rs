use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::number::complete::be_u8;
use nom::{IResult, Parser};
use nom_derive::*;

use super::{CapCode, CapEmit};
use crate::{Afi, Safi, many0_complete};

/// Long-lived graceful restart: per-family flags and a 24-bit stale time.
#[derive(Debug, PartialEq, Clone)]
pub struct LlgrFamily {
    pub afi: Afi,
    pub safi: Safi,
    pub flags: u8,
    pub stale_time: u32,
}

impl LlgrFamily {
    pub fn new(afi: Afi, safi: Safi, stale_time: u32) -> Self {
        Self {
            afi,
            safi,
            flags: 0,
            stale_time,
        }
    }

    fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, afi) = Afi::parse_be(input)?;
        let (input, safi) = Safi::parse_be(input)?;
        let (input, flags) = be_u8(input)?;
        let (input, hi) = be_u8(input)?;
        let (input, mid) = be_u8(input)?;
        let (input, lo) = be_u8(input)?;
        let stale_time = ((hi as u32) << 16) | ((mid as u32) << 8) | lo as u32;
        Ok((
            input,
            Self {
                afi,
                safi,
                flags,
                stale_time,
            },
        ))
    }
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct CapLlgr {
    pub families: Vec<LlgrFamily>,
}

impl CapLlgr {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, families) = many0_complete(LlgrFamily::parse_be).parse(input)?;
        Ok((input, Self { families }))
    }
}

impl CapEmit for CapLlgr {
    fn code(&self) -> CapCode {
        CapCode::Llgr
    }

    fn len(&self) -> u8 {
        (self.families.len() * 7) as u8
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for val in self.families.iter() {
            buf.put_u16(val.afi.into());
            buf.put_u8(val.safi.into());
            buf.put_u8(val.flags);
            buf.put_u8((val.stale_time >> 16) as u8);
            buf.put_u8((val.stale_time >> 8) as u8);
            buf.put_u8(val.stale_time as u8);
        }
    }
}

impl fmt::Display for CapLlgr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLGR:")?;
        for value in self.families.iter() {
            write!(
                f,
                " {}/{} stale:{}",
                value.afi, value.safi, value.stale_time
            )?;
        }
        Ok(())
    }
}
