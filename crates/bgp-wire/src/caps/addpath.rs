use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::{IResult, number::complete::be_u8};
use nom_derive::*;
use strum_macros::{Display, EnumString};

use super::{CapCode, CapEmit};
use crate::{Afi, Family, Safi};

#[derive(Debug, PartialEq, NomBE, Clone, Ord, PartialOrd, Eq)]
pub struct AddPathFamily {
    pub afi: Afi,
    pub safi: Safi,
    pub direction: AddPathDirection,
}

impl AddPathFamily {
    pub fn new(family: Family, direction: AddPathDirection) -> Self {
        Self {
            afi: family.afi,
            safi: family.safi,
            direction,
        }
    }

    pub fn family(&self) -> Family {
        Family::new(self.afi, self.safi)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, PartialEq, Copy, Ord, PartialOrd, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum AddPathDirection {
    Receive = 1,
    Send = 2,
    SendReceive = 3,
    #[strum(disabled)]
    Unknown(u8),
}

impl From<AddPathDirection> for u8 {
    fn from(dir: AddPathDirection) -> Self {
        use AddPathDirection::*;
        match dir {
            Receive => 1,
            Send => 2,
            SendReceive => 3,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for AddPathDirection {
    fn from(dir: u8) -> Self {
        use AddPathDirection::*;
        match dir {
            1 => Receive,
            2 => Send,
            3 => SendReceive,
            v => Unknown(v),
        }
    }
}

impl AddPathDirection {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, val) = be_u8(input)?;
        Ok((input, val.into()))
    }

    pub fn receive(&self) -> bool {
        matches!(self, Self::Receive | Self::SendReceive)
    }

    pub fn send(&self) -> bool {
        matches!(self, Self::Send | Self::SendReceive)
    }
}

#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapAddPath {
    pub families: Vec<AddPathFamily>,
}

impl CapEmit for CapAddPath {
    fn code(&self) -> CapCode {
        CapCode::AddPath
    }

    fn len(&self) -> u8 {
        (self.families.len() * 4) as u8
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for val in self.families.iter() {
            buf.put_u16(val.afi.into());
            buf.put_u8(val.safi.into());
            buf.put_u8(val.direction.into());
        }
    }
}

impl fmt::Display for CapAddPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddPath:")?;
        for value in self.families.iter() {
            write!(f, " {}/{} {}", value.afi, value.safi, value.direction)?;
        }
        Ok(())
    }
}
