use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::IResult;

use crate::{AttrCode, AttrEmit, AttrFlags, Family, Negotiated, Nlri};

/// MP_UNREACH_NLRI (RFC 4760). An empty NLRI list is the End-of-RIB
/// marker for the family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MpUnreach {
    pub family: Family,
    pub nlris: Vec<Nlri>,
}

impl MpUnreach {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            nlris: Vec::new(),
        }
    }

    pub fn is_eor(&self) -> bool {
        self.nlris.is_empty()
    }

    pub fn parse_attr<'a>(
        input: &'a [u8],
        negotiated: &Negotiated,
    ) -> IResult<&'a [u8], MpUnreach> {
        let (mut input, family) = Family::parse_be(input)?;
        let add_path = negotiated.addpath_receive(&family);
        let mut nlris = Vec::new();
        while !input.is_empty() {
            let (rest, nlri) = Nlri::parse_family(input, family, add_path)?;
            nlris.push(nlri);
            input = rest;
        }
        Ok((input, MpUnreach { family, nlris }))
    }
}

impl AttrEmit for MpUnreach {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::MpUnreachNlri
    }

    fn attr_len(&self) -> Option<usize> {
        None
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u16(self.family.afi.into());
        buf.put_u8(self.family.safi.into());
        for nlri in self.nlris.iter() {
            nlri.emit(buf);
        }
    }
}

impl fmt::Display for MpUnreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eor() {
            return writeln!(f, " EoR: {}", self.family);
        }
        writeln!(f, " MP Unreach {}", self.family)?;
        for nlri in self.nlris.iter() {
            writeln!(f, "  {}", nlri)?;
        }
        Ok(())
    }
}
