use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::be_u16;
use nom::{IResult, Parser};

use crate::{Label, ParseBe, ParseNlri, RouteDistinguisher};

/// VPLS NLRI (RFC 4761): one VE block advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VplsNlri {
    pub rd: RouteDistinguisher,
    pub ve_id: u16,
    pub ve_offset: u16,
    pub ve_size: u16,
    pub label_base: u32,
}

impl VplsNlri {
    const WIRE_LEN: u16 = 17;

    pub fn emit(&self, buf: &mut BytesMut) {
        buf.put_u16(Self::WIRE_LEN);
        self.rd.emit(buf);
        buf.put_u16(self.ve_id);
        buf.put_u16(self.ve_offset);
        buf.put_u16(self.ve_size);
        // Label base travels as a 3-octet MPLS entry with BoS set.
        buf.put(&Label::new(self.label_base, 0, true).to_bytes()[..]);
    }
}

impl ParseNlri<VplsNlri> for VplsNlri {
    fn parse_nlri(input: &[u8], _add_path: bool) -> IResult<&[u8], VplsNlri> {
        let (input, length) = be_u16(input)?;
        if length != Self::WIRE_LEN {
            return Err(nom::Err::Error(make_error(input, ErrorKind::LengthValue)));
        }
        let (input, rd) = RouteDistinguisher::parse_be(input)?;
        let (input, ve_id) = be_u16(input)?;
        let (input, ve_offset) = be_u16(input)?;
        let (input, ve_size) = be_u16(input)?;
        let (input, raw) = take(3usize).parse(input)?;
        let label_base = Label::from(raw).label;
        Ok((
            input,
            VplsNlri {
                rd,
                ve_id,
                ve_offset,
                ve_size,
                label_base,
            },
        ))
    }
}

impl fmt::Display for VplsNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vpls [{}] endpoint {} offset {} size {} base {}",
            self.rd, self.ve_id, self.ve_offset, self.ve_size, self.label_base
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vpls_block_roundtrip() {
        let nlri = VplsNlri {
            rd: RouteDistinguisher::As2 {
                asn: 64512,
                number: 100,
            },
            ve_id: 3,
            ve_offset: 0,
            ve_size: 8,
            label_base: 8000,
        };
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        assert_eq!(buf.len(), 19);
        let (rest, parsed) = VplsNlri::parse_nlri(&buf, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, nlri);
    }
}
