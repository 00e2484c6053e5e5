use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use nom::{IResult, Parser};
use nom_derive::*;

use crate::{
    BGP_HEADER_LEN, CapabilitySet, Header, MessageType, NotifyError, many0_complete, open_error,
    parse_capability_param, patch_length,
};

pub const BGP_VERSION: u8 = 4;

#[derive(Debug, PartialEq, NomBE)]
pub struct Open {
    pub version: u8,
    pub asn: u16,
    pub hold_time: u16,
    pub bgp_id: [u8; 4],
    pub opt_param_len: u8,
    #[nom(Ignore)]
    pub caps: CapabilitySet,
}

/// RFC 9072 extended optional parameters: a 255 length escapes into a
/// one-octet type (255) plus a two-octet real length.
#[derive(Debug, PartialEq, NomBE)]
struct OpenExtended {
    non_ext_op_type: u8,
    ext_opt_parm_len: u16,
}

impl Open {
    pub fn new(asn: u16, hold_time: u16, router_id: Ipv4Addr, caps: CapabilitySet) -> Self {
        Self {
            version: BGP_VERSION,
            asn,
            hold_time,
            bgp_id: router_id.octets(),
            opt_param_len: 0,
            caps,
        }
    }

    pub fn router_id(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.bgp_id)
    }

    /// The peer's AS, honoring the 4-octet capability when present.
    pub fn peer_asn(&self) -> u32 {
        if let Some(as4) = &self.caps.as4 {
            as4.asn
        } else {
            self.asn as u32
        }
    }

    /// Validate the RFC 4271 §6.2 constraints the codec can check
    /// without session context.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.version != BGP_VERSION {
            return Err(NotifyError::unsupported_version(BGP_VERSION));
        }
        if self.hold_time != 0 && self.hold_time < 3 {
            return Err(NotifyError::open(open_error::UNACCEPTABLE_HOLD_TIME));
        }
        if self.bgp_id == [0, 0, 0, 0] {
            return Err(NotifyError::open(open_error::BAD_BGP_IDENTIFIER));
        }
        Ok(())
    }

    pub fn parse_packet(input: &[u8]) -> IResult<&[u8], Open> {
        let (input, _header) = Header::parse_be(input)?;
        let (input, mut open) = Open::parse_be(input)?;
        let (input, len) = if open.opt_param_len == 255 {
            let (input, ext) = OpenExtended::parse_be(input)?;
            if ext.non_ext_op_type != 255 {
                return Err(nom::Err::Error(nom::error::make_error(
                    input,
                    nom::error::ErrorKind::Tag,
                )));
            }
            (input, ext.ext_opt_parm_len)
        } else {
            (input, open.opt_param_len as u16)
        };
        if input.len() < len as usize {
            return Err(nom::Err::Error(nom::error::make_error(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        }
        let (params, input) = input.split_at(len as usize);
        let (_, caps) = many0_complete(parse_capability_param).parse(params)?;
        open.caps = CapabilitySet::collate(caps);
        Ok((input, open))
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        Header::new(MessageType::Open, BGP_HEADER_LEN).emit(&mut buf);
        buf.put_u8(self.version);
        buf.put_u16(self.asn);
        buf.put_u16(self.hold_time);
        buf.put(&self.bgp_id[..]);

        let mut params = BytesMut::new();
        self.caps.emit(&mut params);

        if params.len() < 255 {
            buf.put_u8(params.len() as u8);
        } else {
            buf.put_u8(255u8);
            buf.put_u8(255u8);
            buf.put_u16(params.len() as u16);
        }
        buf.put(&params[..]);
        patch_length(&mut buf);
        buf
    }
}

impl fmt::Display for Open {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Open: version {} asn {} hold {} id {}",
            self.version,
            self.asn,
            self.hold_time,
            self.router_id()
        )?;
        write!(f, "{}", self.caps)
    }
}
