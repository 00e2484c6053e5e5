use std::net::{Ipv4Addr, Ipv6Addr};

use nom::IResult;
use nom::number::complete::{be_u32, be_u128};

/// Big-endian parser entry point for hand-written parsers. Types derived
/// with `NomBE` get an equivalent inherent method from the derive.
pub trait ParseBe<T> {
    fn parse_be(input: &[u8]) -> IResult<&[u8], T>;
}

/// NLRI parsers additionally need to know whether a 4-octet path-id
/// precedes each entry (negotiated add-path).
pub trait ParseNlri<T> {
    fn parse_nlri(input: &[u8], add_path: bool) -> IResult<&[u8], T>;
}

impl ParseBe<Ipv4Addr> for Ipv4Addr {
    fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, addr) = be_u32(input)?;
        Ok((input, Self::from(addr)))
    }
}

impl ParseBe<Ipv6Addr> for Ipv6Addr {
    fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, addr) = be_u128(input)?;
        Ok((input, Self::from(addr)))
    }
}
