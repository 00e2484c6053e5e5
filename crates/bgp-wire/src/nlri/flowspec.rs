use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::error::{ErrorKind, make_error};
use nom::number::complete::be_u8;
use nom::{IResult, Parser};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::{Afi, ParseBe, RouteDistinguisher, nlri_psize};

/// Component type codes (RFC 8955 §4.2, RFC 8956 for flow-label).
pub mod component_type {
    pub const DST_PREFIX: u8 = 1;
    pub const SRC_PREFIX: u8 = 2;
    pub const IP_PROTOCOL: u8 = 3;
    pub const PORT: u8 = 4;
    pub const DST_PORT: u8 = 5;
    pub const SRC_PORT: u8 = 6;
    pub const ICMP_TYPE: u8 = 7;
    pub const ICMP_CODE: u8 = 8;
    pub const TCP_FLAGS: u8 = 9;
    pub const PACKET_LENGTH: u8 = 10;
    pub const DSCP: u8 = 11;
    pub const FRAGMENT: u8 = 12;
    pub const FLOW_LABEL: u8 = 13;
}

/// One (op, value) pair of a numeric component. The end-of-list bit is
/// an encoding artifact and is recomputed on emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericOp {
    /// AND with the previous pair (false means OR).
    pub and: bool,
    pub lt: bool,
    pub gt: bool,
    pub eq: bool,
    pub value: u64,
}

impl NumericOp {
    pub fn eq(value: u64) -> Self {
        Self {
            and: false,
            lt: false,
            gt: false,
            eq: true,
            value,
        }
    }

    pub fn range(low: u64, high: u64) -> [Self; 2] {
        [
            Self {
                and: false,
                lt: false,
                gt: true,
                eq: true,
                value: low,
            },
            Self {
                and: true,
                lt: true,
                gt: false,
                eq: true,
                value: high,
            },
        ]
    }

    fn value_len_code(value: u64) -> u8 {
        if value <= 0xff {
            0
        } else if value <= 0xffff {
            1
        } else if value <= 0xffff_ffff {
            2
        } else {
            3
        }
    }

    fn emit(&self, buf: &mut BytesMut, last: bool) {
        let len_code = Self::value_len_code(self.value);
        let op = ((last as u8) << 7)
            | ((self.and as u8) << 6)
            | (len_code << 4)
            | ((self.lt as u8) << 2)
            | ((self.gt as u8) << 1)
            | self.eq as u8;
        buf.put_u8(op);
        match len_code {
            0 => buf.put_u8(self.value as u8),
            1 => buf.put_u16(self.value as u16),
            2 => buf.put_u32(self.value as u32),
            _ => buf.put_u64(self.value),
        }
    }
}

/// One (op, value) pair of a bitmask component (tcp-flags, fragment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmaskOp {
    pub and: bool,
    pub not: bool,
    pub is_match: bool,
    pub value: u64,
}

impl BitmaskOp {
    pub fn any(value: u64) -> Self {
        Self {
            and: false,
            not: false,
            is_match: false,
            value,
        }
    }

    fn emit(&self, buf: &mut BytesMut, last: bool) {
        let len_code = NumericOp::value_len_code(self.value);
        let op = ((last as u8) << 7)
            | ((self.and as u8) << 6)
            | (len_code << 4)
            | ((self.not as u8) << 1)
            | self.is_match as u8;
        buf.put_u8(op);
        match len_code {
            0 => buf.put_u8(self.value as u8),
            1 => buf.put_u16(self.value as u16),
            2 => buf.put_u32(self.value as u32),
            _ => buf.put_u64(self.value),
        }
    }
}

fn parse_numeric_ops(mut input: &[u8]) -> IResult<&[u8], Vec<NumericOp>> {
    let mut ops = Vec::new();
    loop {
        let (rest, op) = be_u8(input)?;
        let len = 1usize << ((op >> 4) & 0x03);
        let (rest, raw) = take(len).parse(rest)?;
        let mut value: u64 = 0;
        for octet in raw {
            value = (value << 8) | *octet as u64;
        }
        ops.push(NumericOp {
            and: op & 0x40 != 0,
            lt: op & 0x04 != 0,
            gt: op & 0x02 != 0,
            eq: op & 0x01 != 0,
            value,
        });
        input = rest;
        if op & 0x80 != 0 {
            return Ok((input, ops));
        }
    }
}

fn parse_bitmask_ops(mut input: &[u8]) -> IResult<&[u8], Vec<BitmaskOp>> {
    let mut ops = Vec::new();
    loop {
        let (rest, op) = be_u8(input)?;
        let len = 1usize << ((op >> 4) & 0x03);
        let (rest, raw) = take(len).parse(rest)?;
        let mut value: u64 = 0;
        for octet in raw {
            value = (value << 8) | *octet as u64;
        }
        ops.push(BitmaskOp {
            and: op & 0x40 != 0,
            not: op & 0x02 != 0,
            is_match: op & 0x01 != 0,
            value,
        });
        input = rest;
        if op & 0x80 != 0 {
            return Ok((input, ops));
        }
    }
}

/// One typed filter component. The RFC requires components in
/// ascending type order inside an NLRI; `FlowspecNlri::new` sorts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowComponent {
    DstPrefix(IpNet),
    SrcPrefix(IpNet),
    IpProtocol(Vec<NumericOp>),
    Port(Vec<NumericOp>),
    DstPort(Vec<NumericOp>),
    SrcPort(Vec<NumericOp>),
    IcmpType(Vec<NumericOp>),
    IcmpCode(Vec<NumericOp>),
    TcpFlags(Vec<BitmaskOp>),
    PacketLength(Vec<NumericOp>),
    Dscp(Vec<NumericOp>),
    Fragment(Vec<BitmaskOp>),
    FlowLabel(Vec<NumericOp>),
}

impl FlowComponent {
    pub fn type_code(&self) -> u8 {
        use component_type::*;
        match self {
            FlowComponent::DstPrefix(_) => DST_PREFIX,
            FlowComponent::SrcPrefix(_) => SRC_PREFIX,
            FlowComponent::IpProtocol(_) => IP_PROTOCOL,
            FlowComponent::Port(_) => PORT,
            FlowComponent::DstPort(_) => DST_PORT,
            FlowComponent::SrcPort(_) => SRC_PORT,
            FlowComponent::IcmpType(_) => ICMP_TYPE,
            FlowComponent::IcmpCode(_) => ICMP_CODE,
            FlowComponent::TcpFlags(_) => TCP_FLAGS,
            FlowComponent::PacketLength(_) => PACKET_LENGTH,
            FlowComponent::Dscp(_) => DSCP,
            FlowComponent::Fragment(_) => FRAGMENT,
            FlowComponent::FlowLabel(_) => FLOW_LABEL,
        }
    }

    fn emit_prefix(buf: &mut BytesMut, prefix: &IpNet) {
        let plen = prefix.prefix_len();
        buf.put_u8(plen);
        if let IpNet::V6(_) = prefix {
            buf.put_u8(0); // offset (RFC 8956), always zero here
        }
        let psize = nlri_psize(plen);
        match prefix {
            IpNet::V4(net) => buf.put(&net.addr().octets()[..psize]),
            IpNet::V6(net) => buf.put(&net.addr().octets()[..psize]),
        }
    }

    fn emit_numeric(buf: &mut BytesMut, ops: &[NumericOp]) {
        for (i, op) in ops.iter().enumerate() {
            op.emit(buf, i + 1 == ops.len());
        }
    }

    fn emit_bitmask(buf: &mut BytesMut, ops: &[BitmaskOp]) {
        for (i, op) in ops.iter().enumerate() {
            op.emit(buf, i + 1 == ops.len());
        }
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        buf.put_u8(self.type_code());
        match self {
            FlowComponent::DstPrefix(prefix) | FlowComponent::SrcPrefix(prefix) => {
                Self::emit_prefix(buf, prefix)
            }
            FlowComponent::IpProtocol(ops)
            | FlowComponent::Port(ops)
            | FlowComponent::DstPort(ops)
            | FlowComponent::SrcPort(ops)
            | FlowComponent::IcmpType(ops)
            | FlowComponent::IcmpCode(ops)
            | FlowComponent::PacketLength(ops)
            | FlowComponent::Dscp(ops)
            | FlowComponent::FlowLabel(ops) => Self::emit_numeric(buf, ops),
            FlowComponent::TcpFlags(ops) | FlowComponent::Fragment(ops) => {
                Self::emit_bitmask(buf, ops)
            }
        }
    }

    fn parse_prefix(input: &[u8], afi: Afi) -> IResult<&[u8], IpNet> {
        let (input, plen) = be_u8(input)?;
        let (input, _offset) = if afi == Afi::Ipv6 {
            be_u8(input)?
        } else {
            (input, 0)
        };
        let psize = nlri_psize(plen);
        if input.len() < psize {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let prefix = match afi {
            Afi::Ipv4 => {
                if plen > 32 {
                    return Err(nom::Err::Error(make_error(input, ErrorKind::Verify)));
                }
                let mut addr = [0u8; 4];
                addr[..psize].copy_from_slice(&input[..psize]);
                IpNet::V4(
                    Ipv4Net::new(Ipv4Addr::from(addr), plen)
                        .map_err(|_| nom::Err::Error(make_error(input, ErrorKind::Verify)))?,
                )
            }
            _ => {
                if plen > 128 {
                    return Err(nom::Err::Error(make_error(input, ErrorKind::Verify)));
                }
                let mut addr = [0u8; 16];
                addr[..psize].copy_from_slice(&input[..psize]);
                IpNet::V6(
                    Ipv6Net::new(Ipv6Addr::from(addr), plen)
                        .map_err(|_| nom::Err::Error(make_error(input, ErrorKind::Verify)))?,
                )
            }
        };
        let (input, _) = take(psize).parse(input)?;
        Ok((input, prefix))
    }

    pub fn parse_afi(input: &[u8], afi: Afi) -> IResult<&[u8], FlowComponent> {
        use component_type::*;
        let (input, typ) = be_u8(input)?;
        match typ {
            DST_PREFIX => {
                let (input, prefix) = Self::parse_prefix(input, afi)?;
                Ok((input, FlowComponent::DstPrefix(prefix)))
            }
            SRC_PREFIX => {
                let (input, prefix) = Self::parse_prefix(input, afi)?;
                Ok((input, FlowComponent::SrcPrefix(prefix)))
            }
            IP_PROTOCOL => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::IpProtocol(ops)))
            }
            PORT => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::Port(ops)))
            }
            DST_PORT => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::DstPort(ops)))
            }
            SRC_PORT => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::SrcPort(ops)))
            }
            ICMP_TYPE => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::IcmpType(ops)))
            }
            ICMP_CODE => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::IcmpCode(ops)))
            }
            TCP_FLAGS => {
                let (input, ops) = parse_bitmask_ops(input)?;
                Ok((input, FlowComponent::TcpFlags(ops)))
            }
            PACKET_LENGTH => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::PacketLength(ops)))
            }
            DSCP => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::Dscp(ops)))
            }
            FRAGMENT => {
                let (input, ops) = parse_bitmask_ops(input)?;
                Ok((input, FlowComponent::Fragment(ops)))
            }
            FLOW_LABEL => {
                let (input, ops) = parse_numeric_ops(input)?;
                Ok((input, FlowComponent::FlowLabel(ops)))
            }
            _ => Err(nom::Err::Error(make_error(input, ErrorKind::NoneOf))),
        }
    }
}

/// A flow-spec NLRI: its own length octet (two when ≥ 0xf0), an
/// optional RD for the VPN SAFI, then ordered components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowspecNlri {
    pub rd: Option<RouteDistinguisher>,
    pub components: Vec<FlowComponent>,
}

impl FlowspecNlri {
    pub fn new(mut components: Vec<FlowComponent>) -> Self {
        components.sort_by_key(|c| c.type_code());
        Self {
            rd: None,
            components,
        }
    }

    pub fn with_rd(rd: RouteDistinguisher, components: Vec<FlowComponent>) -> Self {
        let mut nlri = Self::new(components);
        nlri.rd = Some(rd);
        nlri
    }

    pub fn parse_afi(input: &[u8], afi: Afi, vpn: bool) -> IResult<&[u8], FlowspecNlri> {
        let (input, first) = be_u8(input)?;
        let (input, length) = if first >= 0xf0 {
            let (input, second) = be_u8(input)?;
            (input, (((first as usize) & 0x0f) << 8) | second as usize)
        } else {
            (input, first as usize)
        };
        if input.len() < length {
            return Err(nom::Err::Error(make_error(input, ErrorKind::Eof)));
        }
        let (mut body, input) = input.split_at(length);
        let rd = if vpn {
            let (rest, rd) = RouteDistinguisher::parse_be(body)?;
            body = rest;
            Some(rd)
        } else {
            None
        };
        let mut components = Vec::new();
        while !body.is_empty() {
            let (rest, component) = FlowComponent::parse_afi(body, afi)?;
            components.push(component);
            body = rest;
        }
        Ok((input, FlowspecNlri { rd, components }))
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        let mut body = BytesMut::new();
        if let Some(rd) = &self.rd {
            rd.emit(&mut body);
        }
        for component in self.components.iter() {
            component.emit(&mut body);
        }
        if body.len() < 0xf0 {
            buf.put_u8(body.len() as u8);
        } else {
            buf.put_u8(0xf0 | ((body.len() >> 8) as u8 & 0x0f));
            buf.put_u8(body.len() as u8);
        }
        buf.put(&body[..]);
    }
}

impl fmt::Display for FlowspecNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow")?;
        if let Some(rd) = &self.rd {
            write!(f, " rd {}", rd)?;
        }
        for component in self.components.iter() {
            match component {
                FlowComponent::DstPrefix(p) => write!(f, " destination {}", p)?,
                FlowComponent::SrcPrefix(p) => write!(f, " source {}", p)?,
                other => write!(f, " component-{}", other.type_code())?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_match_bytes() {
        // destination 10.0.1.0/24, destination-port == 80
        let nlri = FlowspecNlri::new(vec![
            FlowComponent::DstPort(vec![NumericOp::eq(80)]),
            FlowComponent::DstPrefix("10.0.1.0/24".parse().unwrap()),
        ]);
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        assert_eq!(
            &buf[..],
            &[0x08, 0x01, 0x18, 0x0a, 0x00, 0x01, 0x05, 0x81, 0x50][..]
        );

        let (rest, parsed) = FlowspecNlri::parse_afi(&buf, Afi::Ipv4, false).unwrap();
        assert!(rest.is_empty());
        // Construction sorted the components into type order.
        assert_eq!(parsed, nlri);
    }

    #[test]
    fn two_octet_length_form() {
        // 61 single-byte ranges of ports pushes the body over 0xf0.
        let ops: Vec<NumericOp> = (0..121).map(|i| NumericOp::eq(i as u64)).collect();
        let nlri = FlowspecNlri::new(vec![
            FlowComponent::Port(ops),
            FlowComponent::DstPrefix("10.0.0.0/8".parse().unwrap()),
        ]);
        let mut buf = BytesMut::new();
        nlri.emit(&mut buf);
        assert!(buf[0] >= 0xf0);
        let (rest, parsed) = FlowspecNlri::parse_afi(&buf, Afi::Ipv4, false).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, nlri);
    }
}
