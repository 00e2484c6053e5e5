use std::fmt;

use bytes::BytesMut;
use nom::{IResult, Parser};
use nom_derive::*;

use super::*;
use crate::many0_complete;

#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapabilityHeader {
    pub code: u8,
    pub length: u8,
}

/// One capability TLV as carried inside an OPEN optional parameter.
#[derive(Debug, PartialEq, Clone, NomBE)]
#[nom(Selector = "CapCode")]
pub enum Capability {
    #[nom(Selector = "CapCode::MultiProtocol")]
    MultiProtocol(CapMultiProtocol),
    #[nom(Selector = "CapCode::RouteRefresh")]
    RouteRefresh(CapRefresh),
    #[nom(Selector = "CapCode::ExtendedNexthop")]
    ExtendedNexthop(CapExtendedNexthop),
    #[nom(Selector = "CapCode::ExtendedMessage")]
    ExtendedMessage(CapExtendedMessage),
    #[nom(Selector = "CapCode::Operational")]
    Operational(CapOperational),
    #[nom(Selector = "CapCode::GracefulRestart")]
    GracefulRestart(CapGracefulRestart),
    #[nom(Selector = "CapCode::As4")]
    As4(CapAs4),
    #[nom(Selector = "CapCode::MultiSession")]
    MultiSession(CapMultiSession),
    #[nom(Selector = "CapCode::AddPath")]
    AddPath(CapAddPath),
    #[nom(Selector = "CapCode::EnhancedRouteRefresh")]
    EnhancedRouteRefresh(CapEnhancedRefresh),
    #[nom(Selector = "CapCode::Llgr")]
    Llgr(CapLlgr),
    #[nom(Selector = "CapCode::RouteRefreshCisco")]
    RouteRefreshCisco(CapRefreshCisco),
    #[nom(Selector = "CapCode::MultiSessionCisco")]
    MultiSessionCisco(CapMultiSession),
    #[nom(Selector = "_")]
    Unknown(CapUnknown),
}

impl Capability {
    /// Parse one capability TLV. Unknown codes are preserved, not
    /// rejected (RFC 5492).
    pub fn parse_cap(input: &[u8]) -> IResult<&[u8], Capability> {
        let (input, header) = CapabilityHeader::parse_be(input)?;
        if input.len() < header.length as usize {
            return Err(nom::Err::Incomplete(nom::Needed::new(
                header.length as usize - input.len(),
            )));
        }
        let (value, input) = input.split_at(header.length as usize);
        let code: CapCode = header.code.into();
        let cap = match code {
            CapCode::Unknown(code) => Capability::Unknown(CapUnknown {
                code,
                data: value.to_vec(),
            }),
            _ => {
                let (_, cap) = Capability::parse_be(value, code)?;
                cap
            }
        };
        Ok((input, cap))
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        match self {
            Self::MultiProtocol(m) => m.emit(buf),
            Self::RouteRefresh(m) => m.emit(buf),
            Self::ExtendedNexthop(m) => m.emit(buf),
            Self::ExtendedMessage(m) => m.emit(buf),
            Self::Operational(m) => m.emit(buf),
            Self::GracefulRestart(m) => m.emit(buf),
            Self::As4(m) => m.emit(buf),
            Self::MultiSession(m) => m.emit(buf),
            Self::AddPath(m) => m.emit(buf),
            Self::EnhancedRouteRefresh(m) => m.emit(buf),
            Self::Llgr(m) => m.emit(buf),
            Self::RouteRefreshCisco(m) => m.emit(buf),
            Self::MultiSessionCisco(m) => m.emit(buf),
            Self::Unknown(m) => m.emit(buf),
        }
    }
}

/// Parse one OPEN optional parameter, which may hold several capability
/// TLVs (RFC 5492 allows both one-per-parameter and packed forms).
pub fn parse_capability_param(input: &[u8]) -> IResult<&[u8], Vec<Capability>> {
    let (input, header) = CapabilityHeader::parse_be(input)?;
    if input.len() < header.length as usize {
        return Err(nom::Err::Incomplete(nom::Needed::new(
            header.length as usize - input.len(),
        )));
    }
    let (caps, input) = input.split_at(header.length as usize);
    let (_, caps) = many0_complete(Capability::parse_cap).parse(caps)?;
    Ok((input, caps))
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiProtocol(v) => write!(f, "{}", v),
            Self::RouteRefresh(v) => write!(f, "{}", v),
            Self::ExtendedNexthop(v) => write!(f, "{}", v),
            Self::ExtendedMessage(v) => write!(f, "{}", v),
            Self::Operational(v) => write!(f, "{}", v),
            Self::GracefulRestart(v) => write!(f, "{}", v),
            Self::As4(v) => write!(f, "{}", v),
            Self::MultiSession(v) => write!(f, "{}", v),
            Self::AddPath(v) => write!(f, "{}", v),
            Self::EnhancedRouteRefresh(v) => write!(f, "{}", v),
            Self::Llgr(v) => write!(f, "{}", v),
            Self::RouteRefreshCisco(v) => write!(f, "{}", v),
            Self::MultiSessionCisco(v) => write!(f, "{}", v),
            Self::Unknown(v) => write!(f, "{}", v),
        }
    }
}
