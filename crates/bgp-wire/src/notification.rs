use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::{IResult, Parser};
use nom_derive::*;
use serde::Serialize;

use crate::{BGP_HEADER_LEN, Header, MessageType, patch_length};

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifyCode {
    MessageHeaderError = 1,
    OpenMessageError = 2,
    UpdateMessageError = 3,
    HoldTimerExpired = 4,
    FsmError = 5,
    Cease = 6,
    RouteRefreshError = 7,
    Unknown(u8),
}

impl From<NotifyCode> for u8 {
    fn from(code: NotifyCode) -> Self {
        use NotifyCode::*;
        match code {
            MessageHeaderError => 1,
            OpenMessageError => 2,
            UpdateMessageError => 3,
            HoldTimerExpired => 4,
            FsmError => 5,
            Cease => 6,
            RouteRefreshError => 7,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for NotifyCode {
    fn from(code: u8) -> Self {
        use NotifyCode::*;
        match code {
            1 => MessageHeaderError,
            2 => OpenMessageError,
            3 => UpdateMessageError,
            4 => HoldTimerExpired,
            5 => FsmError,
            6 => Cease,
            7 => RouteRefreshError,
            v => Unknown(v),
        }
    }
}

impl NotifyCode {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, code) = be_u8(input)?;
        Ok((input, code.into()))
    }
}

impl fmt::Display for NotifyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NotifyCode::*;
        let name = match self {
            MessageHeaderError => "Message Header Error",
            OpenMessageError => "OPEN Message Error",
            UpdateMessageError => "UPDATE Message Error",
            HoldTimerExpired => "Hold Timer Expired",
            FsmError => "Finite State Machine Error",
            Cease => "Cease",
            RouteRefreshError => "ROUTE-REFRESH Message Error",
            Unknown(v) => return write!(f, "Unknown({v})"),
        };
        write!(f, "{name}")
    }
}

/// Message Header Error subcodes (RFC 4271).
pub mod header_error {
    pub const NOT_SYNCHRONIZED: u8 = 1;
    pub const BAD_MESSAGE_LENGTH: u8 = 2;
    pub const BAD_MESSAGE_TYPE: u8 = 3;
}

/// OPEN Message Error subcodes.
pub mod open_error {
    pub const UNSUPPORTED_VERSION: u8 = 1;
    pub const BAD_PEER_AS: u8 = 2;
    pub const BAD_BGP_IDENTIFIER: u8 = 3;
    pub const UNSUPPORTED_OPTIONAL_PARAMETER: u8 = 4;
    pub const UNACCEPTABLE_HOLD_TIME: u8 = 6;
    pub const UNSUPPORTED_CAPABILITY: u8 = 7;
}

/// UPDATE Message Error subcodes.
pub mod update_error {
    pub const MALFORMED_ATTRIBUTE_LIST: u8 = 1;
    pub const UNRECOGNIZED_WELLKNOWN_ATTRIBUTE: u8 = 2;
    pub const MISSING_WELLKNOWN_ATTRIBUTE: u8 = 3;
    pub const ATTRIBUTE_FLAGS_ERROR: u8 = 4;
    pub const ATTRIBUTE_LENGTH_ERROR: u8 = 5;
    pub const INVALID_ORIGIN: u8 = 6;
    pub const INVALID_NEXTHOP: u8 = 8;
    pub const OPTIONAL_ATTRIBUTE_ERROR: u8 = 9;
    pub const INVALID_NETWORK_FIELD: u8 = 10;
    pub const MALFORMED_AS_PATH: u8 = 11;
}

/// FSM Error subcodes (RFC 6608).
pub mod fsm_error {
    pub const UNEXPECTED_IN_OPENSENT: u8 = 1;
    pub const UNEXPECTED_IN_OPENCONFIRM: u8 = 2;
    pub const UNEXPECTED_IN_ESTABLISHED: u8 = 3;
}

/// Cease subcodes (RFC 4486).
pub mod cease {
    pub const MAX_PREFIXES: u8 = 1;
    pub const ADMINISTRATIVE_SHUTDOWN: u8 = 2;
    pub const PEER_DECONFIGURED: u8 = 3;
    pub const ADMINISTRATIVE_RESET: u8 = 4;
    pub const CONNECTION_REJECTED: u8 = 5;
    pub const OTHER_CONFIGURATION_CHANGE: u8 = 6;
    pub const COLLISION_RESOLUTION: u8 = 7;
    pub const OUT_OF_RESOURCES: u8 = 8;
}

pub fn subcode_str(code: NotifyCode, subcode: u8) -> &'static str {
    use NotifyCode::*;
    match (code, subcode) {
        (MessageHeaderError, 1) => "Connection Not Synchronized",
        (MessageHeaderError, 2) => "Bad Message Length",
        (MessageHeaderError, 3) => "Bad Message Type",
        (OpenMessageError, 1) => "Unsupported Version Number",
        (OpenMessageError, 2) => "Bad Peer AS",
        (OpenMessageError, 3) => "Bad BGP Identifier",
        (OpenMessageError, 4) => "Unsupported Optional Parameter",
        (OpenMessageError, 6) => "Unacceptable Hold Time",
        (OpenMessageError, 7) => "Unsupported Capability",
        (UpdateMessageError, 1) => "Malformed Attribute List",
        (UpdateMessageError, 2) => "Unrecognized Well-known Attribute",
        (UpdateMessageError, 3) => "Missing Well-known Attribute",
        (UpdateMessageError, 4) => "Attribute Flags Error",
        (UpdateMessageError, 5) => "Attribute Length Error",
        (UpdateMessageError, 6) => "Invalid ORIGIN Attribute",
        (UpdateMessageError, 8) => "Invalid NEXT_HOP Attribute",
        (UpdateMessageError, 9) => "Optional Attribute Error",
        (UpdateMessageError, 10) => "Invalid Network Field",
        (UpdateMessageError, 11) => "Malformed AS_PATH",
        (HoldTimerExpired, _) => "Hold Timer Expired",
        (FsmError, 1) => "Unexpected Message in OpenSent",
        (FsmError, 2) => "Unexpected Message in OpenConfirm",
        (FsmError, 3) => "Unexpected Message in Established",
        (Cease, 1) => "Maximum Number of Prefixes Reached",
        (Cease, 2) => "Administrative Shutdown",
        (Cease, 3) => "Peer De-configured",
        (Cease, 4) => "Administrative Reset",
        (Cease, 5) => "Connection Rejected",
        (Cease, 6) => "Other Configuration Change",
        (Cease, 7) => "Connection Collision Resolution",
        (Cease, 8) => "Out of Resources",
        (RouteRefreshError, 1) => "Invalid Message Length",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub code: NotifyCode,
    pub subcode: u8,
    pub data: Vec<u8>,
}

impl Notification {
    pub fn new(code: NotifyCode, subcode: u8, data: Vec<u8>) -> Self {
        Self {
            code,
            subcode,
            data,
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        Header::new(MessageType::Notification, BGP_HEADER_LEN).emit(&mut buf);
        buf.put_u8(self.code.into());
        buf.put_u8(self.subcode);
        buf.put(&self.data[..]);
        patch_length(&mut buf);
        buf
    }

    pub fn parse_packet(input: &[u8]) -> IResult<&[u8], Notification> {
        let (input, header) = Header::parse_be(input)?;
        let (input, code) = NotifyCode::parse_be(input)?;
        let (input, subcode) = be_u8(input)?;
        let len = header.length - BGP_HEADER_LEN - 2;
        let (input, data) = take(len as usize).parse(input)?;
        Ok((
            input,
            Notification {
                code,
                subcode,
                data: data.to_vec(),
            },
        ))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {}",
            self.code,
            subcode_str(self.code, self.subcode)
        )
    }
}
