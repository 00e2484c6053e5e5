use bytes::{BufMut, BytesMut};
use nom_derive::*;

use crate::{Notification, Open, Operational, RouteRefresh, Update};

/// Default maximum message size (RFC 4271).
pub const BGP_MSG_MAX: usize = 4096;
/// Maximum message size when the extended-message capability is
/// negotiated on both sides (RFC 8654).
pub const BGP_MSG_MAX_EXTENDED: usize = 65535;
pub const BGP_HEADER_LEN: u16 = 19;
/// Smallest legal OPEN (header + version/asn/hold/id/opt-len).
pub const BGP_OPEN_MIN: u16 = 29;
/// Smallest legal UPDATE (header + two zero length fields).
pub const BGP_UPDATE_MIN: u16 = 23;

pub const MARKER: [u8; 16] = [0xff; 16];

#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, NomBE)]
pub enum MessageType {
    Open = 1,
    Update = 2,
    Notification = 3,
    Keepalive = 4,
    RouteRefresh = 5,
    Operational = 6,
}

#[derive(Debug, Clone, PartialEq, NomBE)]
pub struct Header {
    pub marker: [u8; 16],
    pub length: u16,
    pub typ: MessageType,
}

impl Header {
    pub fn new(typ: MessageType, length: u16) -> Self {
        Self {
            marker: MARKER,
            length,
            typ,
        }
    }

    pub fn emit(&self, buf: &mut BytesMut) {
        buf.put(&self.marker[..]);
        buf.put_u16(self.length);
        buf.put_u8(self.typ as u8);
    }
}

/// Back-patch the length field of a message being built in `buf`.
pub fn patch_length(buf: &mut BytesMut) {
    const LENGTH_POS: std::ops::Range<usize> = 16..18;
    let length = buf.len() as u16;
    buf[LENGTH_POS].copy_from_slice(&length.to_be_bytes());
}

/// A decoded BGP message. The raw wire bytes are kept by the session
/// layer, not here; the codec is stateless.
#[derive(Debug)]
pub enum Message {
    Open(Box<Open>),
    Update(Box<Update>),
    Notification(Notification),
    Keepalive,
    RouteRefresh(RouteRefresh),
    Operational(Operational),
}

impl Message {
    pub fn typ(&self) -> MessageType {
        match self {
            Message::Open(_) => MessageType::Open,
            Message::Update(_) => MessageType::Update,
            Message::Notification(_) => MessageType::Notification,
            Message::Keepalive => MessageType::Keepalive,
            Message::RouteRefresh(_) => MessageType::RouteRefresh,
            Message::Operational(_) => MessageType::Operational,
        }
    }
}

/// Read the total message length out of a partial buffer, 0 if the
/// header has not fully arrived yet.
pub fn peek_message_length(input: &[u8]) -> usize {
    if let Some(len) = input.get(16..18) {
        u16::from_be_bytes(len.try_into().unwrap()) as usize
    } else {
        0
    }
}

pub fn keepalive_message() -> BytesMut {
    let mut buf = BytesMut::with_capacity(BGP_HEADER_LEN as usize);
    Header::new(MessageType::Keepalive, BGP_HEADER_LEN).emit(&mut buf);
    buf
}
