use bytes::BytesMut;

use crate::{
    BGP_HEADER_LEN, BGP_MSG_MAX, BGP_OPEN_MIN, BGP_UPDATE_MIN, MARKER, Message, Negotiated,
    Notification, NotifyError, Open, Operational, RouteRefresh, Update, keepalive_message,
    peek_message_length,
};

impl Message {
    /// Decode exactly one message from `input`, which must hold the
    /// complete frame (use [`peek_message_length`] to assemble it).
    /// Every failure carries the NOTIFICATION to send back.
    pub fn decode(input: &[u8], negotiated: &Negotiated) -> Result<Message, NotifyError> {
        if input.len() < BGP_HEADER_LEN as usize {
            return Err(NotifyError::bad_length(input.len() as u16));
        }
        if input[..16] != MARKER {
            return Err(NotifyError::bad_marker());
        }
        let length = peek_message_length(input);
        let typ = input[18];
        if length < BGP_HEADER_LEN as usize
            || length > negotiated.msg_size()
            || input.len() < length
        {
            return Err(NotifyError::bad_length(length as u16));
        }
        let frame = &input[..length];

        match typ {
            1 => {
                if length < BGP_OPEN_MIN as usize {
                    return Err(NotifyError::bad_length(length as u16));
                }
                let (_, open) = Open::parse_packet(frame)
                    .map_err(|_| NotifyError::bad_length(length as u16))?;
                open.validate()?;
                Ok(Message::Open(Box::new(open)))
            }
            2 => {
                if length < BGP_UPDATE_MIN as usize {
                    return Err(NotifyError::bad_length(length as u16));
                }
                let update = Update::decode(frame, negotiated)?;
                Ok(Message::Update(Box::new(update)))
            }
            3 => {
                let (_, notification) = Notification::parse_packet(frame)
                    .map_err(|_| NotifyError::bad_length(length as u16))?;
                Ok(Message::Notification(notification))
            }
            4 => {
                // KEEPALIVE is a bare header.
                if length != BGP_HEADER_LEN as usize {
                    return Err(NotifyError::bad_length(length as u16));
                }
                Ok(Message::Keepalive)
            }
            5 => {
                let (_, refresh) = RouteRefresh::parse_packet(frame)
                    .map_err(|_| NotifyError::bad_length(length as u16))?;
                Ok(Message::RouteRefresh(refresh))
            }
            6 => {
                let (_, operational) = Operational::parse_packet(frame)
                    .map_err(|_| NotifyError::bad_length(length as u16))?;
                Ok(Message::Operational(operational))
            }
            typ => Err(NotifyError::bad_type(typ)),
        }
    }

    pub fn encode(&self, negotiated: &Negotiated) -> Result<BytesMut, NotifyError> {
        match self {
            Message::Open(open) => Ok(open.encode()),
            Message::Update(update) => update.encode(negotiated),
            Message::Notification(notification) => Ok(notification.encode()),
            Message::Keepalive => Ok(keepalive_message()),
            Message::RouteRefresh(refresh) => Ok(refresh.encode()),
            Message::Operational(operational) => Ok(operational.encode()),
        }
    }
}

/// True once `buf` holds at least one complete frame. A message that
/// claims less than a header or more than the negotiated maximum is
/// reported through `decode` instead, so the reader does not stall.
pub fn frame_ready(buf: &[u8]) -> bool {
    if buf.len() < BGP_HEADER_LEN as usize {
        return false;
    }
    let length = peek_message_length(buf);
    length < BGP_HEADER_LEN as usize || buf.len() >= length
}

/// Upper bound for sizing read buffers.
pub fn read_chunk_hint(negotiated: &Negotiated) -> usize {
    negotiated.msg_size().max(BGP_MSG_MAX)
}
