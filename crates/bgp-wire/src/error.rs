use thiserror::Error;

use crate::{NotifyCode, header_error, open_error, update_error};

/// A decode failure, carrying the RFC-mandated NOTIFICATION
/// (code, subcode, data) the session must send before tearing down.
/// The codec never silently discards bytes: every parse path that gives
/// up produces one of these.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code} / {subcode}")]
pub struct NotifyError {
    pub code: NotifyCode,
    pub subcode: u8,
    pub data: Vec<u8>,
}

impl NotifyError {
    pub fn new(code: NotifyCode, subcode: u8, data: Vec<u8>) -> Self {
        Self {
            code,
            subcode,
            data,
        }
    }

    pub fn bad_marker() -> Self {
        Self::new(
            NotifyCode::MessageHeaderError,
            header_error::NOT_SYNCHRONIZED,
            Vec::new(),
        )
    }

    pub fn bad_length(length: u16) -> Self {
        Self::new(
            NotifyCode::MessageHeaderError,
            header_error::BAD_MESSAGE_LENGTH,
            length.to_be_bytes().to_vec(),
        )
    }

    pub fn bad_type(typ: u8) -> Self {
        Self::new(
            NotifyCode::MessageHeaderError,
            header_error::BAD_MESSAGE_TYPE,
            vec![typ],
        )
    }

    pub fn open(subcode: u8) -> Self {
        Self::new(NotifyCode::OpenMessageError, subcode, Vec::new())
    }

    pub fn unsupported_version(ours: u8) -> Self {
        Self::new(
            NotifyCode::OpenMessageError,
            open_error::UNSUPPORTED_VERSION,
            (ours as u16).to_be_bytes().to_vec(),
        )
    }

    pub fn update(subcode: u8) -> Self {
        Self::new(NotifyCode::UpdateMessageError, subcode, Vec::new())
    }

    pub fn update_data(subcode: u8, data: Vec<u8>) -> Self {
        Self::new(NotifyCode::UpdateMessageError, subcode, data)
    }

    pub fn malformed_attributes() -> Self {
        Self::update(update_error::MALFORMED_ATTRIBUTE_LIST)
    }

    pub fn attribute_flags(raw: Vec<u8>) -> Self {
        Self::update_data(update_error::ATTRIBUTE_FLAGS_ERROR, raw)
    }

    pub fn attribute_length(raw: Vec<u8>) -> Self {
        Self::update_data(update_error::ATTRIBUTE_LENGTH_ERROR, raw)
    }

    pub fn invalid_network_field() -> Self {
        Self::update(update_error::INVALID_NETWORK_FIELD)
    }

    pub fn malformed_as_path() -> Self {
        Self::update(update_error::MALFORMED_AS_PATH)
    }
}

/// Internal nom failures surface as the closest RFC error for the layer
/// that ran the parser; UPDATE parsing owns the common case.
impl From<nom::Err<nom::error::Error<&[u8]>>> for NotifyError {
    fn from(_: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        NotifyError::malformed_attributes()
    }
}
