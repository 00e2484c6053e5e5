use std::fmt;

use nom_derive::*;

use super::{CapCode, CapEmit};

/// Extended message support, RFC 8654.
#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapExtendedMessage {}

impl CapEmit for CapExtendedMessage {
    fn code(&self) -> CapCode {
        CapCode::ExtendedMessage
    }
}

impl fmt::Display for CapExtendedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extended Message")
    }
}
