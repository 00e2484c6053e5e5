use std::fmt;

use nom_derive::*;

use super::{CapCode, CapEmit};

/// Operational message support (draft-ietf-idr-operational-message).
#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapOperational {}

impl CapEmit for CapOperational {
    fn code(&self) -> CapCode {
        CapCode::Operational
    }
}

impl fmt::Display for CapOperational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operational")
    }
}
