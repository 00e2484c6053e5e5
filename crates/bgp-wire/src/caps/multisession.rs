use std::fmt;

use nom_derive::*;

use super::{CapCode, CapEmit};

/// Multi-session. Two codepoints exist in the wild; we advertise the
/// IANA one and accept both.
#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapMultiSession {}

impl CapEmit for CapMultiSession {
    fn code(&self) -> CapCode {
        CapCode::MultiSession
    }
}

impl fmt::Display for CapMultiSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultiSession")
    }
}
