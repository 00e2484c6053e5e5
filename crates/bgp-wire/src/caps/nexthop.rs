use std::fmt;

use bytes::{BufMut, BytesMut};
use nom_derive::*;

use super::{CapCode, CapEmit};
use crate::{Afi, Safi};

/// One (AFI, SAFI, next-hop AFI) triple, RFC 8950.
#[derive(Debug, PartialEq, NomBE, Clone)]
pub struct ExtendedNexthopEntry {
    pub afi: Afi,
    pub safi: u16,
    pub nexthop_afi: Afi,
}

#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapExtendedNexthop {
    pub entries: Vec<ExtendedNexthopEntry>,
}

impl CapExtendedNexthop {
    pub fn push(&mut self, afi: Afi, safi: Safi, nexthop_afi: Afi) {
        self.entries.push(ExtendedNexthopEntry {
            afi,
            safi: u8::from(safi) as u16,
            nexthop_afi,
        });
    }
}

impl CapEmit for CapExtendedNexthop {
    fn code(&self) -> CapCode {
        CapCode::ExtendedNexthop
    }

    fn len(&self) -> u8 {
        (self.entries.len() * 6) as u8
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for val in self.entries.iter() {
            buf.put_u16(val.afi.into());
            buf.put_u16(val.safi);
            buf.put_u16(val.nexthop_afi.into());
        }
    }
}

impl fmt::Display for CapExtendedNexthop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtendedNexthop:")?;
        for e in self.entries.iter() {
            write!(f, " {}/{} via {}", e.afi, e.safi, e.nexthop_afi)?;
        }
        Ok(())
    }
}
