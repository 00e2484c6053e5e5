use std::fmt;

use bitfield_struct::bitfield;
use bytes::{BufMut, BytesMut};
use nom_derive::*;
use serde::{Deserialize, Serialize};

use super::{CapCode, CapEmit};
use crate::{Afi, Safi};

#[bitfield(u16, debug = true)]
#[derive(Serialize, Deserialize, PartialEq, NomBE)]
pub struct RestartFlagTime {
    #[bits(12)]
    pub restart_time: u16,
    #[bits(2)]
    pub resvd: u8,
    pub notification: bool,
    pub restart_state: bool,
}

#[bitfield(u8, debug = true)]
#[derive(Serialize, Deserialize, PartialEq, NomBE)]
pub struct RestartFlags {
    #[bits(7)]
    pub resvd: u8,
    pub forwarding: bool,
}

#[derive(Debug, PartialEq, Clone, NomBE)]
pub struct RestartFamily {
    pub afi: Afi,
    pub safi: Safi,
    pub flags: RestartFlags,
}

/// Graceful restart, RFC 4724. The restart-state bit is set by a
/// restarting speaker on its first OPEN after the restart.
#[derive(Debug, Default, PartialEq, NomBE, Clone)]
pub struct CapGracefulRestart {
    pub flag_time: RestartFlagTime,
    pub families: Vec<RestartFamily>,
}

impl CapGracefulRestart {
    pub fn new(restart_time: u16) -> Self {
        Self {
            flag_time: RestartFlagTime::new().with_restart_time(restart_time),
            families: Vec::new(),
        }
    }

    pub fn restart_time(&self) -> u16 {
        self.flag_time.restart_time()
    }
}

impl CapEmit for CapGracefulRestart {
    fn code(&self) -> CapCode {
        CapCode::GracefulRestart
    }

    fn len(&self) -> u8 {
        (2 + self.families.len() * 4) as u8
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put_u16(self.flag_time.into());
        for val in self.families.iter() {
            buf.put_u16(val.afi.into());
            buf.put_u8(val.safi.into());
            buf.put_u8(val.flags.into());
        }
    }
}

impl fmt::Display for CapGracefulRestart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GracefulRestart: time {} R:{}",
            self.flag_time.restart_time(),
            self.flag_time.restart_state(),
        )?;
        for value in self.families.iter() {
            write!(
                f,
                " {}/{} F:{}",
                value.afi,
                value.safi,
                value.flags.forwarding()
            )?;
        }
        Ok(())
    }
}
