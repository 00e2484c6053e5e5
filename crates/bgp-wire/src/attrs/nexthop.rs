use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use nom_derive::*;

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe};

/// NEXT_HOP carries an IPv4 address; other families put the next hop
/// inside MP_REACH_NLRI instead.
#[derive(Clone, Copy, NomBE, PartialEq, Eq, Hash)]
pub struct NextHop {
    pub nexthop: Ipv4Addr,
}

impl NextHop {
    pub fn new(nexthop: Ipv4Addr) -> Self {
        Self { nexthop }
    }
}

impl AttrEmit for NextHop {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::well_known()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::NextHop
    }

    fn attr_len(&self) -> Option<usize> {
        Some(4)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        buf.put(&self.nexthop.octets()[..]);
    }
}

impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nexthop)
    }
}

impl fmt::Debug for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NextHop: {}", self)
    }
}
