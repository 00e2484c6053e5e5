use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use nom_derive::*;

use crate::{AttrCode, AttrEmit, AttrFlags};

/// One large community: three 4-octet words (RFC 8092).
#[derive(Clone, Copy, Debug, NomBE, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LargeCommunityValue {
    pub global: u32,
    pub local1: u32,
    pub local2: u32,
}

#[derive(Clone, Debug, Default, NomBE, PartialEq, Eq, Hash)]
pub struct LargeCommunity(pub Vec<LargeCommunityValue>);

impl AttrEmit for LargeCommunity {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::LargeCommunity
    }

    fn attr_len(&self) -> Option<usize> {
        Some(self.0.len() * 12)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for value in self.0.iter() {
            buf.put_u32(value.global);
            buf.put_u32(value.local1);
            buf.put_u32(value.local2);
        }
    }
}

impl fmt::Display for LargeCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| format!("{}:{}:{}", x.global, x.local1, x.local2))
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}

impl FromStr for LargeCommunity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut values = Vec::new();
        for part in s.split_whitespace() {
            let mut words = part.split(':');
            let global = words.next().ok_or(())?.parse().map_err(|_| ())?;
            let local1 = words.next().ok_or(())?.parse().map_err(|_| ())?;
            let local2 = words.next().ok_or(())?.parse().map_err(|_| ())?;
            if words.next().is_some() {
                return Err(());
            }
            values.push(LargeCommunityValue {
                global,
                local1,
                local2,
            });
        }
        if values.is_empty() {
            return Err(());
        }
        Ok(LargeCommunity(values))
    }
}
