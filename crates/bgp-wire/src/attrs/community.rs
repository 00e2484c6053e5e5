use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use nom_derive::NomBE;

use crate::{AttrCode, AttrEmit, AttrFlags};

#[derive(Clone, Debug, Default, NomBE, PartialEq, Eq, Hash)]
pub struct Community(pub Vec<u32>);

impl Community {
    pub const NO_EXPORT: u32 = 0xffffff01;
    pub const NO_ADVERTISE: u32 = 0xffffff02;
    pub const NO_EXPORT_SUBCONFED: u32 = 0xffffff03;

    pub fn new() -> Self {
        Community(Vec::new())
    }

    pub fn push(&mut self, value: u32) {
        self.0.push(value)
    }

    pub fn contains(&self, val: &u32) -> bool {
        self.0.contains(val)
    }

    pub fn sort_uniq(&mut self) {
        let coms: BTreeSet<u32> = self.0.iter().cloned().collect();
        self.0 = coms.into_iter().collect();
    }

    pub fn is_no_export(&self) -> bool {
        self.contains(&Self::NO_EXPORT)
    }
}

impl AttrEmit for Community {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::Community
    }

    fn attr_len(&self) -> Option<usize> {
        Some(self.0.len() * 4)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for &community in &self.0 {
            buf.put_u32(community);
        }
    }
}

fn community_str(val: u32) -> String {
    match val {
        Community::NO_EXPORT => "no-export".to_string(),
        Community::NO_ADVERTISE => "no-advertise".to_string(),
        Community::NO_EXPORT_SUBCONFED => "no-export-subconfed".to_string(),
        v => format!("{}:{}", v >> 16, v & 0xffff),
    }
}

fn community_from_str(s: &str) -> Option<u32> {
    match s {
        "no-export" => Some(Community::NO_EXPORT),
        "no-advertise" => Some(Community::NO_ADVERTISE),
        "no-export-subconfed" => Some(Community::NO_EXPORT_SUBCONFED),
        _ => {
            let (high, low) = s.split_once(':')?;
            let high = high.parse::<u16>().ok()?;
            let low = low.parse::<u16>().ok()?;
            Some(((high as u32) << 16) | low as u32)
        }
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| community_str(*x))
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}

impl FromStr for Community {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut coms = Community::new();
        for part in s.split_whitespace() {
            coms.push(community_from_str(part).ok_or(())?);
        }
        if coms.0.is_empty() {
            return Err(());
        }
        coms.sort_uniq();
        Ok(coms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_parse_display() {
        let com: Community = "65100:12 no-export".parse().unwrap();
        assert!(com.is_no_export());
        assert!(com.contains(&((65100u32 << 16) | 12)));
        assert_eq!(com.to_string(), "65100:12 no-export");
    }
}
