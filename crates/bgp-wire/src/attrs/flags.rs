use std::fmt;

use bitfield_struct::bitfield;
use serde::Serialize;

#[bitfield(u8, debug = true)]
#[derive(Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrFlags {
    #[bits(4)]
    pub resvd: u8,
    pub extended: bool,
    pub partial: bool,
    pub transitive: bool,
    pub optional: bool,
}

impl AttrFlags {
    pub fn well_known() -> Self {
        AttrFlags::new().with_transitive(true)
    }

    pub fn optional_transitive() -> Self {
        AttrFlags::new().with_optional(true).with_transitive(true)
    }

    pub fn optional_non_transitive() -> Self {
        AttrFlags::new().with_optional(true)
    }
}

impl fmt::Display for AttrFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut v: Vec<&str> = Vec::new();
        if self.optional() {
            v.push("optional");
        }
        if self.transitive() {
            v.push("transitive");
        }
        if self.partial() {
            v.push("partial");
        }
        if self.extended() {
            v.push("extended-length");
        }
        write!(f, "{}", v.join("|"))
    }
}
