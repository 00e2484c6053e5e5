use std::collections::BTreeMap;
use std::fmt;

use bytes::BytesMut;

use super::*;
use crate::Family;

/// Collated view of the capabilities one side put in its OPEN. Built
/// from the parsed TLV list on receive, and emitted into the optional
/// parameters block on send.
#[derive(Default, Debug, PartialEq, Clone)]
pub struct CapabilitySet {
    pub mp: BTreeMap<Family, CapMultiProtocol>,
    pub refresh: Option<CapRefresh>,
    pub refresh_cisco: Option<CapRefreshCisco>,
    pub enhanced_refresh: Option<CapEnhancedRefresh>,
    pub extended_nexthop: Option<CapExtendedNexthop>,
    pub extended_message: Option<CapExtendedMessage>,
    pub graceful: Option<CapGracefulRestart>,
    pub as4: Option<CapAs4>,
    pub multisession: Option<CapMultiSession>,
    pub addpath: BTreeMap<Family, AddPathDirection>,
    pub llgr: Option<CapLlgr>,
    pub operational: Option<CapOperational>,
    pub unknown: Vec<CapUnknown>,
}

impl CapabilitySet {
    pub fn emit(&self, buf: &mut BytesMut) {
        for v in self.mp.values() {
            v.emit(buf);
        }
        if let Some(v) = &self.refresh {
            v.emit(buf);
        }
        if let Some(v) = &self.refresh_cisco {
            v.emit(buf);
        }
        if let Some(v) = &self.enhanced_refresh {
            v.emit(buf);
        }
        if let Some(v) = &self.extended_nexthop {
            v.emit(buf);
        }
        if let Some(v) = &self.extended_message {
            v.emit(buf);
        }
        if let Some(v) = &self.graceful {
            v.emit(buf);
        }
        if let Some(v) = &self.as4 {
            v.emit(buf);
        }
        if let Some(v) = &self.multisession {
            v.emit(buf);
        }
        if !self.addpath.is_empty() {
            let mut cap = CapAddPath::default();
            for (family, direction) in self.addpath.iter() {
                cap.families.push(AddPathFamily::new(*family, *direction));
            }
            cap.emit(buf);
        }
        if let Some(v) = &self.llgr {
            v.emit(buf);
        }
        if let Some(v) = &self.operational {
            v.emit(buf);
        }
        for v in self.unknown.iter() {
            v.emit(buf);
        }
    }

    pub fn collate(params: Vec<Vec<Capability>>) -> Self {
        let mut set = CapabilitySet::default();
        for caps in params.into_iter() {
            for cap in caps.into_iter() {
                match cap {
                    Capability::MultiProtocol(v) => {
                        set.mp.insert(v.family(), v);
                    }
                    Capability::RouteRefresh(v) => {
                        set.refresh = Some(v);
                    }
                    Capability::RouteRefreshCisco(v) => {
                        set.refresh_cisco = Some(v);
                    }
                    Capability::EnhancedRouteRefresh(v) => {
                        set.enhanced_refresh = Some(v);
                    }
                    Capability::ExtendedNexthop(v) => {
                        set.extended_nexthop = Some(v);
                    }
                    Capability::ExtendedMessage(v) => {
                        set.extended_message = Some(v);
                    }
                    Capability::GracefulRestart(v) => {
                        set.graceful = Some(v);
                    }
                    Capability::As4(v) => {
                        set.as4 = Some(v);
                    }
                    Capability::MultiSession(v) | Capability::MultiSessionCisco(v) => {
                        set.multisession = Some(v);
                    }
                    Capability::AddPath(v) => {
                        for entry in v.families.into_iter() {
                            set.addpath.insert(entry.family(), entry.direction);
                        }
                    }
                    Capability::Llgr(v) => {
                        set.llgr = Some(v);
                    }
                    Capability::Operational(v) => {
                        set.operational = Some(v);
                    }
                    Capability::Unknown(v) => {
                        set.unknown.push(v);
                    }
                }
            }
        }
        set
    }

    pub fn has_family(&self, family: &Family) -> bool {
        self.mp.contains_key(family)
    }

    pub fn refresh_legacy(&self) -> bool {
        self.refresh.is_some() || self.refresh_cisco.is_some()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.mp.values() {
            writeln!(f, "  {}", v)?;
        }
        if let Some(v) = &self.refresh {
            writeln!(f, "  {}", v)?;
        }
        if let Some(v) = &self.enhanced_refresh {
            writeln!(f, "  {}", v)?;
        }
        if let Some(v) = &self.extended_message {
            writeln!(f, "  {}", v)?;
        }
        if let Some(v) = &self.graceful {
            writeln!(f, "  {}", v)?;
        }
        if let Some(v) = &self.as4 {
            writeln!(f, "  {}", v)?;
        }
        if !self.addpath.is_empty() {
            write!(f, "  AddPath:")?;
            for (family, direction) in self.addpath.iter() {
                write!(f, " {} {}", family, direction)?;
            }
            writeln!(f)?;
        }
        if let Some(v) = &self.llgr {
            writeln!(f, "  {}", v)?;
        }
        if let Some(v) = &self.operational {
            writeln!(f, "  {}", v)?;
        }
        Ok(())
    }
}
