use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{BGP_MSG_MAX, BGP_MSG_MAX_EXTENDED, CapabilitySet, Family};

/// AS_TRANS, the 2-octet stand-in used by 4-octet speakers (RFC 6793).
pub const AS_TRANS: u16 = 23456;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshVariant {
    #[default]
    Absent,
    Legacy,
    Enhanced,
}

impl RefreshVariant {
    pub fn is_enabled(&self) -> bool {
        *self != RefreshVariant::Absent
    }

    pub fn is_enhanced(&self) -> bool {
        *self == RefreshVariant::Enhanced
    }
}

/// Per-family add-path outcome: whether we may send path-ids to the
/// peer, and whether the peer will send them to us.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddPathPair {
    pub send: bool,
    pub receive: bool,
}

/// The intersection of both OPENs, fixed for the lifetime of one
/// session. Every codec entry point takes this as a parameter; the
/// codec itself keeps no state across calls.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Negotiated {
    pub local_as: u32,
    pub peer_as: u32,
    pub families: BTreeSet<Family>,
    pub as4: bool,
    pub addpath: BTreeMap<Family, AddPathPair>,
    pub extended_message: bool,
    pub refresh: RefreshVariant,
    pub multisession: bool,
    pub operational: bool,
    /// min() of both proposals; 0 disables keepalive and hold timers.
    pub hold_time: u16,
}

impl Negotiated {
    pub fn negotiate(
        local_as: u32,
        peer_as: u32,
        local_hold: u16,
        peer_hold: u16,
        sent: &CapabilitySet,
        received: &CapabilitySet,
    ) -> Self {
        let families: BTreeSet<Family> = sent
            .mp
            .keys()
            .filter(|family| received.mp.contains_key(family))
            .cloned()
            .collect();

        let mut addpath = BTreeMap::new();
        for (family, ours) in sent.addpath.iter() {
            let Some(theirs) = received.addpath.get(family) else {
                continue;
            };
            let pair = AddPathPair {
                send: ours.send() && theirs.receive(),
                receive: ours.receive() && theirs.send(),
            };
            if pair.send || pair.receive {
                addpath.insert(*family, pair);
            }
        }

        let refresh = if sent.enhanced_refresh.is_some() && received.enhanced_refresh.is_some() {
            RefreshVariant::Enhanced
        } else if sent.refresh_legacy() && received.refresh_legacy() {
            RefreshVariant::Legacy
        } else {
            RefreshVariant::Absent
        };

        let hold_time = if local_hold == 0 || peer_hold == 0 {
            0
        } else {
            local_hold.min(peer_hold)
        };

        Negotiated {
            local_as,
            peer_as,
            families,
            as4: sent.as4.is_some() && received.as4.is_some(),
            addpath,
            extended_message: sent.extended_message.is_some()
                && received.extended_message.is_some(),
            refresh,
            multisession: sent.multisession.is_some() && received.multisession.is_some(),
            operational: sent.operational.is_some() && received.operational.is_some(),
            hold_time,
        }
    }

    /// Hold time / 3, the keepalive emission interval.
    pub fn keepalive(&self) -> u16 {
        self.hold_time / 3
    }

    pub fn msg_size(&self) -> usize {
        if self.extended_message {
            BGP_MSG_MAX_EXTENDED
        } else {
            BGP_MSG_MAX
        }
    }

    pub fn is_ibgp(&self) -> bool {
        self.local_as == self.peer_as
    }

    pub fn addpath_send(&self, family: &Family) -> bool {
        self.addpath.get(family).is_some_and(|pair| pair.send)
    }

    pub fn addpath_receive(&self, family: &Family) -> bool {
        self.addpath.get(family).is_some_and(|pair| pair.receive)
    }

    /// my-AS field value for an OPEN: the real AS when it fits,
    /// AS_TRANS otherwise.
    pub fn open_asn(local_as: u32) -> u16 {
        if local_as > u16::MAX as u32 {
            AS_TRANS
        } else {
            local_as as u16
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AddPathDirection, Afi, CapAs4, CapMultiProtocol, Safi};

    fn caps(families: &[Family], as4: Option<u32>) -> CapabilitySet {
        let mut set = CapabilitySet::default();
        for family in families {
            set.mp.insert(*family, CapMultiProtocol::new(*family));
        }
        set.as4 = as4.map(CapAs4::new);
        set
    }

    #[test]
    fn family_intersection() {
        let v4 = Family::IPV4_UNICAST;
        let v6 = Family::new(Afi::Ipv6, Safi::Unicast);
        let ours = caps(&[v4, v6], Some(4200000000));
        let theirs = caps(&[v4], None);
        let negotiated = Negotiated::negotiate(4200000000, 64512, 90, 30, &ours, &theirs);
        assert!(negotiated.families.contains(&v4));
        assert!(!negotiated.families.contains(&v6));
        assert!(!negotiated.as4);
        assert_eq!(negotiated.hold_time, 30);
        assert_eq!(negotiated.keepalive(), 10);
    }

    #[test]
    fn addpath_direction_and() {
        let v4 = Family::IPV4_UNICAST;
        let mut ours = caps(&[v4], None);
        let mut theirs = caps(&[v4], None);
        ours.addpath.insert(v4, AddPathDirection::SendReceive);
        theirs.addpath.insert(v4, AddPathDirection::Receive);
        let negotiated = Negotiated::negotiate(1, 2, 90, 90, &ours, &theirs);
        assert!(negotiated.addpath_send(&v4));
        assert!(!negotiated.addpath_receive(&v4));
    }

    #[test]
    fn as_trans_when_wide() {
        assert_eq!(Negotiated::open_asn(64512), 64512);
        assert_eq!(Negotiated::open_asn(4200000000), AS_TRANS);
    }
}
