use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use bgp_wire::{
    Attrs, Family, MpNextHop, MpReach, MpUnreach, Negotiated, Nlri, NotifyError, Update,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Announce,
    Withdraw,
}

/// The unit of outgoing routing state: one NLRI with its attribute
/// set and the direction of the change.
#[derive(Debug, Clone)]
pub struct Change {
    pub family: Family,
    pub nlri: Nlri,
    pub attrs: Arc<Attrs>,
    /// Next hop for MP families; IPv4 unicast uses attrs.nexthop.
    pub nexthop: Option<MpNextHop>,
    pub action: Action,
}

impl Change {
    pub fn announce(family: Family, nlri: Nlri, attrs: Arc<Attrs>) -> Self {
        Self {
            family,
            nlri,
            attrs,
            nexthop: None,
            action: Action::Announce,
        }
    }

    pub fn withdraw(family: Family, nlri: Nlri) -> Self {
        Self {
            family,
            nlri,
            attrs: Arc::new(Attrs::default()),
            nexthop: None,
            action: Action::Withdraw,
        }
    }

    pub fn key(&self) -> Vec<u8> {
        self.nlri.key(self.family)
    }

    fn same_group(&self, other: &Change) -> bool {
        self.action == other.action
            && self.family == other.family
            && self.nexthop == other.nexthop
            && (Arc::ptr_eq(&self.attrs, &other.attrs) || self.attrs == other.attrs)
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.action {
            Action::Announce => "announce",
            Action::Withdraw => "withdraw",
        };
        write!(f, "{} {} {}", verb, self.family, self.nlri)
    }
}

struct PendingEntry {
    change: Change,
    watchdog: Option<String>,
}

type FlushCallback = Box<dyn FnMut() + Send>;

/// Per-peer outgoing table: what is queued for the wire and what the
/// peer has already been told. There is no incoming side; received
/// routes only flow to the helper processes.
#[derive(Default)]
pub struct RibOut {
    /// Insertion order of keys; stale keys are skipped on pop.
    order: VecDeque<Vec<u8>>,
    pending: HashMap<Vec<u8>, PendingEntry>,
    /// What the peer has seen since ESTABLISHED, by NLRI key.
    last_sent: HashMap<Vec<u8>, Change>,
    /// Watchdog name to state, true meaning announce.
    watchdogs: HashMap<String, bool>,
    /// Announces parked while their watchdog is down.
    held: HashMap<String, Vec<Change>>,
    /// Which sent keys belong to which watchdog.
    tagged: HashMap<Vec<u8>, String>,
    eor_sent: BTreeSet<Family>,
    /// Families to close with an End-of-RIB once the refresh drains.
    refresh_pending: Vec<Family>,
    flush_callbacks: Vec<FlushCallback>,
    flushed: bool,
}

impl RibOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn sent_count(&self) -> usize {
        self.last_sent.len()
    }

    pub fn on_flush(&mut self, callback: FlushCallback) {
        self.flush_callbacks.push(callback);
    }

    /// Queue one change. Announces identical to what the peer already
    /// has and withdraws for unknown NLRI produce no wire output.
    pub fn insert(&mut self, change: Change, watchdog: Option<String>) {
        let key = change.key();
        if let Some(name) = &watchdog {
            self.tagged.insert(key.clone(), name.clone());
            let up = *self.watchdogs.entry(name.clone()).or_insert(true);
            if !up && change.action == Action::Announce {
                self.held.entry(name.clone()).or_default().push(change);
                return;
            }
        }
        match change.action {
            Action::Announce => {
                if let Some(sent) = self.last_sent.get(&key)
                    && sent.attrs == change.attrs
                    && sent.nexthop == change.nexthop
                {
                    // Re-announcing what the peer already has: cancel
                    // anything queued and stay silent.
                    self.pending.remove(&key);
                    return;
                }
            }
            Action::Withdraw => {
                if !self.last_sent.contains_key(&key) {
                    // Never announced (or a queued announce not yet
                    // sent): just cancel the queued change.
                    self.pending.remove(&key);
                    return;
                }
            }
        }
        if self
            .pending
            .insert(key.clone(), PendingEntry { change, watchdog })
            .is_none()
        {
            self.order.push_back(key);
        }
        self.flushed = false;
    }

    /// Force-queue without de-duplication (route refresh).
    fn insert_forced(&mut self, change: Change) {
        let key = change.key();
        if self
            .pending
            .insert(
                key.clone(),
                PendingEntry {
                    change,
                    watchdog: None,
                },
            )
            .is_none()
        {
            self.order.push_back(key);
        }
        self.flushed = false;
    }

    /// Configuration reload: the peer must end up seeing exactly the
    /// new set. Anything absent from `next` is withdrawn; anything
    /// new or changed is announced; unchanged routes stay silent.
    pub fn replace_reload(&mut self, previous: &[Change], next: &[Change]) {
        let next_keys: BTreeSet<Vec<u8>> = next.iter().map(|change| change.key()).collect();
        for change in previous.iter() {
            if change.action == Action::Announce && !next_keys.contains(&change.key()) {
                let withdraw = Change {
                    action: Action::Withdraw,
                    ..change.clone()
                };
                let watchdog = self.tagged.get(&withdraw.key()).cloned();
                self.insert(withdraw, watchdog);
            }
        }
        for change in next.iter() {
            self.insert(change.clone(), None);
        }
    }

    /// Session (re-)establishment: the old session's view is gone;
    /// announce the current set from scratch.
    pub fn replace_restart(&mut self, _previous: &[Change], current: &[Change]) {
        self.session_reset();
        for change in current.iter() {
            if change.action == Action::Announce {
                self.insert(change.clone(), None);
            }
        }
    }

    /// Drop the last-sent cache (hard reset); subsequent announces
    /// all go to the wire again.
    pub fn uncache(&mut self) {
        self.last_sent.clear();
    }

    /// Throw away per-session state when the session drops.
    pub fn session_reset(&mut self) {
        self.order.clear();
        self.pending.clear();
        self.uncache();
        self.eor_sent.clear();
        self.refresh_pending.clear();
        self.flushed = false;
    }

    /// Handle an inbound ROUTE-REFRESH: queue every last-sent entry
    /// again. Returns true when something was queued; with the
    /// enhanced variant the caller brackets with BoRR/EoRR.
    pub fn resend(&mut self, enhanced: bool, family: Option<Family>) -> bool {
        let mut any = false;
        let entries: Vec<Change> = self
            .last_sent
            .values()
            .filter(|change| family.is_none_or(|f| change.family == f))
            .cloned()
            .collect();
        for change in entries {
            self.insert_forced(change);
            any = true;
        }
        if enhanced {
            match family {
                Some(family) => self.refresh_pending.push(family),
                None => {
                    let families: BTreeSet<Family> = self
                        .last_sent
                        .values()
                        .map(|change| change.family)
                        .collect();
                    self.refresh_pending.extend(families);
                }
            }
        }
        any
    }

    /// Families whose enhanced refresh finished with this drain.
    pub fn take_refresh_done(&mut self) -> Vec<Family> {
        if self.pending() {
            return Vec::new();
        }
        std::mem::take(&mut self.refresh_pending)
    }

    /// Toggle a watchdog. Lowering it withdraws every tagged NLRI the
    /// peer has seen and parks the announces; raising it replays them.
    pub fn watchdog_set(&mut self, name: &str, announce: bool) {
        let previous = self.watchdogs.insert(name.to_string(), announce);
        if previous == Some(announce) {
            return;
        }
        if announce {
            for change in self.held.remove(name).unwrap_or_default() {
                self.insert(change, Some(name.to_string()));
            }
        } else {
            let keys: Vec<Vec<u8>> = self
                .tagged
                .iter()
                .filter(|(_, wd)| wd.as_str() == name)
                .map(|(key, _)| key.clone())
                .collect();
            for key in keys {
                // Pull back anything unsent, then withdraw what the
                // peer has.
                if let Some(entry) = self.pending.remove(&key)
                    && entry.change.action == Action::Announce
                {
                    self.held
                        .entry(name.to_string())
                        .or_default()
                        .push(entry.change);
                }
                if let Some(sent) = self.last_sent.get(&key).cloned() {
                    self.held.entry(name.to_string()).or_default().push(sent.clone());
                    let withdraw = Change {
                        action: Action::Withdraw,
                        ..sent
                    };
                    self.insert(withdraw, None);
                }
            }
        }
    }

    /// Families that still owe the initial End-of-RIB, marking them
    /// sent. Call once the queue drains.
    pub fn eor_due(&mut self, negotiated: &Negotiated) -> Vec<Family> {
        if self.pending() {
            return Vec::new();
        }
        let due: Vec<Family> = negotiated
            .families
            .iter()
            .filter(|family| !self.eor_sent.contains(family))
            .cloned()
            .collect();
        self.eor_sent.extend(due.iter().cloned());
        due
    }

    fn fire_flush_callbacks(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;
        for callback in self.flush_callbacks.iter_mut() {
            callback();
        }
    }

    /// Pack queued changes into at most `max_updates` UPDATE frames
    /// under the negotiated size limit. Changes sharing an attribute
    /// set ride together; announces and withdraws never mix.
    pub fn produce_updates(
        &mut self,
        negotiated: &Negotiated,
        max_updates: usize,
    ) -> Result<Vec<BytesMut>, NotifyError> {
        let mut out = Vec::new();
        while out.len() < max_updates {
            let Some(group) = self.next_group(negotiated) else {
                break;
            };
            if !group.is_empty() {
                out.push(group);
            }
        }
        if !self.pending() && !out.is_empty() {
            self.fire_flush_callbacks();
        }
        Ok(out)
    }

    /// Pop one attribute-homogeneous group off the queue and encode
    /// it, leaving whatever does not fit for the next call.
    fn next_group(&mut self, negotiated: &Negotiated) -> Option<BytesMut> {
        // Find the head entry, discarding stale keys.
        let head_key = loop {
            let key = self.order.front()?;
            if self.pending.contains_key(key) {
                break key.clone();
            }
            self.order.pop_front();
        };
        let head = self.pending.remove(&head_key).unwrap();
        self.order.pop_front();

        let mut members = vec![head.change.clone()];
        let limit = negotiated.msg_size();
        let mut body = 0usize;
        {
            let mut scratch = BytesMut::new();
            head.change.nlri.emit(&mut scratch);
            body += scratch.len();
        }
        // Conservative bound: header + length fields + encoded attrs
        // + MP attribute overhead.
        let mut overhead = BytesMut::new();
        head.change.attrs.emit(&mut overhead, negotiated.as4);
        let base = 23 + overhead.len() + 16;

        // Sweep the rest of the queue for members of the same group.
        let order: Vec<Vec<u8>> = self.order.iter().cloned().collect();
        for key in order {
            let Some(candidate) = self.pending.get(&key) else {
                continue;
            };
            if !candidate.change.same_group(&head.change) {
                continue;
            }
            let mut scratch = BytesMut::new();
            candidate.change.nlri.emit(&mut scratch);
            if base + body + scratch.len() > limit {
                break;
            }
            body += scratch.len();
            let entry = self.pending.remove(&key).unwrap();
            members.push(entry.change);
        }

        // Record what the peer will have seen.
        for change in members.iter() {
            let key = change.key();
            match change.action {
                Action::Announce => {
                    self.last_sent.insert(key, change.clone());
                }
                Action::Withdraw => {
                    self.last_sent.remove(&key);
                }
            }
        }

        Some(build_update(&members, negotiated))
    }
}

/// Encode one homogeneous group as a single UPDATE.
fn build_update(members: &[Change], negotiated: &Negotiated) -> BytesMut {
    let first = &members[0];
    let mut update = Update::default();
    match (first.family.is_ipv4_unicast(), first.action) {
        (true, Action::Announce) => {
            update.attrs = Some((*first.attrs).clone());
            for change in members {
                if let Nlri::Prefix(prefix) = &change.nlri {
                    update.announce.push(prefix.clone());
                }
            }
        }
        (true, Action::Withdraw) => {
            for change in members {
                if let Nlri::Prefix(prefix) = &change.nlri {
                    update.withdraw.push(prefix.clone());
                }
            }
        }
        (false, Action::Announce) => {
            update.attrs = Some((*first.attrs).clone());
            let nexthop = first.nexthop.clone().unwrap_or(MpNextHop::Empty);
            let mut reach = MpReach::new(first.family, nexthop);
            for change in members {
                reach.nlris.push(change.nlri.clone());
            }
            update.mp_reach = Some(reach);
        }
        (false, Action::Withdraw) => {
            let mut unreach = MpUnreach::new(first.family);
            for change in members {
                unreach.nlris.push(change.nlri.clone());
            }
            update.mp_unreach = Some(unreach);
        }
    }
    match update.encode(negotiated) {
        Ok(buf) => buf,
        Err(err) => {
            // The size sweep keeps groups under the limit; a failure
            // here is a single oversized change, which we drop with a
            // diagnostic rather than kill the session.
            debug!("dropping unencodable update: {}", err);
            BytesMut::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgp_wire::{AsPath, NextHop, Origin, PrefixNlri};

    fn attrs(pref: u32) -> Arc<Attrs> {
        Arc::new(Attrs {
            origin: Some(Origin::Igp),
            aspath: Some(AsPath::from_sequence([65001])),
            nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
            local_pref: Some(bgp_wire::LocalPref::new(pref)),
            ..Default::default()
        })
    }

    fn route(prefix: &str, pref: u32) -> Change {
        Change::announce(
            Family::IPV4_UNICAST,
            Nlri::Prefix(PrefixNlri::new(prefix.parse().unwrap())),
            attrs(pref),
        )
    }

    fn negotiated() -> Negotiated {
        let mut negotiated = Negotiated {
            as4: true,
            ..Default::default()
        };
        negotiated.families.insert(Family::IPV4_UNICAST);
        negotiated
    }

    fn drain(rib: &mut RibOut) -> Vec<BytesMut> {
        rib.produce_updates(&negotiated(), usize::MAX).unwrap()
    }

    #[test]
    fn identical_announce_is_silent() {
        let mut rib = RibOut::new();
        rib.insert(route("10.0.0.0/24", 100), None);
        assert_eq!(drain(&mut rib).len(), 1);

        rib.insert(route("10.0.0.0/24", 100), None);
        assert!(!rib.pending());
        assert!(drain(&mut rib).is_empty());

        // A changed attribute set does go out.
        rib.insert(route("10.0.0.0/24", 200), None);
        assert_eq!(drain(&mut rib).len(), 1);
    }

    #[test]
    fn withdraw_of_unknown_is_silent() {
        let mut rib = RibOut::new();
        let withdraw = Change {
            action: Action::Withdraw,
            ..route("10.0.0.0/24", 100)
        };
        rib.insert(withdraw, None);
        assert!(!rib.pending());
    }

    #[test]
    fn withdraw_cancels_unsent_announce() {
        let mut rib = RibOut::new();
        rib.insert(route("10.0.0.0/24", 100), None);
        let withdraw = Change {
            action: Action::Withdraw,
            ..route("10.0.0.0/24", 100)
        };
        rib.insert(withdraw, None);
        assert!(drain(&mut rib).is_empty());
        assert_eq!(rib.sent_count(), 0);
    }

    #[test]
    fn later_change_supersedes_queued() {
        let mut rib = RibOut::new();
        rib.insert(route("10.0.0.0/24", 100), None);
        rib.insert(route("10.0.0.0/24", 300), None);
        let updates = drain(&mut rib);
        assert_eq!(updates.len(), 1);
        // 0x12c == 300 is in the encoded local-pref.
        assert!(updates[0].windows(4).any(|w| w == [0x00, 0x00, 0x01, 0x2c]));
    }

    #[test]
    fn shared_attrs_pack_into_one_update() {
        let mut rib = RibOut::new();
        rib.insert(route("10.0.0.0/24", 100), None);
        rib.insert(route("10.0.1.0/24", 100), None);
        rib.insert(route("10.0.2.0/24", 50), None);
        let updates = drain(&mut rib);
        // Two prefixes share one attribute set, the third differs.
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn replace_reload_reaches_target_set() {
        let mut rib = RibOut::new();
        let previous = vec![route("10.0.0.0/24", 100), route("10.0.1.0/24", 100)];
        for change in previous.iter() {
            rib.insert(change.clone(), None);
        }
        drain(&mut rib);
        assert_eq!(rib.sent_count(), 2);

        let next = vec![route("10.0.1.0/24", 100), route("10.0.2.0/24", 100)];
        rib.replace_reload(&previous, &next);
        drain(&mut rib);
        // 10.0.0.0/24 withdrawn, 10.0.1.0/24 untouched, 10.0.2.0/24
        // announced.
        assert_eq!(rib.sent_count(), 2);
        let keys: Vec<Vec<u8>> = next.iter().map(|change| change.key()).collect();
        assert!(keys.iter().all(|key| rib.last_sent.contains_key(key)));
    }

    #[test]
    fn watchdog_cycle_restores_announced_set() {
        let mut rib = RibOut::new();
        rib.insert(route("10.9.0.0/16", 100), Some("relay".into()));
        drain(&mut rib);
        assert_eq!(rib.sent_count(), 1);

        rib.watchdog_set("relay", false);
        drain(&mut rib);
        assert_eq!(rib.sent_count(), 0);

        rib.watchdog_set("relay", true);
        drain(&mut rib);
        assert_eq!(rib.sent_count(), 1);
    }

    #[test]
    fn watchdog_down_parks_new_announces() {
        let mut rib = RibOut::new();
        rib.watchdog_set("relay", false);
        rib.insert(route("10.9.0.0/16", 100), Some("relay".into()));
        assert!(!rib.pending());

        rib.watchdog_set("relay", true);
        assert!(rib.pending());
        drain(&mut rib);
        assert_eq!(rib.sent_count(), 1);
    }

    #[test]
    fn resend_requeues_last_sent() {
        let mut rib = RibOut::new();
        rib.insert(route("10.0.0.0/24", 100), None);
        drain(&mut rib);

        assert!(rib.resend(true, Some(Family::IPV4_UNICAST)));
        assert!(rib.pending());
        let updates = drain(&mut rib);
        assert_eq!(updates.len(), 1);
        assert_eq!(rib.take_refresh_done(), vec![Family::IPV4_UNICAST]);
    }

    #[test]
    fn eor_once_per_family() {
        let mut rib = RibOut::new();
        let negotiated = negotiated();
        assert_eq!(rib.eor_due(&negotiated), vec![Family::IPV4_UNICAST]);
        assert!(rib.eor_due(&negotiated).is_empty());
        rib.session_reset();
        assert_eq!(rib.eor_due(&negotiated), vec![Family::IPV4_UNICAST]);
    }

    #[test]
    fn flush_callback_fires_on_drain() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let fired = Arc::new(AtomicUsize::new(0));
        let mut rib = RibOut::new();
        let counter = fired.clone();
        rib.on_flush(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        rib.insert(route("10.0.0.0/24", 100), None);
        drain(&mut rib);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
