use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::sync::mpsc::Sender;
use tokio::time::{Instant, sleep};

use crate::inst::Message;
use crate::peer::{Event, Peer, State};
use crate::task::Job;

/// Reconnect backoff bounds (seconds); the delay doubles per failure
/// and snaps back to the floor on ESTABLISHED.
pub const BACKOFF_FLOOR: u64 = 1;
pub const BACKOFF_CAP: u64 = 60;

/// A session timer that fires an FSM event into the reactor when its
/// deadline passes. Refreshing pushes the deadline out again, which
/// is how inbound traffic keeps the hold timer quiet.
#[derive(Debug)]
pub struct EventTimer {
    reset: Arc<Notify>,
    job: Job,
}

impl EventTimer {
    fn start(
        secs: u64,
        repeat: bool,
        tx: Sender<Message>,
        ident: IpAddr,
        event: fn() -> Event,
    ) -> EventTimer {
        let reset = Arc::new(Notify::new());
        let armed = reset.clone();
        let job = Job::spawn(async move {
            loop {
                let deadline = sleep(Duration::from_secs(secs));
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        _ = &mut deadline => break,
                        _ = armed.notified() => {
                            deadline
                                .as_mut()
                                .reset(Instant::now() + Duration::from_secs(secs));
                        }
                    }
                }
                let _ = tx.send(Message::Event(ident, event())).await;
                if !repeat {
                    return;
                }
            }
        });
        EventTimer { reset, job }
    }

    /// Fire once after `secs`, unless refreshed in the meantime.
    pub fn after(secs: u64, peer: &Peer, event: fn() -> Event) -> EventTimer {
        Self::start(secs, false, peer.tx.clone(), peer.ident, event)
    }

    /// Fire every `secs`.
    pub fn every(secs: u64, peer: &Peer, event: fn() -> Event) -> EventTimer {
        Self::start(secs, true, peer.tx.clone(), peer.ident, event)
    }

    pub fn refresh(&self) {
        self.reset.notify_one();
    }
}

pub fn start_connect_retry_timer(peer: &Peer) -> EventTimer {
    EventTimer::after(peer.backoff_delay, peer, || Event::ConnectRetryExpires)
}

pub fn start_open_wait_timer(peer: &Peer) -> EventTimer {
    EventTimer::after(peer.env.bgp_openwait as u64, peer, || {
        Event::OpenWaitExpires
    })
}

fn start_hold_timer(peer: &Peer) -> EventTimer {
    EventTimer::after(peer.hold_time() as u64, peer, || Event::HoldTimerExpires)
}

fn start_keepalive_timer(peer: &Peer) -> EventTimer {
    EventTimer::every(peer.keepalive_time() as u64, peer, || {
        Event::KeepaliveExpires
    })
}

pub fn refresh_hold_timer(peer: &Peer) {
    if let Some(hold_timer) = peer.timer.hold.as_ref() {
        hold_timer.refresh();
    }
}

/// Grow the reconnect delay after a failure, with a little jitter so
/// a roomful of peers does not reconnect in lockstep.
pub fn backoff_bump(peer: &mut Peer) {
    let jitter = rand::random_range(0..=1u64);
    peer.backoff_delay = (peer.backoff_delay * 2 + jitter).clamp(BACKOFF_FLOOR, BACKOFF_CAP);
}

pub fn backoff_reset(peer: &mut Peer) {
    peer.backoff_delay = BACKOFF_FLOOR;
    peer.attempts = 0;
}

/// Reconcile running timers with the state just entered.
pub fn update_timers(peer: &mut Peer) {
    use State::*;
    match peer.state {
        Idle => {
            // The reconnect timer survives IDLE; it is what gets the
            // peer out of it.
            peer.timer.open_wait = None;
            peer.timer.hold = None;
            peer.timer.keepalive = None;
        }
        Active | Connect => {
            peer.timer.open_wait = None;
            peer.timer.hold = None;
            peer.timer.keepalive = None;
        }
        OpenSent => {
            peer.timer.connect_retry = None;
            if peer.timer.open_wait.is_none() {
                peer.timer.open_wait = Some(start_open_wait_timer(peer));
            }
        }
        OpenConfirm | Established => {
            peer.timer.connect_retry = None;
            peer.timer.open_wait = None;
            if peer.hold_time() > 0 {
                if peer.timer.hold.is_none() {
                    peer.timer.hold = Some(start_hold_timer(peer));
                }
                if peer.timer.keepalive.is_none() {
                    peer.timer.keepalive = Some(start_keepalive_timer(peer));
                }
            } else {
                peer.timer.hold = None;
                peer.timer.keepalive = None;
            }
        }
    }
}
