use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{info, warn};

use bgp_wire::{
    BGP_HEADER_LEN, BGP_MSG_MAX, CapAs4, CapEnhancedRefresh, CapExtendedMessage,
    CapGracefulRestart, CapMultiProtocol, CapMultiSession, CapOperational, CapRefresh,
    CapabilitySet, Message as Wire, Negotiated, Notification, NotifyCode, NotifyError, Open,
    Operational, RefreshSubtype, RestartFamily, RouteRefresh, Update, cease, fsm_error,
    frame_ready, open_error, peek_message_length,
};

use crate::api::encoder::{ApiEvent, Direction, MessageKind, PeerInfo, notification_str};
use crate::config::{EnvConfig, PeerConfig};
use crate::inst::{Bgp, Message};
use crate::rib::{Change, RibOut};
use crate::task::Job;
use crate::timer::{self, EventTimer};

pub const BGP_PORT: u16 = 179;
/// Bound on the per-peer send queue; exceeding it kills the session
/// rather than the process memory.
pub const MAX_BACKLOG: usize = 15000;
/// UPDATEs emitted per scheduler pass.
pub const ADV_BURST: usize = 25;

/// Session states as disjoint bits so the transition discipline is a
/// mask check.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum State {
    Idle = 0x01,
    Active = 0x02,
    Connect = 0x04,
    OpenSent = 0x08,
    OpenConfirm = 0x10,
    Established = 0x20,
}

impl State {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Connect => "connect",
            Self::OpenSent => "opensent",
            Self::OpenConfirm => "openconfirm",
            Self::Established => "established",
        }
    }

    pub fn is_established(&self) -> bool {
        *self == State::Established
    }

    /// States a transition into `self` may come from.
    fn allowed_from(&self) -> u8 {
        use State::*;
        match self {
            Idle => 0xff,
            Active => Idle as u8 | Active as u8 | OpenSent as u8,
            Connect => Idle as u8 | Connect as u8 | Active as u8,
            OpenSent => Connect as u8,
            OpenConfirm => OpenSent as u8 | OpenConfirm as u8,
            Established => OpenConfirm as u8 | Established as u8,
        }
    }
}

/// Move a peer between states. An off-table transition is a bug in
/// this program, never something a peer can trigger, so it aborts.
fn change_state(peer: &mut Peer, next: State) {
    let previous = peer.state;
    if next.allowed_from() & previous as u8 == 0 {
        panic!(
            "fsm transition violation: {} -> {} for {}",
            previous.to_str(),
            next.to_str(),
            peer.ident
        );
    }
    if previous != next {
        info!("peer {} {} -> {}", peer.ident, previous.to_str(), next.to_str());
        peer.outbox.push(ApiEvent::Fsm {
            peer: peer.info(),
            from: previous.to_str(),
            to: next.to_str(),
        });
    }
    peer.state = next;
}

#[derive(Debug)]
pub enum Event {
    Start,
    Stop,
    Reestablish,
    ConnectRetryExpires,
    OpenWaitExpires,
    HoldTimerExpires,
    KeepaliveExpires,
    Connected(TcpStream),
    ConnFail,
    Received(Wire, Vec<u8>),
    WireError(NotifyError),
    RibKick,
}

#[derive(Debug, Default)]
pub struct PeerTask {
    pub connect: Option<Job>,
    pub reader: Option<Job>,
    pub writer: Option<Job>,
}

#[derive(Debug, Default)]
pub struct PeerTimer {
    pub connect_retry: Option<EventTimer>,
    pub open_wait: Option<EventTimer>,
    pub hold: Option<EventTimer>,
    pub keepalive: Option<EventTimer>,
}

/// Shared between the peer and its writer task: queue depth plus the
/// moment bytes last left for the kernel, for stall detection.
#[derive(Debug)]
pub struct BacklogGauge {
    pub depth: AtomicUsize,
    pub last_progress: std::sync::Mutex<Instant>,
}

impl BacklogGauge {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            depth: AtomicUsize::new(0),
            last_progress: std::sync::Mutex::new(Instant::now()),
        })
    }

    pub fn stalled_for_secs(&self) -> u64 {
        self.last_progress
            .lock()
            .map(|at| at.elapsed().as_secs())
            .unwrap_or(0)
    }
}

pub struct Peer {
    pub ident: IpAddr,
    pub config: PeerConfig,
    pub env: EnvConfig,
    pub local_as: u32,
    pub router_id: Ipv4Addr,
    pub state: State,
    pub task: PeerTask,
    pub timer: PeerTimer,
    /// Current reconnect delay in seconds.
    pub backoff_delay: u64,
    pub attempts: u32,
    /// Operator shutdown: stay in IDLE until started again.
    pub admin_down: bool,
    /// Close came from the wire, so the next OPEN carries the
    /// graceful-restart restart-state bit.
    pub restarting: bool,
    pub caps_sent: CapabilitySet,
    pub caps_recv: CapabilitySet,
    pub negotiated: Option<Negotiated>,
    pub remote_id: Ipv4Addr,
    pub local_addr: Option<SocketAddr>,
    pub packet_tx: Option<Sender<BytesMut>>,
    pub backlog: Arc<BacklogGauge>,
    pub rib: RibOut,
    /// Configured changes, the baseline for reload and restart.
    pub routes: Vec<Change>,
    pub queued_operational: Vec<Operational>,
    pub queued_refresh: Vec<RouteRefresh>,
    pub uptime: Option<Instant>,
    /// Events for subscribed helpers, drained by the reactor after
    /// every FSM step.
    pub outbox: Vec<ApiEvent>,
    pub tx: Sender<Message>,
}

impl Peer {
    pub fn new(
        ident: IpAddr,
        config: PeerConfig,
        env: EnvConfig,
        local_as: u32,
        router_id: Ipv4Addr,
        tx: Sender<Message>,
    ) -> Self {
        Self {
            ident,
            local_as: config.local_as.unwrap_or(local_as),
            router_id: config.router_id.unwrap_or(router_id),
            config,
            env,
            state: State::Idle,
            task: PeerTask::default(),
            timer: PeerTimer::default(),
            backoff_delay: timer::BACKOFF_FLOOR,
            attempts: 0,
            admin_down: false,
            restarting: false,
            caps_sent: CapabilitySet::default(),
            caps_recv: CapabilitySet::default(),
            negotiated: None,
            remote_id: Ipv4Addr::UNSPECIFIED,
            local_addr: None,
            packet_tx: None,
            backlog: BacklogGauge::new(),
            rib: RibOut::new(),
            routes: Vec::new(),
            queued_operational: Vec::new(),
            queued_refresh: Vec::new(),
            uptime: None,
            outbox: Vec::new(),
            tx: tx.clone(),
        }
    }

    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            peer_address: self.ident,
            peer_as: self.config.peer_as,
            local_address: self
                .config
                .local_address
                .or(self.local_addr.map(|addr| addr.ip())),
            local_as: self.local_as,
            router_id: self.router_id,
        }
    }

    pub fn is_ibgp(&self) -> bool {
        self.local_as == self.config.peer_as
    }

    pub fn hold_time(&self) -> u16 {
        self.negotiated
            .as_ref()
            .map(|negotiated| negotiated.hold_time)
            .unwrap_or(self.config.hold_time)
    }

    pub fn keepalive_time(&self) -> u16 {
        self.hold_time() / 3
    }

    pub fn adv_burst(&self) -> usize {
        if self.config.rate_limit { 1 } else { ADV_BURST }
    }

    /// Capabilities we put in our OPEN.
    pub fn build_caps(&self) -> CapabilitySet {
        let mut caps = CapabilitySet::default();
        for family in self.config.family_set() {
            caps.mp.insert(family, CapMultiProtocol::new(family));
        }
        let capability = &self.config.capability;
        if capability.four_octet_as {
            caps.as4 = Some(CapAs4::new(self.local_as));
        }
        if capability.route_refresh {
            caps.refresh = Some(CapRefresh::default());
        }
        if capability.enhanced_route_refresh {
            caps.enhanced_refresh = Some(CapEnhancedRefresh::default());
        }
        if capability.extended_message {
            caps.extended_message = Some(CapExtendedMessage::default());
        }
        if capability.multi_session {
            caps.multisession = Some(CapMultiSession::default());
        }
        if capability.operational {
            caps.operational = Some(CapOperational::default());
        }
        if let Some(restart_time) = capability.graceful_restart {
            let mut graceful = CapGracefulRestart::new(restart_time);
            if self.restarting {
                graceful.flag_time = graceful.flag_time.with_restart_state(true);
            }
            for family in self.config.family_set() {
                graceful.families.push(RestartFamily {
                    afi: family.afi,
                    safi: family.safi,
                    flags: Default::default(),
                });
            }
            caps.graceful = Some(graceful);
        }
        if let Some(direction) = &capability.add_path {
            let direction = match direction.as_str() {
                "receive" => bgp_wire::AddPathDirection::Receive,
                "send" => bgp_wire::AddPathDirection::Send,
                _ => bgp_wire::AddPathDirection::SendReceive,
            };
            for family in self.config.family_set() {
                caps.addpath.insert(family, direction);
            }
        }
        caps
    }

    /// Queue bytes for the writer. False means the backlog bound was
    /// hit and the session must go down.
    pub fn send_bytes(&mut self, buf: BytesMut) -> bool {
        let Some(packet_tx) = self.packet_tx.as_ref() else {
            return true;
        };
        match packet_tx.try_send(buf) {
            Ok(()) => {
                self.backlog.depth.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    pub fn send_message(&mut self, message: &Wire) -> bool {
        let negotiated = self.negotiated.clone().unwrap_or_default();
        let Ok(buf) = message.encode(&negotiated) else {
            return true;
        };
        let raw = buf.to_vec();
        let ok = self.send_bytes(buf);
        if ok {
            self.outbox.push(ApiEvent::Message {
                peer: self.info(),
                direction: Direction::Send,
                kind: MessageKind::of(message),
                body: message_body(message),
                raw: Some(raw),
            });
        }
        ok
    }

    pub fn send_notification(&mut self, code: NotifyCode, subcode: u8, data: Vec<u8>) {
        let notification = Notification::new(code, subcode, data);
        info!(
            "peer {} sending notification {}",
            self.ident,
            notification_str(&notification)
        );
        let _ = self.send_message(&Wire::Notification(notification));
    }
}

fn message_body(message: &Wire) -> String {
    match message {
        Wire::Keepalive => "keepalive".to_string(),
        other => format!("{:?}", DisplayWire(other)),
    }
}

struct DisplayWire<'a>(&'a Wire);

impl std::fmt::Debug for DisplayWire<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Wire::Open(open) => write!(f, "{}", open),
            Wire::Update(update) => write!(f, "{}", update),
            Wire::Notification(notification) => write!(f, "{}", notification),
            Wire::Keepalive => write!(f, "keepalive"),
            Wire::RouteRefresh(refresh) => write!(f, "{}", refresh),
            Wire::Operational(operational) => write!(f, "{}", operational),
        }
    }
}

/// One FSM step. The phases mirror the reactor contract: mutate the
/// peer, then let the caller drain the outbox to the helpers.
pub fn fsm(bgp: &mut Bgp, id: IpAddr, event: Event) {
    let Some(peer) = bgp.peers.get_mut(&id) else {
        return;
    };
    let was_established = peer.state.is_established();

    match event {
        Event::Start => fsm_start(peer),
        Event::Stop => fsm_stop(peer),
        Event::Reestablish => fsm_reestablish(peer),
        Event::ConnectRetryExpires => fsm_connect_retry(peer),
        Event::OpenWaitExpires => fsm_open_wait_expired(peer),
        Event::HoldTimerExpires => fsm_hold_expired(peer),
        Event::KeepaliveExpires => fsm_keepalive_due(peer),
        Event::Connected(stream) => fsm_connected(peer, stream),
        Event::ConnFail => fsm_conn_fail(peer),
        Event::Received(message, raw) => fsm_received(peer, message, raw),
        Event::WireError(err) => fsm_wire_error(peer, err),
        Event::RibKick => fsm_advertise(peer),
    }

    timer::update_timers(peer);

    let now_established = peer.state.is_established();
    if was_established != now_established {
        peer.outbox.push(ApiEvent::NeighborChange {
            peer: peer.info(),
            up: now_established,
        });
        if !now_established {
            peer.uptime = None;
            peer.negotiated = None;
            peer.rib.session_reset();
        }
    }
}

fn fsm_start(peer: &mut Peer) {
    if peer.admin_down || peer.state != State::Idle {
        return;
    }
    if peer.config.passive || peer.env.bgp_passive {
        change_state(peer, State::Active);
        return;
    }
    if peer.config.max_attempts > 0 && peer.attempts >= peer.config.max_attempts {
        warn!("peer {} gave up after {} attempts", peer.ident, peer.attempts);
        return;
    }
    let cap = peer.env.tcp_attempts;
    if cap > 0 && peer.attempts >= cap {
        return;
    }
    peer.attempts += 1;
    peer.task.connect = Some(start_connection(peer));
    change_state(peer, State::Connect);
}

fn fsm_stop(peer: &mut Peer) {
    peer.admin_down = true;
    teardown(peer, NotifyCode::Cease, cease::ADMINISTRATIVE_SHUTDOWN);
}

fn fsm_reestablish(peer: &mut Peer) {
    teardown(peer, NotifyCode::Cease, cease::OTHER_CONFIGURATION_CHANGE);
    timer::backoff_bump(peer);
    peer.timer.connect_retry = Some(timer::start_connect_retry_timer(peer));
}

fn fsm_connect_retry(peer: &mut Peer) {
    peer.timer.connect_retry = None;
    if peer.state == State::Idle || peer.state == State::Active {
        if peer.state == State::Active && !peer.config.passive {
            change_state(peer, State::Connect);
            peer.task.connect = Some(start_connection(peer));
        } else if peer.state == State::Idle {
            fsm_start(peer);
        }
    }
}

fn fsm_open_wait_expired(peer: &mut Peer) {
    if peer.state != State::OpenSent {
        return;
    }
    peer.send_notification(
        NotifyCode::FsmError,
        fsm_error::UNEXPECTED_IN_OPENSENT,
        Vec::new(),
    );
    close_session(peer);
    schedule_restart(peer);
}

fn fsm_hold_expired(peer: &mut Peer) {
    peer.send_notification(NotifyCode::HoldTimerExpired, 0, Vec::new());
    close_session(peer);
    schedule_restart(peer);
}

fn fsm_keepalive_due(peer: &mut Peer) {
    if !matches!(peer.state, State::OpenConfirm | State::Established) {
        return;
    }
    // A reader that stopped taking our bytes for a full hold time
    // with traffic queued is as dead as a silent one. A NOTIFICATION
    // could not get through either, so none is queued.
    if peer.backlog.depth.load(Ordering::Relaxed) > 0
        && peer.hold_time() > 0
        && peer.backlog.stalled_for_secs() >= peer.hold_time() as u64
    {
        warn!("peer {} send path stalled, closing", peer.ident);
        drop_connection(peer);
        schedule_restart(peer);
        return;
    }
    if !peer.send_message(&Wire::Keepalive) {
        backlog_overflow(peer);
    }
}

fn fsm_connected(peer: &mut Peer, stream: TcpStream) {
    if peer.state == State::Active {
        // Inbound socket; walk through CONNECT so the table holds.
        change_state(peer, State::Connect);
    }
    if peer.state != State::Connect {
        drop(stream);
        return;
    }
    peer.task.connect = None;
    peer.local_addr = stream.local_addr().ok();

    let (read_half, write_half) = stream.into_split();
    let (packet_tx, packet_rx) = mpsc::channel::<BytesMut>(MAX_BACKLOG);
    peer.packet_tx = Some(packet_tx);
    peer.backlog = BacklogGauge::new();
    if let Ok(mut at) = peer.backlog.last_progress.lock() {
        *at = Instant::now();
    }
    peer.task.reader = Some(start_reader(peer, read_half));
    peer.task.writer = Some(start_writer(
        write_half,
        packet_rx,
        peer.backlog.clone(),
        peer.tx.clone(),
        peer.ident,
    ));

    peer.caps_sent = peer.build_caps();
    let open = Open::new(
        Negotiated::open_asn(peer.local_as),
        peer.config.hold_time,
        peer.router_id,
        peer.caps_sent.clone(),
    );
    if !peer.send_message(&Wire::Open(Box::new(open))) {
        backlog_overflow(peer);
        return;
    }
    change_state(peer, State::OpenSent);
}

fn fsm_conn_fail(peer: &mut Peer) {
    if peer.state == State::Idle {
        return;
    }
    let unexpected = matches!(peer.state, State::Established);
    if unexpected && peer.caps_recv.graceful.is_some() && peer.caps_sent.graceful.is_some() {
        // RFC 4724: an unexpected drop on a graceful-restart session
        // closes without NOTIFICATION and re-opens with the
        // restart-state bit.
        peer.restarting = true;
    }
    drop_connection(peer);
    change_state(peer, State::Active);
    timer::backoff_bump(peer);
    peer.timer.connect_retry = Some(timer::start_connect_retry_timer(peer));
}

fn fsm_wire_error(peer: &mut Peer, err: NotifyError) {
    warn!("peer {} wire error: {}", peer.ident, err);
    peer.send_notification(err.code, err.subcode, err.data);
    close_session(peer);
    schedule_restart(peer);
}

fn fsm_received(peer: &mut Peer, message: Wire, raw: Vec<u8>) {
    peer.outbox.push(ApiEvent::Message {
        peer: peer.info(),
        direction: Direction::Receive,
        kind: MessageKind::of(&message),
        body: message_body(&message),
        raw: Some(raw),
    });
    match message {
        Wire::Open(open) => fsm_received_open(peer, *open),
        Wire::Keepalive => fsm_received_keepalive(peer),
        Wire::Update(update) => fsm_received_update(peer, *update),
        Wire::Notification(notification) => {
            info!(
                "peer {} received notification {}",
                peer.ident,
                notification_str(&notification)
            );
            drop_connection(peer);
            schedule_restart(peer);
        }
        Wire::RouteRefresh(refresh) => fsm_received_refresh(peer, refresh),
        Wire::Operational(operational) => fsm_received_operational(peer, operational),
    }
}

fn fsm_received_open(peer: &mut Peer, open: Open) {
    if peer.state != State::OpenSent {
        peer.send_notification(
            NotifyCode::FsmError,
            match peer.state {
                State::OpenConfirm => fsm_error::UNEXPECTED_IN_OPENCONFIRM,
                State::Established => fsm_error::UNEXPECTED_IN_ESTABLISHED,
                _ => fsm_error::UNEXPECTED_IN_OPENSENT,
            },
            Vec::new(),
        );
        close_session(peer);
        schedule_restart(peer);
        return;
    }

    let asn = open.peer_asn();
    if asn != peer.config.peer_as {
        peer.send_notification(
            NotifyCode::OpenMessageError,
            open_error::BAD_PEER_AS,
            asn.to_be_bytes().to_vec(),
        );
        close_session(peer);
        schedule_restart(peer);
        return;
    }
    let remote_id = open.router_id();
    if remote_id.is_unspecified() || (peer.is_ibgp() && remote_id == peer.router_id) {
        peer.send_notification(
            NotifyCode::OpenMessageError,
            open_error::BAD_BGP_IDENTIFIER,
            Vec::new(),
        );
        close_session(peer);
        schedule_restart(peer);
        return;
    }

    peer.remote_id = remote_id;
    peer.caps_recv = open.caps.clone();
    let negotiated = Negotiated::negotiate(
        peer.local_as,
        asn,
        peer.config.hold_time,
        open.hold_time,
        &peer.caps_sent,
        &open.caps,
    );
    peer.outbox.push(ApiEvent::Negotiated {
        peer: peer.info(),
        session: negotiated.clone(),
    });
    peer.negotiated = Some(negotiated);
    peer.timer.open_wait = None;

    if !peer.send_message(&Wire::Keepalive) {
        backlog_overflow(peer);
        return;
    }
    change_state(peer, State::OpenConfirm);
}

fn fsm_received_keepalive(peer: &mut Peer) {
    timer::refresh_hold_timer(peer);
    match peer.state {
        State::OpenConfirm => {
            change_state(peer, State::Established);
            session_up(peer);
        }
        State::Established => {}
        _ => {
            peer.send_notification(
                NotifyCode::FsmError,
                fsm_error::UNEXPECTED_IN_OPENSENT,
                Vec::new(),
            );
            close_session(peer);
            schedule_restart(peer);
        }
    }
}

fn session_up(peer: &mut Peer) {
    peer.uptime = Some(Instant::now());
    peer.restarting = false;
    timer::backoff_reset(peer);
    let routes = peer.routes.clone();
    peer.rib.replace_restart(&[], &routes);
    kick(peer);
}

fn fsm_received_update(peer: &mut Peer, update: Update) {
    if peer.state != State::Established {
        peer.send_notification(
            NotifyCode::FsmError,
            fsm_error::UNEXPECTED_IN_OPENCONFIRM,
            Vec::new(),
        );
        close_session(peer);
        schedule_restart(peer);
        return;
    }
    timer::refresh_hold_timer(peer);
    if let Some(family) = update.eor() {
        info!("peer {} end-of-rib {}", peer.ident, family);
        return;
    }
    // The only best-path duty BGP-4 leaves us: drop looped routes.
    if !peer.is_ibgp()
        && let Some(attrs) = &update.attrs
        && let Some(aspath) = &attrs.aspath
        && aspath.contains(peer.local_as)
    {
        warn!("peer {} update loops through AS {}", peer.ident, peer.local_as);
    }
}

fn fsm_received_refresh(peer: &mut Peer, refresh: RouteRefresh) {
    if peer.state != State::Established {
        return;
    }
    match refresh.subtype {
        RefreshSubtype::Request => {
            let enhanced = peer
                .negotiated
                .as_ref()
                .map(|negotiated| negotiated.refresh.is_enhanced())
                .unwrap_or(false);
            if enhanced {
                let begin = RouteRefresh::begin(refresh.family);
                if !peer.send_message(&Wire::RouteRefresh(begin)) {
                    backlog_overflow(peer);
                    return;
                }
            }
            peer.rib.resend(enhanced, Some(refresh.family));
            kick(peer);
        }
        // The peer bracketing its own refresh needs nothing from us.
        RefreshSubtype::Begin | RefreshSubtype::End | RefreshSubtype::Unknown(_) => {}
    }
}

fn fsm_received_operational(peer: &mut Peer, operational: Operational) {
    let enabled = peer
        .negotiated
        .as_ref()
        .map(|negotiated| negotiated.operational)
        .unwrap_or(false);
    if !enabled {
        return;
    }
    info!("peer {} operational {}", peer.ident, operational);
}

/// Drain queued work for an ESTABLISHED peer: one operational, one
/// refresh, then a bounded burst of UPDATEs; reschedule while the RIB
/// still holds more.
fn fsm_advertise(peer: &mut Peer) {
    if peer.state != State::Established {
        return;
    }
    let Some(negotiated) = peer.negotiated.clone() else {
        return;
    };

    if let Some(operational) = peer.queued_operational.pop()
        && negotiated.operational
        && !peer.send_message(&Wire::Operational(operational))
    {
        backlog_overflow(peer);
        return;
    }
    if let Some(refresh) = peer.queued_refresh.pop()
        && negotiated.refresh.is_enabled()
        && !peer.send_message(&Wire::RouteRefresh(refresh))
    {
        backlog_overflow(peer);
        return;
    }

    let burst = peer.adv_burst();
    match peer.rib.produce_updates(&negotiated, burst) {
        Ok(updates) => {
            for buf in updates {
                let raw = buf.to_vec();
                if !peer.send_bytes(buf) {
                    backlog_overflow(peer);
                    return;
                }
                peer.outbox.push(ApiEvent::Message {
                    peer: peer.info(),
                    direction: Direction::Send,
                    kind: MessageKind::Update,
                    body: "update".to_string(),
                    raw: Some(raw),
                });
            }
        }
        Err(err) => {
            peer.send_notification(err.code, err.subcode, err.data);
            close_session(peer);
            schedule_restart(peer);
            return;
        }
    }

    if peer.rib.pending() {
        // Yield to the reactor between bursts.
        kick(peer);
        return;
    }

    for family in peer.rib.take_refresh_done() {
        let end = RouteRefresh::end(family);
        if !peer.send_message(&Wire::RouteRefresh(end)) {
            backlog_overflow(peer);
            return;
        }
    }
    for family in peer.rib.eor_due(&negotiated) {
        let marker = Update::eor_marker(family);
        if !peer.send_message(&Wire::Update(Box::new(marker))) {
            backlog_overflow(peer);
            return;
        }
    }
}

pub fn kick(peer: &Peer) {
    let tx = peer.tx.clone();
    let ident = peer.ident;
    let _ = tx.try_send(Message::Event(ident, Event::RibKick));
}

fn backlog_overflow(peer: &mut Peer) {
    // The queue is full, so there is no room for a NOTIFICATION and
    // no point letting the writer drain fifteen thousand messages to
    // a peer that stopped reading.
    warn!("peer {} backlog exceeded {}", peer.ident, MAX_BACKLOG);
    drop_connection(peer);
    schedule_restart(peer);
}

/// Close everything and go to IDLE after telling the peer why.
fn teardown(peer: &mut Peer, code: NotifyCode, subcode: u8) {
    if peer.packet_tx.is_some()
        && !matches!(peer.state, State::Idle | State::Active | State::Connect)
    {
        peer.send_notification(code, subcode, Vec::new());
    }
    close_session(peer);
}

/// Graceful close: the writer is detached so it can put whatever is
/// still queued (a NOTIFICATION handed to it just above) on the wire,
/// and exits on its own once the channel closes here. Aborting it in
/// the same call stack would race the flush.
fn close_session(peer: &mut Peer) {
    if let Some(mut writer) = peer.task.writer.take() {
        writer.detach();
    }
    peer.packet_tx = None;
    peer.task.reader = None;
    peer.task.connect = None;
    peer.local_addr = None;
    change_state(peer, State::Idle);
}

/// Close over a transport that is already dead or has stopped taking
/// our bytes: nothing queued can be delivered, so the writer goes
/// down with the reader.
fn drop_connection(peer: &mut Peer) {
    peer.packet_tx = None;
    peer.task.writer = None;
    peer.task.reader = None;
    peer.task.connect = None;
    peer.local_addr = None;
    change_state(peer, State::Idle);
}

fn schedule_restart(peer: &mut Peer) {
    if peer.admin_down {
        return;
    }
    timer::backoff_bump(peer);
    peer.timer.connect_retry = Some(timer::start_connect_retry_timer(peer));
}

/// Linux TCP MD5 signatures (RFC 2385) for the session socket.
#[cfg(target_os = "linux")]
fn set_md5_key(fd: std::os::unix::io::RawFd, peer: &SocketAddr, key: &str) -> std::io::Result<()> {
    const TCP_MD5SIG_MAXKEYLEN: usize = 80;

    #[repr(C)]
    struct TcpMd5Sig {
        addr: libc::sockaddr_storage,
        flags: u8,
        prefixlen: u8,
        keylen: u16,
        ifindex: u32,
        key: [u8; TCP_MD5SIG_MAXKEYLEN],
    }

    if key.len() > TCP_MD5SIG_MAXKEYLEN {
        return Err(std::io::Error::other("md5 key too long"));
    }
    let mut sig: TcpMd5Sig = unsafe { std::mem::zeroed() };
    match peer {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: 0,
                sin_addr: libc::in_addr {
                    s_addr: u32::from_ne_bytes(v4.ip().octets()),
                },
                sin_zero: [0; 8],
            };
            unsafe {
                std::ptr::copy_nonoverlapping(
                    &sin as *const _ as *const u8,
                    &mut sig.addr as *mut _ as *mut u8,
                    std::mem::size_of::<libc::sockaddr_in>(),
                );
            }
        }
        SocketAddr::V6(v6) => {
            let mut sin6: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_addr.s6_addr = v6.ip().octets();
            unsafe {
                std::ptr::copy_nonoverlapping(
                    &sin6 as *const _ as *const u8,
                    &mut sig.addr as *mut _ as *mut u8,
                    std::mem::size_of::<libc::sockaddr_in6>(),
                );
            }
        }
    }
    sig.keylen = key.len() as u16;
    sig.key[..key.len()].copy_from_slice(key.as_bytes());

    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_MD5SIG,
            &sig as *const _ as *const libc::c_void,
            std::mem::size_of::<TcpMd5Sig>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_md5_key(
    _fd: std::os::unix::io::RawFd,
    _peer: &SocketAddr,
    _key: &str,
) -> std::io::Result<()> {
    Err(std::io::Error::other("md5 not supported on this platform"))
}

/// GTSM (RFC 5082): send with TTL 255 and refuse anything that has
/// travelled more than the configured hop count.
#[cfg(target_os = "linux")]
fn set_ttl_security(fd: std::os::unix::io::RawFd, hops: u8) -> std::io::Result<()> {
    let ttl: libc::c_int = 255;
    let min_ttl: libc::c_int = 256 - hops as libc::c_int;
    for (level, option, value) in [
        (libc::IPPROTO_IP, libc::IP_TTL, ttl),
        (libc::IPPROTO_IP, libc::IP_MINTTL, min_ttl),
    ] {
        let rc = unsafe {
            libc::setsockopt(
                fd,
                level,
                option,
                &value as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_ttl_security(_fd: std::os::unix::io::RawFd, _hops: u8) -> std::io::Result<()> {
    Ok(())
}

fn apply_socket_options(
    socket: &TcpSocket,
    config: &PeerConfig,
    peer_addr: &SocketAddr,
) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let fd = socket.as_raw_fd();
    if let Some(key) = &config.md5_password {
        set_md5_key(fd, peer_addr, key)?;
    }
    if let Some(hops) = config.ttl_security {
        set_ttl_security(fd, hops)?;
    }
    Ok(())
}

fn start_connection(peer: &Peer) -> Job {
    let ident = peer.ident;
    let tx = peer.tx.clone();
    let config = peer.config.clone();
    let bind = config.local_address.or(peer.env.tcp_bind);
    Job::spawn(async move {
        let peer_addr = SocketAddr::new(config.peer_address, config.port);
        let result = async {
            let socket = match peer_addr {
                SocketAddr::V4(_) => TcpSocket::new_v4()?,
                SocketAddr::V6(_) => TcpSocket::new_v6()?,
            };
            socket.set_reuseaddr(true)?;
            apply_socket_options(&socket, &config, &peer_addr)?;
            if let Some(addr) = bind {
                socket.bind(SocketAddr::new(addr, 0))?;
            }
            socket.connect(peer_addr).await
        }
        .await;
        match result {
            Ok(stream) => {
                let _ = tx.send(Message::Event(ident, Event::Connected(stream))).await;
            }
            Err(_) => {
                let _ = tx.send(Message::Event(ident, Event::ConnFail)).await;
            }
        }
    })
}

/// Frame, decode and forward inbound messages. The reader computes
/// the negotiated session itself from the OPEN it sees, so parsing
/// needs no shared state with the FSM.
async fn peer_read(
    ident: IpAddr,
    tx: Sender<Message>,
    mut read_half: OwnedReadHalf,
    local_as: u32,
    local_hold: u16,
    caps_sent: CapabilitySet,
) {
    let mut negotiated = Negotiated::default();
    let mut buf = BytesMut::with_capacity(BGP_MSG_MAX * 2);
    loop {
        match read_half.read_buf(&mut buf).await {
            Ok(0) | Err(_) => {
                let _ = tx.send(Message::Event(ident, Event::ConnFail)).await;
                return;
            }
            Ok(_) => {}
        }
        while frame_ready(&buf) {
            let length = peek_message_length(&buf).max(BGP_HEADER_LEN as usize);
            let length = length.min(buf.len());
            let frame = buf.split_to(length);
            match Wire::decode(&frame, &negotiated) {
                Ok(message) => {
                    if let Wire::Open(open) = &message {
                        negotiated = Negotiated::negotiate(
                            local_as,
                            open.peer_asn(),
                            local_hold,
                            open.hold_time,
                            &caps_sent,
                            &open.caps,
                        );
                    }
                    if tx
                        .send(Message::Event(ident, Event::Received(message, frame.to_vec())))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Message::Event(ident, Event::WireError(err))).await;
                    return;
                }
            }
        }
        buf.reserve(BGP_MSG_MAX);
    }
}

fn start_reader(peer: &Peer, read_half: OwnedReadHalf) -> Job {
    let ident = peer.ident;
    let tx = peer.tx.clone();
    let local_as = peer.local_as;
    let local_hold = peer.config.hold_time;
    let caps_sent = peer.caps_sent.clone();
    Job::spawn(async move {
        peer_read(ident, tx, read_half, local_as, local_hold, caps_sent).await;
    })
}

fn start_writer(
    mut write_half: OwnedWriteHalf,
    mut rx: Receiver<BytesMut>,
    gauge: Arc<BacklogGauge>,
    tx: Sender<Message>,
    ident: IpAddr,
) -> Job {
    Job::spawn(async move {
        while let Some(buf) = rx.recv().await {
            if write_half.write_all(&buf).await.is_err() {
                let _ = tx.send(Message::Event(ident, Event::ConnFail)).await;
                return;
            }
            gauge.depth.fetch_sub(1, Ordering::Relaxed);
            if let Ok(mut at) = gauge.last_progress.lock() {
                *at = Instant::now();
            }
        }
    })
}

/// Route an accepted socket to its peer, applying collision rules.
pub fn accept(bgp: &mut Bgp, stream: TcpStream, sockaddr: SocketAddr) {
    let peer_addr = sockaddr.ip();
    let Some(peer) = bgp.peers.get_mut(&peer_addr) else {
        // Unknown source; a plain close is the answer.
        drop(stream);
        return;
    };
    match peer.state {
        State::Idle if peer.admin_down => drop(stream),
        State::Idle | State::Active | State::Connect => {
            peer.task.connect = None;
            if peer.state == State::Idle {
                change_state(peer, State::Connect);
            }
            fsm_connected(peer, stream);
            timer::update_timers(peer);
        }
        State::OpenSent => {
            // Too early to compare identifiers; the lower address
            // pair keeps its connection (simplified RFC 4271 §6.8).
            reject_connection(stream, NotifyCode::Cease, cease::CONNECTION_REJECTED);
        }
        State::OpenConfirm => {
            // Collision: the side with the higher identifier keeps
            // its connection; ours loses when the remote id is
            // higher.
            if u32::from(peer.remote_id) > u32::from(peer.router_id) {
                peer.send_notification(
                    NotifyCode::Cease,
                    cease::COLLISION_RESOLUTION,
                    Vec::new(),
                );
                close_session(peer);
                change_state(peer, State::Connect);
                fsm_connected(peer, stream);
                timer::update_timers(peer);
            } else {
                reject_connection(stream, NotifyCode::Cease, cease::COLLISION_RESOLUTION);
            }
        }
        State::Established => {
            reject_connection(stream, NotifyCode::Cease, cease::CONNECTION_REJECTED);
        }
    }
}

/// Answer an unwanted connection with a NOTIFICATION, bounded so a
/// non-reading peer cannot pin the socket.
fn reject_connection(stream: TcpStream, code: NotifyCode, subcode: u8) {
    use std::time::Duration;
    use tokio::time::timeout;

    tokio::spawn(async move {
        let notification = Notification::new(code, subcode, Vec::new());
        let bytes = notification.encode();
        let mut stream = stream;
        let _ = timeout(Duration::from_secs(5), async {
            let _ = stream.write_all(&bytes).await;
            let _ = stream.shutdown().await;
        })
        .await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_masks() {
        use State::*;
        assert!(Idle.allowed_from() & Established as u8 != 0);
        assert!(OpenSent.allowed_from() & Connect as u8 != 0);
        assert!(OpenSent.allowed_from() & Active as u8 == 0);
        assert!(Established.allowed_from() & OpenConfirm as u8 != 0);
        assert!(Established.allowed_from() & Connect as u8 == 0);
        assert!(Connect.allowed_from() & Active as u8 != 0);
        assert!(Active.allowed_from() & OpenSent as u8 != 0);
    }

    #[test]
    #[should_panic(expected = "fsm transition violation")]
    fn off_table_transition_panics() {
        let (tx, _rx) = mpsc::channel(4);
        let config = PeerConfig {
            peer_address: "192.0.2.2".parse().unwrap(),
            peer_as: 65002,
            local_address: None,
            local_as: None,
            router_id: None,
            hold_time: 90,
            port: 179,
            passive: false,
            md5_password: None,
            ttl_security: None,
            max_attempts: 0,
            rate_limit: false,
            group: None,
            families: Vec::new(),
            capability: Default::default(),
            routes: Vec::new(),
        };
        let mut peer = Peer::new(
            "192.0.2.2".parse().unwrap(),
            config,
            EnvConfig::default(),
            65001,
            "10.0.0.1".parse().unwrap(),
            tx,
        );
        // IDLE straight to ESTABLISHED is not in the table.
        change_state(&mut peer, State::Established);
    }
}
