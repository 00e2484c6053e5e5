use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{error, info, warn};

use bgp_wire::{Family, Update, Message as Wire, NotifyCode, cease};

use crate::api::command::{self, Op, ParsedCommand, RouteSpec, Target};
use crate::api::encoder::ApiEvent;
use crate::api::process::ProcessSet;
use crate::config::{Config, ConfigDiff, PeerConfig};
use crate::peer::{self, Event, Peer};
use crate::rib::Change;
use crate::task::Job;

/// Everything the reactor multiplexes arrives as one of these.
#[derive(Debug)]
pub enum Message {
    Event(IpAddr, Event),
    Accept(TcpStream, SocketAddr),
    Command { process: String, line: String },
    ProcessDown(String),
}

/// The single supervisor: owns the peers, the listeners and the
/// helper processes, and drives all of them from one loop.
pub struct Bgp {
    pub config: Config,
    pub config_path: PathBuf,
    pub router_id: Ipv4Addr,
    pub local_as: u32,
    pub peers: BTreeMap<IpAddr, Peer>,
    pub tx: Sender<Message>,
    rx: Receiver<Message>,
    pub processes: ProcessSet,
    listen_tasks: Vec<Job>,
    exit: Option<i32>,
}

fn ipv6_only_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_only_v6(true)?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    let std_listener: std::net::TcpListener = socket.into();
    std_listener.set_nonblocking(true)?;
    TcpListener::from_std(std_listener)
}

impl Bgp {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel(8192);
        let processes = ProcessSet::new(config.env.clone(), tx.clone());
        let mut bgp = Self {
            router_id: config.router_id,
            local_as: config.local_as,
            config_path,
            peers: BTreeMap::new(),
            tx,
            rx,
            processes,
            listen_tasks: Vec::new(),
            exit: None,
            config: config.clone(),
        };
        for peer_config in config.peers.iter() {
            bgp.peer_add(peer_config.clone());
        }
        bgp
    }

    fn peer_add(&mut self, config: PeerConfig) {
        let ident = config.peer_address;
        let mut peer = Peer::new(
            ident,
            config,
            self.config.env.clone(),
            self.local_as,
            self.router_id,
            self.tx.clone(),
        );
        peer.routes = Self::configured_changes(&peer.config);
        self.peers.insert(ident, peer);
    }

    /// Render a peer's configured route strings into changes.
    fn configured_changes(config: &PeerConfig) -> Vec<Change> {
        let mut changes = Vec::new();
        for route in config.routes.iter() {
            let line = format!("announce {}", route);
            match command::parse(&line) {
                Ok(ParsedCommand {
                    op: Op::Routes(specs),
                    ..
                }) => {
                    for spec in specs {
                        match spec.resolve(config.local_address) {
                            Ok(mut resolved) => changes.append(&mut resolved),
                            Err(err) => {
                                warn!("neighbor {}: {}: {}", config.peer_address, route, err)
                            }
                        }
                    }
                }
                Ok(_) => warn!(
                    "neighbor {}: not a route: {}",
                    config.peer_address, route
                ),
                Err(err) => warn!("neighbor {}: {}: {}", config.peer_address, route, err),
            }
        }
        changes
    }

    async fn listen(&mut self) -> anyhow::Result<()> {
        let mut bound = 0usize;
        for addr in self.config.listen_addrs() {
            let listener = if addr.is_ipv6() {
                ipv6_only_listener(addr)
            } else {
                match std::net::TcpListener::bind(addr) {
                    Ok(listener) => {
                        listener.set_nonblocking(true)?;
                        TcpListener::from_std(listener)
                    }
                    Err(err) => Err(err),
                }
            };
            match listener {
                Ok(listener) => {
                    bound += 1;
                    let tx = self.tx.clone();
                    self.listen_tasks.push(Job::spawn(async move {
                        loop {
                            match listener.accept().await {
                                Ok((socket, sockaddr)) => {
                                    if tx.send(Message::Accept(socket, sockaddr)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    warn!("accept error on {}: {}", addr, err);
                                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                                }
                            }
                        }
                    }));
                    info!("listening on {}", addr);
                }
                Err(err) => warn!("cannot listen on {}: {}", addr, err),
            }
        }
        if bound == 0 {
            anyhow::bail!("no listening socket could be bound");
        }
        Ok(())
    }

    fn drain_outbox(&mut self, id: IpAddr) {
        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        let events: Vec<ApiEvent> = peer.outbox.drain(..).collect();
        for event in events.iter() {
            self.processes.emit(event);
        }
    }

    pub fn process_msg(&mut self, msg: Message) {
        match msg {
            Message::Event(id, event) => {
                peer::fsm(self, id, event);
                self.drain_outbox(id);
            }
            Message::Accept(socket, sockaddr) => {
                let id = sockaddr.ip();
                peer::accept(self, socket, sockaddr);
                self.drain_outbox(id);
            }
            Message::Command { process, line } => {
                self.handle_command(&process, &line);
            }
            Message::ProcessDown(name) => {
                if self.processes.handle_down(&name) {
                    error!("process {} is fatal with terminate-on-error", name);
                    self.exit = Some(3);
                }
            }
        }
    }

    fn target_peers(&self, target: &Target) -> Vec<IpAddr> {
        match target {
            Target::All => self.peers.keys().cloned().collect(),
            Target::Neighbor(addr) => {
                if self.peers.contains_key(addr) {
                    vec![*addr]
                } else {
                    Vec::new()
                }
            }
            Target::Group(name) => self
                .peers
                .iter()
                .filter(|(_, peer)| peer.config.group.as_deref() == Some(name.as_str()))
                .map(|(addr, _)| *addr)
                .collect(),
        }
    }

    fn apply_routes(&mut self, targets: &[IpAddr], specs: &[RouteSpec]) -> bool {
        let mut ok = !targets.is_empty();
        for id in targets {
            let Some(peer) = self.peers.get_mut(id) else {
                continue;
            };
            for spec in specs {
                match spec.resolve(peer.info().local_address) {
                    Ok(changes) => {
                        for change in changes {
                            peer.rib.insert(change, spec.watchdog.clone());
                        }
                    }
                    Err(err) => {
                        warn!("neighbor {}: {}", id, err);
                        ok = false;
                    }
                }
            }
            if peer.state.is_established() {
                peer::kick(peer);
            }
        }
        ok
    }

    fn handle_command(&mut self, process: &str, line: &str) {
        let parsed = match command::parse(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("process {}: {}: {}", process, line, err);
                self.processes.answer(process, false);
                return;
            }
        };
        let targets = self.target_peers(&parsed.target);
        let ok = match parsed.op {
            Op::Routes(specs) => self.apply_routes(&targets, &specs),
            Op::Refresh(family) => self.queue_refresh(&targets, family),
            Op::Eor(family) => self.send_eor(&targets, family),
            Op::Operational(operational) => {
                let mut any = false;
                for id in &targets {
                    if let Some(peer) = self.peers.get_mut(id) {
                        peer.queued_operational.push(operational.clone());
                        if peer.state.is_established() {
                            peer::kick(peer);
                        }
                        any = true;
                    }
                }
                any
            }
            Op::Watchdog { name, announce } => {
                for id in &targets {
                    if let Some(peer) = self.peers.get_mut(id) {
                        peer.rib.watchdog_set(&name, announce);
                        if peer.state.is_established() {
                            peer::kick(peer);
                        }
                    }
                }
                !targets.is_empty()
            }
            Op::SetAck(value) => {
                self.processes.set_ack(process, value);
                true
            }
            Op::Reload => {
                self.reload();
                true
            }
            Op::Restart => {
                for id in &targets {
                    let _ = self.tx.try_send(Message::Event(*id, Event::Reestablish));
                }
                true
            }
            Op::Shutdown => {
                self.exit = Some(0);
                true
            }
            Op::Version => {
                self.processes
                    .respond(process, concat!("heron ", env!("CARGO_PKG_VERSION")));
                true
            }
            Op::Help => {
                self.processes.respond(
                    process,
                    "announce route|flow|attribute|route-refresh|eor|operational|watchdog, \
                     withdraw route|flow|watchdog, neighbor <ip> announce-watchdog|withdraw-watchdog, \
                     set ack, reload, restart, shutdown, version",
                );
                true
            }
        };
        self.processes.answer(process, ok);
    }

    fn queue_refresh(&mut self, targets: &[IpAddr], family: Family) -> bool {
        let mut any = false;
        for id in targets {
            if let Some(peer) = self.peers.get_mut(id) {
                peer.queued_refresh
                    .push(bgp_wire::RouteRefresh::new(family));
                if peer.state.is_established() {
                    peer::kick(peer);
                }
                any = true;
            }
        }
        any
    }

    fn send_eor(&mut self, targets: &[IpAddr], family: Family) -> bool {
        let mut any = false;
        for id in targets {
            if let Some(peer) = self.peers.get_mut(id)
                && peer.state.is_established()
            {
                let marker = Update::eor_marker(family);
                any |= peer.send_message(&Wire::Update(Box::new(marker)));
            }
        }
        for id in targets {
            self.drain_outbox(*id);
        }
        any
    }

    /// SIGHUP: rebuild the peer and helper sets against the new
    /// configuration, keeping what survived intact.
    pub fn reload(&mut self) {
        let path = Config::search(&self.config_path);
        let new_config = match Config::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("reload failed, keeping configuration: {}", err);
                return;
            }
        };
        let diff = ConfigDiff::between(&self.config, &new_config);
        info!(
            "reload: peers +{} -{} ~{}, processes +{} -{} ~{}",
            diff.peers_added.len(),
            diff.peers_removed.len(),
            diff.peers_changed.len(),
            diff.processes_added.len(),
            diff.processes_removed.len(),
            diff.processes_changed.len(),
        );

        for id in diff.peers_removed.iter() {
            if let Some(peer) = self.peers.get_mut(id) {
                peer.send_notification(
                    NotifyCode::Cease,
                    cease::PEER_DECONFIGURED,
                    Vec::new(),
                );
            }
            self.peers.remove(id);
        }
        for id in diff.peers_added.iter() {
            if let Some(config) = new_config.peer(id) {
                self.peer_add(config.clone());
                let _ = self.tx.try_send(Message::Event(*id, Event::Start));
            }
        }
        for id in diff.peers_changed.iter() {
            let Some(new_peer) = new_config.peer(id) else {
                continue;
            };
            let Some(peer) = self.peers.get_mut(id) else {
                continue;
            };
            let transport_changed = {
                let mut stripped_old = peer.config.clone();
                let mut stripped_new = new_peer.clone();
                stripped_old.routes = Vec::new();
                stripped_new.routes = Vec::new();
                stripped_old != stripped_new
            };
            peer.config = new_peer.clone();
            if transport_changed {
                let _ = self.tx.try_send(Message::Event(*id, Event::Reestablish));
                let _ = self.tx.try_send(Message::Event(*id, Event::Start));
            }
        }
        // Every surviving peer gets the new change set; the RIB works
        // out the minimal announcements and withdrawals.
        for (id, peer) in self.peers.iter_mut() {
            if let Some(config) = new_config.peer(id) {
                let previous = std::mem::take(&mut peer.routes);
                let changes = Self::configured_changes(config);
                peer.rib.replace_reload(&previous, &changes);
                peer.routes = changes;
                if peer.state.is_established() {
                    peer::kick(peer);
                }
            }
        }

        for name in diff.processes_removed.iter() {
            self.processes.terminate(name);
        }
        for name in diff.processes_changed.iter() {
            self.processes.terminate(name);
        }
        self.processes.set_env(new_config.env.clone());
        for process in new_config.processes.iter() {
            if diff.processes_added.contains(&process.name)
                || diff.processes_changed.contains(&process.name)
            {
                if let Err(err) = self.processes.spawn(process) {
                    error!("process {} failed to start: {}", process.name, err);
                }
            }
        }

        self.config = new_config;
    }

    async fn shutdown(&mut self) {
        info!("shutting down");
        let ids: Vec<IpAddr> = self.peers.keys().cloned().collect();
        for id in ids {
            peer::fsm(self, id, Event::Stop);
            self.drain_outbox(id);
        }
        // The writers were detached with the shutdown NOTIFICATIONs
        // queued; give them a bounded window to reach the sockets
        // before the runtime goes away.
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        self.processes.emit(&ApiEvent::Signal { name: "shutdown" });
        self.processes.shutdown().await;
    }

    /// The reactor loop. Returns the process exit code.
    pub async fn event_loop(&mut self) -> i32 {
        if let Err(err) = self.listen().await {
            error!("{}", err);
            return 1;
        }
        let process_configs = self.config.processes.clone();
        for process in process_configs.iter() {
            if let Err(err) = self.processes.spawn(process) {
                error!("process {} failed to start: {}", process.name, err);
                if self.config.env.terminate_on_error {
                    return 3;
                }
            }
        }
        let ids: Vec<IpAddr> = self.peers.keys().cloned().collect();
        for id in ids {
            peer::fsm(self, id, Event::Start);
            self.drain_outbox(id);
        }

        let mut sighup = signal(SignalKind::hangup()).expect("signal handler");
        let mut sigusr1 = signal(SignalKind::user_defined1()).expect("signal handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("signal handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("signal handler");

        loop {
            tokio::select! {
                Some(msg) = self.rx.recv() => {
                    self.process_msg(msg);
                }
                _ = sighup.recv() => {
                    self.processes.emit(&ApiEvent::Signal { name: "reload" });
                    self.reload();
                }
                _ = sigusr1.recv() => {
                    self.processes.emit(&ApiEvent::Signal { name: "reload" });
                    self.reload();
                }
                _ = sigterm.recv() => {
                    self.shutdown().await;
                    return 0;
                }
                _ = sigint.recv() => {
                    self.shutdown().await;
                    return 0;
                }
            }
            if let Some(code) = self.exit {
                if code == 0 {
                    self.shutdown().await;
                }
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        serde_yaml::from_str(
            r#"
router_id: 10.0.0.1
local_as: 65001
peers:
  - peer_address: 192.0.2.2
    peer_as: 65002
    local_address: 192.0.2.1
    group: edge
    routes:
      - route 10.0.0.0/24 next-hop self
  - peer_address: 192.0.2.3
    peer_as: 65003
    group: edge
  - peer_address: 192.0.2.4
    peer_as: 65004
"#,
        )
        .unwrap()
    }

    #[test]
    fn configured_routes_become_changes() {
        let bgp = Bgp::new(test_config(), PathBuf::from("test.yaml"));
        let peer = bgp.peers.get(&"192.0.2.2".parse().unwrap()).unwrap();
        assert_eq!(peer.routes.len(), 1);
        assert_eq!(
            peer.routes[0].attrs.nexthop.unwrap().nexthop.to_string(),
            "192.0.2.1"
        );
    }

    #[test]
    fn group_targeting_resolves_members() {
        let bgp = Bgp::new(test_config(), PathBuf::from("test.yaml"));
        let edge = bgp.target_peers(&Target::Group("edge".into()));
        assert_eq!(edge.len(), 2);
        let all = bgp.target_peers(&Target::All);
        assert_eq!(all.len(), 3);
        let one = bgp.target_peers(&Target::Neighbor("192.0.2.4".parse().unwrap()));
        assert_eq!(one.len(), 1);
        let none = bgp.target_peers(&Target::Neighbor("198.51.100.1".parse().unwrap()));
        assert!(none.is_empty());
    }

    #[test]
    fn command_inserts_into_target_ribs() {
        let mut bgp = Bgp::new(test_config(), PathBuf::from("test.yaml"));
        bgp.handle_command(
            "tester",
            "group edge announce route 10.9.0.0/16 next-hop 192.0.2.9",
        );
        for id in ["192.0.2.2", "192.0.2.3"] {
            let peer = bgp.peers.get(&id.parse().unwrap()).unwrap();
            assert!(peer.rib.pending(), "peer {} missed the route", id);
        }
        let other = bgp.peers.get(&"192.0.2.4".parse().unwrap()).unwrap();
        assert!(!other.rib.pending());
    }

    #[test]
    fn watchdog_command_gates_routes() {
        let mut bgp = Bgp::new(test_config(), PathBuf::from("test.yaml"));
        let id: IpAddr = "192.0.2.4".parse().unwrap();
        bgp.handle_command(
            "tester",
            "neighbor 192.0.2.4 withdraw watchdog dns",
        );
        bgp.handle_command(
            "tester",
            "neighbor 192.0.2.4 announce route 10.9.0.0/16 next-hop 192.0.2.9 watchdog dns",
        );
        assert!(!bgp.peers.get(&id).unwrap().rib.pending());

        bgp.handle_command("tester", "neighbor 192.0.2.4 announce-watchdog dns");
        assert!(bgp.peers.get(&id).unwrap().rib.pending());
    }

    #[test]
    fn bad_command_is_rejected() {
        let mut bgp = Bgp::new(test_config(), PathBuf::from("test.yaml"));
        // No panic, no state change.
        bgp.handle_command("tester", "announce nonsense");
        bgp.handle_command("tester", "announce route not-a-prefix");
        for peer in bgp.peers.values() {
            assert!(!peer.rib.pending());
        }
    }

    #[test]
    fn shutdown_command_sets_exit() {
        let mut bgp = Bgp::new(test_config(), PathBuf::from("test.yaml"));
        bgp.handle_command("tester", "shutdown");
        assert_eq!(bgp.exit, Some(0));
    }
}
