use std::collections::HashMap;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{self, Sender, UnboundedSender};
use tracing::{error, info, warn};

use crate::config::{EnvConfig, ProcessConfig};
use crate::inst;
use crate::task::Job;

use super::encoder::{ApiEvent, Direction, MessageKind, json_line, text_line};

/// A helper may die and come back at most this many times inside the
/// respawn window before it is given up on.
pub const RESPAWN_LIMIT: usize = 5;
pub const RESPAWN_WINDOW: Duration = Duration::from_secs(60);
/// Grace given to a helper at shutdown before SIGKILL.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct ProcessHandle {
    config: ProcessConfig,
    child: Option<Child>,
    /// Queued lines bound for the helper's stdin; the writer task
    /// drains and flushes immediately so ACK ordering holds.
    stdin_tx: Option<UnboundedSender<String>>,
    writer: Option<Job>,
    reader: Option<Job>,
    ack: bool,
    respawns: Vec<Instant>,
    dead: bool,
}

impl ProcessHandle {
    fn wants_message(&self, direction: Direction, kind: MessageKind) -> bool {
        let kinds = match direction {
            Direction::Receive => &self.config.receive,
            Direction::Send => &self.config.send,
        };
        kinds.iter().any(|wanted| {
            wanted == kind.as_str() || wanted == "parsed" || wanted == "packets"
        })
    }

    fn wants_raw(&self, direction: Direction) -> bool {
        let kinds = match direction {
            Direction::Receive => &self.config.receive,
            Direction::Send => &self.config.send,
        };
        kinds.iter().any(|wanted| wanted == "packets")
    }

    fn wants_peer(&self, peer: &IpAddr) -> bool {
        match self.config.neighbor.as_deref() {
            None | Some("*") => true,
            Some(pattern) => pattern == peer.to_string(),
        }
    }

    fn wants(&self, event: &ApiEvent) -> bool {
        match event {
            ApiEvent::Message {
                peer,
                direction,
                kind,
                ..
            } => self.wants_peer(&peer.peer_address) && self.wants_message(*direction, *kind),
            ApiEvent::Fsm { peer, .. } => {
                self.config.fsm && self.wants_peer(&peer.peer_address)
            }
            ApiEvent::NeighborChange { peer, .. } => {
                self.config.neighbor_changes && self.wants_peer(&peer.peer_address)
            }
            ApiEvent::Negotiated { peer, .. } => {
                self.config.negotiated && self.wants_peer(&peer.peer_address)
            }
            ApiEvent::Signal { .. } => self.config.signal,
        }
    }

    fn write_line(&self, line: String) -> bool {
        match &self.stdin_tx {
            Some(tx) => tx.send(line).is_ok(),
            None => false,
        }
    }
}

/// The set of running helpers. Owned by the reactor; every command
/// line a helper prints arrives back through the reactor channel.
pub struct ProcessSet {
    procs: HashMap<String, ProcessHandle>,
    env: EnvConfig,
    tx: Sender<inst::Message>,
}

impl ProcessSet {
    pub fn new(env: EnvConfig, tx: Sender<inst::Message>) -> Self {
        Self {
            procs: HashMap::new(),
            env,
            tx,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.procs.keys().cloned().collect()
    }

    pub fn set_env(&mut self, env: EnvConfig) {
        self.env = env;
    }

    /// Launch one helper and wire its stdio to the reactor.
    pub fn spawn(&mut self, config: &ProcessConfig) -> std::io::Result<()> {
        let mut command = Command::new(&config.run[0]);
        command
            .args(&config.run[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            // Helpers must not emit terminal escapes into the pipe.
            .env("TERM", "dumb")
            .kill_on_drop(true);
        let mut child = command.spawn()?;

        let stdin = child.stdin.take().expect("stdin is piped");
        let stdout = child.stdout.take().expect("stdout is piped");
        let name = config.name.clone();

        // Reader: one command per line, relayed to the reactor.
        let reader_tx = self.tx.clone();
        let reader_name = name.clone();
        let reader = Job::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if reader_tx
                            .send(inst::Message::Command {
                                process: reader_name.clone(),
                                line,
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => {
                        let _ = reader_tx
                            .send(inst::Message::ProcessDown(reader_name.clone()))
                            .await;
                        return;
                    }
                }
            }
        });

        // Writer: drain the queue, flushing each line right away.
        let (stdin_tx, stdin_rx) = mpsc::unbounded_channel::<String>();
        let writer_tx = self.tx.clone();
        let writer_name = name.clone();
        let writer = Job::spawn(process_writer(stdin, stdin_rx, writer_tx, writer_name));

        let ack = config.ack.unwrap_or(self.env.api_ack);
        let handle = self.procs.entry(name.clone()).or_insert(ProcessHandle {
            config: config.clone(),
            child: None,
            stdin_tx: None,
            writer: None,
            reader: None,
            ack,
            respawns: Vec::new(),
            dead: false,
        });
        handle.config = config.clone();
        handle.child = Some(child);
        handle.stdin_tx = Some(stdin_tx);
        handle.writer = Some(writer);
        handle.reader = Some(reader);
        handle.dead = false;
        info!("process {} started", name);
        Ok(())
    }

    /// A helper's stdout closed. Respawn within the rate cap; past
    /// it, either give up on the helper or on the whole speaker.
    /// Returns true when the speaker must exit (terminate-on-error).
    pub fn handle_down(&mut self, name: &str) -> bool {
        let Some(handle) = self.procs.get_mut(name) else {
            return false;
        };
        if handle.dead {
            return false;
        }
        handle.child = None;
        handle.stdin_tx = None;
        handle.writer = None;
        handle.reader = None;

        if !self.env.api_respawn {
            handle.dead = true;
            warn!("process {} exited, respawn disabled", name);
            return self.env.terminate_on_error;
        }

        let now = Instant::now();
        handle.respawns.retain(|at| now.duration_since(*at) < RESPAWN_WINDOW);
        handle.respawns.push(now);
        if handle.respawns.len() > RESPAWN_LIMIT {
            handle.dead = true;
            error!(
                "process {} died {} times inside {:?}, giving up",
                name,
                handle.respawns.len(),
                RESPAWN_WINDOW
            );
            return self.env.terminate_on_error;
        }

        let config = handle.config.clone();
        warn!("process {} exited, respawning", name);
        if let Err(err) = self.spawn(&config) {
            error!("process {} respawn failed: {}", name, err);
            if let Some(handle) = self.procs.get_mut(name) {
                handle.dead = true;
            }
            return self.env.terminate_on_error;
        }
        false
    }

    pub fn terminate(&mut self, name: &str) {
        if let Some(mut handle) = self.procs.remove(name) {
            info!("process {} terminated", name);
            if let Some(mut child) = handle.child.take() {
                tokio::spawn(async move {
                    let _ = tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await;
                    let _ = child.kill().await;
                });
            }
        }
    }

    /// Graceful shutdown: close every stdin and give each child the
    /// grace period before the kill.
    pub async fn shutdown(&mut self) {
        let names = self.names();
        for name in names {
            if let Some(mut handle) = self.procs.remove(&name) {
                // Closing the queue lets the writer drain what is
                // buffered before the child goes away.
                handle.stdin_tx = None;
                if let Some(mut writer) = handle.writer.take() {
                    writer.detach();
                }
                if let Some(mut child) = handle.child.take() {
                    if tokio::time::timeout(SHUTDOWN_GRACE, child.wait())
                        .await
                        .is_err()
                    {
                        let _ = child.kill().await;
                    }
                }
            }
        }
    }

    /// Deliver one event to every helper whose subscriptions match.
    pub fn emit(&mut self, event: &ApiEvent) {
        let mut broken: Vec<String> = Vec::new();
        for (name, handle) in self.procs.iter() {
            if handle.dead || !handle.wants(event) {
                continue;
            }
            let mut event = event.clone();
            if let ApiEvent::Message { raw, direction, .. } = &mut event
                && !handle.wants_raw(*direction)
            {
                *raw = None;
            }
            let line = if handle.config.json() {
                json_line(&event)
            } else {
                text_line(&event)
            };
            if !handle.write_line(line) {
                broken.push(name.clone());
            }
        }
        for name in broken {
            self.handle_down(&name);
        }
    }

    pub fn ack_enabled(&self, name: &str) -> bool {
        self.procs.get(name).map(|handle| handle.ack).unwrap_or(false)
    }

    pub fn set_ack(&mut self, name: &str, ack: bool) {
        if let Some(handle) = self.procs.get_mut(name) {
            handle.ack = ack;
        }
    }

    /// Answer a command; must reach the helper before its next read.
    pub fn answer(&mut self, name: &str, ok: bool) {
        let Some(handle) = self.procs.get(name) else {
            return;
        };
        if !handle.ack {
            return;
        }
        let line = match (handle.config.json(), ok) {
            (true, true) => r#"{ "result": "done" }"#.to_string(),
            (true, false) => r#"{ "result": "error" }"#.to_string(),
            (false, true) => "done".to_string(),
            (false, false) => "error".to_string(),
        };
        if !handle.write_line(line) {
            self.handle_down(name);
        }
    }

    pub fn respond(&mut self, name: &str, text: &str) {
        if let Some(handle) = self.procs.get(name) {
            if !handle.write_line(text.to_string()) {
                self.handle_down(name);
            }
        }
    }
}

async fn process_writer(
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<String>,
    tx: Sender<inst::Message>,
    name: String,
) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if stdin.write_all(line.as_bytes()).await.is_err()
            || stdin.flush().await.is_err()
        {
            let _ = tx.send(inst::Message::ProcessDown(name)).await;
            return;
        }
    }
}
