use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use bgp_wire::{Afi, Family, Safi};

/// Configuration errors abort startup with exit code 2.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

fn default_hold_time() -> u16 {
    90
}

fn default_port() -> u16 {
    179
}

fn default_families() -> Vec<FamilyConfig> {
    vec![FamilyConfig {
        afi: "ipv4".into(),
        safi: "unicast".into(),
    }]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FamilyConfig {
    pub afi: String,
    pub safi: String,
}

impl FamilyConfig {
    pub fn family(&self) -> Option<Family> {
        Some(Family::new(
            parse_afi(&self.afi)?,
            parse_safi(&self.safi)?,
        ))
    }
}

pub fn parse_afi(s: &str) -> Option<Afi> {
    match s {
        "ipv4" => Some(Afi::Ipv4),
        "ipv6" => Some(Afi::Ipv6),
        "l2vpn" => Some(Afi::L2vpn),
        "bgp-ls" | "bgpls" => Some(Afi::Bgpls),
        _ => None,
    }
}

pub fn parse_safi(s: &str) -> Option<Safi> {
    match s {
        "unicast" => Some(Safi::Unicast),
        "multicast" => Some(Safi::Multicast),
        "nlri-mpls" | "labeled-unicast" => Some(Safi::LabeledUnicast),
        "vpls" => Some(Safi::Vpls),
        "evpn" => Some(Safi::Evpn),
        "bgp-ls" | "bgpls" => Some(Safi::Bgpls),
        "bgp-ls-vpn" => Some(Safi::BgplsVpn),
        "mpls-vpn" => Some(Safi::MplsVpn),
        "multicast-vpn" => Some(Safi::MulticastVpn),
        "flow" => Some(Safi::Flowspec),
        "flow-vpn" => Some(Safi::FlowspecVpn),
        _ => None,
    }
}

/// Per-peer capability toggles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub route_refresh: bool,
    pub enhanced_route_refresh: bool,
    pub four_octet_as: bool,
    pub extended_message: bool,
    pub graceful_restart: Option<u16>,
    pub add_path: Option<String>,
    pub multi_session: bool,
    pub operational: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            route_refresh: true,
            enhanced_route_refresh: false,
            four_octet_as: true,
            extended_message: false,
            graceful_restart: None,
            add_path: None,
            multi_session: false,
            operational: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PeerConfig {
    pub peer_address: IpAddr,
    pub peer_as: u32,
    pub local_address: Option<IpAddr>,
    pub local_as: Option<u32>,
    pub router_id: Option<Ipv4Addr>,
    #[serde(default = "default_hold_time")]
    pub hold_time: u16,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub passive: bool,
    #[serde(default)]
    pub md5_password: Option<String>,
    /// GTSM hop bound; installs a minimum inbound TTL.
    #[serde(default)]
    pub ttl_security: Option<u8>,
    /// Reconnect cap, 0 means unlimited.
    #[serde(default)]
    pub max_attempts: u32,
    /// Emit one UPDATE per scheduler pass instead of a burst.
    #[serde(default)]
    pub rate_limit: bool,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default = "default_families")]
    pub families: Vec<FamilyConfig>,
    #[serde(default)]
    pub capability: CapabilityConfig,
    /// Initial announcements, in the helper command grammar
    /// ("route <prefix> next-hop <ip> ...").
    #[serde(default)]
    pub routes: Vec<String>,
}

impl PeerConfig {
    pub fn hold_time_valid(&self) -> bool {
        self.hold_time == 0 || self.hold_time >= 3
    }

    pub fn family_set(&self) -> Vec<Family> {
        self.families
            .iter()
            .filter_map(|family| family.family())
            .collect()
    }
}

fn default_encoder() -> String {
    "text".into()
}

/// One helper process definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    /// argv; the first element is the executable.
    pub run: Vec<String>,
    #[serde(default = "default_encoder")]
    pub encoder: String,
    #[serde(default)]
    pub ack: Option<bool>,
    /// Message kinds relayed for received messages.
    #[serde(default)]
    pub receive: Vec<String>,
    /// Message kinds relayed for sent messages.
    #[serde(default)]
    pub send: Vec<String>,
    #[serde(default)]
    pub neighbor_changes: bool,
    #[serde(default)]
    pub negotiated: bool,
    #[serde(default)]
    pub fsm: bool,
    #[serde(default)]
    pub signal: bool,
    /// Restrict events to one neighbor address ("*" or absent: all).
    #[serde(default)]
    pub neighbor: Option<String>,
}

impl ProcessConfig {
    pub fn json(&self) -> bool {
        self.encoder == "json"
    }
}

/// Global toggles, overridable through the environment
/// (HERON_API_ACK=false, HERON_BGP_OPENWAIT=30, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub api_ack: bool,
    pub api_respawn: bool,
    pub terminate_on_error: bool,
    pub tcp_bind: Option<IpAddr>,
    pub tcp_attempts: u32,
    pub bgp_openwait: u16,
    pub bgp_passive: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_ack: true,
            api_respawn: true,
            terminate_on_error: false,
            tcp_bind: None,
            tcp_attempts: 0,
            bgp_openwait: 60,
            bgp_passive: false,
        }
    }
}

impl EnvConfig {
    fn apply_environment(&mut self) {
        let truthy = |v: String| matches!(v.as_str(), "1" | "true" | "yes");
        if let Ok(v) = std::env::var("HERON_API_ACK") {
            self.api_ack = truthy(v);
        }
        if let Ok(v) = std::env::var("HERON_API_RESPAWN") {
            self.api_respawn = truthy(v);
        }
        if let Ok(v) = std::env::var("HERON_API_TERMINATE") {
            self.terminate_on_error = truthy(v);
        }
        if let Ok(v) = std::env::var("HERON_TCP_BIND")
            && let Ok(addr) = v.parse()
        {
            self.tcp_bind = Some(addr);
        }
        if let Ok(v) = std::env::var("HERON_TCP_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            self.tcp_attempts = n;
        }
        if let Ok(v) = std::env::var("HERON_BGP_OPENWAIT")
            && let Ok(n) = v.parse()
        {
            self.bgp_openwait = n;
        }
        if let Ok(v) = std::env::var("HERON_BGP_PASSIVE") {
            self.bgp_passive = truthy(v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub router_id: Ipv4Addr,
    pub local_as: u32,
    #[serde(default)]
    pub listen: Vec<SocketAddr>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
    #[serde(default)]
    pub env: EnvConfig,
}

impl Config {
    /// Load and validate a configuration file. The text grammar is
    /// owned by the configuration collaborator; what we read here is
    /// its rendered object graph.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.env.apply_environment();
        config.validate()?;
        Ok(config)
    }

    /// Search order: explicit path, then $ETC/heron, then /etc/heron.
    pub fn search(name: &Path) -> PathBuf {
        if name.is_absolute() || name.exists() {
            return name.to_path_buf();
        }
        if let Ok(etc) = std::env::var("ETC") {
            let candidate = Path::new(&etc).join("heron").join(name);
            if candidate.exists() {
                return candidate;
            }
        }
        let candidate = Path::new("/etc/heron").join(name);
        if candidate.exists() {
            return candidate;
        }
        name.to_path_buf()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router_id.is_unspecified() {
            return Err(ConfigError::Invalid("router-id must not be 0.0.0.0".into()));
        }
        let mut seen = BTreeMap::new();
        for peer in self.peers.iter() {
            if !peer.hold_time_valid() {
                return Err(ConfigError::Invalid(format!(
                    "neighbor {}: hold-time must be 0 or 3..65535",
                    peer.peer_address
                )));
            }
            if peer.peer_as == 0 {
                return Err(ConfigError::Invalid(format!(
                    "neighbor {}: peer-as is mandatory",
                    peer.peer_address
                )));
            }
            if let Some(ttl) = peer.ttl_security
                && ttl == 0
            {
                return Err(ConfigError::Invalid(format!(
                    "neighbor {}: ttl-security must be 1..254",
                    peer.peer_address
                )));
            }
            if seen.insert(peer.peer_address, ()).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "neighbor {} is configured twice",
                    peer.peer_address
                )));
            }
            // "next-hop self" cannot resolve on a wildcard local
            // address; refuse it rather than guess at runtime.
            let unspecified = peer
                .local_address
                .map(|addr| addr.is_unspecified())
                .unwrap_or(true);
            if unspecified
                && peer
                    .routes
                    .iter()
                    .any(|route| route.contains("next-hop self"))
            {
                return Err(ConfigError::Invalid(format!(
                    "neighbor {}: next-hop self needs a concrete local-address",
                    peer.peer_address
                )));
            }
        }
        for process in self.processes.iter() {
            if process.run.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "process {}: run is mandatory",
                    process.name
                )));
            }
            if process.encoder != "text" && process.encoder != "json" {
                return Err(ConfigError::Invalid(format!(
                    "process {}: encoder must be text or json",
                    process.name
                )));
            }
        }
        Ok(())
    }

    pub fn peer(&self, address: &IpAddr) -> Option<&PeerConfig> {
        self.peers.iter().find(|peer| peer.peer_address == *address)
    }

    pub fn listen_addrs(&self) -> Vec<SocketAddr> {
        if self.listen.is_empty() {
            vec![
                "0.0.0.0:179".parse().unwrap(),
                "[::]:179".parse().unwrap(),
            ]
        } else {
            self.listen.clone()
        }
    }
}

/// What changed between two configurations, driving reload.
#[derive(Debug, Default)]
pub struct ConfigDiff {
    pub peers_added: Vec<IpAddr>,
    pub peers_removed: Vec<IpAddr>,
    pub peers_changed: Vec<IpAddr>,
    pub processes_added: Vec<String>,
    pub processes_removed: Vec<String>,
    pub processes_changed: Vec<String>,
}

impl ConfigDiff {
    pub fn between(old: &Config, new: &Config) -> ConfigDiff {
        let mut diff = ConfigDiff::default();
        for peer in new.peers.iter() {
            match old.peer(&peer.peer_address) {
                None => diff.peers_added.push(peer.peer_address),
                Some(previous) if previous != peer => {
                    diff.peers_changed.push(peer.peer_address)
                }
                Some(_) => {}
            }
        }
        for peer in old.peers.iter() {
            if new.peer(&peer.peer_address).is_none() {
                diff.peers_removed.push(peer.peer_address);
            }
        }
        let find = |config: &Config, name: &str| {
            config
                .processes
                .iter()
                .find(|process| process.name == name)
                .cloned()
        };
        for process in new.processes.iter() {
            match find(old, &process.name) {
                None => diff.processes_added.push(process.name.clone()),
                // A changed command line means the helper restarts;
                // subscription-only changes apply in place.
                Some(previous) if previous.run != process.run => {
                    diff.processes_changed.push(process.name.clone())
                }
                Some(_) => {}
            }
        }
        for process in old.processes.iter() {
            if find(new, &process.name).is_none() {
                diff.processes_removed.push(process.name.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.peers_added.is_empty()
            && self.peers_removed.is_empty()
            && self.peers_changed.is_empty()
            && self.processes_added.is_empty()
            && self.processes_removed.is_empty()
            && self.processes_changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
router_id: 10.0.0.1
local_as: 65001
peers:
  - peer_address: 192.0.2.2
    peer_as: 65002
"#;

    #[test]
    fn minimal_config_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();
        let peer = &config.peers[0];
        assert_eq!(peer.hold_time, 90);
        assert_eq!(peer.port, 179);
        assert!(peer.capability.route_refresh);
        assert_eq!(peer.family_set(), vec![Family::IPV4_UNICAST]);
    }

    #[test]
    fn duplicate_peer_rejected() {
        let text = format!(
            "{}  - peer_address: 192.0.2.2\n    peer_as: 65003\n",
            MINIMAL
        );
        let config: Config = serde_yaml::from_str(&text).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn nexthop_self_needs_local_address() {
        let text = format!(
            "{}    routes:\n      - route 10.0.0.0/24 next-hop self\n",
            MINIMAL
        );
        let config: Config = serde_yaml::from_str(&text).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn diff_classifies_changes() {
        let old: Config = serde_yaml::from_str(MINIMAL).unwrap();
        let mut new = old.clone();
        new.peers[0].hold_time = 30;
        new.peers.push(PeerConfig {
            peer_address: "192.0.2.9".parse().unwrap(),
            peer_as: 65009,
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
            families: default_families(),
            capability: CapabilityConfig::default(),
            routes: Vec::new(),
        });
        let diff = ConfigDiff::between(&old, &new);
        assert_eq!(diff.peers_changed, vec!["192.0.2.2".parse::<IpAddr>().unwrap()]);
        assert_eq!(diff.peers_added, vec!["192.0.2.9".parse::<IpAddr>().unwrap()]);
        assert!(diff.peers_removed.is_empty());
    }
}
