use std::net::{IpAddr, Ipv4Addr};

use chrono::Utc;
use serde_json::json;

use bgp_wire::{Message, Negotiated, Notification, subcode_str};

/// Session identity attached to every event line.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub peer_address: IpAddr,
    pub peer_as: u32,
    pub local_address: Option<IpAddr>,
    pub local_as: u32,
    pub router_id: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Send,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Receive => "receive",
            Direction::Send => "send",
        }
    }
}

/// Event kinds a helper can subscribe to, mirroring the message types
/// plus the session-level streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Open,
    Keepalive,
    Update,
    Notification,
    Refresh,
    Operational,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Open => "open",
            MessageKind::Keepalive => "keepalive",
            MessageKind::Update => "update",
            MessageKind::Notification => "notification",
            MessageKind::Refresh => "refresh",
            MessageKind::Operational => "operational",
        }
    }

    pub fn of(message: &Message) -> MessageKind {
        match message {
            Message::Open(_) => MessageKind::Open,
            Message::Update(_) => MessageKind::Update,
            Message::Notification(_) => MessageKind::Notification,
            Message::Keepalive => MessageKind::Keepalive,
            Message::RouteRefresh(_) => MessageKind::Refresh,
            Message::Operational(_) => MessageKind::Operational,
        }
    }
}

/// One event bound for subscribed helpers.
#[derive(Debug, Clone)]
pub enum ApiEvent {
    Message {
        peer: PeerInfo,
        direction: Direction,
        kind: MessageKind,
        body: String,
        /// Header + body bytes, relayed when "packets" is subscribed.
        raw: Option<Vec<u8>>,
    },
    Fsm {
        peer: PeerInfo,
        from: &'static str,
        to: &'static str,
    },
    NeighborChange {
        peer: PeerInfo,
        up: bool,
    },
    Negotiated {
        peer: PeerInfo,
        session: Negotiated,
    },
    Signal {
        name: &'static str,
    },
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\n', "\\n")
}

fn hex(raw: &[u8]) -> String {
    raw.iter().map(|b| format!("{:02X}", b)).collect()
}

fn peer_json(peer: &PeerInfo) -> serde_json::Value {
    json!({
        "address": {
            "local": peer.local_address.map(|addr| addr.to_string()),
            "peer": peer.peer_address.to_string(),
        },
        "asn": {
            "local": peer.local_as,
            "peer": peer.peer_as,
        },
        "router-id": peer.router_id.to_string(),
    })
}

/// Render one event as a text line, prefixed with the epoch second it
/// was generated. Newlines inside message bodies are escaped so one
/// event is always one line.
pub fn text_line(event: &ApiEvent) -> String {
    let now = Utc::now().timestamp();
    let rest = match event {
        ApiEvent::Message {
            peer,
            direction,
            kind,
            body,
            raw,
        } => {
            let mut line = format!(
                "neighbor {} {} {} {}",
                peer.peer_address,
                direction.as_str(),
                kind.as_str(),
                escape(body),
            );
            if let Some(raw) = raw {
                line.push_str(" packet ");
                line.push_str(&hex(raw));
            }
            line
        }
        ApiEvent::Fsm { peer, from, to } => {
            format!("neighbor {} fsm {} > {}", peer.peer_address, from, to)
        }
        ApiEvent::NeighborChange { peer, up } => {
            let state = if *up { "up" } else { "down" };
            format!("neighbor {} {}", peer.peer_address, state)
        }
        ApiEvent::Negotiated { peer, session } => {
            let families = session
                .families
                .iter()
                .map(|family| family.to_string())
                .collect::<Vec<String>>()
                .join(", ");
            format!(
                "neighbor {} negotiated hold-time {} families [{}]",
                peer.peer_address, session.hold_time, families
            )
        }
        ApiEvent::Signal { name } => format!("signal {}", name),
    };
    format!("{} {}", now, rest)
}

/// Render one event as one NDJSON line.
pub fn json_line(event: &ApiEvent) -> String {
    let time = Utc::now().to_rfc3339();
    let value = match event {
        ApiEvent::Message {
            peer,
            direction,
            kind,
            body,
            raw,
        } => json!({
            "time": time,
            "type": kind.as_str(),
            "direction": direction.as_str(),
            "neighbor": peer_json(peer),
            "message": body,
            "raw": raw.as_ref().map(|raw| hex(raw)),
        }),
        ApiEvent::Fsm { peer, from, to } => json!({
            "time": time,
            "type": "fsm",
            "neighbor": peer_json(peer),
            "from": from,
            "to": to,
        }),
        ApiEvent::NeighborChange { peer, up } => json!({
            "time": time,
            "type": "state",
            "neighbor": peer_json(peer),
            "state": if *up { "up" } else { "down" },
        }),
        ApiEvent::Negotiated { peer, session } => json!({
            "time": time,
            "type": "negotiated",
            "neighbor": peer_json(peer),
            "hold-time": session.hold_time,
            "families": session
                .families
                .iter()
                .map(|family| family.to_string())
                .collect::<Vec<String>>(),
            "four-octet-as": session.as4,
            "extended-message": session.extended_message,
        }),
        ApiEvent::Signal { name } => json!({
            "time": time,
            "type": "signal",
            "name": name,
        }),
    };
    // serde_json escapes embedded newlines, keeping NDJSON framing.
    value.to_string()
}

/// Text rendering of a NOTIFICATION for logs and events.
pub fn notification_str(notification: &Notification) -> String {
    format!(
        "{} ({}/{})",
        subcode_str(notification.code, notification.subcode),
        u8::from(notification.code),
        notification.subcode
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> PeerInfo {
        PeerInfo {
            peer_address: "192.0.2.2".parse().unwrap(),
            peer_as: 65002,
            local_address: Some("192.0.2.1".parse().unwrap()),
            local_as: 65001,
            router_id: "10.0.0.1".parse().unwrap(),
        }
    }

    #[test]
    fn text_event_is_single_line() {
        let event = ApiEvent::Message {
            peer: peer(),
            direction: Direction::Receive,
            kind: MessageKind::Update,
            body: "Update:\n announce 10.0.0.0/24".into(),
            raw: None,
        };
        let line = text_line(&event);
        assert!(!line.contains('\n'));
        assert!(line.contains("neighbor 192.0.2.2 receive update"));
    }

    #[test]
    fn json_event_is_single_line() {
        let event = ApiEvent::Message {
            peer: peer(),
            direction: Direction::Send,
            kind: MessageKind::Keepalive,
            body: "keepalive\nextra".into(),
            raw: Some(vec![0xff, 0x00]),
        };
        let line = json_line(&event);
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["direction"], "send");
        assert_eq!(value["raw"], "FF00");
    }
}
