use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;

use bgp_wire::{
    Afi, AsPath, Attrs, BitmaskOp, Community, ExtCommunity, ExtCommunityValue, Family,
    FlowComponent, FlowspecNlri, Label, LabeledNlri, LargeCommunity, Med, MpNextHop, NextHop,
    Nlri, NumericOp, Operational, OperationalKind, Origin, PrefixNlri, RouteDistinguisher, Safi,
    VpnNlri,
};

use crate::config::{parse_afi, parse_safi};
use crate::rib::{Action, Change};

/// Which peers a command applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Neighbor(IpAddr),
    Group(String),
    All,
}

/// Next hop as written; "self" resolves against the peer it lands on.
#[derive(Debug, Clone, PartialEq)]
pub enum NexthopSpec {
    None,
    SelfAddress,
    Addr(IpAddr),
}

/// One route as written on the API, before per-peer resolution.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub family: Family,
    pub nlri: Nlri,
    pub attrs: Attrs,
    pub nexthop: NexthopSpec,
    pub action: Action,
    pub watchdog: Option<String>,
    /// Fan the prefix out into this many mask bits worth of subnets.
    pub split: Option<u8>,
}

impl RouteSpec {
    /// Resolve into concrete changes for a peer with the given local
    /// address. Fails closed when "next-hop self" has nothing to
    /// resolve against.
    pub fn resolve(&self, local_address: Option<IpAddr>) -> Result<Vec<Change>, String> {
        let nexthop = match &self.nexthop {
            NexthopSpec::None => None,
            NexthopSpec::Addr(addr) => Some(*addr),
            NexthopSpec::SelfAddress => match local_address {
                Some(addr) if !addr.is_unspecified() => Some(addr),
                _ => return Err("next-hop self needs a concrete local-address".to_string()),
            },
        };
        let mut attrs = self.attrs.clone();
        let mut mp_nexthop = None;
        if let Some(addr) = nexthop {
            if self.family.is_ipv4_unicast() {
                if let IpAddr::V4(v4) = addr {
                    attrs.nexthop = Some(NextHop::new(v4));
                }
            } else {
                mp_nexthop = Some(MpNextHop::from(addr));
            }
        }
        let attrs = Arc::new(attrs);

        let nlris: Vec<Nlri> = match (self.split, &self.nlri) {
            (Some(bits), Nlri::Prefix(prefix)) => {
                let subnets: Result<Vec<IpNet>, _> = prefix.prefix.subnets(bits).map(|iter| iter.collect());
                match subnets {
                    Ok(subnets) => subnets
                        .into_iter()
                        .map(|net| Nlri::Prefix(PrefixNlri::new(net)))
                        .collect(),
                    Err(_) => return Err(format!("cannot split {} to /{}", prefix.prefix, bits)),
                }
            }
            _ => vec![self.nlri.clone()],
        };

        Ok(nlris
            .into_iter()
            .map(|nlri| Change {
                family: self.family,
                nlri,
                attrs: attrs.clone(),
                nexthop: mp_nexthop.clone(),
                action: self.action,
            })
            .collect())
    }
}

#[derive(Debug)]
pub enum Op {
    Routes(Vec<RouteSpec>),
    Refresh(Family),
    Eor(Family),
    Operational(Operational),
    Watchdog { name: String, announce: bool },
    SetAck(bool),
    Reload,
    Restart,
    Shutdown,
    Version,
    Help,
}

#[derive(Debug)]
pub struct ParsedCommand {
    pub target: Target,
    pub op: Op,
}

/// Split a command line into tokens: whitespace separated, with
/// double-quoted strings kept whole and braces/brackets/semicolons
/// standing alone.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                if !quoted && !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch if quoted => current.push(ch),
            '{' | '}' | '[' | ']' | ';' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            ch if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct Cursor {
    tokens: Vec<String>,
    pos: usize,
}

impl Cursor {
    fn new(line: &str) -> Self {
        Self {
            tokens: tokenize(line),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, want: &str) -> Result<(), String> {
        match self.next() {
            Some(token) if token == want => Ok(()),
            Some(token) => Err(format!("expected '{}', got '{}'", want, token)),
            None => Err(format!("expected '{}'", want)),
        }
    }

    fn word(&mut self, what: &str) -> Result<String, String> {
        self.next().ok_or_else(|| format!("missing {}", what))
    }

    fn parse_next<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, String> {
        let token = self.word(what)?;
        token.parse().map_err(|_| format!("bad {}: {}", what, token))
    }
}

fn parse_family(cursor: &mut Cursor) -> Result<Family, String> {
    let afi = cursor.word("afi")?;
    let afi = parse_afi(&afi).ok_or_else(|| format!("bad afi: {}", afi))?;
    let safi = cursor.word("safi")?;
    let safi = parse_safi(&safi).ok_or_else(|| format!("bad safi: {}", safi))?;
    Ok(Family::new(afi, safi))
}

/// Parse one helper command line.
pub fn parse(line: &str) -> Result<ParsedCommand, String> {
    let mut cursor = Cursor::new(line);
    let mut target = Target::All;

    loop {
        match cursor.peek() {
            Some("neighbor") => {
                cursor.next();
                // "neighbor <ip> announce-watchdog <name>" is the
                // watchdog form; "neighbor <ip> <verb>" targets.
                let addr: IpAddr = cursor.parse_next("neighbor address")?;
                target = Target::Neighbor(addr);
                match cursor.peek() {
                    Some("announce-watchdog") | Some("withdraw-watchdog") => {
                        let announce = cursor.next().unwrap() == "announce-watchdog";
                        let name = cursor.word("watchdog name")?;
                        return Ok(ParsedCommand {
                            target,
                            op: Op::Watchdog { name, announce },
                        });
                    }
                    _ => continue,
                }
            }
            Some("group") => {
                cursor.next();
                target = Target::Group(cursor.word("group name")?);
            }
            _ => break,
        }
    }

    let verb = cursor.word("command")?;
    let op = match verb.as_str() {
        "announce" => parse_announce(&mut cursor, Action::Announce)?,
        "withdraw" => parse_announce(&mut cursor, Action::Withdraw)?,
        "reload" => Op::Reload,
        "restart" => Op::Restart,
        "shutdown" => Op::Shutdown,
        "version" => Op::Version,
        "help" => Op::Help,
        "set" => {
            cursor.expect("ack")?;
            let value = cursor.word("true|false")?;
            Op::SetAck(value == "true")
        }
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(ParsedCommand { target, op })
}

fn parse_announce(cursor: &mut Cursor, action: Action) -> Result<Op, String> {
    let what = cursor.word("announce kind")?;
    match what.as_str() {
        "route" => Ok(Op::Routes(vec![parse_route(cursor, action)?])),
        "flow" => Ok(Op::Routes(vec![parse_flow(cursor, action)?])),
        "attribute" | "attributes" => parse_attribute_nlri(cursor, action),
        "route-refresh" => Ok(Op::Refresh(parse_family(cursor)?)),
        "eor" => Ok(Op::Eor(parse_family(cursor)?)),
        "operational" => parse_operational(cursor),
        "watchdog" => {
            let name = cursor.word("watchdog name")?;
            Ok(Op::Watchdog {
                name,
                announce: action == Action::Announce,
            })
        }
        other => Err(format!("cannot announce {}", other)),
    }
}

/// Shared attribute clauses of "announce route" and "announce
/// attribute".
fn parse_attr_clause(
    cursor: &mut Cursor,
    clause: &str,
    attrs: &mut Attrs,
    nexthop: &mut NexthopSpec,
) -> Result<bool, String> {
    match clause {
        "next-hop" => {
            let token = cursor.word("next-hop")?;
            *nexthop = if token == "self" {
                NexthopSpec::SelfAddress
            } else {
                NexthopSpec::Addr(token.parse().map_err(|_| format!("bad next-hop: {}", token))?)
            };
        }
        "origin" => {
            let token = cursor.word("origin")?;
            attrs.origin = Some(token.parse().map_err(|_| format!("bad origin: {}", token))?);
        }
        "as-path" => {
            let mut asns: Vec<u32> = Vec::new();
            if cursor.peek() == Some("[") {
                cursor.next();
                while let Some(token) = cursor.next() {
                    if token == "]" {
                        break;
                    }
                    asns.push(token.parse().map_err(|_| format!("bad asn: {}", token))?);
                }
            } else {
                let token = cursor.word("as-path")?;
                asns.push(token.parse().map_err(|_| format!("bad asn: {}", token))?);
            }
            attrs.aspath = Some(AsPath::from_sequence(asns));
        }
        "med" => {
            attrs.med = Some(Med::new(cursor.parse_next("med")?));
        }
        "local-preference" => {
            attrs.local_pref = Some(bgp_wire::LocalPref::new(cursor.parse_next("local-preference")?));
        }
        "community" => {
            let text = bracket_words(cursor, "community")?;
            attrs.community = Some(text.parse::<Community>().map_err(|_| "bad community".to_string())?);
        }
        "large-community" => {
            let text = bracket_words(cursor, "large-community")?;
            attrs.large_community =
                Some(text.parse::<LargeCommunity>().map_err(|_| "bad large-community".to_string())?);
        }
        "extended-community" => {
            let text = bracket_words(cursor, "extended-community")?;
            let mut ecom = ExtCommunity::default();
            for word in text.split_whitespace() {
                ecom.push(
                    word.parse::<ExtCommunityValue>()
                        .map_err(|_| format!("bad extended-community: {}", word))?,
                );
            }
            attrs.ext_community = Some(ecom);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

/// Read either "[ a b c ]" or one word, joined as a single string.
fn bracket_words(cursor: &mut Cursor, what: &str) -> Result<String, String> {
    if cursor.peek() == Some("[") {
        cursor.next();
        let mut words = Vec::new();
        while let Some(token) = cursor.next() {
            if token == "]" {
                break;
            }
            words.push(token);
        }
        Ok(words.join(" "))
    } else {
        cursor.word(what)
    }
}

fn parse_route(cursor: &mut Cursor, action: Action) -> Result<RouteSpec, String> {
    let prefix = cursor.word("prefix")?;
    let prefix: IpNet = prefix
        .parse()
        .map_err(|_| format!("bad prefix: {}", prefix))?;

    let mut attrs = Attrs::default();
    let mut nexthop = NexthopSpec::None;
    let mut labels: Vec<Label> = Vec::new();
    let mut rd: Option<RouteDistinguisher> = None;
    let mut path_id: u32 = 0;
    let mut watchdog: Option<String> = None;
    let mut split: Option<u8> = None;

    while let Some(clause) = cursor.next() {
        if parse_attr_clause(cursor, &clause, &mut attrs, &mut nexthop)? {
            continue;
        }
        match clause.as_str() {
            "label" => {
                labels.push(Label::new(cursor.parse_next("label")?, 0, true));
            }
            "rd" | "route-distinguisher" => {
                let token = cursor.word("rd")?;
                rd = Some(token.parse().map_err(|_| format!("bad rd: {}", token))?);
            }
            "path-information" => {
                path_id = cursor.parse_next("path-information")?;
            }
            "watchdog" => {
                watchdog = Some(cursor.word("watchdog name")?);
            }
            "split" => {
                let token = cursor.word("split")?;
                let bits = token
                    .strip_prefix('/')
                    .unwrap_or(&token)
                    .parse()
                    .map_err(|_| format!("bad split: {}", token))?;
                split = Some(bits);
            }
            other => return Err(format!("unknown route clause: {}", other)),
        }
    }

    // Fix the bottom-of-stack bit on a multi-label stack.
    for i in 0..labels.len() {
        let bos = i + 1 == labels.len();
        labels[i] = Label::new(labels[i].label, labels[i].exp, bos);
    }

    let afi = match prefix {
        IpNet::V4(_) => Afi::Ipv4,
        IpNet::V6(_) => Afi::Ipv6,
    };
    let (family, nlri) = match (rd, labels.is_empty()) {
        (Some(rd), _) => {
            let label = labels.first().copied().unwrap_or_default();
            let mut nlri = VpnNlri::new(prefix, rd, label);
            nlri.path_id = path_id;
            (Family::new(afi, Safi::MplsVpn), Nlri::Vpn(nlri))
        }
        (None, false) => {
            let mut nlri = LabeledNlri::new(prefix, labels[0]);
            nlri.labels = labels;
            nlri.path_id = path_id;
            (Family::new(afi, Safi::LabeledUnicast), Nlri::Labeled(nlri))
        }
        (None, true) => (
            Family::new(afi, Safi::Unicast),
            Nlri::Prefix(PrefixNlri::with_path_id(prefix, path_id)),
        ),
    };

    Ok(RouteSpec {
        family,
        nlri,
        attrs,
        nexthop,
        action,
        watchdog,
        split,
    })
}

/// "announce attribute next-hop 192.0.2.1 ... nlri <p1> <p2> ..."
fn parse_attribute_nlri(cursor: &mut Cursor, action: Action) -> Result<Op, String> {
    let mut attrs = Attrs::default();
    let mut nexthop = NexthopSpec::None;

    loop {
        let Some(clause) = cursor.next() else {
            return Err("missing nlri".to_string());
        };
        if clause == "nlri" {
            break;
        }
        if !parse_attr_clause(cursor, &clause, &mut attrs, &mut nexthop)? {
            return Err(format!("unknown attribute clause: {}", clause));
        }
    }

    let mut specs = Vec::new();
    while let Some(token) = cursor.next() {
        let prefix: IpNet = token
            .parse()
            .map_err(|_| format!("bad prefix: {}", token))?;
        let afi = match prefix {
            IpNet::V4(_) => Afi::Ipv4,
            IpNet::V6(_) => Afi::Ipv6,
        };
        specs.push(RouteSpec {
            family: Family::new(afi, Safi::Unicast),
            nlri: Nlri::Prefix(PrefixNlri::new(prefix)),
            attrs: attrs.clone(),
            nexthop: nexthop.clone(),
            action,
            watchdog: None,
            split: None,
        });
    }
    if specs.is_empty() {
        return Err("missing nlri".to_string());
    }
    Ok(Op::Routes(specs))
}

fn parse_numeric_ops(cursor: &mut Cursor, what: &str) -> Result<Vec<NumericOp>, String> {
    let mut ops = Vec::new();
    let mut and_next = false;
    while let Some(token) = cursor.peek() {
        if token == ";" || token == "}" {
            break;
        }
        let token = cursor.next().unwrap();
        let mut text = token.as_str();
        let mut op = NumericOp {
            and: and_next,
            lt: false,
            gt: false,
            eq: false,
            value: 0,
        };
        and_next = false;
        if let Some(rest) = text.strip_prefix("&") {
            op.and = true;
            text = rest;
        }
        if let Some(rest) = text.strip_prefix(">=") {
            op.gt = true;
            op.eq = true;
            text = rest;
        } else if let Some(rest) = text.strip_prefix("<=") {
            op.lt = true;
            op.eq = true;
            text = rest;
        } else if let Some(rest) = text.strip_prefix('>') {
            op.gt = true;
            text = rest;
        } else if let Some(rest) = text.strip_prefix('<') {
            op.lt = true;
            text = rest;
        } else if let Some(rest) = text.strip_prefix('=') {
            op.eq = true;
            text = rest;
        } else {
            op.eq = true;
        }
        if text.is_empty() {
            // Operator split from its value ("<= 80").
            let value = cursor.word(what)?;
            op.value = value.parse().map_err(|_| format!("bad {}: {}", what, value))?;
        } else {
            op.value = text.parse().map_err(|_| format!("bad {}: {}", what, text))?;
        }
        ops.push(op);
    }
    if ops.is_empty() {
        return Err(format!("missing {}", what));
    }
    Ok(ops)
}

fn protocol_value(token: &str) -> Result<u64, String> {
    match token {
        "icmp" => Ok(1),
        "igmp" => Ok(2),
        "tcp" => Ok(6),
        "udp" => Ok(17),
        "ipv6-icmp" => Ok(58),
        other => other.parse().map_err(|_| format!("bad protocol: {}", other)),
    }
}

fn tcp_flag_value(token: &str) -> Result<u64, String> {
    match token {
        "fin" => Ok(0x01),
        "syn" => Ok(0x02),
        "rst" => Ok(0x04),
        "push" => Ok(0x08),
        "ack" => Ok(0x10),
        "urgent" => Ok(0x20),
        other => other.parse().map_err(|_| format!("bad tcp flag: {}", other)),
    }
}

fn fragment_value(token: &str) -> Result<u64, String> {
    match token {
        "dont-fragment" => Ok(0x01),
        "is-fragment" => Ok(0x02),
        "first-fragment" => Ok(0x04),
        "last-fragment" => Ok(0x08),
        other => other.parse().map_err(|_| format!("bad fragment: {}", other)),
    }
}

fn parse_bitmask_ops<F>(cursor: &mut Cursor, value_of: F, what: &str) -> Result<Vec<BitmaskOp>, String>
where
    F: Fn(&str) -> Result<u64, String>,
{
    let mut ops = Vec::new();
    let bracketed = cursor.peek() == Some("[");
    if bracketed {
        cursor.next();
    }
    while let Some(token) = cursor.peek() {
        if token == "]" {
            cursor.next();
            break;
        }
        if token == ";" || token == "}" {
            break;
        }
        let mut token = cursor.next().unwrap();
        let mut not = false;
        if let Some(rest) = token.strip_prefix('!') {
            not = true;
            token = rest.to_string();
        }
        ops.push(BitmaskOp {
            and: false,
            not,
            is_match: true,
            value: value_of(&token)?,
        });
    }
    if ops.is_empty() {
        return Err(format!("missing {}", what));
    }
    Ok(ops)
}

/// "announce flow route { match { ... } then { ... } }", one line.
fn parse_flow(cursor: &mut Cursor, action: Action) -> Result<RouteSpec, String> {
    if cursor.peek() == Some("route") {
        cursor.next();
    }
    cursor.expect("{")?;
    cursor.expect("match")?;
    cursor.expect("{")?;

    let mut components: Vec<FlowComponent> = Vec::new();
    let mut afi = Afi::Ipv4;
    let mut rd: Option<RouteDistinguisher> = None;
    loop {
        let Some(token) = cursor.next() else {
            return Err("unterminated match block".to_string());
        };
        match token.as_str() {
            "}" => break,
            ";" => continue,
            "rd" | "route-distinguisher" => {
                let token = cursor.word("rd")?;
                rd = Some(token.parse().map_err(|_| format!("bad rd: {}", token))?);
            }
            "destination" => {
                let prefix: IpNet = cursor.parse_next("destination prefix")?;
                if matches!(prefix, IpNet::V6(_)) {
                    afi = Afi::Ipv6;
                }
                components.push(FlowComponent::DstPrefix(prefix));
            }
            "source" => {
                let prefix: IpNet = cursor.parse_next("source prefix")?;
                if matches!(prefix, IpNet::V6(_)) {
                    afi = Afi::Ipv6;
                }
                components.push(FlowComponent::SrcPrefix(prefix));
            }
            "protocol" | "next-header" => {
                let token = cursor.word("protocol")?;
                components.push(FlowComponent::IpProtocol(vec![NumericOp::eq(
                    protocol_value(&token)?,
                )]));
            }
            "port" => components.push(FlowComponent::Port(parse_numeric_ops(cursor, "port")?)),
            "destination-port" => components.push(FlowComponent::DstPort(parse_numeric_ops(
                cursor,
                "destination-port",
            )?)),
            "source-port" => components.push(FlowComponent::SrcPort(parse_numeric_ops(
                cursor,
                "source-port",
            )?)),
            "icmp-type" => components.push(FlowComponent::IcmpType(parse_numeric_ops(
                cursor,
                "icmp-type",
            )?)),
            "icmp-code" => components.push(FlowComponent::IcmpCode(parse_numeric_ops(
                cursor,
                "icmp-code",
            )?)),
            "tcp-flags" => components.push(FlowComponent::TcpFlags(parse_bitmask_ops(
                cursor,
                tcp_flag_value,
                "tcp-flags",
            )?)),
            "packet-length" => components.push(FlowComponent::PacketLength(parse_numeric_ops(
                cursor,
                "packet-length",
            )?)),
            "dscp" => components.push(FlowComponent::Dscp(parse_numeric_ops(cursor, "dscp")?)),
            "fragment" => components.push(FlowComponent::Fragment(parse_bitmask_ops(
                cursor,
                fragment_value,
                "fragment",
            )?)),
            "flow-label" => components.push(FlowComponent::FlowLabel(parse_numeric_ops(
                cursor,
                "flow-label",
            )?)),
            other => return Err(format!("unknown match clause: {}", other)),
        }
    }

    cursor.expect("then")?;
    cursor.expect("{")?;
    let mut ecom = ExtCommunity::default();
    let mut attrs = Attrs::default();
    loop {
        let Some(token) = cursor.next() else {
            return Err("unterminated then block".to_string());
        };
        match token.as_str() {
            "}" => break,
            ";" => continue,
            "discard" => {
                // Rate-limit to zero is the discard action.
                ecom.push(ExtCommunityValue::TrafficRate {
                    asn: 0,
                    rate_bits: 0f32.to_bits(),
                });
            }
            "rate-limit" => {
                let rate: f32 = cursor.parse_next("rate-limit")?;
                ecom.push(ExtCommunityValue::TrafficRate {
                    asn: 0,
                    rate_bits: rate.to_bits(),
                });
            }
            "redirect" => {
                let token = cursor.word("redirect")?;
                let (asn, number) = token
                    .split_once(':')
                    .ok_or_else(|| format!("bad redirect: {}", token))?;
                ecom.push(ExtCommunityValue::TrafficRedirect {
                    asn: asn.parse().map_err(|_| "bad redirect asn".to_string())?,
                    number: number.parse().map_err(|_| "bad redirect value".to_string())?,
                });
            }
            "redirect-to-nexthop" => {
                ecom.push(ExtCommunityValue::RedirectNexthop { copy: false });
            }
            "mark" => {
                ecom.push(ExtCommunityValue::TrafficMark {
                    dscp: cursor.parse_next("mark")?,
                });
            }
            "action" => {
                let token = cursor.word("action")?;
                let (sample, terminal) = match token.as_str() {
                    "sample" => (true, false),
                    "terminal" => (false, true),
                    "sample-terminal" => (true, true),
                    other => return Err(format!("bad action: {}", other)),
                };
                ecom.push(ExtCommunityValue::TrafficAction { sample, terminal });
            }
            "community" => {
                let text = bracket_words(cursor, "community")?;
                attrs.community = Some(text.parse::<Community>().map_err(|_| "bad community".to_string())?);
            }
            other => return Err(format!("unknown then clause: {}", other)),
        }
    }
    cursor.expect("}")?;

    if !ecom.0.is_empty() {
        attrs.ext_community = Some(ecom);
    }
    attrs.origin.get_or_insert(Origin::Igp);
    attrs.aspath.get_or_insert_with(AsPath::default);

    let safi = if rd.is_some() {
        Safi::FlowspecVpn
    } else {
        Safi::Flowspec
    };
    let nlri = match rd {
        Some(rd) => FlowspecNlri::with_rd(rd, components),
        None => FlowspecNlri::new(components),
    };
    Ok(RouteSpec {
        family: Family::new(afi, safi),
        nlri: Nlri::Flowspec(nlri),
        attrs,
        nexthop: NexthopSpec::None,
        action,
        watchdog: None,
        split: None,
    })
}

/// "announce operational adm afi ipv4 safi unicast advisory \"...\""
fn parse_operational(cursor: &mut Cursor) -> Result<Op, String> {
    let kind = cursor.word("operational kind")?;
    let kind = match kind.as_str() {
        "asm" => OperationalKind::Asm,
        "adm" => OperationalKind::Adm,
        "rpcq" => OperationalKind::Rpcq,
        "rpcp" => OperationalKind::Rpcp,
        "apcq" => OperationalKind::Apcq,
        "apcp" => OperationalKind::Apcp,
        "lpcq" => OperationalKind::Lpcq,
        "lpcp" => OperationalKind::Lpcp,
        other => return Err(format!("bad operational kind: {}", other)),
    };
    cursor.expect("afi")?;
    let afi = cursor.word("afi")?;
    let afi = parse_afi(&afi).ok_or_else(|| format!("bad afi: {}", afi))?;
    cursor.expect("safi")?;
    let safi = cursor.word("safi")?;
    let safi = parse_safi(&safi).ok_or_else(|| format!("bad safi: {}", safi))?;
    let family = Family::new(afi, safi);

    let operational = match kind {
        OperationalKind::Asm | OperationalKind::Adm => {
            cursor.expect("advisory")?;
            let text = cursor.word("advisory text")?;
            Operational::advisory(kind, family, &text)
                .ok_or_else(|| "advisory text too long".to_string())?
        }
        _ => {
            let mut payload = Vec::new();
            if cursor.peek() == Some("sequence") {
                cursor.next();
                let sequence: u32 = cursor.parse_next("sequence")?;
                payload.extend_from_slice(&sequence.to_be_bytes());
            }
            if cursor.peek() == Some("counter") {
                cursor.next();
                let counter: u32 = cursor.parse_next("counter")?;
                payload.extend_from_slice(&counter.to_be_bytes());
            }
            Operational::Query {
                kind,
                family,
                payload,
            }
        }
    };
    Ok(Op::Operational(operational))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_route() {
        let parsed = parse(
            "announce route 10.0.0.0/24 next-hop 192.0.2.1 local-preference 100 as-path [ 65001 ]",
        )
        .unwrap();
        assert_eq!(parsed.target, Target::All);
        let Op::Routes(specs) = parsed.op else {
            panic!("must be routes");
        };
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.family, Family::IPV4_UNICAST);
        assert_eq!(spec.action, Action::Announce);
        assert_eq!(spec.nexthop, NexthopSpec::Addr("192.0.2.1".parse().unwrap()));
        assert_eq!(spec.attrs.aspath, Some(AsPath::from_sequence([65001])));
    }

    #[test]
    fn parse_targeted_withdraw() {
        let parsed = parse("neighbor 192.0.2.2 withdraw route 10.0.0.0/24").unwrap();
        assert_eq!(
            parsed.target,
            Target::Neighbor("192.0.2.2".parse().unwrap())
        );
        let Op::Routes(specs) = parsed.op else {
            panic!("must be routes");
        };
        assert_eq!(specs[0].action, Action::Withdraw);
    }

    #[test]
    fn parse_labeled_and_vpn_routes() {
        let Op::Routes(specs) =
            parse("announce route 10.0.0.0/24 next-hop 192.0.2.1 label 800000").unwrap().op
        else {
            panic!();
        };
        assert_eq!(specs[0].family.safi, Safi::LabeledUnicast);

        let Op::Routes(specs) = parse(
            "announce route 10.0.0.0/24 next-hop 192.0.2.1 rd 64512:11 label 24001",
        )
        .unwrap()
        .op
        else {
            panic!();
        };
        assert_eq!(specs[0].family.safi, Safi::MplsVpn);
    }

    #[test]
    fn parse_flow_redirect() {
        let parsed = parse(
            "announce flow route { match { destination 10.0.1.0/24 ; destination-port =80 ; } then { redirect 65000:12345 ; } }",
        )
        .unwrap();
        let Op::Routes(specs) = parsed.op else {
            panic!("must be routes");
        };
        let spec = &specs[0];
        assert_eq!(spec.family, Family::new(Afi::Ipv4, Safi::Flowspec));
        let Nlri::Flowspec(nlri) = &spec.nlri else {
            panic!("must be flowspec");
        };
        assert_eq!(nlri.components.len(), 2);
        let ecom = spec.attrs.ext_community.as_ref().unwrap();
        assert_eq!(
            ecom.0[0],
            ExtCommunityValue::TrafficRedirect {
                asn: 65000,
                number: 12345
            }
        );
    }

    #[test]
    fn parse_watchdog_forms() {
        let parsed = parse("neighbor 192.0.2.2 announce-watchdog dns").unwrap();
        let Op::Watchdog { name, announce } = parsed.op else {
            panic!("must be watchdog");
        };
        assert_eq!(name, "dns");
        assert!(announce);

        let parsed = parse("withdraw watchdog dns").unwrap();
        let Op::Watchdog { announce, .. } = parsed.op else {
            panic!("must be watchdog");
        };
        assert!(!announce);
    }

    #[test]
    fn parse_refresh_eor_operational() {
        let parsed = parse("announce route-refresh ipv4 unicast").unwrap();
        assert!(matches!(parsed.op, Op::Refresh(family) if family == Family::IPV4_UNICAST));

        let parsed = parse("announce eor ipv4 unicast").unwrap();
        assert!(matches!(parsed.op, Op::Eor(family) if family == Family::IPV4_UNICAST));

        let parsed =
            parse("announce operational adm afi ipv4 safi unicast advisory \"be right back\"")
                .unwrap();
        let Op::Operational(Operational::Advisory { text, .. }) = parsed.op else {
            panic!("must be advisory");
        };
        assert_eq!(text, "be right back");
    }

    #[test]
    fn parse_attribute_with_nlri_list() {
        let parsed = parse(
            "announce attribute next-hop 192.0.2.1 community [ 65001:7 ] nlri 10.0.0.0/24 10.0.1.0/24",
        )
        .unwrap();
        let Op::Routes(specs) = parsed.op else {
            panic!("must be routes");
        };
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].attrs, specs[1].attrs);
    }

    #[test]
    fn split_fans_out() {
        let Op::Routes(specs) = parse("announce route 10.0.0.0/24 next-hop 192.0.2.1 split /26")
            .unwrap()
            .op
        else {
            panic!();
        };
        let changes = specs[0].resolve(Some("192.0.2.9".parse().unwrap())).unwrap();
        assert_eq!(changes.len(), 4);
    }

    #[test]
    fn nexthop_self_fails_closed() {
        let Op::Routes(specs) = parse("announce route 10.0.0.0/24 next-hop self").unwrap().op
        else {
            panic!();
        };
        assert!(specs[0].resolve(None).is_err());
        assert!(
            specs[0]
                .resolve(Some("0.0.0.0".parse().unwrap()))
                .is_err()
        );
        assert!(
            specs[0]
                .resolve(Some("192.0.2.9".parse().unwrap()))
                .is_ok()
        );
    }

    #[test]
    fn set_ack_and_control_verbs() {
        assert!(matches!(parse("set ack false").unwrap().op, Op::SetAck(false)));
        assert!(matches!(parse("reload").unwrap().op, Op::Reload));
        assert!(matches!(parse("shutdown").unwrap().op, Op::Shutdown));
        assert!(matches!(parse("version").unwrap().op, Op::Version));
    }
}
