use bgp_wire::*;

fn session_with(families: &[Family]) -> Negotiated {
    let mut negotiated = Negotiated {
        as4: true,
        hold_time: 90,
        ..Default::default()
    };
    for family in families {
        negotiated.families.insert(*family);
    }
    negotiated
}

#[test]
fn notification_round_trip() {
    let notification = Notification::new(NotifyCode::Cease, cease::ADMINISTRATIVE_SHUTDOWN, vec![]);
    let buf = notification.encode();
    assert_eq!(buf.len(), 21);
    let Message::Notification(parsed) =
        Message::decode(&buf, &Negotiated::default()).unwrap()
    else {
        panic!("must be a notification");
    };
    assert_eq!(parsed, notification);
    assert_eq!(
        subcode_str(parsed.code, parsed.subcode),
        "Administrative Shutdown"
    );
}

#[test]
fn open_capabilities_survive_the_wire() {
    let v4 = Family::IPV4_UNICAST;
    let v6 = Family::new(Afi::Ipv6, Safi::Unicast);
    let mut caps = CapabilitySet::default();
    caps.mp.insert(v4, CapMultiProtocol::new(v4));
    caps.mp.insert(v6, CapMultiProtocol::new(v6));
    caps.as4 = Some(CapAs4::new(65001));
    caps.refresh = Some(CapRefresh::default());
    caps.enhanced_refresh = Some(CapEnhancedRefresh::default());
    caps.extended_message = Some(CapExtendedMessage::default());
    caps.multisession = Some(CapMultiSession::default());
    caps.operational = Some(CapOperational::default());
    caps.addpath.insert(v4, AddPathDirection::SendReceive);
    let mut graceful = CapGracefulRestart::new(120);
    graceful.families.push(RestartFamily {
        afi: Afi::Ipv4,
        safi: Safi::Unicast,
        flags: Default::default(),
    });
    caps.graceful = Some(graceful);
    let mut llgr = CapLlgr::default();
    llgr.families.push(LlgrFamily::new(Afi::Ipv4, Safi::Unicast, 3600));
    caps.llgr = Some(llgr);
    let mut enh = CapExtendedNexthop::default();
    enh.push(Afi::Ipv4, Safi::Unicast, Afi::Ipv6);
    caps.extended_nexthop = Some(enh);

    let open = Open::new(65001, 90, "10.0.0.1".parse().unwrap(), caps.clone());
    let buf = open.encode();
    let Message::Open(parsed) = Message::decode(&buf, &Negotiated::default()).unwrap() else {
        panic!("must be an open");
    };
    assert_eq!(parsed.caps, caps);
    assert_eq!(parsed.caps.graceful.as_ref().unwrap().restart_time(), 120);
    assert!(parsed.caps.addpath.get(&v4).unwrap().send());
}

#[test]
fn unknown_capability_preserved() {
    let mut caps = CapabilitySet::default();
    caps.mp
        .insert(Family::IPV4_UNICAST, CapMultiProtocol::new(Family::IPV4_UNICAST));
    caps.unknown.push(CapUnknown {
        code: 77,
        data: vec![0x01, 0x02],
    });
    let open = Open::new(65001, 90, "10.0.0.1".parse().unwrap(), caps);
    let buf = open.encode();
    let Message::Open(parsed) = Message::decode(&buf, &Negotiated::default()).unwrap() else {
        panic!("must be an open");
    };
    assert_eq!(parsed.caps.unknown.len(), 1);
    assert_eq!(parsed.caps.unknown[0].data, vec![0x01, 0x02]);
}

#[test]
fn hold_time_zero_disables_keepalive() {
    let mut ours = CapabilitySet::default();
    ours.mp
        .insert(Family::IPV4_UNICAST, CapMultiProtocol::new(Family::IPV4_UNICAST));
    let theirs = ours.clone();
    let negotiated = Negotiated::negotiate(65001, 65002, 90, 0, &ours, &theirs);
    assert_eq!(negotiated.hold_time, 0);
    assert_eq!(negotiated.keepalive(), 0);
}

#[test]
fn operational_advisory_on_the_wire() {
    let asm = Operational::advisory(
        OperationalKind::Asm,
        Family::IPV4_UNICAST,
        "primary exit in maintenance",
    )
    .unwrap();
    let buf = asm.encode();
    let Message::Operational(parsed) =
        Message::decode(&buf, &Negotiated::default()).unwrap()
    else {
        panic!("must be operational");
    };
    let Operational::Advisory { kind, text, .. } = parsed else {
        panic!("must be an advisory");
    };
    assert_eq!(kind, OperationalKind::Asm);
    assert_eq!(text, "primary exit in maintenance");
}

#[test]
fn route_refresh_enhanced_brackets() {
    for (refresh, subtype) in [
        (RouteRefresh::new(Family::IPV4_UNICAST), RefreshSubtype::Request),
        (RouteRefresh::begin(Family::IPV4_UNICAST), RefreshSubtype::Begin),
        (RouteRefresh::end(Family::IPV4_UNICAST), RefreshSubtype::End),
    ] {
        let buf = refresh.encode();
        let Message::RouteRefresh(parsed) =
            Message::decode(&buf, &Negotiated::default()).unwrap()
        else {
            panic!("must be a route refresh");
        };
        assert_eq!(parsed.subtype, subtype);
        assert_eq!(parsed.family, Family::IPV4_UNICAST);
    }
}

#[test]
fn evpn_update_round_trip() {
    let evpn = Family::new(Afi::L2vpn, Safi::Evpn);
    let negotiated = session_with(&[evpn]);

    let route = EvpnRoute::MacIp {
        rd: RouteDistinguisher::As2 {
            asn: 64512,
            number: 5,
        },
        esi: Esi::default(),
        ether_tag: 0,
        mac: [0x52, 0x54, 0x00, 0x12, 0x34, 0x56],
        ip: None,
        labels: vec![Label::new(100, 0, true)],
    };
    let mut reach = MpReach::new(evpn, MpNextHop::Ipv4("192.0.2.3".parse().unwrap()));
    reach.nlris.push(Nlri::Evpn(route.clone()));
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([64512])),
        ..Default::default()
    });
    update.mp_reach = Some(reach);
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.mp_reach.unwrap().nlris, vec![Nlri::Evpn(route)]);
}

#[test]
fn vpls_update_round_trip() {
    let vpls = Family::new(Afi::L2vpn, Safi::Vpls);
    let negotiated = session_with(&[vpls]);

    let nlri = VplsNlri {
        rd: RouteDistinguisher::Ipv4 {
            addr: "10.0.0.1".parse().unwrap(),
            number: 9,
        },
        ve_id: 2,
        ve_offset: 0,
        ve_size: 10,
        label_base: 101000,
    };
    let mut reach = MpReach::new(vpls, MpNextHop::Ipv4("192.0.2.3".parse().unwrap()));
    reach.nlris.push(Nlri::Vpls(nlri.clone()));
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([64512])),
        ..Default::default()
    });
    update.mp_reach = Some(reach);
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.mp_reach.unwrap().nlris, vec![Nlri::Vpls(nlri)]);
}

#[test]
fn bgp_ls_update_round_trip() {
    let ls = Family::new(Afi::Bgpls, Safi::Bgpls);
    let negotiated = session_with(&[ls]);

    let nlri = LsNlri {
        typ: LsNlriType::Link,
        protocol_id: LsProtocolId::IsisL2,
        identifier: 0,
        descriptors: vec![
            LsDescriptor {
                typ: 256u16.into(),
                value: vec![0x02, 0x00, 0x00, 0x04, 0x00, 0x00, 0xfc, 0x00],
            },
            LsDescriptor {
                typ: 259u16.into(),
                value: vec![10, 0, 0, 1],
            },
        ],
    };
    let mut reach = MpReach::new(ls, MpNextHop::Ipv4("192.0.2.3".parse().unwrap()));
    reach.nlris.push(Nlri::LinkState(nlri.clone()));

    let link_state = LinkState(vec![
        LsTlv {
            typ: LsAttrType::IgpMetric,
            value: vec![0x00, 0x00, 0x0a],
        },
        LsTlv {
            typ: LsAttrType::Unknown(9999),
            value: vec![0xaa],
        },
    ]);
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([64512])),
        link_state: Some(link_state.clone()),
        ..Default::default()
    });
    update.mp_reach = Some(reach);

    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    let attrs = parsed.attrs.unwrap();
    assert_eq!(attrs.link_state, Some(link_state));
    assert_eq!(parsed.mp_reach.unwrap().nlris, vec![Nlri::LinkState(nlri)]);
}

#[test]
fn labeled_ipv6_round_trip() {
    let family = Family::new(Afi::Ipv6, Safi::LabeledUnicast);
    let negotiated = session_with(&[family]);

    let nlri = LabeledNlri::new("2001:db8:7::/48".parse().unwrap(), Label::new(16001, 0, true));
    let mut reach = MpReach::new(
        family,
        MpNextHop::Ipv6 {
            global: "2001:db8::1".parse().unwrap(),
            link_local: None,
        },
    );
    reach.nlris.push(Nlri::Labeled(nlri.clone()));
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([64512])),
        ..Default::default()
    });
    update.mp_reach = Some(reach);
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.mp_reach.unwrap().nlris, vec![Nlri::Labeled(nlri)]);
}

#[test]
fn large_communities_and_aigp() {
    let negotiated = session_with(&[Family::IPV4_UNICAST]);
    let mut update = Update::default();
    update
        .announce
        .push(PrefixNlri::new("10.4.0.0/16".parse().unwrap()));
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
        aigp: Some(Aigp::new(5000)),
        large_community: Some("65001:1:2".parse().unwrap()),
        ..Default::default()
    });
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    let attrs = parsed.attrs.unwrap();
    assert_eq!(attrs.aigp, Some(Aigp::new(5000)));
    assert_eq!(
        attrs.large_community.unwrap().to_string(),
        "65001:1:2"
    );
}

#[test]
fn attribute_flag_error_has_rfc_code() {
    // ORIGIN with optional flags (0x80) violates its well-known
    // definition: (3,4) with the offending attribute as data.
    let negotiated = session_with(&[Family::IPV4_UNICAST]);
    let mut raw = vec![0xffu8; 16];
    raw.extend_from_slice(&[0x00, 0x1b, 0x02]); // length 27, UPDATE
    raw.extend_from_slice(&[0x00, 0x00]); // no withdrawn
    raw.extend_from_slice(&[0x00, 0x04]); // attr length
    raw.extend_from_slice(&[0x80, 0x01, 0x01, 0x00]); // broken ORIGIN
    let err = Message::decode(&raw, &negotiated).unwrap_err();
    assert_eq!(u8::from(err.code), 3);
    assert_eq!(err.subcode, update_error::ATTRIBUTE_FLAGS_ERROR);
    assert_eq!(err.data, vec![0x80, 0x01, 0x01, 0x00]);
}

#[test]
fn truncated_attribute_has_length_error() {
    let negotiated = session_with(&[Family::IPV4_UNICAST]);
    let mut raw = vec![0xffu8; 16];
    raw.extend_from_slice(&[0x00, 0x1a, 0x02]); // length 26, UPDATE
    raw.extend_from_slice(&[0x00, 0x00]);
    raw.extend_from_slice(&[0x00, 0x03]);
    raw.extend_from_slice(&[0x40, 0x01, 0x05]); // ORIGIN claiming 5 octets
    let err = Message::decode(&raw, &negotiated).unwrap_err();
    assert_eq!(u8::from(err.code), 3);
    assert_eq!(err.subcode, update_error::ATTRIBUTE_LENGTH_ERROR);
}
