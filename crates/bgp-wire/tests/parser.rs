use bgp_wire::*;
use hex_literal::hex;

fn v4_session() -> Negotiated {
    let mut negotiated = Negotiated {
        as4: true,
        hold_time: 90,
        ..Default::default()
    };
    negotiated.families.insert(Family::IPV4_UNICAST);
    negotiated
}

const ANNOUNCE: &[u8] = &hex!(
    "
ff ff ff ff ff ff ff ff ff ff ff ff ff ff ff ff
00 36 02 00 00 00 1b 40 01 01 00 40 02 06 02 01
00 00 fd e9 40 03 04 c0 00 02 01 40 05 04 00 00
00 64 18 0a 00 00
"
);

#[test]
fn decode_ipv4_announce() {
    let message = Message::decode(ANNOUNCE, &v4_session()).unwrap();
    let Message::Update(update) = message else {
        panic!("must be an update");
    };
    assert!(update.withdraw.is_empty());
    assert_eq!(update.announce.len(), 1);
    assert_eq!(update.announce[0].prefix.to_string(), "10.0.0.0/24");

    let attrs = update.attrs.as_ref().unwrap();
    assert_eq!(attrs.origin, Some(Origin::Igp));
    assert_eq!(attrs.aspath, Some(AsPath::from_sequence([65001])));
    assert_eq!(attrs.nexthop.unwrap().nexthop.to_string(), "192.0.2.1");
    assert_eq!(attrs.local_pref, Some(LocalPref::new(100)));
}

#[test]
fn encode_ipv4_announce_is_byte_exact() {
    let mut update = Update::default();
    update.announce.push(PrefixNlri::new("10.0.0.0/24".parse().unwrap()));
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
        local_pref: Some(LocalPref::new(100)),
        ..Default::default()
    });
    let buf = update.encode(&v4_session()).unwrap();
    assert_eq!(&buf[..], ANNOUNCE);
}

#[test]
fn decoded_update_reencodes_identically() {
    let negotiated = v4_session();
    let Message::Update(update) = Message::decode(ANNOUNCE, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    let buf = update.encode(&negotiated).unwrap();
    assert_eq!(&buf[..], ANNOUNCE);
}

#[test]
fn open_with_as_trans() {
    let mut caps = CapabilitySet::default();
    caps.mp
        .insert(Family::IPV4_UNICAST, CapMultiProtocol::new(Family::IPV4_UNICAST));
    caps.as4 = Some(CapAs4::new(4200000000));
    let open = Open::new(
        Negotiated::open_asn(4200000000),
        90,
        "10.0.0.1".parse().unwrap(),
        caps,
    );
    assert_eq!(open.asn, AS_TRANS);

    let buf = open.encode();
    let message = Message::decode(&buf, &Negotiated::default()).unwrap();
    let Message::Open(parsed) = message else {
        panic!("must be an open");
    };
    assert_eq!(parsed.asn, AS_TRANS);
    assert_eq!(parsed.peer_asn(), 4200000000);
    assert_eq!(parsed.hold_time, 90);
}

#[test]
fn asn4_negotiation_against_two_octet_peer() {
    let mut ours = CapabilitySet::default();
    ours.mp
        .insert(Family::IPV4_UNICAST, CapMultiProtocol::new(Family::IPV4_UNICAST));
    ours.as4 = Some(CapAs4::new(4200000000));
    let mut theirs = CapabilitySet::default();
    theirs
        .mp
        .insert(Family::IPV4_UNICAST, CapMultiProtocol::new(Family::IPV4_UNICAST));
    theirs.as4 = Some(CapAs4::new(64512));

    let negotiated = Negotiated::negotiate(4200000000, 64512, 90, 90, &ours, &theirs);
    assert!(negotiated.as4);
    assert_eq!(negotiated.local_as, 4200000000);
    assert_eq!(negotiated.peer_as, 64512);
}

#[test]
fn keepalive_is_exactly_19_octets() {
    let buf = keepalive_message();
    assert_eq!(buf.len(), 19);
    assert!(matches!(
        Message::decode(&buf, &Negotiated::default()),
        Ok(Message::Keepalive)
    ));

    // A padded keepalive must be refused with (1,2).
    let mut padded = buf.to_vec();
    padded.push(0);
    padded[17] = 20;
    let err = Message::decode(&padded, &Negotiated::default()).unwrap_err();
    assert_eq!(u8::from(err.code), 1);
    assert_eq!(err.subcode, header_error::BAD_MESSAGE_LENGTH);
}

#[test]
fn bad_marker_and_bad_type() {
    let mut broken = ANNOUNCE.to_vec();
    broken[0] = 0x00;
    let err = Message::decode(&broken, &v4_session()).unwrap_err();
    assert_eq!((u8::from(err.code), err.subcode), (1, 1));

    let mut broken = keepalive_message().to_vec();
    broken[18] = 9;
    let err = Message::decode(&broken, &Negotiated::default()).unwrap_err();
    assert_eq!((u8::from(err.code), err.subcode), (1, 3));
    assert_eq!(err.data, vec![9]);
}

#[test]
fn eor_markers() {
    let negotiated = v4_session();
    let marker = Update::eor_marker(Family::IPV4_UNICAST);
    let buf = marker.encode(&negotiated).unwrap();
    assert_eq!(buf.len(), 23);
    let Message::Update(update) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(update.eor(), Some(Family::IPV4_UNICAST));

    let v6 = Family::new(Afi::Ipv6, Safi::Unicast);
    let marker = Update::eor_marker(v6);
    let buf = marker.encode(&negotiated).unwrap();
    let Message::Update(update) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(update.eor(), Some(v6));
}

#[test]
fn unknown_attribute_round_trips_with_partial_bit() {
    // Optional transitive attribute code 99, three value octets.
    let mut update = Update::default();
    update.announce.push(PrefixNlri::new("10.0.0.0/24".parse().unwrap()));
    let mut attrs = Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
        ..Default::default()
    };
    attrs.generic.push(GenericAttr {
        flags: AttrFlags::optional_transitive(),
        code: 99,
        value: vec![0xde, 0xad, 0xbf],
    });
    update.attrs = Some(attrs);

    let negotiated = v4_session();
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    let generic = &parsed.attrs.as_ref().unwrap().generic;
    assert_eq!(generic.len(), 1);
    assert_eq!(generic[0].code, 99);
    assert_eq!(generic[0].value, vec![0xde, 0xad, 0xbf]);
    // Forwarding an unrecognized optional transitive attribute sets
    // the partial bit (RFC 4271 §5).
    assert!(generic[0].forward_flags().partial());

    let buf2 = parsed.encode(&negotiated).unwrap();
    let Message::Update(parsed2) = Message::decode(&buf2, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed2.attrs.unwrap().generic, parsed.attrs.unwrap().generic);
}

#[test]
fn ipv6_unicast_rides_mp_reach() {
    let v6 = Family::new(Afi::Ipv6, Safi::Unicast);
    let mut negotiated = v4_session();
    negotiated.families.insert(v6);

    let mut reach = MpReach::new(
        v6,
        MpNextHop::Ipv6 {
            global: "2001:db8::1".parse().unwrap(),
            link_local: None,
        },
    );
    reach
        .nlris
        .push(Nlri::Prefix(PrefixNlri::new("2001:db8:1::/48".parse().unwrap())));
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        ..Default::default()
    });
    update.mp_reach = Some(reach.clone());

    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.mp_reach, Some(reach));
    assert!(parsed.announce.is_empty());
}

#[test]
fn flowspec_redirect_update() {
    let flow = Family::new(Afi::Ipv4, Safi::Flowspec);
    let mut negotiated = v4_session();
    negotiated.families.insert(flow);

    let nlri = FlowspecNlri::new(vec![
        FlowComponent::DstPrefix("10.0.1.0/24".parse().unwrap()),
        FlowComponent::DstPort(vec![NumericOp::eq(80)]),
    ]);
    let mut reach = MpReach::new(flow, MpNextHop::Empty);
    reach.nlris.push(Nlri::Flowspec(nlri.clone()));

    let mut ecom = ExtCommunity::default();
    ecom.push(ExtCommunityValue::TrafficRedirect {
        asn: 65000,
        number: 12345,
    });
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        ext_community: Some(ecom),
        ..Default::default()
    });
    update.mp_reach = Some(reach);

    let buf = update.encode(&negotiated).unwrap();
    // The extended community on the wire: type 0x80 subtype 0x08,
    // ASN 0xfde8, value 0x00003039.
    let needle = [0x80u8, 0x08, 0xfd, 0xe8, 0x00, 0x00, 0x30, 0x39];
    assert!(buf.windows(8).any(|w| w == needle));
    // The component bytes from the flow NLRI.
    let components = [
        0x01u8, 0x18, 0x0a, 0x00, 0x01, 0x05, 0x81, 0x50,
    ];
    assert!(buf.windows(components.len()).any(|w| w == components));

    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    let reach = parsed.mp_reach.unwrap();
    assert_eq!(reach.nlris, vec![Nlri::Flowspec(nlri)]);
}

#[test]
fn vpn_and_labeled_updates_round_trip() {
    let vpn = Family::new(Afi::Ipv4, Safi::MplsVpn);
    let labeled = Family::new(Afi::Ipv4, Safi::LabeledUnicast);
    let mut negotiated = v4_session();
    negotiated.families.insert(vpn);
    negotiated.families.insert(labeled);

    let rd = RouteDistinguisher::As2 {
        asn: 64512,
        number: 17,
    };
    let mut reach = MpReach::new(vpn, MpNextHop::VpnIpv4("192.0.2.4".parse().unwrap()));
    reach.nlris.push(Nlri::Vpn(VpnNlri::new(
        "172.16.0.0/12".parse().unwrap(),
        rd,
        Label::new(2048, 0, true),
    )));
    let mut update = Update::default();
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([64512])),
        ..Default::default()
    });
    update.mp_reach = Some(reach.clone());
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.mp_reach, Some(reach));
}

#[test]
fn addpath_receive_changes_nlri_decode() {
    let mut negotiated = v4_session();
    negotiated
        .addpath
        .insert(Family::IPV4_UNICAST, AddPathPair {
            send: false,
            receive: true,
        });

    let mut update = Update::default();
    update
        .announce
        .push(PrefixNlri::with_path_id("10.9.0.0/16".parse().unwrap(), 3));
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
        ..Default::default()
    });
    let buf = update.encode(&negotiated).unwrap();
    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.announce[0].path_id, 3);
}

#[test]
fn oversized_update_needs_extended_message() {
    let mut update = Update::default();
    for i in 0..1100u32 {
        let addr = std::net::Ipv4Addr::from(0x0a000000 + i);
        update
            .announce
            .push(PrefixNlri::new(format!("{addr}/32").parse().unwrap()));
    }
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([65001])),
        nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
        ..Default::default()
    });

    let plain = v4_session();
    let err = update.encode(&plain).unwrap_err();
    assert_eq!((u8::from(err.code), err.subcode), (1, 2));

    let mut extended = v4_session();
    extended.extended_message = true;
    let buf = update.encode(&extended).unwrap();
    assert!(buf.len() > BGP_MSG_MAX);
    let Message::Update(parsed) = Message::decode(&buf, &extended).unwrap() else {
        panic!("must be an update");
    };
    assert_eq!(parsed.announce.len(), 1100);
}

#[test]
fn as4_path_merge_on_two_octet_session() {
    // Session without ASN4: AS_PATH carries AS_TRANS, AS4_PATH the
    // real 32-bit path.
    let mut negotiated = v4_session();
    negotiated.as4 = false;

    let mut update = Update::default();
    update.announce.push(PrefixNlri::new("10.0.0.0/24".parse().unwrap()));
    update.attrs = Some(Attrs {
        origin: Some(Origin::Igp),
        aspath: Some(AsPath::from_sequence([4200000000, 65001])),
        nexthop: Some(NextHop::new("192.0.2.1".parse().unwrap())),
        ..Default::default()
    });
    let buf = update.encode(&negotiated).unwrap();

    let Message::Update(parsed) = Message::decode(&buf, &negotiated).unwrap() else {
        panic!("must be an update");
    };
    // The decoder merged AS4_PATH back into the path.
    assert_eq!(
        parsed.attrs.unwrap().aspath,
        Some(AsPath::from_sequence([4200000000, 65001]))
    );
}
