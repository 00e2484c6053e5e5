/// Path attribute type codes.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum AttrCode {
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    Med = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,
    Community = 8,
    OriginatorId = 9,
    ClusterList = 10,
    MpReachNlri = 14,
    MpUnreachNlri = 15,
    ExtCommunity = 16,
    As4Path = 17,
    As4Aggregator = 18,
    Aigp = 26,
    LinkState = 29,
    LargeCommunity = 32,
    Unknown(u8),
}

impl From<u8> for AttrCode {
    fn from(code: u8) -> Self {
        use AttrCode::*;
        match code {
            1 => Origin,
            2 => AsPath,
            3 => NextHop,
            4 => Med,
            5 => LocalPref,
            6 => AtomicAggregate,
            7 => Aggregator,
            8 => Community,
            9 => OriginatorId,
            10 => ClusterList,
            14 => MpReachNlri,
            15 => MpUnreachNlri,
            16 => ExtCommunity,
            17 => As4Path,
            18 => As4Aggregator,
            26 => Aigp,
            29 => LinkState,
            32 => LargeCommunity,
            v => Unknown(v),
        }
    }
}

impl From<AttrCode> for u8 {
    fn from(code: AttrCode) -> Self {
        use AttrCode::*;
        match code {
            Origin => 1,
            AsPath => 2,
            NextHop => 3,
            Med => 4,
            LocalPref => 5,
            AtomicAggregate => 6,
            Aggregator => 7,
            Community => 8,
            OriginatorId => 9,
            ClusterList => 10,
            MpReachNlri => 14,
            MpUnreachNlri => 15,
            ExtCommunity => 16,
            As4Path => 17,
            As4Aggregator => 18,
            Aigp => 26,
            LinkState => 29,
            LargeCommunity => 32,
            Unknown(v) => v,
        }
    }
}
