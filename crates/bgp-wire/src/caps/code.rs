use nom::IResult;
use nom::number::complete::be_u8;

/// Capability codes from the IANA registry, plus the two historical
/// multi-session codepoints carried for interoperability.
#[repr(u8)]
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum CapCode {
    #[default]
    MultiProtocol = 1,
    RouteRefresh = 2,
    ExtendedNexthop = 5,
    ExtendedMessage = 6,
    Operational = 9,
    GracefulRestart = 64,
    As4 = 65,
    MultiSession = 68,
    AddPath = 69,
    EnhancedRouteRefresh = 70,
    Llgr = 71,
    RouteRefreshCisco = 128,
    MultiSessionCisco = 131,
    Unknown(u8),
}

impl From<CapCode> for u8 {
    fn from(code: CapCode) -> Self {
        use CapCode::*;
        match code {
            MultiProtocol => 1,
            RouteRefresh => 2,
            ExtendedNexthop => 5,
            ExtendedMessage => 6,
            Operational => 9,
            GracefulRestart => 64,
            As4 => 65,
            MultiSession => 68,
            AddPath => 69,
            EnhancedRouteRefresh => 70,
            Llgr => 71,
            RouteRefreshCisco => 128,
            MultiSessionCisco => 131,
            Unknown(v) => v,
        }
    }
}

impl From<u8> for CapCode {
    fn from(code: u8) -> Self {
        use CapCode::*;
        match code {
            1 => MultiProtocol,
            2 => RouteRefresh,
            5 => ExtendedNexthop,
            6 => ExtendedMessage,
            9 => Operational,
            64 => GracefulRestart,
            65 => As4,
            68 => MultiSession,
            69 => AddPath,
            70 => EnhancedRouteRefresh,
            71 => Llgr,
            128 => RouteRefreshCisco,
            131 => MultiSessionCisco,
            v => Unknown(v),
        }
    }
}

impl CapCode {
    pub fn parse_be(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, code) = be_u8(input)?;
        Ok((input, code.into()))
    }
}
