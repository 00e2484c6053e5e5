pub mod code;
pub use code::CapCode;

pub mod emit;
pub use emit::CapEmit;

pub mod packet;
pub use packet::{Capability, CapabilityHeader, parse_capability_param};

pub mod mp;
pub use mp::CapMultiProtocol;

pub mod refresh;
pub use refresh::{CapEnhancedRefresh, CapRefresh, CapRefreshCisco};

pub mod extended;
pub use extended::CapExtendedMessage;

pub mod nexthop;
pub use nexthop::{CapExtendedNexthop, ExtendedNexthopEntry};

pub mod graceful;
pub use graceful::{CapGracefulRestart, RestartFamily, RestartFlagTime};

pub mod as4;
pub use as4::CapAs4;

pub mod addpath;
pub use addpath::{AddPathDirection, AddPathFamily, CapAddPath};

pub mod llgr;
pub use llgr::{CapLlgr, LlgrFamily};

pub mod multisession;
pub use multisession::CapMultiSession;

pub mod operational;
pub use operational::CapOperational;

pub mod unknown;
pub use unknown::CapUnknown;

pub mod set;
pub use set::CapabilitySet;
