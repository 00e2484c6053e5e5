pub mod code;
pub use code::AttrCode;

pub mod flags;
pub use flags::AttrFlags;

pub mod emitter;
pub use emitter::AttrEmit;

pub mod origin;
pub use origin::*;

pub mod aspath;
pub use aspath::*;

pub mod nexthop;
pub use nexthop::*;

pub mod med;
pub use med::*;

pub mod local_pref;
pub use local_pref::*;

pub mod atomic;
pub use atomic::*;

pub mod aggregator;
pub use aggregator::*;

pub mod community;
pub use community::*;

pub mod originator_id;
pub use originator_id::*;

pub mod cluster_list;
pub use cluster_list::*;

pub mod ext_community;
pub use ext_community::*;

pub mod large_community;
pub use large_community::*;

pub mod aigp;
pub use aigp::*;

pub mod linkstate;
pub use linkstate::*;

pub mod generic;
pub use generic::*;

pub mod mp_reach;
pub use mp_reach::*;

pub mod mp_unreach;
pub use mp_unreach::*;

pub mod attr;
pub use attr::*;
