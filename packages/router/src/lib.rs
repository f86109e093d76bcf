#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod error;
pub mod guard;
pub mod matcher;
pub mod navigation;
pub mod route;
pub mod route_definition;
pub mod view;

mod queue;

mod router;
pub use router::Router;

mod router_cfg;
pub use router_cfg::{Mode, RouterConfig};

mod transition;
pub use transition::{resolve_queue, ChainDiff, NavigationOutcome};

/// A collection of useful items most applications might need.
pub mod prelude {
    pub use crate::error::*;
    pub use crate::guard::*;
    pub use crate::matcher::Matcher;
    pub use crate::navigation::*;
    pub use crate::route::Route;
    pub use crate::route_definition::*;
    pub use crate::view::*;
    pub use crate::{resolve_queue, ChainDiff, Mode, NavigationOutcome, Router, RouterConfig};

    pub use waymark_history::{History, MemoryHistory, Window};
}
