pub mod algorithms;
pub mod config;
pub mod error;
pub mod interface;
pub mod network;
pub mod protocol;
pub mod report;
pub mod router;
pub mod system;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use error::RouterError;
pub use network::{LinkSpec, Network};
pub use protocol::{Level, Protocol};
pub use router::{RouteObserver, Router, RouterSnapshot};

pub type RouterId = String;

pub type SharedRouterState = Arc<Mutex<router::RouterState>>;

pub type Result<T> = std::result::Result<T, RouterError>;
