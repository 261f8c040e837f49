//! Error types for the routing core.
//!
//! Only precondition violations are errors. Stale records, incompatible
//! levels and unresolvable next hops are ordinary outcomes and are reported
//! through the return values of the operations that produce them.

use crate::RouterId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    #[error("unknown router: {0}")]
    UnknownRouter(RouterId),

    #[error("router already exists: {0}")]
    DuplicateRouter(RouterId),

    #[error("router {router} has no interface named {interface}")]
    UnknownInterface { router: RouterId, interface: String },

    #[error("missing identifier: {0}")]
    MissingIdentifier(&'static str),

    #[error("router {0} cannot form an adjacency with itself")]
    SelfAdjacency(RouterId),

    #[error("interface {interface} has invalid cost {cost}")]
    InvalidCost { interface: String, cost: u32 },

    #[error("routers {0} and {1} are not connected")]
    NotConnected(RouterId, RouterId),
}
