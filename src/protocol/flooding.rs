use serde::{Deserialize, Serialize};

use crate::RouterId;
use super::{Level, LinkStateRecord, NeighborTable};

/// An effect a router wants delivered to another router. Routers never call
/// each other; whoever drives them (the network fabric) performs delivery
/// after the producing router has released its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outbound {
    Record {
        from: RouterId,
        to: RouterId,
        record: LinkStateRecord,
    },
    Hello {
        from: RouterId,
        to: RouterId,
        level: Option<Level>,
    },
}

impl Outbound {
    pub fn sender(&self) -> &RouterId {
        match self {
            Outbound::Record { from, .. } | Outbound::Hello { from, .. } => from,
        }
    }

    pub fn recipient(&self) -> &RouterId {
        match self {
            Outbound::Record { to, .. } | Outbound::Hello { to, .. } => to,
        }
    }
}

/// Addresses `record` to every neighbor in the terminal adjacency state,
/// except `except` (the neighbor it came from, if any).
pub fn flood(
    local: &RouterId,
    record: &LinkStateRecord,
    neighbors: &NeighborTable,
    except: Option<&str>,
) -> Vec<Outbound> {
    neighbors
        .adjacent()
        .filter(|neighbor| Some(neighbor.router_id.as_str()) != except)
        .map(|neighbor| Outbound::Record {
            from: local.clone(),
            to: neighbor.router_id.clone(),
            record: record.clone(),
        })
        .collect()
}

/// Full database exchange toward a neighbor that just became adjacent.
pub fn exchange<'a>(
    local: &RouterId,
    peer: &RouterId,
    records: impl Iterator<Item = &'a LinkStateRecord>,
) -> Vec<Outbound> {
    records
        .map(|record| Outbound::Record {
            from: local.clone(),
            to: peer.clone(),
            record: record.clone(),
        })
        .collect()
}
