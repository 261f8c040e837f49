use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use log::debug;

use crate::RouterId;
use crate::interface::InterfaceTable;
use super::Level;

/// One advertised adjacency (or stub, when `neighbor` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub interface: String,
    pub address: Ipv4Addr,
    pub cost: u32,
    pub neighbor: Option<RouterId>,
}

/// Link-state record: an LSA for OSPF routers, an LSP for IS-IS routers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStateRecord {
    pub origin: RouterId,
    pub sequence: u32,
    pub age: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub links: Vec<Link>,
}

impl LinkStateRecord {
    pub fn new(origin: RouterId, sequence: u32, links: Vec<Link>) -> Self {
        Self {
            origin,
            sequence,
            age: 0,
            level: None,
            links,
        }
    }

    /// Builds the record a router advertises for its own interfaces: one link
    /// per attached neighbor that `is_adjacent` accepts, one stub link per
    /// interface without any. Peers stuck short of adjacency are never
    /// advertised.
    pub fn originate(
        origin: RouterId,
        sequence: u32,
        level: Option<Level>,
        interfaces: &InterfaceTable,
        is_adjacent: impl Fn(&str) -> bool,
    ) -> Self {
        let mut links = Vec::new();
        for interface in interfaces.iter() {
            let address = interface.address.addr();
            let adjacent: Vec<&RouterId> = interface
                .neighbors
                .iter()
                .filter(|n| is_adjacent(n))
                .collect();
            if adjacent.is_empty() {
                links.push(Link {
                    interface: interface.name.clone(),
                    address,
                    cost: interface.cost,
                    neighbor: None,
                });
            }
            for neighbor in adjacent {
                links.push(Link {
                    interface: interface.name.clone(),
                    address,
                    cost: interface.cost,
                    neighbor: Some(neighbor.clone()),
                });
            }
        }

        Self {
            origin,
            sequence,
            age: 0,
            level,
            links,
        }
    }

    /// Neighbor ids this record advertises, with their cost.
    pub fn adjacencies(&self) -> impl Iterator<Item = (&RouterId, u32)> {
        self.links
            .iter()
            .filter_map(|link| link.neighbor.as_ref().map(|n| (n, link.cost)))
    }
}

/// Result of offering a record to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// First record ever seen for this origin.
    Installed,
    /// Strictly newer than the stored copy, which it replaced.
    Updated { previous: u32 },
    /// Same or older sequence; nothing changed.
    Stale { stored: u32 },
    /// Claims to come from the local router; the local view is kept.
    SelfOriginated,
}

impl Acceptance {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Acceptance::Installed | Acceptance::Updated { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lsdb {
    records: BTreeMap<RouterId, LinkStateRecord>,
}

impl Lsdb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the acceptance rule: install if absent, replace if the
    /// sequence is strictly higher, otherwise discard.
    pub fn accept(&mut self, record: LinkStateRecord) -> Acceptance {
        match self.records.get(&record.origin) {
            None => {
                self.records.insert(record.origin.clone(), record);
                Acceptance::Installed
            }
            Some(stored) if record.sequence > stored.sequence => {
                let previous = stored.sequence;
                self.records.insert(record.origin.clone(), record);
                Acceptance::Updated { previous }
            }
            Some(stored) => {
                debug!(
                    "Discarding record from {} seq {} (stored seq {})",
                    record.origin, record.sequence, stored.sequence
                );
                Acceptance::Stale { stored: stored.sequence }
            }
        }
    }

    /// Stores a locally originated record without any sequence comparison.
    pub fn install_own(&mut self, record: LinkStateRecord) {
        self.records.insert(record.origin.clone(), record);
    }

    pub fn get(&self, origin: &str) -> Option<&LinkStateRecord> {
        self.records.get(origin)
    }

    pub fn sequence_of(&self, origin: &str) -> Option<u32> {
        self.records.get(origin).map(|r| r.sequence)
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.records.contains_key(origin)
    }

    pub fn remove(&mut self, origin: &str) -> Option<LinkStateRecord> {
        self.records.remove(origin)
    }

    pub fn records(&self) -> impl Iterator<Item = &LinkStateRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
