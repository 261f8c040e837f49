use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::RouterId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub address: Ipv4Net,
    pub cost: u32,
    pub neighbors: BTreeSet<RouterId>,
}

impl Interface {
    pub fn new(name: String, address: Ipv4Net, cost: u32) -> Self {
        Self {
            name,
            address,
            cost,
            neighbors: BTreeSet::new(),
        }
    }
}

/// Local attachment points of one router, keyed and iterated by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceTable {
    interfaces: BTreeMap<String, Interface>,
}

impl InterfaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites an interface. Overwriting keeps the neighbors
    /// already attached to it.
    pub fn upsert(&mut self, name: &str, address: Ipv4Net, cost: u32) -> bool {
        match self.interfaces.get_mut(name) {
            Some(existing) => {
                existing.address = address;
                existing.cost = cost;
                false
            }
            None => {
                self.interfaces
                    .insert(name.to_string(), Interface::new(name.to_string(), address, cost));
                true
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Interface> {
        self.interfaces.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    pub fn attach(&mut self, name: &str, neighbor: &str) -> bool {
        match self.interfaces.get_mut(name) {
            Some(interface) => interface.neighbors.insert(neighbor.to_string()),
            None => false,
        }
    }

    /// Removes `neighbor` from every interface; true if any membership changed.
    pub fn detach(&mut self, neighbor: &str) -> bool {
        let mut changed = false;
        for interface in self.interfaces.values_mut() {
            changed |= interface.neighbors.remove(neighbor);
        }
        changed
    }

    /// First interface (by name) whose neighbor set contains `neighbor`.
    pub fn interface_to(&self, neighbor: &str) -> Option<&Interface> {
        self.interfaces
            .values()
            .find(|interface| interface.neighbors.contains(neighbor))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
