use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::RouterId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub destination: RouterId,
    pub next_hop: RouterId,
    pub cost: u32,
    pub interface: String,
}

impl Route {
    /// Host prefix under which the destination is advertised.
    pub fn prefix(&self) -> String {
        format!("{}/32", self.destination)
    }
}

/// Destination -> route. Rebuilt from scratch on every SPF run and swapped
/// in whole; never patched entry by entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    entries: BTreeMap<RouterId, Route>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, route: Route) {
        self.entries.insert(route.destination.clone(), route);
    }

    pub fn get_route(&self, destination: &str) -> Option<&Route> {
        self.entries.get(destination)
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.entries.contains_key(destination)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.entries.values()
    }
}

impl FromIterator<Route> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        let mut table = RoutingTable::new();
        for route in iter {
            table.add_route(route);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(dest: &str, via: &str, cost: u32) -> Route {
        Route {
            destination: dest.into(),
            next_hop: via.into(),
            cost,
            interface: "eth0".into(),
        }
    }

    #[test]
    fn one_route_per_destination() {
        let mut table = RoutingTable::new();
        table.add_route(route("c", "b", 30));
        table.add_route(route("c", "d", 20));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get_route("c").map(|r| r.next_hop.as_str()), Some("d"));
        assert_eq!(table.get_route("c").unwrap().prefix(), "c/32");
    }

    #[test]
    fn collects_in_destination_order() {
        let table: RoutingTable = [route("z", "b", 10), route("a", "b", 10)].into_iter().collect();
        let order: Vec<_> = table.iter().map(|r| r.destination.as_str()).collect();
        assert_eq!(order, vec!["a", "z"]);
        assert!(!table.contains("b"));
    }
}
