//! Routing table derivation from a shortest-path tree.

use log::debug;

use crate::RouterId;
use crate::interface::InterfaceTable;
use crate::protocol::{Lsdb, NeighborTable, Route, RoutingTable};
use super::dijkstra::calculate_shortest_paths;

/// Why a reachable destination got no route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Omission {
    /// The first hop is not (or no longer) in the neighbor table.
    NextHopNotNeighbor { next_hop: RouterId },
    /// The first hop is known but has not reached the terminal state.
    NextHopNotAdjacent { next_hop: RouterId },
    /// No interface lists the first hop in its neighbor set.
    NoInterfaceToNextHop { next_hop: RouterId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpfOutcome {
    /// Fewer than two origins known; the previous table was kept.
    Skipped { origins: usize },
    Computed {
        table: RoutingTable,
        omitted: Vec<(RouterId, Omission)>,
    },
}

impl SpfOutcome {
    pub fn table(&self) -> Option<&RoutingTable> {
        match self {
            SpfOutcome::Computed { table, .. } => Some(table),
            SpfOutcome::Skipped { .. } => None,
        }
    }
}

/// Runs SPF from `source` and resolves a next hop and egress interface for
/// every reachable destination.
pub fn compute_routes(
    source: &RouterId,
    lsdb: &Lsdb,
    neighbors: &NeighborTable,
    interfaces: &InterfaceTable,
) -> SpfOutcome {
    if lsdb.len() < 2 {
        return SpfOutcome::Skipped { origins: lsdb.len() };
    }

    let tree = calculate_shortest_paths(lsdb, source);
    let mut table = RoutingTable::new();
    let mut omitted = Vec::new();

    for (destination, cost) in tree.destinations() {
        let Some(next_hop) = tree.next_hop(destination) else {
            continue;
        };

        if !neighbors.contains(&next_hop) {
            debug!("No route to {}: next hop {} is not a neighbor", destination, next_hop);
            omitted.push((destination.clone(), Omission::NextHopNotNeighbor { next_hop }));
            continue;
        }
        if !neighbors.is_adjacent(&next_hop) {
            debug!("No route to {}: next hop {} is not adjacent", destination, next_hop);
            omitted.push((destination.clone(), Omission::NextHopNotAdjacent { next_hop }));
            continue;
        }

        let Some(interface) = interfaces.interface_to(&next_hop) else {
            debug!("No route to {}: no interface toward {}", destination, next_hop);
            omitted.push((destination.clone(), Omission::NoInterfaceToNextHop { next_hop }));
            continue;
        };

        table.add_route(Route {
            destination: destination.clone(),
            next_hop,
            cost,
            interface: interface.name.clone(),
        });
    }

    SpfOutcome::Computed { table, omitted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Level, LinkStateRecord, Protocol};
    use tokio::time::Instant;

    fn setup() -> (Lsdb, NeighborTable, InterfaceTable) {
        let mut interfaces = InterfaceTable::new();
        interfaces.upsert("eth0", "10.0.0.1/24".parse().unwrap(), 10);
        interfaces.attach("eth0", "b");

        let mut neighbors = NeighborTable::new(Protocol::Ospf);
        neighbors.receive_hello("b", "eth0", None, Instant::now());

        let mut b_interfaces = InterfaceTable::new();
        b_interfaces.upsert("eth0", "10.0.0.2/24".parse().unwrap(), 10);
        b_interfaces.upsert("eth1", "10.0.1.2/24".parse().unwrap(), 10);
        b_interfaces.attach("eth0", "a");
        b_interfaces.attach("eth1", "c");

        let mut c_interfaces = InterfaceTable::new();
        c_interfaces.upsert("eth0", "10.0.1.3/24".parse().unwrap(), 10);
        c_interfaces.attach("eth0", "b");

        let mut lsdb = Lsdb::new();
        lsdb.install_own(LinkStateRecord::originate("a".into(), 0, None, &interfaces, |_| true));
        lsdb.accept(LinkStateRecord::originate("b".into(), 0, None, &b_interfaces, |_| true));
        lsdb.accept(LinkStateRecord::originate("c".into(), 0, None, &c_interfaces, |_| true));
        (lsdb, neighbors, interfaces)
    }

    #[test]
    fn resolves_routes_through_neighbor() {
        let (lsdb, neighbors, interfaces) = setup();
        let outcome = compute_routes(&"a".to_string(), &lsdb, &neighbors, &interfaces);
        let table = outcome.table().unwrap();

        let to_c = table.get_route("c").unwrap();
        assert_eq!((to_c.next_hop.as_str(), to_c.cost, to_c.interface.as_str()), ("b", 20, "eth0"));
        assert!(!table.contains("a"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn skipped_with_single_origin() {
        let mut lsdb = Lsdb::new();
        lsdb.install_own(LinkStateRecord::new("a".into(), 0, Vec::new()));
        let outcome = compute_routes(
            &"a".to_string(),
            &lsdb,
            &NeighborTable::new(Protocol::Ospf),
            &InterfaceTable::new(),
        );
        assert_eq!(outcome, SpfOutcome::Skipped { origins: 1 });
    }

    #[test]
    fn omits_when_next_hop_is_not_a_neighbor() {
        let (lsdb, _, interfaces) = setup();
        let outcome = compute_routes(&"a".to_string(), &lsdb, &NeighborTable::new(Protocol::Ospf), &interfaces);
        let SpfOutcome::Computed { table, omitted } = outcome else {
            panic!("expected a computed outcome");
        };
        assert!(table.is_empty());
        assert_eq!(omitted.len(), 2);
        assert!(omitted
            .iter()
            .all(|(_, o)| *o == Omission::NextHopNotNeighbor { next_hop: "b".into() }));
    }

    #[test]
    fn omits_when_next_hop_is_short_of_adjacency() {
        let (lsdb, _, interfaces) = setup();
        let mut neighbors = NeighborTable::new(Protocol::Isis { level: Level::L1 });
        neighbors.receive_hello("b", "eth0", Some(Level::L2), Instant::now());

        let SpfOutcome::Computed { table, omitted } =
            compute_routes(&"a".to_string(), &lsdb, &neighbors, &interfaces)
        else {
            panic!("expected a computed outcome");
        };
        assert!(table.is_empty());
        assert_eq!(omitted.len(), 2);
        assert!(omitted
            .iter()
            .all(|(_, o)| *o == Omission::NextHopNotAdjacent { next_hop: "b".into() }));
    }

    #[test]
    fn omits_when_no_interface_reaches_next_hop() {
        let (lsdb, neighbors, mut interfaces) = setup();
        interfaces.detach("b");
        let SpfOutcome::Computed { table, omitted } =
            compute_routes(&"a".to_string(), &lsdb, &neighbors, &interfaces)
        else {
            panic!("expected a computed outcome");
        };
        assert!(table.is_empty());
        assert!(omitted
            .iter()
            .all(|(_, o)| matches!(o, Omission::NoInterfaceToNextHop { .. })));
    }
}
