use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::cmp::Ordering;
use crate::RouterId;
use crate::protocol::Lsdb;

/// Shortest-path tree rooted at one router, over the graph implied by an LSDB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortestPathTree {
    pub source: RouterId,
    pub distances: BTreeMap<RouterId, u32>,
    pub previous: BTreeMap<RouterId, RouterId>,
}

#[derive(Debug, PartialEq, Eq)]
struct State {
    cost: u32,
    router: RouterId,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; equal costs pop the lowest id first
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.router.cmp(&self.router))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra from `source`. Every origin in the LSDB is a vertex; every link
/// whose neighbor is also an origin is a directed edge origin -> neighbor
/// weighted by the link cost. Links to routers without a record are ignored.
pub fn calculate_shortest_paths(lsdb: &Lsdb, source: &str) -> ShortestPathTree {
    let mut distances: BTreeMap<RouterId, u32> = BTreeMap::new();
    let mut previous: BTreeMap<RouterId, RouterId> = BTreeMap::new();
    let mut finalized: BTreeSet<RouterId> = BTreeSet::new();
    let mut heap = BinaryHeap::new();

    distances.insert(source.to_string(), 0);
    heap.push(State {
        cost: 0,
        router: source.to_string(),
    });

    while let Some(State { cost, router }) = heap.pop() {
        if !finalized.insert(router.clone()) {
            continue;
        }

        let Some(record) = lsdb.get(&router) else {
            continue;
        };

        for (neighbor, link_cost) in record.adjacencies() {
            if !lsdb.contains(neighbor) || finalized.contains(neighbor) {
                continue;
            }

            let new_cost = cost.saturating_add(link_cost);
            let improves = distances
                .get(neighbor)
                .is_none_or(|&known| new_cost < known);

            if improves {
                distances.insert(neighbor.clone(), new_cost);
                previous.insert(neighbor.clone(), router.clone());
                heap.push(State {
                    cost: new_cost,
                    router: neighbor.clone(),
                });
            }
        }
    }

    ShortestPathTree {
        source: source.to_string(),
        distances,
        previous,
    }
}

impl ShortestPathTree {
    pub fn cost(&self, dest: &str) -> Option<u32> {
        self.distances.get(dest).copied()
    }

    /// Source-to-destination path, both ends included. Empty if unreachable.
    pub fn path(&self, dest: &str) -> Vec<RouterId> {
        if !self.distances.contains_key(dest) {
            return Vec::new();
        }

        let mut path = vec![dest.to_string()];
        let mut current = dest;
        while let Some(prev) = self.previous.get(current) {
            path.push(prev.clone());
            current = prev;
            if current == self.source || path.len() > self.distances.len() {
                break;
            }
        }

        path.reverse();
        path
    }

    /// First router after the source on the path to `dest`.
    pub fn next_hop(&self, dest: &str) -> Option<RouterId> {
        if dest == self.source {
            return None;
        }
        let path = self.path(dest);
        match path.first() {
            Some(first) if first == &self.source => path.get(1).cloned(),
            _ => None,
        }
    }

    /// Reachable destinations other than the source, in id order.
    pub fn destinations(&self) -> impl Iterator<Item = (&RouterId, u32)> {
        self.distances
            .iter()
            .filter(|(id, _)| **id != self.source)
            .map(|(id, cost)| (id, *cost))
    }
}
