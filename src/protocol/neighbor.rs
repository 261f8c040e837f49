use std::collections::BTreeMap;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::{info, warn, debug};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::RouterId;
use super::{Level, Protocol};

/// Adjacency state of a known neighbor. `Down` is never stored: a router
/// that is down is simply absent from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborState {
    Init,
    TwoWay,
    ExStart,
    Exchange,
    Full,
    Up,
}

impl NeighborState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NeighborState::Full | NeighborState::Up)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NeighborState::Init => "INIT",
            NeighborState::TwoWay => "2-WAY",
            NeighborState::ExStart => "EXSTART",
            NeighborState::Exchange => "EXCHANGE",
            NeighborState::Full => "FULL",
            NeighborState::Up => "UP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelMismatch {
    pub local: Level,
    pub remote: Level,
}

/// What a single hello did to the adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacencyEvent {
    /// The neighbor walked from `Init` to the terminal state on this hello.
    Established { discovered: bool },
    /// Levels are incompatible; the neighbor stays in `Init` for good.
    Stalled { discovered: bool, mismatch: LevelMismatch },
    /// Already past `Init`; only the liveness timestamp moved.
    Refreshed,
}

#[derive(Debug, Clone)]
pub struct Neighbor {
    pub router_id: RouterId,
    pub state: NeighborState,
    pub last_hello: Instant,
    pub first_seen: DateTime<Utc>,
    pub interface: String,
    pub level: Option<Level>,
}

impl Neighbor {
    pub fn new(router_id: RouterId, interface: String, level: Option<Level>, now: Instant) -> Self {
        Self {
            router_id,
            state: NeighborState::Init,
            last_hello: now,
            first_seen: Utc::now(),
            interface,
            level,
        }
    }

    pub fn is_adjacent(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn time_since_last_hello(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_hello)
    }
}

/// Neighbors of one router plus the adjacency procedure they run.
#[derive(Debug, Clone)]
pub struct NeighborTable {
    protocol: Protocol,
    neighbors: BTreeMap<RouterId, Neighbor>,
}

impl NeighborTable {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            neighbors: BTreeMap::new(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Processes a liveness signal from `peer` heard on `interface`.
    pub fn receive_hello(
        &mut self,
        peer: &str,
        interface: &str,
        level: Option<Level>,
        now: Instant,
    ) -> AdjacencyEvent {
        let discovered = !self.neighbors.contains_key(peer);
        let neighbor = self
            .neighbors
            .entry(peer.to_string())
            .and_modify(|n| {
                n.last_hello = now;
                n.level = level;
                if n.interface != interface {
                    debug!("Neighbor {} moved from {} to {}", peer, n.interface, interface);
                    n.interface = interface.to_string();
                }
            })
            .or_insert_with(|| Neighbor::new(peer.to_string(), interface.to_string(), level, now));

        if discovered {
            info!("New neighbor discovered: {} on {}", peer, interface);
        }

        if neighbor.state != NeighborState::Init {
            return AdjacencyEvent::Refreshed;
        }

        if let Err(mismatch) = self.protocol.admits(level) {
            if discovered {
                warn!(
                    "Neighbor {} stays in INIT: level {} incompatible with local {}",
                    peer, mismatch.remote, mismatch.local
                );
            }
            return AdjacencyEvent::Stalled { discovered, mismatch };
        }

        for &state in self.protocol.progression() {
            neighbor.state = state;
            debug!("Neighbor {} -> {}", peer, state.as_str());
        }
        info!("Neighbor {} -> {} (adjacency established)", peer, neighbor.state.as_str());

        AdjacencyEvent::Established { discovered }
    }

    /// Removes every neighbor silent for longer than `dead_interval`.
    pub fn check_dead_neighbors(&mut self, now: Instant, dead_interval: Duration) -> Vec<Neighbor> {
        let dead: Vec<RouterId> = self
            .neighbors
            .values()
            .filter(|n| n.time_since_last_hello(now) > dead_interval)
            .map(|n| n.router_id.clone())
            .collect();

        dead.iter()
            .filter_map(|id| self.neighbors.remove(id))
            .inspect(|n| warn!("Neighbor {} declared dead", n.router_id))
            .collect()
    }

    pub fn remove_neighbor(&mut self, router_id: &str) -> Option<Neighbor> {
        self.neighbors.remove(router_id)
    }

    /// Drops every neighbor learned on `interface`.
    pub fn remove_on_interface(&mut self, interface: &str) -> Vec<Neighbor> {
        let ids: Vec<RouterId> = self
            .neighbors
            .values()
            .filter(|n| n.interface == interface)
            .map(|n| n.router_id.clone())
            .collect();
        ids.iter().filter_map(|id| self.neighbors.remove(id)).collect()
    }

    pub fn get_neighbor(&self, router_id: &str) -> Option<&Neighbor> {
        self.neighbors.get(router_id)
    }

    pub fn contains(&self, router_id: &str) -> bool {
        self.neighbors.contains_key(router_id)
    }

    pub fn is_adjacent(&self, router_id: &str) -> bool {
        self.neighbors.get(router_id).is_some_and(|n| n.is_adjacent())
    }

    /// Neighbors in the terminal state, the only valid flooding targets.
    pub fn adjacent(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.values().filter(|n| n.is_adjacent())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.values()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
