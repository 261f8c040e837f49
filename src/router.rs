use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use log::{info, warn, debug};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::Instant;

use crate::{Result, RouterError, RouterId, SharedRouterState};
use crate::algorithms::{compute_routes, SpfOutcome};
use crate::config::RouterConfig;
use crate::interface::{Interface, InterfaceTable};
use crate::protocol::task_manager::TaskManager;
use crate::protocol::{
    exchange, flood, Acceptance, AdjacencyEvent, Level, LinkStateRecord, Lsdb, NeighborState,
    NeighborTable, Outbound, Protocol, RoutingTable,
};

/// Hook run after every SPF pass that produced a table, e.g. to push routes
/// into an OS forwarding table. Called without the router lock held.
pub trait RouteObserver: Send + Sync {
    fn routes_updated(&self, router: &RouterId, table: &RoutingTable);
}

/// Everything a router mutates, guarded as one unit.
#[derive(Debug)]
pub struct RouterState {
    pub id: RouterId,
    pub protocol: Protocol,
    pub interfaces: InterfaceTable,
    pub neighbors: NeighborTable,
    pub lsdb: Lsdb,
    pub routing_table: RoutingTable,
}

impl RouterState {
    pub fn new(id: RouterId, protocol: Protocol) -> Self {
        let mut lsdb = Lsdb::new();
        let interfaces = InterfaceTable::new();
        lsdb.install_own(LinkStateRecord::originate(id.clone(), 0, protocol.level(), &interfaces, |_| false));

        Self {
            id,
            protocol,
            interfaces,
            neighbors: NeighborTable::new(protocol),
            lsdb,
            routing_table: RoutingTable::new(),
        }
    }

    fn own_sequence(&self) -> u32 {
        self.lsdb.sequence_of(&self.id).unwrap_or(0)
    }

    /// Rebuilds the local record from the interface table with the given
    /// sequence and floods it to every adjacent neighbor but `except`.
    /// Only adjacent members of an interface are advertised.
    fn originate(&mut self, sequence: u32, except: Option<&str>) -> Vec<Outbound> {
        let neighbors = &self.neighbors;
        let record = LinkStateRecord::originate(
            self.id.clone(),
            sequence,
            self.protocol.level(),
            &self.interfaces,
            |peer| neighbors.is_adjacent(peer),
        );
        debug!("Originating record for {} seq {} ({} links)", self.id, sequence, record.links.len());
        let outbound = flood(&self.id, &record, &self.neighbors, except);
        self.lsdb.install_own(record);
        outbound
    }

    fn regenerate(&mut self) -> Vec<Outbound> {
        self.regenerate_except(None)
    }

    fn regenerate_except(&mut self, except: Option<&str>) -> Vec<Outbound> {
        let next = self.own_sequence().saturating_add(1);
        self.originate(next, except)
    }

    /// Runs SPF and swaps the routing table in when one was computed.
    fn run_spf(&mut self) -> SpfOutcome {
        let outcome = compute_routes(&self.id, &self.lsdb, &self.neighbors, &self.interfaces);
        match &outcome {
            SpfOutcome::Computed { table, omitted } => {
                self.routing_table = table.clone();
                info!(
                    "[{}] SPF recalculated, {} routes ({} destinations omitted)",
                    self.id,
                    table.len(),
                    omitted.len()
                );
            }
            SpfOutcome::Skipped { origins } => {
                debug!("[{}] SPF skipped, {} origin(s) in LSDB", self.id, origins);
            }
        }
        outcome
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborSummary {
    pub router_id: RouterId,
    pub state: NeighborState,
    pub interface: String,
    pub level: Option<Level>,
    pub since_last_hello: Duration,
    pub first_seen: DateTime<Utc>,
}

/// Owned copy of a router's tables for reporting and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSnapshot {
    pub id: RouterId,
    pub protocol: Protocol,
    pub interfaces: Vec<Interface>,
    pub neighbors: Vec<NeighborSummary>,
    pub lsdb: Vec<LinkStateRecord>,
    pub routing_table: RoutingTable,
}

/// A link-state router. Cloning yields another handle to the same router.
#[derive(Clone)]
pub struct Router {
    id: RouterId,
    protocol: Protocol,
    config: RouterConfig,
    state: SharedRouterState,
    observers: Arc<RwLock<Vec<Arc<dyn RouteObserver>>>>,
    tasks: Arc<Mutex<TaskManager>>,
}

impl Router {
    pub fn new(id: impl Into<RouterId>, protocol: Protocol, config: RouterConfig) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(RouterError::MissingIdentifier("router id"));
        }

        Ok(Self {
            state: Arc::new(Mutex::new(RouterState::new(id.clone(), protocol))),
            id,
            protocol,
            config,
            observers: Arc::new(RwLock::new(Vec::new())),
            tasks: Arc::new(Mutex::new(TaskManager::new())),
        })
    }

    pub fn id(&self) -> &RouterId {
        &self.id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub async fn add_observer(&self, observer: Arc<dyn RouteObserver>) {
        self.observers.write().await.push(observer);
    }

    /// Adds or overwrites an interface and re-originates the local record.
    pub async fn add_interface(&self, name: &str, address: Ipv4Net, cost: u32) -> Result<Vec<Outbound>> {
        if name.is_empty() {
            return Err(RouterError::MissingIdentifier("interface name"));
        }
        if cost == 0 {
            return Err(RouterError::InvalidCost { interface: name.to_string(), cost });
        }

        let mut state = self.state.lock().await;
        if state.interfaces.upsert(name, address, cost) {
            info!("[{}] Interface {} added ({}, cost {})", self.id, name, address, cost);
        } else {
            info!("[{}] Interface {} updated ({}, cost {})", self.id, name, address, cost);
        }
        Ok(state.regenerate())
    }

    /// Removes an interface and every neighbor learned on it.
    pub async fn remove_interface(&self, name: &str) -> Result<Vec<Outbound>> {
        let mut state = self.state.lock().await;
        if state.interfaces.remove(name).is_none() {
            return Err(self.unknown_interface(name));
        }

        for neighbor in state.neighbors.remove_on_interface(name) {
            info!("[{}] Neighbor {} dropped with interface {}", self.id, neighbor.router_id, name);
        }
        Ok(state.regenerate())
    }

    /// Lists `peer` as reachable over `interface`.
    pub async fn attach_neighbor(&self, interface: &str, peer: &str) -> Result<Vec<Outbound>> {
        self.check_peer(peer)?;

        let mut state = self.state.lock().await;
        if !state.interfaces.contains(interface) {
            return Err(self.unknown_interface(interface));
        }
        // a peer short of adjacency changes nothing in the advertised record
        if state.interfaces.attach(interface, peer) && state.neighbors.is_adjacent(peer) {
            Ok(state.regenerate())
        } else {
            Ok(Vec::new())
        }
    }

    /// Forgets `peer` entirely: neighbor entry and interface membership.
    /// The local record is only re-flooded when the config asks for it.
    pub async fn detach_neighbor(&self, peer: &str) -> Vec<Outbound> {
        let mut state = self.state.lock().await;
        let removed = state.neighbors.remove_neighbor(peer).is_some();
        let detached = state.interfaces.detach(peer);
        if removed || detached {
            info!("[{}] Neighbor {} detached", self.id, peer);
        }

        if detached && self.config.reoriginate_on_neighbor_loss {
            state.regenerate()
        } else {
            Vec::new()
        }
    }

    /// Handles a hello from `peer` heard on `interface`.
    pub async fn receive_liveness(
        &self,
        peer: &str,
        interface: &str,
        level: Option<Level>,
    ) -> Result<(AdjacencyEvent, Vec<Outbound>)> {
        self.check_peer(peer)?;

        let mut state = self.state.lock().await;
        if !state.interfaces.contains(interface) {
            return Err(self.unknown_interface(interface));
        }

        let event = state.neighbors.receive_hello(peer, interface, level, Instant::now());
        let mut outbound = Vec::new();

        if let AdjacencyEvent::Established { .. } = event {
            // the exchange below already carries the new record to `peer`
            state.interfaces.attach(interface, peer);
            outbound.extend(state.regenerate_except(Some(peer)));
            let peer_id = peer.to_string();
            outbound.extend(exchange(&self.id, &peer_id, state.lsdb.records()));
        }

        Ok((event, outbound))
    }

    /// Handles a link-state record delivered by neighbor `from`.
    pub async fn receive_record(
        &self,
        record: LinkStateRecord,
        from: &str,
    ) -> Result<(Acceptance, Vec<Outbound>)> {
        if record.origin.is_empty() {
            return Err(RouterError::MissingIdentifier("record origin"));
        }
        if from.is_empty() {
            return Err(RouterError::MissingIdentifier("record sender"));
        }

        let (acceptance, outbound, table) = {
            let mut state = self.state.lock().await;

            if record.origin == self.id {
                let own = state.own_sequence();
                let outbound = if record.sequence > own {
                    info!(
                        "[{}] Saw own record with seq {} > {}, re-originating",
                        self.id, record.sequence, own
                    );
                    state.originate(record.sequence.saturating_add(1), None)
                } else {
                    Vec::new()
                };
                return Ok((Acceptance::SelfOriginated, outbound));
            }

            let acceptance = state.lsdb.accept(record.clone());
            if !acceptance.is_accepted() {
                return Ok((acceptance, Vec::new()));
            }

            match acceptance {
                Acceptance::Installed => info!(
                    "[{}] Received new record from {} via {}",
                    self.id, record.origin, from
                ),
                _ => info!(
                    "[{}] Updated record from {} (seq {})",
                    self.id, record.origin, record.sequence
                ),
            }

            let outbound = flood(&self.id, &record, &state.neighbors, Some(from));
            let outcome = state.run_spf();
            (acceptance, outbound, outcome.table().cloned())
        };

        if let Some(table) = table {
            self.notify(&table).await;
        }
        Ok((acceptance, outbound))
    }

    /// Recomputes the routing table from the current LSDB.
    pub async fn recompute_routes(&self) -> SpfOutcome {
        let outcome = {
            let mut state = self.state.lock().await;
            state.run_spf()
        };

        if let Some(table) = outcome.table() {
            self.notify(table).await;
        }
        outcome
    }

    /// One liveness-checker pass: drops neighbors past the dead interval.
    pub async fn expire_neighbors(&self) -> Vec<Outbound> {
        let mut state = self.state.lock().await;
        let dead = state
            .neighbors
            .check_dead_neighbors(Instant::now(), self.config.dead_interval());

        if dead.is_empty() || !self.config.reoriginate_on_neighbor_loss {
            return Vec::new();
        }

        let mut detached = false;
        for neighbor in &dead {
            detached |= state.interfaces.detach(&neighbor.router_id);
        }
        if detached { state.regenerate() } else { Vec::new() }
    }

    /// One hello toward every neighbor wired to a local interface.
    pub async fn hellos(&self) -> Vec<Outbound> {
        let state = self.state.lock().await;
        let level = self.protocol.level();
        state
            .interfaces
            .iter()
            .flat_map(|interface| interface.neighbors.iter())
            .map(|peer| Outbound::Hello {
                from: self.id.clone(),
                to: peer.clone(),
                level,
            })
            .collect()
    }

    pub async fn routing_table(&self) -> RoutingTable {
        self.state.lock().await.routing_table.clone()
    }

    pub async fn lsdb(&self) -> Lsdb {
        self.state.lock().await.lsdb.clone()
    }

    pub async fn neighbor_state(&self, peer: &str) -> Option<NeighborState> {
        let state = self.state.lock().await;
        state.neighbors.get_neighbor(peer).map(|n| n.state)
    }

    pub async fn neighbors(&self) -> Vec<NeighborSummary> {
        let state = self.state.lock().await;
        Self::summarize_neighbors(&state.neighbors)
    }

    pub async fn snapshot(&self) -> RouterSnapshot {
        let state = self.state.lock().await;
        RouterSnapshot {
            id: self.id.clone(),
            protocol: self.protocol,
            interfaces: state.interfaces.iter().cloned().collect(),
            neighbors: Self::summarize_neighbors(&state.neighbors),
            lsdb: state.lsdb.records().cloned().collect(),
            routing_table: state.routing_table.clone(),
        }
    }

    /// Starts the hello/liveness and SPF schedulers. Effects they produce
    /// (hellos, re-originated records) go to `outbox`. No-op when running.
    pub async fn start(&self, outbox: Option<mpsc::UnboundedSender<Outbound>>) -> bool {
        let mut tasks = self.tasks.lock().await;
        let started = tasks.start(self.clone(), outbox);
        if started {
            info!("[{}] {} router started", self.id, self.protocol);
        }
        started
    }

    /// Stops both schedulers and waits for them to finish. Safe to repeat.
    pub async fn stop(&self) {
        let handles = {
            let mut tasks = self.tasks.lock().await;
            tasks.shutdown()
        };
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("[{}] Scheduler task ended abnormally: {}", self.id, e);
            }
        }
        info!("[{}] {} router stopped", self.id, self.protocol);
    }

    pub async fn is_running(&self) -> bool {
        self.tasks.lock().await.is_running()
    }

    async fn notify(&self, table: &RoutingTable) {
        let observers = self.observers.read().await.clone();
        for observer in observers {
            observer.routes_updated(&self.id, table);
        }
    }

    fn summarize_neighbors(neighbors: &NeighborTable) -> Vec<NeighborSummary> {
        let now = Instant::now();
        neighbors
            .iter()
            .map(|n| NeighborSummary {
                router_id: n.router_id.clone(),
                state: n.state,
                interface: n.interface.clone(),
                level: n.level,
                since_last_hello: n.time_since_last_hello(now),
                first_seen: n.first_seen,
            })
            .collect()
    }

    fn check_peer(&self, peer: &str) -> Result<()> {
        if peer.is_empty() {
            return Err(RouterError::MissingIdentifier("neighbor id"));
        }
        if peer == self.id {
            return Err(RouterError::SelfAdjacency(self.id.clone()));
        }
        Ok(())
    }

    fn unknown_interface(&self, interface: &str) -> RouterError {
        RouterError::UnknownInterface {
            router: self.id.clone(),
            interface: interface.to_string(),
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn ospf(id: &str) -> Router {
        Router::new(id, Protocol::Ospf, RouterConfig::default()).unwrap()
    }

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    fn fast(id: &str) -> Router {
        let config = RouterConfig {
            hello_interval: 1,
            dead_interval: 3,
            spf_interval: 1,
            reoriginate_on_neighbor_loss: false,
        };
        Router::new(id, Protocol::Ospf, config).unwrap()
    }

    fn records_to<'a>(out: &'a [Outbound], to: &str) -> Vec<&'a LinkStateRecord> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Record { to: t, record, .. } if t == to => Some(record),
                _ => None,
            })
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        tables: StdMutex<Vec<RoutingTable>>,
    }

    impl RouteObserver for Recorder {
        fn routes_updated(&self, _router: &RouterId, table: &RoutingTable) {
            self.tables.lock().unwrap().push(table.clone());
        }
    }

    struct Faulty;

    impl RouteObserver for Faulty {
        fn routes_updated(&self, router: &RouterId, _table: &RoutingTable) {
            panic!("route push failed for {}", router);
        }
    }

    #[tokio::test]
    async fn new_router_holds_its_own_empty_record() {
        let a = ospf("a");
        let lsdb = a.lsdb().await;
        assert_eq!(lsdb.len(), 1);
        assert_eq!(lsdb.sequence_of("a"), Some(0));
        assert!(Router::new("", Protocol::Ospf, RouterConfig::default()).is_err());
    }

    #[tokio::test]
    async fn add_interface_bumps_own_sequence() {
        let a = ospf("a");
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();
        a.add_interface("eth0", net("10.0.0.1/24"), 20).await.unwrap();

        let lsdb = a.lsdb().await;
        let own = lsdb.get("a").unwrap();
        assert_eq!(own.sequence, 2);
        assert_eq!(own.links.len(), 1);
        assert_eq!(own.links[0].cost, 20);
    }

    #[tokio::test]
    async fn precondition_failures_do_not_mutate() {
        let a = ospf("a");
        assert_eq!(
            a.add_interface("eth0", net("10.0.0.1/24"), 0).await,
            Err(RouterError::InvalidCost { interface: "eth0".into(), cost: 0 })
        );
        assert!(matches!(
            a.receive_liveness("b", "eth9", None).await,
            Err(RouterError::UnknownInterface { .. })
        ));
        assert_eq!(
            a.receive_liveness("a", "eth0", None).await,
            Err(RouterError::SelfAdjacency("a".into()))
        );
        let nameless = LinkStateRecord::new(String::new(), 1, Vec::new());
        assert!(a.receive_record(nameless, "b").await.is_err());

        let snapshot = a.snapshot().await;
        assert!(snapshot.interfaces.is_empty());
        assert!(snapshot.neighbors.is_empty());
        assert_eq!(snapshot.lsdb.len(), 1);
        assert_eq!(snapshot.lsdb[0].sequence, 0);
    }

    #[tokio::test]
    async fn adjacency_triggers_full_exchange() {
        let a = ospf("a");
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();
        a.receive_record(LinkStateRecord::new("x".into(), 3, Vec::new()), "c")
            .await
            .unwrap();

        let (event, out) = a.receive_liveness("b", "eth0", None).await.unwrap();
        assert_eq!(event, AdjacencyEvent::Established { discovered: true });
        assert_eq!(a.neighbor_state("b").await, Some(NeighborState::Full));

        let sent = records_to(&out, "b");
        let origins: Vec<_> = sent.iter().map(|r| r.origin.as_str()).collect();
        assert_eq!(origins, vec!["a", "x"]);
        // the exchange carries the record that already lists b on eth0
        assert!(sent[0].adjacencies().any(|(n, _)| n == "b"));
    }

    #[tokio::test]
    async fn accepted_record_floods_to_adjacent_except_sender() {
        let a = ospf("a");
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();
        a.add_interface("eth1", net("10.0.1.1/24"), 10).await.unwrap();
        a.receive_liveness("b", "eth0", None).await.unwrap();
        a.receive_liveness("c", "eth1", None).await.unwrap();

        let record = LinkStateRecord::new("x".into(), 1, Vec::new());
        let (acceptance, out) = a.receive_record(record.clone(), "b").await.unwrap();
        assert_eq!(acceptance, Acceptance::Installed);
        assert_eq!(out.len(), 1);
        assert_eq!(records_to(&out, "c"), vec![&record]);

        let (acceptance, out) = a.receive_record(record, "c").await.unwrap();
        assert_eq!(acceptance, Acceptance::Stale { stored: 1 });
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn own_record_from_outside_is_outbid() {
        let a = ospf("a");
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();
        a.receive_liveness("b", "eth0", None).await.unwrap();
        let before = a.lsdb().await.get("a").cloned().unwrap();

        let echo = LinkStateRecord::new("a".into(), before.sequence, Vec::new());
        let (acceptance, out) = a.receive_record(echo, "b").await.unwrap();
        assert_eq!(acceptance, Acceptance::SelfOriginated);
        assert!(out.is_empty());
        assert_eq!(a.lsdb().await.get("a"), Some(&before));

        let forged = LinkStateRecord::new("a".into(), 50, Vec::new());
        let (_, out) = a.receive_record(forged, "b").await.unwrap();
        let own = a.lsdb().await.get("a").cloned().unwrap();
        assert_eq!(own.sequence, 51);
        assert_eq!(own.links, before.links);
        assert_eq!(records_to(&out, "b"), vec![&own]);
    }

    #[tokio::test]
    async fn observer_sees_each_computed_table() {
        let a = ospf("a");
        let recorder = Arc::new(Recorder::default());
        a.add_observer(recorder.clone()).await;

        assert!(matches!(a.recompute_routes().await, SpfOutcome::Skipped { origins: 1 }));
        assert!(recorder.tables.lock().unwrap().is_empty());

        a.receive_record(LinkStateRecord::new("x".into(), 0, Vec::new()), "b")
            .await
            .unwrap();
        assert_eq!(recorder.tables.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn hellos_follow_interface_membership() {
        let a = ospf("a");
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();
        a.add_interface("eth1", net("10.0.1.1/24"), 10).await.unwrap();
        a.attach_neighbor("eth0", "b").await.unwrap();
        a.attach_neighbor("eth1", "c").await.unwrap();

        let targets: Vec<_> = a.hellos().await.iter().map(|o| o.recipient().clone()).collect();
        assert_eq!(targets, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn remove_interface_drops_its_neighbors() {
        let a = ospf("a");
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();
        a.receive_liveness("b", "eth0", None).await.unwrap();

        a.remove_interface("eth0").await.unwrap();
        assert!(a.neighbors().await.is_empty());
        assert!(a.lsdb().await.get("a").unwrap().links.is_empty());
        assert!(a.remove_interface("eth0").await.is_err());
    }

    #[tokio::test]
    async fn stalled_peer_is_never_advertised() {
        let a = Router::new("a", Protocol::Isis { level: Level::L1 }, RouterConfig::isis()).unwrap();
        a.add_interface("eth0", net("10.0.0.1/24"), 10).await.unwrap();

        assert!(a.attach_neighbor("eth0", "b").await.unwrap().is_empty());
        let (event, out) = a.receive_liveness("b", "eth0", Some(Level::L2)).await.unwrap();
        assert!(matches!(event, AdjacencyEvent::Stalled { .. }));
        assert!(out.is_empty());

        let own = a.lsdb().await.get("a").cloned().unwrap();
        assert_eq!(own.sequence, 1);
        assert_eq!(own.adjacencies().count(), 0);

        // a compatible peer on the same segment is advertised alone
        a.receive_liveness("c", "eth0", Some(Level::L1)).await.unwrap();
        let own = a.lsdb().await.get("a").cloned().unwrap();
        let adj: Vec<_> = own.adjacencies().map(|(n, _)| n.as_str()).collect();
        assert_eq!(adj, vec!["c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_out_a_tick_blocked_on_state() {
        let a = fast("a");
        assert!(a.start(None).await);

        let guard = a.state.lock().await;
        // both schedulers are now parked inside a router call
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stopper = tokio::spawn({
            let a = a.clone();
            async move { a.stop().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!stopper.is_finished());
        assert!(!a.is_running().await);

        drop(guard);
        tokio::time::timeout(Duration::from_secs(5), stopper)
            .await
            .expect("stop did not complete")
            .unwrap();

        assert!(a.start(None).await);
        a.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_survives_a_panicked_scheduler() {
        let a = fast("a");
        a.receive_record(LinkStateRecord::new("x".into(), 0, Vec::new()), "b")
            .await
            .unwrap();
        a.add_observer(Arc::new(Faulty)).await;

        assert!(a.start(None).await);
        // the SPF task dies in the observer on its first tick
        tokio::time::sleep(Duration::from_secs(2)).await;

        tokio::time::timeout(Duration::from_secs(5), a.stop())
            .await
            .expect("stop did not complete");
        assert!(!a.is_running().await);
        assert_eq!(a.lsdb().await.len(), 2);
    }
}
