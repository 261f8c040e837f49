//! In-process fabric: owns routers, wires links between them and delivers
//! the messages they produce.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use ipnet::Ipv4Net;
use log::{info, warn, debug};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

use crate::{Result, RouterError, RouterId};
use crate::config::{LinkConfig, RouterConfig, TopologyConfig};
use crate::protocol::{Outbound, Protocol};
use crate::router::Router;

/// Both ends of a point-to-point link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub interface_a: String,
    pub address_a: Ipv4Net,
    pub interface_b: String,
    pub address_b: Ipv4Net,
    pub cost: u32,
}

impl From<&LinkConfig> for LinkSpec {
    fn from(link: &LinkConfig) -> Self {
        Self {
            interface_a: link.interface_a.clone(),
            address_a: link.address_a,
            interface_b: link.interface_b.clone(),
            address_b: link.address_b,
            cost: link.cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WiredLink {
    a: RouterId,
    interface_a: String,
    b: RouterId,
    interface_b: String,
}

impl WiredLink {
    fn joins(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    /// Interface on `receiver` facing `sender`.
    fn interface_of(&self, receiver: &str, sender: &str) -> Option<&str> {
        if self.a == receiver && self.b == sender {
            Some(&self.interface_a)
        } else if self.b == receiver && self.a == sender {
            Some(&self.interface_b)
        } else {
            None
        }
    }
}

struct Dispatcher {
    outbox: mpsc::UnboundedSender<Outbound>,
    handle: JoinHandle<()>,
}

#[derive(Clone, Default)]
pub struct Network {
    timers: Option<RouterConfig>,
    routers: Arc<RwLock<BTreeMap<RouterId, Router>>>,
    links: Arc<RwLock<Vec<WiredLink>>>,
    dispatcher: Arc<Mutex<Option<Dispatcher>>>,
}

impl Network {
    /// Routers get their protocol's default timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every router added gets `timers`, whatever its protocol.
    pub fn with_timers(timers: RouterConfig) -> Self {
        Self {
            timers: Some(timers),
            ..Self::default()
        }
    }

    /// Builds and pairs every router and link of a topology file.
    pub async fn from_config(config: &TopologyConfig) -> Result<Self> {
        let network = Self::with_timers(config.timers.clone());
        for spec in &config.routers {
            network.add_router(spec.id.clone(), spec.protocol).await?;
        }
        network.connect_links(&config.links).await?;
        Ok(network)
    }

    pub async fn add_router(&self, id: impl Into<RouterId>, protocol: Protocol) -> Result<Router> {
        let id = id.into();
        let config = match (&self.timers, protocol) {
            (Some(timers), _) => timers.clone(),
            (None, Protocol::Ospf) => RouterConfig::default(),
            (None, Protocol::Isis { .. }) => RouterConfig::isis(),
        };

        let mut routers = self.routers.write().await;
        if routers.contains_key(&id) {
            return Err(RouterError::DuplicateRouter(id));
        }
        let router = Router::new(id.clone(), protocol, config)?;
        routers.insert(id.clone(), router.clone());
        info!("Router {} ({}) added to network", id, protocol);
        Ok(router)
    }

    pub async fn router(&self, id: &str) -> Option<Router> {
        self.routers.read().await.get(id).cloned()
    }

    pub async fn routers(&self) -> Vec<Router> {
        self.routers.read().await.values().cloned().collect()
    }

    pub async fn connect_links(&self, links: &[LinkConfig]) -> Result<()> {
        for link in links {
            self.connect(&link.a, &link.b, LinkSpec::from(link)).await?;
        }
        Ok(())
    }

    /// Pairs two routers: an interface on each side, each listing the other
    /// as neighbor, then one hello each way. Everything this triggers is
    /// delivered before returning.
    pub async fn connect(&self, a: &str, b: &str, link: LinkSpec) -> Result<()> {
        if a == b {
            return Err(RouterError::SelfAdjacency(a.to_string()));
        }
        let (ra, rb) = self.pair(a, b).await?;
        if link.interface_a.is_empty() || link.interface_b.is_empty() {
            return Err(RouterError::MissingIdentifier("interface name"));
        }
        if link.cost == 0 {
            return Err(RouterError::InvalidCost { interface: link.interface_a, cost: 0 });
        }

        let mut outbound = ra.add_interface(&link.interface_a, link.address_a, link.cost).await?;
        outbound.extend(rb.add_interface(&link.interface_b, link.address_b, link.cost).await?);
        outbound.extend(ra.attach_neighbor(&link.interface_a, b).await?);
        outbound.extend(rb.attach_neighbor(&link.interface_b, a).await?);

        self.links.write().await.push(WiredLink {
            a: a.to_string(),
            interface_a: link.interface_a.clone(),
            b: b.to_string(),
            interface_b: link.interface_b.clone(),
        });
        info!(
            "Connected {} ({}) <-> {} ({}) cost {}",
            a, link.interface_a, b, link.interface_b, link.cost
        );

        let (_, out) = ra.receive_liveness(b, &link.interface_a, rb.protocol().level()).await?;
        outbound.extend(out);
        let (_, out) = rb.receive_liveness(a, &link.interface_b, ra.protocol().level()).await?;
        outbound.extend(out);

        self.dispatch(outbound).await;
        Ok(())
    }

    /// Takes down every link between `a` and `b`: both sides forget each other.
    pub async fn link_down(&self, a: &str, b: &str) -> Result<()> {
        let (ra, rb) = self.pair(a, b).await?;

        {
            let mut links = self.links.write().await;
            let before = links.len();
            links.retain(|link| !link.joins(a, b));
            if links.len() == before {
                return Err(RouterError::NotConnected(a.to_string(), b.to_string()));
            }
        }
        warn!("Link {} <-> {} is down", a, b);

        let mut outbound = ra.detach_neighbor(b).await;
        outbound.extend(rb.detach_neighbor(a).await);
        self.dispatch(outbound).await;
        Ok(())
    }

    /// Delivers messages breadth-first until no router produces more.
    /// Returns how many were handed to a router.
    pub async fn dispatch(&self, outbound: Vec<Outbound>) -> usize {
        let mut queue: VecDeque<Outbound> = outbound.into();
        let mut delivered = 0;

        while let Some(message) = queue.pop_front() {
            let Some(target) = self.router(message.recipient()).await else {
                debug!("Dropping message for unknown router {}", message.recipient());
                continue;
            };

            let result = match message {
                Outbound::Record { from, record, .. } => {
                    tracing::trace!(
                        from = %from,
                        to = %target.id(),
                        origin = %record.origin,
                        sequence = record.sequence,
                        "delivering record"
                    );
                    target
                        .receive_record(record, &from)
                        .await
                        .map(|(_, out)| out)
                }
                Outbound::Hello { from, to, level } => {
                    let Some(interface) = self.interface_toward(&to, &from).await else {
                        debug!("No link from {} to {}, hello dropped", from, to);
                        continue;
                    };
                    target
                        .receive_liveness(&from, &interface, level)
                        .await
                        .map(|(_, out)| out)
                }
            };

            match result {
                Ok(out) => {
                    delivered += 1;
                    queue.extend(out);
                }
                Err(e) => warn!("Delivery to {} failed: {}", target.id(), e),
            }
        }

        tracing::debug!(delivered, "dispatch queue drained");
        delivered
    }

    pub async fn recompute_all(&self) {
        for router in self.routers().await {
            router.recompute_routes().await;
        }
    }

    /// Starts every router's schedulers plus one task delivering what they emit.
    pub async fn start_all(&self) {
        let mut dispatcher = self.dispatcher.lock().await;
        if dispatcher.is_some() {
            return;
        }

        let (outbox, mut inbox) = mpsc::unbounded_channel::<Outbound>();
        let network = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                network.dispatch(vec![message]).await;
            }
            debug!("Network dispatcher shutting down");
        });

        for router in self.routers().await {
            router.start(Some(outbox.clone())).await;
        }
        *dispatcher = Some(Dispatcher { outbox, handle });
        info!("Network started");
    }

    /// Stops every router, then drains and stops the dispatcher. Safe to repeat.
    pub async fn stop_all(&self) {
        for router in self.routers().await {
            router.stop().await;
        }

        let Some(Dispatcher { outbox, mut handle }) = self.dispatcher.lock().await.take() else {
            return;
        };
        drop(outbox);
        if tokio::time::timeout(Duration::from_secs(1), &mut handle).await.is_err() {
            handle.abort();
        }
        info!("Network stopped");
    }

    async fn pair(&self, a: &str, b: &str) -> Result<(Router, Router)> {
        let routers = self.routers.read().await;
        let ra = routers
            .get(a)
            .cloned()
            .ok_or_else(|| RouterError::UnknownRouter(a.to_string()))?;
        let rb = routers
            .get(b)
            .cloned()
            .ok_or_else(|| RouterError::UnknownRouter(b.to_string()))?;
        Ok((ra, rb))
    }

    async fn interface_toward(&self, receiver: &str, sender: &str) -> Option<String> {
        let links = self.links.read().await;
        links
            .iter()
            .find_map(|link| link.interface_of(receiver, sender))
            .map(str::to_string)
    }
}
