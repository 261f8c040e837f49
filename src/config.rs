use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use anyhow::Result;
use ipnet::Ipv4Net;

use crate::RouterId;
use crate::protocol::Protocol;

/// Per-router timers and flooding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub hello_interval: u64,
    pub dead_interval: u64,
    pub spf_interval: u64,
    /// Re-originate and flood the local record when a neighbor is lost
    /// (liveness expiry or link down). Off by default: reachability then
    /// changes only on the next SPF run.
    pub reoriginate_on_neighbor_loss: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            hello_interval: 10,      // 10 seconds
            dead_interval: 40,       // 40 seconds
            spf_interval: 30,        // 30 seconds
            reoriginate_on_neighbor_loss: false,
        }
    }
}

impl RouterConfig {
    /// IS-IS defaults: same hello cadence, 30 second hold time.
    pub fn isis() -> Self {
        Self {
            dead_interval: 30,
            ..Self::default()
        }
    }

    pub fn hello_interval(&self) -> Duration {
        Duration::from_secs(self.hello_interval.max(1))
    }

    pub fn dead_interval(&self) -> Duration {
        Duration::from_secs(self.dead_interval)
    }

    pub fn spf_interval(&self) -> Duration {
        Duration::from_secs(self.spf_interval.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSpec {
    pub id: RouterId,
    #[serde(default)]
    pub protocol: Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: RouterId,
    pub b: RouterId,
    pub interface_a: String,
    pub interface_b: String,
    pub address_a: Ipv4Net,
    pub address_b: Ipv4Net,
    #[serde(default = "default_cost")]
    pub cost: u32,
}

fn default_cost() -> u32 {
    10
}

/// A whole simulated topology, as read from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub timers: RouterConfig,
    pub routers: Vec<RouterSpec>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl TopologyConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: TopologyConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Every link endpoint must name a declared router.
    pub fn validate(&self) -> Result<()> {
        for link in &self.links {
            for id in [&link.a, &link.b] {
                if !self.routers.iter().any(|r| &r.id == id) {
                    anyhow::bail!("link {} <-> {} references undeclared router {}", link.a, link.b, id);
                }
            }
            if link.cost == 0 {
                anyhow::bail!("link {} <-> {} has zero cost", link.a, link.b);
            }
        }
        Ok(())
    }

    pub fn get_router(&self, id: &str) -> Option<&RouterSpec> {
        self.routers.iter().find(|r| r.id == id)
    }
}
