use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use log::info;

use crate::RouterId;
use crate::protocol::{Route, RoutingTable};
use crate::router::RouteObserver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelCommand {
    Replace(Route),
    Delete { prefix: String },
}

impl fmt::Display for KernelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelCommand::Replace(route) => write!(
                f,
                "ip route replace {} via {} dev {} metric {}",
                route.prefix(),
                route.next_hop,
                route.interface,
                route.cost
            ),
            KernelCommand::Delete { prefix } => write!(f, "ip route del {}", prefix),
        }
    }
}

#[derive(Debug, Default)]
struct Installed {
    routes: BTreeMap<RouterId, Route>,
    history: Vec<KernelCommand>,
}

/// Mirrors a router's table into the host forwarding table. Runs dry: the
/// `ip route` commands are logged and kept, never executed.
#[derive(Debug, Default)]
pub struct KernelRouteInstaller {
    state: Mutex<Installed>,
}

impl KernelRouteInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands needed to move the installed set to `table`.
    pub fn plan(installed: &BTreeMap<RouterId, Route>, table: &RoutingTable) -> Vec<KernelCommand> {
        let mut commands: Vec<KernelCommand> = installed
            .values()
            .filter(|route| !table.contains(&route.destination))
            .map(|route| KernelCommand::Delete { prefix: route.prefix() })
            .collect();

        commands.extend(
            table
                .iter()
                .filter(|route| installed.get(&route.destination) != Some(*route))
                .cloned()
                .map(KernelCommand::Replace),
        );
        commands
    }

    pub fn installed(&self) -> Vec<Route> {
        self.lock().routes.values().cloned().collect()
    }

    pub fn history(&self) -> Vec<KernelCommand> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Installed> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RouteObserver for KernelRouteInstaller {
    fn routes_updated(&self, router: &RouterId, table: &RoutingTable) {
        let mut state = self.lock();
        let commands = Self::plan(&state.routes, table);

        for command in &commands {
            info!("[{}] {}", router, command);
        }

        state.routes = table.iter().map(|r| (r.destination.clone(), r.clone())).collect();
        state.history.extend(commands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(dest: &str, via: &str, cost: u32) -> Route {
        Route {
            destination: dest.to_string(),
            next_hop: via.to_string(),
            cost,
            interface: format!("to-{}", via),
        }
    }

    #[test]
    fn installs_then_diffs() {
        let installer = KernelRouteInstaller::new();
        let router = "a".to_string();

        let first: RoutingTable = [route("b", "b", 10), route("c", "b", 20)].into_iter().collect();
        installer.routes_updated(&router, &first);
        assert_eq!(installer.history().len(), 2);

        // unchanged c, b withdrawn, d added
        let second: RoutingTable = [route("c", "b", 20), route("d", "c", 30)].into_iter().collect();
        installer.routes_updated(&router, &second);

        let history = installer.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], KernelCommand::Delete { prefix: "b/32".into() });
        assert_eq!(history[3].to_string(), "ip route replace d/32 via c dev to-c metric 30");
        assert_eq!(installer.installed().len(), 2);
    }

    #[test]
    fn changed_next_hop_is_replaced() {
        let mut installed = BTreeMap::new();
        installed.insert("d".to_string(), route("d", "d", 100));
        let table: RoutingTable = [route("d", "b", 30)].into_iter().collect();

        let plan = KernelRouteInstaller::plan(&installed, &table);
        assert_eq!(plan, vec![KernelCommand::Replace(route("d", "b", 30))]);
    }
}
