use super::flooding::Outbound;
use crate::router::Router;
use log::{info, debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant};

/// Background schedulers of one router: hello/liveness and periodic SPF.
#[derive(Debug, Default)]
pub struct TaskManager {
    is_running: Arc<AtomicBool>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    handles: Vec<JoinHandle<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Spawns both tasks. Returns false when they are already running.
    pub fn start(&mut self, router: Router, outbox: Option<mpsc::UnboundedSender<Outbound>>) -> bool {
        if self.is_running() {
            return false;
        }
        self.is_running.store(true, Ordering::Relaxed);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let hello_handle = {
            let router = router.clone();
            let outbox = outbox.clone();
            let is_running = self.is_running.clone();
            let mut shutdown_rx = shutdown_rx.resubscribe();
            tokio::spawn(async move {
                hello_task(router, outbox, is_running, &mut shutdown_rx).await;
            })
        };

        let spf_handle = {
            let is_running = self.is_running.clone();
            let mut shutdown_rx = shutdown_rx;
            tokio::spawn(async move {
                spf_task(router, is_running, &mut shutdown_rx).await;
            })
        };

        self.handles.push(hello_handle);
        self.handles.push(spf_handle);
        self.shutdown_tx = Some(shutdown_tx);

        debug!("Router tasks started");
        true
    }

    /// Signals shutdown and hands back the handles for the caller to await.
    pub fn shutdown(&mut self) -> Vec<JoinHandle<()>> {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handles.drain(..).collect()
    }
}

async fn hello_task(
    router: Router,
    outbox: Option<mpsc::UnboundedSender<Outbound>>,
    is_running: Arc<AtomicBool>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    let mut interval = interval(router.config().hello_interval());

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] Hello task shutting down", router.id());
                break;
            }
            _ = interval.tick() => {
                if !is_running.load(Ordering::Relaxed) {
                    break;
                }

                let mut outbound = router.hellos().await;
                outbound.extend(router.expire_neighbors().await);
                forward(&router, outbox.as_ref(), outbound);
            }
        }
    }
}

async fn spf_task(
    router: Router,
    is_running: Arc<AtomicBool>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    let period = router.config().spf_interval();
    let mut interval = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("[{}] SPF task shutting down", router.id());
                break;
            }
            _ = interval.tick() => {
                if !is_running.load(Ordering::Relaxed) {
                    break;
                }

                router.recompute_routes().await;
            }
        }
    }
}

fn forward(router: &Router, outbox: Option<&mpsc::UnboundedSender<Outbound>>, outbound: Vec<Outbound>) {
    if outbound.is_empty() {
        return;
    }
    let Some(outbox) = outbox else {
        debug!("[{}] No outbox, dropping {} message(s)", router.id(), outbound.len());
        return;
    };

    for message in outbound {
        if outbox.send(message).is_err() {
            info!("[{}] Outbox closed, dropping scheduler output", router.id());
            break;
        }
    }
}
