//! Per-conversation ordered scheduling.
//!
//! Each conversation key gets its own worker task fed by an mpsc channel, so
//! updates for one chat+user are handled strictly in arrival order while
//! different conversations proceed concurrently. Intake never waits on a
//! worker: a full queue drops the update, and a worker that has been idle
//! for a while exits and removes itself from the map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::router::Router;
use crate::update::{ConversationKey, Update};

const WORKER_QUEUE_DEPTH: usize = 64;

/// How long a worker waits for its next update before exiting.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

type WorkerMap = Arc<Mutex<HashMap<ConversationKey, Worker>>>;

struct Worker {
    id: u64,
    tx: mpsc::Sender<Update>,
    handle: JoinHandle<()>,
}

pub struct ConversationScheduler {
    router: Arc<Router>,
    workers: WorkerMap,
    idle_timeout: Duration,
    next_id: AtomicU64,
}

impl ConversationScheduler {
    pub fn new(router: Arc<Router>) -> Self {
        Self::with_idle_timeout(router, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(router: Arc<Router>, idle_timeout: Duration) -> Self {
        Self {
            router,
            workers: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
            next_id: AtomicU64::new(0),
        }
    }

    /// Queue an update behind earlier updates of the same conversation.
    ///
    /// The map lock is only held for non-blocking channel operations, so a
    /// stalled conversation cannot hold up intake for the others.
    pub async fn submit(&self, update: Update) {
        let key = update.key;
        let mut workers = self.workers.lock().await;

        // A worker whose task has died is replaced.
        let update = match workers.get(&key) {
            Some(worker) => match worker.tx.try_send(update) {
                Ok(()) => return,
                Err(TrySendError::Full(update)) => {
                    warn!(
                        key = %key,
                        kind = update.kind_name(),
                        "Conversation queue full, dropping update"
                    );
                    return;
                }
                Err(TrySendError::Closed(update)) => {
                    warn!(key = %key, "Conversation worker gone, restarting it");
                    update
                }
            },
            None => update,
        };

        let worker = self.spawn_worker(key);
        if worker.tx.try_send(update).is_err() {
            warn!(key = %key, "Dropped update: new worker exited immediately");
        }
        workers.insert(key, worker);
    }

    fn spawn_worker(&self, key: ConversationKey) -> Worker {
        let (tx, mut rx) = mpsc::channel::<Update>(WORKER_QUEUE_DEPTH);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let router = self.router.clone();
        let workers = self.workers.clone();
        let idle_timeout = self.idle_timeout;

        let handle = tokio::spawn(async move {
            debug!(key = %key, "Conversation worker started");
            loop {
                let update = match tokio::time::timeout(idle_timeout, rx.recv()).await {
                    Ok(Some(update)) => update,
                    Ok(None) => break,
                    Err(_) => {
                        // Senders only push under this lock, so an empty
                        // queue here stays empty until the entry is gone.
                        let mut workers = workers.lock().await;
                        match rx.try_recv() {
                            Ok(update) => update,
                            Err(_) => {
                                if workers.get(&key).is_some_and(|w| w.id == id) {
                                    workers.remove(&key);
                                }
                                debug!(key = %key, "Conversation worker idle, exiting");
                                break;
                            }
                        }
                    }
                };
                router.dispatch(&update).await;
            }
            debug!(key = %key, "Conversation worker stopped");
        });
        Worker { id, tx, handle }
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Stop accepting updates and wait for every queued one to be handled.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self.workers.lock().await.drain().map(|(_, w)| w).collect();
        for worker in workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                warn!("Conversation worker panicked: {}", e);
            }
        }
    }
}
