use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::{Result, RingError};
use crate::report::RingReport;
use crate::ring::Ring;
use crate::{NodeId, RingKey};

const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Commands processed by the ring worker, one at a time
#[derive(Debug)]
enum RingCommand<K> {
    InsertNode {
        node: NodeId,
        response_tx: oneshot::Sender<Result<()>>,
    },
    RemoveNode {
        node: NodeId,
        response_tx: oneshot::Sender<Result<()>>,
    },
    InsertKey {
        key: K,
        response_tx: oneshot::Sender<Result<NodeId>>,
    },
    RemoveKey {
        key: K,
        response_tx: oneshot::Sender<Result<NodeId>>,
    },
    Lookup {
        key: K,
        response_tx: oneshot::Sender<Result<NodeId>>,
    },
    Remap {
        key: K,
        node: NodeId,
        response_tx: oneshot::Sender<Result<()>>,
    },
    Report {
        response_tx: oneshot::Sender<RingReport>,
    },
    Shutdown,
}

/// Owns a [`Ring`] on a single task and applies commands in arrival order.
///
/// This is the serialization domain for concurrent callers: every operation
/// runs to completion on the worker before the next one starts.
pub struct RingWorker;

impl RingWorker {
    /// Spawns the worker task. Returns a cloneable handle and the task handle,
    /// which completes after `shutdown` or once every handle is dropped.
    pub fn spawn<K>(ring: Ring<K>) -> (RingHandle<K>, JoinHandle<Ring<K>>)
    where
        K: RingKey + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = tokio::spawn(Self::run(ring, command_rx));
        (RingHandle { command_tx }, handle)
    }

    async fn run<K: RingKey>(
        mut ring: Ring<K>,
        mut command_rx: mpsc::Receiver<RingCommand<K>>,
    ) -> Ring<K> {
        info!(nodes = ring.node_count(), "ring worker started");

        while let Some(command) = command_rx.recv().await {
            // A dropped response receiver only means the caller stopped waiting.
            let delivered = match command {
                RingCommand::InsertNode { node, response_tx } => {
                    response_tx.send(ring.insert_node(node)).is_ok()
                }
                RingCommand::RemoveNode { node, response_tx } => {
                    response_tx.send(ring.remove_node(node)).is_ok()
                }
                RingCommand::InsertKey { key, response_tx } => {
                    response_tx.send(ring.insert_key(key)).is_ok()
                }
                RingCommand::RemoveKey { key, response_tx } => {
                    response_tx.send(ring.remove_key(&key)).is_ok()
                }
                RingCommand::Lookup { key, response_tx } => {
                    response_tx.send(ring.lookup(&key)).is_ok()
                }
                RingCommand::Remap {
                    key,
                    node,
                    response_tx,
                } => response_tx.send(ring.remap(&key, node)).is_ok(),
                RingCommand::Report { response_tx } => response_tx.send(ring.report()).is_ok(),
                RingCommand::Shutdown => {
                    info!("ring worker shutting down");
                    break;
                }
            };

            if !delivered {
                warn!("ring worker response dropped, caller went away");
            }
        }

        info!(nodes = ring.node_count(), keys = ring.key_count(), "ring worker stopped");
        ring
    }
}

/// Cloneable front end of a [`RingWorker`].
#[derive(Debug)]
pub struct RingHandle<K> {
    command_tx: mpsc::Sender<RingCommand<K>>,
}

impl<K> Clone for RingHandle<K> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl<K: RingKey + Send + 'static> RingHandle<K> {
    pub async fn insert_node(&self, node: NodeId) -> Result<()> {
        self.request(|response_tx| RingCommand::InsertNode { node, response_tx })
            .await?
    }

    pub async fn remove_node(&self, node: NodeId) -> Result<()> {
        self.request(|response_tx| RingCommand::RemoveNode { node, response_tx })
            .await?
    }

    pub async fn insert_key(&self, key: K) -> Result<NodeId> {
        self.request(|response_tx| RingCommand::InsertKey { key, response_tx })
            .await?
    }

    pub async fn remove_key(&self, key: K) -> Result<NodeId> {
        self.request(|response_tx| RingCommand::RemoveKey { key, response_tx })
            .await?
    }

    pub async fn lookup(&self, key: K) -> Result<NodeId> {
        self.request(|response_tx| RingCommand::Lookup { key, response_tx })
            .await?
    }

    pub async fn remap(&self, key: K, node: NodeId) -> Result<()> {
        self.request(|response_tx| RingCommand::Remap {
            key,
            node,
            response_tx,
        })
        .await?
    }

    pub async fn report(&self) -> Result<RingReport> {
        self.request(|response_tx| RingCommand::Report { response_tx })
            .await
    }

    /// Asks the worker to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(RingCommand::Shutdown)
            .await
            .map_err(|_| RingError::WorkerUnavailable)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RingCommand<K>,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|_| RingError::WorkerUnavailable)?;
        response_rx.await.map_err(|_| RingError::WorkerUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RingConfig;

    fn ring() -> Ring<String> {
        Ring::new(RingConfig::new(0..3, 10, 2, 2)).unwrap()
    }

    #[tokio::test]
    async fn test_worker_applies_operations() {
        let (handle, join) = RingWorker::spawn(ring());

        let node = handle.insert_key("alpha".to_string()).await.unwrap();
        assert_eq!(handle.lookup("alpha".to_string()).await.unwrap(), node);

        handle.remap("alpha".to_string(), 2).await.unwrap();
        assert_eq!(handle.lookup("alpha".to_string()).await.unwrap(), 2);

        handle.insert_node(7).await.unwrap();
        let report = handle.report().await.unwrap();
        assert_eq!(report.total_keys, 1);
        assert_eq!(report.nodes.len(), 4);

        handle.shutdown().await.unwrap();
        let ring = join.await.unwrap();
        assert_eq!(ring.nodes(), &[0, 1, 2, 7]);
    }

    #[tokio::test]
    async fn test_worker_surfaces_ring_errors() {
        let (handle, _join) = RingWorker::spawn(ring());

        handle.insert_key("k".to_string()).await.unwrap();
        assert_eq!(
            handle.insert_key("k".to_string()).await,
            Err(RingError::DuplicateKey("\"k\"".to_string()))
        );
        assert_eq!(handle.insert_node(1).await, Err(RingError::NodeAlreadyExists(1)));
        assert_eq!(handle.remove_node(9).await, Err(RingError::NodeNotFound(9)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        let (handle, join) = RingWorker::spawn(ring());

        let mut tasks = Vec::new();
        for worker in 0..4 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..10 {
                    handle.insert_key(format!("w{}-{}", worker, i)).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let report = handle.report().await.unwrap();
        assert_eq!(report.total_keys, 40);
        assert_eq!(report.total_load(), 40);
        assert!(report.nodes.iter().all(|n| n.load <= 10));

        drop(handle);
        let ring = join.await.unwrap();
        assert_eq!(ring.key_count(), 40);
    }

    #[tokio::test]
    async fn test_stopped_worker_is_unavailable() {
        let (handle, join) = RingWorker::spawn(ring());
        handle.shutdown().await.unwrap();
        join.await.unwrap();

        assert_eq!(
            handle.insert_key("late".to_string()).await,
            Err(RingError::WorkerUnavailable)
        );
    }
}
