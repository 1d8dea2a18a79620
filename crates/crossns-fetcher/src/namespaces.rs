//! Sources of the cluster's namespace set

use std::future::Future;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Namespace;
use kube::runtime::reflector::{self, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crossns_common::{Error, Result};

/// Yields the names of every namespace currently in the cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NamespaceLister: Send + Sync {
    /// Current namespace names
    async fn list(&self) -> Result<Vec<String>>;
}

/// A fixed namespace set
#[derive(Debug, Clone, Default)]
pub struct StaticNamespaceLister {
    namespaces: Vec<String>,
}

impl StaticNamespaceLister {
    /// Lister that always returns `namespaces`
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl NamespaceLister for StaticNamespaceLister {
    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.namespaces.clone())
    }
}

/// Namespace names served from a watch-backed reflector store
///
/// Once the watch driver exits the store is no longer kept current, and
/// `list` fails instead of serving the last snapshot.
#[derive(Clone)]
pub struct ReflectorNamespaceLister {
    store: Store<Namespace>,
    stopped: CancellationToken,
}

impl ReflectorNamespaceLister {
    /// Build a lister and the future that keeps its store current
    ///
    /// The returned future must be spawned; `list` waits until it has
    /// completed the initial sync. It runs until `cancel` fires.
    pub fn new(
        client: Client,
        cancel: CancellationToken,
    ) -> (Self, impl Future<Output = ()> + Send + 'static) {
        let api: Api<Namespace> = Api::all(client);
        let (store, writer) = reflector::store();
        let stream = watcher(api, watcher::Config::default())
            .default_backoff()
            .reflect(writer)
            .applied_objects();

        let stopped = CancellationToken::new();
        let driver = drive(stream, cancel, stopped.clone());

        (Self { store, stopped }, driver)
    }

    /// Serve names from an existing store kept current by the caller
    pub fn from_store(store: Store<Namespace>) -> Self {
        Self {
            store,
            stopped: CancellationToken::new(),
        }
    }

    /// Whether the watch driver has exited
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }
}

/// Poll the watch until it ends or `cancel` fires, then mark `stopped`
async fn drive<S, E>(stream: S, cancel: CancellationToken, stopped: CancellationToken)
where
    S: Stream<Item = std::result::Result<Namespace, E>>,
    E: std::fmt::Display,
{
    // also fires if the driver is dropped mid-poll
    let _stopped = stopped.drop_guard();
    tokio::pin!(stream);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Namespace watch cancelled");
                break;
            }
            event = stream.next() => match event {
                Some(Ok(_)) => {}
                Some(Err(e)) => warn!(error = %e, "Namespace watch error"),
                None => {
                    warn!("Namespace watch stream ended");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl NamespaceLister for ReflectorNamespaceLister {
    async fn list(&self) -> Result<Vec<String>> {
        tokio::select! {
            biased;
            _ = self.stopped.cancelled() => {
                return Err(Error::namespace_list("namespace watch stopped"));
            }
            ready = self.store.wait_until_ready() => {
                ready.map_err(|e| Error::namespace_list(e.to_string()))?;
            }
        }

        let mut names: Vec<String> = self
            .store
            .state()
            .iter()
            .filter_map(|ns| ns.metadata.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
