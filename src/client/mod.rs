//! Boundary to the remote storage service.
//!
//! Commands talk to the service only through [`StorageClient`]; the lifecycle
//! obtains one from a [`ClientActivator`]. Activation also yields an
//! [`ErrorStream`] carrying failures of asynchronously issued operations,
//! which the runner drains before the process exits.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::config::ConfigStore;
use crate::error::{ActivationError, ClientError};
use crate::invocation::RequestContext;

mod http;

pub use http::{HttpActivator, HttpClient};

/// One named storage operation, e.g. `volume.ls` with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub service: Option<String>,
    pub params: Map<String, Value>,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: None,
            params: Map::new(),
        }
    }

    pub fn service(mut self, service: Option<String>) -> Self {
        self.service = service.filter(|s| !s.is_empty());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Connector to the storage service.
pub trait StorageClient {
    fn call(&self, op: Operation) -> Result<Value, ClientError>;
}

/// Outcome of a successful activation.
pub struct Activation {
    /// Configuration refreshed by the activator.
    pub config: ConfigStore,
    pub context: RequestContext,
    pub errors: ErrorStream,
}

/// Builds storage clients from the current configuration.
pub trait ClientActivator {
    fn activate(
        &self,
        config: &ConfigStore,
        context: &RequestContext,
    ) -> Result<Activation, ActivationError>;

    fn connect(
        &self,
        config: &ConfigStore,
        context: &RequestContext,
        errors: &ErrorStream,
    ) -> Result<Box<dyn StorageClient>, ActivationError>;
}

/// Receiving end of asynchronous client failures.
pub struct ErrorStream {
    runtime: Arc<Runtime>,
    tx: Option<mpsc::UnboundedSender<ClientError>>,
    rx: mpsc::UnboundedReceiver<ClientError>,
}

impl ErrorStream {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            tx: Some(tx),
            rx,
        }
    }

    pub fn runtime(&self) -> Arc<Runtime> {
        Arc::clone(&self.runtime)
    }

    /// Sending half for background work; `None` once draining has begun.
    pub fn reporter(&self) -> Option<ErrorReporter> {
        self.tx.as_ref().map(|tx| ErrorReporter {
            runtime: Arc::clone(&self.runtime),
            tx: tx.clone(),
        })
    }

    /// Stop accepting new reporters and wait for every outstanding one.
    ///
    /// Returns once all reporters (including those held by spawned tasks) are
    /// dropped. Callers must drop the client first.
    pub fn drain(mut self) -> Vec<ClientError> {
        self.tx = None;
        let rx = &mut self.rx;
        self.runtime.block_on(async move {
            let mut drained = Vec::new();
            while let Some(err) = rx.recv().await {
                tracing::error!(%err, "asynchronous storage operation failed");
                drained.push(err);
            }
            drained
        })
    }
}

/// Clonable handle that runs work in the background and reports its failure.
#[derive(Clone)]
pub struct ErrorReporter {
    runtime: Arc<Runtime>,
    tx: mpsc::UnboundedSender<ClientError>,
}

impl ErrorReporter {
    pub fn report(&self, err: ClientError) {
        // Receiver outlives every reporter, so a send error means the stream
        // was dropped without draining.
        if self.tx.send(err).is_err() {
            tracing::warn!("error stream closed before report");
        }
    }

    /// Spawn `work` on the client runtime; its error is reported on completion.
    pub fn spawn<F>(&self, work: F)
    where
        F: std::future::Future<Output = Result<(), ClientError>> + Send + 'static,
    {
        let reporter = self.clone();
        self.runtime.spawn(async move {
            if let Err(err) = work.await {
                reporter.report(err);
            }
        });
    }
}
