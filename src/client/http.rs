//! JSON-over-HTTP storage client.
//!
//! Operations are posted to `{client.host}/ops/{name}` with a body of
//! `{"service": ..., "params": {...}}`; the reply body is returned as JSON.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::runtime::Runtime;

use crate::config::{ConfigStore, KEY_CLIENT_HOST, KEY_CLIENT_SERVICE, KEY_CLIENT_TIMEOUT};
use crate::error::{ActivationError, ClientError};
use crate::invocation::RequestContext;

use super::{Activation, ClientActivator, ErrorReporter, ErrorStream, Operation, StorageClient};

const FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Activates [`HttpClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpActivator;

impl ClientActivator for HttpActivator {
    fn activate(
        &self,
        config: &ConfigStore,
        context: &RequestContext,
    ) -> Result<Activation, ActivationError> {
        let base = validate_host(&config.get_string(KEY_CLIENT_HOST))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ActivationError::Runtime)?;

        let mut refreshed = config.clone();
        refreshed.set(KEY_CLIENT_HOST, base.as_str());
        tracing::debug!(host = %base, run_async = context.run_async, "activated storage client");
        Ok(Activation {
            config: refreshed,
            context: context.clone(),
            errors: ErrorStream::new(Arc::new(runtime)),
        })
    }

    fn connect(
        &self,
        config: &ConfigStore,
        context: &RequestContext,
        errors: &ErrorStream,
    ) -> Result<Box<dyn StorageClient>, ActivationError> {
        let base = validate_host(&config.get_string(KEY_CLIENT_HOST))?;
        let timeout = config
            .get_duration(KEY_CLIENT_TIMEOUT)
            .unwrap_or(FALLBACK_TIMEOUT);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ActivationError::Client(e.into()))?;
        let service = config.get_string(KEY_CLIENT_SERVICE);
        Ok(Box::new(HttpClient {
            http,
            base,
            service: (!service.is_empty()).then_some(service),
            runtime: errors.runtime(),
            reporter: if context.run_async {
                errors.reporter()
            } else {
                None
            },
        }))
    }
}

/// Parse and check the configured service endpoint.
fn validate_host(raw: &str) -> Result<Url, ActivationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ActivationError::InvalidHost(
            "no storage service host configured; set client.host or pass --host".to_string(),
        ));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| ActivationError::InvalidHost(format!("`{trimmed}`: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ActivationError::InvalidHost(format!(
                "`{trimmed}`: unsupported scheme `{other}` (expected http or https)"
            )));
        }
    }
    if parsed.host_str().is_none() {
        return Err(ActivationError::InvalidHost(format!("`{trimmed}`: missing host")));
    }
    Ok(parsed)
}

/// Body posted for every operation.
#[derive(Debug, Serialize)]
struct OperationRequest<'a> {
    service: Option<&'a str>,
    params: &'a Map<String, Value>,
}

/// Storage client backed by `reqwest`.
pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
    service: Option<String>,
    runtime: Arc<Runtime>,
    /// Present when operations run asynchronously.
    reporter: Option<ErrorReporter>,
}

impl HttpClient {
    fn endpoint(&self, op: &Operation) -> Result<Url, ClientError> {
        self.base
            .join(&format!("ops/{}", op.name))
            .map_err(|err| ClientError::Request(format!("bad operation `{}`: {err}", op.name)))
    }
}

impl StorageClient for HttpClient {
    fn call(&self, op: Operation) -> Result<Value, ClientError> {
        let url = self.endpoint(&op)?;
        let body = OperationRequest {
            service: op.service.as_deref().or(self.service.as_deref()),
            params: &op.params,
        };
        let request = self.http.post(url).json(&body);

        if let Some(reporter) = &self.reporter {
            reporter.spawn(async move { send(request).await.map(|_| ()) });
            return Ok(json!({ "operation": op.name, "queued": true }));
        }
        self.runtime.block_on(send(request))
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<Value, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16(), text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|err| ClientError::Request(format!("invalid JSON reply: {err}")))
}
