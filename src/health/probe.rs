//! Health probe implementations.

use async_trait::async_trait;
use axum::body::Body;
use hyper::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

/// Why a probe did not report the server healthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("invalid probe target: {0}")]
    InvalidTarget(String),

    #[error("probe task panicked: {0}")]
    Panicked(String),
}

/// A bounded reachability check against one server.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, address: &str, port: u16) -> Result<(), ProbeError>;

    fn name(&self) -> &'static str;
}

/// Which probe to build from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// `GET http://address:port{path}`, healthy on 2xx.
    #[default]
    Http,
    /// Healthy when a TCP connection can be opened.
    Tcp,
}

/// `host:port`, bracketing bare IPv6 literals.
fn authority(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]:{}", address, port)
    } else {
        format!("{}:{}", address, port)
    }
}

/// HTTP health checker.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            path: path.into(),
            timeout,
        }
    }

    pub fn url(&self, address: &str, port: u16) -> String {
        format!("http://{}{}", authority(address, port), self.path)
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, address: &str, port: u16) -> Result<(), ProbeError> {
        let url = self.url(address, port);
        let request = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("user-agent", "limeload-health-check")
            .body(Body::empty())
            .map_err(|e| ProbeError::InvalidTarget(format!("{}: {}", url, e)))?;

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(ProbeError::Status(response.status().as_u16())),
            Ok(Err(e)) => Err(ProbeError::Connect(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// TCP health checker.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self, address: &str, port: u16) -> Result<(), ProbeError> {
        let target = authority(address, port);
        match time::timeout(self.timeout, TcpStream::connect(&target)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Connect(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}
