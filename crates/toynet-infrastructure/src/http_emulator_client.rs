//! HTTP client for the emulator control API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toynet_core::config::EmulatorConfig;
use toynet_core::container::ContainerHandle;
use toynet_core::emulator::EmulatorClient;
use toynet_core::error::{Result, ToynetError};

#[derive(Serialize)]
struct TopologyBody<'a> {
    topology: &'a str,
}

#[derive(Serialize)]
struct CommandBody<'a> {
    command: &'a str,
}

#[derive(Serialize)]
struct TerminateBody {
    terminate: bool,
}

#[derive(Deserialize)]
struct CommandReply {
    output: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    message: String,
}

/// Talks JSON to `http://<container ip>:<api port>`.
///
/// Topology pushes get their own timeout: the emulator answers only after
/// the network was rebuilt, and giving up early would leave the instance
/// ahead of the store.
#[derive(Clone)]
pub struct HttpEmulatorClient {
    client: Client,
    port: u16,
    request_timeout: Duration,
    push_timeout: Option<Duration>,
}

impl HttpEmulatorClient {
    pub fn new(config: &EmulatorConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ToynetError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            port: config.api_port,
            request_timeout: config.request_timeout(),
            push_timeout: config.push_timeout(),
        })
    }

    fn url(&self, handle: &ContainerHandle, path: &str) -> Result<String> {
        let ip = handle.ip_address.as_deref().ok_or_else(|| {
            ToynetError::Unreachable(format!("container {} has no address yet", handle.name))
        })?;
        Ok(format!("http://{}:{}{}", ip, self.port, path))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        handle: &ContainerHandle,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let url = self.url(handle, path)?;
        let mut request = self.client.post(&url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ToynetError::Unreachable(format!("POST {}: {}", url, e)))?;
        ensure_success(response).await
    }
}

/// Turns a non-200 answer into a `Remote` error carrying its message.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ToynetError::remote(status.as_u16(), remote_message(&body)))
}

fn remote_message(body: &str) -> String {
    match serde_json::from_str::<ErrorReply>(body) {
        Ok(reply) => reply.message,
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl EmulatorClient for HttpEmulatorClient {
    async fn probe(&self, handle: &ContainerHandle) -> Result<u16> {
        let url = self.url(handle, "/")?;
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ToynetError::Unreachable(format!("GET {}: {}", url, e)))?;
        Ok(response.status().as_u16())
    }

    async fn push_topology(&self, handle: &ContainerHandle, topology: &str) -> Result<()> {
        self.post(handle, "/api/topo", &TopologyBody { topology }, self.push_timeout)
            .await?;
        tracing::debug!(container = %handle.name, "Pushed topology");
        Ok(())
    }

    async fn run_command(&self, handle: &ContainerHandle, command: &str) -> Result<String> {
        let response = self
            .post(
                handle,
                "/api/command",
                &CommandBody { command },
                Some(self.request_timeout),
            )
            .await?;
        let reply: CommandReply = response
            .json()
            .await
            .map_err(|e| ToynetError::remote(502, format!("invalid command reply: {}", e)))?;
        Ok(reply.output)
    }

    async fn terminate(&self, handle: &ContainerHandle) -> Result<()> {
        self.post(
            handle,
            "/api/terminate",
            &TerminateBody { terminate: true },
            Some(self.request_timeout),
        )
        .await?;
        Ok(())
    }
}
