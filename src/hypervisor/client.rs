//! Typed HTTP facade over the hypervisor's API.
//!
//! A `reqwest::Client` builder wraps every call in a retry-with-backoff
//! loop around a generic request helper, classifying HTTP status codes
//! into component error variants. The retry policy is expressed with
//! the `backoff` crate's exponential builder.

use std::sync::Arc;
use std::time::Duration;

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::HypervisorConfiguration;

use super::errors::{HypervisorError, Result};
use super::types::{ConfigUpdate, LxcSpec, NodeStats, TaskHandle, TaskState, TemplateInfo};

const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;

pub struct HypervisorClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl HypervisorClient {
    pub fn new(config: &HypervisorConfiguration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| HypervisorError::HypervisorUnavailable(e.to_string()))?;

        let auth_header = match &config.token_id {
            Some(token_id) => format!("PVEAPIToken={}!{}={}", config.user, token_id, config.token),
            None => format!("PVEAPIToken={}={}", config.user, config.token),
        };

        Ok(Self {
            http,
            base_url: format!("https://{}:{}/api2/json", config.host, config.port),
            auth_header,
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> Result<T> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(BASE_RETRY_DELAY)
            .with_max_interval(MAX_RETRY_DELAY)
            .with_max_elapsed_time(Some(MAX_RETRY_DELAY * MAX_RETRIES))
            .build();

        let url = format!("{}{}", self.base_url, path);

        retry(policy, || async {
            let mut req = self
                .http
                .request(method.clone(), &url)
                .header("Authorization", &self.auth_header);
            if let Some(body) = body {
                req = req.json(body);
            }

            let response = req.send().await.map_err(|e| {
                backoff::Error::transient(HypervisorError::HypervisorUnavailable(e.to_string()))
            })?;

            self.classify_and_parse(response).await
        })
        .await
    }

    async fn classify_and_parse<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<T, backoff::Error<HypervisorError>> {
        let status = response.status();
        if status.is_success() {
            let body: ApiEnvelope<T> = response
                .json()
                .await
                .map_err(|e| backoff::Error::permanent(HypervisorError::HypervisorUnavailable(e.to_string())))?;
            return Ok(body.data);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());

        let err = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HypervisorError::AuthFailed(message),
            StatusCode::NOT_FOUND => HypervisorError::NotFound(message),
            StatusCode::CONFLICT => HypervisorError::ResourceConflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                HypervisorError::InvalidSpec(message)
            }
            s if s.is_server_error() => HypervisorError::HypervisorUnavailable(message),
            _ => HypervisorError::HypervisorUnavailable(message),
        };

        match err {
            HypervisorError::HypervisorUnavailable(_) => Err(backoff::Error::transient(err)),
            _ => Err(backoff::Error::permanent(err)),
        }
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeStats>> {
        self.request(Method::GET, "/nodes", None::<&()>).await
    }

    pub async fn node_stats(&self, node: &str) -> Result<NodeStats> {
        self.request(Method::GET, &format!("/nodes/{node}/status"), None::<&()>).await
    }

    pub async fn next_container_id(&self) -> Result<i64> {
        self.request(Method::GET, "/cluster/nextid", None::<&()>).await
    }

    pub async fn create_lxc(&self, spec: &LxcSpec) -> Result<TaskHandle> {
        self.request(Method::POST, &format!("/nodes/{}/lxc", spec.node), Some(spec)).await
    }

    pub async fn start(&self, node: &str, container_id: i64) -> Result<TaskHandle> {
        self.request(
            Method::POST,
            &format!("/nodes/{node}/lxc/{container_id}/status/start"),
            None::<&()>,
        )
        .await
    }

    pub async fn stop(&self, node: &str, container_id: i64) -> Result<TaskHandle> {
        self.request(
            Method::POST,
            &format!("/nodes/{node}/lxc/{container_id}/status/stop"),
            None::<&()>,
        )
        .await
    }

    pub async fn destroy(&self, node: &str, container_id: i64) -> Result<TaskHandle> {
        self.request(Method::DELETE, &format!("/nodes/{node}/lxc/{container_id}"), None::<&()>)
            .await
    }

    pub async fn clone_container(&self, node: &str, source_id: i64, new_id: i64, hostname: &str) -> Result<TaskHandle> {
        #[derive(Serialize)]
        struct CloneRequest<'a> {
            newid: i64,
            hostname: &'a str,
        }
        self.request(
            Method::POST,
            &format!("/nodes/{node}/lxc/{source_id}/clone"),
            Some(&CloneRequest { newid: new_id, hostname }),
        )
        .await
    }

    pub async fn resize_disk(&self, node: &str, container_id: i64, disk_gb: u64) -> Result<TaskHandle> {
        #[derive(Serialize)]
        struct ResizeRequest {
            size: String,
        }
        self.request(
            Method::PUT,
            &format!("/nodes/{node}/lxc/{container_id}/resize"),
            Some(&ResizeRequest { size: format!("{disk_gb}G") }),
        )
        .await
    }

    pub async fn update_config(&self, node: &str, container_id: i64, update: &ConfigUpdate) -> Result<()> {
        self.request(Method::PUT, &format!("/nodes/{node}/lxc/{container_id}/config"), Some(update))
            .await
    }

    pub async fn status(&self, node: &str, container_id: i64) -> Result<super::types::ContainerStatus> {
        self.request(
            Method::GET,
            &format!("/nodes/{node}/lxc/{container_id}/status/current"),
            None::<&()>,
        )
        .await
    }

    pub async fn list_templates(&self, node: &str) -> Result<Vec<TemplateInfo>> {
        self.request(Method::GET, &format!("/nodes/{node}/storage/local/content"), None::<&()>)
            .await
    }

    /// Polls a hypervisor task until terminal, backing off exponentially
    /// from 200ms up to a 2s cap, bounded by the caller's timeout.
    pub async fn wait_for_task(&self, task: &TaskHandle, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut delay = Duration::from_millis(200);
        const MAX_POLL_DELAY: Duration = Duration::from_secs(2);

        loop {
            let state: TaskState = self
                .request(
                    Method::GET,
                    &format!("/nodes/{}/tasks/{}/status", task.node, task.task_id),
                    None::<&()>,
                )
                .await?;

            match state {
                TaskState::Success => return Ok(()),
                TaskState::Failed(message) => {
                    return Err(HypervisorError::TaskFailed { task_id: task.task_id.clone(), message })
                }
                TaskState::Running => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(HypervisorError::TaskFailed {
                    task_id: task.task_id.clone(),
                    message: "timed out waiting for task".into(),
                });
            }

            tokio::time::sleep(delay.min(MAX_POLL_DELAY)).await;
            delay = (delay * 2).min(MAX_POLL_DELAY);
        }
    }
}

#[derive(serde::Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

pub type SharedHypervisorClient = Arc<HypervisorClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_header_uses_token_id_form_when_present() {
        let config = HypervisorConfiguration {
            host: "pve.example.com".into(),
            port: 8006,
            user: "root@pam".into(),
            token: "secret".into(),
            token_id: Some("proximity".into()),
            verify_tls: true,
            request_timeout_secs: 30,
        };
        let client = HypervisorClient::new(&config).unwrap();
        assert!(client.auth_header.contains("proximity=secret"));
        assert!(client.base_url.starts_with("https://pve.example.com:8006"));
    }
}
