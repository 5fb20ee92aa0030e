use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Application;

const SAVE_ENDPOINT: &str = "/api/save-application";
const LIST_ENDPOINT: &str = "/api/admin/applications";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{endpoint} timed out after {}ms", .timeout.as_millis())]
    Timeout { endpoint: String, timeout: Duration },

    #[error("network error calling {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} reported failure")]
    Rejected { endpoint: String },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("no remote store configured")]
    Disabled,
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Status { status: 404, .. })
    }

    /// The remote could not be reached at all. Anything else means it
    /// answered and refused this particular request.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout { .. } | GatewayError::Network { .. } | GatewayError::Disabled
        )
    }
}

/// Create/list/delete against the remote record store. Every call is bounded
/// by a timeout and never retried.
pub trait RemoteGateway: Send {
    /// Returns the id the remote assigned (or echoed).
    fn create(&self, app: &Application) -> Result<String, GatewayError>;
    fn list(&self) -> Result<Vec<Application>, GatewayError>;
    fn delete(&self, id: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default = "default_success")]
    success: bool,
}

fn default_success() -> bool {
    true
}

// --- HTTP gateway ---

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single entry point for every request. Non-2xx statuses are errors.
    pub fn call<T: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&T>,
    ) -> Result<Response, GatewayError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%method, %url, "remote call");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|e| self.transport_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn decode<T: DeserializeOwned>(&self, endpoint: &str, response: Response) -> Result<T, GatewayError> {
        response.json::<T>().map_err(|e| {
            if e.is_timeout() {
                self.transport_error(endpoint, e)
            } else {
                GatewayError::Decode {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn transport_error(&self, endpoint: &str, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: self.timeout,
            }
        } else {
            GatewayError::Network {
                endpoint: endpoint.to_string(),
                source: error,
            }
        }
    }
}

impl RemoteGateway for HttpGateway {
    fn create(&self, app: &Application) -> Result<String, GatewayError> {
        let response = self.call(Method::POST, SAVE_ENDPOINT, Some(app))?;
        let body: SaveResponse = self.decode(SAVE_ENDPOINT, response)?;
        if !body.success {
            return Err(GatewayError::Rejected {
                endpoint: SAVE_ENDPOINT.to_string(),
            });
        }
        let id = match body.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => app.id.clone(),
        };
        Ok(id)
    }

    fn list(&self) -> Result<Vec<Application>, GatewayError> {
        let response = self.call(Method::GET, LIST_ENDPOINT, None::<&()>)?;
        self.decode(LIST_ENDPOINT, response)
    }

    fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let endpoint = format!("{}/{}", LIST_ENDPOINT, id);
        let response = self.call(Method::DELETE, &endpoint, None::<&()>)?;
        // Some backends answer 204 with no body.
        let text = response.text().map_err(|e| self.transport_error(&endpoint, e))?;
        if text.trim().is_empty() {
            return Ok(());
        }
        let body: DeleteResponse = serde_json::from_str(&text).map_err(|e| GatewayError::Decode {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;
        if !body.success {
            return Err(GatewayError::Rejected { endpoint });
        }
        Ok(())
    }
}

// --- Local-only gateway ---

/// Used when no remote base URL is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGateway;

impl RemoteGateway for DisabledGateway {
    fn create(&self, _app: &Application) -> Result<String, GatewayError> {
        Err(GatewayError::Disabled)
    }

    fn list(&self) -> Result<Vec<Application>, GatewayError> {
        Err(GatewayError::Disabled)
    }

    fn delete(&self, _id: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Disabled)
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct FakeState {
        online: bool,
        records: Vec<Application>,
        refused: Vec<String>,
        creates: usize,
        deletes: usize,
        lists: usize,
    }

    /// In-memory remote store that can be switched off to simulate timeouts.
    /// Clones share state, so a test can keep a handle after boxing one.
    #[derive(Debug, Clone, Default)]
    pub struct FakeRemote {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeRemote {
        pub fn online() -> Self {
            let remote = Self::default();
            remote.set_online(true);
            remote
        }

        pub fn offline() -> Self {
            Self::default()
        }

        pub fn set_online(&self, online: bool) {
            self.state.lock().unwrap().online = online;
        }

        pub fn records(&self) -> Vec<Application> {
            self.state.lock().unwrap().records.clone()
        }

        pub fn seed(&self, records: Vec<Application>) {
            self.state.lock().unwrap().records = records;
        }

        pub fn creates(&self) -> usize {
            self.state.lock().unwrap().creates
        }

        pub fn deletes(&self) -> usize {
            self.state.lock().unwrap().deletes
        }

        pub fn lists(&self) -> usize {
            self.state.lock().unwrap().lists
        }

        /// Answer creates for this id with HTTP 500 while staying reachable.
        pub fn refuse(&self, id: &str) {
            self.state.lock().unwrap().refused.push(id.to_string());
        }

        pub fn accept_all(&self) {
            self.state.lock().unwrap().refused.clear();
        }

        fn unreachable(endpoint: &str) -> GatewayError {
            GatewayError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: Duration::from_millis(crate::config::DEFAULT_TIMEOUT_MS),
            }
        }
    }

    impl RemoteGateway for FakeRemote {
        fn create(&self, app: &Application) -> Result<String, GatewayError> {
            let mut state = self.state.lock().unwrap();
            if !state.online {
                return Err(Self::unreachable(SAVE_ENDPOINT));
            }
            if state.refused.contains(&app.id) {
                return Err(GatewayError::Status {
                    endpoint: SAVE_ENDPOINT.to_string(),
                    status: 500,
                });
            }
            state.creates += 1;
            // Upsert keyed by id.
            state.records.retain(|r| r.id != app.id);
            state.records.push(app.clone());
            Ok(app.id.clone())
        }

        fn list(&self) -> Result<Vec<Application>, GatewayError> {
            let mut state = self.state.lock().unwrap();
            if !state.online {
                return Err(Self::unreachable(LIST_ENDPOINT));
            }
            state.lists += 1;
            Ok(state.records.clone())
        }

        fn delete(&self, id: &str) -> Result<(), GatewayError> {
            let mut state = self.state.lock().unwrap();
            if !state.online {
                return Err(Self::unreachable(LIST_ENDPOINT));
            }
            state.deletes += 1;
            state.records.retain(|r| r.id != id);
            Ok(())
        }
    }
}
