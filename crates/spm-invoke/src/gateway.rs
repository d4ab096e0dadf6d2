//! Backend call gateway: the opaque asynchronous unit of work the cache
//! fronts. The service may fail, may be slow, and is billed per invocation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Failure reported by the backend for a single command invocation.
///
/// Cloneable so one physical failure can be handed to every coalesced
/// caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command `{command}` failed: {message}")]
pub struct GatewayError {
    pub command: String,
    pub message: String,
}

impl GatewayError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// A named-command backend reachable through a single async entry point.
#[async_trait]
pub trait CommandGateway: Send + Sync + 'static {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, GatewayError>;
}

fn default_port() -> u16 {
    std::env::var("SPM_SERVICE_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8090)
}

fn admin_token() -> Option<String> {
    std::env::var("SPM_ADMIN_TOKEN")
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Gateway talking to the local SPM service over HTTP.
///
/// Commands are posted to `/commands/{name}` with the JSON arguments as the
/// body; the admin token, when configured, rides along as a header.
pub struct HttpGateway {
    base: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(port: u16, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("http client");
        Self {
            base: format!("http://127.0.0.1:{}", port),
            token,
            client,
        }
    }

    /// Resolve port and token from `SPM_SERVICE_PORT` / `SPM_ADMIN_TOKEN`.
    pub fn from_env() -> Self {
        Self::new(default_port(), admin_token())
    }

    fn command_url(&self, command: &str) -> String {
        format!("{}/commands/{}", self.base, command)
    }
}

#[async_trait]
impl CommandGateway for HttpGateway {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, GatewayError> {
        let mut req = self
            .client
            .post(self.command_url(command))
            .json(&args.unwrap_or(Value::Null));
        if let Some(token) = &self.token {
            req = req.header("X-SPM-Admin", token);
        }
        let resp = req
            .send()
            .await
            .map_err(|err| GatewayError::new(command, err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                format!("service returned {}", status)
            } else {
                body
            };
            return Err(GatewayError::new(command, message));
        }
        resp.json::<Value>()
            .await
            .map_err(|err| GatewayError::new(command, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_command() {
        let err = GatewayError::new("get_plan", "boom");
        assert_eq!(err.to_string(), "command `get_plan` failed: boom");
    }

    #[test]
    fn command_url_is_rooted_at_the_service() {
        let gw = HttpGateway::new(9120, None);
        assert_eq!(
            gw.command_url("get_plans"),
            "http://127.0.0.1:9120/commands/get_plans"
        );
    }
}
