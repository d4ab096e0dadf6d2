//! Typed command surface over the SPM request cache.
//!
//! Each backend command family gets a thin, strongly-typed wrapper. Reads go
//! through the coalescing cache with a TTL tier matched to their volatility;
//! mutations call the gateway bare (mutations are never deduplicated) and
//! invalidate the cache before returning, so no later read observes state
//! from before the mutation.

use std::time::Duration;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use spm_invoke::{CommandGateway, GatewayError, HttpGateway, RequestCache};

pub mod config;
pub mod material;
pub mod schedule;
pub mod types;

/// Cache tiers for read commands, matched to how quickly the underlying
/// data churns.
pub mod ttl {
    use std::time::Duration;

    /// Volatile reads: schedule items, undo depth, operation logs.
    pub const SHORT: Duration = Duration::from_secs(3);
    /// Stable reads: plan detail, risk analysis, material stats.
    pub const NORMAL: Duration = Duration::from_secs(5);
    /// Near-static reads: plan lists, export templates, backups.
    pub const LONG: Duration = Duration::from_secs(10);
    /// Reads that must always hit the backend (still coalesced).
    pub const NONE: Duration = Duration::ZERO;
}

/// Failure surfaced by a typed command wrapper.
///
/// Gateway failures pass through verbatim; the only kind this layer adds is
/// a payload that does not deserialize into the declared type.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("command `{command}` returned an unexpected payload: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client for the SPM backend: one gateway, one request cache, and the typed
/// command families layered on top.
pub struct SpmClient<G> {
    cache: RequestCache<G>,
}

impl<G: CommandGateway> SpmClient<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            cache: RequestCache::new(gateway),
        }
    }

    pub fn cache(&self) -> &RequestCache<G> {
        &self.cache
    }

    pub fn schedule(&self) -> schedule::ScheduleApi<'_, G> {
        schedule::ScheduleApi { client: self }
    }

    pub fn materials(&self) -> material::MaterialApi<'_, G> {
        material::MaterialApi { client: self }
    }

    pub fn config(&self) -> config::ConfigApi<'_, G> {
        config::ConfigApi { client: self }
    }

    pub(crate) async fn read<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Option<Value>,
        ttl: Duration,
    ) -> Result<T, CommandError> {
        let value = self.cache.fetch(command, args, ttl).await?;
        decode(command, value)
    }

    /// Bare gateway call followed by a full cache clear.
    pub(crate) async fn mutate<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Option<Value>,
    ) -> Result<T, CommandError> {
        self.mutate_invalidating(command, args, &[]).await
    }

    /// Bare gateway call followed by invalidation of the given command-name
    /// prefixes; an empty list clears the whole cache.
    pub(crate) async fn mutate_invalidating<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Option<Value>,
        prefixes: &[&str],
    ) -> Result<T, CommandError> {
        let value = self.cache.gateway().invoke(command, args).await?;
        if prefixes.is_empty() {
            self.cache.invalidate(None);
        } else {
            for prefix in prefixes {
                self.cache.invalidate(Some(prefix));
            }
        }
        tracing::debug!(command, "mutation applied, cache invalidated");
        decode(command, value)
    }
}

fn decode<T: DeserializeOwned>(command: &str, value: Value) -> Result<T, CommandError> {
    serde_json::from_value(value).map_err(|source| CommandError::Decode {
        command: command.to_string(),
        source,
    })
}

/// The process-wide client. The core never owns a global; this is the
/// application's composition root.
pub fn default_client() -> &'static SpmClient<HttpGateway> {
    static CLIENT: Lazy<SpmClient<HttpGateway>> =
        Lazy::new(|| SpmClient::new(HttpGateway::from_env()));
    &CLIENT
}
