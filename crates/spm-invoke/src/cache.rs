//! Coalescing, TTL-bounded cache over the backend call gateway.
//!
//! Concurrent identical calls share one physical invocation; repeated reads
//! inside their TTL are served without touching the gateway; mutations clear
//! entries by command-name prefix. Failures are propagated verbatim to every
//! waiter and are never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::sync::Notify;

use crate::gateway::{CommandGateway, GatewayError};

/// Key derived deterministically from `(command, args)`.
///
/// Argument objects are canonicalized (keys sorted recursively) before
/// encoding, so structurally equal argument maps always share a key
/// regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    command: String,
    args: String,
}

impl CacheKey {
    pub fn encode(command: &str, args: Option<&Value>) -> Self {
        let canonical = args.map(canonicalize_json).unwrap_or(Value::Null);
        Self {
            command: command.to_string(),
            args: canonical.to_string(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

fn canonicalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, val) in pairs {
                out.insert(key.clone(), canonicalize_json(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_json).collect()),
        _ => value.clone(),
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// One in-flight call. Every caller for the key awaits the same flight; the
/// spawned call task settles it exactly once with the shared outcome.
struct Flight {
    notify: Notify,
    outcome: Mutex<Option<Result<Value, GatewayError>>>,
}

impl Flight {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            outcome: Mutex::new(None),
        }
    }

    fn settle(&self, outcome: Result<Value, GatewayError>) {
        *self.outcome.lock().expect("flight outcome lock poisoned") = Some(outcome);
        self.notify.notify_waiters();
    }

    fn settled(&self) -> Option<Result<Value, GatewayError>> {
        self.outcome
            .lock()
            .expect("flight outcome lock poisoned")
            .clone()
    }

    async fn join(&self) -> Result<Value, GatewayError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a settle between the check and the
            // await cannot be missed.
            notified.as_mut().enable();
            if let Some(outcome) = self.settled() {
                return outcome;
            }
            notified.await;
        }
    }
}

struct CacheInner<G> {
    gateway: G,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    flights: Mutex<HashMap<CacheKey, Arc<Flight>>>,
    stats: CacheCounters,
}

/// Request cache over a [`CommandGateway`].
///
/// Cheap to clone; clones share the same tables. Instantiate one per scope
/// under test, or use the application's composition-root instance.
pub struct RequestCache<G> {
    inner: Arc<CacheInner<G>>,
}

impl<G> Clone for RequestCache<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: CommandGateway> RequestCache<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                gateway,
                entries: Mutex::new(HashMap::new()),
                flights: Mutex::new(HashMap::new()),
                stats: CacheCounters::default(),
            }),
        }
    }

    /// Direct access to the gateway, for calls that must bypass coalescing
    /// (mutations are never deduplicated against each other).
    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    /// Invoke `command`, deduplicating against identical in-flight calls and
    /// serving fresh cached values when `ttl` is non-zero.
    ///
    /// A zero `ttl` means "never cache": the call still coalesces with
    /// identical concurrent calls but its result is not retained.
    pub async fn fetch(
        &self,
        command: &str,
        args: Option<Value>,
        ttl: Duration,
    ) -> Result<Value, GatewayError> {
        let key = CacheKey::encode(command, args.as_ref());

        if !ttl.is_zero() {
            if let Some(value) = self.lookup(&key) {
                self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(command, "request cache hit");
                return Ok(value);
            }
        }

        let (flight, joined) = self.enter_flight(&key);
        if joined {
            self.inner.stats.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(command, "joined in-flight call");
        } else {
            self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
            self.launch(key, command.to_string(), args, ttl, Arc::clone(&flight));
        }
        flight.join().await
    }

    /// Drop cached entries. `None` clears everything; `Some(prefix)` clears
    /// only entries whose command name starts with `prefix`. In-flight calls
    /// are left alone: a call started before the invalidating mutation
    /// completes normally and may repopulate the table.
    pub fn invalidate(&self, prefix: Option<&str>) {
        let mut entries = self.inner.entries.lock().expect("entry table lock poisoned");
        match prefix {
            None => {
                let dropped = entries.len();
                entries.clear();
                tracing::debug!(dropped, "request cache cleared");
            }
            Some(prefix) => {
                let before = entries.len();
                entries.retain(|key, _| !key.command().starts_with(prefix));
                let dropped = before - entries.len();
                tracing::debug!(prefix, dropped, "request cache invalidated by prefix");
            }
        }
        drop(entries);
        self.inner.stats.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RequestCacheStats {
        let stats = &self.inner.stats;
        RequestCacheStats {
            hits: stats.hits.load(Ordering::Relaxed),
            misses: stats.misses.load(Ordering::Relaxed),
            coalesced: stats.coalesced.load(Ordering::Relaxed),
            errors: stats.errors.load(Ordering::Relaxed),
            invalidations: stats.invalidations.load(Ordering::Relaxed),
            entries: self
                .inner
                .entries
                .lock()
                .expect("entry table lock poisoned")
                .len() as u64,
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.inner.entries.lock().expect("entry table lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                // Lazy eviction: an expired entry is absent.
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn enter_flight(&self, key: &CacheKey) -> (Arc<Flight>, bool) {
        let mut flights = self
            .inner
            .flights
            .lock()
            .expect("in-flight table lock poisoned");
        if let Some(flight) = flights.get(key) {
            (Arc::clone(flight), true)
        } else {
            let flight = Arc::new(Flight::new());
            flights.insert(key.clone(), Arc::clone(&flight));
            (flight, false)
        }
    }

    /// Run the physical call on its own task so it settles even if every
    /// awaiting caller has been dropped in the meantime.
    fn launch(
        &self,
        key: CacheKey,
        command: String,
        args: Option<Value>,
        ttl: Duration,
        flight: Arc<Flight>,
    ) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.gateway.invoke(&command, args).await;
            match &outcome {
                Ok(value) => {
                    if !ttl.is_zero() {
                        let mut entries =
                            inner.entries.lock().expect("entry table lock poisoned");
                        entries.insert(
                            key.clone(),
                            CacheEntry {
                                value: value.clone(),
                                expires_at: Instant::now() + ttl,
                            },
                        );
                    }
                }
                Err(err) => {
                    inner.stats.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(command = %command, error = %err, "backend call failed");
                }
            }
            inner
                .flights
                .lock()
                .expect("in-flight table lock poisoned")
                .remove(&key);
            flight.settle(outcome);
        });
    }
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    errors: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time snapshot of cache traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub errors: u64,
    pub invalidations: u64,
    pub entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_ignore_argument_insertion_order() {
        let a = json!({"plan_id": 3, "filter": {"status": "draft", "limit": 10}});
        let mut reversed = Map::new();
        reversed.insert(
            "filter".into(),
            json!({"limit": 10, "status": "draft"}),
        );
        reversed.insert("plan_id".into(), json!(3));
        let b = Value::Object(reversed);

        assert_eq!(
            CacheKey::encode("get_plan", Some(&a)),
            CacheKey::encode("get_plan", Some(&b))
        );
    }

    #[test]
    fn keys_distinguish_commands_and_args() {
        let base = CacheKey::encode("get_plan", Some(&json!({"id": 1})));
        assert_ne!(base, CacheKey::encode("get_plan", Some(&json!({"id": 2}))));
        assert_ne!(base, CacheKey::encode("get_plans", Some(&json!({"id": 1}))));
        assert_ne!(base, CacheKey::encode("get_plan", None));
    }

    #[test]
    fn absent_args_encode_as_null() {
        assert_eq!(
            CacheKey::encode("get_backups", None),
            CacheKey::encode("get_backups", Some(&Value::Null))
        );
    }

    #[test]
    fn canonicalization_recurses_into_arrays() {
        let a = json!([{"b": 1, "a": 2}]);
        let b = json!([{"a": 2, "b": 1}]);
        assert_eq!(canonicalize_json(&a), canonicalize_json(&b));
    }
}
