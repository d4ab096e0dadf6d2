//! Test doubles for the crate's own tests and downstream consumers
//! (enable the `test-support` feature).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::gateway::{CommandGateway, GatewayError};

/// Gateway fake that counts invocations and replays scripted outcomes.
///
/// With an empty script, every call succeeds with an echo payload of the
/// command and arguments. An optional latency keeps calls in flight long
/// enough for coalescing tests to overlap them.
#[derive(Default)]
pub struct RecordingGateway {
    calls: AtomicUsize,
    invocations: Mutex<Vec<(String, Option<Value>)>>,
    script: Mutex<VecDeque<Result<Value, String>>>,
    latency: Mutex<Duration>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let gateway = Self::default();
        *gateway.latency.lock().unwrap() = latency;
        gateway
    }

    /// Queue a successful response for the next unscripted call.
    pub fn push_ok(&self, value: Value) {
        self.script.lock().unwrap().push_back(Ok(value));
    }

    /// Queue a failure for the next unscripted call.
    pub fn push_err(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Number of physical invocations observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<(String, Option<Value>)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandGateway for RecordingGateway {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations
            .lock()
            .unwrap()
            .push((command.to_string(), args.clone()));

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(GatewayError::new(command, message)),
            None => Ok(json!({ "command": command, "args": args })),
        }
    }
}
