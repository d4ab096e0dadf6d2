//! Background filter channel: keyword re-filtering of large row sets on a
//! dedicated worker, with last-submission-wins delivery.
//!
//! Each submission gets a strictly increasing task id. A completed result is
//! handed to the callback only if its id is still the latest issued at
//! delivery time; anything older is dropped silently, which makes completion
//! reordering harmless without interrupting the worker.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Row that can be tested against a lowercased, non-empty search needle.
///
/// Implementations decide the fixed field set the needle is matched against;
/// the match is expected to be a case-insensitive substring test.
pub trait KeywordMatch {
    fn matches_keyword(&self, needle: &str) -> bool;
}

type ResultCallback<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

struct FilterTask<T> {
    id: u64,
    rows: Vec<T>,
    keyword: String,
}

fn result_queue_cap() -> usize {
    std::env::var("SPM_FILTER_QUEUE_CAP")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(8)
}

fn apply_keyword<T: KeywordMatch>(rows: Vec<T>, keyword: &str) -> Vec<T> {
    if keyword.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| row.matches_keyword(keyword))
        .collect()
}

/// Offloads keyword filtering to a pool-of-one worker thread.
///
/// Results flow back over a bounded channel into a single delivery loop that
/// enforces the latest-id check before invoking the callback. When no worker
/// can be set up (no async runtime, thread spawn failure), the channel
/// degrades to synchronous in-line filtering with the same delivery rule.
pub struct FilterChannel<T> {
    latest: Arc<AtomicU64>,
    on_result: ResultCallback<T>,
    requests: Option<std_mpsc::Sender<FilterTask<T>>>,
    delivery: Option<JoinHandle<()>>,
}

impl<T> FilterChannel<T>
where
    T: KeywordMatch + Send + 'static,
{
    pub fn new<F>(on_result: F) -> Self
    where
        F: Fn(Vec<T>) + Send + Sync + 'static,
    {
        let latest = Arc::new(AtomicU64::new(0));
        let on_result: ResultCallback<T> = Arc::new(on_result);

        let (requests, delivery) = match Handle::try_current() {
            Ok(handle) => {
                match spawn_worker(Arc::clone(&latest), Arc::clone(&on_result), handle) {
                    Ok((requests, delivery)) => (Some(requests), Some(delivery)),
                    Err(err) => {
                        tracing::warn!(error = %err, "filter worker unavailable; filtering synchronously");
                        (None, None)
                    }
                }
            }
            Err(_) => {
                tracing::warn!("no async runtime; filtering synchronously");
                (None, None)
            }
        };

        Self {
            latest,
            on_result,
            requests,
            delivery,
        }
    }

    /// Issue a filter task over `rows`. The callback eventually receives the
    /// filtered rows, unless a newer submission supersedes this one first.
    ///
    /// An empty keyword is the identity: rows come back unchanged, in order.
    pub fn submit(&self, rows: Vec<T>, keyword: &str) {
        let id = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let task = FilterTask {
            id,
            rows,
            keyword: keyword.to_lowercase(),
        };

        let task = match &self.requests {
            Some(requests) => match requests.send(task) {
                Ok(()) => return,
                Err(std_mpsc::SendError(task)) => {
                    tracing::warn!("filter worker exited; filtering synchronously");
                    task
                }
            },
            None => task,
        };

        // Synchronous fallback. Reordering cannot occur here, but the
        // delivery rule is the same.
        let FilterTask { id, rows, keyword } = task;
        let filtered = apply_keyword(rows, &keyword);
        if id == self.latest.load(Ordering::Acquire) {
            (self.on_result)(filtered);
        }
    }

    /// Id of the most recently issued task.
    pub fn latest_task_id(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }
}

impl<T> FilterChannel<T> {
    /// Release the background resources. Any in-flight computation is
    /// abandoned without error; its result is never delivered.
    pub fn teardown(&mut self) {
        self.requests.take();
        if let Some(delivery) = self.delivery.take() {
            delivery.abort();
        }
    }
}

impl<T> Drop for FilterChannel<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn spawn_worker<T>(
    latest: Arc<AtomicU64>,
    on_result: ResultCallback<T>,
    handle: Handle,
) -> std::io::Result<(std_mpsc::Sender<FilterTask<T>>, JoinHandle<()>)>
where
    T: KeywordMatch + Send + 'static,
{
    let (request_tx, request_rx) = std_mpsc::channel::<FilterTask<T>>();
    let (result_tx, mut result_rx) = mpsc::channel::<(u64, Vec<T>)>(result_queue_cap());

    thread::Builder::new()
        .name("spm-filter".into())
        .spawn(move || {
            while let Ok(FilterTask { id, rows, keyword }) = request_rx.recv() {
                let filtered =
                    match std::panic::catch_unwind(AssertUnwindSafe(|| {
                        apply_keyword(rows, &keyword)
                    })) {
                        Ok(rows) => rows,
                        Err(_) => {
                            // Contained: a panicking predicate means "no
                            // result for this id", never a crashed caller.
                            tracing::warn!(id, "filter computation panicked; result dropped");
                            continue;
                        }
                    };
                if result_tx.blocking_send((id, filtered)).is_err() {
                    break;
                }
            }
        })?;

    let delivery = handle.spawn(async move {
        while let Some((id, rows)) = result_rx.recv().await {
            if id != latest.load(Ordering::Acquire) {
                tracing::trace!(id, "superseded filter result dropped");
                continue;
            }
            on_result(rows);
        }
    });

    Ok((request_tx, delivery))
}
