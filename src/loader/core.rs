//! The async loader: worker pool, admission, and the delivery point.

use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::loader::config::LoaderConfig;
use crate::loader::queue::{AdmissionQueue, Submission};
use crate::loader::types::{Completion, Delivered, LoadDelegate, LoaderError, LoaderStats};

/// State shared between the consumer handle and the worker pool.
///
/// The queue/index, the generation tag, and the lifecycle flags all live under
/// one mutex, so admission, eviction, and generation bumps are linearizable
/// with respect to each other.
struct State<K, P, X, T, R> {
    queue: AdmissionQueue<K, P, X, T>,
    /// Monotonic tag; results stamped with an older value are discarded.
    generation: u64,
    paused: bool,
    stopped: bool,
    /// Workers started so far. Grows lazily, never shrinks.
    workers: usize,
    /// Prototype sender cloned for each spawned worker.
    tx: Sender<Completion<K, P, R>>,
    stats: LoaderStats,
}

struct Shared<K, P, X, T, D: LoadDelegate<K, P, X>> {
    state: Mutex<State<K, P, X, T, D::Output>>,
    /// Parks idle workers; signalled on submission, resume, and stop.
    work_available: Condvar,
    delegate: D,
    max_workers: usize,
}

/// Generic bounded-concurrency task loader with per-key coalescing.
///
/// `K` is the task key (identity), `P` the load parameter, `X` caller extra
/// context, `T` the consumer-side target a result is bound to, and `D` the
/// delegate whose [`load`](LoadDelegate::load) runs on worker threads.
///
/// The handle itself belongs to the single consumer context: submissions and
/// lifecycle calls may be made from it, and finished loads are collected with
/// [`drain`](Self::drain) / [`drain_timeout`](Self::drain_timeout) from that
/// same context. Workers never touch consumer-side state; they only send
/// results back over an internal channel.
///
/// Dropping the loader stops it; in-flight loads are not interrupted and wind
/// down on their own.
pub struct AsyncLoader<K, P, X, T, D>
where
    D: LoadDelegate<K, P, X>,
{
    shared: Arc<Shared<K, P, X, T, D>>,
    completions: Receiver<Completion<K, P, D::Output>>,
}

impl<K, P, X, T, D> AsyncLoader<K, P, X, T, D>
where
    K: Eq + Hash + Clone + Send + 'static,
    P: Clone + Send + 'static,
    X: Clone + Send + 'static,
    T: Send + 'static,
    D: LoadDelegate<K, P, X>,
{
    /// Create a loader from a validated configuration.
    ///
    /// No worker threads are started yet; they are spawned lazily as
    /// submissions arrive.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::InvalidConfig`] if the configuration is
    /// rejected by [`LoaderConfig::validate`].
    pub fn new(config: LoaderConfig, delegate: D) -> Result<Self, LoaderError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: AdmissionQueue::new(config.capacity),
                generation: 1,
                paused: false,
                stopped: false,
                workers: 0,
                tx,
                stats: LoaderStats::default(),
            }),
            work_available: Condvar::new(),
            delegate,
            max_workers: config.max_workers,
        });
        Ok(Self {
            shared,
            completions: rx,
        })
    }

    /// Submit a load request for `key`.
    ///
    /// If an entry for `key` is already tracked (queued or in flight), only
    /// its bound target/extra are updated and a queued entry moves to the
    /// front of the admission queue; no duplicate load is started. Otherwise
    /// a new entry is admitted at the front, dropping the least-recently-
    /// requested queued entry if the bound is exceeded.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Stopped`] once [`stop`](Self::stop) has been
    /// called.
    pub fn submit(&self, key: K, param: P, extra: X, target: T) -> Result<(), LoaderError> {
        let mut st = self.shared.state.lock().unwrap();
        if st.stopped {
            return Err(LoaderError::Stopped);
        }

        st.stats.total_requests += 1;
        match st.queue.submit(key, param, extra, target) {
            Submission::Coalesced => {
                st.stats.coalesced_requests += 1;
                trace!("submission coalesced onto existing task entry");
            }
            Submission::New { evicted } => {
                st.stats.new_requests += 1;
                if evicted.is_some() {
                    st.stats.evicted += 1;
                    debug!(
                        tracked = st.queue.tracked(),
                        "admission queue over capacity, dropped oldest pending entry"
                    );
                }
            }
        }

        if st.workers < self.shared.max_workers {
            st.workers += 1;
            let id = st.workers;
            let shared = Arc::clone(&self.shared);
            let tx = st.tx.clone();
            thread::Builder::new()
                .name(format!("loader-worker-{id}"))
                .spawn(move || worker_loop(shared, tx))
                .expect("failed to spawn loader worker thread");
            debug!(worker = id, "started loader worker");
        } else {
            self.shared.work_available.notify_one();
        }
        Ok(())
    }

    /// Discard all tracked tasks, queued and in flight.
    ///
    /// Bumps the generation tag and clears the queue/index. Running workers
    /// are not interrupted; their eventual results fail the tag check at the
    /// delivery point and are dropped. No-op once stopped.
    pub fn invalidate(&self) {
        let mut st = self.shared.state.lock().unwrap();
        if st.stopped {
            return;
        }
        st.generation += 1;
        st.queue.clear();
        st.stats.invalidations += 1;
        debug!(generation = st.generation, "loader invalidated");
    }

    /// Stop idle workers from picking up new work.
    ///
    /// In-flight loads are unaffected and submissions still queue (up to
    /// capacity). Idempotent; no-op once stopped.
    pub fn pause(&self) {
        let mut st = self.shared.state.lock().unwrap();
        if st.stopped || st.paused {
            return;
        }
        st.paused = true;
        debug!("loader paused");
    }

    /// Resume a paused loader, waking a worker to drain the backlog.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Stopped`] once [`stop`](Self::stop) has been
    /// called.
    pub fn resume(&self) -> Result<(), LoaderError> {
        let mut st = self.shared.state.lock().unwrap();
        if st.stopped {
            return Err(LoaderError::Stopped);
        }
        if st.paused {
            st.paused = false;
            self.shared.work_available.notify_one();
            debug!("loader resumed");
        }
        Ok(())
    }

    /// Terminate the loader permanently.
    ///
    /// Clears all tracked tasks and wakes every worker so it exits. In-flight
    /// loads are not interrupted; their results are discarded on arrival.
    /// Callers must tolerate a brief drain period while workers wind down.
    /// Idempotent.
    pub fn stop(&self) {
        let mut st = self.shared.state.lock().unwrap();
        if st.stopped {
            return;
        }
        st.stopped = true;
        st.queue.clear();
        self.shared.work_available.notify_all();
        debug!("loader stopped");
    }

    /// Drain every finished load currently queued for delivery.
    ///
    /// Must be called from the consumer context. Each honored result removes
    /// its task entry and is handed to `on_loaded` with the entry's current
    /// target/extra; results whose generation tag no longer matches, or whose
    /// entry was removed by invalidation, are dropped silently. Non-blocking.
    ///
    /// Returns the number of results honored.
    pub fn drain<F>(&self, mut on_loaded: F) -> usize
    where
        F: FnMut(Delivered<K, P, X, T, D::Output>),
    {
        let mut delivered = 0;
        while let Ok(msg) = self.completions.try_recv() {
            if let Some(d) = self.accept(msg) {
                on_loaded(d);
                delivered += 1;
            }
        }
        delivered
    }

    /// Like [`drain`](Self::drain), but blocks up to `timeout` for the first
    /// finished load before draining whatever else has arrived.
    pub fn drain_timeout<F>(&self, timeout: Duration, mut on_loaded: F) -> usize
    where
        F: FnMut(Delivered<K, P, X, T, D::Output>),
    {
        let mut delivered = 0;
        match self.completions.recv_timeout(timeout) {
            Ok(msg) => {
                if let Some(d) = self.accept(msg) {
                    on_loaded(d);
                    delivered += 1;
                }
            }
            Err(_) => return 0,
        }
        delivered + self.drain(&mut on_loaded)
    }

    /// Validate a finished load against the current generation and index.
    fn accept(
        &self,
        msg: Completion<K, P, D::Output>,
    ) -> Option<Delivered<K, P, X, T, D::Output>> {
        let mut st = self.shared.state.lock().unwrap();
        if st.stopped || msg.generation != st.generation {
            st.stats.stale_dropped += 1;
            trace!(
                stamped = msg.generation,
                current = st.generation,
                "dropped stale load result"
            );
            return None;
        }
        match st.queue.remove(&msg.key) {
            Some((extra, target)) => {
                st.stats.delivered += 1;
                Some(Delivered {
                    key: msg.key,
                    param: msg.param,
                    extra,
                    target,
                    result: msg.result,
                })
            }
            None => {
                st.stats.stale_dropped += 1;
                trace!("dropped result for untracked task entry");
                None
            }
        }
    }

    /// Number of queued (not yet taken) task entries.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().unwrap().queue.pending()
    }

    /// Number of tracked task entries, queued plus in flight.
    pub fn tracked(&self) -> usize {
        self.shared.state.lock().unwrap().queue.tracked()
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().unwrap().stopped
    }

    /// Snapshot of the loader counters.
    pub fn stats(&self) -> LoaderStats {
        self.shared.state.lock().unwrap().stats.clone()
    }
}

impl<K, P, X, T, D> Drop for AsyncLoader<K, P, X, T, D>
where
    D: LoadDelegate<K, P, X>,
{
    fn drop(&mut self) {
        let mut st = self.shared.state.lock().unwrap();
        if !st.stopped {
            st.stopped = true;
            st.queue.clear();
            self.shared.work_available.notify_all();
        }
    }
}

/// Worker thread body: take work, load, send the result back.
fn worker_loop<K, P, X, T, D>(
    shared: Arc<Shared<K, P, X, T, D>>,
    tx: Sender<Completion<K, P, D::Output>>,
) where
    K: Eq + Hash + Clone + Send + 'static,
    P: Clone + Send + 'static,
    X: Clone + Send + 'static,
    T: Send + 'static,
    D: LoadDelegate<K, P, X>,
{
    loop {
        let (key, param, extra, generation) = {
            let mut st = shared.state.lock().unwrap();
            loop {
                if st.stopped {
                    debug!("loader worker exiting");
                    return;
                }
                if !st.paused {
                    if let Some((key, param, extra)) = st.queue.take_front() {
                        // Hand off to a sibling if there is still work queued.
                        if st.queue.pending() > 0 {
                            shared.work_available.notify_one();
                        }
                        break (key, param, extra, st.generation);
                    }
                }
                st = shared.work_available.wait(st).unwrap();
            }
        };

        // The delegate runs outside the lock; a panic is isolated to this
        // load and surfaces as a negative result.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            shared.delegate.load(&key, &param, &extra)
        }))
        .unwrap_or_else(|_| {
            warn!("load delegate panicked, treating as negative result");
            None
        });

        if tx
            .send(Completion {
                key,
                param,
                result,
                generation,
            })
            .is_err()
        {
            // Consumer handle dropped; nothing left to deliver to.
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Instant;

    type TestLoader = AsyncLoader<String, String, u32, u32, TestDelegate>;

    /// Reusable open/closed latch for sequencing worker threads in tests.
    #[derive(Clone)]
    struct Gate(Arc<(Mutex<bool>, Condvar)>);

    impl Gate {
        fn new() -> Self {
            Gate(Arc::new((Mutex::new(false), Condvar::new())))
        }

        fn open(&self) {
            let (lock, cond) = &*self.0;
            *lock.lock().unwrap() = true;
            cond.notify_all();
        }

        fn wait(&self) {
            let (lock, cond) = &*self.0;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = cond.wait(open).unwrap();
            }
        }
    }

    #[derive(Default)]
    struct TestDelegate {
        /// Keys with a positive result; anything else loads as `None`.
        responses: HashMap<String, u32>,
        /// Every key the delegate was invoked for, in invocation order.
        calls: Arc<Mutex<Vec<String>>>,
        /// Opened as soon as a load for `slow_key` begins.
        entered: Option<Gate>,
        /// Loads for `slow_key` block on this until the test opens it.
        gate: Option<Gate>,
        /// Only loads for this key observe `entered`/`gate`.
        slow_key: Option<String>,
        /// Loads for this key panic.
        panic_on: Option<String>,
    }

    impl LoadDelegate<String, String, u32> for TestDelegate {
        type Output = u32;

        fn load(&self, key: &String, _param: &String, _extra: &u32) -> Option<u32> {
            self.calls.lock().unwrap().push(key.clone());
            if self.slow_key.as_ref() == Some(key) {
                if let Some(entered) = &self.entered {
                    entered.open();
                }
                if let Some(gate) = &self.gate {
                    gate.wait();
                }
            }
            if self.panic_on.as_ref() == Some(key) {
                panic!("boom");
            }
            self.responses.get(key).copied()
        }
    }

    fn loader(capacity: usize, workers: usize, delegate: TestDelegate) -> TestLoader {
        AsyncLoader::new(LoaderConfig::new(capacity, workers), delegate).unwrap()
    }

    /// Drain until `expect` results are honored or five seconds pass.
    fn drain_until(
        loader: &TestLoader,
        expect: usize,
        sink: &mut Vec<Delivered<String, String, u32, u32, u32>>,
    ) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut honored = 0;
        while honored < expect && Instant::now() < deadline {
            honored += loader.drain_timeout(Duration::from_millis(100), |d| sink.push(d));
        }
        honored
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn rejects_invalid_config() {
        let result = TestLoader::new(LoaderConfig::new(3, 3), TestDelegate::default());
        assert!(matches!(result, Err(LoaderError::InvalidConfig(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delivery
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn delivers_result_to_consumer() {
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 7)]),
            ..TestDelegate::default()
        };
        let loader = loader(8, 2, delegate);

        loader
            .submit("a".to_string(), "http://x/a".to_string(), 42, 11)
            .unwrap();

        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        let d = &out[0];
        assert_eq!(d.key, "a");
        assert_eq!(d.param, "http://x/a");
        assert_eq!(d.extra, 42);
        assert_eq!(d.target, 11);
        assert_eq!(d.result, Some(7));
        assert_eq!(loader.stats().delivered, 1);
        assert_eq!(loader.tracked(), 0, "delivery removes the task entry");
    }

    #[test]
    fn negative_result_is_a_valid_outcome() {
        let loader = loader(8, 2, TestDelegate::default());
        loader
            .submit("missing".to_string(), String::new(), 0, 1)
            .unwrap();

        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        assert_eq!(out[0].result, None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Coalescing
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn duplicate_submissions_coalesce_to_one_load() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 1), ("slow".to_string(), 2)]),
            calls: Arc::clone(&calls),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("slow".to_string()),
            ..TestDelegate::default()
        };
        // One worker, kept busy so "a" stays queued across both submissions.
        let loader = loader(8, 1, delegate);

        loader
            .submit("slow".to_string(), String::new(), 0, 1)
            .unwrap();
        entered.wait();
        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        loader.submit("a".to_string(), String::new(), 0, 2).unwrap();
        gate.open();

        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 2, &mut out), 2);

        let a_calls = calls.lock().unwrap().iter().filter(|k| *k == "a").count();
        assert_eq!(a_calls, 1, "coalesced submissions load exactly once");
        let a = out.iter().find(|d| d.key == "a").unwrap();
        assert_eq!(a.target, 2, "delivered to the most recently bound target");
        assert_eq!(loader.stats().coalesced_requests, 1);
    }

    #[test]
    fn rebind_while_in_flight_delivers_to_latest_target() {
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 5)]),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("a".to_string()),
            ..TestDelegate::default()
        };
        let loader = loader(8, 1, delegate);

        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        entered.wait();
        // "a" is in flight now; this rebinds rather than re-queueing.
        loader.submit("a".to_string(), String::new(), 9, 2).unwrap();
        gate.open();

        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        assert_eq!(out[0].target, 2);
        assert_eq!(out[0].extra, 9);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Capacity
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn overflow_drops_least_recently_requested() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            responses: HashMap::from([
                ("slow".to_string(), 0),
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 3),
            ]),
            calls: Arc::clone(&calls),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("slow".to_string()),
            ..TestDelegate::default()
        };
        let loader = loader(2, 1, delegate);

        loader
            .submit("slow".to_string(), String::new(), 0, 1)
            .unwrap();
        entered.wait();
        // "slow" is in flight; capacity 2 leaves room for one queued entry.
        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        loader.submit("b".to_string(), String::new(), 0, 1).unwrap(); // drops a
        loader.submit("c".to_string(), String::new(), 0, 1).unwrap(); // drops b
        gate.open();

        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 2, &mut out), 2);
        let keys: Vec<_> = out.iter().map(|d| d.key.as_str()).collect();
        assert!(keys.contains(&"slow"));
        assert!(keys.contains(&"c"));
        assert_eq!(loader.stats().evicted, 2);

        let recorded = calls.lock().unwrap();
        assert!(!recorded.contains(&"a".to_string()), "dropped entry never loads");
        assert!(!recorded.contains(&"b".to_string()), "dropped entry never loads");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invalidation
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn invalidate_discards_in_flight_result() {
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 1)]),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("a".to_string()),
            ..TestDelegate::default()
        };
        let loader = loader(8, 1, delegate);

        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        entered.wait();
        loader.invalidate();
        gate.open();

        let mut out = Vec::new();
        assert_eq!(
            loader.drain_timeout(Duration::from_millis(500), |d| out.push(d)),
            0,
            "pre-invalidation result must never reach the callback"
        );
        assert_eq!(loader.stats().stale_dropped, 1);

        // The loader stays usable after invalidation.
        loader.submit("a".to_string(), String::new(), 0, 2).unwrap();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        assert_eq!(out[0].target, 2);
    }

    #[test]
    fn invalidate_clears_backlog() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            calls: Arc::clone(&calls),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("slow".to_string()),
            ..TestDelegate::default()
        };
        let loader = loader(8, 1, delegate);

        loader
            .submit("slow".to_string(), String::new(), 0, 1)
            .unwrap();
        entered.wait();
        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        loader.submit("b".to_string(), String::new(), 0, 1).unwrap();
        loader.invalidate();
        gate.open();

        let mut out = Vec::new();
        assert_eq!(
            loader.drain_timeout(Duration::from_millis(500), |d| out.push(d)),
            0
        );
        let recorded = calls.lock().unwrap().clone();
        assert_eq!(recorded, vec!["slow".to_string()], "backlog never runs");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pause / resume
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn pause_defers_new_work_and_resume_drains_backlog() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]),
            calls: Arc::clone(&calls),
            ..TestDelegate::default()
        };
        let loader = loader(8, 2, delegate);

        loader.pause();
        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        loader.submit("b".to_string(), String::new(), 0, 1).unwrap();

        thread::sleep(Duration::from_millis(150));
        assert!(calls.lock().unwrap().is_empty(), "no work starts while paused");
        assert_eq!(loader.pending(), 2, "queue grows while paused");

        loader.resume().unwrap();
        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 2, &mut out), 2, "backlog drains without loss");
    }

    #[test]
    fn pause_does_not_affect_in_flight_work() {
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 1)]),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("a".to_string()),
            ..TestDelegate::default()
        };
        let loader = loader(8, 1, delegate);

        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        entered.wait();
        loader.pause();
        gate.open();

        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        assert_eq!(out[0].result, Some(1));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stop
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn submit_after_stop_fails() {
        let loader = loader(8, 2, TestDelegate::default());
        loader.stop();
        let result = loader.submit("a".to_string(), String::new(), 0, 1);
        assert!(matches!(result, Err(LoaderError::Stopped)));
        assert!(loader.is_stopped());
    }

    #[test]
    fn resume_after_stop_fails() {
        let loader = loader(8, 2, TestDelegate::default());
        loader.stop();
        assert!(matches!(loader.resume(), Err(LoaderError::Stopped)));
    }

    #[test]
    fn stop_pause_and_invalidate_are_idempotent_after_stop() {
        let loader = loader(8, 2, TestDelegate::default());
        loader.stop();
        loader.stop();
        loader.pause();
        loader.invalidate();
        assert!(loader.is_stopped());
        assert_eq!(loader.stats().invalidations, 0);
    }

    #[test]
    fn in_flight_result_is_dropped_after_stop() {
        let entered = Gate::new();
        let gate = Gate::new();
        let delegate = TestDelegate {
            responses: HashMap::from([("a".to_string(), 1)]),
            entered: Some(entered.clone()),
            gate: Some(gate.clone()),
            slow_key: Some("a".to_string()),
            ..TestDelegate::default()
        };
        let loader = loader(8, 1, delegate);

        loader.submit("a".to_string(), String::new(), 0, 1).unwrap();
        entered.wait();
        loader.stop();
        gate.open();

        let mut out = Vec::new();
        assert_eq!(
            loader.drain_timeout(Duration::from_millis(500), |d| out.push(d)),
            0
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Failure isolation
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn panicking_load_is_delivered_as_negative_and_worker_survives() {
        let delegate = TestDelegate {
            responses: HashMap::from([("ok".to_string(), 1)]),
            panic_on: Some("boom".to_string()),
            ..TestDelegate::default()
        };
        // Single worker: if the panic killed it, the second load would hang.
        let loader = loader(8, 1, delegate);

        loader
            .submit("boom".to_string(), String::new(), 0, 1)
            .unwrap();
        let mut out = Vec::new();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        assert_eq!(out[0].result, None);

        loader.submit("ok".to_string(), String::new(), 0, 2).unwrap();
        assert_eq!(drain_until(&loader, 1, &mut out), 1);
        assert_eq!(out[1].result, Some(1));
    }
}
