//! Execution-context pool: job scheduling, routing, fault recovery
//!
//! One coordinating task owns all pool state; N isolated context tasks run
//! jobs and communicate with the coordinator exclusively through messages.
//! A context is idle iff it has zero active tasks; the FIFO queue drains on
//! completion events (wake-on-release, no polling timer). A job-level error
//! affects only that job; a context-level fault rejects every pending job,
//! tears the pool down, and rebuilds it after a cool-down.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult, ServiceError, ServiceResult};
use crate::types::{
    CompressionResult, CompressionSettings, EngineConfig, MethodInfoFn, PoolStatus, ProgressFn,
};

/// Seam between the pool and the compression pipeline. Production wires in
/// the strategy; tests inject mocks to drive scheduling behavior.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(
        &self,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
    ) -> DomainResult<CompressionResult>;
}

/// Messages accepted by the pool coordinator.
pub enum PoolMessage {
    Submit {
        job_id: Uuid,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
        response: oneshot::Sender<ServiceResult<CompressionResult>>,
    },
    Cancel {
        job_id: Uuid,
        response: oneshot::Sender<bool>,
    },
    GetStatus {
        response: oneshot::Sender<PoolStatus>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
    /// Internal: cool-down elapsed, rebuild the contexts
    Rebuild,
    #[cfg(test)]
    InjectFault,
}

enum ContextCommand {
    Run {
        job_id: Uuid,
        bytes: Vec<u8>,
        settings: CompressionSettings,
    },
    Cancel {
        job_id: Uuid,
    },
}

enum ContextEvent {
    Progress {
        job_id: Uuid,
        pct: u8,
    },
    MethodInfo {
        job_id: Uuid,
        method: crate::types::CompressionMethod,
        codec_name: Option<String>,
    },
    Completed {
        context_id: usize,
        job_id: Uuid,
        result: DomainResult<CompressionResult>,
    },
    Fault {
        context_id: usize,
        reason: String,
    },
}

struct ContextHandle {
    id: usize,
    cmd_tx: mpsc::Sender<ContextCommand>,
    join: JoinHandle<()>,
}

struct PendingJob {
    response: oneshot::Sender<ServiceResult<CompressionResult>>,
    on_progress: Option<ProgressFn>,
    on_method_info: Option<MethodInfoFn>,
}

struct QueuedJob {
    job_id: Uuid,
    bytes: Vec<u8>,
    settings: CompressionSettings,
}

/// Coordinator for the execution-context pool.
pub struct PoolCoordinator {
    runner: Arc<dyn JobRunner>,
    config: EngineConfig,
    self_sender: mpsc::Sender<PoolMessage>,
    event_tx: mpsc::UnboundedSender<ContextEvent>,
    contexts: Vec<ContextHandle>,
    /// context id -> the single job it is running; absence means idle
    busy: HashMap<usize, Uuid>,
    pending: HashMap<Uuid, PendingJob>,
    queue: VecDeque<QueuedJob>,
    next_context_id: usize,
    cooling_down: bool,
}

impl PoolCoordinator {
    /// Spawn the coordinator task; returns its handle and the message sender.
    pub fn start(
        runner: Arc<dyn JobRunner>,
        config: EngineConfig,
    ) -> (JoinHandle<()>, mpsc::Sender<PoolMessage>) {
        let (sender, receiver) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let coordinator = PoolCoordinator {
            runner,
            config,
            self_sender: sender.clone(),
            event_tx,
            contexts: Vec::new(),
            busy: HashMap::new(),
            pending: HashMap::new(),
            queue: VecDeque::new(),
            next_context_id: 0,
            cooling_down: false,
        };

        let handle = tokio::spawn(coordinator.run(receiver, event_rx));
        (handle, sender)
    }

    fn pool_size(&self) -> usize {
        self.config
            .pool_size
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }

    async fn run(
        mut self,
        mut receiver: mpsc::Receiver<PoolMessage>,
        mut event_rx: mpsc::UnboundedReceiver<ContextEvent>,
    ) {
        let mut shutdown_response: Option<oneshot::Sender<()>> = None;

        log::info!("[POOL] Coordinator started (size {})", self.pool_size());

        loop {
            tokio::select! {
                message = receiver.recv() => {
                    match message {
                        Some(PoolMessage::Submit { job_id, bytes, settings, on_progress, on_method_info, response }) => {
                            self.handle_submit(job_id, bytes, settings, on_progress, on_method_info, response);
                        }
                        Some(PoolMessage::Cancel { job_id, response }) => {
                            let cancelled = self.handle_cancel(job_id);
                            let _ = response.send(cancelled);
                        }
                        Some(PoolMessage::GetStatus { response }) => {
                            let _ = response.send(PoolStatus {
                                contexts: self.contexts.len(),
                                busy_contexts: self.busy.len(),
                                queued_jobs: self.queue.len(),
                                pending_jobs: self.pending.len(),
                            });
                        }
                        Some(PoolMessage::Rebuild) => {
                            self.cooling_down = false;
                            self.spawn_contexts();
                            log::info!("[POOL] 🔄 Rebuilt {} contexts after fault", self.contexts.len());
                            self.dispatch();
                        }
                        #[cfg(test)]
                        Some(PoolMessage::InjectFault) => {
                            self.handle_fault("injected fault");
                        }
                        Some(PoolMessage::Shutdown { response }) => {
                            shutdown_response = Some(response);
                            break;
                        }
                        None => {
                            log::info!("[POOL] Message channel closed, shutting down");
                            break;
                        }
                    }
                }
                event = event_rx.recv() => {
                    // Contexts hold an event sender clone, so this arm stays live
                    if let Some(event) = event {
                        self.handle_event(event);
                    }
                }
            }
        }

        self.teardown();
        if let Some(response) = shutdown_response {
            let _ = response.send(());
        }
        log::info!("[POOL] Coordinator shut down");
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_submit(
        &mut self,
        job_id: Uuid,
        bytes: Vec<u8>,
        settings: CompressionSettings,
        on_progress: Option<ProgressFn>,
        on_method_info: Option<MethodInfoFn>,
        response: oneshot::Sender<ServiceResult<CompressionResult>>,
    ) {
        if self.pending.contains_key(&job_id) {
            let _ = response.send(Err(ServiceError::Configuration(format!(
                "job id {} already pending",
                job_id
            ))));
            return;
        }

        self.pending.insert(
            job_id,
            PendingJob {
                response,
                on_progress,
                on_method_info,
            },
        );
        self.queue.push_back(QueuedJob {
            job_id,
            bytes,
            settings,
        });

        // Contexts are created lazily on the first submission
        if self.contexts.is_empty() && !self.cooling_down {
            self.spawn_contexts();
            log::info!("[POOL] 🚀 Created {} execution contexts", self.contexts.len());
        }
        self.dispatch();
    }

    fn spawn_contexts(&mut self) {
        let size = self.pool_size();
        for _ in 0..size {
            let id = self.next_context_id;
            self.next_context_id += 1;

            let (cmd_tx, cmd_rx) = mpsc::channel(8);
            let runner = self.runner.clone();
            let event_tx = self.event_tx.clone();
            let timeout_secs = self.config.job_timeout_secs;
            let join = tokio::spawn(context_loop(id, cmd_rx, event_tx, runner, timeout_secs));

            self.contexts.push(ContextHandle { id, cmd_tx, join });
        }
    }

    /// Assign queue heads to idle contexts until one of them runs out.
    /// Assignment and the idle check happen on this single task, so two jobs
    /// can never land on the same context.
    fn dispatch(&mut self) {
        while !self.queue.is_empty() {
            let idle = self
                .contexts
                .iter()
                .find(|c| !self.busy.contains_key(&c.id))
                .map(|c| (c.id, c.cmd_tx.clone()));
            let Some((context_id, cmd_tx)) = idle else {
                return;
            };

            let job = match self.queue.pop_front() {
                Some(job) => job,
                None => return,
            };
            let job_id = job.job_id;

            if cmd_tx
                .try_send(ContextCommand::Run {
                    job_id,
                    bytes: job.bytes,
                    settings: job.settings,
                })
                .is_err()
            {
                // A context that stops receiving commands is dead
                self.handle_fault("context command channel closed");
                return;
            }

            self.busy.insert(context_id, job_id);
            log::debug!("[POOL] Job {} assigned to context {}", job_id, context_id);
        }
    }

    fn handle_event(&mut self, event: ContextEvent) {
        match event {
            ContextEvent::Progress { job_id, pct } => {
                if let Some(pending) = self.pending.get(&job_id) {
                    if let Some(sink) = &pending.on_progress {
                        sink(pct);
                    }
                }
            }
            ContextEvent::MethodInfo {
                job_id,
                method,
                codec_name,
            } => {
                if let Some(pending) = self.pending.get(&job_id) {
                    if let Some(sink) = &pending.on_method_info {
                        sink(method, codec_name.as_deref());
                    }
                }
            }
            ContextEvent::Completed {
                context_id,
                job_id,
                result,
            } => {
                self.busy.remove(&context_id);
                match self.pending.remove(&job_id) {
                    Some(pending) => {
                        let _ = pending.response.send(result.map_err(ServiceError::from));
                    }
                    None => {
                        // Late event for a cancelled or fault-rejected job
                        log::debug!("[POOL] Dropping completion for unknown job {}", job_id);
                    }
                }
                // A context just went idle: wake the queue
                self.dispatch();
            }
            ContextEvent::Fault { context_id, reason } => {
                log::error!("[POOL] ❌ Context {} faulted: {}", context_id, reason);
                self.handle_fault(&reason);
            }
        }
    }

    /// Context-level faults are pool-wide: reject everything pending (assigned
    /// or queued), tear all contexts down, rebuild after the cool-down.
    fn handle_fault(&mut self, reason: &str) {
        let error = ServiceError::Domain(DomainError::ContextFault(reason.to_string()));
        let rejected = self.pending.len();

        for (_, pending) in self.pending.drain() {
            let _ = pending.response.send(Err(error.clone()));
        }
        self.queue.clear();
        self.busy.clear();
        for context in self.contexts.drain(..) {
            context.join.abort();
        }

        log::warn!(
            "[POOL] Rejected {} pending jobs, rebuilding in {}ms",
            rejected,
            self.config.fault_cooldown_ms
        );

        self.cooling_down = true;
        let sender = self.self_sender.clone();
        let cooldown = Duration::from_millis(self.config.fault_cooldown_ms);
        tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let _ = sender.send(PoolMessage::Rebuild).await;
        });
    }

    fn handle_cancel(&mut self, job_id: Uuid) -> bool {
        // Queued but unassigned: reject directly
        if let Some(pos) = self.queue.iter().position(|j| j.job_id == job_id) {
            self.queue.remove(pos);
            if let Some(pending) = self.pending.remove(&job_id) {
                let _ = pending
                    .response
                    .send(Err(ServiceError::Domain(DomainError::Cancelled(job_id))));
            }
            log::info!("[POOL] Cancelled queued job {}", job_id);
            return true;
        }

        // Assigned: tell the owning context to abort it
        if let Some((&context_id, _)) = self.busy.iter().find(|(_, &id)| id == job_id) {
            if let Some(context) = self.contexts.iter().find(|c| c.id == context_id) {
                if context.cmd_tx.try_send(ContextCommand::Cancel { job_id }).is_ok() {
                    log::info!("[POOL] Cancelling job {} on context {}", job_id, context_id);
                    return true;
                }
            }
        }

        false
    }

    fn teardown(&mut self) {
        for context in self.contexts.drain(..) {
            context.join.abort();
        }
        // Dropping the responders resolves nothing further for callers
        self.pending.clear();
        self.queue.clear();
        self.busy.clear();
    }
}

/// One isolated execution context: runs a single job at a time, reports
/// everything back through the event channel. While a job runs, the loop
/// stays responsive to cancel commands; dropping the job future is what
/// actually stops the work, on cancel and on pool teardown alike.
async fn context_loop(
    context_id: usize,
    mut cmd_rx: mpsc::Receiver<ContextCommand>,
    event_tx: mpsc::UnboundedSender<ContextEvent>,
    runner: Arc<dyn JobRunner>,
    timeout_secs: u64,
) {
    loop {
        let cmd = match cmd_rx.recv().await {
            Some(cmd) => cmd,
            None => break,
        };
        let ContextCommand::Run {
            job_id,
            bytes,
            settings,
        } = cmd
        else {
            // Cancel with nothing running
            continue;
        };

        let work = run_job(
            runner.clone(),
            context_id,
            job_id,
            bytes,
            settings,
            timeout_secs,
            event_tx.clone(),
        );
        tokio::pin!(work);

        loop {
            tokio::select! {
                event = &mut work => {
                    let _ = event_tx.send(event);
                    break;
                }
                cmd = cmd_rx.recv() => match cmd {
                    Some(ContextCommand::Cancel { job_id: target }) if target == job_id => {
                        let _ = event_tx.send(ContextEvent::Completed {
                            context_id,
                            job_id,
                            result: Err(DomainError::Cancelled(job_id)),
                        });
                        break;
                    }
                    // The pool never assigns to a busy context
                    Some(_) => {}
                    None => return,
                }
            }
        }
    }
}

/// Execute one job under the per-job timeout, catching panics so a crashed
/// pipeline surfaces as a context fault instead of a silent hang.
async fn run_job(
    runner: Arc<dyn JobRunner>,
    context_id: usize,
    job_id: Uuid,
    bytes: Vec<u8>,
    settings: CompressionSettings,
    timeout_secs: u64,
    event_tx: mpsc::UnboundedSender<ContextEvent>,
) -> ContextEvent {
    let progress_tx = event_tx.clone();
    let on_progress: ProgressFn = Arc::new(move |pct| {
        let _ = progress_tx.send(ContextEvent::Progress { job_id, pct });
    });
    let method_tx = event_tx.clone();
    let on_method: MethodInfoFn = Arc::new(move |method, codec_name| {
        let _ = method_tx.send(ContextEvent::MethodInfo {
            job_id,
            method,
            codec_name: codec_name.map(String::from),
        });
    });

    let work = runner.run(bytes, settings, Some(on_progress), Some(on_method));
    let outcome = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        std::panic::AssertUnwindSafe(work).catch_unwind(),
    )
    .await;

    match outcome {
        Err(_) => ContextEvent::Completed {
            context_id,
            job_id,
            result: Err(DomainError::Timeout(timeout_secs)),
        },
        Ok(Err(panic)) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "context crashed".to_string());
            ContextEvent::Fault { context_id, reason }
        }
        Ok(Ok(result)) => ContextEvent::Completed {
            context_id,
            job_id,
            result,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompressionMethod, ImageFormat};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scheduling-focused mock: tracks concurrency and execution order,
    /// fails on empty input, sleeps to keep contexts busy.
    struct MockRunner {
        delay: Duration,
        running: AtomicUsize,
        max_seen: AtomicUsize,
        order: Mutex<Vec<Uuid>>,
        panic_on_empty: bool,
    }

    impl MockRunner {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                running: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
                order: Mutex::new(Vec::new()),
                panic_on_empty: false,
            }
        }

        fn dummy_result(len: usize) -> CompressionResult {
            CompressionResult {
                data: vec![0; len / 2],
                original_size: len as u64,
                compressed_size: (len / 2) as u64,
                width: 1,
                height: 1,
                method: CompressionMethod::Fallback,
                codec_name: None,
                output_format: ImageFormat::Jpeg,
                input_mime: None,
                size_increased: false,
                duration_ms: 0,
            }
        }
    }

    #[async_trait]
    impl JobRunner for MockRunner {
        async fn run(
            &self,
            bytes: Vec<u8>,
            settings: CompressionSettings,
            on_progress: Option<ProgressFn>,
            _on_method_info: Option<MethodInfoFn>,
        ) -> DomainResult<CompressionResult> {
            // First byte doubles as a job marker for ordering assertions
            self.order
                .lock()
                .unwrap()
                .push(Uuid::from_u128(bytes.first().copied().unwrap_or(0) as u128));

            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if let Some(sink) = on_progress {
                sink(100);
            }
            if bytes.is_empty() {
                if self.panic_on_empty {
                    panic!("simulated crash");
                }
                return Err(DomainError::Decode("empty input".to_string()));
            }
            let _ = settings;
            Ok(Self::dummy_result(bytes.len()))
        }
    }

    fn config(pool_size: usize, cooldown_ms: u64) -> EngineConfig {
        EngineConfig {
            pool_size: Some(pool_size),
            fault_cooldown_ms: cooldown_ms,
            ..Default::default()
        }
    }

    async fn submit(
        sender: &mpsc::Sender<PoolMessage>,
        bytes: Vec<u8>,
    ) -> oneshot::Receiver<ServiceResult<CompressionResult>> {
        let (tx, rx) = oneshot::channel();
        sender
            .send(PoolMessage::Submit {
                job_id: Uuid::new_v4(),
                bytes,
                settings: CompressionSettings::default(),
                on_progress: None,
                on_method_info: None,
                response: tx,
            })
            .await
            .unwrap();
        rx
    }

    #[tokio::test]
    async fn batch_settles_fully_with_bounded_concurrency() {
        let runner = Arc::new(MockRunner::new(Duration::from_millis(50)));
        let (_handle, sender) = PoolCoordinator::start(runner.clone(), config(2, 100));

        let mut receivers = Vec::new();
        for i in 0..5u8 {
            receivers.push(submit(&sender, vec![i + 1; 16]).await);
        }
        for rx in receivers {
            assert!(rx.await.unwrap().is_ok());
        }

        assert!(runner.max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn one_jobs_failure_leaves_siblings_untouched() {
        let runner = Arc::new(MockRunner::new(Duration::from_millis(20)));
        let (_handle, sender) = PoolCoordinator::start(runner, config(2, 100));

        let good_a = submit(&sender, vec![1; 8]).await;
        let bad = submit(&sender, Vec::new()).await;
        let good_b = submit(&sender, vec![2; 8]).await;

        assert!(good_a.await.unwrap().is_ok());
        let err = bad.await.unwrap().unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Decode(_))));
        assert!(good_b.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn dispatch_order_is_fifo() {
        let runner = Arc::new(MockRunner::new(Duration::from_millis(10)));
        let (_handle, sender) = PoolCoordinator::start(runner.clone(), config(1, 100));

        let mut receivers = Vec::new();
        for i in 1..=4u8 {
            receivers.push(submit(&sender, vec![i; 4]).await);
        }
        for rx in receivers {
            rx.await.unwrap().unwrap();
        }

        let order = runner.order.lock().unwrap();
        let markers: Vec<u128> = order.iter().map(|u| u.as_u128()).collect();
        assert_eq!(markers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn fault_rejects_all_pending_then_pool_recovers() {
        let runner = Arc::new(MockRunner::new(Duration::from_millis(500)));
        let (_handle, sender) = PoolCoordinator::start(runner, config(2, 50));

        // Two assigned, one queued
        let a = submit(&sender, vec![1; 8]).await;
        let b = submit(&sender, vec![2; 8]).await;
        let c = submit(&sender, vec![3; 8]).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        sender.send(PoolMessage::InjectFault).await.unwrap();

        for rx in [a, b, c] {
            let err = rx.await.unwrap().unwrap_err();
            assert!(
                matches!(err, ServiceError::Domain(DomainError::ContextFault(_))),
                "expected context fault, got {:?}",
                err
            );
        }

        // After the cool-down a fresh pool serves new jobs
        tokio::time::sleep(Duration::from_millis(120)).await;
        let d = submit(&sender, vec![4; 8]).await;
        assert!(d.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn context_crash_is_reported_as_fault() {
        let mut runner = MockRunner::new(Duration::from_millis(5));
        runner.panic_on_empty = true;
        let (_handle, sender) = PoolCoordinator::start(Arc::new(runner), config(1, 50));

        let crashed = submit(&sender, Vec::new()).await;
        let err = crashed.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::ContextFault(_))
        ));
    }

    #[tokio::test]
    async fn queued_job_can_be_cancelled() {
        let runner = Arc::new(MockRunner::new(Duration::from_millis(200)));
        let (_handle, sender) = PoolCoordinator::start(runner, config(1, 100));

        let _running = submit(&sender, vec![1; 8]).await;

        let queued_id = Uuid::new_v4();
        let (tx, queued_rx) = oneshot::channel();
        sender
            .send(PoolMessage::Submit {
                job_id: queued_id,
                bytes: vec![2; 8],
                settings: CompressionSettings::default(),
                on_progress: None,
                on_method_info: None,
                response: tx,
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        sender
            .send(PoolMessage::Cancel {
                job_id: queued_id,
                response: cancel_tx,
            })
            .await
            .unwrap();

        assert!(cancel_rx.await.unwrap());
        let err = queued_rx.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Cancelled(_))
        ));
    }

    #[tokio::test]
    async fn timeout_rejects_only_the_slow_job() {
        let runner = Arc::new(MockRunner::new(Duration::from_millis(1500)));
        let mut cfg = config(2, 100);
        cfg.job_timeout_secs = 1;
        let (_handle, sender) = PoolCoordinator::start(runner, cfg);

        let slow = submit(&sender, vec![1; 8]).await;
        let err = slow.await.unwrap().unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Timeout(1))));

        // Pool still healthy afterwards
        let (status_tx, status_rx) = oneshot::channel();
        sender
            .send(PoolMessage::GetStatus {
                response: status_tx,
            })
            .await
            .unwrap();
        let status = status_rx.await.unwrap();
        assert_eq!(status.pending_jobs, 0);
        assert_eq!(status.contexts, 2);
    }

    #[tokio::test]
    async fn shutdown_is_acknowledged_and_stops_the_pool() {
        let runner = Arc::new(MockRunner::new(Duration::ZERO));
        let (handle, sender) = PoolCoordinator::start(runner, config(2, 100));

        let (tx, rx) = oneshot::channel();
        sender
            .send(PoolMessage::Shutdown { response: tx })
            .await
            .unwrap();
        rx.await.unwrap();
        let _ = handle.await;

        // Further submissions fail fast: the channel is closed
        let (tx, _rx) = oneshot::channel();
        assert!(sender
            .send(PoolMessage::Submit {
                job_id: Uuid::new_v4(),
                bytes: vec![1],
                settings: CompressionSettings::default(),
                on_progress: None,
                on_method_info: None,
                response: tx,
            })
            .await
            .is_err());
    }
}
