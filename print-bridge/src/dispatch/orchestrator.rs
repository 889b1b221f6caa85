//! Dispatch orchestrator

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use shared::PrinterRole;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{PrintJob, PrintTicket};
use crate::adapter::{PrintOutcome, PrinterAdapter};
use crate::config::{RetryPolicy, UnreachablePolicy};
use crate::error::{BridgeError, BridgeResult};
use crate::normalize::{Normalizer, RawReceipt};
use crate::transport::AgentResponse;

/// Lane state machine: `Idle → Sending → Idle | IdleWithError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneState {
    #[default]
    Idle,
    Sending,
    IdleWithError,
}

/// Observable lane snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LaneStatus {
    pub state: LaneState,
    /// Jobs waiting behind the one being sent
    pub queued: usize,
    /// Error of the last failed job
    pub last_error: Option<String>,
}

#[derive(Clone, Default)]
struct RoleAdapters {
    primary: Option<Arc<dyn PrinterAdapter>>,
    fallback: Option<Arc<dyn PrinterAdapter>>,
}

impl RoleAdapters {
    /// Adapter that addresses new jobs
    fn front(&self) -> Option<&Arc<dyn PrinterAdapter>> {
        self.primary.as_ref().or(self.fallback.as_ref())
    }
}

#[derive(Debug, Clone, Copy)]
struct LaneSettings {
    retry: RetryPolicy,
    policy: UnreachablePolicy,
    debug: bool,
}

struct QueuedJob {
    job: PrintJob,
    reply: oneshot::Sender<PrintOutcome>,
}

struct Lane {
    tx: mpsc::UnboundedSender<QueuedJob>,
    status: Arc<watch::Sender<LaneStatus>>,
    adapters: RoleAdapters,
}

/// Per-role FIFO dispatcher
pub struct DispatchOrchestrator {
    normalizer: Normalizer,
    lanes: HashMap<PrinterRole, Lane>,
    debug: bool,
    cancel: CancellationToken,
}

impl fmt::Debug for DispatchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchOrchestrator")
            .field("roles", &self.lanes.keys().collect::<Vec<_>>())
            .field("debug", &self.debug)
            .finish()
    }
}

/// Builder for [`DispatchOrchestrator`]
pub struct DispatchOrchestratorBuilder {
    normalizer: Normalizer,
    adapters: HashMap<PrinterRole, RoleAdapters>,
    settings: LaneSettings,
}

impl DispatchOrchestratorBuilder {
    pub fn adapter(mut self, role: PrinterRole, adapter: Arc<dyn PrinterAdapter>) -> Self {
        self.adapters.entry(role).or_default().primary = Some(adapter);
        self
    }

    /// Fallback for `role`: used when no primary exists, or when the
    /// primary is unreachable under [`UnreachablePolicy::FailOpen`]
    pub fn fallback(mut self, role: PrinterRole, adapter: Arc<dyn PrinterAdapter>) -> Self {
        self.adapters.entry(role).or_default().fallback = Some(adapter);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    pub fn unreachable_policy(mut self, policy: UnreachablePolicy) -> Self {
        self.settings.policy = policy;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.settings.debug = debug;
        self
    }

    /// Spawn one worker per configured role. Must run inside a tokio runtime.
    pub fn build(self) -> DispatchOrchestrator {
        let cancel = CancellationToken::new();
        let mut lanes = HashMap::new();

        for (role, adapters) in self.adapters {
            if adapters.front().is_none() {
                continue;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            let (status, _) = watch::channel(LaneStatus::default());
            let status = Arc::new(status);

            tokio::spawn(run_lane(
                role,
                rx,
                adapters.clone(),
                Arc::clone(&status),
                self.settings,
                cancel.clone(),
            ));
            lanes.insert(
                role,
                Lane {
                    tx,
                    status,
                    adapters,
                },
            );
        }

        DispatchOrchestrator {
            normalizer: self.normalizer,
            lanes,
            debug: self.settings.debug,
            cancel,
        }
    }
}

impl DispatchOrchestrator {
    pub fn builder(normalizer: Normalizer) -> DispatchOrchestratorBuilder {
        DispatchOrchestratorBuilder {
            normalizer,
            adapters: HashMap::new(),
            settings: LaneSettings {
                retry: RetryPolicy::default(),
                policy: UnreachablePolicy::default(),
                debug: false,
            },
        }
    }

    /// Normalize `receipt` and queue it for `role`.
    ///
    /// Fails before anything is queued when the receipt cannot be normalized
    /// or no printer serves the role. Jobs of one role complete in the order
    /// their `enqueue` calls returned.
    pub async fn enqueue(
        &self,
        role: PrinterRole,
        receipt: impl Into<RawReceipt>,
    ) -> BridgeResult<PrintTicket> {
        let payload = self.normalizer.normalize(receipt).await?;

        let lane = self
            .lanes
            .get(&role)
            .ok_or_else(|| BridgeError::NotConfigured(format!("no printer for the {role} role")))?;
        let adapter = lane
            .adapters
            .front()
            .ok_or_else(|| BridgeError::NotConfigured(format!("no printer for the {role} role")))?;

        let job = PrintJob::new(adapter.identity().clone(), payload, adapter.timeout());
        let job_id = job.id;
        let (reply, rx) = oneshot::channel();

        lane.status.send_modify(|s| s.queued += 1);
        if lane.tx.send(QueuedJob { job, reply }).is_err() {
            lane.status.send_modify(|s| s.queued = s.queued.saturating_sub(1));
            return Err(BridgeError::Cancelled);
        }
        debug!(%role, %job_id, "Print job queued");

        Ok(PrintTicket::new(job_id, role, rx, self.debug))
    }

    /// Enqueue and wait; every failure becomes an outcome
    pub async fn print(&self, role: PrinterRole, receipt: impl Into<RawReceipt>) -> PrintOutcome {
        match self.enqueue(role, receipt).await {
            Ok(ticket) => ticket.wait().await,
            Err(e) => PrintOutcome::failure(&e, self.debug),
        }
    }

    pub fn lane_state(&self, role: PrinterRole) -> Option<LaneStatus> {
        self.lanes.get(&role).map(|lane| lane.status.borrow().clone())
    }

    pub fn subscribe_lane(&self, role: PrinterRole) -> Option<watch::Receiver<LaneStatus>> {
        self.lanes.get(&role).map(|lane| lane.status.subscribe())
    }

    /// Adapter new jobs of `role` are addressed to
    pub fn adapter(&self, role: PrinterRole) -> Option<Arc<dyn PrinterAdapter>> {
        self.lanes
            .get(&role)
            .and_then(|lane| lane.adapters.front())
            .cloned()
    }

    pub fn roles(&self) -> Vec<PrinterRole> {
        let mut roles: Vec<_> = self.lanes.keys().copied().collect();
        roles.sort();
        roles
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Stop all lanes; queued and in-flight jobs resolve as cancelled
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn run_lane(
    role: PrinterRole,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    adapters: RoleAdapters,
    status: Arc<watch::Sender<LaneStatus>>,
    settings: LaneSettings,
    cancel: CancellationToken,
) {
    info!(%role, "Print lane started");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = rx.recv() => next,
        };
        let Some(QueuedJob { mut job, reply }) = next else {
            break;
        };

        status.send_modify(|s| {
            s.queued = s.queued.saturating_sub(1);
            s.state = LaneState::Sending;
        });

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
            result = process(&adapters, &mut job, &settings) => result,
        };

        let last_error = result.as_ref().err().map(ToString::to_string);
        match &last_error {
            None => debug!(%role, job_id = %job.id, attempts = job.attempts, "Print job done"),
            Some(error) => warn!(%role, job_id = %job.id, attempts = job.attempts, %error, "Print job failed"),
        }
        status.send_modify(|s| {
            s.state = if last_error.is_some() {
                LaneState::IdleWithError
            } else {
                LaneState::Idle
            };
            s.last_error = last_error;
        });

        if reply
            .send(PrintOutcome::from_result(result, settings.debug))
            .is_err()
        {
            debug!(%role, job_id = %job.id, "Caller dropped the ticket");
        }
    }

    info!(%role, "Print lane stopped");
}

async fn process(
    adapters: &RoleAdapters,
    job: &mut PrintJob,
    settings: &LaneSettings,
) -> BridgeResult<AgentResponse> {
    let Some(primary) = &adapters.primary else {
        let fallback = adapters
            .fallback
            .as_ref()
            .ok_or_else(|| BridgeError::NotConfigured("no adapter".into()))?;
        return attempt(fallback.as_ref(), job, settings.retry).await;
    };

    match attempt(primary.as_ref(), job, settings.retry).await {
        Err(e) if e.is_unreachable() && settings.policy == UnreachablePolicy::FailOpen => {
            let Some(fallback) = &adapters.fallback else {
                return Err(e);
            };
            warn!(
                job_id = %job.id,
                primary = primary.name(),
                fallback = fallback.name(),
                error = %e,
                "Primary printer unreachable, delegating to fallback"
            );
            let mut redirected = job.redirected(fallback.identity().clone(), fallback.timeout());
            let result = attempt(fallback.as_ref(), &mut redirected, settings.retry).await;
            job.attempts = redirected.attempts;
            result
        }
        other => other,
    }
}

/// Submit with timeout retries; the job keeps its lane slot throughout
async fn attempt(
    adapter: &dyn PrinterAdapter,
    job: &mut PrintJob,
    retry: RetryPolicy,
) -> BridgeResult<AgentResponse> {
    loop {
        job.attempts += 1;
        match adapter.submit(job).await {
            Err(e) if e.is_timeout() && job.attempts < retry.max_attempts => {
                warn!(job_id = %job.id, attempt = job.attempts, "Print timed out, retrying");
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::PrinterIdentity;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    enum Step {
        Ok,
        Fail(TransportError),
        Hang,
    }

    /// Scripted adapter recording what it was asked to print
    #[derive(Debug)]
    struct FakeAdapter {
        identity: PrinterIdentity,
        script: Mutex<VecDeque<Step>>,
        printed: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl FakeAdapter {
        fn new(role: PrinterRole, name: &str, script: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                identity: PrinterIdentity::new(role, name, "http://127.0.0.1:9060", None),
                script: Mutex::new(script.into()),
                printed: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: Duration::from_millis(5),
            })
        }

        fn printed(&self) -> Vec<String> {
            self.printed.lock().clone()
        }
    }

    #[async_trait]
    impl PrinterAdapter for FakeAdapter {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn identity(&self) -> &PrinterIdentity {
            &self.identity
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn submit(&self, job: &PrintJob) -> BridgeResult<AgentResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let text = String::from_utf8(job.payload.decoded().unwrap()).unwrap();
            self.printed.lock().push(text);
            let step = self.script.lock().pop_front().unwrap_or(Step::Ok);

            tokio::time::sleep(self.delay).await;
            let result = match step {
                Step::Ok => Ok(AgentResponse::default()),
                Step::Fail(e) => Err(e.into()),
                Step::Hang => std::future::pending().await,
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn is_reachable(&self) -> bool {
            true
        }
    }

    fn receipt(text: &str) -> RawReceipt {
        RawReceipt::Bytes(text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_fifo_order_with_failures() {
        let adapter = FakeAdapter::new(
            PrinterRole::Cashier,
            "EPSON",
            vec![
                Step::Ok,
                Step::Fail(TransportError::HttpStatus {
                    code: 500,
                    body: "jam".into(),
                }),
                Step::Ok,
                Step::Fail(TransportError::Rejected("paper out".into())),
                Step::Ok,
            ],
        );
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, adapter.clone())
            .build();

        let mut tickets = Vec::new();
        for i in 0..5 {
            tickets.push(
                orchestrator
                    .enqueue(PrinterRole::Cashier, receipt(&format!("job-{i}")))
                    .await
                    .unwrap(),
            );
        }

        let completed = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for (i, ticket) in tickets.into_iter().enumerate().rev() {
            let completed = completed.clone();
            handles.push(tokio::spawn(async move {
                let outcome = ticket.wait().await;
                completed.lock().push((i, outcome.successful));
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(
            adapter.printed(),
            vec!["job-0", "job-1", "job-2", "job-3", "job-4"]
        );
        let mut completed = completed.lock().clone();
        completed.sort();
        assert_eq!(
            completed,
            vec![(0, true), (1, false), (2, true), (3, false), (4, true)]
        );
        assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_outcomes_resolve_in_enqueue_order() {
        let adapter = FakeAdapter::new(PrinterRole::Kitchen, "K", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Kitchen, adapter.clone())
            .build();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..4 {
            let ticket = orchestrator
                .enqueue(PrinterRole::Kitchen, receipt(&format!("{i}")))
                .await
                .unwrap();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                ticket.wait().await;
                order.lock().push(i);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_hanging_kitchen_does_not_block_cashier() {
        let kitchen = FakeAdapter::new(PrinterRole::Kitchen, "K", vec![Step::Hang]);
        let cashier = FakeAdapter::new(PrinterRole::Cashier, "C", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Kitchen, kitchen.clone())
            .adapter(PrinterRole::Cashier, cashier.clone())
            .build();

        let stuck = orchestrator
            .enqueue(PrinterRole::Kitchen, receipt("kitchen"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            orchestrator.lane_state(PrinterRole::Kitchen).unwrap().state,
            LaneState::Sending
        );

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            orchestrator.print(PrinterRole::Cashier, receipt("cashier")),
        )
        .await
        .expect("cashier lane must not wait for kitchen");
        assert!(outcome.successful);

        orchestrator.shutdown();
        let cancelled = stuck.wait().await;
        assert_eq!(cancelled.kind, Some(FailureKind::Cancelled));
    }

    #[tokio::test]
    async fn test_unconfigured_role() {
        let cashier = FakeAdapter::new(PrinterRole::Cashier, "C", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, cashier)
            .build();

        let err = orchestrator
            .enqueue(PrinterRole::Kitchen, receipt("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotConfigured(_)));

        let outcome = orchestrator.print(PrinterRole::Kitchen, receipt("x")).await;
        assert!(!outcome.successful);
        assert_eq!(outcome.kind, Some(FailureKind::NotConfigured));
    }

    #[tokio::test]
    async fn test_normalize_failure_never_reaches_adapter() {
        let cashier = FakeAdapter::new(PrinterRole::Cashier, "C", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, cashier.clone())
            .build();

        let err = orchestrator
            .enqueue(PrinterRole::Cashier, "just some words")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedFormat(_)));
        assert!(cashier.printed().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_retried_in_place() {
        let cashier = FakeAdapter::new(
            PrinterRole::Cashier,
            "C",
            vec![Step::Fail(TransportError::Timeout(100)), Step::Ok],
        );
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, cashier.clone())
            .retry(RetryPolicy::new(2))
            .build();

        let first = orchestrator
            .enqueue(PrinterRole::Cashier, receipt("a"))
            .await
            .unwrap();
        let second = orchestrator
            .enqueue(PrinterRole::Cashier, receipt("b"))
            .await
            .unwrap();

        assert!(first.wait().await.successful);
        assert!(second.wait().await.successful);
        assert_eq!(cashier.printed(), vec!["a", "a", "b"]);
    }

    #[tokio::test]
    async fn test_timeout_without_retry_fails() {
        let cashier = FakeAdapter::new(
            PrinterRole::Cashier,
            "C",
            vec![Step::Fail(TransportError::Timeout(100))],
        );
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, cashier.clone())
            .build();

        let outcome = orchestrator.print(PrinterRole::Cashier, receipt("a")).await;
        assert!(!outcome.successful);
        assert_eq!(outcome.kind, Some(FailureKind::Timeout));
        assert_eq!(cashier.printed().len(), 1);
        let status = orchestrator.lane_state(PrinterRole::Cashier).unwrap();
        assert_eq!(status.state, LaneState::IdleWithError);
        assert!(status.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_fail_open_delegates_to_fallback() {
        let primary = FakeAdapter::new(
            PrinterRole::Cashier,
            "agent",
            vec![Step::Fail(TransportError::NotConnected)],
        );
        let fallback = FakeAdapter::new(PrinterRole::Cashier, "builtin", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, primary.clone())
            .fallback(PrinterRole::Cashier, fallback.clone())
            .unreachable_policy(UnreachablePolicy::FailOpen)
            .build();

        let outcome = orchestrator.print(PrinterRole::Cashier, receipt("r")).await;
        assert!(outcome.successful);
        assert_eq!(fallback.printed(), vec!["r"]);
    }

    #[tokio::test]
    async fn test_fail_closed_surfaces_unreachable() {
        let primary = FakeAdapter::new(
            PrinterRole::Cashier,
            "agent",
            vec![Step::Fail(TransportError::NotConnected)],
        );
        let fallback = FakeAdapter::new(PrinterRole::Cashier, "builtin", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .adapter(PrinterRole::Cashier, primary.clone())
            .fallback(PrinterRole::Cashier, fallback.clone())
            .build();

        let outcome = orchestrator.print(PrinterRole::Cashier, receipt("r")).await;
        assert!(!outcome.successful);
        assert_eq!(outcome.kind, Some(FailureKind::NotConnected));
        assert!(fallback.printed().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_only_role() {
        let fallback = FakeAdapter::new(PrinterRole::Kitchen, "builtin", vec![]);
        let orchestrator = DispatchOrchestrator::builder(Normalizer::new())
            .fallback(PrinterRole::Kitchen, fallback.clone())
            .build();

        assert!(orchestrator.print(PrinterRole::Kitchen, receipt("k")).await.successful);
        assert_eq!(orchestrator.roles(), vec![PrinterRole::Kitchen]);
    }
}
