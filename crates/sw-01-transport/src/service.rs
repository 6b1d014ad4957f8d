//! # Transport Service
//!
//! Owns the subprocess lifecycle and exposes `call` / `notify` to the layers
//! above. One [`Transport`] is one logical connection: it may spawn many
//! processes over its lifetime (one per generation) but never more than one
//! at a time.
//!
//! ## Concurrency
//!
//! - `ensure()` holds the async lifecycle lock across spawn and handshake, so
//!   concurrent first callers produce exactly one process.
//! - Calls on a ready connection never take the lifecycle lock; they go
//!   straight to the correlator and the outbound queue.
//! - The exit watcher fails pending calls before it takes the lifecycle lock,
//!   so a handshake blocked under the lock still sees its process die.

use crate::adapters::channel::{
    spawn_reader, spawn_stderr, spawn_writer, ChannelContext, OutboundFrame,
};
use crate::adapters::ProcessLauncher;
use crate::domain::{GenerationHandle, PendingCalls, PendingStats, TransportConfig, TransportState};
use crate::error::TransportError;
use crate::ports::{ExitReason, KillSwitch, Launcher};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::{json, Value};
use shared_bus::{
    EventFilter, EventStream, InMemoryEventBus, NotificationRouter, ProtocolEvent, Subscription,
};
use shared_types::framing::encode_line;
use shared_types::{
    methods, Implementation, InitializeParams, InitializeResult, Message, Notification, Request,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use sw_telemetry::metrics::{RPC_CALLS, RPC_DURATION, TRANSPORT_EXITS, TRANSPORT_SPAWNS};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

/// Handle to a managed subprocess. Cheap to clone.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    config: TransportConfig,
    launcher: Arc<dyn Launcher>,
    router: Arc<NotificationRouter>,
    pending: Arc<PendingCalls>,
    lifecycle: Mutex<Lifecycle>,
    /// Mirror of `Lifecycle::state` readable without awaiting.
    state: RwLock<TransportState>,
    generations: AtomicU64,
    handshakes: AtomicU64,
}

#[derive(Default)]
struct Lifecycle {
    live: Option<Connection>,
    server_info: Option<InitializeResult>,
}

/// The pieces of one generation a caller needs to talk to it.
#[derive(Clone)]
struct Connection {
    handle: Arc<GenerationHandle>,
    outbound: mpsc::Sender<OutboundFrame>,
    kill: KillSwitch,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(conn) = &self.lifecycle.get_mut().live {
            conn.kill.fire();
        }
    }
}

impl Transport {
    /// Create a transport. Nothing is spawned until the first `ensure()`.
    pub fn new(
        config: TransportConfig,
        launcher: Arc<dyn Launcher>,
        router: Arc<NotificationRouter>,
    ) -> Result<Self, TransportError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                launcher,
                router,
                pending: Arc::new(PendingCalls::new()),
                lifecycle: Mutex::new(Lifecycle::default()),
                state: RwLock::new(TransportState::Unstarted),
                generations: AtomicU64::new(0),
                handshakes: AtomicU64::new(0),
            }),
        })
    }

    /// Transport over a real subprocess with its own event bus.
    pub fn with_process(config: TransportConfig) -> Result<Self, TransportError> {
        let launcher = Arc::new(ProcessLauncher::new(config.clone()));
        let router = Arc::new(NotificationRouter::new(Arc::new(InMemoryEventBus::new())));
        Self::new(config, launcher, router)
    }

    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn state(&self) -> TransportState {
        *self.inner.state.read()
    }

    /// Generation of the most recent spawn attempt, 0 before the first.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generations.load(Ordering::SeqCst)
    }

    /// Completed `initialize` handshakes.
    #[must_use]
    pub fn handshake_count(&self) -> u64 {
        self.inner.handshakes.load(Ordering::SeqCst)
    }

    /// What the subprocess reported about itself in the last handshake.
    pub async fn server_info(&self) -> Option<InitializeResult> {
        self.inner.lifecycle.lock().await.server_info.clone()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.pending_count()
    }

    #[must_use]
    pub fn pending_stats(&self) -> &PendingStats {
        self.inner.pending.stats()
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        self.inner.router.bus()
    }

    /// Attach a subscriber for out-of-band events. Dropping it detaches.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus().subscribe(filter)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.bus().event_stream(filter)
    }

    /// Make sure a process is running and initialized.
    ///
    /// No-op when ready; otherwise spawns and handshakes under the lifecycle
    /// lock so concurrent callers share one attempt.
    pub async fn ensure(&self) -> Result<(), TransportError> {
        self.connection().await.map(|_| ())
    }

    /// Send a request and wait for its reply.
    ///
    /// There is no built-in timeout; wrap in `tokio::time::timeout` if needed.
    #[instrument(skip_all, fields(method = %method))]
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let started = Instant::now();

        let outcome = match self.connection().await {
            Ok(conn) => self.request_on(&conn, method, params).await,
            Err(e) => Err(e),
        };

        let label = match &outcome {
            Ok(_) => "success",
            Err(e) => e.outcome_label(),
        };
        RPC_CALLS.with_label_values(&[method, label]).inc();
        RPC_DURATION
            .with_label_values(&[method])
            .observe(started.elapsed().as_secs_f64());

        outcome
    }

    /// Send a notification. Resolves once the line has been written.
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), TransportError> {
        let conn = self.connection().await?;
        self.notify_on(&conn, method, params).await
    }

    /// Kill the subprocess and fail everything in flight. A later `ensure()`
    /// starts a new one.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if let Some(conn) = lifecycle.live.take() {
            let generation = conn.handle.generation();
            conn.handle
                .mark_down(TransportError::Closed("transport shut down".to_string()));
            let rejected = self
                .inner
                .pending
                .reject_generation(generation, &conn.handle.down_error());
            conn.kill.fire();
            info!(generation = generation, rejected = rejected, "Transport shut down");
        }

        self.set_state(TransportState::Down);
    }

    async fn connection(&self) -> Result<Connection, TransportError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if let Some(conn) = &lifecycle.live {
            if conn.handle.is_alive() {
                return Ok(conn.clone());
            }
        }
        lifecycle.live = None;
        self.set_state(TransportState::Starting);

        match self.start(&mut lifecycle).await {
            Ok(conn) => {
                self.set_state(TransportState::Ready);
                self.inner
                    .router
                    .lifecycle(ProtocolEvent::TransportReady {
                        generation: conn.handle.generation(),
                    })
                    .await;
                Ok(conn)
            }
            Err(e) => {
                self.set_state(TransportState::Down);
                Err(e)
            }
        }
    }

    /// Spawn a new generation and run the handshake. Caller holds the lock.
    async fn start(&self, lifecycle: &mut Lifecycle) -> Result<Connection, TransportError> {
        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;

        let process = match self.inner.launcher.launch(generation).await {
            Ok(process) => process,
            Err(e) => {
                TRANSPORT_SPAWNS.with_label_values(&["spawn_failed"]).inc();
                error!(generation = generation, error = %e, "Spawn failed");
                return Err(e);
            }
        };

        let handle = Arc::new(GenerationHandle::new(generation));
        let (tx, rx) = mpsc::channel(self.inner.config.outbound_capacity);
        let ctx = ChannelContext {
            handle: Arc::clone(&handle),
            pending: Arc::clone(&self.inner.pending),
            router: Arc::clone(&self.inner.router),
            kill: process.kill.clone(),
        };

        spawn_writer(ctx.clone(), process.stdin, rx);
        spawn_reader(ctx.clone(), process.stdout, tx.clone());
        if let Some(stderr) = process.stderr {
            spawn_stderr(ctx.clone(), stderr);
        }
        spawn_exit_watcher(Arc::downgrade(&self.inner), ctx.clone(), process.exit);

        let conn = Connection {
            handle,
            outbound: tx,
            kill: process.kill,
        };

        let handshake =
            tokio::time::timeout(self.inner.config.handshake_timeout, self.handshake(&conn)).await;

        let failure = match handshake {
            Ok(Ok(result)) => {
                TRANSPORT_SPAWNS.with_label_values(&["ready"]).inc();
                self.inner.handshakes.fetch_add(1, Ordering::SeqCst);
                info!(
                    generation = generation,
                    server = %result.server_info.name,
                    server_version = %result.server_info.version,
                    "Subprocess ready"
                );
                lifecycle.server_info = Some(result);
                lifecycle.live = Some(conn.clone());
                return Ok(conn);
            }
            Ok(Err(e)) => TransportError::Handshake(e.to_string()),
            Err(_) => TransportError::Handshake(format!(
                "no initialize reply within {:?}",
                self.inner.config.handshake_timeout
            )),
        };

        TRANSPORT_SPAWNS.with_label_values(&["handshake_failed"]).inc();
        warn!(generation = generation, error = %failure, "Handshake failed");
        ctx.fail(failure.clone());
        Err(failure)
    }

    async fn handshake(&self, conn: &Connection) -> Result<InitializeResult, TransportError> {
        let config = &self.inner.config;
        let params = InitializeParams {
            protocol_version: config.protocol_version.clone(),
            capabilities: json!({}),
            client_info: Implementation::new(&config.client_name, &config.client_version),
        };
        let params =
            serde_json::to_value(params).map_err(|e| TransportError::Serialization(e.to_string()))?;

        let reply = self.request_on(conn, methods::INITIALIZE, params).await?;
        let result: InitializeResult = serde_json::from_value(reply)
            .map_err(|e| TransportError::Handshake(format!("bad initialize result: {}", e)))?;

        if result.protocol_version != config.protocol_version {
            warn!(
                offered = %config.protocol_version,
                accepted = %result.protocol_version,
                "Subprocess negotiated a different protocol version"
            );
        }

        self.notify_on(conn, methods::INITIALIZED, Value::Null).await?;
        Ok(result)
    }

    async fn request_on(
        &self,
        conn: &Connection,
        method: &str,
        params: Value,
    ) -> Result<Value, TransportError> {
        let pending = &self.inner.pending;
        let (id, rx) = pending.register(method, conn.handle.generation());

        let line = match encode_line(&Message::from(Request::new(id, method, params))) {
            Ok(line) => line,
            Err(e) => {
                let error = TransportError::Serialization(e.to_string());
                pending.fail(id, error.clone());
                return Err(error);
            }
        };

        // The exit watcher marks the handle down before sweeping the table, so
        // a call registered after the sweep sees the flag here.
        if !conn.handle.is_alive() {
            pending.fail(id, conn.handle.down_error());
        } else if conn.outbound.send(OutboundFrame::new(line)).await.is_err() {
            pending.fail(id, conn.handle.down_error());
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Closed("reply channel dropped".to_string())),
        }
    }

    async fn notify_on(
        &self,
        conn: &Connection,
        method: &str,
        params: Value,
    ) -> Result<(), TransportError> {
        if !conn.handle.is_alive() {
            return Err(conn.handle.down_error());
        }

        let line = encode_line(&Message::from(Notification::new(method, params)))
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        let (frame, ack) = OutboundFrame::acknowledged(line);

        conn.outbound
            .send(frame)
            .await
            .map_err(|_| conn.handle.down_error())?;
        ack.await.map_err(|_| conn.handle.down_error())?
    }

    fn set_state(&self, state: TransportState) {
        let mut current = self.inner.state.write();
        let previous = *current;
        if previous != state {
            debug!(from = %previous, to = %state, "Transport state change");
            *current = state;
        }
    }
}

/// Wait for a generation to end, then fail its calls and, if it is still the
/// live one, move the transport to Down.
fn spawn_exit_watcher(
    inner: Weak<Inner>,
    ctx: ChannelContext,
    exit: BoxFuture<'static, ExitReason>,
) {
    tokio::spawn(async move {
        let reason = exit.await;
        let generation = ctx.generation();
        TRANSPORT_EXITS.inc();

        let was_alive = ctx.handle.is_alive();
        ctx.fail(TransportError::Exited {
            generation,
            reason: reason.to_string(),
        });
        if was_alive {
            warn!(generation = generation, reason = %reason, "Subprocess exited");
        } else {
            debug!(generation = generation, reason = %reason, "Subprocess reaped");
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let transport = Transport { inner };

        let mut lifecycle = transport.inner.lifecycle.lock().await;
        let is_current = lifecycle
            .live
            .as_ref()
            .is_some_and(|conn| conn.handle.generation() == generation);
        if is_current {
            lifecycle.live = None;
            transport.set_state(TransportState::Down);
        }
        drop(lifecycle);

        transport
            .inner
            .router
            .lifecycle(ProtocolEvent::TransportDown {
                generation,
                reason: ctx.handle.down_error().to_string(),
            })
            .await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryLauncher, ScriptedPeer};
    use shared_bus::EventTopic;
    use shared_types::RpcError;
    use std::time::Duration;

    fn transport_with(launcher: Arc<MemoryLauncher>) -> Transport {
        let router = Arc::new(NotificationRouter::new(Arc::new(InMemoryEventBus::new())));
        Transport::new(TransportConfig::default(), launcher, router).unwrap()
    }

    fn spawns(outcome: &str) -> f64 {
        TRANSPORT_SPAWNS.with_label_values(&[outcome]).get()
    }

    fn echo_launcher() -> Arc<MemoryLauncher> {
        Arc::new(MemoryLauncher::new(|_, peer: ScriptedPeer| {
            peer.serve(|method, params| match method {
                "echo" => Ok(params.clone()),
                "fail" => Err(RpcError::new(-32000, "boom").with_data(json!({"details": "disk on fire"}))),
                other => Err(RpcError::method_not_found(other)),
            })
        }))
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let router = Arc::new(NotificationRouter::new(Arc::new(InMemoryEventBus::new())));
        let config = TransportConfig {
            outbound_capacity: 0,
            ..TransportConfig::default()
        };
        let result = Transport::new(config, echo_launcher(), router);
        assert!(matches!(result, Err(TransportError::Config(_))));
    }

    #[tokio::test]
    async fn test_ensure_is_lazy_and_idempotent() {
        let launcher = echo_launcher();
        let transport = transport_with(Arc::clone(&launcher));
        assert_eq!(transport.state(), TransportState::Unstarted);
        assert_eq!(launcher.spawn_count(), 0);

        transport.ensure().await.unwrap();
        transport.ensure().await.unwrap();

        assert_eq!(transport.state(), TransportState::Ready);
        assert_eq!(launcher.spawn_count(), 1);
        assert_eq!(transport.handshake_count(), 1);
        let info = transport.server_info().await.unwrap();
        assert_eq!(info.server_info.name, "scripted-peer");
    }

    #[tokio::test]
    async fn test_call_round_trip_and_error_reply() {
        let transport = transport_with(echo_launcher());

        let value = transport.call("echo", json!({"x": [1, 2]})).await.unwrap();
        assert_eq!(value, json!({"x": [1, 2]}));

        let err = transport.call("fail", Value::Null).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Rpc {
                code: -32000,
                message: "disk on fire".into()
            }
        );
        // A call-scoped error leaves the process up.
        assert_eq!(transport.state(), TransportState::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_each_get_their_reply() {
        let transport = transport_with(echo_launcher());

        let calls = (0..32).map(|i| {
            let t = transport.clone();
            tokio::spawn(async move { (i, t.call("echo", json!({"n": i})).await) })
        });

        for handle in calls {
            let (i, outcome) = handle.await.unwrap();
            assert_eq!(outcome.unwrap(), json!({"n": i}));
        }
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_ensure_spawns_once() {
        let launcher = echo_launcher();
        let transport = transport_with(Arc::clone(&launcher));

        let a = tokio::spawn({
            let t = transport.clone();
            async move { t.call("echo", json!(1)).await }
        });
        let b = tokio::spawn({
            let t = transport.clone();
            async move { t.call("echo", json!(2)).await }
        });

        assert_eq!(a.await.unwrap().unwrap(), json!(1));
        assert_eq!(b.await.unwrap().unwrap(), json!(2));
        assert_eq!(launcher.spawn_count(), 1);
        assert_eq!(transport.handshake_count(), 1);
    }

    #[tokio::test]
    async fn test_death_rejects_all_pending_with_exit_code() {
        // Reads N requests without answering, then exits with code 3.
        let launcher = Arc::new(MemoryLauncher::new(|_, mut peer: ScriptedPeer| async move {
            if peer.accept_handshake().await.is_none() {
                return ExitReason::Code(1);
            }
            for _ in 0..5 {
                if peer.recv_request().await.is_none() {
                    break;
                }
            }
            ExitReason::Code(3)
        }));
        let transport = transport_with(launcher);
        transport.ensure().await.unwrap();

        let calls: Vec<_> = (0..5)
            .map(|i| {
                let t = transport.clone();
                tokio::spawn(async move { t.call("tools/call", json!({"i": i})).await })
            })
            .collect();

        for handle in calls {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(
                err,
                TransportError::Exited {
                    generation: 1,
                    reason: "exit code 3".into()
                }
            );
            assert!(err.to_string().contains("exit code 3"));
        }
        assert_eq!(transport.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_exit_mid_call_then_respawn() {
        // Generation 1 dies on its first request; later generations serve.
        let launcher = Arc::new(MemoryLauncher::new(|generation, mut peer: ScriptedPeer| async move {
            if generation == 1 {
                if peer.accept_handshake().await.is_none() {
                    return ExitReason::Code(1);
                }
                let _ = peer.recv_request().await;
                return ExitReason::Signal(11);
            }
            peer.serve(|_, params| Ok(params.clone())).await
        }));
        let transport = transport_with(Arc::clone(&launcher));

        let err = transport.call("echo", json!("first")).await.unwrap_err();
        assert!(err.to_string().contains("signal 11"), "{}", err);

        // The watcher may still be settling state; the next call must respawn.
        let value = transport.call("echo", json!("second")).await.unwrap();
        assert_eq!(value, json!("second"));
        assert_eq!(launcher.spawn_count(), 2);
        assert_eq!(transport.generation(), 2);
    }

    #[tokio::test]
    async fn test_handshake_failure_is_reported_and_retried() {
        let launcher = Arc::new(MemoryLauncher::new(|generation, mut peer: ScriptedPeer| async move {
            if generation == 1 {
                let _ = peer.recv_request().await;
                return ExitReason::Code(2);
            }
            peer.serve(|_, _| Ok(json!("ok"))).await
        }));
        let transport = transport_with(Arc::clone(&launcher));
        let (failed_before, ready_before) = (spawns("handshake_failed"), spawns("ready"));

        let err = transport.ensure().await.unwrap_err();
        assert!(matches!(err, TransportError::Handshake(ref m) if m.contains("exit code 2")));
        assert_eq!(transport.state(), TransportState::Down);
        assert!(spawns("handshake_failed") >= failed_before + 1.0);

        transport.ensure().await.unwrap();
        assert_eq!(transport.state(), TransportState::Ready);
        assert!(spawns("ready") >= ready_before + 1.0);
        assert_eq!(launcher.spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let launcher = Arc::new(MemoryLauncher::new(|_, peer: ScriptedPeer| async move {
            let _peer = peer;
            std::future::pending::<()>().await;
            ExitReason::Code(0)
        }));
        let router = Arc::new(NotificationRouter::new(Arc::new(InMemoryEventBus::new())));
        let config = TransportConfig {
            handshake_timeout: Duration::from_millis(50),
            ..TransportConfig::default()
        };
        let transport = Transport::new(config, launcher, router).unwrap();

        let err = transport.ensure().await.unwrap_err();
        assert!(matches!(err, TransportError::Handshake(ref m) if m.contains("no initialize reply")));
    }

    #[tokio::test]
    async fn test_stale_reply_is_ignored() {
        let launcher = Arc::new(MemoryLauncher::new(|_, mut peer: ScriptedPeer| async move {
            if peer.accept_handshake().await.is_none() {
                return ExitReason::Code(1);
            }
            while let Some(request) = peer.recv_request().await {
                let _ = peer.reply(9_999.into(), json!("nobody asked")).await;
                let _ = peer.reply(request.id, json!("mine")).await;
            }
            ExitReason::Code(0)
        }));
        let transport = transport_with(launcher);

        assert_eq!(transport.call("x", Value::Null).await.unwrap(), json!("mine"));
        assert_eq!(transport.pending_stats().total_stale.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_pending_and_allows_restart() {
        let launcher = Arc::new(MemoryLauncher::new(|generation, mut peer: ScriptedPeer| async move {
            if generation == 1 {
                if peer.accept_handshake().await.is_none() {
                    return ExitReason::Code(1);
                }
                while peer.recv().await.is_some() {}
                return ExitReason::Code(0);
            }
            peer.serve(|_, _| Ok(json!("back"))).await
        }));
        let transport = transport_with(Arc::clone(&launcher));
        transport.ensure().await.unwrap();

        let stuck = tokio::spawn({
            let t = transport.clone();
            async move { t.call("hang", Value::Null).await }
        });
        while transport.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        transport.shutdown().await;
        assert_eq!(transport.state(), TransportState::Down);
        let err = stuck.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Closed(_)));

        assert_eq!(transport.call("again", Value::Null).await.unwrap(), json!("back"));
        assert_eq!(launcher.spawn_count(), 2);
    }

    #[tokio::test]
    async fn test_notifications_and_stderr_reach_subscribers() {
        let launcher = Arc::new(MemoryLauncher::new(|_, mut peer: ScriptedPeer| async move {
            if peer.accept_handshake().await.is_none() {
                return ExitReason::Code(1);
            }
            let _ = peer.stderr_line("warming up").await;
            if let Some(request) = peer.recv_request().await {
                let _ = peer
                    .notify(
                        methods::PROGRESS,
                        json!({"progressToken": "t1", "progress": 1, "total": 2}),
                    )
                    .await;
                let _ = peer.reply(request.id, json!({})).await;
            }
            while peer.recv().await.is_some() {}
            ExitReason::Code(0)
        }));
        let transport = transport_with(launcher);
        let mut progress = transport.subscribe(EventFilter::topics(vec![EventTopic::Progress]));
        let mut diagnostics =
            transport.subscribe(EventFilter::topics(vec![EventTopic::Diagnostics]));
        let mut lifecycle = transport.subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));

        transport.call("tools/call", json!({})).await.unwrap();

        let event = progress.recv().await.unwrap();
        assert!(matches!(event, ProtocolEvent::Progress { ref token, .. } if token == "t1"));

        let event = diagnostics.recv().await.unwrap();
        assert_eq!(
            event,
            ProtocolEvent::Diagnostic {
                generation: 1,
                line: "warming up".into()
            }
        );

        assert_eq!(
            lifecycle.recv().await.unwrap(),
            ProtocolEvent::TransportReady { generation: 1 }
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_transport_down() {
        struct Broken;

        #[async_trait::async_trait]
        impl Launcher for Broken {
            async fn launch(
                &self,
                _generation: u64,
            ) -> Result<crate::ports::LaunchedProcess, TransportError> {
                Err(TransportError::Spawn("ck: No such file or directory".into()))
            }
        }

        let router = Arc::new(NotificationRouter::new(Arc::new(InMemoryEventBus::new())));
        let transport = Transport::new(TransportConfig::default(), Arc::new(Broken), router).unwrap();

        let before = spawns("spawn_failed");

        let err = transport.call("tools/list", Value::Null).await.unwrap_err();
        assert!(matches!(err, TransportError::Spawn(_)));
        assert_eq!(transport.state(), TransportState::Down);
        assert!(spawns("spawn_failed") >= before + 1.0);
    }
}
