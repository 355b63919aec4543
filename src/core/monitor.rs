//! # Monitor: the control surface for supervised runs.
//!
//! The [`Monitor`] owns the event bus, the [`SubscriberSet`], the compiled
//! [`LineParser`] and the configuration. Each `start_run` spawns the simulator
//! and one background run task; `stop_run` cancels it and waits, bounded, for
//! the final [`StopReport`].
//!
//! ## High-level architecture
//! ```text
//! start_run(params)
//!   ├─ validate params → RunParameters::to_args()
//!   ├─ record pre-run log files (skip_preexisting)
//!   ├─ ProcessSupervisor::start()  ── Err ──► publish Status{ERROR}, return SpawnFailed
//!   └─ tokio::spawn(runner::run(ctx, handle, tailer, token)) ──► watch<Option<StopReport>>
//!
//! stop_run()
//!   └─ token.cancel() ──► runner: stop(grace) → final drain → SupervisorStopped
//!      wait ≤ grace + poll + reap slack for the report
//! ```
//!
//! ## Rules
//! - At most one live run; a finished run is replaced by the next `start_run`
//! - Every run gets a fresh process handle and cursor; nothing is reused
//! - Subscribers only observe events, never supervisor state
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use simvisor::{Config, MissionState, Monitor, RunParameters, Subscribe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), simvisor::RuntimeError> {
//!     let state = Arc::new(MissionState::new());
//!     let monitor = Monitor::builder(Config::default())
//!         .with_subscribers(vec![state.clone() as Arc<dyn Subscribe>])
//!         .build()?;
//!
//!     monitor.start_run(RunParameters::default()).await?;
//!     let report = monitor.wait().await;
//!     println!("{report:?} {:?}", state.snapshot().await);
//!     monitor.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{builder::MonitorBuilder, runner};
use crate::{
    config::Config,
    error::RuntimeError,
    events::{Bus, Event, EventKind, RunId, StatusMessage, StopReport, Subscription},
    parser::LineParser,
    process::{ProcessSupervisor, RunParameters},
    subscribers::{SubscriberLag, SubscriberSet},
    tail::{LogLocator, LogTailer},
};

/// Component name of status messages the monitor reports about itself.
pub const ERROR_COMPONENT: &str = "ERROR";

struct ActiveRun {
    id: RunId,
    token: CancellationToken,
    done: watch::Receiver<Option<StopReport>>,
    join: JoinHandle<()>,
}

impl ActiveRun {
    fn is_live(&self) -> bool {
        self.done.borrow().is_none() && !self.join.is_finished()
    }
}

/// Launches, supervises and stops simulator runs; publishes their events.
pub struct Monitor {
    cfg: Arc<Config>,
    bus: Bus,
    parser: Arc<LineParser>,
    supervisor: ProcessSupervisor,
    subs: Mutex<Option<SubscriberSet>>,
    lag: SubscriberLag,
    active: Mutex<Option<ActiveRun>>,
    next_run: AtomicU64,
    runtime_token: CancellationToken,
}

impl Monitor {
    /// Starts building a monitor around `cfg`.
    pub fn builder(cfg: Config) -> MonitorBuilder {
        MonitorBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        parser: LineParser,
        subs: SubscriberSet,
    ) -> Self {
        let supervisor = ProcessSupervisor::new(cfg.reap_timeout);
        Self {
            lag: subs.lag(),
            cfg: Arc::new(cfg),
            bus,
            parser: Arc::new(parser),
            supervisor,
            subs: Mutex::new(Some(subs)),
            active: Mutex::new(None),
            next_run: AtomicU64::new(0),
            runtime_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Independent, ordered feed of every event published from now on.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Validates `params`, spawns the simulator and starts tailing its log.
    ///
    /// A spawn failure is also published as a status message from component `ERROR`.
    pub async fn start_run(&self, params: RunParameters) -> Result<RunId, RuntimeError> {
        params.validate()?;
        if self.runtime_token.is_cancelled() {
            return Err(RuntimeError::RunTaskFailed {
                reason: "monitor is shut down".to_string(),
            });
        }

        let mut active = self.active.lock().await;
        if let Some(run) = active.as_ref().filter(|r| r.is_live()) {
            return Err(RuntimeError::AlreadyRunning { run: run.id });
        }

        let id = self.next_run.fetch_add(1, Ordering::Relaxed) + 1;
        let mut locator = LogLocator::new(self.cfg.log_dir_path(), self.cfg.log_pattern.clone())?;
        if self.cfg.skip_preexisting {
            locator.record_baseline().await;
        }

        let args = self.cfg.args_with(params.to_args());
        let handle = match self
            .supervisor
            .start(&self.cfg.executable_path(), &args, &self.cfg.project_root)
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!(run = id, error = %e, "spawn failed");
                let status = StatusMessage::error(ERROR_COMPONENT, e.as_message());
                self.bus.publish(Event::new(EventKind::Status(status)).with_run(id));
                return Err(e);
            }
        };

        let token = self.runtime_token.child_token();
        let (tx, done) = watch::channel(None);
        let ctx = runner::RunContext {
            id,
            cfg: Arc::clone(&self.cfg),
            bus: self.bus.clone(),
            parser: Arc::clone(&self.parser),
            supervisor: self.supervisor.clone(),
        };
        let tailer = LogTailer::new(locator);
        let run_token = token.clone();
        let join = tokio::spawn(async move {
            let report = runner::run(ctx, handle, tailer, run_token).await;
            let _ = tx.send(Some(report));
        });

        info!(
            run = id,
            mission_time = %params.mission_time,
            verbose = params.verbose,
            "run started"
        );
        *active = Some(ActiveRun {
            id,
            token,
            done,
            join,
        });
        Ok(id)
    }

    /// Stops the current run: graceful termination, escalation, final drain.
    ///
    /// Returns `Ok(None)` when there is no run. Waits at most
    /// [`Config::stop_deadline`].
    pub async fn stop_run(&self) -> Result<Option<StopReport>, RuntimeError> {
        let Some((id, mut done)) = self.with_active(|run| {
            run.token.cancel();
            (run.id, run.done.clone())
        })
        .await
        else {
            return Ok(None);
        };

        let deadline = self.cfg.stop_deadline();
        let outcome = timeout(deadline, done.wait_for(Option::is_some))
            .await
            .map(|res| res.map(|report| report.clone()));
        match outcome {
            Ok(Ok(report)) => {
                self.clear_if(id).await;
                Ok(report)
            }
            Ok(Err(_)) => Err(self.run_task_failure(id).await),
            Err(_) => Err(RuntimeError::StopTimeout { waited: deadline }),
        }
    }

    /// Waits for the current run to end on its own; `None` when there is no run.
    pub async fn wait(&self) -> Option<StopReport> {
        let (id, mut done) = self.with_active(|run| (run.id, run.done.clone())).await?;
        let outcome = done.wait_for(Option::is_some).await.map(|report| report.clone());
        let report = match outcome {
            Ok(report) => report,
            Err(_) => {
                let err = self.run_task_failure(id).await;
                warn!(run = id, error = %err, "run ended without a report");
                return None;
            }
        };
        self.clear_if(id).await;
        report
    }

    /// True while a run task is live.
    pub async fn is_running(&self) -> bool {
        self.active.lock().await.as_ref().is_some_and(ActiveRun::is_live)
    }

    /// Id of the current (or last unreaped) run.
    pub async fn current_run(&self) -> Option<RunId> {
        self.active.lock().await.as_ref().map(|r| r.id)
    }

    /// Events each registered subscriber lost to overflow, in registration order.
    ///
    /// Remains readable after [`shutdown`](Self::shutdown).
    pub fn subscriber_lag(&self) -> Vec<(&'static str, u64)> {
        self.lag.snapshot()
    }

    /// Stops any run, then drains and stops the subscriber workers.
    ///
    /// The monitor refuses new runs afterwards.
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop_run().await {
            warn!(error = %e, label = e.as_label(), "stop during shutdown failed");
        }
        self.runtime_token.cancel();
        if let Some(subs) = self.subs.lock().await.take() {
            subs.shutdown().await;
        }
        info!("monitor shut down");
    }

    /// Spawns a task that calls [`stop_run`](Self::stop_run) when the host
    /// process receives SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere).
    pub fn stop_on_shutdown_signal(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                res = wait_for_shutdown_signal() => {
                    let signal = match res {
                        Ok(signal) => signal,
                        Err(e) => {
                            warn!(error = %e, "signal registration failed");
                            return;
                        }
                    };
                    info!(signal, "stopping run on signal");
                    if let Err(e) = monitor.stop_run().await {
                        warn!(error = %e, label = e.as_label(), "stop on signal failed");
                    }
                }
                _ = monitor.runtime_token.cancelled() => {}
            }
        })
    }

    async fn with_active<T>(&self, f: impl FnOnce(&ActiveRun) -> T) -> Option<T> {
        self.active.lock().await.as_ref().map(f)
    }

    async fn clear_if(&self, id: RunId) {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|r| r.id == id) {
            *active = None;
        }
    }

    async fn run_task_failure(&self, id: RunId) -> RuntimeError {
        let taken = {
            let mut active = self.active.lock().await;
            match active.as_ref() {
                Some(r) if r.id == id => active.take(),
                _ => None,
            }
        };
        let reason = match taken {
            Some(run) => match run.join.await {
                Ok(()) => "run task ended without a report".to_string(),
                Err(e) => e.to_string(),
            },
            None => "run task ended without a report".to_string(),
        };
        RuntimeError::RunTaskFailed { reason }
    }
}

/// Waits until the host process is asked to terminate and names the signal.
///
/// Listens for `SIGINT`, `SIGTERM` and `SIGQUIT`. Listeners are registered per call.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}
