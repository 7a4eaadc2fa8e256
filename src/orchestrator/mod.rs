//! Build/upload orchestration
//!
//! [`Orchestrator::run`] starts a flow toward an [`Action`]. Each pass
//! re-derives a [`SessionContext`] and walks the preconditions in order
//! (board, environment, port list, port, OTA password). The first unmet one
//! hands a request to the [`Host`] together with a callback that re-enters
//! the flow with the same action, and the pass returns. When nothing is
//! missing the action runs on a worker thread.

pub mod actions;
pub mod executor;
pub mod flow;
pub mod host;

pub use actions::InitOutcome;
pub use executor::BackgroundExecutor;
pub use host::{ActiveFile, Host};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::boards::BoardCatalog;
use crate::config::{AppConfig, Preferences};
use crate::models::{Action, PortList};
use crate::ports::PortResolver;
use crate::process::ProcessRunner;
use crate::utils::logging::ProgressReporter;

/// Where a pass of the flow stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Not a firmware file, nothing reported
    Ignored,
    /// Not processable, a diagnostic was reported
    Rejected,
    /// Waiting for the user to answer a request
    Suspended(Precondition),
    /// The user dismissed a request or a step could not continue
    Aborted,
    /// Another action of this orchestrator is still running
    Busy,
    /// The action was handed to a worker thread
    Started(Action),
}

/// Configuration that must be resolved before an action may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Board,
    Environment,
    Port,
    Auth,
}

/// State shared by the passes of one flow, reset by [`Orchestrator::run`]
#[derive(Debug, Default)]
struct ChainState {
    port_list: Option<PortList>,
}

/// Everything the orchestrator talks to
pub struct Collaborators {
    pub host: Arc<dyn Host>,
    pub preferences: Arc<Preferences>,
    pub runner: Arc<dyn ProcessRunner>,
    pub ports: Arc<PortResolver>,
    pub reporter: ProgressReporter,
}

pub struct Orchestrator {
    host: Arc<dyn Host>,
    prefs: Arc<Preferences>,
    runner: Arc<dyn ProcessRunner>,
    ports: Arc<PortResolver>,
    reporter: ProgressReporter,
    executor: BackgroundExecutor,
    config: AppConfig,
    chain: Mutex<ChainState>,
    last_state: Mutex<Option<FlowState>>,
    running: Arc<AtomicBool>,
    active: Mutex<Option<JoinHandle<bool>>>,
}

impl Orchestrator {
    pub fn new(parts: Collaborators, config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            executor: BackgroundExecutor::new(parts.reporter.clone()),
            host: parts.host,
            prefs: parts.preferences,
            runner: parts.runner,
            ports: parts.ports,
            reporter: parts.reporter,
            config,
            chain: Mutex::new(ChainState::default()),
            last_state: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            active: Mutex::new(None),
        })
    }

    /// Start a fresh flow toward `action`
    pub fn run(self: &Arc<Self>, action: Action) -> FlowState {
        *lock(&self.chain) = ChainState::default();
        self.process(action)
    }

    /// Block until the running action finishes, returning its success
    pub fn wait(&self) -> Option<bool> {
        let handle = lock(&self.active).take()?;
        match handle.join() {
            Ok(success) => Some(success),
            Err(_) => {
                self.reporter.error("Action thread panicked".to_string());
                Some(false)
            }
        }
    }

    /// Result of the most recent pass, including passes re-entered by callbacks
    pub fn last_state(&self) -> Option<FlowState> {
        *lock(&self.last_state)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Cached board table, empty when it was never fetched
    pub fn catalog(&self) -> BoardCatalog {
        BoardCatalog::load(&self.config.board_cache_path()).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable board cache: {}", e);
            BoardCatalog::default()
        })
    }

    fn record(&self, state: FlowState) -> FlowState {
        log::debug!("Flow state: {:?}", state);
        *lock(&self.last_state) = Some(state);
        state
    }
}

/// Clears the single-flight flag when the action thread ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
