//! Engine: compile-and-apply orchestration.
//!
//! # Responsibilities
//! - Own the saved state, storage handle, interception layer, counter,
//!   and timer
//! - Execute control commands exhaustively
//! - Serialize compile-and-apply passes
//! - Run the disable pass when the auto-disable timer fires
//!
//! # Design Decisions
//! - Overlapping compile triggers are serialized by a single-flight lock,
//!   not coalesced: each trigger runs one full pass to completion. The
//!   lock covers persist AND install, so the persisted enabled flag and
//!   the live rule table cannot reorder against each other when an
//!   update races the timer-fire disable pass
//! - Rule replacement is clear-then-install through the layer's
//!   replace-by-id interface. If the install half fails, the layer is
//!   left empty and the error propagates; callers must treat a failed
//!   update as "rules currently undefined" and retry explicitly
//! - Within a pass, state is persisted before rules are applied, so a
//!   crash mid-pass reconverges on the next startup apply

pub mod command;

use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use crate::intercept::{InterceptLayer, RuleInstallError};
use crate::pattern::PatternError;
use crate::profile::Profile;
use crate::rules;
use crate::session::timer::FireReceiver;
use crate::session::{AutoDisableTimer, MatchCounter};
use crate::store::{self, ImportError, ProfileStorage, SavedState, StorageError};

pub use command::{Command, CommandOutcome, StatusReport};

/// Errors surfaced to command callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Install(#[from] RuleInstallError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// The compile-and-apply orchestrator.
pub struct HeaderEngine {
    state: Mutex<SavedState>,
    storage: Arc<dyn ProfileStorage>,
    layer: Arc<dyn InterceptLayer>,
    counter: MatchCounter,
    timer: AutoDisableTimer,
    /// Single-flight lock for compile-and-apply passes.
    apply_lock: AsyncMutex<()>,
}

impl HeaderEngine {
    /// Load persisted state, wire up background tasks, re-arm the timer,
    /// and run the startup apply pass.
    pub async fn start(
        storage: Arc<dyn ProfileStorage>,
        layer: Arc<dyn InterceptLayer>,
        match_rx: tokio::sync::mpsc::UnboundedReceiver<u32>,
    ) -> Result<Arc<Self>, EngineError> {
        let state = storage.load()?;
        let (timer, fire_rx) = AutoDisableTimer::new();

        let engine = Arc::new(Self {
            state: Mutex::new(state),
            storage,
            layer,
            counter: MatchCounter::new(),
            timer,
            apply_lock: AsyncMutex::new(()),
        });

        engine.spawn_match_pump(match_rx);
        engine.spawn_fire_loop(fire_rx);

        let (mut enabled, profile, deadline) = engine.snapshot();
        if let Some(deadline_ms) = deadline {
            if deadline_ms <= crate::session::timer::now_ms() {
                // The deadline passed while we were not running; the
                // disable still has to happen.
                info!(deadline_ms, "persisted auto-disable deadline expired, disabling");
                engine.run_disable_pass().await?;
                enabled = false;
            } else {
                engine.timer.arm_at(deadline_ms);
            }
        }
        if enabled {
            info!("startup apply pass");
            engine.apply(enabled, &profile).await?;
        }

        Ok(engine)
    }

    /// Execute one control command.
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome, EngineError> {
        match command {
            Command::UpdateRules { enabled, profile } => {
                self.update_rules(enabled, profile).await?;
                Ok(CommandOutcome::ack())
            }
            Command::GetCount => Ok(CommandOutcome::Count {
                count: self.counter.get(),
            }),
            Command::ResetCount => {
                self.counter.reset();
                Ok(CommandOutcome::ack())
            }
            Command::SetTimer { minutes } => {
                if minutes == 0 {
                    self.clear_timer()?;
                } else {
                    let deadline = self.timer.arm(minutes);
                    self.persist_deadline(Some(deadline))?;
                }
                Ok(CommandOutcome::ack())
            }
            Command::ClearTimer => {
                self.clear_timer()?;
                Ok(CommandOutcome::ack())
            }
            Command::ExportProfiles => {
                let state = self.state.lock().expect("state lock");
                Ok(CommandOutcome::Bundle {
                    bundle: store::export_bundle(&state.store),
                })
            }
            Command::ImportProfiles { payload } => {
                self.import_profiles(&payload).await?;
                Ok(CommandOutcome::ack())
            }
            Command::Status => Ok(CommandOutcome::Status(self.status())),
        }
    }

    /// Replace the active profile, persist, and run a compile-and-apply
    /// pass. The whole pass holds the single-flight lock so the
    /// persisted flag and the installed rules cannot diverge.
    async fn update_rules(&self, enabled: bool, profile: Profile) -> Result<(), EngineError> {
        let _pass = self.apply_lock.lock().await;
        {
            let mut state = self.state.lock().expect("state lock");
            state.enabled = enabled;
            let active = state.store.active_profile.clone();
            state.store.profiles.insert(active, profile.clone());
            self.storage.save(&state)?;
        }
        self.install(enabled, &profile)
    }

    async fn import_profiles(&self, payload: &str) -> Result<(), EngineError> {
        let _pass = self.apply_lock.lock().await;
        let (enabled, profile) = {
            let mut state = self.state.lock().expect("state lock");
            store::import_bundle(&mut state.store, payload)?;
            self.storage.save(&state)?;
            (state.enabled, state.store.active().clone())
        };
        // The active profile may have changed; re-apply.
        self.install(enabled, &profile)
    }

    /// One full compile-and-apply pass under the single-flight lock.
    async fn apply(&self, enabled: bool, profile: &Profile) -> Result<(), EngineError> {
        let _pass = self.apply_lock.lock().await;
        self.install(enabled, profile)
    }

    /// Compile and install. Callers hold `apply_lock`.
    fn install(&self, enabled: bool, profile: &Profile) -> Result<(), EngineError> {
        let rules = rules::compile(enabled, profile)?;
        let existing: Vec<u32> = self.layer.active_rules().iter().map(|r| r.id).collect();

        let installed = rules.len();
        if let Err(e) = self.layer.replace_rules(&existing, rules) {
            error!(error = %e, "rule install failed, layer left undefined");
            return Err(e.into());
        }

        info!(enabled, removed = existing.len(), installed, "rules applied");
        Ok(())
    }

    /// Disable pass: persists `enabled = false` so the disabled state
    /// survives a restart, then clears the rules. Runs when the timer
    /// fires and when a persisted deadline is found expired at startup.
    async fn run_disable_pass(&self) -> Result<(), EngineError> {
        let _pass = self.apply_lock.lock().await;
        let profile = {
            let mut state = self.state.lock().expect("state lock");
            state.enabled = false;
            state.timer_deadline_ms = None;
            self.storage.save(&state)?;
            state.store.active().clone()
        };
        self.install(false, &profile)
    }

    fn clear_timer(&self) -> Result<(), EngineError> {
        self.timer.disarm();
        self.persist_deadline(None)
    }

    fn persist_deadline(&self, deadline_ms: Option<u64>) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("state lock");
        state.timer_deadline_ms = deadline_ms;
        self.storage.save(&state)?;
        Ok(())
    }

    fn status(&self) -> StatusReport {
        let state = self.state.lock().expect("state lock");
        let profile = state.store.active();
        StatusReport {
            version: env!("CARGO_PKG_VERSION"),
            enabled: state.enabled,
            active_profile: state.store.active_profile.clone(),
            active_headers: profile.headers.iter().filter(|h| h.enabled).count(),
            targets: profile.targets.len(),
            excludes: profile.excludes.len(),
            installed_rules: self.layer.active_rules().len(),
            match_count: self.counter.get(),
            timer_deadline_ms: state.timer_deadline_ms,
        }
    }

    fn snapshot(&self) -> (bool, Profile, Option<u64>) {
        let state = self.state.lock().expect("state lock");
        (
            state.enabled,
            state.store.active().clone(),
            state.timer_deadline_ms,
        )
    }

    /// Counter handle (shared with observers).
    pub fn counter(&self) -> MatchCounter {
        self.counter.clone()
    }

    fn spawn_match_pump(self: &Arc<Self>, mut match_rx: tokio::sync::mpsc::UnboundedReceiver<u32>) {
        let counter = self.counter.clone();
        tokio::spawn(async move {
            while let Some(rule_id) = match_rx.recv().await {
                tracing::trace!(rule_id, "rule matched");
                counter.increment();
            }
        });
    }

    fn spawn_fire_loop(self: &Arc<Self>, mut fire_rx: FireReceiver) {
        let engine = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(deadline_ms) = fire_rx.recv().await {
                let Some(engine) = engine.upgrade() else { break };
                info!(deadline_ms, "auto-disable fired, disabling injection");
                if let Err(e) = engine.run_disable_pass().await {
                    warn!(error = %e, "auto-disable pass failed");
                }
            }
        });
    }
}
