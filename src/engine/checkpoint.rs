//! Checkpoint controller: turns an interrupt into save-then-exit.
//!
//! Arming installs SIGINT/SIGTERM handlers for the duration of a run and
//! hands back a guard. The OS handler does nothing but record the signal
//! number; the engine's loop notices it on its own task, so the state it
//! saves is never mid-mutation. Dropping the guard puts the previous
//! dispositions back.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use opentelemetry::KeyValue;
use tracing::error;

use crate::error::Result;
use crate::event::{EventKind, EventSink};
use crate::model::ProcessingState;
use crate::store::SnapshotStore;
use crate::telemetry::metrics;

/// Signal number recorded by [`InterruptTrigger::fire`].
pub const SIGINT: i32 = 2;

/// How often an armed guard checks for a pending interrupt while a worker
/// call is in flight.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Where interrupts come from.
#[derive(Debug, Clone, Default)]
pub enum InterruptSource {
    /// SIGINT and SIGTERM from the operating system.
    #[default]
    Os,
    /// A trigger owned by the caller; no OS handlers are touched.
    Manual(InterruptTrigger),
}

/// What happens after the interrupt checkpoint is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Termination {
    /// Exit the process with status `128 + signo`.
    #[default]
    Exit,
    /// Return from `run` with an interrupted outcome. For hosts that own the
    /// process lifecycle, and for tests.
    Return,
}

/// Caller-owned stand-in for signal delivery.
#[derive(Debug, Clone, Default)]
pub struct InterruptTrigger {
    pending: Arc<AtomicI32>,
}

impl InterruptTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a simulated SIGINT.
    pub fn fire(&self) {
        self.fire_with(SIGINT);
    }

    pub fn fire_with(&self, signo: i32) {
        self.pending.store(signo, Ordering::SeqCst);
    }
}

/// Installs run-scoped interrupt handling and performs the interrupt
/// checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CheckpointController {
    source: InterruptSource,
    termination: Termination,
    events: EventSink,
}

impl CheckpointController {
    pub fn new(source: InterruptSource, termination: Termination, events: EventSink) -> Self {
        Self {
            source,
            termination,
            events,
        }
    }

    /// Start intercepting interrupts until the returned guard is dropped.
    ///
    /// Only one OS-backed guard can be live per process.
    pub fn arm(&self) -> Result<ArmedCheckpoint> {
        let pending = match self.source {
            InterruptSource::Os => Pending::Os(os::OsHandlers::install()?),
            InterruptSource::Manual(ref trigger) => Pending::Manual(Arc::clone(&trigger.pending)),
        };
        Ok(ArmedCheckpoint { pending })
    }

    /// Persist `state` after an interrupt and terminate.
    ///
    /// With [`Termination::Exit`] this never returns. With
    /// [`Termination::Return`] it returns once the snapshot is written, or
    /// the save error.
    pub async fn checkpoint<S: SnapshotStore>(
        &self,
        store: &S,
        state: &ProcessingState,
        signo: i32,
    ) -> Result<()> {
        self.events.emit(EventKind::InterruptReceived);

        if let Err(e) = store.save(state.as_snapshot()).await {
            error!(error = %e, "interrupt checkpoint failed");
            match self.termination {
                Termination::Exit => std::process::exit(1),
                Termination::Return => return Err(e),
            }
        }
        metrics::snapshots_saved().add(1, &[KeyValue::new("trigger", "interrupt")]);

        self.events.emit(EventKind::InterruptSaved);

        match self.termination {
            Termination::Exit => std::process::exit(128 + signo),
            Termination::Return => Ok(()),
        }
    }
}

enum Pending {
    Os(os::OsHandlers),
    Manual(Arc<AtomicI32>),
}

/// Live interrupt interception for one run. Disarms on drop.
pub struct ArmedCheckpoint {
    pending: Pending,
}

impl ArmedCheckpoint {
    /// Signal number of a delivered interrupt, if any.
    pub fn pending(&self) -> Option<i32> {
        let signo = match self.pending {
            Pending::Os(_) => os::pending(),
            Pending::Manual(ref flag) => flag.load(Ordering::SeqCst),
        };
        (signo != 0).then_some(signo)
    }

    /// Resolve once an interrupt has been delivered.
    pub async fn interrupted(&self) -> i32 {
        loop {
            if let Some(signo) = self.pending() {
                return signo;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(unix)]
mod os {
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
    use tracing::warn;

    use crate::error::{Error, Result};

    static PENDING: AtomicI32 = AtomicI32::new(0);
    static ARMED: AtomicBool = AtomicBool::new(false);

    const SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

    extern "C" fn on_signal(signo: nix::libc::c_int) {
        PENDING.store(signo, Ordering::SeqCst);
    }

    pub(super) fn pending() -> i32 {
        PENDING.load(Ordering::SeqCst)
    }

    /// Installed handlers plus the dispositions they replaced.
    pub(super) struct OsHandlers {
        previous: Vec<(Signal, SigAction)>,
    }

    impl OsHandlers {
        pub(super) fn install() -> Result<Self> {
            if ARMED.swap(true, Ordering::SeqCst) {
                return Err(Error::Checkpoint(
                    "interrupt handler already armed by another run".to_string(),
                ));
            }
            PENDING.store(0, Ordering::SeqCst);

            let action = SigAction::new(
                SigHandler::Handler(on_signal),
                SaFlags::SA_RESTART,
                SigSet::empty(),
            );

            // Dropping a partially built value restores whatever was installed.
            let mut handlers = Self {
                previous: Vec::with_capacity(SIGNALS.len()),
            };
            for signal in SIGNALS {
                // SAFETY: the handler only performs an atomic store.
                let previous = unsafe { sigaction(signal, &action) }.map_err(|e| {
                    Error::Checkpoint(format!("cannot install {} handler: {e}", signal.as_str()))
                })?;
                handlers.previous.push((signal, previous));
            }
            Ok(handlers)
        }
    }

    impl Drop for OsHandlers {
        fn drop(&mut self) {
            for (signal, previous) in self.previous.drain(..).rev() {
                // SAFETY: reinstates the disposition that was active before install.
                if let Err(e) = unsafe { sigaction(signal, &previous) } {
                    warn!(signal = signal.as_str(), error = %e, "failed to restore signal disposition");
                }
            }
            ARMED.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(not(unix))]
mod os {
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    use crate::error::{Error, Result};

    static PENDING: AtomicI32 = AtomicI32::new(0);
    static ARMED: AtomicBool = AtomicBool::new(false);

    pub(super) fn pending() -> i32 {
        PENDING.load(Ordering::SeqCst)
    }

    /// Ctrl-C listener task. Tokio cannot uninstall its console handler, so
    /// disarming only stops listening.
    pub(super) struct OsHandlers {
        listener: tokio::task::JoinHandle<()>,
    }

    impl OsHandlers {
        pub(super) fn install() -> Result<Self> {
            if ARMED.swap(true, Ordering::SeqCst) {
                return Err(Error::Checkpoint(
                    "interrupt handler already armed by another run".to_string(),
                ));
            }
            PENDING.store(0, Ordering::SeqCst);

            let listener = tokio::spawn(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    PENDING.store(super::SIGINT, Ordering::SeqCst);
                }
            });
            Ok(Self { listener })
        }
    }

    impl Drop for OsHandlers {
        fn drop(&mut self) {
            self.listener.abort();
            ARMED.store(false, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn manual(trigger: &InterruptTrigger) -> CheckpointController {
        CheckpointController::new(
            InterruptSource::Manual(trigger.clone()),
            Termination::Return,
            EventSink::tracing(),
        )
    }

    #[test]
    fn manual_guard_reports_fired_trigger() {
        let trigger = InterruptTrigger::new();
        let armed = manual(&trigger).arm().unwrap();
        assert_eq!(armed.pending(), None);

        trigger.fire_with(15);
        assert_eq!(armed.pending(), Some(15));
    }

    #[tokio::test]
    async fn interrupted_resolves_after_fire() {
        let trigger = InterruptTrigger::new();
        let armed = manual(&trigger).arm().unwrap();

        let firing = trigger.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            firing.fire();
        });

        assert_eq!(armed.interrupted().await, SIGINT);
    }

    #[tokio::test]
    async fn checkpoint_saves_state_and_returns() {
        let (events, mut rx) = EventSink::channel();
        let controller =
            CheckpointController::new(InterruptSource::Os, Termination::Return, events);
        let store = MemoryStore::new();
        let mut state = ProcessingState::new();
        state.record("a".into(), json!("a!"));

        controller.checkpoint(&store, &state, SIGINT).await.unwrap();

        assert_eq!(store.snapshot().unwrap(), *state.as_snapshot());
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::InterruptReceived);
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::InterruptSaved);
    }
}
