use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use commit_graph::{
    CancelToken, GenerationLayout, GraphModel, LayoutEngine, LayoutError, LayoutResult, LayoutRun, Position,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{DisplayConfig, FINALIZER_THREAD_NAME};
use crate::events::{DisplayEvent, DisplayOutcome, DisplayState, EventBus};
use crate::task::TaskSupervisor;

/// Receives the "focus this commit" request after a successful layout.
///
/// Called on the finalizer thread; must not call back into
/// [`DisplayCoordinator::request_display`] synchronously.
pub trait FocusHandler: Send + Sync {
    fn focus_commit(&self, commit_id: &str);
}

impl<F> FocusHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn focus_commit(&self, commit_id: &str) {
        self(commit_id)
    }
}

struct NoFocus;

impl FocusHandler for NoFocus {
    fn focus_commit(&self, _commit_id: &str) {}
}

/// State shared with the finalizer threads
struct Shared {
    state: Mutex<DisplayState>,
    positions: RwLock<HashMap<String, Position>>,
    last_outcome: Mutex<Option<DisplayOutcome>>,
    bus: EventBus,
}

impl Shared {
    fn set_state(&self, cycle: u64, state: DisplayState) {
        *self.state.lock() = state;
        self.bus.publish(DisplayEvent::StateChanged { cycle, state });
    }
}

/// Runs layout passes for one graph view on a worker thread.
///
/// A new request cancels and joins the running pass before starting, so at
/// most one layout worker and one finalize step exist at any time.
pub struct DisplayCoordinator {
    config: DisplayConfig,
    model: Arc<GraphModel>,
    engine: Arc<dyn LayoutEngine>,
    focus: Arc<dyn FocusHandler>,
    shared: Arc<Shared>,
    supervisor: TaskSupervisor<DisplayOutcome>,
    cycles: AtomicU64,
}

impl DisplayCoordinator {
    pub fn new(config: DisplayConfig, model: Arc<GraphModel>) -> Self {
        let engine = Arc::new(GenerationLayout::new(config.layout));
        Self::with_engine(config, model, engine)
    }

    pub fn with_engine(config: DisplayConfig, model: Arc<GraphModel>, engine: Arc<dyn LayoutEngine>) -> Self {
        Self {
            config,
            model,
            engine,
            focus: Arc::new(NoFocus),
            shared: Arc::new(Shared {
                state: Mutex::new(DisplayState::Idle),
                positions: RwLock::new(HashMap::new()),
                last_outcome: Mutex::new(None),
                bus: EventBus::new(),
            }),
            supervisor: TaskSupervisor::new(),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn with_focus_handler(mut self, focus: impl FocusHandler + 'static) -> Self {
        self.focus = Arc::new(focus);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn model(&self) -> &Arc<GraphModel> {
        &self.model
    }

    pub fn state(&self) -> DisplayState {
        *self.shared.state.lock()
    }

    pub fn subscribe(&self) -> Receiver<DisplayEvent> {
        self.shared.bus.subscribe()
    }

    /// Positions from the last finalized layout
    pub fn positions(&self) -> HashMap<String, Position> {
        self.shared.positions.read().clone()
    }

    pub fn position(&self, commit_id: &str) -> Option<Position> {
        self.shared.positions.read().get(commit_id).copied()
    }

    pub fn last_outcome(&self) -> Option<DisplayOutcome> {
        self.shared.last_outcome.lock().clone()
    }

    /// Start a layout pass over the current graph, replacing any pass in flight.
    ///
    /// Blocks while a superseded pass is cancelled and joined. Returns the
    /// cycle number of the new pass.
    pub fn request_display(&self, focus: Option<String>) -> LayoutResult<u64> {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;

        let superseded = self.supervisor.replace(|cancel| self.start_cycle(cycle, cancel, focus));
        match superseded {
            Ok(Some(previous)) => {
                debug!(view = %self.config.name, previous = previous.cycle(), cycle, "display request superseded earlier pass");
                Ok(cycle)
            }
            Ok(None) => Ok(cycle),
            Err(error) => {
                warn!(view = %self.config.name, cycle, %error, "could not start layout");
                self.shared.set_state(cycle, DisplayState::Idle);
                let outcome = DisplayOutcome::Failed { cycle, error: error.clone() };
                *self.shared.last_outcome.lock() = Some(outcome);
                self.shared.bus.publish(DisplayEvent::LayoutFailed { cycle, error: error.clone() });
                Err(error)
            }
        }
    }

    /// Block until the pass in flight (if any) has finished
    pub fn wait_idle(&self) -> Option<DisplayOutcome> {
        self.supervisor.wait().or_else(|| self.last_outcome())
    }

    /// Cancel the pass in flight without starting another
    pub fn cancel(&self) -> Option<DisplayOutcome> {
        self.supervisor.cancel()
    }

    pub fn is_layout_running(&self) -> bool {
        self.supervisor.is_running()
    }

    fn start_cycle(&self, cycle: u64, cancel: CancelToken, focus: Option<String>) -> LayoutResult<JoinHandle<DisplayOutcome>> {
        let snapshot = self.model.layout_snapshot();
        let cells = snapshot.len();

        self.shared.set_state(cycle, DisplayState::LayoutRunning);
        self.shared.bus.publish(DisplayEvent::LayoutStarted { cycle, cells });
        info!(view = %self.config.name, cycle, cells, "layout started");

        let worker = {
            let engine = Arc::clone(&self.engine);
            let cancel = cancel.clone();
            thread::Builder::new()
                .name(self.config.layout_thread_name())
                .spawn(move || engine.layout(&snapshot, &cancel))
                .map_err(|e| LayoutError::WorkerSpawn(e.to_string()))?
        };

        let stop = cancel.clone();
        let finalizer = Finalizer {
            cycle,
            cancel,
            focus,
            model: Arc::clone(&self.model),
            handler: Arc::clone(&self.focus),
            shared: Arc::clone(&self.shared),
            view: self.config.name.clone(),
        };
        thread::Builder::new()
            .name(FINALIZER_THREAD_NAME.to_string())
            .spawn(move || finalizer.run(worker))
            .map_err(|e| {
                // nobody will join the worker now
                stop.cancel();
                LayoutError::WorkerSpawn(e.to_string())
            })
    }
}

impl Drop for DisplayCoordinator {
    fn drop(&mut self) {
        self.supervisor.cancel();
    }
}

/// Joins a layout worker and applies its result
struct Finalizer {
    cycle: u64,
    cancel: CancelToken,
    focus: Option<String>,
    model: Arc<GraphModel>,
    handler: Arc<dyn FocusHandler>,
    shared: Arc<Shared>,
    view: String,
}

impl Finalizer {
    fn run(self, worker: JoinHandle<LayoutResult<LayoutRun>>) -> DisplayOutcome {
        let cycle = self.cycle;
        let result = worker.join().unwrap_or(Err(LayoutError::WorkerPanicked));

        let (outcome, event) = match result {
            Ok(LayoutRun::Completed(layout)) if !self.cancel.is_cancelled() => {
                self.shared.set_state(cycle, DisplayState::Finalizing);
                let positioned = layout.len();
                *self.shared.positions.write() = layout.positions;
                if let Some(id) = &self.focus {
                    self.handler.focus_commit(id);
                }
                self.model.reconcile();
                info!(view = %self.view, cycle, positioned, "layout finalized");
                (
                    DisplayOutcome::Finalized { cycle, positioned },
                    DisplayEvent::Finalized { cycle, positioned, focus: self.focus.clone() },
                )
            }
            Ok(_) => {
                debug!(view = %self.view, cycle, "layout cancelled, results discarded");
                (DisplayOutcome::Cancelled { cycle }, DisplayEvent::LayoutCancelled { cycle })
            }
            Err(error) => {
                warn!(view = %self.view, cycle, %error, "layout failed, delta left pending");
                (
                    DisplayOutcome::Failed { cycle, error: error.clone() },
                    DisplayEvent::LayoutFailed { cycle, error },
                )
            }
        };

        *self.shared.last_outcome.lock() = Some(outcome.clone());
        self.shared.set_state(cycle, DisplayState::Idle);
        self.shared.bus.publish(event);
        outcome
    }
}
