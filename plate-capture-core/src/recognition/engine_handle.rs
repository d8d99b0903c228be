use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::state::EngineState;
use crate::traits::vision_engine::VisionEngine;

/// Probe polled while an engine is loading. Returns the engine once it is usable.
pub type EngineLoader = Box<dyn Fn() -> Option<Arc<dyn VisionEngine>> + Send + Sync>;

/// Interval between loader polls while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct EngineSlot {
    state: EngineState,
    engine: Option<Arc<dyn VisionEngine>>,
    loader: Option<EngineLoader>,
}

impl EngineSlot {
    /// Run the loader probe once, if there is one and we are not ready yet.
    fn poll(&mut self) -> bool {
        if self.state == EngineState::Ready {
            return false;
        }
        let Some(engine) = self.loader.as_ref().and_then(|load| load()) else {
            return false;
        };
        log::info!("Vision engine '{}' reported ready", engine.name());
        self.engine = Some(engine);
        self.state = EngineState::Ready;
        self.loader = None;
        true
    }
}

struct Shared {
    slot: Mutex<EngineSlot>,
    changed: Condvar,
}

/// Shared, cloneable handle to an optionally-present vision engine.
///
/// Readiness arrives one of two ways, whichever the host offers:
/// - a one-shot notification, [`EngineHandle::provide`]
/// - a readiness probe polled while waiting, [`EngineHandle::with_loader`]
///
/// Both feed the same deadline-bounded [`EngineHandle::wait_ready`].
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

impl EngineHandle {
    fn from_slot(slot: EngineSlot) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(slot),
                changed: Condvar::new(),
            }),
        }
    }

    /// An engine that is still loading and will be provided later.
    pub fn loading() -> Self {
        Self::from_slot(EngineSlot {
            state: EngineState::Loading,
            engine: None,
            loader: None,
        })
    }

    /// An engine that is usable immediately.
    pub fn ready(engine: Arc<dyn VisionEngine>) -> Self {
        Self::from_slot(EngineSlot {
            state: EngineState::Ready,
            engine: Some(engine),
            loader: None,
        })
    }

    /// No engine on this host. `provide` may still promote it later.
    pub fn absent() -> Self {
        Self::from_slot(EngineSlot {
            state: EngineState::Unavailable,
            engine: None,
            loader: None,
        })
    }

    /// A loading engine whose readiness is discovered by polling `loader`.
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn VisionEngine>> + Send + Sync + 'static,
    {
        Self::from_slot(EngineSlot {
            state: EngineState::Loading,
            engine: None,
            loader: Some(Box::new(loader)),
        })
    }

    /// Readiness notification: install the engine and wake every waiter.
    pub fn provide(&self, engine: Arc<dyn VisionEngine>) {
        let mut slot = self.shared.slot.lock();
        log::info!("Vision engine '{}' provided", engine.name());
        slot.engine = Some(engine);
        slot.state = EngineState::Ready;
        slot.loader = None;
        drop(slot);
        self.shared.changed.notify_all();
    }

    /// The engine failed to load. Wakes waiters without waiting for their deadline.
    pub fn mark_unavailable(&self) {
        let mut slot = self.shared.slot.lock();
        if slot.state == EngineState::Ready {
            return;
        }
        slot.state = EngineState::Unavailable;
        drop(slot);
        self.shared.changed.notify_all();
    }

    pub fn state(&self) -> EngineState {
        let mut slot = self.shared.slot.lock();
        slot.poll();
        slot.state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    /// The engine, once ready.
    pub fn engine(&self) -> Option<Arc<dyn VisionEngine>> {
        let mut slot = self.shared.slot.lock();
        slot.poll();
        match slot.state {
            EngineState::Ready => slot.engine.clone(),
            _ => None,
        }
    }

    /// Block until the engine is ready, marked unavailable, or `timeout` elapses.
    ///
    /// Returns `Loading` on timeout.
    pub fn wait_ready(&self, timeout: Duration) -> EngineState {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            slot.poll();
            if slot.state != EngineState::Loading {
                return slot.state;
            }

            let now = Instant::now();
            if now >= deadline {
                return EngineState::Loading;
            }
            let wake_at = if slot.loader.is_some() {
                (now + POLL_INTERVAL).min(deadline)
            } else {
                deadline
            };
            self.shared.changed.wait_until(&mut slot, wake_at);
        }
    }
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::loading()
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("EngineHandle")
            .field("state", &slot.state)
            .field("engine", &slot.engine.as_ref().map(|e| e.name().to_string()))
            .field("has_loader", &slot.loader.is_some())
            .finish()
    }
}
