use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Analysis,
    Deletion,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Analysis => f.write_str("analysis"),
            OperationKind::Deletion => f.write_str("deletion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Analyzing,
    Deleting,
}

impl GateState {
    fn running(self) -> Option<OperationKind> {
        match self {
            GateState::Idle => None,
            GateState::Analyzing => Some(OperationKind::Analysis),
            GateState::Deleting => Some(OperationKind::Deletion),
        }
    }
}

/// Single-flight region shared by analysis and deletion. At most one of the
/// two runs at any time; the slot is released when the guard drops.
#[derive(Debug, Clone)]
pub struct OperationGate {
    state: Arc<Mutex<GateState>>,
}

impl Default for OperationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // Poisoning is ignored: the state is always a whole enum value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> GateState {
        *self.lock()
    }

    /// Enter the region for `kind`, or report what is already running.
    pub fn try_acquire(&self, kind: OperationKind) -> Result<GateGuard, OperationKind> {
        let mut state = self.lock();
        if let Some(running) = state.running() {
            return Err(running);
        }
        *state = match kind {
            OperationKind::Analysis => GateState::Analyzing,
            OperationKind::Deletion => GateState::Deleting,
        };
        debug!("Gate acquired for {}", kind);
        Ok(GateGuard {
            gate: self.clone(),
            kind,
        })
    }
}

#[derive(Debug)]
pub struct GateGuard {
    gate: OperationGate,
    kind: OperationKind,
}

impl GateGuard {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        *self.gate.lock() = GateState::Idle;
        debug!("Gate released after {}", self.kind);
    }
}
