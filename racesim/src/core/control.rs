use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Lifecycle of one race engine. Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnginePhase {
    Idle,
    Running,
    Paused,
    Completed,
}

impl Default for EnginePhase {
    fn default() -> Self {
        EnginePhase::Idle
    }
}

#[derive(Debug, Default)]
struct ControlState {
    phase: Mutex<EnginePhase>,
    changed: Condvar,
}

/// RaceController is the only piece of race state written by the foreground. Clones share the same
/// state, so it can be handed to an input thread while the race task keeps its own copy.
#[derive(Debug, Clone, Default)]
pub struct RaceController {
    state: Arc<ControlState>,
}

impl RaceController {
    pub fn new() -> RaceController {
        RaceController::default()
    }

    pub fn phase(&self) -> EnginePhase {
        *self.lock()
    }

    /// Running -> Paused. Once this returns no round is being simulated.
    pub fn pause(&self) -> bool {
        self.transition(|phase| matches!(phase, EnginePhase::Running), EnginePhase::Paused)
    }

    /// Paused -> Running.
    pub fn resume(&self) -> bool {
        self.transition(|phase| matches!(phase, EnginePhase::Paused), EnginePhase::Running)
    }

    /// Running or Paused -> Completed. A race task sleeping between rounds wakes up right away.
    pub fn end(&self) -> bool {
        self.transition(
            |phase| matches!(phase, EnginePhase::Running | EnginePhase::Paused),
            EnginePhase::Completed,
        )
    }

    pub(crate) fn begin(&self) -> bool {
        self.transition(|phase| matches!(phase, EnginePhase::Idle), EnginePhase::Running)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, EnginePhase> {
        // the guarded value is a plain enum, a panicking holder cannot leave it half-written
        self.state
            .phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parks the caller while the race is paused.
    pub(crate) fn wait_while_paused<'a>(
        &self,
        guard: MutexGuard<'a, EnginePhase>,
    ) -> MutexGuard<'a, EnginePhase> {
        self.state
            .changed
            .wait_while(guard, |phase| *phase == EnginePhase::Paused)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps for one tick interval unless the race is ended in the meantime.
    pub(crate) fn wait_tick<'a>(
        &self,
        guard: MutexGuard<'a, EnginePhase>,
        tick_interval: Duration,
    ) -> MutexGuard<'a, EnginePhase> {
        match self
            .state
            .changed
            .wait_timeout_while(guard, tick_interval, |phase| {
                *phase != EnginePhase::Completed
            }) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    pub(crate) fn notify(&self) {
        self.state.changed.notify_all();
    }

    fn transition(&self, allowed: impl Fn(EnginePhase) -> bool, target: EnginePhase) -> bool {
        let mut phase = self.lock();
        if !allowed(*phase) {
            return false;
        }
        *phase = target;
        drop(phase);
        self.notify();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_state_machine() {
        let ctrl = RaceController::new();
        assert_eq!(ctrl.phase(), EnginePhase::Idle);
        assert!(!ctrl.pause());
        assert!(!ctrl.end());

        assert!(ctrl.begin());
        assert!(!ctrl.begin());
        assert!(!ctrl.resume());
        assert!(ctrl.pause());
        assert_eq!(ctrl.phase(), EnginePhase::Paused);
        assert!(ctrl.resume());
        assert!(ctrl.end());
        assert_eq!(ctrl.phase(), EnginePhase::Completed);

        assert!(!ctrl.resume());
        assert!(!ctrl.pause());
        assert!(!ctrl.end());
    }

    #[test]
    fn clones_share_the_phase() {
        let ctrl = RaceController::new();
        let remote = ctrl.clone();
        ctrl.begin();
        remote.pause();
        assert_eq!(ctrl.phase(), EnginePhase::Paused);
    }
}
