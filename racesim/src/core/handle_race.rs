use crate::core::control::{EnginePhase, RaceController};
use crate::core::participant::Participant;
use crate::core::race::{Race, RaceOutcome, RacePars};
use crate::core::speed_draw::SpeedDraw;
use crate::error::ConfigError;
use crate::interfaces::render_interface::RaceState;
use chrono::Local;
use flume::{Receiver, Sender};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// handle_race creates a race on the basis of the inserted parameters, simulates it to the end
/// without real-time pacing and returns the outcome. If a sender is inserted, the state after
/// every round and the final state are sent through it.
pub fn handle_race(
    race_pars: &RacePars,
    participants: Vec<Participant>,
    draw: &mut dyn SpeedDraw,
    tx: Option<&Sender<RaceState>>,
) -> Result<RaceOutcome, ConfigError> {
    let mut race = Race::new(race_pars, participants)?;
    info!(
        "Simulating race {} with {} participants over {}",
        race.race_id,
        race.participants.len(),
        race.total_distance
    );

    while !race.get_all_finished() {
        race.simulate_round(draw);
        if let Some(tx) = tx {
            // a receiver that went away must not stop the race
            let _ = tx.send(race.get_race_state(EnginePhase::Running));
        }
    }

    let mut final_state = race.get_race_state(EnginePhase::Completed);
    let outcome = race.finish(Local::now());
    info!(
        "Race {} finished after {} rounds",
        outcome.result.race_id, outcome.result.rounds
    );

    if let Some(tx) = tx {
        final_state.final_result = Some(outcome.result.to_owned());
        let _ = tx.send(final_state);
    }

    Ok(outcome)
}

/// RaceEngine runs one race on a background thread, one round per tick interval, while the caller
/// keeps control through pause, resume and end. Every round's state is published to each
/// subscriber's own channel and to a latest-state slot; the last message carries the final result.
///
/// An engine runs exactly one race. Dropping a running engine ends the race and waits for the
/// thread.
#[derive(Debug)]
pub struct RaceEngine {
    controller: RaceController,
    latest: Arc<Mutex<RaceState>>,
    subscribers: Arc<Mutex<Vec<Sender<RaceState>>>>,
    worker: Option<JoinHandle<RaceOutcome>>,
}

impl Default for RaceEngine {
    fn default() -> Self {
        RaceEngine::new()
    }
}

impl RaceEngine {
    pub fn new() -> RaceEngine {
        RaceEngine {
            controller: RaceController::new(),
            latest: Arc::new(Mutex::new(RaceState::default())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            worker: None,
        }
    }

    /// start validates the race setup and launches the race thread. The first round is simulated
    /// right away.
    pub fn start(
        &mut self,
        race_pars: &RacePars,
        participants: Vec<Participant>,
        draw: Box<dyn SpeedDraw>,
    ) -> Result<(), ConfigError> {
        if self.controller.phase() != EnginePhase::Idle {
            return Err(ConfigError::AlreadyStarted);
        }
        let race = Race::new(race_pars, participants)?;
        let tick_interval = Duration::from_millis(race_pars.tick_interval_ms);

        *lock_or_recover(&self.latest) = race.get_race_state(EnginePhase::Running);
        if !self.controller.begin() {
            return Err(ConfigError::AlreadyStarted);
        }
        info!(
            "Starting race {} with {} participants over {}",
            race.race_id,
            race.participants.len(),
            race.total_distance
        );

        let controller = self.controller.clone();
        let latest = Arc::clone(&self.latest);
        let subscribers = Arc::clone(&self.subscribers);
        self.worker = Some(thread::spawn(move || {
            run_race_loop(race, draw, controller, latest, subscribers, tick_interval)
        }));

        Ok(())
    }

    pub fn pause(&self) -> bool {
        self.controller.pause()
    }

    pub fn resume(&self) -> bool {
        self.controller.resume()
    }

    pub fn end(&self) -> bool {
        self.controller.end()
    }

    pub fn phase(&self) -> EnginePhase {
        self.controller.phase()
    }

    /// controller returns a handle that can pause, resume or end the race from another thread.
    pub fn controller(&self) -> RaceController {
        self.controller.clone()
    }

    /// snapshot returns the most recently published race state.
    pub fn snapshot(&self) -> RaceState {
        lock_or_recover(&self.latest).to_owned()
    }

    /// subscribe opens a new state channel. The receiver gets every state published from now on,
    /// independent of other subscribers. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> Receiver<RaceState> {
        let (tx, rx) = flume::unbounded();
        lock_or_recover(&self.subscribers).push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        lock_or_recover(&self.subscribers).len()
    }

    /// join waits until the race is completed and returns its outcome.
    pub fn join(&mut self) -> anyhow::Result<RaceOutcome> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| anyhow::anyhow!("Race engine was never started or already joined!"))?;
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("Race thread panicked!"))
    }
}

impl Drop for RaceEngine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.controller.end();
            let _ = worker.join();
        }
    }
}

fn run_race_loop(
    mut race: Race,
    mut draw: Box<dyn SpeedDraw>,
    controller: RaceController,
    latest: Arc<Mutex<RaceState>>,
    subscribers: Arc<Mutex<Vec<Sender<RaceState>>>>,
    tick_interval: Duration,
) -> RaceOutcome {
    let mut phase = controller.lock();

    loop {
        match *phase {
            EnginePhase::Paused => phase = controller.wait_while_paused(phase),
            EnginePhase::Running => {
                race.simulate_round(draw.as_mut());
                publish(&latest, &subscribers, race.get_race_state(*phase));

                if race.get_all_finished() {
                    *phase = EnginePhase::Completed;
                    break;
                }

                phase = controller.wait_tick(phase, tick_interval);
            }
            EnginePhase::Idle | EnginePhase::Completed => break,
        }
    }

    drop(phase);
    controller.notify();

    if !race.get_all_finished() {
        info!(
            "Race {} ended after {} rounds with {} of {} participants finished",
            race.race_id,
            race.get_completed_rounds(),
            race.get_finished_count(),
            race.participants.len()
        );
    }

    let mut final_state = race.get_race_state(EnginePhase::Completed);
    let outcome = race.finish(Local::now());
    final_state.final_result = Some(outcome.result.to_owned());
    publish(&latest, &subscribers, final_state);
    // no more states will follow, receivers see a disconnect once drained
    lock_or_recover(&subscribers).clear();

    outcome
}

/// publish hands the state to every subscriber and stores it as the latest one. Subscribers whose
/// receiver is gone are dropped.
fn publish(
    latest: &Mutex<RaceState>,
    subscribers: &Mutex<Vec<Sender<RaceState>>>,
    race_state: RaceState,
) {
    lock_or_recover(subscribers).retain(|tx| tx.send(race_state.to_owned()).is_ok());
    *lock_or_recover(latest) = race_state;
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
