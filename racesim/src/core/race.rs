use crate::core::control::EnginePhase;
use crate::core::participant::Participant;
use crate::core::speed_draw::SpeedDraw;
use crate::error::ConfigError;
use crate::interfaces::render_interface::{ParticipantState, RaceState};
use crate::post::race_result::{RaceResult, Standing};
use crate::post::scoring::{score, ScoringMode};
use chrono::{DateTime, Local};
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use uuid::Uuid;

pub const DEFAULT_FULL_ENDURANCE: f64 = 100.0;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// * `total_distance` - Distance from the start to the finish line
/// * `participants` - UUIDs of the roster entries taking part (empty = whole roster). Only used to
///   pick the entries from the roster (see `pre::roster::select_participants`); `Race::new` and
///   `RaceEngine::start` race exactly the participants they are handed
/// * `full_endurance` - Endurance every participant starts with
/// * `scoring` - Formula used to score the finishers
/// * `tick_interval_ms` - (ms) Real-time pause between two rounds
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RacePars {
    pub total_distance: f64,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default = "default_full_endurance")]
    pub full_endurance: f64,
    #[serde(default)]
    pub scoring: ScoringMode,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_full_endurance() -> f64 {
    DEFAULT_FULL_ENDURANCE
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl RacePars {
    pub fn new(total_distance: f64) -> RacePars {
        RacePars {
            total_distance,
            participants: Vec::new(),
            full_endurance: DEFAULT_FULL_ENDURANCE,
            scoring: ScoringMode::default(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// RaceOutcome is what a completed race hands over: the result to be persisted and the final
/// participant states (with their cumulative scores already raised by this race's points).
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    pub result: RaceResult,
    pub participants: Vec<Participant>,
    pub ended_early: bool,
}

#[derive(Debug)]
pub struct Race {
    pub race_id: String,
    pub total_distance: f64,
    pub full_endurance: f64,
    pub scoring: ScoringMode,
    cur_round: u32,
    finished_count: u32,
    next_place: u32,
    pub participants: Vec<Participant>,
}

impl Race {
    pub fn new(race_pars: &RacePars, participants: Vec<Participant>) -> Result<Race, ConfigError> {
        if participants.is_empty() {
            return Err(ConfigError::NoParticipants);
        }
        if !(race_pars.total_distance > 0.0 && race_pars.total_distance.is_finite()) {
            return Err(ConfigError::InvalidTotalDistance(race_pars.total_distance));
        }
        if !(race_pars.full_endurance > 0.0 && race_pars.full_endurance.is_finite()) {
            return Err(ConfigError::InvalidEndurance(race_pars.full_endurance));
        }

        let mut seen = HashSet::with_capacity(participants.len());
        for p in participants.iter() {
            let bounds_ok = p.min_speed > 0.0
                && p.max_speed.is_finite()
                && p.min_speed <= p.max_speed;
            if !bounds_ok {
                return Err(ConfigError::InvalidSpeed {
                    uuid: p.uuid.to_owned(),
                    min_speed: p.min_speed,
                    max_speed: p.max_speed,
                });
            }
            if !seen.insert(p.uuid.as_str()) {
                return Err(ConfigError::DuplicateParticipant(p.uuid.to_owned()));
            }
        }

        let mut race = Race {
            race_id: Uuid::new_v4().to_string(),
            total_distance: race_pars.total_distance,
            full_endurance: race_pars.full_endurance,
            scoring: race_pars.scoring,
            cur_round: 1,
            finished_count: 0,
            next_place: 1,
            participants,
        };

        for participant in race.participants.iter_mut() {
            participant.prepare_for_race(race.full_endurance);
        }

        Ok(race)
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_round moves every participant that has not finished yet, in stored order, and
    /// hands out places to those crossing the finish line.
    pub fn simulate_round(&mut self, draw: &mut dyn SpeedDraw) {
        for participant in self.participants.iter_mut() {
            if participant.finished {
                continue;
            }

            let turn = participant.take_turn(draw);
            debug!(
                "Round {}: {} {:?}, distance {:.2}, endurance {:.2}",
                self.cur_round, participant.name, turn, participant.distance, participant.endurance
            );

            if participant.distance >= self.total_distance {
                participant.mark_finished(self.next_place);
                self.next_place += 1;
                self.finished_count += 1;
            }
        }

        self.cur_round += 1;
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn get_all_finished(&self) -> bool {
        self.finished_count as usize == self.participants.len()
    }

    pub fn get_finished_count(&self) -> u32 {
        self.finished_count
    }

    pub fn get_completed_rounds(&self) -> u32 {
        self.cur_round - 1
    }

    pub fn get_race_state(&self, phase: EnginePhase) -> RaceState {
        RaceState {
            round: self.get_completed_rounds(),
            phase,
            total_distance: self.total_distance,
            participant_states: self
                .participants
                .iter()
                .map(|p| ParticipantState {
                    uuid: p.uuid.to_owned(),
                    name: p.name.to_owned(),
                    distance: p.distance,
                    track_pos: (p.distance / self.total_distance).min(1.0),
                    endurance: p.endurance,
                    resting: p.resting,
                    finished: p.finished,
                    place: p.place,
                })
                .collect(),
            final_result: None,
        }
    }

    /// finish scores the finishers, adds the points to their cumulative scores and returns the
    /// race outcome. Participants without a place are left out of the result.
    pub fn finish(mut self, recorded_at: DateTime<Local>) -> RaceOutcome {
        let mut standings = Vec::with_capacity(self.finished_count as usize);

        for participant in self.participants.iter_mut() {
            let place = match participant.place {
                Some(place) => place,
                None => continue,
            };
            let points = score(
                self.scoring,
                Some(place),
                self.finished_count,
                participant.distance,
                self.total_distance,
                participant.min_speed,
                participant.max_speed,
            );
            participant.score += points;

            standings.push(Standing {
                uuid: participant.uuid.to_owned(),
                place,
                distance: participant.distance,
                score: points,
            });
        }
        standings.sort_by_key(|standing| standing.place);

        let result = RaceResult::new(
            &self.race_id,
            self.total_distance,
            self.get_completed_rounds(),
            recorded_at,
            standings,
        );
        let ended_early = !self.get_all_finished();

        RaceOutcome {
            result,
            participants: self.participants,
            ended_early,
        }
    }
}
