use crate::core::speed_draw::SpeedDraw;
use serde::Serialize;
use uuid::Uuid;

/// Speed that replaces any non-positive (or NaN) speed bound.
pub const MIN_SPEED_FALLBACK: f64 = 1.0;

/// Endurance regained per recovery round, as a multiple of the minimum speed.
pub const RECOVERY_FACTOR: f64 = 3.0;

/// * `uuid` - Opaque identity, matches the UUID column of the roster
/// * `name` - Display name, e.g. Hare
/// * `min_speed` - Lower bound of the distance covered per round
/// * `max_speed` - Upper bound of the distance covered per round
/// * `score` - Cumulative score over all recorded races
///
/// The remaining fields are transient race state and are reset by `prepare_for_race`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub uuid: String,
    pub name: String,
    pub min_speed: f64,
    pub max_speed: f64,
    pub score: i64,
    pub distance: f64,
    pub endurance: f64,
    pub resting: bool,
    pub finished: bool,
    pub place: Option<u32>,
}

/// What a participant did in one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Turn {
    Moved(f64),
    Collapsed,
    Recovered,
    Idle,
}

impl Participant {
    /// Creates a participant from stored values. Non-positive speed bounds are raised to
    /// `MIN_SPEED_FALLBACK` and swapped bounds are put back in order.
    pub fn new(uuid: &str, name: &str, min_speed: f64, max_speed: f64, score: i64) -> Participant {
        let mut min_speed = sanitize_speed(min_speed);
        let mut max_speed = sanitize_speed(max_speed);

        if min_speed > max_speed {
            std::mem::swap(&mut min_speed, &mut max_speed);
        }

        Participant {
            uuid: uuid.to_owned(),
            name: name.to_owned(),
            min_speed,
            max_speed,
            score,
            distance: 0.0,
            endurance: 0.0,
            resting: false,
            finished: false,
            place: None,
        }
    }

    /// Creates a brand-new participant with a random identity and zero score.
    pub fn create(name: &str, min_speed: f64, max_speed: f64) -> Participant {
        Participant::new(&Uuid::new_v4().to_string(), name, min_speed, max_speed, 0)
    }

    pub fn prepare_for_race(&mut self, full_endurance: f64) {
        self.distance = 0.0;
        self.endurance = full_endurance;
        self.resting = false;
        self.finished = false;
        self.place = None;
    }

    /// take_turn moves the participant by one round. A resting participant spends the round
    /// recovering. Otherwise a draw is taken; if it exhausts the endurance the participant
    /// collapses and does not move this round.
    pub fn take_turn(&mut self, draw: &mut dyn SpeedDraw) -> Turn {
        if self.finished {
            return Turn::Idle;
        }

        if self.resting {
            self.endurance += RECOVERY_FACTOR * self.min_speed;
            self.resting = false;
            return Turn::Recovered;
        }

        let advance = draw.draw(self.min_speed, self.max_speed);
        self.endurance -= advance;

        if self.endurance <= 0.0 {
            self.endurance = 0.0;
            self.resting = true;
            return Turn::Collapsed;
        }

        self.distance += advance;
        Turn::Moved(advance)
    }

    pub(crate) fn mark_finished(&mut self, place: u32) {
        self.finished = true;
        self.resting = false;
        self.place = Some(place);
    }
}

fn sanitize_speed(speed: f64) -> f64 {
    if speed > 0.0 {
        speed
    } else {
        MIN_SPEED_FALLBACK
    }
}
