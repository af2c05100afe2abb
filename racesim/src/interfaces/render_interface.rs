use crate::core::control::EnginePhase;
use crate::post::race_result::RaceResult;
use helpers::general::{argmax, argsort, SortOrder};

/// Maximum number of snapshots per second a presentation layer is expected to handle.
pub const MAX_RENDER_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantState {
    pub uuid: String,
    pub name: String,
    pub distance: f64,
    // fraction of the track covered, clamped to the finish line
    pub track_pos: f64,
    pub endurance: f64,
    pub resting: bool,
    pub finished: bool,
    pub place: Option<u32>,
}

/// RaceState is the plain snapshot handed from the race task to the presentation layer once per
/// round. `participant_states` keeps the stored (lane) order of the race.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceState {
    pub round: u32,
    pub phase: EnginePhase,
    pub total_distance: f64,
    pub participant_states: Vec<ParticipantState>,

    // final results payload (sent once when the race is completed)
    pub final_result: Option<RaceResult>,
}

impl RaceState {
    /// display_order returns the participant indices in standings order: finishers by place,
    /// then everybody else by distance covered. Ties keep the lane order.
    pub fn display_order(&self) -> Vec<usize> {
        let keys: Vec<(u8, f64)> = self
            .participant_states
            .iter()
            .map(|p| match p.place {
                Some(place) => (1, -(place as f64)),
                None => (0, p.distance),
            })
            .collect();

        argsort(&keys, SortOrder::Descending)
    }

    /// leader returns the participant furthest down the track.
    pub fn leader(&self) -> Option<&ParticipantState> {
        let distances: Vec<f64> = self.participant_states.iter().map(|p| p.distance).collect();
        argmax(&distances).map(|idx| &self.participant_states[idx])
    }
}
