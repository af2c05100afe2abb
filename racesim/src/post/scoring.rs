use serde::{Deserialize, Serialize};

/// ScoringMode selects the formula that turns a finish into points.
///
/// * `Weighted` - (finished_count - place + 1) * 10 + round(100 * distance / total_distance)
///   + round(10 * (max_speed - min_speed) / 2)
/// * `Simple` - finished_count - place + 1 (legacy formula)
///
/// In both modes a participant without a place scores 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    Weighted,
    Simple,
}

impl Default for ScoringMode {
    fn default() -> Self {
        ScoringMode::Weighted
    }
}

/// score returns the points a participant earns in one race.
pub fn score(
    mode: ScoringMode,
    place: Option<u32>,
    finished_count: u32,
    distance: f64,
    total_distance: f64,
    min_speed: f64,
    max_speed: f64,
) -> i64 {
    let place = match place {
        Some(place) if place >= 1 && place <= finished_count => place,
        _ => return 0,
    };
    let rank_points = (finished_count - place + 1) as i64;

    match mode {
        ScoringMode::Simple => rank_points,
        ScoringMode::Weighted => {
            let distance_points = if total_distance > 0.0 {
                (100.0 * distance / total_distance).round() as i64
            } else {
                0
            };
            let spread_points = (10.0 * (max_speed - min_speed) / 2.0).round() as i64;
            rank_points * 10 + distance_points + spread_points
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_scores_by_rank() {
        assert_eq!(score(ScoringMode::Simple, Some(1), 3, 30.0, 25.0, 1.0, 9.0), 3);
        assert_eq!(score(ScoringMode::Simple, Some(3), 3, 30.0, 25.0, 1.0, 9.0), 1);
    }

    #[test]
    fn weighted_adds_distance_and_spread() {
        // base (2 - 1 + 1) * 10 = 20, distance round(100 * 30 / 25) = 120, spread round(10 * 3 / 2) = 15
        assert_eq!(score(ScoringMode::Weighted, Some(1), 2, 30.0, 25.0, 7.0, 10.0), 155);
        // base 10, distance 100, spread 0
        assert_eq!(score(ScoringMode::Weighted, Some(2), 2, 25.0, 25.0, 5.0, 5.0), 110);
    }

    #[test]
    fn weighted_rounds_half_away_from_zero() {
        // spread 10 * 0.25 / 2 = 1.25 -> 1, distance 100 * 12.5 / 100 = 12.5 -> 13
        assert_eq!(score(ScoringMode::Weighted, Some(1), 1, 12.5, 100.0, 1.0, 1.25), 24);
    }

    #[test]
    fn unplaced_participants_score_nothing() {
        assert_eq!(score(ScoringMode::Weighted, None, 3, 20.0, 25.0, 1.0, 9.0), 0);
        assert_eq!(score(ScoringMode::Simple, None, 3, 20.0, 25.0, 1.0, 9.0), 0);
        assert_eq!(score(ScoringMode::Simple, Some(4), 3, 30.0, 25.0, 1.0, 9.0), 0);
    }

    #[test]
    fn mode_is_read_from_lowercase_json() {
        let mode: ScoringMode = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(mode, ScoringMode::Simple);
        assert_eq!(ScoringMode::default(), ScoringMode::Weighted);
    }
}
