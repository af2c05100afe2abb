use crate::core::race::RacePars;
use crate::post::leaderboard::LeaderboardOrder;
use crate::post::scoring::ScoringMode;
use crate::pre::read_sim_pars::read_race_pars;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Track length used when neither a parameter file nor `--total-distance` is given.
pub const DEFAULT_TOTAL_DISTANCE: f64 = 100.0;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "hare-race",
    about = "A tick-based animal race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging (prints every round of every participant)
    #[clap(short, long, global = true)]
    pub debug: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set directory holding the roster and the race result files
    #[clap(long, default_value = "data", global = true)]
    pub data_dir: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create the data directory and an empty roster
    Init,

    /// Add a participant to the roster
    Add {
        /// Display name of the participant
        name: String,
        /// Minimum distance covered per round
        min_speed: f64,
        /// Maximum distance covered per round
        max_speed: f64,
    },

    /// Run a race and record its result
    Race(RaceOpts),

    /// Show the roster sorted by score, name or UUID
    Leaderboard {
        /// Set sort order
        #[clap(short, long, value_enum, default_value = "score")]
        sort: LeaderboardOrder,
    },

    /// List previously recorded races
    Races {
        /// Only show races finished by this participant (UUID or part of the name)
        #[clap(short = 'u', long)]
        participant: Option<String>,
    },
}

#[derive(Debug, Args, Clone)]
pub struct RaceOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Simulate as fast as possible without real-time pacing
    #[clap(long)]
    pub headless: bool,

    /// Read control commands from stdin: p = pause, r = resume, e = end
    #[clap(short, long)]
    pub interactive: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to a JSON race parameter file
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set distance from start to finish line (overrides the parameter file)
    #[clap(short = 'l', long)]
    pub total_distance: Option<f64>,

    /// Add a participant by UUID, can be repeated (default: whole roster)
    #[clap(short = 'u', long = "participant")]
    pub participants: Vec<String>,

    /// Set scoring formula (overrides the parameter file)
    #[clap(short, long, value_enum)]
    pub scoring: Option<ScoringMode>,

    /// Set real-time pause between two rounds in milliseconds (overrides the parameter file)
    #[clap(short, long)]
    pub tick_interval_ms: Option<u64>,

    /// Seed the random source to replay a race
    #[clap(long)]
    pub seed: Option<u64>,
}

impl RaceOpts {
    /// race_pars reads the parameter file (if any) and applies the command line overrides.
    pub fn race_pars(&self) -> anyhow::Result<RacePars> {
        let mut pars = match &self.parfile_path {
            Some(path) => read_race_pars(path)?,
            None => RacePars::new(DEFAULT_TOTAL_DISTANCE),
        };

        if let Some(total_distance) = self.total_distance {
            pars.total_distance = total_distance;
        }
        if !self.participants.is_empty() {
            pars.participants = self.participants.to_owned();
        }
        if let Some(scoring) = self.scoring {
            pars.scoring = scoring;
        }
        if let Some(tick_interval_ms) = self.tick_interval_ms {
            pars.tick_interval_ms = tick_interval_ms;
        }

        Ok(pars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_flags_override_defaults() {
        let opts = SimOpts::parse_from(&[
            "hare-race", "--data-dir", "/tmp/x", "race", "-l", "42", "-u", "a", "-u", "b", "-s", "simple",
        ]);
        assert_eq!(opts.data_dir, PathBuf::from("/tmp/x"));

        let race_opts = match opts.command {
            Command::Race(race_opts) => race_opts,
            other => panic!("unexpected command {:?}", other),
        };
        let pars = race_opts.race_pars().unwrap();
        assert_eq!(pars.total_distance, 42.0);
        assert_eq!(pars.participants, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(pars.scoring, ScoringMode::Simple);
        assert_eq!(pars.tick_interval_ms, 100);
    }

    #[test]
    fn leaderboard_defaults_to_score() {
        let opts = SimOpts::parse_from(&["hare-race", "leaderboard"]);
        assert!(matches!(
            opts.command,
            Command::Leaderboard { sort: LeaderboardOrder::Score }
        ));
        assert_eq!(opts.data_dir, PathBuf::from("data"));
    }
}
