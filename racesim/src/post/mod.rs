pub mod leaderboard;
pub mod race_result;
pub mod recorder;
pub mod scoring;
