pub mod control;
pub mod handle_race;
pub mod participant;
pub mod race;
pub mod speed_draw;
