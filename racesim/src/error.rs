use thiserror::Error;

/// ConfigError is returned if a race setup does not fulfill the posed requirements. It is raised
/// before the first round is simulated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("a race needs at least one participant")]
    NoParticipants,

    #[error("total distance must be a positive finite number, but is {0}")]
    InvalidTotalDistance(f64),

    #[error("full endurance must be a positive finite number, but is {0}")]
    InvalidEndurance(f64),

    #[error("participant {uuid} has invalid speed bounds [{min_speed}, {max_speed}]")]
    InvalidSpeed {
        uuid: String,
        min_speed: f64,
        max_speed: f64,
    },

    #[error("participant {0} was entered more than once")]
    DuplicateParticipant(String),

    #[error("participant {0} is not in the roster")]
    UnknownParticipant(String),

    #[error("race engine was already started")]
    AlreadyStarted,
}
