use thiserror::Error;

/// Conditions which halt a run.
///
/// Numerical edge cases (degenerate fits, readings outside the invertible range, scenarios with
/// no scorable points) are not errors, they are carried as values through
/// [`crate::calibration::FitResult`] and [`crate::evaluate::Evaluation`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("sensor `{0}` appears more than once in the dataset")]
    DuplicateSensor(String),

    #[error("sensor `{0}` is not present in the dataset")]
    UnknownSensor(String),

    #[error("scenario `{0}` is not configured")]
    UnknownScenario(String),

    #[error("scenario `{name}` is invalid: {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("invalid spreadsheet column `{0}`")]
    InvalidColumn(String),

    #[error("sensor `{0}` has no usable samples")]
    EmptySample(String),

    #[error("invalid scoring window: {0}")]
    InvalidWindow(String),

    #[error("no sensors were loaded")]
    NoSensors,

    #[error("no calibration scenarios are configured")]
    NoScenarios,
}
