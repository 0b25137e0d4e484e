#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod calibration;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod math;
pub mod report;
pub mod scenario;
pub mod summary;

pub use error::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
