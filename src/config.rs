use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use num_traits::Float;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::math::constant;
use crate::{Error, Result};

/// A named triple of calibration distances, `X1 < X2 < X3`
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CalibrationPointSet<E> {
    pub name: String,
    pub points: [E; 3],
}

impl<E: Float> CalibrationPointSet<E> {
    pub fn new(name: impl Into<String>, points: [E; 3]) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Distance between the first and last calibration point
    pub fn range_span(&self) -> E {
        self.points[2] - self.points[0]
    }

    /// Check the points are finite, non-negative and strictly increasing
    ///
    /// # Errors
    /// Returns [`Error::InvalidScenario`] describing the first violated condition.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidScenario {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("the scenario name is empty"));
        }
        if self.points.iter().any(|point| !point.is_finite()) {
            return Err(invalid("calibration points must be finite"));
        }
        if self.points[0] < E::zero() {
            return Err(invalid("calibration points must not be negative"));
        }
        if !(self.points[0] < self.points[1] && self.points[1] < self.points[2]) {
            return Err(invalid("calibration points must be strictly increasing"));
        }
        Ok(())
    }
}

/// The scenarios of the calibration range study, `Standard` being the reference
pub fn default_scenarios<E: Float>() -> Vec<CalibrationPointSet<E>> {
    [
        ("Standard", [1.0, 2.0, 3.0]),
        ("Wide-1", [0.5, 2.0, 3.5]),
        ("Wide-2", [0.5, 1.75, 3.0]),
        ("Short", [0.5, 1.5, 2.5]),
        ("Far-1", [1.5, 2.25, 3.0]),
        ("Far-2", [1.5, 2.5, 3.5]),
        ("Mid", [1.5, 2.15, 2.8]),
    ]
    .into_iter()
    .map(|(name, points)| CalibrationPointSet::new(name, points.map(constant)))
    .collect()
}

/// Run configuration, read from a TOML file
///
/// Only `data` is required:
///
/// ```toml
/// data = "summary.csv"
/// columns = ["B", "C", "D", "E"]
/// reference = "Standard"
///
/// [[scenario]]
/// name = "Standard"
/// points = [1.0, 2.0, 3.0]
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
#[serde(bound(deserialize = "E: Float + Deserialize<'de>"))]
pub struct Config<E> {
    /// CSV export of the measurement sheet. Relative paths are resolved against the directory of
    /// the configuration file.
    pub data: PathBuf,
    /// Spreadsheet letter of the distance column
    #[serde(default = "default_distance_column")]
    pub distance_column: String,
    /// Spreadsheet letters of the sensor columns. Every column after the distance column when
    /// omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Zero-based row holding the sensor names
    #[serde(default = "default_name_row")]
    pub name_row: usize,
    /// Zero-based index of the first row of measurements
    #[serde(default = "default_data_start_row")]
    pub data_start_row: usize,
    /// Samples further than this (mm) are discarded on load
    #[serde(default = "default_max_distance")]
    pub max_distance: E,
    /// Name of the scenario improvements are measured against
    #[serde(default = "default_reference")]
    pub reference: String,
    /// When set, only samples inside `[lo, hi]` (mm) are scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_window: Option<[E; 2]>,
    #[serde(rename = "scenario", default = "default_scenarios")]
    pub scenarios: Vec<CalibrationPointSet<E>>,
}

fn default_distance_column() -> String {
    "A".to_owned()
}

const fn default_name_row() -> usize {
    1
}

const fn default_data_start_row() -> usize {
    2
}

fn default_max_distance<E: Float>() -> E {
    constant(4.0)
}

fn default_reference() -> String {
    "Standard".to_owned()
}

impl<E: Float> Config<E> {
    /// A configuration with every default in place, reading from `data`
    pub fn new(data: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            distance_column: default_distance_column(),
            columns: None,
            name_row: default_name_row(),
            data_start_row: default_data_start_row(),
            max_distance: default_max_distance(),
            reference: default_reference(),
            scoring_window: None,
            scenarios: default_scenarios(),
        }
    }

    /// Look up a configured scenario by name
    ///
    /// # Errors
    /// Returns [`Error::UnknownScenario`] if no scenario carries `name`.
    pub fn scenario(&self, name: &str) -> Result<&CalibrationPointSet<E>> {
        self.scenarios
            .iter()
            .find(|scenario| scenario.name == name)
            .ok_or_else(|| Error::UnknownScenario(name.to_owned()))
    }

    pub fn reference_scenario(&self) -> Result<&CalibrationPointSet<E>> {
        self.scenario(&self.reference)
    }

    /// Check the configuration is internally consistent
    ///
    /// # Errors
    /// - [`Error::NoScenarios`] if the scenario list is empty
    /// - [`Error::InvalidScenario`] for malformed or duplicated scenarios
    /// - [`Error::UnknownScenario`] if the reference is not a configured scenario
    /// - [`Error::InvalidWindow`] for a scoring window which is not an ordered, finite pair
    pub fn validate(&self) -> Result<()> {
        if self.scenarios.is_empty() {
            return Err(Error::NoScenarios);
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !seen.insert(scenario.name.as_str()) {
                return Err(Error::InvalidScenario {
                    name: scenario.name.clone(),
                    reason: "the scenario name is used more than once".to_owned(),
                });
            }
        }

        self.reference_scenario()?;

        if let Some([lo, hi]) = self.scoring_window {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::InvalidWindow(
                    "the window must be two finite distances in increasing order".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

impl<E: Float + DeserializeOwned> Config<E> {
    /// Read and validate a configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML for a [`Config`] or fails
    /// [`Config::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        if config.data.is_relative() {
            if let Some(parent) = path.parent() {
                config.data = parent.join(&config.data);
            }
        }

        config.validate()?;
        info!(
            "read configuration from {path:?}: {} scenarios, reference `{}`",
            config.scenarios.len(),
            config.reference
        );
        Ok(config)
    }
}
