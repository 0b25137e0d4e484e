//! Aggregation of per-sensor results into one summary per scenario.

use std::collections::HashMap;

use log::{info, warn};
use ndarray::Array1;

use crate::config::CalibrationPointSet;
use crate::math::{constant, mean_and_std, Real};
use crate::scenario::ScenarioResult;
use crate::{Error, Result};

/// Statistics of one scenario across every sensor it scored on
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioSummary<E> {
    pub scenario_name: String,
    pub points: [E; 3],
    /// Mean of the per-sensor RMS errors (mm)
    pub rms_mean: E,
    /// Population standard deviation of the per-sensor RMS errors (mm)
    pub rms_std: E,
    pub r2_mean: E,
    pub r2_std: E,
    /// Percentage reduction of the mean RMS error relative to the reference scenario
    ///
    /// Always `Some(0)` for the reference itself. `None` for the other scenarios when the
    /// reference has no non-zero mean to compare against.
    pub improvement_vs_ref: Option<E>,
    pub range_span: E,
    /// Number of sensors which produced a score
    pub scored: usize,
    /// Number of sensors with no valid points under this scenario
    pub failed: usize,
}

impl<E: Real> ScenarioSummary<E> {
    pub fn improves_on_reference(&self) -> bool {
        self.improvement_vs_ref
            .is_some_and(|improvement| improvement > E::zero())
    }
}

struct Accumulator<E> {
    rms: Vec<E>,
    r_squared: Vec<E>,
    failed: usize,
}

impl<E> Default for Accumulator<E> {
    fn default() -> Self {
        Self {
            rms: Vec::new(),
            r_squared: Vec::new(),
            failed: 0,
        }
    }
}

/// Summarize `results` for each of `scenarios`, in the order of `scenarios`
///
/// Only scored results with finite statistics contribute. A scenario without a single such result
/// is left out of the summary.
///
/// # Errors
/// Returns [`Error::UnknownScenario`] if `reference` is not one of `scenarios`, or if a result
/// names a scenario which is not configured.
pub fn summarize<E: Real>(
    results: &[ScenarioResult<E>],
    scenarios: &[CalibrationPointSet<E>],
    reference: &str,
) -> Result<Vec<ScenarioSummary<E>>> {
    if !scenarios.iter().any(|scenario| scenario.name == reference) {
        return Err(Error::UnknownScenario(reference.to_owned()));
    }

    let mut accumulators: HashMap<&str, Accumulator<E>> = scenarios
        .iter()
        .map(|scenario| (scenario.name.as_str(), Accumulator::default()))
        .collect();

    for result in results {
        let accumulator = accumulators
            .get_mut(result.scenario_name.as_str())
            .ok_or_else(|| Error::UnknownScenario(result.scenario_name.clone()))?;

        let (rms, r_squared) = (result.rms_error(), result.r_squared());
        if result.evaluation.is_scored() && rms.is_finite() && r_squared.is_finite() {
            accumulator.rms.push(rms);
            accumulator.r_squared.push(r_squared);
        } else {
            accumulator.failed += 1;
        }
    }

    let mut summaries = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let Some(accumulator) = accumulators.remove(scenario.name.as_str()) else {
            continue;
        };
        if accumulator.failed > 0 {
            warn!(
                "scenario `{}`: {} sensors had no valid points",
                scenario.name, accumulator.failed
            );
        }

        let scored = accumulator.rms.len();
        let (Some((rms_mean, rms_std)), Some((r2_mean, r2_std))) = (
            mean_and_std(&Array1::from(accumulator.rms)),
            mean_and_std(&Array1::from(accumulator.r_squared)),
        ) else {
            warn!("scenario `{}` was not scored on any sensor", scenario.name);
            continue;
        };

        summaries.push(ScenarioSummary {
            scenario_name: scenario.name.clone(),
            points: scenario.points,
            rms_mean,
            rms_std,
            r2_mean,
            r2_std,
            improvement_vs_ref: None,
            range_span: scenario.range_span(),
            scored,
            failed: accumulator.failed,
        });
    }

    let reference_mean = summaries
        .iter()
        .find(|summary| summary.scenario_name == reference)
        .map(|summary| summary.rms_mean);

    let hundred = constant::<E>(100.);
    match reference_mean {
        Some(mean) if mean.is_zero() => {
            warn!("reference scenario `{reference}` has zero error, improvements undefined");
        }
        Some(_) => {}
        None => warn!("reference scenario `{reference}` was not scored, improvements undefined"),
    }
    for summary in &mut summaries {
        summary.improvement_vs_ref = if summary.scenario_name == reference {
            Some(E::zero())
        } else {
            reference_mean
                .filter(|mean| !mean.is_zero())
                .map(|mean| (mean - summary.rms_mean) / mean * hundred)
        };
    }

    info!("summarized {} scenarios", summaries.len());
    Ok(summaries)
}
