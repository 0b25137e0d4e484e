use log::{debug, info};

use crate::calibration::{fit, FitResult};
use crate::config::CalibrationPointSet;
use crate::dataset::{Dataset, SensorSample};
use crate::evaluate::{evaluate, Evaluation};
use crate::math::{constant, Real};
use crate::Result;

/// Distances are handled in millimetres and errors are reported in micrometres.
pub const MICROMETRES_PER_MILLIMETRE: f64 = 1000.;

/// One sensor calibrated with one set of points
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult<E> {
    pub scenario_name: String,
    pub sensor_name: String,
    pub points: [E; 3],
    pub fit: FitResult<E>,
    pub evaluation: Evaluation<E>,
    pub range_span: E,
}

impl<E: Real> ScenarioResult<E> {
    /// Bias-removed RMS distance error in mm, `+inf` if nothing could be scored
    pub fn rms_error(&self) -> E {
        self.evaluation.rms_error()
    }

    /// R² of the calibrated distances, `-1` if nothing could be scored
    pub fn r_squared(&self) -> E {
        self.evaluation.r_squared()
    }
}

/// Calibrate the sensor `sensor_name` with `scenario` and score the calibration
///
/// # Errors
/// Returns [`crate::Error::UnknownSensor`] if the sensor is not in `dataset`.
pub fn run_scenario<E: Real>(
    dataset: &Dataset<E>,
    sensor_name: &str,
    scenario: &CalibrationPointSet<E>,
    scoring_window: Option<[E; 2]>,
) -> Result<ScenarioResult<E>> {
    let sample = dataset.sample(sensor_name)?;
    Ok(evaluate_scenario(sample, scenario, scoring_window))
}

/// Calibrate `sample` with `scenario` and score the calibration
///
/// The anchor readings are interpolated from the whole sample. Scoring covers the whole sample
/// too, unless a `scoring_window` restricts it to `[lo, hi]`.
pub fn evaluate_scenario<E: Real>(
    sample: &SensorSample<E>,
    scenario: &CalibrationPointSet<E>,
    scoring_window: Option<[E; 2]>,
) -> ScenarioResult<E> {
    let readings = scenario.points.map(|distance| sample.reading_at(distance));
    debug!(
        "{} / {}: points {:?} -> readings {:?}",
        sample.name(),
        scenario.name,
        scenario.points,
        readings
    );

    let fit = fit(readings, scenario.points);
    match &fit {
        FitResult::Valid(model) => debug!(
            "{} / {}: A={:.2e}, B={:.6}, C={:.2e}",
            sample.name(),
            scenario.name,
            model.amplitude,
            model.decay_rate,
            model.offset
        ),
        FitResult::Degenerate(reason) => {
            debug!("{} / {}: degenerate fit, {reason}", sample.name(), scenario.name);
        }
    }

    let evaluation = match scoring_window {
        None => evaluate(sample, &fit),
        Some([lo, hi]) => sample
            .within(lo, hi)
            .map_or(Evaluation::NoValidPoints, |scored| evaluate(&scored, &fit)),
    };

    ScenarioResult {
        scenario_name: scenario.name.clone(),
        sensor_name: sample.name().to_owned(),
        points: scenario.points,
        fit,
        evaluation,
        range_span: scenario.range_span(),
    }
}

/// Evaluate every scenario on every sensor
///
/// Results are ordered by sensor, then by scenario, following the order of `dataset` and
/// `scenarios`.
///
/// # Errors
/// Propagates [`run_scenario`] errors, which only arise for a sensor missing from `dataset`.
pub fn run_all<E: Real>(
    dataset: &Dataset<E>,
    scenarios: &[CalibrationPointSet<E>],
    scoring_window: Option<[E; 2]>,
) -> Result<Vec<ScenarioResult<E>>> {
    info!(
        "running {} scenarios on {} sensors",
        scenarios.len(),
        dataset.len()
    );

    let mut results = Vec::with_capacity(dataset.len() * scenarios.len());
    for sensor_name in dataset.names() {
        info!("testing {sensor_name}");
        for scenario in scenarios {
            let result = run_scenario(dataset, sensor_name, scenario, scoring_window)?;
            info!(
                "  {:<8}: RMS={:.1}\u{3bc}m, R\u{b2}={:.4}",
                result.scenario_name,
                result.rms_error() * constant(MICROMETRES_PER_MILLIMETRE),
                result.r_squared()
            );
            results.push(result);
        }
    }

    info!("analysis complete, {} results", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::LN_2;

    use super::{evaluate_scenario, run_all, run_scenario};
    use crate::calibration::{ExponentialModel, FitResult};
    use crate::config::{default_scenarios, CalibrationPointSet};
    use crate::dataset::{Dataset, SensorSample};
    use crate::evaluate::Evaluation;
    use crate::{Error, Result};

    fn exponential_sample(name: &str, model: &ExponentialModel<f64>) -> Result<SensorSample<f64>> {
        let pairs = (1..=40)
            .map(|i| f64::from(i) * 0.1)
            .map(|distance| (distance, model.reading_at(distance)))
            .collect();
        SensorSample::new(name, pairs)
    }

    fn halving() -> ExponentialModel<f64> {
        ExponentialModel {
            amplitude: 2000.,
            decay_rate: LN_2,
            offset: 0.,
        }
    }

    #[test]
    fn unit_spaced_scenario_recovers_the_curve() -> Result<()> {
        let sample = exponential_sample("s", &halving())?;
        let scenario = CalibrationPointSet::new("Standard", [1., 2., 3.]);

        let result = evaluate_scenario(&sample, &scenario, None);

        let model = result.fit.model().expect("fit should be valid");
        approx::assert_relative_eq!(model.decay_rate, LN_2, max_relative = 1e-6);
        approx::assert_relative_eq!(model.amplitude, 2000., max_relative = 1e-4);
        approx::assert_abs_diff_eq!(result.rms_error(), 0., epsilon = 1e-4);
        approx::assert_relative_eq!(result.range_span, 2.);
        assert_eq!(result.sensor_name, "s");
        assert_eq!(result.scenario_name, "Standard");
        Ok(())
    }

    #[test]
    fn rising_sensor_is_recorded_not_aborted() -> Result<()> {
        let sample = SensorSample::new("rising", vec![(1., 100.), (2., 200.), (3., 300.)])?;
        let scenario = CalibrationPointSet::new("Standard", [1., 2., 3.]);

        let result = evaluate_scenario(&sample, &scenario, None);

        assert!(!result.fit.is_valid());
        assert_eq!(result.evaluation, Evaluation::NoValidPoints);
        assert_eq!(result.rms_error(), f64::INFINITY);
        assert_eq!(result.r_squared(), -1.);
        Ok(())
    }

    #[test]
    fn scoring_window_restricts_evaluation() -> Result<()> {
        let sample = exponential_sample("s", &halving())?;
        let scenario = CalibrationPointSet::new("Standard", [1., 2., 3.]);

        let windowed = evaluate_scenario(&sample, &scenario, Some([1.5, 3.0]));
        assert!(windowed.evaluation.is_scored());

        let outside = evaluate_scenario(&sample, &scenario, Some([10., 20.]));
        assert_eq!(outside.evaluation, Evaluation::NoValidPoints);
        Ok(())
    }

    #[test]
    fn unknown_sensor_halts() -> Result<()> {
        let dataset = Dataset::new(vec![exponential_sample("s", &halving())?])?;
        let scenario = CalibrationPointSet::new("Standard", [1., 2., 3.]);

        assert!(matches!(
            run_scenario(&dataset, "missing", &scenario, None),
            Err(Error::UnknownSensor(_))
        ));
        assert!(run_scenario(&dataset, "s", &scenario, None).is_ok());
        Ok(())
    }

    #[test]
    fn results_are_sensor_major_in_configuration_order() -> Result<()> {
        let other = ExponentialModel {
            amplitude: 1500.,
            decay_rate: 0.8,
            offset: 40.,
        };
        let dataset = Dataset::new(vec![
            exponential_sample("first", &halving())?,
            exponential_sample("second", &other)?,
        ])?;
        let scenarios = default_scenarios::<f64>();

        let results = run_all(&dataset, &scenarios, None)?;

        assert_eq!(results.len(), 2 * scenarios.len());
        for (result, (sensor, scenario)) in results.iter().zip(
            ["first", "second"]
                .iter()
                .flat_map(|sensor| scenarios.iter().map(move |scenario| (sensor, scenario))),
        ) {
            assert_eq!(result.sensor_name, *sensor);
            assert_eq!(result.scenario_name, scenario.name);
            assert_eq!(result.points, scenario.points);
            assert_eq!(*result, run_scenario(&dataset, sensor, scenario, None)?);
        }
        Ok(())
    }

    #[test]
    fn runs_are_independent_of_order() -> Result<()> {
        let dataset = Dataset::new(vec![exponential_sample("s", &halving())?])?;
        let scenarios = default_scenarios::<f64>();
        let reversed = scenarios.iter().rev().cloned().collect::<Vec<_>>();

        let forward = run_all(&dataset, &scenarios, None)?;
        let mut backward = run_all(&dataset, &reversed, None)?;
        backward.reverse();

        assert_eq!(forward, backward);
        Ok(())
    }

    #[test]
    fn degenerate_fits_report_zero_parameters() -> Result<()> {
        let sample = SensorSample::new("flat", vec![(1., 5.), (2., 5.), (3., 5.)])?;
        let scenario = CalibrationPointSet::new("Standard", [1., 2., 3.]);

        let result = evaluate_scenario(&sample, &scenario, None);

        assert!(matches!(result.fit, FitResult::Degenerate(_)));
        assert_eq!(result.fit.parameters(), (0., 0., 0.));
        Ok(())
    }
}
