//! Scoring of a fitted calibration against a sensor's full measurement set.
//!
//! Every reading is converted back to a distance and compared with the distance it was measured
//! at. The mean error is removed before scoring: a constant offset is an artefact of where the
//! anchors happened to sit, what matters is how well the curve follows the shape of the data.

use ndarray::Array1;

use crate::calibration::FitResult;
use crate::dataset::SensorSample;
use crate::math::Real;

/// Accuracy of one calibration over one sample
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Evaluation<E> {
    Scored {
        /// Root mean square of the bias-removed distance errors
        rms_error: E,
        /// Coefficient of determination of the bias-removed predictions
        r_squared: E,
    },
    /// No reading could be inverted, either because the fit is degenerate or because every
    /// reading lies outside the model's domain.
    NoValidPoints,
}

impl<E: Real> Evaluation<E> {
    pub const fn is_scored(&self) -> bool {
        matches!(self, Self::Scored { .. })
    }

    /// The RMS error, `+inf` when nothing could be scored
    pub fn rms_error(&self) -> E {
        match self {
            Self::Scored { rms_error, .. } => *rms_error,
            Self::NoValidPoints => E::infinity(),
        }
    }

    /// The R² score, `-1` when nothing could be scored
    pub fn r_squared(&self) -> E {
        match self {
            Self::Scored { r_squared, .. } => *r_squared,
            Self::NoValidPoints => -E::one(),
        }
    }
}

/// Score `fit` against every sample in `sample`
///
/// Readings the fit cannot invert are dropped individually; only when none remain is the result
/// [`Evaluation::NoValidPoints`]. R² is reported as zero for a sample at a single distance.
pub fn evaluate<E: Real>(sample: &SensorSample<E>, fit: &FitResult<E>) -> Evaluation<E> {
    let (actual, predicted): (Vec<E>, Vec<E>) = sample
        .distances()
        .iter()
        .zip(sample.readings())
        .filter_map(|(&distance, &reading)| {
            fit.predict_distance(reading)
                .distance()
                .map(|predicted| (distance, predicted))
        })
        .unzip();

    let actual = Array1::from(actual);
    let predicted = Array1::from(predicted);

    let errors = &predicted - &actual;
    let (Some(mean_error), Some(mean_actual)) = (errors.mean(), actual.mean()) else {
        return Evaluation::NoValidPoints;
    };
    let squared_errors = errors.mapv(|error| (error - mean_error).powi(2));

    let Some(mean_squared_error) = squared_errors.mean() else {
        return Evaluation::NoValidPoints;
    };
    let rms_error = mean_squared_error.sqrt();

    let residual_sum_of_squares = squared_errors.sum();
    let total_sum_of_squares = actual.mapv(|distance| (distance - mean_actual).powi(2)).sum();
    let r_squared = if total_sum_of_squares.is_zero() {
        E::zero()
    } else {
        E::one() - residual_sum_of_squares / total_sum_of_squares
    };

    Evaluation::Scored {
        rms_error,
        r_squared,
    }
}
