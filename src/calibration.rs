//! Three-point exponential calibration of decaying-reading distance sensors.
//!
//! The sensors report a reading which falls with target distance, modelled as
//!
//! $$
//!     S\left(x\right) = A e^{-B x} + C
//! $$
//!
//! Three anchor pairs fix the three parameters in closed form, and the model is inverted to turn
//! a raw reading back into a distance.

use std::fmt::Display;

use log::warn;
use num_traits::Float;

use crate::math::constant;

/// Magnitude below which the denominators of the closed-form solution are treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// The fitted curve `reading = amplitude * exp(-decay_rate * distance) + offset`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialModel<E> {
    /// `A`, the reading swing between zero and infinite distance
    pub amplitude: E,
    /// `B`, the decay rate per unit distance. Positive for this sensor class.
    pub decay_rate: E,
    /// `C`, the reading approached at infinite distance
    pub offset: E,
}

/// Outcome of inverting a model for one reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Prediction<E> {
    Distance(E),
    /// The reading lies outside the range the model can invert, or the model is degenerate.
    OutOfDomain,
}

impl<E: Copy> Prediction<E> {
    pub const fn distance(&self) -> Option<E> {
        match self {
            Self::Distance(distance) => Some(*distance),
            Self::OutOfDomain => None,
        }
    }
}

impl<E: Float> ExponentialModel<E> {
    /// The reading the model expects at `distance`
    pub fn reading_at(&self, distance: E) -> E {
        self.amplitude * (-self.decay_rate * distance).exp() + self.offset
    }

    /// Invert the model, `distance = -ln((reading - C) / A) / B`
    ///
    /// A zero amplitude or decay rate, or a reading on the far side of the asymptote `C`, cannot
    /// be inverted and gives [`Prediction::OutOfDomain`].
    pub fn predict_distance(&self, reading: E) -> Prediction<E> {
        if self.amplitude.is_zero() || self.decay_rate.is_zero() {
            return Prediction::OutOfDomain;
        }

        let argument = (reading - self.offset) / self.amplitude;
        if argument.is_nan() || argument <= E::zero() {
            return Prediction::OutOfDomain;
        }

        let distance = -argument.ln() / self.decay_rate;
        if distance.is_finite() {
            Prediction::Distance(distance)
        } else {
            Prediction::OutOfDomain
        }
    }

    /// The parameters as an `(A, B, C)` triple
    pub const fn parameters(&self) -> (E, E, E) {
        (self.amplitude, self.decay_rate, self.offset)
    }
}

/// Why a closed-form fit produced no usable model
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DegenerateFit {
    /// The quadratic in `exp(B)` has no real root.
    NegativeDiscriminant,
    /// `S2 - S3` vanishes, so the quadratic cannot be normalised.
    SingularSystem,
    /// Neither root gives a finite, positive decay rate.
    NoPositiveDecay,
    /// `exp(-B X1) - exp(-B X3)` vanishes, so the amplitude is undetermined.
    SingularAmplitude,
}

impl Display for DegenerateFit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::NegativeDiscriminant => "negative discriminant",
            Self::SingularSystem => "singular system (S2 == S3)",
            Self::NoPositiveDecay => "no positive decay rate",
            Self::SingularAmplitude => "singular amplitude denominator",
        };
        write!(f, "{reason}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FitResult<E> {
    Valid(ExponentialModel<E>),
    Degenerate(DegenerateFit),
}

impl<E: Float> FitResult<E> {
    pub const fn model(&self) -> Option<&ExponentialModel<E>> {
        match self {
            Self::Valid(model) => Some(model),
            Self::Degenerate(_) => None,
        }
    }

    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// `(A, B, C)`, reported as `(0, 0, 0)` for a degenerate fit
    pub fn parameters(&self) -> (E, E, E) {
        self.model()
            .map_or((E::zero(), E::zero(), E::zero()), ExponentialModel::parameters)
    }

    /// Invert the fit for one reading. Every reading is out of domain for a degenerate fit.
    pub fn predict_distance(&self, reading: E) -> Prediction<E> {
        self.model()
            .map_or(Prediction::OutOfDomain, |model| model.predict_distance(reading))
    }
}

/// Fit an [`ExponentialModel`] through three anchor `readings` taken at `distances`
///
/// Readings and distances are paired index-wise and the distances are expected to be strictly
/// increasing. With `term1 = S1 - S3`, `term2 = S2 - S3` and `term3 = S1 - S2` the decay rate is
/// the logarithm of a root of
///
/// $$
///     \text{term2}\, u^2 - \text{term1}\, u + \text{term3} = 0,
/// $$
///
/// after which the amplitude and offset follow directly. The root is taken as `ln(u)` without
/// rescaling by the anchor spacing, so `B` is the true decay rate only for unit-spaced anchors.
///
/// Readings which do not decrease with distance are logged as a warning, the fit is still
/// attempted.
pub fn fit<E: Float + Display>(readings: [E; 3], distances: [E; 3]) -> FitResult<E> {
    let [s1, s2, s3] = readings;
    let [x1, x2, x3] = distances;

    if s1 < s2 || s2 < s3 {
        warn!(
            "sensor readings should decrease with distance: S1={s1:.1} at {x1}mm, \
             S2={s2:.1} at {x2}mm, S3={s3:.1} at {x3}mm"
        );
    }

    let term1 = s1 - s3;
    let term2 = s2 - s3;
    let term3 = s1 - s2;

    let discriminant = term1.powi(2) - constant::<E>(4.) * term2 * term3;
    if discriminant < E::zero() {
        return FitResult::Degenerate(DegenerateFit::NegativeDiscriminant);
    }

    let denominator = constant::<E>(2.) * term2;
    if denominator.abs() < constant(SINGULAR_TOLERANCE) {
        return FitResult::Degenerate(DegenerateFit::SingularSystem);
    }

    let root = discriminant.sqrt();
    let roots = [(term1 + root) / denominator, (term1 - root) / denominator];
    let Some(decay_rate) = select_decay_rate(roots) else {
        return FitResult::Degenerate(DegenerateFit::NoPositiveDecay);
    };

    let amplitude_denominator = (-decay_rate * x1).exp() - (-decay_rate * x3).exp();
    if amplitude_denominator.abs() < constant(SINGULAR_TOLERANCE) {
        return FitResult::Degenerate(DegenerateFit::SingularAmplitude);
    }

    let amplitude = term1 / amplitude_denominator;
    let offset = s2 - amplitude * (-decay_rate * x2).exp();

    FitResult::Valid(ExponentialModel {
        amplitude,
        decay_rate,
        offset,
    })
}

/// Pick the decay rate from the `[plus, minus]` roots of the quadratic
///
/// The first root, in order, whose logarithm is finite and positive wins. When both qualify the
/// `+` root is taken without comparing the quality of the two fits.
fn select_decay_rate<E: Float>(roots: [E; 2]) -> Option<E> {
    roots
        .into_iter()
        .filter(|root| *root > E::zero())
        .map(Float::ln)
        .find(|decay_rate| decay_rate.is_finite() && *decay_rate > E::zero())
}
