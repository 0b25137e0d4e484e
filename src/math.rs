use std::fmt::{Debug, Display, LowerExp};
use std::str::FromStr;

use itertools::Itertools;
use ndarray::Array1;
use num_traits::{Float, FromPrimitive, NumCast};

/// The floating point types samples, fits and scores are computed in.
///
/// Anything which can be parsed from a spreadsheet cell, printed in a report and averaged by
/// `ndarray` qualifies; in practice `f32` and `f64`.
pub trait Real: Float + FromPrimitive + FromStr + Debug + Display + LowerExp {}

impl<T: Float + FromPrimitive + FromStr + Debug + Display + LowerExp> Real for T {}

/// Convert an `f64` literal into the working float type.
///
/// # Panics
///
/// Panics if `value` cannot be represented by `E`. Every tolerance and literal in this crate is a
/// small finite `f64`, which every [`Float`] implementation in the ecosystem can represent, so in
/// practice this never happens.
pub(crate) fn constant<E: Float>(value: f64) -> E {
    <E as NumCast>::from(value).expect("f64 literal must be representable in `E`")
}

/// Piecewise-linear interpolation of `fp` sampled at the ascending abscissae `xp`
///
/// Outside the sampled range the nearest edge value is returned, rather than extrapolating the
/// outermost segment. Returns `None` for an empty table or a non-comparable `x`.
///
/// # Examples
///
/// ```
/// use range_calibration::math::interpolate;
///
/// let xp = [1., 2., 4.];
/// let fp = [10., 20., 0.];
///
/// assert_eq!(interpolate(1.5, &xp, &fp), Some(15.));
/// assert_eq!(interpolate(3., &xp, &fp), Some(10.));
/// assert_eq!(interpolate(0., &xp, &fp), Some(10.));
/// assert_eq!(interpolate(9., &xp, &fp), Some(0.));
/// ```
pub fn interpolate<E: Float>(x: E, xp: &[E], fp: &[E]) -> Option<E> {
    let (&first, &last) = (xp.first()?, xp.last()?);
    if x <= first {
        return fp.first().copied();
    }
    if x >= last {
        return fp.last().copied();
    }

    xp.iter()
        .zip(fp)
        .tuple_windows()
        .find(|(lower, upper)| *lower.0 <= x && x <= *upper.0 && *upper.0 > *lower.0)
        .map(|((x0, y0), (x1, y1))| *y0 + (x - *x0) * (*y1 - *y0) / (*x1 - *x0))
}

/// Mean and population standard deviation (zero degrees of freedom removed)
///
/// Returns `None` when `values` is empty.
///
/// # Examples
///
/// ```
/// use ndarray::arr1;
/// use range_calibration::math::mean_and_std;
///
/// let (mean, std): (f64, f64) = mean_and_std(&arr1(&[2., 4., 4., 4., 5., 5., 7., 9.])).unwrap();
/// assert!((mean - 5.).abs() < 1e-12);
/// assert!((std - 2.).abs() < 1e-12);
/// ```
pub fn mean_and_std<E: Float + FromPrimitive>(values: &Array1<E>) -> Option<(E, E)> {
    let mean = values.mean()?;
    Some((mean, values.std(E::zero())))
}
