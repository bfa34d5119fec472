//! Threshold calibration from labelled scores.
//!
//! Score held-out genuine attempts (enrolled speaker, correct phrase) and
//! impostor attempts with the engine to be tuned, then pass both sets to
//! [`midpoint`]. The result goes into `decision.margin_threshold` or
//! `decision.distance_threshold`.

use crate::Polarity;

/// Threshold halfway between the worst genuine score and the best impostor
/// score.
///
/// Returns `None` when either set has no finite score or the sets overlap.
pub fn midpoint(genuine: &[f64], impostor: &[f64], polarity: Polarity) -> Option<f64> {
    let finite = |v: &[f64]| -> Vec<f64> { v.iter().copied().filter(|x| x.is_finite()).collect() };
    let (genuine, impostor) = (finite(genuine), finite(impostor));
    if genuine.is_empty() || impostor.is_empty() {
        return None;
    }

    let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);

    let (worst_genuine, best_impostor, separable) = match polarity {
        Polarity::Higher => {
            let (g, i) = (min(&genuine), max(&impostor));
            (g, i, g > i)
        }
        Polarity::Lower => {
            let (g, i) = (max(&genuine), min(&impostor));
            (g, i, g < i)
        }
    };
    separable.then(|| (worst_genuine + best_impostor) / 2.0)
}
