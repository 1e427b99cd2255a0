//! Interpolation over time-tagged samples.
//!
//! Both functions work on a slice of `(epoch, value)` samples sorted by epoch and restrict
//! themselves to the inclusive index range `first..=last` (the usable part of a segment).
//! Epochs are modified julian dates.
use nalgebra::DVector;

use crate::{constants::MJD, timecore_errors::TimeCoreError};

/// Matching tolerance for epochs: one millisecond, in days.
pub const EPOCH_MATCH_TOLERANCE: f64 = 1.0e-3 / 86400.0;

/// One time-tagged sample.
pub type Sample = (MJD, DVector<f64>);

/// Index of the first sample in `first..=last` strictly after `at`, or `last` if none is.
fn first_after(samples: &[Sample], first: usize, last: usize, at: MJD) -> usize {
    (first..=last)
        .find(|&i| samples[i].0 > at)
        .unwrap_or(last)
}

/// Lagrange interpolation of degree `degree` at epoch `at`.
///
/// The window of `degree + 1` consecutive samples starts just before the position of `at` and
/// slides forward while the distance between `at` and the middle of the window decreases.
///
/// Arguments
/// -----------------
/// * `samples`: Samples sorted by epoch.
/// * `first`, `last`: Inclusive usable index range.
/// * `degree`: Polynomial degree.
/// * `at`: Query epoch.
/// * `segment`: Segment number, for error messages.
///
/// Return
/// ----------
/// * The interpolated value, [`TimeCoreError::SegmentRange`] when `at` lies outside the usable
///   epochs (with [`EPOCH_MATCH_TOLERANCE`]), or [`TimeCoreError::SegmentSequencing`] when the
///   usable range holds `degree` samples or fewer.
pub fn lagrange_interpolate(
    samples: &[Sample],
    first: usize,
    last: usize,
    degree: usize,
    at: MJD,
    segment: usize,
) -> Result<DVector<f64>, TimeCoreError> {
    if samples.is_empty() || last >= samples.len() || first > last {
        return Err(TimeCoreError::SegmentSequencing {
            segment,
            message: "no usable data for LAGRANGE interpolation".into(),
        });
    }

    let min_epoch = samples[first].0;
    let max_epoch = samples[last].0;
    if at < min_epoch - EPOCH_MATCH_TOLERANCE || at > max_epoch + EPOCH_MATCH_TOLERANCE {
        return Err(TimeCoreError::SegmentRange {
            segment,
            message: format!(
                "requested epoch {at} for LAGRANGE interpolation is outside the usable range [{min_epoch}, {max_epoch}]"
            ),
        });
    }

    let num_states = last - first + 1;
    if degree >= num_states {
        return Err(TimeCoreError::SegmentSequencing {
            segment,
            message: format!(
                "insufficient usable data for LAGRANGE interpolation: degree {degree} with {num_states} points"
            ),
        });
    }

    let epoch_pos = first_after(samples, first, last, at);
    let init = if degree >= epoch_pos - first {
        first
    } else {
        epoch_pos - degree
    };

    // greedy centering of the window around `at`
    let mut start = init;
    let mut previous = f64::MAX;
    for i in init..=(last - degree) {
        let diff = ((samples[i].0 + samples[i + degree].0) / 2.0 - at).abs();
        if diff > previous {
            break;
        }
        start = i;
        previous = diff;
    }

    let window = &samples[start..=start + degree];
    let mut value = DVector::zeros(window[0].1.len());
    for (i, (ti, di)) in window.iter().enumerate() {
        let weight: f64 = window
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (tj, _))| (at - tj) / (ti - tj))
            .product();
        value += di * weight;
    }
    Ok(value)
}

/// Spherical linear interpolation between the two samples bracketing `at`.
///
/// The angle between the bracketing values is `asin(sqrt(1 - cos²))`, with `cos` their
/// normalized dot product clamped to `[-1, 1]`. It stays within `[0, π/2]`, so an obtuse pair
/// uses the supplementary angle. When the two values are (anti)parallel the result falls back to
/// a linear blend.
///
/// Return
/// ----------
/// * The interpolated value, [`TimeCoreError::SegmentRange`] when `at` lies outside
///   `[epoch(first), epoch(last)]`, or [`TimeCoreError::SegmentSequencing`] when fewer than two
///   usable samples exist.
pub fn slerp_interpolate(
    samples: &[Sample],
    first: usize,
    last: usize,
    at: MJD,
    segment: usize,
) -> Result<DVector<f64>, TimeCoreError> {
    if last >= samples.len() || first >= last {
        return Err(TimeCoreError::SegmentSequencing {
            segment,
            message: "SLERP interpolation needs two usable points".into(),
        });
    }

    let min_epoch = samples[first].0;
    let max_epoch = samples[last].0;
    if at < min_epoch || at > max_epoch {
        return Err(TimeCoreError::SegmentRange {
            segment,
            message: format!(
                "requested epoch {at} for SLERP interpolation is outside the usable range [{min_epoch}, {max_epoch}]"
            ),
        });
    }

    let pos = first_after(samples, first, last, at).max(first + 1);
    let (t1, d1) = &samples[pos - 1];
    let (t2, d2) = &samples[pos];
    let t = (at - t1) / (t2 - t1);

    let cos_omega = (d1.dot(d2) / (d1.norm() * d2.norm())).clamp(-1.0, 1.0);
    let sin_omega = (1.0 - cos_omega * cos_omega).sqrt();
    let omega = sin_omega.asin();

    if sin_omega.abs() < 1.0e-12 {
        return Ok(d1 * (1.0 - t) + d2 * t);
    }
    Ok((d1 * ((1.0 - t) * omega).sin() + d2 * (t * omega).sin()) / sin_omega)
}
