//! Zero-crossing estimation.
//!
//! The error curve is steepest around its zero crossing, so the estimator
//! finds the index of the largest discrete gradient, fits a line to the
//! points around it, and solves the line for zero. Estimates outside the
//! measured span or below zero indicate an unreliable fit and are rejected
//! rather than clamped.

use log::debug;

use crate::data::curve::ErrorCurve;
use crate::error::{AlignResult, OverlapError};

/// Points taken on each side of the steepest index for the local fit.
const FIT_SPREAD: usize = 3;

/// Discrete gradient with unit spacing: central differences inside,
/// one-sided differences at the ends.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mut grad = Vec::with_capacity(n);
    grad.push(values[1] - values[0]);
    for i in 1..n - 1 {
        grad.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    grad.push(values[n - 1] - values[n - 2]);
    grad
}

/// Index of the largest value, first occurrence on ties.
fn argmax(values: &[f64]) -> usize {
    let mut index = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, &value) in values.iter().enumerate() {
        if value > best {
            best = value;
            index = i;
        }
    }
    index
}

/// Least-squares line through (x, y), in centered form for stability.
fn fit_line(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        covariance += (x - x_mean) * (y - y_mean);
        variance += (x - x_mean) * (x - x_mean);
    }

    let slope = covariance / variance;
    let intercept = y_mean - slope * x_mean;
    (slope, intercept)
}

/// Estimate the delay at which the error curve crosses zero.
///
/// Fits a line to up to [`FIT_SPREAD`] points on each side of the steepest
/// ascent (clipped to the curve bounds) and solves it for zero. Fails with
/// [`OverlapError::FitRange`] when the estimate is non-finite or outside
/// the measured delay span, and with [`OverlapError::FitSign`] when it is
/// negative.
pub fn find_zero_crossing(curve: &ErrorCurve) -> AlignResult<f64> {
    if curve.len() < 2 {
        return Err(OverlapError::Processing(format!(
            "error curve has {} samples, need at least 2 to fit",
            curve.len()
        )));
    }

    let delays = curve.delays();
    let errors = curve.errors();

    // The most sensitive region is where the error changes fastest.
    let grad = gradient(&errors);
    let center = argmax(&grad);

    let fit_start = center.saturating_sub(FIT_SPREAD);
    let fit_end = (center + FIT_SPREAD).min(delays.len());
    let (slope, intercept) = fit_line(&delays[fit_start..fit_end], &errors[fit_start..fit_end]);

    let zero = -intercept / slope;
    debug!(
        "fit over [{fit_start}, {fit_end}): slope {slope:e}, intercept {intercept:e}, zero {zero:e} s"
    );

    let (span_low, span_high) = (delays[0], delays[delays.len() - 1]);
    if !zero.is_finite() || zero < span_low || zero > span_high {
        return Err(OverlapError::FitRange {
            estimate: zero,
            span_low,
            span_high,
        });
    }
    if zero < 0.0 {
        return Err(OverlapError::FitSign { estimate: zero });
    }

    Ok(zero)
}
