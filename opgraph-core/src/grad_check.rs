//! Numerical verification of generated gradients.
//!
//! Compares the analytic gradient of a parameter (from a backward-inclusive
//! run) with the central difference
//! `(f(p + ε) - f(p - ε)) / 2ε` of a scalar output, element by element.

use approx::relative_eq;

use crate::engine::Engine;
use crate::error::OpGraphError;
use crate::graph::grad_name;

/// Outcome of a gradient check.
#[derive(Debug, Clone, PartialEq)]
pub struct GradCheckReport {
    pub param: String,
    /// Flat indices of the checked elements.
    pub indices: Vec<usize>,
    pub analytic: Vec<f32>,
    pub numeric: Vec<f32>,
    pub relative_errors: Vec<f32>,
    pub mean_relative_error: f32,
    pub max_relative_error: f32,
}

impl GradCheckReport {
    /// True when every checked element agrees within `max_relative`
    /// (or within `epsilon` absolutely, for near-zero gradients).
    pub fn all_close(&self, epsilon: f32, max_relative: f32) -> bool {
        self.analytic
            .iter()
            .zip(self.numeric.iter())
            .all(|(a, n)| relative_eq!(*a, *n, epsilon = epsilon, max_relative = max_relative))
    }
}

fn relative_error(analytic: f32, numeric: f32) -> f32 {
    let scale = analytic.abs().max(numeric.abs());
    if scale <= f32::EPSILON {
        return 0.0;
    }
    (analytic - numeric).abs() / scale
}

/// Index one past the op that produces `output` in the forward program.
fn forward_end(engine: &Engine, output: &str) -> Result<usize, OpGraphError> {
    let id = engine.graph().lookup(output)?;
    engine
        .graph()
        .ops()
        .iter()
        .position(|op| op.outputs.contains(&Some(id)))
        .map(|index| index + 1)
        .ok_or_else(|| OpGraphError::InternalError(format!("no op produces '{}'", output)))
}

fn scalar_output(engine: &Engine, output: &str) -> Result<f32, OpGraphError> {
    let values = engine.read_f32(output)?;
    values.first().copied().ok_or_else(|| OpGraphError::NonScalarLoss {
        name: output.to_string(),
        dims: vec![0],
    })
}

/// Checks every element of `param`. See [`check_gradient_elements`].
pub fn check_gradient(
    engine: &mut Engine,
    param: &str,
    output: &str,
    epsilon: f32,
) -> Result<GradCheckReport, OpGraphError> {
    let len = engine.graph().var_by_name(param)?.numel();
    let indices: Vec<usize> = (0..len).collect();
    check_gradient_elements(engine, param, output, epsilon, &indices)
}

/// Checks the listed flat elements of `param` against the scalar `output`.
///
/// The graph must already contain the gradient ops of `output` and no
/// optimizer ops. Buffers are used as they are: fill inputs and parameters
/// before calling. The parameter is restored afterwards.
pub fn check_gradient_elements(
    engine: &mut Engine,
    param: &str,
    output: &str,
    epsilon: f32,
    indices: &[usize],
) -> Result<GradCheckReport, OpGraphError> {
    let end = forward_end(engine, output)?;

    engine.reset_gradients()?;
    engine.run()?;
    let analytic_all = engine.read_f32(&grad_name(param))?;
    let original = engine.read_f32(param)?;

    let mut analytic = Vec::with_capacity(indices.len());
    let mut numeric = Vec::with_capacity(indices.len());
    let mut perturbed = original.clone();
    for &i in indices {
        let value = *original.get(i).ok_or_else(|| OpGraphError::IndexOutOfBounds {
            index: i as i64,
            size: original.len(),
            operation: format!("check_gradient({})", param),
        })?;

        perturbed[i] = value + epsilon;
        engine.write_f32(param, &perturbed)?;
        engine.run_ops(0..end)?;
        let high = scalar_output(engine, output)?;

        perturbed[i] = value - epsilon;
        engine.write_f32(param, &perturbed)?;
        engine.run_ops(0..end)?;
        let low = scalar_output(engine, output)?;

        perturbed[i] = value;
        analytic.push(analytic_all[i]);
        numeric.push((high - low) / (2.0 * epsilon));
    }
    engine.write_f32(param, &original)?;

    let relative_errors: Vec<f32> = analytic
        .iter()
        .zip(numeric.iter())
        .map(|(&a, &n)| relative_error(a, n))
        .collect();
    let mean_relative_error = if relative_errors.is_empty() {
        0.0
    } else {
        relative_errors.iter().sum::<f32>() / relative_errors.len() as f32
    };
    let max_relative_error = relative_errors.iter().copied().fold(0.0, f32::max);
    log::info!(
        "Gradient check of '{}' over {} element(s): mean relative error {}, max {}",
        param,
        indices.len(),
        mean_relative_error,
        max_relative_error
    );

    Ok(GradCheckReport {
        param: param.to_string(),
        indices: indices.to_vec(),
        analytic,
        numeric,
        relative_errors,
        mean_relative_error,
        max_relative_error,
    })
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
