//! Classification error: fraction of rows whose argmax differs from the label.
//! Evaluation only; no gradient is registered.

use crate::attr::AttrMap;
use crate::device::StorageDevice;
use crate::error::OpGraphError;
use crate::graph::VariableAttr;
use crate::ops::cross_entropy::{check_prob_and_labels, label_index};
use crate::ops::{check_arity, check_numel, required, set_dims};
use crate::registry::{OpMeta, OpRegistry};
use crate::tensor::Tensor;

pub const ERROR_RATE: &str = "error_rate";

pub(crate) fn register(registry: &mut OpRegistry) {
    registry.register(
        OpMeta::new(ERROR_RATE, error_rate_shape).with_kernel(StorageDevice::CPU, error_rate_kernel),
    );
}

fn error_rate_shape(
    inputs: &[Option<VariableAttr>],
    outputs: &mut [Option<VariableAttr>],
) -> Result<(), OpGraphError> {
    check_arity(inputs, 2, 2, ERROR_RATE, "inputs")?;
    check_arity(outputs, 1, 1, ERROR_RATE, "outputs")?;
    let p = required(inputs, 0, ERROR_RATE, "input")?;
    let labels = required(inputs, 1, ERROR_RATE, "input")?;
    check_prob_and_labels(p, labels, ERROR_RATE)?;
    set_dims(outputs, 0, vec![1, 1]);
    Ok(())
}

/// Index of the first maximum of `row`.
fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (j, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = j;
        }
    }
    best
}

fn error_rate_kernel(
    inputs: &[Option<Tensor>],
    outputs: &[Option<Tensor>],
    _attrs: &AttrMap,
) -> Result<(), OpGraphError> {
    let p = required(inputs, 0, ERROR_RATE, "input")?;
    let labels = required(inputs, 1, ERROR_RATE, "input")?;
    let out = required(outputs, 0, ERROR_RATE, "output")?;
    let (n, c) = check_prob_and_labels(p.attr(), labels.attr(), ERROR_RATE)?;
    check_numel(p, n * c, ERROR_RATE)?;
    check_numel(out, 1, ERROR_RATE)?;
    if n == 0 || c == 0 {
        return out.fill(0.0f32);
    }

    let wrong = {
        let p_guard = p.read_data()?;
        let p = p_guard.as_slice::<f32>()?;
        let l_guard = labels.read_data()?;
        let labels = l_guard.as_slice::<i32>()?;
        let mut wrong = 0usize;
        for (row, &label) in p.chunks(c).zip(labels.iter()) {
            if argmax(row) != label_index(label, c, ERROR_RATE)? {
                wrong += 1;
            }
        }
        wrong
    };
    out.fill(wrong as f32 / n as f32)
}

#[cfg(test)]
#[path = "error_rate_test.rs"]
mod tests;
