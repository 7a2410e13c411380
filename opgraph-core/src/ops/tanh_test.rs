use super::*;
use crate::test_utils::{tensor_f32, zeros_f32};
use approx::assert_relative_eq;

#[test]
fn test_tanh_kernel_is_odd() {
    let x = tensor_f32("x", &[2, 2], &[0.0, 0.5, -0.5, 3.0]);
    let out = zeros_f32("o", &[2, 2]);
    tanh_kernel(&[Some(x)], &[Some(out.clone())], &AttrMap::new()).unwrap();
    let o = out.to_vec::<f32>().unwrap();
    assert_eq!(o[0], 0.0);
    assert_relative_eq!(o[1], -o[2]);
    assert_relative_eq!(o[3], 0.995_055, epsilon = 1e-6);
}

#[test]
fn test_tanh_grad_kernel() {
    let out = tensor_f32("o", &[1, 3], &[0.0, 0.5, -0.5]);
    let og = tensor_f32("og", &[1, 3], &[1.0, 2.0, 4.0]);
    let ig = zeros_f32("ig", &[1, 3]);
    tanh_grad_kernel(&[Some(out), Some(og)], &[Some(ig.clone())], &AttrMap::new()).unwrap();
    assert_eq!(ig.to_vec::<f32>().unwrap(), vec![1.0, 1.5, 3.0]);
}

#[test]
fn test_tanh_grad_kernel_length_mismatch() {
    let out = tensor_f32("o", &[1, 2], &[0.0, 0.5]);
    let og = tensor_f32("og", &[1, 3], &[1.0, 2.0, 4.0]);
    let ig = zeros_f32("ig", &[1, 2]);
    assert!(matches!(
        tanh_grad_kernel(&[Some(out), Some(og)], &[Some(ig)], &AttrMap::new()),
        Err(OpGraphError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_tanh_grad_ops_wires_output_and_grads() {
    let ids: Vec<VarId> = (0..4).map(VarId).collect();
    let ops = tanh_grad_ops(&[Some(ids[0])], &[Some(ids[1])], &[Some(ids[2])], &[Some(ids[3])]).unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].op_type, TANH_GRAD);
    assert_eq!(ops[0].inputs, vec![Some(ids[1]), Some(ids[2])]);
    assert_eq!(ops[0].outputs, vec![Some(ids[3])]);
}
