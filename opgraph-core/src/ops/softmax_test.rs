use super::*;
use crate::test_utils::{attr_f32, tensor_f32, zeros_f32};
use approx::assert_relative_eq;

#[test]
fn test_softmax_rows_sum_to_one() {
    let x = tensor_f32("x", &[2, 3], &[1.0, 2.0, 3.0, -1.0, 0.0, 1.0]);
    let out = zeros_f32("p", &[2, 3]);
    softmax_kernel(&[Some(x)], &[Some(out.clone())], &AttrMap::new()).unwrap();
    let p = out.to_vec::<f32>().unwrap();
    for row in p.chunks(3) {
        assert_relative_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert!(row[0] < row[1] && row[1] < row[2]);
    }
    // Softmax is shift invariant, so both rows are equal.
    for j in 0..3 {
        assert_relative_eq!(p[j], p[3 + j], epsilon = 1e-6);
    }
    assert_relative_eq!(p[2], 0.665_241, epsilon = 1e-5);
}

#[test]
fn test_softmax_is_stable_for_large_logits() {
    let x = tensor_f32("x", &[1, 2], &[1000.0, 1000.0]);
    let out = zeros_f32("p", &[1, 2]);
    softmax_kernel(&[Some(x)], &[Some(out.clone())], &AttrMap::new()).unwrap();
    assert_eq!(out.to_vec::<f32>().unwrap(), vec![0.5, 0.5]);
}

#[test]
fn test_softmax_grad_kernel() {
    let p = tensor_f32("p", &[1, 2], &[0.25, 0.75]);
    let og = tensor_f32("og", &[1, 2], &[1.0, 0.0]);
    let ig = zeros_f32("ig", &[1, 2]);
    softmax_grad_kernel(&[Some(p), Some(og)], &[Some(ig.clone())], &AttrMap::new()).unwrap();
    // dot = 0.25; ig = [0.25 * 0.75, 0.75 * -0.25]
    let ig = ig.to_vec::<f32>().unwrap();
    assert_relative_eq!(ig[0], 0.1875);
    assert_relative_eq!(ig[1], -0.1875);
}

#[test]
fn test_softmax_grad_of_uniform_upstream_is_zero() {
    let p = tensor_f32("p", &[1, 3], &[0.2, 0.3, 0.5]);
    let og = tensor_f32("og", &[1, 3], &[2.0, 2.0, 2.0]);
    let ig = zeros_f32("ig", &[1, 3]);
    softmax_grad_kernel(&[Some(p), Some(og)], &[Some(ig.clone())], &AttrMap::new()).unwrap();
    for v in ig.to_vec::<f32>().unwrap() {
        assert_relative_eq!(v, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_softmax_shape_requires_matrix() {
    let mut outputs = vec![Some(attr_f32("p", &[]))];
    assert!(matches!(
        softmax_shape(&[Some(attr_f32("x", &[2, 3, 4]))], &mut outputs),
        Err(OpGraphError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_softmax_grad_shape_rejects_mismatch() {
    let mut outputs = vec![Some(attr_f32("ig", &[]))];
    assert!(matches!(
        softmax_grad_shape(
            &[Some(attr_f32("p", &[2, 3])), Some(attr_f32("og", &[2, 4]))],
            &mut outputs
        ),
        Err(OpGraphError::ShapeMismatch { .. })
    ));
}
