use super::*;
use crate::test_utils::{attr_f32, tensor_f32, zeros_f32};
use approx::assert_relative_eq;

#[test]
fn test_sigmoid_kernel() {
    let x = tensor_f32("x", &[1, 3], &[0.0, 2.0, -2.0]);
    let out = zeros_f32("o", &[1, 3]);
    sigmoid_kernel(&[Some(x)], &[Some(out.clone())], &AttrMap::new()).unwrap();
    let o = out.to_vec::<f32>().unwrap();
    assert_relative_eq!(o[0], 0.5);
    assert_relative_eq!(o[1], 0.880_797, epsilon = 1e-6);
    assert_relative_eq!(o[1] + o[2], 1.0, epsilon = 1e-6);
}

#[test]
fn test_sigmoid_kernel_in_place() {
    let x = tensor_f32("x", &[1, 2], &[0.0, 0.0]);
    sigmoid_kernel(&[Some(x.clone())], &[Some(x.clone())], &AttrMap::new()).unwrap();
    assert_eq!(x.to_vec::<f32>().unwrap(), vec![0.5, 0.5]);
}

#[test]
fn test_sigmoid_grad_kernel() {
    let out = tensor_f32("o", &[1, 2], &[0.5, 0.25]);
    let og = tensor_f32("og", &[1, 2], &[2.0, 1.0]);
    let ig = zeros_f32("ig", &[1, 2]);
    sigmoid_grad_kernel(&[Some(out), Some(og)], &[Some(ig.clone())], &AttrMap::new()).unwrap();
    assert_eq!(ig.to_vec::<f32>().unwrap(), vec![0.5, 0.1875]);
}

#[test]
fn test_sigmoid_shape_copies_dims() {
    let mut outputs = vec![Some(attr_f32("o", &[]))];
    sigmoid_shape(&[Some(attr_f32("x", &[4, 7]))], &mut outputs).unwrap();
    assert_eq!(outputs[0].as_ref().unwrap().dims, vec![4, 7]);
}

#[test]
fn test_sigmoid_grad_ops_without_input_grad_is_empty() {
    let ids: Vec<VarId> = (0..3).map(VarId).collect();
    let ops = sigmoid_grad_ops(&[Some(ids[0])], &[Some(ids[1])], &[Some(ids[2])], &[None]).unwrap();
    assert!(ops.is_empty());
}
