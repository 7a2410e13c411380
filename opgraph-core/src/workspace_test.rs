use super::*;
use crate::types::DType;

#[test]
fn test_one_buffer_per_name() {
    let mut ws = Workspace::new();
    let attr = VariableAttr::new("X", vec![4, 3], DType::F32, false);
    let first = ws.get_or_create_buffer(&attr).unwrap();
    let second = ws.get_or_create_buffer(&attr).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(ws.len(), 1);
}

#[test]
fn test_buffer_follows_descriptor_dims() {
    let mut ws = Workspace::new();
    let mut attr = VariableAttr::new("X", vec![4, 3], DType::F32, false);
    ws.get_or_create_buffer(&attr).unwrap();
    assert_eq!(ws.read_f32("X").unwrap().len(), 12);

    attr.dims = vec![2, 3];
    let buffer = ws.get_or_create_buffer(&attr).unwrap();
    assert_eq!(buffer.read().unwrap().len(), 6);
    assert!(buffer.read().unwrap().capacity() >= 12);
}

#[test]
fn test_dtype_conflict() {
    let mut ws = Workspace::new();
    ws.get_or_create_buffer(&VariableAttr::new("L", vec![4], DType::I32, false))
        .unwrap();
    assert!(matches!(
        ws.get_or_create_buffer(&VariableAttr::new("L", vec![4], DType::F32, false)),
        Err(OpGraphError::BufferTypeMismatch { .. })
    ));
}

#[test]
fn test_tensor_requires_existing_buffer_of_right_size() {
    let mut ws = Workspace::new();
    let mut attr = VariableAttr::new("X", vec![2, 2], DType::F32, false);
    assert_eq!(
        ws.tensor(&attr).unwrap_err(),
        OpGraphError::MissingBuffer("X".to_string())
    );

    ws.get_or_create_buffer(&attr).unwrap();
    assert!(ws.tensor(&attr).is_ok());

    attr.dims = vec![3, 2];
    assert!(matches!(
        ws.tensor(&attr),
        Err(OpGraphError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_read_write_roundtrip_through_tensor() {
    let mut ws = Workspace::new();
    let attr = VariableAttr::new("label", vec![3], DType::I32, false);
    let tensor = ws.get_tensor(&attr).unwrap();
    ws.write_i32("label", &[2, 0, 1]).unwrap();
    assert_eq!(tensor.to_vec::<i32>().unwrap(), vec![2, 0, 1]);
    assert!(ws.write_i32("label", &[1, 2]).is_err());
    assert!(ws.write_f32("label", &[1.0, 2.0, 3.0]).is_err());
}
