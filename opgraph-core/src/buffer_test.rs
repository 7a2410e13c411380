use super::*;

#[test]
fn test_zeros_has_requested_len_and_dtype() {
    let buf = Buffer::zeros("x", DType::F32, 6);
    assert_eq!(buf.len(), 6);
    assert_eq!(buf.dtype(), DType::F32);
    assert_eq!(buf.size_in_bytes(), 24);
    assert!(buf.as_slice::<f32>().unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn test_shrink_keeps_capacity() {
    let mut buf = Buffer::zeros("x", DType::F32, 100);
    let capacity = buf.capacity();
    buf.resize(10);
    assert_eq!(buf.len(), 10);
    assert_eq!(buf.capacity(), capacity);

    buf.resize(50);
    assert_eq!(buf.len(), 50);
    assert_eq!(buf.capacity(), capacity);
}

#[test]
fn test_grow_zero_fills_new_elements() {
    let mut buf = Buffer::zeros("label", DType::I32, 2);
    buf.as_mut_slice::<i32>().unwrap().copy_from_slice(&[7, 8]);
    buf.resize(4);
    assert_eq!(buf.as_slice::<i32>().unwrap(), &[7, 8, 0, 0]);
}

#[test]
fn test_wrong_element_type_is_an_error() {
    let buf = Buffer::zeros("label", DType::I32, 3);
    match buf.as_slice::<f32>() {
        Err(OpGraphError::BufferTypeMismatch {
            name,
            expected,
            actual,
        }) => {
            assert_eq!(name, "label");
            assert_eq!(expected, DType::F32);
            assert_eq!(actual, DType::I32);
        }
        other => panic!("Expected BufferTypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_fill_zero() {
    let mut buf = Buffer::zeros("w", DType::F32, 3);
    buf.as_mut_slice::<f32>().unwrap().copy_from_slice(&[1.0, -2.0, 3.5]);
    buf.fill_zero();
    assert_eq!(buf.as_slice::<f32>().unwrap(), &[0.0, 0.0, 0.0]);
}
