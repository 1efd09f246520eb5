use strided_ndarray::{s, IndexElem, NDArray};

fn cube() -> NDArray {
    NDArray::range(27).reshaped(&[3, 3, 3])
}

#[test]
fn test_views_share_storage() {
    let a = cube();
    let v = a.get(s![1, .., 1..]);
    assert_eq!(v.shape(), &[3, 2]);
    assert!(v.shares_buffer_with(&a));
    assert_eq!(v.elements(), vec![10.0, 11.0, 13.0, 14.0, 16.0, 17.0]);
}

#[test]
fn test_chained_subscripts() {
    let a = cube();
    let chained = a.get(s![.., 2]).get(s![..;-1, 0]);
    assert_eq!(chained.elements(), vec![24.0, 15.0, 6.0]);
    assert_eq!(a.get(s![-1, -1, -1]).as_scalar(), 26.0);
}

#[test]
fn test_inclusive_and_open_ranges() {
    let a = NDArray::range(10);
    assert_eq!(a.get(s![2..=4]).elements(), vec![2.0, 3.0, 4.0]);
    assert_eq!(a.get(s![..=1]).elements(), vec![0.0, 1.0]);
    assert_eq!(a.get(s![7..]).elements(), vec![7.0, 8.0, 9.0]);
    assert_eq!(a.get(s![-3..]).elements(), vec![7.0, 8.0, 9.0]);
    assert_eq!(a.get(s![3..3]).shape(), &[0]);
    assert_eq!(a.get(s![10..]).shape(), &[0]);
}

#[test]
fn test_set_through_strided_view() {
    let mut a = NDArray::zeros(&[4, 4]);
    a.set(s![..;2, 1..;2], &NDArray::ones(&[2, 2]));
    assert_eq!(a.sum(), 4.0);
    assert_eq!(a.element(&[0, 1]), 1.0);
    assert_eq!(a.element(&[2, 3]), 1.0);
    assert_eq!(a.element(&[1, 1]), 0.0);

    a.set(&[IndexElem::FULL, IndexElem::single(0)], &NDArray::from_vec(vec![5.0]));
    assert_eq!(a.get(s![.., 0]).elements(), vec![5.0; 4]);
}

#[test]
fn test_set_leaves_other_handles_untouched() {
    let a = cube();
    let view = a.get(s![0]);
    let mut b = a.clone();
    b.set_scalar(s![0], 0.0);
    assert_eq!(view.sum(), 36.0);
    assert_eq!(a.sum(), 351.0);
    assert_eq!(b.sum(), 351.0 - 36.0);
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_index_out_of_bounds() {
    cube().get(s![3]);
}

#[test]
#[should_panic(expected = "too many indices")]
fn test_too_many_indices() {
    cube().get(s![0, 0, 0, 0]);
}
