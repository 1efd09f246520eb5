use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strided_ndarray::{
    cov, determinant, inv, matmul, matrix_rank, pinv, s, svd, LinalgError, NDArray,
};

fn assert_close(a: &NDArray, b: &NDArray, eps: f32) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.elements().iter().zip(b.elements()) {
        assert_abs_diff_eq!(*x, y, epsilon = eps);
    }
}

fn random_matrix(rng: &mut StdRng, m: usize, n: usize) -> NDArray {
    NDArray::new(&[m, n], (0..m * n).map(|_| rng.random_range(-1.0f32..1.0)).collect())
}

#[test]
fn test_inverse_of_identity_stack() {
    let eye = NDArray::eye(3);
    assert_close(&inv(&eye).unwrap(), &eye, 1e-6);
    let batch = NDArray::zeros(&[4, 3, 3]) + &eye;
    assert_close(&inv(&batch).unwrap(), &batch, 1e-6);
}

#[test]
fn test_batched_inverse() {
    let a = NDArray::range(8).reshaped(&[2, 2, 2]);
    let expected = NDArray::new(&[2, 2, 2], vec![-1.5, 0.5, 1.0, 0.0, -3.5, 2.5, 3.0, -2.0]);
    assert_close(&inv(&a).unwrap(), &expected, 1e-5);
}

#[test]
fn test_inverse_of_random_matrix() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = &random_matrix(&mut rng, 6, 6) + &(NDArray::eye(6) * 4.0);
    let ai = inv(&a).unwrap();
    assert_close(&matmul(&a, &ai), &NDArray::eye(6), 1e-4);
    assert_close(&matmul(&ai, &a), &NDArray::eye(6), 1e-4);
}

#[test]
fn test_inverse_of_transposed_view() {
    let a = NDArray::new(&[3, 3], vec![1.0, 2.0, 3.0, 1.0, 3.0, 5.0, 2.0, 4.0, 5.0]);
    let t = a.transposed();
    let ti = inv(&t).unwrap();
    assert_close(&ti, &inv(&a).unwrap().transposed(), 1e-5);
}

#[test]
fn test_singular_matrix_is_an_error() {
    let a = NDArray::new(&[3, 3], vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 1.0, 1.0]);
    assert_eq!(inv(&a).unwrap_err(), LinalgError::SingularMatrix);
    assert_eq!(inv(&NDArray::zeros(&[2, 2])).unwrap_err(), LinalgError::SingularMatrix);
}

#[test]
fn test_determinants() {
    let a = NDArray::new(
        &[5, 5],
        vec![
            4.0, 1.0, 0.0, 0.0, 2.0, 2.0, 2.0, 0.0, 4.0, 2.0, 0.0, 3.0, 3.0, 1.0, 1.0, 4.0, 2.0,
            3.0, 1.0, 1.0, 2.0, 4.0, 4.0, 0.0, 4.0,
        ],
    );
    assert_abs_diff_eq!(determinant(&a).unwrap().as_scalar(), 192.0, epsilon = 1e-2);

    let batch = NDArray::new(
        &[3, 2, 2],
        vec![1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 2.0, 1.0, 1.0, 3.0, 3.0, 1.0],
    );
    let d = determinant(&batch).unwrap();
    assert_close(&d, &NDArray::from_vec(vec![-2.0, -3.0, -8.0]), 1e-5);
}

#[test]
#[should_panic(expected = "square")]
fn test_inverse_needs_square() {
    let _ = inv(&NDArray::zeros(&[2, 3]));
}

#[test]
fn test_svd_of_random_batch() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = NDArray::new(&[2, 4, 3], (0..24).map(|_| rng.random_range(-1.0f32..1.0)).collect());
    let f = svd(&a, false).unwrap();
    assert_eq!(f.u.shape(), &[2, 4, 3]);
    assert_eq!(f.s.shape(), &[2, 3]);
    assert_eq!(f.vt.shape(), &[2, 3, 3]);
    let r = matmul(&(&f.u * &f.s.expand_dims(-2)), &f.vt);
    assert_close(&r, &a, 1e-4);
    for b in 0..2 {
        let s = f.s.get(s![b as isize]).elements();
        assert!(s.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_full_svd_is_orthogonal() {
    let mut rng = StdRng::seed_from_u64(9);
    let a = random_matrix(&mut rng, 3, 5);
    let f = svd(&a, true).unwrap();
    assert_eq!(f.u.shape(), &[3, 3]);
    assert_eq!(f.vt.shape(), &[5, 5]);
    assert_close(&matmul(&f.vt, &f.vt.transposed()), &NDArray::eye(5), 1e-4);
    assert_close(&matmul(&f.u.transposed(), &f.u), &NDArray::eye(3), 1e-4);
}

#[test]
fn test_pinv_of_invertible_matches_inv() {
    let a = NDArray::new(&[2, 2], vec![4.0, 7.0, 2.0, 6.0]);
    assert_close(&pinv(&a, 1e-5).unwrap(), &inv(&a).unwrap(), 1e-4);
}

#[test]
fn test_pinv_of_rank_deficient() {
    let a = NDArray::new(&[2, 2], vec![1.0, 2.0, 2.0, 4.0]);
    let p = pinv(&a, 1e-5).unwrap();
    let expected = a.transposed() / 25.0;
    assert_close(&p, &expected, 1e-5);
    assert_eq!(matrix_rank(&a, None).unwrap(), 1);
}

#[test]
fn test_matrix_rank() {
    assert_eq!(matrix_rank(&NDArray::eye(4), None).unwrap(), 4);
    let low = NDArray::new(
        &[4, 4],
        vec![
            1.0, 2.0, 3.0, 4.0, 2.0, 4.0, 6.0, 8.0, 1.0, 0.0, 1.0, 0.0, 2.0, 2.0, 4.0, 4.0,
        ],
    );
    assert_eq!(matrix_rank(&low, None).unwrap(), 2);
    assert_eq!(matrix_rank(&low, Some(1e6)).unwrap(), 0);
}

#[test]
fn test_cov_is_symmetric() {
    let mut rng = StdRng::seed_from_u64(4);
    let a = random_matrix(&mut rng, 4, 10);
    let c = cov(&a);
    assert_eq!(c.shape(), &[4, 4]);
    assert_close(&c, &c.transposed(), 1e-6);
    let var = a.variance_axis(1, false);
    for i in 0..4 {
        assert_abs_diff_eq!(c.element(&[i, i]), var.elements()[i as usize], epsilon = 1e-5);
    }
}

#[test]
fn test_norms_match_reference() {
    let a = NDArray::from_vec(vec![1.0, 2.0, 3.0]);
    assert_abs_diff_eq!(a.norm(), 14.0f32.sqrt(), epsilon = 1e-6);
    let m = NDArray::range(9).reshaped(&[3, 3]);
    assert_close(
        &m.vector_norm(0, false),
        &NDArray::from_vec(vec![6.708_204, 8.124_039, 9.643_651]),
        1e-5,
    );
    assert_close(
        &m.vector_norm(1, false),
        &NDArray::from_vec(vec![2.236_068, 7.071_068, 12.206_556]),
        1e-5,
    );
}
