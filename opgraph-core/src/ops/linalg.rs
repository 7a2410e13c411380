//! Dense row-major matrix helpers used by the `fc` kernels.

use num_traits::Zero;
use std::ops::{AddAssign, Mul};

/// `out[n, m] = a[n, k] · b[k, m]`
pub fn matmul<T>(a: &[T], b: &[T], out: &mut [T], n: usize, k: usize, m: usize)
where
    T: Copy + Zero + Mul<Output = T> + AddAssign,
{
    for i in 0..n {
        for j in 0..m {
            let mut sum = T::zero();
            for l in 0..k {
                sum += a[i * k + l] * b[l * m + j];
            }
            out[i * m + j] = sum;
        }
    }
}

/// `out[k, m] = aᵀ · b` with `a[n, k]` and `b[n, m]`.
pub fn matmul_at_b<T>(a: &[T], b: &[T], out: &mut [T], n: usize, k: usize, m: usize)
where
    T: Copy + Zero + Mul<Output = T> + AddAssign,
{
    out.iter_mut().for_each(|x| *x = T::zero());
    for i in 0..n {
        for l in 0..k {
            let a_il = a[i * k + l];
            for j in 0..m {
                out[l * m + j] += a_il * b[i * m + j];
            }
        }
    }
}

/// `out[n, k] = a · bᵀ` with `a[n, m]` and `b[k, m]`.
pub fn matmul_a_bt<T>(a: &[T], b: &[T], out: &mut [T], n: usize, m: usize, k: usize)
where
    T: Copy + Zero + Mul<Output = T> + AddAssign,
{
    for i in 0..n {
        for l in 0..k {
            let mut sum = T::zero();
            for j in 0..m {
                sum += a[i * m + j] * b[l * m + j];
            }
            out[i * k + l] = sum;
        }
    }
}

/// Sum over rows: `out[m] = Σ_i a[i, m]`.
pub fn col_sum<T>(a: &[T], out: &mut [T], n: usize, m: usize)
where
    T: Copy + Zero + AddAssign,
{
    out.iter_mut().for_each(|x| *x = T::zero());
    for i in 0..n {
        for j in 0..m {
            out[j] += a[i * m + j];
        }
    }
}

#[cfg(test)]
#[path = "linalg_test.rs"]
mod tests;
