//! Width-8 f32 kernels
//!
//! Every kernel walks the input in 8-lane chunks through `F32x8` and then
//! handles the remainder (< 8 values) one element at a time. Accumulation
//! stays in f32: eight lane accumulators combined by a horizontal sum.
//!
//! `F32x8` is a 32-byte aligned `[f32; 8]` that LLVM lowers to one AVX
//! register; with the `portable-simd` feature it wraps `std::simd::f32x8`.
//! The `scalar` module holds the naive one-lane references.

use std::ops::{Add, AddAssign, Mul, Sub};

/// Number of f32 lanes per vector (256 bits)
pub const LANES: usize = 8;

pub use lanes::F32x8;

#[cfg(not(feature = "portable-simd"))]
mod lanes {
    use super::LANES;

    /// Eight f32 lanes
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    #[repr(C, align(32))]
    pub struct F32x8([f32; LANES]);

    impl F32x8 {
        #[inline(always)]
        pub fn splat(value: f32) -> Self {
            Self([value; LANES])
        }

        /// Load the first 8 values of `slice`; panics if shorter
        #[inline(always)]
        pub fn from_slice(slice: &[f32]) -> Self {
            let mut lanes = [0.0f32; LANES];
            lanes.copy_from_slice(&slice[..LANES]);
            Self(lanes)
        }

        /// Store into the first 8 values of `out`; panics if shorter
        #[inline(always)]
        pub fn write_to_slice(self, out: &mut [f32]) {
            out[..LANES].copy_from_slice(&self.0);
        }

        #[inline(always)]
        pub fn to_array(self) -> [f32; LANES] {
            self.0
        }

        /// `self * a + b` per lane, fused where the target has FMA
        #[inline(always)]
        pub fn mul_add(self, a: Self, b: Self) -> Self {
            let mut out = [0.0f32; LANES];
            for i in 0..LANES {
                out[i] = super::fmadd(self.0[i], a.0[i], b.0[i]);
            }
            Self(out)
        }

        /// Horizontal sum, lane 0 first
        #[inline(always)]
        pub fn reduce_sum(self) -> f32 {
            self.0.iter().fold(0.0f32, |acc, &lane| acc + lane)
        }

        #[inline(always)]
        pub(super) fn zip_with(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
            let mut out = [0.0f32; LANES];
            for i in 0..LANES {
                out[i] = f(self.0[i], other.0[i]);
            }
            Self(out)
        }
    }
}

#[cfg(feature = "portable-simd")]
mod lanes {
    use super::LANES;
    use std::simd::num::SimdFloat;
    use std::simd::{f32x8, StdFloat};

    /// Eight f32 lanes
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    #[repr(transparent)]
    pub struct F32x8(f32x8);

    impl F32x8 {
        #[inline(always)]
        pub fn splat(value: f32) -> Self {
            Self(f32x8::splat(value))
        }

        /// Load the first 8 values of `slice`; panics if shorter
        #[inline(always)]
        pub fn from_slice(slice: &[f32]) -> Self {
            Self(f32x8::from_slice(&slice[..LANES]))
        }

        /// Store into the first 8 values of `out`; panics if shorter
        #[inline(always)]
        pub fn write_to_slice(self, out: &mut [f32]) {
            self.0.copy_to_slice(&mut out[..LANES]);
        }

        #[inline(always)]
        pub fn to_array(self) -> [f32; LANES] {
            self.0.to_array()
        }

        /// `self * a + b` per lane
        #[inline(always)]
        pub fn mul_add(self, a: Self, b: Self) -> Self {
            Self(StdFloat::mul_add(self.0, a.0, b.0))
        }

        /// Horizontal sum
        #[inline(always)]
        pub fn reduce_sum(self) -> f32 {
            self.0.reduce_sum()
        }

        #[inline(always)]
        pub(super) fn zip_with(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
            let a = self.0.to_array();
            let b = other.0.to_array();
            let mut out = [0.0f32; LANES];
            for i in 0..LANES {
                out[i] = f(a[i], b[i]);
            }
            Self(f32x8::from_array(out))
        }
    }
}

impl F32x8 {
    #[inline(always)]
    pub fn zero() -> Self {
        Self::splat(0.0)
    }
}

impl Add for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl AddAssign for F32x8 {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a - b)
    }
}

impl Mul for F32x8 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        self.zip_with(rhs, |a, b| a * b)
    }
}

/// Fused multiply-add when the target has FMA, plain otherwise
///
/// Without hardware FMA `f32::mul_add` becomes a libm call per element.
#[inline(always)]
fn fmadd(a: f32, b: f32, c: f32) -> f32 {
    #[cfg(target_feature = "fma")]
    {
        a.mul_add(b, c)
    }
    #[cfg(not(target_feature = "fma"))]
    {
        a * b + c
    }
}

/// Sum of all values
#[inline]
pub fn sum(data: &[f32]) -> f32 {
    let mut acc = F32x8::zero();
    let chunks = data.chunks_exact(LANES);
    let tail = chunks.remainder();
    for chunk in chunks {
        acc += F32x8::from_slice(chunk);
    }

    let mut total = acc.reduce_sum();
    for &value in tail {
        total += value;
    }
    total
}

/// Arithmetic mean; 0 for empty input
#[inline]
pub fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    sum(data) / data.len() as f32
}

/// Population variance around a precomputed `mean`; 0 for empty input
#[inline]
pub fn variance(data: &[f32], mean: f32) -> f32 {
    if data.is_empty() {
        return 0.0;
    }

    let mean_vec = F32x8::splat(mean);
    let mut acc = F32x8::zero();
    let chunks = data.chunks_exact(LANES);
    let tail = chunks.remainder();
    for chunk in chunks {
        let diff = F32x8::from_slice(chunk) - mean_vec;
        acc = diff.mul_add(diff, acc);
    }

    let mut total = acc.reduce_sum();
    for &value in tail {
        let diff = value - mean;
        total = fmadd(diff, diff, total);
    }
    total / data.len() as f32
}

/// Population standard deviation around a precomputed `mean`
#[inline]
pub fn std_dev(data: &[f32], mean: f32) -> f32 {
    variance(data, mean).sqrt()
}

/// Dot product over the common prefix of `a` and `b`
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);

    let mut acc = F32x8::zero();
    let a_chunks = a.chunks_exact(LANES);
    let b_chunks = b.chunks_exact(LANES);
    let (a_tail, b_tail) = (a_chunks.remainder(), b_chunks.remainder());
    for (ca, cb) in a_chunks.zip(b_chunks) {
        acc = F32x8::from_slice(ca).mul_add(F32x8::from_slice(cb), acc);
    }

    let mut total = acc.reduce_sum();
    for (&x, &y) in a_tail.iter().zip(b_tail) {
        total = fmadd(x, y, total);
    }
    total
}

/// `out[i] = (data[i] - mean) / std_dev`
///
/// Subtracts before scaling so a high price level with small dispersion
/// keeps its precision. A zero `std_dev` fills `out` with zeros. Writes
/// `min(data.len(), out.len())` values.
#[inline]
pub fn zscore(data: &[f32], mean: f32, std_dev: f32, out: &mut [f32]) {
    let n = data.len().min(out.len());
    let (data, out) = (&data[..n], &mut out[..n]);

    if std_dev == 0.0 {
        out.fill(0.0);
        return;
    }

    let inv_std = 1.0 / std_dev;
    let mean_vec = F32x8::splat(mean);
    let inv_vec = F32x8::splat(inv_std);

    let mut in_chunks = data.chunks_exact(LANES);
    let mut out_chunks = out.chunks_exact_mut(LANES);
    for (src, dst) in (&mut in_chunks).zip(&mut out_chunks) {
        ((F32x8::from_slice(src) - mean_vec) * inv_vec).write_to_slice(dst);
    }
    for (&x, z) in in_chunks.remainder().iter().zip(out_chunks.into_remainder()) {
        *z = (x - mean) * inv_std;
    }
}

/// `out[i] = a[i] * b[i]` over the common prefix of all three slices
#[inline]
pub fn mul(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = a.len().min(b.len()).min(out.len());
    let (a, b, out) = (&a[..n], &b[..n], &mut out[..n]);

    let mut a_chunks = a.chunks_exact(LANES);
    let mut b_chunks = b.chunks_exact(LANES);
    let mut out_chunks = out.chunks_exact_mut(LANES);
    for ((ca, cb), dst) in (&mut a_chunks).zip(&mut b_chunks).zip(&mut out_chunks) {
        (F32x8::from_slice(ca) * F32x8::from_slice(cb)).write_to_slice(dst);
    }
    for ((&x, &y), z) in a_chunks
        .remainder()
        .iter()
        .zip(b_chunks.remainder())
        .zip(out_chunks.into_remainder())
    {
        *z = x * y;
    }
}

/// One-lane reference implementations
pub mod scalar {
    pub fn sum(data: &[f32]) -> f32 {
        data.iter().fold(0.0f32, |acc, &x| acc + x)
    }

    pub fn mean(data: &[f32]) -> f32 {
        if data.is_empty() {
            return 0.0;
        }
        sum(data) / data.len() as f32
    }

    pub fn std_dev(data: &[f32], mean: f32) -> f32 {
        if data.is_empty() {
            return 0.0;
        }
        let sum_sq = data.iter().fold(0.0f32, |acc, &x| acc + (x - mean) * (x - mean));
        (sum_sq / data.len() as f32).sqrt()
    }

    pub fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).fold(0.0f32, |acc, (&x, &y)| acc + x * y)
    }

    pub fn zscore(data: &[f32], mean: f32, std_dev: f32, out: &mut [f32]) {
        for (z, &x) in out.iter_mut().zip(data) {
            *z = if std_dev == 0.0 { 0.0 } else { (x - mean) / std_dev };
        }
    }
}
