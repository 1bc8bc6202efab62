//! Random array creation.
//!
//! Sampling goes through [`rand::Rng`] and any [`rand_distr::Distribution`],
//! so callers choose both the generator and the distribution. All functions
//! take the generator explicitly; there is no hidden global state. Use
//! [`seeded`] for reproducible streams.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, Normal, StandardNormal, Uniform};

use crate::array::NdArray;
use crate::dtype::Element;
use crate::error::{CoreError, Result};

/// A reproducible generator seeded from a single `u64`.
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Fill an array of `shape` with independent draws from `dist`.
///
/// ```
/// use rand_distr::Exp;
/// use tessera_core::random::{sample, seeded};
///
/// let mut rng = seeded(7);
/// let a = sample(&mut rng, vec![2, 3], &Exp::new(1.5).unwrap());
/// assert!(a.iter().all(|x: f64| x >= 0.0));
/// ```
pub fn sample<T, D, R>(rng: &mut R, shape: Vec<usize>, dist: &D) -> NdArray<T>
where
    T: Element,
    D: Distribution<T>,
    R: Rng + ?Sized,
{
    let numel: usize = shape.iter().product();
    let data: Vec<T> = (0..numel).map(|_| dist.sample(rng)).collect();
    NdArray::from_contiguous(data, shape)
}

/// Uniform samples in `[low, high)`.
///
/// Returns an error unless `low < high` and both are finite.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, shape: Vec<usize>, low: f64, high: f64) -> Result<NdArray<f64>> {
    if !low.is_finite() || !high.is_finite() || low >= high {
        return Err(CoreError::InvalidArgument {
            reason: "uniform requires finite low < high",
        });
    }
    Ok(sample(rng, shape, &Uniform::new(low, high)))
}

/// Normal samples with the given mean and standard deviation.
///
/// Returns an error for a negative or non-finite `std_dev`; `rand_distr`
/// itself only rejects the latter.
pub fn normal<R: Rng + ?Sized>(rng: &mut R, shape: Vec<usize>, mean: f64, std_dev: f64) -> Result<NdArray<f64>> {
    let invalid = || CoreError::InvalidArgument {
        reason: "normal requires a finite, non-negative standard deviation",
    };
    if std_dev < 0.0 {
        return Err(invalid());
    }
    let dist = Normal::new(mean, std_dev).map_err(|_| invalid())?;
    Ok(sample(rng, shape, &dist))
}

/// Standard normal samples (mean 0, standard deviation 1).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R, shape: Vec<usize>) -> NdArray<f64> {
    sample(rng, shape, &StandardNormal)
}

/// Boolean samples that are `true` with probability `p`.
pub fn bernoulli<R: Rng + ?Sized>(rng: &mut R, shape: Vec<usize>, p: f64) -> Result<NdArray<bool>> {
    let dist = Bernoulli::new(p).map_err(|_| CoreError::InvalidArgument {
        reason: "bernoulli probability must be in [0, 1]",
    })?;
    Ok(sample(rng, shape, &dist))
}

impl<T: Element> NdArray<T> {
    /// A copy with the elements permuted uniformly at random, keeping the
    /// receiver's shape.
    ///
    /// ```
    /// use tessera_core::array::NdArray;
    /// use tessera_core::random::seeded;
    ///
    /// let a = NdArray::from_vec((0..10).collect::<Vec<i32>>(), vec![2, 5]).unwrap();
    /// let s = a.shuffle(&mut seeded(1));
    /// assert_eq!(s.shape(), &[2, 5]);
    /// assert_eq!(s.sort(), a);
    /// ```
    pub fn shuffle<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut data = self.to_vec();
        data.shuffle(rng);
        NdArray::from_contiguous(data, self.shape().to_vec())
    }
}

impl NdArray<f64> {
    /// Shorthand for [`normal`] with a fresh seeded generator.
    pub fn random_normal(shape: Vec<usize>, mean: f64, std_dev: f64, seed: u64) -> Result<Self> {
        normal(&mut seeded(seed), shape, mean, std_dev)
    }

    /// Shorthand for [`uniform`] with a fresh seeded generator.
    pub fn random_uniform(shape: Vec<usize>, low: f64, high: f64, seed: u64) -> Result<Self> {
        uniform(&mut seeded(seed), shape, low, high)
    }
}
