/*!
# Proposal Kernels

Proposal distributions for the random-walk samplers. A [`ProposalKernel`]
holds a movable center: [`sample`](ProposalKernel::sample) draws a candidate
around the current center, [`log_density`](ProposalKernel::log_density)
evaluates the kernel at an arbitrary point given that center, and
[`set_density`](ProposalKernel::set_density) moves the center. Keeping the
center explicit is what lets the Hastings correction evaluate the forward
density before re-centering and the backward density after.

[`NormalKernel`] is the workhorse: an axis-aligned Gaussian with per-coordinate
standard deviations. [`TruncatedNormal`] is a scalar distribution used by the
bounded Langevin proposal; it samples by inverting the normal CDF restricted
to the bounds.

## Example Usage

```rust
use minibatch_mcmc::kernels::{NormalKernel, ProposalKernel};

let mut kernel = NormalKernel::<f64>::standard(2).set_seed(42);
let candidate = kernel.sample();
let forward = kernel.log_density(&candidate);
kernel.set_density(&candidate);
assert!(kernel.log_density(&candidate) >= forward);
```
*/

use ndarray::Array1;
use num_traits::Float;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use statrs::distribution::{ContinuousCDF, Normal};

/// A proposal distribution with a movable center.
pub trait ProposalKernel<T> {
    /// Draws one candidate around the current center.
    fn sample(&mut self) -> Array1<T>;

    /// Log-density of the kernel at `point`, given the current center.
    fn log_density(&self, point: &Array1<T>) -> T;

    /// Moves the center to `point`.
    fn set_density(&mut self, point: &Array1<T>);

    /// Reseeds the kernel's random number generator.
    fn set_seed(self, seed: u64) -> Self
    where
        Self: Sized;
}

/**
Axis-aligned Gaussian proposal with one standard deviation per coordinate.

The log-density carries its full normalizer, `-(x - mean)^2 / (2 std^2)
- ln(std) - 0.5 ln(2 pi)` per coordinate, so the Hastings correction stays
valid even when the center moves between the forward and backward
evaluations.

# Examples

```rust
use minibatch_mcmc::kernels::{NormalKernel, ProposalKernel};
use ndarray::arr1;

let kernel = NormalKernel::new(arr1(&[0.0]), arr1(&[1.0]));
let at_center = kernel.log_density(&arr1(&[0.0]));
assert!((at_center - (-0.5 * (2.0 * std::f64::consts::PI).ln())).abs() < 1e-12);
```
*/
#[derive(Debug, Clone)]
pub struct NormalKernel<T> {
    /// Current center of the kernel.
    pub mean: Array1<T>,
    /// Per-coordinate standard deviations, strictly positive.
    pub std: Array1<T>,
    rng: SmallRng,
}

impl<T> NormalKernel<T>
where
    T: Float,
{
    /// Creates a kernel centered at `mean` with standard deviations `std`.
    pub fn new(mean: Array1<T>, std: Array1<T>) -> Self {
        assert_eq!(
            mean.len(),
            std.len(),
            "mean and std must have the same dimension"
        );
        Self {
            mean,
            std,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Creates a standard-normal kernel of dimension `dim`, centered at zero
    /// with unit standard deviations.
    pub fn standard(dim: usize) -> Self {
        Self::new(Array1::zeros(dim), Array1::ones(dim))
    }
}

impl<T> ProposalKernel<T> for NormalKernel<T>
where
    T: Float,
    StandardNormal: Distribution<T>,
{
    fn sample(&mut self) -> Array1<T> {
        let mut out = Array1::zeros(self.mean.len());
        for i in 0..self.mean.len() {
            let z: T = self.rng.sample(StandardNormal);
            out[i] = self.mean[i] + self.std[i] * z;
        }
        out
    }

    fn log_density(&self, point: &Array1<T>) -> T {
        let half = T::from(0.5).unwrap();
        let half_ln_two_pi = half * T::from(2.0 * std::f64::consts::PI).unwrap().ln();
        let mut acc = T::zero();
        for i in 0..point.len() {
            let z = (point[i] - self.mean[i]) / self.std[i];
            acc = acc - half * z * z - self.std[i].ln() - half_ln_two_pi;
        }
        acc
    }

    fn set_density(&mut self, point: &Array1<T>) {
        self.mean = point.clone();
    }

    fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

/**
Scalar normal distribution truncated to `[lower, upper]`.

Sampling inverts the normal CDF over the truncated probability mass, so a
single uniform draw yields one sample. Either bound may be infinite; with
both bounds infinite the distribution coincides with the untruncated normal.

# Examples

```rust
use minibatch_mcmc::kernels::TruncatedNormal;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let dist = TruncatedNormal::new(0.0, 1.0, -1.0, 1.0);
let mut rng = SmallRng::seed_from_u64(0);
for _ in 0..100 {
    let x: f64 = dist.sample(&mut rng);
    assert!((-1.0..=1.0).contains(&x));
}
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedNormal<T> {
    /// Location of the underlying normal.
    pub loc: T,
    /// Scale of the underlying normal, strictly positive.
    pub scale: T,
    /// Lower truncation bound, possibly `-inf`.
    pub lower: T,
    /// Upper truncation bound, possibly `+inf`.
    pub upper: T,
}

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("Expecting creation of normal distribution to succeed.")
}

impl<T: Float> TruncatedNormal<T> {
    /// Creates the distribution; `lower` must be strictly below `upper`.
    pub fn new(loc: T, scale: T, lower: T, upper: T) -> Self {
        assert!(lower < upper, "lower bound must be below upper bound");
        Self {
            loc,
            scale,
            lower,
            upper,
        }
    }

    fn standardized_mass(&self) -> (f64, f64) {
        let normal = standard_normal();
        let loc = self.loc.to_f64().unwrap();
        let scale = self.scale.to_f64().unwrap();
        let alpha = (self.lower.to_f64().unwrap() - loc) / scale;
        let beta = (self.upper.to_f64().unwrap() - loc) / scale;
        (normal.cdf(alpha), normal.cdf(beta))
    }

    /// Draws one sample via the inverse CDF of the truncated mass.
    ///
    /// The interpolated quantile is kept inside the open unit interval and
    /// the result saturates at the bounds, so a location far enough outside
    /// `[lower, upper]` for the truncated mass to underflow yields the nearer
    /// bound instead of a non-finite value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> T {
        let (cdf_lower, cdf_upper) = self.standardized_mass();
        let u: f64 = rng.gen();
        let p = (cdf_lower + u * (cdf_upper - cdf_lower))
            .clamp(f64::EPSILON, 1.0 - f64::EPSILON);
        let z = standard_normal().inverse_cdf(p);
        (self.loc + self.scale * T::from(z).unwrap())
            .max(self.lower)
            .min(self.upper)
    }

    /// Log-density at `x`; `-inf` outside the bounds.
    pub fn log_density(&self, x: T) -> T {
        if x < self.lower || x > self.upper {
            return T::neg_infinity();
        }
        let (cdf_lower, cdf_upper) = self.standardized_mass();
        let z = ((x - self.loc) / self.scale).to_f64().unwrap();
        let log_pdf = -0.5 * z * z
            - 0.5 * (2.0 * std::f64::consts::PI).ln()
            - self.scale.to_f64().unwrap().ln()
            - (cdf_upper - cdf_lower).ln();
        T::from(log_pdf).unwrap()
    }
}
