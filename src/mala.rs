/*!
# Metropolis-Adjusted Langevin Sampler

A gradient-informed sampler: each proposal is drawn around the Langevin drift
mean `m = theta + 0.5 * step * grad`, with noise scale `sqrt(step)`, and the
acceptance ratio carries the forward/backward proposal densities so the
discretization error is corrected exactly.

Proposals are unconstrained by default. With
[`truncated`](MALA::truncated) every coordinate is drawn from a normal
truncated to the same `[lower, upper]` interval, and the correction switches
to truncated-normal log-densities. Setting the bounds to `(-inf, inf)` takes
the unconstrained path exactly, down to the random number stream.

The sampler needs a [`GradientModel`]: one oracle call returns the target's
log-density and gradient together, since the gradient feeds both the next
drift and the backward correction.

## Example Usage

```rust
use minibatch_mcmc::core::Sampler;
use minibatch_mcmc::data::InMemoryLoader;
use minibatch_mcmc::mala::MALA;
use minibatch_mcmc::model::GaussianModel;
use ndarray::arr1;

let loader = InMemoryLoader::dummy();
let model = GaussianModel::new(arr1(&[0.0, 0.0]), 1.0);
let mut sampler = MALA::new(model, arr1(&[0.5, -0.5]), 0.1, &loader)?.set_seed(42);
sampler.run(&loader, 500, 100)?;
assert_eq!(sampler.chain.len(), 400);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/

use ndarray::Array1;
use num_traits::Float;
use rand::prelude::*;
use rand_distr::{Distribution, StandardNormal};

use crate::chain::{ChainRecord, ChainSchema, ChainStore};
use crate::core::Sampler;
use crate::data::BatchLoader;
use crate::error::{Error, Result};
use crate::kernels::TruncatedNormal;
use crate::model::GradientModel;

fn sq_norm<T: Float>(v: &Array1<T>) -> T {
    v.iter().fold(T::zero(), |acc, &x| acc + x * x)
}

/**
The Metropolis-adjusted Langevin algorithm (MALA).

# Type Parameters
- `T`: The floating-point type (e.g. `f32` or `f64`).
- `M`: The target model. Must implement [`GradientModel`].

The sampler owns its current state (`theta`, target value, gradient)
exclusively and hands out immutable [`ChainRecord`] snapshots with the
gradient attached; its chain uses the gradient schema. Concurrent use of one
instance from multiple threads is unsupported.

# Examples

```rust
use minibatch_mcmc::data::InMemoryLoader;
use minibatch_mcmc::mala::MALA;
use minibatch_mcmc::model::GaussianModel;
use ndarray::arr1;

let loader = InMemoryLoader::dummy();
let model = GaussianModel::new(arr1(&[0.0]), 1.0);
let sampler = MALA::new(model, arr1(&[0.0]), 0.05, &loader)?
    .truncated(-2.0, 2.0)
    .set_seed(7);
assert_eq!(sampler.seed, 7);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
#[derive(Debug, Clone)]
pub struct MALA<T, M> {
    /// The target model to sample from.
    pub model: M,
    /// The chain recorded so far.
    pub chain: ChainStore<T>,
    /// Discretization step of the Langevin dynamic.
    pub step: T,
    /// The sampler's random seed.
    pub seed: u64,
    theta: Array1<T>,
    target_val: T,
    grad_val: Array1<T>,
    lower: T,
    upper: T,
    accepted: bool,
    rng: SmallRng,
}

impl<T, M> MALA<T, M>
where
    T: Float,
    M: GradientModel<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
    StandardNormal: Distribution<T>,
{
    /**
    Constructs the sampler at `theta0` with Langevin step size `step`,
    evaluating the target value and gradient once on the first batch of
    `loader`. `step` must be strictly positive; the proposal noise scale is
    its square root.

    Fails with [`Error::EmptyLoader`] if `loader` yields no batches, and
    propagates any failure of the model oracle.
    */
    pub fn new<L: BatchLoader<T>>(
        mut model: M,
        theta0: Array1<T>,
        step: T,
        loader: &L,
    ) -> Result<Self> {
        assert!(step > T::zero(), "step size must be positive");
        let batch = loader.batches().next().ok_or(Error::EmptyLoader)?;
        let (target_val, grad_val) = model.log_target_with_grad(&theta0, batch)?;
        let seed = thread_rng().gen::<u64>();
        Ok(Self {
            model,
            chain: ChainStore::new(ChainSchema::Gradient),
            step,
            seed,
            theta: theta0,
            target_val,
            grad_val,
            lower: T::neg_infinity(),
            upper: T::infinity(),
            accepted: true,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Truncates every coordinate of the proposal to `[lower, upper]`.
    ///
    /// Bounds default to `(-inf, inf)`; passing infinite bounds here keeps
    /// the unconstrained proposal and correction.
    pub fn truncated(mut self, lower: T, upper: T) -> Self {
        assert!(lower < upper, "lower bound must be below upper bound");
        self.lower = lower;
        self.upper = upper;
        self
    }

    /// Sets the sampler's seed.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    fn unconstrained(&self) -> bool {
        self.lower == T::neg_infinity() && self.upper == T::infinity()
    }

    /// Langevin drift mean `theta + 0.5 * step * grad`.
    fn drift_mean(&self, theta: &Array1<T>, grad: &Array1<T>) -> Array1<T> {
        let half_step = T::from(0.5).unwrap() * self.step;
        theta + &grad.mapv(|g| g * half_step)
    }

    fn snapshot(&self) -> ChainRecord<T> {
        ChainRecord {
            theta: self.theta.clone(),
            target_val: self.target_val,
            accepted: self.accepted,
            grad_val: Some(self.grad_val.clone()),
        }
    }
}

impl<T, M> Sampler<T> for MALA<T, M>
where
    T: Float,
    M: GradientModel<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
    StandardNormal: Distribution<T>,
{
    /**
    Performs one accept/reject cycle per batch of `loader`.

    Per cycle: draw around the forward drift mean, evaluate the target value
    and gradient at the candidate, add the forward/backward proposal-density
    correction computed from the backward drift mean, and accept iff
    `log(u) < r`. On rejection the model's live parameters are restored; the
    stored gradient still belongs to the kept state, so it is left alone.
    */
    fn draw<L: BatchLoader<T>>(&mut self, loader: &L, record: bool) -> Result<ChainRecord<T>> {
        let half = T::from(0.5).unwrap();
        let scale = self.step.sqrt();

        for batch in loader.batches() {
            let mean_forward = self.drift_mean(&self.theta, &self.grad_val);

            let dim = mean_forward.len();
            let mut proposed = Array1::zeros(dim);
            if self.unconstrained() {
                for i in 0..dim {
                    let z: T = self.rng.sample(StandardNormal);
                    proposed[i] = mean_forward[i] + scale * z;
                }
            } else {
                for i in 0..dim {
                    let coord = TruncatedNormal::new(mean_forward[i], scale, self.lower, self.upper);
                    proposed[i] = coord.sample(&mut self.rng);
                }
            }

            let (proposed_val, proposed_grad) =
                self.model.log_target_with_grad(&proposed, batch)?;
            let mean_backward = self.drift_mean(&proposed, &proposed_grad);

            let mut log_rate = proposed_val - self.target_val;
            if self.unconstrained() {
                let forward_dev = sq_norm(&(&proposed - &mean_forward));
                let backward_dev = sq_norm(&(&self.theta - &mean_backward));
                log_rate =
                    log_rate + half * forward_dev / self.step - half * backward_dev / self.step;
            } else {
                for i in 0..dim {
                    let forward =
                        TruncatedNormal::new(mean_forward[i], scale, self.lower, self.upper);
                    let backward =
                        TruncatedNormal::new(mean_backward[i], scale, self.lower, self.upper);
                    log_rate = log_rate + backward.log_density(self.theta[i])
                        - forward.log_density(proposed[i]);
                }
            }

            let u: T = self.rng.gen();
            if log_rate > u.ln() {
                self.theta = proposed;
                self.target_val = proposed_val;
                self.grad_val = proposed_grad;
                self.accepted = true;
            } else {
                self.model.set_params(&self.theta);
                self.accepted = false;
            }

            if record {
                self.chain.update(self.snapshot())?;
            }
        }
        Ok(self.snapshot())
    }

    fn reset<L: BatchLoader<T>>(&mut self, theta0: Array1<T>, loader: &L) -> Result<()> {
        let batch = loader.batches().next().ok_or(Error::EmptyLoader)?;
        let (target_val, grad_val) = self.model.log_target_with_grad(&theta0, batch)?;
        self.theta = theta0;
        self.target_val = target_val;
        self.grad_val = grad_val;
        self.accepted = true;
        Ok(())
    }

    fn chain(&self) -> &ChainStore<T> {
        &self.chain
    }

    fn label(&self) -> &'static str {
        "MALA"
    }
}
