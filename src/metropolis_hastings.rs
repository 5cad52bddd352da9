/*!
# Metropolis–Hastings Sampler

A mini-batch Metropolis–Hastings sampler generic over the target [`Model`]
and the [`ProposalKernel`]. One [`draw`](Sampler::draw) iterates the loader's
batches and runs one full propose/evaluate/accept-reject cycle per batch, so
the recorded chain advances `num_batches` records per draw.

## Overview

- **Model (`M`)**: evaluates the target log-density per mini-batch via the
  [`Model`] trait; its live parameters are restored after a rejection.
- **Kernel (`K`)**: generates candidates and, for asymmetric kernels, scores
  them via the [`ProposalKernel`] trait.
- **Symmetric vs. asymmetric**: with a symmetric kernel (the default) the
  acceptance ratio is the plain target ratio. Switching with
  [`symmetric(false)`](MetropolisHastings::symmetric) enables the Hastings
  correction: the forward kernel density is evaluated before the kernel is
  recentered at the candidate and the backward density after, and the ratio
  becomes `target' - target - log q(theta'|theta) + log q(theta|theta')`.
- **Reproducibility**: [`set_seed`](MetropolisHastings::set_seed) seeds the
  sampler's own generator and derives a kernel seed from it.

## Example Usage

```rust
use minibatch_mcmc::core::Sampler;
use minibatch_mcmc::data::InMemoryLoader;
use minibatch_mcmc::kernels::NormalKernel;
use minibatch_mcmc::metropolis_hastings::MetropolisHastings;
use minibatch_mcmc::model::GaussianModel;
use ndarray::arr1;

let loader = InMemoryLoader::dummy();
let model = GaussianModel::new(arr1(&[1.0, 2.0]), 1.0);
let kernel = NormalKernel::new(arr1(&[0.0, 0.0]), arr1(&[1.0, 1.0]));
let mut sampler =
    MetropolisHastings::new(model, kernel, arr1(&[0.0, 0.0]), &loader)?.set_seed(42);

// 1000 epochs over the (single-batch) loader, discarding the first 100.
sampler.run(&loader, 1_000, 100)?;
assert_eq!(sampler.chain.len(), 900);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/

use ndarray::Array1;
use num_traits::Float;
use rand::prelude::*;

use crate::chain::{ChainRecord, ChainSchema, ChainStore};
use crate::core::Sampler;
use crate::data::BatchLoader;
use crate::error::{Error, Result};
use crate::kernels::{NormalKernel, ProposalKernel};
use crate::model::Model;

/**
The Metropolis–Hastings sampler draws candidates from a proposal kernel and
accepts or rejects them against the target's log-density ratio, one cycle per
mini-batch.

# Type Parameters
- `T`: The floating-point type (e.g. `f32` or `f64`).
- `M`: The target model. Must implement [`Model`].
- `K`: The proposal kernel. Must implement [`ProposalKernel`].

The sampler owns its current state (`theta` and its target value) exclusively
and hands out immutable [`ChainRecord`] snapshots; concurrent use of one
instance from multiple threads is unsupported.

# Examples

```rust
use minibatch_mcmc::data::InMemoryLoader;
use minibatch_mcmc::metropolis_hastings::MetropolisHastings;
use minibatch_mcmc::model::GaussianModel;
use ndarray::arr1;

let loader = InMemoryLoader::dummy();
let model = GaussianModel::new(arr1(&[0.0]), 1.0);
let sampler = MetropolisHastings::with_default_kernel(model, arr1(&[0.0]), &loader)?;
assert!(sampler.chain.is_empty());
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
#[derive(Debug, Clone)]
pub struct MetropolisHastings<T, M, K> {
    /// The target model to sample from.
    pub model: M,
    /// The proposal kernel used to generate candidates.
    pub kernel: K,
    /// The chain recorded so far.
    pub chain: ChainStore<T>,
    /// The sampler's random seed.
    pub seed: u64,
    theta: Array1<T>,
    target_val: T,
    accepted: bool,
    symmetric: bool,
    rng: SmallRng,
}

impl<T, M, K> MetropolisHastings<T, M, K>
where
    T: Float,
    M: Model<T>,
    K: ProposalKernel<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
{
    /**
    Constructs the sampler at `theta0`, evaluating the target once on the
    first batch of `loader`. No acceptance decision is made for this
    initialization.

    # Arguments

    * `model` - The target model.
    * `kernel` - The proposal kernel.
    * `theta0` - The starting parameter vector.
    * `loader` - Supplies the batch used for the initial target evaluation.

    Fails with [`Error::EmptyLoader`] if `loader` yields no batches, and
    propagates any failure of the model oracle.
    */
    pub fn new<L: BatchLoader<T>>(
        mut model: M,
        kernel: K,
        theta0: Array1<T>,
        loader: &L,
    ) -> Result<Self> {
        let batch = loader.batches().next().ok_or(Error::EmptyLoader)?;
        let target_val = model.log_target(&theta0, batch)?;
        let seed = thread_rng().gen::<u64>();
        Ok(Self {
            model,
            kernel,
            chain: ChainStore::new(ChainSchema::Basic),
            seed,
            theta: theta0,
            target_val,
            accepted: true,
            symmetric: true,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /**
    Declares whether the kernel is symmetric.

    Defaults to `true`, which skips the Hastings correction entirely. Set to
    `false` for kernels whose density changes under recentering, so the
    forward and backward kernel densities enter the acceptance ratio.
    */
    pub fn symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /**
    Sets the sampler's seed and derives the kernel's seed from it.

    # Examples

    ```rust
    use minibatch_mcmc::data::InMemoryLoader;
    use minibatch_mcmc::metropolis_hastings::MetropolisHastings;
    use minibatch_mcmc::model::GaussianModel;
    use ndarray::arr1;

    let loader = InMemoryLoader::dummy();
    let model = GaussianModel::new(arr1(&[0.0]), 1.0);
    let sampler = MetropolisHastings::with_default_kernel(model, arr1(&[0.0]), &loader)?
        .set_seed(42);
    assert_eq!(sampler.seed, 42);
    # Ok::<(), minibatch_mcmc::Error>(())
    ```
    */
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self.kernel = self.kernel.set_seed(seed.wrapping_add(1));
        self
    }

    fn snapshot(&self) -> ChainRecord<T> {
        ChainRecord {
            theta: self.theta.clone(),
            target_val: self.target_val,
            accepted: self.accepted,
            grad_val: None,
        }
    }
}

impl<T, M> MetropolisHastings<T, M, NormalKernel<T>>
where
    T: Float,
    M: Model<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
    rand_distr::StandardNormal: rand_distr::Distribution<T>,
{
    /// Constructs the sampler with the default kernel: a standard normal of
    /// the model's parameter dimension, centered at zero.
    pub fn with_default_kernel<L: BatchLoader<T>>(
        model: M,
        theta0: Array1<T>,
        loader: &L,
    ) -> Result<Self> {
        let kernel = NormalKernel::standard(model.num_params());
        Self::new(model, kernel, theta0, loader)
    }
}

impl<T, M, K> Sampler<T> for MetropolisHastings<T, M, K>
where
    T: Float,
    M: Model<T>,
    K: ProposalKernel<T>,
    rand_distr::Standard: rand_distr::Distribution<T>,
{
    /**
    Performs one accept/reject cycle per batch of `loader`.

    Per cycle: draw a candidate from the kernel, evaluate the target on the
    batch, form the log acceptance ratio (with the Hastings correction when
    the kernel is declared asymmetric), and accept iff `log(u) < r`. On
    rejection the model's live parameters and the kernel's center are
    restored to the current state.
    */
    fn draw<L: BatchLoader<T>>(&mut self, loader: &L, record: bool) -> Result<ChainRecord<T>> {
        for batch in loader.batches() {
            let proposed = self.kernel.sample();
            let proposed_val = self.model.log_target(&proposed, batch)?;

            let mut log_rate = proposed_val - self.target_val;
            if !self.symmetric {
                // Forward density before recentering, backward density after.
                let log_q_forward = self.kernel.log_density(&proposed);
                self.kernel.set_density(&proposed);
                let log_q_backward = self.kernel.log_density(&self.theta);
                log_rate = log_rate - log_q_forward + log_q_backward;
            }

            let u: T = self.rng.gen();
            if log_rate > u.ln() {
                self.theta = proposed;
                self.target_val = proposed_val;
                self.accepted = true;
            } else {
                self.model.set_params(&self.theta);
                self.kernel.set_density(&self.theta);
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
        self.target_val = self.model.log_target(&theta0, batch)?;
        self.theta = theta0;
        self.accepted = true;
        Ok(())
    }

    fn chain(&self) -> &ChainStore<T> {
        &self.chain
    }

    fn label(&self) -> &'static str {
        "MH"
    }
}
