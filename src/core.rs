/*!
# Sampler Interface

The common surface of all samplers in this crate. One [`Sampler::draw`] is a
full pass over a loader's mini-batches, each batch driving one accept/reject
cycle; [`Sampler::run`] strings draws into an epoch loop with burn-in, and
[`Sampler::run_with_progress`] adds a progress bar with a rolling acceptance
probability.

Each draw returns an immutable [`ChainRecord`] snapshot of the state it ended
on. Whether that snapshot is also appended to the sampler's [`ChainStore`] is
the caller's choice via the `record` flag, which is how burn-in steps stay out
of the recorded chain.

## Example Usage

```rust,no_run
use minibatch_mcmc::core::Sampler;
use minibatch_mcmc::data::InMemoryLoader;
use minibatch_mcmc::model::GaussianModel;
use minibatch_mcmc::metropolis_hastings::MetropolisHastings;
use ndarray::arr1;

let loader = InMemoryLoader::dummy();
let model = GaussianModel::new(arr1(&[0.0, 0.0]), 1.0);
let mut sampler =
    MetropolisHastings::with_default_kernel(model, arr1(&[0.0, 0.0]), &loader)?.set_seed(42);
sampler.run_with_progress(&loader, 2_000, 500)?;
println!("{}", sampler.chain());
# Ok::<(), minibatch_mcmc::Error>(())
```
*/

use crate::chain::{ChainRecord, ChainStore};
use crate::data::BatchLoader;
use crate::error::Result;
use crate::stats::AcceptanceTracker;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array1;
use num_traits::Float;

/// Sliding window length for the acceptance probability shown while running.
const ACCEPT_WINDOW: usize = 100;

/**
A Markov chain sampler driven by mini-batches.

Implementors provide the single-draw transition, state reset, and access to
the recorded chain; the epoch loops are provided.
*/
pub trait Sampler<T: Float> {
    /**
    Performs one draw: a full pass over `loader`'s batches, one
    accept/reject cycle per batch.

    The returned record is a snapshot of the state after the pass; it is
    appended to the chain only when `record` is true. A loader with zero
    batches leaves the state untouched and records nothing.
    */
    fn draw<L: BatchLoader<T>>(&mut self, loader: &L, record: bool) -> Result<ChainRecord<T>>;

    /// Moves the sampler to `theta0`, re-evaluating the target (and, for
    /// gradient samplers, the gradient) on the first batch of `loader`. No
    /// acceptance decision is made and the recorded chain is kept; clear it
    /// separately via [`ChainStore::reset`] if a fresh segment is wanted.
    fn reset<L: BatchLoader<T>>(&mut self, theta0: Array1<T>, loader: &L) -> Result<()>;

    /// The chain recorded so far.
    fn chain(&self) -> &ChainStore<T>;

    /// Short name shown as the progress bar prefix.
    fn label(&self) -> &'static str {
        "MCMC"
    }

    /// Runs `n_epochs` draws over `loader`, recording only the draws at and
    /// after epoch `n_burnin`.
    fn run<L: BatchLoader<T>>(
        &mut self,
        loader: &L,
        n_epochs: usize,
        n_burnin: usize,
    ) -> Result<()> {
        for epoch in 0..n_epochs {
            self.draw(loader, epoch >= n_burnin)?;
        }
        Ok(())
    }

    /// Same as [`run`](Sampler::run), with a progress bar reporting the
    /// acceptance probability over the last few draws.
    fn run_with_progress<L: BatchLoader<T>>(
        &mut self,
        loader: &L,
        n_epochs: usize,
        n_burnin: usize,
    ) -> Result<()> {
        let pb = ProgressBar::new(n_epochs as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:8} {bar:40.white} ETA {eta:3} | {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_prefix(self.label());

        let mut tracker = AcceptanceTracker::new(ACCEPT_WINDOW);
        for epoch in 0..n_epochs {
            let record = self.draw(loader, epoch >= n_burnin)?;
            tracker.observe(record.accepted);
            pb.set_message(format!("p(accept)≈{:.2}", tracker.rate()));
            pb.inc(1);
        }
        pb.finish_with_message("Done!");
        Ok(())
    }
}
