//! Tests verifying mini-batch Metropolis-Hastings on a Bayesian logistic
//! regression posterior over synthetic data.
//!
//! Each draw sweeps the loader's batches, so the chain records several
//! accept/reject cycles per epoch.

use minibatch_mcmc::core::Sampler;
use minibatch_mcmc::data::InMemoryLoader;
use minibatch_mcmc::kernels::NormalKernel;
use minibatch_mcmc::metropolis_hastings::MetropolisHastings;
use minibatch_mcmc::model::LogisticRegression;
use ndarray::{arr1, Array1, Array2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

#[cfg(test)]
mod tests {
    use super::*;

    /// Draws a synthetic logistic-regression dataset from the given weights.
    fn synthetic_data(
        true_weights: &Array1<f64>,
        n_obs: usize,
        seed: u64,
    ) -> (Array2<f64>, Array1<f64>) {
        let dim = true_weights.len();
        let mut rng = SmallRng::seed_from_u64(seed);
        let data = Array2::from_shape_fn((n_obs, dim), |_| rng.sample(StandardNormal));
        let label: Array1<f64> = data
            .rows()
            .into_iter()
            .map(|row| {
                let z: f64 = row
                    .iter()
                    .zip(true_weights.iter())
                    .map(|(x, w)| x * w)
                    .sum();
                let p = 1.0 / (1.0 + (-z).exp());
                if rng.gen::<f64>() < p {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        (data, label)
    }

    /// Checks that the mini-batch sampler recovers the weights that generated
    /// the data.
    #[test]
    fn test_logistic_posterior_mean_recovery() {
        const N_EPOCHS: usize = 4_000;
        const BURNIN: usize = 1_000;
        const SEED: u64 = 42;
        const N_OBS: usize = 600;
        const BATCH_SIZE: usize = 200;

        let true_weights = arr1(&[1.5, -2.0]);
        let (data, label) = synthetic_data(&true_weights, N_OBS, SEED);
        let loader = InMemoryLoader::split(data, label, BATCH_SIZE);
        assert_eq!(loader.num_batches(), 3);

        let model = LogisticRegression::new(2, 10.0);
        let kernel = NormalKernel::new(Array1::zeros(2), Array1::from_elem(2, 0.25));
        let mut sampler = MetropolisHastings::new(model, kernel, Array1::zeros(2), &loader)
            .expect("Expecting sampler construction to succeed")
            .symmetric(false)
            .set_seed(SEED);
        sampler
            .run(&loader, N_EPOCHS, BURNIN)
            .expect("Expecting sampling to succeed");

        // One record per accept/reject cycle, three cycles per epoch.
        assert_eq!(sampler.chain().len(), (N_EPOCHS - BURNIN) * 3);

        let mean = sampler.chain().mean().expect("Expecting non-empty chain");
        let diff = (&mean - &true_weights).mapv(f64::abs);
        assert!(
            diff.iter().all(|&d| d < 0.75),
            "Posterior mean deviation too large: mean={:?} diff={:?}",
            mean,
            diff
        );

        let rate: f64 = sampler
            .chain()
            .acceptance_rate()
            .expect("Expecting non-empty chain");
        assert!(
            rate > 0.05 && rate < 0.95,
            "Acceptance rate {} outside the healthy range",
            rate
        );
    }

    /// Checks that two runs with the same seed and data produce identical
    /// chains.
    #[test]
    fn test_seeded_runs_are_reproducible() {
        const N_EPOCHS: usize = 200;
        const BURNIN: usize = 50;
        const SEED: u64 = 3;

        let true_weights = arr1(&[1.0, 1.0]);
        let (data, label) = synthetic_data(&true_weights, 90, SEED);
        let loader = InMemoryLoader::split(data, label, 30);

        let run = || {
            let model = LogisticRegression::new(2, 5.0);
            let kernel = NormalKernel::new(Array1::zeros(2), Array1::from_elem(2, 0.5));
            let mut sampler = MetropolisHastings::new(model, kernel, Array1::zeros(2), &loader)
                .expect("Expecting sampler construction to succeed")
                .symmetric(false)
                .set_seed(SEED);
            sampler
                .run(&loader, N_EPOCHS, BURNIN)
                .expect("Expecting sampling to succeed");
            sampler.chain().clone()
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!(first.len(), (N_EPOCHS - BURNIN) * 3);
        assert!(first.grad_vals().is_empty());
    }
}
