/*!
# Target Models

The sampler-facing oracle interface. A [`Model`] evaluates the target
log-density for a parameter vector on one mini-batch and exposes its live
parameter state through [`set_params`](Model::set_params); a
[`GradientModel`] additionally returns the gradient of the log-density.

Evaluating the target at a proposal is allowed to move the model's live
parameters to that proposal. Samplers rely on this contract: after a rejected
step they restore the previous parameters explicitly instead of assuming the
evaluation was side-effect free.

Two reference models ship with the crate: an isotropic [`GaussianModel`]
(data independent, useful for validating samplers against known moments) and
a Bayesian [`LogisticRegression`] with a Gaussian prior.

## Example Usage

```rust
use minibatch_mcmc::data::Batch;
use minibatch_mcmc::model::{GaussianModel, GradientModel};
use ndarray::arr1;

let mut model = GaussianModel::new(arr1(&[1.0, -1.0]), 2.0);
let batch = Batch::dummy();
let (val, grad) = model.log_target_with_grad(&arr1(&[1.0, -1.0]), &batch)?;
assert_eq!(val, 0.0);
assert_eq!(grad, arr1(&[0.0, 0.0]));
# Ok::<(), minibatch_mcmc::Error>(())
```
*/

use crate::data::Batch;
use crate::error::Result;
use ndarray::{Array1, LinalgScalar};
use num_traits::Float;

/**
A target distribution evaluated on mini-batches.

`log_target` is the only way samplers see the target: it returns the
log-density (up to an additive constant) of `theta` given one batch of data.
The call may leave the model's live parameters at `theta`; callers that need
the previous parameters back use [`set_params`](Model::set_params).
*/
pub trait Model<T: Float> {
    /// Log-density of the target at `theta` for one mini-batch, up to an
    /// additive constant. May move the live parameters to `theta`.
    fn log_target(&mut self, theta: &Array1<T>, batch: &Batch<T>) -> Result<T>;

    /// Sets the live parameters to `theta`.
    fn set_params(&mut self, theta: &Array1<T>);

    /// Dimension of the parameter vector.
    fn num_params(&self) -> usize;
}

/// A [`Model`] that can also differentiate its log-density.
pub trait GradientModel<T: Float>: Model<T> {
    /// Log-density and its gradient at `theta` for one mini-batch. Carries
    /// the same live-parameter contract as [`Model::log_target`].
    fn log_target_with_grad(
        &mut self,
        theta: &Array1<T>,
        batch: &Batch<T>,
    ) -> Result<(T, Array1<T>)>;
}

/**
Isotropic Gaussian target with known mean and shared standard deviation.

The log-density is `-0.5 * ||theta - mean||^2 / std^2`, dropping the additive
normalizing constant. The model ignores its batch argument, so it pairs with
[`InMemoryLoader::dummy`](crate::data::InMemoryLoader::dummy).

# Examples

```rust
use minibatch_mcmc::data::Batch;
use minibatch_mcmc::model::{GaussianModel, Model};
use ndarray::arr1;

let mut model = GaussianModel::new(arr1(&[0.0]), 1.0);
let val = model.log_target(&arr1(&[2.0]), &Batch::dummy())?;
assert_eq!(val, -2.0);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
#[derive(Debug, Clone)]
pub struct GaussianModel<T> {
    /// Mean of the target.
    pub mean: Array1<T>,
    /// Shared standard deviation, strictly positive.
    pub std: T,
    params: Array1<T>,
}

impl<T: Float> GaussianModel<T> {
    /// Creates the target with live parameters initialized to `mean`.
    pub fn new(mean: Array1<T>, std: T) -> Self {
        let params = mean.clone();
        Self { mean, std, params }
    }

    /// The current live parameters.
    pub fn params(&self) -> &Array1<T> {
        &self.params
    }
}

impl<T: Float> Model<T> for GaussianModel<T> {
    fn log_target(&mut self, theta: &Array1<T>, _batch: &Batch<T>) -> Result<T> {
        self.set_params(theta);
        let half = T::from(0.5).unwrap();
        let var = self.std * self.std;
        let sq_norm = self
            .params
            .iter()
            .zip(self.mean.iter())
            .fold(T::zero(), |acc, (&p, &m)| acc + (p - m) * (p - m));
        Ok(-half * sq_norm / var)
    }

    fn set_params(&mut self, theta: &Array1<T>) {
        self.params = theta.clone();
    }

    fn num_params(&self) -> usize {
        self.mean.len()
    }
}

impl<T: Float> GradientModel<T> for GaussianModel<T> {
    fn log_target_with_grad(
        &mut self,
        theta: &Array1<T>,
        batch: &Batch<T>,
    ) -> Result<(T, Array1<T>)> {
        let val = self.log_target(theta, batch)?;
        let var = self.std * self.std;
        let grad = self
            .params
            .iter()
            .zip(self.mean.iter())
            .map(|(&p, &m)| -(p - m) / var)
            .collect::<Array1<T>>();
        Ok((val, grad))
    }
}

/**
Bayesian logistic regression with an isotropic Gaussian prior on the weights.

For a batch with design matrix `X` and binary labels `y`, the log-density is

```text
sum_i [ y_i * z_i - softplus(z_i) ]  -  0.5 * ||theta||^2 / prior_std^2
```

with `z = X theta`, evaluated through a numerically stable softplus. The
gradient is `X^T (y - sigmoid(z)) - theta / prior_std^2`.

# Examples

```rust
use minibatch_mcmc::data::Batch;
use minibatch_mcmc::model::{LogisticRegression, Model};
use ndarray::{arr1, arr2};

let mut model = LogisticRegression::new(2, 10.0);
let batch = Batch::new(arr2(&[[1.0, 0.5], [1.0, -0.5]]), arr1(&[1.0, 0.0]));
let val = model.log_target(&arr1(&[0.0, 0.0]), &batch)?;
assert!((val - (-2.0 * 2.0_f64.ln())).abs() < 1e-12);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
#[derive(Debug, Clone)]
pub struct LogisticRegression<T> {
    /// Standard deviation of the Gaussian prior on every weight.
    pub prior_std: T,
    params: Array1<T>,
}

/// `ln(1 + exp(z))` without overflow for large `|z|`.
fn softplus<T: Float>(z: T) -> T {
    z.max(T::zero()) + (-z.abs()).exp().ln_1p()
}

fn sigmoid<T: Float>(z: T) -> T {
    T::one() / (T::one() + (-z).exp())
}

impl<T: Float> LogisticRegression<T> {
    /// Creates the model with `dim` weights, all starting at zero.
    pub fn new(dim: usize, prior_std: T) -> Self {
        Self {
            prior_std,
            params: Array1::zeros(dim),
        }
    }

    /// The current live parameters.
    pub fn params(&self) -> &Array1<T> {
        &self.params
    }
}

impl<T: Float + LinalgScalar> Model<T> for LogisticRegression<T> {
    fn log_target(&mut self, theta: &Array1<T>, batch: &Batch<T>) -> Result<T> {
        self.set_params(theta);
        let z = batch.data.dot(&self.params);
        let log_lik = z
            .iter()
            .zip(batch.label.iter())
            .fold(T::zero(), |acc, (&z_i, &y_i)| {
                acc + y_i * z_i - softplus(z_i)
            });
        let half = T::from(0.5).unwrap();
        let prior_var = self.prior_std * self.prior_std;
        let log_prior = -half * self.params.iter().fold(T::zero(), |acc, &w| acc + w * w)
            / prior_var;
        Ok(log_lik + log_prior)
    }

    fn set_params(&mut self, theta: &Array1<T>) {
        self.params = theta.clone();
    }

    fn num_params(&self) -> usize {
        self.params.len()
    }
}

impl<T: Float + LinalgScalar> GradientModel<T> for LogisticRegression<T> {
    fn log_target_with_grad(
        &mut self,
        theta: &Array1<T>,
        batch: &Batch<T>,
    ) -> Result<(T, Array1<T>)> {
        let val = self.log_target(theta, batch)?;
        let z = batch.data.dot(&self.params);
        let residual = z
            .iter()
            .zip(batch.label.iter())
            .map(|(&z_i, &y_i)| y_i - sigmoid(z_i))
            .collect::<Array1<T>>();
        let prior_var = self.prior_std * self.prior_std;
        let grad = batch.data.t().dot(&residual) - self.params.mapv(|w| w / prior_var);
        Ok((val, grad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    /// Central finite difference of `log_target` along each coordinate.
    fn numeric_grad<M: Model<f64>>(
        model: &mut M,
        theta: &Array1<f64>,
        batch: &Batch<f64>,
    ) -> Array1<f64> {
        let h = 1e-6;
        let mut grad = Array1::zeros(theta.len());
        for i in 0..theta.len() {
            let mut plus = theta.clone();
            let mut minus = theta.clone();
            plus[i] += h;
            minus[i] -= h;
            let f_plus = model.log_target(&plus, batch).unwrap();
            let f_minus = model.log_target(&minus, batch).unwrap();
            grad[i] = (f_plus - f_minus) / (2.0 * h);
        }
        grad
    }

    #[test]
    fn gaussian_log_target_peaks_at_mean() {
        let mut model = GaussianModel::new(arr1(&[1.0, -2.0]), 0.5);
        let batch = Batch::dummy();
        let at_mean = model.log_target(&arr1(&[1.0, -2.0]), &batch).unwrap();
        let off_mean = model.log_target(&arr1(&[1.5, -2.0]), &batch).unwrap();
        assert_eq!(at_mean, 0.0);
        assert_abs_diff_eq!(off_mean, -0.5 * 0.25 / 0.25, epsilon = 1e-12);
    }

    #[test]
    fn gaussian_evaluation_moves_live_params() {
        let mut model = GaussianModel::new(arr1(&[0.0]), 1.0);
        model.log_target(&arr1(&[3.0]), &Batch::dummy()).unwrap();
        assert_eq!(model.params(), &arr1(&[3.0]));
        model.set_params(&arr1(&[-1.0]));
        assert_eq!(model.params(), &arr1(&[-1.0]));
    }

    #[test]
    fn gaussian_gradient_matches_finite_differences() {
        let mut model = GaussianModel::new(arr1(&[0.5, -1.5, 2.0]), 1.3);
        let batch = Batch::dummy();
        let theta = arr1(&[0.1, 0.2, -0.3]);
        let (_, grad) = model.log_target_with_grad(&theta, &batch).unwrap();
        let numeric = numeric_grad(&mut model, &theta, &batch);
        assert_abs_diff_eq!(grad, numeric, epsilon = 1e-4);
    }

    #[test]
    fn logistic_log_target_at_zero_weights() {
        let mut model = LogisticRegression::new(2, 1.0);
        let batch = Batch::new(
            arr2(&[[1.0, 2.0], [0.5, -1.0], [-2.0, 0.0]]),
            arr1(&[1.0, 0.0, 1.0]),
        );
        // z = 0 everywhere, so every observation contributes -ln 2 and the
        // prior contributes nothing.
        let val = model.log_target(&arr1(&[0.0, 0.0]), &batch).unwrap();
        assert_abs_diff_eq!(val, -3.0 * 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn logistic_gradient_matches_finite_differences() {
        let mut model = LogisticRegression::new(3, 2.5);
        let batch = Batch::new(
            arr2(&[
                [1.0, 0.3, -0.8],
                [1.0, -1.2, 0.4],
                [1.0, 2.0, 1.1],
                [1.0, 0.0, -0.5],
            ]),
            arr1(&[1.0, 0.0, 1.0, 0.0]),
        );
        let theta = arr1(&[0.4, -0.7, 0.2]);
        let (_, grad) = model.log_target_with_grad(&theta, &batch).unwrap();
        let numeric = numeric_grad(&mut model, &theta, &batch);
        assert_abs_diff_eq!(grad, numeric, epsilon = 1e-4);
    }

    #[test]
    fn softplus_is_stable_for_large_inputs() {
        assert_abs_diff_eq!(softplus(800.0_f64), 800.0, epsilon = 1e-9);
        assert_abs_diff_eq!(softplus(-800.0_f64), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(softplus(0.0_f64), 2.0_f64.ln(), epsilon = 1e-12);
    }
}
