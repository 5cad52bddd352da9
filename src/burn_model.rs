/*!
# Burn-Backed Models

Adapter that turns a `burn` tensor expression into a [`Model`] /
[`GradientModel`], so the samplers can consume autodiff gradients without a
hand-derived gradient. The target is given as a closure mapping
`(theta, data, label)` tensors to a single-element log-density tensor; the
gradient comes from one backward pass per evaluation.

The adapter converts between `ndarray` arrays at the sampler boundary and
tensors on the backend's default device per call. Batches are small in the
mini-batch setting, so the conversion cost is dominated by the oracle itself.

## Example Usage

```rust
use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use minibatch_mcmc::burn_model::BurnModel;
use minibatch_mcmc::data::Batch;
use minibatch_mcmc::model::GradientModel;
use ndarray::arr1;

type B = Autodiff<NdArray<f64>>;

// Standard normal log-density, ignoring the batch.
let mut model = BurnModel::<f64, B, _>::new(
    |theta: Tensor<B, 1>, _data, _label| theta.powi_scalar(2).sum().mul_scalar(-0.5),
    2,
);
let (val, grad) = model.log_target_with_grad(&arr1(&[1.0, 2.0]), &Batch::dummy())?;
assert!((val - (-2.5)).abs() < 1e-9);
assert!((grad[0] - (-1.0)).abs() < 1e-9);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Element, ElementConversion, Tensor};
use ndarray::{Array1, Array2};
use num_traits::Float;

use crate::data::Batch;
use crate::error::{Error, Result};
use crate::model::{GradientModel, Model};

fn array1_to_tensor<T, B>(arr: &Array1<T>, device: &B::Device) -> Tensor<B, 1>
where
    T: Element,
    B: Backend,
{
    let data: Vec<B::FloatElem> = arr.iter().map(|&x| B::FloatElem::from_elem(x)).collect();
    let td: TensorData = TensorData::new(data, [arr.len()]);
    Tensor::from_data(td, device)
}

fn array2_to_tensor<T, B>(arr: &Array2<T>, device: &B::Device) -> Tensor<B, 2>
where
    T: Element,
    B: Backend,
{
    let (rows, cols) = arr.dim();
    let data: Vec<B::FloatElem> = arr.iter().map(|&x| B::FloatElem::from_elem(x)).collect();
    let td: TensorData = TensorData::new(data, [rows, cols]);
    Tensor::from_data(td, device)
}

fn tensor_to_array1<T, B>(tensor: Tensor<B, 1>) -> Result<Array1<T>>
where
    T: Element,
    B: Backend,
{
    let vec = tensor
        .into_data()
        .to_vec::<T>()
        .map_err(|err| Error::Model(format!("{err:?}").into()))?;
    Ok(Array1::from_vec(vec))
}

/**
A [`Model`] whose log-density is a `burn` tensor expression.

# Type Parameters
- `T`: The floating-point type at the sampler boundary (e.g. `f32` or `f64`).
- `B`: The autodiff backend from the `burn` crate.
- `F`: The log-density closure, mapping `(theta [D], data [N, C], label [N])`
  tensors to a `[1]` log-density tensor.

# Examples

```rust
use burn::backend::{Autodiff, NdArray};
use burn::tensor::Tensor;
use minibatch_mcmc::burn_model::BurnModel;
use minibatch_mcmc::data::Batch;
use minibatch_mcmc::model::Model;
use ndarray::arr1;

type B = Autodiff<NdArray<f64>>;

let mut model = BurnModel::<f64, B, _>::new(
    |theta: Tensor<B, 1>, _data, _label| theta.sum().mul_scalar(-1.0),
    3,
);
let val = model.log_target(&arr1(&[1.0, 2.0, 3.0]), &Batch::dummy())?;
assert!((val - (-6.0)).abs() < 1e-9);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
#[derive(Clone)]
pub struct BurnModel<T, B, F>
where
    B: AutodiffBackend,
{
    logp: F,
    params: Array1<T>,
    device: B::Device,
}

impl<T, B, F> BurnModel<T, B, F>
where
    T: Float + Element + ElementConversion,
    B: AutodiffBackend,
    F: Fn(Tensor<B, 1>, Tensor<B, 2>, Tensor<B, 1>) -> Tensor<B, 1>,
{
    /// Wraps `logp` as a model with `num_params` parameters, starting at
    /// zero, on the backend's default device.
    pub fn new(logp: F, num_params: usize) -> Self {
        Self {
            logp,
            params: Array1::zeros(num_params),
            device: B::Device::default(),
        }
    }

    /// The current live parameters.
    pub fn params(&self) -> &Array1<T> {
        &self.params
    }

    fn batch_tensors(&self, batch: &Batch<T>) -> (Tensor<B, 2>, Tensor<B, 1>) {
        (
            array2_to_tensor::<T, B>(&batch.data, &self.device),
            array1_to_tensor::<T, B>(&batch.label, &self.device),
        )
    }
}

impl<T, B, F> Model<T> for BurnModel<T, B, F>
where
    T: Float + Element + ElementConversion,
    B: AutodiffBackend,
    F: Fn(Tensor<B, 1>, Tensor<B, 2>, Tensor<B, 1>) -> Tensor<B, 1>,
{
    fn log_target(&mut self, theta: &Array1<T>, batch: &Batch<T>) -> Result<T> {
        self.set_params(theta);
        let position = array1_to_tensor::<T, B>(&self.params, &self.device);
        let (data, label) = self.batch_tensors(batch);
        let logp = (self.logp)(position, data, label);
        Ok(T::from_elem(logp.into_scalar()))
    }

    fn set_params(&mut self, theta: &Array1<T>) {
        self.params = theta.clone();
    }

    fn num_params(&self) -> usize {
        self.params.len()
    }
}

impl<T, B, F> GradientModel<T> for BurnModel<T, B, F>
where
    T: Float + Element + ElementConversion,
    B: AutodiffBackend,
    F: Fn(Tensor<B, 1>, Tensor<B, 2>, Tensor<B, 1>) -> Tensor<B, 1>,
{
    fn log_target_with_grad(
        &mut self,
        theta: &Array1<T>,
        batch: &Batch<T>,
    ) -> Result<(T, Array1<T>)> {
        self.set_params(theta);
        let position = array1_to_tensor::<T, B>(&self.params, &self.device)
            .detach()
            .require_grad();
        let (data, label) = self.batch_tensors(batch);
        let logp = (self.logp)(position.clone(), data, label);
        let grad_inner = position
            .grad(&logp.backward())
            .ok_or_else(|| Error::Model("log-density is not connected to the parameters".into()))?;
        let grad = tensor_to_array1::<T, _>(grad_inner)?;
        Ok((T::from_elem(logp.into_scalar()), grad))
    }
}
