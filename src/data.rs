/*!
Mini-batch data plumbing for the samplers.

A [`Batch`] couples one block of observations with its labels. A
[`BatchLoader`] hands out a fresh, lazy pass over its batches every time
[`BatchLoader::batches`] is called, so each sampler draw re-iterates the data
from the start. Zero-batch loaders are legal: a draw over one is a no-op.

Targets that do not depend on data (plain densities) still go through this
interface; use [`InMemoryLoader::dummy`] to get a single empty batch.

# Examples

```rust
use minibatch_mcmc::data::{Batch, BatchLoader, InMemoryLoader};
use ndarray::{arr1, arr2};

let loader = InMemoryLoader::new(vec![
    Batch::new(arr2(&[[0.5, 1.0], [1.5, 2.0]]), arr1(&[0.0, 1.0])),
    Batch::new(arr2(&[[2.5, 3.0]]), arr1(&[1.0])),
]);
assert_eq!(loader.batches().count(), 2);
```
*/

use ndarray::{Array1, Array2};
use num_traits::Float;

/// One mini-batch of observations: a `data` matrix with one row per
/// observation and a `label` vector with one entry per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// Observation matrix of shape `[n_obs, n_features]`.
    pub data: Array2<T>,
    /// Label vector of length `n_obs`.
    pub label: Array1<T>,
}

impl<T> Batch<T> {
    /// Creates a batch from a data matrix and its label vector.
    pub fn new(data: Array2<T>, label: Array1<T>) -> Self {
        Self { data, label }
    }

    /// Number of observations in the batch.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Whether the batch carries no observations.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }
}

impl<T: Float> Batch<T> {
    /// An empty batch, for targets that do not depend on data.
    pub fn dummy() -> Self {
        Self::new(Array2::zeros((0, 0)), Array1::zeros(0))
    }
}

/// A restartable source of mini-batches.
///
/// Every call to [`batches`](BatchLoader::batches) starts a fresh pass over
/// the same batches in the same order; the samplers call it once per draw.
pub trait BatchLoader<T> {
    /// Starts a new lazy pass over the batches.
    fn batches(&self) -> Box<dyn Iterator<Item = &Batch<T>> + '_>;
}

/// A [`BatchLoader`] over a fixed in-memory batch list.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryLoader<T> {
    batches: Vec<Batch<T>>,
}

impl<T: Float> InMemoryLoader<T> {
    /// Creates a loader that replays `batches` in order on every pass.
    pub fn new(batches: Vec<Batch<T>>) -> Self {
        Self { batches }
    }

    /// Creates a loader with a single, empty batch.
    ///
    /// This is the conventional way to drive a data-independent target: the
    /// samplers still get exactly one accept/reject cycle per draw, and the
    /// model ignores the batch contents.
    pub fn dummy() -> Self {
        Self {
            batches: vec![Batch::dummy()],
        }
    }

    /// Splits `data`/`label` into batches of at most `batch_size` rows,
    /// preserving row order.
    pub fn split(data: Array2<T>, label: Array1<T>, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        let n = data.nrows();
        let mut batches = Vec::with_capacity(n.div_ceil(batch_size));
        let mut start = 0;
        while start < n {
            let end = (start + batch_size).min(n);
            batches.push(Batch::new(
                data.slice(ndarray::s![start..end, ..]).to_owned(),
                label.slice(ndarray::s![start..end]).to_owned(),
            ));
            start = end;
        }
        Self { batches }
    }

    /// Number of batches per pass.
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }
}

impl<T> BatchLoader<T> for InMemoryLoader<T> {
    fn batches(&self) -> Box<dyn Iterator<Item = &Batch<T>> + '_> {
        Box::new(self.batches.iter())
    }
}
