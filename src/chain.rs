/*!
# Chain Store

Append-only storage for the per-step records a sampler produces: the parameter
vector `theta`, the target log-density `target_val`, the accept flag
`accepted`, and (for gradient samplers) the gradient `grad_val`. The store
keeps one sequence per field; after every [`update`](ChainStore::update) all
sequences have equal length.

The field set is declared up front with a [`ChainSchema`] and checked on every
update and load, so a record missing a required field fails with a typed error
instead of silently recording nothing. Summary queries on an empty store fail
the same way.

`save`/`load` round-trip the whole field-to-sequence mapping as JSON. A load
validates the file against the declared schema (field set, sequence lengths,
uniform theta dimension) before touching the in-memory sequences.

## Example

```rust
use minibatch_mcmc::chain::{ChainRecord, ChainSchema, ChainStore};
use ndarray::arr1;

let mut chain = ChainStore::<f64>::new(ChainSchema::Basic);
chain.update(ChainRecord {
    theta: arr1(&[0.5, -0.5]),
    target_val: -1.25,
    accepted: true,
    grad_val: None,
})?;

assert_eq!(chain.len(), 1);
assert_eq!(chain.mean()?, arr1(&[0.5, -0.5]));
assert_eq!(chain.acceptance_rate()?, 1.0);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/

use crate::error::{Error, Result};
use ndarray::Array1;
use num_traits::Float;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// The field set a chain records, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSchema {
    /// `theta`, `target_val`, `accepted`.
    Basic,
    /// `theta`, `target_val`, `accepted`, `grad_val`.
    Gradient,
}

impl ChainSchema {
    fn fields(&self) -> &'static str {
        match self {
            ChainSchema::Basic => "theta, target_val, accepted",
            ChainSchema::Gradient => "theta, target_val, accepted, grad_val",
        }
    }
}

/// One per-step record, also used as the immutable state snapshot a sampler
/// returns from each draw.
///
/// `grad_val` is `Some` for gradient samplers and `None` otherwise. A store
/// with [`ChainSchema::Basic`] ignores a present gradient; a store with
/// [`ChainSchema::Gradient`] rejects a missing one.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRecord<T> {
    /// Parameter vector at the end of the step.
    pub theta: Array1<T>,
    /// Target log-density at `theta`.
    pub target_val: T,
    /// Whether the step's proposal was accepted.
    pub accepted: bool,
    /// Gradient of the target log-density at `theta`, for gradient samplers.
    pub grad_val: Option<Array1<T>>,
}

/// On-disk layout: the exact field-to-sequence mapping, no schema versioning.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChainData<T> {
    theta: Vec<Array1<T>>,
    target_val: Vec<T>,
    accepted: Vec<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grad_val: Option<Vec<Array1<T>>>,
}

/**
Append-only record storage for one Markov chain.

The store owns its sequences exclusively; samplers append via
[`update`](ChainStore::update) and everyone else reads through the accessors.
All mutating operations preserve the invariant that every schema field has the
same number of recorded values.

# Examples

```rust
use minibatch_mcmc::chain::{ChainRecord, ChainSchema, ChainStore};
use ndarray::arr1;

let mut chain = ChainStore::<f64>::new(ChainSchema::Gradient);
chain.update(ChainRecord {
    theta: arr1(&[1.0]),
    target_val: -0.5,
    accepted: false,
    grad_val: Some(arr1(&[-1.0])),
})?;
assert_eq!(chain.acceptance_rate()?, 0.0);
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStore<T> {
    schema: ChainSchema,
    theta: Vec<Array1<T>>,
    target_val: Vec<T>,
    accepted: Vec<bool>,
    grad_val: Vec<Array1<T>>,
}

impl<T: Float> ChainStore<T> {
    /// Creates an empty store recording the fields `schema` declares.
    pub fn new(schema: ChainSchema) -> Self {
        Self {
            schema,
            theta: Vec::new(),
            target_val: Vec::new(),
            accepted: Vec::new(),
            grad_val: Vec::new(),
        }
    }

    /// The schema declared at construction.
    pub fn schema(&self) -> ChainSchema {
        self.schema
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.theta.len()
    }

    /// Whether no step has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    /// Clears all sequences in place; the schema is kept.
    pub fn reset(&mut self) {
        self.theta.clear();
        self.target_val.clear();
        self.accepted.clear();
        self.grad_val.clear();
    }

    /**
    Appends one record, O(1) amortized.

    Fails with [`Error::MissingField`] if the schema declares `grad_val` and
    the record carries none, and with [`Error::ShapeMismatch`] if the record's
    dimensions disagree with what is already stored. On failure nothing is
    appended.
    */
    pub fn update(&mut self, record: ChainRecord<T>) -> Result<()> {
        if let Some(last) = self.theta.last() {
            if record.theta.len() != last.len() {
                return Err(Error::ShapeMismatch(format!(
                    "theta has dimension {}, chain records dimension {}",
                    record.theta.len(),
                    last.len()
                )));
            }
        }
        let grad = match (self.schema, record.grad_val) {
            (ChainSchema::Basic, _) => None,
            (ChainSchema::Gradient, None) => return Err(Error::MissingField("grad_val")),
            (ChainSchema::Gradient, Some(g)) => {
                if g.len() != record.theta.len() {
                    return Err(Error::ShapeMismatch(format!(
                        "grad_val has dimension {}, theta has dimension {}",
                        g.len(),
                        record.theta.len()
                    )));
                }
                Some(g)
            }
        };

        self.theta.push(record.theta);
        self.target_val.push(record.target_val);
        self.accepted.push(record.accepted);
        if let Some(g) = grad {
            self.grad_val.push(g);
        }
        Ok(())
    }

    /// Returns the most recent record, or [`Error::Empty`] if nothing has
    /// been recorded.
    pub fn state(&self) -> Result<ChainRecord<T>> {
        let theta = self.theta.last().ok_or(Error::Empty("theta"))?.clone();
        let target_val = *self.target_val.last().ok_or(Error::Empty("target_val"))?;
        let accepted = *self.accepted.last().ok_or(Error::Empty("accepted"))?;
        let grad_val = match self.schema {
            ChainSchema::Basic => None,
            ChainSchema::Gradient => {
                Some(self.grad_val.last().ok_or(Error::Empty("grad_val"))?.clone())
            }
        };
        Ok(ChainRecord {
            theta,
            target_val,
            accepted,
            grad_val,
        })
    }

    /// Element-wise mean of the recorded `theta` sequence.
    pub fn mean(&self) -> Result<Array1<T>> {
        let first = self.theta.first().ok_or(Error::Empty("theta"))?;
        let mut acc = first.clone();
        for theta in &self.theta[1..] {
            acc = acc + theta;
        }
        let n = T::from(self.theta.len()).unwrap();
        Ok(acc.mapv(|x| x / n))
    }

    /// Fraction of recorded steps whose proposal was accepted.
    pub fn acceptance_rate(&self) -> Result<T> {
        if self.accepted.is_empty() {
            return Err(Error::Empty("accepted"));
        }
        let n_accepted = self.accepted.iter().filter(|&&a| a).count();
        Ok(T::from(n_accepted).unwrap() / T::from(self.accepted.len()).unwrap())
    }

    /// The trace of coordinate `coord` across all recorded samples.
    ///
    /// An empty chain yields an empty trace; a coordinate outside the
    /// recorded dimension is a shape error.
    pub fn theta_trace(&self, coord: usize) -> Result<Vec<T>> {
        if let Some(first) = self.theta.first() {
            if coord >= first.len() {
                return Err(Error::ShapeMismatch(format!(
                    "coordinate {} out of range for dimension {}",
                    coord,
                    first.len()
                )));
            }
        }
        Ok(self.theta.iter().map(|t| t[coord]).collect())
    }

    /// Recorded parameter vectors, oldest first.
    pub fn thetas(&self) -> &[Array1<T>] {
        &self.theta
    }

    /// Recorded target log-density values, oldest first.
    pub fn target_vals(&self) -> &[T] {
        &self.target_val
    }

    /// Recorded accept flags, oldest first.
    pub fn accepted(&self) -> &[bool] {
        &self.accepted
    }

    /// Recorded gradients, oldest first; empty for [`ChainSchema::Basic`].
    pub fn grad_vals(&self) -> &[Array1<T>] {
        &self.grad_val
    }
}

impl<T: Float + Serialize + DeserializeOwned> ChainStore<T> {
    /// Writes the whole field-to-sequence mapping to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let grad_val = match self.schema {
            ChainSchema::Basic => None,
            ChainSchema::Gradient => Some(self.grad_val.clone()),
        };
        let data = ChainData {
            theta: self.theta.clone(),
            target_val: self.target_val.clone(),
            accepted: self.accepted.clone(),
            grad_val,
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &data)?;
        writer.flush()?;
        Ok(())
    }

    /**
    Replaces the in-memory sequences with the contents of `path`.

    The file is validated against the declared schema before anything is
    replaced: the field set must match exactly, all sequences must have equal
    length, and every stored vector must share one dimension. On any failure
    the store is left untouched.
    */
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        let data: ChainData<T> = serde_json::from_reader(reader)?;

        let grad_val = match (self.schema, data.grad_val) {
            (ChainSchema::Basic, None) => Vec::new(),
            (ChainSchema::Gradient, Some(g)) => g,
            (schema, found) => {
                let found_fields = match found {
                    Some(_) => ChainSchema::Gradient.fields(),
                    None => ChainSchema::Basic.fields(),
                };
                return Err(Error::SchemaMismatch(format!(
                    "expected fields [{}], file has [{}]",
                    schema.fields(),
                    found_fields
                )));
            }
        };

        let n = data.theta.len();
        if data.target_val.len() != n || data.accepted.len() != n {
            return Err(Error::ShapeMismatch(format!(
                "sequence lengths disagree: theta={}, target_val={}, accepted={}",
                n,
                data.target_val.len(),
                data.accepted.len()
            )));
        }
        if self.schema == ChainSchema::Gradient && grad_val.len() != n {
            return Err(Error::ShapeMismatch(format!(
                "sequence lengths disagree: theta={}, grad_val={}",
                n,
                grad_val.len()
            )));
        }
        if let Some(first) = data.theta.first() {
            let dim = first.len();
            if data.theta.iter().any(|t| t.len() != dim)
                || grad_val.iter().any(|g| g.len() != dim)
            {
                return Err(Error::ShapeMismatch(format!(
                    "stored vectors do not share dimension {dim}"
                )));
            }
        }

        self.theta = data.theta;
        self.target_val = data.target_val;
        self.accepted = data.accepted;
        self.grad_val = grad_val;
        Ok(())
    }
}

impl<T: Float> fmt::Display for ChainStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Markov chain containing {} samples", self.len())
    }
}
