/*!
# I/O Utilities for Saving Recorded Chains to CSV

This module provides a function to save recorded chain data to CSV files.
Enable via the `csv` feature.
*/

use crate::chain::{ChainSchema, ChainStore};
use crate::error::Result;
use num_traits::Float;
use std::fmt::Display;
use std::fs::File;
use std::path::Path;

use csv::Writer;

/**
Saves a recorded chain as a CSV file.

The resulting CSV file will have:
- A header row containing one column per parameter coordinate named
  `"theta_0"`, `"theta_1"`, etc., followed by `"target_val"` and `"accepted"`.
  Chains recording the [`ChainSchema::Gradient`] field set additionally get
  `"grad_0"`, `"grad_1"`, etc.
- One subsequent row per recorded step, with `accepted` written as `0` or `1`.

An empty chain produces a file containing only the `"target_val,accepted"`
header, since the parameter dimension is unknown before the first record.

# Arguments

* `chain` - The chain store whose recorded steps will be written.
* `path` - The file path where the CSV data will be written.

# Returns

Returns `Ok(())` if successful, or an error if any I/O or CSV formatting
issue occurs.

# Examples

```rust
use minibatch_mcmc::chain::{ChainRecord, ChainSchema, ChainStore};
use minibatch_mcmc::io::csv::save_csv;
use ndarray::arr1;

let mut chain = ChainStore::new(ChainSchema::Basic);
chain.update(ChainRecord {
    theta: arr1(&[0.5, -1.0]),
    target_val: -2.25,
    accepted: true,
    grad_val: None,
})?;
save_csv(&chain, "/tmp/chain.csv")?;
# Ok::<(), minibatch_mcmc::Error>(())
```
*/
pub fn save_csv<T, P>(chain: &ChainStore<T>, path: P) -> Result<()>
where
    T: Float + Display,
    P: AsRef<Path>,
{
    let mut wtr = Writer::from_writer(File::create(path)?);
    let n_dims = chain.thetas().first().map_or(0, |theta| theta.len());
    let with_grads = chain.schema() == ChainSchema::Gradient;

    let mut header: Vec<String> = (0..n_dims).map(|i| format!("theta_{}", i)).collect();
    header.push("target_val".to_string());
    header.push("accepted".to_string());
    if with_grads {
        header.extend((0..n_dims).map(|i| format!("grad_{}", i)));
    }
    wtr.write_record(&header)?;

    for idx in 0..chain.len() {
        let mut row: Vec<String> = chain.thetas()[idx].iter().map(|v| v.to_string()).collect();
        row.push(chain.target_vals()[idx].to_string());
        row.push(if chain.accepted()[idx] { "1" } else { "0" }.to_string());
        if with_grads {
            row.extend(chain.grad_vals()[idx].iter().map(|v| v.to_string()));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainRecord;
    use csv::Reader;
    use ndarray::arr1;
    use std::fs;
    use tempfile::NamedTempFile;

    /// Test saving an empty chain to CSV.
    #[test]
    fn test_save_csv_empty_chain() {
        let chain = ChainStore::<f64>::new(ChainSchema::Basic);
        let file = NamedTempFile::new().expect("Could not create temp file");
        let filename = file.path().to_str().unwrap();

        let result = save_csv(&chain, filename);
        assert!(
            result.is_ok(),
            "Saving empty chain to CSV failed: {:?}",
            result
        );

        // The function writes a header even if there's no data; without a
        // first record the parameter columns are unknown.
        let contents = fs::read_to_string(filename).unwrap();
        assert_eq!(contents.trim(), "target_val,accepted");
    }

    /// Test saving a chain with a single recorded step to CSV.
    #[test]
    fn test_save_csv_single_step() {
        let mut chain = ChainStore::new(ChainSchema::Basic);
        chain
            .update(ChainRecord {
                theta: arr1(&[0.5, -1.0]),
                target_val: -2.25,
                accepted: true,
                grad_val: None,
            })
            .unwrap();
        let file = NamedTempFile::new().expect("Could not create temp file");
        let filename = file.path().to_str().unwrap();

        let result = save_csv(&chain, filename);
        assert!(
            result.is_ok(),
            "Saving single step to CSV failed: {:?}",
            result
        );

        let contents = fs::read_to_string(filename).unwrap();
        let expected = "theta_0,theta_1,target_val,accepted\n0.5,-1,-2.25,1";
        assert_eq!(contents.trim(), expected);
    }

    /// Test that a gradient-recording chain gets gradient columns.
    #[test]
    fn test_save_csv_gradient_chain() {
        let mut chain = ChainStore::new(ChainSchema::Gradient);
        chain
            .update(ChainRecord {
                theta: arr1(&[1.5]),
                target_val: -0.5,
                accepted: false,
                grad_val: Some(arr1(&[0.25])),
            })
            .unwrap();
        let file = NamedTempFile::new().expect("Could not create temp file");
        let filename = file.path().to_str().unwrap();

        let result = save_csv(&chain, filename);
        assert!(result.is_ok());

        let contents = fs::read_to_string(filename).unwrap();
        let expected = "\
theta_0,target_val,accepted,grad_0
1.5,-0.5,0,0.25";
        assert_eq!(contents.trim(), expected);
    }

    #[test]
    fn test_save_csv_parses_back() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut chain = ChainStore::new(ChainSchema::Basic);
        chain.update(ChainRecord {
            theta: arr1(&[1.0, 2.0]),
            target_val: -1.0,
            accepted: true,
            grad_val: None,
        })?;
        chain.update(ChainRecord {
            theta: arr1(&[3.0, 4.0]),
            target_val: -4.0,
            accepted: false,
            grad_val: None,
        })?;
        let file = NamedTempFile::new()?;
        let filename = file.path().to_str().unwrap();
        save_csv(&chain, filename)?;
        let contents = fs::read_to_string(filename)?;

        // Use csv::Reader to parse the CSV file.
        let mut rdr = Reader::from_reader(contents.as_bytes());
        let headers = rdr.headers()?;
        assert_eq!(&headers[0], "theta_0");
        assert_eq!(&headers[1], "theta_1");
        assert_eq!(&headers[2], "target_val");
        assert_eq!(&headers[3], "accepted");

        let records: Vec<_> = rdr.records().collect::<std::result::Result<_, _>>()?;
        assert_eq!(records.len(), 2);

        // Row 0: theta [1, 2], target -1, accepted.
        // Row 1: theta [3, 4], target -4, rejected.
        let expected = [vec!["1", "2", "-1", "1"], vec!["3", "4", "-4", "0"]];
        for (record, exp) in records.iter().zip(expected.iter()) {
            for (field, &exp_field) in record.iter().zip(exp.iter()) {
                assert_eq!(field, exp_field);
            }
        }
        Ok(())
    }
}
