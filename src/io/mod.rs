/*!
Exports recorded chains to external formats.

Currently CSV is the only supported format; enable the `csv` feature to
compile it.
*/

#[cfg(feature = "csv")]
pub mod csv;
