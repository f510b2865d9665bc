//! Ready-made context vocabularies.
//!
//! Population only: each function here just binds a list of entities into a
//! [`ContextBuilder`](crate::MathContext). The interesting machinery — the
//! trie, the scanner, the dispatch — neither knows nor cares which
//! vocabulary filled the table.

mod complex;
mod programming;
mod scientific;

pub use complex::complex_scientific;
pub use programming::programming;
pub use scientific::{decimal_scientific, scientific};
