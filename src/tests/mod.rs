//! Crate-level behavior tests; unit tests live next to their modules.

mod context_tests;
mod culture_tests;
mod precedence_tests;
mod property_tests;
