// lib.rs - Library root for the coderef binary, benchmarks and integration tests.
//
// The binary entry point lives in main.rs and only handles argument dispatch.

pub mod cli;
pub mod reference;
pub mod state;
// test_utils is available in test builds and when the `test-support` feature is enabled.
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
