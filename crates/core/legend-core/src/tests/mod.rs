//! Unit tests for the generation pipeline.
//!
//! Each file covers one stage against the built-in template library.




#[cfg(test)]
mod generator_tests;
