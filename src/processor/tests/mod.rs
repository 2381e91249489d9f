//! Integration tests for the processor module
//!
//! Exercises batch export against in-memory and mock stores, and the
//! conversion of W2 text files end to end.

pub mod error_handling;
