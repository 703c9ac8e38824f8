//! Unit tests for the label JSON format.
//!
//! These cover the per-variant layout, legacy inputs, error reporting and
//! the wrapped collection form.

mod label_json_tests;
