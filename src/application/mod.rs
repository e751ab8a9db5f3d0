//! Application layer: workflows built on the infrastructure facades.
pub mod use_cases;
