use thiserror::Error;

/// Errors produced by model-level queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// `merge_contracts` was called with no contracts.
    #[error("cannot merge an empty list of contracts")]
    EmptyMerge,
}
