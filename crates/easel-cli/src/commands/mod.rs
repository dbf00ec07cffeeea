//! CLI command implementations.

pub(crate) mod extension;
