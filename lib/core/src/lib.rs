//! Core identifiers and utilities shared by the flowform crates.
//!
//! This crate provides the error `Result` alias and the strongly-typed
//! identifiers used by the parameter model and the reference resolver.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{CanvasId, NodeId, ParseIdError};
