//! Command line inspector for flowform canvases.
//!
//! Loads a canvas document and prints what the reference picker would offer
//! a node, how stored paths are labelled, and which variables are in scope.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
