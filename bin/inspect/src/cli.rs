//! Command line definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flowform-inspect", version, about = "Inspect reference scopes of a flowform canvas")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the reference picker tree for a node.
    Tree(TreeArgs),
    /// Print the display label of a stored reference path.
    Label(LabelArgs),
    /// List every variable visible to a node.
    Scope(ScopeArgs),
}

/// Arguments shared by every command.
#[derive(Parser, Debug)]
pub struct NodeArgs {
    /// Canvas document JSON.
    #[arg(long = "in")]
    pub in_path: PathBuf,

    /// Title or ID of the node being edited.
    #[arg(long)]
    pub node: String,
}

#[derive(Parser, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub target: NodeArgs,

    /// Accepted kinds of the field. Repeat for several; omit for any.
    #[arg(long = "kind")]
    pub kinds: Vec<String>,

    /// Compare full structure instead of top-level kinds.
    #[arg(long, default_value_t = false)]
    pub strong: bool,

    /// Show incompatible entries as disabled instead of omitting them.
    #[arg(long, default_value_t = false)]
    pub keep_incompatible: bool,
}

#[derive(Parser, Debug)]
pub struct LabelArgs {
    #[command(flatten)]
    pub target: NodeArgs,

    /// Stored reference path.
    #[arg(long)]
    pub path: String,
}

#[derive(Parser, Debug)]
pub struct ScopeArgs {
    #[command(flatten)]
    pub target: NodeArgs,
}
