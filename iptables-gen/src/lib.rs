//! Plan loading and reporting for the `iptables-gen` command.
//!
//! The rule generation itself lives in `iptables-gen-core`; this crate turns
//! TOML plan files and command-line arguments into generator calls and
//! renders the results for a terminal.
//!
//! - [`plan`]: Plan file model, loading, and generator construction
//! - [`rule_args`]: Parsers for rules given as command-line flags
//! - [`check`]: Dry-run validation that reports every failing rule

pub mod check;
pub mod plan;
pub mod rule_args;
