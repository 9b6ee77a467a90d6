//! bndx — explore dependency relationships in a bnd workspace.
//!
//! Scans a workspace of bnd projects, resolves each project's transitive
//! build and test dependencies, and reports them in dependency order for
//! import into an Eclipse workspace.

pub mod cli;
pub mod core;
