//! IDE features module.

pub mod backend;
pub mod check;
pub mod completion;
pub mod diagnostics;
pub mod goto_definition;
mod handlers;
pub mod position;
pub mod references;
pub mod state;
