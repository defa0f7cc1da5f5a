//! Subcommand implementations.

pub mod embed;
pub mod extract;
pub mod issue;
pub mod keygen;
pub mod strip;
pub mod verify;
