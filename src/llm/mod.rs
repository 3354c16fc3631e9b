//! Language-model plumbing: the generation backend and prompt assembly.

pub mod generate;
pub mod prompt;

pub use generate::{Generator, HttpGenerator};
