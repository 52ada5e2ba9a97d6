//! Host-side input surface. The headless binary reads commands from stdin.

pub mod console;

pub use console::{ParseCommandError, StageCommand, HELP};
