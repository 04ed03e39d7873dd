//! gifpop CLI crate
//!
//! Commands (see [commands]):
//! - run: load a TOML experiment, simulate it and write JSON results.
//! - inspect: print the constants a population derives at calibration.
//! - params: print the default population parameters as TOML.
//!
//! The binary (src/main.rs) wires up logging and argument parsing and calls
//! [`GifPopCli::execute`]; the library surface exists so commands can be
//! driven from tests without spawning a process.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::GifPopCli;
