//! A small interactive command interpreter.
//!
//! A line is split into pipeline stages on `" | "`, each stage may send its
//! output to a file with `" > "`, and every stage is either one of the
//! builtins (`help`, `version`, `cd`, `wc`, `tee`) or an external program
//! found on `PATH`. Stages run as separate processes connected by pipes; a
//! lone builtin runs inside the shell so that `cd` sticks.
//!
//! The main entry point is [`Interpreter`]. [`pipeline::PipelineExecutor`] is
//! the engine behind it and can be driven directly with the stage texts
//! produced by [`parser::split_pipeline`].

pub mod args;
pub mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod parser;
pub mod pipeline;

pub use config::{Args, Config};
pub use interpreter::Interpreter;
