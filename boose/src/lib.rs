//! BOOSE interpreter library
//!
//! A line-oriented drawing language: variables, expressions, arrays,
//! `if`/`while`/`for` blocks and parameterised methods, with drawing
//! commands issued against a [`Canvas`].

pub mod canvas;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod repl;
pub mod util;

pub use canvas::{Canvas, CanvasOp, RecordingCanvas};
pub use config::Config;
pub use error::{BooseError, LineError, Result};
pub use interp::{Interpreter, RunOptions, Scope, Value};
