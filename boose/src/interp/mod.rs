//! BOOSE interpreter
//!
//! Line-oriented execution of BOOSE programs: expression evaluation, variable
//! scopes, the command registry, user methods and block control flow.

pub mod blocks;
pub mod commands;
pub mod eval;
pub mod frame;
pub mod interpreter;
pub mod method;
pub mod scope;
pub mod value;

pub use blocks::BlockMap;
pub use commands::{Args, Command, CommandRegistry, Host};
pub use eval::{evaluate, evaluate_condition};
pub use frame::ControlFrame;
pub use interpreter::{Interpreter, RunOptions};
pub use method::{MethodDefinition, MethodTable};
pub use scope::Scope;
pub use value::{Matrix, Value};
