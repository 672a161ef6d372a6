//! DZLang, a small line-oriented command language.
//!
//! Every line of a program starts with a keyword (`let`, `print`, `array`, ...)
//! followed by whitespace-separated arguments. Lines are executed one at a time
//! against an [`Environment`] holding four namespaces: variables, arrays,
//! dictionaries and classes. The environment can be saved to and restored from
//! a JSON file.
//!
//! The main entry point is [`Interpreter`], which dispatches a line to the
//! matching command and returns the text the command produced, if any. The
//! public modules [`command`] and [`env`] expose the traits and types needed to
//! plug in your own commands or inspect the program state. Expressions used by
//! `let` and `try` go through [`eval::evaluate`], a small typed evaluator that
//! only ever reads variables.

mod builtin;
pub mod command;
pub mod env;
pub mod eval;
mod interpreter;
mod io_adapters;
mod lexer;
mod parser;
mod value;

/// Line interpreter and the default command set.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, default_commands};

pub use env::Environment;
pub use io_adapters::{LinePrompt, Prompt, ScriptedPrompt, StdinPrompt};
pub use value::{Number, Value};
