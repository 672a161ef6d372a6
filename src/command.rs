use crate::env::Environment;
use crate::io_adapters::Prompt;
use anyhow::Result;

/// What a command hands back to the caller: a line to display, or nothing.
pub type Output = Option<String>;

/// Object-safe trait for any command that can be executed by the interpreter.
///
/// This is implemented by built-ins via a blanket impl.
pub trait ExecutableCommand {
    /// Executes the command against the program state.
    ///
    /// `prompt` is the caller's input surface, used only by `input`.
    fn execute(self: Box<Self>, env: &mut Environment, prompt: &mut dyn Prompt) -> Result<Output>;
}

/// Factory that tries to create a command from a keyword and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided keyword and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
