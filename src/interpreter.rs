use crate::command::{CommandFactory, Output};
use crate::env::Environment;
use crate::io_adapters::{Prompt, StdinPrompt};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};
use tracing::{debug, warn};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, i.e. `BuiltinCommand`s.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Line-oriented DZLang interpreter.
///
/// The interpreter owns an [`Environment`], a list of [`CommandFactory`] objects
/// that are queried to create commands by keyword, and a [`Prompt`] serving the
/// `input` command. See [`Default`] for the commands included out of the box.
///
/// Example
/// ```
/// use dzlang::Interpreter;
/// let mut dz = Interpreter::default();
/// assert_eq!(dz.execute("let x = 5"), None);
/// assert_eq!(dz.execute("let y = x + 1"), None);
/// assert_eq!(dz.execute("print y").as_deref(), Some("6"));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    prompt: Box<dyn Prompt>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>, prompt: Box<dyn Prompt>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            prompt,
        }
    }

    /// Interpreter with every built-in command, reading `input` values from `prompt`.
    pub fn with_prompt(prompt: impl Prompt + 'static) -> Self {
        Self::new(default_commands(), Box::new(prompt))
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Whether `exit` has been executed.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Execute one line of program text.
    ///
    /// Blank lines produce no output. Unknown keywords and failing commands are
    /// reported in the returned text; nothing is propagated to the caller.
    pub fn execute(&mut self, line: &str) -> Output {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, args) = tokens.split_first()?;

        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(name, args) {
                debug!(command = %name, ?args, "dispatch");
                return match cmd.execute(&mut self.env, self.prompt.as_mut()) {
                    Ok(output) => output,
                    Err(e) => {
                        debug!(command = %name, "command failed: {e:#}");
                        Some(format!("Error: {e:#}"))
                    }
                };
            }
        }
        Some(format!("Unknown command: {name}"))
    }

    /// Execute every line of `source` in order, collecting the outputs.
    pub fn run_script(&mut self, source: &str) -> Vec<String> {
        source.lines().filter_map(|line| self.execute(line)).collect()
    }

    /// Interactive Read-Eval-Print Loop. Ends on `exit`, Ctrl-C or end of input.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.should_exit() {
            match rl.readline("dz> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Some(output) = self.execute(&line) {
                        println!("{output}");
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    warn!("readline failed: {err}");
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with every built-in command; `input` reads from stdin.
    fn default() -> Self {
        Self::with_prompt(StdinPrompt::stdio())
    }
}

/// All built-in commands of the language.
pub fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    vec![
        Box::new(Factory::<Let>::default()),
        Box::new(Factory::<Print>::default()),
        Box::new(Factory::<Input>::default()),
        Box::new(Factory::<If>::default()),
        Box::new(Factory::<While>::default()),
        Box::new(Factory::<Def>::default()),
        Box::new(Factory::<Array>::default()),
        Box::new(Factory::<Push>::default()),
        Box::new(Factory::<Pop>::default()),
        Box::new(Factory::<Dict>::default()),
        Box::new(Factory::<Set>::default()),
        Box::new(Factory::<Get>::default()),
        Box::new(Factory::<Class>::default()),
        Box::new(Factory::<Method>::default()),
        Box::new(Factory::<Try>::default()),
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Save>::default()),
        Box::new(Factory::<Load>::default()),
        Box::new(Factory::<Delete>::default()),
        Box::new(Factory::<Clear>::default()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::ScriptedPrompt;
    use crate::value::Value;

    fn interpreter() -> Interpreter {
        Interpreter::with_prompt(ScriptedPrompt::default())
    }

    #[test]
    fn test_blank_lines_are_silent() {
        let mut dz = interpreter();
        assert_eq!(dz.execute(""), None);
        assert_eq!(dz.execute("   \t "), None);
    }

    #[test]
    fn test_unknown_command() {
        let mut dz = interpreter();
        assert_eq!(dz.execute("jump x").as_deref(), Some("Unknown command: jump"));
        // Keywords are case sensitive.
        assert_eq!(dz.execute("PRINT x").as_deref(), Some("Unknown command: PRINT"));
    }

    #[test]
    fn test_errors_are_rendered() {
        let mut dz = interpreter();
        assert_eq!(
            dz.execute("let x 5").as_deref(),
            Some("Error: Invalid syntax for 'let' command.")
        );
        assert_eq!(
            dz.execute("method Ghost boo").as_deref(),
            Some("Error: Class Ghost not defined.")
        );
        assert_eq!(
            dz.execute("print").as_deref(),
            Some("Error: print: missing argument <name>")
        );
    }

    #[test]
    fn test_save_error_includes_cause() {
        let mut dz = interpreter();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("state.json");
        let out = dz.execute(&format!("save {}", path.display())).unwrap();
        assert!(out.starts_with("Error: cannot save state to "), "{out}");
        assert!(out.matches(": ").count() >= 2, "{out}");
    }

    #[test]
    fn test_input_uses_prompt() {
        let mut dz = Interpreter::with_prompt(ScriptedPrompt::new([Some("7")]));
        assert_eq!(dz.execute("input n").as_deref(), Some("n = 7"));
        assert_eq!(dz.execute("let m = n * 2"), None);
        assert_eq!(dz.env().variables["m"], Value::Int(14));
        assert_eq!(dz.execute("input k").as_deref(), Some("Input canceled."));
    }

    #[test]
    fn test_run_script_collects_outputs_in_order() {
        let mut dz = interpreter();
        let outputs = dz.run_script("let x = 2\n\nprint x\narray a\npush a _ 9\npop a\nhelp let\n");
        assert_eq!(outputs, ["2", "9", "Help for command: let"]);
    }

    #[test]
    fn test_exit_raises_flag_only() {
        let mut dz = interpreter();
        assert!(!dz.should_exit());
        assert_eq!(dz.execute("exit").as_deref(), Some("Exiting the program."));
        assert!(dz.should_exit());
        // Still usable afterwards.
        assert_eq!(dz.execute("print 3").as_deref(), Some("3"));
    }
}
