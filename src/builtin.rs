use crate::command::{CommandFactory, ExecutableCommand, Output};
use crate::env::{Environment, FUNCTION_MARKER, METHOD_MARKER, Namespace};
use crate::eval::{self, EvalError};
use crate::interpreter::Factory;
use crate::io_adapters::Prompt;
use crate::value::Value;
use anyhow::{Context, Result, anyhow};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Commands of the language.
///
/// Each command is built from the whitespace-separated tokens that follow its
/// keyword, then executed against the program state.
pub(crate) trait BuiltinCommand: Sized {
    /// Keyword of the command, e.g. "let" or "print".
    fn name() -> &'static str;

    /// Build the command from the tokens after the keyword.
    fn from_args(args: &[&str]) -> Result<Self, ArgsError>;

    /// Executes the command. `Ok(None)` means the command produces no output.
    fn execute(self, env: &mut Environment, prompt: &mut dyn Prompt) -> Result<Output>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, env: &mut Environment, prompt: &mut dyn Prompt) -> Result<Output> {
        <T as BuiltinCommand>::execute(*self, env, prompt)
    }
}

/// Problems with the shape of a command's arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgsError {
    #[error("{command}: missing argument <{name}>")]
    Missing {
        command: &'static str,
        name: &'static str,
    },
    #[error("{command}: invalid integer '{value}'")]
    InvalidInteger { command: &'static str, value: String },
    #[error("{0}")]
    Syntax(&'static str),
}

/// Stand-in for a command whose arguments did not parse; fails when executed.
struct InvalidArgs {
    error: ArgsError,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, _env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        Err(self.error.into())
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(args) {
                Ok(cmd) => Box::new(cmd),
                Err(error) => Box::new(InvalidArgs { error }),
            })
        } else {
            None
        }
    }
}

/// Cursor over a command's arguments.
struct ArgReader<'a> {
    command: &'static str,
    args: std::slice::Iter<'a, &'a str>,
}

impl<'a> ArgReader<'a> {
    fn new(command: &'static str, args: &'a [&'a str]) -> Self {
        Self {
            command,
            args: args.iter(),
        }
    }

    fn required(&mut self, name: &'static str) -> Result<String, ArgsError> {
        self.args
            .next()
            .map(|arg| arg.to_string())
            .ok_or(ArgsError::Missing {
                command: self.command,
                name,
            })
    }

    fn integer(&mut self, name: &'static str) -> Result<i64, ArgsError> {
        let raw = self.required(name)?;
        raw.parse().map_err(|_| ArgsError::InvalidInteger {
            command: self.command,
            value: raw,
        })
    }

    fn rest(&mut self) -> Vec<String> {
        self.args.by_ref().map(|arg| arg.to_string()).collect()
    }
}

/// Build a command that takes a single name argument. Trailing tokens are ignored.
fn single_name<T>(command: &'static str, args: &[&str], build: impl FnOnce(String) -> T) -> Result<T, ArgsError> {
    let name = ArgReader::new(command, args).required("name")?;
    Ok(build(name))
}

/// `let <name> = <expr...>`: assign the value of an expression to a variable.
pub struct Let {
    pub name: String,
    pub expr: String,
}

impl BuiltinCommand for Let {
    fn name() -> &'static str {
        "let"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        match args {
            [name, "=", expr @ ..] if !expr.is_empty() => Ok(Let {
                name: name.to_string(),
                expr: expr.join(" "),
            }),
            _ => Err(ArgsError::Syntax("Invalid syntax for 'let' command.")),
        }
    }

    /// A failed evaluation is not an error: the variable receives a string
    /// describing the failure instead.
    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let value = match eval::evaluate(&self.expr, &env.variables) {
            Ok(value) => value,
            Err(e) => {
                debug!(name = %self.name, expr = %self.expr, "expression failed: {e}");
                Value::Str(format!("Error evaluating expression: {e}"))
            }
        };
        env.variables.insert(self.name, value);
        Ok(None)
    }
}

/// `print <name>`: show an array, dictionary or variable. Numerals are echoed.
pub struct Print {
    pub name: String,
}

impl BuiltinCommand for Print {
    fn name() -> &'static str {
        "print"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Print { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let name = self.name.as_str();
        let text = if name.chars().all(char::is_numeric) {
            self.name.clone()
        } else if let Some(array) = env.arrays.get(name) {
            format_array(array)
        } else if let Some(dict) = env.dictionaries.get(name) {
            format_dict(dict)
        } else if let Some(value) = env.variables.get(name) {
            value.to_string()
        } else {
            "Undefined variable".to_string()
        };
        Ok(Some(text))
    }
}

fn format_array(items: &[i64]) -> String {
    let items: Vec<String> = items.iter().map(i64::to_string).collect();
    format!("[{}]", items.join(", "))
}

fn format_dict(entries: &BTreeMap<String, i64>) -> String {
    let entries: Vec<String> = entries.iter().map(|(k, v)| format!("\"{k}\": {v}")).collect();
    format!("{{{}}}", entries.join(", "))
}

/// `input <name>`: ask the caller for a value and store it.
pub struct Input {
    pub name: String,
}

impl BuiltinCommand for Input {
    fn name() -> &'static str {
        "input"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Input { name })
    }

    fn execute(self, env: &mut Environment, prompt: &mut dyn Prompt) -> Result<Output> {
        let Some(reply) = prompt.ask(&self.name) else {
            return Ok(Some("Input canceled.".to_string()));
        };
        let shown = format!("{} = {}", self.name, reply);
        env.variables.insert(self.name, Value::parse_scalar(&reply));
        Ok(Some(shown))
    }
}

/// `if <cond> <word> <text...>`: yield `text` when variable `cond` is positive.
///
/// The word after the condition (conventionally `then`) is skipped.
pub struct If {
    pub condition: String,
    pub branch: Vec<String>,
}

impl BuiltinCommand for If {
    fn name() -> &'static str {
        "if"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        let mut args = ArgReader::new(Self::name(), args);
        let condition = args.required("cond")?;
        let branch = args.rest().into_iter().skip(1).collect();
        Ok(If { condition, branch })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let Some(value) = env.variables.get(&self.condition) else {
            return Ok(None);
        };
        let number = value
            .as_number()
            .ok_or_else(|| anyhow!("if: '{}' holds a {}, not a number", self.condition, value.type_name()))?;
        if !number.is_positive() {
            return Ok(None);
        }
        let text = self.branch.join(" ");
        let text = text.strip_prefix('"').unwrap_or(&text);
        let text = text.strip_suffix('"').unwrap_or(text);
        Ok(Some(text.to_string()))
    }
}

/// `while <cond>`: count variable `cond` down by one until it is no longer positive.
pub struct While {
    pub condition: String,
}

impl BuiltinCommand for While {
    fn name() -> &'static str {
        "while"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |condition| While { condition })
    }

    /// The loop has no body, so the final counter is computed directly.
    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let Some(value) = env.variables.get_mut(&self.condition) else {
            return Ok(None);
        };
        match value {
            Value::Int(n) if *n > 0 => *n = 0,
            Value::Float(f) if *f > 0.0 => *f -= f.ceil(),
            Value::Bool(true) => *value = Value::Int(0),
            Value::Str(_) => {
                return Err(anyhow!("while: '{}' holds a str, not a number", self.condition));
            }
            _ => {}
        }
        Ok(None)
    }
}

/// `def <name>`: record that a function was defined.
pub struct Def {
    pub name: String,
}

impl BuiltinCommand for Def {
    fn name() -> &'static str {
        "def"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Def { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.variables
            .insert(self.name, Value::Str(FUNCTION_MARKER.to_string()));
        Ok(None)
    }
}

/// `array <name>`: create or reset an empty array.
pub struct Array {
    pub name: String,
}

impl BuiltinCommand for Array {
    fn name() -> &'static str {
        "array"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Array { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.arrays.insert(self.name, Vec::new());
        Ok(None)
    }
}

/// `push <name> <_> <value>`: append an integer to an existing array.
pub struct Push {
    pub name: String,
    pub value: i64,
}

impl BuiltinCommand for Push {
    fn name() -> &'static str {
        "push"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        let mut args = ArgReader::new(Self::name(), args);
        let name = args.required("name")?;
        args.required("_")?;
        let value = args.integer("value")?;
        Ok(Push { name, value })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        match env.arrays.get_mut(&self.name) {
            Some(array) => array.push(self.value),
            None => debug!(name = %self.name, "push to missing array ignored"),
        }
        Ok(None)
    }
}

/// `pop <name>`: remove and show the last element of an array.
pub struct Pop {
    pub name: String,
}

impl BuiltinCommand for Pop {
    fn name() -> &'static str {
        "pop"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Pop { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let popped = env.arrays.get_mut(&self.name).and_then(Vec::pop);
        Ok(Some(match popped {
            Some(value) => value.to_string(),
            None => "Array is empty or does not exist.".to_string(),
        }))
    }
}

/// `dict <name>`: create or reset an empty dictionary.
pub struct Dict {
    pub name: String,
}

impl BuiltinCommand for Dict {
    fn name() -> &'static str {
        "dict"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Dict { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.dictionaries.insert(self.name, BTreeMap::new());
        Ok(None)
    }
}

/// `set <name> <key> <_> <value>`: store an integer in an existing dictionary.
pub struct Set {
    pub name: String,
    pub key: String,
    pub value: i64,
}

impl BuiltinCommand for Set {
    fn name() -> &'static str {
        "set"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        let mut args = ArgReader::new(Self::name(), args);
        let name = args.required("name")?;
        let key = args.required("key")?;
        args.required("_")?;
        let value = args.integer("value")?;
        Ok(Set { name, key, value })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        match env.dictionaries.get_mut(&self.name) {
            Some(dict) => {
                dict.insert(self.key, self.value);
            }
            None => debug!(name = %self.name, "set on missing dictionary ignored"),
        }
        Ok(None)
    }
}

/// `get <name> <key>`: show the integer stored under `key`.
pub struct Get {
    pub name: String,
    pub key: String,
}

impl BuiltinCommand for Get {
    fn name() -> &'static str {
        "get"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        let mut args = ArgReader::new(Self::name(), args);
        let name = args.required("name")?;
        let key = args.required("key")?;
        Ok(Get { name, key })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let found = env
            .dictionaries
            .get(&self.name)
            .and_then(|dict| dict.get(&self.key));
        Ok(Some(match found {
            Some(value) => value.to_string(),
            None => "Key not found".to_string(),
        }))
    }
}

/// `class <name>`: create or reset a class with no methods.
pub struct Class {
    pub name: String,
}

impl BuiltinCommand for Class {
    fn name() -> &'static str {
        "class"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Class { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.classes.insert(self.name, BTreeMap::new());
        Ok(None)
    }
}

/// `method <class> <method>`: attach a method marker to an existing class.
pub struct Method {
    pub class: String,
    pub method: String,
}

impl BuiltinCommand for Method {
    fn name() -> &'static str {
        "method"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        let mut args = ArgReader::new(Self::name(), args);
        let class = args.required("class")?;
        let method = args.required("method")?;
        Ok(Method { class, method })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let methods = env
            .classes
            .get_mut(&self.class)
            .ok_or_else(|| anyhow!("Class {} not defined.", self.class))?;
        methods.insert(self.method, METHOD_MARKER.to_string());
        Ok(None)
    }
}

/// `try <expr...>`: evaluate an expression, reporting only failures.
pub struct Try {
    pub expr: String,
}

impl BuiltinCommand for Try {
    fn name() -> &'static str {
        "try"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        Ok(Try {
            expr: args.join(" "),
        })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        match eval::evaluate(&self.expr, &env.variables) {
            Ok(value) => {
                debug!(expr = %self.expr, %value, "try succeeded");
                Ok(None)
            }
            Err(EvalError::DivisionByZero) => Ok(Some("Caught division by zero".to_string())),
            Err(e) => Ok(Some(format!("Error: {e}"))),
        }
    }
}

/// `help <name>`
pub struct Help {
    pub topic: String,
}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |topic| Help { topic })
    }

    fn execute(self, _env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        Ok(Some(format!("Help for command: {}", self.topic)))
    }
}

/// `save <path>`: write all namespaces to a JSON file.
pub struct Save {
    pub path: PathBuf,
}

impl BuiltinCommand for Save {
    fn name() -> &'static str {
        "save"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |path| Save { path: path.into() })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.save(&self.path)
            .with_context(|| format!("cannot save state to {}", self.path.display()))?;
        info!(path = %self.path.display(), "state saved");
        Ok(Some(format!("State saved to {}", self.path.display())))
    }
}

/// `load <path>`: replace all namespaces with the contents of a JSON file.
pub struct Load {
    pub path: PathBuf,
}

impl BuiltinCommand for Load {
    fn name() -> &'static str {
        "load"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |path| Load { path: path.into() })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let report = match env.load(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "state loaded");
                format!("State loaded from {}", self.path.display())
            }
            Err(e) => {
                debug!(path = %self.path.display(), "state load failed: {e}");
                format!("Error loading state: {e}")
            }
        };
        Ok(Some(report))
    }
}

/// `delete <name>`: remove a variable, array or dictionary, in that order of preference.
pub struct Delete {
    pub name: String,
}

impl BuiltinCommand for Delete {
    fn name() -> &'static str {
        "delete"
    }

    fn from_args(args: &[&str]) -> Result<Self, ArgsError> {
        single_name(Self::name(), args, |name| Delete { name })
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        let name = &self.name;
        let report = match env.delete(name) {
            Some(Namespace::Variable) => format!("Variable {name} deleted."),
            Some(Namespace::Array) => format!("Array {name} deleted."),
            Some(Namespace::Dictionary) => format!("Dictionary {name} deleted."),
            None => format!("{name} not found."),
        };
        Ok(Some(report))
    }
}

/// `clear`: empty every namespace. Arguments are ignored.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn from_args(_args: &[&str]) -> Result<Self, ArgsError> {
        Ok(Clear {})
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.clear();
        Ok(Some(
            "All variables, arrays, dictionaries, and classes cleared.".to_string(),
        ))
    }
}

/// `exit`: ask the driver to stop. Arguments are ignored.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_args(_args: &[&str]) -> Result<Self, ArgsError> {
        Ok(Exit {})
    }

    fn execute(self, env: &mut Environment, _prompt: &mut dyn Prompt) -> Result<Output> {
        env.should_exit = true;
        Ok(Some("Exiting the program.".to_string()))
    }
}
