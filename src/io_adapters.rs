use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Source of values for the `input` command.
///
/// Returning `None` means the user cancelled the prompt.
pub trait Prompt {
    fn ask(&mut self, name: &str) -> Option<String>;
}

/// Prompt that writes a question to a writer and reads one line back.
///
/// End of input counts as cancellation.
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, name: &str) -> Option<String> {
        write!(self.writer, "Enter value for {name}: ").ok()?;
        self.writer.flush().ok()?;

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Line prompt over the process' stdin and stdout.
pub type StdinPrompt = LinePrompt<std::io::StdinLock<'static>, std::io::Stdout>;

impl StdinPrompt {
    pub fn stdio() -> Self {
        LinePrompt::new(std::io::stdin().lock(), std::io::stdout())
    }
}

/// Memory-backed prompt that hands out queued replies in order.
///
/// `None` entries, and running out of replies, behave like a cancelled prompt.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    replies: VecDeque<Option<String>>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(|r| r.map(Into::into)).collect(),
            asked: Vec::new(),
        }
    }

    /// Names that were asked for so far.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, name: &str) -> Option<String> {
        self.asked.push(name.to_string());
        self.replies.pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_line_prompt_reads_one_line() {
        let mut out = Vec::new();
        let mut prompt = LinePrompt::new(Cursor::new(b"Alice\r\nBob\n".to_vec()), &mut out);

        assert_eq!(prompt.ask("name"), Some("Alice".to_string()));
        assert_eq!(prompt.ask("other"), Some("Bob".to_string()));
        assert_eq!(prompt.ask("third"), None);
        drop(prompt);

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.starts_with("Enter value for name: "));
        assert!(shown.contains("Enter value for third: "));
    }

    #[test]
    fn test_line_prompt_keeps_empty_answer() {
        let mut prompt = LinePrompt::new(Cursor::new(b"\n".to_vec()), Vec::new());
        assert_eq!(prompt.ask("x"), Some(String::new()));
    }

    #[test]
    fn test_scripted_prompt() {
        let mut prompt = ScriptedPrompt::new([Some("1"), None]);
        assert_eq!(prompt.ask("a"), Some("1".to_string()));
        assert_eq!(prompt.ask("b"), None);
        assert_eq!(prompt.ask("c"), None);
        assert_eq!(prompt.asked(), ["a", "b", "c"]);
    }
}
