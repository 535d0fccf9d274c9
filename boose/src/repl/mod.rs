//! REPL (Read-Eval-Print Loop) for BOOSE
//!
//! Lines are buffered while a block is open and executed as one chunk once
//! every `if`/`while`/`for`/`method` in the buffer has been closed.

use crate::canvas::RecordingCanvas;
use crate::config::ReplOptions;
use crate::interp::blocks::is_balanced;
use crate::interp::{Interpreter, RunOptions};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = ". ";

/// Result of handing one line to a [`Session`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Text to show the user, one entry per line
    Output(Vec<String>),
    /// A block is still open; more lines are needed
    Pending,
    Quit,
}

/// Interpreter state behind the line editor
pub struct Session {
    interpreter: Interpreter<RecordingCanvas>,
    pending: Vec<String>,
    /// Canvas operations already shown
    shown_ops: usize,
    /// Recorded errors already shown
    shown_errors: usize,
}

impl Session {
    pub fn new(options: RunOptions) -> Self {
        Session {
            interpreter: Interpreter::with_options(RecordingCanvas::new(), options),
            pending: Vec::new(),
            shown_ops: 0,
            shown_errors: 0,
        }
    }

    pub fn interpreter(&self) -> &Interpreter<RecordingCanvas> {
        &self.interpreter
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Handle one line of input
    pub fn submit(&mut self, line: &str) -> Reply {
        let trimmed = line.trim();
        if trimmed.starts_with(':') && !self.is_pending() {
            return self.command(trimmed);
        }
        if trimmed.is_empty() && !self.is_pending() {
            return Reply::Output(Vec::new());
        }

        self.pending.push(line.to_string());
        if !is_balanced(&self.pending) {
            return Reply::Pending;
        }
        let chunk = std::mem::take(&mut self.pending);
        let mut output = Vec::new();
        let result = self.interpreter.feed(&chunk);

        let ops = self.interpreter.canvas().ops();
        output.extend(ops[self.shown_ops..].iter().map(ToString::to_string));
        self.shown_ops = ops.len();

        let errors = self.interpreter.errors();
        output.extend(errors[self.shown_errors..].iter().map(|err| format!("error: {err}")));
        self.shown_errors = errors.len();

        if let Err(err) = result
            && err.is_fatal()
        {
            output.push(format!("error: {err}"));
        }
        Reply::Output(output)
    }

    /// Handle REPL commands (starting with :)
    fn command(&mut self, cmd: &str) -> Reply {
        let lines = match cmd {
            ":quit" | ":q" | ":exit" => return Reply::Quit,
            ":help" | ":h" | ":?" => HELP.lines().map(str::to_string).collect(),
            ":vars" => self
                .interpreter
                .globals()
                .sorted()
                .into_iter()
                .map(|(name, value)| format!("{name} = {value} ({})", value.type_name()))
                .collect(),
            ":methods" => self
                .interpreter
                .methods()
                .iter_sorted()
                .into_iter()
                .map(|method| format!("{}({})", method.name, method.params.join(", ")))
                .collect(),
            ":trace" => self.interpreter.canvas().ops().iter().map(ToString::to_string).collect(),
            ":clear" => {
                self.interpreter.reset();
                self.interpreter.canvas_mut().reset();
                self.pending.clear();
                self.shown_ops = 0;
                self.shown_errors = 0;
                vec!["cleared".to_string()]
            }
            _ => vec![format!("Unknown command: {cmd}"), "Type :help for help.".to_string()],
        };
        Reply::Output(lines)
    }
}

const HELP: &str = "BOOSE REPL Commands:
  :help, :h, :?   Show this help
  :quit, :q       Exit the REPL
  :vars           List global variables
  :methods        List defined methods
  :trace          Show everything drawn so far
  :clear          Forget variables, methods and drawing

Enter BOOSE statements, for example:
  int x = 50
  moveto x 100
  circle 20
Blocks (if, while, for, method) run once their closing line is entered.";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL
    pub fn new(run: RunOptions, repl: &ReplOptions) -> RlResult<Self> {
        let mut editor = DefaultEditor::new()?;
        let history_path = repl.history_path();
        if let Some(ref path) = history_path {
            let _ = editor.load_history(path);
        }
        Ok(Repl {
            editor,
            session: Session::new(run),
            history_path,
        })
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("BOOSE REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            let prompt = if self.session.is_pending() {
                CONTINUATION_PROMPT
            } else {
                PROMPT
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    match self.session.submit(&line) {
                        Reply::Output(lines) => lines.iter().for_each(|l| println!("{l}")),
                        Reply::Pending => {}
                        Reply::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Value;

    fn output(reply: Reply) -> Vec<String> {
        match reply {
            Reply::Output(lines) => lines,
            other => panic!("expected output, got {other:?}"),
        }
    }

    #[test]
    fn test_quit_commands() {
        let mut session = Session::new(RunOptions::default());
        assert_eq!(session.submit(":quit"), Reply::Quit);
        assert_eq!(session.submit(":q"), Reply::Quit);
        assert_eq!(session.submit(":exit"), Reply::Quit);
    }

    #[test]
    fn test_help_and_unknown_command() {
        let mut session = Session::new(RunOptions::default());
        assert!(output(session.submit(":help"))[0].contains("Commands"));
        assert_eq!(output(session.submit(":bogus"))[0], "Unknown command: :bogus");
    }

    #[test]
    fn test_statement_prints_drawing() {
        let mut session = Session::new(RunOptions::default());
        assert!(output(session.submit("int x = 50")).is_empty());
        assert_eq!(output(session.submit("moveto x 100")), vec!["moveto 50,100"]);
        // only new operations are shown
        assert_eq!(output(session.submit("circle 5")), vec!["circle r=5 at 50,100"]);
    }

    #[test]
    fn test_blocks_are_buffered() {
        let mut session = Session::new(RunOptions::default());
        assert_eq!(session.submit("for i = 1 to 3"), Reply::Pending);
        assert_eq!(session.submit("  drawto i i"), Reply::Pending);
        assert!(session.is_pending());
        let lines = output(session.submit("endfor"));
        assert_eq!(lines.len(), 3);
        assert!(!session.is_pending());
        assert_eq!(session.interpreter().globals().get("i"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_colon_inside_block_is_a_statement() {
        let mut session = Session::new(RunOptions::default());
        assert_eq!(session.submit("if 1 > 0"), Reply::Pending);
        assert_eq!(session.submit(":quit"), Reply::Pending);
        let lines = output(session.submit("endif"));
        assert!(lines[0].starts_with("error:"));
    }

    #[test]
    fn test_errors_are_reported_once() {
        let mut session = Session::new(RunOptions::default());
        let lines = output(session.submit("jump 1"));
        assert_eq!(lines, vec!["error: line 1 ('jump 1'): unknown command: jump"]);
        assert!(output(session.submit("moveto 1 1")).iter().all(|l| !l.starts_with("error")));
    }

    #[test]
    fn test_stray_closer_is_reported() {
        let mut session = Session::new(RunOptions::default());
        let lines = output(session.submit("endwhile"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("endwhile"));
    }

    #[test]
    fn test_vars_methods_and_clear() {
        let mut session = Session::new(RunOptions::default());
        session.submit("real r = 1.5");
        session.submit("method draw(p, q)");
        session.submit("endmethod");
        assert_eq!(output(session.submit(":vars")), vec!["r = 1.5 (real)"]);
        assert_eq!(output(session.submit(":methods")), vec!["draw(p, q)"]);

        session.submit("moveto 2 3");
        assert_eq!(output(session.submit(":trace")), vec!["moveto 2,3"]);

        session.submit(":clear");
        assert!(output(session.submit(":vars")).is_empty());
        assert!(output(session.submit(":trace")).is_empty());
    }
}
