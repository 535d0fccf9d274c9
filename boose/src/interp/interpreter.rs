//! Line interpreter
//!
//! A block of lines is executed with a single cursor. Loops and conditionals
//! move the cursor and push or pop [`ControlFrame`]s; they never recurse.
//! The only recursion is a method call, which runs the method body as a new
//! block against a fresh local scope.
//!
//! Errors on a single line are recorded and execution moves on. Structural
//! errors (unbalanced blocks) stop the run.

use super::blocks::{BlockKind, BlockMap, LineKind, classify, split_keyword};
use super::commands::{CommandRegistry, Host};
use super::eval::{evaluate, evaluate_condition};
use super::frame::ControlFrame;
use super::method::{MethodDefinition, MethodTable};
use super::scope::Scope;
use super::value::Value;
use crate::canvas::Canvas;
use crate::error::{BooseError, LineError, Result};
use serde::Deserialize;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Stack growth parameters for deep method recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 2 * 1024 * 1024;

/// Execution options, read from the `[run]` table of `boose.toml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    /// Abort on the first per-line error instead of recording it
    pub strict: bool,
    /// Maximum nesting of method calls
    pub max_call_depth: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            strict: false,
            max_call_depth: 256,
        }
    }
}

/// Lines under execution together with their block structure
struct Block<'a, S> {
    lines: &'a [S],
    blocks: &'a BlockMap,
    /// 1-based program line of `lines[0]`
    first_line: usize,
}

impl<S: AsRef<str>> Block<'_, S> {
    fn line(&self, index: usize) -> &str {
        self.lines[index].as_ref()
    }

    fn closer(&self, index: usize) -> Result<usize> {
        self.blocks.partner(index).ok_or_else(|| {
            BooseError::unmatched_block(self.first_line + index, "block has no closing line")
        })
    }
}

/// The interpreter
pub struct Interpreter<C: Canvas> {
    canvas: C,
    registry: Rc<CommandRegistry>,
    methods: MethodTable,
    /// Global scope. Taken out while a run is in progress.
    globals: Scope,
    errors: Vec<LineError>,
    options: RunOptions,
    call_depth: usize,
    /// Program line number the next fed chunk starts at
    next_line: usize,
    /// Set when strict mode hit an error; unwinds nested calls without
    /// recording the error again
    halted: bool,
}

impl<C: Canvas> Interpreter<C> {
    /// Create an interpreter drawing on `canvas`
    pub fn new(canvas: C) -> Self {
        Self::with_options(canvas, RunOptions::default())
    }

    pub fn with_options(canvas: C, options: RunOptions) -> Self {
        Interpreter {
            canvas,
            registry: Rc::new(CommandRegistry::with_builtins()),
            methods: MethodTable::new(),
            globals: Scope::new(),
            errors: Vec::new(),
            options,
            call_depth: 0,
            next_line: 1,
            halted: false,
        }
    }

    /// Replace the command registry
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Rc::new(registry);
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.options.strict = strict;
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn into_canvas(self) -> C {
        self.canvas
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    /// Per-line errors recorded so far, in order
    pub fn errors(&self) -> &[LineError] {
        &self.errors
    }

    /// Forget methods, variables and recorded errors. The canvas is kept.
    pub fn reset(&mut self) {
        self.methods.clear();
        self.globals.clear();
        self.errors.clear();
        self.call_depth = 0;
        self.next_line = 1;
        self.halted = false;
    }

    /// Run a whole program from a clean state
    pub fn run<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        self.reset();
        self.feed(lines)
    }

    /// Run program text, one statement per line
    pub fn run_source(&mut self, source: &str) -> Result<()> {
        let lines: Vec<&str> = source.lines().collect();
        self.run(&lines)
    }

    /// Execute more lines on top of the current state. Methods and global
    /// variables from earlier chunks stay visible; line numbers continue.
    pub fn feed<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        let first_line = self.next_line;
        self.next_line += lines.len();
        self.halted = false;

        let mut globals = std::mem::take(&mut self.globals);
        let result = self.execute_block(lines, first_line, &mut globals);
        self.globals = globals;
        result
    }

    /// Execute `lines` against `scope`. `first_line` is the 1-based program
    /// line of `lines[0]` and is only used for error reporting.
    pub fn execute_block<S: AsRef<str>>(&mut self, lines: &[S], first_line: usize, scope: &mut Scope) -> Result<()> {
        let blocks = BlockMap::build(lines, first_line)?;
        self.run_lines(
            &Block {
                lines,
                blocks: &blocks,
                first_line,
            },
            scope,
        )
    }

    fn run_lines<S: AsRef<str>>(&mut self, block: &Block<'_, S>, scope: &mut Scope) -> Result<()> {
        let mut frames: Vec<ControlFrame> = Vec::new();
        let mut cursor = 0;

        while cursor < block.lines.len() {
            cursor = match self.step(block, cursor, &mut frames, scope) {
                Ok(next) => next,
                Err(err) if err.is_fatal() || self.halted => return Err(err),
                Err(err) => {
                    self.record(block.first_line + cursor, block.line(cursor), err)?;
                    recover(block, cursor, &mut frames)
                }
            };
        }
        Ok(())
    }

    fn record(&mut self, line: usize, text: &str, error: BooseError) -> Result<()> {
        warn!(line, text = text.trim(), %error, "line failed");
        self.errors.push(LineError {
            line,
            text: text.trim().to_string(),
            error: error.clone(),
        });
        if self.options.strict {
            self.halted = true;
            return Err(error);
        }
        Ok(())
    }

    /// Execute the line at `cursor` and return the index of the next line
    fn step<S: AsRef<str>>(
        &mut self,
        block: &Block<'_, S>,
        cursor: usize,
        frames: &mut Vec<ControlFrame>,
        scope: &mut Scope,
    ) -> Result<usize> {
        let line = block.line(cursor);
        let kind = classify(line);
        if kind != LineKind::Skip {
            trace!(line = block.first_line + cursor, text = line.trim(), "execute");
        }
        let (_, rest) = split_keyword(line);

        match kind {
            LineKind::Skip => Ok(cursor + 1),
            LineKind::Statement => {
                self.execute_statement(line, scope)?;
                Ok(cursor + 1)
            }
            LineKind::Open(BlockKind::Method) => self.define_method(block, cursor, rest),
            LineKind::Open(BlockKind::If) => {
                let taken = evaluate_condition(header(rest, "if condition")?, scope)?;
                let close = block.closer(cursor)?;
                frames.push(ControlFrame::If {
                    taken,
                    open: cursor,
                    close,
                });
                if taken {
                    Ok(cursor + 1)
                } else {
                    Ok(block.blocks.else_of(cursor).unwrap_or(close))
                }
            }
            LineKind::Open(BlockKind::While) => {
                let close = block.closer(cursor)?;
                let reentry = matches!(frames.last(), Some(ControlFrame::While { start, .. }) if *start == cursor);
                let condition = header(rest, "while condition")?;
                if evaluate_condition(condition, scope)? {
                    if !reentry {
                        frames.push(ControlFrame::While {
                            start: cursor,
                            close,
                        });
                    }
                    Ok(cursor + 1)
                } else {
                    if reentry {
                        frames.pop();
                    }
                    Ok(close + 1)
                }
            }
            LineKind::Open(BlockKind::For) => {
                let parsed = ForHeader::parse(rest)?;
                let start = numeric(evaluate(parsed.start, scope)?)?;
                let end = numeric(evaluate(parsed.end, scope)?)?;
                let step = match parsed.step {
                    Some(step) => numeric(evaluate(step, scope)?)?,
                    None => Value::Int(1),
                };
                if step.to_real()? == 0.0 {
                    return Err(BooseError::argument("for loop step must not be zero"));
                }
                let close = block.closer(cursor)?;
                let enter = in_range(&start, &end, &step)?;
                scope.define(parsed.var, start);
                if !enter {
                    return Ok(close + 1);
                }
                frames.push(ControlFrame::For {
                    var: parsed.var.to_string(),
                    end,
                    step,
                    body_start: cursor + 1,
                    close,
                });
                Ok(cursor + 1)
            }
            LineKind::Else => match frames.last() {
                Some(ControlFrame::If { taken: true, close, .. }) => Ok(*close),
                Some(ControlFrame::If { taken: false, .. }) => Ok(cursor + 1),
                _ => Err(BooseError::unmatched_block(block.first_line + cursor, "'else' outside 'if'")),
            },
            // method bodies are skipped at definition, so `endmethod` is only
            // reached when a body is executed on its own
            LineKind::Close(BlockKind::Method) => Ok(cursor + 1),
            LineKind::Close(kind) => match frames.last() {
                Some(ControlFrame::For {
                    var,
                    end,
                    step,
                    body_start,
                    close,
                }) if *close == cursor => {
                    let current = scope.get(var).ok_or_else(|| BooseError::undefined_variable(var))?;
                    let next = advance(current, step)?;
                    let again = in_range(&next, end, step)?;
                    let body_start = *body_start;
                    scope.define(var.clone(), next);
                    if again {
                        Ok(body_start)
                    } else {
                        frames.pop();
                        Ok(cursor + 1)
                    }
                }
                // back to the `while` line, which re-checks the condition
                Some(ControlFrame::While { start, close, .. }) if *close == cursor => Ok(*start),
                Some(ControlFrame::If { close, .. }) if *close == cursor => {
                    frames.pop();
                    Ok(cursor + 1)
                }
                _ => Err(BooseError::unmatched_block(
                    block.first_line + cursor,
                    format!("'{}' without an open '{}'", kind.closer(), kind.opener()),
                )),
            },
        }
    }

    fn define_method<S: AsRef<str>>(&mut self, block: &Block<'_, S>, cursor: usize, header: &str) -> Result<usize> {
        let close = block.closer(cursor)?;
        let body: Vec<String> = block.lines[cursor + 1..close]
            .iter()
            .map(|line| line.as_ref().to_string())
            .collect();
        let method = MethodDefinition::parse(header, body, block.first_line + cursor + 1)?;
        debug!(method = %method.name, params = ?method.params, "method defined");
        let name = method.name.clone();
        if self.methods.define(method) {
            debug!(method = %name, "previous definition replaced");
        }
        Ok(close + 1)
    }

    fn execute_statement(&mut self, line: &str, scope: &mut Scope) -> Result<()> {
        let line = line.trim();
        let (keyword, rest) = split_keyword(line);
        let registry = Rc::clone(&self.registry);

        if keyword.is_empty() {
            let word = line.split_whitespace().next().unwrap_or(line);
            return Err(BooseError::unknown_command(word, None));
        }
        if rest.starts_with('=') && !rest.starts_with("==") {
            return registry.assign(self, scope, line);
        }
        registry.dispatch(keyword, self, scope, rest)
    }
}

impl<C: Canvas> Host for Interpreter<C> {
    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.canvas
    }

    fn call_method(&mut self, name: &str, args: &[&str], caller: &mut Scope) -> Result<(String, Value)> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| BooseError::undefined_method(name))?;
        if method.params.len() != args.len() {
            return Err(BooseError::argument_count(&method.name, method.params.len(), args.len()));
        }

        let mut local = Scope::new();
        for (param, arg) in method.params.iter().zip(args) {
            local.define(param.clone(), evaluate(arg, caller)?);
        }

        if self.call_depth >= self.options.max_call_depth {
            return Err(BooseError::RecursionLimit {
                limit: self.options.max_call_depth,
            });
        }
        self.call_depth += 1;
        debug!(method = %method.name, depth = self.call_depth, "call");

        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.run_lines(
                &Block {
                    lines: &method.body,
                    blocks: &method.blocks,
                    first_line: method.first_line,
                },
                &mut local,
            )
        });
        self.call_depth -= 1;
        result?;

        let value = local
            .find_ignore_case(&method.name)
            .cloned()
            .unwrap_or(Value::Int(0));
        Ok((method.name.clone(), value))
    }
}

/// After a failed line: skip a block whose header failed, drop a frame whose
/// closer failed, otherwise carry on with the next line.
fn recover<S: AsRef<str>>(block: &Block<'_, S>, cursor: usize, frames: &mut Vec<ControlFrame>) -> usize {
    match classify(block.line(cursor)) {
        LineKind::Open(_) => {
            if frames.last().is_some_and(|frame| frame.opener() == cursor) {
                frames.pop();
            }
            block.blocks.partner(cursor).map_or(cursor + 1, |close| close + 1)
        }
        LineKind::Close(_) => {
            if frames.last().is_some_and(|frame| frame.close() == cursor) {
                frames.pop();
            }
            cursor + 1
        }
        _ => cursor + 1,
    }
}

fn header<'a>(rest: &'a str, shape: &str) -> Result<&'a str> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(BooseError::argument(format!("expected '{shape}'")));
    }
    Ok(rest)
}

fn numeric(value: Value) -> Result<Value> {
    if value.is_numeric() {
        Ok(value)
    } else {
        Err(BooseError::type_mismatch("number", value.type_name()))
    }
}

fn advance(current: &Value, step: &Value) -> Result<Value> {
    match (current, step) {
        (Value::Int(a), Value::Int(s)) => a
            .checked_add(*s)
            .map(Value::Int)
            .ok_or_else(|| BooseError::argument("for loop counter overflowed")),
        (a, s) => Ok(Value::Real(a.to_real()? + s.to_real()?)),
    }
}

/// Whether `value` has not yet passed `end` in the direction of `step`
fn in_range(value: &Value, end: &Value, step: &Value) -> Result<bool> {
    let ordering = match (value, end) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (a, b) => a
            .to_real()?
            .partial_cmp(&b.to_real()?)
            .ok_or_else(|| BooseError::argument("for loop bound is not a number"))?,
    };
    if step.to_real()? > 0.0 {
        Ok(ordering.is_le())
    } else {
        Ok(ordering.is_ge())
    }
}

/// `var = start to end [step s]`
#[derive(Debug, PartialEq)]
struct ForHeader<'a> {
    var: &'a str,
    start: &'a str,
    end: &'a str,
    step: Option<&'a str>,
}

impl<'a> ForHeader<'a> {
    fn parse(rest: &'a str) -> Result<Self> {
        let malformed = || BooseError::argument("expected 'for variable = start to end [step n]'");

        let (var, after) = split_keyword(rest);
        if var.is_empty() || var.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(malformed());
        }
        let after = match after.strip_prefix('=') {
            Some(after) if !after.starts_with('=') => after,
            _ => return Err(malformed()),
        };

        let to = find_word(after, "to").ok_or_else(malformed)?;
        let start = after[..to].trim();
        let bounds = &after[to + 2..];
        let (end, step) = match find_word(bounds, "step") {
            Some(pos) => (bounds[..pos].trim(), Some(bounds[pos + 4..].trim())),
            None => (bounds.trim(), None),
        };
        if start.is_empty() || end.is_empty() || step.is_some_and(str::is_empty) {
            return Err(malformed());
        }
        Ok(ForHeader { var, start, end, step })
    }
}

/// Position of `word` as a whitespace-delimited, case-insensitive word
fn find_word(text: &str, word: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..text.len()).find(|&i| {
        let end = i + word.len();
        text.get(i..end).is_some_and(|s| s.eq_ignore_ascii_case(word))
            && (i == 0 || bytes[i - 1].is_ascii_whitespace())
            && (end == text.len() || bytes[end].is_ascii_whitespace())
    })
}
