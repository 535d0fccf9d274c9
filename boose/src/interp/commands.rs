//! Command registry and the built-in command handlers
//!
//! Every non-control line is `keyword args...`. The registry maps the keyword
//! to a handler; the handler parses its own arguments, evaluates them against
//! the current scope and performs exactly one action: a canvas call or a
//! scope mutation.

use super::blocks::split_keyword;
use super::eval::{evaluate, split_top_level};
use super::scope::Scope;
use super::value::{Matrix, Value};
use crate::canvas::Canvas;
use crate::error::{BooseError, Result};
use crate::util::find_similar_name;
use std::collections::HashMap;

/// Largest number of elements a single array may hold
const MAX_ARRAY_LEN: usize = 1 << 24;

/// What a handler may reach outside its scope
pub trait Host {
    fn canvas(&mut self) -> &mut dyn Canvas;

    /// Run a user method. `args` are unevaluated expressions, evaluated
    /// against `caller`. Returns the method's declared name and its result.
    fn call_method(&mut self, name: &str, args: &[&str], caller: &mut Scope) -> Result<(String, Value)>;
}

/// Argument text following a command keyword
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    text: &'a str,
}

impl<'a> Args<'a> {
    pub fn new(text: &'a str) -> Self {
        Args { text: text.trim() }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Exactly `count` expressions, comma- or whitespace-separated
    fn expressions(&self, count: usize, shape: &str) -> Result<Vec<&'a str>> {
        let parts = if count == 1 && !self.text.is_empty() {
            vec![self.text]
        } else {
            argument_list(self.text)
        };
        if parts.len() != count || parts.iter().any(|p| p.is_empty()) {
            return Err(BooseError::argument(format!("expected '{shape}'")));
        }
        Ok(parts)
    }
}

/// Positional arguments: top-level commas when present, otherwise
/// whitespace-separated expressions
fn argument_list(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    let parts = split_top_level(text, ',');
    if parts.len() > 1 {
        parts.into_iter().map(str::trim).collect()
    } else {
        split_expressions(text)
    }
}

/// Byte ranges of the words in `text`, splitting on whitespace outside
/// parentheses and quotes
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = None;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            c if c.is_whitespace() && !in_quote && depth == 0 => {
                if let Some(s) = start.take() {
                    spans.push((s, i));
                }
                continue;
            }
            _ => {}
        }
        start.get_or_insert(i);
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '%')
}

/// Split whitespace-separated expressions, keeping `k + 1` and `(x + 1)`
/// whole. A lone operator joins both neighbours and a word ending in an
/// operator joins the next one; `-5` after a word starts a new expression.
fn split_expressions(text: &str) -> Vec<&str> {
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut joining = false;
    for (start, end) in word_spans(text) {
        let word = &text[start..end];
        let lone_operator = word.len() == 1 && word.chars().all(is_operator);
        match groups.last_mut() {
            Some(group) if joining || lone_operator => group.1 = end,
            _ => groups.push((start, end)),
        }
        joining = word.ends_with(is_operator);
    }
    groups.into_iter().map(|(start, end)| &text[start..end]).collect()
}

/// Split `left = right` at a top-level `=` that is not part of a comparison
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0i32;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => depth -= 1,
            '=' if !in_quote && depth == 0 => {
                let prev = text[..i].chars().next_back();
                let next = text[i + 1..].chars().next();
                if !matches!(prev, Some('=' | '<' | '>' | '!')) && next != Some('=') {
                    return Some((text[..i].trim(), text[i + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// A command handler
pub trait Command {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()>;
}

/// Keyword -> handler, one instance per interpreter
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        CommandRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Registry with every built-in command
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("moveto", Point(PointAction::MoveTo));
        registry.register("drawto", Point(PointAction::DrawTo));
        registry.register("pencolour", PenColour);
        registry.register("rect", Shape(ShapeKind::Rectangle));
        registry.register("tri", Shape(ShapeKind::Triangle));
        registry.register("circle", Circle);
        registry.register("fill", Fill);
        registry.register("write", Write);
        registry.register("clear", Clear);
        registry.register("reset", Reset);
        registry.register("int", Declare(VarKind::Int));
        registry.register("real", Declare(VarKind::Real));
        registry.register("boolean", Declare(VarKind::Boolean));
        registry.register("array", ArrayAlloc);
        registry.register("poke", Poke);
        registry.register("peek", Peek);
        registry.register("cast", Cast);
        registry.register("call", Call);
        registry
    }

    pub fn register(&mut self, keyword: &'static str, handler: impl Command + 'static) {
        self.handlers.insert(keyword, Box::new(handler));
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.handlers.contains_key(keyword.to_ascii_lowercase().as_str())
    }

    /// Sorted list of registered keywords
    pub fn keywords(&self) -> Vec<&'static str> {
        let mut keywords: Vec<_> = self.handlers.keys().copied().collect();
        keywords.sort_unstable();
        keywords
    }

    /// Run a `name = expr` line. Command keywords cannot be assignment targets.
    pub fn assign(&self, host: &mut dyn Host, scope: &mut Scope, line: &str) -> Result<()> {
        let (name, _) = split_keyword(line);
        if self.has(name) {
            return Err(BooseError::argument(format!(
                "'{name}' is a command keyword and cannot be assigned"
            )));
        }
        Assign.execute(host, scope, Args::new(line))
    }

    pub fn dispatch(&self, keyword: &str, host: &mut dyn Host, scope: &mut Scope, args: &str) -> Result<()> {
        match self.handlers.get(keyword.to_ascii_lowercase().as_str()) {
            Some(handler) => handler.execute(host, scope, Args::new(args)),
            None => {
                let keywords = self.keywords();
                let suggestion = find_similar_name(&keyword.to_ascii_lowercase(), &keywords, 2);
                Err(BooseError::unknown_command(keyword, suggestion))
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn eval_all(parts: &[&str], scope: &Scope) -> Result<Vec<Value>> {
    parts.iter().map(|part| evaluate(part, scope)).collect()
}

/// Canvas coordinate or size. Reals are rounded.
fn to_coord(value: &Value) -> Result<i32> {
    let n = match value {
        Value::Int(n) => *n,
        Value::Real(x) if x.is_finite() => x.round() as i64,
        other => return Err(BooseError::type_mismatch("number", other.type_name())),
    };
    i32::try_from(n).map_err(|_| BooseError::argument(format!("{n} is outside the canvas range")))
}

fn to_size(value: &Value, what: &str) -> Result<i32> {
    let n = to_coord(value)?;
    if n < 0 {
        return Err(BooseError::argument(format!("{what} must not be negative, got {n}")));
    }
    Ok(n)
}

fn to_channel(value: &Value) -> Result<u8> {
    let n = value.to_int()?;
    u8::try_from(n).map_err(|_| BooseError::argument(format!("colour component {n} is not in 0..=255")))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn identifier<'a>(text: &'a str, shape: &str) -> Result<&'a str> {
    if is_identifier(text) {
        Ok(text)
    } else {
        Err(BooseError::argument(format!("'{text}' is not a valid name, expected '{shape}'")))
    }
}

/// Split `name = expr` / `name expr` / `name`
fn name_and_expression<'a>(text: &'a str, shape: &str) -> Result<(&'a str, Option<&'a str>)> {
    let (name, rest) = split_keyword(text);
    let name = identifier(name, shape)?;
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok((name, None));
    }
    let expr = match rest.strip_prefix('=') {
        Some(expr) if !expr.starts_with('=') => expr.trim(),
        _ => return Err(BooseError::argument(format!("expected '{shape}'"))),
    };
    if expr.is_empty() {
        return Err(BooseError::argument(format!("missing expression, expected '{shape}'")));
    }
    Ok((name, Some(expr)))
}

// ============================================================================
// Drawing commands
// ============================================================================

enum PointAction {
    MoveTo,
    DrawTo,
}

/// `moveto x y`, `drawto x y`
struct Point(PointAction);

impl Command for Point {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = match self.0 {
            PointAction::MoveTo => "moveto x y",
            PointAction::DrawTo => "drawto x y",
        };
        let values = eval_all(&args.expressions(2, shape)?, scope)?;
        let (x, y) = (to_coord(&values[0])?, to_coord(&values[1])?);
        match self.0 {
            PointAction::MoveTo => host.canvas().move_to(x, y),
            PointAction::DrawTo => host.canvas().draw_to(x, y),
        }
        Ok(())
    }
}

enum ShapeKind {
    Rectangle,
    Triangle,
}

/// `rect w h`, `tri w h`
struct Shape(ShapeKind);

impl Command for Shape {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = match self.0 {
            ShapeKind::Rectangle => "rect width height",
            ShapeKind::Triangle => "tri width height",
        };
        let values = eval_all(&args.expressions(2, shape)?, scope)?;
        let width = to_size(&values[0], "width")?;
        let height = to_size(&values[1], "height")?;
        match self.0 {
            ShapeKind::Rectangle => host.canvas().draw_rectangle(width, height),
            ShapeKind::Triangle => host.canvas().draw_triangle(width, height),
        }
        Ok(())
    }
}

/// `circle r`
struct Circle;

impl Command for Circle {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let parts = args.expressions(1, "circle radius")?;
        let radius = to_size(&evaluate(parts[0], scope)?, "radius")?;
        host.canvas().draw_circle(radius);
        Ok(())
    }
}

fn named_colour(name: &str) -> Option<(u8, u8, u8)> {
    let rgb = match name.to_ascii_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" => (0, 255, 255),
        "magenta" => (255, 0, 255),
        "orange" => (255, 165, 0),
        "gray" | "grey" => (128, 128, 128),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        _ => return None,
    };
    Some(rgb)
}

/// `pencolour r g b` or `pencolour <name>`
struct PenColour;

impl Command for PenColour {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let text = args.text();
        // a single bare word that is not a variable is a colour name
        if is_identifier(text) && !scope.contains(text) {
            let (r, g, b) = named_colour(text)
                .ok_or_else(|| BooseError::argument(format!("unknown colour '{text}'")))?;
            host.canvas().set_colour(r, g, b);
            return Ok(());
        }
        let values = eval_all(&args.expressions(3, "pencolour red green blue")?, scope)?;
        let (r, g, b) = (to_channel(&values[0])?, to_channel(&values[1])?, to_channel(&values[2])?);
        host.canvas().set_colour(r, g, b);
        Ok(())
    }
}

/// `fill on|off`
struct Fill;

impl Command for Fill {
    fn execute(&self, host: &mut dyn Host, _scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let on = match args.text().to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            _ => return Err(BooseError::argument("expected 'fill on' or 'fill off'")),
        };
        host.canvas().set_fill(on);
        Ok(())
    }
}

/// `write <expr>`
struct Write;

impl Command for Write {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        if args.is_empty() {
            return Err(BooseError::argument("expected 'write expression'"));
        }
        let value = evaluate(args.text(), scope)?;
        host.canvas().write_text(&value.to_display_text());
        Ok(())
    }
}

/// `clear`
struct Clear;

impl Command for Clear {
    fn execute(&self, host: &mut dyn Host, _scope: &mut Scope, args: Args<'_>) -> Result<()> {
        if !args.is_empty() {
            return Err(BooseError::argument("'clear' takes no arguments"));
        }
        host.canvas().clear();
        Ok(())
    }
}

/// `reset`: pen back to the origin
struct Reset;

impl Command for Reset {
    fn execute(&self, host: &mut dyn Host, _scope: &mut Scope, args: Args<'_>) -> Result<()> {
        if !args.is_empty() {
            return Err(BooseError::argument("'reset' takes no arguments"));
        }
        host.canvas().move_to(0, 0);
        Ok(())
    }
}

// ============================================================================
// Variables
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum VarKind {
    Int,
    Real,
    Boolean,
}

impl VarKind {
    fn keyword(self) -> &'static str {
        match self {
            VarKind::Int => "int",
            VarKind::Real => "real",
            VarKind::Boolean => "boolean",
        }
    }

    fn zero(self) -> Value {
        match self {
            VarKind::Int => Value::Int(0),
            VarKind::Real => Value::Real(0.0),
            VarKind::Boolean => Value::Bool(false),
        }
    }

    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(_) => Some(VarKind::Int),
            Value::Real(_) => Some(VarKind::Real),
            Value::Bool(_) => Some(VarKind::Boolean),
            _ => None,
        }
    }

    /// Convert a value to this kind: reals truncate to int, ints widen to
    /// real, numbers coerce to boolean
    fn coerce(self, value: Value) -> Result<Value> {
        match (self, value) {
            (VarKind::Int, Value::Int(n)) => Ok(Value::Int(n)),
            (VarKind::Int, v @ Value::Real(_)) => v.to_int().map(Value::Int),
            (VarKind::Real, v) if v.is_numeric() => v.to_real().map(Value::Real),
            (VarKind::Boolean, v @ (Value::Bool(_) | Value::Int(_) | Value::Real(_))) => {
                v.is_truthy().map(Value::Bool)
            }
            (kind, v) => Err(BooseError::type_mismatch(kind.keyword(), v.type_name())),
        }
    }
}

/// `int name [= expr]`, `real name [= expr]`, `boolean name [= expr]`
struct Declare(VarKind);

impl Command for Declare {
    fn execute(&self, _host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = format!("{} name = expression", self.0.keyword());
        let (name, expr) = name_and_expression(args.text(), &shape)?;
        let value = match expr {
            Some(expr) => self.0.coerce(evaluate(expr, scope)?)?,
            None => self.0.zero(),
        };
        scope.define(name, value);
        Ok(())
    }
}

/// `name = expr`. An existing int/real/boolean keeps its type.
struct Assign;

impl Command for Assign {
    fn execute(&self, _host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = "name = expression";
        let (name, expr) = name_and_expression(args.text(), shape)?;
        let expr = expr.ok_or_else(|| BooseError::argument(format!("expected '{shape}'")))?;
        let value = evaluate(expr, scope)?;
        let value = match scope.get(name) {
            Some(existing) if existing.is_array() => {
                return Err(BooseError::type_mismatch(existing.type_name(), value.type_name()));
            }
            Some(existing) => match VarKind::of(existing) {
                Some(kind) => kind.coerce(value)?,
                None => value,
            },
            None => value,
        };
        scope.define(name, value);
        Ok(())
    }
}

/// `cast dest = source`: store the source truncated to an int
struct Cast;

impl Command for Cast {
    fn execute(&self, _host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = "cast destination = source";
        let (dest, rest) = split_keyword(args.text());
        let dest = identifier(dest, shape)?;
        let source = rest.strip_prefix('=').unwrap_or(rest).trim();
        if source.is_empty() {
            return Err(BooseError::argument(format!("expected '{shape}'")));
        }
        let value = evaluate(source, scope)?.to_int()?;
        scope.define(dest, Value::Int(value));
        Ok(())
    }
}

// ============================================================================
// Arrays
// ============================================================================

fn array_len(value: &Value, what: &str) -> Result<usize> {
    let n = value.to_int()?;
    match usize::try_from(n) {
        Ok(len) if len > 0 && len <= MAX_ARRAY_LEN => Ok(len),
        _ => Err(BooseError::argument(format!("{what} must be between 1 and {MAX_ARRAY_LEN}, got {n}"))),
    }
}

/// `array int|real name size[,cols]`
struct ArrayAlloc;

impl Command for ArrayAlloc {
    fn execute(&self, _host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = "array int|real name size[,columns]";
        let (kind, rest) = split_keyword(args.text());
        let (name, dims) = split_keyword(rest);
        let name = identifier(name, shape)?;
        let dims = argument_list(dims);
        if kind.is_empty() || dims.is_empty() || dims.len() > 2 {
            return Err(BooseError::argument(format!("expected '{shape}'")));
        }
        let rows = array_len(&evaluate(dims[0], scope)?, "array size")?;
        let cols = match dims.get(1) {
            Some(cols) => Some(array_len(&evaluate(cols, scope)?, "column count")?),
            None => None,
        };
        if cols.is_some_and(|cols| rows.saturating_mul(cols) > MAX_ARRAY_LEN) {
            return Err(BooseError::argument(format!("array '{name}' is larger than {MAX_ARRAY_LEN} elements")));
        }

        let value = match (kind.to_ascii_lowercase().as_str(), cols) {
            ("int", None) => Value::IntArray(vec![0; rows]),
            ("int", Some(cols)) => Value::IntMatrix(Matrix::new(rows, cols)),
            ("real", None) => Value::RealArray(vec![0.0; rows]),
            ("real", Some(cols)) => Value::RealMatrix(Matrix::new(rows, cols)),
            (other, _) => {
                return Err(BooseError::argument(format!("unknown element type '{other}', expected '{shape}'")));
            }
        };
        scope.define(name, value);
        Ok(())
    }
}

/// Number of indices an array value takes
fn rank(name: &str, value: &Value) -> Result<usize> {
    match value {
        Value::IntArray(_) | Value::RealArray(_) => Ok(1),
        Value::IntMatrix(_) | Value::RealMatrix(_) => Ok(2),
        other => Err(BooseError::type_mismatch(format!("array for '{name}'"), other.type_name())),
    }
}

fn check_rank(name: &str, value: &Value, given: usize) -> Result<()> {
    let expected = rank(name, value)?;
    if given != expected {
        return Err(BooseError::type_mismatch(
            format!("{expected} index(es) for {} '{name}'", value.type_name()),
            format!("{given}"),
        ));
    }
    Ok(())
}

fn index(value: &Value, name: &str, len: usize) -> Result<usize> {
    let i = value.to_int()?;
    usize::try_from(i)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| BooseError::array_bounds(name, i, len))
}

fn vec_slot<'v, T>(items: &'v mut [T], name: &str, indices: &[Value]) -> Result<&'v mut T> {
    let i = index(&indices[0], name, items.len())?;
    Ok(&mut items[i])
}

fn matrix_slot<'v, T: Copy + Default>(m: &'v mut Matrix<T>, name: &str, indices: &[Value]) -> Result<&'v mut T> {
    let cols = m.cols();
    let row = index(&indices[0], name, m.rows())?;
    let col = index(&indices[1], name, cols)?;
    m.get_mut(row, col)
        .ok_or_else(|| BooseError::array_bounds(name, col as i64, cols))
}

fn int_element(value: &Value) -> Result<i64> {
    value
        .as_int()
        .ok_or_else(|| BooseError::type_mismatch("int", value.type_name()))
}

/// `poke name index [col] [=] value`
struct Poke;

impl Command for Poke {
    fn execute(&self, _host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = "poke array index [column] = value";
        let (name, rest) = split_keyword(args.text());
        let name = identifier(name, shape)?;
        let array = scope
            .get(name)
            .ok_or_else(|| BooseError::undefined_variable(name))?;

        // the value is whatever follows `=`, or else the last argument
        let (index_parts, value_text) = match split_assignment(rest) {
            Some((indices, value)) => (argument_list(indices), value),
            None => {
                let mut parts = argument_list(rest);
                let value = parts.pop().unwrap_or("");
                (parts, value)
            }
        };
        if value_text.is_empty() {
            return Err(BooseError::argument(format!("missing value, expected '{shape}'")));
        }
        check_rank(name, array, index_parts.len())?;
        let indices = eval_all(&index_parts, scope)?;
        let value = evaluate(value_text, scope)?;

        match scope.get_mut(name) {
            Some(Value::IntArray(items)) => *vec_slot(items, name, &indices)? = int_element(&value)?,
            Some(Value::IntMatrix(m)) => *matrix_slot(m, name, &indices)? = int_element(&value)?,
            Some(Value::RealArray(items)) => *vec_slot(items, name, &indices)? = value.to_real()?,
            Some(Value::RealMatrix(m)) => *matrix_slot(m, name, &indices)? = value.to_real()?,
            _ => return Err(BooseError::undefined_variable(name)),
        }
        Ok(())
    }
}

/// `peek target [=] name index [col]`
struct Peek;

impl Command for Peek {
    fn execute(&self, _host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = "peek variable = array index [column]";
        let (target, rest) = split_keyword(args.text());
        let target = identifier(target, shape)?;
        let rest = rest.strip_prefix('=').unwrap_or(rest);
        let (name, index_text) = split_keyword(rest);
        if name.is_empty() {
            return Err(BooseError::argument(format!("expected '{shape}'")));
        }
        let name = identifier(name, shape)?;
        let index_parts = argument_list(index_text);
        let array = scope
            .get(name)
            .ok_or_else(|| BooseError::undefined_variable(name))?;
        check_rank(name, array, index_parts.len())?;
        let indices = eval_all(&index_parts, scope)?;

        let value = match scope.get_mut(name) {
            Some(Value::IntArray(items)) => Value::Int(*vec_slot(items, name, &indices)?),
            Some(Value::IntMatrix(m)) => Value::Int(*matrix_slot(m, name, &indices)?),
            Some(Value::RealArray(items)) => Value::Real(*vec_slot(items, name, &indices)?),
            Some(Value::RealMatrix(m)) => Value::Real(*matrix_slot(m, name, &indices)?),
            _ => return Err(BooseError::undefined_variable(name)),
        };
        scope.define(target, value);
        Ok(())
    }
}

// ============================================================================
// Methods
// ============================================================================

/// `call name(a, b)`, `call name a b`, `call name`
struct Call;

impl Command for Call {
    fn execute(&self, host: &mut dyn Host, scope: &mut Scope, args: Args<'_>) -> Result<()> {
        let shape = "call name(argument, ...)";
        let (name, rest) = split_keyword(args.text());
        let name = identifier(name, shape)?;

        let arg_text = match rest.strip_prefix('(') {
            Some(inner) => inner
                .strip_suffix(')')
                .ok_or_else(|| BooseError::argument(format!("missing ')', expected '{shape}'")))?,
            None => rest,
        };
        let arg_text = arg_text.trim();
        let call_args: Vec<&str> = if arg_text.is_empty() {
            Vec::new()
        } else if rest.starts_with('(') || split_top_level(arg_text, ',').len() > 1 {
            split_top_level(arg_text, ',').into_iter().map(str::trim).collect()
        } else {
            argument_list(arg_text)
        };
        if call_args.iter().any(|a| a.is_empty()) {
            return Err(BooseError::argument(format!("empty argument, expected '{shape}'")));
        }

        let (declared, result) = host.call_method(name, &call_args, scope)?;
        scope.define(declared, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;

    /// Host with a recording canvas and a single built-in `double(n)` method
    #[derive(Default)]
    struct TestHost {
        canvas: RecordingCanvas,
        calls: Vec<(String, Vec<String>)>,
    }

    impl Host for TestHost {
        fn canvas(&mut self) -> &mut dyn Canvas {
            &mut self.canvas
        }

        fn call_method(&mut self, name: &str, args: &[&str], caller: &mut Scope) -> Result<(String, Value)> {
            self.calls
                .push((name.to_string(), args.iter().map(|a| a.to_string()).collect()));
            if !name.eq_ignore_ascii_case("double") {
                return Err(BooseError::undefined_method(name));
            }
            if args.len() != 1 {
                return Err(BooseError::argument_count("double", 1, args.len()));
            }
            let n = evaluate(args[0], caller)?.to_int()?;
            Ok(("double".to_string(), Value::Int(n * 2)))
        }
    }

    fn run(lines: &[&str]) -> (TestHost, Scope, Vec<BooseError>) {
        let registry = CommandRegistry::with_builtins();
        let mut host = TestHost::default();
        let mut scope = Scope::new();
        let mut errors = Vec::new();
        for line in lines {
            let (keyword, rest) = split_keyword(line);
            let result = if rest.starts_with('=') {
                registry.assign(&mut host, &mut scope, line)
            } else {
                registry.dispatch(keyword, &mut host, &mut scope, rest)
            };
            if let Err(err) = result {
                errors.push(err);
            }
        }
        (host, scope, errors)
    }

    #[test]
    fn test_registry_has() {
        let registry = CommandRegistry::with_builtins();
        assert!(registry.has("moveto"));
        assert!(registry.has("MoveTo"));
        assert!(!registry.has("jump"));
        assert!(CommandRegistry::new().keywords().is_empty());
    }

    #[test]
    fn test_unknown_command_suggests() {
        let (_, _, errors) = run(&["movto 1 2"]);
        assert!(matches!(
            &errors[0],
            BooseError::UnknownCommand { keyword, hint } if keyword == "movto" && hint.contains("moveto")
        ));
    }

    #[test]
    fn test_pairs_accept_commas_and_spaces() {
        let (host, _, errors) = run(&["int x = 5", "moveto x, x * 2", "drawto 7 8", "moveto (x + 1) 3"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(host.canvas.trace(), "moveto 5,10\nline 5,10 -> 7,8\nmoveto 6,3");
    }

    #[test]
    fn test_pair_arity_error_names_shape() {
        let (_, _, errors) = run(&["moveto 1", "drawto 1 2 3"]);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("moveto x y"));
        assert!(errors[1].to_string().contains("drawto x y"));
    }

    #[test]
    fn test_shapes_and_pen() {
        let (host, _, errors) = run(&[
            "pencolour 255,0,0",
            "pencolour blue",
            "fill on",
            "rect 10 20",
            "circle 5 + 5",
            "tri 4,6",
            "fill off",
        ]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(host.canvas.colour(), (0, 0, 255));
        assert_eq!(
            host.canvas.trace(),
            "colour 255,0,0\ncolour 0,0,255\nfill on\nrect 10x20 at 0,0 filled\ncircle r=10 at 0,0 filled\ntri 4x6 at 0,0 filled\nfill off"
        );
    }

    #[test]
    fn test_pen_colour_validation() {
        let (_, _, errors) = run(&["pencolour 256 0 0", "pencolour mauve", "pencolour 1 2", "circle -3"]);
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_pen_colour_variables() {
        let (host, _, errors) = run(&["int red = 10", "pencolour red 20 30"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(host.canvas.colour(), (10, 20, 30));
    }

    #[test]
    fn test_write_formats_values() {
        let (host, _, errors) = run(&["real r = 2.5", "write r", "write \"r is \" + r", "write 3 > 2"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            host.canvas.trace(),
            "text \"2.50\" at 0,0\ntext \"r is 2.5\" at 0,0\ntext \"true\" at 0,0"
        );
    }

    #[test]
    fn test_declarations() {
        let (_, scope, errors) = run(&[
            "int score = 10 + 20 * 2",
            "real val = 5.5 + 0.5",
            "int t = 9.7",
            "boolean flag = 3 > 2",
            "boolean zero = 0",
            "int empty",
        ]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(scope.get("score"), Some(&Value::Int(50)));
        assert!(matches!(scope.get("val"), Some(Value::Real(x)) if *x == 6.0));
        assert!(matches!(scope.get("t"), Some(Value::Int(9))));
        assert_eq!(scope.get("flag"), Some(&Value::Bool(true)));
        assert_eq!(scope.get("zero"), Some(&Value::Bool(false)));
        assert_eq!(scope.get("empty"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_declaration_errors() {
        let (_, _, errors) = run(&["int = 4", "int 9x = 1", "int x = ", "int s = \"text\"", "int y == 3"]);
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_command_keywords_are_not_assignable() {
        let (_, scope, errors) = run(&["int = 4", "Moveto = 1", "x = 2"]);
        assert_eq!(errors.len(), 2, "{errors:?}");
        assert!(errors.iter().all(|e| matches!(e, BooseError::Argument { .. })));
        assert!(!scope.contains("int"));
        assert!(!scope.contains("Moveto"));
        assert_eq!(scope.get("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_assign_is_not_a_user_command() {
        let registry = CommandRegistry::with_builtins();
        assert!(!registry.has("assign"));
        let (_, scope, errors) = run(&["assign x = 5", "asign 1"]);
        assert!(matches!(&errors[0], BooseError::UnknownCommand { keyword, .. } if keyword == "assign"));
        assert!(matches!(&errors[1], BooseError::UnknownCommand { hint, .. } if !hint.contains("assign")));
        assert!(!scope.contains("x"));
    }

    #[test]
    fn test_assignment_keeps_declared_type() {
        let (_, scope, errors) = run(&["int x = 1", "x = 7 / 2", "real r = 1.5", "r = 2", "y = 4.5"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(matches!(scope.get("x"), Some(Value::Int(3))));
        assert!(matches!(scope.get("r"), Some(Value::Real(x)) if *x == 2.0));
        assert!(matches!(scope.get("y"), Some(Value::Real(x)) if *x == 4.5));
    }

    #[test]
    fn test_cast() {
        let (_, scope, errors) = run(&["real r = 9.99", "cast n = r", "cast m r"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(scope.get("n"), Some(&Value::Int(9)));
        assert_eq!(scope.get("m"), Some(&Value::Int(9)));
        let (_, _, errors) = run(&["cast n = missing"]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_peek_poke_real_round_trip() {
        let (_, scope, errors) = run(&["array real values 5", "poke values 0 10.5", "peek v values 0"]);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(matches!(scope.get("v"), Some(Value::Real(x)) if *x == 10.5));
    }

    #[test]
    fn test_matrix_peek_poke() {
        let (_, scope, errors) = run(&[
            "array int grid 3,4",
            "int r = 2",
            "poke grid r 3 = 42",
            "peek cell = grid 2,3",
            "peek other grid 0 0",
        ]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(scope.get("cell"), Some(&Value::Int(42)));
        assert_eq!(scope.get("other"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_array_arguments_are_expressions() {
        let (_, scope, errors) = run(&[
            "int k = 1",
            "array int nums k + 2",
            "poke nums k + 1 5",
            "poke nums k - 1 = k * 7",
            "peek v nums k + 1",
            "peek w = nums (k - 1)",
            "array real grid 2, k + 2",
            "poke grid k, k + 1 = 2.5",
            "peek g grid k k + 1",
        ]);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(scope.get("nums"), Some(&Value::IntArray(vec![7, 0, 5])));
        assert_eq!(scope.get("v"), Some(&Value::Int(5)));
        assert_eq!(scope.get("w"), Some(&Value::Int(7)));
        assert!(matches!(scope.get("g"), Some(Value::Real(x)) if *x == 2.5));
    }

    #[test]
    fn test_split_expressions() {
        assert_eq!(split_expressions("k + 1 5"), vec!["k + 1", "5"]);
        assert_eq!(split_expressions("k+ 1 x -2"), vec!["k+ 1", "x", "-2"]);
        assert_eq!(split_expressions("(a + b) * 2 c"), vec!["(a + b) * 2", "c"]);
        assert_eq!(split_expressions("-1"), vec!["-1"]);
        assert_eq!(split_assignment("r 3 = 42"), Some(("r 3", "42")));
        assert_eq!(split_assignment("i (x == 1)"), None);
        assert_eq!(split_assignment("i x <= 1"), None);
    }

    #[test]
    fn test_array_errors() {
        let (_, _, errors) = run(&[
            "array int nums 3",
            "poke nums 3 1",
            "peek v nums -1",
            "poke nums 0 1.5",
            "peek v nums 0 0",
            "poke missing 0 1",
            "array bool flags 2",
            "array int none 0",
            "int plain = 1",
            "peek v plain 0",
        ]);
        assert_eq!(errors.len(), 8, "{errors:?}");
        assert!(matches!(errors[0], BooseError::ArrayBounds { index: 3, len: 3, .. }));
        assert!(matches!(errors[1], BooseError::ArrayBounds { index: -1, .. }));
        assert!(matches!(errors[2], BooseError::TypeMismatch { .. }));
        assert!(matches!(errors[3], BooseError::TypeMismatch { .. }));
        assert!(matches!(errors[4], BooseError::UndefinedVariable { .. }));
        assert!(matches!(errors[7], BooseError::TypeMismatch { .. }));
    }

    #[test]
    fn test_assigning_over_array_is_rejected() {
        let (_, _, errors) = run(&["array int nums 3", "nums = 4"]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_call_forms() {
        let (host, scope, errors) = run(&["int x = 4", "call double(x + 1)", "call DOUBLE x", "call nothing"]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], BooseError::UndefinedMethod { .. }));
        assert_eq!(scope.get("double"), Some(&Value::Int(8)));
        assert_eq!(host.calls[0], ("double".to_string(), vec!["x + 1".to_string()]));
        assert_eq!(host.calls[1], ("DOUBLE".to_string(), vec!["x".to_string()]));
        assert!(host.calls[2].1.is_empty());
    }

    #[test]
    fn test_call_argument_errors() {
        let (_, _, errors) = run(&["call double(1", "call double(1,)", "call (x)"]);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_clear_and_reset() {
        let (host, _, errors) = run(&["moveto 5 5", "reset", "clear", "clear now"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(host.canvas.current_position(), (0, 0));
        assert_eq!(host.canvas.trace(), "moveto 5,5\nmoveto 0,0\nclear");
    }
}
