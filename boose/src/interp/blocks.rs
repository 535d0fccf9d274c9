//! Line classification and block matching
//!
//! Every line is classified by its leading keyword. Before a block of lines
//! runs, [`BlockMap::build`] pairs each opener with its closer (and each `if`
//! with its `else`) in one pass, so jumps during execution are lookups
//! instead of rescans. A program that does not nest properly is rejected here.

use crate::error::{BooseError, Result};

/// Kind of a control-flow or definition block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    While,
    For,
    Method,
}

impl BlockKind {
    pub fn opener(self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::While => "while",
            BlockKind::For => "for",
            BlockKind::Method => "method",
        }
    }

    pub fn closer(self) -> &'static str {
        match self {
            BlockKind::If => "endif",
            BlockKind::While => "endwhile",
            BlockKind::For => "endfor",
            BlockKind::Method => "endmethod",
        }
    }

    fn from_opener(word: &str) -> Option<Self> {
        match word {
            "if" => Some(BlockKind::If),
            "while" => Some(BlockKind::While),
            "for" => Some(BlockKind::For),
            "method" => Some(BlockKind::Method),
            _ => None,
        }
    }
}

/// What a line is, judged by its leading keyword only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Blank or comment
    Skip,
    Open(BlockKind),
    Else,
    Close(BlockKind),
    Statement,
}

/// True for lines that carry no statement
pub fn is_skippable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('*') || line.starts_with("//") || line.starts_with('#')
}

/// Split a trimmed line into its leading identifier and the rest.
/// The identifier may be followed directly by `(`, `=` or similar.
pub fn split_keyword(line: &str) -> (&str, &str) {
    let line = line.trim();
    let end = line
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(line.len(), |(i, _)| i);
    (&line[..end], line[end..].trim_start())
}

/// Classify one source line
pub fn classify(line: &str) -> LineKind {
    if is_skippable(line) {
        return LineKind::Skip;
    }
    let (word, rest) = split_keyword(line);
    let word = word.to_ascii_lowercase();

    // `end if` is accepted as a spelling of `endif`
    let closer = if word == "end" {
        let (next, tail) = split_keyword(rest);
        tail.is_empty().then(|| next.to_ascii_lowercase())
    } else {
        word.strip_prefix("end").map(str::to_string)
    };
    if let Some(kind) = closer.as_deref().and_then(BlockKind::from_opener)
        && (word != "end" || !rest.is_empty())
    {
        return LineKind::Close(kind);
    }

    if word == "else" && rest.is_empty() {
        return LineKind::Else;
    }
    match BlockKind::from_opener(&word) {
        // `for = 3` or `if = 2` are assignments to a variable, not openers
        Some(_) if rest.starts_with('=') && !rest.starts_with("==") => LineKind::Statement,
        Some(kind) => LineKind::Open(kind),
        None => LineKind::Statement,
    }
}

/// True once no block opened in `lines` is still waiting for its closer.
/// Stray closers count as balanced so the block pass can report them.
pub fn is_balanced<S: AsRef<str>>(lines: &[S]) -> bool {
    let mut depth = 0isize;
    for line in lines {
        match classify(line.as_ref()) {
            LineKind::Open(_) => depth += 1,
            LineKind::Close(_) => depth -= 1,
            _ => {}
        }
    }
    depth <= 0
}

/// Matching positions for every block opener, closer and `else` in a slice
/// of lines. Indices are 0-based positions in that slice.
#[derive(Debug, Clone, Default)]
pub struct BlockMap {
    /// opener -> closer, closer -> opener, else -> closer
    partner: Vec<Option<usize>>,
    /// if -> else
    else_of: Vec<Option<usize>>,
}

struct OpenBlock {
    kind: BlockKind,
    index: usize,
    else_index: Option<usize>,
}

impl BlockMap {
    /// Match all blocks in `lines`. `first_line` is the 1-based program line
    /// of `lines[0]`, used in error messages.
    pub fn build<S: AsRef<str>>(lines: &[S], first_line: usize) -> Result<Self> {
        let mut map = BlockMap {
            partner: vec![None; lines.len()],
            else_of: vec![None; lines.len()],
        };
        let mut stack: Vec<OpenBlock> = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let line_no = first_line + index;
            match classify(line.as_ref()) {
                LineKind::Open(kind) => stack.push(OpenBlock {
                    kind,
                    index,
                    else_index: None,
                }),
                LineKind::Else => match stack.last_mut() {
                    Some(open) if open.kind == BlockKind::If && open.else_index.is_none() => {
                        open.else_index = Some(index);
                    }
                    Some(open) if open.kind == BlockKind::If => {
                        return Err(BooseError::unmatched_block(
                            line_no,
                            format!("second 'else' for 'if' at line {}", first_line + open.index),
                        ));
                    }
                    _ => {
                        return Err(BooseError::unmatched_block(line_no, "'else' without matching 'if'"));
                    }
                },
                LineKind::Close(kind) => {
                    let Some(open) = stack.pop() else {
                        return Err(BooseError::unmatched_block(
                            line_no,
                            format!("'{}' without matching '{}'", kind.closer(), kind.opener()),
                        ));
                    };
                    if open.kind != kind {
                        return Err(BooseError::unmatched_block(
                            line_no,
                            format!(
                                "'{}' found but '{}' at line {} is still open",
                                kind.closer(),
                                open.kind.opener(),
                                first_line + open.index
                            ),
                        ));
                    }
                    map.partner[open.index] = Some(index);
                    map.partner[index] = Some(open.index);
                    if let Some(else_index) = open.else_index {
                        map.else_of[open.index] = Some(else_index);
                        map.partner[else_index] = Some(index);
                    }
                }
                LineKind::Skip | LineKind::Statement => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(BooseError::unmatched_block(
                first_line + open.index,
                format!("missing '{}' for '{}'", open.kind.closer(), open.kind.opener()),
            ));
        }

        Ok(map)
    }

    /// Closer for an opener or `else`, or opener for a closer
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partner.get(index).copied().flatten()
    }

    /// The `else` belonging to the `if` at `index`, if it has one
    pub fn else_of(&self, index: usize) -> Option<usize> {
        self.else_of.get(index).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify("  IF x > 1"), LineKind::Open(BlockKind::If));
        assert_eq!(classify("if(x>1)"), LineKind::Open(BlockKind::If));
        assert_eq!(classify("int x = 1"), LineKind::Statement);
        assert_eq!(classify("formula = 2"), LineKind::Statement);
        assert_eq!(classify("endif"), LineKind::Close(BlockKind::If));
        assert_eq!(classify("end while"), LineKind::Close(BlockKind::While));
        assert_eq!(classify("EndMethod"), LineKind::Close(BlockKind::Method));
        assert_eq!(classify("else"), LineKind::Else);
        assert_eq!(classify("* a comment"), LineKind::Skip);
        assert_eq!(classify("   "), LineKind::Skip);
        assert_eq!(classify("end = 4"), LineKind::Statement);
        assert_eq!(classify("for = 3"), LineKind::Statement);
    }

    #[test]
    fn test_split_keyword() {
        assert_eq!(split_keyword("call draw(x)"), ("call", "draw(x)"));
        assert_eq!(split_keyword("x=x+1"), ("x", "=x+1"));
        assert_eq!(split_keyword("endif"), ("endif", ""));
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced(&["moveto 1 1"]));
        assert!(!is_balanced(&["for i = 1 to 2", "if i > 1"]));
        assert!(!is_balanced(&["for i = 1 to 2", "if i > 1", "endif"]));
        assert!(is_balanced(&["for i = 1 to 2", "if i > 1", "endif", "endfor"]));
        assert!(is_balanced(&["endwhile"]));
    }

    #[test]
    fn test_build_nested() {
        let lines = [
            "while x < 3",  // 0
            "if x == 1",    // 1
            "moveto 1 1",   // 2
            "else",         // 3
            "moveto 2 2",   // 4
            "endif",        // 5
            "x = x + 1",    // 6
            "endwhile",     // 7
        ];
        let map = BlockMap::build(&lines, 1).unwrap();
        assert_eq!(map.partner(0), Some(7));
        assert_eq!(map.partner(7), Some(0));
        assert_eq!(map.partner(1), Some(5));
        assert_eq!(map.else_of(1), Some(3));
        assert_eq!(map.partner(3), Some(5));
        assert_eq!(map.partner(2), None);
    }

    #[test]
    fn test_missing_closer_is_reported_at_opener() {
        let lines = ["int x = 1", "for i = 1 to 3", "moveto i i"];
        let err = BlockMap::build(&lines, 1).unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("endfor"));
    }

    #[test]
    fn test_stray_closer() {
        let err = BlockMap::build(&["endwhile"], 10).unwrap_err();
        assert_eq!(err.line(), Some(10));
    }

    #[test]
    fn test_crossed_blocks() {
        let lines = ["for i = 1 to 2", "if i > 1", "endfor", "endif"];
        let err = BlockMap::build(&lines, 1).unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_else_outside_if() {
        let lines = ["while 1 < 0", "else", "endwhile"];
        assert!(BlockMap::build(&lines, 1).is_err());
        assert!(BlockMap::build(&["if 1", "else", "else", "endif"], 1).is_err());
    }
}
