//! Control-flow frames

use super::value::Value;

/// One open `if`, `while` or `for` block. Line indices are positions in the
/// block being executed.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFrame {
    For {
        var: String,
        end: Value,
        step: Value,
        /// First line of the body
        body_start: usize,
        /// The `endfor` line
        close: usize,
    },
    While {
        /// The `while` line, which re-checks the condition on every pass
        start: usize,
        close: usize,
    },
    If {
        taken: bool,
        open: usize,
        /// The `endif` line
        close: usize,
    },
}

impl ControlFrame {
    /// Index of the line that opened this block
    pub fn opener(&self) -> usize {
        match self {
            ControlFrame::For { body_start, .. } => body_start - 1,
            ControlFrame::While { start, .. } => *start,
            ControlFrame::If { open, .. } => *open,
        }
    }

    pub fn close(&self) -> usize {
        match self {
            ControlFrame::For { close, .. } | ControlFrame::While { close, .. } | ControlFrame::If { close, .. } => {
                *close
            }
        }
    }
}
