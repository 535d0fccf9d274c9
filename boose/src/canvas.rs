//! Drawing surface
//!
//! The interpreter only issues commands through [`Canvas`]. [`RecordingCanvas`]
//! is a headless implementation that tracks pen state and keeps a log of every
//! operation, which is what the CLI prints and what tests assert on.

use serde::Serialize;
use std::fmt;

/// Drawing capability consumed by the interpreter
pub trait Canvas {
    fn move_to(&mut self, x: i32, y: i32);
    /// Draw a line from the pen position and move the pen there
    fn draw_to(&mut self, x: i32, y: i32);
    fn set_colour(&mut self, r: u8, g: u8, b: u8);
    fn set_fill(&mut self, fill: bool);
    /// Rectangle with its top-left corner at the pen position
    fn draw_rectangle(&mut self, width: i32, height: i32);
    /// Circle centred on the pen position
    fn draw_circle(&mut self, radius: i32);
    fn draw_triangle(&mut self, width: i32, height: i32);
    fn write_text(&mut self, text: &str);
    fn clear(&mut self);
    fn current_position(&self) -> (i32, i32);
}

/// One recorded canvas operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CanvasOp {
    MoveTo { x: i32, y: i32 },
    DrawTo { from: (i32, i32), to: (i32, i32) },
    Colour { r: u8, g: u8, b: u8 },
    Fill { on: bool },
    Rectangle { at: (i32, i32), width: i32, height: i32, filled: bool },
    Circle { at: (i32, i32), radius: i32, filled: bool },
    Triangle { at: (i32, i32), width: i32, height: i32, filled: bool },
    Text { at: (i32, i32), text: String },
    Clear,
}

impl fmt::Display for CanvasOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fill = |filled: &bool| if *filled { " filled" } else { "" };
        match self {
            CanvasOp::MoveTo { x, y } => write!(f, "moveto {x},{y}"),
            CanvasOp::DrawTo { from, to } => {
                write!(f, "line {},{} -> {},{}", from.0, from.1, to.0, to.1)
            }
            CanvasOp::Colour { r, g, b } => write!(f, "colour {r},{g},{b}"),
            CanvasOp::Fill { on } => write!(f, "fill {}", if *on { "on" } else { "off" }),
            CanvasOp::Rectangle { at, width, height, filled } => {
                write!(f, "rect {}x{} at {},{}{}", width, height, at.0, at.1, fill(filled))
            }
            CanvasOp::Circle { at, radius, filled } => {
                write!(f, "circle r={} at {},{}{}", radius, at.0, at.1, fill(filled))
            }
            CanvasOp::Triangle { at, width, height, filled } => {
                write!(f, "tri {}x{} at {},{}{}", width, height, at.0, at.1, fill(filled))
            }
            CanvasOp::Text { at, text } => write!(f, "text {:?} at {},{}", text, at.0, at.1),
            CanvasOp::Clear => write!(f, "clear"),
        }
    }
}

/// Headless canvas that records what was drawn
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingCanvas {
    position: (i32, i32),
    colour: (u8, u8, u8),
    fill: bool,
    ops: Vec<CanvasOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    pub fn colour(&self) -> (u8, u8, u8) {
        self.colour
    }

    pub fn fill(&self) -> bool {
        self.fill
    }

    /// One operation per line
    pub fn trace(&self) -> String {
        self.ops
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Forget recorded operations and reset pen state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Canvas for RecordingCanvas {
    fn move_to(&mut self, x: i32, y: i32) {
        self.position = (x, y);
        self.ops.push(CanvasOp::MoveTo { x, y });
    }

    fn draw_to(&mut self, x: i32, y: i32) {
        self.ops.push(CanvasOp::DrawTo {
            from: self.position,
            to: (x, y),
        });
        self.position = (x, y);
    }

    fn set_colour(&mut self, r: u8, g: u8, b: u8) {
        self.colour = (r, g, b);
        self.ops.push(CanvasOp::Colour { r, g, b });
    }

    fn set_fill(&mut self, fill: bool) {
        self.fill = fill;
        self.ops.push(CanvasOp::Fill { on: fill });
    }

    fn draw_rectangle(&mut self, width: i32, height: i32) {
        self.ops.push(CanvasOp::Rectangle {
            at: self.position,
            width,
            height,
            filled: self.fill,
        });
    }

    fn draw_circle(&mut self, radius: i32) {
        self.ops.push(CanvasOp::Circle {
            at: self.position,
            radius,
            filled: self.fill,
        });
    }

    fn draw_triangle(&mut self, width: i32, height: i32) {
        self.ops.push(CanvasOp::Triangle {
            at: self.position,
            width,
            height,
            filled: self.fill,
        });
    }

    fn write_text(&mut self, text: &str) {
        self.ops.push(CanvasOp::Text {
            at: self.position,
            text: text.to_string(),
        });
    }

    fn clear(&mut self) {
        self.ops.push(CanvasOp::Clear);
    }

    fn current_position(&self) -> (i32, i32) {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_and_draw_update_position() {
        let mut canvas = RecordingCanvas::new();
        canvas.move_to(123, 456);
        assert_eq!(canvas.current_position(), (123, 456));
        canvas.draw_to(80, 90);
        assert_eq!(canvas.current_position(), (80, 90));
        assert_eq!(
            canvas.ops()[1],
            CanvasOp::DrawTo {
                from: (123, 456),
                to: (80, 90)
            }
        );
    }

    #[test]
    fn test_shapes_use_fill_state() {
        let mut canvas = RecordingCanvas::new();
        canvas.set_fill(true);
        canvas.draw_circle(5);
        canvas.set_fill(false);
        canvas.draw_rectangle(2, 3);
        assert_eq!(canvas.trace(), "fill on\ncircle r=5 at 0,0 filled\nfill off\nrect 2x3 at 0,0");
    }

    #[test]
    fn test_json_shape() {
        let mut canvas = RecordingCanvas::new();
        canvas.move_to(1, 2);
        let json = serde_json::to_string(canvas.ops()).unwrap();
        assert_eq!(json, r#"[{"op":"move_to","x":1,"y":2}]"#);
    }

    #[test]
    fn test_reset() {
        let mut canvas = RecordingCanvas::new();
        canvas.set_colour(255, 0, 0);
        canvas.move_to(5, 5);
        canvas.reset();
        assert_eq!(canvas.current_position(), (0, 0));
        assert_eq!(canvas.colour(), (0, 0, 0));
        assert!(canvas.ops().is_empty());
    }
}
