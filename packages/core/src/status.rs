//! The status indicator a node shows in the host's editor.

use serde::{Deserialize, Serialize};

/// Indicator colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    Red,
    Green,
    Yellow,
    Blue,
    Grey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Dot,
    Ring,
}

/// A `(fill, shape, text)` status tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub fill: Fill,
    pub shape: Shape,
    pub text: String,
}

impl Status {
    pub fn new(fill: Fill, shape: Shape, text: impl Into<String>) -> Self {
        Self {
            fill,
            shape,
            text: text.into(),
        }
    }

    /// Blue dot: a remote call is in flight.
    pub fn busy(text: impl Into<String>) -> Self {
        Self::new(Fill::Blue, Shape::Dot, text)
    }

    /// Green dot.
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Fill::Green, Shape::Dot, text)
    }

    /// Red ring.
    pub fn failure(text: impl Into<String>) -> Self {
        Self::new(Fill::Red, Shape::Ring, text)
    }

    /// Yellow ring: input refused pending user action.
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Fill::Yellow, Shape::Ring, text)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fill = match self.fill {
            Fill::Red => "red",
            Fill::Green => "green",
            Fill::Yellow => "yellow",
            Fill::Blue => "blue",
            Fill::Grey => "grey",
        };
        let shape = match self.shape {
            Shape::Dot => "dot",
            Shape::Ring => "ring",
        };
        write!(f, "[{fill} {shape}] {}", self.text)
    }
}
