// Input handling system
//
// Named boolean inputs ("Attack1", "Fly", ...) with edge detection. Hosts set
// raw values; the animal drains the edges once per tick and routes each one to
// the modes and states bound to that name.

use std::collections::{HashMap, VecDeque};

/// A single input change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEdge {
    pub name: String,
    pub value: bool,
}

/// Named boolean input source
#[derive(Debug, Default)]
pub struct InputSource {
    values: HashMap<String, bool>,
    edges: VecDeque<InputEdge>,
}

impl InputSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an input value. Records an edge only when the value changes.
    /// Returns true if an edge was recorded.
    pub fn set_input(&mut self, name: &str, value: bool) -> bool {
        let previous = self.values.insert(name.to_string(), value).unwrap_or(false);
        if previous == value {
            return false;
        }

        self.edges.push_back(InputEdge {
            name: name.to_string(),
            value,
        });
        true
    }

    /// Current value of an input (false if never set)
    pub fn value(&self, name: &str) -> bool {
        self.values.get(name).copied().unwrap_or(false)
    }

    /// Take every pending edge in arrival order
    pub fn drain_edges(&mut self) -> Vec<InputEdge> {
        self.edges.drain(..).collect()
    }

    pub fn has_pending_edges(&self) -> bool {
        !self.edges.is_empty()
    }

    /// Release everything without producing edges
    pub fn reset(&mut self) {
        self.values.clear();
        self.edges.clear();
    }
}
