//! Excellon drill file types.

use crate::geometry::Point;

/// Tool definition from the file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tool {
    /// Drill diameter in file units.
    pub diameter: f64,
    /// True for plated through holes.
    pub plated: bool,
}

/// A single drill hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Tool number.
    pub tool: u32,
    /// Hole center.
    pub position: Point,
}

/// A `G85` drilled slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    /// Tool number.
    pub tool: u32,
    /// Slot start.
    pub start: Point,
    /// Slot end.
    pub end: Point,
}

/// Motion kind of a routed path node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutMode {
    /// `G00` positioning before the plunge; always the first node.
    Rout,
    /// `G01`
    Linear,
    /// `G02`
    Clockwise,
    /// `G03`
    CounterClockwise,
}

/// One node of a routed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutNode {
    /// Motion kind.
    pub mode: RoutMode,
    /// Target position.
    pub position: Point,
    /// Arc radius given with `A`.
    pub radius: Option<f64>,
    /// Arc center offset given with `I`/`J`, relative to the previous node.
    pub center_offset: Option<Point>,
}

/// A routed path between `M15` and `M16`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rout {
    /// Tool number.
    pub tool: u32,
    /// Nodes; the first has [`RoutMode::Rout`].
    pub nodes: Vec<RoutNode>,
}
