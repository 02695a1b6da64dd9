//! Core geometry types and the `GeometryBuilder` preview accumulator.

use serde::Serialize;

/// 2D point in board coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the point shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Componentwise scale.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy).sqrt()
    }

    /// True when both coordinates are within `eps` of `other`'s.
    pub fn approx_eq(self, other: Self, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }

    /// Rotates the point about `center`.
    #[must_use]
    pub fn rotated(self, rotation: Rotation, center: Self) -> Self {
        let (dx, dy) = rotation.apply(self.x - center.x, self.y - center.y);
        Self::new(center.x + dx, center.y + dy)
    }
}

/// Counter-clockwise rotation by a multiple of 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// 90 degrees counter-clockwise.
    R90,
    /// 180 degrees.
    R180,
    /// 270 degrees counter-clockwise.
    R270,
}

impl Rotation {
    /// Maps a degree value onto a quarter turn; `None` for other angles.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        let normalized = degrees.rem_euclid(360.0);
        let quarter = (normalized / 90.0).round();
        if (normalized - quarter * 90.0).abs() > 1e-9 {
            return None;
        }
        match quarter as i64 % 4 {
            0 => Some(Self::R0),
            1 => Some(Self::R90),
            2 => Some(Self::R180),
            _ => Some(Self::R270),
        }
    }

    /// Rotation angle in degrees.
    pub const fn degrees(self) -> f64 {
        match self {
            Self::R0 => 0.0,
            Self::R90 => 90.0,
            Self::R180 => 180.0,
            Self::R270 => 270.0,
        }
    }

    /// True for 90 and 270 degrees, where width and height swap.
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::R90 | Self::R270)
    }

    /// Rotates a vector about the origin. Exact for every quarter turn.
    pub fn apply(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::R0 => (x, y),
            Self::R90 => (-y, x),
            Self::R180 => (-x, -y),
            Self::R270 => (y, -x),
        }
    }
}

/// Arc sweep direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArcDirection {
    /// Clockwise (G02).
    Clockwise,
    /// Counter-clockwise (G03).
    CounterClockwise,
}

impl ArcDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Minimum X coordinate.
    pub min_x: f64,
    /// Minimum Y coordinate.
    pub min_y: f64,
    /// Maximum X coordinate.
    pub max_x: f64,
    /// Maximum Y coordinate.
    pub max_y: f64,
}

impl BoundingBox {
    /// Creates an empty bounding box that will expand with the first `update` call.
    pub const fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Expands the bounding box to include the given point.
    pub fn update(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Expands the bounding box to include `other`.
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.update(other.min_x, other.min_y);
        self.update(other.max_x, other.max_y);
    }

    /// True until the first point has been added.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Width, or zero when empty.
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    /// Height, or zero when empty.
    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Width times height.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Lower-left corner.
    pub const fn min_corner(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Level polarity of drawn geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Polarity {
    /// Dark polarity, adds material.
    Dark,
    /// Clear polarity, removes material.
    Clear,
}

impl Polarity {
    /// The other polarity.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Dark => Self::Clear,
            Self::Clear => Self::Dark,
        }
    }
}

/// Preview mesh of a single layer.
///
/// Positions are interleaved `[x0, y0, x1, y1, ...]` as `f32` for WebGL.
/// Indices reference into the positions array as a triangle list.
#[derive(Debug, Clone)]
pub struct LayerGeometry {
    /// Interleaved vertex positions `[x0, y0, x1, y1, ...]`.
    pub positions: Vec<f32>,
    /// Triangle-list indices into the positions array.
    pub indices: Vec<u32>,
    /// Axis-aligned bounding box of all vertices.
    pub bounds: BoundingBox,
    /// Number of primitives converted.
    pub command_count: u32,
    /// Number of vertices (`positions.len() / 2`).
    pub vertex_count: u32,
    /// Warning messages generated during conversion.
    pub warnings: Vec<String>,
    /// Index ranges for clear-polarity geometry `(start, end)` pairs.
    pub clear_ranges: Vec<(u32, u32)>,
}

/// Metadata returned to the host for a previewed layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerMeta {
    /// Axis-aligned bounding box.
    pub bounds: BoundingBox,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of triangle indices.
    pub index_count: u32,
    /// Number of primitives converted.
    pub command_count: u32,
    /// Number of warnings.
    pub warning_count: u32,
    /// Warning messages.
    pub warnings: Vec<String>,
}

impl LayerMeta {
    /// Summarises `geom`.
    pub fn of(geom: &LayerGeometry) -> Self {
        Self {
            bounds: geom.bounds,
            vertex_count: geom.vertex_count,
            index_count: saturate_u32(geom.indices.len()),
            command_count: geom.command_count,
            warning_count: saturate_u32(geom.warnings.len()),
            warnings: geom.warnings.clone(),
        }
    }
}

/// Converts a length to `u32`, saturating on overflow.
pub fn saturate_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Accumulator for building preview geometry incrementally.
///
/// Vertices and indices are collected in flat `Vec`s to minimize allocations.
#[derive(Debug)]
pub struct GeometryBuilder {
    positions: Vec<f32>,
    indices: Vec<u32>,
    bounds: BoundingBox,
    warnings: Vec<String>,
    clear_ranges: Vec<(u32, u32)>,
}

impl GeometryBuilder {
    /// Creates an empty builder.
    pub const fn new() -> Self {
        Self {
            positions: Vec::new(),
            indices: Vec::new(),
            bounds: BoundingBox::new(),
            warnings: Vec::new(),
            clear_ranges: Vec::new(),
        }
    }

    /// Adds a vertex and returns its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_vertex(&mut self, x: f64, y: f64) -> u32 {
        let idx = self.positions.len() / 2;
        self.positions.push(x as f32);
        self.positions.push(y as f32);
        self.bounds.update(x, y);
        saturate_u32(idx)
    }

    /// Adds a triangle from three vertex indices.
    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.push(a);
        self.indices.push(b);
        self.indices.push(c);
    }

    /// Adds a quad as two triangles `(a, b, c)` and `(a, c, d)`.
    pub fn push_quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.push_triangle(a, b, c);
        self.push_triangle(a, c, d);
    }

    /// Adds an N-gon centered at `(cx, cy)`, fan-triangulated from the first vertex.
    ///
    /// `phase_deg` rotates the first vertex away from the +X axis.
    pub fn push_ngon(&mut self, cx: f64, cy: f64, radius: f64, segments: u32, phase_deg: f64) -> u32 {
        let phase = phase_deg.to_radians();
        let first = self.push_vertex(radius.mul_add(phase.cos(), cx), radius.mul_add(phase.sin(), cy));

        for i in 1..segments {
            let angle = (2.0 * std::f64::consts::PI).mul_add(f64::from(i) / f64::from(segments), phase);
            self.push_vertex(
                radius.mul_add(angle.cos(), cx),
                radius.mul_add(angle.sin(), cy),
            );
        }

        for i in 1..segments.saturating_sub(1) {
            self.push_triangle(first, first + i, first + i + 1);
        }

        first
    }

    /// Records a warning message.
    pub fn warn(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    /// Records an index range for clear-polarity geometry.
    pub fn record_clear_range(&mut self, start: u32, end: u32) {
        if end > start {
            self.clear_ranges.push((start, end));
        }
    }

    /// Returns the current number of triangle indices.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        saturate_u32(self.indices.len())
    }

    /// Returns the current number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        saturate_u32(self.positions.len() / 2)
    }

    /// Consumes the builder and produces a [`LayerGeometry`].
    ///
    /// `command_count` is set to 0; the caller should update it as needed.
    pub fn build(self) -> LayerGeometry {
        let vertex_count = saturate_u32(self.positions.len() / 2);
        LayerGeometry {
            positions: self.positions,
            indices: self.indices,
            bounds: self.bounds,
            command_count: 0,
            vertex_count,
            warnings: self.warnings,
            clear_ranges: self.clear_ranges,
        }
    }
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
