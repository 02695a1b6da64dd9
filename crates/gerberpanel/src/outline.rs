//! Board outline extraction from the edge-cuts layer.
//!
//! Line and arc segments are linked end-to-start into chains. The chain with
//! the largest bounding area is the outer outline; other closed chains are
//! holes.

use std::fmt::Write as _;

use tracing::{debug, warn};

use crate::error::PanelError;
use crate::geometry::mesh::arc_points;
use crate::geometry::{ArcDirection, BoundingBox, Point, Rotation};
use crate::gerber::primitives::make_arc;
use crate::gerber::{extend_bounds, DrawnPrimitive, GerberFile, QuadrantMode};
use crate::units::format_decimal;

const POLYGON_SEGMENT_LENGTH: f64 = 0.05;

/// One outline segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Straight edge.
    Line {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
    },
    /// Circular edge.
    Arc {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
        /// Arc center.
        center: Point,
        /// Sweep direction.
        direction: ArcDirection,
    },
}

impl Segment {
    /// Start point.
    pub const fn start(&self) -> Point {
        match *self {
            Self::Line { start, .. } | Self::Arc { start, .. } => start,
        }
    }

    /// End point.
    pub const fn end(&self) -> Point {
        match *self {
            Self::Line { end, .. } | Self::Arc { end, .. } => end,
        }
    }

    /// The same edge traversed backwards; arcs flip direction.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        match *self {
            Self::Line { start, end } => Self::Line {
                start: end,
                end: start,
            },
            Self::Arc {
                start,
                end,
                center,
                direction,
            } => Self::Arc {
                start: end,
                end: start,
                center,
                direction: direction.reversed(),
            },
        }
    }

    /// Rotates about the origin.
    #[must_use]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        let r = |p: Point| p.rotated(rotation, Point::default());
        match *self {
            Self::Line { start, end } => Self::Line {
                start: r(start),
                end: r(end),
            },
            Self::Arc {
                start,
                end,
                center,
                direction,
            } => Self::Arc {
                start: r(start),
                end: r(end),
                center: r(center),
                direction,
            },
        }
    }

    fn as_primitive(&self) -> DrawnPrimitive {
        match *self {
            Self::Line { start, end } => DrawnPrimitive::Line {
                start,
                end,
                aperture: None,
                polarity: crate::geometry::Polarity::Dark,
            },
            Self::Arc {
                start,
                end,
                center,
                direction,
            } => make_arc(
                start,
                end,
                center,
                direction,
                QuadrantMode::Multi,
                None,
                crate::geometry::Polarity::Dark,
                1e-9,
            ),
        }
    }

    /// Points along the segment, endpoints included.
    pub fn polyline(&self, max_segment_length: f64) -> Vec<Point> {
        match self {
            Self::Line { start, end } => vec![*start, *end],
            Self::Arc { .. } => arc_points(&self.as_primitive(), max_segment_length),
        }
    }
}

/// Connected sequence of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chain {
    /// Segments in traversal order.
    pub segments: Vec<Segment>,
}

impl Chain {
    /// True when the last end meets the first start within `eps`.
    pub fn is_closed(&self, eps: f64) -> bool {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => last.end().approx_eq(first.start(), eps),
            _ => false,
        }
    }

    /// Bounding box including arc extremes.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::default();
        for segment in &self.segments {
            extend_bounds(&mut bounds, &segment.as_primitive());
        }
        bounds
    }

    /// Flattened polygon ring, without a repeated closing point.
    pub fn polygon(&self) -> Vec<Point> {
        let mut ring: Vec<Point> = Vec::new();
        for segment in &self.segments {
            for p in segment.polyline(POLYGON_SEGMENT_LENGTH) {
                if !matches!(ring.last(), Some(last) if last.approx_eq(p, 1e-9)) {
                    ring.push(p);
                }
            }
        }
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if ring.len() > 1 && first.approx_eq(last, 1e-9) {
                ring.pop();
            }
        }
        ring
    }

    /// Textual form: bounds, size and one line per segment.
    pub fn describe(&self) -> String {
        let b = self.bounds();
        let f = |v: f64| format_decimal(v, 4);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Bounds: {},{} {},{}",
            f(b.min_x),
            f(b.min_y),
            f(b.max_x),
            f(b.max_y)
        );
        let _ = writeln!(out, "Size: {} x {}", f(b.width()), f(b.height()));
        for segment in &self.segments {
            match segment {
                Segment::Line { start, end } => {
                    let _ = writeln!(
                        out,
                        "Line: {},{} -> {},{}",
                        f(start.x),
                        f(start.y),
                        f(end.x),
                        f(end.y)
                    );
                }
                Segment::Arc {
                    start,
                    end,
                    center,
                    direction,
                } => {
                    let _ = writeln!(
                        out,
                        "Arc: {},{} -> {},{} center {},{} {}",
                        f(start.x),
                        f(start.y),
                        f(end.x),
                        f(end.y),
                        f(center.x),
                        f(center.y),
                        match direction {
                            ArcDirection::Clockwise => "cw",
                            ArcDirection::CounterClockwise => "ccw",
                        }
                    );
                }
            }
        }
        out
    }
}

/// Chains extracted from an edge-cuts layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// All chains; `chains[outer]` is the outer outline.
    pub chains: Vec<Chain>,
    /// Index of the outer chain.
    pub outer: usize,
    /// Tolerance used for endpoint matching.
    pub tolerance: f64,
    /// Diagnostics about chains that could not be connected.
    pub warnings: Vec<String>,
}

impl Outline {
    /// Extracts the outline of a parsed edge-cuts layer.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::MissingLayer`] when the layer draws no lines or
    /// arcs.
    pub fn from_gerber(file: &GerberFile, tolerance: f64) -> Result<Self, PanelError> {
        let mut segments = Vec::new();
        for primitive in file.primitives() {
            collect_segments(&primitive, &mut segments);
        }
        Self::from_segments(segments, tolerance)
            .ok_or_else(|| PanelError::MissingLayer(format!("{}: no outline", file.name)))
    }

    /// Links segments into chains; `None` when there are none.
    pub fn from_segments(segments: Vec<Segment>, tolerance: f64) -> Option<Self> {
        let chains = link(segments, tolerance);
        let outer = chains
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.bounds().area().total_cmp(&b.1.bounds().area()))
            .map(|(i, _)| i)?;
        let mut outline = Self {
            chains,
            outer,
            tolerance,
            warnings: Vec::new(),
        };
        let open = outline
            .chains
            .iter()
            .filter(|c| !c.is_closed(tolerance))
            .count();
        if open > 0 {
            let message = format!("{open} outline chain(s) could not be closed");
            warn!("{message}");
            outline.warnings.push(message);
        }
        debug!(chains = outline.chains.len(), "extracted outline");
        Some(outline)
    }

    /// The outer chain.
    pub fn outer(&self) -> &Chain {
        // `outer` always indexes `chains`; the fallback is unreachable.
        self.chains.get(self.outer).unwrap_or(&EMPTY_CHAIN)
    }

    /// Closed chains other than the outer one.
    pub fn holes(&self) -> impl Iterator<Item = &Chain> + '_ {
        self.chains
            .iter()
            .enumerate()
            .filter(move |(i, c)| *i != self.outer && c.is_closed(self.tolerance))
            .map(|(_, c)| c)
    }

    /// Bounds of the outer chain.
    pub fn bounds(&self) -> BoundingBox {
        self.outer().bounds()
    }

    /// Board size `(width, height)` in the outline's units.
    pub fn size(&self) -> (f64, f64) {
        let b = self.bounds();
        (b.width(), b.height())
    }

    /// A copy rotated about the origin.
    #[must_use]
    pub fn rotated(&self, rotation: Rotation) -> Self {
        let mut copy = self.clone();
        for chain in &mut copy.chains {
            for segment in &mut chain.segments {
                *segment = segment.rotated(rotation);
            }
        }
        copy
    }

    /// Textual form of every chain, outer first.
    pub fn describe(&self) -> String {
        let mut out = self.outer().describe();
        for hole in self.holes() {
            out.push_str(&hole.describe());
        }
        out
    }
}

static EMPTY_CHAIN: Chain = Chain {
    segments: Vec::new(),
};

fn collect_segments(primitive: &DrawnPrimitive, out: &mut Vec<Segment>) {
    match primitive {
        DrawnPrimitive::Line { start, end, .. } => {
            if !start.approx_eq(*end, 1e-12) {
                out.push(Segment::Line {
                    start: *start,
                    end: *end,
                });
            }
        }
        DrawnPrimitive::Arc {
            start,
            end,
            center,
            direction,
            ..
        } => out.push(Segment::Arc {
            start: *start,
            end: *end,
            center: *center,
            direction: *direction,
        }),
        DrawnPrimitive::Region { boundary, .. } => {
            for part in boundary {
                collect_segments(part, out);
            }
        }
        DrawnPrimitive::Flash { .. } => {}
    }
}

fn link(mut pool: Vec<Segment>, eps: f64) -> Vec<Chain> {
    let mut chains = Vec::new();
    pool.reverse();
    while let Some(first) = pool.pop() {
        let mut chain = vec![first];
        loop {
            let tail = chain.last().map_or(first.end(), Segment::end);
            let head = chain.first().map_or(first.start(), Segment::start);
            if tail.approx_eq(head, eps) && chain.len() > 1 {
                break;
            }
            if let Some(i) = pool.iter().rposition(|s| s.start().approx_eq(tail, eps)) {
                chain.push(pool.remove(i));
            } else if let Some(i) = pool.iter().rposition(|s| s.end().approx_eq(tail, eps)) {
                chain.push(pool.remove(i).reversed());
            } else if let Some(i) = pool.iter().rposition(|s| s.end().approx_eq(head, eps)) {
                chain.insert(0, pool.remove(i));
            } else if let Some(i) = pool.iter().rposition(|s| s.start().approx_eq(head, eps)) {
                chain.insert(0, pool.remove(i).reversed());
            } else {
                break;
            }
        }
        chains.push(Chain { segments: chain });
    }
    chains
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::Line {
            start: Point::new(x0, y0),
            end: Point::new(x1, y1),
        }
    }

    #[test]
    fn ut_out_001_shuffled_rectangle_links_into_one_closed_chain() {
        let segments = vec![
            line(10.0, 0.0, 10.0, 20.0),
            line(0.0, 0.0, 10.0, 0.0),
            line(0.0, 20.0, 0.0, 0.0),
            line(10.0, 20.0, 0.0, 20.0),
        ];
        let outline = Outline::from_segments(segments, 1e-3).unwrap_or_else(|| panic!("outline"));
        assert_eq!(outline.chains.len(), 1);
        assert!(outline.outer().is_closed(1e-3));
        assert_eq!(outline.size(), (10.0, 20.0));
        assert!(outline.warnings.is_empty());
    }

    #[test]
    fn ut_out_002_reversed_segments_are_flipped() {
        let segments = vec![
            line(0.0, 0.0, 10.0, 0.0),
            line(10.0, 20.0, 10.0, 0.0),
            line(10.0, 20.0, 0.0, 20.0),
            line(0.0, 0.0, 0.0, 20.0),
        ];
        let outline = Outline::from_segments(segments, 1e-3).unwrap_or_else(|| panic!("outline"));
        assert_eq!(outline.chains.len(), 1);
        let chain = outline.outer();
        for pair in chain.segments.windows(2) {
            assert!(pair[0].end().approx_eq(pair[1].start(), 1e-9));
        }
    }

    #[test]
    fn ut_out_003_largest_chain_is_outer_and_small_closed_chain_is_hole() {
        let segments = vec![
            line(0.0, 0.0, 10.0, 0.0),
            line(10.0, 0.0, 10.0, 10.0),
            line(10.0, 10.0, 0.0, 10.0),
            line(0.0, 10.0, 0.0, 0.0),
            line(4.0, 4.0, 6.0, 4.0),
            line(6.0, 4.0, 6.0, 6.0),
            line(6.0, 6.0, 4.0, 6.0),
            line(4.0, 6.0, 4.0, 4.0),
        ];
        let outline = Outline::from_segments(segments, 1e-3).unwrap_or_else(|| panic!("outline"));
        assert_eq!(outline.chains.len(), 2);
        assert_eq!(outline.holes().count(), 1);
        assert!((outline.bounds().area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn ut_out_004_arc_corners_and_description() {
        let file = match GerberFile::parse(
            "rounded.gm1",
            "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X1000000Y0D02*G01X9000000Y0D01*\
G03X10000000Y1000000I0J1000000D01*G01X10000000Y10000000D01*X0Y10000000D01*X0Y1000000D01*\
G03X1000000Y0I1000000J0D01*M02*",
        ) {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        };
        let outline = match Outline::from_gerber(&file, 1e-3) {
            Ok(o) => o,
            Err(e) => panic!("outline: {e}"),
        };
        assert!(outline.outer().is_closed(1e-3));
        let text = outline.describe();
        assert!(text.starts_with("Bounds: 0,0 10,10\nSize: 10 x 10\n"), "{text}");
        assert_eq!(text.matches("Arc:").count(), 2);
        assert_eq!(text.matches("Line:").count(), 4);
    }

    #[test]
    fn bc_out_001_gap_in_outline_is_reported() {
        let segments = vec![
            line(0.0, 0.0, 10.0, 0.0),
            line(10.0, 0.0, 10.0, 10.0),
            line(10.0, 10.0, 0.0, 10.0),
        ];
        let outline = Outline::from_segments(segments, 1e-3).unwrap_or_else(|| panic!("outline"));
        assert!(!outline.outer().is_closed(1e-3));
        assert_eq!(outline.warnings.len(), 1);
    }

    #[test]
    fn bc_out_002_empty_layer_is_missing_outline() {
        let file = match GerberFile::parse("empty.gm1", "%FSLAX46Y46*%%MOMM*%M02*") {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        };
        assert!(matches!(
            Outline::from_gerber(&file, 1e-3),
            Err(PanelError::MissingLayer(_))
        ));
    }
}
