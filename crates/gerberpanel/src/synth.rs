//! Synthetic rail and mouse-bite sources.
//!
//! Rails and tabs have no source files of their own; their layers are
//! written here as RS-274X and Excellon text in rail-local or tab-local
//! coordinates, with the lower-left corner at the origin. The export
//! pipeline parses them back and places them like any other source.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::error::PanelError;
use crate::excellon::{ExcellonFile, Hit, Tool};
use crate::geometry::{ArcDirection, Point};
use crate::layer::LayerKind;
use crate::params::PanelParameters;
use crate::units::{format_decimal, CoordinateFormat, FileSettings};

/// Software name written into `.GenerationSoftware`.
pub const SOFTWARE: &str = "gerberpanel";

/// Outline and silkscreen stroke width, mm.
pub const LINE_WIDTH: f64 = 0.1;
/// Handling pad diameter, mm.
const PAD_DIAMETER: f64 = 1.0;
/// Mask opening around a handling pad, mm.
const PAD_MASK_DIAMETER: f64 = 2.0;
/// Handling pad distance from the rail ends, mm.
const PAD_INSET: f64 = 2.5;
/// Vendor marker position and glyph height, mm.
const MARKER_X: f64 = 8.0;
const MARKER_HEIGHT: f64 = 1.0;
/// Order-number placeholder recognised by the vendor.
pub const VENDOR_MARKER_TEXT: &str = "JLCJLCJLCJLC";

/// Gerber text writer with a fixed 4.6 mm absolute format.
#[derive(Debug)]
pub(crate) struct GerberText {
    out: String,
    settings: FileSettings,
    next_aperture: u32,
}

impl GerberText {
    pub(crate) fn new(kind: LayerKind, description: &str) -> Self {
        let mut out = String::with_capacity(512);
        let _ = writeln!(out, "G04 {SOFTWARE} {description}*");
        let _ = writeln!(
            out,
            "%TF.GenerationSoftware,{SOFTWARE},synth,{}*%",
            env!("CARGO_PKG_VERSION")
        );
        if let Some(function) = kind.file_function() {
            let _ = writeln!(out, "%TF.FileFunction,{function}*%");
        }
        out.push_str("%TF.FilePolarity,Positive*%\n%FSTAX46Y46*%\n%MOMM*%\n%LPD*%\nG75*\n");
        Self {
            out,
            settings: FileSettings::panel(),
            next_aperture: 10,
        }
    }

    pub(crate) fn circle(&mut self, diameter: f64) -> u32 {
        let code = self.next_aperture;
        self.next_aperture += 1;
        let _ = writeln!(self.out, "%ADD{code}C,{}*%", format_decimal(diameter, 6));
        code
    }

    pub(crate) fn select(&mut self, code: u32) {
        let _ = writeln!(self.out, "D{code}*");
    }

    fn xy(&self, p: Point) -> String {
        format!(
            "X{}Y{}",
            self.settings.encode(p.x),
            self.settings.encode(p.y)
        )
    }

    pub(crate) fn move_to(&mut self, p: Point) {
        let xy = self.xy(p);
        let _ = writeln!(self.out, "{xy}D02*");
    }

    pub(crate) fn line_to(&mut self, p: Point) {
        let xy = self.xy(p);
        let _ = writeln!(self.out, "G01{xy}D01*");
    }

    pub(crate) fn arc_to(&mut self, from: Point, to: Point, center: Point, direction: ArcDirection) {
        let xy = self.xy(to);
        let code = match direction {
            ArcDirection::Clockwise => "G02",
            ArcDirection::CounterClockwise => "G03",
        };
        let _ = writeln!(
            self.out,
            "{code}{xy}I{}J{}D01*",
            self.settings.encode(center.x - from.x),
            self.settings.encode(center.y - from.y)
        );
    }

    pub(crate) fn polyline(&mut self, points: &[Point]) {
        let mut iter = points.iter();
        if let Some(first) = iter.next() {
            self.move_to(*first);
            for p in iter {
                self.line_to(*p);
            }
        }
    }

    pub(crate) fn segment(&mut self, from: Point, to: Point) {
        self.move_to(from);
        self.line_to(to);
    }

    pub(crate) fn flash(&mut self, p: Point) {
        let xy = self.xy(p);
        let _ = writeln!(self.out, "{xy}D03*");
    }

    pub(crate) fn finish(mut self) -> String {
        self.out.push_str("M02*\n");
        self.out
    }
}

/// One synthetic source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticLayer {
    /// Target layer.
    pub kind: LayerKind,
    /// File name; drill names carry `npth` for non-plated holes.
    pub name: String,
    /// File content.
    pub text: String,
}

/// A handling rail along the full panel width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rail {
    /// Rail width, the panel width, mm.
    pub width: f64,
    /// Rail height, mm.
    pub height: f64,
    /// True for the rail above the boards.
    pub top: bool,
    /// Board columns.
    pub columns: usize,
    /// Board width plus gap, mm.
    pub column_pitch: f64,
    /// Gap between columns, mm.
    pub gap: f64,
}

impl Rail {
    /// Rail name used for synthetic files.
    pub const fn name(&self) -> &'static str {
        if self.top {
            "rail-top"
        } else {
            "rail-bottom"
        }
    }

    /// Every synthetic layer of this rail.
    pub fn layers(&self, params: &PanelParameters) -> Vec<SyntheticLayer> {
        let name = self.name();
        vec![
            SyntheticLayer {
                kind: LayerKind::EdgeCuts,
                name: format!("{name}.gm1"),
                text: self.edge_cuts(),
            },
            SyntheticLayer {
                kind: LayerKind::TopSilk,
                name: format!("{name}.gto"),
                text: self.top_silk(params),
            },
            SyntheticLayer {
                kind: LayerKind::TopCopper,
                name: format!("{name}.gtl"),
                text: self.pads(LayerKind::TopCopper, PAD_DIAMETER),
            },
            SyntheticLayer {
                kind: LayerKind::TopMask,
                name: format!("{name}.gts"),
                text: self.pads(LayerKind::TopMask, PAD_MASK_DIAMETER),
            },
        ]
    }

    /// Rectangle of the rail.
    pub fn edge_cuts(&self) -> String {
        let mut g = GerberText::new(LayerKind::EdgeCuts, "rail edge cuts");
        let d = g.circle(LINE_WIDTH);
        g.select(d);
        g.polyline(&[
            Point::new(0.0, 0.0),
            Point::new(self.width, 0.0),
            Point::new(self.width, self.height),
            Point::new(0.0, self.height),
            Point::new(0.0, 0.0),
        ]);
        g.finish()
    }

    /// Rulers, optional vendor marker and optional V-cut marks.
    pub fn top_silk(&self, params: &PanelParameters) -> String {
        let mut g = GerberText::new(LayerKind::TopSilk, "rail silkscreen");
        let d = g.circle(LINE_WIDTH);
        g.select(d);

        // Metric ruler rises from the lower edge.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mm_ticks = self.width.floor().max(0.0) as u32;
        for mm in 0..=mm_ticks {
            let length = if mm % 10 == 0 {
                1.5
            } else if mm % 5 == 0 {
                1.0
            } else {
                0.5
            };
            let x = f64::from(mm);
            g.segment(Point::new(x, 0.0), Point::new(x, length));
        }

        // Imperial ruler hangs from the upper edge, in sixteenths.
        let sixteenth = crate::units::MM_PER_INCH / 16.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let inch_ticks = (self.width / sixteenth).floor().max(0.0) as u32;
        for n in 0..=inch_ticks {
            let length = match n {
                n if n % 16 == 0 => 1.5,
                n if n % 8 == 0 => 1.0,
                n if n % 4 == 0 => 0.75,
                n if n % 2 == 0 => 0.5,
                _ => 0.3,
            };
            let x = f64::from(n) * sixteenth;
            g.segment(Point::new(x, self.height), Point::new(x, self.height - length));
        }

        if params.vendor_marker() && self.top {
            let y = (self.height - MARKER_HEIGHT) / 2.0;
            for stroke in text_strokes(VENDOR_MARKER_TEXT, Point::new(MARKER_X, y), MARKER_HEIGHT) {
                g.polyline(&stroke);
            }
        }

        if params.use_vcut() {
            for c in 1..self.columns {
                #[allow(clippy::cast_precision_loss)]
                let x = (c as f64).mul_add(self.column_pitch, -self.gap / 2.0);
                g.segment(Point::new(x, 0.0), Point::new(x, self.height));
            }
        }
        g.finish()
    }

    /// One circular pad near each end of the rail.
    pub fn pads(&self, kind: LayerKind, diameter: f64) -> String {
        let mut g = GerberText::new(kind, "rail handling pads");
        let d = g.circle(diameter);
        g.select(d);
        let y = self.height / 2.0;
        g.flash(Point::new(PAD_INSET, y));
        g.flash(Point::new(self.width - PAD_INSET, y));
        g.finish()
    }
}

/// Mouse-bite tab geometry in tab-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseBite {
    /// Tab width, mm.
    pub bite: f64,
    /// Gap height, mm.
    pub gap: f64,
    /// Corner arc radius, at most half the gap, mm.
    pub arc: f64,
    /// Hole radius, mm.
    pub hole_radius: f64,
    /// Hole center pitch, mm.
    pub hole_pitch: f64,
}

impl MouseBite {
    /// Tab geometry from the panel parameters.
    pub fn new(params: &PanelParameters) -> Self {
        let gap = params.gap_mm();
        Self {
            bite: params.bite_mm(),
            gap,
            arc: params.arc_mm().min(gap / 2.0),
            hole_radius: params.hole_radius_mm(),
            hole_pitch: params.hole_pitch_mm(),
        }
    }

    /// Edge-cuts and drill sources of one tab.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InternalInvariant`] when a hole coordinate
    /// overflows the drill format.
    pub fn layers(&self) -> Result<Vec<SyntheticLayer>, PanelError> {
        Ok(vec![
            SyntheticLayer {
                kind: LayerKind::EdgeCuts,
                name: "mouse-bite.gm1".to_string(),
                text: self.edge_cuts(false),
            },
            SyntheticLayer {
                kind: LayerKind::Drill,
                name: "mouse-bite-npth.drl".to_string(),
                text: self.drill().to_excellon()?,
            },
        ])
    }

    /// Two curved slot sides: quarter arcs joined by vertical lines.
    /// `closed` adds the top and bottom edges for stand-alone previews.
    pub fn edge_cuts(&self, closed: bool) -> String {
        let (b, g, a) = (self.bite, self.gap, self.arc);
        let mut out = GerberText::new(LayerKind::EdgeCuts, "mouse bite edge cuts");
        let d = out.circle(LINE_WIDTH);
        out.select(d);

        let sides = [
            (0.0, a, ArcDirection::CounterClockwise),
            (b, b - a, ArcDirection::Clockwise),
        ];
        for (edge, inner, direction) in sides {
            let start = Point::new(edge, 0.0);
            let knee_low = Point::new(inner, a);
            let knee_high = Point::new(inner, g - a);
            let end = Point::new(edge, g);
            out.move_to(start);
            out.arc_to(start, knee_low, Point::new(edge, a), direction);
            if knee_high.y > knee_low.y {
                out.line_to(knee_high);
            }
            out.arc_to(knee_high, end, Point::new(edge, g - a), direction);
        }
        if closed {
            out.segment(Point::new(0.0, 0.0), Point::new(b, 0.0));
            out.segment(Point::new(0.0, g), Point::new(b, g));
        }
        out.finish()
    }

    /// Hole centers along one edge, centered across the neck.
    pub fn hole_positions(&self) -> Vec<f64> {
        let neck = 2.0f64.mul_add(-self.arc, self.bite);
        let usable = 2.0f64.mul_add(-self.hole_radius, neck);
        if usable < 0.0 || self.hole_pitch <= 0.0 {
            return Vec::new();
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = (usable / self.hole_pitch + 1e-9).floor() as u32 + 1;
        let span = f64::from(count - 1) * self.hole_pitch;
        let first = self.arc + (neck - span) / 2.0;
        (0..count)
            .map(|i| f64::from(i).mul_add(self.hole_pitch, first))
            .collect()
    }

    /// Non-plated holes along both board edges of the tab.
    pub fn drill(&self) -> ExcellonFile {
        let settings = FileSettings {
            format: CoordinateFormat::new(4, 6),
            ..FileSettings::panel()
        };
        let mut file = ExcellonFile::empty("mouse-bite-npth.drl", settings);
        let mut tools = IndexMap::new();
        tools.insert(
            1,
            Tool {
                diameter: 2.0 * self.hole_radius,
                plated: false,
            },
        );
        file.tools = tools;
        for y in [0.0, self.gap] {
            for x in self.hole_positions() {
                file.hits.push(Hit {
                    tool: 1,
                    position: Point::new(x, y),
                });
            }
        }
        file
    }
}

/// Stroke-font polylines for `text`, glyph cells `height` tall from `origin`.
fn text_strokes(text: &str, origin: Point, height: f64) -> Vec<Vec<Point>> {
    let advance = 0.8 * height;
    let mut strokes = Vec::new();
    for (i, ch) in text.chars().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x0 = (i as f64).mul_add(advance, origin.x);
        for glyph_stroke in glyph(ch) {
            strokes.push(
                glyph_stroke
                    .iter()
                    .map(|(x, y)| Point::new(x.mul_add(height, x0), y.mul_add(height, origin.y)))
                    .collect(),
            );
        }
    }
    strokes
}

fn glyph(ch: char) -> &'static [&'static [(f64, f64)]] {
    match ch {
        'J' => &[&[(0.6, 1.0), (0.6, 0.2), (0.45, 0.0), (0.15, 0.0), (0.0, 0.2)]],
        'L' => &[&[(0.0, 1.0), (0.0, 0.0), (0.6, 0.0)]],
        'C' => &[&[
            (0.6, 0.85),
            (0.45, 1.0),
            (0.15, 1.0),
            (0.0, 0.85),
            (0.0, 0.15),
            (0.15, 0.0),
            (0.45, 0.0),
            (0.6, 0.15),
        ]],
        _ => &[],
    }
}
