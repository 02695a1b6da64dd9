//! Raster substrate mask of a board outline.
//!
//! Row 0 is the top of the board. A pixel is opaque when its center lies
//! inside the outer chain and outside every hole.

use tiny_skia::{BlendMode, FillRule, Paint, PathBuilder, Pixmap, Transform};
use tracing::{debug, warn};

use crate::geometry::{BoundingBox, Point};
use crate::outline::Outline;
use crate::planner::{BoardEdge, SubstrateProbe};
use crate::units::floor2;

/// Samples per millimetre used to size the mask before rounding.
pub const BASE_PIXELS_PER_MM: f64 = 20.0;
/// Smallest mask side, pixels.
pub const MIN_SIZE: u32 = 128;
/// Largest mask side, pixels.
pub const MAX_SIZE: u32 = 2048;

const OPAQUE: u8 = 255;
const EDGE_EPS: f64 = 1e-6;

/// Alpha image of the board substrate.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineMask {
    pixmap: Pixmap,
    pixels_per_mm: f64,
    scale_x: f64,
    scale_y: f64,
    bounds: BoundingBox,
}

impl OutlineMask {
    /// Rasterizes `outline` at the default resolution.
    pub fn new(outline: &Outline) -> Option<Self> {
        let bounds = outline.bounds();
        let max_dim = bounds.width().max(bounds.height()).max(EDGE_EPS);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wanted = (max_dim * BASE_PIXELS_PER_MM).ceil().min(f64::from(MAX_SIZE)) as u32;
        let size = wanted.next_power_of_two().clamp(MIN_SIZE, MAX_SIZE);
        Self::with_size(outline, size)
    }

    /// Rasterizes `outline` so that its larger side spans `size` pixels.
    ///
    /// Returns `None` when no pixmap of that size can be allocated.
    pub fn with_size(outline: &Outline, size: u32) -> Option<Self> {
        let bounds = outline.bounds();
        let max_dim = bounds.width().max(bounds.height()).max(EDGE_EPS);
        let pixels_per_mm = f64::from(size) / max_dim;
        let width = pixel_extent(bounds.width(), pixels_per_mm);
        let height = pixel_extent(bounds.height(), pixels_per_mm);
        let Some(pixmap) = Pixmap::new(width, height) else {
            warn!(width, height, "cannot allocate outline mask");
            return None;
        };
        let mut mask = Self {
            pixmap,
            pixels_per_mm,
            scale_x: f64::from(width) / bounds.width().max(EDGE_EPS),
            scale_y: f64::from(height) / bounds.height().max(EDGE_EPS),
            bounds,
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(OPAQUE, OPAQUE, OPAQUE, OPAQUE);
        paint.anti_alias = false;
        mask.fill(&outline.outer().polygon(), &paint);

        paint.blend_mode = BlendMode::Clear;
        for hole in outline.holes() {
            mask.fill(&hole.polygon(), &paint);
        }
        debug!(width, height, pixels_per_mm, "rasterized outline mask");
        Some(mask)
    }

    fn fill(&mut self, ring: &[Point], paint: &Paint) {
        let mut pb = PathBuilder::new();
        for (i, p) in ring.iter().enumerate() {
            let (x, y) = self.to_pixel(*p);
            if i == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }
        pb.close();
        if let Some(path) = pb.finish() {
            self.pixmap
                .fill_path(&path, paint, FillRule::EvenOdd, Transform::identity(), None);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn to_pixel(&self, p: Point) -> (f32, f32) {
        let x = (p.x - self.bounds.min_x) * self.scale_x;
        let y = (self.bounds.max_y - p.y) * self.scale_y;
        (x as f32, y as f32)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Resolution.
    pub const fn pixels_per_mm(&self) -> f64 {
        self.pixels_per_mm
    }

    /// Alpha values, row-major from the top row.
    pub fn alpha(&self) -> Vec<u8> {
        self.pixmap.pixels().iter().map(|p| p.alpha()).collect()
    }

    /// True when pixel `(x, y)` is substrate; out-of-range pixels are not.
    pub fn sample(&self, x: u32, y: u32) -> bool {
        self.pixmap.pixel(x, y).is_some_and(|p| p.alpha() == OPAQUE)
    }

    /// True when every pixel of the horizontal run `[x, x + len)` on row `y` is substrate.
    pub fn line_alpha(&self, x: u32, y: u32, len: u32) -> bool {
        (x..x.saturating_add(len.max(1))).all(|col| self.sample(col, y))
    }

    /// Preview bitmap: white substrate on a transparent background, RGBA.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixmap.data().to_vec()
    }

    /// Pixel columns covering the board-local interval `[x_start, x_end]` mm.
    fn columns(&self, x_start: f64, x_end: f64) -> Option<(u32, u32)> {
        let lo = floor2(x_start) * self.scale_x + EDGE_EPS;
        let hi = floor2(x_end) * self.scale_x - EDGE_EPS;
        if lo < 0.0 || hi > f64::from(self.width()) || hi <= lo {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let first = lo.floor() as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let last = hi.ceil() as u32;
        Some((first, last.saturating_sub(first)))
    }
}

impl SubstrateProbe for OutlineMask {
    fn covers(&self, x_start: f64, x_end: f64, edge: BoardEdge) -> bool {
        let Some((first, len)) = self.columns(x_start, x_end) else {
            return false;
        };
        let row = match edge {
            BoardEdge::Top => 0,
            BoardEdge::Bottom => self.height().saturating_sub(1),
        };
        self.line_alpha(first, row, len)
    }
}

fn pixel_extent(length_mm: f64, pixels_per_mm: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let px = (length_mm * pixels_per_mm - EDGE_EPS).ceil().max(1.0) as u32;
    px
}
