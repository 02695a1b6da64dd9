//! Panel layout planning and tab connectivity.
//!
//! Boards are laid out row-major from the bottom left, between a bottom rail
//! at `y = 0` and a top rail. Every column has one horizontal gap below each
//! board row and one above the last; gap `k` separates board row `k - 1`
//! (or the bottom rail) from board row `k` (or the top rail). Tabs slide
//! horizontally inside their gap and are grouped by their index within it.

use geo::{coord, Contains, Line, LineString};
use tracing::{debug, info};

use crate::geometry::{BoundingBox, Point, Rotation};
use crate::mask::OutlineMask;
use crate::outline::Outline;
use crate::params::PanelParameters;
use crate::units::floor2;

/// Distance from the board edge at which the exact probe samples the outline, mm.
const EXACT_PROBE_INSET: f64 = 0.05;

/// Board edge a tab attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEdge {
    /// The edge with the largest y.
    Top,
    /// The edge with the smallest y.
    Bottom,
}

/// Substrate queries against a single board, in board-local millimetres.
pub trait SubstrateProbe {
    /// True when the board has substrate along `[x_start, x_end]` at `edge`.
    fn covers(&self, x_start: f64, x_end: f64, edge: BoardEdge) -> bool;
}

/// Board outline as a vector polygon for exact substrate queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactOutline {
    polygon: geo::Polygon<f64>,
    bounds: BoundingBox,
}

impl ExactOutline {
    /// Converts the outer chain and holes of `outline` into a polygon.
    pub fn new(outline: &Outline) -> Self {
        let ring = |points: Vec<Point>| {
            LineString::from(points.into_iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
        };
        let holes = outline.holes().map(|hole| ring(hole.polygon())).collect();
        Self {
            polygon: geo::Polygon::new(ring(outline.outer().polygon()), holes),
            bounds: outline.bounds(),
        }
    }
}

impl SubstrateProbe for ExactOutline {
    fn covers(&self, x_start: f64, x_end: f64, edge: BoardEdge) -> bool {
        let y = match edge {
            BoardEdge::Top => self.bounds.max_y - EXACT_PROBE_INSET,
            BoardEdge::Bottom => self.bounds.min_y + EXACT_PROBE_INSET,
        };
        let lo = self.bounds.min_x + floor2(x_start) + 1e-6;
        let hi = self.bounds.min_x + floor2(x_end) - 1e-6;
        if hi <= lo {
            return false;
        }
        self.polygon
            .contains(&Line::new(coord! { x: lo, y: y }, coord! { x: hi, y: y }))
    }
}

/// Connectivity backend of a planner.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    /// Rasterized mask queries.
    Raster(OutlineMask),
    /// Exact segment-against-polygon queries.
    Exact(ExactOutline),
}

impl SubstrateProbe for Probe {
    fn covers(&self, x_start: f64, x_end: f64, edge: BoardEdge) -> bool {
        match self {
            Self::Raster(mask) => mask.covers(x_start, x_end, edge),
            Self::Exact(outline) => outline.covers(x_start, x_end, edge),
        }
    }
}

/// A horizontal strip between two boards, or between a board and a rail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// Gap row: `0` is above the bottom rail, `rows` is below the top rail.
    pub row: usize,
    /// Board column.
    pub column: usize,
    /// Lower-left corner, panel mm.
    pub origin: Point,
    /// Horizontal extent, mm.
    pub width: f64,
    /// Vertical extent, mm.
    pub height: f64,
}

/// A mouse-bite tab inside a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tab {
    /// Index into [`PanelLayout::gaps`].
    pub gap: usize,
    /// Tabs with the same group move together.
    pub group: usize,
    /// Normalized position of the tab's left edge along the gap.
    pub slide: f64,
    /// Whether both sides attach to substrate.
    pub connected: bool,
}

/// Computed panel geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLayout {
    /// Board columns.
    pub columns: usize,
    /// Board rows.
    pub rows: usize,
    /// Board rotation.
    pub rotation: Rotation,
    /// Board size after rotation, mm.
    pub pcb_size_mm: (f64, f64),
    /// All gaps, row-major.
    pub gaps: Vec<Gap>,
    /// All tabs, gap by gap.
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Clone, PartialEq)]
struct Drag {
    tab: usize,
    start_slides: Vec<(usize, f64)>,
    dx_pixels: f64,
}

/// Owns a layout and keeps it consistent with parameters and rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelPlanner {
    params: PanelParameters,
    outline: Option<Outline>,
    probe: Option<Probe>,
    exact: bool,
    layout: PanelLayout,
    pixels_per_mm: f64,
    drag: Option<Drag>,
    valid: bool,
}

impl PanelPlanner {
    /// Plans a 1×1 panel for `outline`; `None` disables panelization.
    pub fn new(params: PanelParameters, outline: Option<Outline>) -> Self {
        let mut planner = Self {
            params,
            outline,
            probe: None,
            exact: false,
            layout: PanelLayout {
                columns: 1,
                rows: 1,
                rotation: Rotation::R0,
                pcb_size_mm: (0.0, 0.0),
                gaps: Vec::new(),
                tabs: Vec::new(),
            },
            pixels_per_mm: 1.0,
            drag: None,
            valid: false,
        };
        planner.rebuild_probe();
        planner.replan();
        planner
    }

    /// Current parameters.
    pub const fn params(&self) -> &PanelParameters {
        &self.params
    }

    /// Replaces the parameters and re-derives the layout.
    pub fn set_params(&mut self, params: PanelParameters) {
        self.params = params;
        self.replan();
    }

    /// Sets the board grid and re-derives the layout. Zero counts become one.
    pub fn set_grid(&mut self, columns: usize, rows: usize) {
        self.layout.columns = columns.max(1);
        self.layout.rows = rows.max(1);
        self.replan();
    }

    /// Sets the board rotation and re-derives the layout.
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.layout.rotation = rotation;
        self.rebuild_probe();
        self.replan();
    }

    /// Switches between raster and exact connectivity queries.
    pub fn set_exact_connectivity(&mut self, exact: bool) {
        self.exact = exact;
        self.rebuild_probe();
        self.validate();
    }

    /// Screen scale used to convert drag deltas.
    pub fn set_pixels_per_mm(&mut self, pixels_per_mm: f64) {
        if pixels_per_mm.is_finite() && pixels_per_mm > 0.0 {
            self.pixels_per_mm = pixels_per_mm;
        }
    }

    /// The current layout.
    pub const fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    /// The unrotated board outline.
    pub const fn outline(&self) -> Option<&Outline> {
        self.outline.as_ref()
    }

    /// Substrate mask of the rotated board, when rasterized.
    pub const fn mask(&self) -> Option<&OutlineMask> {
        match &self.probe {
            Some(Probe::Raster(mask)) => Some(mask),
            _ => None,
        }
    }

    /// True when an outline is present and every tab connects.
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Number of disconnected tabs.
    pub fn disconnected(&self) -> usize {
        self.layout.tabs.iter().filter(|t| !t.connected).count()
    }

    /// Human-readable layout state.
    pub fn status(&self) -> String {
        if self.outline.is_none() {
            return "No outline".to_string();
        }
        match self.disconnected() {
            0 => "Valid".to_string(),
            n => format!("{n} tab(s) disconnected"),
        }
    }

    /// Panel width and height, mm.
    pub fn panel_size_mm(&self) -> (f64, f64) {
        let (w, h) = self.layout.pcb_size_mm;
        let gap = self.params.gap_mm();
        let cols = count(self.layout.columns);
        let rows = count(self.layout.rows);
        (
            cols.mul_add(w, (cols - 1.0) * gap),
            2.0f64.mul_add(self.params.rail_mm(), (rows + 1.0).mul_add(gap, rows * h)),
        )
    }

    /// Lower-left corners of the bottom and top rail, mm.
    pub fn rail_origins_mm(&self) -> [Point; 2] {
        let (_, h) = self.layout.pcb_size_mm;
        let rail = self.params.rail_mm();
        let gap = self.params.gap_mm();
        let rows = count(self.layout.rows);
        [
            Point::new(0.0, 0.0),
            Point::new(0.0, rail + rows * (h + gap) + gap),
        ]
    }

    /// Lower-left corners of every board, row-major from the bottom left, mm.
    pub fn board_origins_mm(&self) -> Vec<Point> {
        let (w, h) = self.layout.pcb_size_mm;
        let rail = self.params.rail_mm();
        let gap = self.params.gap_mm();
        let mut origins = Vec::with_capacity(self.layout.rows * self.layout.columns);
        for r in 0..self.layout.rows {
            for c in 0..self.layout.columns {
                origins.push(Point::new(
                    count(c) * (w + gap),
                    rail + gap + count(r) * (h + gap),
                ));
            }
        }
        origins
    }

    /// Lower-left corner of every tab, mm.
    pub fn tab_origins_mm(&self) -> Vec<Point> {
        self.layout
            .tabs
            .iter()
            .filter_map(|tab| {
                let gap = self.layout.gaps.get(tab.gap)?;
                Some(gap.origin.offset(tab.slide * gap.width, 0.0))
            })
            .collect()
    }

    /// Rail origins in centimetres.
    pub fn rails_origins(&self) -> Vec<(f64, f64)> {
        self.rail_origins_mm().iter().map(|p| to_cm(*p)).collect()
    }

    /// Board origins in centimetres.
    pub fn pcbs_origins(&self) -> Vec<(f64, f64)> {
        self.board_origins_mm().into_iter().map(to_cm).collect()
    }

    /// Tab origins in centimetres.
    pub fn mouse_bites_origins(&self) -> Vec<(f64, f64)> {
        self.tab_origins_mm().into_iter().map(to_cm).collect()
    }

    /// Horizontal outline rows cut by tabs: `(y, [(x_start, x_end), …])`, mm.
    ///
    /// Each tab cuts the edge below it and the edge above it.
    pub fn cutouts(&self) -> Vec<(f64, Vec<(f64, f64)>)> {
        let tolerance = self.params.merge_tolerance_mm().max(1e-6);
        let bite = self.params.bite_mm();
        let mut rows: Vec<(f64, Vec<(f64, f64)>)> = Vec::new();
        for (tab, origin) in self.layout.tabs.iter().zip(self.tab_origins_mm()) {
            let Some(gap) = self.layout.gaps.get(tab.gap) else {
                continue;
            };
            for y in [origin.y, origin.y + gap.height] {
                let interval = (origin.x, origin.x + bite);
                match rows.iter_mut().find(|(ry, _)| (*ry - y).abs() <= tolerance) {
                    Some((_, intervals)) => intervals.push(interval),
                    None => rows.push((y, vec![interval])),
                }
            }
        }
        for (_, intervals) in &mut rows {
            intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        rows
    }

    fn rebuild_probe(&mut self) {
        self.probe = self.outline.as_ref().and_then(|outline| {
            let rotated = outline.rotated(self.layout.rotation);
            if self.exact {
                Some(Probe::Exact(ExactOutline::new(&rotated)))
            } else {
                OutlineMask::new(&rotated).map(Probe::Raster)
            }
        });
    }

    /// Re-derives gaps and tabs from scratch and validates.
    pub fn replan(&mut self) {
        self.drag = None;
        self.layout.pcb_size_mm = self.outline.as_ref().map_or((0.0, 0.0), |outline| {
            let (w, h) = outline.size();
            if self.layout.rotation.swaps_axes() {
                (h, w)
            } else {
                (w, h)
            }
        });
        let (w, h) = self.layout.pcb_size_mm;
        let gap = self.params.gap_mm();
        let rail = self.params.rail_mm();
        let bites = self.params.bites_per_gap() as usize;

        self.layout.gaps.clear();
        self.layout.tabs.clear();
        for k in 0..=self.layout.rows {
            for c in 0..self.layout.columns {
                let index = self.layout.gaps.len();
                self.layout.gaps.push(Gap {
                    row: k,
                    column: c,
                    origin: Point::new(count(c) * (w + gap), rail + count(k) * (h + gap)),
                    width: w,
                    height: gap,
                });
                for i in 1..=bites {
                    self.layout.tabs.push(Tab {
                        gap: index,
                        group: i - 1,
                        slide: self.clamp_slide(count(i) / count(bites + 1)),
                        connected: false,
                    });
                }
            }
        }
        debug!(
            gaps = self.layout.gaps.len(),
            tabs = self.layout.tabs.len(),
            "planned panel"
        );
        self.validate();
    }

    fn clamp_slide(&self, slide: f64) -> f64 {
        let width = self.layout.pcb_size_mm.0;
        if width <= 0.0 {
            return 0.0;
        }
        let max = (1.0 - self.params.bite_mm() / width).max(0.0);
        slide.clamp(0.0, max)
    }

    fn tab_connects(&self, tab: &Tab) -> bool {
        let (Some(probe), Some(gap)) = (self.probe.as_ref(), self.layout.gaps.get(tab.gap)) else {
            return false;
        };
        let x_start = tab.slide * gap.width;
        let x_end = x_start + self.params.bite_mm();
        let below = gap.row == 0 || probe.covers(x_start, x_end, BoardEdge::Top);
        let above = gap.row == self.layout.rows || probe.covers(x_start, x_end, BoardEdge::Bottom);
        below && above
    }

    /// Recomputes every tab's connectivity; returns the layout validity.
    pub fn validate(&mut self) -> bool {
        let flags: Vec<bool> = self.layout.tabs.iter().map(|t| self.tab_connects(t)).collect();
        for (tab, connected) in self.layout.tabs.iter_mut().zip(flags) {
            tab.connected = connected;
        }
        self.valid = self.outline.is_some() && self.disconnected() == 0;
        info!(status = %self.status(), "validated layout");
        self.valid
    }

    /// Begins dragging `tab`; freezes the slides of its group.
    pub fn start_move(&mut self, tab: usize) -> bool {
        let Some(group) = self.layout.tabs.get(tab).map(|t| t.group) else {
            return false;
        };
        let start_slides = self
            .layout
            .tabs
            .iter()
            .enumerate()
            .filter(|(_, t)| t.group == group)
            .map(|(i, t)| (i, t.slide))
            .collect();
        self.drag = Some(Drag {
            tab,
            start_slides,
            dx_pixels: 0.0,
        });
        true
    }

    /// Moves the dragged group by a screen delta. Tabs only slide
    /// horizontally, so `_dy` is ignored. Returns whether `tab` connects.
    pub fn move_by(&mut self, tab: usize, dx: f64, _dy: f64) -> bool {
        let Some(mut drag) = self.drag.take() else {
            return false;
        };
        if drag.tab != tab {
            self.drag = Some(drag);
            return false;
        }
        drag.dx_pixels += dx;
        let dx_mm = drag.dx_pixels / self.pixels_per_mm;
        for (index, start) in &drag.start_slides {
            let width = self
                .layout
                .tabs
                .get(*index)
                .and_then(|t| self.layout.gaps.get(t.gap))
                .map_or(0.0, |g| g.width);
            let slide = if width > 0.0 {
                self.clamp_slide(start + dx_mm / width)
            } else {
                0.0
            };
            if let Some(t) = self.layout.tabs.get_mut(*index) {
                t.slide = slide;
            }
            let connected = self
                .layout
                .tabs
                .get(*index)
                .is_some_and(|t| self.tab_connects(t));
            if let Some(t) = self.layout.tabs.get_mut(*index) {
                t.connected = connected;
            }
        }
        self.drag = Some(drag);
        self.layout.tabs.get(tab).is_some_and(|t| t.connected)
    }

    /// Commits the drag and revalidates the whole layout.
    pub fn end_move(&mut self, tab: usize) -> bool {
        if self.drag.as_ref().is_some_and(|d| d.tab == tab) {
            self.drag = None;
        }
        self.validate()
    }

    /// Places every tab of `group` at `slide`, clamped, and revalidates.
    pub fn set_group_slide(&mut self, group: usize, slide: f64) -> bool {
        let slide = self.clamp_slide(slide);
        for tab in self.layout.tabs.iter_mut().filter(|t| t.group == group) {
            tab.slide = slide;
        }
        self.validate()
    }
}

#[allow(clippy::cast_precision_loss)]
const fn count(n: usize) -> f64 {
    n as f64
}

fn to_cm(p: Point) -> (f64, f64) {
    (p.x / 10.0, p.y / 10.0)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::outline::Segment;

    fn ring(points: &[(f64, f64)]) -> Outline {
        let segments = (0..points.len())
            .map(|i| {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % points.len()];
                Segment::Line {
                    start: Point::new(x0, y0),
                    end: Point::new(x1, y1),
                }
            })
            .collect();
        Outline::from_segments(segments, 1e-3).unwrap_or_else(|| panic!("outline"))
    }

    fn rect() -> Outline {
        ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 20.0), (0.0, 20.0)])
    }

    fn notched() -> Outline {
        ring(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 20.0),
            (6.0, 20.0),
            (6.0, 19.0),
            (4.0, 19.0),
            (4.0, 20.0),
            (0.0, 20.0),
        ])
    }

    fn params(gap: f64, bites: u32) -> PanelParameters {
        let mut p = PanelParameters::default();
        p.set_gap_mm(gap);
        p.set_rail_mm(5.0);
        p.set_arc_mm(0.75);
        p.set_bite_mm(4.0);
        p.set_bites_per_gap(bites);
        p
    }

    #[test]
    fn ut_plan_001_single_board_without_tabs() {
        let planner = PanelPlanner::new(params(1.5, 0), Some(rect()));
        assert_eq!(planner.panel_size_mm(), (10.0, 33.0));
        assert_eq!(
            planner.rail_origins_mm(),
            [Point::new(0.0, 0.0), Point::new(0.0, 28.0)]
        );
        assert_eq!(planner.board_origins_mm(), vec![Point::new(0.0, 6.5)]);
        assert!(planner.is_valid());
        assert_eq!(planner.status(), "Valid");
    }

    #[test]
    fn ut_plan_002_panel_size_formula() {
        let mut planner = PanelPlanner::new(params(2.0, 1), Some(rect()));
        planner.set_grid(3, 2);
        let (w, h) = planner.panel_size_mm();
        assert!((w - (3.0 * 10.0 + 2.0 * 2.0)).abs() < 1e-12);
        assert!((h - (2.0 * 5.0 + 3.0 * 2.0 + 2.0 * 20.0)).abs() < 1e-12);
        assert_eq!(planner.layout().gaps.len(), 9);
        assert_eq!(planner.board_origins_mm()[4], Point::new(12.0, 29.0));
    }

    #[test]
    fn ut_plan_003_tab_in_middle_of_rectangular_board_connects() {
        let mut planner = PanelPlanner::new(params(1.5, 1), Some(rect()));
        planner.set_grid(1, 2);
        let tabs = &planner.layout().tabs;
        assert_eq!(tabs.len(), 3);
        assert!(tabs.iter().all(|t| (t.slide - 0.5).abs() < 1e-12));
        assert!(planner.is_valid());
        let origins = planner.tab_origins_mm();
        assert_eq!(origins[1], Point::new(5.0, 26.5));
        assert_eq!(planner.mouse_bites_origins()[1], (0.5, 2.65));
    }

    #[test]
    fn ut_plan_004_notch_disconnects_tab() {
        let mut planner = PanelPlanner::new(params(1.5, 1), Some(notched()));
        planner.set_grid(1, 2);
        let _ = planner.set_group_slide(0, 0.45);
        assert!(!planner.is_valid());
        let tabs = &planner.layout().tabs;
        assert!(tabs[0].connected, "bottom rail tab attaches to the board bottom edge");
        assert!(!tabs[1].connected, "notch on the lower board's top edge");
        assert!(!tabs[2].connected);
        assert_eq!(planner.status(), "2 tab(s) disconnected");
    }

    #[test]
    fn ut_plan_005_exact_probe_agrees_with_mask() {
        let mut planner = PanelPlanner::new(params(1.5, 1), Some(notched()));
        planner.set_grid(1, 2);
        let _ = planner.set_group_slide(0, 0.45);
        let raster: Vec<bool> = planner.layout().tabs.iter().map(|t| t.connected).collect();
        planner.set_exact_connectivity(true);
        let exact: Vec<bool> = planner.layout().tabs.iter().map(|t| t.connected).collect();
        assert_eq!(raster, exact);
        assert!(planner.mask().is_none());
    }

    #[test]
    fn ut_plan_006_drag_moves_whole_group() {
        let mut planner = PanelPlanner::new(params(1.5, 2), Some(notched()));
        planner.set_grid(2, 2);
        planner.set_pixels_per_mm(2.0);
        assert!(planner.start_move(1));
        let _ = planner.move_by(1, 2.0, 40.0);
        let _ = planner.move_by(1, 2.0, -3.0);
        let moved: Vec<f64> = planner
            .layout()
            .tabs
            .iter()
            .filter(|t| t.group == 1)
            .map(|t| t.slide)
            .collect();
        assert_eq!(moved.len(), 6);
        for slide in moved {
            assert!((slide - (2.0f64 / 3.0 + 0.2).min(0.6)).abs() < 1e-12);
        }
        let _ = planner.end_move(1);
        assert!(planner
            .layout()
            .tabs
            .iter()
            .filter(|t| t.group == 0)
            .all(|t| (t.slide - 1.0 / 3.0).abs() < 1e-12));
    }

    #[test]
    fn ut_plan_007_cutouts_group_rows() {
        let mut planner = PanelPlanner::new(params(1.5, 1), Some(rect()));
        planner.set_grid(2, 1);
        let cutouts = planner.cutouts();
        let ys: Vec<f64> = cutouts.iter().map(|(y, _)| *y).collect();
        assert_eq!(ys, vec![5.0, 6.5, 26.5, 28.0]);
        assert_eq!(cutouts[1].1, vec![(5.0, 9.0), (16.5, 20.5)]);
    }

    #[test]
    fn ut_plan_008_rotation_swaps_board_size() {
        let mut planner = PanelPlanner::new(params(2.0, 1), Some(rect()));
        planner.set_rotation(Rotation::R90);
        assert_eq!(planner.layout().pcb_size_mm, (20.0, 10.0));
        assert!(planner.is_valid());
    }

    #[test]
    fn ut_plan_009_connectivity_holds_until_tab_reaches_notch() {
        for exact in [false, true] {
            let mut p = params(1.5, 1);
            p.set_bite_mm(2.0);
            let mut planner = PanelPlanner::new(p, Some(notched()));
            planner.set_grid(1, 2);
            planner.set_exact_connectivity(exact);
            planner.set_pixels_per_mm(10.0);
            assert!(planner.set_group_slide(0, 0.1), "exact={exact}");
            assert!(planner.start_move(1));
            for step in 1..=4 {
                assert!(planner.move_by(1, 2.0, 0.0), "exact={exact} step={step}");
                let slide = planner.layout().tabs[1].slide;
                assert!((slide - (0.1 + 0.02 * f64::from(step))).abs() < 1e-9);
            }
            assert!(!planner.move_by(1, 20.0, 0.0), "exact={exact}");
            assert!(planner.layout().tabs[0].connected);
            assert!(!planner.layout().tabs[2].connected);
            assert!(!planner.end_move(1));
        }
    }

    #[test]
    fn ut_plan_010_exact_outline_excludes_holes() {
        let mut segments = Vec::new();
        for points in [
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 20.0), (0.0, 20.0)][..],
            &[(2.0, 19.9), (5.0, 19.9), (5.0, 19.98), (2.0, 19.98)][..],
        ] {
            for i in 0..points.len() {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % points.len()];
                segments.push(Segment::Line {
                    start: Point::new(x0, y0),
                    end: Point::new(x1, y1),
                });
            }
        }
        let outline = Outline::from_segments(segments, 1e-3).unwrap_or_else(|| panic!("outline"));
        let exact = ExactOutline::new(&outline);
        assert!(!exact.covers(1.0, 4.0, BoardEdge::Top));
        assert!(exact.covers(6.0, 9.0, BoardEdge::Top));
        assert!(exact.covers(1.0, 4.0, BoardEdge::Bottom));
        assert!(!exact.covers(8.0, 12.0, BoardEdge::Bottom));
    }

    #[test]
    fn bc_plan_001_no_outline_disables_panelization() {
        let planner = PanelPlanner::new(params(2.0, 1), None);
        assert!(!planner.is_valid());
        assert_eq!(planner.status(), "No outline");
        assert!(planner.mask().is_none());
    }

    #[test]
    fn bc_plan_002_drag_is_clamped_to_gap() {
        let mut planner = PanelPlanner::new(params(1.5, 1), Some(rect()));
        assert!(planner.start_move(0));
        assert!(planner.move_by(0, -500.0, 0.0));
        assert!(planner.layout().tabs[0].slide.abs() < 1e-12);
        let _ = planner.move_by(0, 1000.0, 0.0);
        assert!((planner.layout().tabs[0].slide - 0.6).abs() < 1e-12);
        assert!(!planner.move_by(5, 1.0, 0.0));
        assert!(planner.end_move(0));
    }

    #[test]
    fn bc_plan_003_unknown_tab_cannot_start_move() {
        let mut planner = PanelPlanner::new(params(1.5, 0), Some(rect()));
        assert!(!planner.start_move(0));
        assert!(!planner.move_by(0, 1.0, 1.0));
    }
}
