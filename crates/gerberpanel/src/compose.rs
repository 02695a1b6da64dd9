//! Merging transformed sources into one file per layer.
//!
//! Every source is converted to millimetres and placed by a [`Placement`]
//! before its apertures, macros and tools are renumbered into the output.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::aperture::{Aperture, ApertureDefinition};
use crate::error::PanelError;
use crate::excellon::{ExcellonFile, Tool};
use crate::geometry::{BoundingBox, Point, Polarity, Rotation};
use crate::gerber::{DCode, GerberFile, Interpolation, Operation, QuadrantMode, Statement};
use crate::layer::LayerKind;
use crate::synth::SOFTWARE;
use crate::units::FileSettings;

/// First D-code handed out by a composition.
pub const FIRST_APERTURE: u32 = 10;
/// First tool number handed out by a composition.
pub const FIRST_TOOL: u32 = 1;

/// Horizontal rows of the outline to cut: `(y, [(x_start, x_end), …])`.
pub type Cutouts = Vec<(f64, Vec<(f64, f64)>)>;

/// Template name plus modifiers rounded to 0.1 µm.
type ApertureKey = (String, Vec<i64>);

#[allow(clippy::cast_possible_truncation)]
fn aperture_key(aperture: &Aperture) -> ApertureKey {
    let modifiers = aperture
        .modifiers()
        .iter()
        .map(|m| (m * 1e4).round() as i64)
        .collect();
    (aperture.template().to_string(), modifiers)
}

/// Geometry operations shared by Gerber and Excellon files.
pub trait Placeable {
    /// Converts to millimetres.
    fn to_metric(&mut self);
    /// Translates by `(dx, dy)`.
    fn offset(&mut self, dx: f64, dy: f64);
    /// Rotates about `center`.
    fn rotate(&mut self, rotation: Rotation, center: Point);
}

impl Placeable for GerberFile {
    fn to_metric(&mut self) {
        Self::to_metric(self);
    }

    fn offset(&mut self, dx: f64, dy: f64) {
        Self::offset(self, dx, dy);
    }

    fn rotate(&mut self, rotation: Rotation, center: Point) {
        Self::rotate(self, rotation, center);
    }
}

impl Placeable for ExcellonFile {
    fn to_metric(&mut self) {
        Self::to_metric(self);
    }

    fn offset(&mut self, dx: f64, dy: f64) {
        Self::offset(self, dx, dy);
    }

    fn rotate(&mut self, rotation: Rotation, center: Point) {
        Self::rotate(self, rotation, center);
    }
}

/// Where and how a source lands in the panel.
///
/// Applied as: translate the source bounds to the origin, rotate about the
/// origin, then move the rotated bounds' lower-left corner to `position`.
/// Without `bounds` the source is rotated about the origin and translated by
/// `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Rotation about the origin.
    pub rotation: Rotation,
    /// Source extent to normalize to the origin, for board copies.
    pub bounds: Option<BoundingBox>,
    /// Final lower-left corner in the panel, mm.
    pub position: Point,
}

impl Placement {
    /// Pure translation.
    pub const fn at(position: Point) -> Self {
        Self {
            rotation: Rotation::R0,
            bounds: None,
            position,
        }
    }

    /// A board copy whose `bounds` are moved to `position` after `rotation`.
    pub const fn board(bounds: BoundingBox, rotation: Rotation, position: Point) -> Self {
        Self {
            rotation,
            bounds: Some(bounds),
            position,
        }
    }

    /// `(pre, post)` such that `p' = rotate(p + pre) + post`.
    fn shifts(&self) -> (Point, Point) {
        match self.bounds {
            Some(bounds) => {
                let pre = Point::new(-bounds.min_x, -bounds.min_y);
                let (ax, ay) = self.rotation.apply(0.0, 0.0);
                let (bx, by) = self.rotation.apply(bounds.width(), bounds.height());
                let rotated_min = Point::new(ax.min(bx), ay.min(by));
                (
                    pre,
                    Point::new(
                        self.position.x - rotated_min.x,
                        self.position.y - rotated_min.y,
                    ),
                )
            }
            None => (Point::default(), self.position),
        }
    }

    /// Maps one source point into the panel.
    pub fn map_point(&self, p: Point) -> Point {
        let (pre, post) = self.shifts();
        let (x, y) = self.rotation.apply(p.x + pre.x, p.y + pre.y);
        Point::new(x + post.x, y + post.y)
    }

    /// Converts `file` to millimetres and moves it into place.
    pub fn apply<T: Placeable>(&self, file: &mut T) {
        let (pre, post) = self.shifts();
        file.to_metric();
        file.offset(pre.x, pre.y);
        file.rotate(self.rotation, Point::default());
        file.offset(post.x, post.y);
    }
}

/// Accumulates placed Gerber sources for one layer.
#[derive(Debug)]
pub struct GerberComposition {
    output: GerberFile,
    apertures: HashMap<ApertureKey, u32>,
    next_aperture: u32,
    cutouts: Cutouts,
    tolerance: f64,
    sources: usize,
}

impl GerberComposition {
    /// An empty composition named `name` for layer `kind`.
    pub fn new(name: &str, kind: LayerKind, tolerance: f64) -> Self {
        let mut statements = vec![Statement::Attribute(format!(
            "TF.GenerationSoftware,{SOFTWARE},panel,{}",
            env!("CARGO_PKG_VERSION")
        ))];
        if let Some(function) = kind.file_function() {
            statements.push(Statement::Attribute(format!("TF.FileFunction,{function}")));
        }
        statements.push(Statement::Attribute("TF.FilePolarity,Positive".to_string()));
        statements.push(Statement::QuadrantMode(QuadrantMode::Multi));
        statements.push(Statement::Polarity(Polarity::Dark));
        Self {
            output: GerberFile {
                name: name.to_string(),
                settings: FileSettings::panel(),
                macros: IndexMap::new(),
                apertures: Vec::new(),
                statements,
                warnings: Vec::new(),
            },
            apertures: HashMap::new(),
            next_aperture: FIRST_APERTURE,
            cutouts: Vec::new(),
            tolerance: tolerance.max(1e-9),
            sources: 0,
        }
    }

    /// Outline rows to split when the composition finishes.
    #[must_use]
    pub fn with_cutouts(mut self, cutouts: Cutouts) -> Self {
        self.cutouts = cutouts;
        self
    }

    /// Number of merged sources.
    pub const fn sources(&self) -> usize {
        self.sources
    }

    fn code_for(&mut self, aperture: Aperture) -> u32 {
        let key = aperture_key(&aperture);
        if let Some(code) = self.apertures.get(&key) {
            return *code;
        }
        let code = self.next_aperture;
        self.next_aperture += 1;
        self.apertures.insert(key, code);
        self.output.apertures.push(ApertureDefinition { code, aperture });
        code
    }

    /// Places `source` and appends it with renumbered apertures and macros.
    /// Apertures equal to one already merged reuse its D-code.
    pub fn merge(&mut self, mut source: GerberFile, placement: &Placement) {
        placement.apply(&mut source);
        let origin = placement.map_point(Point::default());

        let mut macro_names: HashMap<String, String> = HashMap::new();
        for (name, aperture_macro) in source.macros {
            let target = match self.output.macros.get(&name) {
                None => name.clone(),
                Some(existing) if *existing == aperture_macro => {
                    macro_names.insert(name.clone(), name);
                    continue;
                }
                Some(_) => {
                    let mut n = 1u32;
                    while self.output.macros.contains_key(&format!("{name}_{n}")) {
                        n += 1;
                    }
                    format!("{name}_{n}")
                }
            };
            let mut renamed = aperture_macro;
            renamed.name.clone_from(&target);
            self.output.macros.insert(target.clone(), renamed);
            macro_names.insert(name, target);
        }

        let mut codes: HashMap<u32, u32> = HashMap::new();
        for def in source.apertures {
            let aperture = match def.aperture {
                Aperture::Macro { name, modifiers } => Aperture::Macro {
                    name: macro_names.get(&name).cloned().unwrap_or(name),
                    modifiers,
                },
                other => other,
            };
            codes.insert(def.code, self.code_for(aperture));
        }

        let mut polarity = Polarity::Dark;
        let mut seen_operation = false;
        for statement in source.statements {
            match statement {
                Statement::Attribute(ref body) if body.starts_with("TF") => {}
                Statement::QuadrantMode(_) | Statement::EndOfFile => {}
                Statement::SelectAperture(old) => match codes.get(&old) {
                    Some(new) => self.output.statements.push(Statement::SelectAperture(*new)),
                    None => {
                        let message = format!("{}: D{old} selected but never defined", source.name);
                        warn!("{message}");
                        self.output.warnings.push(message);
                    }
                },
                Statement::Polarity(p) => {
                    polarity = p;
                    self.output.statements.push(statement);
                }
                Statement::Operation(op) => {
                    if !seen_operation && op.code == Some(DCode::Interpolate) {
                        self.output
                            .statements
                            .push(Statement::Operation(Operation::move_to(origin.x, origin.y)));
                    }
                    seen_operation = true;
                    self.output.statements.push(statement);
                }
                other => self.output.statements.push(other),
            }
        }
        if polarity == Polarity::Clear {
            self.output.statements.push(Statement::Polarity(Polarity::Dark));
        }
        self.output.warnings.extend(source.warnings);
        self.sources += 1;
        debug!(output = %self.output.name, source = %source.name, "merged gerber source");
    }

    /// Applies outline splitting and returns the merged file.
    pub fn finish(mut self) -> GerberFile {
        if !self.cutouts.is_empty() {
            self.output.statements = split_outline(
                std::mem::take(&mut self.output.statements),
                &self.cutouts,
                self.tolerance,
            );
        }
        self.output
    }

    /// Finishes and emits RS-274X text.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InternalInvariant`] when a merged coordinate does
    /// not fit the 4.6 format.
    pub fn to_gerber(self) -> Result<String, PanelError> {
        self.finish().to_gerber()
    }
}

/// Splits horizontal `G01` lines wherever they cross a cutout interval.
fn split_outline(statements: Vec<Statement>, cutouts: &Cutouts, tolerance: f64) -> Vec<Statement> {
    let mut out = Vec::with_capacity(statements.len());
    let mut pen = Point::default();
    let mut in_region = false;
    for statement in statements {
        match statement {
            Statement::RegionBegin => in_region = true,
            Statement::RegionEnd => in_region = false,
            _ => {}
        }
        let Statement::Operation(op) = statement else {
            out.push(statement);
            continue;
        };
        let end = Point::new(op.x.unwrap_or(pen.x), op.y.unwrap_or(pen.y));
        let start = pen;
        pen = end;
        let horizontal = !in_region
            && op.code == Some(DCode::Interpolate)
            && op.interpolation == Some(Interpolation::Linear)
            && (start.y - end.y).abs() <= tolerance;
        let row = cutouts
            .iter()
            .find(|(y, _)| horizontal && (y - start.y).abs() <= tolerance);
        match row {
            Some((_, intervals)) => split_line(&mut out, start, end, intervals, tolerance),
            None => out.push(Statement::Operation(op)),
        }
    }
    out
}

fn split_line(out: &mut Vec<Statement>, start: Point, end: Point, intervals: &[(f64, f64)], tolerance: f64) {
    let swapped = start.x > end.x;
    let (left, right) = if swapped { (end, start) } else { (start, end) };
    let y = left.y;
    let inside: Vec<(f64, f64)> = intervals
        .iter()
        .copied()
        .filter(|(xs, xe)| xe > xs && *xs >= left.x - tolerance && *xe <= right.x + tolerance)
        .collect();
    if inside.is_empty() {
        let mut op = Operation::line_to(end.x, end.y);
        op.interpolation = Some(Interpolation::Linear);
        out.push(Statement::Operation(op));
        return;
    }

    let draw = |x: f64| {
        let mut op = Operation::line_to(x, y);
        op.interpolation = Some(Interpolation::Linear);
        Statement::Operation(op)
    };
    out.push(Statement::Operation(Operation::move_to(left.x, y)));
    let mut cursor = left.x;
    for (xs, xe) in inside {
        if xs > cursor + tolerance {
            out.push(draw(xs));
        }
        out.push(Statement::Operation(Operation::move_to(xe, y)));
        cursor = cursor.max(xe);
    }
    if right.x > cursor + tolerance {
        out.push(draw(right.x));
        cursor = right.x;
    }
    if swapped || (cursor - end.x).abs() > tolerance {
        out.push(Statement::Operation(Operation::move_to(end.x, end.y)));
    }
}

/// Accumulates placed drill sources, merging equivalent tools.
#[derive(Debug)]
pub struct ExcellonComposition {
    output: ExcellonFile,
    tools: HashMap<(i64, bool), u32>,
    next_tool: u32,
}

impl ExcellonComposition {
    /// An empty composition named `name`.
    pub fn new(name: &str) -> Self {
        Self {
            output: ExcellonFile::empty(name, FileSettings::panel()),
            tools: HashMap::new(),
            next_tool: FIRST_TOOL,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn tool_for(&mut self, tool: Tool) -> u32 {
        let key = ((tool.diameter * 1e4).round() as i64, tool.plated);
        if let Some(number) = self.tools.get(&key) {
            return *number;
        }
        let number = self.next_tool;
        self.next_tool += 1;
        self.tools.insert(key, number);
        self.output.tools.insert(number, tool);
        number
    }

    /// Places `source` and appends its hits, slots and routs.
    pub fn merge(&mut self, mut source: ExcellonFile, placement: &Placement) {
        placement.apply(&mut source);
        let mut numbers: HashMap<u32, u32> = HashMap::new();
        for (old, tool) in &source.tools {
            numbers.insert(*old, self.tool_for(*tool));
        }
        let mut missing = 0usize;
        for mut hit in source.hits {
            match numbers.get(&hit.tool) {
                Some(n) => {
                    hit.tool = *n;
                    self.output.hits.push(hit);
                }
                None => missing += 1,
            }
        }
        for mut slot in source.slots {
            match numbers.get(&slot.tool) {
                Some(n) => {
                    slot.tool = *n;
                    self.output.slots.push(slot);
                }
                None => missing += 1,
            }
        }
        for mut rout in source.routs {
            match numbers.get(&rout.tool) {
                Some(n) => {
                    rout.tool = *n;
                    self.output.routs.push(rout);
                }
                None => missing += 1,
            }
        }
        if missing > 0 {
            let message = format!("{}: {missing} feature(s) use undefined tools", source.name);
            warn!("{message}");
            self.output.warnings.push(message);
        }
        self.output.warnings.extend(source.warnings);
        debug!(output = %self.output.name, source = %source.name, "merged drill source");
    }

    /// The merged file.
    pub fn finish(self) -> ExcellonFile {
        self.output
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn gerber(name: &str, text: &str) -> GerberFile {
        match GerberFile::parse(name, text) {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        }
    }

    fn operations(file: &GerberFile) -> Vec<Operation> {
        file.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Operation(op) => Some(*op),
                _ => None,
            })
            .collect()
    }

    const SQUARE: &str = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X0Y0D02*G01X1000000Y0D01*M02*";

    #[test]
    fn ut_comp_001_apertures_are_renumbered() {
        let mut comp = GerberComposition::new("panel.gtl", LayerKind::TopCopper, 1e-3);
        comp.merge(gerber("a", SQUARE), &Placement::at(Point::default()));
        comp.merge(gerber("b", SQUARE), &Placement::at(Point::new(5.0, 0.0)));
        let file = comp.finish();
        let codes: Vec<u32> = file.apertures.iter().map(|a| a.code).collect();
        assert_eq!(codes, vec![10]);
        let selects: Vec<u32> = file
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::SelectAperture(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(selects, vec![10, 10]);
        assert!(selects.iter().all(|c| file.aperture(*c).is_some()));
        let ops = operations(&file);
        assert_eq!(ops[3].x, Some(6.0));
    }

    #[test]
    fn ut_comp_009_equal_apertures_share_a_dcode() {
        let a = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%%ADD11R,1X2*%D11*X0Y0D03*M02*";
        let b = "%FSLAX46Y46*%%MOMM*%%ADD10R,1.00001X2*%%ADD12C,0.2*%%ADD13C,0.10000001*%\
                 D10*X0Y0D03*D12*X0Y0D03*D13*X0Y0D03*M02*";
        let mut comp = GerberComposition::new("panel.gtl", LayerKind::TopCopper, 1e-3);
        comp.merge(gerber("a", a), &Placement::at(Point::default()));
        comp.merge(gerber("b", b), &Placement::at(Point::new(5.0, 0.0)));
        let file = comp.finish();
        let templates: Vec<(u32, &str)> = file
            .apertures
            .iter()
            .map(|a| (a.code, a.aperture.template()))
            .collect();
        assert_eq!(templates, vec![(10, "C"), (11, "R"), (12, "C")]);
        let selects: Vec<u32> = file
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::SelectAperture(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(selects, vec![11, 11, 12, 10]);
    }

    #[test]
    fn ut_comp_002_macro_name_collisions_get_suffixes() {
        let a = "%FSLAX46Y46*%%MOMM*%%AMPAD*1,1,$1,0,0*%%ADD10PAD,1*%D10*X0Y0D03*M02*";
        let b = "%FSLAX46Y46*%%MOMM*%%AMPAD*1,1,$1,0.5,0*%%ADD10PAD,2*%D10*X0Y0D03*M02*";
        let mut comp = GerberComposition::new("panel.gtl", LayerKind::TopCopper, 1e-3);
        comp.merge(gerber("a", a), &Placement::at(Point::default()));
        comp.merge(gerber("b", b), &Placement::at(Point::default()));
        comp.merge(gerber("c", a), &Placement::at(Point::default()));
        let file = comp.finish();
        let names: Vec<&String> = file.macros.keys().collect();
        assert_eq!(names, vec!["PAD", "PAD_1"]);
        assert!(matches!(&file.apertures[1].aperture, Aperture::Macro { name, .. } if name == "PAD_1"));
        assert_eq!(file.apertures.len(), 2);
        let last = file.statements.iter().rev().find_map(|s| match s {
            Statement::SelectAperture(c) => Some(*c),
            _ => None,
        });
        assert_eq!(last, Some(10));
    }

    #[test]
    fn ut_comp_003_outline_split_at_cutout() {
        let source = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X0Y5000000D02*G01X20000000Y5000000D01*M02*";
        let mut comp = GerberComposition::new("panel.gm1", LayerKind::EdgeCuts, 1e-3)
            .with_cutouts(vec![(5.0, vec![(8.0, 12.0)])]);
        comp.merge(gerber("rail", source), &Placement::at(Point::default()));
        let ops = operations(&comp.finish());
        let summary: Vec<(Option<DCode>, Option<f64>)> = ops.iter().map(|o| (o.code, o.x)).collect();
        assert_eq!(
            summary,
            vec![
                (Some(DCode::Move), Some(0.0)),
                (Some(DCode::Move), Some(0.0)),
                (Some(DCode::Interpolate), Some(8.0)),
                (Some(DCode::Move), Some(12.0)),
                (Some(DCode::Interpolate), Some(20.0)),
            ]
        );
    }

    #[test]
    fn ut_comp_004_right_to_left_line_is_swapped_and_pen_restored() {
        let source = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X20000000Y5000000D02*\
G01X0Y5000000D01*G01X0Y0D01*M02*";
        let mut comp = GerberComposition::new("panel.gm1", LayerKind::EdgeCuts, 1e-3)
            .with_cutouts(vec![(5.0, vec![(2.0, 4.0), (8.0, 12.0)])]);
        comp.merge(gerber("rail", source), &Placement::at(Point::default()));
        let ops = operations(&comp.finish());
        let xs: Vec<(Option<DCode>, Option<f64>)> = ops.iter().map(|o| (o.code, o.x)).collect();
        assert_eq!(
            xs,
            vec![
                (Some(DCode::Move), Some(20.0)),
                (Some(DCode::Move), Some(0.0)),
                (Some(DCode::Interpolate), Some(2.0)),
                (Some(DCode::Move), Some(4.0)),
                (Some(DCode::Interpolate), Some(8.0)),
                (Some(DCode::Move), Some(12.0)),
                (Some(DCode::Interpolate), Some(20.0)),
                (Some(DCode::Move), Some(0.0)),
                (Some(DCode::Interpolate), Some(0.0)),
            ]
        );
        assert_eq!(ops[8].y, Some(0.0));
    }

    #[test]
    fn ut_comp_005_board_placement_rotates_into_slot() {
        let bounds = BoundingBox {
            min_x: 2.0,
            min_y: 3.0,
            max_x: 12.0,
            max_y: 23.0,
        };
        let placement = Placement::board(bounds, Rotation::R90, Point::new(5.0, 6.0));
        assert!(placement.map_point(Point::new(2.0, 3.0)).approx_eq(Point::new(25.0, 6.0), 1e-12));
        assert!(placement.map_point(Point::new(12.0, 23.0)).approx_eq(Point::new(5.0, 16.0), 1e-12));
        let mut file = gerber(
            "b",
            "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X2000000Y3000000D02*G01X12000000Y23000000D01*M02*",
        );
        placement.apply(&mut file);
        let b = file.bounds();
        assert!((b.min_x - 5.0).abs() < 1e-9 && (b.min_y - 6.0).abs() < 1e-9);
        assert!((b.max_x - 25.0).abs() < 1e-9 && (b.max_y - 16.0).abs() < 1e-9);
    }

    #[test]
    fn ut_comp_006_implicit_start_and_clear_tail_are_repaired() {
        let source = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*G01X1000000Y0D01*%LPC*%X0Y0D03*M02*";
        let mut comp = GerberComposition::new("panel.gtl", LayerKind::TopCopper, 1e-3);
        comp.merge(gerber("a", source), &Placement::at(Point::new(3.0, 4.0)));
        let file = comp.finish();
        let ops = operations(&file);
        assert_eq!(ops[0], Operation::move_to(3.0, 4.0));
        assert_eq!(file.statements.last(), Some(&Statement::Polarity(Polarity::Dark)));
    }

    #[test]
    fn ut_comp_007_inch_sources_are_converted() {
        let source = "%FSLAX24Y24*%%MOIN*%%ADD10C,0.01*%D10*X10000Y0D02*G01X20000Y0D01*M02*";
        let mut comp = GerberComposition::new("panel.gtl", LayerKind::TopCopper, 1e-3);
        comp.merge(gerber("a", source), &Placement::at(Point::default()));
        let file = comp.finish();
        let ops = operations(&file);
        assert!((ops[1].x.unwrap_or_default() - 50.8).abs() < 1e-9);
        assert!(matches!(file.apertures[0].aperture, Aperture::Circle { diameter, .. } if (diameter - 0.254).abs() < 1e-9));
    }

    #[test]
    fn ut_comp_008_drill_tools_merge_by_diameter_and_plating() {
        let a = "M48\nMETRIC\nT1C0.3\nT2C0.8\n%\nT1\nX1.0Y1.0\nT2\nX2.0Y2.0\nM30\n";
        let b = "M48\nMETRIC\n; #@! TA.AperFunction,NonPlated,NPTH,ComponentDrill\nT1C0.3\n%\nT1\nX1.0Y1.0\nM30\n";
        let mut comp = ExcellonComposition::new("drill.drl");
        for (name, text, dx) in [("a.drl", a, 0.0), ("b.drl", b, 10.0), ("c.drl", a, 20.0)] {
            let file = match ExcellonFile::parse(name, text) {
                Ok(f) => f,
                Err(e) => panic!("should parse: {e}"),
            };
            comp.merge(file, &Placement::at(Point::new(dx, 0.0)));
        }
        let file = comp.finish();
        assert_eq!(file.tools.len(), 3);
        assert!(file.tools[&1].plated && !file.tools[&3].plated);
        assert_eq!(file.hits.len(), 5);
        assert_eq!(file.hits[4].tool, 2);
        assert!((file.hits[4].position.x - 22.0).abs() < 1e-9);
    }

    #[test]
    fn bc_comp_001_arcs_verticals_and_regions_are_not_split() {
        let source = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X0Y5000000D02*\
G03X10000000Y5000000I5000000J0D01*G01X10000000Y0D01*G36*X0Y5000000D02*G01X20000000Y5000000D01*\
G01X0Y0D01*G37*M02*";
        let plain = gerber("a", source);
        let mut comp = GerberComposition::new("panel.gm1", LayerKind::EdgeCuts, 1e-3)
            .with_cutouts(vec![(5.0, vec![(8.0, 12.0)])]);
        comp.merge(plain.clone(), &Placement::at(Point::default()));
        assert_eq!(operations(&comp.finish()), operations(&plain));
    }

    #[test]
    fn bc_comp_002_interval_outside_line_leaves_it_whole() {
        let source = "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X0Y5000000D02*G01X6000000Y5000000D01*M02*";
        let mut comp = GerberComposition::new("panel.gm1", LayerKind::EdgeCuts, 1e-3)
            .with_cutouts(vec![(5.0, vec![(8.0, 12.0)])]);
        comp.merge(gerber("a", source), &Placement::at(Point::default()));
        assert_eq!(operations(&comp.finish()).len(), 2);
    }
}
