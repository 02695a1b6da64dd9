//! RS-274X model: parsing, normalization, transformation and emission.

pub mod normalize;
pub mod parser;
pub mod primitives;
pub mod statement;
pub mod writer;

pub use primitives::DrawnPrimitive;
pub use statement::{DCode, Interpolation, Operation, QuadrantMode, Statement};

use indexmap::IndexMap;

use crate::aperture::{ApertureDefinition, ApertureMacro};
use crate::error::PanelError;
use crate::geometry::{ArcDirection, BoundingBox, Point, Polarity, Rotation};
use crate::units::{CoordinateFormat, FileSettings, Units};

/// A parsed Gerber layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GerberFile {
    /// Source file name, used in diagnostics.
    pub name: String,
    /// Coordinate settings used for decoding and re-emission.
    pub settings: FileSettings,
    /// Aperture macros by name, in definition order.
    pub macros: IndexMap<String, ApertureMacro>,
    /// Aperture definitions in definition order.
    pub apertures: Vec<ApertureDefinition>,
    /// Main statements in file order.
    pub statements: Vec<Statement>,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

impl GerberFile {
    /// Parses and normalizes RS-274X text.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Parse`] when the text is malformed.
    pub fn parse(name: &str, source: &str) -> Result<Self, PanelError> {
        let mut file = parser::parse_raw(name, source)?;
        normalize::normalize(&mut file);
        Ok(file)
    }

    /// Emits canonical RS-274X text.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InternalInvariant`] when a coordinate overflows
    /// the file format.
    pub fn to_gerber(&self) -> Result<String, PanelError> {
        writer::write(self)
    }

    /// Materialized drawing primitives.
    pub fn primitives(&self) -> Vec<DrawnPrimitive> {
        primitives::collect(self)
    }

    /// Looks up an aperture definition by D-code.
    pub fn aperture(&self, code: u32) -> Option<&ApertureDefinition> {
        self.apertures.iter().find(|def| def.code == code)
    }

    /// Bounding box of all drawn geometry, ignoring aperture extents.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::default();
        for primitive in self.primitives() {
            extend_bounds(&mut bounds, &primitive);
        }
        bounds
    }

    fn for_each_operation(&mut self, mut f: impl FnMut(&mut Operation)) {
        for statement in &mut self.statements {
            if let Statement::Operation(op) = statement {
                f(op);
            }
        }
    }

    /// Converts coordinates, apertures and macros to `target` units.
    pub fn convert_units(&mut self, target: Units) {
        let from = self.settings.units;
        if from == target {
            return;
        }
        let factor = from.factor_to(target);
        self.for_each_operation(|op| {
            for value in [&mut op.x, &mut op.y, &mut op.i, &mut op.j] {
                if let Some(v) = value.as_mut() {
                    *v *= factor;
                }
            }
        });
        for def in &mut self.apertures {
            def.aperture.convert_units(from, target);
        }
        for aperture_macro in self.macros.values_mut() {
            aperture_macro.convert_units(from, target);
        }
        self.settings.units = target;
    }

    /// Converts to inches, keeping the coordinate format.
    pub fn to_inch(&mut self) {
        self.convert_units(Units::Inch);
    }

    /// Converts to millimetres with at least a 4.6 format.
    pub fn to_metric(&mut self) {
        if self.settings.units == Units::Metric {
            return;
        }
        self.convert_units(Units::Metric);
        let format = self.settings.format;
        self.settings.format =
            CoordinateFormat::new(format.integer.max(4), format.fraction.max(6));
    }

    /// Translates every coordinate by `(dx, dy)`.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        self.for_each_operation(|op| {
            if let Some(x) = op.x.as_mut() {
                *x += dx;
            }
            if let Some(y) = op.y.as_mut() {
                *y += dy;
            }
        });
    }

    /// Rotates counter-clockwise by a quarter-turn multiple about `center`.
    pub fn rotate(&mut self, rotation: Rotation, center: Point) {
        if rotation == Rotation::R0 {
            return;
        }
        self.for_each_operation(|op| {
            if let (Some(x), Some(y)) = (op.x, op.y) {
                let p = Point::new(x, y).rotated(rotation, center);
                op.x = Some(p.x);
                op.y = Some(p.y);
            }
            if op.i.is_some() || op.j.is_some() {
                let (i, j) = rotation.apply(op.i.unwrap_or_default(), op.j.unwrap_or_default());
                op.i = Some(i);
                op.j = Some(j);
            }
        });
        for def in &mut self.apertures {
            def.aperture.rotate(rotation);
        }
        for aperture_macro in self.macros.values_mut() {
            aperture_macro.rotate(rotation.degrees());
        }
    }

    /// Inverts the image: every level polarity flips and the file starts clear.
    pub fn negate_polarity(&mut self) {
        for statement in &mut self.statements {
            if let Statement::Polarity(p) = statement {
                *p = p.flipped();
            }
        }
        self.statements.insert(0, Statement::Polarity(Polarity::Clear));
    }
}

/// Grows `bounds` to cover a primitive, including arc extremes.
pub fn extend_bounds(bounds: &mut BoundingBox, primitive: &DrawnPrimitive) {
    match primitive {
        DrawnPrimitive::Line { start, end, .. } => {
            bounds.update(start.x, start.y);
            bounds.update(end.x, end.y);
        }
        DrawnPrimitive::Arc {
            start,
            end,
            center,
            radius,
            start_angle,
            end_angle,
            direction,
            ..
        } => {
            bounds.update(start.x, start.y);
            bounds.update(end.x, end.y);
            let (lo, hi) = match direction {
                ArcDirection::CounterClockwise => (*start_angle, *end_angle),
                ArcDirection::Clockwise => (*end_angle, *start_angle),
            };
            let quarter = std::f64::consts::FRAC_PI_2;
            let mut k = (lo / quarter).ceil();
            while k * quarter <= hi {
                let angle = k * quarter;
                bounds.update(
                    radius.mul_add(angle.cos(), center.x),
                    radius.mul_add(angle.sin(), center.y),
                );
                k += 1.0;
            }
        }
        DrawnPrimitive::Region { boundary, .. } => {
            for part in boundary {
                extend_bounds(bounds, part);
            }
        }
        DrawnPrimitive::Flash { position, .. } => bounds.update(position.x, position.y),
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    const SQUARE: &str = "%FSLAX46Y46*%%MOMM*%%ADD10R,1X0.5*%D10*X0Y0D02*\
G01X10000000Y0D01*X10000000Y20000000D01*X0Y20000000D01*X0Y0D01*M02*";

    fn square() -> GerberFile {
        match GerberFile::parse("sq.gbr", SQUARE) {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        }
    }

    fn coordinates(file: &GerberFile) -> Vec<(f64, f64)> {
        file.statements
            .iter()
            .filter_map(|s| match s {
                Statement::Operation(op) => Some((op.x.unwrap_or_default(), op.y.unwrap_or_default())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn ut_gf_001_bounds_cover_drawn_lines() {
        let bounds = square().bounds();
        assert!((bounds.width() - 10.0).abs() < 1e-9);
        assert!((bounds.height() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn ut_gf_002_unit_round_trip_emits_identical_text() {
        let original = square();
        let mut converted = original.clone();
        converted.to_inch();
        assert_eq!(converted.settings.units, Units::Inch);
        converted.to_metric();
        assert_eq!(original.to_gerber().ok(), converted.to_gerber().ok());
    }

    #[test]
    fn ut_gf_003_four_quarter_turns_restore_coordinates() {
        let original = square();
        let mut rotated = original.clone();
        for _ in 0..4 {
            rotated.rotate(Rotation::R90, Point::new(3.0, 4.0));
        }
        for (a, b) in coordinates(&original).iter().zip(coordinates(&rotated)) {
            assert!((a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4);
        }
        assert_eq!(original.apertures, rotated.apertures);
    }

    #[test]
    fn ut_gf_004_rotation_swaps_rectangle_and_extent() {
        let mut file = square();
        file.rotate(Rotation::R90, Point::default());
        let bounds = file.bounds();
        assert!((bounds.width() - 20.0).abs() < 1e-9);
        assert!((bounds.min_x + 20.0).abs() < 1e-9);
        assert_eq!(file.apertures[0].to_gerber_body(), "D10R,0.5X1");
    }

    #[test]
    fn ut_gf_005_negate_polarity_starts_clear() {
        let mut file = square();
        file.negate_polarity();
        assert_eq!(file.statements[0], Statement::Polarity(Polarity::Clear));
    }

    #[test]
    fn bc_gf_001_arc_bounds_include_extremes() {
        let file = match GerberFile::parse(
            "arc.gbr",
            "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X1000000Y0D02*G03X-1000000Y0I-1000000J0D01*M02*",
        ) {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        };
        let bounds = file.bounds();
        assert!((bounds.max_y - 1.0).abs() < 1e-9);
        assert!(bounds.min_y.abs() < 1e-9);
    }
}
