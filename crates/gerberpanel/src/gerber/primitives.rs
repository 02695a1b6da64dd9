//! Materialized drawing primitives of a normalized Gerber file.

use std::f64::consts::TAU;

use crate::geometry::{ArcDirection, Point, Polarity};

use super::statement::{DCode, Interpolation, QuadrantMode, Statement};
use super::GerberFile;

/// A shape drawn by the file.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawnPrimitive {
    /// Linear `D01`.
    Line {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
        /// Drawing aperture; `None` inside regions.
        aperture: Option<u32>,
        /// Level polarity.
        polarity: Polarity,
    },
    /// Circular `D01`.
    Arc {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
        /// Arc center.
        center: Point,
        /// Radius measured from the start point.
        radius: f64,
        /// Start angle in radians.
        start_angle: f64,
        /// End angle in radians; equals `start_angle ± 2π` for full circles.
        end_angle: f64,
        /// Sweep direction.
        direction: ArcDirection,
        /// Quadrant mode in effect.
        quadrant_mode: QuadrantMode,
        /// Drawing aperture; `None` inside regions.
        aperture: Option<u32>,
        /// Level polarity.
        polarity: Polarity,
    },
    /// A filled `G36`/`G37` contour.
    Region {
        /// Boundary lines and arcs, forming a closed chain.
        boundary: Vec<DrawnPrimitive>,
        /// Level polarity.
        polarity: Polarity,
    },
    /// `D03`.
    Flash {
        /// Flashed aperture.
        aperture: u32,
        /// Flash position.
        position: Point,
        /// Rotation in degrees.
        rotation: f64,
        /// Level polarity.
        polarity: Polarity,
    },
}

impl DrawnPrimitive {
    /// Start point of a stroke, or the flash position.
    pub fn start(&self) -> Option<Point> {
        match self {
            Self::Line { start, .. } | Self::Arc { start, .. } => Some(*start),
            Self::Flash { position, .. } => Some(*position),
            Self::Region { boundary, .. } => boundary.first().and_then(Self::start),
        }
    }

    /// End point of a stroke, or the flash position.
    pub fn end(&self) -> Option<Point> {
        match self {
            Self::Line { end, .. } | Self::Arc { end, .. } => Some(*end),
            Self::Flash { position, .. } => Some(*position),
            Self::Region { boundary, .. } => boundary.last().and_then(Self::end),
        }
    }
}

/// Builds an arc primitive from endpoints and center.
#[allow(clippy::too_many_arguments)]
pub fn make_arc(
    start: Point,
    end: Point,
    center: Point,
    direction: ArcDirection,
    quadrant_mode: QuadrantMode,
    aperture: Option<u32>,
    polarity: Polarity,
    tolerance: f64,
) -> DrawnPrimitive {
    let start_angle = (start.y - center.y).atan2(start.x - center.x);
    let mut end_angle = (end.y - center.y).atan2(end.x - center.x);
    let full = start.approx_eq(end, tolerance);
    match direction {
        ArcDirection::CounterClockwise => {
            if full || end_angle <= start_angle {
                end_angle += TAU;
            }
        }
        ArcDirection::Clockwise => {
            if full || end_angle >= start_angle {
                end_angle -= TAU;
            }
        }
    }
    DrawnPrimitive::Arc {
        start,
        end,
        center,
        radius: start.distance(center),
        start_angle,
        end_angle,
        direction,
        quadrant_mode,
        aperture,
        polarity,
    }
}

/// Walks the statements of a normalized file and materializes its geometry.
pub fn collect(file: &GerberFile) -> Vec<DrawnPrimitive> {
    let tolerance = file.settings.tolerance();
    let mut out = Vec::new();
    let mut pen = Point::default();
    let mut aperture: Option<u32> = None;
    let mut polarity = Polarity::Dark;
    let mut interpolation = Interpolation::Linear;
    let mut quadrant = QuadrantMode::Multi;
    let mut region: Option<Vec<DrawnPrimitive>> = None;

    let flush_contour = |region: &mut Option<Vec<DrawnPrimitive>>, out: &mut Vec<DrawnPrimitive>, polarity| {
        if let Some(boundary) = region.as_mut() {
            if !boundary.is_empty() {
                out.push(DrawnPrimitive::Region {
                    boundary: std::mem::take(boundary),
                    polarity,
                });
            }
        }
    };

    for statement in &file.statements {
        match statement {
            Statement::SelectAperture(code) => aperture = Some(*code),
            Statement::Polarity(p) => polarity = *p,
            Statement::Interpolation(mode) => interpolation = *mode,
            Statement::QuadrantMode(mode) => quadrant = *mode,
            Statement::RegionBegin => region = Some(Vec::new()),
            Statement::RegionEnd => {
                flush_contour(&mut region, &mut out, polarity);
                region = None;
            }
            Statement::Operation(op) => {
                if let Some(mode) = op.interpolation {
                    interpolation = mode;
                }
                let end = Point::new(op.x.unwrap_or(pen.x), op.y.unwrap_or(pen.y));
                let draw_aperture = if region.is_some() { None } else { aperture };
                match op.code {
                    Some(DCode::Interpolate) | None => {
                        let primitive = match interpolation {
                            Interpolation::Linear => DrawnPrimitive::Line {
                                start: pen,
                                end,
                                aperture: draw_aperture,
                                polarity,
                            },
                            Interpolation::Clockwise | Interpolation::CounterClockwise => {
                                let center = pen.offset(
                                    op.i.unwrap_or_default(),
                                    op.j.unwrap_or_default(),
                                );
                                let direction = if interpolation == Interpolation::Clockwise {
                                    ArcDirection::Clockwise
                                } else {
                                    ArcDirection::CounterClockwise
                                };
                                make_arc(
                                    pen,
                                    end,
                                    center,
                                    direction,
                                    quadrant,
                                    draw_aperture,
                                    polarity,
                                    tolerance,
                                )
                            }
                        };
                        match region.as_mut() {
                            Some(boundary) => boundary.push(primitive),
                            None => out.push(primitive),
                        }
                    }
                    Some(DCode::Move) => {
                        if region.is_some() {
                            flush_contour(&mut region, &mut out, polarity);
                        }
                    }
                    Some(DCode::Flash) => {
                        if let (Some(code), None) = (aperture, region.as_ref()) {
                            out.push(DrawnPrimitive::Flash {
                                aperture: code,
                                position: end,
                                rotation: 0.0,
                                polarity,
                            });
                        }
                    }
                }
                pen = end;
            }
            _ => {}
        }
    }
    flush_contour(&mut region, &mut out, polarity);
    out
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn primitives(source: &str) -> Vec<DrawnPrimitive> {
        match GerberFile::parse("p.gbr", source) {
            Ok(f) => f.primitives(),
            Err(e) => panic!("should parse: {e}"),
        }
    }

    #[test]
    fn ut_prim_001_lines_and_flashes() {
        let prims = primitives(
            "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X0Y0D02*X1000000Y0D01*X2000000Y0D03*M02*",
        );
        assert_eq!(prims.len(), 2);
        assert!(matches!(prims[0], DrawnPrimitive::Line { aperture: Some(10), .. }));
        assert!(matches!(prims[1], DrawnPrimitive::Flash { aperture: 10, .. }));
    }

    #[test]
    fn ut_prim_002_arc_radius_is_consistent() {
        let prims = primitives(
            "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*G75*X1000000Y0D02*G03X0Y1000000I-1000000J0D01*M02*",
        );
        let DrawnPrimitive::Arc { start, end, center, radius, start_angle, end_angle, .. } = prims[0] else {
            panic!("expected arc, got {:?}", prims[0]);
        };
        assert!((start.distance(center) - radius).abs() < 1e-9);
        assert!((end.distance(center) - radius).abs() < 1e-9);
        assert!((end_angle - start_angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn ut_prim_003_region_contours_close() {
        let prims = primitives(
            "%FSLAX46Y46*%%MOMM*%G36*X0Y0D02*X1000000Y0D01*X1000000Y1000000D01*X0Y0D01*G37*M02*",
        );
        let DrawnPrimitive::Region { boundary, .. } = &prims[0] else {
            panic!("expected region");
        };
        assert_eq!(boundary.len(), 3);
        let first = boundary[0].start().unwrap_or_default();
        let last = boundary[2].end().unwrap_or_default();
        assert!(first.approx_eq(last, 1e-9));
    }

    #[test]
    fn bc_prim_001_full_circle_arc() {
        let prims = primitives(
            "%FSLAX46Y46*%%MOMM*%%ADD10C,0.1*%D10*X1000000Y0D02*G02X1000000Y0I-1000000J0D01*M02*",
        );
        let DrawnPrimitive::Arc { start_angle, end_angle, .. } = prims[0] else {
            panic!("expected arc");
        };
        assert!((start_angle - end_angle - TAU).abs() < 1e-9);
    }
}
