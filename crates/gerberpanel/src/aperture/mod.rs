//! Typed aperture definitions and aperture macros.

pub mod expr;
pub mod macros;

pub use expr::{BinaryOp, Expr};
pub use macros::{ApertureMacro, MacroBody, MacroStatement};

use crate::error::PanelError;
use crate::geometry::Rotation;
use crate::units::{format_decimal, Units};

const MODIFIER_DIGITS: usize = 6;

/// Hole punched through a standard aperture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hole {
    /// Round hole.
    Circle {
        /// Hole diameter.
        diameter: f64,
    },
    /// Rectangular hole (legacy form).
    Rectangle {
        /// Hole width.
        width: f64,
        /// Hole height.
        height: f64,
    },
}

impl Hole {
    fn from_modifiers(values: &[f64]) -> Option<Self> {
        match values {
            [diameter] => Some(Self::Circle {
                diameter: *diameter,
            }),
            [width, height, ..] => Some(Self::Rectangle {
                width: *width,
                height: *height,
            }),
            [] => None,
        }
    }

    fn converted(self, from: Units, to: Units) -> Self {
        match self {
            Self::Circle { diameter } => Self::Circle {
                diameter: from.convert(diameter, to),
            },
            Self::Rectangle { width, height } => Self::Rectangle {
                width: from.convert(width, to),
                height: from.convert(height, to),
            },
        }
    }

    fn rotated(self, rotation: Rotation) -> Self {
        match self {
            Self::Rectangle { width, height } if rotation.swaps_axes() => Self::Rectangle {
                width: height,
                height: width,
            },
            other => other,
        }
    }

    fn push_modifiers(self, out: &mut Vec<f64>) {
        match self {
            Self::Circle { diameter } => out.push(diameter),
            Self::Rectangle { width, height } => {
                out.push(width);
                out.push(height);
            }
        }
    }
}

/// Shape of an aperture, with modifiers in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub enum Aperture {
    /// `C,<diameter>[X<hole>]`
    Circle {
        /// Outer diameter.
        diameter: f64,
        /// Optional hole.
        hole: Option<Hole>,
    },
    /// `R,<width>X<height>[X<hole>]`
    Rectangle {
        /// Width along X.
        width: f64,
        /// Height along Y.
        height: f64,
        /// Optional hole.
        hole: Option<Hole>,
    },
    /// `O,<width>X<height>[X<hole>]`
    Obround {
        /// Width along X.
        width: f64,
        /// Height along Y.
        height: f64,
        /// Optional hole.
        hole: Option<Hole>,
    },
    /// `P,<diameter>X<vertices>[X<rotation>[X<hole>]]`
    Polygon {
        /// Circumscribed diameter.
        diameter: f64,
        /// Number of vertices, 3 to 12.
        vertices: u32,
        /// Rotation in degrees.
        rotation: f64,
        /// Optional round hole.
        hole: Option<Hole>,
    },
    /// Instance of a named aperture macro.
    Macro {
        /// Macro name.
        name: String,
        /// Values bound to `$1`, `$2`, ...
        modifiers: Vec<f64>,
    },
}

impl Aperture {
    /// Builds an aperture from its template name and `X`-separated modifiers.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Macro`] when a standard template has too few
    /// modifiers or a polygon vertex count is out of range.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn parse(template: &str, modifiers: &[f64]) -> Result<Self, PanelError> {
        let need = |count: usize| {
            if modifiers.len() < count {
                Err(PanelError::Macro(format!(
                    "aperture template `{template}` needs {count} modifier(s), got {}",
                    modifiers.len()
                )))
            } else {
                Ok(())
            }
        };
        let tail = |from: usize| modifiers.get(from..).unwrap_or_default();

        match template {
            "C" => {
                need(1)?;
                Ok(Self::Circle {
                    diameter: modifiers.first().copied().unwrap_or_default(),
                    hole: Hole::from_modifiers(tail(1)),
                })
            }
            "R" | "O" => {
                need(2)?;
                let width = modifiers.first().copied().unwrap_or_default();
                let height = modifiers.get(1).copied().unwrap_or_default();
                let hole = Hole::from_modifiers(tail(2));
                Ok(if template == "R" {
                    Self::Rectangle {
                        width,
                        height,
                        hole,
                    }
                } else {
                    Self::Obround {
                        width,
                        height,
                        hole,
                    }
                })
            }
            "P" => {
                need(2)?;
                let vertices = modifiers.get(1).copied().unwrap_or_default().round();
                if !(3.0..=12.0).contains(&vertices) {
                    return Err(PanelError::Macro(format!(
                        "polygon aperture has {vertices} vertices; expected 3 to 12"
                    )));
                }
                Ok(Self::Polygon {
                    diameter: modifiers.first().copied().unwrap_or_default(),
                    vertices: vertices as u32,
                    rotation: modifiers.get(2).copied().unwrap_or_default(),
                    hole: Hole::from_modifiers(tail(3)),
                })
            }
            name => Ok(Self::Macro {
                name: name.to_string(),
                modifiers: modifiers.to_vec(),
            }),
        }
    }

    /// Template name as written after the D-code.
    pub fn template(&self) -> &str {
        match self {
            Self::Circle { .. } => "C",
            Self::Rectangle { .. } => "R",
            Self::Obround { .. } => "O",
            Self::Polygon { .. } => "P",
            Self::Macro { name, .. } => name,
        }
    }

    /// Modifier values in canonical order.
    pub fn modifiers(&self) -> Vec<f64> {
        let mut out = Vec::new();
        match self {
            Self::Circle { diameter, hole } => {
                out.push(*diameter);
                if let Some(hole) = hole {
                    hole.push_modifiers(&mut out);
                }
            }
            Self::Rectangle {
                width,
                height,
                hole,
            }
            | Self::Obround {
                width,
                height,
                hole,
            } => {
                out.push(*width);
                out.push(*height);
                if let Some(hole) = hole {
                    hole.push_modifiers(&mut out);
                }
            }
            Self::Polygon {
                diameter,
                vertices,
                rotation,
                hole,
            } => {
                out.push(*diameter);
                out.push(f64::from(*vertices));
                if rotation.abs() > f64::EPSILON || hole.is_some() {
                    out.push(*rotation);
                }
                if let Some(hole) = hole {
                    hole.push_modifiers(&mut out);
                }
            }
            Self::Macro { modifiers, .. } => out.extend_from_slice(modifiers),
        }
        out
    }

    /// Converts geometric modifiers between units. Counts, angles and macro
    /// modifiers are left alone; macro bodies are converted separately.
    pub fn convert_units(&mut self, from: Units, to: Units) {
        let conv = |v: &mut f64| *v = from.convert(*v, to);
        match self {
            Self::Circle { diameter, hole } => {
                conv(diameter);
                *hole = hole.map(|h| h.converted(from, to));
            }
            Self::Rectangle {
                width,
                height,
                hole,
            }
            | Self::Obround {
                width,
                height,
                hole,
            } => {
                conv(width);
                conv(height);
                *hole = hole.map(|h| h.converted(from, to));
            }
            Self::Polygon { diameter, hole, .. } => {
                conv(diameter);
                *hole = hole.map(|h| h.converted(from, to));
            }
            Self::Macro { .. } => {}
        }
    }

    /// Rotates the shape counter-clockwise. Macro rotation lives in the macro body.
    pub fn rotate(&mut self, rotation: Rotation) {
        match self {
            Self::Circle { hole, .. } => *hole = hole.map(|h| h.rotated(rotation)),
            Self::Rectangle {
                width,
                height,
                hole,
            }
            | Self::Obround {
                width,
                height,
                hole,
            } => {
                if rotation.swaps_axes() {
                    std::mem::swap(width, height);
                }
                *hole = hole.map(|h| h.rotated(rotation));
            }
            Self::Polygon { rotation: angle, .. } => {
                *angle = (*angle + rotation.degrees()).rem_euclid(360.0);
            }
            Self::Macro { .. } => {}
        }
    }

    /// Width of the stroke this aperture draws, if it can draw one.
    pub fn stroke_width(&self) -> Option<f64> {
        match self {
            Self::Circle { diameter, .. } | Self::Polygon { diameter, .. } => Some(*diameter),
            Self::Rectangle { width, height, .. } | Self::Obround { width, height, .. } => {
                Some(width.min(*height))
            }
            Self::Macro { .. } => None,
        }
    }
}

/// An aperture bound to its D-code.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureDefinition {
    /// D-code, 10 or higher.
    pub code: u32,
    /// Shape.
    pub aperture: Aperture,
}

impl ApertureDefinition {
    /// Body of the `%AD...*%` statement, e.g. `D10C,0.5`.
    pub fn to_gerber_body(&self) -> String {
        let modifiers = self
            .aperture
            .modifiers()
            .iter()
            .map(|v| format_decimal(*v, MODIFIER_DIGITS))
            .collect::<Vec<_>>()
            .join("X");
        if modifiers.is_empty() {
            format!("D{}{}", self.code, self.aperture.template())
        } else {
            format!("D{}{},{modifiers}", self.code, self.aperture.template())
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn aperture(template: &str, modifiers: &[f64]) -> Aperture {
        match Aperture::parse(template, modifiers) {
            Ok(a) => a,
            Err(e) => panic!("{template} should parse: {e}"),
        }
    }

    #[test]
    fn ut_apt_001_standard_templates_parse() {
        assert_eq!(
            aperture("C", &[0.5, 0.2]),
            Aperture::Circle {
                diameter: 0.5,
                hole: Some(Hole::Circle { diameter: 0.2 })
            }
        );
        assert!(matches!(
            aperture("O", &[1.0, 2.0]),
            Aperture::Obround { hole: None, .. }
        ));
        assert!(matches!(
            aperture("P", &[1.0, 6.0, 30.0]),
            Aperture::Polygon { vertices: 6, .. }
        ));
        assert!(matches!(aperture("OC8", &[0.8]), Aperture::Macro { .. }));
    }

    #[test]
    fn ut_apt_002_body_uses_canonical_order() {
        let def = ApertureDefinition {
            code: 11,
            aperture: aperture("R", &[1.5, 0.75, 0.3]),
        };
        assert_eq!(def.to_gerber_body(), "D11R,1.5X0.75X0.3");
    }

    #[test]
    fn ut_apt_003_unit_conversion_touches_only_geometry() {
        let mut polygon = aperture("P", &[25.4, 8.0, 22.5]);
        polygon.convert_units(Units::Metric, Units::Inch);
        assert_eq!(
            polygon,
            Aperture::Polygon {
                diameter: 1.0,
                vertices: 8,
                rotation: 22.5,
                hole: None
            }
        );
    }

    #[test]
    fn ut_apt_004_quarter_turn_swaps_rectangle_sides() {
        let mut rect = aperture("R", &[2.0, 1.0]);
        rect.rotate(Rotation::R90);
        assert_eq!(rect.modifiers(), vec![1.0, 2.0]);
        rect.rotate(Rotation::R180);
        assert_eq!(rect.modifiers(), vec![1.0, 2.0]);
    }

    #[test]
    fn ut_apt_005_polygon_rotation_accumulates() {
        let mut polygon = aperture("P", &[1.0, 4.0, 300.0]);
        polygon.rotate(Rotation::R90);
        assert!(matches!(polygon, Aperture::Polygon { rotation, .. } if (rotation - 30.0).abs() < 1e-9));
    }

    #[test]
    fn bc_apt_001_missing_modifiers_are_rejected() {
        assert!(Aperture::parse("R", &[1.0]).is_err());
        assert!(Aperture::parse("C", &[]).is_err());
        assert!(Aperture::parse("P", &[1.0, 2.0]).is_err());
    }
}
