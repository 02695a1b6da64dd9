//! ASCII DXF outline ingestion.
//!
//! Only the `HEADER` unit variable and the outline-relevant entities of the
//! `ENTITIES` section are read. The shapes are redrawn as an edge-cuts Gerber
//! layer with a thin round aperture.

use tracing::{debug, warn};

use crate::error::PanelError;
use crate::geometry::{ArcDirection, Point};
use crate::layer::LayerKind;
use crate::synth::{GerberText, LINE_WIDTH};
use crate::units::MM_PER_INCH;

/// An outline shape read from a DXF file, in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `LINE`
    Line {
        /// Start point.
        start: Point,
        /// End point.
        end: Point,
    },
    /// `ARC`, counter-clockwise from `start_deg` to `end_deg`.
    Arc {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
        /// Start angle, degrees.
        start_deg: f64,
        /// End angle, degrees.
        end_deg: f64,
    },
    /// `CIRCLE`
    Circle {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// `LWPOLYLINE` or `POLYLINE`; each vertex carries the bulge of the
    /// segment that leaves it.
    Polyline {
        /// Vertices and bulges.
        vertices: Vec<(Point, f64)>,
        /// Whether the last vertex connects back to the first.
        closed: bool,
    },
}

/// True when `text` looks like an ASCII DXF file.
pub fn is_dxf(text: &str) -> bool {
    let mut lines = text.lines().map(str::trim);
    matches!((lines.next(), lines.next()), (Some("0"), Some("SECTION")))
}

#[derive(Debug, Default)]
struct Entity {
    kind: String,
    groups: Vec<(i32, String)>,
}

impl Entity {
    fn value(&self, code: i32) -> Option<f64> {
        self.groups
            .iter()
            .find(|(c, _)| *c == code)
            .and_then(|(_, v)| v.parse().ok())
    }

    fn point(&self, x: i32, y: i32) -> Option<Point> {
        Some(Point::new(self.value(x)?, self.value(y)?))
    }

    fn flags(&self) -> i32 {
        self.value(70).map_or(0, |v| {
            #[allow(clippy::cast_possible_truncation)]
            let flags = v as i32;
            flags
        })
    }

    /// `LWPOLYLINE` vertices: each `10` starts a vertex, `42` sets its bulge.
    fn lw_vertices(&self) -> Vec<(Point, f64)> {
        let mut vertices: Vec<(Point, f64)> = Vec::new();
        let mut x: Option<f64> = None;
        for (code, value) in &self.groups {
            let Ok(v) = value.parse::<f64>() else {
                continue;
            };
            match *code {
                10 => x = Some(v),
                20 => {
                    if let Some(x) = x.take() {
                        vertices.push((Point::new(x, v), 0.0));
                    }
                }
                42 => {
                    if let Some(last) = vertices.last_mut() {
                        last.1 = v;
                    }
                }
                _ => {}
            }
        }
        vertices
    }
}

fn group_pairs(name: &str, text: &str) -> Result<Vec<(i32, String)>, PanelError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut pairs = Vec::with_capacity(lines.len() / 2);
    for (index, chunk) in lines.chunks(2).enumerate() {
        let [code, value] = chunk else {
            break;
        };
        let code = code.trim();
        let parsed = code.parse::<i32>().map_err(|_| {
            PanelError::parse(name, index * 2 + 1, code, "group code is not an integer")
        })?;
        pairs.push((parsed, value.trim().to_string()));
    }
    Ok(pairs)
}

/// Reads outline shapes and converts them to millimetres.
///
/// # Errors
///
/// Returns [`PanelError::Parse`] when a group code is not an integer.
pub fn parse(name: &str, text: &str) -> Result<Vec<Shape>, PanelError> {
    let pairs = group_pairs(name, text)?;
    let mut scale = 1.0;
    let mut section = String::new();
    let mut entities: Vec<Entity> = Vec::new();
    let mut iter = pairs.into_iter().peekable();

    while let Some((code, value)) = iter.next() {
        match (code, value.as_str()) {
            (0, "SECTION") => {
                if let Some((2, title)) = iter.next() {
                    section = title;
                }
            }
            (0, "ENDSEC") => section.clear(),
            (9, "$INSUNITS") if section == "HEADER" => {
                if let Some((70, units)) = iter.next() {
                    scale = match units.trim() {
                        "1" => MM_PER_INCH,
                        "5" => 10.0,
                        _ => 1.0,
                    };
                }
            }
            (0, kind) if section == "ENTITIES" => {
                let mut entity = Entity {
                    kind: kind.to_string(),
                    groups: Vec::new(),
                };
                while let Some((c, _)) = iter.peek() {
                    if *c == 0 {
                        break;
                    }
                    if let Some(group) = iter.next() {
                        entity.groups.push(group);
                    }
                }
                entities.push(entity);
            }
            _ => {}
        }
    }

    let mut shapes = Vec::new();
    let mut pending: Option<(Vec<(Point, f64)>, bool)> = None;
    for entity in &entities {
        match entity.kind.as_str() {
            "LINE" => {
                if let (Some(start), Some(end)) = (entity.point(10, 20), entity.point(11, 21)) {
                    shapes.push(Shape::Line { start, end });
                }
            }
            "ARC" => {
                if let (Some(center), Some(radius), Some(start_deg), Some(end_deg)) = (
                    entity.point(10, 20),
                    entity.value(40),
                    entity.value(50),
                    entity.value(51),
                ) {
                    shapes.push(Shape::Arc {
                        center,
                        radius,
                        start_deg,
                        end_deg,
                    });
                }
            }
            "CIRCLE" => {
                if let (Some(center), Some(radius)) = (entity.point(10, 20), entity.value(40)) {
                    shapes.push(Shape::Circle { center, radius });
                }
            }
            "LWPOLYLINE" => shapes.push(Shape::Polyline {
                vertices: entity.lw_vertices(),
                closed: entity.flags() & 1 == 1,
            }),
            "POLYLINE" => pending = Some((Vec::new(), entity.flags() & 1 == 1)),
            "VERTEX" => {
                if let (Some((vertices, _)), Some(p)) = (pending.as_mut(), entity.point(10, 20)) {
                    vertices.push((p, entity.value(42).unwrap_or(0.0)));
                }
            }
            "SEQEND" => {
                if let Some((vertices, closed)) = pending.take() {
                    shapes.push(Shape::Polyline { vertices, closed });
                }
            }
            other => {
                warn!(file = name, entity = other, "ignored DXF entity");
            }
        }
    }

    debug!(file = name, shapes = shapes.len(), scale, "parsed dxf");
    Ok(shapes.into_iter().map(|s| scaled(s, scale)).collect())
}

fn scaled(shape: Shape, k: f64) -> Shape {
    if (k - 1.0).abs() < f64::EPSILON {
        return shape;
    }
    match shape {
        Shape::Line { start, end } => Shape::Line {
            start: start.scaled(k),
            end: end.scaled(k),
        },
        Shape::Arc {
            center,
            radius,
            start_deg,
            end_deg,
        } => Shape::Arc {
            center: center.scaled(k),
            radius: radius * k,
            start_deg,
            end_deg,
        },
        Shape::Circle { center, radius } => Shape::Circle {
            center: center.scaled(k),
            radius: radius * k,
        },
        Shape::Polyline { vertices, closed } => Shape::Polyline {
            vertices: vertices.into_iter().map(|(p, b)| (p.scaled(k), b)).collect(),
            closed,
        },
    }
}

fn on_circle(center: Point, radius: f64, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Point::new(radius.mul_add(cos, center.x), radius.mul_add(sin, center.y))
}

/// Center of the arc from `a` to `b` with DXF bulge `bulge`.
pub fn bulge_center(a: Point, b: Point, bulge: f64) -> Point {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let d = dx.hypot(dy);
    let h = (d / 2.0) * (1.0 - bulge * bulge) / (2.0 * bulge);
    let mid = Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    Point::new(mid.x - h * dy / d, mid.y + h * dx / d)
}

/// Redraws `shapes` as an edge-cuts Gerber layer.
pub fn to_gerber(shapes: &[Shape]) -> String {
    let mut g = GerberText::new(LayerKind::EdgeCuts, "dxf outline");
    let d = g.circle(LINE_WIDTH);
    g.select(d);
    for shape in shapes {
        match shape {
            Shape::Line { start, end } => g.segment(*start, *end),
            Shape::Arc {
                center,
                radius,
                start_deg,
                end_deg,
            } => {
                let start = on_circle(*center, *radius, *start_deg);
                let end = on_circle(*center, *radius, *end_deg);
                g.move_to(start);
                g.arc_to(start, end, *center, ArcDirection::CounterClockwise);
            }
            Shape::Circle { center, radius } => {
                let start = on_circle(*center, *radius, 0.0);
                g.move_to(start);
                g.arc_to(start, start, *center, ArcDirection::CounterClockwise);
            }
            Shape::Polyline { vertices, closed } => {
                let Some((first, _)) = vertices.first() else {
                    continue;
                };
                g.move_to(*first);
                let closing = vertices.first().filter(|_| *closed).copied();
                let targets = vertices.iter().skip(1).map(|(p, _)| *p).chain(closing.map(|(p, _)| p));
                for ((from, bulge), to) in vertices.iter().zip(targets) {
                    if bulge.abs() < 1e-12 || from.approx_eq(to, 1e-12) {
                        g.line_to(to);
                    } else {
                        let direction = if *bulge > 0.0 {
                            ArcDirection::CounterClockwise
                        } else {
                            ArcDirection::Clockwise
                        };
                        g.arc_to(*from, to, bulge_center(*from, to, *bulge), direction);
                    }
                }
            }
        }
    }
    g.finish()
}

/// Parses DXF text and redraws it as Gerber.
///
/// # Errors
///
/// Returns [`PanelError::Parse`] for malformed group codes.
pub fn dxf_to_gerber(name: &str, text: &str) -> Result<String, PanelError> {
    Ok(to_gerber(&parse(name, text)?))
}
