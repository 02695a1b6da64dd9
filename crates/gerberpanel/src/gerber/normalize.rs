//! Folds legacy image parameters into concrete coordinates.
//!
//! After this pass a file is absolute, multi-quadrant and free of `MI`, `OF`,
//! `SF`, `AS`, `IR`, `IP` and step-repeat blocks. Every `D01` carries its
//! interpolation mode so files can be concatenated without leaking modal state.

use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::warn;

use crate::geometry::{Point, Polarity, Rotation};
use crate::units::{Notation, ZeroSuppression};

use super::statement::{DCode, Interpolation, Operation, QuadrantMode, Statement};
use super::GerberFile;

/// Affine map `p' = L·p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    tx: f64,
    ty: f64,
}

impl Affine {
    /// The identity map.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    const fn linear(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            a,
            b,
            c,
            d,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// `self ∘ other`: applies `other` first.
    #[must_use]
    pub fn then_after(self, other: Self) -> Self {
        Self {
            a: self.a.mul_add(other.a, self.b * other.c),
            b: self.a.mul_add(other.b, self.b * other.d),
            c: self.c.mul_add(other.a, self.d * other.c),
            d: self.c.mul_add(other.b, self.d * other.d),
            tx: self.a.mul_add(other.tx, self.b * other.ty) + self.tx,
            ty: self.c.mul_add(other.tx, self.d * other.ty) + self.ty,
        }
    }

    /// Maps a point.
    pub fn apply(self, x: f64, y: f64) -> (f64, f64) {
        let (lx, ly) = self.apply_linear(x, y);
        (lx + self.tx, ly + self.ty)
    }

    /// Maps a vector, ignoring translation.
    pub fn apply_linear(self, x: f64, y: f64) -> (f64, f64) {
        (self.a.mul_add(x, self.b * y), self.c.mul_add(x, self.d * y))
    }

    /// Determinant of the linear part; negative when handedness flips.
    pub fn determinant(self) -> f64 {
        self.a.mul_add(self.d, -(self.b * self.c))
    }
}

#[derive(Debug, Clone, Copy)]
struct ImageParameters {
    swapped: bool,
    mirror: (bool, bool),
    scale: (f64, f64),
    offset: (f64, f64),
    rotation: f64,
}

impl ImageParameters {
    const DEFAULT: Self = Self {
        swapped: false,
        mirror: (false, false),
        scale: (1.0, 1.0),
        offset: (0.0, 0.0),
        rotation: 0.0,
    };

    fn matrix(self) -> Affine {
        let axis = if self.swapped {
            Affine::linear(0.0, 1.0, 1.0, 0.0)
        } else {
            Affine::IDENTITY
        };
        let sign = |m: bool| if m { -1.0 } else { 1.0 };
        let mirror = Affine::linear(sign(self.mirror.0), 0.0, 0.0, sign(self.mirror.1));
        let scale = Affine::linear(self.scale.0, 0.0, 0.0, self.scale.1);
        let rotation = Rotation::from_degrees(self.rotation).unwrap_or_default();
        let (ca, sa) = rotation.apply(1.0, 0.0);
        let rotate = Affine::linear(ca, -sa, sa, ca);
        let mut m = rotate.then_after(scale.then_after(mirror.then_after(axis)));
        m.tx = self.offset.0;
        m.ty = self.offset.1;
        m
    }
}

#[derive(Debug, Clone, Copy)]
struct RepeatBlock {
    start: usize,
    x_repeat: u32,
    y_repeat: u32,
    i: f64,
    j: f64,
    matrix: Affine,
}

struct Normalizer {
    notation: Notation,
    quadrant: QuadrantMode,
    interpolation: Interpolation,
    last_code: DCode,
    pen: Point,
    image: ImageParameters,
    tolerance: f64,
}

impl Normalizer {
    fn operation(&mut self, op: Operation) -> Operation {
        if let Some(mode) = op.interpolation {
            self.interpolation = mode;
        }
        let code = op.code.unwrap_or(self.last_code);
        self.last_code = code;

        let end = match self.notation {
            Notation::Absolute => Point::new(op.x.unwrap_or(self.pen.x), op.y.unwrap_or(self.pen.y)),
            Notation::Incremental => self
                .pen
                .offset(op.x.unwrap_or_default(), op.y.unwrap_or_default()),
        };
        let start = self.pen;
        self.pen = end;

        let matrix = self.image.matrix();
        let (x, y) = matrix.apply(end.x, end.y);
        let mut result = Operation {
            interpolation: None,
            x: Some(x),
            y: Some(y),
            i: None,
            j: None,
            code: Some(code),
        };

        if code == DCode::Interpolate {
            let mode = self.interpolation;
            result.interpolation = Some(if matrix.determinant() < 0.0 {
                mode.mirrored()
            } else {
                mode
            });
            if mode != Interpolation::Linear {
                let (i, j) = self.center_offset(
                    start,
                    end,
                    op.i.unwrap_or_default(),
                    op.j.unwrap_or_default(),
                    mode,
                );
                let (i, j) = matrix.apply_linear(i, j);
                result.i = Some(i);
                result.j = Some(j);
            }
        }
        result
    }

    /// Signed center offset. Single-quadrant offsets are unsigned in the file;
    /// the sign pair is taken from the chord direction and checked against
    /// the other candidates.
    fn center_offset(
        &self,
        start: Point,
        end: Point,
        i: f64,
        j: f64,
        mode: Interpolation,
    ) -> (f64, f64) {
        if self.quadrant == QuadrantMode::Multi {
            return (i, j);
        }
        let (ai, aj) = (i.abs(), j.abs());
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let (si, sj) = if mode == Interpolation::Clockwise {
            (dy.signum(), -dx.signum())
        } else {
            (-dy.signum(), dx.signum())
        };
        let candidates = [
            (ai * si, aj * sj),
            (ai, aj),
            (-ai, aj),
            (ai, -aj),
            (-ai, -aj),
        ];
        let score = |(ci, cj): (f64, f64)| {
            let center = start.offset(ci, cj);
            let mismatch = (start.distance(center) - end.distance(center)).abs();
            let sweep = sweep_angle(start, end, center, mode);
            (mismatch, sweep <= FRAC_PI_2 + 1e-6)
        };
        for candidate in candidates {
            let (mismatch, quarter) = score(candidate);
            if mismatch <= self.tolerance && quarter {
                return candidate;
            }
        }
        let cost = |candidate: (f64, f64)| {
            let (mismatch, quarter) = score(candidate);
            if quarter {
                mismatch
            } else {
                mismatch + 1.0
            }
        };
        candidates
            .into_iter()
            .min_by(|a, b| cost(*a).total_cmp(&cost(*b)))
            .unwrap_or((ai * si, aj * sj))
    }
}

fn sweep_angle(start: Point, end: Point, center: Point, mode: Interpolation) -> f64 {
    let a0 = (start.y - center.y).atan2(start.x - center.x);
    let a1 = (end.y - center.y).atan2(end.x - center.x);
    let ccw = (a1 - a0).rem_euclid(TAU);
    if mode == Interpolation::Clockwise {
        (TAU - ccw).rem_euclid(TAU)
    } else {
        ccw
    }
}

fn shifted(statement: &Statement, dx: f64, dy: f64) -> Statement {
    match statement {
        Statement::Operation(op) => Statement::Operation(Operation {
            x: op.x.map(|x| x + dx),
            y: op.y.map(|y| y + dy),
            ..*op
        }),
        other => other.clone(),
    }
}

fn expand_repeat(out: &mut Vec<Statement>, block: RepeatBlock) {
    let body: Vec<Statement> = out.get(block.start..).map(<[_]>::to_vec).unwrap_or_default();
    for iy in 0..block.y_repeat {
        for ix in 0..block.x_repeat {
            if ix == 0 && iy == 0 {
                continue;
            }
            let (dx, dy) = block
                .matrix
                .apply_linear(f64::from(ix) * block.i, f64::from(iy) * block.j);
            out.extend(body.iter().map(|s| shifted(s, dx, dy)));
        }
    }
}

/// Normalizes `file` in place.
pub fn normalize(file: &mut GerberFile) {
    let mut state = Normalizer {
        notation: file.settings.notation,
        quadrant: QuadrantMode::Multi,
        interpolation: Interpolation::Linear,
        last_code: DCode::Interpolate,
        pen: Point::default(),
        image: ImageParameters::DEFAULT,
        tolerance: file.settings.tolerance(),
    };
    let mut negative = false;
    let mut repeat: Option<RepeatBlock> = None;

    let source = std::mem::take(&mut file.statements);
    let mut out = Vec::with_capacity(source.len() + 2);
    out.push(Statement::QuadrantMode(QuadrantMode::Multi));

    for statement in source {
        match statement {
            Statement::Notation(notation) => state.notation = notation,
            Statement::QuadrantMode(mode) => state.quadrant = mode,
            Statement::Mirror { a, b } => state.image.mirror = (a, b),
            Statement::Offset { a, b } => state.image.offset = (a, b),
            Statement::Scale { a, b } => {
                if (a - 1.0).abs() > f64::EPSILON || (b - 1.0).abs() > f64::EPSILON {
                    warn!(file = %file.name, a, b, "scale factor applied to coordinates only");
                    file.warnings
                        .push(format!("scale factor A{a} B{b} not applied to apertures"));
                }
                state.image.scale = (a, b);
            }
            Statement::AxisSelect { swapped } => state.image.swapped = swapped,
            Statement::ImageRotation(degrees) => state.image.rotation = degrees,
            Statement::ImagePolarity { negative: n } => negative = n,
            Statement::Interpolation(mode) => {
                state.interpolation = mode;
            }
            Statement::Operation(op) => out.push(Statement::Operation(state.operation(op))),
            Statement::StepRepeat {
                x_repeat,
                y_repeat,
                i,
                j,
            } => {
                if let Some(block) = repeat.take() {
                    expand_repeat(&mut out, block);
                }
                repeat = Some(RepeatBlock {
                    start: out.len(),
                    x_repeat,
                    y_repeat,
                    i,
                    j,
                    matrix: state.image.matrix(),
                });
            }
            Statement::StepRepeatEnd => {
                if let Some(block) = repeat.take() {
                    expand_repeat(&mut out, block);
                }
            }
            Statement::EndOfFile => {}
            other => out.push(other),
        }
    }
    if let Some(block) = repeat.take() {
        expand_repeat(&mut out, block);
    }

    if negative {
        for statement in &mut out {
            if let Statement::Polarity(p) = statement {
                *p = p.flipped();
            }
        }
    }

    let image = state.image;
    if let Some(rotation) = Rotation::from_degrees(image.rotation).filter(|r| *r != Rotation::R0) {
        for def in &mut file.apertures {
            def.aperture.rotate(rotation);
        }
        for aperture_macro in file.macros.values_mut() {
            aperture_macro.rotate(rotation.degrees());
        }
    }
    if image.swapped {
        for def in &mut file.apertures {
            def.aperture.rotate(Rotation::R90);
        }
    }

    file.statements = out;
    file.settings.notation = Notation::Absolute;
    file.settings.zero_suppression = ZeroSuppression::Trailing;
    if negative {
        let background = negative_background(file);
        file.statements.splice(1..1, background);
    }
}

/// Dark region over the drawn extent, followed by the clear polarity that
/// an inverted image starts in.
fn negative_background(file: &GerberFile) -> Vec<Statement> {
    let margin = file
        .apertures
        .iter()
        .filter_map(|def| def.aperture.stroke_width())
        .fold(0.0, f64::max)
        / 2.0;
    let bounds = file.bounds();
    let mut out = Vec::new();
    if !bounds.is_empty() && (bounds.width() > 0.0 || bounds.height() > 0.0 || margin > 0.0) {
        let (x0, y0) = (bounds.min_x - margin, bounds.min_y - margin);
        let (x1, y1) = (bounds.max_x + margin, bounds.max_y + margin);
        let line = |x, y| {
            Statement::Operation(Operation {
                interpolation: Some(Interpolation::Linear),
                ..Operation::line_to(x, y)
            })
        };
        out.extend([
            Statement::Polarity(Polarity::Dark),
            Statement::RegionBegin,
            Statement::Operation(Operation::move_to(x0, y0)),
            line(x1, y0),
            line(x1, y1),
            line(x0, y1),
            line(x0, y0),
            Statement::RegionEnd,
        ]);
    } else {
        warn!(file = %file.name, "negative image has no extent, background skipped");
    }
    out.push(Statement::Polarity(Polarity::Clear));
    out
}
