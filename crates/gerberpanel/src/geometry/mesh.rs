//! Preview triangle meshes for parsed layers.
//!
//! Strokes become quads with round caps for circular apertures, arcs are
//! tessellated into short strokes, regions are ear-clipped with `earclip`, and
//! flashes expand to their aperture outline. Clear-polarity geometry is
//! reported as index ranges so the host can paint it with the background.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::aperture::{macros::code, Aperture};
use crate::excellon::{ExcellonFile, RoutMode};
use crate::gerber::{DrawnPrimitive, GerberFile};

use super::types::{saturate_u32, ArcDirection, GeometryBuilder, LayerGeometry, Point, Polarity};

const CIRCLE_SEGMENTS: u32 = 32;
const CAP_SEGMENTS: u32 = 16;
const MIN_ARC_SEGMENTS: u32 = 16;
const MIN_SEGMENT_LENGTH: f64 = 0.01;
const REGION_SEGMENT_LENGTH: f64 = 0.1;

/// Builds the preview mesh of a Gerber layer.
pub fn gerber_mesh(file: &GerberFile) -> LayerGeometry {
    let mut builder = GeometryBuilder::new();
    let mut clear_start: Option<u32> = None;
    let primitives = file.primitives();

    for primitive in &primitives {
        track_polarity(&mut builder, &mut clear_start, polarity_of(primitive));
        match primitive {
            DrawnPrimitive::Line {
                start,
                end,
                aperture,
                ..
            } => {
                if let Some(shape) = aperture.and_then(|code| file.aperture(code)) {
                    draw_linear(&mut builder, *start, *end, &shape.aperture);
                }
            }
            DrawnPrimitive::Arc { aperture, .. } => {
                if let Some(shape) = aperture.and_then(|code| file.aperture(code)) {
                    let width = shape.aperture.stroke_width().unwrap_or(0.0);
                    let points = arc_points(primitive, (width * 0.25).max(MIN_SEGMENT_LENGTH));
                    for pair in points.windows(2) {
                        if let [a, b] = *pair {
                            draw_linear(&mut builder, a, b, &shape.aperture);
                        }
                    }
                }
            }
            DrawnPrimitive::Region { boundary, .. } => {
                let mut ring: Vec<Point> = Vec::new();
                for part in boundary {
                    let points = match part {
                        DrawnPrimitive::Arc { .. } => arc_points(part, REGION_SEGMENT_LENGTH),
                        other => other.start().into_iter().chain(other.end()).collect(),
                    };
                    for p in points {
                        if !matches!(ring.last(), Some(last) if last.approx_eq(p, 1e-9)) {
                            ring.push(p);
                        }
                    }
                }
                fill_region(&mut builder, &ring);
            }
            DrawnPrimitive::Flash {
                aperture, position, ..
            } => match file.aperture(*aperture) {
                Some(shape) => flash(&mut builder, file, &shape.aperture, *position),
                None => builder.warn(format!("flash references undefined D{aperture}")),
            },
        }
    }
    track_polarity(&mut builder, &mut clear_start, Polarity::Dark);

    let mut geometry = builder.build();
    geometry.command_count = saturate_u32(primitives.len());
    geometry.warnings.extend(file.warnings.iter().cloned());
    geometry
}

/// Builds the preview mesh of a drill file: holes as discs, slots and routs as
/// round-capped strokes.
pub fn excellon_mesh(file: &ExcellonFile) -> LayerGeometry {
    let mut builder = GeometryBuilder::new();
    let mut commands = 0usize;
    for hit in &file.hits {
        let diameter = file.tools.get(&hit.tool).map_or(0.0, |t| t.diameter);
        builder.push_ngon(hit.position.x, hit.position.y, diameter / 2.0, CIRCLE_SEGMENTS, 0.0);
        commands += 1;
    }
    for slot in &file.slots {
        let diameter = file.tools.get(&slot.tool).map_or(0.0, |t| t.diameter);
        draw_round_stroke(&mut builder, slot.start, slot.end, diameter);
        commands += 1;
    }
    for rout in &file.routs {
        let diameter = file.tools.get(&rout.tool).map_or(0.0, |t| t.diameter);
        let mut pen: Option<Point> = None;
        for node in &rout.nodes {
            if let (Some(from), false) = (pen, node.mode == RoutMode::Rout) {
                match (node.mode, node.center_offset) {
                    (RoutMode::Clockwise | RoutMode::CounterClockwise, Some(offset)) => {
                        let arc = crate::gerber::primitives::make_arc(
                            from,
                            node.position,
                            from.offset(offset.x, offset.y),
                            if node.mode == RoutMode::Clockwise {
                                ArcDirection::Clockwise
                            } else {
                                ArcDirection::CounterClockwise
                            },
                            crate::gerber::QuadrantMode::Multi,
                            None,
                            Polarity::Dark,
                            file.settings.tolerance(),
                        );
                        for pair in arc_points(&arc, (diameter * 0.25).max(MIN_SEGMENT_LENGTH)).windows(2) {
                            if let [a, b] = *pair {
                                draw_round_stroke(&mut builder, a, b, diameter);
                            }
                        }
                    }
                    _ => draw_round_stroke(&mut builder, from, node.position, diameter),
                }
            }
            pen = Some(node.position);
        }
        commands += 1;
    }
    let mut geometry = builder.build();
    geometry.command_count = saturate_u32(commands);
    geometry.warnings.extend(file.warnings.iter().cloned());
    geometry
}

const fn polarity_of(primitive: &DrawnPrimitive) -> Polarity {
    match primitive {
        DrawnPrimitive::Line { polarity, .. }
        | DrawnPrimitive::Arc { polarity, .. }
        | DrawnPrimitive::Region { polarity, .. }
        | DrawnPrimitive::Flash { polarity, .. } => *polarity,
    }
}

fn track_polarity(builder: &mut GeometryBuilder, clear_start: &mut Option<u32>, polarity: Polarity) {
    match (polarity, *clear_start) {
        (Polarity::Clear, None) => *clear_start = Some(builder.index_count()),
        (Polarity::Dark, Some(start)) => {
            let end = builder.index_count();
            builder.record_clear_range(start, end);
            *clear_start = None;
        }
        _ => {}
    }
}

/// Tessellates an arc primitive into centerline points, endpoints included.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn arc_points(primitive: &DrawnPrimitive, max_segment_length: f64) -> Vec<Point> {
    let DrawnPrimitive::Arc {
        center,
        radius,
        start_angle,
        end_angle,
        ..
    } = *primitive
    else {
        return primitive.start().into_iter().chain(primitive.end()).collect();
    };
    let sweep = end_angle - start_angle;
    let raw = (sweep.abs() * radius / max_segment_length).ceil();
    let segments = if raw.is_finite() && raw > 0.0 {
        (raw.min(f64::from(u16::MAX)) as u32).max(MIN_ARC_SEGMENTS)
    } else {
        MIN_ARC_SEGMENTS
    };
    (0..=segments)
        .map(|step| {
            let angle = sweep.mul_add(f64::from(step) / f64::from(segments), start_angle);
            Point::new(
                radius.mul_add(angle.cos(), center.x),
                radius.mul_add(angle.sin(), center.y),
            )
        })
        .collect()
}

fn draw_linear(builder: &mut GeometryBuilder, from: Point, to: Point, aperture: &Aperture) {
    let Some(width) = aperture.stroke_width().filter(|w| *w > f64::EPSILON) else {
        builder.warn(format!("no stroke width for {} aperture", aperture.template()));
        return;
    };
    if matches!(aperture, Aperture::Circle { .. }) {
        draw_round_stroke(builder, from, to, width);
    } else if from.distance(to) > f64::EPSILON {
        push_body(builder, from, to, width / 2.0);
    }
}

fn draw_round_stroke(builder: &mut GeometryBuilder, from: Point, to: Point, width: f64) {
    let half = width / 2.0;
    if half <= f64::EPSILON {
        return;
    }
    if from.distance(to) <= f64::EPSILON {
        builder.push_ngon(from.x, from.y, half, CIRCLE_SEGMENTS, 0.0);
        return;
    }
    let direction = (to.y - from.y).atan2(to.x - from.x);
    push_body(builder, from, to, half);
    push_semi_circle(builder, from, half, direction + FRAC_PI_2, direction + PI + FRAC_PI_2);
    push_semi_circle(builder, to, half, direction - FRAC_PI_2, direction + FRAC_PI_2);
}

fn push_body(builder: &mut GeometryBuilder, from: Point, to: Point, half: f64) {
    let length = from.distance(to);
    let (nx, ny) = (-(to.y - from.y) / length, (to.x - from.x) / length);
    let a = builder.push_vertex(nx.mul_add(half, from.x), ny.mul_add(half, from.y));
    let b = builder.push_vertex((-nx).mul_add(half, from.x), (-ny).mul_add(half, from.y));
    let c = builder.push_vertex((-nx).mul_add(half, to.x), (-ny).mul_add(half, to.y));
    let d = builder.push_vertex(nx.mul_add(half, to.x), ny.mul_add(half, to.y));
    builder.push_quad(a, b, c, d);
}

fn push_semi_circle(builder: &mut GeometryBuilder, center: Point, radius: f64, start: f64, end: f64) {
    let hub = builder.push_vertex(center.x, center.y);
    let step = (end - start) / f64::from(CAP_SEGMENTS);
    let mut previous: Option<u32> = None;
    for idx in 0..=CAP_SEGMENTS {
        let angle = step.mul_add(f64::from(idx), start);
        let current = builder.push_vertex(
            radius.mul_add(angle.cos(), center.x),
            radius.mul_add(angle.sin(), center.y),
        );
        if let Some(prev) = previous {
            builder.push_triangle(hub, prev, current);
        }
        previous = Some(current);
    }
}

fn push_rectangle(builder: &mut GeometryBuilder, center: Point, width: f64, height: f64) {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let a = builder.push_vertex(center.x - hw, center.y - hh);
    let b = builder.push_vertex(center.x + hw, center.y - hh);
    let c = builder.push_vertex(center.x + hw, center.y + hh);
    let d = builder.push_vertex(center.x - hw, center.y + hh);
    builder.push_quad(a, b, c, d);
}

fn flash(builder: &mut GeometryBuilder, file: &GerberFile, aperture: &Aperture, at: Point) {
    match aperture {
        Aperture::Circle { diameter, .. } => {
            builder.push_ngon(at.x, at.y, diameter / 2.0, CIRCLE_SEGMENTS, 0.0);
        }
        Aperture::Rectangle { width, height, .. } => push_rectangle(builder, at, *width, *height),
        Aperture::Obround { width, height, .. } => flash_obround(builder, at, *width, *height),
        Aperture::Polygon {
            diameter,
            vertices,
            rotation,
            ..
        } => {
            builder.push_ngon(at.x, at.y, diameter / 2.0, *vertices, *rotation);
        }
        Aperture::Macro { name, modifiers } => match file.macros.get(name) {
            Some(program) => {
                for (primitive, values) in program.evaluate(modifiers) {
                    flash_macro_primitive(builder, at, primitive, &values);
                }
            }
            None => builder.warn(format!("flash of undefined macro `{name}`")),
        },
    }
}

fn flash_obround(builder: &mut GeometryBuilder, at: Point, width: f64, height: f64) {
    if (width - height).abs() <= f64::EPSILON {
        builder.push_ngon(at.x, at.y, width / 2.0, CIRCLE_SEGMENTS, 0.0);
    } else if width > height {
        let (radius, half_body) = (height / 2.0, (width - height) / 2.0);
        push_rectangle(builder, at, width - height, height);
        push_semi_circle(builder, at.offset(-half_body, 0.0), radius, FRAC_PI_2, 3.0 * FRAC_PI_2);
        push_semi_circle(builder, at.offset(half_body, 0.0), radius, -FRAC_PI_2, FRAC_PI_2);
    } else {
        let (radius, half_body) = (width / 2.0, (height - width) / 2.0);
        push_rectangle(builder, at, width, height - width);
        push_semi_circle(builder, at.offset(0.0, half_body), radius, 0.0, PI);
        push_semi_circle(builder, at.offset(0.0, -half_body), radius, PI, TAU);
    }
}

fn rotate_about_origin(p: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Point::new(p.x.mul_add(cos, -(p.y * sin)), p.x.mul_add(sin, p.y * cos))
}

fn flash_macro_primitive(builder: &mut GeometryBuilder, at: Point, primitive: u32, values: &[f64]) {
    let get = |i: usize| values.get(i).copied().unwrap_or(0.0);
    let exposure_off = get(0).abs() < 0.5;
    let start = builder.index_count();
    let place = |p: Point, rotation: f64| {
        let r = rotate_about_origin(p, rotation);
        Point::new(at.x + r.x, at.y + r.y)
    };
    match primitive {
        code::COMMENT => return,
        code::CIRCLE => {
            let center = place(Point::new(get(2), get(3)), get(4));
            builder.push_ngon(center.x, center.y, get(1) / 2.0, CIRCLE_SEGMENTS, 0.0);
        }
        code::VECTOR_LINE | code::VECTOR_LINE_LEGACY => {
            let rotation = get(6);
            let (s, e) = (place(Point::new(get(2), get(3)), rotation), place(Point::new(get(4), get(5)), rotation));
            if s.distance(e) > f64::EPSILON {
                push_body(builder, s, e, get(1) / 2.0);
            }
        }
        code::CENTER_LINE | code::LOWER_LEFT_LINE => {
            let (w, h, rotation) = (get(1), get(2), get(5));
            let center = if primitive == code::CENTER_LINE {
                Point::new(get(3), get(4))
            } else {
                Point::new(get(3) + w / 2.0, get(4) + h / 2.0)
            };
            let corners = [(-w, -h), (w, -h), (w, h), (-w, h)]
                .map(|(dx, dy)| place(center.offset(dx / 2.0, dy / 2.0), rotation));
            let ids = corners.map(|p| builder.push_vertex(p.x, p.y));
            builder.push_quad(ids[0], ids[1], ids[2], ids[3]);
        }
        code::OUTLINE => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = get(1).max(0.0) as usize;
            let rotation = get(4 + 2 * count);
            let ring: Vec<Point> = (0..=count)
                .map(|k| place(Point::new(get(2 + 2 * k), get(3 + 2 * k)), rotation))
                .collect();
            fill_region(builder, &ring);
        }
        code::POLYGON => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let vertices = get(1).max(3.0) as u32;
            let center = place(Point::new(get(2), get(3)), get(5));
            builder.push_ngon(center.x, center.y, get(4) / 2.0, vertices, get(5));
        }
        other => {
            builder.warn(format!("macro primitive {other} not previewed"));
            return;
        }
    }
    if exposure_off {
        let end = builder.index_count();
        builder.record_clear_range(start, end);
    }
}

fn fill_region(builder: &mut GeometryBuilder, ring: &[Point]) {
    let mut points = ring.to_vec();
    if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
        if first.approx_eq(last, 1e-9) {
            points.pop();
        }
    }
    if points.len() < 3 {
        builder.warn(format!("region with {} point(s) skipped", points.len()));
        return;
    }
    let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    let triangles = earclip::earcut::earcut(&flat, &[], 2);
    if triangles.is_empty() {
        builder.warn("region produced no triangles".to_string());
        return;
    }
    let ids: Vec<u32> = points.iter().map(|p| builder.push_vertex(p.x, p.y)).collect();
    for tri in triangles.chunks_exact(3) {
        if let [a, b, c] = *tri {
            if let (Some(&a), Some(&b), Some(&c)) = (ids.get(a), ids.get(b), ids.get(c)) {
                builder.push_triangle(a, b, c);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn mesh(source: &str) -> LayerGeometry {
        match GerberFile::parse("m.gbr", source) {
            Ok(f) => gerber_mesh(&f),
            Err(e) => panic!("should parse: {e}"),
        }
    }

    #[test]
    fn ut_mesh_001_rectangle_stroke_is_a_quad() {
        let geom = mesh("%FSLAX46Y46*%%MOMM*%%ADD10R,2X2*%D10*X0Y0D02*X10000000Y0D01*M02*");
        assert_eq!(geom.vertex_count, 4);
        assert_eq!(geom.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!((geom.bounds.min_y + 1.0).abs() < 1e-6);
        assert!((geom.bounds.max_x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn ut_mesh_002_round_stroke_has_caps() {
        let geom = mesh("%FSLAX46Y46*%%MOMM*%%ADD10C,2*%D10*X0Y0D02*X10000000Y0D01*M02*");
        assert!(geom.vertex_count > 4);
        assert!((geom.bounds.min_x + 1.0).abs() < 1e-6);
        assert!((geom.bounds.max_x - 11.0).abs() < 1e-6);
    }

    #[test]
    fn ut_mesh_003_region_is_triangulated() {
        let geom = mesh(
            "%FSLAX46Y46*%%MOMM*%G36*X0Y0D02*X1000000Y0D01*X1000000Y1000000D01*X0Y1000000D01*X0Y0D01*G37*M02*",
        );
        assert_eq!(geom.vertex_count, 4);
        assert_eq!(geom.indices.len(), 6);
    }

    #[test]
    fn ut_mesh_004_clear_polarity_is_recorded() {
        let geom = mesh(
            "%FSLAX46Y46*%%MOMM*%%ADD10C,1*%D10*X0Y0D03*%LPC*%X0Y0D03*%LPD*%X5000000Y0D03*M02*",
        );
        assert_eq!(geom.clear_ranges.len(), 1);
        let (start, end) = geom.clear_ranges[0];
        assert_eq!(end - start, 90);
    }

    #[test]
    fn ut_mesh_005_macro_flash_expands_primitives() {
        let geom = mesh(
            "%FSLAX46Y46*%%MOMM*%%AMBOX*21,1,$1,$2,0,0,0*%%ADD11BOX,2X1*%D11*X0Y0D03*M02*",
        );
        assert_eq!(geom.vertex_count, 4);
        assert!((geom.bounds.width() - 2.0).abs() < 1e-6);
        assert!((geom.bounds.height() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bc_mesh_001_undefined_aperture_warns() {
        let geom = mesh("%FSLAX46Y46*%%MOMM*%D12*X0Y0D03*M02*");
        assert_eq!(geom.vertex_count, 0);
        assert!(geom.warnings.iter().any(|w| w.contains("D12")));
    }

    #[test]
    fn bc_mesh_002_arc_points_span_sweep() {
        let arc = crate::gerber::primitives::make_arc(
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
            Point::default(),
            ArcDirection::CounterClockwise,
            crate::gerber::QuadrantMode::Multi,
            None,
            Polarity::Dark,
            1e-6,
        );
        let points = arc_points(&arc, 0.1);
        assert!(points.len() > MIN_ARC_SEGMENTS as usize);
        assert!(points.iter().all(|p| (p.distance(Point::default()) - 1.0).abs() < 1e-9));
        assert!(points[points.len() / 2].y > 0.99);
    }
}
