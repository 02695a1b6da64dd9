//! Excellon emission.

use std::fmt::Write as _;

use crate::error::PanelError;
use crate::geometry::Point;
use crate::gerber::writer::encode_checked;
use crate::units::{format_decimal, FileSettings, Units, ZeroSuppression};

use super::types::RoutMode;
use super::ExcellonFile;

/// Renders `file` as Excellon text.
///
/// The header lists every tool with its plating attribute. Hits and slots
/// follow per tool, routed paths come last, and `M30` closes the file.
///
/// # Errors
///
/// Returns [`PanelError::InternalInvariant`] when a coordinate does not fit the
/// file's integer digits.
pub fn write(file: &ExcellonFile) -> Result<String, PanelError> {
    let settings = file.settings;
    let mut out = String::with_capacity(128 + file.hits.len() * 20);
    out.push_str("M48\n");
    out.push_str("; DRILL file {gerberpanel}\n");
    let _ = writeln!(
        out,
        ";FILE_FORMAT={}:{}",
        settings.format.integer, settings.format.fraction
    );
    out.push_str("FMAT,2\n");
    let unit = match settings.units {
        Units::Metric => "METRIC",
        Units::Inch => "INCH",
    };
    match settings.zero_suppression {
        ZeroSuppression::Trailing => {
            let _ = writeln!(out, "{unit},LZ");
        }
        ZeroSuppression::Leading => {
            let _ = writeln!(out, "{unit},TZ");
        }
        ZeroSuppression::Decimal => {
            let _ = writeln!(out, "{unit}");
        }
    }
    for (number, tool) in &file.tools {
        out.push_str(if tool.plated {
            "; #@! TA.AperFunction,Plated,PTH,ComponentDrill\n"
        } else {
            "; #@! TA.AperFunction,NonPlated,NPTH,ComponentDrill\n"
        });
        let _ = writeln!(out, "T{number}C{}", format_decimal(tool.diameter, 4));
    }
    out.push_str("%\nG90\nG05\n");

    for number in file.tools.keys() {
        let hits = file.hits.iter().filter(|h| h.tool == *number);
        let slots = file.slots.iter().filter(|s| s.tool == *number);
        if hits.clone().next().is_none() && slots.clone().next().is_none() {
            continue;
        }
        let _ = writeln!(out, "T{number}");
        for hit in hits {
            write_xy(&mut out, hit.position, settings, &file.name)?;
            out.push('\n');
        }
        for slot in slots {
            write_xy(&mut out, slot.start, settings, &file.name)?;
            out.push_str("G85");
            write_xy(&mut out, slot.end, settings, &file.name)?;
            out.push('\n');
        }
    }

    for rout in &file.routs {
        let _ = writeln!(out, "T{}", rout.tool);
        for node in &rout.nodes {
            let code = match node.mode {
                RoutMode::Rout => "G00",
                RoutMode::Linear => "G01",
                RoutMode::Clockwise => "G02",
                RoutMode::CounterClockwise => "G03",
            };
            out.push_str(code);
            write_xy(&mut out, node.position, settings, &file.name)?;
            if let Some(offset) = node.center_offset {
                let _ = write!(
                    out,
                    "I{}J{}",
                    encode_checked(offset.x, settings, &file.name)?,
                    encode_checked(offset.y, settings, &file.name)?
                );
            } else if let Some(radius) = node.radius {
                let _ = write!(out, "A{}", format_decimal(radius, 6));
            }
            out.push('\n');
            if node.mode == RoutMode::Rout {
                out.push_str("M15\n");
            }
        }
        out.push_str("M16\nG05\n");
    }
    out.push_str("M30\n");
    Ok(out)
}

fn write_xy(out: &mut String, p: Point, settings: FileSettings, name: &str) -> Result<(), PanelError> {
    let _ = write!(
        out,
        "X{}Y{}",
        encode_checked(p.x, settings, name)?,
        encode_checked(p.y, settings, name)?
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    const SOURCE: &str = "M48\nMETRIC,LZ,000.000\nT1C0.3\nT2C0.8\n%\nT1\nX001000Y001000\n\
T2\nG00X001000Y005000\nM15\nG01X004000Y005000\nM16\nG05\nX002000Y002000\nM30\n";

    fn text() -> String {
        let file = match ExcellonFile::parse("b.drl", SOURCE) {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        };
        match write(&file) {
            Ok(t) => t,
            Err(e) => panic!("should write: {e}"),
        }
    }

    #[test]
    fn ut_ew_001_routs_follow_hits() {
        let text = text();
        let last_hit = text.find("X002Y002").unwrap_or(usize::MAX);
        let rout = text.find("G00X001Y005").unwrap_or(0);
        assert!(last_hit < rout, "{text}");
        assert!(text.ends_with("M16\nG05\nM30\n"));
        assert!(text.contains("METRIC,LZ"));
    }

    #[test]
    fn ut_ew_002_reparse_preserves_content() {
        let reparsed = match ExcellonFile::parse("b.drl", &text()) {
            Ok(f) => f,
            Err(e) => panic!("should reparse: {e}"),
        };
        assert_eq!(reparsed.hits.len(), 2);
        assert_eq!(reparsed.routs.len(), 1);
        assert_eq!(reparsed.routs[0].nodes.len(), 2);
        assert!((reparsed.tools[&2].diameter - 0.8).abs() < 1e-9);
    }
}
