//! Canonical RS-274X emission.

use std::fmt::Write as _;

use crate::error::PanelError;
use crate::geometry::Polarity;
use crate::units::{format_decimal, FileSettings, Notation, Units, ZeroSuppression};

use super::statement::{Operation, QuadrantMode, Statement};
use super::GerberFile;

/// Renders `file` as RS-274X text.
///
/// Header order is `MO`, `FS`, `IPPOS`, macros, apertures; the main statements
/// follow and `M02*` closes the file.
///
/// # Errors
///
/// Returns [`PanelError::InternalInvariant`] when a coordinate does not fit the
/// file's integer digits.
pub fn write(file: &GerberFile) -> Result<String, PanelError> {
    let settings = file.settings;
    let mut out = String::with_capacity(64 + file.statements.len() * 24);

    out.push_str(match settings.units {
        Units::Inch => "%MOIN*%\n",
        Units::Metric => "%MOMM*%\n",
    });
    let zeros = match settings.zero_suppression {
        ZeroSuppression::Leading => 'L',
        ZeroSuppression::Trailing => 'T',
        ZeroSuppression::Decimal => 'D',
    };
    let notation = match settings.notation {
        Notation::Absolute => 'A',
        Notation::Incremental => 'I',
    };
    let (int, frac) = (settings.format.integer, settings.format.fraction);
    let _ = writeln!(out, "%FS{zeros}{notation}X{int}{frac}Y{int}{frac}*%");
    out.push_str("%IPPOS*%\n");

    for aperture_macro in file.macros.values() {
        out.push_str(&aperture_macro.to_gerber());
    }
    for def in &file.apertures {
        let _ = writeln!(out, "%AD{}*%", def.to_gerber_body());
    }

    for statement in &file.statements {
        write_statement(&mut out, statement, settings, &file.name)?;
    }
    out.push_str("M02*\n");
    Ok(out)
}

fn write_statement(
    out: &mut String,
    statement: &Statement,
    settings: FileSettings,
    name: &str,
) -> Result<(), PanelError> {
    match statement {
        Statement::Comment(text) => {
            let _ = writeln!(out, "G04 {text}*");
        }
        Statement::Polarity(Polarity::Dark) => out.push_str("%LPD*%\n"),
        Statement::Polarity(Polarity::Clear) => out.push_str("%LPC*%\n"),
        Statement::SelectAperture(code) => {
            let _ = writeln!(out, "D{code}*");
        }
        Statement::Interpolation(mode) => {
            let _ = writeln!(out, "G{:02}*", mode.number());
        }
        Statement::QuadrantMode(QuadrantMode::Single) => out.push_str("G74*\n"),
        Statement::QuadrantMode(QuadrantMode::Multi) => out.push_str("G75*\n"),
        Statement::RegionBegin => out.push_str("G36*\n"),
        Statement::RegionEnd => out.push_str("G37*\n"),
        Statement::Operation(op) => write_operation(out, op, settings, name)?,
        Statement::Notation(Notation::Absolute) => out.push_str("G90*\n"),
        Statement::Notation(Notation::Incremental) => out.push_str("G91*\n"),
        Statement::Mirror { a, b } => {
            let _ = writeln!(out, "%MIA{}B{}*%", u8::from(*a), u8::from(*b));
        }
        Statement::Offset { a, b } => {
            let _ = writeln!(out, "%OFA{}B{}*%", format_decimal(*a, 6), format_decimal(*b, 6));
        }
        Statement::Scale { a, b } => {
            let _ = writeln!(out, "%SFA{}B{}*%", format_decimal(*a, 6), format_decimal(*b, 6));
        }
        Statement::AxisSelect { swapped } => {
            out.push_str(if *swapped { "%ASAYBX*%\n" } else { "%ASAXBY*%\n" });
        }
        Statement::ImageRotation(degrees) => {
            let _ = writeln!(out, "%IR{}*%", format_decimal(*degrees, 0));
        }
        Statement::ImagePolarity { negative } => {
            out.push_str(if *negative { "%IPNEG*%\n" } else { "%IPPOS*%\n" });
        }
        Statement::StepRepeat {
            x_repeat,
            y_repeat,
            i,
            j,
        } => {
            let _ = writeln!(
                out,
                "%SRX{x_repeat}Y{y_repeat}I{}J{}*%",
                format_decimal(*i, 6),
                format_decimal(*j, 6)
            );
        }
        Statement::StepRepeatEnd => out.push_str("%SR*%\n"),
        Statement::Attribute(body) => {
            let _ = writeln!(out, "%{body}*%");
        }
        Statement::Unknown { text, extended } => {
            if *extended {
                let _ = writeln!(out, "%{text}*%");
            } else {
                let _ = writeln!(out, "{text}*");
            }
        }
        Statement::EndOfFile => {}
    }
    Ok(())
}

fn write_operation(
    out: &mut String,
    op: &Operation,
    settings: FileSettings,
    name: &str,
) -> Result<(), PanelError> {
    if let Some(mode) = op.interpolation {
        let _ = write!(out, "G{:02}", mode.number());
    }
    for (axis, value) in [('X', op.x), ('Y', op.y), ('I', op.i), ('J', op.j)] {
        if let Some(value) = value {
            let _ = write!(out, "{axis}{}", encode_checked(value, settings, name)?);
        }
    }
    if let Some(code) = op.code {
        let _ = write!(out, "D{:02}", code.number());
    }
    out.push_str("*\n");
    Ok(())
}

/// Encodes `value`, rejecting magnitudes the integer digits cannot hold.
///
/// # Errors
///
/// Returns [`PanelError::InternalInvariant`] for out-of-range values.
pub fn encode_checked(value: f64, settings: FileSettings, name: &str) -> Result<String, PanelError> {
    let limit = settings.format.limit();
    let snapped = (value / settings.format.resolution()).round() * settings.format.resolution();
    if !value.is_finite() || snapped.abs() >= limit {
        return Err(PanelError::InternalInvariant(format!(
            "{name}: coordinate {value} does not fit format {}.{}",
            settings.format.integer, settings.format.fraction
        )));
    }
    Ok(settings.encode(value))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::gerber::GerberFile;

    fn parsed(source: &str) -> GerberFile {
        match GerberFile::parse("w.gbr", source) {
            Ok(f) => f,
            Err(e) => panic!("should parse: {e}"),
        }
    }

    #[test]
    fn ut_gw_001_header_order() {
        let file = parsed("%FSLAX46Y46*%%MOMM*%%AMBOX*21,1,$1,$2,0,0,0*%%ADD10C,0.1*%%ADD11BOX,1X2*%D10*X0Y0D02*X1000000Y0D01*M02*");
        let text = match write(&file) {
            Ok(t) => t,
            Err(e) => panic!("should write: {e}"),
        };
        let mo = text.find("%MOMM*%").unwrap_or(usize::MAX);
        let fs = text.find("%FSTAX46Y46*%").unwrap_or(usize::MAX);
        let ip = text.find("%IPPOS*%").unwrap_or(usize::MAX);
        let am = text.find("%AMBOX*").unwrap_or(usize::MAX);
        let ad = text.find("%ADD10C,0.1*%").unwrap_or(usize::MAX);
        let draw = text.find("G01X0001Y0D01*").unwrap_or(usize::MAX);
        assert!(mo < fs && fs < ip && ip < am && am < ad && ad < draw, "{text}");
        assert!(text.ends_with("M02*\n"));
        assert_eq!(text.matches("M02*").count(), 1);
    }

    #[test]
    fn ut_gw_002_negative_coordinates_carry_sign() {
        let file = parsed("%FSLAX46Y46*%%MOMM*%D10*X-1500000Y-250000D03*M02*");
        let text = write(&file).unwrap_or_default();
        assert!(text.contains("X-00015Y-000025D03*"), "{text}");
    }

    #[test]
    fn bc_gw_001_out_of_range_coordinate_is_an_error() {
        let mut file = parsed("%FSLAX24Y24*%%MOMM*%X0Y0D02*M02*");
        file.offset(150.0, 0.0);
        assert!(matches!(write(&file), Err(PanelError::InternalInvariant(_))));
    }
}
