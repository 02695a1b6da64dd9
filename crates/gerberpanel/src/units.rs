//! Fixed-point coordinate encoding, unit conversion and tolerant comparison.
//!
//! Gerber and Excellon both store coordinates as signed integers with an
//! implied decimal point. A [`CoordinateFormat`] of `(I, F)` means `I`
//! integer digits and `F` fractional digits; [`ZeroSuppression`] says which
//! end of the digit string may be omitted.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Default coordinate-equality tolerance in millimetres.
pub const DEFAULT_TOLERANCE_MM: f64 = 1e-3;

/// Measurement unit of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    /// Inches.
    Inch,
    /// Millimetres.
    Metric,
}

impl Units {
    /// Multiplier converting a length in `self` into `target`.
    pub fn factor_to(self, target: Self) -> f64 {
        match (self, target) {
            (Self::Inch, Self::Metric) => MM_PER_INCH,
            (Self::Metric, Self::Inch) => 1.0 / MM_PER_INCH,
            _ => 1.0,
        }
    }

    /// Converts `value` from `self` into `target`.
    ///
    /// Metric to inch divides, so a round trip multiplies back by the same constant.
    pub fn convert(self, value: f64, target: Self) -> f64 {
        match (self, target) {
            (Self::Inch, Self::Metric) => value * MM_PER_INCH,
            (Self::Metric, Self::Inch) => value / MM_PER_INCH,
            _ => value,
        }
    }

    /// Converts a millimetre length into this unit.
    pub fn from_mm(self, value_mm: f64) -> f64 {
        value_mm * Self::Metric.factor_to(self)
    }

    /// Converts a length in this unit into millimetres.
    pub fn to_mm(self, value: f64) -> f64 {
        value * self.factor_to(Self::Metric)
    }
}

/// Coordinate notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// Coordinates are absolute positions.
    Absolute,
    /// Coordinates are deltas from the previous position.
    Incremental,
}

/// Which zeros may be omitted from an encoded coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroSuppression {
    /// Leading zeros omitted; digits are right-aligned.
    Leading,
    /// Trailing zeros omitted; digits are left-aligned.
    Trailing,
    /// Coordinates carry an explicit decimal point.
    Decimal,
}

/// Number of integer and fractional digits of an encoded coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateFormat {
    /// Integer digits.
    pub integer: u8,
    /// Fractional digits.
    pub fraction: u8,
}

impl CoordinateFormat {
    /// Creates a format of `integer` and `fraction` digits.
    pub const fn new(integer: u8, fraction: u8) -> Self {
        Self { integer, fraction }
    }

    /// Smallest magnitude that no longer fits in the integer digits.
    pub fn limit(self) -> f64 {
        10f64.powi(i32::from(self.integer))
    }

    /// Smallest representable step.
    pub fn resolution(self) -> f64 {
        10f64.powi(-i32::from(self.fraction))
    }
}

/// Encoding settings shared by every entity of a parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSettings {
    /// Measurement unit.
    pub units: Units,
    /// Absolute or incremental coordinates.
    pub notation: Notation,
    /// Zero suppression used when encoding coordinates.
    pub zero_suppression: ZeroSuppression,
    /// Digit format used when encoding coordinates.
    pub format: CoordinateFormat,
}

impl FileSettings {
    /// Settings of every emitted panel file: metric 4.6, absolute, trailing zeros omitted.
    pub const fn panel() -> Self {
        Self {
            units: Units::Metric,
            notation: Notation::Absolute,
            zero_suppression: ZeroSuppression::Trailing,
            format: CoordinateFormat::new(4, 6),
        }
    }

    /// Default tolerance expressed in this file's unit.
    pub fn tolerance(self) -> f64 {
        self.units.from_mm(DEFAULT_TOLERANCE_MM)
    }

    /// Encodes `value` with these settings.
    pub fn encode(self, value: f64) -> String {
        encode(value, self.format, self.zero_suppression)
    }

    /// Decodes `raw` with these settings.
    pub fn decode(self, raw: &str) -> Option<f64> {
        decode(raw, self.format, self.zero_suppression)
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self::panel()
    }
}

/// Encodes `value` as a fixed-point coordinate string.
///
/// The magnitude is rounded to `10^-F`; negative values carry a `-` sign.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(value: f64, format: CoordinateFormat, zeros: ZeroSuppression) -> String {
    let fraction = usize::from(format.fraction);
    let scaled = (value * 10f64.powi(i32::from(format.fraction))).round() as i64;

    if zeros == ZeroSuppression::Decimal {
        let snapped = scaled as f64 / 10f64.powi(i32::from(format.fraction));
        return format!("{snapped:.fraction$}");
    }

    let sign = if scaled < 0 { "-" } else { "" };
    let digits = scaled.unsigned_abs().to_string();
    let body = match zeros {
        ZeroSuppression::Trailing => {
            let total = usize::from(format.integer) + fraction;
            if digits.len() > total {
                return format!("{sign}{digits}");
            }
            let padded = format!("{digits:0>total$}");
            let trimmed = padded.trim_end_matches('0');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
        ZeroSuppression::Leading | ZeroSuppression::Decimal => digits,
    };
    format!("{sign}{body}")
}

/// Decodes a fixed-point coordinate string.
///
/// Strings containing a decimal point are read literally. Returns `None` when
/// `raw` is not a number.
pub fn decode(raw: &str, format: CoordinateFormat, zeros: ZeroSuppression) -> Option<f64> {
    let raw = raw.trim();
    if raw.contains('.') || zeros == ZeroSuppression::Decimal {
        return raw.parse::<f64>().ok().filter(|v| v.is_finite());
    }

    let (negative, digits) = match (raw.strip_prefix('-'), raw.strip_prefix('+')) {
        (Some(rest), _) => (true, rest),
        (None, Some(rest)) => (false, rest),
        (None, None) => (false, raw),
    };
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let total = usize::from(format.integer) + usize::from(format.fraction);
    let expanded: Cow<'_, str> = if zeros == ZeroSuppression::Trailing && digits.len() < total {
        Cow::Owned(format!("{digits:0<total$}"))
    } else {
        Cow::Borrowed(digits)
    };

    let magnitude = expanded.parse::<f64>().ok()? / 10f64.powi(i32::from(format.fraction));
    Some(if negative { -magnitude } else { magnitude })
}

/// Tolerant equality: `|a - b| <= eps`.
pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

/// Floors to two decimals to absorb raster and scale drift.
pub fn floor2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// Formats a decimal with at most `max_fraction` digits, trimming trailing zeros.
pub fn format_decimal(value: f64, max_fraction: usize) -> String {
    let text = format!("{value:.max_fraction$}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}
