//! RS-274X tokenizer and statement parser.
//!
//! The input is split into `%...%` extended blocks and `*`-terminated words.
//! Each word is matched by a regex anchored on its opening characters; words
//! nothing recognises are kept verbatim as [`Statement::Unknown`].

use indexmap::IndexMap;
use regex::Captures;
use tracing::debug;

use crate::aperture::{Aperture, ApertureDefinition, ApertureMacro};
use crate::capture;
use crate::error::PanelError;
use crate::geometry::Polarity;
use crate::units::{CoordinateFormat, FileSettings, Notation, Units, ZeroSuppression};

use super::statement::{DCode, Interpolation, Operation, QuadrantMode, Statement};
use super::GerberFile;

/// Settings assumed until the file states its own.
const LEGACY_SETTINGS: FileSettings = FileSettings {
    units: Units::Inch,
    notation: Notation::Absolute,
    zero_suppression: ZeroSuppression::Leading,
    format: CoordinateFormat::new(2, 4),
};

#[derive(Debug)]
struct Block {
    text: String,
    line: usize,
    extended: bool,
}

/// Parses RS-274X text into statements without normalizing them.
///
/// # Errors
///
/// Returns [`PanelError::Parse`] for unterminated blocks, malformed format or
/// aperture statements, and coordinates that cannot be decoded.
pub fn parse_raw(name: &str, source: &str) -> Result<GerberFile, PanelError> {
    let mut parser = Parser {
        file: GerberFile {
            name: name.to_string(),
            settings: LEGACY_SETTINGS,
            macros: IndexMap::new(),
            apertures: Vec::new(),
            statements: Vec::new(),
            warnings: Vec::new(),
        },
    };

    for block in split_blocks(name, source)? {
        if block.extended {
            parser.extended(&block)?;
        } else {
            parser.word(&block.text, block.line)?;
        }
    }

    debug!(
        file = name,
        statements = parser.file.statements.len(),
        apertures = parser.file.apertures.len(),
        macros = parser.file.macros.len(),
        "parsed gerber"
    );
    Ok(parser.file)
}

fn split_blocks(name: &str, source: &str) -> Result<Vec<Block>, PanelError> {
    let mut blocks = Vec::new();
    let mut line = 1;
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            chars.next();
            continue;
        }

        let start_line = line;
        let extended = c == '%';
        if extended {
            chars.next();
        }
        let terminator = if extended { '%' } else { '*' };
        let mut text = String::new();
        let mut terminated = false;
        for ch in chars.by_ref() {
            if ch == terminator {
                terminated = true;
                break;
            }
            if ch == '\n' {
                line += 1;
            }
            if ch != '\r' && ch != '\n' {
                text.push(ch);
            }
        }

        if !terminated && extended {
            return Err(PanelError::parse(
                name,
                start_line,
                &text,
                "unterminated extended block",
            ));
        }
        if !text.trim().is_empty() {
            blocks.push(Block {
                text,
                line: start_line,
                extended,
            });
        }
    }

    Ok(blocks)
}

struct Parser {
    file: GerberFile,
}

impl Parser {
    fn error(&self, line: usize, token: &str, message: impl Into<String>) -> PanelError {
        PanelError::parse(&self.file.name, line, token, message)
    }

    fn push(&mut self, statement: Statement) {
        self.file.statements.push(statement);
    }

    fn unknown(&mut self, text: &str, line: usize, extended: bool) {
        debug!(file = %self.file.name, line, text, "preserving unknown statement");
        self.file
            .warnings
            .push(format!("line {line}: unknown statement `{text}` preserved"));
        self.push(Statement::Unknown {
            text: text.to_string(),
            extended,
        });
    }

    fn extended(&mut self, block: &Block) -> Result<(), PanelError> {
        let text = block.text.trim();
        if let Some(rest) = text.strip_prefix("AM") {
            let mut parts = rest.split('*');
            let name = parts.next().unwrap_or_default().trim().to_string();
            let bodies: Vec<String> = parts
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect();
            let aperture_macro = ApertureMacro::parse(&name, &bodies)
                .map_err(|e| self.error(block.line, text, e.to_string()))?;
            self.file.macros.insert(name, aperture_macro);
            return Ok(());
        }

        for word in text.split('*').map(str::trim).filter(|w| !w.is_empty()) {
            self.parameter(word, block.line)?;
        }
        Ok(())
    }

    fn parameter(&mut self, word: &str, line: usize) -> Result<(), PanelError> {
        let head = word.get(..2).unwrap_or(word);
        match head {
            "FS" => self.format_spec(word, line),
            "MO" => {
                self.file.settings.units = match word {
                    "MOIN" => Units::Inch,
                    "MOMM" => Units::Metric,
                    _ => return Err(self.error(line, word, "unknown unit")),
                };
                Ok(())
            }
            "LP" => {
                let polarity = match word {
                    "LPD" => Polarity::Dark,
                    "LPC" => Polarity::Clear,
                    _ => return Err(self.error(line, word, "unknown level polarity")),
                };
                self.push(Statement::Polarity(polarity));
                Ok(())
            }
            "AD" => self.aperture_definition(word, line),
            "MI" => {
                let caps = capture(regex!(r"^MI(?:A([01]))?(?:B([01]))?$"), word)
                    .ok_or_else(|| self.error(line, word, "malformed mirror image"))?;
                let flag = |i: usize| caps.get(i).is_some_and(|m| m.as_str() == "1");
                self.push(Statement::Mirror {
                    a: flag(1),
                    b: flag(2),
                });
                Ok(())
            }
            "OF" | "SF" => {
                let caps = capture(
                    regex!(r"^(?:OF|SF)(?:A([+-]?[0-9.]+))?(?:B([+-]?[0-9.]+))?$"),
                    word,
                )
                .ok_or_else(|| self.error(line, word, "malformed axis values"))?;
                let default = if head == "OF" { 0.0 } else { 1.0 };
                let a = self.decimal(&caps, 1, default, line, word)?;
                let b = self.decimal(&caps, 2, default, line, word)?;
                self.push(if head == "OF" {
                    Statement::Offset { a, b }
                } else {
                    Statement::Scale { a, b }
                });
                Ok(())
            }
            "AS" => {
                let swapped = match word {
                    "ASAXBY" => false,
                    "ASAYBX" => true,
                    _ => return Err(self.error(line, word, "malformed axis select")),
                };
                self.push(Statement::AxisSelect { swapped });
                Ok(())
            }
            "IR" => {
                let degrees = word
                    .get(2..)
                    .and_then(|d| d.parse::<f64>().ok())
                    .filter(|d| [0.0, 90.0, 180.0, 270.0].contains(d))
                    .ok_or_else(|| self.error(line, word, "image rotation must be 0, 90, 180 or 270"))?;
                self.push(Statement::ImageRotation(degrees));
                Ok(())
            }
            "IP" => {
                let negative = match word {
                    "IPPOS" => false,
                    "IPNEG" => true,
                    _ => return Err(self.error(line, word, "unknown image polarity")),
                };
                self.push(Statement::ImagePolarity { negative });
                Ok(())
            }
            "SR" => self.step_repeat(word, line),
            "TF" | "TA" | "TO" | "TD" => {
                self.push(Statement::Attribute(word.to_string()));
                Ok(())
            }
            _ => {
                self.unknown(word, line, true);
                Ok(())
            }
        }
    }

    fn format_spec(&mut self, word: &str, line: usize) -> Result<(), PanelError> {
        let caps = capture(
            regex!(r"^FS([LTD]?)([AI])(?:N\d)?(?:G\d)?X(\d)(\d)Y(\d)(\d)(?:D\d)?(?:M\d)?$"),
            word,
        )
        .ok_or_else(|| self.error(line, word, "malformed format specification"))?;

        let text = |i: usize| caps.get(i).map_or("", |m| m.as_str());
        let digit = |i: usize| text(i).parse::<u8>().unwrap_or_default();

        let settings = &mut self.file.settings;
        settings.zero_suppression = match text(1) {
            "T" => ZeroSuppression::Trailing,
            "D" => ZeroSuppression::Decimal,
            _ => ZeroSuppression::Leading,
        };
        settings.notation = if text(2) == "I" {
            Notation::Incremental
        } else {
            Notation::Absolute
        };
        settings.format = CoordinateFormat::new(digit(3), digit(4));
        if (digit(3), digit(4)) != (digit(5), digit(6)) {
            self.file
                .warnings
                .push(format!("line {line}: X and Y formats differ; using X"));
        }
        Ok(())
    }

    fn aperture_definition(&mut self, word: &str, line: usize) -> Result<(), PanelError> {
        let caps = capture(regex!(r"^ADD(\d+)([A-Za-z_.$][^,]*)(?:,(.*))?$"), word)
            .ok_or_else(|| self.error(line, word, "malformed aperture definition"))?;
        let code = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .filter(|c| *c >= 10)
            .ok_or_else(|| self.error(line, word, "aperture D-code must be 10 or higher"))?;
        let template = caps.get(2).map_or("", |m| m.as_str());
        let modifiers = match caps.get(3) {
            Some(m) if !m.as_str().is_empty() => m
                .as_str()
                .split('X')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| self.error(line, word, "aperture modifier is not a number"))?,
            _ => Vec::new(),
        };
        let aperture = Aperture::parse(template, &modifiers)
            .map_err(|e| self.error(line, word, e.to_string()))?;
        self.file
            .apertures
            .push(ApertureDefinition { code, aperture });
        Ok(())
    }

    fn step_repeat(&mut self, word: &str, line: usize) -> Result<(), PanelError> {
        if word == "SR" {
            self.push(Statement::StepRepeatEnd);
            return Ok(());
        }
        let caps = capture(
            regex!(r"^SR(?:X(\d+))?(?:Y(\d+))?(?:I([0-9.]+))?(?:J([0-9.]+))?$"),
            word,
        )
        .ok_or_else(|| self.error(line, word, "malformed step and repeat"))?;
        let count = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(1)
        };
        let x_repeat = count(1);
        let y_repeat = count(2);
        let i = self.decimal(&caps, 3, 0.0, line, word)?;
        let j = self.decimal(&caps, 4, 0.0, line, word)?;
        if x_repeat == 1 && y_repeat == 1 {
            self.push(Statement::StepRepeatEnd);
        } else {
            self.push(Statement::StepRepeat {
                x_repeat,
                y_repeat,
                i,
                j,
            });
        }
        Ok(())
    }

    fn decimal(
        &self,
        caps: &Captures<'_>,
        index: usize,
        default: f64,
        line: usize,
        word: &str,
    ) -> Result<f64, PanelError> {
        caps.get(index).map_or(Ok(default), |m| {
            m.as_str()
                .parse::<f64>()
                .map_err(|_| self.error(line, word, "not a number"))
        })
    }

    fn word(&mut self, raw: &str, line: usize) -> Result<(), PanelError> {
        let trimmed = raw.trim();
        if let Some(caps) = capture(regex!(r"^G0*4(\D.*)?$"), trimmed) {
            let text = caps.get(1).map_or("", |m| m.as_str());
            self.push(Statement::Comment(text.trim().to_string()));
            return Ok(());
        }

        let word: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        let word = word
            .strip_prefix("G54")
            .or_else(|| word.strip_prefix("G55"))
            .unwrap_or(&word);

        match word {
            "M02" | "M2" | "M00" | "M0" | "M01" | "M1" => {
                self.push(Statement::EndOfFile);
                return Ok(());
            }
            "G36" => {
                self.push(Statement::RegionBegin);
                return Ok(());
            }
            "G37" => {
                self.push(Statement::RegionEnd);
                return Ok(());
            }
            "G74" => {
                self.push(Statement::QuadrantMode(QuadrantMode::Single));
                return Ok(());
            }
            "G75" => {
                self.push(Statement::QuadrantMode(QuadrantMode::Multi));
                return Ok(());
            }
            "G90" | "G91" => {
                self.push(Statement::Notation(if word == "G90" {
                    Notation::Absolute
                } else {
                    Notation::Incremental
                }));
                return Ok(());
            }
            "G70" => {
                self.file.settings.units = Units::Inch;
                return Ok(());
            }
            "G71" => {
                self.file.settings.units = Units::Metric;
                return Ok(());
            }
            _ => {}
        }

        if let Some(caps) = capture(regex!(r"^D(\d+)$"), word) {
            let code = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or_default();
            if code >= 10 {
                self.push(Statement::SelectAperture(code));
                return Ok(());
            }
        }

        if let Some(caps) = capture(
            regex!(r"^(?:G0*([123]))?(?:X([+-]?[0-9.]+))?(?:Y([+-]?[0-9.]+))?(?:I([+-]?[0-9.]+))?(?:J([+-]?[0-9.]+))?(?:D0*([123]))?$"),
            word,
        ) {
            return self.operation(&caps, word, line);
        }

        self.unknown(word, line, false);
        Ok(())
    }

    fn operation(&mut self, caps: &Captures<'_>, word: &str, line: usize) -> Result<(), PanelError> {
        let interpolation = caps.get(1).map(|m| match m.as_str() {
            "2" => Interpolation::Clockwise,
            "3" => Interpolation::CounterClockwise,
            _ => Interpolation::Linear,
        });
        let settings = self.file.settings;
        let coordinate = |i: usize| -> Result<Option<f64>, PanelError> {
            caps.get(i).map_or(Ok(None), |m| {
                settings
                    .decode(m.as_str())
                    .map(Some)
                    .ok_or_else(|| self.error(line, word, "coordinate cannot be decoded"))
            })
        };
        let operation = Operation {
            interpolation,
            x: coordinate(2)?,
            y: coordinate(3)?,
            i: coordinate(4)?,
            j: coordinate(5)?,
            code: caps.get(6).map(|m| match m.as_str() {
                "1" => DCode::Interpolate,
                "2" => DCode::Move,
                _ => DCode::Flash,
            }),
        };

        let has_coordinates = operation.x.is_some()
            || operation.y.is_some()
            || operation.i.is_some()
            || operation.j.is_some();
        if !has_coordinates && operation.code.is_none() {
            if let Some(mode) = interpolation {
                self.push(Statement::Interpolation(mode));
            }
            return Ok(());
        }
        self.push(Statement::Operation(operation));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    fn raw(source: &str) -> GerberFile {
        match parse_raw("test.gbr", source) {
            Ok(file) => file,
            Err(e) => panic!("should parse: {e}"),
        }
    }

    #[test]
    fn ut_gbr_001_header_sets_format_and_units() {
        let file = raw("%FSLAX36Y36*%\n%MOMM*%\nM02*\n");
        assert_eq!(file.settings.units, Units::Metric);
        assert_eq!(file.settings.format, CoordinateFormat::new(3, 6));
        assert_eq!(file.settings.zero_suppression, ZeroSuppression::Leading);
    }

    #[test]
    fn ut_gbr_002_coordinates_decode_with_format() {
        let file = raw("%FSLAX24Y24*%\n%MOIN*%\nX12500Y-5000D02*\nM02*\n");
        let Statement::Operation(op) = &file.statements[0] else {
            panic!("expected operation, got {:?}", file.statements[0]);
        };
        assert_eq!(op.x, Some(1.25));
        assert_eq!(op.y, Some(-0.5));
        assert_eq!(op.code, Some(DCode::Move));
    }

    #[test]
    fn ut_gbr_003_apertures_and_macros() {
        let file = raw(
            "%FSLAX46Y46*%%MOMM*%\n%AMBOX*21,1,$1,$2,0,0,0*%\n%ADD10C,0.25*%\n%ADD11BOX,1X2*%\nD11*\nM02*\n",
        );
        assert_eq!(file.apertures.len(), 2);
        assert!(file.macros.contains_key("BOX"));
        assert_eq!(file.statements[0], Statement::SelectAperture(11));
    }

    #[test]
    fn ut_gbr_004_legacy_parameters_become_statements() {
        let file = raw("%FSLAX24Y24*MOIN*%\n%MIA1B0*%\n%OFA1.5B-2*%\n%SFA2B1*%\n%IPNEG*%\nM02*\n");
        assert_eq!(file.settings.units, Units::Inch);
        assert_eq!(file.statements[0], Statement::Mirror { a: true, b: false });
        assert_eq!(file.statements[1], Statement::Offset { a: 1.5, b: -2.0 });
        assert_eq!(file.statements[2], Statement::Scale { a: 2.0, b: 1.0 });
        assert_eq!(file.statements[3], Statement::ImagePolarity { negative: true });
    }

    #[test]
    fn ut_gbr_005_comments_and_modes() {
        let file = raw("G04 Hello, world*\nG75*\nG36*\nG37*\nG01*\nG54D10*\n");
        assert_eq!(file.statements[0], Statement::Comment("Hello, world".into()));
        assert_eq!(file.statements[1], Statement::QuadrantMode(QuadrantMode::Multi));
        assert_eq!(file.statements[2], Statement::RegionBegin);
        assert_eq!(file.statements[3], Statement::RegionEnd);
        assert_eq!(file.statements[4], Statement::Interpolation(Interpolation::Linear));
        assert_eq!(file.statements[5], Statement::SelectAperture(10));
    }

    #[test]
    fn ut_gbr_006_unknown_statements_are_preserved() {
        let file = raw("%FSLAX24Y24*%\n%INPANEL*%\nG999*\nM02*\n");
        assert_eq!(
            file.statements[0],
            Statement::Unknown {
                text: "INPANEL".into(),
                extended: true
            }
        );
        assert_eq!(
            file.statements[1],
            Statement::Unknown {
                text: "G999".into(),
                extended: false
            }
        );
        assert_eq!(file.warnings.len(), 2);
    }

    #[test]
    fn ut_gbr_007_axis_values_fall_back_per_parameter() {
        let file = raw("%FSLAX24Y24*%\n%OFB3*%\n%SFA2*%\nM02*\n");
        assert_eq!(file.statements[0], Statement::Offset { a: 0.0, b: 3.0 });
        assert_eq!(file.statements[1], Statement::Scale { a: 2.0, b: 1.0 });
        assert!(parse_raw("x.gbr", "%FSLAX24Y24*%\n%OFA1.2.3*%\n").is_err());
    }

    #[test]
    fn bc_gbr_001_bad_coordinate_reports_line_and_token() {
        let err = parse_raw("bad.gbr", "%FSLAX24Y24*%\n%MOIN*%\n\nX1.2.3Y0D01*\n");
        match err {
            Err(PanelError::Parse { file, line, token, .. }) => {
                assert_eq!(file, "bad.gbr");
                assert_eq!(line, 4);
                assert_eq!(token, "X1.2.3Y0D01");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn bc_gbr_002_unterminated_block_is_an_error() {
        assert!(parse_raw("x.gbr", "%FSLAX24Y24*").is_err());
    }

    #[test]
    fn bc_gbr_003_low_dcode_aperture_is_rejected() {
        assert!(parse_raw("x.gbr", "%FSLAX24Y24*%%ADD05C,1*%").is_err());
    }
}
