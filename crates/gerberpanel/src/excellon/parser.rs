//! Excellon drill and rout parser.
//!
//! A selected tool and a machining mode persist across lines: coordinates
//! produce hits in drill mode, start a path after `G00`, and extend it while
//! the tool is plunged between `M15` and `M16`.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::capture;
use crate::error::PanelError;
use crate::geometry::Point;
use crate::units::{CoordinateFormat, FileSettings, Notation, Units, ZeroSuppression};

use super::types::{Hit, Rout, RoutMode, RoutNode, Slot, Tool};
use super::ExcellonFile;

/// Settings assumed until the header states its own.
const LEGACY_SETTINGS: FileSettings = FileSettings {
    units: Units::Inch,
    notation: Notation::Absolute,
    zero_suppression: ZeroSuppression::Trailing,
    format: CoordinateFormat::new(2, 4),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Drill,
    RoutUp,
    RoutDown,
}

#[derive(Debug, Default, Clone, Copy)]
struct Words {
    x: Option<f64>,
    y: Option<f64>,
    i: Option<f64>,
    j: Option<f64>,
    a: Option<f64>,
}

struct ParserState<'a> {
    name: &'a str,
    file: ExcellonFile,
    in_header: bool,
    explicit_format: bool,
    file_plated: bool,
    pending_plated: Option<bool>,
    current_tool: Option<u32>,
    mode: Mode,
    motion: RoutMode,
    pen: Point,
    rout: Option<Rout>,
}

/// Parses Excellon text.
///
/// # Errors
///
/// Returns [`PanelError::Parse`] for malformed tool definitions and for
/// coordinates that cannot be decoded.
pub fn parse(name: &str, source: &str) -> Result<ExcellonFile, PanelError> {
    let mut state = ParserState {
        name,
        file: ExcellonFile {
            name: name.to_string(),
            settings: LEGACY_SETTINGS,
            tools: IndexMap::new(),
            hits: Vec::new(),
            slots: Vec::new(),
            routs: Vec::new(),
            warnings: Vec::new(),
        },
        in_header: false,
        explicit_format: false,
        file_plated: !name.to_ascii_lowercase().contains("npth"),
        pending_plated: None,
        current_tool: None,
        mode: Mode::Drill,
        motion: RoutMode::Linear,
        pen: Point::default(),
        rout: None,
    };

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix(';') {
            state.comment(comment.trim());
            continue;
        }
        let upper = line.to_ascii_uppercase();
        match upper.as_str() {
            "M48" => state.in_header = true,
            "%" | "M95" => state.in_header = false,
            "M30" | "M00" => break,
            _ if state.in_header => state.header_line(&upper, line_number)?,
            _ => state.body_line(&upper, line_number)?,
        }
    }
    state.finish_rout();

    debug!(
        file = name,
        tools = state.file.tools.len(),
        hits = state.file.hits.len(),
        slots = state.file.slots.len(),
        routs = state.file.routs.len(),
        "parsed excellon"
    );
    Ok(state.file)
}

impl ParserState<'_> {
    fn warn(&mut self, message: String) {
        warn!(file = self.name, "{message}");
        self.file.warnings.push(message);
    }

    fn comment(&mut self, text: &str) {
        if let Some(caps) = capture(regex!(r"FILE_FORMAT=(\d):(\d)"), text) {
            let digits = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u8>().ok());
            if let (Some(integer), Some(fraction)) = (digits(1), digits(2)) {
                self.file.settings.format = CoordinateFormat::new(integer, fraction);
                self.explicit_format = true;
            }
        } else if text.contains("TYPE=NON_PLATED") {
            self.file_plated = false;
        } else if text.contains("TYPE=PLATED") {
            self.file_plated = true;
        } else if text.contains("NonPlated") || text.contains("NPTH") {
            self.pending_plated = Some(false);
        } else if text.contains("Plated") || text.contains("PTH") {
            self.pending_plated = Some(true);
        }
    }

    fn header_line(&mut self, line: &str, line_number: usize) -> Result<(), PanelError> {
        if self.units_directive(line) {
            return Ok(());
        }
        if line.starts_with('T') {
            return self.tool_definition(line, line_number);
        }
        debug!(file = self.name, line = line_number, "ignored header line `{line}`");
        Ok(())
    }

    fn units_directive(&mut self, line: &str) -> bool {
        let (units, rest) = if let Some(rest) = line.strip_prefix("METRIC") {
            (Units::Metric, rest)
        } else if let Some(rest) = line.strip_prefix("INCH") {
            (Units::Inch, rest)
        } else if line == "M71" {
            (Units::Metric, "")
        } else if line == "M72" {
            (Units::Inch, "")
        } else {
            return false;
        };
        let settings = &mut self.file.settings;
        settings.units = units;
        if !self.explicit_format {
            settings.format = match units {
                Units::Metric => CoordinateFormat::new(3, 3),
                Units::Inch => CoordinateFormat::new(2, 4),
            };
        }
        for part in rest.split(',').map(str::trim) {
            match part {
                "LZ" => settings.zero_suppression = ZeroSuppression::Trailing,
                "TZ" => settings.zero_suppression = ZeroSuppression::Leading,
                hint if hint.contains('.') => {
                    if let Some((int, frac)) = hint.split_once('.') {
                        if let (Ok(i), Ok(f)) = (u8::try_from(int.len()), u8::try_from(frac.len())) {
                            settings.format = CoordinateFormat::new(i, f);
                            self.explicit_format = true;
                        }
                    }
                }
                _ => {}
            }
        }
        true
    }

    fn tool_definition(&mut self, line: &str, line_number: usize) -> Result<(), PanelError> {
        let Some(caps) = capture(regex!(r"^T0*(\d+)(?:[FSBHZ][0-9.]+)*C([0-9.]+)"), line) else {
            if capture(regex!(r"^T0*\d+$"), line).is_some() {
                return self.body_line(line, line_number);
            }
            return Err(PanelError::parse(self.name, line_number, line, "invalid tool definition"));
        };
        let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let diameter = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        let (Some(number), Some(diameter)) = (number, diameter) else {
            return Err(PanelError::parse(self.name, line_number, line, "invalid tool definition"));
        };
        if diameter <= 0.0 {
            self.warn(format!("tool T{number} has non-positive diameter and was skipped"));
            return Ok(());
        }
        if self.file.tools.contains_key(&number) {
            self.warn(format!("duplicate tool definition for T{number}; last definition wins"));
        }
        let plated = self.pending_plated.take().unwrap_or(self.file_plated);
        self.file.tools.insert(number, Tool { diameter, plated });
        Ok(())
    }

    fn body_line(&mut self, line: &str, line_number: usize) -> Result<(), PanelError> {
        if self.units_directive(line) {
            return Ok(());
        }
        if line.starts_with('T') && line.contains('C') {
            return self.tool_definition(line, line_number);
        }
        if let Some(caps) = capture(regex!(r"^T0*(\d+)$"), line) {
            let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()).unwrap_or(0);
            self.finish_rout();
            if number == 0 {
                self.current_tool = None;
            } else if self.file.tools.contains_key(&number) {
                self.current_tool = Some(number);
            } else {
                self.current_tool = None;
                self.warn(format!("tool T{number} selected but not defined"));
            }
            return Ok(());
        }

        match line {
            "G90" => {
                self.file.settings.notation = Notation::Absolute;
                return Ok(());
            }
            "G91" => {
                self.file.settings.notation = Notation::Incremental;
                return Ok(());
            }
            "G05" | "G81" => {
                self.finish_rout();
                self.mode = Mode::Drill;
                return Ok(());
            }
            "M15" => {
                if self.rout.is_none() {
                    self.start_rout(self.pen);
                }
                self.mode = Mode::RoutDown;
                return Ok(());
            }
            "M16" | "M17" => {
                self.finish_rout();
                self.mode = Mode::RoutUp;
                return Ok(());
            }
            "G40" | "G41" | "G42" | "M71" | "M72" | "G93" => return Ok(()),
            _ => {}
        }

        if let Some((first, second)) = line.split_once("G85") {
            let start = self.position(first, line, line_number)?;
            self.pen = start;
            let end = self.position(second, line, line_number)?;
            self.pen = end;
            if let Some(tool) = self.selected_tool(end) {
                self.file.slots.push(Slot { tool, start, end });
            }
            return Ok(());
        }

        let Some(caps) = capture(regex!(r"^(?:G0*([0-3]))?((?:[XYIJA][+-]?[0-9.]+)*)$"), line) else {
            self.warn(format!("line {line_number}: unsupported statement `{line}`"));
            return Ok(());
        };
        let g = caps.get(1).map(|m| m.as_str());
        let coordinates = caps.get(2).map_or("", |m| m.as_str());
        if let Some(g) = g {
            self.motion = match g {
                "1" => RoutMode::Linear,
                "2" => RoutMode::Clockwise,
                "3" => RoutMode::CounterClockwise,
                _ => RoutMode::Rout,
            };
        }
        if coordinates.is_empty() {
            return Ok(());
        }
        let words = self.words(coordinates, line, line_number)?;
        let target = self.resolve(words);

        if self.motion == RoutMode::Rout {
            self.finish_rout();
            self.mode = Mode::RoutUp;
            self.motion = RoutMode::Linear;
            self.start_rout(target);
        } else {
            match self.mode {
                Mode::Drill if g.is_none() => {
                    if let Some(tool) = self.selected_tool(target) {
                        self.file.hits.push(Hit {
                            tool,
                            position: target,
                        });
                    }
                }
                Mode::RoutDown | Mode::Drill => self.push_node(target, words),
                Mode::RoutUp => {
                    self.finish_rout();
                    self.start_rout(target);
                }
            }
        }
        self.pen = target;
        Ok(())
    }

    fn words(&self, text: &str, line: &str, line_number: usize) -> Result<Words, PanelError> {
        let mut words = Words::default();
        let Some(re) = regex!(r"([XYIJA])([+-]?[0-9.]+)") else {
            return Ok(words);
        };
        for caps in re.captures_iter(text) {
            let letter = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps.get(2).map_or("", |m| m.as_str());
            let value = if letter == "A" {
                raw.parse::<f64>().ok()
            } else {
                self.file.settings.decode(raw)
            };
            let Some(value) = value else {
                return Err(PanelError::parse(
                    self.name,
                    line_number,
                    line,
                    format!("cannot decode {letter}{raw}"),
                ));
            };
            match letter {
                "X" => words.x = Some(value),
                "Y" => words.y = Some(value),
                "I" => words.i = Some(value),
                "J" => words.j = Some(value),
                _ => words.a = Some(value),
            }
        }
        Ok(words)
    }

    fn resolve(&self, words: Words) -> Point {
        match self.file.settings.notation {
            Notation::Absolute => Point::new(words.x.unwrap_or(self.pen.x), words.y.unwrap_or(self.pen.y)),
            Notation::Incremental => self.pen.offset(words.x.unwrap_or(0.0), words.y.unwrap_or(0.0)),
        }
    }

    fn position(&self, text: &str, line: &str, line_number: usize) -> Result<Point, PanelError> {
        let words = self.words(text, line, line_number)?;
        Ok(self.resolve(words))
    }

    fn selected_tool(&mut self, at: Point) -> Option<u32> {
        if self.current_tool.is_none() {
            self.warn(format!("hole at ({}, {}) skipped: no tool selected", at.x, at.y));
        }
        self.current_tool
    }

    fn start_rout(&mut self, at: Point) {
        if let Some(tool) = self.current_tool {
            self.rout = Some(Rout {
                tool,
                nodes: vec![RoutNode {
                    mode: RoutMode::Rout,
                    position: at,
                    radius: None,
                    center_offset: None,
                }],
            });
        } else {
            self.warn("rout started with no tool selected".to_string());
        }
    }

    fn push_node(&mut self, at: Point, words: Words) {
        if self.rout.is_none() {
            self.start_rout(self.pen);
        }
        let center_offset = match (words.i, words.j) {
            (None, None) => None,
            (i, j) => Some(Point::new(i.unwrap_or(0.0), j.unwrap_or(0.0))),
        };
        if let Some(rout) = self.rout.as_mut() {
            rout.nodes.push(RoutNode {
                mode: self.motion,
                position: at,
                radius: words.a,
                center_offset,
            });
        }
    }

    fn finish_rout(&mut self) {
        if let Some(rout) = self.rout.take() {
            if rout.nodes.len() > 1 {
                self.file.routs.push(rout);
            }
        }
    }
}
