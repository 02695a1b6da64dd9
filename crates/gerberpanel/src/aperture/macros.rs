//! Aperture macro programs (`%AM...%`).
//!
//! A macro is a list of comments, variable assignments and primitives. Each
//! primitive modifier is an expression tree so unit conversion and rotation
//! can be applied symbolically, whatever the instance modifiers turn out to be.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use crate::error::PanelError;
use crate::units::{Units, MM_PER_INCH};

use super::expr::Expr;

/// Primitive codes understood by the macro model.
pub mod code {
    /// Comment.
    pub const COMMENT: u32 = 0;
    /// Circle.
    pub const CIRCLE: u32 = 1;
    /// Vector line, legacy code.
    pub const VECTOR_LINE_LEGACY: u32 = 2;
    /// Outline.
    pub const OUTLINE: u32 = 4;
    /// Regular polygon.
    pub const POLYGON: u32 = 5;
    /// Moire.
    pub const MOIRE: u32 = 6;
    /// Thermal.
    pub const THERMAL: u32 = 7;
    /// Vector line.
    pub const VECTOR_LINE: u32 = 20;
    /// Center line.
    pub const CENTER_LINE: u32 = 21;
    /// Lower-left line, legacy.
    pub const LOWER_LEFT_LINE: u32 = 22;
}

/// One statement of a macro body.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroStatement {
    /// `0 text`
    Comment(String),
    /// `$n=expr`
    Variable {
        /// Variable number.
        number: u32,
        /// Assigned expression.
        expr: Rc<Expr>,
    },
    /// `code,mod1,mod2,...`
    Primitive {
        /// Primitive code.
        code: u32,
        /// Modifier expressions.
        modifiers: Vec<Rc<Expr>>,
    },
}

/// Body of a macro.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroBody {
    /// Fully understood statements.
    Parsed(Vec<MacroStatement>),
    /// Raw blocks kept verbatim because a primitive code is unknown.
    Verbatim(Vec<String>),
}

/// A named aperture macro.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureMacro {
    /// Macro name.
    pub name: String,
    /// Macro program.
    pub body: MacroBody,
}

/// Geometric modifier positions and the rotation position of a primitive.
fn layout(code: u32, len: usize) -> Option<(Vec<usize>, usize)> {
    match code {
        code::CIRCLE => Some(((1..=3).collect(), 4)),
        code::VECTOR_LINE | code::VECTOR_LINE_LEGACY => Some(((1..=5).collect(), 6)),
        code::CENTER_LINE | code::LOWER_LEFT_LINE => Some(((1..=4).collect(), 5)),
        code::OUTLINE => {
            let rotation = len.saturating_sub(1).max(2);
            Some(((2..rotation).collect(), rotation))
        }
        code::POLYGON => Some(((2..=4).collect(), 5)),
        code::MOIRE => Some((vec![0, 1, 2, 3, 4, 6, 7], 8)),
        code::THERMAL => Some(((0..=4).collect(), 5)),
        _ => None,
    }
}

impl ApertureMacro {
    /// Parses the `*`-separated blocks that follow `AM<name>*`.
    ///
    /// Unknown primitive codes keep the whole body verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Macro`] when an expression is malformed.
    pub fn parse(name: &str, blocks: &[String]) -> Result<Self, PanelError> {
        let mut statements = Vec::with_capacity(blocks.len());
        for block in blocks {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            match parse_statement(block)? {
                Some(statement) => statements.push(statement),
                None => {
                    warn!(macro_name = name, block, "unknown macro primitive; keeping macro verbatim");
                    return Ok(Self {
                        name: name.to_string(),
                        body: MacroBody::Verbatim(
                            blocks.iter().map(|b| b.trim().to_string()).collect(),
                        ),
                    });
                }
            }
        }
        Ok(Self {
            name: name.to_string(),
            body: MacroBody::Parsed(statements),
        })
    }

    /// Converts every geometric modifier between units.
    pub fn convert_units(&mut self, from: Units, to: Units) {
        if from == to {
            return;
        }
        let convert = |expr: &Rc<Expr>| match (from, to) {
            (Units::Metric, Units::Inch) => Expr::divide(expr, MM_PER_INCH),
            _ => Expr::multiply(expr, MM_PER_INCH),
        };
        self.map_primitives(|code, modifiers| {
            if let Some((geometric, _)) = layout(code, modifiers.len()) {
                for index in geometric {
                    if let Some(slot) = modifiers.get_mut(index) {
                        *slot = convert(slot);
                    }
                }
            }
        });
    }

    /// Adds `degrees` to the rotation modifier of every primitive.
    pub fn rotate(&mut self, degrees: f64) {
        self.map_primitives(|code, modifiers| {
            let Some((_, rotation)) = layout(code, modifiers.len()) else {
                return;
            };
            if code == code::OUTLINE && modifiers.len() < 3 {
                return;
            }
            while modifiers.len() <= rotation {
                modifiers.push(Expr::constant(0.0));
            }
            if let Some(slot) = modifiers.get_mut(rotation) {
                let rotated = Expr::add_constant(slot, degrees);
                *slot = match rotated.constant_value() {
                    Some(value) => Expr::constant(value.rem_euclid(360.0)),
                    None => rotated,
                };
            }
        });
    }

    fn map_primitives(&mut self, mut f: impl FnMut(u32, &mut Vec<Rc<Expr>>)) {
        match &mut self.body {
            MacroBody::Parsed(statements) => {
                for statement in statements {
                    if let MacroStatement::Primitive { code, modifiers } = statement {
                        f(*code, modifiers);
                    }
                }
            }
            MacroBody::Verbatim(_) => {
                warn!(macro_name = %self.name, "verbatim macro left untransformed");
            }
        }
    }

    /// Evaluates the program for the given instance modifiers.
    ///
    /// Returns each primitive with its modifiers resolved to numbers.
    pub fn evaluate(&self, modifiers: &[f64]) -> Vec<(u32, Vec<f64>)> {
        let MacroBody::Parsed(statements) = &self.body else {
            return Vec::new();
        };
        let mut vars: HashMap<u32, f64> = (1u32..).zip(modifiers.iter().copied()).collect();
        let mut out = Vec::new();
        for statement in statements {
            match statement {
                MacroStatement::Comment(_) => {}
                MacroStatement::Variable { number, expr } => {
                    let value = expr.eval(&vars);
                    vars.insert(*number, value);
                }
                MacroStatement::Primitive { code, modifiers } => {
                    out.push((*code, modifiers.iter().map(|m| m.eval(&vars)).collect()));
                }
            }
        }
        out
    }

    /// Full `%AM...%` block text, newline-terminated.
    pub fn to_gerber(&self) -> String {
        let blocks: Vec<String> = match &self.body {
            MacroBody::Parsed(statements) => statements.iter().map(statement_text).collect(),
            MacroBody::Verbatim(blocks) => blocks.clone(),
        };
        let mut out = format!("%AM{}*\n", self.name);
        for block in blocks {
            out.push_str(&block);
            out.push_str("*\n");
        }
        out.push_str("%\n");
        out
    }
}

fn statement_text(statement: &MacroStatement) -> String {
    match statement {
        MacroStatement::Comment(text) => format!("0 {text}"),
        MacroStatement::Variable { number, expr } => format!("${number}={expr}"),
        MacroStatement::Primitive { code, modifiers } => {
            let mut parts = vec![code.to_string()];
            parts.extend(modifiers.iter().map(ToString::to_string));
            parts.join(",")
        }
    }
}

fn parse_statement(block: &str) -> Result<Option<MacroStatement>, PanelError> {
    if let Some(text) = block.strip_prefix('0') {
        if text.is_empty() || text.starts_with([' ', ',']) {
            return Ok(Some(MacroStatement::Comment(text.trim_start_matches([' ', ',']).to_string())));
        }
    }

    if let Some(rest) = block.strip_prefix('$') {
        if let Some((number, expr)) = rest.split_once('=') {
            let number = number
                .trim()
                .parse::<u32>()
                .map_err(|_| PanelError::Macro(format!("bad variable in `{block}`")))?;
            return Ok(Some(MacroStatement::Variable {
                number,
                expr: Expr::parse(expr)?,
            }));
        }
    }

    let mut parts = block.split(',');
    let code = parts
        .next()
        .and_then(|c| c.trim().parse::<u32>().ok())
        .ok_or_else(|| PanelError::Macro(format!("bad macro primitive `{block}`")))?;
    if layout(code, 0).is_none() {
        return Ok(None);
    }
    let modifiers = parts.map(Expr::parse).collect::<Result<Vec<_>, _>>()?;
    Ok(Some(MacroStatement::Primitive { code, modifiers }))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn blocks(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| (*l).to_string()).collect()
    }

    fn parsed(lines: &[&str]) -> ApertureMacro {
        match ApertureMacro::parse("TEST", &blocks(lines)) {
            Ok(m) => m,
            Err(e) => panic!("macro should parse: {e}"),
        }
    }

    #[test]
    fn ut_mac_001_parses_comments_variables_and_primitives() {
        let m = parsed(&["0 rounded pad", "$3=$1/2", "1,1,$1,0,0", "21,1,$1,$2,0,0,45"]);
        let MacroBody::Parsed(statements) = &m.body else {
            panic!("expected parsed body");
        };
        assert_eq!(statements.len(), 4);
        assert!(matches!(&statements[0], MacroStatement::Comment(c) if c == "rounded pad"));
        assert!(matches!(&statements[1], MacroStatement::Variable { number: 3, .. }));
    }

    #[test]
    fn ut_mac_002_emits_am_block() {
        let m = parsed(&["1,1,$1,0,0", "$2=$1x2"]);
        assert_eq!(m.to_gerber(), "%AMTEST*\n1,1,$1,0,0*\n$2=$1x2*\n%\n");
    }

    #[test]
    fn ut_mac_003_conversion_scales_only_geometry() {
        let mut m = parsed(&["5,1,8,0,0,25.4,22.5"]);
        m.convert_units(Units::Metric, Units::Inch);
        assert_eq!(m.to_gerber(), "%AMTEST*\n5,1,8,0,0,1,22.5*\n%\n");
    }

    #[test]
    fn ut_mac_004_conversion_of_variables_round_trips() {
        let mut m = parsed(&["21,1,$1,$2,0,0,0"]);
        let original = m.clone();
        m.convert_units(Units::Metric, Units::Inch);
        m.convert_units(Units::Inch, Units::Metric);
        assert_eq!(m.to_gerber(), original.to_gerber());
    }

    #[test]
    fn ut_mac_005_rotation_adds_to_existing_modifier() {
        let mut m = parsed(&["21,1,$1,$2,0,0,$3", "1,1,0.5,1,0"]);
        m.rotate(90.0);
        assert_eq!(
            m.to_gerber(),
            "%AMTEST*\n21,1,$1,$2,0,0,$3+90*\n1,1,0.5,1,0,90*\n%\n"
        );
        m.rotate(270.0);
        assert!(m.to_gerber().contains("1,1,0.5,1,0,0*"));
    }

    #[test]
    fn ut_mac_006_evaluate_binds_instance_modifiers() {
        let m = parsed(&["$3=$1/2", "1,1,$3,0,0"]);
        let prims = m.evaluate(&[0.8]);
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].0, 1);
        assert!((prims[0].1[1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn bc_mac_001_unknown_primitive_keeps_macro_verbatim() {
        let m = parsed(&["1,1,$1,0,0", "99,1,2,3"]);
        assert!(matches!(m.body, MacroBody::Verbatim(ref b) if b.len() == 2));
        assert_eq!(m.to_gerber(), "%AMTEST*\n1,1,$1,0,0*\n99,1,2,3*\n%\n");
    }

    #[test]
    fn bc_mac_002_outline_rotation_is_last_modifier() {
        let mut m = parsed(&["4,1,3,0,0,1,0,1,1,0,0,0"]);
        m.rotate(180.0);
        assert!(m.to_gerber().contains("4,1,3,0,0,1,0,1,1,0,0,180*"));
    }
}
