//! Arithmetic expression trees used by aperture macro modifiers.
//!
//! Gerber macro arithmetic has constants, `$n` variables, unary minus and the
//! binary operators `+ - x /`. Trees are immutable and shared through [`Rc`],
//! so [`Expr::optimize`] can hand back an untouched subtree without copying.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::PanelError;
use crate::units::format_decimal;

/// Folded constants this close to 0 or 1 snap onto them.
const SNAP_EPSILON: f64 = 1e-12;

/// Fraction digits used when printing constants.
const CONSTANT_DIGITS: usize = 10;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `x`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// Applies the operator. Division by zero evaluates to zero.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => {
                if b.abs() < f64::EPSILON {
                    0.0
                } else {
                    a / b
                }
            }
        }
    }

    const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => 'x',
            Self::Div => '/',
        }
    }

    const fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div => 2,
        }
    }
}

/// A node of a macro expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal number.
    Constant(f64),
    /// A `$n` variable reference.
    Variable(u32),
    /// Unary minus.
    Negate(Rc<Expr>),
    /// A binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Rc<Expr>,
        /// Right operand.
        rhs: Rc<Expr>,
    },
}

impl Expr {
    /// Shared constant node.
    pub fn constant(value: f64) -> Rc<Self> {
        Rc::new(Self::Constant(value))
    }

    /// Parses macro arithmetic such as `$1x0.5+(2-$3)/2`.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Macro`] on unexpected characters, unbalanced
    /// parentheses or trailing tokens.
    pub fn parse(text: &str) -> Result<Rc<Self>, PanelError> {
        let tokens = tokenize(text.trim())?;
        if tokens.is_empty() {
            return Ok(Self::constant(0.0));
        }
        let (node, rest) = parse_additive(&tokens)?;
        if rest.is_empty() {
            Ok(node)
        } else {
            Err(PanelError::Macro(format!(
                "unexpected tokens in expression `{text}`"
            )))
        }
    }

    /// The value of a constant node.
    pub const fn constant_value(&self) -> Option<f64> {
        match self {
            Self::Constant(v) => Some(*v),
            _ => None,
        }
    }

    /// Evaluates the tree. Undefined variables read as zero.
    pub fn eval(&self, vars: &HashMap<u32, f64>) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Variable(n) => vars.get(n).copied().unwrap_or(0.0),
            Self::Negate(inner) => -inner.eval(vars),
            Self::Binary { op, lhs, rhs } => op.apply(lhs.eval(vars), rhs.eval(vars)),
        }
    }

    /// Folds constants, removes identities and collapses constant chains.
    ///
    /// Returns `node` itself when nothing changes.
    pub fn optimize(node: &Rc<Self>) -> Rc<Self> {
        match node.as_ref() {
            Self::Constant(_) | Self::Variable(_) => Rc::clone(node),
            Self::Negate(inner) => {
                let inner = Self::optimize(inner);
                match inner.as_ref() {
                    Self::Constant(v) => Self::constant(-v),
                    Self::Negate(x) => Rc::clone(x),
                    _ => Rc::new(Self::Negate(inner)),
                }
            }
            Self::Binary { op, lhs, rhs } => {
                simplify(*op, Self::optimize(lhs), Self::optimize(rhs))
            }
        }
    }

    /// `node + value`, optimized.
    pub fn add_constant(node: &Rc<Self>, value: f64) -> Rc<Self> {
        simplify(BinaryOp::Add, Self::optimize(node), Self::constant(value))
    }

    /// `node x factor`, optimized.
    pub fn multiply(node: &Rc<Self>, factor: f64) -> Rc<Self> {
        simplify(BinaryOp::Mul, Self::optimize(node), Self::constant(factor))
    }

    /// `node / divisor`, optimized.
    pub fn divide(node: &Rc<Self>, divisor: f64) -> Rc<Self> {
        simplify(BinaryOp::Div, Self::optimize(node), Self::constant(divisor))
    }
}

fn snap(value: f64) -> f64 {
    if (value - 1.0).abs() <= SNAP_EPSILON {
        1.0
    } else if value.abs() <= SNAP_EPSILON {
        0.0
    } else {
        value
    }
}

fn is(value: Option<f64>, target: f64) -> bool {
    value.is_some_and(|v| (v - target).abs() < f64::EPSILON)
}

fn simplify(op: BinaryOp, lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    let left = lhs.constant_value();
    let right = rhs.constant_value();

    if let (Some(a), Some(b)) = (left, right) {
        return Expr::constant(snap(op.apply(a, b)));
    }

    match op {
        BinaryOp::Add if is(left, 0.0) => return rhs,
        BinaryOp::Add | BinaryOp::Sub if is(right, 0.0) => return lhs,
        BinaryOp::Mul if is(left, 1.0) => return rhs,
        BinaryOp::Mul | BinaryOp::Div if is(right, 1.0) => return lhs,
        BinaryOp::Mul if is(left, 0.0) || is(right, 0.0) => return Expr::constant(0.0),
        BinaryOp::Div if is(left, 0.0) => return Expr::constant(0.0),
        _ => {}
    }

    if let (Some(b), Expr::Binary { op: inner, lhs: x, rhs: a_node }) = (right, lhs.as_ref()) {
        if let Some(a) = a_node.constant_value() {
            let merged = match (*inner, op) {
                (BinaryOp::Mul, BinaryOp::Mul) => Some((BinaryOp::Mul, a * b)),
                (BinaryOp::Mul, BinaryOp::Div) if b.abs() > f64::EPSILON => Some((BinaryOp::Mul, a / b)),
                (BinaryOp::Div, BinaryOp::Mul) if a.abs() > f64::EPSILON => Some((BinaryOp::Mul, b / a)),
                (BinaryOp::Div, BinaryOp::Div) => Some((BinaryOp::Div, a * b)),
                (BinaryOp::Add, BinaryOp::Add) => Some((BinaryOp::Add, a + b)),
                (BinaryOp::Add, BinaryOp::Sub) => Some((BinaryOp::Add, a - b)),
                (BinaryOp::Sub, BinaryOp::Add) => Some((BinaryOp::Add, b - a)),
                (BinaryOp::Sub, BinaryOp::Sub) => Some((BinaryOp::Sub, a + b)),
                _ => None,
            };
            if let Some((merged_op, value)) = merged {
                return simplify(merged_op, Rc::clone(x), Expr::constant(snap(value)));
            }
        }
    }

    Rc::new(Expr::Binary { op, lhs, rhs })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Top,
    Left(u8),
    Right(BinaryOp),
    Nested,
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Expr, slot: Slot) -> fmt::Result {
    match node {
        Expr::Constant(v) => {
            let text = format_decimal(*v, CONSTANT_DIGITS);
            if text.starts_with('-') && slot != Slot::Top {
                write!(f, "({text})")
            } else {
                f.write_str(&text)
            }
        }
        Expr::Variable(n) => write!(f, "${n}"),
        Expr::Negate(inner) => {
            if slot != Slot::Top {
                f.write_str("(")?;
            }
            f.write_str("-")?;
            write_node(f, inner, Slot::Nested)?;
            if slot != Slot::Top {
                f.write_str(")")?;
            }
            Ok(())
        }
        Expr::Binary { op, lhs, rhs } => {
            let prec = op.precedence();
            let wrap = match slot {
                Slot::Top => false,
                Slot::Left(parent) => prec < parent,
                Slot::Right(parent) => {
                    prec < parent.precedence()
                        || (prec == parent.precedence()
                            && matches!(parent, BinaryOp::Sub | BinaryOp::Div))
                }
                Slot::Nested => true,
            };
            if wrap {
                f.write_str("(")?;
            }
            write_node(f, lhs, Slot::Left(prec))?;
            write!(f, "{}", op.symbol())?;
            write_node(f, rhs, Slot::Right(*op))?;
            if wrap {
                f.write_str(")")?;
            }
            Ok(())
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, Slot::Top)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Variable(u32),
    Op(BinaryOp),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, PanelError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '+' => tokens.push(Token::Op(BinaryOp::Add)),
            '-' => tokens.push(Token::Op(BinaryOp::Sub)),
            'x' | 'X' => tokens.push(Token::Op(BinaryOp::Mul)),
            '/' => tokens.push(Token::Op(BinaryOp::Div)),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '$' => {
                let mut num = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    num.push(d);
                }
                let n: u32 = num
                    .parse()
                    .map_err(|_| PanelError::Macro("invalid variable after $".to_string()))?;
                tokens.push(Token::Variable(n));
            }
            '0'..='9' | '.' => {
                let mut num = String::from(c);
                while let Some(d) = chars.next_if(|p| p.is_ascii_digit() || *p == '.') {
                    num.push(d);
                }
                let v: f64 = num
                    .parse()
                    .map_err(|_| PanelError::Macro(format!("invalid number: {num}")))?;
                tokens.push(Token::Number(v));
            }
            _ => {
                return Err(PanelError::Macro(format!(
                    "unexpected character in expression: {c}"
                )));
            }
        }
    }

    Ok(tokens)
}

type Parsed<'a> = (Rc<Expr>, &'a [Token]);

fn parse_additive(tokens: &[Token]) -> Result<Parsed<'_>, PanelError> {
    let (mut left, mut rest) = parse_multiplicative(tokens)?;

    while let Some((Token::Op(op @ (BinaryOp::Add | BinaryOp::Sub)), tail)) = rest.split_first() {
        let (right, new_rest) = parse_multiplicative(tail)?;
        left = Rc::new(Expr::Binary {
            op: *op,
            lhs: left,
            rhs: right,
        });
        rest = new_rest;
    }

    Ok((left, rest))
}

fn parse_multiplicative(tokens: &[Token]) -> Result<Parsed<'_>, PanelError> {
    let (mut left, mut rest) = parse_unary(tokens)?;

    while let Some((Token::Op(op @ (BinaryOp::Mul | BinaryOp::Div)), tail)) = rest.split_first() {
        let (right, new_rest) = parse_unary(tail)?;
        left = Rc::new(Expr::Binary {
            op: *op,
            lhs: left,
            rhs: right,
        });
        rest = new_rest;
    }

    Ok((left, rest))
}

fn parse_unary(tokens: &[Token]) -> Result<Parsed<'_>, PanelError> {
    let Some((first, tail)) = tokens.split_first() else {
        return Err(PanelError::Macro("unexpected end of expression".to_string()));
    };
    match first {
        Token::Op(BinaryOp::Add) => parse_unary(tail),
        Token::Op(BinaryOp::Sub) => {
            let (inner, rest) = parse_unary(tail)?;
            let node = match inner.as_ref() {
                Expr::Constant(v) => Expr::constant(-v),
                _ => Rc::new(Expr::Negate(inner)),
            };
            Ok((node, rest))
        }
        Token::LParen => {
            let (inner, rest) = parse_additive(tail)?;
            match rest.split_first() {
                Some((Token::RParen, after)) => Ok((inner, after)),
                _ => Err(PanelError::Macro("missing ')'".to_string())),
            }
        }
        Token::Number(n) => Ok((Expr::constant(*n), tail)),
        Token::Variable(n) => Ok((Rc::new(Expr::Variable(*n)), tail)),
        Token::Op(_) | Token::RParen => Err(PanelError::Macro(
            "expected number, variable, or '('".to_string(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::units::MM_PER_INCH;

    fn parsed(text: &str) -> Rc<Expr> {
        match Expr::parse(text) {
            Ok(node) => node,
            Err(e) => panic!("`{text}` should parse: {e}"),
        }
    }

    #[test]
    fn ut_expr_001_precedence_and_evaluation() {
        let vars = HashMap::from([(1, 2.0), (2, 3.0)]);
        assert!((parsed("1+$1x$2").eval(&vars) - 7.0).abs() < 1e-12);
        assert!((parsed("(1+$1)x$2").eval(&vars) - 9.0).abs() < 1e-12);
        assert!((parsed("-$1+10/4").eval(&vars) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn ut_expr_002_display_round_trips_structure() {
        for text in ["$1x0.5+2", "($1+1)x2", "$1-($2-$3)", "$1/($2x3)", "-$1"] {
            assert_eq!(parsed(text).to_string(), text);
        }
    }

    #[test]
    fn ut_expr_003_constant_folding() {
        let node = Expr::optimize(&parsed("2x3+4"));
        assert_eq!(node.constant_value(), Some(10.0));
    }

    #[test]
    fn ut_expr_004_identity_elimination() {
        assert_eq!(Expr::optimize(&parsed("$1+0")).to_string(), "$1");
        assert_eq!(Expr::optimize(&parsed("1x$1")).to_string(), "$1");
        assert_eq!(Expr::optimize(&parsed("0x$1")).to_string(), "0");
        assert_eq!(Expr::optimize(&parsed("0/$1")).to_string(), "0");
        assert_eq!(Expr::optimize(&parsed("$1/1")).to_string(), "$1");
    }

    #[test]
    fn ut_expr_005_unit_conversion_round_trip_is_identity() {
        let original = parsed("$1x2+$2");
        let inch = Expr::divide(&original, MM_PER_INCH);
        let back = Expr::multiply(&inch, MM_PER_INCH);
        let vars = HashMap::from([(1, 1.5), (2, 0.25)]);
        assert!((back.eval(&vars) - original.eval(&vars)).abs() < 1e-12);

        let var = parsed("$3");
        let back = Expr::multiply(&Expr::divide(&var, MM_PER_INCH), MM_PER_INCH);
        assert_eq!(back.to_string(), "$3");
    }

    #[test]
    fn ut_expr_006_rotation_composes_additively() {
        let rotated = Expr::add_constant(&parsed("$4+30"), 90.0);
        assert_eq!(rotated.to_string(), "$4+120");
        let rotated = Expr::add_constant(&parsed("45"), 90.0);
        assert_eq!(rotated.constant_value(), Some(135.0));
    }

    #[test]
    fn ut_expr_007_optimize_shares_untouched_nodes() {
        let node = parsed("$1x$2");
        let optimized = Expr::optimize(&node);
        if let (Expr::Binary { lhs: a, .. }, Expr::Binary { lhs: b, .. }) =
            (node.as_ref(), optimized.as_ref())
        {
            assert!(Rc::ptr_eq(a, b));
        } else {
            panic!("expected binary nodes");
        }
    }

    #[test]
    fn bc_expr_001_division_by_zero_is_zero() {
        let node = parsed("$1/0");
        assert!(node.eval(&HashMap::from([(1, 5.0)])).abs() < f64::EPSILON);
    }

    #[test]
    fn bc_expr_002_malformed_input_is_rejected() {
        assert!(Expr::parse("(1+2").is_err());
        assert!(Expr::parse("1+").is_err());
        assert!(Expr::parse("1 ? 2").is_err());
        assert!(Expr::parse("1 2").is_err());
    }

    #[test]
    fn bc_expr_003_negative_constants_are_parenthesised_inside() {
        let node = Rc::new(Expr::Binary {
            op: BinaryOp::Add,
            lhs: Rc::new(Expr::Variable(1)),
            rhs: Expr::constant(-2.5),
        });
        assert_eq!(node.to_string(), "$1+(-2.5)");
        assert_eq!(Expr::constant(-2.5).to_string(), "-2.5");
    }
}
