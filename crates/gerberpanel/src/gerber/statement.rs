//! RS-274X statement model.

use crate::geometry::Polarity;
use crate::units::Notation;

/// Operation code of a coordinate statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DCode {
    /// `D01`, draw with the current interpolation.
    Interpolate,
    /// `D02`, move without drawing.
    Move,
    /// `D03`, flash the current aperture.
    Flash,
}

impl DCode {
    /// Numeric code.
    pub const fn number(self) -> u8 {
        match self {
            Self::Interpolate => 1,
            Self::Move => 2,
            Self::Flash => 3,
        }
    }
}

/// Interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// `G01`
    Linear,
    /// `G02`
    Clockwise,
    /// `G03`
    CounterClockwise,
}

impl Interpolation {
    /// G-code number.
    pub const fn number(self) -> u8 {
        match self {
            Self::Linear => 1,
            Self::Clockwise => 2,
            Self::CounterClockwise => 3,
        }
    }

    /// Mirror image of an arc direction.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::Linear => Self::Linear,
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Arc quadrant mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadrantMode {
    /// `G74`, unsigned offsets, arcs under 90 degrees.
    Single,
    /// `G75`, signed offsets.
    Multi,
}

/// A coordinate statement `[Gnn]X..Y..[I..J..]Dnn`.
///
/// Coordinates are decoded into the file's unit. After normalization every
/// operation carries absolute `x` and `y`, and arcs carry signed `i` and `j`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Operation {
    /// Interpolation mode set on the same line, if any.
    pub interpolation: Option<Interpolation>,
    /// X coordinate.
    pub x: Option<f64>,
    /// Y coordinate.
    pub y: Option<f64>,
    /// X offset to the arc center.
    pub i: Option<f64>,
    /// Y offset to the arc center.
    pub j: Option<f64>,
    /// Operation code; `None` repeats the previous one.
    pub code: Option<DCode>,
}

impl Operation {
    /// A `D02` move to `(x, y)`.
    pub const fn move_to(x: f64, y: f64) -> Self {
        Self {
            interpolation: None,
            x: Some(x),
            y: Some(y),
            i: None,
            j: None,
            code: Some(DCode::Move),
        }
    }

    /// A `D01` draw to `(x, y)`.
    pub const fn line_to(x: f64, y: f64) -> Self {
        Self {
            interpolation: None,
            x: Some(x),
            y: Some(y),
            i: None,
            j: None,
            code: Some(DCode::Interpolate),
        }
    }
}

/// One RS-274X statement, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `G04 text*`
    Comment(String),
    /// `%LPD*%` / `%LPC*%`
    Polarity(Polarity),
    /// `Dnn*` with `nn >= 10`.
    SelectAperture(u32),
    /// Stand-alone `G01`/`G02`/`G03`.
    Interpolation(Interpolation),
    /// `G74`/`G75`
    QuadrantMode(QuadrantMode),
    /// `G36`
    RegionBegin,
    /// `G37`
    RegionEnd,
    /// Coordinate statement.
    Operation(Operation),
    /// `G90`/`G91`, folded away by normalization.
    Notation(Notation),
    /// `%MIA..B..*%`, folded away by normalization.
    Mirror {
        /// Mirror X (negate A axis).
        a: bool,
        /// Mirror Y (negate B axis).
        b: bool,
    },
    /// `%OFA..B..*%`, folded away by normalization.
    Offset {
        /// A-axis offset.
        a: f64,
        /// B-axis offset.
        b: f64,
    },
    /// `%SFA..B..*%`, folded away by normalization.
    Scale {
        /// A-axis factor.
        a: f64,
        /// B-axis factor.
        b: f64,
    },
    /// `%ASAXBY*%` / `%ASAYBX*%`, folded away by normalization.
    AxisSelect {
        /// True for `AYBX`.
        swapped: bool,
    },
    /// `%IR..*%`, folded away by normalization.
    ImageRotation(f64),
    /// `%IPPOS*%` / `%IPNEG*%`, folded away by normalization.
    ImagePolarity {
        /// True for a negative image.
        negative: bool,
    },
    /// `%SRX..Y..I..J..*%` opens a block; all counts `None` closes it.
    StepRepeat {
        /// Repeats along X.
        x_repeat: u32,
        /// Repeats along Y.
        y_repeat: u32,
        /// X step.
        i: f64,
        /// Y step.
        j: f64,
    },
    /// `%SR*%`
    StepRepeatEnd,
    /// `%TF..*%`, `%TA..*%`, `%TO..*%`, `%TD..*%` body.
    Attribute(String),
    /// Anything else, verbatim.
    Unknown {
        /// Statement text without terminators.
        text: String,
        /// True when it came from a `%...%` block.
        extended: bool,
    },
    /// `M02*`
    EndOfFile,
}

impl Statement {
    /// True for file-level `%TF` attributes.
    pub fn is_file_attribute(&self) -> bool {
        matches!(self, Self::Attribute(body) if body.starts_with("TF"))
    }
}
