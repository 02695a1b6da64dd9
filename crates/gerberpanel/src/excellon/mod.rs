//! Excellon drill file model.

pub mod parser;
pub mod types;
pub mod writer;

pub use types::{Hit, Rout, RoutMode, RoutNode, Slot, Tool};

use indexmap::IndexMap;

use crate::error::PanelError;
use crate::geometry::{BoundingBox, Point, Rotation};
use crate::units::{CoordinateFormat, FileSettings, Units};

/// A parsed drill file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcellonFile {
    /// Source file name, used in diagnostics.
    pub name: String,
    /// Coordinate settings.
    pub settings: FileSettings,
    /// Tools by number, in definition order.
    pub tools: IndexMap<u32, Tool>,
    /// Drill hits.
    pub hits: Vec<Hit>,
    /// Drilled slots.
    pub slots: Vec<Slot>,
    /// Routed paths.
    pub routs: Vec<Rout>,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

impl ExcellonFile {
    /// An empty file with the given settings.
    pub fn empty(name: &str, settings: FileSettings) -> Self {
        Self {
            name: name.to_string(),
            settings,
            tools: IndexMap::new(),
            hits: Vec::new(),
            slots: Vec::new(),
            routs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Parses Excellon text.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Parse`] when the text is malformed.
    pub fn parse(name: &str, source: &str) -> Result<Self, PanelError> {
        parser::parse(name, source)
    }

    /// Emits Excellon text.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InternalInvariant`] when a coordinate overflows.
    pub fn to_excellon(&self) -> Result<String, PanelError> {
        writer::write(self)
    }

    /// True when the file drills nothing.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.slots.is_empty() && self.routs.is_empty()
    }

    fn for_each_point(&mut self, mut f: impl FnMut(&mut Point)) {
        for hit in &mut self.hits {
            f(&mut hit.position);
        }
        for slot in &mut self.slots {
            f(&mut slot.start);
            f(&mut slot.end);
        }
        for node in self.routs.iter_mut().flat_map(|r| r.nodes.iter_mut()) {
            f(&mut node.position);
        }
    }

    /// Converts coordinates and diameters to `target` units.
    pub fn convert_units(&mut self, target: Units) {
        let from = self.settings.units;
        if from == target {
            return;
        }
        let factor = from.factor_to(target);
        self.for_each_point(|p| *p = p.scaled(factor));
        for node in self.routs.iter_mut().flat_map(|r| r.nodes.iter_mut()) {
            node.radius = node.radius.map(|r| r * factor);
            node.center_offset = node.center_offset.map(|c| c.scaled(factor));
        }
        for tool in self.tools.values_mut() {
            tool.diameter *= factor;
        }
        self.settings.units = target;
    }

    /// Converts to inches.
    pub fn to_inch(&mut self) {
        self.convert_units(Units::Inch);
    }

    /// Converts to millimetres with at least a 4.6 format.
    pub fn to_metric(&mut self) {
        if self.settings.units == Units::Metric {
            return;
        }
        self.convert_units(Units::Metric);
        let format = self.settings.format;
        self.settings.format =
            CoordinateFormat::new(format.integer.max(4), format.fraction.max(6));
    }

    /// Translates every position by `(dx, dy)`.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        self.for_each_point(|p| *p = p.offset(dx, dy));
    }

    /// Rotates every position about `center`; arc offsets rotate as vectors.
    pub fn rotate(&mut self, rotation: Rotation, center: Point) {
        if rotation == Rotation::R0 {
            return;
        }
        self.for_each_point(|p| *p = p.rotated(rotation, center));
        for node in self.routs.iter_mut().flat_map(|r| r.nodes.iter_mut()) {
            node.center_offset = node.center_offset.map(|c| c.rotated(rotation, Point::default()));
        }
    }

    /// Hit centers, slot ends and rout nodes.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.hits
            .iter()
            .map(|h| h.position)
            .chain(self.slots.iter().flat_map(|s| [s.start, s.end]))
            .chain(self.routs.iter().flat_map(|r| r.nodes.iter().map(|n| n.position)))
    }

    /// Bounding box of [`Self::points`].
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = BoundingBox::default();
        for p in self.points() {
            bounds.update(p.x, p.y);
        }
        bounds
    }

    /// Splits into plated and non-plated files, keeping tool numbers.
    pub fn split_by_plating(&self) -> (Self, Self) {
        let mut plated = Self::empty(&self.name, self.settings);
        let mut non_plated = Self::empty(&self.name, self.settings);
        for (number, tool) in &self.tools {
            let target = if tool.plated { &mut plated } else { &mut non_plated };
            target.tools.insert(*number, *tool);
        }
        for hit in &self.hits {
            route(&mut plated, &mut non_plated, hit.tool).hits.push(*hit);
        }
        for slot in &self.slots {
            route(&mut plated, &mut non_plated, slot.tool).slots.push(*slot);
        }
        for rout in &self.routs {
            route(&mut plated, &mut non_plated, rout.tool).routs.push(rout.clone());
        }
        (plated, non_plated)
    }
}

fn route<'a>(plated: &'a mut ExcellonFile, non_plated: &'a mut ExcellonFile, tool: u32) -> &'a mut ExcellonFile {
    if non_plated.tools.contains_key(&tool) {
        non_plated
    } else {
        plated
    }
}
