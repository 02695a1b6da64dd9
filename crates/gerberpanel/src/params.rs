//! Panelization parameters with clamping setters and fab presets.

use serde::{Deserialize, Serialize};

/// Gap between boards, mm.
pub const GAP_RANGE: (f64, f64) = (1.0, 10.0);
/// Rail height, mm.
pub const RAIL_RANGE: (f64, f64) = (5.0, 20.0);
/// Upper bound of the bite width, mm. The lower bound is `2·arc + 0.5`.
pub const BITE_MAX: f64 = 15.0;
/// Corner arc radius of a bite slot, mm.
pub const ARC_RANGE: (f64, f64) = (0.25, 2.0);
/// Tabs per gap.
pub const BITES_RANGE: (u32, u32) = (0, 10);
/// Mouse-bite hole radius, mm.
pub const HOLE_RADIUS_RANGE: (f64, f64) = (0.1, 0.5);
/// Clearance between neighbouring mouse-bite holes, mm.
pub const HOLE_SPACING_RANGE: (f64, f64) = (0.5, 5.0);
/// Coordinate merge tolerance, mm.
pub const TOLERANCE_RANGE: (f64, f64) = (0.0, 1.0);

/// Names accepted by [`PanelParameters::preset`].
pub const PRESET_NAMES: [&str; 4] = ["default", "oshpark", "jlcpcb", "pcbway"];

/// Panelization parameters. Every setter clamps to the field's range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanelParameters {
    gap_mm: f64,
    rail_mm: f64,
    bite_mm: f64,
    arc_mm: f64,
    bites_per_gap: u32,
    hole_radius_mm: f64,
    hole_spacing_mm: f64,
    use_vcut: bool,
    vendor_marker: bool,
    merge_tolerance_mm: f64,
}

impl Default for PanelParameters {
    fn default() -> Self {
        Self {
            gap_mm: 2.0,
            rail_mm: 5.0,
            bite_mm: 5.0,
            arc_mm: 1.0,
            bites_per_gap: 2,
            hole_radius_mm: 0.25,
            hole_spacing_mm: 0.75,
            use_vcut: false,
            vendor_marker: false,
            merge_tolerance_mm: crate::units::DEFAULT_TOLERANCE_MM,
        }
    }
}

fn clamp(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

impl PanelParameters {
    /// Parameters of a named preset; `None` for unknown names.
    pub fn preset(name: &str) -> Option<Self> {
        let base = Self::default();
        let mut params = match name.to_ascii_lowercase().as_str() {
            "default" => base,
            "oshpark" => Self {
                gap_mm: 2.5,
                rail_mm: 6.0,
                hole_radius_mm: 0.3,
                hole_spacing_mm: 0.8,
                ..base
            },
            "jlcpcb" => Self {
                gap_mm: 2.0,
                rail_mm: 5.0,
                vendor_marker: true,
                ..base
            },
            "pcbway" => Self {
                gap_mm: 2.0,
                rail_mm: 8.0,
                use_vcut: true,
                ..base
            },
            _ => return None,
        };
        params.reclamp();
        Some(params)
    }

    /// Re-applies every clamp, e.g. after deserialization.
    pub fn reclamp(&mut self) {
        let copy = *self;
        self.set_gap_mm(copy.gap_mm);
        self.set_rail_mm(copy.rail_mm);
        self.set_arc_mm(copy.arc_mm);
        self.set_bite_mm(copy.bite_mm);
        self.set_bites_per_gap(copy.bites_per_gap);
        self.set_hole_radius_mm(copy.hole_radius_mm);
        self.set_hole_spacing_mm(copy.hole_spacing_mm);
        self.set_merge_tolerance_mm(copy.merge_tolerance_mm);
    }

    /// Gap between boards and between boards and rails, mm.
    pub const fn gap_mm(&self) -> f64 {
        self.gap_mm
    }

    /// Sets the gap, clamped to [`GAP_RANGE`].
    pub fn set_gap_mm(&mut self, value: f64) {
        self.gap_mm = clamp(value, GAP_RANGE);
    }

    /// Rail height, mm.
    pub const fn rail_mm(&self) -> f64 {
        self.rail_mm
    }

    /// Sets the rail height, clamped to [`RAIL_RANGE`].
    pub fn set_rail_mm(&mut self, value: f64) {
        self.rail_mm = clamp(value, RAIL_RANGE);
    }

    /// Tab width, mm.
    pub const fn bite_mm(&self) -> f64 {
        self.bite_mm
    }

    /// Sets the tab width, clamped to `[2·arc + 0.5, BITE_MAX]`.
    pub fn set_bite_mm(&mut self, value: f64) {
        self.bite_mm = clamp(value, (self.min_bite_mm(), BITE_MAX));
    }

    /// Smallest tab width the current arc radius allows.
    pub fn min_bite_mm(&self) -> f64 {
        2.0f64.mul_add(self.arc_mm, 0.5)
    }

    /// Corner arc radius of the bite slots, mm.
    pub const fn arc_mm(&self) -> f64 {
        self.arc_mm
    }

    /// Sets the arc radius, clamped to [`ARC_RANGE`]; the bite width is re-clamped.
    pub fn set_arc_mm(&mut self, value: f64) {
        self.arc_mm = clamp(value, ARC_RANGE);
        self.bite_mm = clamp(self.bite_mm, (self.min_bite_mm(), BITE_MAX));
    }

    /// Tabs in every inter-row gap.
    pub const fn bites_per_gap(&self) -> u32 {
        self.bites_per_gap
    }

    /// Sets the tab count, clamped to [`BITES_RANGE`].
    pub fn set_bites_per_gap(&mut self, value: u32) {
        self.bites_per_gap = value.clamp(BITES_RANGE.0, BITES_RANGE.1);
    }

    /// Mouse-bite hole radius, mm.
    pub const fn hole_radius_mm(&self) -> f64 {
        self.hole_radius_mm
    }

    /// Sets the hole radius, clamped to [`HOLE_RADIUS_RANGE`].
    pub fn set_hole_radius_mm(&mut self, value: f64) {
        self.hole_radius_mm = clamp(value, HOLE_RADIUS_RANGE);
    }

    /// Clearance between mouse-bite holes, mm.
    pub const fn hole_spacing_mm(&self) -> f64 {
        self.hole_spacing_mm
    }

    /// Sets the hole clearance, clamped to [`HOLE_SPACING_RANGE`].
    pub fn set_hole_spacing_mm(&mut self, value: f64) {
        self.hole_spacing_mm = clamp(value, HOLE_SPACING_RANGE);
    }

    /// Mark V-score lines on the top rail silkscreen.
    pub const fn use_vcut(&self) -> bool {
        self.use_vcut
    }

    /// Enables or disables V-score marks.
    pub fn set_use_vcut(&mut self, value: bool) {
        self.use_vcut = value;
    }

    /// Print the vendor order-number marker on the top rail.
    pub const fn vendor_marker(&self) -> bool {
        self.vendor_marker
    }

    /// Enables or disables the vendor marker.
    pub fn set_vendor_marker(&mut self, value: bool) {
        self.vendor_marker = value;
    }

    /// Coordinate equality tolerance, mm.
    pub const fn merge_tolerance_mm(&self) -> f64 {
        self.merge_tolerance_mm
    }

    /// Sets the tolerance, clamped to [`TOLERANCE_RANGE`].
    pub fn set_merge_tolerance_mm(&mut self, value: f64) {
        self.merge_tolerance_mm = clamp(value, TOLERANCE_RANGE);
    }

    /// Distance between neighbouring mouse-bite hole centers, mm.
    pub fn hole_pitch_mm(&self) -> f64 {
        2.0f64.mul_add(self.hole_radius_mm, self.hole_spacing_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ut_par_001_setters_clamp() {
        let mut p = PanelParameters::default();
        p.set_gap_mm(0.2);
        assert!((p.gap_mm() - 1.0).abs() < f64::EPSILON);
        p.set_rail_mm(50.0);
        assert!((p.rail_mm() - 20.0).abs() < f64::EPSILON);
        p.set_bites_per_gap(99);
        assert_eq!(p.bites_per_gap(), 10);
        p.set_hole_radius_mm(f64::NAN);
        assert!((p.hole_radius_mm() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn ut_par_002_bite_minimum_follows_arc() {
        let mut p = PanelParameters::default();
        p.set_arc_mm(0.75);
        p.set_bite_mm(1.0);
        assert!((p.bite_mm() - 2.0).abs() < 1e-12);
        p.set_bite_mm(4.0);
        p.set_arc_mm(2.0);
        assert!((p.bite_mm() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn ut_par_003_presets() {
        for name in PRESET_NAMES {
            assert!(PanelParameters::preset(name).is_some(), "{name}");
        }
        assert!(PanelParameters::preset("jlcpcb").is_some_and(|p| p.vendor_marker()));
        assert!(PanelParameters::preset("PCBWay").is_some_and(|p| p.use_vcut()));
        assert!(PanelParameters::preset("acme").is_none());
    }

    #[test]
    fn ut_par_004_serde_rejects_unknown_fields() {
        let json = serde_json::to_string(&PanelParameters::default()).unwrap_or_default();
        assert!(serde_json::from_str::<PanelParameters>(&json).is_ok());
        let bad = json.replacen('{', "{\"colour\":1,", 1);
        assert!(serde_json::from_str::<PanelParameters>(&bad).is_err());
    }

    #[test]
    fn bc_par_001_zero_tabs_allowed() {
        let mut p = PanelParameters::default();
        p.set_bites_per_gap(0);
        assert_eq!(p.bites_per_gap(), 0);
        assert!((p.hole_pitch_mm() - 1.25).abs() < 1e-12);
    }
}
