//! Parameter files and export options.
//!
//! A parameter file is JSON. It may name a `preset` to start from; every
//! other key overrides one field and goes through the clamping setter.
//!
//! ```json
//! { "preset": "oshpark", "gap_mm": 3.0, "bites_per_gap": 1 }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::PanelError;
use crate::geometry::Rotation;
use crate::params::{PanelParameters, PRESET_NAMES};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterPatch {
    preset: Option<String>,
    gap_mm: Option<f64>,
    rail_mm: Option<f64>,
    bite_mm: Option<f64>,
    arc_mm: Option<f64>,
    bites_per_gap: Option<u32>,
    hole_radius_mm: Option<f64>,
    hole_spacing_mm: Option<f64>,
    use_vcut: Option<bool>,
    vendor_marker: Option<bool>,
    merge_tolerance_mm: Option<f64>,
}

impl ParameterPatch {
    fn apply(&self, params: &mut PanelParameters) {
        if let Some(v) = self.gap_mm {
            params.set_gap_mm(v);
        }
        if let Some(v) = self.rail_mm {
            params.set_rail_mm(v);
        }
        // Arc first: it bounds the bite from below.
        if let Some(v) = self.arc_mm {
            params.set_arc_mm(v);
        }
        if let Some(v) = self.bite_mm {
            params.set_bite_mm(v);
        }
        if let Some(v) = self.bites_per_gap {
            params.set_bites_per_gap(v);
        }
        if let Some(v) = self.hole_radius_mm {
            params.set_hole_radius_mm(v);
        }
        if let Some(v) = self.hole_spacing_mm {
            params.set_hole_spacing_mm(v);
        }
        if let Some(v) = self.use_vcut {
            params.set_use_vcut(v);
        }
        if let Some(v) = self.vendor_marker {
            params.set_vendor_marker(v);
        }
        if let Some(v) = self.merge_tolerance_mm {
            params.set_merge_tolerance_mm(v);
        }
    }
}

/// Looks up a preset, reporting unknown names as [`PanelError::Config`].
///
/// # Errors
///
/// Returns [`PanelError::Config`] when `name` is not a known preset.
pub fn preset(name: &str) -> Result<PanelParameters, PanelError> {
    PanelParameters::preset(name).ok_or_else(|| PanelError::Config {
        path: PathBuf::from(name),
        message: format!(
            "unknown preset `{name}`; expected one of {}",
            PRESET_NAMES.join(", ")
        ),
    })
}

/// Parses parameter JSON.
///
/// A `preset` key in the text wins over `fallback_preset`; with neither the
/// defaults are used.
///
/// # Errors
///
/// Returns [`PanelError::Config`] for malformed JSON, unknown keys or an
/// unknown preset.
pub fn parse_parameters(
    origin: &Path,
    text: &str,
    fallback_preset: Option<&str>,
) -> Result<PanelParameters, PanelError> {
    let patch: ParameterPatch = serde_json::from_str(text).map_err(|e| PanelError::Config {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut params = match patch.preset.as_deref().or(fallback_preset) {
        Some(name) => preset(name)?,
        None => PanelParameters::default(),
    };
    patch.apply(&mut params);
    debug!(path = %origin.display(), ?params, "loaded parameters");
    Ok(params)
}

/// Loads a JSON parameter file.
///
/// # Errors
///
/// Returns [`PanelError::Io`] when the file cannot be read and
/// [`PanelError::Config`] when its content is rejected.
pub fn load_parameters(path: &Path, preset: Option<&str>) -> Result<PanelParameters, PanelError> {
    let text = std::fs::read_to_string(path).map_err(|e| PanelError::io(path, e))?;
    parse_parameters(path, &text, preset)
}

/// Controls one run of the export pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Keep the temporary directory an archive was unpacked into.
    pub keep_temp: bool,
    /// Where [`crate::export::Panel::write`] puts the files.
    pub output_dir: PathBuf,
    /// Board rows.
    pub rows: usize,
    /// Board columns.
    pub columns: usize,
    /// Board rotation.
    pub rotation: Rotation,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            keep_temp: false,
            output_dir: PathBuf::from("panel"),
            rows: 1,
            columns: 1,
            rotation: Rotation::R0,
        }
    }
}
