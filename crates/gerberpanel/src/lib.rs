#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::indexing_slicing)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `gerberpanel`: PCB panelization with Gerber/Excellon parsing, composition
//! of board copies with rails and mouse-bite tabs, and a WASM surface for an
//! interactive planner.

/// Lazily compiled regex; `None` if the pattern does not compile.
macro_rules! regex {
    ($pattern:literal) => {{
        static CELL: std::sync::OnceLock<Option<regex::Regex>> = std::sync::OnceLock::new();
        CELL.get_or_init(|| regex::Regex::new($pattern).ok()).as_ref()
    }};
}

pub(crate) fn capture<'t>(re: Option<&regex::Regex>, text: &'t str) -> Option<regex::Captures<'t>> {
    re.and_then(|re| re.captures(text))
}

pub mod aperture;
pub mod compose;
pub mod config;
pub mod dxf;
pub mod error;
pub mod excellon;
pub mod export;
pub mod fixups;
pub mod geometry;
pub mod gerber;
pub mod layer;
pub mod mask;
pub mod outline;
pub mod params;
pub mod planner;
pub mod synth;
pub mod units;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use crate::excellon::ExcellonFile;
use crate::export::BoardSource;
use crate::geometry::{excellon_mesh, gerber_mesh, LayerGeometry, LayerMeta, Rotation};
use crate::gerber::GerberFile;
use crate::params::PanelParameters;
use crate::planner::PanelPlanner;

thread_local! {
    static LAST_GEOMETRY: RefCell<Option<LayerGeometry>> = const { RefCell::new(None) };
}

fn store_geometry(geom: LayerGeometry) {
    LAST_GEOMETRY.with(|g| {
        *g.borrow_mut() = Some(geom);
    });
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Initialize the WASM module. Sets up the panic hook for debugging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Parse a Gerber RS-274X file and build its preview mesh.
///
/// Returns `LayerMeta` as a `JsValue` via `serde-wasm-bindgen`.
/// Geometry buffers are stored internally; retrieve with
/// [`get_positions`] and [`get_indices`].
///
/// # Errors
///
/// Returns a descriptive error string if parsing fails.
#[wasm_bindgen]
pub fn parse_gerber(data: &[u8]) -> Result<JsValue, JsValue> {
    let meta = parse_gerber_internal(data).map_err(|e| JsValue::from_str(&e))?;
    serde_wasm_bindgen::to_value(&meta).map_err(js_error)
}

/// Internal parse logic shared between the wasm export and native tests.
#[doc(hidden)]
pub fn parse_gerber_internal(data: &[u8]) -> Result<LayerMeta, String> {
    if data.is_empty() {
        return Err("empty input".to_string());
    }
    let text = String::from_utf8_lossy(data);
    let file = GerberFile::parse("layer", &text).map_err(|e| e.to_string())?;
    let geom = gerber_mesh(&file);
    let meta = LayerMeta::of(&geom);
    store_geometry(geom);
    Ok(meta)
}

/// Parse an Excellon drill file and build its preview mesh.
///
/// # Errors
///
/// Returns a descriptive error string if parsing fails.
#[wasm_bindgen]
pub fn parse_excellon(data: &[u8]) -> Result<JsValue, JsValue> {
    let meta = parse_excellon_internal(data).map_err(|e| JsValue::from_str(&e))?;
    serde_wasm_bindgen::to_value(&meta).map_err(js_error)
}

/// Internal parse logic shared between the wasm export and native tests.
#[doc(hidden)]
pub fn parse_excellon_internal(data: &[u8]) -> Result<LayerMeta, String> {
    let text = String::from_utf8_lossy(data);
    let file = ExcellonFile::parse("drill", &text).map_err(|e| e.to_string())?;
    let geom = excellon_mesh(&file);
    let meta = LayerMeta::of(&geom);
    store_geometry(geom);
    Ok(meta)
}

/// Position buffer of the last previewed layer, `[x0, y0, x1, y1, ...]`.
/// Empty if no layer has been parsed yet.
#[wasm_bindgen]
pub fn get_positions() -> Vec<f32> {
    LAST_GEOMETRY.with(|g| {
        g.borrow()
            .as_ref()
            .map_or_else(Vec::new, |geom| geom.positions.clone())
    })
}

/// Triangle-list indices of the last previewed layer.
#[wasm_bindgen]
pub fn get_indices() -> Vec<u32> {
    LAST_GEOMETRY.with(|g| {
        g.borrow()
            .as_ref()
            .map_or_else(Vec::new, |geom| geom.indices.clone())
    })
}

/// Clear-polarity index ranges of the last previewed layer, flattened as
/// `[start0, end0, start1, end1, ...]`.
#[wasm_bindgen]
pub fn get_clear_ranges() -> Vec<u32> {
    LAST_GEOMETRY.with(|g| {
        g.borrow().as_ref().map_or_else(Vec::new, |geom| {
            let mut flat = Vec::with_capacity(geom.clear_ranges.len() * 2);
            for &(start, end) in &geom.clear_ranges {
                flat.push(start);
                flat.push(end);
            }
            flat
        })
    })
}

/// Names of the built-in parameter presets.
#[wasm_bindgen]
pub fn preset_names() -> Vec<JsValue> {
    params::PRESET_NAMES.iter().map(|n| JsValue::from_str(n)).collect()
}

fn flatten(points: &[(f64, f64)]) -> Vec<f64> {
    points.iter().flat_map(|&(x, y)| [x, y]).collect()
}

/// A loaded board and its panel planner, driven by the host UI.
#[wasm_bindgen]
#[derive(Debug)]
pub struct PanelHandle {
    source: BoardSource,
    planner: PanelPlanner,
}

impl PanelHandle {
    /// Builds a handle from `(name, text)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the loading errors of [`BoardSource::from_files`].
    pub fn from_files(
        files: Vec<(String, String)>,
        params: PanelParameters,
    ) -> Result<Self, error::PanelError> {
        let source = BoardSource::from_files(files)?;
        let outline = match source.outline(params.merge_tolerance_mm().max(1e-6)) {
            Ok(outline) => Some(outline),
            Err(error::PanelError::MissingLayer(reason)) => {
                tracing::warn!(%reason, "panelization disabled");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            source,
            planner: PanelPlanner::new(params, outline),
        })
    }

    /// The planner.
    pub const fn planner(&self) -> &PanelPlanner {
        &self.planner
    }

    /// Runs the export pipeline in memory.
    ///
    /// # Errors
    ///
    /// See [`export::panelize`].
    pub fn panelize_with(
        &self,
        progress: &mut dyn FnMut(&str) -> bool,
    ) -> Result<export::Panel, error::PanelError> {
        export::panelize(&self.source, &self.planner, progress)
    }
}

#[wasm_bindgen]
impl PanelHandle {
    /// Loads `files`, an array of `[name, text]` pairs, with optional
    /// parameters (a `PanelParameters` object; defaults when undefined).
    ///
    /// # Errors
    ///
    /// Returns an error string when a file or the parameters are rejected.
    pub fn load(files: JsValue, params: JsValue) -> Result<Self, JsValue> {
        let files: Vec<(String, String)> = serde_wasm_bindgen::from_value(files).map_err(js_error)?;
        let params = if params.is_undefined() || params.is_null() {
            PanelParameters::default()
        } else {
            let mut p: PanelParameters = serde_wasm_bindgen::from_value(params).map_err(js_error)?;
            p.reclamp();
            p
        };
        Self::from_files(files, params).map_err(js_error)
    }

    /// Sets the board grid.
    pub fn set_grid(&mut self, columns: usize, rows: usize) {
        self.planner.set_grid(columns, rows);
    }

    /// Sets the board rotation in degrees, a multiple of 90.
    ///
    /// # Errors
    ///
    /// Returns an error for other angles.
    pub fn set_rotation(&mut self, degrees: f64) -> Result<(), JsValue> {
        let rotation = Rotation::from_degrees(degrees)
            .ok_or_else(|| JsValue::from_str("rotation must be a multiple of 90 degrees"))?;
        self.planner.set_rotation(rotation);
        Ok(())
    }

    /// Replaces the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when `params` is not a `PanelParameters` object.
    pub fn set_params(&mut self, params: JsValue) -> Result<(), JsValue> {
        let mut p: PanelParameters = serde_wasm_bindgen::from_value(params).map_err(js_error)?;
        p.reclamp();
        self.planner.set_params(p);
        Ok(())
    }

    /// Current parameters as a plain object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn params(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.planner.params()).map_err(js_error)
    }

    /// Screen scale for drag deltas.
    pub fn set_pixels_per_mm(&mut self, pixels_per_mm: f64) {
        self.planner.set_pixels_per_mm(pixels_per_mm);
    }

    /// Uses exact outline geometry instead of the raster mask.
    pub fn set_exact_connectivity(&mut self, exact: bool) {
        self.planner.set_exact_connectivity(exact);
    }

    /// "No outline", "Valid" or the number of disconnected tabs.
    pub fn status(&self) -> String {
        self.planner.status()
    }

    /// True when every tab attaches.
    pub fn is_valid(&self) -> bool {
        self.planner.is_valid()
    }

    /// `[width, height]` of the panel, mm.
    pub fn panel_size(&self) -> Vec<f64> {
        let (w, h) = self.planner.panel_size_mm();
        vec![w, h]
    }

    /// Rail origins, `[x0, y0, x1, y1]` in cm.
    pub fn get_rails_origins(&self) -> Vec<f64> {
        flatten(&self.planner.rails_origins())
    }

    /// Board origins, flattened, cm.
    pub fn get_pcbs_origins(&self) -> Vec<f64> {
        flatten(&self.planner.pcbs_origins())
    }

    /// Tab origins, flattened, cm.
    pub fn get_mouse_bites_origins(&self) -> Vec<f64> {
        flatten(&self.planner.mouse_bites_origins())
    }

    /// Connection flag per tab.
    pub fn tab_connected(&self) -> Vec<u8> {
        self.planner
            .layout()
            .tabs
            .iter()
            .map(|t| u8::from(t.connected))
            .collect()
    }

    /// Begins dragging `tab`.
    pub fn start_move(&mut self, tab: usize) -> bool {
        self.planner.start_move(tab)
    }

    /// Drags `tab` by a screen delta in pixels.
    pub fn move_by(&mut self, tab: usize, dx: f64, dy: f64) -> bool {
        self.planner.move_by(tab, dx, dy)
    }

    /// Commits the drag of `tab`.
    pub fn end_move(&mut self, tab: usize) -> bool {
        self.planner.end_move(tab)
    }

    /// Width of the substrate mask, 0 without an outline.
    pub fn mask_width(&self) -> u32 {
        self.planner.mask().map_or(0, mask::OutlineMask::width)
    }

    /// Height of the substrate mask, 0 without an outline.
    pub fn mask_height(&self) -> u32 {
        self.planner.mask().map_or(0, mask::OutlineMask::height)
    }

    /// RGBA preview of the substrate mask.
    pub fn mask_rgba(&self) -> Vec<u8> {
        self.planner
            .mask()
            .map_or_else(Vec::new, mask::OutlineMask::to_rgba)
    }

    /// Runs the export pipeline and returns `{ name: text }`.
    ///
    /// `progress` is called with a label before each layer and each board
    /// file; returning `false` cancels.
    ///
    /// # Errors
    ///
    /// Returns an error string when the layout is invalid, the export was
    /// cancelled or a source fails to parse.
    pub fn panelize(&self, progress: &js_sys::Function) -> Result<JsValue, JsValue> {
        let mut callback = |label: &str| {
            progress
                .call1(&JsValue::NULL, &JsValue::from_str(label))
                .is_ok_and(|v| v.as_bool().unwrap_or(true))
        };
        let panel = self.panelize_with(&mut callback).map_err(js_error)?;
        serde_wasm_bindgen::to_value(panel.files()).map_err(js_error)
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn wasm_preset_names_listed() {
        assert_eq!(preset_names().len(), 4);
    }

    #[wasm_bindgen_test]
    fn wasm_rotation_rejects_odd_angles() {
        let files = vec![(
            "board.gm1".to_string(),
            include_str!("../tests/fixtures/rect/board-Edge_Cuts.gm1").to_string(),
        )];
        let Ok(mut handle) = PanelHandle::from_files(files, PanelParameters::default()) else {
            return;
        };
        assert!(handle.set_rotation(45.0).is_err());
        assert!(handle.set_rotation(90.0).is_ok());
    }
}
