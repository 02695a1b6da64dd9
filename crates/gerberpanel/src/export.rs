//! Board loading and the panel export pipeline.
//!
//! [`BoardSource`] reads a board's fabrication files from a directory, a zip
//! archive or memory. [`panelize`] then walks the layers in export order and
//! merges rails, board copies and tabs into one file per layer. Output is
//! kept in memory; [`Panel::write`] puts it on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::capture;
use crate::compose::{ExcellonComposition, GerberComposition, Placement};
use crate::config::ExportOptions;
use crate::dxf;
use crate::error::PanelError;
use crate::excellon::ExcellonFile;
use crate::fixups::{ensure_silk_polarity, reorder_drill_routing};
use crate::gerber::GerberFile;
use crate::layer::{is_non_plated_name, LayerKind};
use crate::outline::Outline;
use crate::params::PanelParameters;
use crate::planner::PanelPlanner;
use crate::synth::{MouseBite, Rail, SyntheticLayer};

/// Plated drill output name.
pub const PTH_DRILL: &str = "drill-PTH.drl";
/// Non-plated drill output name.
pub const NPTH_DRILL: &str = "drill-NPTH.drl";

/// Content format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// RS-274X.
    Gerber,
    /// Excellon drill.
    Excellon,
    /// IPC-D-356 netlist; recognised and skipped.
    Ipc356,
    /// ASCII DXF; converted to an edge-cuts layer.
    Dxf,
}

/// Detects the format of `text` from its content.
pub fn detect_format(text: &str) -> Option<SourceFormat> {
    if dxf::is_dxf(text) {
        return Some(SourceFormat::Dxf);
    }
    if text
        .lines()
        .any(|l| l.starts_with("P  JOB") || l.starts_with("317") || l.starts_with("327"))
    {
        return Some(SourceFormat::Ipc356);
    }
    if text.contains("%FS")
        || text.contains("%MO")
        || text.trim_start().starts_with("G04")
        || capture(regex!(r"D0[1-3]\*"), text).is_some()
    {
        return Some(SourceFormat::Gerber);
    }
    if text.lines().any(|l| l.trim() == "M48") || capture(regex!(r"(?m)^T\d+C\d"), text).is_some() {
        return Some(SourceFormat::Excellon);
    }
    None
}

fn has_layer_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            LayerKind::ALL
                .iter()
                .any(|k| k.extension().eq_ignore_ascii_case(ext))
        })
}

/// One classified input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the board root.
    pub name: String,
    /// Target layer.
    pub kind: LayerKind,
    /// Detected content format.
    pub format: SourceFormat,
    /// Gerber or Excellon text; DXF input is already converted.
    pub text: String,
}

/// The fabrication files of one board.
#[derive(Debug, Default)]
pub struct BoardSource {
    files: Vec<SourceFile>,
    temp: Option<TempDir>,
    kept: Option<PathBuf>,
}

impl BoardSource {
    /// Loads a directory or a `.zip` archive.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Io`] or [`PanelError::Archive`] when the input
    /// cannot be read and [`PanelError::UnsupportedFormat`] for layer files
    /// of unknown content.
    pub fn load(path: &Path, keep_temp: bool) -> Result<Self, PanelError> {
        if path.is_dir() {
            return Self::from_dir(path);
        }
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
        if is_zip {
            Self::from_zip(path, keep_temp)
        } else {
            Err(PanelError::UnsupportedFormat(format!(
                "{}: expected a directory or a zip archive",
                path.display()
            )))
        }
    }

    /// Loads every file below `dir`.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn from_dir(dir: &Path) -> Result<Self, PanelError> {
        let mut found = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            let entries = fs::read_dir(&current).map_err(|e| PanelError::io(&current, e))?;
            for entry in entries {
                let path = entry.map_err(|e| PanelError::io(&current, e))?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let bytes = fs::read(&path).map_err(|e| PanelError::io(&path, e))?;
                let name = path
                    .strip_prefix(dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                found.push((name, String::from_utf8_lossy(&bytes).into_owned()));
            }
        }
        found.sort();
        Self::from_files(found)
    }

    /// Unpacks `archive` into a temporary directory and loads it. The
    /// directory is removed when the source is dropped unless `keep_temp`.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn from_zip(archive: &Path, keep_temp: bool) -> Result<Self, PanelError> {
        let temp = tempfile::Builder::new()
            .prefix("gerberpanel-")
            .tempdir()
            .map_err(|e| PanelError::io(std::env::temp_dir(), e))?;
        let file = fs::File::open(archive).map_err(|e| PanelError::io(archive, e))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| PanelError::Archive(format!("{}: {e}", archive.display())))?;
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| PanelError::Archive(format!("{}: {e}", archive.display())))?;
            let Some(relative) = entry.enclosed_name() else {
                warn!(entry = entry.name(), "skipped archive entry outside the root");
                continue;
            };
            let target = temp.path().join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|e| PanelError::io(&target, e))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PanelError::io(parent, e))?;
            }
            let mut out = fs::File::create(&target).map_err(|e| PanelError::io(&target, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| PanelError::io(&target, e))?;
        }
        debug!(archive = %archive.display(), entries = zip.len(), "unpacked archive");

        let mut source = Self::from_dir(temp.path())?;
        if keep_temp {
            #[allow(deprecated)]
            let kept = temp.into_path();
            info!(dir = %kept.display(), "kept unpacked archive");
            source.kept = Some(kept);
        } else {
            source.temp = Some(temp);
        }
        Ok(source)
    }

    /// Classifies `(name, text)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::UnsupportedFormat`] when a file with a layer
    /// extension has unrecognised content and [`PanelError::Parse`] for
    /// malformed DXF.
    pub fn from_files<I, S>(files: I) -> Result<Self, PanelError>
    where
        I: IntoIterator<Item = (S, String)>,
        S: Into<String>,
    {
        let mut source = Self::default();
        for (name, text) in files {
            let name = name.into();
            let classified = LayerKind::classify(Path::new(&name));
            let (kind, format, text) = match (detect_format(&text), classified) {
                (Some(SourceFormat::Ipc356), _) => {
                    debug!(file = %name, "skipped netlist");
                    continue;
                }
                (Some(SourceFormat::Dxf), _) => (
                    LayerKind::EdgeCuts,
                    SourceFormat::Dxf,
                    dxf::dxf_to_gerber(&name, &text)?,
                ),
                (Some(SourceFormat::Excellon), _) => (LayerKind::Drill, SourceFormat::Excellon, text),
                (Some(SourceFormat::Gerber), Some(kind)) if kind.is_gerber() => {
                    (kind, SourceFormat::Gerber, text)
                }
                (Some(SourceFormat::Gerber), _) => {
                    warn!(file = %name, "skipped gerber file of unknown layer");
                    continue;
                }
                (None, _) if has_layer_extension(&name) => {
                    return Err(PanelError::UnsupportedFormat(name));
                }
                (None, _) => {
                    debug!(file = %name, "skipped unrecognised file");
                    continue;
                }
            };
            debug!(file = %name, ?kind, ?format, "classified source");
            source.files.push(SourceFile {
                name,
                kind,
                format,
                text,
            });
        }
        Ok(source)
    }

    /// Every classified file.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Files of one layer.
    pub fn layer(&self, kind: LayerKind) -> impl Iterator<Item = &SourceFile> + '_ {
        self.files.iter().filter(move |f| f.kind == kind)
    }

    /// Directory the archive was unpacked into, while it exists.
    pub fn unpacked_dir(&self) -> Option<&Path> {
        self.temp
            .as_ref()
            .map(TempDir::path)
            .or(self.kept.as_deref())
    }

    /// Board outline from the first edge-cuts file, in millimetres.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::MissingLayer`] without an edge-cuts file or
    /// when it draws nothing, and [`PanelError::Parse`] when it is malformed.
    pub fn outline(&self, tolerance: f64) -> Result<Outline, PanelError> {
        let file = self
            .layer(LayerKind::EdgeCuts)
            .next()
            .ok_or_else(|| PanelError::MissingLayer("edge cuts".to_string()))?;
        let mut gerber = GerberFile::parse(&file.name, &file.text)?;
        gerber.to_metric();
        Outline::from_gerber(&gerber, tolerance)
    }
}

/// Merged panel files by output name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Panel {
    files: BTreeMap<String, String>,
    warnings: Vec<String>,
}

impl Panel {
    /// Output files by name.
    pub const fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// One output file.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Diagnostics collected while merging.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Takes the output files.
    pub fn into_files(self) -> BTreeMap<String, String> {
        self.files
    }

    /// Writes every file into `dir`, creating it first.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Io`] naming the path that failed.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>, PanelError> {
        fs::create_dir_all(dir).map_err(|e| PanelError::io(dir, e))?;
        let mut written = Vec::with_capacity(self.files.len());
        for (name, text) in &self.files {
            let path = dir.join(name);
            fs::write(&path, text).map_err(|e| PanelError::io(&path, e))?;
            written.push(path);
        }
        info!(dir = %dir.display(), files = written.len(), "wrote panel");
        Ok(written)
    }
}

/// A synthetic source and every place it lands.
struct Synthetic {
    layer: SyntheticLayer,
    placements: Vec<Placement>,
}

/// Plans a panel for `source` with the grid and rotation of `options`.
///
/// # Errors
///
/// Returns the outline errors of [`BoardSource::outline`].
pub fn plan(
    source: &BoardSource,
    params: PanelParameters,
    options: &ExportOptions,
) -> Result<PanelPlanner, PanelError> {
    let outline = source.outline(params.merge_tolerance_mm().max(1e-6))?;
    let mut planner = PanelPlanner::new(params, Some(outline));
    planner.set_rotation(options.rotation);
    planner.set_grid(options.columns, options.rows);
    info!(
        columns = options.columns,
        rows = options.rows,
        status = %planner.status(),
        "planned panel"
    );
    Ok(planner)
}

fn check(progress: &mut dyn FnMut(&str) -> bool, label: &str) -> Result<(), PanelError> {
    if progress(label) {
        Ok(())
    } else {
        info!(at = label, "export cancelled");
        Err(PanelError::Cancelled)
    }
}

/// Merges rails, boards and tabs into one file per layer.
///
/// `progress` is called with the layer extension before each layer and with
/// the board file name before each board copy group; returning `false`
/// cancels.
///
/// # Errors
///
/// Returns [`PanelError::MissingLayer`] without an outline,
/// [`PanelError::LayoutInvalid`] when a tab is disconnected,
/// [`PanelError::Cancelled`] when `progress` declines, and any parse or
/// emission error of a source.
pub fn panelize(
    source: &BoardSource,
    planner: &PanelPlanner,
    progress: &mut dyn FnMut(&str) -> bool,
) -> Result<Panel, PanelError> {
    let Some(outline) = planner.outline() else {
        return Err(PanelError::MissingLayer("edge cuts".to_string()));
    };
    if !planner.is_valid() {
        return Err(PanelError::LayoutInvalid {
            disconnected: planner.disconnected(),
        });
    }
    let params = planner.params();
    let layout = planner.layout();
    let tolerance = params.merge_tolerance_mm();

    let (panel_width, _) = planner.panel_size_mm();
    let mut rails = Vec::with_capacity(8);
    for (origin, top) in planner.rail_origins_mm().into_iter().zip([false, true]) {
        let rail = Rail {
            width: panel_width,
            height: params.rail_mm(),
            top,
            columns: layout.columns,
            column_pitch: layout.pcb_size_mm.0 + params.gap_mm(),
            gap: params.gap_mm(),
        };
        rails.extend(rail.layers(params).into_iter().map(|layer| Synthetic {
            layer,
            placements: vec![Placement::at(origin)],
        }));
    }
    let tab_placements: Vec<Placement> = planner
        .tab_origins_mm()
        .into_iter()
        .map(Placement::at)
        .collect();
    let tabs: Vec<Synthetic> = if tab_placements.is_empty() {
        Vec::new()
    } else {
        MouseBite::new(params)
            .layers()?
            .into_iter()
            .map(|layer| Synthetic {
                layer,
                placements: tab_placements.clone(),
            })
            .collect()
    };
    let bounds = outline.bounds();
    let boards: Vec<Placement> = planner
        .board_origins_mm()
        .into_iter()
        .map(|origin| Placement::board(bounds, layout.rotation, origin))
        .collect();

    let mut panel = Panel::default();
    for kind in LayerKind::ALL {
        let ext = kind.extension();
        check(progress, ext)?;
        if kind.is_gerber() {
            let name = format!("panel.{ext}");
            let text = gerber_layer(
                kind,
                &name,
                source,
                &rails,
                &boards,
                &tabs,
                planner,
                tolerance,
                progress,
                &mut panel.warnings,
            )?;
            let text = if kind.is_silk() {
                ensure_silk_polarity(&text)
            } else {
                text
            };
            panel.files.insert(name, text);
        } else {
            let (pth, npth) = drill_layer(source, &boards, &tabs, progress, &mut panel.warnings)?;
            panel.files.insert(PTH_DRILL.to_string(), reorder_drill_routing(&pth));
            panel.files.insert(NPTH_DRILL.to_string(), reorder_drill_routing(&npth));
        }
    }
    Ok(panel)
}

#[allow(clippy::too_many_arguments)]
fn gerber_layer(
    kind: LayerKind,
    name: &str,
    source: &BoardSource,
    rails: &[Synthetic],
    boards: &[Placement],
    tabs: &[Synthetic],
    planner: &PanelPlanner,
    tolerance: f64,
    progress: &mut dyn FnMut(&str) -> bool,
    warnings: &mut Vec<String>,
) -> Result<String, PanelError> {
    let mut composition = GerberComposition::new(name, kind, tolerance);
    if kind == LayerKind::EdgeCuts {
        composition = composition.with_cutouts(planner.cutouts());
    }
    for synthetic in rails.iter().filter(|s| s.layer.kind == kind) {
        let file = GerberFile::parse(&synthetic.layer.name, &synthetic.layer.text)?;
        for placement in &synthetic.placements {
            composition.merge(file.clone(), placement);
        }
    }
    for board_file in source.layer(kind) {
        check(progress, &board_file.name)?;
        let file = GerberFile::parse(&board_file.name, &board_file.text)?;
        for placement in boards {
            composition.merge(file.clone(), placement);
        }
    }
    for synthetic in tabs.iter().filter(|s| s.layer.kind == kind) {
        let file = GerberFile::parse(&synthetic.layer.name, &synthetic.layer.text)?;
        for placement in &synthetic.placements {
            composition.merge(file.clone(), placement);
        }
    }
    let sources = composition.sources();
    let merged = composition.finish();
    warnings.extend(merged.warnings.iter().cloned());
    let text = merged.to_gerber()?;
    info!(file = name, sources, bytes = text.len(), "composed layer");
    Ok(text)
}

/// Splits a drill source into its plated and non-plated parts.
fn plating_parts(name: &str, text: &str) -> Result<(ExcellonFile, ExcellonFile), PanelError> {
    let mut file = ExcellonFile::parse(name, text)?;
    if is_non_plated_name(Path::new(name)) {
        for tool in file.tools.values_mut() {
            tool.plated = false;
        }
    }
    Ok(file.split_by_plating())
}

fn merge_parts(
    parts: &(ExcellonFile, ExcellonFile),
    placements: &[Placement],
    pth: &mut ExcellonComposition,
    npth: &mut ExcellonComposition,
) {
    let (plated, non_plated) = parts;
    for placement in placements {
        if !plated.is_empty() {
            pth.merge(plated.clone(), placement);
        }
        if !non_plated.is_empty() {
            npth.merge(non_plated.clone(), placement);
        }
    }
}

fn drill_layer(
    source: &BoardSource,
    boards: &[Placement],
    tabs: &[Synthetic],
    progress: &mut dyn FnMut(&str) -> bool,
    warnings: &mut Vec<String>,
) -> Result<(String, String), PanelError> {
    let mut pth = ExcellonComposition::new(PTH_DRILL);
    let mut npth = ExcellonComposition::new(NPTH_DRILL);
    for board_file in source.layer(LayerKind::Drill) {
        check(progress, &board_file.name)?;
        let parts = plating_parts(&board_file.name, &board_file.text)?;
        merge_parts(&parts, boards, &mut pth, &mut npth);
    }
    for synthetic in tabs.iter().filter(|s| s.layer.kind == LayerKind::Drill) {
        let parts = plating_parts(&synthetic.layer.name, &synthetic.layer.text)?;
        merge_parts(&parts, &synthetic.placements, &mut pth, &mut npth);
    }
    let (pth, npth) = (pth.finish(), npth.finish());
    warnings.extend(pth.warnings.iter().chain(&npth.warnings).cloned());
    info!(plated = pth.hits.len(), non_plated = npth.hits.len(), "composed drills");
    Ok((pth.to_excellon()?, npth.to_excellon()?))
}

/// Loads `input`, plans, panelizes and writes to `options.output_dir`.
///
/// # Errors
///
/// Any error of [`BoardSource::load`], [`plan`], [`panelize`] or
/// [`Panel::write`].
pub fn run(
    input: &Path,
    params: PanelParameters,
    options: &ExportOptions,
    progress: &mut dyn FnMut(&str) -> bool,
) -> Result<Panel, PanelError> {
    let source = BoardSource::load(input, options.keep_temp)?;
    let planner = plan(&source, params, options)?;
    let panel = panelize(&source, &planner, progress)?;
    panel.write(&options.output_dir)?;
    Ok(panel)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    const RECT: &str = "%FSLAX46Y46*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\n\
X0Y0D02*\nX10000000Y0D01*\nX10000000Y20000000D01*\nX0Y20000000D01*\nX0Y0D01*\nM02*\n";
    const COPPER: &str = "%FSLAX46Y46*%\n%MOMM*%\n%ADD10C,1*%\nD10*\nX5000000Y10000000D03*\nM02*\n";
    const DRILL: &str = "M48\nMETRIC\nT1C0.8\n%\nT1\nX5.0Y10.0\nM30\n";

    fn board() -> BoardSource {
        let files = vec![
            ("board.gm1", RECT.to_string()),
            ("board.gtl", COPPER.to_string()),
            ("board.drl", DRILL.to_string()),
            ("board.ipc", "P  JOB   demo\n317GND   VIA\n999\n".to_string()),
            ("README.md", "hello".to_string()),
        ];
        match BoardSource::from_files(files) {
            Ok(s) => s,
            Err(e) => panic!("load: {e}"),
        }
    }

    fn planner(columns: usize, bites: u32) -> PanelPlanner {
        let mut params = PanelParameters::default();
        params.set_gap_mm(1.5);
        params.set_bites_per_gap(bites);
        params.set_bite_mm(4.0);
        let options = ExportOptions {
            columns,
            ..ExportOptions::default()
        };
        match plan(&board(), params, &options) {
            Ok(p) => p,
            Err(e) => panic!("plan: {e}"),
        }
    }

    #[test]
    fn ut_exp_001_detects_formats() {
        assert_eq!(detect_format(RECT), Some(SourceFormat::Gerber));
        assert_eq!(detect_format(DRILL), Some(SourceFormat::Excellon));
        assert_eq!(detect_format("P  JOB x\n999\n"), Some(SourceFormat::Ipc356));
        assert_eq!(
            detect_format("0\nSECTION\n2\nENTITIES\n0\nENDSEC\n"),
            Some(SourceFormat::Dxf)
        );
        assert_eq!(detect_format("hello"), None);
    }

    #[test]
    fn ut_exp_002_classification_skips_netlists_and_unknown_files() {
        let source = board();
        let kinds: Vec<LayerKind> = source.files().iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            [LayerKind::EdgeCuts, LayerKind::TopCopper, LayerKind::Drill]
        );
        assert!(source.unpacked_dir().is_none());
    }

    #[test]
    fn ut_exp_003_panelize_emits_every_layer() {
        let planner = planner(1, 0);
        let panel = match panelize(&board(), &planner, &mut |_| true) {
            Ok(p) => p,
            Err(e) => panic!("panelize: {e}"),
        };
        let names: Vec<&str> = panel.files().keys().map(String::as_str).collect();
        assert_eq!(
            names,
            [
                NPTH_DRILL, PTH_DRILL, "panel.gbl", "panel.gbo", "panel.gbp", "panel.gbs",
                "panel.gm1", "panel.gtl", "panel.gto", "panel.gtp", "panel.gts"
            ]
        );
        let silk = panel.get("panel.gto").unwrap_or_default();
        assert!(silk.ends_with("%LPD*%\nM02*\n"));
        let drill = panel.get(PTH_DRILL).unwrap_or_default();
        assert!(drill.trim_end().ends_with("M30"));
        assert!(drill.contains("T1C0.8"));
    }

    #[test]
    fn ut_exp_004_progress_can_cancel() {
        let planner = planner(1, 0);
        let mut seen = Vec::new();
        let result = panelize(&board(), &planner, &mut |label| {
            seen.push(label.to_string());
            label != "gbo"
        });
        assert!(matches!(result, Err(PanelError::Cancelled)));
        assert_eq!(seen.first().map(String::as_str), Some("gm1"));
        assert_eq!(seen.last().map(String::as_str), Some("gbo"));
    }

    #[test]
    fn ut_exp_005_tabs_land_in_npth_drill() {
        let planner = planner(1, 1);
        assert!(planner.is_valid());
        let panel = match panelize(&board(), &planner, &mut |_| true) {
            Ok(p) => p,
            Err(e) => panic!("panelize: {e}"),
        };
        let npth = panel.get(NPTH_DRILL).unwrap_or_default();
        assert!(npth.contains("NonPlated"));
        assert!(npth.contains("T1C0.5"));
    }

    #[test]
    fn bc_exp_001_missing_outline_and_unknown_content() {
        let source = match BoardSource::from_files(vec![("board.gtl", COPPER.to_string())]) {
            Ok(s) => s,
            Err(e) => panic!("load: {e}"),
        };
        assert!(matches!(
            plan(&source, PanelParameters::default(), &ExportOptions::default()),
            Err(PanelError::MissingLayer(_))
        ));
        assert!(matches!(
            BoardSource::from_files(vec![("board.gtl", "garbage".to_string())]),
            Err(PanelError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn bc_exp_002_write_reports_failing_path() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let blocker = dir.path().join("file");
        if let Err(e) = fs::write(&blocker, "x") {
            panic!("write: {e}");
        }
        let mut panel = Panel::default();
        panel.files.insert("panel.gtl".to_string(), String::new());
        assert!(matches!(
            panel.write(&blocker.join("out")),
            Err(PanelError::Io { .. })
        ));
    }
}
