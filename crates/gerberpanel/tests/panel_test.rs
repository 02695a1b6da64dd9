//! Integration tests for planning and exporting panels (IT-001 through IT-009).

use std::path::{Path, PathBuf};

use gerberpanel::config::ExportOptions;
use gerberpanel::error::PanelError;
use gerberpanel::export::{self, BoardSource, Panel, NPTH_DRILL, PTH_DRILL};
use gerberpanel::gerber::{DCode, GerberFile, Statement};
use gerberpanel::layer::LayerKind;
use gerberpanel::params::PanelParameters;
use gerberpanel::planner::PanelPlanner;
use gerberpanel::synth::Rail;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn params(gap: f64, bites: u32) -> PanelParameters {
    let mut p = PanelParameters::default();
    p.set_gap_mm(gap);
    p.set_rail_mm(5.0);
    p.set_arc_mm(0.75);
    p.set_bite_mm(4.0);
    p.set_bites_per_gap(bites);
    p
}

#[allow(clippy::expect_used)]
fn planned(board: &str, params: PanelParameters, columns: usize) -> (BoardSource, PanelPlanner) {
    let source = BoardSource::load(&fixture(board), false).expect("fixture should load");
    let options = ExportOptions {
        columns,
        ..ExportOptions::default()
    };
    let planner = export::plan(&source, params, &options).expect("fixture has an outline");
    (source, planner)
}

#[allow(clippy::expect_used)]
fn export_panel(source: &BoardSource, planner: &PanelPlanner) -> Panel {
    export::panelize(source, planner, &mut |_| true).expect("valid layout should export")
}

/// `(code, x)` of every operation on the horizontal line `y`.
#[allow(clippy::expect_used)]
fn operations_on(text: &str, y: f64) -> Vec<(DCode, f64)> {
    let file = GerberFile::parse("panel.gm1", text).expect("emitted outline should parse");
    let (mut cx, mut cy) = (0.0, 0.0);
    let mut found = Vec::new();
    for statement in &file.statements {
        let Statement::Operation(op) = statement else {
            continue;
        };
        cx = op.x.unwrap_or(cx);
        cy = op.y.unwrap_or(cy);
        if let Some(code) = op.code {
            if (cy - y).abs() < 1e-6 {
                found.push((code, cx));
            }
        }
    }
    found
}

/// IT-001: 10×20 board, 1×1, no tabs → every layer emitted, outline of 12 segments.
#[test]
fn it_001_single_board_exports_every_layer() {
    let (source, planner) = planned("rect", params(1.5, 0), 1);
    assert_eq!(planner.panel_size_mm(), (10.0, 33.0));
    let panel = export_panel(&source, &planner);

    for kind in LayerKind::ALL.iter().filter(|k| k.is_gerber()) {
        let name = format!("panel.{}", kind.extension());
        assert!(panel.get(&name).is_some(), "missing {name}");
    }
    assert!(panel.get(PTH_DRILL).is_some());
    assert!(panel.get(NPTH_DRILL).is_some());

    let outline = panel.get("panel.gm1").unwrap_or_default();
    let draws = outline.lines().filter(|l| l.ends_with("D01*")).count();
    assert_eq!(draws, 12, "four edges per rail plus four board edges");
}

/// IT-002: plated and non-plated board holes land in separate drill files.
#[test]
fn it_002_drills_are_split_by_plating() {
    let (source, planner) = planned("rect", params(1.5, 0), 2);
    let panel = export_panel(&source, &planner);
    let pth = panel.get(PTH_DRILL).unwrap_or_default();
    let npth = panel.get(NPTH_DRILL).unwrap_or_default();
    assert!(pth.contains("T1C0.8"));
    assert!(!pth.contains("C3"));
    assert!(npth.contains("T1C3"));
    assert_eq!(pth.lines().filter(|l| l.starts_with('X')).count(), 6);
    assert_eq!(npth.lines().filter(|l| l.starts_with('X')).count(), 2);
}

/// IT-003: 2×1 with one centered tab per gap → 21.5 mm wide, valid, outline split.
#[test]
fn it_003_tabs_split_the_outline() {
    let (source, planner) = planned("rect", params(1.5, 1), 2);
    assert_eq!(planner.panel_size_mm().0, 21.5);
    assert!(planner.is_valid());
    assert!(planner
        .layout()
        .tabs
        .iter()
        .all(|t| (t.slide - 0.5).abs() < 1e-12));

    let panel = export_panel(&source, &planner);
    let outline = panel.get("panel.gm1").unwrap_or_default();
    assert!(outline.contains("G02") && outline.contains("G03"));

    let ops = operations_on(outline, 6.5);
    let expected = [
        (DCode::Move, 0.0),
        (DCode::Interpolate, 5.0),
        (DCode::Move, 9.0),
        (DCode::Interpolate, 10.0),
    ];
    let found = ops.windows(4).any(|w| {
        w.iter()
            .zip(&expected)
            .all(|((code, x), (want_code, want_x))| code == want_code && (x - want_x).abs() < 1e-6)
    });
    assert!(found, "board bottom edge should break around the tab: {ops:?}");
}

/// IT-004: a notch under the tab disconnects it and export refuses.
#[test]
fn it_004_notch_makes_layout_invalid() {
    let (source, mut planner) = planned("notched", params(1.5, 1), 2);
    let _ = planner.set_group_slide(0, 0.45);
    assert!(!planner.is_valid());
    assert_eq!(planner.disconnected(), 2);
    let result = export::panelize(&source, &planner, &mut |_| true);
    assert!(matches!(
        result,
        Err(PanelError::LayoutInvalid { disconnected: 2 })
    ));
}

/// IT-005: vendor marker on the top rail; V-cut marks only between columns.
#[test]
fn it_005_vendor_marker_and_vcut() {
    let mut p = params(2.0, 0);
    p.set_vendor_marker(true);
    p.set_use_vcut(true);
    let rail = |columns: usize, top: bool| Rail {
        width: 10.0 * columns as f64 + 2.0 * (columns as f64 - 1.0),
        height: 5.0,
        top,
        columns,
        column_pitch: 12.0,
        gap: 2.0,
    };
    let mut plain = p;
    plain.set_use_vcut(false);

    let top = rail(1, true).top_silk(&p);
    let bottom = rail(1, false).top_silk(&p);
    assert!(top.len() > bottom.len(), "marker strokes on the top rail only");
    assert_eq!(top, rail(1, true).top_silk(&plain), "no V-cut with one column");
    assert_ne!(rail(2, true).top_silk(&p), rail(2, true).top_silk(&plain));
}

/// IT-006: rotation by 90° swaps the board footprint in the panel.
#[test]
fn it_006_rotated_boards() {
    let mut options = ExportOptions::default();
    options.rotation = gerberpanel::geometry::Rotation::R90;
    #[allow(clippy::expect_used)]
    let source = BoardSource::load(&fixture("rect"), false).expect("fixture should load");
    #[allow(clippy::expect_used)]
    let planner = export::plan(&source, params(2.0, 1), &options).expect("plan");
    assert_eq!(planner.layout().pcb_size_mm, (20.0, 10.0));
    assert_eq!(planner.panel_size_mm(), (20.0, 24.0));
    let panel = export_panel(&source, &planner);
    #[allow(clippy::expect_used)]
    let copper = GerberFile::parse("panel.gtl", panel.get("panel.gtl").unwrap_or_default())
        .expect("emitted copper should parse");
    let b = copper.bounds();
    assert!(b.min_x >= -1.0 && b.max_x <= 21.0, "copper within the board column: {b:?}");
}

/// IT-007: a DXF outline stands in for an edge-cuts Gerber.
#[test]
fn it_007_dxf_outline() {
    let (source, planner) = planned("dxf", params(1.5, 1), 1);
    assert_eq!(source.files()[0].kind, LayerKind::EdgeCuts);
    assert_eq!(planner.layout().pcb_size_mm, (10.0, 20.0));
    let panel = export_panel(&source, &planner);
    assert!(panel.get("panel.gm1").is_some_and(|t| t.contains("G02")));
}

/// IT-008: zip input is unpacked to a temporary directory that is removed on drop.
#[test]
#[allow(clippy::expect_used)]
fn it_008_zip_input() {
    use std::io::Write as _;

    let dir = tempfile::tempdir().expect("tempdir");
    let archive = dir.path().join("board.zip");
    {
        let file = std::fs::File::create(&archive).expect("create zip");
        let mut zip = zip::ZipWriter::new(file);
        for name in ["board-Edge_Cuts.gm1", "board-F_Cu.gtl", "board.drl"] {
            let text = std::fs::read(fixture("rect").join(name)).expect("read fixture");
            zip.start_file(format!("gerbers/{name}"), zip::write::SimpleFileOptions::default())
                .expect("start entry");
            zip.write_all(&text).expect("write entry");
        }
        zip.finish().expect("finish zip");
    }

    let source = BoardSource::load(&archive, false).expect("zip should load");
    assert_eq!(source.files().len(), 3);
    let unpacked = source.unpacked_dir().map(Path::to_path_buf).expect("unpacked dir");
    assert!(unpacked.exists());
    drop(source);
    assert!(!unpacked.exists(), "temporary directory removed");

    let kept = BoardSource::load(&archive, true).expect("zip should load");
    let kept_dir = kept.unpacked_dir().map(Path::to_path_buf).expect("kept dir");
    drop(kept);
    assert!(kept_dir.exists(), "keep_temp leaves the directory");
    std::fs::remove_dir_all(kept_dir).expect("cleanup");
}

/// IT-009: `run` writes every file to the output directory.
#[test]
#[allow(clippy::expect_used)]
fn it_009_run_writes_output_directory() {
    let out = tempfile::tempdir().expect("tempdir");
    let options = ExportOptions {
        output_dir: out.path().join("panel"),
        columns: 2,
        rows: 2,
        ..ExportOptions::default()
    };
    let mut layers = Vec::new();
    let panel = export::run(&fixture("rect"), params(2.0, 1), &options, &mut |label| {
        layers.push(label.to_string());
        true
    })
    .expect("export should succeed");
    assert_eq!(panel.files().len(), 11);
    for name in panel.files().keys() {
        assert!(options.output_dir.join(name).is_file(), "{name} written");
    }
    assert!(layers.iter().any(|l| l == "drl"));
}
