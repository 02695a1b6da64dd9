//! Cross-checks emitted panel Gerber against an independent parser (IT-030, IT-031).

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufReader, Cursor};
use std::path::Path;

use gerberpanel::aperture::Aperture;
use gerberpanel::config::ExportOptions;
use gerberpanel::export::{self, BoardSource, Panel};
use gerberpanel::gerber::GerberFile;
use gerberpanel::params::PanelParameters;

#[allow(clippy::expect_used)]
fn rect_panel() -> Panel {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/rect");
    let source = BoardSource::load(&dir, false).expect("fixture should load");
    let mut params = PanelParameters::default();
    params.set_bite_mm(4.0);
    params.set_bites_per_gap(1);
    let options = ExportOptions {
        columns: 2,
        rows: 2,
        ..ExportOptions::default()
    };
    let planner = export::plan(&source, params, &options).expect("fixture has an outline");
    export::panelize(&source, &planner, &mut |_| true).expect("valid layout should export")
}

/// Apertures, units and command count as read by `gerber_parser`.
fn reparse(text: &str) -> Reparsed {
    let reader = BufReader::new(Cursor::new(text.as_bytes()));
    let doc = match gerber_parser::parse(reader) {
        Ok(d) | Err((d, _)) => d,
    };
    Reparsed {
        apertures: doc.apertures.into_iter().collect(),
        units: doc.units,
        commands: doc.commands.len(),
    }
}

struct Reparsed {
    apertures: BTreeMap<i32, gerber_types::Aperture>,
    units: Option<gerber_types::Unit>,
    commands: usize,
}

/// IT-030: every aperture defined in the panel copper is seen by the other parser.
#[test]
#[allow(clippy::expect_used)]
fn it_030_apertures_agree() {
    let panel = rect_panel();
    let text = panel.get("panel.gtl").expect("top copper emitted");
    let ours = GerberFile::parse("panel.gtl", text).expect("emitted copper should parse");
    let doc = reparse(text);

    let our_codes: BTreeSet<i32> = ours
        .apertures
        .iter()
        .filter_map(|a| i32::try_from(a.code).ok())
        .collect();
    let their_codes: BTreeSet<i32> = doc.apertures.keys().copied().collect();
    assert!(!our_codes.is_empty());
    assert_eq!(our_codes, their_codes);

    for def in &ours.apertures {
        if let Aperture::Circle { diameter, .. } = def.aperture {
            let code = i32::try_from(def.code).expect("small code");
            match doc.apertures.get(&code) {
                Some(gerber_types::Aperture::Circle(c)) => {
                    assert!((c.diameter - diameter).abs() < 1e-6, "D{code}");
                }
                other => panic!("D{code} read back as {other:?}"),
            }
        }
    }
}

/// IT-031: panel files declare metric units and carry commands.
#[test]
#[allow(clippy::expect_used)]
fn it_031_units_are_metric() {
    let panel = rect_panel();
    for name in ["panel.gm1", "panel.gtl", "panel.gto"] {
        let doc = reparse(panel.get(name).expect("layer emitted"));
        assert_eq!(doc.units, Some(gerber_types::Unit::Millimeters), "{name}");
        assert!(doc.commands > 0, "{name}");
    }
}
