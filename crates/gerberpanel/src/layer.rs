//! Layer kinds and file-name classification.

use std::path::Path;

/// A fabrication layer of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    /// Board outline.
    EdgeCuts,
    /// Bottom copper.
    BottomCopper,
    /// Bottom silkscreen.
    BottomSilk,
    /// Bottom paste.
    BottomPaste,
    /// Bottom solder mask.
    BottomMask,
    /// Top copper.
    TopCopper,
    /// Top silkscreen.
    TopSilk,
    /// Top paste.
    TopPaste,
    /// Top solder mask.
    TopMask,
    /// Drill and rout.
    Drill,
}

impl LayerKind {
    /// Every layer in export order.
    pub const ALL: [Self; 10] = [
        Self::EdgeCuts,
        Self::BottomCopper,
        Self::BottomSilk,
        Self::BottomPaste,
        Self::BottomMask,
        Self::TopCopper,
        Self::TopSilk,
        Self::TopPaste,
        Self::TopMask,
        Self::Drill,
    ];

    /// Output file extension.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::EdgeCuts => "gm1",
            Self::BottomCopper => "gbl",
            Self::BottomSilk => "gbo",
            Self::BottomPaste => "gbp",
            Self::BottomMask => "gbs",
            Self::TopCopper => "gtl",
            Self::TopSilk => "gto",
            Self::TopPaste => "gtp",
            Self::TopMask => "gts",
            Self::Drill => "drl",
        }
    }

    /// Value of the `.FileFunction` attribute; `None` for drill.
    pub const fn file_function(self) -> Option<&'static str> {
        match self {
            Self::EdgeCuts => Some("Profile,NP"),
            Self::BottomCopper => Some("Copper,L2,Bot"),
            Self::BottomSilk => Some("Legend,Bot"),
            Self::BottomPaste => Some("Paste,Bot"),
            Self::BottomMask => Some("Soldermask,Bot"),
            Self::TopCopper => Some("Copper,L1,Top"),
            Self::TopSilk => Some("Legend,Top"),
            Self::TopPaste => Some("Paste,Top"),
            Self::TopMask => Some("Soldermask,Top"),
            Self::Drill => None,
        }
    }

    /// True for RS-274X layers.
    pub const fn is_gerber(self) -> bool {
        !matches!(self, Self::Drill)
    }

    /// True for silkscreen layers.
    pub const fn is_silk(self) -> bool {
        matches!(self, Self::TopSilk | Self::BottomSilk)
    }

    /// Classifies a file by extension, then by name substring.
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let by_ext = match ext.as_str() {
            "gm1" | "gko" | "gml" | "gm" => Some(Self::EdgeCuts),
            "gbl" => Some(Self::BottomCopper),
            "gbo" => Some(Self::BottomSilk),
            "gbp" => Some(Self::BottomPaste),
            "gbs" => Some(Self::BottomMask),
            "gtl" => Some(Self::TopCopper),
            "gto" => Some(Self::TopSilk),
            "gtp" => Some(Self::TopPaste),
            "gts" => Some(Self::TopMask),
            "drl" | "xln" | "exc" | "txt" => Some(Self::Drill),
            _ => None,
        };
        by_ext.or_else(|| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_ascii_lowercase().replace(['-', '.'], "_"))?;
            NAME_HINTS
                .iter()
                .find(|(hint, _)| name.contains(hint))
                .map(|(_, kind)| *kind)
        })
    }
}

const NAME_HINTS: [(&str, LayerKind); 20] = [
    ("edge_cuts", LayerKind::EdgeCuts),
    ("outline", LayerKind::EdgeCuts),
    ("profile", LayerKind::EdgeCuts),
    ("top_copper", LayerKind::TopCopper),
    ("f_cu", LayerKind::TopCopper),
    ("bottom_copper", LayerKind::BottomCopper),
    ("b_cu", LayerKind::BottomCopper),
    ("top_silk", LayerKind::TopSilk),
    ("f_silk", LayerKind::TopSilk),
    ("bottom_silk", LayerKind::BottomSilk),
    ("b_silk", LayerKind::BottomSilk),
    ("top_mask", LayerKind::TopMask),
    ("f_mask", LayerKind::TopMask),
    ("bottom_mask", LayerKind::BottomMask),
    ("b_mask", LayerKind::BottomMask),
    ("top_paste", LayerKind::TopPaste),
    ("f_paste", LayerKind::TopPaste),
    ("bottom_paste", LayerKind::BottomPaste),
    ("b_paste", LayerKind::BottomPaste),
    ("drill", LayerKind::Drill),
];

/// True when a drill file name marks non-plated holes.
pub fn is_non_plated_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().contains("npth"))
}
