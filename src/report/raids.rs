//! Supported raids and their built-in sheet layouts
//!
//! Each raid maps to a layout describing where its assignments live in the
//! raid leader's sheet. Only Blackwing Lair ships with a built-in layout;
//! the others need `[[rules]]` in the configuration file.

use super::layout::{Layout, LayoutError, RuleKind, RuleSpec};

/// Raids the tool knows how to name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Raid {
    /// Molten Core
    MoltenCore,
    /// Blackwing Lair
    BlackwingLair,
    /// Temple of Ahn'Qiraj
    AhnQiraj,
    /// Naxxramas
    Naxxramas,
}

/// A rule in a built-in layout
struct BuiltinRule {
    kind: RuleKind,
    title: &'static str,
    column: &'static str,
    paired_column: Option<&'static str>,
    rows: (u32, u32),
    format: Option<&'static str>,
}

impl BuiltinRule {
    fn to_spec(&self) -> RuleSpec {
        RuleSpec {
            kind: self.kind,
            title: self.title.to_string(),
            column: self.column.to_string(),
            paired_column: self.paired_column.map(str::to_string),
            start_row: self.rows.0,
            end_row: Some(self.rows.1),
            format: self.format.map(str::to_string),
            placeholder: None,
        }
    }
}

/// Heading lines above the BWL sections (AngrySparks category markers)
static BWL_HEADING: [&str; 2] = ["# BWL", "## Trash"];

/// Trash assignments in the BWL sheet
///
/// Tanks in E6-E10 with their healers in N6-N10, the puller in G13,
/// resurrectors in E17-E19, melee healers N13-N15, ranged healers N16-N18
/// and the flex healer in N19.
static BWL_RULES: [BuiltinRule; 6] = [
    BuiltinRule {
        kind: RuleKind::PairedRange,
        title: "TANK ASSIGNMENTS",
        column: "E",
        paired_column: Some("N"),
        rows: (6, 10),
        format: Some("Tank {index}: {value} -> Healer: {partner}"),
    },
    BuiltinRule {
        kind: RuleKind::Single,
        title: "PULLER",
        column: "G",
        paired_column: None,
        rows: (13, 13),
        format: None,
    },
    BuiltinRule {
        kind: RuleKind::Range,
        title: "TRASH HEALERS/RESURRECTORS",
        column: "E",
        paired_column: None,
        rows: (17, 19),
        format: None,
    },
    BuiltinRule {
        kind: RuleKind::Range,
        title: "MELEE HEALERS",
        column: "N",
        paired_column: None,
        rows: (13, 15),
        format: None,
    },
    BuiltinRule {
        kind: RuleKind::Range,
        title: "RANGED HEALERS",
        column: "N",
        paired_column: None,
        rows: (16, 18),
        format: None,
    },
    BuiltinRule {
        kind: RuleKind::Single,
        title: "FLEX HEALER",
        column: "N",
        paired_column: None,
        rows: (19, 19),
        format: None,
    },
];

impl Raid {
    /// Returns a slice containing all raids.
    pub fn all() -> &'static [Raid] {
        &[
            Raid::MoltenCore,
            Raid::BlackwingLair,
            Raid::AhnQiraj,
            Raid::Naxxramas,
        ]
    }

    /// The short name used in configuration files and report banners
    pub fn code(&self) -> &'static str {
        match self {
            Raid::MoltenCore => "MC",
            Raid::BlackwingLair => "BWL",
            Raid::AhnQiraj => "AQ40",
            Raid::Naxxramas => "Naxx",
        }
    }

    /// Comma-separated list of every raid code, for error messages
    pub fn supported() -> String {
        Raid::all()
            .iter()
            .map(Raid::code)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parses a raid code.
    ///
    /// Matching is case-insensitive: "bwl" and "BWL" are both Blackwing Lair.
    /// Returns `None` if the input doesn't name a supported raid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Raid> {
        let wanted = s.trim();
        Raid::all()
            .iter()
            .copied()
            .find(|raid| raid.code().eq_ignore_ascii_case(wanted))
    }

    /// The layout bundled for this raid, if there is one
    pub fn builtin_layout(&self) -> Result<Option<Layout>, LayoutError> {
        let (heading, rules): (&[&str], &[BuiltinRule]) = match self {
            Raid::BlackwingLair => (&BWL_HEADING[..], &BWL_RULES[..]),
            Raid::MoltenCore | Raid::AhnQiraj | Raid::Naxxramas => return Ok(None),
        };

        let specs: Vec<RuleSpec> = rules.iter().map(BuiltinRule::to_spec).collect();
        let heading = heading.iter().map(|line| line.to_string()).collect();
        Layout::from_specs(self.code(), heading, &specs).map(Some)
    }
}
