//! Assignment report generation
//!
//! Runs a [`Layout`] against a [`Grid`] to produce [`ReportSection`]s, and
//! renders those sections as the plain-text assignment listing.

pub mod layout;
pub mod raids;

pub use layout::{Extraction, Layout, LayoutError, LineFormat, Rule, RuleKind, RuleSpec};
pub use raids::Raid;

use crate::data::Grid;

/// One titled block of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
    /// Rendered as `TITLE: value` on one line rather than as a block
    pub inline: bool,
}

/// Builds one section per rule that found at least one value
///
/// Sections come back in layout order. Rules whose cells are all blank or
/// outside the grid produce nothing, so the report never has empty headers.
pub fn build_report(grid: &Grid, layout: &Layout) -> Vec<ReportSection> {
    layout
        .rules()
        .iter()
        .filter_map(|rule| build_section(grid, rule))
        .collect()
}

fn build_section(grid: &Grid, rule: &Rule) -> Option<ReportSection> {
    let format = rule.format();

    let (lines, inline) = match rule.extraction() {
        Extraction::Single(cell) => {
            let value = grid.cell(*cell);
            if value.is_empty() {
                return None;
            }
            (vec![format.render(1, value, "")], true)
        }
        Extraction::Range { column, rows } => {
            let lines = grid
                .cell_range(*column, rows.start(), rows.end())
                .into_iter()
                .enumerate()
                .map(|(i, value)| format.render(i + 1, value, ""))
                .collect();
            (lines, false)
        }
        Extraction::PairedRange {
            column,
            partner,
            rows,
            placeholder,
        } => {
            let primary = grid.cell_range(*column, rows.start(), rows.end());
            let partners = grid.cell_range(*partner, rows.start(), rows.end());
            let lines = pair_by_position(&primary, &partners, placeholder)
                .into_iter()
                .enumerate()
                .map(|(i, (value, partner))| format.render(i + 1, value, partner))
                .collect();
            (lines, false)
        }
    };

    if lines.is_empty() {
        return None;
    }

    Some(ReportSection {
        title: rule.title().to_string(),
        lines,
        inline,
    })
}

/// Zips two filtered ranges by position
///
/// Every primary entry is kept; those beyond the end of `partners` get
/// `placeholder`. Extra partners with no primary entry are dropped.
pub fn pair_by_position<'a>(
    primary: &[&'a str],
    partners: &[&'a str],
    placeholder: &'a str,
) -> Vec<(&'a str, &'a str)> {
    primary
        .iter()
        .enumerate()
        .map(|(i, value)| (*value, partners.get(i).copied().unwrap_or(placeholder)))
        .collect()
}

/// Renders sections as the final text artifact
///
/// ```text
/// === BWL RAID ASSIGNMENTS ===
///
/// # BWL
/// TANK ASSIGNMENTS:
///   Tank 1: Tank -> Healer: Priest
///
/// PULLER: Hunter
/// ```
pub fn render_report(layout: &Layout, sections: &[ReportSection]) -> String {
    let mut out: Vec<String> = vec![
        format!("=== {} RAID ASSIGNMENTS ===", layout.name()),
        String::new(),
    ];
    out.extend(layout.heading().iter().cloned());

    for section in sections {
        if section.inline {
            out.push(format!("{}: {}", section.title, section.lines.join(", ")));
        } else {
            out.push(format!("{}:", section.title));
            out.extend(section.lines.iter().map(|line| format!("  {}", line)));
        }
        out.push(String::new());
    }

    let mut text = out.join("\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
