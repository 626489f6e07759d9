//! Declarative extraction layouts
//!
//! A [`Layout`] is an ordered list of [`Rule`]s, each naming where in the sheet
//! to look (a cell, a column range, or two column ranges to pair) and how to
//! format each resulting line. Layouts are validated when built, so a bad
//! coordinate or template fails before any sheet is fetched.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::data::{CellRef, CellRefError, Column};

/// Line template used by single-cell rules unless overridden
pub const DEFAULT_SINGLE_FORMAT: &str = "{value}";

/// Line template used by range rules unless overridden
pub const DEFAULT_RANGE_FORMAT: &str = "{index}. {value}";

/// Line template used by paired-range rules unless overridden
pub const DEFAULT_PAIRED_FORMAT: &str = "{index}: {value} -> {partner}";

/// Partner text for primary entries with no counterpart
pub const DEFAULT_PLACEHOLDER: &str = "No healer assigned";

/// Errors that can occur when building a layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Layout rule has an empty title")]
    EmptyTitle,

    #[error("Rule '{rule}': {source}")]
    InvalidCell {
        rule: String,
        #[source]
        source: CellRefError,
    },

    #[error("Rule '{rule}': row numbers start at 1")]
    ZeroRow { rule: String },

    #[error("Rule '{rule}': row range {start}-{end} ends before it starts")]
    ReversedRows { rule: String, start: u32, end: u32 },

    #[error("Rule '{rule}': a single-cell rule covers exactly one row, got {start}-{end}")]
    SingleCellSpan { rule: String, start: u32, end: u32 },

    #[error("Rule '{rule}': paired-range rules need a paired_column")]
    MissingPairedColumn { rule: String },

    #[error("Rule '{rule}': paired_column is only valid on paired-range rules")]
    UnexpectedPairedColumn { rule: String },

    #[error("Rule '{rule}': invalid format '{format}': {reason}")]
    InvalidFormat {
        rule: String,
        format: String,
        reason: String,
    },

    #[error("Layout '{0}' has no rules")]
    NoRules(String),
}

/// The kind of lookup a rule performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// One cell
    Single,
    /// A column slice, blanks removed
    Range,
    /// Two column slices zipped by position
    PairedRange,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Single => "single",
            RuleKind::Range => "range",
            RuleKind::PairedRange => "paired-range",
        };
        f.write_str(name)
    }
}

/// Unvalidated rule as written in a configuration file
///
/// ```toml
/// [[rules]]
/// kind = "paired-range"
/// title = "TANK ASSIGNMENTS"
/// column = "E"
/// paired_column = "N"
/// start_row = 6
/// end_row = 10
/// format = "Tank {index}: {value} -> Healer: {partner}"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub kind: RuleKind,
    pub title: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_column: Option<String>,
    pub start_row: u32,
    /// Defaults to `start_row`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// An inclusive, 1-based row range with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    start: u32,
    end: u32,
}

impl RowSpan {
    fn new(rule: &str, start: u32, end: u32) -> Result<Self, LayoutError> {
        if start == 0 || end == 0 {
            return Err(LayoutError::ZeroRow {
                rule: rule.to_string(),
            });
        }
        if start > end {
            return Err(LayoutError::ReversedRows {
                rule: rule.to_string(),
                start,
                end,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Index,
    Value,
    Partner,
}

/// A parsed line template
///
/// Supports `{index}` (1-based position after blank filtering), `{value}`,
/// and `{partner}` (paired rules only). `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    template: String,
    segments: Vec<Segment>,
}

impl LineFormat {
    fn parse(template: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err("unclosed '{'".to_string()),
                        }
                    }
                    let segment = match name.trim() {
                        "index" => Segment::Index,
                        "value" => Segment::Value,
                        "partner" => Segment::Partner,
                        other => return Err(format!("unknown placeholder '{{{}}}'", other)),
                    };
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(segment);
                }
                '}' => return Err("unmatched '}'".to_string()),
                other => text.push(other),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template as written
    pub fn template(&self) -> &str {
        &self.template
    }

    fn uses_partner(&self) -> bool {
        self.segments.contains(&Segment::Partner)
    }

    /// Formats one line
    pub fn render(&self, index: usize, value: &str, partner: &str) -> String {
        let mut line = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => line.push_str(text),
                Segment::Index => line.push_str(&index.to_string()),
                Segment::Value => line.push_str(value),
                Segment::Partner => line.push_str(partner),
            }
        }
        line
    }
}

/// Where a rule reads its values from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Single(CellRef),
    Range {
        column: Column,
        rows: RowSpan,
    },
    PairedRange {
        column: Column,
        partner: Column,
        rows: RowSpan,
        placeholder: String,
    },
}

/// A validated extraction rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    title: String,
    extraction: Extraction,
    format: LineFormat,
}

impl Rule {
    /// A rule reading one cell, such as `G13`
    pub fn single(title: &str, cell: &str) -> Result<Self, LayoutError> {
        let title = validate_title(title)?;
        let cell: CellRef = cell.parse().map_err(|source| LayoutError::InvalidCell {
            rule: title.clone(),
            source,
        })?;
        Self::build(title, Extraction::Single(cell), DEFAULT_SINGLE_FORMAT)
    }

    /// A rule reading one cell given as a column letter and a 1-based row
    pub fn single_at(title: &str, column: &str, row: u32) -> Result<Self, LayoutError> {
        let title = validate_title(title)?;
        let column = parse_column(&title, column)?;
        if row == 0 {
            return Err(LayoutError::ZeroRow { rule: title });
        }
        let cell = CellRef::new(column, row);
        Self::build(title, Extraction::Single(cell), DEFAULT_SINGLE_FORMAT)
    }

    /// A rule reading `column` over rows `start..=end`
    pub fn range(title: &str, column: &str, start: u32, end: u32) -> Result<Self, LayoutError> {
        let title = validate_title(title)?;
        let column = parse_column(&title, column)?;
        let rows = RowSpan::new(&title, start, end)?;
        Self::build(title, Extraction::Range { column, rows }, DEFAULT_RANGE_FORMAT)
    }

    /// A rule pairing `column` with `partner` over rows `start..=end`
    pub fn paired_range(
        title: &str,
        column: &str,
        partner: &str,
        start: u32,
        end: u32,
    ) -> Result<Self, LayoutError> {
        let title = validate_title(title)?;
        let column = parse_column(&title, column)?;
        let partner = parse_column(&title, partner)?;
        let rows = RowSpan::new(&title, start, end)?;
        let extraction = Extraction::PairedRange {
            column,
            partner,
            rows,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        };
        Self::build(title, extraction, DEFAULT_PAIRED_FORMAT)
    }

    /// Replaces the line template
    pub fn with_format(mut self, template: &str) -> Result<Self, LayoutError> {
        self.format = parse_format(&self.title, &self.extraction, template)?;
        Ok(self)
    }

    /// Replaces the text used for unpartnered entries of a paired rule
    ///
    /// Has no effect on other rule kinds.
    pub fn with_placeholder(mut self, text: &str) -> Self {
        if let Extraction::PairedRange {
            ref mut placeholder,
            ..
        } = self.extraction
        {
            *placeholder = text.to_string();
        }
        self
    }

    /// Validates a configuration-file rule
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, LayoutError> {
        let end_row = spec.end_row.unwrap_or(spec.start_row);

        let rule = match spec.kind {
            RuleKind::Single => {
                reject_paired_column(spec)?;
                if end_row != spec.start_row {
                    return Err(LayoutError::SingleCellSpan {
                        rule: spec.title.clone(),
                        start: spec.start_row,
                        end: end_row,
                    });
                }
                Self::single_at(&spec.title, &spec.column, spec.start_row)?
            }
            RuleKind::Range => {
                reject_paired_column(spec)?;
                Self::range(&spec.title, &spec.column, spec.start_row, end_row)?
            }
            RuleKind::PairedRange => {
                let partner =
                    spec.paired_column
                        .as_deref()
                        .ok_or_else(|| LayoutError::MissingPairedColumn {
                            rule: spec.title.clone(),
                        })?;
                Self::paired_range(&spec.title, &spec.column, partner, spec.start_row, end_row)?
            }
        };

        let rule = match &spec.format {
            Some(template) => rule.with_format(template)?,
            None => rule,
        };
        Ok(match &spec.placeholder {
            Some(text) => rule.with_placeholder(text),
            None => rule,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    pub fn format(&self) -> &LineFormat {
        &self.format
    }

    pub fn kind(&self) -> RuleKind {
        match self.extraction {
            Extraction::Single(_) => RuleKind::Single,
            Extraction::Range { .. } => RuleKind::Range,
            Extraction::PairedRange { .. } => RuleKind::PairedRange,
        }
    }

    fn build(title: String, extraction: Extraction, template: &str) -> Result<Self, LayoutError> {
        let format = parse_format(&title, &extraction, template)?;
        Ok(Self {
            title,
            extraction,
            format,
        })
    }
}

fn validate_title(title: &str) -> Result<String, LayoutError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(LayoutError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn parse_column(rule: &str, column: &str) -> Result<Column, LayoutError> {
    column.parse().map_err(|source| LayoutError::InvalidCell {
        rule: rule.to_string(),
        source,
    })
}

fn parse_format(
    rule: &str,
    extraction: &Extraction,
    template: &str,
) -> Result<LineFormat, LayoutError> {
    let invalid = |reason: String| LayoutError::InvalidFormat {
        rule: rule.to_string(),
        format: template.to_string(),
        reason,
    };

    let format = LineFormat::parse(template).map_err(invalid)?;
    if format.uses_partner() && !matches!(extraction, Extraction::PairedRange { .. }) {
        return Err(invalid(
            "{partner} is only available in paired-range rules".to_string(),
        ));
    }
    Ok(format)
}

fn reject_paired_column(spec: &RuleSpec) -> Result<(), LayoutError> {
    match spec.paired_column {
        Some(_) => Err(LayoutError::UnexpectedPairedColumn {
            rule: spec.title.clone(),
        }),
        None => Ok(()),
    }
}

/// An ordered set of rules plus the heading lines printed above them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    name: String,
    heading: Vec<String>,
    rules: Vec<Rule>,
}

impl Layout {
    /// Builds a layout from already-validated rules
    pub fn new(
        name: impl Into<String>,
        heading: Vec<String>,
        rules: Vec<Rule>,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        if rules.is_empty() {
            return Err(LayoutError::NoRules(name));
        }
        Ok(Self {
            name,
            heading,
            rules,
        })
    }

    /// Builds a layout from configuration-file rules
    pub fn from_specs(
        name: impl Into<String>,
        heading: Vec<String>,
        specs: &[RuleSpec],
    ) -> Result<Self, LayoutError> {
        let rules = specs
            .iter()
            .map(Rule::from_spec)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(name, heading, rules)
    }

    /// Name shown in the report banner
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heading(&self) -> &[String] {
        &self.heading
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
