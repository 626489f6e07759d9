//! Spreadsheet source resolution
//!
//! Turns the spreadsheet URL a user copies from their browser, plus an
//! optional tab selector, into the CSV export URL that is actually fetched.

use thiserror::Error;
use url::Url;

/// Host that serves published spreadsheets
const SHEETS_HOST: &str = "docs.google.com";

/// Errors that can occur when resolving a spreadsheet source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The URL could not be parsed or lacks a scheme/host
    #[error("Invalid spreadsheet URL format: {0}")]
    InvalidUrl(String),

    /// The URL is well-formed but not a Google Sheets document
    #[error("URL must be a Google Sheets URL: {0}")]
    NotASpreadsheet(String),

    /// No `/d/<id>` segment in the path
    #[error("Could not extract sheet ID from URL: {0}")]
    MissingSpreadsheetId(String),

    /// Published-to-web sheets only export tabs by gid
    #[error("Published spreadsheets can only select a tab by its numeric gid, not '{0}'")]
    NamedTabOnPublished(String),
}

/// Which tab of a multi-tab spreadsheet to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabSelector {
    /// The first tab
    First,
    /// A tab by its numeric `gid`
    Gid(u64),
    /// A tab by its visible name
    Name(String),
}

impl TabSelector {
    /// Interprets a configured selector
    ///
    /// All-digit selectors are gids, anything else non-blank is a tab name.
    pub fn parse(selector: &str) -> TabSelector {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return TabSelector::First;
        }
        match trimmed.parse::<u64>() {
            Ok(gid) if trimmed.chars().all(|c| c.is_ascii_digit()) => TabSelector::Gid(gid),
            _ => TabSelector::Name(trimmed.to_string()),
        }
    }
}

/// A resolved spreadsheet and tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSource {
    spreadsheet_id: String,
    tab: TabSelector,
    /// Shared through "Publish to web" (`/d/e/<id>/pubhtml`)
    published: bool,
}

impl SheetSource {
    pub fn new(spreadsheet_id: impl Into<String>, tab: TabSelector) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            tab,
            published: false,
        }
    }

    /// A sheet shared through "Publish to web", identified by its publish id
    ///
    /// # Errors
    ///
    /// Returns `SourceError::NamedTabOnPublished` for a tab name, since the
    /// publish endpoint only selects tabs by gid.
    pub fn published(publish_id: impl Into<String>, tab: TabSelector) -> Result<Self, SourceError> {
        if let TabSelector::Name(name) = &tab {
            return Err(SourceError::NamedTabOnPublished(name.clone()));
        }
        Ok(Self {
            spreadsheet_id: publish_id.into(),
            tab,
            published: true,
        })
    }

    /// Resolves a spreadsheet URL and optional tab selector
    ///
    /// An explicit selector wins. Without one, a `gid` in the URL fragment
    /// (`#gid=123`) or query string is used, and failing that the first tab.
    /// Both editor URLs (`/d/<id>/edit`) and published URLs
    /// (`/d/e/<publish id>/pubhtml`) are accepted.
    pub fn parse(url: &str, sheet: Option<&str>) -> Result<Self, SourceError> {
        let parsed = Url::parse(url.trim()).map_err(|_| SourceError::InvalidUrl(url.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SourceError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl(url.to_string()));
        }
        if host != SHEETS_HOST {
            return Err(SourceError::NotASpreadsheet(url.to_string()));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();
        if segments.first() != Some(&"spreadsheets") {
            return Err(SourceError::NotASpreadsheet(url.to_string()));
        }
        let after_d = segments
            .iter()
            .position(|segment| *segment == "d")
            .map(|i| &segments[i + 1..])
            .unwrap_or_default();
        let (spreadsheet_id, published) = match after_d {
            ["e", publish_id, ..] => (*publish_id, true),
            [id, ..] if *id != "e" => (*id, false),
            _ => ("", false),
        };
        if spreadsheet_id.is_empty() {
            return Err(SourceError::MissingSpreadsheetId(url.to_string()));
        }

        let tab = match sheet.map(TabSelector::parse) {
            Some(TabSelector::First) | None => gid_from_url(&parsed)
                .map(TabSelector::Gid)
                .unwrap_or(TabSelector::First),
            Some(tab) => tab,
        };

        if published {
            return Self::published(spreadsheet_id, tab);
        }
        Ok(Self::new(spreadsheet_id, tab))
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn tab(&self) -> &TabSelector {
        &self.tab
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Builds the CSV export URL relative to `base_url`
    ///
    /// `base_url` is the `.../spreadsheets/d` prefix. Named tabs go through
    /// the gviz endpoint with `headers=0` so that no leading rows are folded
    /// into a header record and row 1 stays the sheet's first row.
    pub fn export_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.published {
            return match &self.tab {
                TabSelector::Gid(gid) => format!(
                    "{}/e/{}/pub?output=csv&single=true&gid={}",
                    base, self.spreadsheet_id, gid
                ),
                TabSelector::First | TabSelector::Name(_) => {
                    format!("{}/e/{}/pub?output=csv", base, self.spreadsheet_id)
                }
            };
        }
        match &self.tab {
            TabSelector::First => format!("{}/{}/export?format=csv", base, self.spreadsheet_id),
            TabSelector::Gid(gid) => format!(
                "{}/{}/export?format=csv&gid={}",
                base, self.spreadsheet_id, gid
            ),
            TabSelector::Name(name) => format!(
                "{}/{}/gviz/tq?tqx=out:csv&headers=0&sheet={}",
                base,
                self.spreadsheet_id,
                url::form_urlencoded::byte_serialize(name.as_bytes()).collect::<String>()
            ),
        }
    }
}

/// Finds a `gid` in the fragment (`#gid=0`) or query string of a sheet URL
fn gid_from_url(url: &Url) -> Option<u64> {
    let from_fragment = url.fragment().and_then(|fragment| {
        url::form_urlencoded::parse(fragment.as_bytes())
            .find(|(key, _)| key == "gid")
            .and_then(|(_, value)| value.parse().ok())
    });

    from_fragment.or_else(|| {
        url.query_pairs()
            .find(|(key, _)| key == "gid")
            .and_then(|(_, value)| value.parse().ok())
    })
}
