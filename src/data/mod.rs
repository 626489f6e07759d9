//! Sheet data access for raidsheet
//!
//! This module contains the grid model that cell lookups run against, the
//! resolution of a spreadsheet URL to its CSV export, and the HTTP client
//! that fetches (and caches) that export.

pub mod grid;
pub mod sheets;
pub mod source;

pub use grid::{CellRef, CellRefError, Column, Grid};
pub use sheets::{FetchError, SheetClient};
pub use source::{SheetSource, SourceError, TabSelector};
