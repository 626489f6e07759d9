//! End-to-end report generation
//!
//! fetch-or-cache-load, extract, format, write. Everything that can be
//! checked without touching the network or the disk is checked in
//! [`Pipeline::prepare`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::cache::SheetCache;
use crate::cli::{CliError, RunOptions};
use crate::config::{AppConfig, ConfigError};
use crate::data::{FetchError, SheetClient, SheetSource};
use crate::report::{build_report, render_report, Layout, LayoutError, Raid};

/// Any failure of a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid layout: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to write report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Whether running again later could succeed without changing anything
    pub fn is_retryable(&self) -> bool {
        match self {
            RunError::Fetch(e) => e.is_retryable(),
            RunError::Write { .. } => true,
            RunError::Cli(_) | RunError::Config(_) | RunError::Layout(_) => false,
        }
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The report was written to this path
    Saved(PathBuf),
    /// The report text, for printing
    Printed(String),
}

/// Picks the layout for `raid`
///
/// Rules in the configuration replace the built-in layout. Their heading
/// defaults to `# <RAID>`.
pub fn resolve_layout(config: &AppConfig, raid: Raid) -> Result<Layout, RunError> {
    if !config.rules.is_empty() {
        let heading = config
            .heading
            .clone()
            .unwrap_or_else(|| vec![format!("# {}", raid.code())]);
        debug!(rules = config.rules.len(), "using layout from configuration");
        return Ok(Layout::from_specs(raid.code(), heading, &config.rules)?);
    }

    match raid.builtin_layout()? {
        Some(layout) => Ok(layout),
        None => Err(ConfigError::Missing {
            field: "rules".into(),
            hint: format!("{} has no built-in layout; add [[rules]]", raid.code()),
        }
        .into()),
    }
}

/// A validated run, ready to fetch
#[derive(Debug)]
pub struct Pipeline {
    raid: Raid,
    source: SheetSource,
    layout: Layout,
    client: SheetClient,
    output_path: PathBuf,
}

impl Pipeline {
    /// Validates `config` and builds the client
    ///
    /// No network request or cache access happens here. With `use_cache`
    /// off the client never reads or writes the cache directory.
    pub fn prepare(config: &AppConfig, use_cache: bool) -> Result<Self, RunError> {
        config.validate()?;
        let raid = config.raid()?;
        let source = config.source()?;
        let layout = resolve_layout(config, raid)?;

        let mut client = SheetClient::new(config.timeout(), &config.user_agent)?;
        if use_cache {
            client = client.with_cache(SheetCache::with_dir(
                config.cache_dir.clone(),
                config.cache_lifetime(),
            ));
        }

        Ok(Self {
            raid,
            source,
            layout,
            client,
            output_path: config.output_path(raid),
        })
    }

    /// Overrides the export URL prefix
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }

    pub fn raid(&self) -> Raid {
        self.raid
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Default destination of the report
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Loads the sheet and renders the report text
    pub async fn generate(&self) -> Result<String, RunError> {
        info!(raid = self.raid.code(), "generating assignments");
        let grid = self.client.fetch_grid(&self.source).await?;
        let sections = build_report(&grid, &self.layout);
        debug!(sections = sections.len(), "extracted report sections");
        Ok(render_report(&self.layout, &sections))
    }
}

/// Writes the report text, replacing any existing file
pub fn write_report(path: &Path, report: &str) -> Result<(), RunError> {
    fs::write(path, report).map_err(|source| RunError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "saved assignments");
    Ok(())
}

/// Loads the configuration named by `options` and runs the whole pipeline
pub async fn run(options: &RunOptions) -> Result<RunOutcome, RunError> {
    let config = AppConfig::load(&options.config_path)?;
    let pipeline = Pipeline::prepare(&config, options.use_cache)?;
    execute(&pipeline, options).await
}

/// Runs an already prepared pipeline according to `options`
pub async fn execute(pipeline: &Pipeline, options: &RunOptions) -> Result<RunOutcome, RunError> {
    let report = pipeline.generate().await?;

    if options.to_stdout {
        return Ok(RunOutcome::Printed(report));
    }

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| pipeline.output_path().to_path_buf());
    write_report(&path, &report)?;
    Ok(RunOutcome::Saved(path))
}
