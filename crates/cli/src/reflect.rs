//! `eeio reflect` - config-driven structural reflection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use eeio_core::{CorrespondenceMatrix, Invariants, Table, Taxonomy};
use eeio_io::{read_mapping, read_table_as, read_taxonomy, write_json, write_table_as};
use eeio_reflect::config::{ReflectConfig, TaxonomyRef};
use eeio_reflect::{
    derive_matrix_weights, derive_row_weights, expand_columns, expand_square_matrix, Comparison,
    DerivationCache, DiagnosticsReport, Projection, ReflectOptions, RoundTripReport,
};
use serde::Serialize;

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_ERROR, EXIT_TOLERANCE};
use crate::{read_config, CliError};

#[derive(Subcommand)]
pub enum ReflectCommands {
    /// Reflect the base table described by a TOML config
    #[command(after_help = "\
Examples:
  eeio reflect run use_2017.reflect.toml
  eeio reflect run use_2017.reflect.toml --json
  RUST_LOG=debug eeio reflect run use_2017.reflect.toml")]
    Run {
        /// Path to the .reflect.toml config file
        config: PathBuf,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate a config and build its correspondences without reflecting
    #[command(after_help = "\
Examples:
  eeio reflect validate use_2017.reflect.toml")]
    Validate {
        /// Path to the .reflect.toml config file
        config: PathBuf,
    },
}

pub fn cmd_reflect(cmd: ReflectCommands) -> Result<(), CliError> {
    match cmd {
        ReflectCommands::Run { config, json } => cmd_reflect_run(&config, json),
        ReflectCommands::Validate { config } => cmd_reflect_validate(&config),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Taxonomy and correspondence files of one config. A taxonomy named twice
/// is loaded once and shared.
struct Loader {
    base_dir: PathBuf,
    taxonomy_dir: Option<String>,
    taxonomies: BTreeMap<String, Arc<Taxonomy>>,
    cache: DerivationCache,
}

impl Loader {
    fn new(base_dir: PathBuf, taxonomy_dir: Option<String>) -> Self {
        Self {
            base_dir,
            taxonomy_dir,
            taxonomies: BTreeMap::new(),
            cache: DerivationCache::new(),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.base_dir.join(rel)
    }

    fn taxonomy(&mut self, name: &str) -> Result<Arc<Taxonomy>, CliError> {
        if let Some(t) = self.taxonomies.get(name) {
            return Ok(t.clone());
        }
        let t = match TaxonomyRef::resolve(name, self.taxonomy_dir.as_deref())
            .map_err(CliError::reflect)?
        {
            TaxonomyRef::Builtin(id) => match id.builtin() {
                Some(t) => {
                    tracing::debug!(taxonomy = %id, "using built-in code list");
                    t.shared()
                }
                None => {
                    return Err(CliError::new(
                        EXIT_CONFIG_INVALID,
                        format!("taxonomy '{id}' has no built-in code list"),
                    ))
                }
            },
            TaxonomyRef::File(rel) => {
                let path = self.path(&rel);
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| rel.clone());
                read_taxonomy(&path, &stem).map_err(CliError::io)?.shared()
            }
        };
        self.taxonomies.insert(name.to_string(), t.clone());
        Ok(t)
    }

    fn correspondence(
        &mut self,
        domain: &str,
        range: &str,
        mapping: &str,
        invariants: Invariants,
    ) -> Result<Arc<CorrespondenceMatrix>, CliError> {
        let d = self.taxonomy(domain)?;
        let r = self.taxonomy(range)?;
        let m = read_mapping(&self.path(mapping)).map_err(CliError::io)?;
        let name = format!("{domain} -> {range} via {mapping}");
        self.cache
            .correspondence(&name, || CorrespondenceMatrix::build(&m, d, r, invariants))
            .map_err(CliError::structure)
    }
}

/// Everything a config names, built and checked, except the tables.
struct Plan {
    config: ReflectConfig,
    loader: Loader,
    rows: Arc<CorrespondenceMatrix>,
    cols: Option<Arc<CorrespondenceMatrix>>,
    old_rows: Option<Arc<CorrespondenceMatrix>>,
    old_cols: Option<Arc<CorrespondenceMatrix>>,
    expand: Option<Arc<CorrespondenceMatrix>>,
}

fn plan(config_path: &Path) -> Result<Plan, CliError> {
    let (content, base_dir) = read_config(config_path)?;
    let config = ReflectConfig::from_toml(&content).map_err(CliError::reflect)?;
    let mut loader = Loader::new(base_dir, config.inputs.taxonomy_dir.clone());
    let inputs = &config.inputs;
    if let Some(source) = &config.source {
        tracing::info!(config = %config.name, %source, "reflecting published table");
    }

    let rows = loader.correspondence(
        &inputs.rows.domain,
        &inputs.rows.range,
        &inputs.rows.mapping,
        inputs.rows.invariants(),
    )?;
    let cols = match &inputs.cols {
        Some(axis) => Some(loader.correspondence(
            &axis.domain,
            &axis.range,
            &axis.mapping,
            axis.invariants(),
        )?),
        None => None,
    };

    let (mut old_rows, mut old_cols) = (None, None);
    if let Some(derive) = &inputs.derive {
        old_rows = Some(loader.correspondence(
            &derive.old_rows.domain,
            &inputs.rows.range,
            &derive.old_rows.mapping,
            Invariants::default(),
        )?);
        if let (Some(old), Some(axis)) = (&derive.old_cols, &inputs.cols) {
            old_cols = Some(loader.correspondence(
                &old.domain,
                &axis.range,
                &old.mapping,
                Invariants::default(),
            )?);
        }
    }

    let expand = match &inputs.expand {
        // Square outputs expand both axes from the row taxonomy; otherwise
        // only the column (sector) axis is expanded.
        Some(exp) => {
            let source = match &inputs.cols {
                Some(axis) if axis.range != inputs.rows.range => &axis.range,
                _ => &inputs.rows.range,
            };
            Some(loader.correspondence(
                source,
                &exp.taxonomy,
                &exp.mapping,
                Invariants::default().complete(),
            )?)
        }
        None => None,
    };

    Ok(Plan { config, loader, rows, cols, old_rows, old_cols, expand })
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    rows: usize,
    cols: usize,
    total: f64,
    round_trip: RoundTripReport,
    diagnostics: DiagnosticsReport,
}

fn cmd_reflect_run(config_path: &Path, json: bool) -> Result<(), CliError> {
    let Plan { config, mut loader, rows, cols, old_rows, old_cols, expand } = plan(config_path)?;
    let inputs = &config.inputs;

    let base = read_table_as(
        &loader.path(&inputs.base),
        Some(rows.domain()),
        cols.as_ref().map(|c| c.domain()),
    )
    .map_err(CliError::io)?;
    let cols = cols.unwrap_or_else(|| Arc::new(CorrespondenceMatrix::identity(base.cols().clone())));

    let mut checks: Vec<Comparison> = Vec::new();
    let weights = match (&inputs.weights, &inputs.derive, &config.expansion, &old_rows) {
        (Some(path), _, _, _) => {
            read_table_as(&loader.path(path), Some(rows.range()), Some(cols.range()))
                .map_err(CliError::io)?
        }
        (None, Some(derive), Some(expansion), Some(old_r)) => {
            let derived = match &old_cols {
                Some(old_c) => {
                    let old = read_table_as(
                        &loader.path(&derive.old),
                        Some(old_r.domain()),
                        Some(old_c.domain()),
                    )
                    .map_err(CliError::io)?;
                    derive_matrix_weights(
                        &old,
                        Projection { rows: old_r.as_ref(), cols: old_c.as_ref() },
                        &base,
                        Projection { rows: rows.as_ref(), cols: cols.as_ref() },
                        expansion,
                        config.tolerance,
                    )
                }
                None => {
                    let old = read_table_as(&loader.path(&derive.old), Some(old_r.domain()), None)
                        .map_err(CliError::io)?;
                    derive_row_weights(&old, old_r, &base, &rows, expansion, config.tolerance)
                }
            }
            .map_err(CliError::reflect)?;
            checks.extend(derived.checks);
            derived.weights
        }
        _ => {
            return Err(CliError::new(
                EXIT_CONFIG_INVALID,
                "config names neither a weight table nor a derivation",
            ))
        }
    };

    let fallback = match &inputs.fallback {
        Some(path) => Some(
            read_table_as(&loader.path(path), Some(rows.range()), Some(cols.range()))
                .map_err(CliError::io)?,
        ),
        None => None,
    };

    let opts = ReflectOptions {
        expected_row_dropped: config.expected_row_dropped.clone(),
        expected_col_dropped: config.expected_col_dropped.clone(),
        fallback: fallback.as_ref(),
        normalize: config.normalize,
        tolerance: config.tolerance,
    };
    let reflection = loader
        .cache
        .reflect(&rows, &cols, &base, &weights, &opts)
        .map_err(CliError::reflect)?;
    checks.push(Comparison::scalar(
        "reflected total",
        config.tolerance,
        reflection.report.covered_total,
        reflection.report.reflected_total,
    ));

    let table = match &expand {
        Some(corr) => expand_table(&reflection.table, corr, &config)?,
        None => reflection.table.clone(),
    };

    if let Some(out) = &config.output.table {
        let path = loader.path(out);
        write_table_as(&path, &table, table.rows(), table.cols()).map_err(CliError::io)?;
        tracing::info!(path = %path.display(), "wrote reflected table");
    }

    let diagnostics = DiagnosticsReport::new(&config.name, checks);
    let passed = !config.normalize || diagnostics.all_passed();
    let summary = RunSummary {
        source: config.source.map(|s| s.to_string()),
        rows: table.shape().0,
        cols: table.shape().1,
        total: table.total(),
        round_trip: reflection.report.clone(),
        diagnostics,
    };
    if let Some(out) = &config.output.json {
        write_json(&loader.path(out), &summary).map_err(CliError::io)?;
    }

    if json {
        let s = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{s}");
    } else {
        println!("{}: {} x {}, total {:.3}", config.name, summary.rows, summary.cols, summary.total);
        if let Some(source) = &summary.source {
            println!("  source: {source}");
        }
        let r = &summary.round_trip;
        println!(
            "  covered {:.3}, dropped {:.3}, max drift {:.3e} rows / {:.3e} cols",
            r.covered_total, r.dropped_total, r.max_row_drift, r.max_col_drift
        );
        if r.fallback_cells + r.equal_split_cells > 0 {
            println!(
                "  {} cell(s) used fallback weights, {} split evenly",
                r.fallback_cells, r.equal_split_cells
            );
        }
        println!(
            "  checks: {}/{} passed",
            summary.diagnostics.summary.passed, summary.diagnostics.summary.total
        );
    }

    if !passed {
        let failed: Vec<&str> = summary.diagnostics.failures().map(|c| c.name.as_str()).collect();
        return Err(CliError::new(EXIT_TOLERANCE, format!("checks failed: {}", failed.join(", "))));
    }
    Ok(())
}

fn expand_table(
    table: &Table,
    corr: &CorrespondenceMatrix,
    config: &ReflectConfig,
) -> Result<Table, CliError> {
    let parents = corr.parent_map();
    let target = corr.range().clone();
    let from = corr.domain().codes();
    if from == table.rows().codes() && from == table.cols().codes() {
        expand_square_matrix(table, target, &parents, &config.sibling_groups)
            .map_err(CliError::structure)
    } else if from == table.cols().codes() {
        expand_columns(table, target, &parents).map_err(CliError::structure)
    } else {
        Err(CliError::new(
            EXIT_CONFIG_INVALID,
            "inputs.expand mapping must start from the reflected column taxonomy",
        ))
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn cmd_reflect_validate(config_path: &Path) -> Result<(), CliError> {
    let plan = plan(config_path)?;
    let built = [
        Some(&plan.rows),
        plan.cols.as_ref(),
        plan.old_rows.as_ref(),
        plan.old_cols.as_ref(),
        plan.expand.as_ref(),
    ]
    .into_iter()
    .flatten()
    .count();
    println!(
        "{}: config valid, {} correspondence(s) built ({} x {} target)",
        plan.config.name,
        built,
        plan.rows.range().len(),
        plan.cols.as_ref().map_or(0, |c| c.range().len()),
    );
    Ok(())
}
