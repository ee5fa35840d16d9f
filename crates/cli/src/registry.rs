//! `eeio registry` - emissions allocation registry checks and matrix builds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Subcommand;
use eeio_emissions::{
    build_emissions_matrix, check_gas_totals, check_inventory, AllocationInputs, EmissionsSource,
    EmissionsSourceCategory, Gas, Registry, RegistryConfig, RegistryInputs,
};
use eeio_io::{read_table_as, read_taxonomy, read_vector, read_vector_as, write_json, write_table};
use eeio_reflect::{Comparison, DiagnosticsReport};
use serde::Serialize;

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_ERROR, EXIT_INPUT_PARSE};
use crate::{read_config, CliError};

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Check that every emissions source has exactly one allocation rule
    #[command(after_help = "\
Examples:
  eeio registry check
  eeio registry check ceda.registry.toml")]
    Check {
        /// Optional .registry.toml whose overrides are applied first
        config: Option<PathBuf>,

        /// List every source with its rule
        #[arg(long)]
        verbose: bool,
    },

    /// Allocate every source's inventory total and write the emissions matrix
    #[command(after_help = "\
Examples:
  eeio registry build ceda.registry.toml
  eeio registry build ceda.registry.toml --json")]
    Build {
        /// Path to the .registry.toml config file
        config: PathBuf,

        /// Print the build summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_registry(cmd: RegistryCommands) -> Result<(), CliError> {
    match cmd {
        RegistryCommands::Check { config, verbose } => {
            cmd_registry_check(config.as_deref(), verbose)
        }
        RegistryCommands::Build { config, json } => cmd_registry_build(&config, json),
    }
}

fn load_config(path: &Path) -> Result<(RegistryConfig, PathBuf), CliError> {
    let (content, base_dir) = read_config(path)?;
    let config = RegistryConfig::from_toml(&content).map_err(CliError::emissions)?;
    Ok((config, base_dir))
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn cmd_registry_check(config_path: Option<&Path>, verbose: bool) -> Result<(), CliError> {
    let registry = match config_path {
        Some(path) => {
            let (config, _) = load_config(path)?;
            Registry::standard().with_config(&config).map_err(CliError::emissions)?
        }
        None => Registry::standard(),
    };
    registry.check().map_err(CliError::emissions)?;

    if verbose {
        for category in EmissionsSourceCategory::ALL {
            println!("{} ({})", category.description(), category.code());
            for (source, rule) in registry.iter().filter(|(s, _)| s.category() == *category) {
                println!("  {:<55} {:?}", source.code(), rule);
            }
        }
    }
    println!(
        "registry complete: {} sources, {} categories, {} sectors referenced",
        registry.len(),
        EmissionsSourceCategory::ALL.len(),
        registry.referenced_sectors().len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct BuildSummary {
    sources: usize,
    sectors: usize,
    total: f64,
    by_ghg_group: Vec<(String, f64)>,
    diagnostics: DiagnosticsReport,
}

fn input_files(config: &RegistryConfig) -> Result<&RegistryInputs, CliError> {
    config.inputs.as_ref().ok_or_else(|| {
        CliError::new(EXIT_CONFIG_INVALID, "registry build needs an [inputs] section")
            .with_hint("name the sectors and inventory CSV files under [inputs]")
    })
}

/// `code,total` rows keyed by a parsed code (source or gas).
fn read_totals<K>(path: &Path) -> Result<BTreeMap<K, f64>, CliError>
where
    K: FromStr<Err = String> + Ord,
{
    let totals = read_vector(path).map_err(CliError::io)?;
    let mut out = BTreeMap::new();
    for (code, total) in totals.iter() {
        let key = code
            .parse()
            .map_err(|e: String| CliError::new(EXIT_INPUT_PARSE, format!("{}: {e}", path.display())))?;
        out.insert(key, total);
    }
    Ok(out)
}

fn load_inputs(files: &RegistryInputs, base_dir: &Path) -> Result<AllocationInputs, CliError> {
    let sectors = read_taxonomy(&base_dir.join(&files.sectors), "sectors")
        .map_err(CliError::io)?
        .shared();
    let mut inputs = AllocationInputs::new(sectors.clone());
    inputs.inventory = read_totals(&base_dir.join(&files.inventory))?;

    if let Some(path) = &files.gross_output {
        inputs.gross_output =
            Some(read_vector_as(&base_dir.join(path), Some(&sectors)).map_err(CliError::io)?);
    }
    if let Some(path) = &files.commodity_use {
        let table =
            read_table_as(&base_dir.join(path), None, Some(&sectors)).map_err(CliError::io)?;
        for commodity in table.rows().codes() {
            if let Some(row) = table.row(commodity) {
                inputs.commodity_use.insert(commodity.clone(), row);
            }
        }
    }
    Ok(inputs)
}

fn cmd_registry_build(config_path: &Path, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(config_path)?;
    let registry = Registry::standard().with_config(&config).map_err(CliError::emissions)?;
    let files = input_files(&config)?;
    let inputs = load_inputs(files, &base_dir)?;

    let matrix = build_emissions_matrix(&registry, &inputs).map_err(CliError::emissions)?;
    let tolerance = config.inventory_tolerance;
    let mut checks: Vec<Comparison> = Vec::new();
    if let Some(path) = &files.reference_by_source {
        let reference: BTreeMap<EmissionsSource, f64> = read_totals(&base_dir.join(path))?;
        checks.extend(check_inventory(&matrix, &reference, tolerance).map_err(CliError::emissions)?);
    }
    if let Some(path) = &files.reference_by_gas {
        let reference: BTreeMap<Gas, f64> = read_totals(&base_dir.join(path))?;
        checks.extend(check_gas_totals(&matrix, &reference, tolerance).map_err(CliError::emissions)?);
    }
    let by_gas = matrix.by_gas().map_err(CliError::emissions)?;
    let groups = matrix.by_ghg_group().map_err(CliError::emissions)?;

    let outputs = [
        (&config.output.matrix, matrix.table()),
        (&config.output.by_gas, &by_gas),
    ];
    for (out, table) in outputs {
        if let Some(out) = out {
            let path = base_dir.join(out);
            write_table(&path, table).map_err(CliError::io)?;
            let (rows, cols) = table.shape();
            tracing::info!(path = %path.display(), "wrote {rows} x {cols} table");
        }
    }

    let summary = BuildSummary {
        sources: matrix.table().shape().0,
        sectors: matrix.table().shape().1,
        total: matrix.table().total(),
        by_ghg_group: groups.row_sums().iter().map(|(g, v)| (g.to_string(), v)).collect(),
        diagnostics: DiagnosticsReport::new(&config.name, checks),
    };
    if let Some(out) = &config.output.json {
        write_json(&base_dir.join(out), &summary).map_err(CliError::io)?;
    }

    if json {
        let s = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{s}");
    } else {
        println!(
            "{}: {} sources x {} sectors, total {:.3}",
            config.name, summary.sources, summary.sectors, summary.total
        );
        for (group, total) in &summary.by_ghg_group {
            println!("  {group:<5} {total:.3}");
        }
        if summary.diagnostics.summary.total > 0 {
            println!(
                "  reference checks: {}/{} within {}",
                summary.diagnostics.summary.passed,
                summary.diagnostics.summary.total,
                config.inventory_tolerance
            );
        }
    }
    Ok(())
}
