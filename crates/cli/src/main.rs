// eeio CLI - config-driven reflection runs and emissions registry builds

mod exit_codes;
mod reflect;
mod registry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use exit_codes::{
    emissions_exit_code, io_exit_code, reflect_exit_code, structure_exit_code, EXIT_INPUT_READ,
    EXIT_SUCCESS,
};
use reflect::ReflectCommands;
use registry::RegistryCommands;

#[derive(Parser)]
#[command(name = "eeio")]
#[command(about = "Reclassify sector tables between taxonomies and build emissions matrices")]
#[command(version, long_version = long_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reflect a table into another sector taxonomy
    Reflect {
        #[command(subcommand)]
        command: ReflectCommands,
    },

    /// Check the emissions allocation registry or build an emissions matrix
    Registry {
        #[command(subcommand)]
        command: RegistryCommands,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("EEIO_COMMIT"),
        ")",
        "\nreflect: eeio-reflect ",
        env!("CARGO_PKG_VERSION"),
        "\ntarget:  ",
        env!("EEIO_TARGET"),
    )
}

/// Log records from the library crates reach the subscriber through its
/// `log` bridge. Output goes to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Reflect { command } => reflect::cmd_reflect(command),
        Commands::Registry { command } => registry::cmd_registry(command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(err: eeio_io::IoError) -> Self {
        let hint = match &err {
            eeio_io::IoError::Schema { .. } => {
                Some("the file's codes must match the declared taxonomy exactly".to_string())
            }
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn structure(err: eeio_core::StructureError) -> Self {
        Self::new(structure_exit_code(&err), err.to_string())
    }

    pub fn reflect(err: eeio_reflect::ReflectError) -> Self {
        let hint = match &err {
            eeio_reflect::ReflectError::Coverage { axis, .. } => Some(format!(
                "map the codes in the {axis} mapping, or list them in expected_{}_dropped",
                if *axis == "row" { "row" } else { "col" }
            )),
            _ => None,
        };
        Self { code: reflect_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn emissions(err: eeio_emissions::EmissionsError) -> Self {
        let hint = match &err {
            eeio_emissions::EmissionsError::MissingInput { .. } => {
                Some("add the missing file under [inputs] in the registry config".to_string())
            }
            _ => None,
        };
        Self { code: emissions_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Read a config file; relative paths inside it resolve against its directory.
pub fn read_config(path: &Path) -> Result<(String, PathBuf), CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_INPUT_READ, format!("cannot read config {}: {e}", path.display()))
    })?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((content, base_dir))
}
