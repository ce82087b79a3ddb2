//! MH/SM field exchange CLI.
//!
//! Transfers a field between an ESRI ASCII raster (MH) and a facet/triangle
//! mesh with per-triangle values (SM), in either direction, and scores
//! round trips.

mod commands;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use exchange_common::{AlignmentMode, ExchangeConfig, MappingMethod, PixelReducer};

#[derive(Parser, Debug)]
#[command(name = "mhsm")]
#[command(about = "Exchange fields between MH raster grids and SM triangle meshes")]
struct Cli {
    /// YAML configuration file (MHSM_* environment variables override it)
    #[arg(short, long, env = "MHSM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Mapping method override
    #[arg(long, global = true, value_enum)]
    method: Option<MethodArg>,

    /// Use mesh coordinates as they are instead of centering on the grid
    #[arg(long, global = true)]
    no_align: bool,

    /// Log the aligned mesh placement before mapping
    #[arg(long, global = true)]
    preview: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Surface,
    Barycenter,
}

impl From<MethodArg> for MappingMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Surface => MappingMethod::Surface,
            MethodArg::Barycenter => MappingMethod::Barycenter,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Raster to mesh: write one value per triangle
    ToSm {
        /// Input ASCII grid
        #[arg(short, long)]
        grid: PathBuf,

        /// Input .cir mesh
        #[arg(short, long)]
        mesh: PathBuf,

        /// Output .val file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Mesh to raster on the geometry of a reference grid
    ToMh {
        /// Reference ASCII grid (geometry only)
        #[arg(short, long)]
        reference: PathBuf,

        /// Input .cir mesh
        #[arg(short, long)]
        mesh: PathBuf,

        /// Input .val file
        #[arg(short, long)]
        values: PathBuf,

        /// Output ASCII grid
        #[arg(short, long)]
        out: PathBuf,

        /// Pixel reducer override (mean, median, max, ...)
        #[arg(long)]
        reducer: Option<String>,
    },

    /// Compare a reconstructed grid to its reference
    Compare {
        #[arg(short, long)]
        reference: PathBuf,

        #[arg(short = 'R', long)]
        reconstructed: PathBuf,

        /// Write <base>_mh_ref.asc, <base>_mh_reconstructed.asc, <base>_mh_error.asc
        #[arg(short, long)]
        out_base: Option<PathBuf>,
    },

    /// Rebuild the raster from mesh values and compare it to the reference
    Audit {
        #[arg(short, long)]
        reference: PathBuf,

        #[arg(short, long)]
        mesh: PathBuf,

        #[arg(short, long)]
        values: PathBuf,

        #[arg(short, long)]
        out_base: Option<PathBuf>,
    },

    /// Check that a .val file matches a mesh
    Verify {
        #[arg(short, long)]
        mesh: PathBuf,

        #[arg(short, long)]
        values: PathBuf,
    },

    /// Summarize a grid (.asc), mesh (.cir) or value (.val) file
    Inspect {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json)?;

    let config = load_config(&cli)?;
    debug!(?config, "Loaded configuration");

    let format = cli.format;
    let preview = cli.preview;
    match cli.command {
        Commands::ToSm { grid, mesh, out } => {
            commands::to_sm(config, preview, &grid, &mesh, &out, format)
        }
        Commands::ToMh {
            reference,
            mesh,
            values,
            out,
            reducer,
        } => {
            let mut config = config;
            if let Some(name) = reducer {
                config.aggregation.pixel_reducer = PixelReducer::from_str(&name)
                    .with_context(|| format!("unknown pixel reducer '{}'", name))?;
            }
            commands::to_mh(config, preview, &reference, &mesh, &values, &out, format)
        }
        Commands::Compare {
            reference,
            reconstructed,
            out_base,
        } => commands::compare(&config, &reference, &reconstructed, out_base.as_deref(), format),
        Commands::Audit {
            reference,
            mesh,
            values,
            out_base,
        } => commands::audit(
            config,
            preview,
            &reference,
            &mesh,
            &values,
            out_base.as_deref(),
            format,
        ),
        Commands::Verify { mesh, values } => commands::verify(&config, &mesh, &values, format),
        Commands::Inspect { file } => commands::inspect(&config, &file, format),
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Defaults, then the YAML file, then `MHSM_*` variables, then flags.
fn load_config(cli: &Cli) -> Result<ExchangeConfig> {
    let mut config = match &cli.config {
        Some(path) => ExchangeConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?
            .with_env_overrides(),
        None => ExchangeConfig::from_env(),
    };

    if let Some(method) = cli.method {
        config.mapping.method = method.into();
    }
    if cli.no_align {
        config.mapping.alignment = AlignmentMode::None;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_to_sm() {
        let cli = Cli::try_parse_from([
            "mhsm", "to-sm", "--grid", "a.asc", "--mesh", "b.cir", "--out", "c.val",
        ])
        .unwrap();
        match cli.command {
            Commands::ToSm { grid, mesh, out } => {
                assert_eq!(grid, PathBuf::from("a.asc"));
                assert_eq!(mesh, PathBuf::from("b.cir"));
                assert_eq!(out, PathBuf::from("c.val"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mhsm", "audit", "-r", "ref.asc", "-m", "sm.cir", "-v", "sm.val", "--method",
            "barycenter", "--no-align",
        ])
        .unwrap();
        assert_eq!(cli.method, Some(MethodArg::Barycenter));
        assert!(cli.no_align);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "mhsm", "--method", "barycenter", "--no-align", "inspect", "x.asc",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.mapping.method, MappingMethod::Barycenter);
        assert_eq!(config.mapping.alignment, AlignmentMode::None);
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let result = Cli::try_parse_from(["mhsm", "--method", "barycentric", "inspect", "x.asc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_argument() {
        assert!(Cli::try_parse_from(["mhsm", "verify", "--mesh", "sm.cir"]).is_err());
    }
}
