use clap::Parser;
use geopiv::io::read_height_grid;
use geopiv::{CorrelationMethod, DemPair, GroundResults, Piv, PivConfig, SkipReason};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "geopiv displacement field CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MethodConfig {
    Fft,
    Spatial,
}

impl From<MethodConfig> for CorrelationMethod {
    fn from(value: MethodConfig) -> Self {
        match value {
            MethodConfig::Fft => CorrelationMethod::Fft,
            MethodConfig::Spatial => CorrelationMethod::Spatial,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    before_height: String,
    after_height: String,
    template_size: usize,
    step_size: usize,
    before_uncertainty: Option<String>,
    after_uncertainty: Option<String>,
    outname: Option<String>,
    output_dir: Option<String>,
    method: MethodConfig,
    parallel: bool,
    fd_increment: f64,
}

impl Default for Config {
    fn default() -> Self {
        let cfg = PivConfig::default();
        Self {
            before_height: String::new(),
            after_height: String::new(),
            template_size: cfg.template_size,
            step_size: cfg.step_size,
            before_uncertainty: None,
            after_uncertainty: None,
            outname: None,
            output_dir: None,
            method: MethodConfig::Fft,
            parallel: cfg.parallel,
            fd_increment: cfg.fd_increment,
        }
    }
}

impl Config {
    fn prefix(&self) -> String {
        match &self.outname {
            Some(name) if !name.is_empty() => format!("{name}_"),
            _ => String::new(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("geopiv=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.before_height.is_empty() || config.after_height.is_empty() {
        return Err("before_height and after_height must be set in the config".into());
    }

    let uncertainty_paths = match (&config.before_uncertainty, &config.after_uncertainty) {
        (Some(before), Some(after)) => Some((before, after)),
        (None, None) => None,
        _ => {
            return Err(
                "before_uncertainty and after_uncertainty must be given together".into(),
            )
        }
    };

    let before = read_height_grid(&config.before_height)?;
    let after = read_height_grid(&config.after_height)?;
    let uncertainty = match uncertainty_paths {
        Some((b, a)) => Some((read_height_grid(b)?, read_height_grid(a)?)),
        None => None,
    };

    let mut pair = DemPair::new(&before, &after)?;
    if let Some((before_sigma, after_sigma)) = &uncertainty {
        pair = pair.with_uncertainty(before_sigma, after_sigma)?;
    }

    let piv = Piv::new(PivConfig {
        template_size: config.template_size,
        step_size: config.step_size,
        propagate: uncertainty.is_some(),
        method: config.method.into(),
        fd_increment: config.fd_increment,
        parallel: config.parallel,
    })?;
    let output = piv.run(&pair)?;

    let stats = &output.stats;
    tracing::info!(
        lattice = ?stats.lattice,
        accepted = stats.accepted,
        skipped = stats.skipped_total(),
        "scan finished"
    );
    for reason in SkipReason::ALL {
        tracing::info!(
            reason = reason.as_str(),
            count = stats.skipped(reason),
            "tiles skipped"
        );
    }

    let results = GroundResults::from_output(&output, pair.transform());
    let dir = config
        .output_dir
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)?;
    let paths = results.write(&dir, &config.prefix())?;

    println!(
        "PIV origins and displacement vectors saved to file '{}'",
        paths.origins_vectors.display()
    );
    if let Some(path) = paths.covariances {
        println!(
            "PIV displacement vector covariance matrices saved to file '{}'",
            path.display()
        );
    }

    Ok(())
}
