use crate::{
    index::{self, CanaryMode, Config, DEFAULT_INGRESS_CLASS},
    log_diagnostics, read_records, write_report, LogFilter, LogFormat,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{fs::File, io::BufWriter, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[clap(
    name = "ingress-converter",
    about = "Converts ingress-nginx Ingress resources into Gateway API routes"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_converter=info,warn",
        env = "INGRESS_CONVERTER_LOG"
    )]
    log_level: LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// Manifests containing Ingress resources. `-` reads from stdin.
    #[clap(required = true)]
    inputs: Vec<PathBuf>,

    /// The ingress class assumed for Ingresses that do not name one.
    #[clap(long, default_value = DEFAULT_INGRESS_CLASS)]
    default_ingress_class: String,

    /// How weights are assigned when a rule has more than two backends.
    #[clap(long, default_value = "strict", value_parser = parse_canary_mode)]
    canary_mode: CanaryMode,

    /// Writes the conversion to a file instead of stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Exits with an error if any conversion errors were reported.
    #[clap(long)]
    fail_on_error: bool,
}

impl Args {
    #[inline]
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            inputs,
            default_ingress_class,
            canary_mode,
            output,
            fail_on_error,
        } = self;

        log_format.try_init(&log_level)?;

        let records = read_records(&inputs)?;
        info!(records = records.len(), "Read Ingress resources");

        let config = Config {
            default_ingress_class,
            canary_mode,
            ..Config::default()
        };
        let conversion = index::convert(&records, &config);
        log_diagnostics(&conversion.diagnostics);
        if conversion.routes.is_empty() {
            warn!("No routes were produced");
        }

        match output {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                write_report(&conversion, BufWriter::new(file))?;
                info!(path = %path.display(), routes = conversion.routes.len(), "Wrote routes");
            }
            None => write_report(&conversion, std::io::stdout().lock())?,
        }

        let errors = conversion.diagnostics.errors.len();
        if fail_on_error && errors > 0 {
            bail!("conversion reported {errors} error(s)");
        }
        Ok(())
    }
}

fn parse_canary_mode(s: &str) -> Result<CanaryMode> {
    match s {
        "strict" => Ok(CanaryMode::Strict),
        "legacy" => Ok(CanaryMode::Legacy),
        s => bail!("invalid canary mode: {s} (expected strict or legacy)"),
    }
}
