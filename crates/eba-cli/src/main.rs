use chrono::NaiveDateTime;
use eba_core::{AnalysisPayload, CompetencyBuckets, ReportConfig, SanitizeOptions, sanitize_with};
use eba_render::{ReportComposer, ReportRequest, no_charts};
use serde::Serialize;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Core(eba_core::Error),
    Json(serde_json::Error),
    Save(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Save(msg) => write!(f, "failed to write report: {msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<eba_core::Error> for CliError {
    fn from(value: eba_core::Error) -> Self {
        Self::Core(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Render,
    Validate,
    Sanitize,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    verbosity: u8,
    role: Option<String>,
    config: Option<PathBuf>,
    brand: Option<PathBuf>,
    out: Option<PathBuf>,
    no_charts: bool,
    scale: Option<f32>,
    generated_at: Option<NaiveDateTime>,
    pretty: bool,
    max_token: Option<usize>,
}

#[derive(Serialize)]
struct ValidateOut<'a> {
    payload: &'a AnalysisPayload,
    buckets: CompetencyBuckets<'a>,
}

fn usage() -> &'static str {
    "eba\n\
\n\
USAGE:\n\
  eba [render] [--role <title>] [--config <path>] [--brand <image>] [--out <path>] [--no-charts] [--scale <n>] [--generated-at <YYYY-MM-DDTHH:MM>] [-v|-vv] [<payload.json>|-]\n\
  eba validate [--config <path>] [--pretty] [<payload.json>|-]\n\
  eba sanitize [--max-token <n>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - render writes next to the input file with a .pdf extension (or ./report.pdf for stdin).\n\
  - validate prints the normalized payload and its competency buckets as JSON.\n\
  - Logging goes to stderr; RUST_LOG overrides -v.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "validate" => args.command = Command::Validate,
            "sanitize" => args.command = Command::Sanitize,
            "-v" => args.verbosity = args.verbosity.saturating_add(1),
            "-vv" => args.verbosity = args.verbosity.saturating_add(2),
            "--pretty" => args.pretty = true,
            "--no-charts" => args.no_charts = true,
            "--role" => {
                let role = next_value(&mut it)?;
                if !role.trim().is_empty() {
                    args.role = Some(role.trim().to_string());
                }
            }
            "--config" => args.config = Some(PathBuf::from(next_value(&mut it)?)),
            "--brand" => args.brand = Some(PathBuf::from(next_value(&mut it)?)),
            "--out" => args.out = Some(PathBuf::from(next_value(&mut it)?)),
            "--scale" => {
                let scale = next_value(&mut it)?
                    .parse::<f32>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.scale = Some(scale);
            }
            "--generated-at" => {
                let raw = next_value(&mut it)?;
                let at = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                    .map_err(|_| CliError::Usage(usage()))?;
                args.generated_at = Some(at);
            }
            "--max-token" => {
                let n = next_value(&mut it)?
                    .parse::<usize>()
                    .map_err(|_| CliError::Usage(usage()))?;
                if n == 0 {
                    return Err(CliError::Usage(usage()));
                }
                args.max_token = Some(n);
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn default_out_path(input: Option<&str>) -> PathBuf {
    match input {
        Some(path) if path != "-" => PathBuf::from(path).with_extension("pdf"),
        _ => PathBuf::from("report.pdf"),
    }
}

fn load_config(args: &Args) -> Result<ReportConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => ReportConfig::from_path(path)?,
        None => ReportConfig::default(),
    };
    if let Some(scale) = args.scale {
        for size in [
            &mut config.charts.radar,
            &mut config.charts.bars,
            &mut config.charts.gauge,
        ] {
            size.scale = scale;
        }
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Render => {
            let config = load_config(&args)?;
            let payload = AnalysisPayload::from_json_str(&read_input(args.input.as_deref())?)?;
            let composer = if args.no_charts {
                ReportComposer::with_backend(config, no_charts())
            } else {
                ReportComposer::new(config)
            };
            let out = args
                .out
                .clone()
                .unwrap_or_else(|| default_out_path(args.input.as_deref()));
            let request = ReportRequest {
                payload,
                role: args.role.clone(),
                brand_image: args.brand.clone(),
                generated_at: args.generated_at,
                save_to: Some(out.clone()),
            };
            let report = composer.compose(&request);
            if let Some(err) = report.save_error {
                return Err(CliError::Save(err));
            }
            if report.degraded {
                tracing::warn!("report was degraded to a minimal document");
            }
            println!("{} ({} pages)", out.display(), report.page_count);
            Ok(())
        }
        Command::Validate => {
            load_config(&args)?;
            let payload = AnalysisPayload::from_json_str(&read_input(args.input.as_deref())?)?;
            let buckets = payload.classify_competencies();
            write_json(
                &ValidateOut {
                    payload: &payload,
                    buckets,
                },
                args.pretty,
            )
        }
        Command::Sanitize => {
            let text = read_input(args.input.as_deref())?;
            let options = args
                .max_token
                .map(SanitizeOptions::with_max_token_len)
                .unwrap_or_default();
            print!("{}", sanitize_with(&text, &options));
            Ok(())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_logging(args.verbosity);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("eba")
            .chain(items.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn render_is_the_default_command() {
        let args = parse_args(&argv(&["payload.json"])).unwrap();
        assert_eq!(args.command, Command::Render);
        assert_eq!(args.input.as_deref(), Some("payload.json"));
    }

    #[test]
    fn parses_render_flags() {
        let args = parse_args(&argv(&[
            "render",
            "--role",
            "Data Analyst",
            "--no-charts",
            "--scale",
            "1.5",
            "--generated-at",
            "2025-03-14T09:30",
            "-vv",
            "-",
        ]))
        .unwrap();
        assert_eq!(args.role.as_deref(), Some("Data Analyst"));
        assert!(args.no_charts);
        assert_eq!(args.scale, Some(1.5));
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.input.as_deref(), Some("-"));
        assert!(args.generated_at.is_some());
    }

    #[test]
    fn rejects_bad_values_and_unknown_flags() {
        for bad in [
            &["--scale", "0"][..],
            &["--scale"][..],
            &["--max-token", "x"][..],
            &["--generated-at", "yesterday"][..],
            &["--bogus"][..],
            &["a.json", "b.json"][..],
        ] {
            assert!(matches!(parse_args(&argv(bad)), Err(CliError::Usage(_))), "{bad:?}");
        }
    }

    #[test]
    fn default_out_path_follows_input() {
        assert_eq!(
            default_out_path(Some("in/ana.json")),
            PathBuf::from("in/ana.pdf")
        );
        assert_eq!(default_out_path(Some("-")), PathBuf::from("report.pdf"));
        assert_eq!(default_out_path(None), PathBuf::from("report.pdf"));
    }
}
