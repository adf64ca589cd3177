//! CLI tool to parse, format, validate, and apply Caddyfile configurations.

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use caddyfile_engine::settings::ValidatorKind;
use caddyfile_engine::{
    ApplyError, Diagnostic, ParseOptions, Settings, Verdict, apply, load_document, parse_report,
    read_config, tokenize_with, write_document,
};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code when the validator gave no verdict.
const EXIT_UNKNOWN: u8 = 3;

#[derive(Parser)]
#[command(name = "caddyfile", version)]
#[command(about = "Parse, format, validate, and apply Caddyfile configurations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "CADDYFILE_SETTINGS")]
    settings: Option<PathBuf>,

    /// Caddy binary used by the command validator
    #[arg(long, global = true, env = "CADDY_BIN")]
    caddy_bin: Option<PathBuf>,

    /// Admin API base URL
    #[arg(long, global = true, env = "CADDY_ADMIN")]
    admin_url: Option<String>,

    #[arg(long, global = true, value_enum)]
    validator: Option<ValidatorArg>,

    /// Keep `{placeholder}` braces inside words
    #[arg(long, global = true)]
    placeholders: bool,

    /// Use the whitespace-only statement grammar
    #[arg(long, global = true)]
    no_line_breaks: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ValidatorArg {
    Command,
    Admin,
}

#[derive(Subcommand)]
enum Command {
    /// Parse files and report what was recovered
    Parse {
        /// Print the parse report as JSON
        #[arg(long)]
        json: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print files in canonical form
    Fmt {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check that files are in canonical form
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate a file with the configured authority
    Validate { file: PathBuf },
    /// Rewrite, validate, save, and reload a file
    Apply {
        file: PathBuf,
        /// Apply even when some top-level tokens could not be parsed
        #[arg(long)]
        force: bool,
    },
    /// Print the running configuration
    Current,
    /// Print certificate authority info
    Ca {
        #[arg(default_value = "local")]
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    let options = ParseOptions {
        line_breaks: !cli.no_line_breaks,
        placeholders: cli.placeholders,
        ..ParseOptions::default()
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match run(cli.command, &settings, &options, &cancel).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn Error>> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(bin) = &cli.caddy_bin {
        settings.caddy_bin.clone_from(bin);
    }
    if let Some(url) = &cli.admin_url {
        settings.admin_url.clone_from(url);
    }
    if let Some(kind) = cli.validator {
        settings.validator = match kind {
            ValidatorArg::Command => ValidatorKind::Command,
            ValidatorArg::Admin => ValidatorKind::Admin,
        };
    }
    Ok(settings)
}

async fn run(
    command: Command,
    settings: &Settings,
    options: &ParseOptions,
    cancel: &CancellationToken,
) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Parse { json, files } => Ok(each_file(&files, |path, content| {
            summarize(path, content, options, json)
        })),
        Command::Fmt { files } => Ok(each_file(&files, |_, content| {
            print!("{}", rewrite(content, options));
            true
        })),
        Command::Check { files } => Ok(each_file(&files, |path, content| {
            if rewrite(content, options) == content {
                eprintln!("{}: formatted", path.display());
                true
            } else {
                eprintln!("{}: not formatted", path.display());
                false
            }
        })),
        Command::Validate { file } => {
            let text = read_config(&file)?;
            let validator = settings.validator()?;
            match validator.validate(&text, cancel).await {
                Ok(Verdict::Valid(warnings)) => {
                    print_diagnostics(&file, "warning", &warnings);
                    eprintln!("{}: valid", file.display());
                    Ok(ExitCode::SUCCESS)
                }
                Ok(Verdict::Invalid(diagnostics)) => {
                    print_diagnostics(&file, "error", &diagnostics);
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => {
                    eprintln!("{}: {e}", file.display());
                    Ok(ExitCode::from(EXIT_UNKNOWN))
                }
            }
        }
        Command::Apply { file, force } => {
            let report = load_document(&file, options)?;
            if !report.skipped.is_empty() && !force {
                for s in &report.skipped {
                    eprintln!(
                        "{}:{}:{}: unparsed ({:?}): {}",
                        file.display(),
                        s.span.line,
                        s.span.column,
                        s.reason,
                        s.text
                    );
                }
                eprintln!("{}: refusing to apply, rerun with --force", file.display());
                return Ok(ExitCode::FAILURE);
            }

            let validator = settings.validator()?;
            let admin = settings.admin_client()?;
            match apply(&report.document, validator.as_ref(), &admin, &file, cancel).await {
                Ok(_) => {
                    eprintln!("{}: applied", file.display());
                    Ok(ExitCode::SUCCESS)
                }
                Err(ApplyError::Invalid(diagnostics)) => {
                    print_diagnostics(&file, "error", &diagnostics);
                    Ok(ExitCode::FAILURE)
                }
                Err(e @ ApplyError::Bridge(_)) => {
                    eprintln!("{}: {e}", file.display());
                    Ok(ExitCode::from(EXIT_UNKNOWN))
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Current => {
            let config = settings.admin_client()?.current_config(cancel).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&config)?;
            if !config.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Ca { id } => {
            let info = settings.admin_client()?.ca_info(&id, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run `f` over every readable file. Fails if any file fails.
fn each_file(files: &[PathBuf], mut f: impl FnMut(&Path, &str) -> bool) -> ExitCode {
    let mut had_error = false;

    for path in files {
        match read_config(path) {
            Ok(content) => had_error |= !f(path, &content),
            Err(e) => {
                eprintln!("{e}");
                had_error = true;
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn rewrite(content: &str, options: &ParseOptions) -> String {
    let tokens = tokenize_with(content, options.lex_options());
    write_document(&parse_report(&tokens, options).document)
}

fn summarize(path: &Path, content: &str, options: &ParseOptions, json: bool) -> bool {
    let tokens = tokenize_with(content, options.lex_options());
    let report = parse_report(&tokens, options);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                return false;
            }
        }
    } else {
        let doc = &report.document;
        let global = if doc.global.is_some() {
            ", global options"
        } else {
            ""
        };
        eprintln!(
            "{}: {} site(s), {} snippet(s){global}",
            path.display(),
            doc.sites.len(),
            doc.snippets.len()
        );
        for name in doc.unresolved_imports() {
            eprintln!("{}: import of unknown snippet {name}", path.display());
        }
        for s in &report.skipped {
            eprintln!(
                "{}:{}:{}: skipped ({:?}): {}",
                path.display(),
                s.span.line,
                s.span.column,
                s.reason,
                s.text
            );
        }
    }
    true
}

fn print_diagnostics(path: &Path, severity: &str, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        eprintln!("{}:{}: {severity}: {}", path.display(), d.line, d.message);
    }
}
