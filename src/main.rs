use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zerogen::{load_config, pipeline_for_snapshot, GenerationOptions, GenerationResult};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the Zero schema from an introspection snapshot
    Generate {
        #[command(flatten)]
        run: RunArgs,
        /// Rewrite files even when their content is unchanged
        #[arg(long)]
        force: bool,
        /// Render and diff, but write nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Fail when the generated schema differs from the one on disk
    Check {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the migration notes for the next generation
    Diff {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Introspection snapshot (.json or .toml)
    #[arg(long, default_value = "schema.json")]
    input: PathBuf,
    /// Config file. Defaults to ./zerogen.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory
    #[arg(long, default_value = "generated")]
    out: PathBuf,
    /// Render one table only; nothing is written
    #[arg(long)]
    table: Option<String>,
    /// Do not run the configured formatter
    #[arg(long)]
    skip_formatting: bool,
    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    fn options(&self, dry_run: bool, force: bool) -> GenerationOptions {
        GenerationOptions {
            table: self.table.clone(),
            output_dir: self.out.clone(),
            dry_run,
            force,
            skip_formatting: self.skip_formatting,
        }
    }

    fn execute(&self, dry_run: bool, force: bool) -> Result<GenerationResult> {
        let config = load_config(self.config.as_deref())?;
        let pipeline = pipeline_for_snapshot(&self.input, config, self.options(dry_run, force))?;
        let result = pipeline.execute(None);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Ok(result)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "zerogen=debug" } else { "zerogen=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(result: &GenerationResult, show_models: bool) {
    if show_models {
        for model in &result.generated_models {
            println!("{}", model.content);
        }
    }
    for path in &result.generated_files {
        println!("wrote {}", path.display());
    }
    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("error: {}", error);
    }
    if let Some(diagnostic) = &result.diagnostic {
        eprintln!("{}", diagnostic);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate { run, force, dry_run } => {
            let result = run.execute(dry_run, force)?;
            if !run.json {
                print_summary(&result, run.table.is_some() || dry_run);
            }
            if !result.success {
                bail!("generation finished with {} error(s)", result.errors.len());
            }
        }
        Commands::Check { run } => {
            let result = run.execute(true, false)?;
            if !result.success {
                bail!("generation finished with {} error(s)", result.errors.len());
            }
            if let Some(changes) = &result.changes {
                if changes.has_changes() {
                    for note in changes.migration_notes() {
                        eprintln!("{}", note);
                    }
                    bail!("generated schema is out of date; run `zerogen generate`");
                }
            }
            if !run.json {
                println!("schema is up to date");
            }
        }
        Commands::Diff { run } => {
            let result = run.execute(true, false)?;
            if !run.json {
                match &result.changes {
                    Some(changes) => {
                        for note in changes.migration_notes() {
                            println!("{}", note);
                        }
                    }
                    None => print_summary(&result, false),
                }
            }
            if !result.success {
                bail!("generation finished with {} error(s)", result.errors.len());
            }
        }
    }
    Ok(())
}
