use clap::{Parser as ClapParser, Subcommand};
use sheet_lang::cli::{
    self, CheckOptions, CheckResult, CliError, CompileOptions, CompileOutput, EvalOptions, MatchOptions,
};
use sheet_lang::EngineConfig;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "sheet")]
#[command(about = "Sheet - compile, run and inspect budget spreadsheet formulas")]
#[command(version)]
struct Cli {
    /// JSON engine config (scope, binding, schema)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a formula
    Check {
        /// The formula (reads from stdin if not provided)
        formula: Option<String>,

        /// Only validate syntax, don't compile
        #[arg(long)]
        syntax_only: bool,
    },

    /// Compile a formula and print the program
    Compile {
        formula: Option<String>,

        /// Scope for bare cell names
        #[arg(long)]
        scope: Option<String>,

        /// Cell that receives the result
        #[arg(long)]
        binding: Option<String>,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,

        /// Print a numbered instruction listing instead of JSON
        #[arg(long)]
        listing: bool,
    },

    /// Evaluate a formula
    Eval {
        formula: Option<String>,

        /// Cell values as a JSON object
        #[arg(long)]
        vars: Option<String>,

        /// Rows every query returns, as a JSON array
        #[arg(long)]
        rows: Option<String>,
    },

    /// Show which queries of a formula a row can affect
    Match {
        formula: Option<String>,

        /// Row columns as a JSON object
        #[arg(long)]
        row: String,
    },

    /// Show documentation (lists categories without a topic)
    Docs {
        /// Category name
        topic: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Check { formula, syntax_only } => {
            let options = CheckOptions {
                formula: read_formula(formula)?,
                syntax_only,
            };
            match cli::execute_check(&options, &config)? {
                CheckResult::SyntaxValid => println!("Syntax is valid"),
                CheckResult::Compiled {
                    ops,
                    dependencies,
                    queries,
                } => {
                    println!("OK: {} instructions, {} queries", ops, queries);
                    for dep in dependencies {
                        println!("  reads {}", dep);
                    }
                }
            }
        }
        Commands::Compile {
            formula,
            scope,
            binding,
            pretty,
            listing,
        } => {
            let options = CompileOptions {
                formula: read_formula(formula)?,
                scope,
                binding,
                listing,
            };
            match cli::execute_compile(&options, &config)? {
                CompileOutput::Listing(text) => print!("{}", text),
                CompileOutput::Json(json) => print_json(&json, pretty)?,
            }
        }
        Commands::Eval { formula, vars, rows } => {
            let options = EvalOptions {
                formula: read_formula(formula)?,
                vars,
                rows,
            };
            let result = cli::execute_eval(&options, config).await?;
            print_json(&result, false)?;
        }
        Commands::Match { formula, row } => {
            let options = MatchOptions {
                formula: read_formula(formula)?,
                row,
            };
            let matches = cli::execute_match(&options, &config)?;
            print_json(&serde_json::to_value(&matches)?, true)?;
        }
        Commands::Docs { topic: None } => print!("{}", cli::get_docs_overview()),
        Commands::Docs { topic: Some(topic) } => print!("{}", cli::get_doc_category(&topic)?),
    }
    Ok(())
}

fn read_formula(formula: Option<String>) -> Result<String, CliError> {
    match formula {
        Some(s) => Ok(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
