/// Generate — render a template against one or more corpus files.
///
/// Usage: generate --corpus <file>... --template <text>
///        [--count <n>] [--seed <n>] [--set name=value]...
use clap::Parser;
use std::path::PathBuf;
use std::process;
use textforge::{Generator, State};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "generate",
    about = "Render a placeholder template against weighted token corpora",
    version
)]
struct Cli {
    /// Corpus file (.ron, .yml or .yaml). May be given more than once.
    #[arg(short, long = "corpus", value_name = "FILE", required = true)]
    corpora: Vec<PathBuf>,

    /// Instruction string, e.g. "A [Description] [Animal:type=mammal]".
    #[arg(short, long, value_name = "TEXT")]
    template: String,

    /// Number of outputs to generate.
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Pin a state variable before every run.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    vars: Vec<(String, String)>,

    /// Maximum substitutions per output.
    #[arg(long, value_name = "N")]
    max_rounds: Option<u32>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .init();

    let mut builder = Generator::builder().instructions(cli.template.as_str());
    for path in &cli.corpora {
        builder = builder.corpus_file(path);
    }
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if let Some(max_rounds) = cli.max_rounds {
        builder = builder.max_rounds(max_rounds);
    }

    let mut generator = match builder.build() {
        Ok(generator) => generator,
        Err(e) => {
            error!("failed to build generator: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let pinned: State = cli.vars.iter().cloned().collect();
    for _ in 0..cli.count {
        let mut state = pinned.clone();
        println!("{}", generator.run_with_state(&mut state));
    }
}
