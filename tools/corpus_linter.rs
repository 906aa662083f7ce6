/// Corpus Linter — validates token corpora for coverage and broken references.
///
/// Usage: corpus_linter <path> [--min-tokens <n>]
use clap::Parser;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::LazyLock;
use textforge::Inventory;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The head of any placeholder, nested or not: `[Category:`, `[Category]` or
/// `[$name]`. Names are ASCII word characters, as in the render engine.
static REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)\[(\$?)(\w+)[:\]]").expect("reference pattern is valid"));

#[derive(Parser, Debug)]
#[command(name = "corpus_linter", about = "Validate token corpora", version)]
struct Cli {
    /// Corpus file, or a directory searched recursively for .ron/.yml/.yaml files.
    path: PathBuf,

    /// Warn about categories with fewer tokens than this.
    #[arg(long, default_value_t = 2)]
    min_tokens: usize,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut inventory = Inventory::new();
    let mut errors = Vec::new();

    if cli.path.is_file() {
        if let Err(e) = inventory.load(&cli.path) {
            eprintln!("ERROR: Failed to load corpus file: {}", e);
            process::exit(1);
        }
    } else if cli.path.is_dir() {
        load_corpora_recursive(&cli.path, &mut inventory, &mut errors);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", cli.path.display());
        process::exit(1);
    }

    println!(
        "Loaded {} tokens in {} categories",
        inventory.len(),
        inventory.categories().count()
    );

    let (lint_errors, warnings) = lint_corpus(&inventory, cli.min_tokens);
    errors.extend(lint_errors);

    println!("\n=== Corpus Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    process::exit(if errors.is_empty() { 0 } else { 1 });
}

fn load_corpora_recursive(dir: &Path, inventory: &mut Inventory, errors: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        errors.push(format!("Cannot read directory '{}'", dir.display()));
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            load_corpora_recursive(&path, inventory, errors);
            continue;
        }
        let ext = path.extension().and_then(|s| s.to_str());
        if !matches!(ext, Some("ron" | "yml" | "yaml")) {
            continue;
        }
        match inventory.load(&path) {
            Ok(accepted) => info!(path = %path.display(), accepted, "loaded corpus"),
            Err(e) => {
                warn!(path = %path.display(), "failed to load corpus");
                errors.push(format!("Failed to load '{}': {}", path.display(), e));
            }
        }
    }
}

fn lint_corpus(inventory: &Inventory, min_tokens: usize) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Sorted for a stable report
    let categories: BTreeMap<&str, usize> = inventory
        .categories()
        .map(|c| (c, inventory.tokens(c).len()))
        .collect();

    let assigned: HashSet<&str> = inventory
        .iter()
        .flat_map(|t| t.on_select.keys().map(String::as_str))
        .collect();

    for (&category, &count) in &categories {
        if count < min_tokens {
            warnings.push(format!(
                "Category '{}' has only {} tokens (minimum {} recommended)",
                category, count, min_tokens
            ));
        }

        let tokens = inventory.tokens(category);
        let mut self_referencing = 0;

        for token in tokens {
            let mut refers_to_self = false;
            for caps in REFERENCE_PATTERN.captures_iter(&token.content) {
                let name = &caps[2];
                if &caps[1] == "$" {
                    if !assigned.contains(name) {
                        warnings.push(format!(
                            "Token '{}' in '{}' uses variable '{}' which no token sets",
                            token.content, category, name
                        ));
                    }
                } else if !categories.contains_key(name) {
                    errors.push(format!(
                        "Token '{}' in '{}' references non-existent category '{}'",
                        token.content, category, name
                    ));
                } else if name == category {
                    refers_to_self = true;
                }
            }
            if refers_to_self {
                self_referencing += 1;
            }
        }

        if !tokens.is_empty() && self_referencing == tokens.len() {
            errors.push(format!(
                "Category '{}' has no non-recursive token (expansion never terminates)",
                category
            ));
        }
    }

    (errors, warnings)
}
