//! CLI tool for extracting vocabulary words from pptx archives.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use croco_core::{normalize_words, YandexSpeller};
use croco_pptx::extract_words_from_archive;

/// Extract, spellcheck, and deduplicate words from a zip of pptx decks.
#[derive(Parser, Debug)]
#[command(name = "croco-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input zip archive of .pptx decks
    #[arg(short, long)]
    archive: PathBuf,

    /// Output word list (default: print to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the spell-correction round-trip
    #[arg(long)]
    no_spell: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Pass-through corrector for offline runs.
struct NoSpeller;

impl croco_core::SpellCorrector for NoSpeller {
    fn correct_text(&self, text: &str) -> croco_core::Result<String> {
        Ok(text.to_string())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let file = File::open(&args.archive)
        .with_context(|| format!("Failed to open {}", args.archive.display()))?;
    let candidates = extract_words_from_archive(BufReader::new(file))
        .with_context(|| format!("Failed to read {}", args.archive.display()))?;

    if args.verbose {
        eprintln!("Extracted {} candidate words", candidates.len());
    }

    let words = if args.no_spell {
        log::debug!("spell correction disabled");
        normalize_words(&candidates, &NoSpeller).context("Normalization failed")?
    } else {
        normalize_words(&candidates, &YandexSpeller::new()).context("Spell correction failed")?
    };

    let mut body = words.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
            }
            let mut out = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            out.write_all(body.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if args.verbose {
                eprintln!("Written {} words to {}", words.len(), path.display());
            }
        }
        None => {
            print!("{}", body);
        }
    }

    Ok(())
}
