//! Drug name input collection: positional args, files, and stdin.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Parse drug tokens from free-form text.
///
/// Supports one drug per line, comma-separated lists, whitespace-separated
/// lists, and `#` comments.
pub fn parse_drug_tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        for part in line.replace(',', " ").split_whitespace() {
            out.push(part.to_string());
        }
    }
    out
}

/// Collect drug names from positional args, files, and/or stdin.
///
/// - Each `--file` path is read in order; `-` means stdin.
/// - Positional args are appended after file inputs.
/// - With no positional args and no `--file`, piped stdin is read
///   automatically.
///
/// The result is de-duplicated case-insensitively, preserving order.
pub fn collect_drug_inputs(
    positional: &[String],
    file_paths: &[String],
    stdin_is_tty: bool,
) -> Result<Vec<String>> {
    let mut drugs: Vec<String> = Vec::new();

    if !file_paths.is_empty() {
        for path in file_paths {
            if path == "-" {
                drugs.extend(parse_drug_tokens(&read_stdin()?));
            } else {
                let text = std::fs::read_to_string(Path::new(path))
                    .with_context(|| format!("--file not found: {path}"))?;
                drugs.extend(parse_drug_tokens(&text));
            }
        }
    } else if positional.is_empty() && !stdin_is_tty {
        drugs.extend(parse_drug_tokens(&read_stdin()?));
    }

    drugs.extend(positional.iter().cloned());

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for drug in drugs {
        let trimmed = drug.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    Ok(out)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read stdin")?;
    Ok(text)
}
