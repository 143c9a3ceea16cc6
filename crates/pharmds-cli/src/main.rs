//! Educational PK/PD interaction reasoner (rule-based).
//!
//! Resolves drug names against the local SQLite knowledge base, evaluates the
//! declarative rule set over every pair, derives composites, and prints the
//! aggregated pair reports. Educational only; not diagnostic.

mod input;
mod output;

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pharmds_core::db::{seed, Database};
use pharmds_core::reasoning::build_pair_reports;
use pharmds_core::registry::{PdEffectNormalizer, TransporterRegistry};
use pharmds_core::resolver::ResolveError;
use pharmds_core::rules::{apply_composites, Mechanism, Rule, RuleEngine, RuleStore};

#[derive(Parser)]
#[command(
    name = "pharmds",
    about = "Educational PK/PD interaction reasoner (rule-based).",
    long_about = "Evaluates declarative PK/PD interaction rules over a set of drugs.\n\
                  EDUCATIONAL ONLY - NOT DIAGNOSTIC."
)]
struct Cli {
    /// Drug names (generic or alias). Example: warfarin fluconazole.
    /// For polypharmacy, prefer --file or piping via stdin.
    drugs: Vec<String>,

    /// Read drug names from a file (repeatable). One drug per line, or
    /// comma/whitespace-separated. Use '-' to read from stdin. If no drugs
    /// are provided and stdin is piped, stdin is read automatically.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    file: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Patient has QT risk factors (educational flag).
    #[arg(long)]
    qt_risk: bool,

    /// Patient has bleeding risk factors (educational flag).
    #[arg(long)]
    bleeding_risk: bool,

    /// Comma-separated mechanism filters.
    /// Allowed: cyp, ugt, pgp, bcrp, oatp, pd, pk (alias), all.
    #[arg(long, default_value = "all")]
    domain: String,

    /// SQLite database path. Seeded from the embedded curation on first use.
    /// Defaults to an in-memory database seeded per run.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Load rule definitions from a directory instead of the embedded set.
    #[arg(long, value_name = "DIR")]
    rules: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let drug_names = input::collect_drug_inputs(
        &cli.drugs,
        &cli.file,
        std::io::stdin().is_terminal(),
    )?;
    if drug_names.len() < 2 {
        eprintln!("Provide at least two drugs, or use --file / stdin for a list.");
        std::process::exit(2);
    }

    let registry = TransporterRegistry::new();
    let effect_normalizer = PdEffectNormalizer::new();

    let db = match &cli.db {
        Some(path) => Database::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?,
        None => Database::open_in_memory().context("failed to open in-memory database")?,
    };
    if !db.is_seeded()? {
        seed(&db, &registry, &effect_normalizer).context("failed to seed reference data")?;
    }

    let drug_ids = match db.resolve_drug_ids(&drug_names) {
        Ok(ids) => ids,
        Err(ResolveError::Unknown(err)) => {
            for token in &err.unknown {
                match err.suggestions.get(token) {
                    Some(options) if !options.is_empty() => {
                        eprintln!("Drug '{token}' not found. Did you mean: {}?", options.join(", "));
                    }
                    _ => eprintln!("Drug '{token}' not found."),
                }
            }
            eprintln!("Tip: use generic names or add aliases in the local database.");
            std::process::exit(2);
        }
        Err(ResolveError::Db(err)) => return Err(err.into()),
    };

    let patient_flags = HashMap::from([
        ("qt_risk".to_string(), cli.qt_risk),
        ("bleeding_risk".to_string(), cli.bleeding_risk),
    ]);
    let facts = db.load_facts(&drug_ids, patient_flags.clone(), &registry, &effect_normalizer)?;

    let selected = parse_domain_selection(&cli.domain)?;

    let store = RuleStore::new(&registry);
    let rules_all = match &cli.rules {
        Some(dir) => store.load_dir(dir)?,
        None => store.builtin()?,
    };
    let rules = filter_rules_for_selected_domains(&store, rules_all, &selected);

    let engine = RuleEngine::new(&registry);
    let hits = engine.evaluate_all(&rules, &facts, &drug_ids);
    let hits = apply_composites(&facts, &hits);

    let templates: HashMap<String, String> = rules
        .iter()
        .map(|r| (r.id.clone(), r.explanation_template.clone()))
        .collect();
    let reports = build_pair_reports(&facts, &hits, &templates);

    if reports.is_empty() {
        let domains: Vec<&str> = selected.iter().map(Mechanism::label).collect();
        println!(
            "No rule-based interactions detected in selected domains: {} (educational scope).",
            domains.join(", ")
        );
        return Ok(());
    }

    match cli.format {
        OutputFormat::Plain => {
            print!("{}", output::render_plain(&facts, &reports, &templates));
        }
        OutputFormat::Json => {
            let selected_labels: Vec<String> =
                selected.iter().map(|m| m.label().to_string()).collect();
            let payload = output::build_json_payload(
                &facts,
                &reports,
                &templates,
                &selected_labels,
                &drug_names,
                &patient_flags,
            );
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

/// Expand the user's --domain selection into mechanism filters.
fn parse_domain_selection(domain_arg: &str) -> Result<Vec<Mechanism>> {
    let raw = domain_arg.trim().to_lowercase();
    let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();

    let mut selected: Vec<Mechanism> = Vec::new();
    let add = |mech: Mechanism, selected: &mut Vec<Mechanism>| {
        if !selected.contains(&mech) {
            selected.push(mech);
        }
    };

    let pk_mechs = [
        Mechanism::Cyp,
        Mechanism::Ugt,
        Mechanism::Pgp,
        Mechanism::Bcrp,
        Mechanism::Oatp,
    ];

    for part in &parts {
        match *part {
            "all" => {
                for mech in pk_mechs.clone() {
                    add(mech, &mut selected);
                }
                add(Mechanism::Pd, &mut selected);
            }
            "pk" => {
                for mech in pk_mechs.clone() {
                    add(mech, &mut selected);
                }
            }
            other => match Mechanism::parse(other) {
                Some(mech) => add(mech, &mut selected),
                None => bail!(
                    "Unknown --domain option '{other}'. Use: all, pk, pd, cyp, ugt, pgp, bcrp, oatp"
                ),
            },
        }
    }

    if selected.is_empty() {
        selected = pk_mechs.to_vec();
        selected.push(Mechanism::Pd);
    }

    Ok(selected)
}

/// Keep the rules whose mechanism tags intersect the selection.
fn filter_rules_for_selected_domains(
    store: &RuleStore<'_>,
    rules: Vec<Rule>,
    selected: &[Mechanism],
) -> Vec<Rule> {
    rules
        .into_iter()
        .filter(|rule| {
            store
                .mechanisms(rule)
                .iter()
                .any(|mech| selected.contains(mech))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domain_all() {
        let selected = parse_domain_selection("all").unwrap();
        assert!(selected.contains(&Mechanism::Cyp));
        assert!(selected.contains(&Mechanism::Oatp));
        assert!(selected.contains(&Mechanism::Pd));
    }

    #[test]
    fn test_parse_domain_pk_excludes_pd() {
        let selected = parse_domain_selection("pk").unwrap();
        assert!(selected.contains(&Mechanism::Pgp));
        assert!(!selected.contains(&Mechanism::Pd));
    }

    #[test]
    fn test_parse_domain_list() {
        let selected = parse_domain_selection("cyp,pd").unwrap();
        assert_eq!(selected, vec![Mechanism::Cyp, Mechanism::Pd]);
    }

    #[test]
    fn test_parse_domain_unknown_fails() {
        assert!(parse_domain_selection("cyp,bogus").is_err());
    }

    #[test]
    fn test_empty_selection_defaults_to_all() {
        let selected = parse_domain_selection("").unwrap();
        assert!(selected.contains(&Mechanism::Cyp));
        assert!(selected.contains(&Mechanism::Pd));
    }

    #[test]
    fn test_filter_rules_by_domain() {
        let registry = TransporterRegistry::new();
        let store = RuleStore::new(&registry);
        let rules = store.builtin().unwrap();
        let total = rules.len();

        let pd_only = filter_rules_for_selected_domains(&store, rules.clone(), &[Mechanism::Pd]);
        assert!(!pd_only.is_empty());
        assert!(pd_only.len() < total);
        assert!(pd_only.iter().all(|r| r.id.starts_with("PD_")));

        let pgp_only = filter_rules_for_selected_domains(&store, rules, &[Mechanism::Pgp]);
        assert!(pgp_only.iter().all(|r| r.id.contains("PGP")));
    }
}
