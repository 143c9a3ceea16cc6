//! Reference data seeding from the curation source of truth.
//!
//! The curation file (`data/drugs.json`) is validated before anything is
//! written; validation reports every problem at once so a curator can fix the
//! file in one pass.

use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::{Database, DbError};
use crate::models::{EffectDirection, Magnitude, Role, Strength, TherapeuticIndex};
use crate::registry::{PdEffectNormalizer, TransporterRegistry};

/// Embedded curation source of truth.
pub const DRUGS_JSON: &str = include_str!("../../data/drugs.json");

/// Enzymes known to the reference dataset.
pub const KNOWN_ENZYMES: &[(&str, &str, &str)] = &[
    ("CYP3A4", "CYP", "Major drug-metabolizing enzyme; many substrates."),
    ("CYP2C9", "CYP", "Important for warfarin and NSAIDs."),
    ("CYP2C19", "CYP", "Relevant for clopidogrel activation and some SSRIs/benzos."),
    ("CYP2D6", "CYP", "Relevant for codeine/tramadol activation, many antidepressants."),
    ("CYP1A2", "CYP", "Affected by inhibitors and smoking induction."),
    ("CYP2B6", "CYP", "Primary pathway for bupropion metabolism (educational)."),
    ("UGT1A1", "UGT", "Phase II glucuronidation enzyme; clinically important for select substrates."),
    ("UGT2B7", "UGT", "Phase II glucuronidation enzyme; relevant for some opioids (educational)."),
];

/// Transporters known to the reference dataset.
pub const KNOWN_TRANSPORTERS: &[(&str, &str, &str)] = &[
    (
        "P-gp",
        "ABCB1",
        "P-glycoprotein (ABCB1); efflux transporter affecting absorption and elimination.",
    ),
    ("BCRP", "ABCG2", "Breast Cancer Resistance Protein (ABCG2); efflux transporter."),
    ("OATP1B1", "OATP", "Hepatic uptake transporter (SLCO1B1)."),
];

/// PD effect domains known to the reference dataset.
pub const KNOWN_PD_EFFECTS: &[(&str, &str)] = &[
    ("QT_prolongation", "Potential to prolong QT interval / torsades risk domain."),
    ("CNS_depression", "Sedation/respiratory depression/falls risk domain."),
    ("serotonergic", "Serotonin excess risk domain."),
    ("serotonin_syndrome", "Serotonin toxicity syndrome risk domain (educational)."),
    ("bleeding", "Bleeding risk domain."),
    ("bradycardia", "Heart rate lowering / symptomatic bradycardia risk domain."),
    ("hypotension", "Orthostasis/hypotension domain."),
    ("respiratory_depression", "Respiratory depression risk domain."),
    ("sedation", "Sedation/impairment risk domain."),
    ("seizure_risk", "Seizure threshold lowering risk domain."),
];

/// A single curation problem, addressed by a JSON-path-like location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct CurationError {
    pub path: String,
    pub message: String,
}

/// Seeding errors.
#[derive(Error, Debug)]
pub enum SeedError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("invalid curation JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("curation validation failed:\n{}", .0.iter().map(|e| format!("- {e}")).collect::<Vec<_>>().join("\n"))]
    Invalid(Vec<CurationError>),
}

#[derive(Debug, Deserialize)]
pub struct Curation {
    pub version: u32,
    pub drugs: Vec<CurationDrug>,
}

#[derive(Debug, Deserialize)]
pub struct CurationDrug {
    pub id: String,
    pub generic_name: String,
    #[serde(default)]
    pub drug_class: Option<String>,
    pub therapeutic_index: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub enzymes: Vec<CurationEnzymeRole>,
    #[serde(default)]
    pub transporters: Vec<CurationTransporterRole>,
    #[serde(default)]
    pub pd_effects: Vec<CurationPdEffect>,
}

#[derive(Debug, Deserialize)]
pub struct CurationEnzymeRole {
    pub enzyme_id: String,
    pub role: String,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub fraction_metabolized: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CurationTransporterRole {
    pub transporter_id: String,
    pub role: String,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CurationPdEffect {
    pub effect_id: String,
    pub direction: String,
    pub magnitude: String,
    #[serde(default)]
    pub mechanism_note: Option<String>,
}

/// Seed the embedded reference dataset.
pub fn seed(
    db: &Database,
    registry: &TransporterRegistry,
    effect_normalizer: &PdEffectNormalizer,
) -> Result<(), SeedError> {
    seed_curation(db, DRUGS_JSON, registry, effect_normalizer)
}

/// Validate and seed a curation document.
pub fn seed_curation(
    db: &Database,
    curation_json: &str,
    registry: &TransporterRegistry,
    effect_normalizer: &PdEffectNormalizer,
) -> Result<(), SeedError> {
    let curation: Curation = serde_json::from_str(curation_json)?;

    let errors = validate_curation(&curation, registry, effect_normalizer);
    if !errors.is_empty() {
        return Err(SeedError::Invalid(errors));
    }

    let conn = db.conn();

    for (id, family, description) in KNOWN_ENZYMES {
        conn.execute(
            "INSERT OR REPLACE INTO enzyme (id, family, description) VALUES (?1, ?2, ?3)",
            params![id, family, description],
        )
        .map_err(DbError::from)?;
    }

    for (id, family, description) in KNOWN_TRANSPORTERS {
        conn.execute(
            "INSERT OR REPLACE INTO transporter (id, family, description) VALUES (?1, ?2, ?3)",
            params![id, family, description],
        )
        .map_err(DbError::from)?;
    }

    for (id, description) in KNOWN_PD_EFFECTS {
        conn.execute(
            "INSERT OR REPLACE INTO pd_effect (id, description) VALUES (?1, ?2)",
            params![id, description],
        )
        .map_err(DbError::from)?;
    }

    for drug in &curation.drugs {
        conn.execute(
            "INSERT OR REPLACE INTO drug (id, generic_name, drug_class, therapeutic_index, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                drug.id,
                drug.generic_name,
                drug.drug_class,
                drug.therapeutic_index,
                drug.notes
            ],
        )
        .map_err(DbError::from)?;

        for alias in &drug.aliases {
            conn.execute(
                "INSERT OR IGNORE INTO drug_alias (drug_id, alias) VALUES (?1, ?2)",
                params![drug.id, alias.trim().to_lowercase()],
            )
            .map_err(DbError::from)?;
        }

        for role in &drug.enzymes {
            conn.execute(
                "INSERT OR REPLACE INTO drug_enzyme_role
                 (drug_id, enzyme_id, role, strength, fraction_metabolized, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    drug.id,
                    role.enzyme_id,
                    role.role,
                    role.strength,
                    role.fraction_metabolized,
                    role.notes
                ],
            )
            .map_err(DbError::from)?;
        }

        for role in &drug.transporters {
            conn.execute(
                "INSERT OR REPLACE INTO drug_transporter_role
                 (drug_id, transporter_id, role, strength, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    drug.id,
                    registry.canonical_id(&role.transporter_id),
                    role.role,
                    role.strength,
                    role.notes
                ],
            )
            .map_err(DbError::from)?;
        }

        for effect in &drug.pd_effects {
            conn.execute(
                "INSERT OR REPLACE INTO drug_pd_effect
                 (drug_id, pd_effect_id, direction, magnitude, mechanism_note)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    drug.id,
                    effect_normalizer.canonicalize(&effect.effect_id),
                    effect.direction,
                    effect.magnitude,
                    effect.mechanism_note
                ],
            )
            .map_err(DbError::from)?;
        }
    }

    info!(drugs = curation.drugs.len(), "seeded curation data");
    Ok(())
}

/// Validate a curation document. Every problem is reported; nothing stops at
/// the first error.
pub fn validate_curation(
    curation: &Curation,
    registry: &TransporterRegistry,
    effect_normalizer: &PdEffectNormalizer,
) -> Vec<CurationError> {
    let mut errors: Vec<CurationError> = Vec::new();
    let mut err = |path: String, message: String| {
        errors.push(CurationError { path, message });
    };

    if curation.version != 1 {
        err("version".into(), format!("expected version=1, got {}", curation.version));
    }

    let known_enzymes: Vec<&str> = KNOWN_ENZYMES.iter().map(|(id, _, _)| *id).collect();
    let known_effects: Vec<&str> = KNOWN_PD_EFFECTS.iter().map(|(id, _)| *id).collect();

    let mut seen_ids: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut seen_aliases: std::collections::HashMap<String, &str> =
        std::collections::HashMap::new();

    for (i, drug) in curation.drugs.iter().enumerate() {
        let prefix = format!("drugs[{i}]");

        if !valid_drug_id(&drug.id) {
            err(
                format!("{prefix}.id"),
                format!("drug id '{}' must be lowercase and match [a-z0-9][a-z0-9_+-]*", drug.id),
            );
        }
        if !seen_ids.insert(drug.id.as_str()) {
            err(format!("{prefix}.id"), format!("duplicate id '{}'", drug.id));
        }

        if drug.generic_name.trim().is_empty() {
            err(format!("{prefix}.generic_name"), "missing generic_name".into());
        }

        if TherapeuticIndex::parse(&drug.therapeutic_index).is_none() {
            err(
                format!("{prefix}.therapeutic_index"),
                format!("invalid therapeutic_index '{}'", drug.therapeutic_index),
            );
        }

        for alias in &drug.aliases {
            let key = alias.trim().to_lowercase();
            if let Some(owner) = seen_aliases.insert(key.clone(), drug.id.as_str()) {
                if owner != drug.id {
                    err(
                        format!("{prefix}.aliases"),
                        format!("alias '{key}' already claimed by '{owner}'"),
                    );
                }
            }
        }

        for (j, role) in drug.enzymes.iter().enumerate() {
            let path = format!("{prefix}.enzymes[{j}]");
            if !known_enzymes.contains(&role.enzyme_id.as_str()) {
                err(path.clone(), format!("unknown enzyme '{}'", role.enzyme_id));
            }
            if Role::parse(&role.role).is_none() {
                err(path.clone(), format!("invalid role '{}'", role.role));
            }
            if let Some(strength) = &role.strength {
                if Strength::parse(strength).is_none() {
                    err(path.clone(), format!("invalid strength '{strength}'"));
                }
            }
            if let Some(fraction) = role.fraction_metabolized {
                if !(0.0..=1.0).contains(&fraction) {
                    err(path, format!("fraction_metabolized {fraction} outside [0, 1]"));
                }
            }
        }

        for (j, role) in drug.transporters.iter().enumerate() {
            let path = format!("{prefix}.transporters[{j}]");
            let canonical = registry.canonical_id(&role.transporter_id);
            if !registry.contains(&canonical) {
                err(path.clone(), format!("unknown transporter '{}'", role.transporter_id));
            }
            if Role::parse(&role.role).is_none() {
                err(path.clone(), format!("invalid role '{}'", role.role));
            }
            if let Some(strength) = &role.strength {
                if Strength::parse(strength).is_none() {
                    err(path, format!("invalid strength '{strength}'"));
                }
            }
        }

        for (j, effect) in drug.pd_effects.iter().enumerate() {
            let path = format!("{prefix}.pd_effects[{j}]");
            let canonical = effect_normalizer.canonicalize(&effect.effect_id);
            if !known_effects.contains(&canonical.as_str()) {
                err(path.clone(), format!("unknown pd effect '{}'", effect.effect_id));
            }
            if EffectDirection::parse(&effect.direction).is_none() {
                err(path.clone(), format!("invalid direction '{}'", effect.direction));
            }
            if Magnitude::parse(&effect.magnitude).is_none() {
                err(path, format!("invalid magnitude '{}'", effect.magnitude));
            }
        }
    }

    errors
}

fn valid_drug_id(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '+' | '-'))
}
