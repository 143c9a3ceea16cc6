//! Drug resolution and facts loading.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{
    Drug, EffectDirection, EnzymeRole, Facts, Magnitude, PdEffect, Role, Strength,
    TherapeuticIndex, TransporterRole,
};
use crate::registry::{PdEffectNormalizer, TransporterRegistry};
use crate::resolver::{suggest_drug_terms, ResolveError, UnknownDrugError, SUGGESTION_LIMIT};

impl Database {
    /// Resolve user-supplied drug names (generic names or aliases,
    /// case-insensitive) to drug ids, preserving input order.
    ///
    /// Unresolved tokens fail the whole call with per-token suggestions.
    pub fn resolve_drug_ids(&self, names: &[String]) -> Result<Vec<String>, ResolveError> {
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        let mut unknown: Vec<String> = Vec::new();

        for raw in names {
            let query = raw.trim().to_lowercase();

            let by_name: Option<String> = self
                .conn()
                .query_row(
                    "SELECT id FROM drug WHERE lower(generic_name) = ?1",
                    [&query],
                    |row| row.get(0),
                )
                .optional()
                .map_err(DbError::from)?;
            if let Some(id) = by_name {
                out.push(id);
                continue;
            }

            let by_alias: Option<String> = self
                .conn()
                .query_row(
                    "SELECT drug_id FROM drug_alias WHERE alias = ?1",
                    [&query],
                    |row| row.get(0),
                )
                .optional()
                .map_err(DbError::from)?;
            if let Some(id) = by_alias {
                out.push(id);
                continue;
            }

            unknown.push(raw.clone());
        }

        if !unknown.is_empty() {
            let known_terms = self.known_drug_terms()?;
            let mut suggestions = HashMap::new();
            for token in &unknown {
                let options = suggest_drug_terms(token, &known_terms, SUGGESTION_LIMIT);
                if !options.is_empty() {
                    suggestions.insert(token.clone(), options);
                }
            }
            return Err(UnknownDrugError {
                unknown,
                suggestions,
            }
            .into());
        }

        Ok(out)
    }

    /// All terms users might type: generic names and aliases, lowercased,
    /// de-duplicated with stable ordering.
    pub fn known_drug_terms(&self) -> DbResult<Vec<String>> {
        let mut terms: Vec<String> = Vec::new();

        let mut stmt = self.conn().prepare("SELECT generic_name FROM drug ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            terms.push(row?.trim().to_lowercase());
        }

        let mut stmt = self
            .conn()
            .prepare("SELECT alias FROM drug_alias ORDER BY drug_id, alias")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            terms.push(row?.trim().to_lowercase());
        }

        let mut seen = std::collections::HashSet::new();
        terms.retain(|t| !t.is_empty() && seen.insert(t.clone()));
        Ok(terms)
    }

    /// Build the read-only facts snapshot for the resolved drugs.
    ///
    /// Transporter and PD-effect ids are canonicalized on the way out so the
    /// engine always sees registry-canonical identifiers.
    pub fn load_facts(
        &self,
        drug_ids: &[String],
        patient_flags: HashMap<String, bool>,
        registry: &TransporterRegistry,
        effect_normalizer: &PdEffectNormalizer,
    ) -> DbResult<Facts> {
        let mut facts = Facts {
            patient_flags,
            ..Facts::default()
        };

        for drug_id in drug_ids {
            let drug = self
                .conn()
                .query_row(
                    "SELECT id, generic_name, drug_class, therapeutic_index, notes
                     FROM drug WHERE id = ?1",
                    [drug_id],
                    |row| {
                        Ok(DrugRow {
                            id: row.get(0)?,
                            generic_name: row.get(1)?,
                            drug_class: row.get(2)?,
                            therapeutic_index: row.get(3)?,
                            notes: row.get(4)?,
                        })
                    },
                )
                .optional()?
                .ok_or_else(|| DbError::NotFound(format!("drug '{drug_id}'")))?;
            facts.drugs.insert(drug_id.clone(), drug.try_into()?);

            let mut stmt = self.conn().prepare(
                "SELECT enzyme_id, role, strength, fraction_metabolized, notes
                 FROM drug_enzyme_role WHERE drug_id = ?1
                 ORDER BY enzyme_id, role",
            )?;
            let rows = stmt.query_map(params![drug_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?;
            for row in rows {
                let (enzyme_id, role, strength, fraction_metabolized, notes) = row?;
                facts
                    .enzyme_roles
                    .entry(drug_id.clone())
                    .or_default()
                    .push(EnzymeRole {
                        enzyme_id,
                        role: parse_role(&role)?,
                        strength: parse_strength(strength)?,
                        fraction_metabolized,
                        notes,
                    });
            }

            let mut stmt = self.conn().prepare(
                "SELECT transporter_id, role, strength, notes
                 FROM drug_transporter_role WHERE drug_id = ?1
                 ORDER BY transporter_id, role",
            )?;
            let rows = stmt.query_map(params![drug_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;
            for row in rows {
                let (transporter_id, role, strength, notes) = row?;
                facts
                    .transporter_roles
                    .entry(drug_id.clone())
                    .or_default()
                    .push(TransporterRole {
                        transporter_id: registry.canonical_id(&transporter_id),
                        role: parse_role(&role)?,
                        strength: parse_strength(strength)?,
                        notes,
                    });
            }

            let mut stmt = self.conn().prepare(
                "SELECT pd_effect_id, direction, magnitude, mechanism_note
                 FROM drug_pd_effect WHERE drug_id = ?1
                 ORDER BY pd_effect_id",
            )?;
            let rows = stmt.query_map(params![drug_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;
            for row in rows {
                let (effect_id, direction, magnitude, mechanism_note) = row?;
                facts
                    .pd_effects
                    .entry(drug_id.clone())
                    .or_default()
                    .push(PdEffect {
                        effect_id: effect_normalizer.canonicalize(&effect_id),
                        direction: EffectDirection::parse(&direction).ok_or_else(|| {
                            DbError::NotFound(format!("pd direction '{direction}'"))
                        })?,
                        magnitude: Magnitude::parse(&magnitude).ok_or_else(|| {
                            DbError::NotFound(format!("pd magnitude '{magnitude}'"))
                        })?,
                        mechanism_note,
                    });
            }
        }

        Ok(facts)
    }
}

/// Intermediate row struct for database mapping.
struct DrugRow {
    id: String,
    generic_name: String,
    drug_class: Option<String>,
    therapeutic_index: String,
    notes: Option<String>,
}

impl TryFrom<DrugRow> for Drug {
    type Error = DbError;

    fn try_from(row: DrugRow) -> Result<Self, Self::Error> {
        let therapeutic_index = TherapeuticIndex::parse(&row.therapeutic_index)
            .ok_or_else(|| DbError::NotFound(format!("therapeutic index '{}'", row.therapeutic_index)))?;
        Ok(Drug {
            id: row.id,
            generic_name: row.generic_name,
            drug_class: row.drug_class,
            therapeutic_index,
            notes: row.notes,
        })
    }
}

fn parse_role(raw: &str) -> DbResult<Role> {
    Role::parse(raw).ok_or_else(|| DbError::NotFound(format!("role '{raw}'")))
}

fn parse_strength(raw: Option<String>) -> DbResult<Option<Strength>> {
    match raw {
        None => Ok(None),
        Some(raw) => Strength::parse(&raw)
            .map(Some)
            .ok_or_else(|| DbError::NotFound(format!("strength '{raw}'"))),
    }
}
