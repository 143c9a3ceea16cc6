//! Drug attribute models and the read-only facts snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::enums::{EffectDirection, Magnitude, Role, Strength, TherapeuticIndex};

/// A curated drug record. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Drug {
    pub id: String,
    pub generic_name: String,
    pub drug_class: Option<String>,
    pub therapeutic_index: TherapeuticIndex,
    pub notes: Option<String>,
}

/// A drug's relationship to a metabolizing enzyme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnzymeRole {
    /// Enzyme identifier, e.g. "CYP3A4" or "UGT1A1".
    pub enzyme_id: String,
    pub role: Role,
    pub strength: Option<Strength>,
    /// Fraction of clearance through this enzyme (substrates only).
    pub fraction_metabolized: Option<f64>,
    pub notes: Option<String>,
}

/// A drug's relationship to an efflux/uptake transporter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransporterRole {
    /// Canonicalized transporter identifier, e.g. "P-gp".
    pub transporter_id: String,
    pub role: Role,
    pub strength: Option<Strength>,
    pub notes: Option<String>,
}

/// A pharmacodynamic effect a drug contributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PdEffect {
    /// Canonicalized effect identifier, e.g. "QT_prolongation".
    pub effect_id: String,
    pub direction: EffectDirection,
    pub magnitude: Magnitude,
    pub mechanism_note: Option<String>,
}

/// Read-only snapshot of everything rules are evaluated against.
///
/// Built once per invocation from storage; the engine only reads it.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    pub drugs: HashMap<String, Drug>,
    pub enzyme_roles: HashMap<String, Vec<EnzymeRole>>,
    pub transporter_roles: HashMap<String, Vec<TransporterRole>>,
    pub pd_effects: HashMap<String, Vec<PdEffect>>,
    pub patient_flags: HashMap<String, bool>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enzyme_roles_of(&self, drug_id: &str) -> &[EnzymeRole] {
        self.enzyme_roles.get(drug_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn transporter_roles_of(&self, drug_id: &str) -> &[TransporterRole] {
        self.transporter_roles
            .get(drug_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pd_effects_of(&self, drug_id: &str) -> &[PdEffect] {
        self.pd_effects.get(drug_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn patient_flag(&self, flag: &str) -> bool {
        self.patient_flags.get(flag).copied().unwrap_or(false)
    }

    pub fn therapeutic_index_of(&self, drug_id: &str) -> Option<TherapeuticIndex> {
        self.drugs.get(drug_id).map(|d| d.therapeutic_index)
    }
}
