//! Canonicalization registries for transporter and PD-effect identifiers.
//!
//! Handles:
//! - Transporter alias expansion (abcb1/mdr1 → P-gp) and family lookup
//! - PD effect alias expansion (qt → QT_prolongation)
//!
//! Registries are plain values passed into the rule store and the data layer
//! at construction time; there is no process-wide cache.

use std::collections::HashMap;

/// Canonical transporter identifiers.
pub const TRANSPORTER_PGP: &str = "P-gp";
pub const TRANSPORTER_BCRP: &str = "BCRP";
pub const TRANSPORTER_OATP1B1: &str = "OATP1B1";

/// Canonical PD effect identifiers.
pub mod effects {
    pub const CNS_DEPRESSION: &str = "CNS_depression";
    pub const QT_PROLONGATION: &str = "QT_prolongation";
    pub const BLEEDING: &str = "bleeding";
    pub const BRADYCARDIA: &str = "bradycardia";
    pub const SEROTONERGIC: &str = "serotonergic";
    pub const SEROTONIN_SYNDROME: &str = "serotonin_syndrome";
    pub const RESPIRATORY_DEPRESSION: &str = "respiratory_depression";
    pub const SEDATION: &str = "sedation";
    pub const SEIZURE_RISK: &str = "seizure_risk";
    pub const OPIOID_ANTAGONIST: &str = "opioid_antagonist";
    pub const WITHDRAWAL_RISK: &str = "withdrawal_risk";
}

/// Transporter registry: canonical ids, their families, and input aliases.
pub struct TransporterRegistry {
    /// Alias (lowercased) → canonical id
    aliases: HashMap<String, String>,
    /// Canonical id → family label (e.g. "ABCB1")
    families: HashMap<String, String>,
}

impl Default for TransporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransporterRegistry {
    /// Create a registry with the reference transporter set.
    pub fn new() -> Self {
        Self {
            aliases: Self::default_aliases(),
            families: Self::default_families(),
        }
    }

    /// Canonicalize a raw transporter identifier. Unknown ids pass through
    /// trimmed.
    pub fn canonical_id(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        self.aliases
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Family label of a canonical transporter id.
    pub fn family_of(&self, transporter_id: &str) -> Option<&str> {
        self.families.get(transporter_id).map(String::as_str)
    }

    /// All canonical ids belonging to a family, in sorted order.
    pub fn ids_in_family(&self, family: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .families
            .iter()
            .filter(|(_, f)| f.as_str() == family)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Whether a canonical id is known to the registry.
    pub fn contains(&self, transporter_id: &str) -> bool {
        self.families.contains_key(transporter_id)
    }

    /// Register a transporter with its family and extra input aliases.
    pub fn add_transporter(&mut self, id: &str, family: &str, aliases: &[&str]) {
        self.families.insert(id.to_string(), family.to_string());
        self.aliases.insert(id.to_lowercase(), id.to_string());
        for alias in aliases {
            self.aliases.insert(alias.to_lowercase(), id.to_string());
        }
    }

    fn default_aliases() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // P-gp (ABCB1 / MDR1)
        map.insert("p-gp".into(), TRANSPORTER_PGP.into());
        map.insert("pgp".into(), TRANSPORTER_PGP.into());
        map.insert("p gp".into(), TRANSPORTER_PGP.into());
        map.insert("p-glycoprotein".into(), TRANSPORTER_PGP.into());
        map.insert("p glycoprotein".into(), TRANSPORTER_PGP.into());
        map.insert("abcb1".into(), TRANSPORTER_PGP.into());
        map.insert("mdr1".into(), TRANSPORTER_PGP.into());

        // BCRP (ABCG2)
        map.insert("bcrp".into(), TRANSPORTER_BCRP.into());
        map.insert("abcg2".into(), TRANSPORTER_BCRP.into());

        // OATP1B1 (SLCO1B1)
        map.insert("oatp1b1".into(), TRANSPORTER_OATP1B1.into());
        map.insert("slco1b1".into(), TRANSPORTER_OATP1B1.into());

        map
    }

    fn default_families() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(TRANSPORTER_PGP.into(), "ABCB1".into());
        map.insert(TRANSPORTER_BCRP.into(), "ABCG2".into());
        map.insert(TRANSPORTER_OATP1B1.into(), "OATP".into());
        map
    }
}

/// PD effect normalizer: maps spoken/legacy effect names onto canonical ids.
pub struct PdEffectNormalizer {
    aliases: HashMap<String, String>,
}

impl Default for PdEffectNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdEffectNormalizer {
    pub fn new() -> Self {
        Self {
            aliases: Self::default_aliases(),
        }
    }

    /// Canonicalize a raw effect identifier. Unknown ids pass through
    /// trimmed.
    pub fn canonicalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        self.aliases
            .get(&trimmed.to_lowercase())
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases.insert(alias.to_lowercase(), canonical.to_string());
    }

    fn default_aliases() -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("cns depression".into(), effects::CNS_DEPRESSION.into());
        map.insert("cns_depression".into(), effects::CNS_DEPRESSION.into());
        map.insert("qt".into(), effects::QT_PROLONGATION.into());
        map.insert("qt prolongation".into(), effects::QT_PROLONGATION.into());
        map.insert("qt_prolongation".into(), effects::QT_PROLONGATION.into());
        map.insert("bleed".into(), effects::BLEEDING.into());
        map.insert("bleeding".into(), effects::BLEEDING.into());
        map.insert("brady".into(), effects::BRADYCARDIA.into());
        map.insert("bradycardia".into(), effects::BRADYCARDIA.into());
        map.insert("serotonergic".into(), effects::SEROTONERGIC.into());
        map.insert("serotonin syndrome".into(), effects::SEROTONIN_SYNDROME.into());
        map.insert("serotonin_syndrome".into(), effects::SEROTONIN_SYNDROME.into());

        map.insert("resp depression".into(), effects::RESPIRATORY_DEPRESSION.into());
        map.insert(
            "respiratory depression".into(),
            effects::RESPIRATORY_DEPRESSION.into(),
        );
        map.insert(
            "respiratory_depression".into(),
            effects::RESPIRATORY_DEPRESSION.into(),
        );

        map.insert("sedation".into(), effects::SEDATION.into());
        map.insert("sedating".into(), effects::SEDATION.into());

        map.insert("seizure".into(), effects::SEIZURE_RISK.into());
        map.insert("seizure risk".into(), effects::SEIZURE_RISK.into());
        map.insert("seizure threshold".into(), effects::SEIZURE_RISK.into());
        map.insert("seizure_threshold_lowering".into(), effects::SEIZURE_RISK.into());
        map.insert("seizure_risk".into(), effects::SEIZURE_RISK.into());

        map.insert("opioid antagonist".into(), effects::OPIOID_ANTAGONIST.into());
        map.insert("opioid_antagonist".into(), effects::OPIOID_ANTAGONIST.into());

        map.insert("withdrawal".into(), effects::WITHDRAWAL_RISK.into());
        map.insert("withdrawal risk".into(), effects::WITHDRAWAL_RISK.into());
        map.insert("precipitated withdrawal".into(), effects::WITHDRAWAL_RISK.into());
        map.insert("precipitated_withdrawal".into(), effects::WITHDRAWAL_RISK.into());
        map.insert("withdrawal_risk".into(), effects::WITHDRAWAL_RISK.into());

        map
    }
}
