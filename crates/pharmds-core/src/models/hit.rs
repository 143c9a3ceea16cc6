//! Rule hit and pair report value objects.

use serde::{Deserialize, Serialize};

use super::enums::{Domain, RuleClass, Severity};

/// Well-known hit tags used by composite derivation and aggregation.
pub mod tags {
    pub const EXPOSURE_INCREASE: &str = "exposure_increase";
    pub const EXPOSURE_DECREASE: &str = "exposure_decrease";
    pub const MULTI_MECHANISM: &str = "multi_mechanism";
    pub const DUAL_MECHANISM: &str = "dual_mechanism";
    pub const COMPOSITE: &str = "composite";
    pub const CNS_DEPRESSION_AMPLIFIED: &str = "cns_depression_amplified";
}

/// A literature/source citation carried by a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub source: String,
    pub citation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Resolved inputs of a hit. `a` is the affected drug, `b` the interacting
/// drug for PK hits; for PD hits the pair is symmetric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HitInputs {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enzyme_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transporter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transporter_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_id: Option<String>,
}

impl HitInputs {
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            enzyme_id: None,
            transporter_id: None,
            transporter_family: None,
            effect_id: None,
        }
    }
}

/// The output of one rule firing for one ordered pair. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RuleHit {
    pub rule_id: String,
    pub name: String,
    pub domain: Domain,
    pub severity: Severity,
    pub rule_class: RuleClass,
    pub inputs: HitInputs,
    pub rationale: Vec<String>,
    pub actions: Vec<String>,
    pub references: Vec<Reference>,
    pub tags: Vec<String>,
}

impl RuleHit {
    /// Identity used for deduplication and composite idempotence checks.
    /// Directionality is part of identity: the same rule firing with the
    /// drugs swapped is a distinct hit.
    pub fn key(&self) -> HitKey {
        HitKey {
            rule_id: self.rule_id.clone(),
            a: self.inputs.a.clone(),
            b: self.inputs.b.clone(),
            domain: self.domain,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Value identity of a hit: (rule id, affected drug, interacting drug,
/// domain).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HitKey {
    pub rule_id: String,
    pub a: String,
    pub b: String,
    pub domain: Domain,
}

/// Net pharmacokinetic direction for a pair, derived from hit tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PkSummary {
    #[serde(rename = "exposure_increase")]
    ExposureIncrease,
    #[serde(rename = "exposure_decrease")]
    ExposureDecrease,
    #[serde(rename = "mixed (increase + decrease mechanisms present)")]
    Mixed,
}

impl PkSummary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExposureIncrease => "exposure_increase",
            Self::ExposureDecrease => "exposure_decrease",
            Self::Mixed => "mixed (increase + decrease mechanisms present)",
        }
    }
}

/// Aggregated findings for one unordered drug pair.
///
/// `drug_1` always sorts lexically before `drug_2`. PK hits remain
/// directional (A affected, B interacting); PD hits are symmetric.
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub drug_1: String,
    pub drug_2: String,
    pub overall_severity: Severity,
    pub overall_rule_class: RuleClass,
    pub pk_hits: Vec<RuleHit>,
    pub pd_hits: Vec<RuleHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pk_summary: Option<PkSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_hit(rule_id: &str, a: &str, b: &str, domain: Domain) -> RuleHit {
        RuleHit {
            rule_id: rule_id.into(),
            name: rule_id.into(),
            domain,
            severity: Severity::Caution,
            rule_class: RuleClass::Caution,
            inputs: HitInputs::pair(a, b),
            rationale: vec![],
            actions: vec![],
            references: vec![],
            tags: vec![],
        }
    }

    #[test]
    fn test_hit_key_directionality() {
        let forward = make_hit("PK_X", "digoxin", "verapamil", Domain::PK);
        let reverse = make_hit("PK_X", "verapamil", "digoxin", Domain::PK);
        assert_ne!(forward.key(), reverse.key());
        assert_eq!(forward.key(), forward.clone().key());
    }

    #[test]
    fn test_hit_key_domain_is_identity() {
        let pk = make_hit("R", "a", "b", Domain::PK);
        let pd = make_hit("R", "a", "b", Domain::PD);
        assert_ne!(pk.key(), pd.key());
    }

    #[test]
    fn test_pk_summary_labels() {
        assert_eq!(PkSummary::ExposureIncrease.as_str(), "exposure_increase");
        assert_eq!(
            PkSummary::Mixed.as_str(),
            "mixed (increase + decrease mechanisms present)"
        );
    }

    #[test]
    fn test_hit_inputs_serialization_skips_absent_fields() {
        let inputs = HitInputs::pair("digoxin", "verapamil");
        let json = serde_json::to_value(&inputs).unwrap();
        assert_eq!(json["A"], "digoxin");
        assert_eq!(json["B"], "verapamil");
        assert!(json.get("enzyme_id").is_none());
    }
}
