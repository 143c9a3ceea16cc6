//! Rule definition loading and validation.
//!
//! Rule files are JSON. Load-time errors are fatal and carry the offending
//! file plus the specific missing/invalid field, so a curator can fix the
//! definition. No partial rule sets are ever returned.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{Domain, Magnitude, Reference, Role, RuleClass, Severity, Strength, TherapeuticIndex};
use crate::reasoning::find_placeholders;
use crate::registry::{TransporterRegistry, TRANSPORTER_BCRP, TRANSPORTER_PGP};

use super::rule::{
    EnzymePattern, Mechanism, PdOverlapPattern, Rule, RuleLogic, TransporterPattern,
    TransporterSelector,
};

/// Placeholders permitted in explanation templates and rationale lines.
pub const ALLOWED_PLACEHOLDERS: &[&str] =
    &["A_name", "B_name", "enzyme_id", "transporter_id", "effect_id"];

/// Rule loading errors.
#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("rule '{file}': invalid JSON: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rule '{file}': missing required key '{key}'")]
    MissingKey { file: String, key: &'static str },

    #[error("rule '{file}': invalid {field}: '{value}'")]
    InvalidValue {
        file: String,
        field: &'static str,
        value: String,
    },

    #[error("rule '{file}': logic must contain exactly one of enzyme/transporter/pd_overlap (found {found})")]
    LogicShape { file: String, found: usize },

    #[error("rule '{file}': transporter block must name exactly one of id/family")]
    TransporterSelector { file: String },

    #[error("rule '{file}': unknown placeholder '{{{placeholder}}}'")]
    UnknownPlaceholder { file: String, placeholder: String },

    #[error("failed to read rule directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type RuleResult<T> = Result<T, RuleLoadError>;

/// Embedded reference rule set, sorted lexically by filename.
const BUILTIN_RULE_DEFS: &[(&str, &str)] = &[
    (
        "pd_bleeding_additive.json",
        include_str!("../../rules/defs/pd_bleeding_additive.json"),
    ),
    (
        "pd_bradycardia_additive.json",
        include_str!("../../rules/defs/pd_bradycardia_additive.json"),
    ),
    (
        "pd_cns_depression_additive.json",
        include_str!("../../rules/defs/pd_cns_depression_additive.json"),
    ),
    (
        "pd_qt_additive.json",
        include_str!("../../rules/defs/pd_qt_additive.json"),
    ),
    (
        "pd_qt_patient_risk.json",
        include_str!("../../rules/defs/pd_qt_patient_risk.json"),
    ),
    (
        "pd_serotonergic_additive.json",
        include_str!("../../rules/defs/pd_serotonergic_additive.json"),
    ),
    (
        "pd_serotonin_syndrome_additive.json",
        include_str!("../../rules/defs/pd_serotonin_syndrome_additive.json"),
    ),
    (
        "pk_bcrp_inhib_substrate.json",
        include_str!("../../rules/defs/pk_bcrp_inhib_substrate.json"),
    ),
    (
        "pk_cyp2c19_inhib_clopidogrel.json",
        include_str!("../../rules/defs/pk_cyp2c19_inhib_clopidogrel.json"),
    ),
    (
        "pk_cyp2c9_inhib_warfarin.json",
        include_str!("../../rules/defs/pk_cyp2c9_inhib_warfarin.json"),
    ),
    (
        "pk_cyp3a4_strong_induc.json",
        include_str!("../../rules/defs/pk_cyp3a4_strong_induc.json"),
    ),
    (
        "pk_cyp3a4_strong_inhib.json",
        include_str!("../../rules/defs/pk_cyp3a4_strong_inhib.json"),
    ),
    (
        "pk_oatp_inhib.json",
        include_str!("../../rules/defs/pk_oatp_inhib.json"),
    ),
    (
        "pk_pgp_induc_digoxin.json",
        include_str!("../../rules/defs/pk_pgp_induc_digoxin.json"),
    ),
    (
        "pk_pgp_inhib_digoxin.json",
        include_str!("../../rules/defs/pk_pgp_inhib_digoxin.json"),
    ),
];

/// Loads rule definitions and classifies rule mechanisms.
///
/// The transporter registry is injected so family lookups never touch global
/// state.
pub struct RuleStore<'a> {
    registry: &'a TransporterRegistry,
}

impl<'a> RuleStore<'a> {
    pub fn new(registry: &'a TransporterRegistry) -> Self {
        Self { registry }
    }

    /// Load every `*.json` rule in a directory, in lexical filename order.
    pub fn load_dir(&self, dir: &Path) -> RuleResult<Vec<Rule>> {
        let entries = fs::read_dir(dir).map_err(|source| RuleLoadError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut rules = Vec::with_capacity(paths.len());
        for path in paths {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let text = fs::read_to_string(&path).map_err(|source| RuleLoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
            rules.push(self.parse_rule(&file, &text)?);
        }
        Ok(rules)
    }

    /// The embedded reference rule set.
    pub fn builtin(&self) -> RuleResult<Vec<Rule>> {
        BUILTIN_RULE_DEFS
            .iter()
            .map(|(file, text)| self.parse_rule(file, text))
            .collect()
    }

    /// Parse and validate a single rule definition.
    pub fn parse_rule(&self, file: &str, text: &str) -> RuleResult<Rule> {
        let raw: RawRule = serde_json::from_str(text).map_err(|source| RuleLoadError::Parse {
            file: file.to_string(),
            source,
        })?;

        let id = require(file, "id", raw.id)?;
        let name = require(file, "name", raw.name)?;
        let domain_raw = require(file, "domain", raw.domain)?;
        let severity_raw = require(file, "severity", raw.severity)?;
        let rule_class_raw = require(file, "rule_class", raw.rule_class)?;
        let logic_raw = require(file, "logic", raw.logic)?;
        let explanation_template = require(file, "explanation_template", raw.explanation_template)?;
        let actions = require(file, "actions", raw.actions)?;

        let domain = Domain::parse(&domain_raw)
            .ok_or_else(|| invalid(file, "domain", &domain_raw))?;
        let severity = Severity::parse(&severity_raw)
            .ok_or_else(|| invalid(file, "severity", &severity_raw))?;
        let rule_class = RuleClass::parse(&rule_class_raw)
            .ok_or_else(|| invalid(file, "rule_class", &rule_class_raw))?;

        let logic = match (logic_raw.enzyme, logic_raw.transporter, logic_raw.pd_overlap) {
            (Some(enz), None, None) => RuleLogic::Enzyme(EnzymePattern {
                enzyme_id: require(file, "logic.enzyme.id", enz.id)?,
                a_role: parse_role(file, "logic.enzyme.A_role", enz.a_role)?,
                b_role: parse_role(file, "logic.enzyme.B_role", enz.b_role)?,
                b_strength: parse_opt_strength(file, "logic.enzyme.B_strength", enz.b_strength)?,
                b_strength_in: parse_strengths(file, "logic.enzyme.B_strength_in", enz.b_strength_in)?,
            }),
            (None, Some(tr), None) => {
                let selector = match (tr.id, tr.family) {
                    (Some(id), None) => TransporterSelector::Id(id),
                    (None, Some(family)) => TransporterSelector::Family(family),
                    _ => {
                        return Err(RuleLoadError::TransporterSelector {
                            file: file.to_string(),
                        })
                    }
                };
                RuleLogic::Transporter(TransporterPattern {
                    selector,
                    a_role: parse_role(file, "logic.transporter.A_role", tr.a_role)?,
                    b_role: parse_role(file, "logic.transporter.B_role", tr.b_role)?,
                    b_strength: parse_opt_strength(
                        file,
                        "logic.transporter.B_strength",
                        tr.b_strength,
                    )?,
                    b_strength_in: parse_strengths(
                        file,
                        "logic.transporter.B_strength_in",
                        tr.b_strength_in,
                    )?,
                })
            }
            (None, None, Some(pd)) => {
                let min_magnitude = match pd.min_magnitude {
                    None => None,
                    Some(raw) => Some(
                        Magnitude::parse(&raw)
                            .ok_or_else(|| invalid(file, "logic.pd_overlap.min_magnitude", &raw))?,
                    ),
                };
                RuleLogic::PdOverlap(PdOverlapPattern {
                    effect_id: require(file, "logic.pd_overlap.effect_id", pd.effect_id)?,
                    min_magnitude,
                })
            }
            (enz, tr, pd) => {
                let found = [enz.is_some(), tr.is_some(), pd.is_some()]
                    .iter()
                    .filter(|present| **present)
                    .count();
                return Err(RuleLoadError::LogicShape {
                    file: file.to_string(),
                    found,
                });
            }
        };

        let a_ti = match logic_raw.a_ti {
            None => None,
            Some(raw) => Some(
                TherapeuticIndex::parse(&raw).ok_or_else(|| invalid(file, "logic.A_ti", &raw))?,
            ),
        };

        for template_text in std::iter::once(explanation_template.as_str())
            .chain(logic_raw.rationale.iter().map(String::as_str))
        {
            for placeholder in find_placeholders(template_text) {
                if !ALLOWED_PLACEHOLDERS.contains(&placeholder.as_str()) {
                    return Err(RuleLoadError::UnknownPlaceholder {
                        file: file.to_string(),
                        placeholder,
                    });
                }
            }
        }

        Ok(Rule {
            id,
            name,
            domain,
            severity,
            rule_class,
            logic,
            a_ti,
            requires_patient_flag: logic_raw.requires_patient_flag,
            rationale: logic_raw.rationale,
            explanation_template,
            actions,
            references: raw.references,
            tags: raw.tags,
        })
    }

    /// Coarse mechanism tags for a rule's logic, used for domain filtering.
    /// Returns a list so future multi-pattern logic keeps working.
    pub fn mechanisms(&self, rule: &Rule) -> Vec<Mechanism> {
        let mut out = Vec::new();

        match &rule.logic {
            RuleLogic::Enzyme(pattern) => {
                if pattern.enzyme_id.starts_with("CYP") {
                    out.push(Mechanism::Cyp);
                } else if pattern.enzyme_id.starts_with("UGT") {
                    out.push(Mechanism::Ugt);
                } else {
                    out.push(Mechanism::Enzyme);
                }
            }
            RuleLogic::Transporter(pattern) => {
                let (t_id, family) = match &pattern.selector {
                    TransporterSelector::Id(id) => {
                        (Some(id.as_str()), self.registry.family_of(id))
                    }
                    TransporterSelector::Family(family) => (None, Some(family.as_str())),
                };

                let mech = if family == Some("ABCB1") || t_id == Some(TRANSPORTER_PGP) {
                    Mechanism::Pgp
                } else if family == Some("ABCG2") || t_id == Some(TRANSPORTER_BCRP) {
                    Mechanism::Bcrp
                } else if family == Some("OATP")
                    || t_id.is_some_and(|id| id.starts_with("OATP"))
                {
                    Mechanism::Oatp
                } else {
                    Mechanism::Transporter
                };
                out.push(mech);
            }
            RuleLogic::PdOverlap(_) => out.push(Mechanism::Pd),
        }

        out
    }
}

fn require<T>(file: &str, key: &'static str, value: Option<T>) -> RuleResult<T> {
    value.ok_or(RuleLoadError::MissingKey {
        file: file.to_string(),
        key,
    })
}

fn invalid(file: &str, field: &'static str, value: &str) -> RuleLoadError {
    RuleLoadError::InvalidValue {
        file: file.to_string(),
        field,
        value: value.to_string(),
    }
}

fn parse_role(file: &str, field: &'static str, raw: Option<String>) -> RuleResult<Role> {
    let raw = require(file, field, raw)?;
    Role::parse(&raw).ok_or_else(|| invalid(file, field, &raw))
}

fn parse_opt_strength(
    file: &str,
    field: &'static str,
    raw: Option<String>,
) -> RuleResult<Option<Strength>> {
    match raw {
        None => Ok(None),
        Some(raw) => Strength::parse(&raw)
            .map(Some)
            .ok_or_else(|| invalid(file, field, &raw)),
    }
}

fn parse_strengths(
    file: &str,
    field: &'static str,
    raw: Vec<String>,
) -> RuleResult<Vec<Strength>> {
    raw.iter()
        .map(|s| Strength::parse(s).ok_or_else(|| invalid(file, field, s)))
        .collect()
}

#[derive(Deserialize)]
struct RawRule {
    id: Option<String>,
    name: Option<String>,
    domain: Option<String>,
    severity: Option<String>,
    rule_class: Option<String>,
    logic: Option<RawLogic>,
    explanation_template: Option<String>,
    actions: Option<Vec<String>>,
    #[serde(default)]
    references: Vec<Reference>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct RawLogic {
    enzyme: Option<RawEnzymePattern>,
    transporter: Option<RawTransporterPattern>,
    pd_overlap: Option<RawPdOverlapPattern>,
    #[serde(rename = "A_ti")]
    a_ti: Option<String>,
    requires_patient_flag: Option<String>,
    #[serde(default)]
    rationale: Vec<String>,
}

#[derive(Deserialize)]
struct RawEnzymePattern {
    id: Option<String>,
    #[serde(rename = "A_role")]
    a_role: Option<String>,
    #[serde(rename = "B_role")]
    b_role: Option<String>,
    #[serde(rename = "B_strength")]
    b_strength: Option<String>,
    #[serde(rename = "B_strength_in", default)]
    b_strength_in: Vec<String>,
}

#[derive(Deserialize)]
struct RawTransporterPattern {
    id: Option<String>,
    family: Option<String>,
    #[serde(rename = "A_role")]
    a_role: Option<String>,
    #[serde(rename = "B_role")]
    b_role: Option<String>,
    #[serde(rename = "B_strength")]
    b_strength: Option<String>,
    #[serde(rename = "B_strength_in", default)]
    b_strength_in: Vec<String>,
}

#[derive(Deserialize)]
struct RawPdOverlapPattern {
    effect_id: Option<String>,
    min_magnitude: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_test_registry() -> TransporterRegistry {
        TransporterRegistry::new()
    }

    #[test]
    fn test_builtin_rules_load() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);
        let rules = store.builtin().unwrap();

        assert!(!rules.is_empty());
        // Filenames sort lexically, so PD rules come before PK rules
        assert!(rules[0].id.starts_with("PD_"));
        assert!(rules.iter().any(|r| r.id == "PK_CYP3A4_STRONG_INHIB"));
        assert!(rules.iter().any(|r| r.id == "PD_QT_ADDITIVE"));
    }

    #[test]
    fn test_parse_minimal_enzyme_rule() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let text = r#"{
            "id": "PK_TEST",
            "name": "Test rule",
            "domain": "PK",
            "severity": "major",
            "rule_class": "adjust_monitor",
            "logic": {
                "enzyme": {"id": "CYP3A4", "A_role": "substrate", "B_role": "inhibitor", "B_strength_in": ["strong"]},
                "rationale": ["{A_name} is a CYP3A4 substrate."]
            },
            "explanation_template": "{B_name} inhibits {enzyme_id}.",
            "actions": ["Monitor."],
            "tags": ["exposure_increase"]
        }"#;

        let rule = store.parse_rule("pk_test.json", text).unwrap();
        assert_eq!(rule.id, "PK_TEST");
        assert_eq!(rule.severity, Severity::Major);
        match &rule.logic {
            RuleLogic::Enzyme(p) => {
                assert_eq!(p.enzyme_id, "CYP3A4");
                assert_eq!(p.a_role, Role::Substrate);
                assert_eq!(p.b_strength_in, vec![Strength::Strong]);
            }
            other => panic!("expected enzyme logic, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_key_is_reported() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let text = r#"{
            "id": "PK_TEST",
            "domain": "PK",
            "severity": "major",
            "rule_class": "adjust_monitor",
            "logic": {"enzyme": {"id": "CYP3A4", "A_role": "substrate", "B_role": "inhibitor"}},
            "explanation_template": "x",
            "actions": []
        }"#;

        let err = store.parse_rule("pk_test.json", text).unwrap_err();
        match err {
            RuleLoadError::MissingKey { file, key } => {
                assert_eq!(file, "pk_test.json");
                assert_eq!(key, "name");
            }
            other => panic!("expected MissingKey, got {other}"),
        }
    }

    #[test]
    fn test_invalid_severity_is_reported() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let text = r#"{
            "id": "R", "name": "R", "domain": "PK",
            "severity": "minor",
            "rule_class": "caution",
            "logic": {"enzyme": {"id": "CYP3A4", "A_role": "substrate", "B_role": "inhibitor"}},
            "explanation_template": "x",
            "actions": []
        }"#;

        let err = store.parse_rule("r.json", text).unwrap_err();
        assert!(matches!(err, RuleLoadError::InvalidValue { field: "severity", .. }));
    }

    #[test]
    fn test_logic_must_have_exactly_one_block() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let text = r#"{
            "id": "R", "name": "R", "domain": "PK",
            "severity": "major", "rule_class": "caution",
            "logic": {
                "enzyme": {"id": "CYP3A4", "A_role": "substrate", "B_role": "inhibitor"},
                "pd_overlap": {"effect_id": "QT_prolongation"}
            },
            "explanation_template": "x",
            "actions": []
        }"#;

        let err = store.parse_rule("r.json", text).unwrap_err();
        assert!(matches!(err, RuleLoadError::LogicShape { found: 2, .. }));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let text = r#"{
            "id": "R", "name": "R", "domain": "PD",
            "severity": "major", "rule_class": "caution",
            "logic": {"pd_overlap": {"effect_id": "QT_prolongation"}},
            "explanation_template": "{A_name} and {C_name} overlap.",
            "actions": []
        }"#;

        let err = store.parse_rule("r.json", text).unwrap_err();
        match err {
            RuleLoadError::UnknownPlaceholder { placeholder, .. } => {
                assert_eq!(placeholder, "C_name");
            }
            other => panic!("expected UnknownPlaceholder, got {other}"),
        }
    }

    #[test]
    fn test_transporter_needs_exactly_one_selector() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let text = r#"{
            "id": "R", "name": "R", "domain": "PK",
            "severity": "major", "rule_class": "caution",
            "logic": {"transporter": {"id": "P-gp", "family": "ABCB1", "A_role": "substrate", "B_role": "inhibitor"}},
            "explanation_template": "x",
            "actions": []
        }"#;

        let err = store.parse_rule("r.json", text).unwrap_err();
        assert!(matches!(err, RuleLoadError::TransporterSelector { .. }));
    }

    #[test]
    fn test_load_dir_sorts_by_filename() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let dir = tempfile::tempdir().unwrap();
        for (name, text) in BUILTIN_RULE_DEFS.iter().rev() {
            std::fs::write(dir.path().join(name), text).unwrap();
        }
        // Non-JSON files are ignored
        std::fs::write(dir.path().join("notes.txt"), "not a rule").unwrap();

        let from_dir = store.load_dir(dir.path()).unwrap();
        let builtin = store.builtin().unwrap();

        assert_eq!(from_dir.len(), builtin.len());
        let dir_ids: Vec<&str> = from_dir.iter().map(|r| r.id.as_str()).collect();
        let builtin_ids: Vec<&str> = builtin.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(dir_ids, builtin_ids);
    }

    #[test]
    fn test_load_dir_missing_directory_errors() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);

        let err = store
            .load_dir(std::path::Path::new("/no/such/rule/dir"))
            .unwrap_err();
        assert!(matches!(err, RuleLoadError::Io { .. }));
    }

    #[test]
    fn test_mechanism_tagging() {
        let registry = store_test_registry();
        let store = RuleStore::new(&registry);
        let rules = store.builtin().unwrap();

        let by_id = |id: &str| rules.iter().find(|r| r.id == id).unwrap();

        assert_eq!(
            store.mechanisms(by_id("PK_CYP3A4_STRONG_INHIB")),
            vec![Mechanism::Cyp]
        );
        assert_eq!(
            store.mechanisms(by_id("PK_PGP_INHIB_DIGOXIN")),
            vec![Mechanism::Pgp]
        );
        assert_eq!(
            store.mechanisms(by_id("PK_BCRP_INHIB_SUBSTRATE")),
            vec![Mechanism::Bcrp]
        );
        assert_eq!(store.mechanisms(by_id("PK_OATP_INHIB")), vec![Mechanism::Oatp]);
        assert_eq!(store.mechanisms(by_id("PD_QT_ADDITIVE")), vec![Mechanism::Pd]);
    }
}
