//! Rule evaluation over ordered drug pairs.
//!
//! Rules are written assuming A is the affected drug and B is the interacting
//! drug, so `evaluate_all` tries every rule in both directions for each pair.
//! PD overlap rules suppress the redundant reverse direction themselves.

use std::collections::HashSet;

use tracing::debug;

use crate::models::{Facts, HitInputs, Magnitude, Role, RuleHit, Strength};
use crate::registry::TransporterRegistry;

use super::rule::{Rule, RuleLogic, TransporterSelector};

/// Evaluates rules against a facts snapshot.
pub struct RuleEngine<'a> {
    registry: &'a TransporterRegistry,
}

impl<'a> RuleEngine<'a> {
    pub fn new(registry: &'a TransporterRegistry) -> Self {
        Self { registry }
    }

    /// Evaluate a single rule for the ordered pair (A=a, B=b).
    ///
    /// Returns `None` when the rule does not fire; that is the expected
    /// common case, not an error. Unknown enzyme/transporter ids in the rule
    /// simply never match.
    pub fn evaluate_rule(&self, rule: &Rule, facts: &Facts, a: &str, b: &str) -> Option<RuleHit> {
        let mut inputs = HitInputs::pair(a, b);

        match &rule.logic {
            RuleLogic::Enzyme(pattern) => {
                inputs.enzyme_id = Some(pattern.enzyme_id.clone());

                let a_ok = drug_has_enzyme_role(facts, a, &pattern.enzyme_id, pattern.a_role, None, &[]);
                let b_ok = drug_has_enzyme_role(
                    facts,
                    b,
                    &pattern.enzyme_id,
                    pattern.b_role,
                    pattern.b_strength,
                    &pattern.b_strength_in,
                );
                if !(a_ok && b_ok) {
                    return None;
                }
            }

            RuleLogic::Transporter(pattern) => {
                let transporter_ids: Vec<String> = match &pattern.selector {
                    TransporterSelector::Id(id) => {
                        inputs.transporter_id = Some(id.clone());
                        vec![id.clone()]
                    }
                    TransporterSelector::Family(family) => {
                        let ids = self.registry.ids_in_family(family);
                        inputs.transporter_family = Some(family.clone());
                        // A family resolving to a single transporter also gets
                        // a canonical transporter_id, which keeps composite
                        // mechanism grouping working for family-based rules.
                        if ids.len() == 1 {
                            inputs.transporter_id = Some(ids[0].clone());
                        }
                        ids
                    }
                };
                if transporter_ids.is_empty() {
                    return None;
                }

                let a_ok = transporter_ids.iter().any(|tid| {
                    drug_has_transporter_role(facts, a, tid, pattern.a_role, None, &[])
                });
                let b_ok = transporter_ids.iter().any(|tid| {
                    drug_has_transporter_role(
                        facts,
                        b,
                        tid,
                        pattern.b_role,
                        pattern.b_strength,
                        &pattern.b_strength_in,
                    )
                });
                if !(a_ok && b_ok) {
                    return None;
                }
            }

            RuleLogic::PdOverlap(pattern) => {
                inputs.effect_id = Some(pattern.effect_id.clone());

                if !(drug_has_pd_effect(facts, a, &pattern.effect_id, pattern.min_magnitude)
                    && drug_has_pd_effect(facts, b, &pattern.effect_id, pattern.min_magnitude))
                {
                    return None;
                }

                // Symmetric predicate: only fire for the lexically ordered
                // direction so the unordered pair yields exactly one hit.
                if a > b {
                    return None;
                }
            }
        }

        if let Some(required_ti) = rule.a_ti {
            if facts.therapeutic_index_of(a) != Some(required_ti) {
                return None;
            }
        }

        if let Some(flag) = &rule.requires_patient_flag {
            if !facts.patient_flag(flag) {
                return None;
            }
        }

        Some(RuleHit {
            rule_id: rule.id.clone(),
            name: rule.name.clone(),
            domain: rule.domain,
            severity: rule.severity,
            rule_class: rule.rule_class,
            inputs,
            rationale: rule.rationale.clone(),
            actions: rule.actions.clone(),
            references: rule.references.clone(),
            tags: rule.tags.clone(),
        })
    }

    /// Evaluate every rule against every unordered pair of distinct drugs, in
    /// both directions. The output order is stable for identical inputs.
    ///
    /// Precondition: every id in `drug_ids` is a key in `facts.drugs`.
    pub fn evaluate_all(&self, rules: &[Rule], facts: &Facts, drug_ids: &[String]) -> Vec<RuleHit> {
        // De-dupe preserving first-seen order
        let mut seen = HashSet::new();
        let ordered: Vec<&str> = drug_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();

        for id in &ordered {
            assert!(
                facts.drugs.contains_key(*id),
                "drug id '{id}' is not present in the facts snapshot"
            );
        }

        let mut hits = Vec::new();
        for i in 0..ordered.len() {
            for j in (i + 1)..ordered.len() {
                let x = ordered[i];
                let y = ordered[j];

                // Both directions, so directional PK rules can match either
                // drug as the affected one.
                for (a, b) in [(x, y), (y, x)] {
                    for rule in rules {
                        if let Some(hit) = self.evaluate_rule(rule, facts, a, b) {
                            debug!(rule_id = %hit.rule_id, a, b, "rule fired");
                            hits.push(hit);
                        }
                    }
                }
            }
        }

        hits
    }
}

fn strength_ok(actual: Option<Strength>, required: Option<Strength>, allowed: &[Strength]) -> bool {
    if required.is_none() && allowed.is_empty() {
        return true;
    }
    let Some(actual) = actual else {
        return false;
    };
    if !allowed.is_empty() {
        return allowed.contains(&actual);
    }
    Some(actual) == required
}

fn drug_has_enzyme_role(
    facts: &Facts,
    drug_id: &str,
    enzyme_id: &str,
    role: Role,
    strength: Option<Strength>,
    strength_in: &[Strength],
) -> bool {
    facts.enzyme_roles_of(drug_id).iter().any(|r| {
        r.enzyme_id == enzyme_id && r.role == role && strength_ok(r.strength, strength, strength_in)
    })
}

fn drug_has_transporter_role(
    facts: &Facts,
    drug_id: &str,
    transporter_id: &str,
    role: Role,
    strength: Option<Strength>,
    strength_in: &[Strength],
) -> bool {
    facts.transporter_roles_of(drug_id).iter().any(|r| {
        r.transporter_id == transporter_id
            && r.role == role
            && strength_ok(r.strength, strength, strength_in)
    })
}

fn drug_has_pd_effect(
    facts: &Facts,
    drug_id: &str,
    effect_id: &str,
    min_magnitude: Option<Magnitude>,
) -> bool {
    facts.pd_effects_of(drug_id).iter().any(|e| {
        e.effect_id == effect_id && min_magnitude.map_or(true, |min| e.magnitude >= min)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Domain, Drug, EffectDirection, EnzymeRole, PdEffect, RuleClass, Severity, TherapeuticIndex,
        TransporterRole,
    };
    use crate::rules::rule::{EnzymePattern, PdOverlapPattern, TransporterPattern};

    fn drug(id: &str, ti: TherapeuticIndex) -> Drug {
        Drug {
            id: id.into(),
            generic_name: id.into(),
            drug_class: None,
            therapeutic_index: ti,
            notes: None,
        }
    }

    fn enzyme_role(enzyme_id: &str, role: Role, strength: Option<Strength>) -> EnzymeRole {
        EnzymeRole {
            enzyme_id: enzyme_id.into(),
            role,
            strength,
            fraction_metabolized: None,
            notes: None,
        }
    }

    fn pd_effect(effect_id: &str, magnitude: Magnitude) -> PdEffect {
        PdEffect {
            effect_id: effect_id.into(),
            direction: EffectDirection::Increase,
            magnitude,
            mechanism_note: None,
        }
    }

    fn enzyme_rule(id: &str, b_strength_in: Vec<Strength>) -> Rule {
        Rule {
            id: id.into(),
            name: id.into(),
            domain: Domain::PK,
            severity: Severity::Major,
            rule_class: RuleClass::AdjustMonitor,
            logic: RuleLogic::Enzyme(EnzymePattern {
                enzyme_id: "CYP3A4".into(),
                a_role: Role::Substrate,
                b_role: Role::Inhibitor,
                b_strength: None,
                b_strength_in,
            }),
            a_ti: None,
            requires_patient_flag: None,
            rationale: vec![],
            explanation_template: "{A_name} + {B_name}".into(),
            actions: vec![],
            references: vec![],
            tags: vec!["exposure_increase".into()],
        }
    }

    fn pd_rule(id: &str, effect_id: &str, min: Option<Magnitude>) -> Rule {
        Rule {
            id: id.into(),
            name: id.into(),
            domain: Domain::PD,
            severity: Severity::Major,
            rule_class: RuleClass::AdjustMonitor,
            logic: RuleLogic::PdOverlap(PdOverlapPattern {
                effect_id: effect_id.into(),
                min_magnitude: min,
            }),
            a_ti: None,
            requires_patient_flag: None,
            rationale: vec![],
            explanation_template: "{A_name} + {B_name}".into(),
            actions: vec![],
            references: vec![],
            tags: vec![],
        }
    }

    fn basic_facts() -> Facts {
        let mut facts = Facts::new();
        facts
            .drugs
            .insert("midazolam".into(), drug("midazolam", TherapeuticIndex::Moderate));
        facts
            .drugs
            .insert("clarithromycin".into(), drug("clarithromycin", TherapeuticIndex::Moderate));
        facts.enzyme_roles.insert(
            "midazolam".into(),
            vec![enzyme_role("CYP3A4", Role::Substrate, None)],
        );
        facts.enzyme_roles.insert(
            "clarithromycin".into(),
            vec![enzyme_role("CYP3A4", Role::Inhibitor, Some(Strength::Strong))],
        );
        facts
    }

    #[test]
    fn test_enzyme_rule_fires_directionally() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);
        let facts = basic_facts();
        let rule = enzyme_rule("PK_TEST", vec![Strength::Strong]);

        let hit = engine
            .evaluate_rule(&rule, &facts, "midazolam", "clarithromycin")
            .unwrap();
        assert_eq!(hit.inputs.a, "midazolam");
        assert_eq!(hit.inputs.b, "clarithromycin");
        assert_eq!(hit.inputs.enzyme_id.as_deref(), Some("CYP3A4"));

        // Reverse direction: clarithromycin is not a CYP3A4 substrate
        assert!(engine
            .evaluate_rule(&rule, &facts, "clarithromycin", "midazolam")
            .is_none());
    }

    #[test]
    fn test_strength_set_constrains_b_role() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);
        let mut facts = basic_facts();
        facts.enzyme_roles.insert(
            "clarithromycin".into(),
            vec![enzyme_role("CYP3A4", Role::Inhibitor, Some(Strength::Moderate))],
        );

        let rule = enzyme_rule("PK_TEST", vec![Strength::Strong]);
        assert!(engine
            .evaluate_rule(&rule, &facts, "midazolam", "clarithromycin")
            .is_none());

        let relaxed = enzyme_rule("PK_TEST2", vec![Strength::Moderate, Strength::Strong]);
        assert!(engine
            .evaluate_rule(&relaxed, &facts, "midazolam", "clarithromycin")
            .is_some());
    }

    #[test]
    fn test_required_strength_never_matches_unrated_role() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);
        let mut facts = basic_facts();
        facts.enzyme_roles.insert(
            "clarithromycin".into(),
            vec![enzyme_role("CYP3A4", Role::Inhibitor, None)],
        );

        let rule = enzyme_rule("PK_TEST", vec![Strength::Strong]);
        assert!(engine
            .evaluate_rule(&rule, &facts, "midazolam", "clarithromycin")
            .is_none());
    }

    #[test]
    fn test_transporter_family_resolution() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);

        let mut facts = Facts::new();
        facts
            .drugs
            .insert("digoxin".into(), drug("digoxin", TherapeuticIndex::Narrow));
        facts
            .drugs
            .insert("verapamil".into(), drug("verapamil", TherapeuticIndex::Moderate));
        facts.transporter_roles.insert(
            "digoxin".into(),
            vec![TransporterRole {
                transporter_id: "P-gp".into(),
                role: Role::Substrate,
                strength: None,
                notes: None,
            }],
        );
        facts.transporter_roles.insert(
            "verapamil".into(),
            vec![TransporterRole {
                transporter_id: "P-gp".into(),
                role: Role::Inhibitor,
                strength: Some(Strength::Moderate),
                notes: None,
            }],
        );

        let rule = Rule {
            id: "PK_PGP".into(),
            name: "P-gp".into(),
            domain: Domain::PK,
            severity: Severity::Major,
            rule_class: RuleClass::AdjustMonitor,
            logic: RuleLogic::Transporter(TransporterPattern {
                selector: TransporterSelector::Family("ABCB1".into()),
                a_role: Role::Substrate,
                b_role: Role::Inhibitor,
                b_strength: None,
                b_strength_in: vec![],
            }),
            a_ti: Some(TherapeuticIndex::Narrow),
            requires_patient_flag: None,
            rationale: vec![],
            explanation_template: "{transporter_id}".into(),
            actions: vec![],
            references: vec![],
            tags: vec![],
        };

        let hit = engine
            .evaluate_rule(&rule, &facts, "digoxin", "verapamil")
            .unwrap();
        // Single-id family resolution attaches the canonical transporter_id
        assert_eq!(hit.inputs.transporter_id.as_deref(), Some("P-gp"));
        assert_eq!(hit.inputs.transporter_family.as_deref(), Some("ABCB1"));

        // TI guard: verapamil as A is not narrow
        assert!(engine
            .evaluate_rule(&rule, &facts, "verapamil", "digoxin")
            .is_none());
    }

    #[test]
    fn test_pd_overlap_suppresses_reverse_direction() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);

        let mut facts = Facts::new();
        facts
            .drugs
            .insert("citalopram".into(), drug("citalopram", TherapeuticIndex::Moderate));
        facts
            .drugs
            .insert("ondansetron".into(), drug("ondansetron", TherapeuticIndex::Wide));
        facts.pd_effects.insert(
            "citalopram".into(),
            vec![pd_effect("QT_prolongation", Magnitude::Medium)],
        );
        facts.pd_effects.insert(
            "ondansetron".into(),
            vec![pd_effect("QT_prolongation", Magnitude::Medium)],
        );

        let rule = pd_rule("PD_QT", "QT_prolongation", Some(Magnitude::Medium));

        // "citalopram" < "ondansetron", so only that direction fires
        assert!(engine
            .evaluate_rule(&rule, &facts, "citalopram", "ondansetron")
            .is_some());
        assert!(engine
            .evaluate_rule(&rule, &facts, "ondansetron", "citalopram")
            .is_none());
    }

    #[test]
    fn test_pd_magnitude_threshold() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);

        let mut facts = Facts::new();
        facts.drugs.insert("a".into(), drug("a", TherapeuticIndex::Wide));
        facts.drugs.insert("b".into(), drug("b", TherapeuticIndex::Wide));
        facts
            .pd_effects
            .insert("a".into(), vec![pd_effect("sedation", Magnitude::Low)]);
        facts
            .pd_effects
            .insert("b".into(), vec![pd_effect("sedation", Magnitude::High)]);

        let strict = pd_rule("PD_SED", "sedation", Some(Magnitude::Medium));
        assert!(engine.evaluate_rule(&strict, &facts, "a", "b").is_none());

        let any = pd_rule("PD_SED_ANY", "sedation", None);
        assert!(engine.evaluate_rule(&any, &facts, "a", "b").is_some());
    }

    #[test]
    fn test_patient_flag_guard() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);

        let mut facts = Facts::new();
        facts.drugs.insert("a".into(), drug("a", TherapeuticIndex::Wide));
        facts.drugs.insert("b".into(), drug("b", TherapeuticIndex::Wide));
        facts
            .pd_effects
            .insert("a".into(), vec![pd_effect("QT_prolongation", Magnitude::Low)]);
        facts
            .pd_effects
            .insert("b".into(), vec![pd_effect("QT_prolongation", Magnitude::Low)]);

        let mut rule = pd_rule("PD_QT_RISK", "QT_prolongation", None);
        rule.requires_patient_flag = Some("qt_risk".into());

        assert!(engine.evaluate_rule(&rule, &facts, "a", "b").is_none());

        facts.patient_flags.insert("qt_risk".into(), true);
        assert!(engine.evaluate_rule(&rule, &facts, "a", "b").is_some());
    }

    #[test]
    fn test_evaluate_all_dedupes_input_ids() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);
        let facts = basic_facts();
        let rules = vec![enzyme_rule("PK_TEST", vec![Strength::Strong])];

        let drug_ids: Vec<String> = vec![
            "midazolam".into(),
            "clarithromycin".into(),
            "midazolam".into(),
        ];
        let hits = engine.evaluate_all(&rules, &facts, &drug_ids);

        // One pair, one direction matches
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].inputs.a, "midazolam");
    }

    #[test]
    fn test_evaluate_all_is_deterministic() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);
        let facts = basic_facts();
        let rules = vec![enzyme_rule("PK_TEST", vec![Strength::Strong])];
        let drug_ids: Vec<String> = vec!["midazolam".into(), "clarithromycin".into()];

        let first = engine.evaluate_all(&rules, &facts, &drug_ids);
        let second = engine.evaluate_all(&rules, &facts, &drug_ids);
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "not present in the facts snapshot")]
    fn test_unknown_drug_id_fails_fast() {
        let registry = TransporterRegistry::new();
        let engine = RuleEngine::new(&registry);
        let facts = basic_facts();
        let rules: Vec<Rule> = vec![];

        let drug_ids: Vec<String> = vec!["midazolam".into(), "ghost_drug".into()];
        engine.evaluate_all(&rules, &facts, &drug_ids);
    }
}
