//! Composite hit derivation.
//!
//! Post-processes the primitive hit list to synthesize findings that span
//! multiple mechanisms, which no single declarative rule encodes:
//!
//! - PK exposure increase amplifying a CNS-depression PD effect
//! - Two or more distinct exposure-increasing PK mechanisms on the same pair
//!
//! Both passes are pure: they return the input hits plus any new composites,
//! never removing or mutating existing hits. Re-applying a pass to its own
//! output is a no-op (checked by `HitKey`).

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::models::{tags, Domain, Facts, HitInputs, HitKey, Magnitude, Reference, RuleClass, RuleHit, Severity};
use crate::registry::{effects, TRANSPORTER_PGP};

use super::rule::Mechanism;

pub const COMP_PK_UP_CNS_DEP: &str = "COMP_PK_UP_CNS_DEP";
pub const PK_DUAL_MECH_INCREASE: &str = "PK_DUAL_MECH_INCREASE";
pub const PK_DUAL_MECH_INCREASE_CYP_UGT: &str = "PK_DUAL_MECH_INCREASE_CYP_UGT";
pub const PK_DUAL_MECH_INCREASE_UGT_PGP: &str = "PK_DUAL_MECH_INCREASE_UGT_PGP";
pub const PK_MULTI_MECH_INCREASE: &str = "PK_MULTI_MECH_INCREASE";

/// Run every composite pass in fixed order: PK→PD CNS amplification first,
/// then multi-mechanism exposure increase. Idempotent as a whole.
pub fn apply_composites(facts: &Facts, hits: &[RuleHit]) -> Vec<RuleHit> {
    let out = apply_pk_up_cns_depression(facts, hits);
    apply_pk_multi_mechanism_exposure_increase(facts, &out, 2, false)
}

/// PK → PD amplification: an exposure increase of a CNS-depressant drug may
/// amplify its sedating effects. At most one composite per causal (A,B) pair.
fn apply_pk_up_cns_depression(facts: &Facts, hits: &[RuleHit]) -> Vec<RuleHit> {
    let mut out = hits.to_vec();
    let mut existing: HashSet<HitKey> = out.iter().map(RuleHit::key).collect();

    let pk_up_pairs: Vec<(String, String)> = out
        .iter()
        .filter(|h| h.domain == Domain::PK && h.has_tag(tags::EXPOSURE_INCREASE))
        .map(|h| (h.inputs.a.clone(), h.inputs.b.clone()))
        .collect();

    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    for (affected_a, interacting_b) in pk_up_pairs {
        if !seen_pairs.insert((affected_a.clone(), interacting_b.clone())) {
            continue;
        }

        let has_cns = facts
            .pd_effects_of(&affected_a)
            .iter()
            .any(|e| e.effect_id == effects::CNS_DEPRESSION && e.magnitude >= Magnitude::Medium);
        if !has_cns {
            continue;
        }

        let key = HitKey {
            rule_id: COMP_PK_UP_CNS_DEP.into(),
            a: affected_a.clone(),
            b: interacting_b.clone(),
            domain: Domain::PD,
        };
        if existing.contains(&key) {
            continue;
        }
        existing.insert(key);

        debug!(a = %affected_a, b = %interacting_b, "emitting CNS amplification composite");
        out.push(RuleHit {
            rule_id: COMP_PK_UP_CNS_DEP.into(),
            name: "Increased exposure may amplify CNS depression effects".into(),
            domain: Domain::PD,
            severity: Severity::Major,
            rule_class: RuleClass::AdjustMonitor,
            inputs: HitInputs::pair(affected_a, interacting_b),
            rationale: vec![
                "{A_name} has CNS-depressant effects.".into(),
                "Rules indicate increased exposure of {A_name}, which may amplify sedation-related adverse effects.".into(),
            ],
            actions: vec![
                "Use caution with sedation and impairment risk.".into(),
                "Consider reducing overlapping sedatives and monitoring for oversedation (educational).".into(),
            ],
            references: vec![Reference {
                source: "Educational note".into(),
                citation: "Composite: PK exposure increase can amplify PD effects.".into(),
                url: None,
            }],
            tags: vec![tags::COMPOSITE.into(), tags::CNS_DEPRESSION_AMPLIFIED.into()],
        });
    }

    out
}

/// General composite: when at least `min_mechanisms` distinct exposure-
/// increasing PK mechanisms are present for the same (A,B), emit one
/// composite hit for the pair.
///
/// Severity escalation is conservative and off by default: caution bumps to
/// major when two or more mechanisms contribute; major/contraindicated stay
/// unchanged.
pub fn apply_pk_multi_mechanism_exposure_increase(
    _facts: &Facts,
    hits: &[RuleHit],
    min_mechanisms: usize,
    escalate_severity: bool,
) -> Vec<RuleHit> {
    let mut by_pair: BTreeMap<(String, String), Vec<&RuleHit>> = BTreeMap::new();
    for hit in hits {
        if hit.domain != Domain::PK || !hit.has_tag(tags::EXPOSURE_INCREASE) {
            continue;
        }
        by_pair
            .entry((hit.inputs.a.clone(), hit.inputs.b.clone()))
            .or_default()
            .push(hit);
    }

    let mut out = hits.to_vec();
    let mut existing: HashSet<HitKey> = out.iter().map(RuleHit::key).collect();

    for ((a, b), pair_hits) in by_pair {
        let mut mechs: BTreeSet<Mechanism> = BTreeSet::new();
        for hit in &pair_hits {
            mechs.extend(pk_mechanisms_for_hit(hit));
        }
        if mechs.len() < min_mechanisms {
            continue;
        }

        let rule_id = rule_id_for_mechs(&mechs);
        let label = label_for_mechs(&mechs);

        let key = HitKey {
            rule_id: rule_id.into(),
            a: a.clone(),
            b: b.clone(),
            domain: Domain::PK,
        };
        if existing.contains(&key) {
            continue;
        }
        existing.insert(key);

        let base_severity = max_severity(&pair_hits);
        let severity =
            escalate_for_multi_mech(base_severity, mechs.len(), escalate_severity);
        let rule_class = max_class(&pair_hits);

        let mut rationale = vec![
            format!("More than one exposure-increasing PK mechanism is present ({label})."),
            "Multiple exposure-increasing mechanisms may increase risk more than either mechanism alone in some contexts.".to_string(),
        ];
        if severity != base_severity {
            rationale.push(format!(
                "Composite severity escalated from {} to {} due to multiple mechanisms.",
                base_severity.as_str(),
                severity.as_str()
            ));
        }

        let mut hit_tags = vec![
            tags::EXPOSURE_INCREASE.to_string(),
            tags::MULTI_MECHANISM.to_string(),
        ];
        if mechs.len() == 2 {
            hit_tags.push(tags::DUAL_MECHANISM.to_string());
        }

        debug!(%a, %b, rule_id, %label, "emitting multi-mechanism composite");
        out.push(RuleHit {
            rule_id: rule_id.into(),
            name: format!("Multiple PK mechanisms may increase exposure ({label})"),
            domain: Domain::PK,
            severity,
            rule_class,
            inputs: HitInputs::pair(a, b),
            rationale,
            actions: vec![
                "Use extra caution when multiple exposure-increasing mechanisms apply.".into(),
                "Consider alternatives, dose adjustment, and closer monitoring when clinically appropriate.".into(),
            ],
            references: vec![Reference {
                source: "Educational note".into(),
                citation: "Multiple PK mechanisms can be additive or synergistic.".into(),
                url: None,
            }],
            tags: hit_tags,
        });
    }

    out
}

/// Mechanism labels contributed by one PK hit, read off its resolved inputs.
fn pk_mechanisms_for_hit(hit: &RuleHit) -> BTreeSet<Mechanism> {
    let mut out = BTreeSet::new();
    if hit.domain != Domain::PK {
        return out;
    }

    if let Some(enzyme_id) = &hit.inputs.enzyme_id {
        let upper = enzyme_id.to_uppercase();
        if upper.starts_with("CYP") {
            out.insert(Mechanism::Cyp);
        } else if upper.starts_with("UGT") {
            out.insert(Mechanism::Ugt);
        }
    }

    if let Some(transporter_id) = &hit.inputs.transporter_id {
        if transporter_id == TRANSPORTER_PGP {
            out.insert(Mechanism::Pgp);
        } else if !transporter_id.is_empty() {
            out.insert(Mechanism::Other(transporter_id.to_lowercase()));
        }
    }

    out
}

/// Preserve the legacy rule ids for the common dual-mechanism combinations.
fn rule_id_for_mechs(mechs: &BTreeSet<Mechanism>) -> &'static str {
    let is_pair = |x: &Mechanism, y: &Mechanism| {
        mechs.len() == 2 && mechs.contains(x) && mechs.contains(y)
    };

    if is_pair(&Mechanism::Cyp, &Mechanism::Pgp) {
        PK_DUAL_MECH_INCREASE
    } else if is_pair(&Mechanism::Cyp, &Mechanism::Ugt) {
        PK_DUAL_MECH_INCREASE_CYP_UGT
    } else if is_pair(&Mechanism::Ugt, &Mechanism::Pgp) {
        PK_DUAL_MECH_INCREASE_UGT_PGP
    } else {
        PK_MULTI_MECH_INCREASE
    }
}

/// Human label: CYP, UGT, P-gp in fixed order, then any other mechanisms
/// alphabetically, joined with " + ".
fn label_for_mechs(mechs: &BTreeSet<Mechanism>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if mechs.contains(&Mechanism::Cyp) {
        parts.push("CYP");
    }
    if mechs.contains(&Mechanism::Ugt) {
        parts.push("UGT");
    }
    if mechs.contains(&Mechanism::Pgp) {
        parts.push("P-gp");
    }

    let mut extras: Vec<&str> = mechs
        .iter()
        .filter(|m| !matches!(m, Mechanism::Cyp | Mechanism::Ugt | Mechanism::Pgp))
        .map(Mechanism::label)
        .collect();
    extras.sort_unstable();
    parts.extend(extras);

    if parts.is_empty() {
        "multiple PK".to_string()
    } else {
        parts.join(" + ")
    }
}

fn max_severity(hits: &[&RuleHit]) -> Severity {
    hits.iter()
        .map(|h| h.severity)
        .max()
        .unwrap_or(Severity::Info)
}

fn max_class(hits: &[&RuleHit]) -> RuleClass {
    hits.iter()
        .map(|h| h.rule_class)
        .max()
        .unwrap_or(RuleClass::Info)
}

fn escalate_for_multi_mech(base: Severity, mech_count: usize, enabled: bool) -> Severity {
    if !enabled || mech_count < 2 {
        return base;
    }
    if base == Severity::Caution {
        return Severity::Major;
    }
    base
}
