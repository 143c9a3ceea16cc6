//! Pair report aggregation.
//!
//! Groups the flat hit list (primitive + composite) by unordered drug pair,
//! splits PK/PD sections, deduplicates, ranks, and computes pair-level
//! overall labels plus the PK directional summary.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::models::{tags, Domain, Facts, HitKey, PairReport, PkSummary, RuleClass, RuleHit, Severity};

use super::explain::unresolved_placeholders;

/// Build one report per unordered pair, ordered by descending overall
/// severity, then drug ids.
///
/// PK hits stay directional (A affected, B interacting) and should be
/// displayed as such; PD hits are symmetric.
pub fn build_pair_reports(
    facts: &Facts,
    hits: &[RuleHit],
    rule_templates: &HashMap<String, String>,
) -> Vec<PairReport> {
    let mut grouped: BTreeMap<(String, String), Vec<&RuleHit>> = BTreeMap::new();
    for hit in hits {
        let (a, b) = (&hit.inputs.a, &hit.inputs.b);
        let key = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        grouped.entry(key).or_default().push(hit);
    }

    let mut reports: Vec<PairReport> = Vec::with_capacity(grouped.len());
    for ((drug_1, drug_2), pair_hits) in grouped {
        let pk_hits: Vec<&RuleHit> = pair_hits
            .iter()
            .copied()
            .filter(|h| h.domain == Domain::PK)
            .collect();
        let pd_hits: Vec<&RuleHit> = pair_hits
            .iter()
            .copied()
            .filter(|h| h.domain == Domain::PD)
            .collect();

        let pk_out = dedupe_hits(&pk_hits, facts, rule_templates);
        let pd_out = dedupe_hits(&pd_hits, facts, rule_templates);

        // A true duplicate shares severity and class with its surviving twin,
        // so the deduplicated union carries the full signal.
        let overall_severity = pk_out
            .iter()
            .chain(pd_out.iter())
            .map(|h| h.severity)
            .max()
            .unwrap_or(Severity::Info);
        let overall_rule_class = pk_out
            .iter()
            .chain(pd_out.iter())
            .map(|h| h.rule_class)
            .max()
            .unwrap_or(RuleClass::Info);

        let pk_summary = pk_summary(&pk_out);

        reports.push(PairReport {
            drug_1,
            drug_2,
            overall_severity,
            overall_rule_class,
            pk_hits: pk_out,
            pd_hits: pd_out,
            pk_summary,
        });
    }

    reports.sort_by(|left, right| {
        right
            .overall_severity
            .cmp(&left.overall_severity)
            .then_with(|| left.drug_1.cmp(&right.drug_1))
            .then_with(|| left.drug_2.cmp(&right.drug_2))
    });
    reports
}

/// Deduplicate by hit identity, preserving first occurrence, then order by
/// descending severity and rule id.
///
/// Directionality is part of identity for PK hits; PD duplicates are already
/// prevented by the engine's symmetric suppression, but the same key shape is
/// applied for uniformity.
fn dedupe_hits(
    hits: &[&RuleHit],
    facts: &Facts,
    rule_templates: &HashMap<String, String>,
) -> Vec<RuleHit> {
    let mut seen: HashSet<HitKey> = HashSet::new();
    let mut out: Vec<RuleHit> = Vec::new();

    for hit in hits {
        if !seen.insert(hit.key()) {
            continue;
        }

        // Defensive placeholder check only; the hit passes through unchanged.
        if let Some(template) = rule_templates.get(&hit.rule_id) {
            let missing = unresolved_placeholders(template, facts, hit);
            if !missing.is_empty() {
                warn!(
                    rule_id = %hit.rule_id,
                    placeholders = ?missing,
                    "explanation template has unresolvable placeholders"
                );
            }
        }

        out.push((*hit).clone());
    }

    out.sort_by(|left, right| {
        right
            .severity
            .cmp(&left.severity)
            .then_with(|| left.rule_id.cmp(&right.rule_id))
    });
    out
}

fn pk_summary(pk_hits: &[RuleHit]) -> Option<PkSummary> {
    let increase = pk_hits.iter().any(|h| h.has_tag(tags::EXPOSURE_INCREASE));
    let decrease = pk_hits.iter().any(|h| h.has_tag(tags::EXPOSURE_DECREASE));

    match (increase, decrease) {
        (true, true) => Some(PkSummary::Mixed),
        (true, false) => Some(PkSummary::ExposureIncrease),
        (false, true) => Some(PkSummary::ExposureDecrease),
        (false, false) => None,
    }
}
