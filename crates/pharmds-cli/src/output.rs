//! Plain-text and JSON rendering of pair reports.

use std::collections::HashMap;

use serde_json::{json, Value};

use pharmds_core::models::{Facts, PairReport, RuleHit};
use pharmds_core::reasoning::{drug_name, render_explanation, render_rationale};

pub const SCHEMA_VERSION: &str = "1.0";

const RULE_SEPARATOR: &str =
    "================================================================================";

/// Render reports in the plain terminal layout.
pub fn render_plain(
    facts: &Facts,
    reports: &[PairReport],
    templates: &HashMap<String, String>,
) -> String {
    let mut out = String::new();

    out.push_str("\nEDUCATIONAL ONLY - NOT DIAGNOSTIC\n\n");

    for report in reports {
        let name_1 = drug_name(facts, &report.drug_1);
        let name_2 = drug_name(facts, &report.drug_2);

        out.push_str(RULE_SEPARATOR);
        out.push('\n');
        out.push_str(&format!("{name_1} + {name_2}\n"));
        out.push_str(&format!(
            "Overall: severity={} | class={}\n\n",
            report.overall_severity.as_str(),
            report.overall_rule_class.as_str()
        ));

        if !report.pk_hits.is_empty() {
            out.push_str("PK section (directional):\n");
            if let Some(summary) = report.pk_summary {
                out.push_str(&format!("PK summary: {}\n", summary.as_str()));
            }
            for hit in &report.pk_hits {
                render_hit(&mut out, facts, hit, templates, true);
            }
        }

        if !report.pd_hits.is_empty() {
            out.push_str("PD section (shared domain):\n");
            for hit in &report.pd_hits {
                render_hit(&mut out, facts, hit, templates, false);
            }
        }

        let mut refs: Vec<(String, String, String)> = report
            .pk_hits
            .iter()
            .chain(report.pd_hits.iter())
            .flat_map(|h| h.references.iter())
            .map(|r| {
                (
                    r.source.clone(),
                    r.citation.clone(),
                    r.url.clone().unwrap_or_default(),
                )
            })
            .collect();
        refs.sort();
        refs.dedup();
        if !refs.is_empty() {
            out.push_str("References (rule-level):\n");
            for (source, citation, url) in refs {
                if url.is_empty() {
                    out.push_str(&format!("- {source}: {citation}\n"));
                } else {
                    out.push_str(&format!("- {source}: {citation} ({url})\n"));
                }
            }
        }
        out.push('\n');
    }

    out.push_str(RULE_SEPARATOR);
    out.push('\n');
    out.push_str(
        "Footer: This output is an educational mechanistic explanation. \
         Verify with primary sources.\n",
    );

    out
}

fn render_hit(
    out: &mut String,
    facts: &Facts,
    hit: &RuleHit,
    templates: &HashMap<String, String>,
    directional: bool,
) {
    out.push_str(&format!(
        "- [{} | {}] {}\n",
        hit.severity.as_str(),
        hit.rule_class.as_str(),
        hit.name
    ));
    if directional {
        out.push_str(&format!(
            "  Affected: {} | Interacting: {}\n",
            drug_name(facts, &hit.inputs.a),
            drug_name(facts, &hit.inputs.b)
        ));
    }
    if let Some(template) = templates.get(&hit.rule_id) {
        if !template.is_empty() {
            out.push_str(&format!(
                "  Explanation: {}\n",
                render_explanation(template, facts, hit)
            ));
        }
    }
    let rationale = render_rationale(facts, hit);
    if !rationale.is_empty() {
        out.push_str("  Rationale:\n");
        for line in rationale {
            out.push_str(&format!("   - {line}\n"));
        }
    }
    if !hit.actions.is_empty() {
        out.push_str("  Suggested actions:\n");
        for action in &hit.actions {
            out.push_str(&format!("   - {action}\n"));
        }
    }
    out.push('\n');
}

/// Build the JSON payload. Pair and hit order is already deterministic from
/// aggregation; list-valued fields are sorted here as well.
pub fn build_json_payload(
    facts: &Facts,
    reports: &[PairReport],
    templates: &HashMap<String, String>,
    selected_domains: &[String],
    input_drug_names: &[String],
    patient_flags: &HashMap<String, bool>,
) -> Value {
    let pairs: Vec<Value> = reports
        .iter()
        .map(|report| {
            json!({
                "drug_1": {"id": report.drug_1, "name": drug_name(facts, &report.drug_1)},
                "drug_2": {"id": report.drug_2, "name": drug_name(facts, &report.drug_2)},
                "overall": {
                    "severity": report.overall_severity.as_str(),
                    "class": report.overall_rule_class.as_str(),
                },
                "pk": {
                    "summary": report.pk_summary.map(|s| s.as_str()),
                    "hits": report.pk_hits.iter()
                        .map(|h| hit_to_json(facts, h, templates))
                        .collect::<Vec<_>>(),
                },
                "pd": {
                    "hits": report.pd_hits.iter()
                        .map(|h| hit_to_json(facts, h, templates))
                        .collect::<Vec<_>>(),
                },
            })
        })
        .collect();

    let mut flags: Vec<(&String, &bool)> = patient_flags.iter().collect();
    flags.sort();
    let flags_obj: serde_json::Map<String, Value> = flags
        .into_iter()
        .map(|(k, v)| (k.clone(), Value::Bool(*v)))
        .collect();

    json!({
        "schema_version": SCHEMA_VERSION,
        "input": {
            "drug_names": input_drug_names,
            "selected_domains": selected_domains,
            "patient_flags": flags_obj,
        },
        "pairs": pairs,
    })
}

fn hit_to_json(facts: &Facts, hit: &RuleHit, templates: &HashMap<String, String>) -> Value {
    let explanation = templates
        .get(&hit.rule_id)
        .map(|template| render_explanation(template, facts, hit))
        .unwrap_or_default();

    let mut tags = hit.tags.clone();
    tags.sort();
    let mut actions = hit.actions.clone();
    actions.sort();

    let mut references = hit.references.clone();
    references.sort_by(|left, right| {
        (&left.source, &left.citation, &left.url).cmp(&(&right.source, &right.citation, &right.url))
    });

    json!({
        "rule_id": hit.rule_id,
        "name": hit.name,
        "domain": hit.domain.as_str(),
        "severity": hit.severity.as_str(),
        "class": hit.rule_class.as_str(),
        "inputs": hit.inputs,
        "tags": tags,
        "explanation": explanation,
        "rationale": render_rationale(facts, hit),
        "actions": actions,
        "references": references,
        "A": {"id": hit.inputs.a, "name": drug_name(facts, &hit.inputs.a)},
        "B": {"id": hit.inputs.b, "name": drug_name(facts, &hit.inputs.b)},
    })
}
