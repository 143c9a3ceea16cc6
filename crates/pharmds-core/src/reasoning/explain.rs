//! Explanation and rationale templating.
//!
//! Templates use `{placeholder}` markers from a fixed set (`A_name`,
//! `B_name`, `enzyme_id`, `transporter_id`, `effect_id`). Substitution is
//! plain string replacement; unknown markers are left in place so a bad
//! template degrades visibly rather than silently.

use crate::models::{Facts, RuleHit};

/// Display name for a drug id; falls back to the id for unknown drugs.
pub fn drug_name<'a>(facts: &'a Facts, drug_id: &'a str) -> &'a str {
    facts
        .drugs
        .get(drug_id)
        .map(|d| d.generic_name.as_str())
        .unwrap_or(drug_id)
}

/// Render an explanation template against a hit's resolved inputs.
pub fn render_explanation(template: &str, facts: &Facts, hit: &RuleHit) -> String {
    let mut text = template.to_string();
    for (key, value) in placeholder_values(facts, hit) {
        text = text.replace(&format!("{{{key}}}"), &value);
    }
    text
}

/// Render a hit's rationale lines with the same substitution as explanation
/// templates.
pub fn render_rationale(facts: &Facts, hit: &RuleHit) -> Vec<String> {
    hit.rationale
        .iter()
        .map(|line| render_explanation(line, facts, hit))
        .collect()
}

/// Placeholders in `text` that cannot be resolved from the hit's inputs.
pub fn unresolved_placeholders(text: &str, facts: &Facts, hit: &RuleHit) -> Vec<String> {
    let known: Vec<String> = placeholder_values(facts, hit)
        .into_iter()
        .map(|(k, _)| k.to_string())
        .collect();
    find_placeholders(text)
        .into_iter()
        .filter(|p| !known.contains(p))
        .collect()
}

fn placeholder_values(facts: &Facts, hit: &RuleHit) -> Vec<(&'static str, String)> {
    let mut out = vec![
        ("A_name", drug_name(facts, &hit.inputs.a).to_string()),
        ("B_name", drug_name(facts, &hit.inputs.b).to_string()),
    ];
    if let Some(enzyme_id) = &hit.inputs.enzyme_id {
        out.push(("enzyme_id", enzyme_id.clone()));
    }
    if let Some(transporter_id) = &hit.inputs.transporter_id {
        out.push(("transporter_id", transporter_id.clone()));
    }
    if let Some(effect_id) = &hit.inputs.effect_id {
        out.push(("effect_id", effect_id.clone()));
    }
    out
}

/// Extract `{placeholder}` names from a template string.
pub(crate) fn find_placeholders(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = text[i + 1..].find('}') {
                let name = &text[i + 1..i + 1 + end];
                if !name.is_empty()
                    && name.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'_')
                {
                    out.push(name.to_string());
                }
                i += end + 2;
                continue;
            }
        }
        i += 1;
    }
    out
}
