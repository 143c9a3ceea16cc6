//! Drug-name resolution errors and did-you-mean suggestions.

use std::collections::HashMap;
use std::fmt;

use strsim::{jaro_winkler, normalized_levenshtein};
use thiserror::Error;

use crate::db::DbError;

/// Minimum similarity for a term to be suggested.
const SUGGESTION_CUTOFF: f64 = 0.6;

/// Default number of suggestions per unknown token.
pub const SUGGESTION_LIMIT: usize = 5;

/// One or more drug tokens could not be resolved.
#[derive(Debug)]
pub struct UnknownDrugError {
    /// The raw tokens the user provided that were not resolved.
    pub unknown: Vec<String>,
    /// Unknown token → suggested known names/aliases.
    pub suggestions: HashMap<String, Vec<String>>,
}

impl fmt::Display for UnknownDrugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unknown.as_slice() {
            [] => write!(f, "Unknown drug"),
            [token] => {
                write!(f, "Drug not found: {token}")?;
                if let Some(options) = self.suggestions.get(token) {
                    if !options.is_empty() {
                        write!(f, ". Did you mean: {}?", options.join(", "))?;
                    }
                }
                Ok(())
            }
            many => write!(f, "Drugs not found: {}", many.join(", ")),
        }
    }
}

impl std::error::Error for UnknownDrugError {}

/// Resolution errors.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Unknown(#[from] UnknownDrugError),
}

/// Fuzzy similarity blending Jaro-Winkler (good for typos and prefixes) with
/// normalized Levenshtein (good for overall shape).
pub fn fuzzy_match(a: &str, b: &str) -> f64 {
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);
    jw * 0.6 + lev * 0.4
}

/// Suggest close matches for an unresolved token from the known drug terms.
/// Results are ordered by descending similarity.
pub fn suggest_drug_terms(token: &str, known_terms: &[String], limit: usize) -> Vec<String> {
    let query = token.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &String)> = known_terms
        .iter()
        .map(|term| (fuzzy_match(&query, term), term))
        .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
        .collect();

    scored.sort_by(|(left, lterm), (right, rterm)| {
        right
            .partial_cmp(left)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| lterm.cmp(rterm))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, term)| term.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_match() {
        assert!(fuzzy_match("warfarin", "warfarin") > 0.99);
        assert!(fuzzy_match("warfarin", "warfrin") > 0.85); // typo
        assert!(fuzzy_match("warfarin", "ondansetron") < 0.6); // different drug
    }

    #[test]
    fn test_suggestions_ranked_by_similarity() {
        let known = vec![
            "warfarin".to_string(),
            "fluconazole".to_string(),
            "verapamil".to_string(),
        ];

        let suggestions = suggest_drug_terms("warfrin", &known, 5);
        assert_eq!(suggestions.first().map(String::as_str), Some("warfarin"));
    }

    #[test]
    fn test_no_suggestions_below_cutoff() {
        let known = vec!["ondansetron".to_string()];
        assert!(suggest_drug_terms("xyzzy", &known, 5).is_empty());
        assert!(suggest_drug_terms("", &known, 5).is_empty());
    }

    #[test]
    fn test_unknown_drug_error_messages() {
        let single = UnknownDrugError {
            unknown: vec!["warfrin".into()],
            suggestions: HashMap::from([(
                "warfrin".to_string(),
                vec!["warfarin".to_string()],
            )]),
        };
        assert_eq!(
            single.to_string(),
            "Drug not found: warfrin. Did you mean: warfarin?"
        );

        let multiple = UnknownDrugError {
            unknown: vec!["foo".into(), "bar".into()],
            suggestions: HashMap::new(),
        };
        assert_eq!(multiple.to_string(), "Drugs not found: foo, bar");
    }
}
