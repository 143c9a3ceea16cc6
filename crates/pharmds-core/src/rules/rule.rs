//! Typed rule representation.
//!
//! A rule's logic is a tagged union over exactly three predicate kinds, so
//! pattern matches over it are checked for exhaustiveness at compile time.
//! Guards (therapeutic index, patient flags) live on the rule record itself.

use crate::models::{Domain, Magnitude, Reference, Role, RuleClass, Severity, Strength, TherapeuticIndex};

/// A declarative interaction rule. Pure predicate — no internal state.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub domain: Domain,
    pub severity: Severity,
    pub rule_class: RuleClass,
    pub logic: RuleLogic,
    /// Guard: drug A's therapeutic index must equal this value.
    pub a_ti: Option<TherapeuticIndex>,
    /// Guard: this boolean patient flag must be set.
    pub requires_patient_flag: Option<String>,
    /// Rationale template lines, unsubstituted.
    pub rationale: Vec<String>,
    pub explanation_template: String,
    pub actions: Vec<String>,
    pub references: Vec<Reference>,
    pub tags: Vec<String>,
}

/// The single predicate a rule matches on.
#[derive(Debug, Clone)]
pub enum RuleLogic {
    Enzyme(EnzymePattern),
    Transporter(TransporterPattern),
    PdOverlap(PdOverlapPattern),
}

/// Drug A holds `a_role` for the enzyme, drug B holds `b_role`, optionally at
/// a constrained strength.
#[derive(Debug, Clone)]
pub struct EnzymePattern {
    pub enzyme_id: String,
    pub a_role: Role,
    pub b_role: Role,
    pub b_strength: Option<Strength>,
    /// Allowed B strengths; empty means unrestricted (unless `b_strength` is
    /// set).
    pub b_strength_in: Vec<Strength>,
}

/// Same shape as the enzyme pattern, with the transporter named either
/// directly or by family.
#[derive(Debug, Clone)]
pub struct TransporterPattern {
    pub selector: TransporterSelector,
    pub a_role: Role,
    pub b_role: Role,
    pub b_strength: Option<Strength>,
    pub b_strength_in: Vec<Strength>,
}

#[derive(Debug, Clone)]
pub enum TransporterSelector {
    Id(String),
    Family(String),
}

/// Both drugs carry the effect at or above the threshold magnitude.
#[derive(Debug, Clone)]
pub struct PdOverlapPattern {
    pub effect_id: String,
    pub min_magnitude: Option<Magnitude>,
}

/// Coarse mechanism classification, used for rule filtering and composite
/// grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mechanism {
    Cyp,
    Ugt,
    /// Non-CYP/UGT enzyme family.
    Enzyme,
    Pgp,
    Bcrp,
    Oatp,
    /// Transporter outside the known families.
    Transporter,
    Pd,
    /// Fallback label, e.g. a lowercased transporter id.
    Other(String),
}

impl Mechanism {
    /// Lowercase filter label, e.g. "cyp", "pgp", "pd".
    pub fn label(&self) -> &str {
        match self {
            Self::Cyp => "cyp",
            Self::Ugt => "ugt",
            Self::Enzyme => "enzyme",
            Self::Pgp => "pgp",
            Self::Bcrp => "bcrp",
            Self::Oatp => "oatp",
            Self::Transporter => "transporter",
            Self::Pd => "pd",
            Self::Other(label) => label,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cyp" => Some(Self::Cyp),
            "ugt" => Some(Self::Ugt),
            "enzyme" => Some(Self::Enzyme),
            "pgp" => Some(Self::Pgp),
            "bcrp" => Some(Self::Bcrp),
            "oatp" => Some(Self::Oatp),
            "transporter" => Some(Self::Transporter),
            "pd" => Some(Self::Pd),
            _ => None,
        }
    }
}
