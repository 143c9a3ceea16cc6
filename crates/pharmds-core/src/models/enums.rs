//! Closed vocabularies shared across the rule engine and data layer.
//!
//! Ordered enums derive their ranking from declaration order, so severity and
//! rule-class comparisons never go through a lookup table.

use serde::{Deserialize, Serialize};

/// Therapeutic index: margin between effective and toxic exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TherapeuticIndex {
    Wide,
    Moderate,
    Narrow,
}

impl TherapeuticIndex {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wide" => Some(Self::Wide),
            "moderate" => Some(Self::Moderate),
            "narrow" => Some(Self::Narrow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wide => "wide",
            Self::Moderate => "moderate",
            Self::Narrow => "narrow",
        }
    }
}

/// Strength of an inhibitor/inducer relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
}

impl Strength {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weak" => Some(Self::Weak),
            "moderate" => Some(Self::Moderate),
            "strong" => Some(Self::Strong),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

/// A drug's relationship to an enzyme or transporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Substrate,
    Inhibitor,
    Inducer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "substrate" => Some(Self::Substrate),
            "inhibitor" => Some(Self::Inhibitor),
            "inducer" => Some(Self::Inducer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substrate => "substrate",
            Self::Inhibitor => "inhibitor",
            Self::Inducer => "inducer",
        }
    }
}

/// Finding severity, lowest risk first. Declaration order is the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Caution,
    Major,
    Contraindicated,
}

impl Severity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "caution" => Some(Self::Caution),
            "major" => Some(Self::Major),
            "contraindicated" => Some(Self::Contraindicated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Caution => "caution",
            Self::Major => "major",
            Self::Contraindicated => "contraindicated",
        }
    }
}

/// Interaction domain: pharmacokinetic (exposure) or pharmacodynamic (effect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    PK,
    PD,
}

impl Domain {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PK" => Some(Self::PK),
            "PD" => Some(Self::PD),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PK => "PK",
            Self::PD => "PD",
        }
    }
}

/// Suggested handling class, least restrictive first. Declaration order is the
/// ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleClass {
    Info,
    Caution,
    AdjustMonitor,
    Avoid,
}

impl RuleClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "caution" => Some(Self::Caution),
            "adjust_monitor" => Some(Self::AdjustMonitor),
            "avoid" => Some(Self::Avoid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Caution => "caution",
            Self::AdjustMonitor => "adjust_monitor",
            Self::Avoid => "avoid",
        }
    }
}

/// Magnitude of a pharmacodynamic effect. Declaration order is the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Magnitude {
    Low,
    Medium,
    High,
}

impl Magnitude {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Direction of a pharmacodynamic effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectDirection {
    Increase,
    Decrease,
}

impl EffectDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Caution);
        assert!(Severity::Caution < Severity::Major);
        assert!(Severity::Major < Severity::Contraindicated);
    }

    #[test]
    fn test_rule_class_ordering() {
        assert!(RuleClass::Info < RuleClass::Caution);
        assert!(RuleClass::Caution < RuleClass::AdjustMonitor);
        assert!(RuleClass::AdjustMonitor < RuleClass::Avoid);
    }

    #[test]
    fn test_magnitude_ordering() {
        assert!(Magnitude::Low < Magnitude::Medium);
        assert!(Magnitude::Medium < Magnitude::High);
    }

    #[test]
    fn test_parse_round_trip() {
        for sev in ["info", "caution", "major", "contraindicated"] {
            assert_eq!(Severity::parse(sev).unwrap().as_str(), sev);
        }
        for class in ["info", "caution", "adjust_monitor", "avoid"] {
            assert_eq!(RuleClass::parse(class).unwrap().as_str(), class);
        }
        assert_eq!(Domain::parse("PK").unwrap().as_str(), "PK");
        assert!(Domain::parse("pk").is_none());
    }

    #[test]
    fn test_legacy_severity_aliases_rejected() {
        // "minor"/"moderate" severities existed in older rank maps; they are
        // not valid input here.
        assert!(Severity::parse("minor").is_none());
        assert!(Severity::parse("moderate").is_none());
    }
}
