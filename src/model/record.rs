//! Domain types for extracted corporate-debt records
//!
//! Amounts are integer minor currency units (cents) and rates are integer
//! basis points throughout. Extraction and verification must compare in the
//! same units, so floating-point currency never appears in the record.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_name;

/// Legal form of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Corporation,
    Llc,
    Partnership,
    Trust,
    Other,
}

/// How an entity is consolidated in the group accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consolidation {
    Full,
    Proportional,
    EquityMethod,
    Unconsolidated,
    Unknown,
}

/// An ownership stake held by a named parent entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    /// Name of the owning entity, resolved against the record by
    /// normalized-name match
    pub owner: String,
    /// Stake in basis points of equity, 10000 = wholly owned
    pub stake_bps: Option<i64>,
}

/// One legal entity in the corporate structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: EntityType,
    pub jurisdiction: Option<String>,
    /// `None` means the parent is unknown; an empty list means the entity
    /// declares no owner and is the root candidate
    pub owners: Option<Vec<Ownership>>,
    /// Variable interest entity flag
    pub is_vie: bool,
    pub consolidation: Consolidation,
}

impl Entity {
    /// Whether this entity declares no owner (the holdco designation).
    pub fn is_root(&self) -> bool {
        matches!(&self.owners, Some(o) if o.is_empty())
    }

    pub fn has_unknown_parent(&self) -> bool {
        self.owners.is_none()
    }
}

/// Kind of debt instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Notes,
    Bond,
    TermLoan,
    RevolvingCredit,
    Debenture,
    CommercialPaper,
    FinanceLease,
    Other,
}

/// Ranking of the instrument in the capital structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    SeniorSecured,
    Senior,
    SeniorSubordinated,
    Subordinated,
    Junior,
    Unknown,
}

/// Collateral status of the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    Secured,
    Unsecured,
    Unknown,
}

/// One debt instrument attributed to an issuing entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtInstrument {
    /// Instrument title as disclosed, e.g. "6.625% Senior Notes due 2025"
    pub name: String,
    pub instrument_type: InstrumentType,
    /// Issuing entity name, must resolve to an entity in the same record
    pub issuer: String,
    /// Guarantor entity names, each must resolve to an entity in the record
    pub guarantors: Vec<String>,
    /// Current outstanding amount in minor currency units
    pub outstanding_minor: i64,
    /// ISO 4217 code, e.g. "USD"
    pub currency: String,
    /// Stated coupon or margin in basis points
    pub rate_bps: Option<i64>,
    pub maturity: Option<NaiveDate>,
    pub seniority: Seniority,
    pub security: SecurityType,
}

/// Read-only reference data about the company under extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    /// Complex structures burn the cheap tier's budget without converging;
    /// flagged companies start directly at the escalated tier
    #[serde(default)]
    pub known_complex: bool,
}

impl CompanyProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            known_complex: false,
        }
    }
}

/// The candidate structured output for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub company: String,
    pub entities: Vec<Entity>,
    pub instruments: Vec<DebtInstrument>,
}

impl ExtractionRecord {
    /// Normalized names of every entity in the record.
    pub fn entity_names_normalized(&self) -> HashSet<String> {
        self.entities
            .iter()
            .map(|e| normalize_name(&e.name))
            .collect()
    }

    /// Look up an entity by name, normalized on both sides.
    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        let wanted = normalize_name(name);
        self.entities
            .iter()
            .find(|e| normalize_name(&e.name) == wanted)
    }

    /// Entities declaring no owner.
    pub fn root_entities(&self) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.is_root()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, owners: Option<Vec<Ownership>>) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: EntityType::Corporation,
            jurisdiction: None,
            owners,
            is_vie: false,
            consolidation: Consolidation::Full,
        }
    }

    #[test]
    fn test_root_vs_unknown_parent() {
        let root = entity("Holdco Inc.", Some(vec![]));
        let unknown = entity("Orphan LLC", None);
        assert!(root.is_root());
        assert!(!root.has_unknown_parent());
        assert!(!unknown.is_root());
        assert!(unknown.has_unknown_parent());
    }

    #[test]
    fn test_find_entity_normalizes() {
        let record = ExtractionRecord {
            company: "Acme".to_string(),
            entities: vec![entity("Acme Holdings, Inc.", Some(vec![]))],
            instruments: vec![],
        };
        assert!(record.find_entity("ACME HOLDINGS INC").is_some());
        assert!(record.find_entity("Acme Finance").is_none());
    }
}
