//! LLM-extractable record structure
//!
//! Mirror of the domain record with the leniency the model round-trip needs:
//! string dates, defaulted collections, catch-all enum variants and numeric
//! fields that tolerate floats or numeric strings with integral values.
//! `service::extraction::convert` turns these into domain types.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// LLM-extractable corporate-debt record
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedRecord {
    /// Company the record describes
    #[serde(default)]
    pub company: Option<String>,
    /// All legal entities, the first entity with an empty owners list is the
    /// designated root
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    /// Individual debt instruments, never aggregated totals
    #[serde(default)]
    pub instruments: Vec<ExtractedInstrument>,
}

/// A single extracted entity
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(default)]
    pub entity_type: Option<ExtractedEntityType>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    /// Omit or null when the parent is unknown; empty list when the entity
    /// has no owner (the root)
    #[serde(default, alias = "parents")]
    pub owners: Option<Vec<ExtractedOwnership>>,
    #[serde(default)]
    pub is_vie: bool,
    #[serde(default)]
    pub consolidation: Option<ExtractedConsolidation>,
}

/// One ownership stake
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedOwnership {
    /// Exact name of the owning entity as listed in `entities`
    #[serde(alias = "name")]
    pub owner: String,
    /// Basis points of equity held, 10000 = wholly owned
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    #[schemars(with = "Option<i64>")]
    pub stake_bps: Option<i64>,
}

/// A single extracted debt instrument
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedInstrument {
    /// Instrument title as disclosed, e.g. "6.625% Senior Notes due 2025"
    pub name: String,
    #[serde(default)]
    pub instrument_type: Option<ExtractedInstrumentType>,
    /// Exact name of the issuing entity as listed in `entities`
    #[serde(default)]
    pub issuer: Option<String>,
    /// Exact names of guarantor entities as listed in `entities`
    #[serde(default)]
    pub guarantors: Vec<String>,
    /// Current outstanding amount in minor currency units (cents), an
    /// integer, never the original issuance amount
    #[serde(
        default,
        alias = "amount_minor",
        alias = "outstanding_amount_minor",
        deserialize_with = "lenient_i64"
    )]
    #[schemars(with = "i64")]
    pub outstanding_minor: i64,
    /// ISO 4217 currency code
    #[serde(default)]
    pub currency: Option<String>,
    /// Stated rate in basis points, an integer
    #[serde(
        default,
        alias = "rate_basis_points",
        deserialize_with = "lenient_opt_i64"
    )]
    #[schemars(with = "Option<i64>")]
    pub rate_bps: Option<i64>,
    /// Maturity date, ISO format YYYY-MM-DD
    #[serde(default, alias = "maturity_date")]
    pub maturity: Option<String>,
    #[serde(default)]
    pub seniority: Option<ExtractedSeniority>,
    #[serde(default)]
    pub security: Option<ExtractedSecurityType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedEntityType {
    Corporation,
    Llc,
    Partnership,
    Trust,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedConsolidation {
    Full,
    Proportional,
    EquityMethod,
    Unconsolidated,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedInstrumentType {
    Notes,
    Bond,
    TermLoan,
    RevolvingCredit,
    Debenture,
    CommercialPaper,
    FinanceLease,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedSeniority {
    SeniorSecured,
    Senior,
    SeniorSubordinated,
    Subordinated,
    Junior,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedSecurityType {
    Secured,
    Unsecured,
    #[serde(other)]
    Unknown,
}

/// Accept integers, integral floats, or numeric strings. Cheap-tier models
/// drift between `5200000000` and `5.2e9` for the same amount.
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e18)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| !matches!(c, ',' | '_' | ' ')).collect();
            cleaned.parse::<i64>().ok().or_else(|| {
                cleaned
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e18)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(0);
    }
    coerce_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected integer amount, got {value}")))
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    coerce_i64(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("expected integer value, got {value}")))
}
