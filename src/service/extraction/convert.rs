//! Conversion from LLM-extractable mirror types to domain types
//!
//! The mirrors tolerate what models actually produce (string dates, missing
//! enums, null collections); everything downstream gets the strict domain
//! shapes. Unresolvable values degrade to the Unknown/Other variants rather
//! than failing the conversion, so a sloppy but salvageable reply still
//! becomes a candidate record for verification to judge.

use chrono::NaiveDate;

use crate::model::{
    Consolidation, DebtInstrument, Entity, EntityType, ExtractedConsolidation, ExtractedEntity,
    ExtractedEntityType, ExtractedInstrument, ExtractedInstrumentType, ExtractedOwnership,
    ExtractedRecord, ExtractedSecurityType, ExtractedSeniority, ExtractionRecord, InstrumentType,
    Ownership, SecurityType, Seniority,
};

impl From<ExtractedEntityType> for EntityType {
    fn from(value: ExtractedEntityType) -> Self {
        match value {
            ExtractedEntityType::Corporation => EntityType::Corporation,
            ExtractedEntityType::Llc => EntityType::Llc,
            ExtractedEntityType::Partnership => EntityType::Partnership,
            ExtractedEntityType::Trust => EntityType::Trust,
            ExtractedEntityType::Other => EntityType::Other,
        }
    }
}

impl From<ExtractedConsolidation> for Consolidation {
    fn from(value: ExtractedConsolidation) -> Self {
        match value {
            ExtractedConsolidation::Full => Consolidation::Full,
            ExtractedConsolidation::Proportional => Consolidation::Proportional,
            ExtractedConsolidation::EquityMethod => Consolidation::EquityMethod,
            ExtractedConsolidation::Unconsolidated => Consolidation::Unconsolidated,
            ExtractedConsolidation::Unknown => Consolidation::Unknown,
        }
    }
}

impl From<ExtractedInstrumentType> for InstrumentType {
    fn from(value: ExtractedInstrumentType) -> Self {
        match value {
            ExtractedInstrumentType::Notes => InstrumentType::Notes,
            ExtractedInstrumentType::Bond => InstrumentType::Bond,
            ExtractedInstrumentType::TermLoan => InstrumentType::TermLoan,
            ExtractedInstrumentType::RevolvingCredit => InstrumentType::RevolvingCredit,
            ExtractedInstrumentType::Debenture => InstrumentType::Debenture,
            ExtractedInstrumentType::CommercialPaper => InstrumentType::CommercialPaper,
            ExtractedInstrumentType::FinanceLease => InstrumentType::FinanceLease,
            ExtractedInstrumentType::Other => InstrumentType::Other,
        }
    }
}

impl From<ExtractedSeniority> for Seniority {
    fn from(value: ExtractedSeniority) -> Self {
        match value {
            ExtractedSeniority::SeniorSecured => Seniority::SeniorSecured,
            ExtractedSeniority::Senior => Seniority::Senior,
            ExtractedSeniority::SeniorSubordinated => Seniority::SeniorSubordinated,
            ExtractedSeniority::Subordinated => Seniority::Subordinated,
            ExtractedSeniority::Junior => Seniority::Junior,
            ExtractedSeniority::Unknown => Seniority::Unknown,
        }
    }
}

impl From<ExtractedSecurityType> for SecurityType {
    fn from(value: ExtractedSecurityType) -> Self {
        match value {
            ExtractedSecurityType::Secured => SecurityType::Secured,
            ExtractedSecurityType::Unsecured => SecurityType::Unsecured,
            ExtractedSecurityType::Unknown => SecurityType::Unknown,
        }
    }
}

impl From<ExtractedOwnership> for Ownership {
    fn from(value: ExtractedOwnership) -> Self {
        Ownership {
            owner: value.owner,
            stake_bps: value.stake_bps,
        }
    }
}

impl From<ExtractedEntity> for Entity {
    fn from(value: ExtractedEntity) -> Self {
        Entity {
            name: value.name,
            entity_type: value.entity_type.map_or(EntityType::Other, Into::into),
            jurisdiction: value.jurisdiction,
            owners: value
                .owners
                .map(|owners| owners.into_iter().map(Into::into).collect()),
            is_vie: value.is_vie,
            consolidation: value.consolidation.map_or(Consolidation::Unknown, Into::into),
        }
    }
}

impl From<ExtractedInstrument> for DebtInstrument {
    fn from(value: ExtractedInstrument) -> Self {
        let maturity = value.maturity.as_deref().and_then(parse_maturity);
        DebtInstrument {
            name: value.name,
            instrument_type: value.instrument_type.map_or(InstrumentType::Other, Into::into),
            issuer: value.issuer.unwrap_or_default(),
            guarantors: value.guarantors,
            outstanding_minor: value.outstanding_minor,
            currency: value.currency.unwrap_or_else(|| "USD".to_string()),
            rate_bps: value.rate_bps,
            maturity,
            seniority: value.seniority.map_or(Seniority::Unknown, Into::into),
            security: value.security.map_or(SecurityType::Unknown, Into::into),
        }
    }
}

/// Build the domain record from an extracted reply.
///
/// `fallback_company` fills in when the model omitted the company field.
pub fn to_domain_record(extracted: ExtractedRecord, fallback_company: &str) -> ExtractionRecord {
    ExtractionRecord {
        company: extracted
            .company
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| fallback_company.to_string()),
        entities: extracted.entities.into_iter().map(Into::into).collect(),
        instruments: extracted.instruments.into_iter().map(Into::into).collect(),
    }
}

/// Parse the formats models actually emit for maturity dates.
fn parse_maturity(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    // Year-only maturities ("due 2028") are common in instrument tables
    if let Ok(year) = raw.parse::<i32>()
        && (1900..3000).contains(&year)
    {
        return NaiveDate::from_ymd_opt(year, 12, 31);
    }
    tracing::debug!(raw = %raw, "Unparseable maturity date dropped");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maturity_formats() {
        assert_eq!(
            parse_maturity("2028-06-15"),
            NaiveDate::from_ymd_opt(2028, 6, 15)
        );
        assert_eq!(
            parse_maturity("06/15/2028"),
            NaiveDate::from_ymd_opt(2028, 6, 15)
        );
        assert_eq!(
            parse_maturity("June 15, 2028"),
            NaiveDate::from_ymd_opt(2028, 6, 15)
        );
        assert_eq!(parse_maturity("2028"), NaiveDate::from_ymd_opt(2028, 12, 31));
        assert_eq!(parse_maturity("next year"), None);
    }

    #[test]
    fn test_missing_fields_degrade_not_fail() {
        let extracted: ExtractedRecord = serde_json::from_str(
            r#"{
                "entities": [{"name": "Acme Finance LLC"}],
                "instruments": [{"name": "Term Loan B", "outstanding_minor": 120000000000}]
            }"#,
        )
        .unwrap();
        let record = to_domain_record(extracted, "Acme Corp");

        assert_eq!(record.company, "Acme Corp");
        let entity = &record.entities[0];
        assert_eq!(entity.entity_type, EntityType::Other);
        assert_eq!(entity.consolidation, Consolidation::Unknown);
        assert!(entity.has_unknown_parent());

        let instrument = &record.instruments[0];
        assert_eq!(instrument.currency, "USD");
        assert_eq!(instrument.seniority, Seniority::Unknown);
        assert!(instrument.issuer.is_empty());
    }

    #[test]
    fn test_owner_stakes_carried_over() {
        let extracted: ExtractedRecord = serde_json::from_str(
            r#"{
                "company": "Acme Corp",
                "entities": [
                    {"name": "Acme Corp", "owners": []},
                    {"name": "Acme JV", "owners": [{"owner": "Acme Corp", "stake_bps": 5000}]}
                ]
            }"#,
        )
        .unwrap();
        let record = to_domain_record(extracted, "Acme Corp");
        assert!(record.entities[0].is_root());
        let owners = record.entities[1].owners.as_ref().unwrap();
        assert_eq!(owners[0].stake_bps, Some(5000));
    }
}
