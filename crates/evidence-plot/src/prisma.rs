//! PRISMA flow diagram counts

use evidence_core::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record counts at each step of study selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrismaCounts {
    pub records_identified: usize,
    #[serde(default)]
    pub records_from_other_sources: usize,
    pub duplicates_removed: usize,
    pub records_screened: usize,
    pub records_excluded: usize,
    pub full_text_assessed: usize,
    pub full_text_excluded: usize,
    /// Reasons for full-text exclusion; must sum to `full_text_excluded` when given
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exclusion_reasons: BTreeMap<String, usize>,
    pub studies_included: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studies_in_meta_analysis: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrismaPhase {
    Identification,
    Screening,
    Eligibility,
    Included,
}

/// A main-column box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrismaStage {
    pub id: String,
    pub phase: PrismaPhase,
    pub label: String,
    pub count: usize,
}

/// A side box for records leaving the flow after a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrismaExclusion {
    pub after_stage: String,
    pub label: String,
    pub count: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reasons: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrismaFlowData {
    pub stages: Vec<PrismaStage>,
    pub exclusions: Vec<PrismaExclusion>,
}

fn mismatch(field: &str, expected: usize, actual: usize) -> Error {
    Error::InvalidInput {
        context: ErrorContext::field(field),
        message: format!("expected {expected} from the previous stage, got {actual}"),
    }
}

/// Validate the flow arithmetic and lay out the diagram
pub fn prisma_flow(counts: &PrismaCounts) -> Result<PrismaFlowData> {
    let identified = counts
        .records_identified
        .checked_add(counts.records_from_other_sources)
        .ok_or_else(|| Error::InvalidInput {
            context: ErrorContext::field("records_from_other_sources"),
            message: "identified record count overflows".to_string(),
        })?;
    let after_duplicates = identified.checked_sub(counts.duplicates_removed).ok_or_else(|| {
        let removed = counts.duplicates_removed;
        Error::InvalidInput {
            context: ErrorContext::field("duplicates_removed"),
            message: format!("{removed} duplicates exceed {identified} records"),
        }
    })?;
    if counts.records_screened != after_duplicates {
        return Err(mismatch("records_screened", after_duplicates, counts.records_screened));
    }
    let sought = counts
        .records_screened
        .checked_sub(counts.records_excluded)
        .ok_or_else(|| {
            mismatch("records_excluded", counts.records_screened, counts.records_excluded)
        })?;
    if counts.full_text_assessed != sought {
        return Err(mismatch("full_text_assessed", sought, counts.full_text_assessed));
    }
    let eligible = counts
        .full_text_assessed
        .checked_sub(counts.full_text_excluded)
        .ok_or_else(|| {
            mismatch("full_text_excluded", counts.full_text_assessed, counts.full_text_excluded)
        })?;
    if counts.studies_included != eligible {
        return Err(mismatch("studies_included", eligible, counts.studies_included));
    }
    let reasons_total: usize = counts.exclusion_reasons.values().sum();
    if !counts.exclusion_reasons.is_empty() && reasons_total != counts.full_text_excluded {
        return Err(mismatch("exclusion_reasons", counts.full_text_excluded, reasons_total));
    }
    if let Some(meta) = counts.studies_in_meta_analysis {
        if meta > counts.studies_included {
            return Err(Error::InvalidInput {
                context: ErrorContext::field("studies_in_meta_analysis"),
                message: format!("{meta} exceeds {} included studies", counts.studies_included),
            });
        }
    }

    let mut stages = vec![
        PrismaStage {
            id: "identified".to_string(),
            phase: PrismaPhase::Identification,
            label: format!(
                "Records identified (databases: {}, other sources: {})",
                counts.records_identified, counts.records_from_other_sources
            ),
            count: identified,
        },
        PrismaStage {
            id: "screened".to_string(),
            phase: PrismaPhase::Screening,
            label: "Records screened".to_string(),
            count: counts.records_screened,
        },
        PrismaStage {
            id: "full_text".to_string(),
            phase: PrismaPhase::Eligibility,
            label: "Full-text articles assessed for eligibility".to_string(),
            count: counts.full_text_assessed,
        },
        PrismaStage {
            id: "included".to_string(),
            phase: PrismaPhase::Included,
            label: "Studies included in qualitative synthesis".to_string(),
            count: counts.studies_included,
        },
    ];
    if let Some(meta) = counts.studies_in_meta_analysis {
        stages.push(PrismaStage {
            id: "meta_analysis".to_string(),
            phase: PrismaPhase::Included,
            label: "Studies included in quantitative synthesis (meta-analysis)".to_string(),
            count: meta,
        });
    }

    let exclusions = vec![
        PrismaExclusion {
            after_stage: "identified".to_string(),
            label: "Duplicates removed".to_string(),
            count: counts.duplicates_removed,
            reasons: BTreeMap::new(),
        },
        PrismaExclusion {
            after_stage: "screened".to_string(),
            label: "Records excluded".to_string(),
            count: counts.records_excluded,
            reasons: BTreeMap::new(),
        },
        PrismaExclusion {
            after_stage: "full_text".to_string(),
            label: "Full-text articles excluded".to_string(),
            count: counts.full_text_excluded,
            reasons: counts.exclusion_reasons.clone(),
        },
    ];

    Ok(PrismaFlowData { stages, exclusions })
}
