//! Risk-of-bias traffic-light grid

use evidence_core::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Risk-of-bias judgement supplied by a quality assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[serde(alias = "low risk")]
    Low,
    #[serde(alias = "some concerns", alias = "moderate")]
    SomeConcerns,
    #[serde(alias = "high risk")]
    High,
    #[serde(alias = "no information")]
    Unclear,
}

impl RiskLevel {
    /// Severity used to derive an overall judgement (higher is worse)
    fn severity(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Unclear => 1,
            Self::SomeConcerns => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::SomeConcerns => write!(f, "some concerns"),
            Self::High => write!(f, "high"),
            Self::Unclear => write!(f, "unclear"),
        }
    }
}

/// Judgements keyed by study, then by domain
pub type RiskJudgements = BTreeMap<String, BTreeMap<String, RiskLevel>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightCell {
    pub study: String,
    pub domain: String,
    /// `None` when no judgement was supplied for this domain
    pub level: Option<RiskLevel>,
}

/// Worst judgement across a study's domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOverall {
    pub study: String,
    pub level: RiskLevel,
}

/// Share of studies at each level for one domain, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub domain: String,
    pub low: f64,
    pub some_concerns: f64,
    pub high: f64,
    pub unclear: f64,
    pub missing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightData {
    pub studies: Vec<String>,
    pub domains: Vec<String>,
    /// Row-major: every domain of the first study, then the next study
    pub cells: Vec<TrafficLightCell>,
    pub overall: Vec<StudyOverall>,
    pub domain_summary: Vec<DomainSummary>,
}

/// Lay out judgements as a study-by-domain grid
///
/// Studies and domains default to sorted order. An explicit `study_order`
/// must list every judged study exactly once; an explicit `domain_order`
/// must cover every judged domain and may add domains nobody judged.
pub fn traffic_light(
    judgements: &RiskJudgements,
    study_order: Option<&[String]>,
    domain_order: Option<&[String]>,
) -> Result<TrafficLightData> {
    if judgements.is_empty() {
        return Err(Error::insufficient("traffic-light plot", 1, 0));
    }

    let studies: Vec<String> = match study_order {
        Some(order) => {
            let listed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let judged: BTreeSet<&str> = judgements.keys().map(String::as_str).collect();
            if listed != judged || listed.len() != order.len() {
                return Err(Error::InvalidInput {
                    context: ErrorContext::field("study_order"),
                    message: "study order must list every judged study exactly once".to_string(),
                });
            }
            order.to_vec()
        }
        None => judgements.keys().cloned().collect(),
    };

    let judged_domains: BTreeSet<&String> = judgements.values().flat_map(|d| d.keys()).collect();
    let domains: Vec<String> = match domain_order {
        Some(order) => {
            if let Some(missing) = judged_domains.iter().find(|d| !order.contains(**d)) {
                return Err(Error::InvalidInput {
                    context: ErrorContext::field("domain_order"),
                    message: format!("domain '{missing}' is judged but not ordered"),
                });
            }
            let unique: BTreeSet<&String> = order.iter().collect();
            if unique.len() != order.len() {
                return Err(Error::InvalidInput {
                    context: ErrorContext::field("domain_order"),
                    message: "domain order lists a domain twice".to_string(),
                });
            }
            order.to_vec()
        }
        None => judged_domains.into_iter().cloned().collect(),
    };

    let mut cells = Vec::with_capacity(studies.len() * domains.len());
    let mut overall = Vec::with_capacity(studies.len());
    for study in &studies {
        let row = judgements.get(study);
        let mut worst: Option<RiskLevel> = None;
        for domain in &domains {
            let level = row.and_then(|r| r.get(domain)).copied();
            if let Some(level) = level {
                if worst.map_or(true, |w| level.severity() > w.severity()) {
                    worst = Some(level);
                }
            }
            cells.push(TrafficLightCell {
                study: study.clone(),
                domain: domain.clone(),
                level,
            });
        }
        overall.push(StudyOverall {
            study: study.clone(),
            level: worst.unwrap_or(RiskLevel::Unclear),
        });
    }

    let domain_summary = domains
        .iter()
        .map(|domain| summarize(domain, &cells, studies.len()))
        .collect();

    let missing = cells.iter().filter(|c| c.level.is_none()).count();
    if missing > 0 {
        debug!(missing, "traffic-light grid has unjudged cells");
    }

    Ok(TrafficLightData {
        studies,
        domains,
        cells,
        overall,
        domain_summary,
    })
}

fn summarize(domain: &str, cells: &[TrafficLightCell], study_count: usize) -> DomainSummary {
    let mut counts = [0usize; 5];
    for cell in cells.iter().filter(|c| c.domain == domain) {
        let slot = match cell.level {
            Some(RiskLevel::Low) => 0,
            Some(RiskLevel::SomeConcerns) => 1,
            Some(RiskLevel::High) => 2,
            Some(RiskLevel::Unclear) => 3,
            None => 4,
        };
        counts[slot] += 1;
    }
    let percent = |n: usize| 100.0 * n as f64 / study_count as f64;
    DomainSummary {
        domain: domain.to_string(),
        low: percent(counts[0]),
        some_concerns: percent(counts[1]),
        high: percent(counts[2]),
        unclear: percent(counts[3]),
        missing: percent(counts[4]),
    }
}
