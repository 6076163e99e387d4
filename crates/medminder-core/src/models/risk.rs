//! Insurance risk report.
//!
//! Illustrative only: two snapshots supplied as data, compared domain by domain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid risk report JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Score out of range in {context}: {score}")]
    ScoreOutOfRange { context: String, score: u32 },

    #[error("Snapshots list different domains")]
    DomainMismatch,
}

/// Score for one risk domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskDomain {
    pub name: String,
    pub score: u32,
    pub note: String,
}

/// Risk assessed at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskSnapshot {
    pub label: String,
    pub date: String,
    pub basis: String,
    pub overall: u32,
    pub tier: String,
    pub domains: Vec<RiskDomain>,
    #[serde(default)]
    pub key_flags: Vec<String>,
}

/// Change in one domain between snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDelta {
    pub name: String,
    pub before: u32,
    pub after: u32,
    pub delta: i32,
}

/// Before/after pair of snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskComparison {
    pub before: RiskSnapshot,
    pub after: RiskSnapshot,
}

impl RiskComparison {
    /// Parse and validate a report from host-supplied JSON.
    pub fn from_json(json: &str) -> Result<Self, RiskError> {
        let comparison: RiskComparison = serde_json::from_str(json)?;
        comparison.validate()?;
        Ok(comparison)
    }

    /// Scores lie in 0..=100 and both snapshots cover the same domains in order.
    pub fn validate(&self) -> Result<(), RiskError> {
        for snapshot in [&self.before, &self.after] {
            check_score(&snapshot.label, snapshot.overall)?;
            for domain in &snapshot.domains {
                check_score(&domain.name, domain.score)?;
            }
        }

        let same_domains = self.before.domains.len() == self.after.domains.len()
            && self
                .before
                .domains
                .iter()
                .zip(&self.after.domains)
                .all(|(b, a)| b.name == a.name);
        if !same_domains {
            return Err(RiskError::DomainMismatch);
        }
        Ok(())
    }

    pub fn overall_delta(&self) -> i32 {
        self.after.overall as i32 - self.before.overall as i32
    }

    pub fn domain_deltas(&self) -> Vec<DomainDelta> {
        self.before
            .domains
            .iter()
            .zip(&self.after.domains)
            .map(|(b, a)| DomainDelta {
                name: b.name.clone(),
                before: b.score,
                after: a.score,
                delta: a.score as i32 - b.score as i32,
            })
            .collect()
    }
}

fn check_score(context: &str, score: u32) -> Result<(), RiskError> {
    if score > 100 {
        return Err(RiskError::ScoreOutOfRange {
            context: context.to_string(),
            score,
        });
    }
    Ok(())
}
