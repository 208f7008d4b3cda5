use std::collections::HashMap;

use hive_models::{ConsensusThresholds, Opinion};

/// Keep only the most recent opinion of each agent.
///
/// Ties on `created_at` keep whichever came first in `opinions`, which the
/// store returns newest first. Output order follows first appearance.
pub fn latest_by_agent(opinions: &[Opinion]) -> Vec<&Opinion> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<&Opinion> = Vec::new();

    for op in opinions {
        match index.get(op.agent_id.as_str()) {
            Some(&i) => {
                if op.created_at > latest[i].created_at {
                    latest[i] = op;
                }
            }
            None => {
                index.insert(op.agent_id.as_str(), latest.len());
                latest.push(op);
            }
        }
    }

    latest
}

/// Aggregate statistics over one window's per-agent stances.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStats {
    pub participants: usize,
    pub avg_stance: f64,
    pub bullish: usize,
    pub bearish: usize,
    pub bull_ratio: f64,
    pub bear_ratio: f64,
    pub min_stance: f64,
    pub max_stance: f64,
}

impl PeriodStats {
    /// Compute statistics over raw stances. Returns None for an empty slice.
    pub fn from_stances(stances: &[f64], thresholds: &ConsensusThresholds) -> Option<Self> {
        if stances.is_empty() {
            return None;
        }

        let total = stances.len();
        let avg_stance = stances.iter().sum::<f64>() / total as f64;
        let bullish = stances
            .iter()
            .filter(|&&s| s > thresholds.bullish_threshold)
            .count();
        let bearish = stances
            .iter()
            .filter(|&&s| s < thresholds.bearish_threshold)
            .count();
        let min_stance = stances.iter().copied().fold(f64::INFINITY, f64::min);
        let max_stance = stances.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            participants: total,
            avg_stance,
            bullish,
            bearish,
            bull_ratio: bullish as f64 / total as f64,
            bear_ratio: bearish as f64 / total as f64,
            min_stance,
            max_stance,
        })
    }

    /// Deduplicate by agent, then compute. None below `min_participants`.
    pub fn for_window(opinions: &[Opinion], thresholds: &ConsensusThresholds) -> Option<Self> {
        let latest = latest_by_agent(opinions);
        if latest.len() < thresholds.min_participants {
            return None;
        }
        let stances: Vec<f64> = latest.iter().map(|o| o.stance).collect();
        Self::from_stances(&stances, thresholds)
    }

    pub fn spread(&self) -> f64 {
        self.max_stance - self.min_stance
    }
}
