use hive_models::{AgreementDirection, ConsensusThresholds, ConsensusType, EventKey};

use crate::stats::PeriodStats;

/// The headline a token's opinions produced in one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Agreement(AgreementDirection),
    Disagreement,
    Shift { prev_avg: f64, delta: f64 },
}

impl Signal {
    pub fn kind(&self) -> ConsensusType {
        match self {
            Signal::Agreement(_) => ConsensusType::Agreement,
            Signal::Disagreement => ConsensusType::Disagreement,
            Signal::Shift { .. } => ConsensusType::Shift,
        }
    }

    pub fn direction(&self) -> Option<AgreementDirection> {
        match self {
            Signal::Agreement(dir) => Some(*dir),
            _ => None,
        }
    }

    pub fn key(&self, token: &str) -> EventKey {
        match self {
            Signal::Agreement(dir) => EventKey::agreement(token, *dir),
            other => EventKey::new(token, other.kind()),
        }
    }

    /// Operator-facing one-line description. Numbers are shown to two decimals.
    pub fn summary(&self, token: &str, stats: &PeriodStats) -> String {
        let avg = stats.avg_stance;
        match self {
            Signal::Agreement(AgreementDirection::Bull) => format!(
                "{:.0}% of agents are bullish on ${token}. Average sentiment: {avg:.2}",
                stats.bull_ratio * 100.0
            ),
            Signal::Agreement(AgreementDirection::Bear) => format!(
                "{:.0}% of agents are bearish on ${token}. Average sentiment: {avg:.2}",
                stats.bear_ratio * 100.0
            ),
            Signal::Disagreement => format!(
                "Agents are divided on ${token}: {} bullish vs {} bearish. Spread: {:.2}",
                stats.bullish,
                stats.bearish,
                stats.spread()
            ),
            Signal::Shift { prev_avg, delta } => {
                let direction = if *delta > 0.0 { "bullish" } else { "bearish" };
                format!(
                    "Sentiment shift on ${token}: agents moving {direction}. \
                     Δ{delta:.2} ({prev_avg:.2} → {avg:.2})"
                )
            }
        }
    }
}

/// Classify the current period alone: AGREEMENT (bull, then bear), then DISAGREEMENT.
///
/// Returns None when neither holds; the caller then checks for a SHIFT.
pub fn classify_current(stats: &PeriodStats, t: &ConsensusThresholds) -> Option<Signal> {
    if stats.bull_ratio >= t.agreement_ratio {
        return Some(Signal::Agreement(AgreementDirection::Bull));
    }
    if stats.bear_ratio >= t.agreement_ratio {
        return Some(Signal::Agreement(AgreementDirection::Bear));
    }
    if stats.spread() >= t.disagreement_spread
        && stats.bull_ratio > t.disagreement_camp_ratio
        && stats.bear_ratio > t.disagreement_camp_ratio
    {
        return Some(Signal::Disagreement);
    }
    None
}

/// Compare the current period's average against the previous period's.
pub fn classify_shift(
    current: &PeriodStats,
    previous: &PeriodStats,
    t: &ConsensusThresholds,
) -> Option<Signal> {
    let delta = current.avg_stance - previous.avg_stance;
    if delta.abs() >= t.shift_delta {
        Some(Signal::Shift {
            prev_avg: previous.avg_stance,
            delta,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(stances: &[f64]) -> PeriodStats {
        PeriodStats::from_stances(stances, &ConsensusThresholds::default()).unwrap()
    }

    #[test]
    fn bullish_majority_is_agreement() {
        let t = ConsensusThresholds::default();
        let s = stats(&[0.8, 0.6, 0.7, 0.9, -0.5]);
        assert_eq!(
            classify_current(&s, &t),
            Some(Signal::Agreement(AgreementDirection::Bull))
        );
        assert_eq!(
            Signal::Agreement(AgreementDirection::Bull).summary("BTC", &s),
            "80% of agents are bullish on $BTC. Average sentiment: 0.50"
        );
    }

    #[test]
    fn bearish_majority_is_agreement() {
        let t = ConsensusThresholds::default();
        let s = stats(&[-0.8, -0.6, -0.7, 0.2]);
        assert_eq!(
            classify_current(&s, &t),
            Some(Signal::Agreement(AgreementDirection::Bear))
        );
        assert!(Signal::Agreement(AgreementDirection::Bear)
            .summary("SOL", &s)
            .starts_with("75% of agents are bearish on $SOL"));
    }

    #[test]
    fn exact_agreement_ratio_counts() {
        let t = ConsensusThresholds::default();
        let s = stats(&[0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(s.bull_ratio, 0.7);
        assert!(matches!(classify_current(&s, &t), Some(Signal::Agreement(_))));
    }

    #[test]
    fn split_camps_are_disagreement() {
        let t = ConsensusThresholds::default();
        let s = stats(&[0.9, 0.8, -0.9, -0.8, 0.05]);
        assert_eq!(classify_current(&s, &t), Some(Signal::Disagreement));
        assert_eq!(
            Signal::Disagreement.summary("ETH", &s),
            "Agents are divided on $ETH: 2 bullish vs 2 bearish. Spread: 1.80"
        );
    }

    #[test]
    fn single_outlier_is_not_disagreement() {
        let t = ConsensusThresholds::default();
        // Wide spread, but the bearish camp is one agent of five.
        let s = stats(&[0.9, 0.5, 0.0, 0.05, -0.9]);
        assert!(s.spread() >= t.disagreement_spread);
        assert_eq!(classify_current(&s, &t), None);
    }

    #[test]
    fn agreement_wins_over_wide_spread() {
        let t = ConsensusThresholds::default();
        let s = stats(&[1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, -1.0, -0.9, -0.8]);
        assert!(s.spread() >= t.disagreement_spread);
        assert_eq!(
            classify_current(&s, &t),
            Some(Signal::Agreement(AgreementDirection::Bull))
        );
    }

    #[test]
    fn shift_labels_direction() {
        let t = ConsensusThresholds::default();
        let prev = stats(&[-0.6, -0.6, -0.6, -0.6]);
        let cur = stats(&[0.5, 0.4, -0.3, -0.2]);
        let signal = classify_shift(&cur, &prev, &t).unwrap();
        let summary = signal.summary("SOL", &cur);
        assert!(summary.contains("agents moving bullish"));
        assert!(summary.contains("Δ0.70"));
        assert!(summary.contains("(-0.60 → 0.10)"));

        let down = classify_shift(&prev, &cur, &t).unwrap();
        assert!(down.summary("SOL", &prev).contains("agents moving bearish"));
    }

    #[test]
    fn small_delta_is_not_shift() {
        let t = ConsensusThresholds::default();
        let prev = stats(&[0.0, 0.1, 0.2]);
        let cur = stats(&[0.3, 0.4, 0.2]);
        assert_eq!(classify_shift(&cur, &prev, &t), None);
    }

    #[test]
    fn keys_follow_signal() {
        assert_eq!(
            Signal::Agreement(AgreementDirection::Bear).key("BTC").to_string(),
            "BTC:AGREEMENT:BEAR"
        );
        assert_eq!(
            Signal::Shift { prev_avg: 0.0, delta: 0.5 }.key("BTC").to_string(),
            "BTC:SHIFT"
        );
    }
}
