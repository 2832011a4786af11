use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::pipeline::status::ALL_STATUSES;
use crate::pipeline::CandidateStatus;

/// Dashboard counters: one per lifecycle status plus the total.
#[derive(Debug, Serialize)]
pub struct CandidateStats {
    pub total: i64,
    pub by_status: BTreeMap<&'static str, i64>,
}

/// Folds `(status, count)` rows into counters, zero-filling statuses with no
/// candidates. Unknown statuses still count towards the total.
pub fn tally<I>(rows: I) -> CandidateStats
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut by_status: BTreeMap<&'static str, i64> =
        ALL_STATUSES.iter().map(|s| (s.as_str(), 0)).collect();
    let mut total = 0;

    for (status, count) in rows {
        total += count;
        match status.parse::<CandidateStatus>() {
            Ok(s) => *by_status.entry(s.as_str()).or_default() += count,
            Err(_) => warn!("{count} candidates carry unknown status '{status}'"),
        }
    }
    CandidateStats { total, by_status }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_filled() {
        let stats = tally(vec![("Interview".to_string(), 3)]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.len(), ALL_STATUSES.len());
        assert_eq!(stats.by_status["Interview"], 3);
        assert_eq!(stats.by_status["Ready to Join"], 0);
    }

    #[test]
    fn test_unknown_status_counts_in_total() {
        let stats = tally(vec![
            ("Active".to_string(), 2),
            ("Hired".to_string(), 1),
        ]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status["Active"], 2);
        assert!(!stats.by_status.contains_key("Hired"));
    }
}
