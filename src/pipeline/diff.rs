//! Change analysis between two rankings.
//!
//! Items are matched by title, not position, so a book that moved from
//! 5th to 2nd is a rank change rather than one removal plus one addition.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::RankedItem;

/// A title that was not in the previous ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub title: String,
    pub rank: u32,
}

/// A title present in both rankings at different positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChange {
    pub title: String,
    pub current_rank: u32,
    pub previous_rank: u32,
    /// `previous_rank - current_rank`; positive means it climbed
    pub delta: i64,
}

impl RankChange {
    pub fn improved(&self) -> bool {
        self.delta > 0
    }

    pub fn magnitude(&self) -> u64 {
        self.delta.unsigned_abs()
    }
}

/// A title that fell out of the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedOut {
    pub title: String,
    pub previous_rank: u32,
}

/// Differences between the current and previous ranking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    pub new_entries: Vec<NewEntry>,
    pub rank_changes: Vec<RankChange>,
    pub dropped_out: Vec<DroppedOut>,
    /// Titles listed more than once in either ranking. Only the last
    /// occurrence of such a title takes part in the comparison.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_titles: Vec<String>,
}

impl ChangeAnalysis {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.new_entries.is_empty()
            || !self.rank_changes.is_empty()
            || !self.dropped_out.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.new_entries.len() + self.rank_changes.len() + self.dropped_out.len()
    }

    /// Rank changes ordered by size of the move, largest first; equal moves
    /// are ordered by current rank.
    pub fn largest_movers(&self) -> Vec<&RankChange> {
        let mut movers: Vec<&RankChange> = self.rank_changes.iter().collect();
        movers.sort_by(|a, b| {
            b.magnitude()
                .cmp(&a.magnitude())
                .then(a.current_rank.cmp(&b.current_rank))
        });
        movers
    }
}

/// Compare `current` against `previous`.
///
/// Lists keep input encounter order: `new_entries` and `rank_changes`
/// follow `current`, `dropped_out` follows `previous`.
pub fn analyze(current: &[RankedItem], previous: &[RankedItem]) -> ChangeAnalysis {
    // Later duplicates overwrite earlier ones.
    let curr_map: HashMap<&str, &RankedItem> =
        current.iter().map(|i| (i.title.as_str(), i)).collect();
    let prev_map: HashMap<&str, &RankedItem> =
        previous.iter().map(|i| (i.title.as_str(), i)).collect();

    let mut analysis = ChangeAnalysis {
        ambiguous_titles: duplicate_titles(current, previous),
        ..ChangeAnalysis::default()
    };

    for item in authoritative(current, &curr_map) {
        match prev_map.get(item.title.as_str()) {
            None => analysis.new_entries.push(NewEntry {
                title: item.title.clone(),
                rank: item.rank,
            }),
            Some(prev) if prev.rank != item.rank => analysis.rank_changes.push(RankChange {
                title: item.title.clone(),
                current_rank: item.rank,
                previous_rank: prev.rank,
                delta: i64::from(prev.rank) - i64::from(item.rank),
            }),
            Some(_) => {}
        }
    }

    for item in authoritative(previous, &prev_map) {
        if !curr_map.contains_key(item.title.as_str()) {
            analysis.dropped_out.push(DroppedOut {
                title: item.title.clone(),
                previous_rank: item.rank,
            });
        }
    }

    if !analysis.ambiguous_titles.is_empty() {
        log::warn!(
            "Duplicate titles in ranking, last occurrence used: {:?}",
            analysis.ambiguous_titles
        );
    }

    analysis
}

/// Items that won the title lookup, in list order.
fn authoritative<'a>(
    items: &'a [RankedItem],
    map: &'a HashMap<&str, &RankedItem>,
) -> impl Iterator<Item = &'a RankedItem> {
    items.iter().filter(move |item| {
        map.get(item.title.as_str())
            .is_some_and(|winner| std::ptr::eq(*winner, *item))
    })
}

fn duplicate_titles(current: &[RankedItem], previous: &[RankedItem]) -> Vec<String> {
    let mut duplicates = Vec::new();
    let mut reported = HashSet::new();

    for list in [current, previous] {
        let mut seen = HashSet::new();
        for item in list {
            let title = item.title.as_str();
            if !seen.insert(title) && reported.insert(title) {
                duplicates.push(title.to_string());
            }
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(entries: &[(u32, &str)]) -> Vec<RankedItem> {
        entries
            .iter()
            .map(|(rank, title)| RankedItem::new(*rank, *title))
            .collect()
    }

    #[test]
    fn test_no_changes() {
        let prev = items(&[(1, "A"), (2, "B"), (3, "C")]);
        let curr = prev.clone();

        let result = analyze(&curr, &prev);
        assert!(!result.has_changes());
        assert_eq!(result.change_count(), 0);
        assert!(result.ambiguous_titles.is_empty());
    }

    #[test]
    fn test_single_rank_change() {
        let result = analyze(&items(&[(1, "B")]), &items(&[(2, "B")]));
        assert_eq!(
            result.rank_changes,
            vec![RankChange {
                title: "B".into(),
                current_rank: 1,
                previous_rank: 2,
                delta: 1,
            }]
        );
        assert!(result.rank_changes[0].improved());
        assert!(result.new_entries.is_empty());
        assert!(result.dropped_out.is_empty());
    }

    #[test]
    fn test_new_entry_and_drop_out_at_same_rank() {
        let result = analyze(&items(&[(1, "A"), (2, "D")]), &items(&[(1, "A"), (2, "C")]));
        assert_eq!(
            result.new_entries,
            vec![NewEntry {
                title: "D".into(),
                rank: 2
            }]
        );
        assert_eq!(
            result.dropped_out,
            vec![DroppedOut {
                title: "C".into(),
                previous_rank: 2
            }]
        );
        assert!(result.rank_changes.is_empty());
    }

    #[test]
    fn test_mixed_changes() {
        let curr = items(&[(1, "書籍A"), (2, "書籍D"), (3, "書籍B")]);
        let prev = items(&[(1, "書籍B"), (2, "書籍A"), (3, "書籍C")]);

        let result = analyze(&curr, &prev);
        assert_eq!(result.new_entries.len(), 1);
        assert_eq!(result.new_entries[0].title, "書籍D");

        let a = result.rank_changes.iter().find(|c| c.title == "書籍A").unwrap();
        assert_eq!((a.current_rank, a.previous_rank, a.delta), (1, 2, 1));
        let b = result.rank_changes.iter().find(|c| c.title == "書籍B").unwrap();
        assert_eq!((b.current_rank, b.previous_rank, b.delta), (3, 1, -2));
        assert!(!b.improved());

        assert_eq!(result.dropped_out[0].title, "書籍C");
        assert_eq!(result.dropped_out[0].previous_rank, 3);
        assert_eq!(result.change_count(), 4);
    }

    #[test]
    fn test_empty_to_full() {
        let result = analyze(&items(&[(1, "First")]), &[]);
        assert_eq!(result.new_entries.len(), 1);
        assert!(result.dropped_out.is_empty());
    }

    #[test]
    fn test_full_to_empty() {
        let result = analyze(&[], &items(&[(1, "Last")]));
        assert!(result.new_entries.is_empty());
        assert_eq!(result.dropped_out.len(), 1);
    }

    #[test]
    fn test_identity_not_position() {
        // Same ranks, completely different titles: no rank changes at all.
        let result = analyze(&items(&[(1, "X"), (2, "Y")]), &items(&[(1, "A"), (2, "B")]));
        assert!(result.rank_changes.is_empty());
        assert_eq!(result.new_entries.len(), 2);
        assert_eq!(result.dropped_out.len(), 2);
    }

    #[test]
    fn test_sparse_ranks_are_compared_by_value() {
        let result = analyze(&items(&[(2, "A"), (7, "B")]), &items(&[(7, "A"), (2, "B")]));
        let deltas: Vec<_> = result.rank_changes.iter().map(|c| c.delta).collect();
        assert_eq!(deltas, vec![5, -5]);
    }

    #[test]
    fn test_duplicate_title_last_occurrence_wins_and_is_flagged() {
        let curr = items(&[(1, "Dup"), (2, "Other"), (3, "Dup")]);
        let prev = items(&[(3, "Dup"), (2, "Other")]);

        let result = analyze(&curr, &prev);
        // The rank-3 occurrence is authoritative, matching the previous rank.
        assert!(result.rank_changes.is_empty());
        assert!(result.new_entries.is_empty());
        assert_eq!(result.ambiguous_titles, vec!["Dup".to_string()]);
    }

    #[test]
    fn test_output_follows_encounter_order() {
        let curr = items(&[(1, "N1"), (2, "N2"), (3, "N3")]);
        let result = analyze(&curr, &[]);
        let titles: Vec<_> = result.new_entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["N1", "N2", "N3"]);
    }

    #[test]
    fn test_largest_movers_ordering() {
        let curr = items(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")]);
        let prev = items(&[(4, "A"), (5, "B"), (1, "C"), (8, "D")]);

        let result = analyze(&curr, &prev);
        let order: Vec<_> = result
            .largest_movers()
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        // |4| for D; |3| ties for A (rank 1) and B (rank 2); then |-2| for C.
        assert_eq!(order, vec!["D", "A", "B", "C"]);
    }
}
