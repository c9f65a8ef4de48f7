use serde::{Deserialize, Serialize};

use super::{PollId, PollOption};

/// One voter's current choice within a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub poll_id: PollId,
    pub voter: String,
    /// 1-based option numbers; a single element unless the poll is multi-vote
    pub options: Vec<u32>,
}

/// Vote count for a single option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTally {
    pub label: String,
    pub count: u64,
}

/// Poll results keyed by `"{num}) {name}"`, kept in option order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollResults {
    entries: Vec<OptionTally>,
}

impl PollResults {
    /// Count every selection of every ballot as one full vote for that option.
    ///
    /// Option numbers outside `1..=options.len()` are skipped; the vote
    /// service never persists such ballots.
    pub fn tally(options: &[PollOption], votes: &[Vote]) -> Self {
        let mut counts = vec![0u64; options.len()];

        for vote in votes {
            for &num in &vote.options {
                // 1-based option number to 0-based index
                let Some(index) = (num as usize).checked_sub(1) else {
                    continue;
                };
                if let Some(count) = counts.get_mut(index) {
                    *count += 1;
                }
            }
        }

        let entries = options
            .iter()
            .zip(counts)
            .map(|(option, count)| OptionTally {
                label: option.label(),
                count,
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionTally> {
        self.entries.iter()
    }

    pub fn total_selections(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(names: &[&str]) -> Vec<PollOption> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| PollOption {
                id: i as i64 + 1,
                poll_id: 1,
                name: name.to_string(),
                num: i as u32 + 1,
            })
            .collect()
    }

    fn vote(id: i64, options: Vec<u32>) -> Vote {
        Vote {
            id,
            poll_id: 1,
            voter: format!("user-{}", id),
            options,
        }
    }

    #[test]
    fn test_multi_vote_ballots_count_fully() {
        let results = PollResults::tally(
            &options(&["A", "B"]),
            &[vote(1, vec![1]), vote(2, vec![2]), vote(3, vec![1, 2])],
        );

        assert_eq!(results.get("1) A"), Some(2));
        assert_eq!(results.get("2) B"), Some(2));
        assert_eq!(results.total_selections(), 4);
    }

    #[test]
    fn test_boundary_option_numbers() {
        let results = PollResults::tally(
            &options(&["first", "middle", "last"]),
            &[vote(1, vec![1]), vote(2, vec![3]), vote(3, vec![3])],
        );

        let counts: Vec<u64> = results.iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![1, 0, 2]);
    }

    #[test]
    fn test_unvoted_options_listed_in_order() {
        let results = PollResults::tally(&options(&["x", "y", "z"]), &[vote(1, vec![2])]);

        let labels: Vec<&str> = results.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["1) x", "2) y", "3) z"]);
        assert_eq!(results.get("1) x"), Some(0));
    }

    #[test]
    fn test_out_of_range_numbers_ignored() {
        let results = PollResults::tally(&options(&["A"]), &[vote(1, vec![0, 1, 2])]);
        assert_eq!(results.get("1) A"), Some(1));
        assert_eq!(results.total_selections(), 1);
    }
}
