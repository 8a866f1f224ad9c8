// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::AuError;

/// Fold weights, seed and selected fold of a person split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    /// Train and test weights
    pub folds: [usize; 2],
    pub seed: u64,
    /// Zero-based fold selecting the test window
    pub current_fold: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            folds: [2, 1],
            seed: 42,
            current_fold: 0,
        }
    }
}

/// Disjoint train and test subject groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSplit {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

/// Partition subjects into train and test persons
///
/// Subjects are sorted and shuffled with a generator seeded from
/// `config.seed`, so the split only depends on the subject set and the
/// configuration. The test group is a window of `per_fold * test_weight`
/// subjects starting at `current_fold * per_fold`, where `per_fold` is the
/// subject count divided by the sum of weights. Train is every remaining
/// subject in shuffled order.
///
/// # Arguments
///
/// * `subjects` - Subject identifiers in any order
/// * `config` - Fold weights, seed and current fold
///
/// # Examples
///
/// ```
/// use aucache_core::split::{SplitConfig, split_persons};
///
/// let subjects: Vec<String> = (1..=9).map(|i| format!("SN{:03}", i)).collect();
/// let split = split_persons(&subjects, &SplitConfig::default()).unwrap();
///
/// assert_eq!(split.test.len(), 3);
/// assert_eq!(split.train.len(), 6);
/// ```
pub fn split_persons(subjects: &[String], config: &SplitConfig) -> Result<PersonSplit, AuError> {
    let mut persons = subjects.to_vec();
    persons.sort();
    persons.dedup();

    if persons.is_empty() {
        return Err(AuError::ConfigError(
            "Cannot split an empty set of subjects".to_string(),
        ));
    }

    let [train_weight, test_weight] = config.folds;
    let total_weight = train_weight.checked_add(test_weight).ok_or_else(|| {
        AuError::ConfigError(format!(
            "Fold weights {:?} are too large",
            config.folds
        ))
    })?;

    if total_weight == 0 {
        return Err(AuError::ConfigError(
            "Fold weights must not sum to zero".to_string(),
        ));
    }

    let per_fold = persons.len() / total_weight;
    let start = config.current_fold.checked_mul(per_fold);
    let end = start
        .zip(per_fold.checked_mul(test_weight))
        .and_then(|(start, size)| start.checked_add(size));

    let (Some(start), Some(end)) = (start, end) else {
        return Err(AuError::ConfigError(format!(
            "Fold {} is out of range",
            config.current_fold
        )));
    };

    if end > persons.len() {
        return Err(AuError::ConfigError(format!(
            "Fold {} selects subjects {}..{} but only {} subjects exist",
            config.current_fold,
            start,
            end,
            persons.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    persons.shuffle(&mut rng);

    let test = persons[start..end].to_vec();
    let train = persons
        .into_iter()
        .filter(|person| !test.contains(person))
        .collect();

    Ok(PersonSplit { train, test })
}

#[cfg(test)]
mod test {

    use super::*;

    fn subjects(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("SN{:03}", i)).collect()
    }

    #[test]
    fn test_split_sizes() {
        let split = split_persons(&subjects(27), &SplitConfig::default()).unwrap();
        assert_eq!(split.test.len(), 9);
        assert_eq!(split.train.len(), 18);

        let split = split_persons(&subjects(10), &SplitConfig::default()).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 7);
    }

    #[test]
    fn test_split_is_deterministic() {
        let config = SplitConfig {
            seed: 7,
            ..Default::default()
        };

        let mut reversed = subjects(12);
        reversed.reverse();

        let a = split_persons(&subjects(12), &config).unwrap();
        let b = split_persons(&reversed, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let all = subjects(12);

        for current_fold in 0..3 {
            let config = SplitConfig {
                current_fold,
                ..Default::default()
            };
            let split = split_persons(&all, &config).unwrap();

            assert!(split.train.iter().all(|person| !split.test.contains(person)));

            let mut union: Vec<String> = split.train.iter().chain(split.test.iter()).cloned().collect();
            union.sort();
            assert_eq!(union, all);
        }
    }

    #[test]
    fn test_folds_cover_distinct_windows() {
        let all = subjects(12);
        let config = |current_fold| SplitConfig {
            folds: [3, 1],
            current_fold,
            ..Default::default()
        };

        let mut tested: Vec<String> = (0..4)
            .flat_map(|fold| split_persons(&all, &config(fold)).unwrap().test)
            .collect();
        tested.sort();

        assert_eq!(tested, all);
    }

    #[test]
    fn test_split_errors() {
        assert!(matches!(
            split_persons(&[], &SplitConfig::default()),
            Err(AuError::ConfigError(_))
        ));

        let zero = SplitConfig {
            folds: [0, 0],
            ..Default::default()
        };
        assert!(matches!(
            split_persons(&subjects(3), &zero),
            Err(AuError::ConfigError(_))
        ));

        let overflow = SplitConfig {
            current_fold: 3,
            ..Default::default()
        };
        assert!(matches!(
            split_persons(&subjects(3), &overflow),
            Err(AuError::ConfigError(_))
        ));
    }

    #[test]
    fn test_split_rejects_overflowing_folds() {
        let huge_fold = SplitConfig {
            current_fold: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(
            split_persons(&subjects(9), &huge_fold),
            Err(AuError::ConfigError(_))
        ));

        let huge_weight = SplitConfig {
            folds: [usize::MAX, 1],
            ..Default::default()
        };
        assert!(matches!(
            split_persons(&subjects(9), &huge_weight),
            Err(AuError::ConfigError(message)) if message.contains("too large")
        ));
    }
}
