//! Candidate eligibility and frequency-based name inference
//!
//! Pure functions over one search result set. Nothing here performs I/O or
//! draws randomness; pools come back sorted so a seeded source reproduces
//! the same pick.

use std::collections::HashMap;

use crate::api::CandidateRecord;

/// Names must be longer than this many letters to count
pub const MIN_NAME_LEN: usize = 3;

/// A last name qualifies when it appears more than this many times
pub const LAST_NAME_THRESHOLD: usize = 2;

/// A first name qualifies when it appears more than this many times
pub const FIRST_NAME_THRESHOLD: usize = 5;

/// Open profile, photo present, both names longer than three letters.
pub fn is_eligible(record: &CandidateRecord) -> bool {
    !record.is_closed
        && record.photo_id.as_deref().is_some_and(|id| !id.is_empty())
        && record.first_name.chars().count() > MIN_NAME_LEN
        && record.last_name.chars().count() > MIN_NAME_LEN
}

/// Keep only eligible candidates, preserving order.
pub fn eligible(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    records.into_iter().filter(is_eligible).collect()
}

/// Occurrence counts of first and last names among a candidate set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFrequencies {
    pub first_names: HashMap<String, usize>,
    pub last_names: HashMap<String, usize>,
}

impl NameFrequencies {
    pub fn tally(candidates: &[CandidateRecord]) -> Self {
        let mut frequencies = NameFrequencies::default();
        for candidate in candidates {
            *frequencies
                .first_names
                .entry(candidate.first_name.clone())
                .or_insert(0) += 1;
            *frequencies
                .last_names
                .entry(candidate.last_name.clone())
                .or_insert(0) += 1;
        }
        frequencies
    }

    /// Last names seen more than twice that never occur as a first name
    pub fn last_name_pool(&self) -> Vec<String> {
        let mut pool: Vec<String> = self
            .last_names
            .iter()
            .filter(|(name, count)| {
                **count > LAST_NAME_THRESHOLD && !self.first_names.contains_key(*name)
            })
            .map(|(name, _)| name.clone())
            .collect();
        pool.sort();
        pool
    }

    /// First names seen more than five times
    pub fn first_name_pool(&self) -> Vec<String> {
        let mut pool: Vec<String> = self
            .first_names
            .iter()
            .filter(|(_, count)| **count > FIRST_NAME_THRESHOLD)
            .map(|(name, _)| name.clone())
            .collect();
        pool.sort();
        pool
    }
}

/// Outcome of inspecting one candidate set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePools {
    /// No last name passes the threshold
    NoLastName,
    /// Last names qualify but no first name does
    NoFirstName { last_names: Vec<String> },
    /// Both pools are non-empty
    Ready {
        first_names: Vec<String>,
        last_names: Vec<String>,
    },
}

/// Compute both pools for an eligible candidate set.
pub fn name_pools(candidates: &[CandidateRecord]) -> NamePools {
    let frequencies = NameFrequencies::tally(candidates);
    let last_names = frequencies.last_name_pool();
    if last_names.is_empty() {
        return NamePools::NoLastName;
    }
    let first_names = frequencies.first_name_pool();
    if first_names.is_empty() {
        return NamePools::NoFirstName { last_names };
    }
    NamePools::Ready {
        first_names,
        last_names,
    }
}
