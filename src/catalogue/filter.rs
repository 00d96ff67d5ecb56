//! Record inclusion filters
//!
//! Predicates are independent of each other; the pipeline evaluates them in
//! order and stops at the first one that rejects the record.

use crate::catalogue::model::{AdRecord, FilterCriteria};
use std::collections::HashSet;
use std::fmt;

/// Why a record was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    Condition,
    ExcludedWord,
    ExcludedSeller,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Condition => "condition",
            Self::ExcludedWord => "excluded_word",
            Self::ExcludedSeller => "excluded_seller",
        };
        f.write_str(name)
    }
}

/// Pipeline decision for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Drop(DropReason),
}

/// A single inclusion test over a record
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Keeps records whose condition is "New"
    RequireNew,

    /// Drops records whose title contains any word, ignoring case.
    /// Words are stored lowercased.
    ExcludedWords(Vec<String>),

    /// Drops records whose seller name matches exactly
    ExcludedSellers(HashSet<String>),
}

impl Predicate {
    pub fn excluded_words<'a, I>(words: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Self::ExcludedWords(
            words
                .into_iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
        )
    }

    pub fn keeps(&self, record: &AdRecord) -> bool {
        match self {
            Self::RequireNew => record.is_new(),
            Self::ExcludedWords(words) => {
                let title = record.title.to_lowercase();
                !words.iter().any(|word| title.contains(word.as_str()))
            }
            Self::ExcludedSellers(sellers) => !sellers.contains(&record.seller_name),
        }
    }

    pub fn drop_reason(&self) -> DropReason {
        match self {
            Self::RequireNew => DropReason::Condition,
            Self::ExcludedWords(_) => DropReason::ExcludedWord,
            Self::ExcludedSellers(_) => DropReason::ExcludedSeller,
        }
    }
}

/// Ordered chain of predicates
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    predicates: Vec<Predicate>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Pipeline for search crawls: condition first, then titles and sellers
    pub fn for_search(criteria: &FilterCriteria) -> Self {
        let mut pipeline = Self::new();

        if criteria.require_new_condition {
            pipeline = pipeline.with(Predicate::RequireNew);
        }

        let words = Predicate::excluded_words(&criteria.excluded_words);
        if matches!(&words, Predicate::ExcludedWords(w) if !w.is_empty()) {
            pipeline = pipeline.with(words);
        }

        if !criteria.excluded_sellers.is_empty() {
            pipeline = pipeline.with(Predicate::ExcludedSellers(
                criteria.excluded_sellers.clone(),
            ));
        }

        pipeline
    }

    /// Pipeline for shop crawls: every listing is kept
    pub fn for_shop() -> Self {
        Self::new()
    }

    pub fn evaluate(&self, record: &AdRecord) -> Verdict {
        self.predicates
            .iter()
            .find(|predicate| !predicate.keeps(record))
            .map_or(Verdict::Keep, |predicate| {
                Verdict::Drop(predicate.drop_reason())
            })
    }

    /// Keeps the records every predicate accepts, preserving order
    pub fn apply(&self, records: Vec<AdRecord>) -> Vec<AdRecord> {
        records
            .into_iter()
            .filter(|record| self.evaluate(record) == Verdict::Keep)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
