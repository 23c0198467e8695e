//! Journal impact tiers.
//!
//! Rows are attached to a quartile by looking their journal up in a reference
//! table. A journal that is not in the table leaves its rows without a tier, and
//! those rows are removed from tier-based analyses. Nothing is imputed.

use crate::frame::{TableError, text_column};
use crate::signal::columns;
use ahash::AHashMap;
use polars::prelude::*;
use serde::Deserialize;
use std::path::Path;

pub const RANKED_QUARTILES: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

#[derive(Debug, Deserialize)]
struct JournalRecord {
    journal_name: String,
    quartile: String,
}

/// Lookup from journal title to its best quartile.
#[derive(Clone, Debug, Default)]
pub struct JournalQuartiles {
    lookup: AHashMap<String, String>,
}

/// Titles are compared trimmed and lower-cased.
fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

impl JournalQuartiles {
    /// Builds the lookup, ignoring pairs whose tier is not Q1–Q4.
    pub fn from_pairs<I, J, Q>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (J, Q)>,
        J: AsRef<str>,
        Q: AsRef<str>,
    {
        let mut lookup = AHashMap::new();
        for (journal, quartile) in pairs {
            let quartile = quartile.as_ref().trim();
            if RANKED_QUARTILES.contains(&quartile) {
                lookup.insert(normalize_title(journal.as_ref()), quartile.to_string());
            }
        }
        Self { lookup }
    }

    /// Loads `journal_name` / `quartile` columns from a delimited file.
    pub fn load(path: &Path, delimiter: u8) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_path(path)?;
        let mut pairs = Vec::new();
        for record in reader.deserialize() {
            let record: JournalRecord = record?;
            pairs.push((record.journal_name, record.quartile));
        }
        let quartiles = Self::from_pairs(pairs);
        log::info!(
            "Loaded {} ranked journals from '{}'",
            quartiles.len(),
            path.display()
        );
        Ok(quartiles)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn quartile_for(&self, journal: &str) -> Option<&str> {
        self.lookup.get(&normalize_title(journal)).map(String::as_str)
    }

    /// Adds a `quartile` column from the journal column and drops rows whose
    /// journal has no tier.
    pub fn attach(&self, df: &DataFrame) -> Result<DataFrame, TableError> {
        let journals = text_column(df, columns::JOURNAL)?;
        let tiers: Vec<Option<&str>> = journals
            .iter()
            .map(|journal| journal.as_deref().and_then(|j| self.quartile_for(j)))
            .collect();
        let keep: Vec<bool> = tiers.iter().map(Option::is_some).collect();
        let matched = keep.iter().filter(|&&k| k).count();

        let mut with_tiers = df.clone();
        with_tiers.with_column(Column::new(columns::QUARTILE.into(), tiers))?;
        let attached = with_tiers.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;

        let total = df.height();
        let rate = if total > 0 {
            matched as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        log::info!("Matched {matched} / {total} author records to a journal quartile ({rate:.1}%)");
        Ok(attached)
    }
}
