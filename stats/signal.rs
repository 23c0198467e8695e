//! AuthorSignal records: one row per author per paper.
//!
//! Papers arrive with their authors in byline order and a gender classification
//! per author. Expansion labels each author's position and resolves the
//! classification to `p_female` before the rows are laid out as a `DataFrame`.

use crate::positions::{Position, assign_positions};
use crate::resolve::{Classification, ResolveError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column names of an AuthorSignal table.
pub mod columns {
    pub const PAPER_ID: &str = "paper_id";
    pub const YEAR: &str = "year";
    pub const DATASET: &str = "dataset";
    pub const AUTHOR_NAME: &str = "author_name";
    pub const POSITION: &str = "position";
    pub const P_FEMALE: &str = "p_female";
    pub const JOURNAL: &str = "journal";
    pub const QUARTILE: &str = "quartile";
    pub const PERIOD: &str = "period";
}

/// One author appearing on one paper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorSignal {
    pub paper_id: String,
    pub year: i64,
    pub dataset: String,
    pub author_name: String,
    pub position: Position,
    /// `None` is absence of evidence, not 0.5.
    pub p_female: Option<f64>,
    pub journal: Option<String>,
}

/// A classified author as delivered by the name-inference collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAuthor {
    pub name: String,
    pub classification: Classification,
}

/// A publication with its authors in byline order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: String,
    pub year: i64,
    pub dataset: String,
    pub journal: Option<String>,
    pub authors: Vec<ClassifiedAuthor>,
}

impl Paper {
    /// Expands the paper into one signal per author, labelling positions and
    /// resolving each classification to `p_female`.
    pub fn author_signals(&self) -> Result<Vec<AuthorSignal>, ResolveError> {
        assign_positions(self.authors.iter().collect())
            .into_iter()
            .map(|(author, position)| {
                Ok(AuthorSignal {
                    paper_id: self.paper_id.clone(),
                    year: self.year,
                    dataset: self.dataset.clone(),
                    author_name: author.name.clone(),
                    position,
                    p_female: author.classification.p_female()?,
                    journal: self.journal.clone(),
                })
            })
            .collect()
    }
}

/// Expands every paper, stopping at the first unresolvable classification.
pub fn papers_to_signals(papers: &[Paper]) -> Result<Vec<AuthorSignal>, ResolveError> {
    let mut signals = Vec::new();
    for paper in papers {
        signals.extend(paper.author_signals()?);
    }
    Ok(signals)
}

/// Lays signals out as an AuthorSignal `DataFrame`.
pub fn signals_to_frame(signals: &[AuthorSignal]) -> PolarsResult<DataFrame> {
    let paper_ids: Vec<&str> = signals.iter().map(|s| s.paper_id.as_str()).collect();
    let years: Vec<i64> = signals.iter().map(|s| s.year).collect();
    let datasets: Vec<&str> = signals.iter().map(|s| s.dataset.as_str()).collect();
    let names: Vec<&str> = signals.iter().map(|s| s.author_name.as_str()).collect();
    let positions: Vec<&str> = signals.iter().map(|s| s.position.as_str()).collect();
    let p_female: Vec<Option<f64>> = signals.iter().map(|s| s.p_female).collect();
    let journals: Vec<Option<&str>> = signals.iter().map(|s| s.journal.as_deref()).collect();

    DataFrame::new(vec![
        Column::new(columns::PAPER_ID.into(), paper_ids),
        Column::new(columns::YEAR.into(), years),
        Column::new(columns::DATASET.into(), datasets),
        Column::new(columns::AUTHOR_NAME.into(), names),
        Column::new(columns::POSITION.into(), positions),
        Column::new(columns::P_FEMALE.into(), p_female),
        Column::new(columns::JOURNAL.into(), journals),
    ])
}
