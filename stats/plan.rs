//! # Analysis Plans
//!
//! A plan lists the grouped analyses to run over one AuthorSignal table and the
//! bootstrap settings they share. Plans are stored as TOML:
//!
//! ```toml
//! iterations = 1000
//! value_column = "p_female"
//!
//! [[analysis]]
//! name = "position_breakdown"
//! group_columns = ["dataset", "position"]
//! years = { start = 2015, end = 2024 }
//! ```

use crate::bootstrap::{BootstrapConfig, DEFAULT_ITERATIONS};
use crate::filters::{Period, YearRange};
use crate::signal::columns;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Failed to read or write plan file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML plan file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize plan to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Invalid analysis plan: {0}")]
    Invalid(String),
}

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

fn default_value_column() -> String {
    columns::P_FEMALE.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisPlan {
    /// Resamples per group, shared by every analysis in the plan.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_value_column")]
    pub value_column: String,
    #[serde(default, rename = "analysis")]
    pub analyses: Vec<Analysis>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Analysis {
    /// Also names the output file.
    pub name: String,
    pub group_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<String>,
    #[serde(default)]
    pub exclude_initial_first: bool,
    /// Needs a journal quartile table; rows without a tier are dropped.
    #[serde(default)]
    pub requires_quartile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<YearRange>,
    /// Derives a `period` column before grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<Period>,
}

impl Analysis {
    pub fn grouped_by(name: &str, group_columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            group_columns: group_columns.iter().map(|c| c.to_string()).collect(),
            datasets: Vec::new(),
            exclude_initial_first: false,
            requires_quartile: false,
            years: None,
            periods: Vec::new(),
        }
    }

    fn with_years(mut self, start: i64, end: i64) -> Self {
        self.years = Some(YearRange { start, end });
        self
    }

    fn with_datasets(mut self, datasets: &[&str]) -> Self {
        self.datasets = datasets.iter().map(|d| d.to_string()).collect();
        self
    }

    fn with_periods(mut self, periods: Vec<Period>) -> Self {
        self.periods = periods;
        self
    }

    fn needing_quartile(mut self) -> Self {
        self.requires_quartile = true;
        self
    }

    fn validate(&self) -> Result<(), PlanError> {
        let fail = |reason: String| {
            Err(PlanError::Invalid(format!("analysis '{}': {reason}", self.name)))
        };
        if self.name.trim().is_empty() {
            return Err(PlanError::Invalid("every analysis needs a name".to_string()));
        }
        if self.group_columns.is_empty() {
            return fail("at least one grouping column is required".to_string());
        }
        if let Some(range) = self.years {
            if range.start > range.end {
                return fail(format!("year range {}..={} is empty", range.start, range.end));
            }
        }
        for (i, period) in self.periods.iter().enumerate() {
            if period.start > period.end {
                return fail(format!("period '{}' ends before it starts", period.label));
            }
            for other in &self.periods[..i] {
                if period.start <= other.end && other.start <= period.end {
                    return fail(format!(
                        "periods '{}' and '{}' overlap",
                        other.label, period.label
                    ));
                }
            }
        }
        let uses_period = self.group_columns.iter().any(|c| c == columns::PERIOD);
        if uses_period && self.periods.is_empty() {
            return fail("grouping by period requires at least one period".to_string());
        }
        Ok(())
    }
}

impl Default for AnalysisPlan {
    /// The standard set of analyses: author position, publication year, the two
    /// preprint categories, pandemic periods, and journal tier breakdowns.
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            value_column: default_value_column(),
            analyses: vec![
                Analysis::grouped_by("position_breakdown", &["dataset", "position"])
                    .with_years(2015, 2024),
                Analysis::grouped_by("temporal_trend", &["dataset", "year"])
                    .with_years(2015, 2024),
                Analysis::grouped_by("arxiv_position", &["dataset", "position"])
                    .with_datasets(&["q-bio", "cs"]),
                Analysis::grouped_by("covid_impact", &["period"])
                    .with_years(2015, 2024)
                    .with_periods(vec![
                        Period::new("Pre-COVID (2018-2019)", 2018, 2019),
                        Period::new("Pandemic (2020-2021)", 2020, 2021),
                        Period::new("Recovery (2022-2023)", 2022, 2023),
                    ]),
                Analysis::grouped_by("quartile_position", &["quartile", "position"])
                    .with_years(2015, 2025)
                    .needing_quartile(),
                Analysis::grouped_by("quartile_year", &["quartile", "year"])
                    .with_years(2015, 2025)
                    .needing_quartile(),
            ],
        }
    }
}

impl AnalysisPlan {
    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            iterations: self.iterations,
            seed: self.seed,
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.iterations == 0 {
            return Err(PlanError::Invalid("iterations must be at least 1".to_string()));
        }
        if self.value_column.trim().is_empty() {
            return Err(PlanError::Invalid("value_column must not be empty".to_string()));
        }
        let mut names = AHashSet::new();
        for analysis in &self.analyses {
            analysis.validate()?;
            if !names.insert(analysis.name.as_str()) {
                return Err(PlanError::Invalid(format!(
                    "analysis name '{}' is used more than once",
                    analysis.name
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PlanError> {
        let plan: Self = toml::from_str(text)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn to_toml_string(&self) -> Result<String, PlanError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads and validates a plan from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let text = self.to_toml_string()?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
