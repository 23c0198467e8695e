#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod analysis;
pub mod bootstrap;
pub mod filters;
pub mod frame;
pub mod grouped;
pub mod io;
pub mod plan;
pub mod positions;
pub mod quartile;
pub mod resolve;
pub mod results;
pub mod signal;
pub mod trend;

pub use bootstrap::{BootstrapConfig, BootstrapEstimator, DEFAULT_ITERATIONS, Estimate, Interval};
pub use frame::TableError;
pub use grouped::{GroupKey, KeyValue, estimate_grouped};
pub use positions::{Position, assign_positions};
pub use resolve::{Classification, GenderLabel, resolve_p_female};
pub use results::ResultTable;
pub use trend::{Trend, fit_trend};
