//! Cache analytics core for an LLM gateway dashboard.
//!
//! Raw per-(api key, model, call type) cache activity rows are reduced to
//! chart series and summary metrics ([`aggregation`]), filter controls are
//! populated from the same rows ([`facets`]), and cache health-check results
//! are normalized into a flat displayable shape ([`health`]).

pub mod aggregation;
pub mod controller;
pub mod deep_parse;
pub mod error;
pub mod facets;
pub mod filters;
pub mod health;
pub mod models;
pub mod source;
