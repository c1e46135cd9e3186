//! Terminal choropleth of regional mortality risk.
//!
//! Risk and cause-of-death tables are joined onto region boundaries by
//! normalized region name; the dashboard shell lives in the binary.

pub mod advisor;
pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod join;
pub mod logging;
pub mod map;
pub mod query;
pub mod region;
pub mod selection;
pub mod session;
pub mod ui;
