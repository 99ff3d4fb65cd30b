//! Tariff Comparator library
//!
//! Electricity tariff cost projection and consultant commission
//! resolution, exposed for the command line tools and for tests.

pub mod catalog;
pub mod commission;
pub mod comparison;
pub mod core;
pub mod db;
pub mod eligibility;
pub mod i18n;
pub mod pricing;
