//! Finance and payment reconciliation engine for a daycare.
//!
//! This crate derives babysitter payments from attendance, posts them to an
//! append-only ledger, aggregates daily summaries and tracks budget adherence.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod finance;
pub mod models;
