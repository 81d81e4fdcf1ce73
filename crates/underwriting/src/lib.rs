//! Underwriting decision engine for a loan origination platform.
//!
//! The [`underwriting`] module holds the domain: formula evaluation, role form completeness,
//! borrower prefill reuse, and the lender pipeline. [`config`], [`telemetry`], and [`error`] carry
//! the process-level plumbing shared with the HTTP service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod underwriting;
