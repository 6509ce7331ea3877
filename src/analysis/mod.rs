//! # Analysis Layer
//!
//! Analytical passes over the evolving telemetry: a per-tick fault rule
//! engine, a linear-regression resource-exhaustion predictor, what-if
//! scenario comparison, and the end-of-run summary report.

pub mod fault_detector;
pub mod predictive;
pub mod report;
pub mod what_if;

pub use fault_detector::{Alert, Component, FaultDetector, FaultKind, FaultSummary, Severity};
pub use predictive::{
    Confidence, MaintenanceRecommendation, Prediction, Predictions, PredictiveMaintenance,
};
pub use what_if::{MetricComparison, MetricValue, ScenarioResults, WhatIfComparison};
