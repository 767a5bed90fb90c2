//! Daily pipeline wiring: refresh holdings, fetch news, analyze, persist,
//! report. One run per invocation, driven by the CLI or a scheduler.

mod daily;

pub use daily::{analyze_targets, AnalysisOutcome, DailyOrchestrator};
