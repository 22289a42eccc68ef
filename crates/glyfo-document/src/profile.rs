// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage timing — an observer the pipeline reports stage durations to, and a
// profiler that turns them into a JSON report.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use glyfo_core::{PdfType, Result};
use serde::{Deserialize, Serialize};

/// Pipeline stages that are timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Classify,
    NativeExtract,
    Rasterize,
    Recognize,
    SplitWords,
    Aggregate,
    Output,
}

/// Receives stage timings. Implementations must tolerate any call order.
pub trait StageObserver {
    fn stage_finished(&self, stage: Stage, page: Option<u32>, elapsed: Duration);

    /// Called once the document has been classified.
    fn document_info(&self, _pdf_type: PdfType, _pages: u32, _size_bytes: u64) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn stage_finished(&self, _stage: Stage, _page: Option<u32>, _elapsed: Duration) {}
}

/// Runs `f` and reports its duration.
pub fn timed<T>(observer: &dyn StageObserver, stage: Stage, page: Option<u32>, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    observer.stage_finished(stage, page, start.elapsed());
    out
}

/// One timed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfProfile {
    #[serde(rename = "type")]
    pub pdf_type: Option<PdfType>,
    pub num_pages: u32,
    pub file_size_mb: f64,
    pub pages_per_second: f64,
    pub mb_per_second: f64,
}

/// Serialized profile of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub timestamp: DateTime<Utc>,
    pub total_time_seconds: f64,
    pub pdf: PdfProfile,
    pub stages: Vec<StageTiming>,
    /// Seconds per stage, summed over pages.
    pub timings: BTreeMap<Stage, f64>,
}

impl ProfileReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Default)]
struct ProfileState {
    stages: Vec<StageTiming>,
    pdf_type: Option<PdfType>,
    pages: u32,
    size_bytes: u64,
}

/// Collects timings for a single run.
#[derive(Debug)]
pub struct StageProfiler {
    started: Instant,
    state: RefCell<ProfileState>,
}

impl Default for StageProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl StageProfiler {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: RefCell::new(ProfileState::default()),
        }
    }

    pub fn report(&self) -> ProfileReport {
        self.report_with_total(self.started.elapsed())
    }

    fn report_with_total(&self, total: Duration) -> ProfileReport {
        let state = self.state.borrow();
        let total_secs = total.as_secs_f64();
        let size_mb = state.size_bytes as f64 / (1024.0 * 1024.0);
        let per_second = |amount: f64| if total_secs > 0.0 { round(amount / total_secs, 2) } else { 0.0 };

        let mut timings = BTreeMap::new();
        for timing in &state.stages {
            *timings.entry(timing.stage).or_insert(0.0) += timing.seconds;
        }

        ProfileReport {
            timestamp: Utc::now(),
            total_time_seconds: round(total_secs, 3),
            pdf: PdfProfile {
                pdf_type: state.pdf_type,
                num_pages: state.pages,
                file_size_mb: round(size_mb, 2),
                pages_per_second: per_second(f64::from(state.pages)),
                mb_per_second: per_second(size_mb),
            },
            stages: state.stages.clone(),
            timings: timings.into_iter().map(|(k, v)| (k, round(v, 3))).collect(),
        }
    }
}

impl StageObserver for StageProfiler {
    fn stage_finished(&self, stage: Stage, page: Option<u32>, elapsed: Duration) {
        self.state.borrow_mut().stages.push(StageTiming {
            stage,
            page,
            seconds: elapsed.as_secs_f64(),
        });
    }

    fn document_info(&self, pdf_type: PdfType, pages: u32, size_bytes: u64) {
        let mut state = self.state.borrow_mut();
        state.pdf_type = Some(pdf_type);
        state.pages = pages;
        state.size_bytes = size_bytes;
    }
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_are_summed_per_stage() {
        let profiler = StageProfiler::new();
        profiler.document_info(PdfType::Scanned, 4, 2 * 1024 * 1024);
        profiler.stage_finished(Stage::Recognize, Some(1), Duration::from_millis(1500));
        profiler.stage_finished(Stage::Recognize, Some(2), Duration::from_millis(500));
        profiler.stage_finished(Stage::Classify, None, Duration::from_millis(20));

        let report = profiler.report_with_total(Duration::from_secs(2));
        assert_eq!(report.timings[&Stage::Recognize], 2.0);
        assert_eq!(report.timings[&Stage::Classify], 0.02);
        assert_eq!(report.stages.len(), 3);
        assert_eq!(report.pdf.pages_per_second, 2.0);
        assert_eq!(report.pdf.mb_per_second, 1.0);
    }

    #[test]
    fn report_serializes_stage_names() {
        let profiler = StageProfiler::new();
        timed(&profiler, Stage::SplitWords, Some(3), || ());
        let json = profiler.report().to_json().unwrap();
        assert!(json.contains("\"split_words\""));
        assert!(json.contains("\"page\": 3"));
    }

    #[test]
    fn zero_duration_run_has_no_rates() {
        let report = StageProfiler::new().report_with_total(Duration::ZERO);
        assert_eq!(report.pdf.pages_per_second, 0.0);
    }
}
