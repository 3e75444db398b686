//! Terminal progress indicator
//!
//! A spinner showing the running counters of the current stage. The structured
//! `tracing` events are the record of progress; this is only for interactive
//! runs and is a no-op when disabled.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Clone)]
pub struct Progress {
    bar: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: enabled.then(create_spinner),
        }
    }

    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn stage(&self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.into());
        }
    }

    pub fn rows(&self, table: &str, processed: u64, accepted: u64) {
        self.stage(format_rows(table, processed, accepted));
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn format_rows(table: &str, processed: u64, accepted: u64) -> String {
    format!("{}: {} processed, {} accepted", table, processed, accepted)
}
