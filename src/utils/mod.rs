/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 12/05/2024
Last Modified: 03/02/2025
License: MIT
*/
use std::cell::Cell;
use std::time::Instant;

/// Returns a formatted string of elapsed time, e.g. `1min 34.852s`.
pub fn get_formatted_elapsed_time(instant: Instant) -> String {
    let dur = instant.elapsed();
    let minutes = dur.as_secs() / 60;
    let sub_sec = dur.as_secs() % 60;
    let sub_milli = dur.subsec_millis();
    if minutes > 0 {
        return format!("{}min {}.{}s", minutes, sub_sec, sub_milli);
    }
    format!("{}.{}s", sub_sec, sub_milli)
}

/// Observational reporting hook handed to the matcher and executor. Progress
/// has no bearing on correctness; implementations must not fail.
pub trait ProgressReporter {
    fn log(&self, message: &str);
    fn progress(&self, percent: usize);
}

/// Console implementation, printing only in verbose mode and only when the
/// percentage actually changes.
pub struct ConsoleReporter {
    verbose: bool,
    old_progress: Cell<usize>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> ConsoleReporter {
        ConsoleReporter {
            verbose: verbose,
            old_progress: Cell::new(usize::MAX),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn log(&self, message: &str) {
        if self.verbose {
            println!("{}", message);
        }
    }

    fn progress(&self, percent: usize) {
        if self.verbose && percent != self.old_progress.get() {
            println!("Progress: {}%", percent);
            self.old_progress.set(percent);
        }
    }
}

/// No-op reporter used by tests and non-interactive callers.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn log(&self, _message: &str) {}
    fn progress(&self, _percent: usize) {}
}
