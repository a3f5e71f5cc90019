/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 22/06/2024
Last Modified: 14/12/2024
License: MIT
*/
use crate::clipping::executor::{ClipRecord, ClipStatus};
use crate::clipping::planner::ClipPlan;

/// Renders a dry-run preview: what a run would write and skip, one line per
/// planned output with its tile count, without touching any file.
pub fn describe_plans(plans: &[ClipPlan], skipped_no_tiles: usize) -> String {
    let mut lines = vec![format!(
        "Dry run: {} outputs planned, {} skipped (no tiles)",
        plans.len(),
        skipped_no_tiles
    )];
    for plan in plans {
        lines.push(format!(
            "  polygon {} -> {} ({} tiles)",
            plan.polygon_id,
            plan.output_path.display(),
            plan.source_paths.len()
        ));
    }
    lines.join("\n")
}

/// Renders the end-of-run summary: one counts line, then a detail line for
/// every failed polygon so nothing has to be scraped out of earlier logs.
pub fn summarize(records: &[ClipRecord], skipped_no_tiles: usize) -> String {
    let mut written = 0;
    let mut existing = 0;
    let mut failed = 0;
    for record in records {
        match &record.status {
            ClipStatus::Written => written += 1,
            ClipStatus::Exists => existing += 1,
            ClipStatus::Error(_) => failed += 1,
        }
    }
    let mut lines = vec![format!(
        "Clip summary: {} written, {} already existed, {} skipped (no tiles), {} failed",
        written, existing, skipped_no_tiles, failed
    )];
    for record in records {
        if let ClipStatus::Error(message) = &record.status {
            lines.push(format!(
                "  polygon {} -> {}: {}",
                record.polygon_id,
                record.output_path.display(),
                message
            ));
        }
    }
    lines.join("\n")
}
