/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 22/06/2024
Last Modified: 03/02/2025
License: MIT
*/
use crate::clipping::planner::ClipPlan;
use crate::utils::ProgressReporter;
use crate::vector::PolygonDataset;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Outcome of one clip job.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipStatus {
    /// The output was produced in this run.
    Written,
    /// The output already existed and overwrite was not requested.
    Exists,
    /// The job failed; the message carries the engine's diagnostic text
    /// verbatim.
    Error(String),
}

/// The per-polygon result row feeding the end-of-run summary.
#[derive(Clone, Debug)]
pub struct ClipRecord {
    pub polygon_id: usize,
    pub output_path: PathBuf,
    pub source_count: usize,
    pub status: ClipStatus,
}

/// Everything an engine needs to run one clip.
#[derive(Clone, Debug)]
pub struct ClipRequest {
    pub polygon_wkt: String,
    pub source_paths: Vec<String>,
    pub output_path: PathBuf,
    /// CRS stamped onto the output; sources are read as-is.
    pub out_srs: Option<String>,
}

/// Runs one clip job. `Err` carries the tool's diagnostic text verbatim so
/// the summary can show the real cause.
pub trait ClipEngine {
    fn clip(&self, request: &ClipRequest) -> Result<(), String>;
}

/// PDAL-backed clipping: a reader per source tile, a crop filter carrying
/// the polygon, and a LAS writer forwarding the source header fields. The
/// pipeline is streamed over stdin so nothing is written beside the data.
pub struct PdalClipEngine;

impl PdalClipEngine {
    fn build_pipeline(&self, request: &ClipRequest) -> String {
        let mut stages: Vec<serde_json::Value> = request
            .source_paths
            .iter()
            .map(|path| {
                json!({
                    "type": "readers.las",
                    "filename": path,
                    "nosrs": true,
                })
            })
            .collect();
        stages.push(json!({
            "type": "filters.crop",
            "polygon": request.polygon_wkt,
        }));
        let mut writer = json!({
            "type": "writers.las",
            "filename": request.output_path.display().to_string(),
            "forward": "all",
        });
        if let Some(srs) = &request.out_srs {
            writer["a_srs"] = json!(srs);
        }
        stages.push(writer);
        json!({ "pipeline": stages }).to_string()
    }
}

impl ClipEngine for PdalClipEngine {
    fn clip(&self, request: &ClipRequest) -> Result<(), String> {
        let pipeline = self.build_pipeline(request);
        let mut child = Command::new("pdal")
            .arg("pipeline")
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to launch pdal: {}", e))?;
        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| "pdal stdin unavailable".to_string())?;
            stdin
                .write_all(pipeline.as_bytes())
                .map_err(|e| format!("failed to stream pipeline to pdal: {}", e))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| format!("pdal did not finish: {}", e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

/// Execution knobs that do not change which jobs exist.
#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
    /// Re-clip outputs that already exist.
    pub overwrite: bool,
    /// CRS stamped onto every output.
    pub out_srs: Option<String>,
}

/// Runs the planned jobs sequentially. One failed job never aborts the run;
/// its record carries the failure and execution moves on. The existence
/// check makes re-runs cheap: outputs present from an earlier run are
/// skipped unless overwrite is set.
pub fn execute(
    polygons: &PolygonDataset,
    plans: &[ClipPlan],
    engine: &dyn ClipEngine,
    options: &ExecuteOptions,
    reporter: &dyn ProgressReporter,
) -> Vec<ClipRecord> {
    let num_plans = plans.len();
    let mut records = Vec::with_capacity(num_plans);
    for (i, plan) in plans.iter().enumerate() {
        let status = run_one(polygons, plan, engine, options);
        if let ClipStatus::Error(message) = &status {
            reporter.log(&format!(
                "Clip failed for polygon {}: {}",
                plan.polygon_id, message
            ));
        }
        records.push(ClipRecord {
            polygon_id: plan.polygon_id,
            output_path: plan.output_path.clone(),
            source_count: plan.source_paths.len(),
            status: status,
        });
        if num_plans > 0 {
            reporter.progress(100 * (i + 1) / num_plans);
        }
    }
    records
}

fn run_one(
    polygons: &PolygonDataset,
    plan: &ClipPlan,
    engine: &dyn ClipEngine,
    options: &ExecuteOptions,
) -> ClipStatus {
    if !options.overwrite && plan.output_path.exists() {
        return ClipStatus::Exists;
    }
    if let Some(parent) = plan.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                return ClipStatus::Error(format!(
                    "could not create output directory {}: {}",
                    parent.display(),
                    e
                ));
            }
        }
    }
    let request = ClipRequest {
        polygon_wkt: polygons.get_record(plan.polygon_id).geometry.to_wkt(),
        source_paths: plan.source_paths.clone(),
        output_path: plan.output_path.clone(),
        out_srs: options.out_srs.clone(),
    };
    match engine.clip(&request) {
        Ok(()) => ClipStatus::Written,
        Err(message) => ClipStatus::Error(message),
    }
}
