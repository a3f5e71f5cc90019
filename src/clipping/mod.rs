/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 09/06/2024
Last Modified: 03/02/2025
License: MIT
*/

// private sub-modules defined in other files
mod executor;
mod matcher;
mod naming;
mod planner;
mod report;

pub use self::executor::{
    execute, ClipEngine, ClipRecord, ClipRequest, ClipStatus, ExecuteOptions, PdalClipEngine,
};
pub use self::matcher::{match_polygons_to_tiles, PolygonSources, SelectionError};
pub use self::naming::{resolve_name, sanitize};
pub use self::planner::{plan_outputs, ClipPlan};
pub use self::report::{describe_plans, summarize};
