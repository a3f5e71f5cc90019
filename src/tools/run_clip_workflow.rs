/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 06/07/2024
Last Modified: 03/02/2025
License: MIT
*/

use crate::clipping::{self, ExecuteOptions, PdalClipEngine};
use crate::configs;
use crate::crs;
use crate::tindex::{self, PdalBoundaryEngine, TindexBuildOptions};
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, ConsoleReporter, ProgressReporter};
use crate::vector;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Runs the whole clipping workflow from a saved configuration file: the
/// tile index is built first when it does not exist yet (using the
/// configured root directories), then every polygon is clipped exactly as
/// `ClipToPolygons` would. Keeping the run description in a file makes the
/// job repeatable after new tiles arrive.
pub struct RunClipWorkflow {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl RunClipWorkflow {
    pub fn new() -> RunClipWorkflow {
        // public constructor
        let name = "RunClipWorkflow".to_string();
        let description =
            "Runs a complete clipping workflow from a configuration file.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Configuration File".to_string(),
            flags: vec!["-c".to_owned(), "--config".to_string()],
            description: format!(
                "Run configuration file; a directory is searched for {}.",
                configs::DEFAULT_CONFIG_NAME
            ),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Json),
            default_value: None,
            optional: false,
        });

        let usage = format!(
            ">>.*lasclip -r={} -v --wd=\"*path*to*data*\" -c=lasclip_config.json",
            name
        );

        RunClipWorkflow {
            name: name,
            description: description,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl LasClipTool for RunClipWorkflow {
    fn get_tool_name(&self) -> String {
        self.name.clone()
    }

    fn get_tool_description(&self) -> String {
        self.description.clone()
    }

    fn get_tool_parameters(&self) -> String {
        parameters_to_json(&self.parameters)
    }

    fn get_example_usage(&self) -> String {
        self.example_usage.clone()
    }

    fn run<'a>(
        &self,
        args: Vec<String>,
        working_directory: &'a str,
        verbose: bool,
    ) -> Result<(), Error> {
        let mut config_file = String::new();

        // read the arguments
        if args.len() == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Tool run with no parameters.",
            ));
        }
        for i in 0..args.len() {
            let mut arg = args[i].replace("\"", "");
            arg = arg.replace("\'", "");
            let cmd = arg.split("="); // in case an equals sign was used
            let vec = cmd.collect::<Vec<&str>>();
            let mut keyval = false;
            if vec.len() > 1 {
                keyval = true;
            }
            let flag_val = vec[0].to_lowercase().replace("--", "-");
            if flag_val == "-c" || flag_val == "-config" {
                config_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            }
        }

        let start = Instant::now();
        if verbose {
            print_welcome(&self.get_tool_name());
        }

        config_file = resolve_path(&config_file, working_directory);
        let config = configs::get_config(Path::new(&config_file))?;
        let reporter = ConsoleReporter::new(verbose);

        let polygons_file = resolve_path(&config.polygons, working_directory);
        let tindex_file = resolve_path(&config.tindex_path, working_directory);
        let output_dir = resolve_path(&config.output_dir, working_directory);

        // stage 1: the tile index, built only when absent
        let tindex_path = Path::new(&tindex_file);
        if !tindex_path.exists() {
            reporter.log(&format!(
                "Tile index {} not found; building it",
                tindex_path.display()
            ));
            let roots: Vec<PathBuf> = config
                .las_roots
                .iter()
                .map(|r| PathBuf::from(resolve_path(r, working_directory)))
                .collect();
            let options = TindexBuildOptions {
                layer: config.tindex_layer.clone(),
                crs: None,
                fast_boundary: config.fast_boundary,
                overwrite: config.overwrite,
            };
            tindex::build_tile_index(
                &roots,
                tindex_path,
                &options,
                &PdalBoundaryEngine,
                &reporter,
            )?;
        }

        // stage 2: the clip run itself
        let polygons = vector::read_polygons(
            Path::new(&polygons_file),
            config.polygons_layer.as_deref(),
        )?;
        reporter.log(&format!("Read {} polygons", polygons.num_records()));
        let index = tindex::read_tile_index(tindex_path, Some(&config.tindex_layer))?;
        reporter.log(&format!(
            "Tile index holds {} tiles ({})",
            index.num_tiles(),
            index.crs
        ));

        let matches = clipping::match_polygons_to_tiles(&polygons, &index, config.crs_policy)?;
        let (plans, skipped) = clipping::plan_outputs(
            &polygons,
            &matches,
            Path::new(&output_dir),
            config.name_field.as_deref(),
            config.suffix.as_deref(),
        );
        for polygon_id in &skipped {
            reporter.log(&format!(
                "Polygon {} intersects no tiles; skipping",
                polygon_id
            ));
        }

        if config.dry_run {
            println!("{}", clipping::describe_plans(&plans, skipped.len()));
        } else {
            let out_srs = crs::canonicalize(polygons.crs())?.to_string();
            let options = ExecuteOptions {
                overwrite: config.overwrite,
                out_srs: Some(out_srs),
            };
            let records =
                clipping::execute(&polygons, &plans, &PdalClipEngine, &options, &reporter);
            println!("{}", clipping::summarize(&records, skipped.len()));
        }

        if verbose {
            println!(
                "{}",
                &format!("Elapsed Time: {}", get_formatted_elapsed_time(start))
            );
        }
        Ok(())
    }
}
