/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 06/07/2024
Last Modified: 03/02/2025
License: MIT
*/

use crate::clipping::{self, ExecuteOptions, PdalClipEngine};
use crate::crs::{self, CrsPolicy};
use crate::tindex;
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, ConsoleReporter, ProgressReporter};
use crate::vector;
use std::io::{Error, ErrorKind};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

/// Clips point-cloud tiles to every polygon in a dataset. Each polygon gets
/// one output file built from the tiles its geometry intersects, named from
/// a chosen attribute field with a `polygon_{id}` fallback. Polygons with no
/// tile coverage are reported as skipped, a failed clip never stops the run,
/// and outputs that already exist are left alone unless `--overwrite` is
/// given, so an interrupted run can simply be restarted.
pub struct ClipToPolygons {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl ClipToPolygons {
    pub fn new() -> ClipToPolygons {
        // public constructor
        let name = "ClipToPolygons".to_string();
        let description =
            "Clips indexed point-cloud tiles to every polygon in a dataset.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input Polygon File".to_string(),
            flags: vec!["-p".to_owned(), "--polygons".to_string()],
            description: "Input polygon file (GeoJSON).".to_string(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Vector(
                VectorGeometryType::Polygon,
            )),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Polygon Layer".to_owned(),
            flags: vec!["--layer".to_owned()],
            description: "Layer within the polygon source, for formats with layers.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Tile Index".to_owned(),
            flags: vec!["-t".to_owned(), "--tindex".to_owned()],
            description: "Tile index file produced by BuildTileIndex.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Json),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Tile Index Layer".to_owned(),
            flags: vec!["--tindex_layer".to_owned()],
            description: "Expected layer name within the tile index.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some(tindex::DEFAULT_LAYER.to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Directory".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Directory receiving the clipped outputs.".to_owned(),
            parameter_type: ParameterType::Directory,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Name Field".to_owned(),
            flags: vec!["--name_field".to_owned()],
            description: "Attribute field used to name outputs; feature id is the fallback.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Name Suffix".to_owned(),
            flags: vec!["--suffix".to_owned()],
            description: "Extra token appended to every output name.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "CRS Policy".to_owned(),
            flags: vec!["--crs_policy".to_owned()],
            description: "How a polygon/tile-index CRS mismatch is handled.".to_owned(),
            parameter_type: ParameterType::OptionList(vec![
                "strict".to_string(),
                "reproject".to_string(),
            ]),
            default_value: Some("strict".to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Overwrite Existing Outputs".to_owned(),
            flags: vec!["--overwrite".to_owned()],
            description: "Re-clip outputs that already exist.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Dry Run".to_owned(),
            flags: vec!["--dry_run".to_owned()],
            description: "Report what would be written without clipping anything.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_string()),
            optional: true,
        });

        let usage = format!(
            ">>.*lasclip -r={} -v --wd=\"*path*to*data*\" -p=stands.geojson -t=tindex.json -o=clips --name_field=name",
            name
        );

        ClipToPolygons {
            name: name,
            description: description,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl LasClipTool for ClipToPolygons {
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
        let mut polygons_file = String::new();
        let mut polygons_layer = String::new();
        let mut tindex_file = String::new();
        let mut tindex_layer = tindex::DEFAULT_LAYER.to_string();
        let mut output_dir = String::new();
        let mut name_field = String::new();
        let mut suffix = String::new();
        let mut crs_policy = "strict".to_string();
        let mut overwrite = false;
        let mut dry_run = false;

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
            if flag_val == "-p" || flag_val == "-polygons" {
                polygons_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-layer" {
                polygons_layer = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-t" || flag_val == "-tindex" {
                tindex_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-tindexlayer" || flag_val == "-tindex_layer" {
                tindex_layer = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-o" || flag_val == "-output" {
                output_dir = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-namefield" || flag_val == "-name_field" {
                name_field = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-suffix" {
                suffix = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-crspolicy" || flag_val == "-crs_policy" {
                crs_policy = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-overwrite" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    overwrite = true;
                }
            } else if flag_val == "-dryrun" || flag_val == "-dry_run" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    dry_run = true;
                }
            }
        }

        let start = Instant::now();
        if verbose {
            print_welcome(&self.get_tool_name());
        }

        polygons_file = resolve_path(&polygons_file, working_directory);
        tindex_file = resolve_path(&tindex_file, working_directory);
        output_dir = resolve_path(&output_dir, working_directory);
        if output_dir.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "An output directory must be specified.",
            ));
        }
        let policy = CrsPolicy::from_str(&crs_policy)?;

        let reporter = ConsoleReporter::new(verbose);
        let polygons = vector::read_polygons(
            Path::new(&polygons_file),
            if polygons_layer.is_empty() {
                None
            } else {
                Some(polygons_layer.as_str())
            },
        )?;
        reporter.log(&format!("Read {} polygons", polygons.num_records()));

        let index = tindex::read_tile_index(Path::new(&tindex_file), Some(&tindex_layer))?;
        reporter.log(&format!(
            "Tile index holds {} tiles ({})",
            index.num_tiles(),
            index.crs
        ));

        let matches = clipping::match_polygons_to_tiles(&polygons, &index, policy)?;
        let (plans, skipped) = clipping::plan_outputs(
            &polygons,
            &matches,
            Path::new(&output_dir),
            if name_field.is_empty() {
                None
            } else {
                Some(name_field.as_str())
            },
            if suffix.is_empty() {
                None
            } else {
                Some(suffix.as_str())
            },
        );
        for polygon_id in &skipped {
            reporter.log(&format!(
                "Polygon {} intersects no tiles; skipping",
                polygon_id
            ));
        }

        if dry_run {
            println!("{}", clipping::describe_plans(&plans, skipped.len()));
        } else {
            let out_srs = crs::canonicalize(polygons.crs())?.to_string();
            let options = ExecuteOptions {
                overwrite: overwrite,
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
