/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 22/06/2024
Last Modified: 03/02/2025
License: MIT
*/

use crate::tindex::{self, PdalBoundaryEngine, TindexBuildOptions};
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, ConsoleReporter};
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Scans one or more directories for point-cloud tiles (`.las`, `.laz`,
/// `.zlidar`), derives a footprint for each, and writes the tile index the
/// clipping tools match against. Footprints default to the fast bounding-box
/// form; `--exact` derives the true boundary instead, which is slower but
/// avoids selecting tiles that only touch a polygon's bounding box.
pub struct BuildTileIndex {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl BuildTileIndex {
    pub fn new() -> BuildTileIndex {
        // public constructor
        let name = "BuildTileIndex".to_string();
        let description =
            "Builds a tile index from directories of point-cloud tiles.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input Directories".to_string(),
            flags: vec!["-i".to_owned(), "--inputs".to_string()],
            description: "Root directories scanned for tiles, separated by ';'.".to_string(),
            parameter_type: ParameterType::DirectoryList,
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output Tile Index".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output tile index file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Json),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Layer Name".to_owned(),
            flags: vec!["--layer".to_owned()],
            description: "Layer name stored in the index.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some(tindex::DEFAULT_LAYER.to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "CRS Override".to_owned(),
            flags: vec!["--crs".to_owned()],
            description: "CRS recorded for the index (e.g. EPSG:26917); overrides anything the tiles report.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Exact Boundaries".to_owned(),
            flags: vec!["--exact".to_owned()],
            description: "Derive exact tile boundaries instead of bounding boxes.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_string()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Overwrite Existing Index".to_owned(),
            flags: vec!["--overwrite".to_owned()],
            description: "Replace the output file if it already exists.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_string()),
            optional: true,
        });

        let usage = format!(
            ">>.*lasclip -r={} -v --wd=\"*path*to*data*\" -i='las2023;las2024' -o=tindex.json --crs=EPSG:26917",
            name
        );

        BuildTileIndex {
            name: name,
            description: description,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl LasClipTool for BuildTileIndex {
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
        let mut input_dirs = String::new();
        let mut output_file = String::new();
        let mut layer = tindex::DEFAULT_LAYER.to_string();
        let mut crs = String::new();
        let mut exact = false;
        let mut overwrite = false;

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
            if flag_val == "-i" || flag_val == "-inputs" {
                input_dirs = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-o" || flag_val == "-output" {
                output_file = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-layer" {
                layer = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-crs" {
                crs = if keyval {
                    vec[1].to_string()
                } else {
                    args[i + 1].to_string()
                };
            } else if flag_val == "-exact" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    exact = true;
                }
            } else if flag_val == "-overwrite" {
                if vec.len() == 1 || !vec[1].to_string().to_lowercase().contains("false") {
                    overwrite = true;
                }
            }
        }

        let start = Instant::now();
        if verbose {
            print_welcome(&self.get_tool_name());
        }

        let mut cmd = input_dirs.split(";");
        let mut vec = cmd.collect::<Vec<&str>>();
        if vec.len() == 1 {
            cmd = input_dirs.split(",");
            vec = cmd.collect::<Vec<&str>>();
        }
        let roots: Vec<PathBuf> = vec
            .iter()
            .filter(|v| !v.trim().is_empty())
            .map(|v| PathBuf::from(resolve_path(v.trim(), working_directory)))
            .collect();
        output_file = resolve_path(&output_file, working_directory);
        if output_file.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "An output tile index file must be specified.",
            ));
        }

        let options = TindexBuildOptions {
            layer: layer,
            crs: if crs.is_empty() { None } else { Some(crs) },
            fast_boundary: !exact,
            overwrite: overwrite,
        };
        let reporter = ConsoleReporter::new(verbose);
        let index = tindex::build_tile_index(
            &roots,
            Path::new(&output_file),
            &options,
            &PdalBoundaryEngine,
            &reporter,
        )?;

        if verbose {
            println!("Tile index written with {} tiles ({})", index.num_tiles(), index.crs);
            println!(
                "{}",
                &format!("Elapsed Time: {}", get_formatted_elapsed_time(start))
            );
        }
        Ok(())
    }
}
