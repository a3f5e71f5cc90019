/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 22/06/2024
Last Modified: 14/12/2024
License: MIT
*/

use crate::tindex;
use crate::tools::*;
use crate::utils::get_formatted_elapsed_time;
use std::io::{Error, ErrorKind};
use std::path::Path;
use std::time::Instant;

/// Checks that an existing tile index is usable for clipping and prints its
/// layer, feature count, CRS, and a sample of the indexed paths. The same
/// validation runs implicitly at the start of every clipping job; this tool
/// runs it on its own.
pub struct ValidateTileIndex {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl ValidateTileIndex {
    pub fn new() -> ValidateTileIndex {
        // public constructor
        let name = "ValidateTileIndex".to_string();
        let description =
            "Validates a tile index and reports its contents.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input Tile Index".to_string(),
            flags: vec!["-i".to_owned(), "--input".to_string()],
            description: "Input tile index file.".to_string(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Json),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Layer Name".to_owned(),
            flags: vec!["--layer".to_owned()],
            description: "Expected layer name within the index.".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some(tindex::DEFAULT_LAYER.to_string()),
            optional: true,
        });

        let usage = format!(
            ">>.*lasclip -r={} -v --wd=\"*path*to*data*\" -i=tindex.json",
            name
        );

        ValidateTileIndex {
            name: name,
            description: description,
            parameters: parameters,
            example_usage: usage,
        }
    }
}

impl LasClipTool for ValidateTileIndex {
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
        let mut input_file = String::new();
        let mut layer = String::new();

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
            if flag_val == "-i" || flag_val == "-input" {
                input_file = if keyval {
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
            }
        }

        let start = Instant::now();
        if verbose {
            print_welcome(&self.get_tool_name());
        }

        input_file = resolve_path(&input_file, working_directory);
        let layer_arg = if layer.is_empty() {
            None
        } else {
            Some(layer.as_str())
        };

        let lines = tindex::describe_tile_index(Path::new(&input_file), layer_arg)?;
        for line in lines {
            println!("{}", line);
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
