/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 22/06/2024
Last Modified: 03/02/2025
License: MIT
*/

mod build_tile_index;
mod clip_to_polygons;
mod list_polygon_fields;
mod run_clip_workflow;
mod validate_tile_index;

pub use self::build_tile_index::BuildTileIndex;
pub use self::clip_to_polygons::ClipToPolygons;
pub use self::list_polygon_fields::ListPolygonFields;
pub use self::run_clip_workflow::RunClipWorkflow;
pub use self::validate_tile_index::ValidateTileIndex;

use std::io::{Error, ErrorKind};

#[derive(Default)]
pub struct ToolManager {
    pub working_dir: String,
    pub verbose: bool,
    tool_names: Vec<String>,
}

impl ToolManager {
    pub fn new<'a>(
        working_directory: &'a str,
        verbose_mode: &'a bool,
    ) -> Result<ToolManager, Error> {
        let mut tool_names = vec![];
        tool_names.push("BuildTileIndex".to_string());
        tool_names.push("ClipToPolygons".to_string());
        tool_names.push("ListPolygonFields".to_string());
        tool_names.push("RunClipWorkflow".to_string());
        tool_names.push("ValidateTileIndex".to_string());

        let tm = ToolManager {
            working_dir: working_directory.to_string(),
            verbose: *verbose_mode,
            tool_names: tool_names,
        };
        Ok(tm)
    }

    fn get_tool(&self, tool_name: &str) -> Option<Box<dyn LasClipTool + 'static>> {
        match tool_name.to_lowercase().replace("_", "").as_ref() {
            "buildtileindex" => Some(Box::new(BuildTileIndex::new())),
            "cliptopolygons" => Some(Box::new(ClipToPolygons::new())),
            "listpolygonfields" => Some(Box::new(ListPolygonFields::new())),
            "runclipworkflow" => Some(Box::new(RunClipWorkflow::new())),
            "validatetileindex" => Some(Box::new(ValidateTileIndex::new())),
            _ => None,
        }
    }

    pub fn run_tool(&self, tool_name: String, args: Vec<String>) -> Result<(), Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => tool.run(args, &self.working_dir, self.verbose),
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("Unrecognized tool name {}.", tool_name),
            )),
        }
    }

    pub fn tool_help(&self, tool_name: String) -> Result<(), Error> {
        if !tool_name.is_empty() {
            match self.get_tool(tool_name.as_ref()) {
                Some(tool) => println!("{}", get_help(tool)?),
                None => {
                    return Err(Error::new(
                        ErrorKind::NotFound,
                        format!("Unrecognized tool name {}.", tool_name),
                    ))
                }
            }
        } else {
            let mut i = 1;
            for val in &self.tool_names {
                if let Some(tool) = self.get_tool(val) {
                    println!("{}. {}\n", i, get_help(tool)?);
                    i += 1;
                }
            }
        }
        Ok(())
    }

    pub fn tool_parameters(&self, tool_name: String) -> Result<(), Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => {
                println!("{}", tool.get_tool_parameters());
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("Unrecognized tool name {}.", tool_name),
            )),
        }
    }

    pub fn list_tools(&self) {
        let mut tool_details: Vec<(String, String)> = Vec::new();
        for val in &self.tool_names {
            if let Some(tool) = self.get_tool(val) {
                tool_details.push(get_name_and_description(tool));
            }
        }
        tool_details.sort();

        let mut ret = format!("All {} Available Tools:\n", tool_details.len());
        for i in 0..tool_details.len() {
            ret.push_str(&format!("{}: {}\n\n", tool_details[i].0, tool_details[i].1));
        }
        println!("{}", ret);
    }

    pub fn list_tools_with_keywords(&self, keywords: Vec<String>) {
        let mut tool_details: Vec<(String, String)> = Vec::new();
        for val in &self.tool_names {
            if let Some(tool) = self.get_tool(val) {
                let (nm, des) = get_name_and_description(tool);
                for kw in &keywords {
                    if nm.to_lowercase().contains(&(kw.to_lowercase()))
                        || des.to_lowercase().contains(&(kw.to_lowercase()))
                    {
                        tool_details.push((nm.clone(), des.clone()));
                        break;
                    }
                }
            }
        }

        let mut ret = format!("All {} Tools containing keywords:\n", tool_details.len());
        for i in 0..tool_details.len() {
            ret.push_str(&format!("{}: {}\n\n", tool_details[i].0, tool_details[i].1));
        }
        println!("{}", ret);
    }
}

pub trait LasClipTool {
    fn get_tool_name(&self) -> String;
    fn get_tool_description(&self) -> String;
    fn get_tool_parameters(&self) -> String;
    fn get_example_usage(&self) -> String;
    fn run<'a>(
        &self,
        args: Vec<String>,
        working_directory: &'a str,
        verbose: bool,
    ) -> Result<(), Error>;
}

fn get_help<'a>(wt: Box<dyn LasClipTool + 'a>) -> Result<String, Error> {
    let tool_name = wt.get_tool_name();
    let description = wt.get_tool_description();
    let parameters = wt.get_tool_parameters();
    let o: serde_json::Value = serde_json::from_str(&parameters)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
    let a = o["parameters"].as_array().cloned().unwrap_or_default();
    let mut p = String::new();
    p.push_str("Flag               Description\n");
    p.push_str("-----------------  -----------\n");
    for d in &a {
        let mut s = String::new();
        if let Some(flags) = d["flags"].as_array() {
            for f in flags {
                s.push_str(&format!("{}, ", f.as_str().unwrap_or("")));
            }
        }
        p.push_str(&format!(
            "{:width$} {}\n",
            s.trim().trim_matches(','),
            d["description"].as_str().unwrap_or(""),
            width = 18
        ));
    }
    let example = wt.get_example_usage();
    let s: String;
    if example.len() <= 1 {
        s = format!(
            "{}

Description:\n{}
Parameters:\n
{}
",
            tool_name, description, p
        );
    } else {
        s = format!(
            "{}
Description:\n{}
Parameters:\n
{}

Example usage:
{}
",
            tool_name, description, p, example
        );
    }
    Ok(s)
}

fn get_name_and_description<'a>(wt: Box<dyn LasClipTool + 'a>) -> (String, String) {
    (wt.get_tool_name(), wt.get_tool_description())
}

#[derive(Serialize, Deserialize, Debug)]
struct ToolParameter {
    name: String,
    flags: Vec<String>,
    description: String,
    parameter_type: ParameterType,
    default_value: Option<String>,
    optional: bool,
}

impl ToolParameter {
    pub fn to_string(&self) -> String {
        match serde_json::to_string(&self) {
            Ok(json_str) => json_str,
            Err(err) => format!("{:?}", err),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
enum ParameterType {
    Boolean,
    String,
    ExistingFile(ParameterFileType),
    NewFile(ParameterFileType),
    DirectoryList,
    Directory,
    OptionList(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug)]
enum ParameterFileType {
    Any,
    Json,
    Vector(VectorGeometryType),
}

#[derive(Serialize, Deserialize, Debug)]
enum VectorGeometryType {
    Any,
    Polygon,
}

/// Joins the parameter list into the `{"parameters": [...]}` document the
/// help and parameter queries print.
fn parameters_to_json(parameters: &[ToolParameter]) -> String {
    let mut s = String::from("{\"parameters\": [");
    for i in 0..parameters.len() {
        if i < parameters.len() - 1 {
            s.push_str(&(parameters[i].to_string()));
            s.push_str(",");
        } else {
            s.push_str(&(parameters[i].to_string()));
        }
    }
    s.push_str("]}");
    s
}

/// Prints the per-tool welcome banner used in verbose mode.
fn print_welcome(tool_name: &str) {
    let welcome_len = format!("* Welcome to {} *", tool_name).len().max(24);
    // 24 = length of the 'Powered by' statement.
    println!("{}", "*".repeat(welcome_len));
    println!(
        "* Welcome to {} {}*",
        tool_name,
        " ".repeat(welcome_len - 15 - tool_name.len())
    );
    println!("* Powered by LasClip {}*", " ".repeat(welcome_len - 22));
    println!("{}", "*".repeat(welcome_len));
}

/// Prefixes the working directory onto bare file names, the way every tool
/// resolves its path arguments.
fn resolve_path(value: &str, working_directory: &str) -> String {
    let sep = std::path::MAIN_SEPARATOR.to_string();
    if !value.is_empty() && !value.contains(&sep) && !value.contains("/") {
        format!("{}{}", working_directory, value)
    } else {
        value.to_string()
    }
}
