/*
This code is part of the LasClip batch clipping engine.
Authors: LasClip Developers
Created: 18/05/2024
Last Modified: 03/02/2025
License: MIT
*/

/*!
LasClip is a command-line engine for batch-clipping point-cloud tiles to
polygon footprints. A tile index is built once over the tile directories;
every polygon in a dataset is then clipped from the tiles it intersects,
producing one output file per polygon. The following commands are recognized:

| Command           | Description                                                                |
| ----------------- | -------------------------------------------------------------------------- |
| --cd, --wd        | Changes the working directory; used in conjunction with --run flag.        |
| -h, --help        | Prints help information.                                                   |
| -l, --license     | Prints the LasClip license.                                                |
| --listtools       | Lists all available tools. Keywords may also be used, --listtools clip.    |
| -r, --run         | Runs a tool; used in conjunction with --cd flag; -r="ClipToPolygons".      |
| --toolhelp        | Prints the help associated with a tool; --toolhelp="BuildTileIndex".       |
| --toolparameters  | Prints the parameters (in json form) for a tool; --toolparameters="ClipToPolygons". |
| -v                | Verbose mode. Without this flag, tool outputs will not be printed.         |
| --version         | Prints the version information.                                            |

*/

pub mod algorithms;
pub mod clipping;
pub mod configs;
pub mod crs;
pub mod structures;
pub mod tindex;
pub mod tools;
pub mod utils;
pub mod vector;

use crate::tools::ToolManager;
use std::env;
use std::io::Error;
use std::path;
use std::process;

#[macro_use]
extern crate serde_derive;

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
}

fn run() -> Result<(), Error> {
    let sep: &str = &path::MAIN_SEPARATOR.to_string();
    let mut working_dir = String::new();
    let mut tool_name = String::new();
    let mut run_tool = false;
    let mut tool_help = false;
    let mut tool_parameters = false;
    let mut list_tools = false;
    let mut verbose = false;
    let mut keywords: Vec<String> = vec![];
    let mut tool_args_vec: Vec<String> = vec![];
    let mut finding_working_dir = false;
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        version();
        help();
        let tm = ToolManager::new(&working_dir, &false)?;
        tm.list_tools();
        return Ok(());
    }

    for arg in args {
        let flag_val = arg.to_lowercase().replace("--", "-");
        if flag_val == "-h" || flag_val == "-help" {
            help();
            return Ok(());
        } else if flag_val.starts_with("-cd")
            || flag_val.starts_with("-wd")
            || flag_val.starts_with("-working_directory")
        {
            let mut v = arg
                .replace("--cd", "")
                .replace("--wd", "")
                .replace("--working_directory", "")
                .replace("-cd", "")
                .replace("-wd", "")
                .replace("-working_directory", "")
                .replace("\"", "")
                .replace("\'", "");
            if v.starts_with("=") {
                v = v[1..v.len()].to_string();
            }
            if v.trim().is_empty() {
                finding_working_dir = true;
            }
            if !v.ends_with(sep) {
                v.push_str(sep);
            }
            working_dir = v.to_string();
        } else if arg.starts_with("-run") || arg.starts_with("--run") || arg.starts_with("-r") {
            let mut v = arg
                .replace("--run", "")
                .replace("-run", "")
                .replace("-r", "")
                .replace("\"", "")
                .replace("\'", "");
            if v.starts_with("=") {
                v = v[1..v.len()].to_string();
            }
            tool_name = v;
            run_tool = true;
        } else if arg.starts_with("-toolhelp") || arg.starts_with("--toolhelp") {
            let mut v = arg
                .replace("--toolhelp", "")
                .replace("-toolhelp", "")
                .replace("\"", "")
                .replace("\'", "");
            if v.starts_with("=") {
                v = v[1..v.len()].to_string();
            }
            tool_name = v;
            tool_help = true;
        } else if arg.starts_with("-toolparameters") || arg.starts_with("--toolparameters") {
            let mut v = arg
                .replace("--toolparameters", "")
                .replace("-toolparameters", "")
                .replace("\"", "")
                .replace("\'", "");
            if v.starts_with("=") {
                v = v[1..v.len()].to_string();
            }
            tool_name = v;
            tool_parameters = true;
        } else if arg.starts_with("-listtools")
            || arg.starts_with("--listtools")
            || arg.starts_with("-list_tools")
            || arg.starts_with("--list_tools")
        {
            list_tools = true;
        } else if arg.starts_with("-license")
            || arg.starts_with("-licence")
            || arg.starts_with("--license")
            || arg.starts_with("--licence")
            || arg == "-l"
        {
            license();
            return Ok(());
        } else if arg.starts_with("-v") || arg.starts_with("--verbose") {
            let mut v = arg
                .replace("-v", "")
                .replace("--verbose", "")
                .replace("-verbose", "")
                .replace("\"", "")
                .replace("\'", "");
            if v.starts_with("=") {
                v = v[1..v.len()].to_string();
            }
            if v.to_lowercase().contains("t") || v.is_empty() {
                verbose = true;
            }
        } else if arg.starts_with("-version") || arg.starts_with("--version") {
            version();
            return Ok(());
        } else if arg.starts_with("-") {
            // it's an arg to be fed to the tool
            tool_args_vec.push(arg.trim().to_string().clone());
        } else if !arg.contains("lasclip") {
            // add it to the keywords list
            keywords.push(
                arg.trim()
                    .replace("\"", "")
                    .replace("\'", "")
                    .to_string()
                    .clone(),
            );
            if finding_working_dir {
                working_dir = arg.trim().to_string().clone();
                finding_working_dir = false;
            } else if tool_args_vec.len() > 0 {
                tool_args_vec.push(arg.trim().to_string().clone());
            }
        }
    }

    let tm = ToolManager::new(&working_dir, &verbose)?;
    if run_tool {
        if tool_name.is_empty() && keywords.len() > 0 {
            tool_name = keywords[0].clone();
        }
        return tm.run_tool(tool_name, tool_args_vec);
    } else if tool_help {
        if tool_name.is_empty() && keywords.len() > 0 {
            tool_name = keywords[0].clone();
        }
        return tm.tool_help(tool_name);
    } else if tool_parameters {
        if tool_name.is_empty() && keywords.len() > 0 {
            tool_name = keywords[0].clone();
        }
        return tm.tool_parameters(tool_name);
    } else if list_tools {
        if keywords.len() == 0 {
            tm.list_tools();
        } else {
            tm.list_tools_with_keywords(keywords);
        }
    }

    Ok(())
}

fn help() {
    let mut ext = "";
    if cfg!(target_os = "windows") {
        ext = ".exe";
    }

    let exe_name = &format!("lasclip{}", ext);
    let sep: String = path::MAIN_SEPARATOR.to_string();
    let s = "LasClip Help

The following commands are recognized:
--cd, --wd          Changes the working directory; used in conjunction with --run flag.
-h, --help          Prints help information.
-l, --license       Prints the LasClip license.
--listtools         Lists all available tools. Keywords may also be used, --listtools clip.
-r, --run           Runs a tool; used in conjunction with --wd flag; -r=\"ClipToPolygons\".
--toolhelp          Prints the help associated with a tool; --toolhelp=\"BuildTileIndex\".
--toolparameters    Prints the parameters (in json form) for a specific tool; --toolparameters=\"ClipToPolygons\".
-v                  Verbose mode. Without this flag, tool outputs will not be printed.
--version           Prints the version information.

Example Usage:
>> .*EXE_NAME -r=ClipToPolygons --cd=\"*path*to*data*\" -p=stands.geojson -t=tindex.json -o=clips -v
"
    .replace("*", &sep)
    .replace("EXE_NAME", exe_name);
    println!("{}", s);
}

fn license() {
    let license_text = "LasClip License
Copyright 2024-2025 LasClip Developers

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the \"Software\"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense,
and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so,
subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES
OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.";
    println!("{}", license_text);
}

fn version() {
    const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
    println!(
        "LasClip v{} (c) 2024-2025

LasClip is a batch clipping engine for airborne lidar point clouds. It
matches polygon footprints against an index of point-cloud tiles and cuts
one output file per polygon.",
        VERSION.unwrap_or("unknown")
    );
}
