//! The three remote-callable tools. Every outcome a caller can act on is
//! reported as text; only allow-list loading failures escape as errors.

use crate::fs_move::{self, MoveOptions};
use anyhow::{anyhow, Result};
use dirscout_core::{AllowListSource, Resolution, ResolveError, Resolver, SearchSpec};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_EXTENSION: &str = ".*";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddArgs {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFilesArgs {
    pub directory_name: String,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub ignore_dirs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveFilesArgs {
    pub src: String,
    pub dest: String,
    #[serde(default)]
    pub base_dir: Option<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub extension: Option<String>,
}

enum Located {
    Dir(PathBuf),
    NotFound,
    Invalid(ResolveError),
}

pub struct ToolBox<S> {
    resolver: Resolver<S>,
    moves: MoveOptions,
}

impl<S: AllowListSource> ToolBox<S> {
    pub fn new(resolver: Resolver<S>, moves: MoveOptions) -> Self {
        Self { resolver, moves }
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    pub fn descriptors() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor {
                name: "add".into(),
                description: "Add two numbers".into(),
                input_schema: json!({"type":"object","properties":{"a":{"type":"integer"},"b":{"type":"integer"}},"required":["a","b"],"additionalProperties":false}),
            },
            ToolDescriptor {
                name: "list_files".into(),
                description: "List the entries of a directory found by name, e.g. \"Desktop/images\", inside the allowed directories".into(),
                input_schema: json!({"type":"object","properties":{"directory_name":{"type":"string"},"base_dir":{"type":"string"},"ignore_dirs":{"type":"array","items":{"type":"string"}}},"required":["directory_name"],"additionalProperties":false}),
            },
            ToolDescriptor {
                name: "move_files".into(),
                description: "Move files matching an optional extension from one directory to another, both found by name inside the allowed directories".into(),
                input_schema: json!({"type":"object","properties":{"src":{"type":"string"},"dest":{"type":"string"},"base_dir":{"type":"string"},"recursive":{"type":"boolean"},"extension":{"type":"string"}},"required":["src","dest"],"additionalProperties":false}),
            },
        ]
    }

    pub fn call(&self, name: &str, args: Value) -> Result<String> {
        let args = if args.is_null() { json!({}) } else { args };
        debug!(tool = name, "call");
        match name {
            "add" => Ok(add(serde_json::from_value(args)?)),
            "list_files" => self.list_files(serde_json::from_value(args)?),
            "move_files" => self.move_files(serde_json::from_value(args)?),
            _ => Err(anyhow!("unknown tool: {name}")),
        }
    }

    pub fn list_files(&self, args: ListFilesArgs) -> Result<String> {
        let spec = SearchSpec::new(&args.directory_name)
            .with_base_dir(args.base_dir.map(PathBuf::from))
            .with_ignore_dirs(args.ignore_dirs.unwrap_or_default());
        let dir = match self.locate(&spec)? {
            Located::Dir(dir) => dir,
            Located::NotFound => {
                return Ok(format!("Directory '{}' not found.", args.directory_name))
            }
            Located::Invalid(err) => {
                return Ok(format!(
                    "Invalid directory name '{}': {}",
                    args.directory_name, err
                ))
            }
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                return Ok(format!(
                    "Directory '{}' could not be read: {}",
                    dir.display(),
                    err
                ))
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        if names.is_empty() {
            return Ok(format!("Directory '{}' is empty.", dir.display()));
        }
        names.sort();
        Ok(names.join("\n"))
    }

    pub fn move_files(&self, args: MoveFilesArgs) -> Result<String> {
        let base_dir = args.base_dir.map(PathBuf::from);
        let src = match self.locate(&SearchSpec::new(&args.src).with_base_dir(base_dir.clone()))? {
            Located::Dir(dir) => dir,
            Located::NotFound => {
                return Ok(format!(
                    "Source directory '{}' could not be found. Is the location correct?",
                    args.src
                ))
            }
            Located::Invalid(err) => {
                return Ok(format!("Invalid source directory '{}': {}", args.src, err))
            }
        };
        let dest = match self.locate(&SearchSpec::new(&args.dest).with_base_dir(base_dir))? {
            Located::Dir(dir) => dir,
            Located::NotFound => {
                return Ok(format!(
                    "Destination directory '{}' could not be found. Do you want me to create a destination directory?",
                    args.dest
                ))
            }
            Located::Invalid(err) => {
                return Ok(format!(
                    "Invalid destination directory '{}': {}",
                    args.dest, err
                ))
            }
        };
        if src == dest {
            return Ok(format!(
                "Source and destination are the same directory '{}'; nothing to move.",
                src.display()
            ));
        }

        let extension = args.extension.as_deref().unwrap_or(DEFAULT_EXTENSION);
        let matcher = match fs_move::extension_matcher(extension) {
            Ok(m) => m,
            Err(err) => return Ok(format!("Invalid extension '{}': {}", extension, err)),
        };
        let files = fs_move::collect_files(&src, &dest, args.recursive, &matcher);
        let report = fs_move::move_all(&files, &dest, &self.moves);
        info!(
            src = %src.display(),
            dest = %dest.display(),
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "move_files complete"
        );
        Ok(report.summary(&src, &dest))
    }

    fn locate(&self, spec: &SearchSpec) -> Result<Located, ResolveError> {
        match self.resolver.resolve(spec) {
            Ok(Resolution::Found(dir)) => Ok(Located::Dir(dir)),
            Ok(Resolution::NotFound) => Ok(Located::NotFound),
            Err(err) if err.is_invalid_name() => Ok(Located::Invalid(err)),
            Err(err) => Err(err),
        }
    }
}

pub fn add(args: AddArgs) -> String {
    match args.a.checked_add(args.b) {
        Some(sum) => format!("The sum of {} and {} is {}", args.a, args.b, sum),
        None => format!("The sum of {} and {} does not fit in a 64-bit integer", args.a, args.b),
    }
}
