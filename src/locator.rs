use log::debug;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{BumpError, Result};

pub const PROJECT_FILE_NAME: &str = "project.pbxproj";

fn project_container_regex() -> Result<Regex> {
    Ok(Regex::new(r"(?i)\.xcodeproj$")?)
}

/// Turns a `.xcodeproj` bundle path into the `project.pbxproj` inside it. Any other path is
/// taken to already name the project file.
pub fn project_file(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_dir() || project_container_regex()?.is_match(&path.to_string_lossy()) {
        Ok(path.join(PROJECT_FILE_NAME))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Finds the single `*.xcodeproj` bundle directly inside `dir`.
pub fn locate_project(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    debug!("Scanning '{}' for project files", dir.display());
    let container_regex = project_container_regex()?;

    let mut candidates = Vec::new();
    for item in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let item = item.map_err(|err| BumpError::Io(err.into()))?;
        if container_regex.is_match(&item.file_name().to_string_lossy()) {
            candidates.push(item.into_path());
        }
    }
    candidates.sort();
    debug!("Found project files: {:?}", candidates);

    match candidates.len() {
        0 => Err(BumpError::Discovery(
            "Unable to find project file. Specify one with --path".into(),
        )),
        1 => Ok(candidates.remove(0)),
        _ => Err(BumpError::Discovery(
            "Found more than one project file. Specify one with --path".into(),
        )),
    }
}

/// Resolves the `project.pbxproj` to operate on: `explicit` relative to `cwd` when given,
/// otherwise the single project bundle found in `cwd`.
pub fn resolve_project(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let container = match explicit {
        Some(path) => cwd.join(path),
        None => locate_project(cwd)?,
    };
    project_file(container)
}
