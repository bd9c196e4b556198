use clap::Parser;
use std::path::PathBuf;

/// Bumps the marketing version and build number of an Xcode project.
///
/// `--version` sets the marketing version instead of printing the tool's own version.
#[derive(Debug, Parser)]
#[command(author, about, bin_name = "xcbump", disable_version_flag = true)]
pub struct Arguments {
    /// Path of the project file (`.xcodeproj` bundle or its `project.pbxproj`)
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Specific version to use
    #[arg(long)]
    pub version: Option<String>,
    /// Specific build to use
    #[arg(long)]
    pub build: Option<String>,
    /// Specifies whether the version bump should be committed and tagged
    #[arg(long)]
    pub tag: bool,
    #[arg(long, short)]
    pub verbose: bool,
}
