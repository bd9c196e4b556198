//! The bump procedure: locate, parse, synchronize metadata, mutate, write, and optionally
//! commit and tag. The first failing stage aborts everything after it.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::arguments::Arguments;
use crate::error::BumpError;
use crate::git::GitTracker;
use crate::info_plist::{InfoPlist, version_placeholder};
use crate::locator::resolve_project;
use crate::pbxproj::{INFOPLIST_KEY, XcodeProject};

/// What a successful run changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
    pub project_path: PathBuf,
    /// `None` when the application configuration has no `MARKETING_VERSION` and no tag was
    /// requested.
    pub version: Option<String>,
    pub build: String,
    /// The metadata file, when it was switched over to the placeholder on this run.
    pub configured_info_plist: Option<PathBuf>,
    pub tag: Option<String>,
}

/// Points the metadata bundle version at the `MARKETING_VERSION` build setting.
///
/// The first run copies the literal bundle version into the build setting and swaps the
/// literal for the placeholder. Later runs find the placeholder and change nothing. The
/// modified metadata file is returned unsaved.
pub fn configure_info_plist_ref(project: &mut XcodeProject) -> crate::Result<Option<InfoPlist>> {
    let mut plist = InfoPlist::open(project.info_plist_path()?)?;
    if plist.is_configured()? {
        debug!("'{}' already references the build setting", plist.path().display());
        return Ok(None);
    }

    let bundle_version = plist.bundle_version()?.to_string();
    info!(
        "Moving bundle version {} from '{}' into the project",
        bundle_version,
        plist.path().display()
    );
    project.set_version(&bundle_version)?;
    plist.set_bundle_version(version_placeholder());
    Ok(Some(plist))
}

/// Writes explicit values verbatim. Returns whether a build was supplied.
pub fn apply_overrides(
    project: &mut XcodeProject,
    version: Option<&str>,
    build: Option<&str>,
) -> crate::Result<bool> {
    if let Some(version) = version {
        info!("Setting version to {}", version);
        project.set_version(version)?;
    }
    match build {
        Some(build) => {
            info!("Setting build to {}", build);
            project.set_build(build)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Adds one to the build number and returns the new value.
pub fn increment_build(project: &mut XcodeProject) -> crate::Result<String> {
    let current = project.build_number()?;
    let next = current.checked_add(1).ok_or_else(|| {
        BumpError::TypeMismatch(format!("Build number {current} cannot be incremented"))
    })?;
    let next = next.to_string();
    info!("Incrementing build from {} -> {}", current, next);
    project.set_build(&next)?;
    Ok(next)
}

pub fn tag_name(version: &str, build: &str) -> String {
    format!("{version}({build})")
}

/// Runs the whole procedure against the working directory `cwd`.
pub fn run(args: &Arguments, cwd: &Path) -> Result<BumpOutcome> {
    let project_path = resolve_project(args.path.as_deref(), cwd)?;
    info!("Using project file '{}'", project_path.display());
    let mut project = XcodeProject::open(&project_path)
        .with_context(|| format!("Failed to read '{}'", project_path.display()))?;

    let info_plist = configure_info_plist_ref(&mut project).with_context(|| {
        let plist_path = project
            .info_plist_path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| INFOPLIST_KEY.to_string());
        format!("Failed to sync the bundle version of '{}'", plist_path)
    })?;

    let build_supplied = apply_overrides(&mut project, args.version.as_deref(), args.build.as_deref())?;
    if !build_supplied {
        increment_build(&mut project)?;
    }

    project
        .save()
        .with_context(|| format!("Failed to write '{}'", project_path.display()))?;
    info!("Updated '{}'", project_path.display());
    if let Some(plist) = &info_plist {
        plist
            .save()
            .with_context(|| format!("Failed to write '{}'", plist.path().display()))?;
        info!("Updated '{}'", plist.path().display());
    }

    let build = project.build()?.to_string();
    let (version, tag) = if args.tag {
        let version = project.version()?.to_string();
        let tag = commit_and_tag(cwd, &version, &build)?;
        (Some(version), Some(tag))
    } else {
        (project.version().ok().map(str::to_string), None)
    };

    Ok(BumpOutcome {
        project_path,
        version,
        build,
        configured_info_plist: info_plist.map(|plist| plist.path().to_path_buf()),
        tag,
    })
}

fn commit_and_tag(cwd: &Path, version: &str, build: &str) -> Result<String> {
    if !cwd.join(".git").exists() {
        return Err(BumpError::Precondition(
            "Current directory is not version controlled with git".into(),
        )
        .into());
    }

    let git = GitTracker::open(cwd)?;
    let tag = tag_name(version, build);
    git.commit_and_tag(&tag)?;
    Ok(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../tests/fixtures/project.pbxproj");

    fn info_plist(version: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleShortVersionString</key>
	<string>{version}</string>
</dict>
</plist>
"#
        )
    }

    fn project_in(dir: &Path, bundle_version: &str) -> XcodeProject {
        fs::create_dir_all(dir.join("Sample")).unwrap();
        fs::write(dir.join("Sample/Info.plist"), info_plist(bundle_version)).unwrap();
        XcodeProject::from_contents(
            dir.join("Sample.xcodeproj/project.pbxproj"),
            FIXTURE.to_string(),
        )
        .unwrap()
    }

    fn project_with_build(build: &str) -> XcodeProject {
        let mut project =
            XcodeProject::from_contents("Sample.xcodeproj/project.pbxproj", FIXTURE.to_string())
                .unwrap();
        project.set_build(build).unwrap();
        project
    }

    #[test]
    fn test_increment_build() {
        for (current, expected) in [("0", "1"), ("5", "6"), ("9", "10"), ("41", "42"), ("-1", "0")] {
            let mut project = project_with_build(current);
            assert_eq!(increment_build(&mut project).unwrap(), expected);
            assert_eq!(project.build().unwrap(), expected);
        }
    }

    #[test]
    fn test_increment_build_rejects_non_integer() {
        for build in ["1.2", "abc", "", "12a"] {
            let mut project = project_with_build(build);
            let err = increment_build(&mut project).unwrap_err();
            assert!(matches!(err, BumpError::TypeMismatch(_)), "build {build:?}");
            assert_eq!(project.build().unwrap(), build);
        }
    }

    #[test]
    fn test_increment_build_overflow() {
        let mut project = project_with_build(&i64::MAX.to_string());
        assert!(matches!(
            increment_build(&mut project).unwrap_err(),
            BumpError::TypeMismatch(_)
        ));
    }

    #[test]
    fn test_configure_moves_literal_version() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project_in(temp_dir.path(), "1.0");

        let plist = configure_info_plist_ref(&mut project).unwrap().unwrap();

        assert_eq!(project.version().unwrap(), "1.0");
        assert_eq!(plist.bundle_version().unwrap(), "$(MARKETING_VERSION)");
        // Nothing is written until the caller saves.
        let on_disk = fs::read_to_string(temp_dir.path().join("Sample/Info.plist")).unwrap();
        assert!(on_disk.contains("<string>1.0</string>"));
    }

    #[test]
    fn test_configure_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project_in(temp_dir.path(), "1.0");
        configure_info_plist_ref(&mut project).unwrap().unwrap().save().unwrap();
        let after_first = project.contents().to_string();

        assert!(configure_info_plist_ref(&mut project).unwrap().is_none());
        assert_eq!(project.contents(), after_first);
    }

    #[test]
    fn test_configure_skips_configured_plist() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project_in(temp_dir.path(), "$(MARKETING_VERSION)");

        assert!(configure_info_plist_ref(&mut project).unwrap().is_none());
        assert_eq!(project.contents(), FIXTURE);
    }

    #[test]
    fn test_overrides_take_precedence_over_sync() {
        let temp_dir = TempDir::new().unwrap();
        let mut project = project_in(temp_dir.path(), "1.0");
        configure_info_plist_ref(&mut project).unwrap();

        let build_supplied = apply_overrides(&mut project, Some("2.0"), Some("10")).unwrap();

        assert!(build_supplied);
        assert_eq!(project.version().unwrap(), "2.0");
        assert_eq!(project.build().unwrap(), "10");
    }

    #[test]
    fn test_overrides_without_build() {
        let mut project = project_with_build("5");
        assert!(!apply_overrides(&mut project, Some("3.1"), None).unwrap());
        assert_eq!(project.version().unwrap(), "3.1");
        assert_eq!(project.build().unwrap(), "5");
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(tag_name("2.0", "10"), "2.0(10)");
        assert_eq!(tag_name("1.2.3", "45"), "1.2.3(45)");
    }
}
