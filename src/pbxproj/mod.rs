//! Xcode project documents (`*.xcodeproj/project.pbxproj`).
//!
//! [`XcodeProject`] wraps the raw document text together with its parsed tree. Reads go
//! through typed accessors that fail with [`BumpError`] instead of panicking on a missing
//! key or an unexpected value type. Writes are spliced into the original text, so
//! everything outside the edited token stays exactly as Xcode wrote it.
//!
//! # Application target policy
//!
//! Only one build configuration is ever read or written: the *first* build configuration
//! of the *first* target whose product type is [`APPLICATION_PRODUCT_TYPE`]. Targets are
//! visited in the order of the root `PBXProject`'s `targets` array. Documents without a
//! resolvable root project fall back to the document order of `PBXNativeTarget` objects.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BumpError, Result};
use crate::persist::write_atomic;

mod parser;
mod writer;

pub use parser::{Dictionary, Entry, Node, ParseError, Value, parse};
pub use writer::quote;

use writer::{Splice, line_indent};

pub const VERSION_KEY: &str = "MARKETING_VERSION";
pub const BUILD_KEY: &str = "CURRENT_PROJECT_VERSION";
pub const INFOPLIST_KEY: &str = "INFOPLIST_FILE";
pub const APPLICATION_PRODUCT_TYPE: &str = "com.apple.product-type.application";

const NATIVE_TARGET_ISA: &str = "PBXNativeTarget";
const SOURCE_ROOT_PREFIXES: [&str; 4] = [
    "$(SRCROOT)/",
    "${SRCROOT}/",
    "$(PROJECT_DIR)/",
    "${PROJECT_DIR}/",
];

#[derive(Debug, Clone)]
pub struct XcodeProject {
    path: PathBuf,
    contents: String,
    root: Node,
}

impl XcodeProject {
    /// Reads and parses a `project.pbxproj` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading project file '{}'", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_contents(path, contents)
    }

    /// Parses already-loaded document text. `path` is where [`save`](Self::save) writes.
    pub fn from_contents(path: impl Into<PathBuf>, contents: String) -> Result<Self> {
        let root = parse(&contents)?;
        Ok(Self {
            path: path.into(),
            contents,
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Directory containing the `.xcodeproj` bundle, which Xcode calls `SRCROOT`.
    pub fn source_root(&self) -> PathBuf {
        self.path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, self.contents.as_bytes())?;
        Ok(())
    }

    fn objects(&self) -> Result<&Dictionary> {
        self.root
            .as_dictionary()
            .and_then(|root| root.get("objects"))
            .and_then(Node::as_dictionary)
            .ok_or_else(|| BumpError::Structure("Project file has no objects dictionary".into()))
    }

    fn object<'p>(objects: &'p Dictionary, id: &str) -> Option<&'p Dictionary> {
        objects.get(id).and_then(Node::as_dictionary)
    }

    /// Candidate target ids, in the order the application policy visits them.
    fn target_ids<'p>(&'p self, objects: &'p Dictionary) -> Vec<&'p str> {
        let listed = self
            .root
            .as_dictionary()
            .and_then(|root| root.get_str("rootObject"))
            .and_then(|id| Self::object(objects, id))
            .and_then(|project| project.get("targets"))
            .and_then(Node::as_array);

        match listed {
            Some(targets) => targets.iter().filter_map(Node::as_str).collect(),
            None => {
                debug!("No root project targets list, falling back to document order");
                objects
                    .entries
                    .iter()
                    .filter(|entry| {
                        entry
                            .value
                            .as_dictionary()
                            .and_then(|object| object.get_str("isa"))
                            == Some(NATIVE_TARGET_ISA)
                    })
                    .map(|entry| entry.key.as_str())
                    .collect()
            }
        }
    }

    fn application_target<'p>(&'p self, objects: &'p Dictionary) -> Result<(&'p str, &'p Dictionary)> {
        self.target_ids(objects)
            .into_iter()
            .filter_map(|id| Self::object(objects, id).map(|target| (id, target)))
            .find(|(_, target)| {
                target.get_str("isa") == Some(NATIVE_TARGET_ISA)
                    && target.get_str("productType") == Some(APPLICATION_PRODUCT_TYPE)
            })
            .ok_or_else(|| BumpError::Structure("Could not find application target".into()))
    }

    /// Build settings of the application target's first build configuration.
    fn app_build_settings(&self) -> Result<&Dictionary> {
        let objects = self.objects()?;
        let (target_id, target) = self.application_target(objects)?;
        let target_name = target.get_str("name").unwrap_or(target_id);
        debug!("Using application target '{}' ({})", target_name, target_id);

        let configuration_id = target
            .get_str("buildConfigurationList")
            .and_then(|id| Self::object(objects, id))
            .and_then(|list| list.get("buildConfigurations"))
            .and_then(Node::as_array)
            .and_then(|configurations| configurations.first())
            .and_then(Node::as_str)
            .ok_or_else(|| {
                BumpError::Structure(format!(
                    "Application target '{target_name}' has no build configurations"
                ))
            })?;

        let configuration = Self::object(objects, configuration_id).ok_or_else(|| {
            BumpError::Structure(format!(
                "Build configuration {configuration_id} is missing from the project"
            ))
        })?;
        debug!(
            "Using build configuration '{}' ({})",
            configuration.get_str("name").unwrap_or(configuration_id),
            configuration_id
        );

        configuration
            .get("buildSettings")
            .and_then(Node::as_dictionary)
            .ok_or_else(|| {
                BumpError::Structure(format!(
                    "Build configuration {configuration_id} has no build settings"
                ))
            })
    }

    /// Reads a string-valued build setting of the application target.
    pub fn setting(&self, key: &str) -> Result<&str> {
        let node = self
            .app_build_settings()?
            .get(key)
            .ok_or_else(|| BumpError::Structure(format!("Could not find build setting {key}")))?;

        node.as_str().ok_or_else(|| {
            BumpError::TypeMismatch(format!(
                "Build setting {key} is {} rather than a string",
                node.kind()
            ))
        })
    }

    /// Writes a build setting of the application target, inserting it in sorted position
    /// when the key does not exist yet.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        let splice = self.setting_splice(key, value)?;
        splice.apply(&mut self.contents);
        self.root = parse(&self.contents)?;
        Ok(())
    }

    fn setting_splice(&self, key: &str, value: &str) -> Result<Splice> {
        let settings = self.app_build_settings()?;
        let source = self.contents.as_str();
        let value = quote(value);

        if let Some(entry) = settings.entry(key) {
            return Ok(Splice {
                start: entry.value.span.start,
                end: entry.value.span.end,
                text: value.into_owned(),
            });
        }

        let line = format!("{} = {};", quote(key), value);
        let splice = match settings.entries.iter().find(|entry| entry.key.as_str() > key) {
            Some(next) => {
                let indent = line_indent(source, next.key_span.start);
                Splice {
                    start: next.key_span.start,
                    end: next.key_span.start,
                    text: format!("{line}\n{indent}"),
                }
            }
            None => match settings.entries.last() {
                Some(last) => {
                    let indent = line_indent(source, last.key_span.start);
                    Splice {
                        start: last.end,
                        end: last.end,
                        text: format!("\n{indent}{line}"),
                    }
                }
                None => {
                    let indent = line_indent(source, settings.close);
                    Splice {
                        start: settings.open + 1,
                        end: settings.close,
                        text: format!("\n{indent}\t{line}\n{indent}"),
                    }
                }
            },
        };
        Ok(splice)
    }

    pub fn version(&self) -> Result<&str> {
        self.setting(VERSION_KEY)
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        self.set_setting(VERSION_KEY, version)
    }

    pub fn build(&self) -> Result<&str> {
        self.setting(BUILD_KEY)
    }

    pub fn set_build(&mut self, build: &str) -> Result<()> {
        self.set_setting(BUILD_KEY, build)
    }

    /// The build number as an integer.
    pub fn build_number(&self) -> Result<i64> {
        let build = self.build()?;
        build.parse::<i64>().map_err(|_| {
            BumpError::TypeMismatch(format!("Build number '{build}' is not an integer"))
        })
    }

    /// Location of the application's `Info.plist`, resolved against the source root.
    pub fn info_plist_path(&self) -> Result<PathBuf> {
        let value = self.setting(INFOPLIST_KEY)?;
        let relative = SOURCE_ROOT_PREFIXES
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix))
            .unwrap_or(value);
        Ok(self.source_root().join(relative))
    }
}
