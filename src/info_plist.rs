use log::debug;
use plist::Value;
use std::path::{Path, PathBuf};

use crate::error::{BumpError, Result};
use crate::pbxproj::VERSION_KEY;
use crate::persist::write_atomic;

pub const BUNDLE_VERSION_KEY: &str = "CFBundleShortVersionString";

/// The placeholder Xcode expands to the `MARKETING_VERSION` build setting.
pub fn version_placeholder() -> String {
    format!("$({VERSION_KEY})")
}

/// An application's `Info.plist`, held in memory until [`save`](Self::save).
#[derive(Debug, Clone)]
pub struct InfoPlist {
    path: PathBuf,
    root: Value,
}

impl InfoPlist {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading metadata file '{}'", path.display());
        let root = Value::from_file(path)?;
        if root.as_dictionary().is_none() {
            return Err(BumpError::Structure(format!(
                "'{}' is not a dictionary",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bundle_version(&self) -> Result<&str> {
        let value = self
            .root
            .as_dictionary()
            .and_then(|dict| dict.get(BUNDLE_VERSION_KEY))
            .ok_or_else(|| BumpError::Structure("Could not find bundle version".into()))?;

        value.as_string().ok_or_else(|| {
            BumpError::TypeMismatch(format!("{BUNDLE_VERSION_KEY} is not a string"))
        })
    }

    pub fn set_bundle_version(&mut self, version: impl Into<String>) {
        if let Some(dict) = self.root.as_dictionary_mut() {
            dict.insert(BUNDLE_VERSION_KEY.to_string(), Value::String(version.into()));
        }
    }

    /// True once the bundle version references the build setting instead of a literal.
    pub fn is_configured(&self) -> Result<bool> {
        Ok(self.bundle_version()? == version_placeholder())
    }

    pub fn save(&self) -> Result<()> {
        let mut buf = Vec::new();
        self.root.to_writer_xml(&mut buf)?;
        buf.push(b'\n');
        write_atomic(&self.path, &buf)?;
        Ok(())
    }
}
