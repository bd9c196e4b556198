pub mod arguments;
pub mod bump;
pub mod error;
pub mod git;
pub mod info_plist;
pub mod locator;
pub mod pbxproj;

mod persist;

pub use error::{BumpError, Result};
