pub mod manifest;
pub mod rules;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use rules::{evaluate, is_allowed, FeatureSet, OsRule, Rule, RuleAction};
pub use version_file::{Argument, LibraryEntry, VersionJson};
