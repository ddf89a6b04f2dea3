// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two resource groups mirrored from the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Per-language text maps (`TextMapEN.json`, ...)
    LanguageFile,
    /// Excel config data exports
    DataFile,
}

impl Category {
    /// Name of the subdirectory under the mirror root holding this category
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::LanguageFile => "langs",
            Category::DataFile => "data",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::LanguageFile => f.write_str("language file"),
            Category::DataFile => f.write_str("data file"),
        }
    }
}
