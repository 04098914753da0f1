//! Category filter for listing quotes.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const ALL: &str = "all";

/// Which quotes to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(c) => c == category,
        }
    }

    /// Fall back to `All` when the selected category no longer exists.
    pub fn or_all_if_missing(self, categories: &[String]) -> Self {
        match &self {
            CategoryFilter::Category(c) if !categories.contains(c) => CategoryFilter::All,
            _ => self,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == ALL {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Category(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL),
            CategoryFilter::Category(c) => f.write_str(c),
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(filter) => filter,
            Err(never) => match never {},
        }
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.to_string()
    }
}
