// SPDX-License-Identifier: GPL-3.0-only
use url::Url;

use crate::catalog::Category;

pub const DEFAULT_TEXT_MAP_BASE_URL: &str =
    "https://gitlab.com/Dimbreath/AnimeGameData/-/raw/master/TextMap/";
pub const DEFAULT_EXCEL_BASE_URL: &str =
    "https://gitlab.com/Dimbreath/AnimeGameData/-/raw/master/ExcelBinOutput/";
pub const DEFAULT_QUERY_SUFFIX: &str = "ref_type=heads&inline=false";

/// Turns catalog identifiers into raw-file URLs on the remote host
#[derive(Debug, Clone)]
pub struct UrlTemplates {
    text_map_base: Url,
    excel_base: Url,
    query: Option<String>,
}

impl UrlTemplates {
    pub fn new(
        text_map_base: &str,
        excel_base: &str,
        query: &str,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            text_map_base: parse_base(text_map_base)?,
            excel_base: parse_base(excel_base)?,
            query: Some(query.trim_start_matches('?'))
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        })
    }

    /// Build the URL of `id` within `category`
    ///
    /// Language files are published as `TextMap<CODE>.json` with the code upper-cased.
    pub fn resource_url(&self, category: Category, id: &str) -> Result<Url, url::ParseError> {
        let mut url = match category {
            Category::LanguageFile => self
                .text_map_base
                .join(&format!("TextMap{}.json", id.to_uppercase()))?,
            Category::DataFile => self.excel_base.join(&format!("{}.json", id))?,
        };
        url.set_query(self.query.as_deref());
        Ok(url)
    }
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            text_map_base: Url::parse(DEFAULT_TEXT_MAP_BASE_URL).expect("valid default URL"),
            excel_base: Url::parse(DEFAULT_EXCEL_BASE_URL).expect("valid default URL"),
            query: Some(DEFAULT_QUERY_SUFFIX.to_string()),
        }
    }
}

/// `Url::join` drops the last path segment unless the base ends with a slash
fn parse_base(base: &str) -> Result<Url, url::ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{}/", base))
    }
}
