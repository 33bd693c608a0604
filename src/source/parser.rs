//! Status page parser

use scraper::{Html, Selector};

use super::FetchError;
use crate::status::Status;

/// Default selector for the list holding the ban notice
pub const DEFAULT_SELECTOR: &str = "ul.style1:nth-child(2) > li";
/// Text identifying the list item that carries the status
pub const DEFAULT_KEYWORD: &str = "burn ban";
/// Text within that item meaning the ban is lifted
pub const DEFAULT_OFF_KEYWORD: &str = "off";

/// How to find the status on a page
#[derive(Debug, Clone)]
pub struct StatusPage {
    selector: Selector,
    keyword: String,
    off_keyword: String,
}

impl StatusPage {
    /// Build a page description; keywords are matched case-insensitively
    pub fn new(selector: &str, keyword: &str, off_keyword: &str) -> Result<Self, String> {
        let selector = Selector::parse(selector)
            .map_err(|e| format!("invalid selector {:?}: {:?}", selector, e))?;

        Ok(Self {
            selector,
            keyword: keyword.to_lowercase(),
            off_keyword: off_keyword.to_lowercase(),
        })
    }

    /// Extract the status from an HTML document
    ///
    /// The first selected element whose text mentions the keyword decides:
    /// Off if it also mentions the off-keyword, On otherwise.
    pub fn parse(&self, html: &str) -> Result<Status, FetchError> {
        let document = Html::parse_document(html);

        let item = document
            .select(&self.selector)
            .map(|el| el.text().collect::<String>().to_lowercase())
            .find(|text| text.contains(&self.keyword));

        let Some(text) = item else {
            tracing::debug!(keyword = %self.keyword, "No list item mentions keyword");
            return Err(FetchError::NoStatusItem(self.keyword.clone()));
        };

        if text.contains(&self.off_keyword) {
            Ok(Status::Off)
        } else {
            Ok(Status::On)
        }
    }
}

impl Default for StatusPage {
    fn default() -> Self {
        Self {
            selector: Selector::parse(DEFAULT_SELECTOR).expect("Invalid default selector"),
            keyword: DEFAULT_KEYWORD.to_string(),
            off_keyword: DEFAULT_OFF_KEYWORD.to_string(),
        }
    }
}
