use scraper::{Html, Selector};

use crate::config::ScraperConfig;
use crate::plugins::traits::{ExtractedFields, Extractor};
use crate::utils::error::{AppError, Result};

/// One way of locating a field in a parsed page.
pub trait ExtractionStrategy: Send + Sync {
    fn describe(&self) -> String;
    fn find(&self, document: &Html) -> Option<String>;
}

/// Text content of the first matching element that isn't blank.
pub struct CssTextStrategy {
    source: String,
    selector: Selector,
}

impl CssTextStrategy {
    pub fn new(selector: &str) -> Result<Self> {
        Ok(Self {
            source: selector.to_string(),
            selector: parse_selector(selector)?,
        })
    }
}

impl ExtractionStrategy for CssTextStrategy {
    fn describe(&self) -> String {
        self.source.clone()
    }

    fn find(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selector)
            .map(|element| collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
            .find(|text| !text.is_empty())
    }
}

/// Attribute value of the first matching element, e.g. `meta[itemprop='price']@content`.
pub struct AttributeStrategy {
    source: String,
    selector: Selector,
    attribute: String,
}

impl AttributeStrategy {
    pub fn new(selector: &str, attribute: &str) -> Result<Self> {
        Ok(Self {
            source: format!("{}@{}", selector, attribute),
            selector: parse_selector(selector)?,
            attribute: attribute.to_string(),
        })
    }
}

impl ExtractionStrategy for AttributeStrategy {
    fn describe(&self) -> String {
        self.source.clone()
    }

    fn find(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr(&self.attribute))
            .map(collapse_whitespace)
            .find(|value| !value.is_empty())
    }
}

/// Build a strategy from config syntax: `css` or `css@attribute`.
pub fn parse_strategy(input: &str) -> Result<Box<dyn ExtractionStrategy>> {
    match input.rsplit_once('@') {
        Some((selector, attribute)) if !attribute.is_empty() && !attribute.contains([' ', ']', '\'']) => {
            Ok(Box::new(AttributeStrategy::new(selector.trim(), attribute.trim())?))
        }
        _ => Ok(Box::new(CssTextStrategy::new(input.trim())?)),
    }
}

/// Tries each strategy in priority order; the first non-empty value wins.
pub struct SelectorExtractor {
    title_strategies: Vec<Box<dyn ExtractionStrategy>>,
    price_strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl SelectorExtractor {
    pub fn new(
        title_strategies: Vec<Box<dyn ExtractionStrategy>>,
        price_strategies: Vec<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self {
            title_strategies,
            price_strategies,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let build = |selectors: &[String]| -> Result<Vec<Box<dyn ExtractionStrategy>>> {
            selectors.iter().map(|selector| parse_strategy(selector)).collect()
        };
        Ok(Self::new(build(&config.title_selectors)?, build(&config.price_selectors)?))
    }

    fn first_match(strategies: &[Box<dyn ExtractionStrategy>], document: &Html, field: &str) -> Option<String> {
        strategies.iter().find_map(|strategy| {
            let found = strategy.find(document);
            if found.is_some() {
                tracing::trace!(field, strategy = %strategy.describe(), "Strategy matched");
            }
            found
        })
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, document: &str) -> Result<ExtractedFields> {
        if document.trim().is_empty() {
            return Err(AppError::ExtractionMissing("document is empty".to_string()));
        }

        let html = Html::parse_document(document);
        Ok(ExtractedFields {
            title: Self::first_match(&self.title_strategies, &html, "title"),
            raw_price: Self::first_match(&self.price_strategies, &html, "price"),
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::Configuration(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
