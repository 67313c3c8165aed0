// src/feed/query.rs
//! Dashboard selectors: country, time range and topic filter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::classify::Factor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    #[default]
    Us,
    Cn,
    Jp,
    De,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    #[default]
    Today,
    Week,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    All,
    Macro,
    Micro,
}

impl Country {
    /// Search term placed in front of "economy finance market".
    pub fn search_term(self) -> &'static str {
        match self {
            Country::Us => "US",
            Country::Cn => "china",
            Country::Jp => "japan",
            Country::De => "germany",
            Country::In => "india",
        }
    }
}

impl TimeFilter {
    /// Bing `qft=interval` code: 4 = 24h, 7 = 7 days, 8 = 30 days.
    pub fn interval_code(self) -> u8 {
        match self {
            TimeFilter::Today => 4,
            TimeFilter::Week => 7,
            TimeFilter::Month => 8,
        }
    }
}

impl Topic {
    pub fn admits(self, factor: Factor) -> bool {
        match self {
            Topic::All => true,
            Topic::Macro => factor == Factor::Macro,
            Topic::Micro => factor == Factor::Micro,
        }
    }
}

impl FromStr for Country {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Country::Us),
            "cn" => Ok(Country::Cn),
            "jp" => Ok(Country::Jp),
            "de" => Ok(Country::De),
            "in" => Ok(Country::In),
            other => anyhow::bail!("unsupported country: {other}"),
        }
    }
}

impl FromStr for TimeFilter {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(TimeFilter::Today),
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            other => anyhow::bail!("unsupported time filter: {other}"),
        }
    }
}

impl FromStr for Topic {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Topic::All),
            "macro" => Ok(Topic::Macro),
            "micro" => Ok(Topic::Micro),
            other => anyhow::bail!("unsupported topic: {other}"),
        }
    }
}

/// A country/time selection. Changing it replaces the board wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeedQuery {
    pub country: Country,
    pub time: TimeFilter,
}

impl FeedQuery {
    pub fn new(country: Country, time: TimeFilter) -> Self {
        Self { country, time }
    }

    /// Bing News RSS search URL for this selection.
    pub fn feed_url(&self) -> String {
        format!(
            "https://www.bing.com/news/search?q={}+economy+finance+market&format=rss&qft=interval%3D\"{}\"&setmkt=en-US",
            self.country.search_term(),
            self.time.interval_code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_carries_country_and_interval() {
        let q = FeedQuery::new(Country::Jp, TimeFilter::Week);
        let url = q.feed_url();
        assert!(url.contains("q=japan+economy+finance+market"));
        assert!(url.contains("interval%3D\"7\""));
        assert!(url.ends_with("&setmkt=en-US"));
    }

    #[test]
    fn parse_selectors_case_insensitive() {
        assert_eq!("DE".parse::<Country>().unwrap(), Country::De);
        assert_eq!(" month ".parse::<TimeFilter>().unwrap(), TimeFilter::Month);
        assert!("fr".parse::<Country>().is_err());
        assert_eq!("Macro".parse::<Topic>().unwrap(), Topic::Macro);
    }

    #[test]
    fn topic_filter() {
        assert!(Topic::All.admits(Factor::Micro));
        assert!(Topic::Macro.admits(Factor::Macro));
        assert!(!Topic::Macro.admits(Factor::Micro));
    }
}
