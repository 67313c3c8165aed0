//! Heuristic headline classifier.
//!
//! Lowercases the headline and checks substring membership against three
//! fixed keyword sets (macro topics, bullish words, bearish words):
//! - factor: `macro` if any macro keyword appears, else `micro`
//! - sentiment: bullish-only → bullish, bearish-only → bearish,
//!   both or neither → neutral
//! - impact label: fixed lookup on (factor, sentiment)
//!
//! Keyword lists are English-only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad economic news vs company/sector-specific news.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Macro,
    Micro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
    /// Sentiment deferred to the inference worker.
    Untagged,
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::Macro => f.write_str("macro"),
            Factor::Micro => f.write_str("micro"),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
            Sentiment::Untagged => "untagged",
        };
        f.write_str(s)
    }
}

/// Binary verdict of the sentiment model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelLabel {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub factor: Factor,
    pub sentiment: Sentiment,
    pub impact_label: &'static str,
}

pub const AWAITING_ANALYSIS: &str = "Awaiting Analysis";

pub const MACRO_KEYWORDS: &[&str] = &[
    "fed",
    "inflation",
    "cpi",
    "rate",
    "rates",
    "economy",
    "gdp",
    "job",
    "unemployment",
    "bank",
    "treasury",
    "yield",
    "macro",
    "china",
    "global",
];

pub const BULLISH_KEYWORDS: &[&str] = &[
    "surge",
    "soar",
    "rally",
    "rallies",
    "jump",
    "climb",
    "gains",
    "beats",
    "record high",
    "upgrade",
    "rebound",
    "boost",
    "bullish",
    "optimism",
    "outperform",
    "profit",
    "booming",
];

pub const BEARISH_KEYWORDS: &[&str] = &[
    "fall",
    "drop",
    "plunge",
    "slump",
    "crash",
    "tumble",
    "sink",
    "decline",
    "loss",
    "misses",
    "downgrade",
    "recession",
    "fears",
    "bearish",
    "selloff",
    "sell-off",
    "slowdown",
    "layoffs",
    "warns",
    "crisis",
    "default",
    "slide",
];

/// Fixed (factor, sentiment) → label table.
pub fn impact_label(factor: Factor, sentiment: Sentiment) -> &'static str {
    match (factor, sentiment) {
        (Factor::Macro, Sentiment::Bullish) => "Economic Tailwind",
        (Factor::Macro, Sentiment::Bearish) => "Economic Headwind",
        (Factor::Macro, Sentiment::Neutral) => "Macro Indicator",
        (Factor::Micro, Sentiment::Bullish) => "Sector Upside",
        (Factor::Micro, Sentiment::Bearish) => "Sector Risk",
        (Factor::Micro, Sentiment::Neutral) => "Market Mover",
        (_, Sentiment::Untagged) => AWAITING_ANALYSIS,
    }
}

#[inline]
fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

/// Factor-only pass; expects any casing.
pub fn classify_factor(title: &str) -> Factor {
    let text = title.to_lowercase();
    if contains_any(&text, MACRO_KEYWORDS) {
        Factor::Macro
    } else {
        Factor::Micro
    }
}

/// Classify a headline. Never fails; empty input lands on micro/neutral.
pub fn classify(title: &str) -> Classification {
    let text = title.to_lowercase();

    let factor = if contains_any(&text, MACRO_KEYWORDS) {
        Factor::Macro
    } else {
        Factor::Micro
    };

    let is_bullish = contains_any(&text, BULLISH_KEYWORDS);
    let is_bearish = contains_any(&text, BEARISH_KEYWORDS);

    // Conflicting signals resolve to neutral.
    let sentiment = match (is_bullish, is_bearish) {
        (true, false) => Sentiment::Bullish,
        (false, true) => Sentiment::Bearish,
        _ => Sentiment::Neutral,
    };

    Classification {
        factor,
        sentiment,
        impact_label: impact_label(factor, sentiment),
    }
}

/// Deferred variant: factor only, sentiment left for the model.
pub fn classify_deferred(title: &str) -> Classification {
    Classification {
        factor: classify_factor(title),
        sentiment: Sentiment::Untagged,
        impact_label: AWAITING_ANALYSIS,
    }
}

/// Map a model verdict onto a story's factor.
/// Scores below `neutral_band` are treated as low-confidence → neutral.
pub fn refine(factor: Factor, label: ModelLabel, score: f32, neutral_band: f32) -> Classification {
    let sentiment = if score < neutral_band {
        Sentiment::Neutral
    } else {
        match label {
            ModelLabel::Positive => Sentiment::Bullish,
            ModelLabel::Negative => Sentiment::Bearish,
        }
    };
    Classification {
        factor,
        sentiment,
        impact_label: impact_label(factor, sentiment),
    }
}
