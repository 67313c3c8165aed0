// tests/classify_handpicked.rs
use market_pulse::classify::{classify, Factor, Sentiment};

#[test]
fn handpicked_headlines() {
    let cases: &[(&str, Factor, Sentiment, &str)] = &[
        (
            "Fed signals patience on rates",
            Factor::Macro,
            Sentiment::Neutral,
            "Macro Indicator",
        ),
        (
            "GDP growth surges past forecasts",
            Factor::Macro,
            Sentiment::Bullish,
            "Economic Tailwind",
        ),
        (
            "Treasury yields tumble on recession fears",
            Factor::Macro,
            Sentiment::Bearish,
            "Economic Headwind",
        ),
        (
            "Nvidia shares soar after earnings",
            Factor::Micro,
            Sentiment::Bullish,
            "Sector Upside",
        ),
        (
            "Boeing stock slumps on delivery halt",
            Factor::Micro,
            Sentiment::Bearish,
            "Sector Risk",
        ),
        (
            "Apple unveils new headset",
            Factor::Micro,
            Sentiment::Neutral,
            "Market Mover",
        ),
        (
            "Stocks rally then fall in choppy session",
            Factor::Micro,
            Sentiment::Neutral,
            "Market Mover",
        ),
        ("", Factor::Micro, Sentiment::Neutral, "Market Mover"),
        (
            "INFLATION COOLS AS CPI SURPRISES",
            Factor::Macro,
            Sentiment::Neutral,
            "Macro Indicator",
        ),
    ];

    for (title, factor, sentiment, label) in cases {
        let c = classify(title);
        assert_eq!(c.factor, *factor, "factor for {title:?}");
        assert_eq!(c.sentiment, *sentiment, "sentiment for {title:?}");
        assert_eq!(c.impact_label, *label, "label for {title:?}");
    }
}
