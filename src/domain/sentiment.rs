//! Keyword-count news sentiment.
//!
//! Each headline scores +1 if its lower-cased title contains any bullish
//! keyword and -1 if it contains any bearish keyword; both can apply to the
//! same headline. The total maps to a label at ±2.

use std::fmt;

use tracing::{debug, warn};

use crate::ports::news_port::{Headline, NewsPort, NewsQuery};

pub const BULLISH_KEYWORDS: [&str; 6] = [
    "rally",
    "rises",
    "safe-haven",
    "surges",
    "demand",
    "cut rates",
];
pub const BEARISH_KEYWORDS: [&str; 5] = ["falls", "drops", "pressure", "strong dollar", "hike rates"];

pub const DEFAULT_QUERY: &str = "gold price OR XAUUSD OR federal reserve interest rates OR inflation";
pub const MAX_HEADLINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    pub fn from_score(score: i32) -> Self {
        if score >= 2 {
            SentimentLabel::Bullish
        } else if score <= -2 {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Contribution to the decision score.
    pub fn weight(&self) -> i32 {
        match self {
            SentimentLabel::Bullish => 1,
            SentimentLabel::Bearish => -1,
            SentimentLabel::Neutral => 0,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Bullish => write!(f, "BULLISH"),
            SentimentLabel::Bearish => write!(f, "BEARISH"),
            SentimentLabel::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Why a reading fell back to NEUTRAL without scoring any headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degraded {
    NotConfigured,
    ProviderFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentReading {
    pub label: SentimentLabel,
    pub score: i32,
    pub headlines: usize,
    pub degraded: Option<Degraded>,
}

impl SentimentReading {
    fn degraded(reason: Degraded) -> Self {
        SentimentReading {
            label: SentimentLabel::Neutral,
            score: 0,
            headlines: 0,
            degraded: Some(reason),
        }
    }

    /// Human-readable summary used as the fundamental rationale.
    pub fn describe(&self) -> String {
        match &self.degraded {
            None => format!("News sentiment: {}.", self.label),
            Some(Degraded::NotConfigured) => {
                format!("News sentiment: {} (API key not configured).", self.label)
            }
            Some(Degraded::ProviderFailed(_)) => {
                format!("News sentiment: {} (news API error).", self.label)
            }
        }
    }
}

pub fn score_headline(title: &str) -> i32 {
    let title = title.to_lowercase();
    let mut score = 0;
    if BULLISH_KEYWORDS.iter().any(|k| title.contains(k)) {
        score += 1;
    }
    if BEARISH_KEYWORDS.iter().any(|k| title.contains(k)) {
        score -= 1;
    }
    score
}

pub fn score_headlines(headlines: &[Headline]) -> i32 {
    headlines
        .iter()
        .map(|h| score_headline(h.title.as_deref().unwrap_or_default()))
        .sum()
}

/// Sentiment is advisory: every failure path yields NEUTRAL.
pub struct SentimentScorer {
    news: Option<Box<dyn NewsPort>>,
    query: NewsQuery,
}

impl SentimentScorer {
    pub fn new(news: Option<Box<dyn NewsPort>>, query: NewsQuery) -> Self {
        Self { news, query }
    }

    /// A scorer with no news provider; always NEUTRAL.
    pub fn disabled() -> Self {
        Self::new(None, default_query())
    }

    pub fn score_sentiment(&self) -> SentimentReading {
        let Some(news) = self.news.as_ref() else {
            return SentimentReading::degraded(Degraded::NotConfigured);
        };

        match news.search(&self.query) {
            Ok(headlines) => {
                let take = self.query.limit.min(MAX_HEADLINES).min(headlines.len());
                let score = score_headlines(&headlines[..take]);
                let label = SentimentLabel::from_score(score);
                debug!(headlines = take, score, %label, "sentiment scored");
                SentimentReading {
                    label,
                    score,
                    headlines: take,
                    degraded: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "news search failed, sentiment degraded to NEUTRAL");
                SentimentReading::degraded(Degraded::ProviderFailed(e.to_string()))
            }
        }
    }
}

pub fn default_query() -> NewsQuery {
    NewsQuery {
        query: DEFAULT_QUERY.to_string(),
        language: "en".to_string(),
        sort_by: "publishedAt".to_string(),
        limit: MAX_HEADLINES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DataError;

    struct FixedNews(Result<Vec<Headline>, DataError>);

    impl NewsPort for FixedNews {
        fn search(&self, _query: &NewsQuery) -> Result<Vec<Headline>, DataError> {
            self.0.clone()
        }
    }

    fn headlines(titles: &[&str]) -> Vec<Headline> {
        titles
            .iter()
            .map(|t| Headline {
                title: Some(t.to_string()),
            })
            .collect()
    }

    fn scorer(result: Result<Vec<Headline>, DataError>) -> SentimentScorer {
        SentimentScorer::new(Some(Box::new(FixedNews(result))), default_query())
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(SentimentLabel::from_score(2), SentimentLabel::Bullish);
        assert_eq!(SentimentLabel::from_score(5), SentimentLabel::Bullish);
        assert_eq!(SentimentLabel::from_score(1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-2), SentimentLabel::Bearish);
    }

    #[test]
    fn headline_scoring_is_case_insensitive() {
        assert_eq!(score_headline("Gold RALLY continues"), 1);
        assert_eq!(score_headline("Gold falls on STRONG DOLLAR"), -1);
        assert_eq!(score_headline("Markets quiet"), 0);
    }

    #[test]
    fn one_headline_counts_each_side_once() {
        // bullish and bearish both present → +1 -1
        assert_eq!(score_headline("Gold rises, then drops"), 0);
        // several bullish keywords still count once
        assert_eq!(score_headline("Safe-haven demand surges in rally"), 1);
    }

    #[test]
    fn missing_title_scores_zero() {
        assert_eq!(score_headlines(&[Headline { title: None }]), 0);
    }

    #[test]
    fn bullish_news_flow() {
        let reading = scorer(Ok(headlines(&[
            "Gold rallies as safe-haven demand grows",
            "Fed expected to cut rates",
            "Dollar steady",
        ])))
        .score_sentiment();

        assert_eq!(reading.score, 2);
        assert_eq!(reading.label, SentimentLabel::Bullish);
        assert_eq!(reading.describe(), "News sentiment: BULLISH.");
    }

    #[test]
    fn bearish_news_flow() {
        let reading = scorer(Ok(headlines(&[
            "Gold falls",
            "Strong dollar weighs",
            "Central banks hike rates",
        ])))
        .score_sentiment();

        assert_eq!(reading.score, -3);
        assert_eq!(reading.label, SentimentLabel::Bearish);
    }

    #[test]
    fn only_first_twenty_headlines_count() {
        let mut titles = vec!["nothing here"; 20];
        titles.extend(["rally", "rally", "rally"]);
        let reading = scorer(Ok(headlines(&titles))).score_sentiment();

        assert_eq!(reading.headlines, 20);
        assert_eq!(reading.label, SentimentLabel::Neutral);
    }

    #[test]
    fn provider_failure_degrades_to_neutral() {
        let reading = scorer(Err(DataError::unreachable("timeout"))).score_sentiment();

        assert_eq!(reading.label, SentimentLabel::Neutral);
        assert!(matches!(reading.degraded, Some(Degraded::ProviderFailed(_))));
        assert_eq!(reading.describe(), "News sentiment: NEUTRAL (news API error).");
    }

    #[test]
    fn missing_provider_degrades_to_neutral() {
        let reading = SentimentScorer::disabled().score_sentiment();

        assert_eq!(reading.label, SentimentLabel::Neutral);
        assert_eq!(reading.degraded, Some(Degraded::NotConfigured));
        assert_eq!(
            reading.describe(),
            "News sentiment: NEUTRAL (API key not configured)."
        );
    }
}
