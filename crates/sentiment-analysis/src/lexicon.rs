use analysis_core::SentimentLabel;
use async_trait::async_trait;
use ml_client::{Classification, MLResult, SentimentClassifier};
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "rallies", "surge", "surges", "gain", "gains", "profit", "growth",
    "beat", "upgrade", "outperform", "strong", "positive", "rise", "rises", "increase",
    "breakthrough", "success", "exceed", "momentum", "buy", "optimistic", "record", "high",
    "advance", "advances",
    // Financial-specific terms
    "dividend", "buyback", "upside", "recovery", "rebound", "expansion", "robust",
    "accelerating", "overweight", "raised", "upgraded", "tailwind", "inflows",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge", "crash",
    "miss", "downgrade", "underperform", "weak", "negative", "drop", "drops", "decrease",
    "concern", "concerns", "risk", "fail", "disappoint", "slump", "sell", "selloff",
    "warning", "pessimistic", "low", "retreat", "fear", "trouble",
    // Financial-specific terms
    "dilution", "headwind", "lawsuit", "investigation", "probe", "default", "bankruptcy",
    "layoff", "downside", "overvalued", "bubble", "underweight", "lowered", "outflows",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

/// Offline word-list classifier with negation handling.
pub struct LexiconClassifier {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Net polarity and number of polar words in `text`.
    fn score_text(&self, text: &str) -> (i32, u32) {
        let text_lower = text.to_lowercase();
        // Split into words, stripping common punctuation
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"' | '(' | ')'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score: i32 = 0;
        let mut hits: u32 = 0;

        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive.contains(*word);
            let is_negative = self.negative.contains(*word);

            if !is_positive && !is_negative {
                continue;
            }
            hits += 1;

            // A negation word up to NEGATION_WINDOW words earlier flips polarity
            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            if is_positive {
                score += if negated { -1 } else { 1 };
            } else {
                score += if negated { 1 } else { -1 };
            }
        }

        (score, hits)
    }

    pub fn classify_text(&self, text: &str) -> Classification {
        let (score, hits) = self.score_text(text);

        let label = match score {
            s if s > 0 => SentimentLabel::Positive,
            s if s < 0 => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        };

        // Share of polar words agreeing with the label
        let confidence = if hits == 0 || score == 0 {
            0.5
        } else {
            (hits as f64 + score.unsigned_abs() as f64) / (2.0 * hits as f64)
        };

        Classification {
            label,
            score: confidence,
        }
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    async fn classify(&self, texts: &[String]) -> MLResult<Vec<Classification>> {
        Ok(texts.iter().map(|t| self.classify_text(t)).collect())
    }

    fn backend_name(&self) -> &'static str {
        "lexicon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_headline() {
        let c = LexiconClassifier::new().classify_text("Nifty rallies to record high on strong inflows");
        assert_eq!(c.label, SentimentLabel::Positive);
        assert_eq!(c.score, 1.0);
    }

    #[test]
    fn test_negative_headline() {
        let c = LexiconClassifier::new().classify_text("Markets slump as selloff deepens; banks drop");
        assert_eq!(c.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let c = LexiconClassifier::new().classify_text("Analysts do not expect a rally this week");
        assert_eq!(c.label, SentimentLabel::Negative);
    }

    #[test]
    fn test_no_polar_words_is_neutral() {
        let c = LexiconClassifier::new().classify_text("RBI policy meeting scheduled for Friday");
        assert_eq!(c.label, SentimentLabel::Neutral);
        assert_eq!(c.score, 0.5);
    }

    #[test]
    fn test_mixed_confidence() {
        // two positive, one negative
        let c = LexiconClassifier::new().classify_text("gains and growth despite concerns");
        assert_eq!(c.label, SentimentLabel::Positive);
        assert!((c.score - 2.0 / 3.0).abs() < 1e-9);
    }
}
