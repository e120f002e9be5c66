//! Rule-based polarity scoring.
//!
//! Each token is looked up in a valence lexicon. Valence is adjusted by
//! intensity boosters and negations in the three preceding tokens, by
//! ALL-CAPS emphasis and by a contrastive "but". The summed valence is
//! normalized into a compound score in `[-1, 1]`.

use crate::traits::SentimentModel;
use crate::types::{AggregatorError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

const BOOSTER_INCREMENT: f64 = 0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const NORMALIZATION_ALPHA: f64 = 15.0;

static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        // positive
        ("love", 3.2), ("loved", 2.9), ("loves", 2.7), ("lovely", 2.8),
        ("great", 3.1), ("good", 1.9), ("best", 3.2), ("better", 1.9),
        ("excellent", 2.7), ("amazing", 2.8), ("awesome", 3.1), ("brilliant", 2.8),
        ("wonderful", 2.7), ("fantastic", 2.6), ("beautiful", 2.9), ("happy", 2.7),
        ("happily", 2.2), ("joy", 2.8), ("celebrate", 2.7), ("celebrates", 2.7),
        ("celebrated", 2.7), ("win", 2.8), ("wins", 2.7), ("won", 2.7),
        ("winner", 2.8), ("winning", 2.4), ("award", 2.5), ("awards", 2.5),
        ("acclaimed", 2.0), ("praise", 2.6), ("praised", 2.2), ("hit", 1.1),
        ("success", 2.7), ("successful", 2.8), ("triumph", 2.8), ("hope", 1.9),
        ("hopeful", 2.3), ("fun", 2.3), ("funny", 1.9), ("hilarious", 1.7),
        ("stunning", 1.6), ("thrilled", 1.9), ("excited", 1.4), ("exciting", 2.2),
        ("delight", 2.9), ("delightful", 2.8), ("favorite", 2.0), ("perfect", 2.7),
        ("record", 0.5), ("glad", 2.0), ("proud", 2.1), ("honor", 2.2),
        ("honored", 2.8), ("support", 1.7), ("friendship", 1.9), ("wedding", 1.6),
        ("engaged", 1.7), ("reunion", 1.5), ("comeback", 1.6), ("epic", 2.5),
        ("masterpiece", 3.1), ("charming", 2.8), ("inspiring", 2.3), ("heartwarming", 2.6),
        ("smash", 1.2), ("nominated", 1.2), ("nomination", 1.1), ("grateful", 2.0),
        ("thanks", 1.9), ("welcome", 2.0), ("win-win", 2.4), ("sweet", 2.0),
        // negative
        ("hate", -2.7), ("hated", -3.2), ("bad", -2.5), ("worst", -3.1),
        ("worse", -2.1), ("terrible", -2.1), ("awful", -2.0), ("horrible", -2.5),
        ("sad", -2.1), ("sadly", -1.9), ("tragic", -3.4), ("tragedy", -3.4),
        ("dies", -2.9), ("died", -2.6), ("death", -2.9), ("dead", -3.3),
        ("kill", -3.7), ("killed", -3.5), ("killing", -3.4), ("crash", -1.7),
        ("accident", -2.1), ("injured", -1.7), ("hurt", -2.4), ("pain", -2.3),
        ("lawsuit", -1.4), ("sued", -1.1), ("sues", -1.1), ("arrest", -1.4),
        ("arrested", -2.1), ("charged", -0.8), ("scandal", -1.9), ("fraud", -2.8),
        ("abuse", -3.2), ("attack", -2.1), ("fire", -1.4), ("fired", -2.6),
        ("fail", -2.5), ("failed", -2.3), ("failure", -2.3), ("flop", -1.4),
        ("lose", -1.3), ("loses", -1.3), ("lost", -1.3), ("loss", -1.3),
        ("cancel", -1.0), ("canceled", -1.0), ("cancelled", -1.0), ("divorce", -2.3),
        ("split", -0.6), ("feud", -1.8), ("fight", -1.6), ("angry", -2.3),
        ("outrage", -2.3), ("backlash", -1.5), ("controversy", -1.5), ("controversial", -0.8),
        ("slammed", -1.5), ("slams", -1.5), ("criticized", -1.5), ("boring", -1.3),
        ("disappointing", -2.2), ("disappointed", -1.9), ("problem", -1.7), ("crisis", -3.1),
        ("shocking", -1.7), ("shock", -1.6), ("fear", -2.2), ("afraid", -2.0),
        ("war", -2.9), ("threat", -2.4), ("danger", -2.4), ("dangerous", -2.1),
        ("illness", -2.1), ("sick", -2.3), ("cancer", -3.4), ("hospitalized", -1.8),
        ("guilty", -1.8), ("victim", -2.3), ("violence", -3.1), ("strike", -1.2),
        ("delay", -1.3), ("delayed", -0.9), ("broke", -1.8), ("ban", -2.6),
        ("banned", -2.0), ("leak", -0.9), ("leaked", -1.1), ("mourn", -1.8),
        ("mourns", -2.4), ("grief", -2.2), ("worried", -1.2), ("wrong", -2.1),
    ]
    .into_iter()
    .collect()
});

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("absolutely", BOOSTER_INCREMENT), ("completely", BOOSTER_INCREMENT),
        ("extremely", BOOSTER_INCREMENT), ("highly", BOOSTER_INCREMENT),
        ("hugely", BOOSTER_INCREMENT), ("incredibly", BOOSTER_INCREMENT),
        ("really", BOOSTER_INCREMENT), ("so", BOOSTER_INCREMENT),
        ("totally", BOOSTER_INCREMENT), ("truly", BOOSTER_INCREMENT),
        ("very", BOOSTER_INCREMENT), ("most", BOOSTER_INCREMENT),
        ("barely", -BOOSTER_INCREMENT), ("hardly", -BOOSTER_INCREMENT),
        ("slightly", -BOOSTER_INCREMENT), ("somewhat", -BOOSTER_INCREMENT),
        ("marginally", -BOOSTER_INCREMENT), ("partly", -BOOSTER_INCREMENT),
    ]
    .into_iter()
    .collect()
});

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "without",
    "cannot", "can't", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't",
    "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hasn't", "haven't", "hadn't",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSentiment;

impl LexiconSentiment {
    pub fn new() -> Self {
        Self
    }

    fn valence_sum(&self, text: &str) -> f64 {
        let raw_tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
            .filter(|t| !t.is_empty())
            .collect();
        let tokens: Vec<String> = raw_tokens.iter().map(|t| t.to_lowercase()).collect();

        let caps_differential = {
            let shouting = raw_tokens.iter().filter(|t| is_shouting(t)).count();
            shouting > 0 && shouting < raw_tokens.len()
        };
        let but_index = tokens.iter().position(|t| t == "but");

        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            if BOOSTERS.contains_key(token.as_str()) {
                continue;
            }
            let Some(&base) = LEXICON.get(token.as_str()) else {
                continue;
            };

            let mut valence = base;
            if caps_differential && is_shouting(raw_tokens[i]) {
                valence += CAPS_INCREMENT * valence.signum();
            }

            for distance in 1..=3 {
                if i < distance {
                    break;
                }
                let previous = tokens[i - distance].as_str();
                if let Some(&boost) = BOOSTERS.get(previous) {
                    let damping = match distance {
                        1 => 1.0,
                        2 => 0.95,
                        _ => 0.9,
                    };
                    valence += boost * damping * valence.signum();
                }
                if NEGATIONS.contains(&previous) || previous.ends_with("n't") {
                    valence *= NEGATION_SCALAR;
                }
            }

            if let Some(but) = but_index {
                valence *= if i < but { 0.5 } else if i > but { 1.5 } else { 1.0 };
            }

            sum += valence;
        }

        let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
        if sum != 0.0 {
            sum += exclamations as f64 * EXCLAMATION_INCREMENT * sum.signum();
        }
        sum
    }
}

fn is_shouting(token: &str) -> bool {
    token.chars().filter(|c| c.is_alphabetic()).count() > 1
        && token.chars().all(|c| !c.is_lowercase())
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

impl SentimentModel for LexiconSentiment {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn compound(&self, text: &str) -> Result<f64> {
        let compound = normalize(self.valence_sum(text));
        if !compound.is_finite() {
            return Err(AggregatorError::Enrichment(format!(
                "non-finite polarity for text of {} chars",
                text.len()
            )));
        }
        Ok(compound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sentiment;

    fn label(text: &str) -> Sentiment {
        Sentiment::from_compound(LexiconSentiment::new().compound(text).unwrap())
    }

    #[test]
    fn scores_clear_polarity() {
        assert_eq!(label("Film Wins Award"), Sentiment::Positive);
        assert_eq!(label("Beloved actor dies after tragic crash"), Sentiment::Negative);
        assert_eq!(label("Studio announces release date for sequel"), Sentiment::Neutral);
    }

    #[test]
    fn negation_flips_polarity() {
        assert_eq!(label("The movie is good"), Sentiment::Positive);
        assert_eq!(label("The movie is not good"), Sentiment::Negative);
        assert_eq!(label("The movie isn't bad"), Sentiment::Positive);
    }

    #[test]
    fn boosters_and_emphasis_increase_magnitude() {
        let model = LexiconSentiment::new();
        let plain = model.compound("a good film").unwrap();
        let boosted = model.compound("a very good film").unwrap();
        let shouted = model.compound("a GOOD film").unwrap();
        let exclaimed = model.compound("a good film!!").unwrap();
        assert!(boosted > plain);
        assert!(shouted > plain);
        assert!(exclaimed > plain);
    }

    #[test]
    fn contrastive_but_weights_second_clause() {
        assert_eq!(
            label("The cast was great but the plot was terrible and boring"),
            Sentiment::Negative
        );
    }

    #[test]
    fn compound_stays_in_range() {
        let model = LexiconSentiment::new();
        let text = "love love love love love love love love love love!!!!";
        let compound = model.compound(text).unwrap();
        assert!(compound <= 1.0 && compound > 0.9);
        assert_eq!(model.compound("").unwrap(), 0.0);
    }
}
