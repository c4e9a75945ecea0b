use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;

use crate::error::{Error, Result};

const BUNDLED_LEXICON: &str = include_str!("../data/polarity/lexicon.csv");

/// Words that flip and dampen the polarity of the word after them
const NEGATIONS: [&str; 3] = ["not", "never", "no"];
const NEGATION_FACTOR: f64 = -0.5;

/// Anything that can score text on a [-1, 1] polarity scale
pub trait PolarityScorer {
  fn score(&self, text: &str) -> f64;

  fn polarity(&self, text: &str) -> Polarity {
    Polarity::from_score(self.score(text))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
  Positive,
  Negative,
  Neutral,
}

impl Polarity {
  pub fn from_score(score: f64) -> Self {
    if score > 0.0 {
      Polarity::Positive
    } else if score < 0.0 {
      Polarity::Negative
    } else {
      Polarity::Neutral
    }
  }
}

impl fmt::Display for Polarity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name: &str = match self {
      Polarity::Positive => "Positive",
      Polarity::Negative => "Negative",
      Polarity::Neutral => "Neutral",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Deserialize)]
struct LexiconEntry {
  word: String,
  score: f64,
}

/// Lexicon Scorer
/// Averages the polarity of every known word in the text. Separate from the
/// trained pipeline: nothing is fitted, and unlike the classifiers it can
/// answer Neutral.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
  lexicon: HashMap<String, f64>,
}

impl LexiconScorer {
  /// Reads a `word,score` CSV with a header row
  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).comment(Some(b'#')).from_reader(reader);
    let mut lexicon: HashMap<String, f64> = HashMap::new();
    for entry in reader.deserialize() {
      let entry: LexiconEntry = entry?;
      if !(-1.0..=1.0).contains(&entry.score) {
        return Err(Error::invalid("polarity score", entry.score, "must lie within [-1, 1]"));
      }
      lexicon.insert(entry.word.to_lowercase(), entry.score);
    }
    if lexicon.is_empty() {
      return Err(Error::EmptyResource { resource: "polarity lexicon" });
    }
    Ok(Self { lexicon })
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path: &Path = path.as_ref();
    let text: String = std::fs::read_to_string(path).map_err(|source| Error::ResourceUnavailable {
      resource: "polarity lexicon",
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_reader(text.as_bytes())
  }

  pub fn english() -> Result<Self> {
    Self::from_reader(BUNDLED_LEXICON.as_bytes())
  }

  pub fn len(&self) -> usize {
    self.lexicon.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lexicon.is_empty()
  }
}

impl PolarityScorer for LexiconScorer {
  fn score(&self, text: &str) -> f64 {
    let cleaned: String = text
      .to_lowercase()
      .chars()
      .map(|c| if c.is_ascii_lowercase() || c == '\'' { c } else { ' ' })
      .collect();
    let words: Vec<&str> = cleaned.split_whitespace().map(|w| w.trim_matches('\'')).collect();

    let mut total: f64 = 0.0;
    let mut hits: usize = 0;
    for (i, word) in words.iter().enumerate() {
      if let Some(&score) = self.lexicon.get(*word) {
        let negated: bool = i > 0 && (NEGATIONS.contains(&words[i - 1]) || words[i - 1].ends_with("n't"));
        total += if negated { score * NEGATION_FACTOR } else { score };
        hits += 1;
      }
    }
    if hits == 0 {
      0.0
    } else {
      (total / hits as f64).clamp(-1.0, 1.0)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scorer() -> LexiconScorer {
    LexiconScorer::from_reader("word,score\ngood,0.7\nbad,-0.7\ngreat,0.8\n".as_bytes()).unwrap()
  }

  #[test]
  fn it_thresholds_at_zero() {
    assert_eq!(Polarity::from_score(0.1), Polarity::Positive);
    assert_eq!(Polarity::from_score(-0.1), Polarity::Negative);
    assert_eq!(Polarity::from_score(0.0), Polarity::Neutral);
  }

  #[test]
  fn it_averages_known_words() {
    let s: LexiconScorer = scorer();
    assert!((s.score("Good and great!") - 0.75).abs() < 1e-12);
    assert_eq!(s.score("The plot happened."), 0.0);
    assert_eq!(s.polarity(""), Polarity::Neutral);
  }

  #[test]
  fn it_dampens_and_flips_negated_words() {
    let s: LexiconScorer = scorer();
    assert!((s.score("not good") + 0.35).abs() < 1e-12);
    assert!((s.score("it wasn't bad") - 0.35).abs() < 1e-12);
  }

  #[test]
  fn it_scores_with_the_bundled_lexicon() {
    let s: LexiconScorer = LexiconScorer::english().unwrap();
    assert!(!s.is_empty());
    assert_eq!(s.polarity("I love this movie, it is wonderful"), Polarity::Positive);
    assert_eq!(s.polarity("A terrible, boring waste of time"), Polarity::Negative);
    assert_eq!(s.polarity("The movie is about a man"), Polarity::Neutral);
  }

  #[test]
  fn it_covers_everyday_review_vocabulary() {
    let s: LexiconScorer = LexiconScorer::english().unwrap();
    assert!(s.len() > 250);
    assert_eq!(s.polarity("The effects were okay"), Polarity::Positive);
    assert_eq!(s.polarity("A subpar sequel"), Polarity::Negative);
    assert_eq!(s.polarity("Captivating from the first frame"), Polarity::Positive);
    assert_eq!(s.polarity("Tedious and forgettable"), Polarity::Negative);
    assert_eq!(s.polarity("It was not captivating"), Polarity::Negative);
  }

  #[test]
  fn it_rejects_bad_lexicons() {
    assert!(matches!(LexiconScorer::from_reader("word,score\n".as_bytes()), Err(Error::EmptyResource { .. })));
    assert!(LexiconScorer::from_reader("word,score\ngood,3.0\n".as_bytes()).is_err());
    assert!(matches!(LexiconScorer::load("/no/such/lexicon.csv"), Err(Error::ResourceUnavailable { .. })));
  }
}
