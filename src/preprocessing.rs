use tokenizers::normalizers::replace::{Replace, ReplacePattern};
use tokenizers::normalizers::Lowercase;
use tokenizers::pre_tokenizers::whitespace::WhitespaceSplit;
use tokenizers::{NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};
use tracing::{debug, warn};

use std::fmt;

use crate::error::{Error, Phase, Result};
use crate::resources::LinguisticResources;

/// Everything outside the lowercase Latin alphabet and whitespace
const NON_ALPHABETIC: &str = r"[^a-z\s]";

fn tokenizer_error(phase: Phase, e: impl ToString) -> Error {
  Error::Tokenizer { phase, message: e.to_string() }
}

/// Text Normalizer
/// Maps a raw review to a cleaned, space separated token string
pub struct TextNormalizer {
  resources: LinguisticResources,
  lowercase: Lowercase,
  strip: Replace,
  splitter: WhitespaceSplit,
}

impl fmt::Debug for TextNormalizer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TextNormalizer")
      .field("resources", &self.resources)
      .field("strip", &NON_ALPHABETIC)
      .finish()
  }
}

impl TextNormalizer {
  pub fn new(resources: LinguisticResources) -> Result<Self> {
    let strip: Replace = Replace::new(ReplacePattern::Regex(NON_ALPHABETIC.to_string()), "")
      .map_err(|e| tokenizer_error(Phase::Normalize, e))?;
    Ok(Self { resources, lowercase: Lowercase, strip, splitter: WhitespaceSplit })
  }

  /// Normalizer over the bundled English resources
  pub fn english() -> Result<Self> {
    Self::new(LinguisticResources::english()?)
  }

  pub fn resources(&self) -> &LinguisticResources {
    &self.resources
  }

  /// Lowercase, strip non letters, split, drop stopwords, lemmatize, rejoin.
  /// The order of these steps is significant.
  pub fn normalize(&self, raw: &str) -> Result<String> {
    let mut normalized: NormalizedString = NormalizedString::from(raw);
    self.lowercase.normalize(&mut normalized).map_err(|e| tokenizer_error(Phase::Normalize, e))?;
    self.strip.normalize(&mut normalized).map_err(|e| tokenizer_error(Phase::Normalize, e))?;

    let mut pretokenized: PreTokenizedString = PreTokenizedString::from(normalized.get());
    self.splitter.pre_tokenize(&mut pretokenized).map_err(|e| tokenizer_error(Phase::Normalize, e))?;

    let tokens: Vec<&str> = pretokenized
      .get_splits(OffsetReferential::Original, OffsetType::Byte)
      .into_iter()
      .map(|(token, _, _)| token)
      .filter(|token| !self.resources.stopwords.contains(token))
      .map(|token| self.resources.lemmatizer.lemmatize(token))
      .collect();

    Ok(tokens.join(" "))
  }

  pub fn normalize_all<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<String>> {
    let cleaned: Vec<String> = documents
      .iter()
      .map(|d| self.normalize(d.as_ref()))
      .collect::<Result<Vec<String>>>()?;

    let empty: usize = cleaned.iter().filter(|c| c.is_empty()).count();
    if empty > 0 {
      warn!(empty, total = cleaned.len(), "documents normalized to an empty string");
    }
    debug!(documents = cleaned.len(), "normalized corpus");
    Ok(cleaned)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn normalizer() -> TextNormalizer {
    TextNormalizer::english().unwrap()
  }

  #[test]
  fn it_cleans_a_review() {
    let n: TextNormalizer = normalizer();
    assert_eq!(
      n.normalize("The movies were AMAZING!!! 10/10, I loved the actors.").unwrap(),
      "movie amazing loved actor"
    );
  }

  #[test]
  fn it_reduces_ordinary_plurals_to_their_base_form() {
    let n: TextNormalizer = normalizer();
    assert_eq!(
      n.normalize("The dogs chased the cats while birds sang songs about dwarves and reviewers").unwrap(),
      "dog chased cat bird sang song dwarf reviewer"
    );
  }

  #[test]
  fn it_yields_empty_strings_for_empty_input() {
    let n: TextNormalizer = normalizer();
    assert_eq!(n.normalize("").unwrap(), "");
    assert_eq!(n.normalize("1234!!!").unwrap(), "");
    assert_eq!(n.normalize("   \t\n ").unwrap(), "");
    assert_eq!(n.normalize("the and of").unwrap(), "");
  }

  #[test]
  fn it_drops_accented_characters_and_digits() {
    let n: TextNormalizer = normalizer();
    assert_eq!(n.normalize("Café déjà vu 2024").unwrap(), "caf dj vu");
  }

  #[test]
  fn it_only_emits_lowercase_letters_and_single_spaces() {
    let n: TextNormalizer = normalizer();
    let inputs: [&str; 4] = [
      "  Leading and trailing   spaces ",
      "Tabs\tand\nnewlines\r\neverywhere",
      "<br /><br />HTML remnants & symbols #42",
      "ÀÉÎÕÜ mixed ÇASE wörds",
    ];
    for input in inputs {
      let cleaned: String = n.normalize(input).unwrap();
      assert!(cleaned.chars().all(|c| c.is_ascii_lowercase() || c == ' '), "{cleaned:?}");
      assert!(!cleaned.starts_with(' ') && !cleaned.ends_with(' '));
      assert!(!cleaned.contains("  "));
    }
  }

  #[test]
  fn it_normalizes_a_batch() {
    let n: TextNormalizer = normalizer();
    let cleaned: Vec<String> = n.normalize_all(&["Great film!", "!!!"]).unwrap();
    assert_eq!(cleaned, vec!["great film".to_string(), String::new()]);
  }
}
