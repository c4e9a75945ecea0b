use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::config::ResourcesConfig;
use crate::error::{Error, Result};

const BUNDLED_STOPWORDS: &str = include_str!("../data/stopwords/english.txt");
const BUNDLED_LEMMAS: &str = include_str!("../data/lemmas/english.tsv");

/// WordNet noun detachment rules
const NOUN_RULES: [(&str, &str); 9] = [
  ("s", ""),
  ("ses", "s"),
  ("ves", "f"),
  ("xes", "x"),
  ("zes", "z"),
  ("ches", "ch"),
  ("shes", "sh"),
  ("men", "man"),
  ("ies", "y"),
];

fn read_resource(resource: &'static str, path: &Path) -> Result<String> {
  std::fs::read_to_string(path).map_err(|source| Error::ResourceUnavailable {
    resource,
    path: path.to_path_buf(),
    source,
  })
}

/// Stop Words
/// Set of words dropped during normalization. Like the lemma table it is
/// loaded once at startup, and a missing or empty file is fatal.
#[derive(Debug, Clone)]
pub struct StopWords {
  words: HashSet<String>,
}

impl StopWords {
  /// Parses one word per line; blank lines and `#` comments are skipped
  pub fn parse(text: &str) -> Result<Self> {
    let words: HashSet<String> = text
      .lines()
      .map(str::trim)
      .filter(|l| !l.is_empty() && !l.starts_with('#'))
      .map(str::to_lowercase)
      .collect();
    if words.is_empty() {
      return Err(Error::EmptyResource { resource: "stopwords" });
    }
    Ok(Self { words })
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    Self::parse(&read_resource("stopwords", path.as_ref())?)
  }

  /// NLTK English stopword list
  pub fn english() -> Result<Self> {
    Self::parse(BUNDLED_STOPWORDS)
  }

  pub fn contains(&self, word: &str) -> bool {
    self.words.contains(word)
  }

  pub fn len(&self) -> usize {
    self.words.len()
  }

  pub fn is_empty(&self) -> bool {
    self.words.is_empty()
  }
}

/// Noun lemmatizer backed by an exception table and a lexicon of base forms.
///
/// Resource format is tab separated: `form<TAB>lemma` declares an exception,
/// a single column declares a known base form.
#[derive(Debug, Clone)]
pub struct Lemmatizer {
  exceptions: HashMap<String, String>,
  lexicon: HashSet<String>,
}

impl Lemmatizer {
  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    let mut reader = ReaderBuilder::new()
      .delimiter(b'\t')
      .has_headers(false)
      .flexible(true)
      .comment(Some(b'#'))
      .from_reader(reader);

    let mut exceptions: HashMap<String, String> = HashMap::new();
    let mut lexicon: HashSet<String> = HashSet::new();
    for record in reader.records() {
      let record: StringRecord = record?;
      let form: &str = record.get(0).map(str::trim).unwrap_or_default();
      if form.is_empty() {
        continue;
      }
      match record.get(1).map(str::trim) {
        Some(lemma) if !lemma.is_empty() => {
          lexicon.insert(lemma.to_lowercase());
          exceptions.insert(form.to_lowercase(), lemma.to_lowercase());
        }
        _ => {
          lexicon.insert(form.to_lowercase());
        }
      }
    }

    if lexicon.is_empty() {
      return Err(Error::EmptyResource { resource: "lemmas" });
    }
    Ok(Self { exceptions, lexicon })
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    let text: String = read_resource("lemmas", path.as_ref())?;
    Self::from_reader(text.as_bytes())
  }

  pub fn english() -> Result<Self> {
    Self::from_reader(BUNDLED_LEMMAS.as_bytes())
  }

  /// Reduces a lowercase token to its dictionary base form. The token itself,
  /// its exception entry, or else every rule output found in the lexicon is a
  /// candidate; the shortest wins, ties going to the earliest.
  pub fn lemmatize<'a>(&'a self, token: &'a str) -> &'a str {
    let mut candidates: Vec<&'a str> = Vec::new();
    if let Some(known) = self.lexicon.get(token) {
      candidates.push(known);
    }
    match self.exceptions.get(token) {
      Some(lemma) => candidates.push(lemma),
      None => {
        for (suffix, replacement) in NOUN_RULES {
          if let Some(stem) = token.strip_suffix(suffix) {
            if stem.is_empty() {
              continue;
            }
            if let Some(found) = self.lexicon.get(&format!("{stem}{replacement}")) {
              candidates.push(found);
            }
          }
        }
      }
    }

    let mut best: &'a str = match candidates.first() {
      Some(first) => *first,
      None => return token,
    };
    for candidate in candidates {
      if candidate.len() < best.len() {
        best = candidate;
      }
    }
    best
  }

  pub fn lexicon_size(&self) -> usize {
    self.lexicon.len()
  }
}

/// Stopwords and lemmatizer, loaded together
#[derive(Debug, Clone)]
pub struct LinguisticResources {
  pub stopwords: StopWords,
  pub lemmatizer: Lemmatizer,
}

impl LinguisticResources {
  /// Loads configured files, falling back to the bundled English data
  pub fn load(config: &ResourcesConfig) -> Result<Self> {
    let stopwords: StopWords = match &config.stopwords {
      Some(path) => StopWords::load(path)?,
      None => StopWords::english()?,
    };
    let lemmatizer: Lemmatizer = match &config.lemmas {
      Some(path) => Lemmatizer::load(path)?,
      None => Lemmatizer::english()?,
    };
    info!(stopwords = stopwords.len(), lemmas = lemmatizer.lexicon_size(), "linguistic resources loaded");
    Ok(Self { stopwords, lemmatizer })
  }

  pub fn english() -> Result<Self> {
    Self::load(&ResourcesConfig::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_loads_the_bundled_stopwords() {
    let stopwords: StopWords = StopWords::english().unwrap();
    assert_eq!(stopwords.len(), 179);
    assert!(stopwords.contains("the"));
    assert!(stopwords.contains("wouldn"));
    assert!(!stopwords.contains("movie"));
  }

  #[test]
  fn it_fails_on_missing_resources() {
    let err: Error = StopWords::load("/nonexistent/stopwords.txt").unwrap_err();
    assert!(matches!(err, Error::ResourceUnavailable { resource: "stopwords", .. }));

    let err: Error = Lemmatizer::load("/nonexistent/lemmas.tsv").unwrap_err();
    assert!(matches!(err, Error::ResourceUnavailable { resource: "lemmas", .. }));
  }

  #[test]
  fn it_rejects_empty_resources() {
    assert!(matches!(StopWords::parse("# nothing\n\n"), Err(Error::EmptyResource { .. })));
    assert!(matches!(Lemmatizer::from_reader("".as_bytes()), Err(Error::EmptyResource { .. })));
  }

  #[test]
  fn it_lemmatizes_nouns() {
    let lemmatizer: Lemmatizer = Lemmatizer::from_reader(
      "movie\nbox\nchurch\nstory\nwoman\nchildren\tchild\nmice\tmouse\n".as_bytes(),
    )
    .unwrap();
    assert_eq!(lemmatizer.lemmatize("movies"), "movie");
    assert_eq!(lemmatizer.lemmatize("boxes"), "box");
    assert_eq!(lemmatizer.lemmatize("churches"), "church");
    assert_eq!(lemmatizer.lemmatize("stories"), "story");
    assert_eq!(lemmatizer.lemmatize("women"), "woman");
    assert_eq!(lemmatizer.lemmatize("children"), "child");
    assert_eq!(lemmatizer.lemmatize("mice"), "mouse");
    assert_eq!(lemmatizer.lemmatize("amazing"), "amazing");
    assert_eq!(lemmatizer.lemmatize("s"), "s");
  }

  #[test]
  fn it_lemmatizes_with_the_bundled_table() {
    let lemmatizer: Lemmatizer = Lemmatizer::english().unwrap();
    assert_eq!(lemmatizer.lemmatize("movies"), "movie");
    assert_eq!(lemmatizer.lemmatize("actors"), "actor");
    assert_eq!(lemmatizer.lemmatize("people"), "person");
  }

  #[test]
  fn it_prefers_the_shortest_base_form() {
    let lemmatizer: Lemmatizer = Lemmatizer::from_reader("glass\nglasses\nwolf\nleaf\n".as_bytes()).unwrap();
    assert_eq!(lemmatizer.lemmatize("glasses"), "glass");
    assert_eq!(lemmatizer.lemmatize("wolves"), "wolf");
    assert_eq!(lemmatizer.lemmatize("leaves"), "leaf");
  }

  #[test]
  fn it_lemmatizes_plurals_missing_from_the_exception_list() {
    let lemmatizer: Lemmatizer = Lemmatizer::english().unwrap();
    let plurals: [(&str, &str); 10] = [
      ("dogs", "dog"),
      ("cats", "cat"),
      ("birds", "bird"),
      ("songs", "song"),
      ("dwarves", "dwarf"),
      ("reviewers", "reviewer"),
      ("costumes", "costume"),
      ("villagers", "villager"),
      ("ponies", "pony"),
      ("witches", "witch"),
    ];
    for (plural, base) in plurals {
      assert_eq!(lemmatizer.lemmatize(plural), base);
    }
    assert!(lemmatizer.lexicon_size() > 1000);
  }
}
