use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ClassifierConfig, ClassifierKind, PipelineConfig};
use crate::dataset::Dataset;
use crate::error::{Error, Phase, Result};
use crate::features::FeatureMatrix;
use crate::labels::Label;
use crate::metrics::Evaluation;
use crate::model::{Classifier, ClassifierModel};
use crate::naive_bayes::MultinomialNb;
use crate::preprocessing::TextNormalizer;
use crate::selection::{grid_search, GridSearchResult, KFold};
use crate::vectorizer::{FittedTfidf, TfidfVectorizer};

/// What gets written to disk; linguistic resources are reloaded at startup
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
  vectorizer: FittedTfidf,
  classifier: ClassifierModel,
}

/// Sentiment Pipeline
/// A normalizer, the vocabulary fitted on the training split, and the
/// classifier trained over that vocabulary. Immutable once built.
#[derive(Debug)]
pub struct SentimentPipeline {
  normalizer: TextNormalizer,
  vectorizer: FittedTfidf,
  classifier: ClassifierModel,
}

/// Result of one training run
#[derive(Debug)]
pub struct TrainingRun {
  pub pipeline: SentimentPipeline,
  /// Scores on the held out split
  pub evaluation: Evaluation,
  pub search: Option<GridSearchResult>,
}

impl SentimentPipeline {
  /// Train Pipeline
  /// Split the raw data, normalize, fit the vocabulary on the training side only,
  /// optionally search the smoothing parameter, train and score on the test side
  pub fn train(normalizer: TextNormalizer, dataset: &Dataset, config: &PipelineConfig) -> Result<TrainingRun> {
    config.validate()?;
    if dataset.is_empty() {
      return Err(Error::EmptyDataset);
    }
    let [negatives, positives] = dataset.class_counts();
    info!(rows = dataset.len(), negatives, positives, "training sentiment pipeline");

    let (train, test) = dataset.train_test_split(config.split.test_size, config.split.seed)?;
    let train_docs: Vec<String> = normalizer.normalize_all(&train.texts)?;
    let test_docs: Vec<String> = normalizer.normalize_all(&test.texts)?;

    let vectorizer: FittedTfidf = TfidfVectorizer::from_config(&config.vectorizer).fit(&train_docs)?;
    let x_train: FeatureMatrix = vectorizer.transform(&train_docs);
    let x_test: FeatureMatrix = vectorizer.transform(&test_docs);

    let mut classifier_config: ClassifierConfig = config.classifier.clone();
    let mut search: Option<GridSearchResult> = None;
    if config.search.enabled {
      match config.classifier.kind {
        ClassifierKind::NaiveBayes => {
          let cv: KFold = KFold::new(config.search.folds);
          let result: GridSearchResult = grid_search(&config.search.alphas, &x_train, &train.labels, &cv, MultinomialNb::new)?;
          classifier_config.alpha = result.best_param;
          search = Some(result);
        }
        ClassifierKind::LogisticRegression => {
          warn!("alpha search only applies to naive bayes; skipping");
        }
      }
    }

    let mut classifier: ClassifierModel = ClassifierModel::from_config(&classifier_config);
    classifier.fit(&x_train, &train.labels)?;

    let predictions: Vec<Label> = classifier.predict(&x_test)?;
    let evaluation: Evaluation = Evaluation::new(&test.labels, &predictions)?;
    info!(classifier = classifier.name(), accuracy = evaluation.accuracy, "evaluated on test split");

    let pipeline: SentimentPipeline = SentimentPipeline { normalizer, vectorizer, classifier };
    Ok(TrainingRun { pipeline, evaluation, search })
  }

  /// Assemble a pipeline from parts fitted elsewhere. The classifier must
  /// have been trained on features from this vectorizer.
  pub fn from_parts(normalizer: TextNormalizer, vectorizer: FittedTfidf, classifier: ClassifierModel) -> Result<Self> {
    if !classifier.is_fitted() {
      return Err(Error::NotFitted { phase: Phase::Predict });
    }
    Ok(Self { normalizer, vectorizer, classifier })
  }

  pub fn normalizer(&self) -> &TextNormalizer {
    &self.normalizer
  }

  pub fn vectorizer(&self) -> &FittedTfidf {
    &self.vectorizer
  }

  pub fn classifier(&self) -> &ClassifierModel {
    &self.classifier
  }

  /// Normalize then project into the fitted vocabulary, never refitting
  pub fn features<S: AsRef<str>>(&self, texts: &[S]) -> Result<FeatureMatrix> {
    let cleaned: Vec<String> = self.normalizer.normalize_all(texts)?;
    Ok(self.vectorizer.transform(&cleaned))
  }

  /// Predict Sentiment
  /// Classify one raw review. Text that cleans down to nothing still gets a label.
  pub fn predict_sentiment(&self, text: &str) -> Result<Label> {
    let labels: Vec<Label> = self.predict_batch(&[text])?;
    labels.into_iter().next().ok_or(Error::EmptyCorpus { phase: Phase::Predict })
  }

  pub fn predict_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Label>> {
    let features: FeatureMatrix = self.features(texts)?;
    self.classifier.predict(&features)
  }

  /// Score the pipeline on a labelled dataset
  pub fn evaluate(&self, dataset: &Dataset) -> Result<Evaluation> {
    if dataset.is_empty() {
      return Err(Error::EmptyCorpus { phase: Phase::Evaluate });
    }
    let predictions: Vec<Label> = self.predict_batch(&dataset.texts)?;
    Evaluation::new(&dataset.labels, &predictions)
  }

  /// Save Pipeline
  /// Writes the fitted vectorizer and classifier with bincode
  pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let artifact: ModelArtifact = ModelArtifact { vectorizer: self.vectorizer.clone(), classifier: self.classifier.clone() };
    let writer: BufWriter<File> = BufWriter::new(File::create(path.as_ref())?);
    bincode::serialize_into(writer, &artifact)?;
    info!(path = %path.as_ref().display(), "saved model");
    Ok(())
  }

  /// Load Pipeline
  /// Reads an artifact written by `save` and pairs it with a normalizer
  pub fn load<P: AsRef<Path>>(path: P, normalizer: TextNormalizer) -> Result<Self> {
    let reader: BufReader<File> = BufReader::new(File::open(path.as_ref())?);
    let artifact: ModelArtifact = bincode::deserialize_from(reader)?;
    info!(path = %path.as_ref().display(), features = artifact.vectorizer.len(), "loaded model");
    Self::from_parts(normalizer, artifact.vectorizer, artifact.classifier)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reviews() -> Dataset {
    let positive: [&str; 5] = [
      "A wonderful, moving film with great acting.",
      "I loved it. Amazing story and brilliant actors!",
      "Great fun from start to finish, a real delight.",
      "Brilliant direction and a wonderful cast.",
      "Amazing, I loved every minute of this great movie.",
    ];
    let negative: [&str; 5] = [
      "Boring, terrible and a total waste of time.",
      "The worst film I have seen, awful acting.",
      "Terrible plot, boring characters, awful ending.",
      "A waste of money. Worst movie of the year.",
      "Dull and boring, the acting was terrible.",
    ];
    let mut texts: Vec<String> = Vec::new();
    let mut labels: Vec<Label> = Vec::new();
    for (p, n) in positive.iter().zip(negative.iter()) {
      texts.push(p.to_string());
      labels.push(Label::Positive);
      texts.push(n.to_string());
      labels.push(Label::Negative);
    }
    Dataset::new(texts, labels).unwrap()
  }

  #[test]
  fn it_trains_and_evaluates_on_the_held_out_split() {
    let config: PipelineConfig = PipelineConfig::default();
    let run: TrainingRun = SentimentPipeline::train(TextNormalizer::english().unwrap(), &reviews(), &config).unwrap();
    assert_eq!(run.evaluation.confusion.total(), 2);
    assert!(run.search.is_none());
    assert!(run.pipeline.classifier().is_fitted());
  }

  #[test]
  fn it_searches_alpha_when_enabled() {
    let mut config: PipelineConfig = PipelineConfig::default();
    config.search.enabled = true;
    config.search.folds = 2;
    let run: TrainingRun = SentimentPipeline::train(TextNormalizer::english().unwrap(), &reviews(), &config).unwrap();
    let search: GridSearchResult = run.search.unwrap();
    assert!(config.search.alphas.contains(&search.best_param));
    match run.pipeline.classifier() {
      ClassifierModel::NaiveBayes(nb) => assert_eq!(nb.alpha(), search.best_param),
      other => panic!("unexpected classifier {:?}", other.name()),
    }
  }

  #[test]
  fn it_rejects_an_unfitted_classifier() {
    let docs: [&str; 2] = ["good", "bad"];
    let vectorizer: FittedTfidf = TfidfVectorizer::new().fit(&docs).unwrap();
    let classifier: ClassifierModel = ClassifierModel::NaiveBayes(MultinomialNb::default());
    let err: Error = SentimentPipeline::from_parts(TextNormalizer::english().unwrap(), vectorizer, classifier).unwrap_err();
    assert!(matches!(err, Error::NotFitted { .. }));
  }

  #[test]
  fn it_labels_empty_text() {
    let run: TrainingRun =
      SentimentPipeline::train(TextNormalizer::english().unwrap(), &reviews(), &PipelineConfig::default()).unwrap();
    assert!(Label::ALL.contains(&run.pipeline.predict_sentiment("").unwrap()));
    assert!(Label::ALL.contains(&run.pipeline.predict_sentiment("!!! 123").unwrap()));
  }
}
