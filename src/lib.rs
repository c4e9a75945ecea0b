pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod naive_bayes;
pub mod pipeline;
pub mod polarity;
pub mod preprocessing;
pub mod resources;
pub mod selection;
pub mod vectorizer;

use std::path::Path;

pub use config::PipelineConfig;
pub use dataset::Dataset;
pub use error::{Error, Phase, Result};
pub use labels::Label;
pub use metrics::Evaluation;
pub use model::{Classifier, ClassifierModel};
pub use pipeline::{SentimentPipeline, TrainingRun};
pub use preprocessing::TextNormalizer;
pub use resources::LinguisticResources;

/// Normalizer
/// Loads the configured linguistic resources; failure here is fatal for the pipeline
pub fn normalizer_from_config(config: &PipelineConfig) -> Result<TextNormalizer> {
    let resources: LinguisticResources = LinguisticResources::load(&config.resources)?;
    TextNormalizer::new(resources)
}

/// Train From Config
/// Load resources and the dataset named by the config, then train and evaluate
pub fn train_from_config(config: &PipelineConfig) -> Result<TrainingRun> {
    config.validate()?;
    let normalizer: TextNormalizer = normalizer_from_config(config)?;
    let dataset: Dataset = Dataset::from_csv(&config.dataset)?;
    SentimentPipeline::train(normalizer, &dataset, config)
}

/// Sentiment Prediction
/// Classify a sentence with a previously saved model
pub fn predict_sentiment<P: AsRef<Path>>(model_path: P, config: &PipelineConfig, sentence: &str) -> Result<Label> {
    let normalizer: TextNormalizer = normalizer_from_config(config)?;
    let pipeline: SentimentPipeline = SentimentPipeline::load(model_path, normalizer)?;
    pipeline.predict_sentiment(sentence)
}
