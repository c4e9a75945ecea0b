use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lib_sentiment::polarity::{LexiconScorer, PolarityScorer};
use lib_sentiment::{normalizer_from_config, train_from_config, Dataset, Evaluation, PipelineConfig, SentimentPipeline};

#[derive(Debug, Parser)]
#[clap(name = "sentiment", about = "TF-IDF movie review sentiment classifier")]
struct Opt {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on the configured dataset and report held out scores
    Train {
        #[clap(long)]
        config: Option<PathBuf>,
        /// Where to write the fitted model
        #[clap(long)]
        model_out: Option<PathBuf>,
    },
    /// Classify one or more reviews with a saved model
    Predict {
        #[clap(long)]
        model: PathBuf,
        #[clap(long)]
        config: Option<PathBuf>,
        #[clap(required = true)]
        text: Vec<String>,
    },
    /// Score a saved model on the test split of the configured dataset
    Evaluate {
        #[clap(long)]
        model: PathBuf,
        #[clap(long)]
        config: Option<PathBuf>,
        /// Score every row instead of only the held out split
        #[clap(long)]
        all: bool,
    },
    /// Lexicon polarity (Positive / Negative / Neutral), no trained model involved
    Polarity {
        #[clap(required = true)]
        text: Vec<String>,
    },
    /// Write a config file filled with the defaults
    InitConfig { path: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PipelineConfig> {
    let config: PipelineConfig = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    Ok(config)
}

fn print_evaluation(evaluation: &Evaluation) {
    println!("{}", evaluation);
    println!("Correct: {:.2}%", evaluation.correct_percentage());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opt = Opt::parse();

    match opt.command {
        Command::Train { config, model_out } => {
            let config: PipelineConfig = load_config(config.as_ref())?;
            let run = train_from_config(&config)?;
            if let Some(search) = &run.search {
                println!("Best alpha: {} (cv accuracy {:.4})", search.best_param, search.best_score);
            }
            print_evaluation(&run.evaluation);
            if let Some(path) = model_out {
                run.pipeline.save(&path)?;
                println!("Model written to {}", path.display());
            }
        }
        Command::Predict { model, config, text } => {
            let config: PipelineConfig = load_config(config.as_ref())?;
            let pipeline = SentimentPipeline::load(&model, normalizer_from_config(&config)?)?;
            for (review, label) in text.iter().zip(pipeline.predict_batch(&text)?) {
                println!("{}\t{}", label, review);
            }
        }
        Command::Evaluate { model, config, all } => {
            let config: PipelineConfig = load_config(config.as_ref())?;
            let pipeline = SentimentPipeline::load(&model, normalizer_from_config(&config)?)?;
            let dataset: Dataset = Dataset::from_csv(&config.dataset)?;
            let dataset: Dataset = if all {
                dataset
            } else {
                let (_, test) = dataset.train_test_split(config.split.test_size, config.split.seed)?;
                test
            };
            if dataset.is_empty() {
                bail!("nothing to evaluate in {}", config.dataset.path.display());
            }
            print_evaluation(&pipeline.evaluate(&dataset)?);
        }
        Command::Polarity { text } => {
            let scorer = LexiconScorer::english()?;
            for review in &text {
                let score: f64 = scorer.score(review);
                println!("{}\t{:.3}\t{}", scorer.polarity(review), score, review);
            }
        }
        Command::InitConfig { path } => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            PipelineConfig::default().save(&path)?;
            println!("Config written to {}", path.display());
        }
    }

    Ok(())
}
