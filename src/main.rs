use std::path::PathBuf;

use anyhow::{ ensure, Context, Result };
use clap::{ Parser, Subcommand };
use rand::{ SeedableRng, rngs::StdRng };
use tracing::{ info, warn };
use tracing_subscriber::EnvFilter;

use digitnet::{
  ops::*,
  Tensor,
  data::{ Batch, Compose, DataLoader, Dataset, LoaderConfig, Mnist, Normalize, Split, ToTensor },
  network::*,
  nn::{ init, Module, StateDict },
  view::view_classify,
};


// Size of the stand-in data set when no IDX files are given
const SYNTHETIC_SAMPLES: usize = 1000;

/// Walk through building an untrained digit classifier, one stage at a time.

#[derive(Parser, Debug)]
#[command(name = "digitnet", version, about)]
struct Cli {
  #[command(subcommand)]
  command: Command,

  /// Directory with MNIST IDX files. Synthetic digits are used if not given.
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[arg(long, global = true, default_value_t = 64)]
  batch_size: usize,

  #[arg(long, global = true, default_value_t = 7)]
  seed: u64,

  /// Serve batches in data set order.
  #[arg(long, global = true)]
  no_shuffle: bool,

  /// Write the parameters of the inspected model to this file.
  #[arg(long, global = true)]
  save_state: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
  /// Forward one batch through raw weight matrices
  Manual,
  /// Turn the manual scores into probabilities
  Softmax,
  /// Build the module based networks and print them
  Modules,
  /// Print and re-initialize the first layer's parameters
  Inspect,
  /// Compose the classifier as a sequential container
  Sequential,
  /// Show the predicted class probabilities for one image
  Classify {
    #[arg(long, default_value_t = 0)]
    index: usize,
  },
  /// Run every stage in order
  Walkthrough,
}


struct Session {
  loader: DataLoader<Mnist>,
  rng: StdRng,
  save_state: Option<PathBuf>,
}

impl Session {
  fn new(cli: &Cli) -> Result<Self> {
    let dataset = match &cli.data_dir {
      Some(dir) => Mnist::from_dir(dir, Split::Train)
        .with_context(|| format!("Could not load digits from {}", dir.display()) )?,
      None => {
        warn!("No data directory given, generating {SYNTHETIC_SAMPLES} synthetic digits");
        Mnist::synthetic(SYNTHETIC_SAMPLES, cli.seed)
      },
    };
    let transform = Compose::new()
      .then(ToTensor)
      .then(Normalize::new(&[0.5], &[0.5])?);
    let config = LoaderConfig {
      batch_size: cli.batch_size,
      shuffle: !cli.no_shuffle,
      drop_last: false,
      seed: Some(cli.seed),
    };
    Ok(Self {
      loader: DataLoader::new(dataset, transform, config)?,
      rng: StdRng::seed_from_u64(cli.seed),
      save_state: cli.save_state.clone(),
    })
  }

  fn batch(&mut self) -> Result<Batch> {
    let batch = self.loader.iter().next().context("Data set is empty")??;
    info!("Batch of {} images {:?}", batch.len(), batch.images.shape().dims);
    Ok(batch)
  }

  fn persist(&self, model: &dyn Module<f32>) -> Result<()> {
    if let Some(path) = &self.save_state {
      let state = StateDict::from_module(model);
      state.save(path)
        .with_context(|| format!("Could not save parameters to {}", path.display()) )?;
      // The file must load back into the same architecture
      StateDict::<f32>::load(path)?.load_into(model)?;
      info!("Saved {} parameter tensors to {}", state.len(), path.display());
    }
    Ok(())
  }
}


fn manual(session: &mut Session) -> Result<Tensor<f32>> {
  let batch = session.batch()?;
  let inputs = batch.images.flatten_from(1);
  let model = ManualNetwork::with_rng(&NetworkConfig::single(256), &mut session.rng)?;
  let scores = model.forward(&inputs);
  println!("Manual forward pass: {:?} -> {:?}", inputs.shape().dims, scores.shape().dims);
  Ok(scores)
}

fn softmax(session: &mut Session) -> Result<()> {
  let probs = manual(session)?.softmax(-1);
  println!("Probabilities {:?}, sums per image:", probs.shape().dims);
  println!("{}", probs.sum(-1));
  Ok(())
}

fn modules(session: &mut Session) -> Result<()> {
  let batch = session.batch()?;
  let inputs = batch.images.flatten_from(1);
  let single = NetworkConfig::single(256);
  let models: Vec<Box<dyn Module<f32>>> = vec![
    Box::new(Network::with_rng(&single, &mut session.rng)?),
    Box::new(FunctionalNetwork::with_rng(&single, &mut session.rng)?),
    Box::new(DigitClassifier::with_rng(&NetworkConfig::default(), &mut session.rng)?),
  ];
  for model in models {
    let probs = model.forward(&inputs);
    println!("{}", model.tree());
    println!("  output {:?}, {} parameters, untrained accuracy {:.3}\n",
      probs.shape().dims, model.num_parameters(), accuracy(&probs, &batch.labels));
  }
  Ok(())
}

fn inspect(session: &mut Session) -> Result<()> {
  let model = DigitClassifier::<f32>::with_rng(&NetworkConfig::default(), &mut session.rng)?;
  let show = |stage: &str| {
    println!("{stage}:");
    for (name, param) in model.parameters().iter().filter(|(name, _)| name.starts_with("fc1.") ) {
      println!("  {name} {}", param.summary());
    }
  };
  show("Default initialization");
  init::zeros_(model.fc1.bias.as_ref().context("fc1 has no bias")?);
  init::normal_(&model.fc1.weight, 0.0, 0.01, &mut session.rng);
  show("Bias zeroed, weight from N(0, 0.01²)");
  println!("First bias values: {}", model.fc1.bias.as_ref().context("fc1 has no bias")?);
  session.persist(&model)
}

fn sequential(session: &mut Session) -> Result<()> {
  let config = NetworkConfig::default();
  let positional = sequential_classifier::<f32>(&config, &mut session.rng)?;
  println!("{positional}\n");
  println!("model[0]: {}", positional[0].describe());
  if let Some(weight) = positional[0].parameter("weight") {
    println!("model[0].weight {}", weight.summary());
  }

  let named = named_sequential_classifier::<f32>(&config, &mut session.rng)?;
  println!("\n{named}\n");
  let fc1 = named.get_named("fc1").context("Missing fc1 layer")?;
  println!("model.fc1: {}", fc1.describe());

  let batch = session.batch()?;
  let probs = named.forward(&batch.images.flatten_from(1));
  println!("Output {:?}", probs.shape().dims);
  session.persist(&named)
}

fn classify(session: &mut Session, index: usize) -> Result<()> {
  let size = session.loader.dataset().len();
  ensure!(index < size, "Image index {index} out of range, data set holds {size} images");
  let model = DigitClassifier::<f32>::with_rng(&NetworkConfig::default(), &mut session.rng)?;
  let (image, label) = session.loader.sample(index);
  let probs = model.forward(&image.flatten_from(0).unsqueeze(0));
  println!("Image {index}, labeled {label}, predicted {}", probs.argmax(-1).item());
  print!("{}", view_classify(&image, &probs)?);
  session.persist(&model)
}


fn log_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("digitnet=info") )
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(log_filter())
    .init();

  let cli = Cli::parse();
  let mut session = Session::new(&cli)?;
  match cli.command {
    Command::Manual => { manual(&mut session)?; },
    Command::Softmax => softmax(&mut session)?,
    Command::Modules => modules(&mut session)?,
    Command::Inspect => inspect(&mut session)?,
    Command::Sequential => sequential(&mut session)?,
    Command::Classify { index } => classify(&mut session, index)?,
    Command::Walkthrough => {
      softmax(&mut session)?;
      modules(&mut session)?;
      inspect(&mut session)?;
      sequential(&mut session)?;
      classify(&mut session, 0)?;
    },
  }
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn log_filter_from_env() {
    std::env::set_var("RUST_LOG", "digitnet=debug");
    assert_eq!(log_filter().to_string(), "digitnet=debug");
    std::env::remove_var("RUST_LOG");
    assert_eq!(log_filter().to_string(), "digitnet=info");
  }
}
