use std::env;

use anyhow::Context;
use fedavg_orchestration::{
    data::synthetic,
    initialization::ParamInit,
    model::Sequential,
    FederationBuilder, FederationConfig, JsonLinesSink, LogSink, Transport,
};
use log::info;
use rand::{rngs::StdRng, SeedableRng};

const SAMPLES: usize = 6_000;
const TEST_SAMPLES: usize = 1_000;
const FEATURES: usize = 16;
const CLASSES: usize = 4;
const HIDDEN: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match env::var("FEDAVG_CONFIG") {
        Ok(path) => FederationConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        Err(_) => FederationConfig::default(),
    };
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let data = synthetic::gaussian_blobs(SAMPLES + TEST_SAMPLES, FEATURES, CLASSES, 3.0, 1.0, &mut rng)?;
    let train_idx: Vec<_> = (0..SAMPLES).collect();
    let test_idx: Vec<_> = (SAMPLES..SAMPLES + TEST_SAMPLES).collect();
    let (train_set, test_set) = (data.select(&train_idx), data.select(&test_idx));

    let model = Sequential::new(&[FEATURES, HIDDEN, CLASSES], ParamInit::Kaiming, &mut rng)?;

    let mut builder = FederationBuilder::new(config.clone(), model)
        .participants(["bob", "alice"])
        .transport(Transport::Virtual)
        .sink(Box::new(LogSink));

    if let Ok(path) = env::var("FEDAVG_METRICS") {
        let sink = JsonLinesSink::create(&path)
            .with_context(|| format!("failed to create metrics file {path}"))?;
        builder = builder.sink(Box::new(sink));
    }

    let mut federation = builder.build(&train_set, test_set)?;
    let outcome = federation.orchestrator.run(config.num_rounds).await?;

    if let Some(metrics) = outcome.history.last().and_then(|r| r.metrics()) {
        info!(
            round = outcome.global.round,
            loss = metrics.loss,
            accuracy = metrics.accuracy;
            "federation finished"
        );
        println!(
            "Test set after round {}: average loss {:.4}, accuracy {:.2}%",
            outcome.global.round,
            metrics.loss,
            100. * metrics.accuracy
        );
    }

    federation.shutdown().await;
    Ok(())
}
