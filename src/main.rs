// External crates
use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use burn::tensor::backend::Backend as BurnBackendTrait;
use clap::Parser;
use log::info;
use std::io::Write;
use std::path::PathBuf;

// Local modules
use stock_lstm_trainer::built_info;
use stock_lstm_trainer::constants;
use stock_lstm_trainer::lstm::step_4_train_model::{train_model, BurnBackend, TrainingConfig};
use stock_lstm_trainer::lstm::step_5_prediction::predict_next_close;
use stock_lstm_trainer::util::file_utils::load_price_table;

#[derive(Parser, Debug)]
#[command(name = "stock_lstm_trainer")]
#[command(about = "Train an LSTM to predict the next closing price from daily OHLC data")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = constants::DEFAULT_DATA_PATH, help = "CSV with Close/Last, Open, High and Low columns")]
    data: PathBuf,
    #[arg(long, default_value_t = constants::DEFAULT_SEED, help = "Seed for shuffling and weight initialisation")]
    seed: u64,
}

fn init_logger() {
    // RUST_LOG overrides the default level; messages are printed bare
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();
    info!(
        "{} {} ({})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::RUSTC_VERSION
    );

    let device = <BurnBackend as BurnBackendTrait>::Device::default();
    let config = TrainingConfig {
        seed: cli.seed,
        ..TrainingConfig::default()
    };

    let raw = load_price_table(&cli.data)
        .with_context(|| format!("Failed to load prices from {}", cli.data.display()))?;

    let (model, scaler, _report) =
        train_model::<BurnBackend>(&raw, &config, &device).context("Training failed")?;

    let next_close = predict_next_close(
        &model.valid(),
        &scaler,
        &raw,
        config.look_back_days,
        &device,
    )
    .context("Prediction failed")?;
    info!("Predicted next close: {:.2}", next_close);

    Ok(())
}
