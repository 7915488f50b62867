// External imports
use burn::data::dataloader::batcher::Batcher;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_1_tensor_preparation::{
    prepare_training_windows, EpochShuffler, Window, WindowBatch, WindowBatcher,
};
use super::step_3_lstm_model_arch::{StockLstm, StockLstmConfig};
use crate::constants;
use crate::error::{PipelineError, Result};
use crate::util::file_utils::PriceTable;
use crate::util::pre_processor::MinMaxScaler;

pub type BurnBackend = Autodiff<NdArray<f32>>;

/// Configuration for training the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub look_back_days: usize,
    pub hidden_size: usize,
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Log the epoch loss every `log_interval` epochs, starting at epoch 0
    pub log_interval: usize,
    /// Seeds both the shuffler and the backend's parameter initialisation
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            look_back_days: constants::LOOK_BACK_DAYS,
            hidden_size: constants::HIDDEN_LAYER_SIZE,
            batch_size: constants::BATCH_SIZE,
            epochs: constants::EPOCHS,
            learning_rate: constants::LEARNING_RATE,
            log_interval: constants::LOG_INTERVAL,
            seed: constants::DEFAULT_SEED,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(PipelineError::InvalidConfig(msg.to_string()));
        if self.look_back_days == 0 {
            return invalid("look_back_days must be at least 1");
        }
        if self.hidden_size == 0 {
            return invalid("hidden_size must be at least 1");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if self.log_interval == 0 {
            return invalid("log_interval must be at least 1");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid("learning_rate must be a positive number");
        }
        Ok(())
    }

    pub fn model_config(&self) -> StockLstmConfig {
        StockLstmConfig::new()
            .with_input_size(constants::NUM_FEATURES)
            .with_hidden_size(self.hidden_size)
            .with_output_size(constants::OUTPUT_SIZE)
    }

    /// Adam with PyTorch's default moments and epsilon
    pub fn optimizer_config(&self) -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(0.9)
            .with_beta_2(0.999)
            .with_epsilon(constants::ADAM_EPSILON)
    }
}

/// Loss of the last batch of every epoch, in epoch order.
///
/// `None` marks an epoch that had no full batch to train on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epoch_losses: Vec<Option<f32>>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epoch_losses.iter().rev().find_map(|loss| *loss)
    }
}

/// Progress line for an epoch, or `None` when the epoch is not logged.
///
/// Epochs `0, log_interval, 2 * log_interval, ...` are logged; a zero
/// interval logs nothing.
pub fn epoch_log_line(epoch: usize, loss: f32, log_interval: usize) -> Option<String> {
    if log_interval == 0 || epoch % log_interval != 0 {
        return None;
    }
    Some(format!("epoch: {:3} loss: {:10.8}", epoch, loss))
}

/// Owns the model and optimizer state for the lifetime of a run
pub struct Trainer<B: AutodiffBackend, O> {
    model: StockLstm<B>,
    optimizer: O,
    config: TrainingConfig,
    device: B::Device,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<StockLstm<B>, B>,
{
    pub fn new(model: StockLstm<B>, optimizer: O, config: TrainingConfig, device: B::Device) -> Self {
        Self {
            model,
            optimizer,
            config,
            device,
        }
    }

    pub fn model(&self) -> &StockLstm<B> {
        &self.model
    }

    pub fn into_model(self) -> StockLstm<B> {
        self.model
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Forward, squared error, backward and one optimizer step on a batch.
    ///
    /// Gradients are computed fresh by `backward()` and the recurrent state is
    /// zeroed inside `forward`, so nothing carries over from earlier batches.
    pub fn train_step(&mut self, batch: WindowBatch<B>, epoch: usize) -> Result<f32> {
        let predictions = self.model.forward(batch.sequences);
        let loss = self.model.mse_loss(predictions, batch.targets);

        let loss_value = loss.clone().into_scalar().to_f32();
        if !loss_value.is_finite() {
            return Err(PipelineError::NonFiniteLoss { epoch });
        }

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self
            .optimizer
            .step(self.config.learning_rate, self.model.clone(), grads);

        Ok(loss_value)
    }

    /// One pass over the shuffled windows
    ///
    /// # Returns
    ///
    /// The loss of the last batch processed, or `None` when the epoch had no
    /// full batch
    pub fn train_epoch(
        &mut self,
        epoch: usize,
        windows: &[Window],
        shuffler: &mut EpochShuffler,
    ) -> Result<Option<f32>> {
        if shuffler.n_items() != windows.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "shuffler covers {} items but {} windows were given",
                shuffler.n_items(),
                windows.len()
            )));
        }

        let batcher = WindowBatcher;
        let mut last_loss = None;

        for indices in shuffler.next_epoch() {
            let items: Vec<Window> = indices.iter().map(|&i| windows[i].clone()).collect();
            let batch: Result<WindowBatch<B>> = batcher.batch(items, &self.device);
            last_loss = Some(self.train_step(batch?, epoch)?);
        }

        Ok(last_loss)
    }

    /// Train for the configured number of epochs; no early stopping
    pub fn fit(&mut self, windows: &[Window]) -> Result<TrainingReport> {
        let mut shuffler =
            EpochShuffler::new(windows.len(), self.config.batch_size, self.config.seed)?;
        info!(
            "Training on {} windows ({} batches per epoch) for {} epochs",
            windows.len(),
            shuffler.num_batches(),
            self.config.epochs
        );

        let mut report = TrainingReport::default();
        for epoch in 0..self.config.epochs {
            let loss = self.train_epoch(epoch, windows, &mut shuffler)?;

            match loss {
                Some(loss) => match epoch_log_line(epoch, loss, self.config.log_interval) {
                    Some(line) => info!("{}", line),
                    None => debug!("epoch: {:3} loss: {:10.8}", epoch, loss),
                },
                None => debug!("epoch: {:3} had no full batch", epoch),
            }
            report.epoch_losses.push(loss);
        }

        Ok(report)
    }
}

/// Train a model on a loaded price table
///
/// # Arguments
///
/// * `raw` - Prices, oldest first
/// * `config` - Training configuration
/// * `device` - Device holding the parameters
///
/// # Returns
///
/// The trained model, the scaler fitted on `raw` and the per-epoch losses
pub fn train_model<B: AutodiffBackend>(
    raw: &PriceTable,
    config: &TrainingConfig,
    device: &B::Device,
) -> Result<(StockLstm<B>, MinMaxScaler, TrainingReport)> {
    config.validate()?;
    match serde_json::to_string(config) {
        Ok(json) => info!("Training config: {}", json),
        Err(e) => warn!("Could not serialize training config: {}", e),
    }

    let (scaler, windows) = prepare_training_windows(raw, config.look_back_days)?;

    B::seed(config.seed);
    let model = config.model_config().init::<B>(device);
    let optimizer = config.optimizer_config().init();

    let mut trainer = Trainer::new(model, optimizer, config.clone(), device.clone());
    let report = trainer.fit(&windows)?;

    if let Some(loss) = report.final_loss() {
        info!("Training completed, final loss {:.8}", loss);
    }
    Ok((trainer.into_model(), scaler, report))
}
