// External crates
use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use log::info;
use ndarray::{s, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

// Internal modules
use crate::constants::{CLOSE_COLUMN, FEATURE_RANGE, NUM_FEATURES};
use crate::error::{PipelineError, Result};
use crate::util::file_utils::PriceTable;
use crate::util::pre_processor::MinMaxScaler;

/// One look-back window and the close that follows it
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// `look_back_days x NUM_FEATURES` slice of scaled rows
    pub sequence: Array2<f64>,
    /// Scaled close of the row right after the window
    pub target: f64,
}

/// Slide a window of `look_back_days` rows over `data`.
///
/// Windows start at every index in `0..N - look_back_days - 1`, so the last
/// row of the table is never used as a target. Returns an empty vector when
/// the table has `look_back_days + 1` rows or fewer.
pub fn create_sequences(data: ArrayView2<'_, f64>, look_back_days: usize) -> Vec<Window> {
    let n_rows = data.nrows();
    let count = n_rows.saturating_sub(look_back_days + 1);

    (0..count)
        .map(|start| Window {
            sequence: data.slice(s![start..start + look_back_days, ..]).to_owned(),
            target: data[[start + look_back_days, CLOSE_COLUMN]],
        })
        .collect()
}

/// Minimum number of raw rows that yields at least one window
pub fn required_rows(look_back_days: usize) -> usize {
    look_back_days + 2
}

/// Fit the scaler on `raw` and cut the scaled table into windows
///
/// # Returns
///
/// Returns the frozen scaler (needed to decode predictions later) and the
/// training windows, or `InsufficientRows` before any scaling happens
pub fn prepare_training_windows(
    raw: &PriceTable,
    look_back_days: usize,
) -> Result<(MinMaxScaler, Vec<Window>)> {
    let required = required_rows(look_back_days);
    if raw.n_rows() < required {
        return Err(PipelineError::InsufficientRows {
            required,
            found: raw.n_rows(),
        });
    }

    let (scaler, scaled) = MinMaxScaler::fit_transform(raw, FEATURE_RANGE)?;
    let windows = create_sequences(scaled.values(), look_back_days);
    info!(
        "Built {} windows of {} days from {} rows",
        windows.len(),
        look_back_days,
        scaled.n_rows()
    );
    Ok((scaler, windows))
}

/// Stack windows into `[batch, look_back_days, NUM_FEATURES]` features and
/// `[batch, 1]` targets
///
/// Every window must have the first window's row count and `NUM_FEATURES`
/// columns, otherwise `WindowShape` names the first offending window.
pub fn windows_to_tensors<B: Backend>(
    windows: &[Window],
    device: &B::Device,
) -> Result<(Tensor<B, 3>, Tensor<B, 2>)> {
    let batch_size = windows.len();
    let look_back_days = windows.first().map_or(0, |w| w.sequence.nrows());
    let expected = (look_back_days, NUM_FEATURES);

    if let Some((index, window)) = windows
        .iter()
        .enumerate()
        .find(|(_, w)| w.sequence.dim() != expected)
    {
        return Err(PipelineError::WindowShape {
            index,
            expected,
            found: window.sequence.dim(),
        });
    }

    let features: Vec<f32> = windows
        .iter()
        .flat_map(|w| w.sequence.iter().map(|&v| v as f32))
        .collect();
    let targets: Vec<f32> = windows.iter().map(|w| w.target as f32).collect();

    let features = Tensor::<B, 3>::from_data(
        TensorData::new(features, [batch_size, look_back_days, NUM_FEATURES]),
        device,
    );
    let targets = Tensor::<B, 2>::from_data(TensorData::new(targets, [batch_size, 1]), device);

    Ok((features, targets))
}

/// Batch structure for training
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Input features of shape [batch_size, look_back_days, NUM_FEATURES]
    pub sequences: Tensor<B, 3>,
    /// Target closes of shape [batch_size, 1]
    pub targets: Tensor<B, 2>,
}

/// Batcher turning windows into tensors on the target device
#[derive(Debug, Clone, Default)]
pub struct WindowBatcher;

impl<B: Backend> Batcher<B, Window, Result<WindowBatch<B>>> for WindowBatcher {
    fn batch(&self, items: Vec<Window>, device: &B::Device) -> Result<WindowBatch<B>> {
        let (sequences, targets) = windows_to_tensors::<B>(&items, device)?;
        Ok(WindowBatch { sequences, targets })
    }
}

/// Produces a freshly shuffled set of index batches for every epoch.
///
/// Sampling is without replacement, so each window appears at most once per
/// epoch. A trailing batch smaller than `batch_size` is dropped.
#[derive(Debug, Clone)]
pub struct EpochShuffler {
    n_items: usize,
    batch_size: usize,
    rng: StdRng,
}

impl EpochShuffler {
    pub fn new(n_items: usize, batch_size: usize, seed: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            n_items,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Number of items each epoch permutes
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of full batches yielded per epoch
    pub fn num_batches(&self) -> usize {
        self.n_items / self.batch_size
    }

    pub fn next_epoch(&mut self) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..self.n_items).collect();
        indices.shuffle(&mut self.rng);
        indices
            .chunks_exact(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}
