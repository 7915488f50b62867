// External imports
use burn::tensor::backend::Backend;
use burn::tensor::cast::ToElement;

// Internal imports
use super::step_1_tensor_preparation::{windows_to_tensors, Window};
use super::step_3_lstm_model_arch::StockLstm;
use crate::constants::CLOSE_COLUMN;
use crate::error::{PipelineError, Result};
use crate::util::file_utils::PriceTable;
use crate::util::pre_processor::MinMaxScaler;

/// Predict scaled closes for a set of windows
pub fn predict_scaled<B: Backend>(
    model: &StockLstm<B>,
    windows: &[Window],
    device: &B::Device,
) -> Result<Vec<f64>> {
    if windows.is_empty() {
        return Ok(Vec::new());
    }

    let (features, _) = windows_to_tensors::<B>(windows, device)?;
    let predictions = model.forward(features);

    let data = predictions.into_data().convert::<f32>();
    let values = data
        .to_vec::<f32>()
        .map_err(|e| PipelineError::TensorData(format!("{:?}", e)))?;
    Ok(values.into_iter().map(f64::from).collect())
}

/// Predict the close following the last `look_back_days` rows of `history`
///
/// # Arguments
///
/// * `model` - Trained model
/// * `scaler` - Scaler fitted on the training data, reused unchanged
/// * `history` - Raw prices; only the last `look_back_days` rows are used
/// * `look_back_days` - Window length the model was trained with
/// * `device` - Device to place tensors on
///
/// # Returns
///
/// The predicted close in price units
pub fn predict_next_close<B: Backend>(
    model: &StockLstm<B>,
    scaler: &MinMaxScaler,
    history: &PriceTable,
    look_back_days: usize,
    device: &B::Device,
) -> Result<f64> {
    if look_back_days == 0 || history.n_rows() < look_back_days {
        return Err(PipelineError::InsufficientRows {
            required: look_back_days.max(1),
            found: history.n_rows(),
        });
    }

    let window = scaler.transform_view(history.tail(look_back_days))?;
    let (features, _) = windows_to_tensors::<B>(
        &[Window {
            sequence: window,
            target: 0.0,
        }],
        device,
    )?;

    let scaled = model.forward(features).into_scalar().to_f64();
    Ok(scaler.inverse_transform_value(CLOSE_COLUMN, scaled))
}
