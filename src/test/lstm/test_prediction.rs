use crate::error::PipelineError;
use crate::lstm::step_1_tensor_preparation::prepare_training_windows;
use crate::lstm::step_4_train_model::{train_model, BurnBackend, TrainingConfig};
use crate::lstm::step_5_prediction::{predict_next_close, predict_scaled};
use crate::util::file_utils::PriceTable;
use crate::util::test_utils::generate_test_table;
use burn::module::AutodiffModule;
use burn_ndarray::NdArrayDevice;

fn small_config() -> TrainingConfig {
    TrainingConfig {
        look_back_days: 5,
        hidden_size: 8,
        epochs: 2,
        ..TrainingConfig::default()
    }
}

#[test]
fn test_predict_next_close_is_a_price() {
    let table = generate_test_table(40, 13);
    let config = small_config();
    let device = NdArrayDevice::default();

    let (model, scaler, _) = train_model::<BurnBackend>(&table, &config, &device).unwrap();
    let next = predict_next_close(&model.valid(), &scaler, &table, 5, &device).unwrap();

    assert!(next.is_finite());
    // The prediction is decoded with the fitted close range, so it lands
    // somewhere near observed prices rather than in [-1, 1]
    let min = scaler.data_min()[0];
    let max = scaler.data_max()[0];
    let span = max - min;
    assert!(next > min - 2.0 * span && next < max + 2.0 * span);
}

#[test]
fn test_predict_scaled_matches_window_count() {
    let table = generate_test_table(30, 14);
    let config = small_config();
    let device = NdArrayDevice::default();

    let (model, _, _) = train_model::<BurnBackend>(&table, &config, &device).unwrap();
    let (_, windows) = prepare_training_windows(&table, 5).unwrap();

    let predictions = predict_scaled(&model.valid(), &windows, &device).unwrap();
    assert_eq!(predictions.len(), windows.len());
    assert!(predictions.iter().all(|p| p.is_finite()));

    assert!(predict_scaled(&model.valid(), &[], &device).unwrap().is_empty());
}

#[test]
fn test_prediction_uses_only_the_last_rows() {
    let table = generate_test_table(40, 15);
    let config = small_config();
    let device = NdArrayDevice::default();

    let (model, scaler, _) = train_model::<BurnBackend>(&table, &config, &device).unwrap();
    let model = model.valid();

    let recent = PriceTable::new(table.tail(5).to_owned()).unwrap();
    let full = predict_next_close(&model, &scaler, &table, 5, &device).unwrap();
    let short = predict_next_close(&model, &scaler, &recent, 5, &device).unwrap();

    assert!((full - short).abs() < 1e-9);
}

#[test]
fn test_prediction_needs_a_full_window() {
    let table = generate_test_table(40, 16);
    let config = small_config();
    let device = NdArrayDevice::default();

    let (model, scaler, _) = train_model::<BurnBackend>(&table, &config, &device).unwrap();
    let history = PriceTable::new(table.tail(3).to_owned()).unwrap();

    let result = predict_next_close(&model.valid(), &scaler, &history, 5, &device);
    assert!(matches!(
        result,
        Err(PipelineError::InsufficientRows {
            required: 5,
            found: 3
        })
    ));
}
