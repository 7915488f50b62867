use crate::error::PipelineError;
use crate::lstm::step_1_tensor_preparation::{
    create_sequences, prepare_training_windows, windows_to_tensors, EpochShuffler, Window,
    WindowBatch, WindowBatcher,
};
use crate::util::test_utils::{generate_test_table, ramp_table};
use burn::data::dataloader::batcher::Batcher;
use burn_ndarray::{NdArray, NdArrayDevice};
use ndarray::Array2;
use std::collections::HashSet;

type TestBackend = NdArray<f32>;

#[test]
fn test_twelve_rows_look_back_two() {
    let table = ramp_table(12);
    let windows = create_sequences(table.values(), 2);

    assert_eq!(windows.len(), 9);

    let first = &windows[0];
    assert_eq!(first.sequence.dim(), (2, 4));
    assert_eq!(first.sequence.row(0).to_vec(), vec![1.0; 4]);
    assert_eq!(first.sequence.row(1).to_vec(), vec![2.0; 4]);
    assert_eq!(first.target, 3.0);

    // Row 11 (value 12) is never a target
    let last = windows.last().unwrap();
    assert_eq!(last.target, 11.0);
}

#[test]
fn test_window_count_and_targets() {
    let table = generate_test_table(40, 3);
    let values = table.values();

    for look_back in [1, 3, 10, 38] {
        let windows = create_sequences(values, look_back);
        assert_eq!(windows.len(), 40usize.saturating_sub(look_back + 1));

        for (start, window) in windows.iter().enumerate() {
            assert_eq!(window.sequence.dim(), (look_back, 4));
            assert_eq!(window.sequence, values.slice(ndarray::s![start..start + look_back, ..]));
            assert_eq!(window.target, values[[start + look_back, 0]]);
        }
    }
}

#[test]
fn test_short_table_yields_no_windows() {
    let table = ramp_table(11);
    assert!(create_sequences(table.values(), 10).is_empty());
    assert!(create_sequences(ramp_table(3).values(), 10).is_empty());
    assert!(create_sequences(ramp_table(0).values(), 10).is_empty());
    assert_eq!(create_sequences(ramp_table(12).values(), 10).len(), 1);
}

#[test]
fn test_prepare_training_windows_checks_rows_first() {
    let result = prepare_training_windows(&ramp_table(11), 10);
    assert!(matches!(
        result,
        Err(PipelineError::InsufficientRows {
            required: 12,
            found: 11
        })
    ));

    let (scaler, windows) = prepare_training_windows(&ramp_table(12), 10).unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(scaler.n_features(), 4);
    // Scaled ramp: row 10 of 0..=11 maps to -1 + 2 * 10 / 11
    assert!((windows[0].target - (-1.0 + 20.0 / 11.0)).abs() < 1e-12);
}

#[test]
fn test_windows_to_tensors_layout() {
    let table = ramp_table(8);
    let windows = create_sequences(table.values(), 3);
    let device = Default::default();

    let (features, targets) = windows_to_tensors::<TestBackend>(&windows[..2], &device).unwrap();

    assert_eq!(features.dims(), [2, 3, 4]);
    assert_eq!(targets.dims(), [2, 1]);

    let features: Vec<f32> = features.into_data().to_vec().unwrap();
    let targets: Vec<f32> = targets.into_data().to_vec().unwrap();
    assert_eq!(features[..4].to_vec(), vec![1.0f32; 4]);
    assert_eq!(features[12..16].to_vec(), vec![2.0f32; 4]);
    assert_eq!(targets, vec![4.0, 5.0]);
}

#[test]
fn test_batcher_stacks_windows() {
    let windows = create_sequences(ramp_table(10).values(), 4);
    let device = NdArrayDevice::default();

    let batch: Result<WindowBatch<TestBackend>, PipelineError> =
        WindowBatcher.batch(windows[..3].to_vec(), &device);
    let batch = batch.unwrap();

    assert_eq!(batch.sequences.dims(), [3, 4, 4]);
    assert_eq!(batch.targets.dims(), [3, 1]);
}

#[test]
fn test_windows_with_mismatched_shapes_are_rejected() {
    let mut windows = create_sequences(ramp_table(10).values(), 3);
    let device = NdArrayDevice::default();

    windows[2] = Window {
        sequence: Array2::zeros((2, 4)),
        target: 0.0,
    };
    let result = windows_to_tensors::<TestBackend>(&windows, &device);
    assert!(matches!(
        result,
        Err(PipelineError::WindowShape {
            index: 2,
            expected: (3, 4),
            found: (2, 4)
        })
    ));

    let narrow = vec![Window {
        sequence: Array2::zeros((3, 5)),
        target: 0.0,
    }];
    assert!(matches!(
        windows_to_tensors::<TestBackend>(&narrow, &device),
        Err(PipelineError::WindowShape {
            index: 0,
            found: (3, 5),
            ..
        })
    ));

    let batch: Result<WindowBatch<TestBackend>, PipelineError> =
        WindowBatcher.batch(windows, &device);
    assert!(batch.is_err());
}

#[test]
fn test_shuffler_visits_each_item_once_per_epoch() {
    let mut shuffler = EpochShuffler::new(25, 1, 9).unwrap();

    for _ in 0..3 {
        let batches = shuffler.next_epoch();
        assert_eq!(batches.len(), 25);

        let seen: HashSet<usize> = batches.iter().flatten().copied().collect();
        assert_eq!(seen.len(), 25);
        assert!(seen.iter().all(|&i| i < 25));
    }
}

#[test]
fn test_shuffler_drops_partial_batch() {
    let mut shuffler = EpochShuffler::new(10, 3, 1).unwrap();
    assert_eq!(shuffler.n_items(), 10);
    assert_eq!(shuffler.num_batches(), 3);

    let batches = shuffler.next_epoch();
    assert_eq!(batches.len(), 3);
    assert!(batches.iter().all(|b| b.len() == 3));

    let seen: HashSet<usize> = batches.iter().flatten().copied().collect();
    assert_eq!(seen.len(), 9);

    let mut too_few = EpochShuffler::new(2, 3, 1).unwrap();
    assert!(too_few.next_epoch().is_empty());
}

#[test]
fn test_shuffler_reshuffles_and_is_seeded() {
    let mut a = EpochShuffler::new(50, 1, 123).unwrap();
    let mut b = EpochShuffler::new(50, 1, 123).unwrap();

    let a_first = a.next_epoch();
    let a_second = a.next_epoch();
    assert_ne!(a_first, a_second);

    assert_eq!(b.next_epoch(), a_first);
    assert_eq!(b.next_epoch(), a_second);
}

#[test]
fn test_shuffler_rejects_zero_batch_size() {
    assert!(matches!(
        EpochShuffler::new(10, 0, 1),
        Err(PipelineError::InvalidConfig(_))
    ));
}
