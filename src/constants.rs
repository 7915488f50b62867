// Input columns, in the order they are stored in a `PriceTable`
pub const PRICE_COLUMNS: [&str; 4] = ["Close/Last", "Open", "High", "Low"];
pub const NUM_FEATURES: usize = PRICE_COLUMNS.len();

// Index of the column the model predicts
pub const CLOSE_COLUMN: usize = 0;

// Model parameters
pub const LOOK_BACK_DAYS: usize = 10; // Number of time steps to look back
pub const HIDDEN_LAYER_SIZE: usize = 100;
pub const OUTPUT_SIZE: usize = 1;

// Training parameters
pub const BATCH_SIZE: usize = 1;
pub const EPOCHS: usize = 150;
pub const LEARNING_RATE: f64 = 0.001;
pub const ADAM_EPSILON: f32 = 1e-8;
pub const LOG_INTERVAL: usize = 25; // Epochs between loss log lines
pub const DEFAULT_SEED: u64 = 42;

// Data preprocessing
pub const FEATURE_RANGE: (f64, f64) = (-1.0, 1.0);

// Data paths
pub const DEFAULT_DATA_PATH: &str = "data/S&P500_5_years.csv";
