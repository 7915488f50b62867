// External imports
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use tempfile::NamedTempFile;

// Internal imports
use crate::constants::NUM_FEATURES;
use crate::util::file_utils::PriceTable;

/// Generate a random-walk price table with realistic open/high/low around close
pub fn generate_test_table(num_rows: usize, seed: u64) -> PriceTable {
    let mut rng = StdRng::seed_from_u64(seed);

    // Start with a base price around $100
    let mut current_price = 100.0 + rng.random::<f64>() * 50.0;
    let mut values = Array2::<f64>::zeros((num_rows, NUM_FEATURES));

    for mut row in values.rows_mut() {
        // Random price movement between -1% and +1%
        let movement = (rng.random::<f64>() * 2.0 - 1.0) * 0.01;
        current_price *= 1.0 + movement;

        let open = current_price * (1.0 + (rng.random::<f64>() * 0.01 - 0.005));
        let high = current_price.max(open) * (1.0 + rng.random::<f64>() * 0.005);
        let low = current_price.min(open) * (1.0 - rng.random::<f64>() * 0.005);

        row[0] = current_price;
        row[1] = open;
        row[2] = high;
        row[3] = low;
    }

    PriceTable::new(values).expect("generated table has four columns")
}

/// Rows `[[1,1,1,1], [2,2,2,2], ..., [n,n,n,n]]`
pub fn ramp_table(num_rows: usize) -> PriceTable {
    let rows: Vec<[f64; NUM_FEATURES]> = (1..=num_rows).map(|k| [k as f64; NUM_FEATURES]).collect();
    PriceTable::from_rows(&rows)
}

/// Write `contents` to a temporary `.csv` file that lives as long as the handle
pub fn write_temp_csv(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("create temp csv");
    file.write_all(contents.as_bytes()).expect("write temp csv");
    file.flush().expect("flush temp csv");
    file
}
