// External crates
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView2, Axis};

// Local modules
use crate::constants::PRICE_COLUMNS;
use crate::error::{PipelineError, Result};
use crate::util::file_utils::PriceTable;

/// Prices after min-max scaling; same shape as the `PriceTable` they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledTable {
    values: Array2<f64>,
}

impl ScaledTable {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}

fn column_name(idx: usize) -> String {
    PRICE_COLUMNS
        .get(idx)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("column {}", idx))
}

/// Per-column min-max scaler mapping the observed range onto a feature range.
///
/// The only way to obtain a scaler is [`MinMaxScaler::fit`], and it exposes no
/// mutators, so the fitted `data_min`/`data_max` stay frozen for every later
/// transform, including inference on new data.
///
/// A constant column (`max == min`) maps every value to the midpoint of the
/// feature range, and inverse-transforms back to the constant.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    feature_range: (f64, f64),
    data_min: Array1<f64>,
    data_max: Array1<f64>,
}

impl MinMaxScaler {
    /// Fit per-column minimum and maximum over the whole table
    ///
    /// # Arguments
    ///
    /// * `table` - Raw prices to fit on
    /// * `feature_range` - Target interval `(lo, hi)`, `lo < hi`
    pub fn fit(table: &PriceTable, feature_range: (f64, f64)) -> Result<Self> {
        let (lo, hi) = feature_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(PipelineError::InvalidConfig(format!(
                "feature range ({}, {}) must be finite with lo < hi",
                lo, hi
            )));
        }
        if table.is_empty() {
            return Err(PipelineError::EmptyTable);
        }

        let values = table.values();
        for (idx, column) in values.axis_iter(Axis(1)).enumerate() {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::NonFiniteValue {
                    column: column_name(idx),
                });
            }
        }

        let data_min = values.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let data_max = values.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));

        for (idx, (min, max)) in data_min.iter().zip(data_max.iter()).enumerate() {
            if min == max {
                warn!(
                    "{} is constant ({}); scaling it to the feature range midpoint",
                    column_name(idx),
                    min
                );
            }
        }
        debug!("Fitted scaler: min {:?}, max {:?}", data_min, data_max);

        Ok(Self {
            feature_range,
            data_min,
            data_max,
        })
    }

    /// Fit on `table` and scale it in one go
    pub fn fit_transform(
        table: &PriceTable,
        feature_range: (f64, f64),
    ) -> Result<(Self, ScaledTable)> {
        let scaler = Self::fit(table, feature_range)?;
        let scaled = scaler.transform(table)?;
        Ok((scaler, scaled))
    }

    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }

    pub fn data_min(&self) -> &Array1<f64> {
        &self.data_min
    }

    pub fn data_max(&self) -> &Array1<f64> {
        &self.data_max
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn midpoint(&self) -> f64 {
        (self.feature_range.0 + self.feature_range.1) / 2.0
    }

    /// Scale one value of column `column`
    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        let (lo, hi) = self.feature_range;
        let (min, max) = (self.data_min[column], self.data_max[column]);
        if max == min {
            return self.midpoint();
        }
        lo + (hi - lo) * (value - min) / (max - min)
    }

    /// Undo [`transform_value`](Self::transform_value) for column `column`
    pub fn inverse_transform_value(&self, column: usize, scaled: f64) -> f64 {
        let (lo, hi) = self.feature_range;
        let (min, max) = (self.data_min[column], self.data_max[column]);
        if max == min {
            return min;
        }
        min + (scaled - lo) * (max - min) / (hi - lo)
    }

    fn check_width(&self, found: usize) -> Result<()> {
        if found != self.n_features() {
            return Err(PipelineError::ColumnMismatch {
                expected: self.n_features(),
                found,
            });
        }
        Ok(())
    }

    /// Scale a raw view with the fitted parameters
    pub fn transform_view(&self, values: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(values.ncols())?;

        let mut scaled = values.to_owned();
        for (idx, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|v| self.transform_value(idx, v));
            if column.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::NonFiniteValue {
                    column: column_name(idx),
                });
            }
        }
        Ok(scaled)
    }

    /// Scale a whole table
    pub fn transform(&self, table: &PriceTable) -> Result<ScaledTable> {
        let values = self.transform_view(table.values())?;
        Ok(ScaledTable { values })
    }

    /// Map scaled values back to prices
    pub fn inverse_transform(&self, scaled: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(scaled.ncols())?;

        let mut restored = scaled.to_owned();
        for (idx, mut column) in restored.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|v| self.inverse_transform_value(idx, v));
        }
        Ok(restored)
    }
}
