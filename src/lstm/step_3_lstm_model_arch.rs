// External imports
use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{backend::Backend, Tensor};

// Internal imports
use super::step_2_lstm_cell::{Lstm, LstmState};

/// Configuration for [`StockLstm`]
#[derive(Config, Debug)]
pub struct StockLstmConfig {
    /// Features per time step
    #[config(default = 4)]
    pub input_size: usize,
    /// Width of the hidden and cell state
    #[config(default = 100)]
    pub hidden_size: usize,
    /// Values predicted per window
    #[config(default = 1)]
    pub output_size: usize,
}

impl StockLstmConfig {
    /// Initialize a model with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> StockLstm<B> {
        StockLstm {
            lstm: Lstm::new(self.input_size, self.hidden_size, device),
            output: LinearConfig::new(self.hidden_size, self.output_size).init(device),
        }
    }
}

/// LSTM encoder followed by a linear projection of the final hidden state
#[derive(Module, Debug)]
pub struct StockLstm<B: Backend> {
    lstm: Lstm<B>,
    output: Linear<B>,
}

impl<B: Backend> StockLstm<B> {
    pub fn input_size(&self) -> usize {
        self.lstm.input_size()
    }

    pub fn hidden_size(&self) -> usize {
        self.lstm.hidden_size()
    }

    /// Encode each window from a zero state and project the last hidden state
    ///
    /// # Arguments
    ///
    /// * `x` - Windows of shape [batch_size, look_back_days, input_size]
    ///
    /// # Returns
    ///
    /// Predicted scaled closes of shape [batch_size, output_size]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let batch_size = x.dims()[0];
        let initial = LstmState::zeros(batch_size, self.hidden_size(), &x.device());

        let (_, last) = self.lstm.forward(x, initial);
        self.output.forward(last.hidden)
    }

    /// Mean squared error between predictions and targets
    pub fn mse_loss(&self, pred: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
        let diff = pred - target;
        (diff.clone() * diff).mean()
    }
}
