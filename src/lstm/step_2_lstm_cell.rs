// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// Hidden and cell state of the LSTM, each of shape [batch_size, hidden_size].
///
/// State is passed into and returned from the recurrence instead of living on
/// the module, so every call starts from whatever state the caller supplies.
#[derive(Debug, Clone)]
pub struct LstmState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell: Tensor<B, 2>,
}

impl<B: Backend> LstmState<B> {
    /// All-zero state
    pub fn zeros(batch_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch_size, hidden_size], device),
            cell: Tensor::zeros([batch_size, hidden_size], device),
        }
    }
}

/// Single-layer LSTM
#[derive(Module, Debug)]
pub struct Lstm<B: Backend> {
    input_size: usize,
    hidden_size: usize,

    // All four gates (input, forget, cell, output) share one projection each
    input_weights: Linear<B>,
    hidden_weights: Linear<B>,
}

impl<B: Backend> Lstm<B> {
    /// Create a new LSTM
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let gate_size = 4 * hidden_size;

        let input_weights = LinearConfig::new(input_size, gate_size).init(device);
        let hidden_weights = LinearConfig::new(hidden_size, gate_size).init(device);

        Self {
            input_size,
            hidden_size,
            input_weights,
            hidden_weights,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Advance the recurrence by one time step
    ///
    /// # Arguments
    ///
    /// * `x_t` - Input at this step, shape [batch_size, input_size]
    /// * `state` - State after the previous step
    pub fn step(&self, x_t: Tensor<B, 2>, state: LstmState<B>) -> LstmState<B> {
        let hidden_size = self.hidden_size;
        let LstmState { hidden, cell } = state;

        let gates = self.input_weights.forward(x_t) + self.hidden_weights.forward(hidden);

        let i_gate = gates.clone().narrow(1, 0, hidden_size);
        let f_gate = gates.clone().narrow(1, hidden_size, hidden_size);
        let g_gate = gates.clone().narrow(1, 2 * hidden_size, hidden_size);
        let o_gate = gates.narrow(1, 3 * hidden_size, hidden_size);

        let i = activation::sigmoid(i_gate);
        let f = activation::sigmoid(f_gate);
        let g = activation::tanh(g_gate);
        let o = activation::sigmoid(o_gate);

        let cell = f * cell + i * g;
        let hidden = o * activation::tanh(cell.clone());

        LstmState { hidden, cell }
    }

    /// Run the recurrence over a whole sequence
    ///
    /// # Arguments
    ///
    /// * `x` - Input of shape [batch_size, seq_len, input_size]
    /// * `state` - Initial state
    ///
    /// # Returns
    ///
    /// Hidden states for every step, shape [batch_size, seq_len, hidden_size],
    /// and the state after the last step
    pub fn forward(&self, x: Tensor<B, 3>, state: LstmState<B>) -> (Tensor<B, 3>, LstmState<B>) {
        let [batch_size, seq_len, _] = x.dims();

        let mut state = state;
        let mut outputs = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            state = self.step(x_t, state);
            outputs.push(state.hidden.clone().unsqueeze_dim::<3>(1));
        }

        (Tensor::cat(outputs, 1), state)
    }
}
