pub mod test_prediction;
pub mod test_tensor_preparation;
