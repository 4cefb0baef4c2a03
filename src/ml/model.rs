use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Embedding, EmbeddingConfig,
        Initializer,
        Linear, LinearConfig,
        Lstm, LstmConfig, LstmState,
    },
    prelude::*,
};

/// Architecture of the character model. Nothing here depends on the batch
/// size, so a checkpoint loads into a model used with any batch.
#[derive(Config, Debug)]
pub struct CharRnnConfig {
    /// Number of distinct characters
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    /// Hidden size of the LSTM
    pub rnn_units:     usize,
}

impl CharRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CharRnn<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device);
        // Glorot-uniform weights for both the input and recurrent kernels.
        let lstm = LstmConfig::new(self.embedding_dim, self.rnn_units, true)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        let output = LinearConfig::new(self.rnn_units, self.vocab_size).init(device);
        CharRnn { embedding, lstm, output }
    }
}

/// Embedding → LSTM (full sequence) → Dense logits over the vocabulary.
#[derive(Module, Debug)]
pub struct CharRnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub lstm:      Lstm<B>,
    pub output:    Linear<B>,
}

impl<B: Backend> CharRnn<B> {
    /// ids: [batch, seq_len] → logits: [batch, seq_len, vocab_size]
    ///
    /// Passing the returned state back in continues the sequence where the
    /// previous call stopped. `None` starts from zeros.
    pub fn forward(
        &self,
        ids:   Tensor<B, 2, Int>,
        state: Option<LstmState<B, 2>>,
    ) -> (Tensor<B, 3>, LstmState<B, 2>) {
        let x = self.embedding.forward(ids);
        let (x, state) = self.lstm.forward(x, state);
        (self.output.forward(x), state)
    }

    /// Mean sparse softmax cross-entropy of every position, from logits.
    pub fn forward_loss(
        &self,
        ids:     Tensor<B, 2, Int>,
        targets: Tensor<B, 2, Int>,
        state:   Option<LstmState<B, 2>>,
    ) -> (Tensor<B, 1>, LstmState<B, 2>) {
        let (logits, state) = self.forward(ids, state);
        let loss = sequence_loss(logits, targets);
        (loss, state)
    }

    pub fn vocab_size(&self) -> usize {
        self.output.weight.dims()[1]
    }
}

/// Flattens [batch, seq, vocab] logits and [batch, seq] targets so every
/// time step counts as one classification.
pub fn sequence_loss<B: Backend>(logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    let [batch, seq, vocab] = logits.dims();
    let ce = CrossEntropyLossConfig::new().init(&logits.device());
    ce.forward(logits.reshape([batch * seq, vocab]), targets.reshape([batch * seq]))
}

/// Detached copy of a recurrent state, for carrying it across batches
/// without backpropagating into earlier batches.
pub fn detach_state<B: Backend>(state: LstmState<B, 2>) -> LstmState<B, 2> {
    LstmState::new(state.cell.detach(), state.hidden.detach())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny() -> (CharRnn<TestBackend>, <TestBackend as Backend>::Device) {
        let device = Default::default();
        let model  = CharRnnConfig::new(12, 8, 16).init::<TestBackend>(&device);
        (model, device)
    }

    #[test]
    fn test_output_shape_is_batch_seq_vocab() {
        let (model, device) = tiny();
        let ids = Tensor::<TestBackend, 2, Int>::zeros([3, 7], &device);
        let (logits, state) = model.forward(ids, None);
        assert_eq!(logits.dims(), [3, 7, 12]);
        assert_eq!(state.hidden.dims(), [3, 16]);
        assert_eq!(model.vocab_size(), 12);
    }

    #[test]
    fn test_accepts_any_sequence_length() {
        let (model, device) = tiny();
        let ids = Tensor::<TestBackend, 2, Int>::zeros([1, 1], &device);
        let (logits, state) = model.forward(ids.clone(), None);
        assert_eq!(logits.dims(), [1, 1, 12]);
        let (logits, _) = model.forward(ids, Some(state));
        assert_eq!(logits.dims(), [1, 1, 12]);
    }

    #[test]
    fn test_untrained_loss_is_near_log_vocab() {
        let (model, device) = tiny();
        let ids     = Tensor::<TestBackend, 2, Int>::zeros([2, 5], &device);
        let targets = Tensor::<TestBackend, 2, Int>::ones([2, 5], &device);
        let (loss, _) = model.forward_loss(ids, targets, None);
        let loss: f64 = loss.into_scalar().elem::<f64>();
        assert!((loss - (12f64).ln()).abs() < 1.0, "loss was {loss}");
    }

    #[test]
    fn test_param_count() {
        let (model, _) = tiny();
        let embedding = 12 * 8;
        // four gates, each with input and hidden transforms carrying a bias
        let lstm   = 4 * (8 * 16 + 16 + 16 * 16 + 16);
        let output = 16 * 12 + 12;
        assert_eq!(model.num_params(), embedding + lstm + output);
    }
}
