// ============================================================
// Layer 5 — LSTM Sequence Model (Burn)
// ============================================================
// The network behind `SequenceModel`:
//
//   [batch, W, 1] scaled ids
//     → LSTM(1 → hidden)    → dropout
//     → LSTM(hidden → hidden), last time step only → dropout
//     → Linear(hidden → dense) + ReLU → dropout
//     → Linear(dense → V)   logits; softmax at prediction time
//
// Trained with RMSProp on categorical cross-entropy against the
// one-hot next-token target. Weights are saved as named
// MessagePack bytes so the checkpoint manager decides where the
// file lands.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    module::AutodiffModule,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig},
    optim::{GradientsParams, Optimizer, RmsPropConfig},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
    tensor::{
        activation::{log_softmax, relu, softmax},
        backend::AutodiffBackend,
    },
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::batcher::{input_tensor, WindowBatcher};
use crate::data::dataset::WindowedDataset;
use crate::domain::traits::SequenceModel;
use crate::domain::window::Window;

/// Backend used for training and generation.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

type WeightsRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

// #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct LstmNetworkConfig {
    /// Vocabulary size V: one output per token id
    pub num_classes: usize,
    #[config(default = 512)]
    pub hidden_size: usize,
    #[config(default = 256)]
    pub dense_size: usize,
    #[config(default = 0.2)]
    pub dropout: f64,
}

impl LstmNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmNetwork<B> {
        LstmNetwork {
            lstm_in: LstmConfig::new(1, self.hidden_size, true).init(device),
            lstm_out: LstmConfig::new(self.hidden_size, self.hidden_size, true).init(device),
            dense: LinearConfig::new(self.hidden_size, self.dense_size).init(device),
            head: LinearConfig::new(self.dense_size, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Two stacked LSTMs read the window; the last hidden state goes
/// through a ReLU layer and a projection onto the vocabulary.
#[derive(Module, Debug)]
pub struct LstmNetwork<B: Backend> {
    pub lstm_in: Lstm<B>,
    pub lstm_out: Lstm<B>,
    pub dense: Linear<B>,
    pub head: Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> LstmNetwork<B> {
    /// inputs: [batch, W, 1] → logits: [batch, V]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 2> {
        let (x, _) = self.lstm_in.forward(inputs, None);
        let x = self.dropout.forward(x);
        let (x, _) = self.lstm_out.forward(x, None);

        // Only the state after the last time step predicts the next token.
        let [batch, steps, hidden] = x.dims();
        let last = x
            .slice([0..batch, steps - 1..steps, 0..hidden])
            .reshape([batch, hidden]);

        let x = self.dropout.forward(last);
        let x = self.dropout.forward(relu(self.dense.forward(x)));
        self.head.forward(x)
    }

    /// Categorical cross-entropy against one-hot targets [batch, V].
    pub fn forward_loss(&self, inputs: Tensor<B, 3>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let log_probs = log_softmax(self.forward(inputs), 1);
        (targets * log_probs).sum_dim(1).mean().neg()
    }
}

/// How `fit` walks the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Seeds the per-epoch shuffle of window order
    pub seed: u64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

/// The Burn network plus its optimizer state, behind `SequenceModel`.
pub struct LstmSequenceModel<B: AutodiffBackend, O> {
    network: LstmNetwork<B>,
    optim: O,
    config: LstmNetworkConfig,
    options: FitOptions,
    device: B::Device,
    rng: StdRng,
}

impl<B, O> LstmSequenceModel<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<LstmNetwork<B>, B>,
{
    pub fn new(config: LstmNetworkConfig, options: FitOptions, optim: O, device: B::Device) -> Self {
        let network = config.init::<B>(&device);
        let rng = StdRng::seed_from_u64(options.seed);
        tracing::info!(
            "Model ready: hidden={}, dense={}, classes={}, {} parameters",
            config.hidden_size,
            config.dense_size,
            config.num_classes,
            network.num_params()
        );
        Self {
            network,
            optim,
            config,
            options,
            device,
            rng,
        }
    }
}

/// A fresh network trained with RMSProp.
pub fn rmsprop_model<B: AutodiffBackend>(
    config: LstmNetworkConfig,
    options: FitOptions,
    device: B::Device,
) -> LstmSequenceModel<B, impl Optimizer<LstmNetwork<B>, B>> {
    LstmSequenceModel::new(config, options, RmsPropConfig::new().init(), device)
}

impl<B, O> SequenceModel for LstmSequenceModel<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<LstmNetwork<B>, B>,
{
    // Burn tensors are immutable values: a cloned module keeps its
    // parameters even after the optimizer produces new ones.
    type Weights = LstmNetwork<B>;

    fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    fn fit(&mut self, dataset: &WindowedDataset) -> Result<f64> {
        if dataset.vocab_size() != self.config.num_classes {
            bail!(
                "dataset has {} classes, model was built for {}",
                dataset.vocab_size(),
                self.config.num_classes
            );
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        order.shuffle(&mut self.rng);

        let batcher = WindowBatcher::<B>::new(self.device.clone(), dataset.vocab_size());
        let mut loss_sum = 0.0f64;
        let mut batches = 0usize;

        for chunk in order.chunks(self.options.batch_size.max(1)) {
            let items: Vec<&Window> = chunk.iter().filter_map(|&i| dataset.window(i)).collect();
            let batch = batcher.batch(&items);

            let loss = self.network.forward_loss(batch.inputs, batch.targets);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches += 1;

            // Backward pass + optimizer update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.network);
            self.network = self
                .optim
                .step(self.options.learning_rate, self.network.clone(), grads);
        }

        if batches == 0 {
            bail!("cannot fit on an empty dataset");
        }
        let mean = loss_sum / batches as f64;
        tracing::debug!("fit: {} batches, mean loss {:.5}", batches, mean);
        Ok(mean)
    }

    fn predict(&self, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        // valid() drops the autodiff graph and disables dropout
        let network = self.network.valid();
        let x = input_tensor::<B::InnerBackend>(inputs, &self.device)?;
        let probs = softmax(network.forward(x), 1);

        let flat = probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read predictions: {e:?}"))?;
        Ok(flat
            .chunks(self.config.num_classes)
            .map(<[f32]>::to_vec)
            .collect())
    }

    fn get_weights(&self) -> Self::Weights {
        self.network.clone()
    }

    fn set_weights(&mut self, weights: Self::Weights) {
        self.network = weights;
    }

    fn save_weights(&self, path: &Path) -> Result<()> {
        let bytes = Recorder::<B>::record(&WeightsRecorder::default(), self.network.clone().into_record(), ())
            .map_err(|e| anyhow!("cannot serialise weights: {e:?}"))?;
        fs::write(path, bytes)
            .with_context(|| format!("Failed to write weights to '{}'", path.display()))
    }

    fn load_weights(&mut self, path: &Path) -> Result<()> {
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read weights from '{}'", path.display()))?;
        let record = Recorder::<B>::load(&WeightsRecorder::default(), bytes, &self.device)
            .map_err(|e| anyhow!("weights at '{}' do not fit this model: {e:?}", path.display()))?;
        self.network = self.network.clone().load_record(record);
        Ok(())
    }
}
