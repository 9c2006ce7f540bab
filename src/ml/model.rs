use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AvgPool2d, AvgPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    train::ClassificationOutput,
};
use thiserror::Error;

/// Number of convolution stages; `n_filters` needs one entry per stage.
pub const CONV_STAGES: usize = 4;

const CONV_STRIDE: usize = 2;
const FIRST_KERNEL: usize = 5;
const KERNEL: usize = 3;
const POOL_SIZE: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CnnConfigError {
    #[error("n_filters needs at least {} entries (one per convolution), got {found}", CONV_STAGES)]
    TooFewFilters { found: usize },

    #[error("{field} must be non-zero")]
    ZeroDimension { field: &'static str },

    #[error("input size {size_in} shrinks to {after_convs}x{after_convs} after the convolutions, too small for the {}x{} pool", POOL_SIZE, POOL_SIZE)]
    InputTooSmall { size_in: usize, after_convs: usize },
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct CnnConfig {
    /// Images are size_in x size_in
    pub size_in:     usize,
    pub channel_in:  usize,
    /// Number of output logits (classes)
    pub channel_out: usize,
    /// Filter count per convolution stage; entries past the fourth are unused
    pub n_filters:   Vec<usize>,
}

/// Output shape of one layer, batch dimension omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerShape {
    pub name: &'static str,
    pub dims: Vec<usize>,
}

/// Spatial size after a stride-s convolution with "same" padding.
fn same_conv_size(size: usize) -> usize {
    size.div_ceil(CONV_STRIDE)
}

/// Spatial size after the 2x2 window / stride 1 average pool.
fn pool_size(size: usize) -> usize {
    size.saturating_sub(POOL_SIZE - 1)
}

impl CnnConfig {
    /// 28x28 greyscale digits into 10 classes.
    pub fn mnist(n_filters: Vec<usize>) -> Self {
        Self::new(28, 1, 10, n_filters)
    }

    pub fn input_width(&self) -> usize {
        self.channel_in * self.size_in * self.size_in
    }

    pub fn validate(&self) -> Result<(), CnnConfigError> {
        if self.n_filters.len() < CONV_STAGES {
            return Err(CnnConfigError::TooFewFilters { found: self.n_filters.len() });
        }
        for (field, value) in [
            ("size_in", self.size_in),
            ("channel_in", self.channel_in),
            ("channel_out", self.channel_out),
        ] {
            if value == 0 {
                return Err(CnnConfigError::ZeroDimension { field });
            }
        }
        if self.n_filters[..CONV_STAGES].contains(&0) {
            return Err(CnnConfigError::ZeroDimension { field: "n_filters" });
        }

        let after_convs = (0..CONV_STAGES).fold(self.size_in, |s, _| same_conv_size(s));
        if pool_size(after_convs) == 0 {
            return Err(CnnConfigError::InputTooSmall { size_in: self.size_in, after_convs });
        }
        Ok(())
    }

    /// Per-layer output shapes for this configuration.
    pub fn layer_shapes(&self) -> Result<Vec<LayerShape>, CnnConfigError> {
        self.validate()?;

        let mut shapes = vec![LayerShape {
            name: "reshape",
            dims: vec![self.channel_in, self.size_in, self.size_in],
        }];

        let mut size = self.size_in;
        for (name, filters) in ["conv1", "conv2", "conv3", "conv4"]
            .into_iter()
            .zip(&self.n_filters)
        {
            size = same_conv_size(size);
            shapes.push(LayerShape { name, dims: vec![*filters, size, size] });
        }

        let filters = self.n_filters[CONV_STAGES - 1];
        let pooled  = pool_size(size);
        shapes.push(LayerShape { name: "pool",    dims: vec![filters, pooled, pooled] });
        shapes.push(LayerShape { name: "flatten", dims: vec![filters * pooled * pooled] });
        shapes.push(LayerShape { name: "linear",  dims: vec![self.channel_out] });
        Ok(shapes)
    }

    fn linear_inputs(&self) -> usize {
        let after_convs = (0..CONV_STAGES).fold(self.size_in, |s, _| same_conv_size(s));
        let pooled      = pool_size(after_convs);
        self.n_filters[CONV_STAGES - 1] * pooled * pooled
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<CnnModel<B>, CnnConfigError> {
        self.validate()?;
        let f = &self.n_filters;

        Ok(CnnModel {
            conv1:       ConvBlock::new(self.channel_in, f[0], FIRST_KERNEL, device),
            conv2:       ConvBlock::new(f[0], f[1], KERNEL, device),
            conv3:       ConvBlock::new(f[1], f[2], KERNEL, device),
            conv4:       ConvBlock::new(f[2], f[3], KERNEL, device),
            pool:        AvgPool2dConfig::new([POOL_SIZE, POOL_SIZE])
                             .with_strides([1, 1])
                             .init(),
            linear:      LinearConfig::new(self.linear_inputs(), self.channel_out).init(device),
            size_in:     self.size_in,
            channel_in:  self.channel_in,
        })
    }
}

/// Stride-2 convolution with "same" padding followed by ReLU.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:       Conv2d<B>,
    pub activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    fn new(channels_in: usize, channels_out: usize, kernel: usize, device: &B::Device) -> Self {
        // For odd kernels, k/2 padding gives ceil(n / stride) outputs, i.e. "same".
        let pad  = kernel / 2;
        let conv = Conv2dConfig::new([channels_in, channels_out], [kernel, kernel])
            .with_stride([CONV_STRIDE, CONV_STRIDE])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .init(device);
        Self { conv, activation: Relu::new() }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.activation.forward(self.conv.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct CnnModel<B: Backend> {
    pub conv1:      ConvBlock<B>,
    pub conv2:      ConvBlock<B>,
    pub conv3:      ConvBlock<B>,
    pub conv4:      ConvBlock<B>,
    pub pool:       AvgPool2d,
    pub linear:     Linear<B>,
    pub size_in:    usize,
    pub channel_in: usize,
}

impl<B: Backend> CnnModel<B> {
    /// input: [batch, channel_in * size_in * size_in] → logits [batch, channel_out]
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, _] = input.dims();
        let images = input.reshape([batch_size, self.channel_in, self.size_in, self.size_in]);
        self.forward_image(images)
    }

    /// images: [batch, channel_in, size_in, size_in] → logits [batch, channel_out]
    pub fn forward_image(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);
        let x = self.pool.forward(x);
        self.linear.forward(x.flatten::<2>(1, 3))
    }

    pub fn forward_classification(
        &self,
        images:  Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss   = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());
        ClassificationOutput::new(loss, output, targets)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    fn dims(shapes: &[LayerShape]) -> Vec<(&'static str, Vec<usize>)> {
        shapes.iter().map(|s| (s.name, s.dims.clone())).collect()
    }

    #[test]
    fn test_mnist_layer_shapes() {
        let shapes = CnnConfig::mnist(vec![8, 16, 32, 32]).layer_shapes().unwrap();
        assert_eq!(
            dims(&shapes),
            vec![
                ("reshape", vec![1, 28, 28]),
                ("conv1",   vec![8, 14, 14]),
                ("conv2",   vec![16, 7, 7]),
                ("conv3",   vec![32, 4, 4]),
                ("conv4",   vec![32, 2, 2]),
                ("pool",    vec![32, 1, 1]),
                ("flatten", vec![32]),
                ("linear",  vec![10]),
            ]
        );
    }

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let model  = CnnConfig::mnist(vec![8, 16, 32, 32]).init::<TestBackend>(&device).unwrap();
        let input  = Tensor::<TestBackend, 2>::zeros([3, 784], &device);
        assert_eq!(model.forward(input).dims(), [3, 10]);
    }

    #[test]
    fn test_forward_single_item_batch() {
        let device = Default::default();
        let model  = CnnConfig::mnist(vec![4, 4, 4, 4]).init::<TestBackend>(&device).unwrap();
        let input  = Tensor::<TestBackend, 2>::ones([1, 784], &device);
        assert_eq!(model.forward(input).dims(), [1, 10]);
    }

    #[test]
    fn test_larger_input_widens_linear_layer() {
        // 40 → 20 → 10 → 5 → 3 → pool 2, so the dense layer sees 6*2*2 inputs
        let device = Default::default();
        let cfg    = CnnConfig::new(40, 3, 5, vec![4, 4, 4, 6]);
        let shapes = cfg.layer_shapes().unwrap();
        assert_eq!(shapes[6].dims, vec![24]);

        let model  = cfg.init::<TestBackend>(&device).unwrap();
        let input  = Tensor::<TestBackend, 4>::zeros([2, 3, 40, 40], &device);
        assert_eq!(model.forward_image(input).dims(), [2, 5]);
    }

    #[test]
    fn test_extra_filter_entries_are_ignored() {
        let device = Default::default();
        let model  = CnnConfig::mnist(vec![8, 16, 32, 32, 64]).init::<TestBackend>(&device).unwrap();
        let input  = Tensor::<TestBackend, 2>::zeros([2, 784], &device);
        assert_eq!(model.forward(input).dims(), [2, 10]);
    }

    #[test]
    fn test_parameter_count() {
        let device = Default::default();
        let model  = CnnConfig::mnist(vec![8, 16, 32, 32]).init::<TestBackend>(&device).unwrap();
        // conv1 208 + conv2 1168 + conv3 4640 + conv4 9248 + linear 330
        assert_eq!(model.num_params(), 15_594);
    }

    #[test]
    fn test_too_few_filters() {
        assert_eq!(
            CnnConfig::mnist(vec![8, 16, 32]).validate(),
            Err(CnnConfigError::TooFewFilters { found: 3 })
        );
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert_eq!(
            CnnConfig::new(28, 0, 10, vec![8, 16, 32, 32]).validate(),
            Err(CnnConfigError::ZeroDimension { field: "channel_in" })
        );
        assert_eq!(
            CnnConfig::mnist(vec![8, 0, 32, 32]).validate(),
            Err(CnnConfigError::ZeroDimension { field: "n_filters" })
        );
    }

    #[test]
    fn test_input_too_small() {
        // 16 → 8 → 4 → 2 → 1, nothing left for the 2x2 pool
        assert_eq!(
            CnnConfig::new(16, 1, 10, vec![8, 16, 32, 32]).validate(),
            Err(CnnConfigError::InputTooSmall { size_in: 16, after_convs: 1 })
        );
        assert!(CnnConfig::new(17, 1, 10, vec![8, 16, 32, 32]).validate().is_ok());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let cfg  = CnnConfig::mnist(vec![8, 16, 32, 32]);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CnnConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_filters, cfg.n_filters);
        assert_eq!(back.size_in, 28);
    }

    #[test]
    fn test_gradients_reach_every_stage() {
        type B = Autodiff<NdArray>;
        let device  = Default::default();
        let model   = CnnConfig::mnist(vec![4, 4, 4, 4]).init::<B>(&device).unwrap();
        let images  = Tensor::<B, 2>::random([2, 784], burn::tensor::Distribution::Default, &device);
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(vec![3i64, 7], [2]), &device);

        let out   = model.forward_classification(images, targets);
        let grads = out.loss.backward();

        assert!(model.conv1.conv.weight.grad(&grads).is_some());
        assert!(model.conv4.conv.weight.grad(&grads).is_some());
        assert!(model.linear.weight.grad(&grads).is_some());
    }
}
