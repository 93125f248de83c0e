use burn::{
    module::AutodiffModule,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::{activation, backend::AutodiffBackend},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

/// Convolution border handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// No padding: output shrinks by kernel - 1
    Valid,
    /// Output keeps the input size (odd kernels only)
    Same,
}

/// One step of a sequential classifier graph, as declared in the
/// artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        in_channels:  usize,
        out_channels: usize,
        kernel:       usize,
        padding:      Padding,
        #[serde(default = "default_bias")]
        bias:         bool,
    },
    MaxPool2d {
        kernel: usize,
        stride: usize,
    },
    Relu,
    Tanh,
    Flatten,
    Linear {
        inputs:  usize,
        outputs: usize,
        #[serde(default = "default_bias")]
        bias:    bool,
    },
}

impl LayerSpec {
    pub fn linear(inputs: usize, outputs: usize) -> Self {
        Self::Linear { inputs, outputs, bias: true }
    }

    pub fn conv2d(in_channels: usize, out_channels: usize, kernel: usize, padding: Padding) -> Self {
        Self::Conv2d { in_channels, out_channels, kernel, padding, bias: true }
    }
}

// Headers written before the flag existed always carried biases
fn default_bias() -> bool {
    true
}

fn default_differentiable() -> bool {
    true
}

/// Self-describing classifier header: everything needed to rebuild
/// the module before its weights are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSpec {
    pub name:        String,
    /// (channels, height, width) of one input image
    pub input_shape: [usize; 3],
    pub layers:      Vec<LayerSpec>,
    /// False for frozen graphs that cannot be differentiated
    #[serde(default = "default_differentiable")]
    pub differentiable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeatureShape {
    Spatial([usize; 3]),
    Flat(usize),
}

impl ClassifierSpec {
    /// Two-layer perceptron over flattened 28x28 images.
    pub fn mlp(name: impl Into<String>, classes: usize) -> Self {
        Self {
            name:        name.into(),
            input_shape: [1, 28, 28],
            layers: vec![
                LayerSpec::Flatten,
                LayerSpec::linear(784, 128),
                LayerSpec::Relu,
                LayerSpec::linear(128, classes),
            ],
            differentiable: true,
        }
    }

    /// Small LeNet-style convolutional network for 28x28 images.
    pub fn cnn(name: impl Into<String>, classes: usize) -> Self {
        Self {
            name:        name.into(),
            input_shape: [1, 28, 28],
            layers: vec![
                LayerSpec::conv2d(1, 8, 3, Padding::Same),
                LayerSpec::Relu,
                LayerSpec::MaxPool2d { kernel: 2, stride: 2 },
                LayerSpec::conv2d(8, 16, 3, Padding::Same),
                LayerSpec::Relu,
                LayerSpec::MaxPool2d { kernel: 2, stride: 2 },
                LayerSpec::Flatten,
                LayerSpec::linear(16 * 7 * 7, classes),
            ],
            differentiable: true,
        }
    }

    /// Walk the layer list tracking the feature shape. Returns the
    /// logits width, or a ModelLoad error naming the first layer that
    /// cannot accept its input.
    pub fn output_width(&self) -> PipelineResult<usize> {
        if self.input_shape.iter().any(|&d| d == 0) {
            return Err(PipelineError::ModelLoad(format!(
                "input shape {:?} has a zero dimension",
                self.input_shape
            )));
        }

        let mut shape = FeatureShape::Spatial(self.input_shape);
        for (i, layer) in self.layers.iter().enumerate() {
            shape = step_shape(shape, layer)
                .map_err(|msg| PipelineError::ModelLoad(format!("layer {i} ({layer:?}): {msg}")))?;
        }

        match shape {
            FeatureShape::Flat(n) if n > 0 => Ok(n),
            other => Err(PipelineError::ModelLoad(format!(
                "graph must end in a flat logits layer, ends in {other:?}"
            ))),
        }
    }

    /// Allocate a freshly initialised module for this graph.
    pub fn init<B: Backend>(&self, device: &B::Device) -> SequentialNet<B> {
        let mut convs   = Vec::new();
        let mut pools   = Vec::new();
        let mut linears = Vec::new();

        for layer in &self.layers {
            match *layer {
                LayerSpec::Conv2d { in_channels, out_channels, kernel, padding, bias } => {
                    let padding = match padding {
                        Padding::Valid => PaddingConfig2d::Valid,
                        Padding::Same  => PaddingConfig2d::Same,
                    };
                    convs.push(
                        Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
                            .with_padding(padding)
                            .with_bias(bias)
                            .init(device),
                    );
                }
                LayerSpec::MaxPool2d { kernel, stride } => {
                    pools.push(MaxPool2dConfig::new([kernel, kernel]).with_strides([stride, stride]).init());
                }
                LayerSpec::Linear { inputs, outputs, bias } => {
                    linears.push(LinearConfig::new(inputs, outputs).with_bias(bias).init(device));
                }
                LayerSpec::Relu | LayerSpec::Tanh | LayerSpec::Flatten => {}
            }
        }

        SequentialNet { convs, pools, linears }
    }
}

fn step_shape(shape: FeatureShape, layer: &LayerSpec) -> Result<FeatureShape, String> {
    match (*layer, shape) {
        (LayerSpec::Conv2d { in_channels, out_channels, kernel, padding, .. }, FeatureShape::Spatial([c, h, w])) => {
            if in_channels != c {
                return Err(format!("expects {in_channels} input channels, got {c}"));
            }
            if kernel == 0 || out_channels == 0 {
                return Err("kernel and out_channels must be positive".into());
            }
            match padding {
                Padding::Same if kernel % 2 == 0 => Err(format!("'same' padding needs an odd kernel, got {kernel}")),
                Padding::Same => Ok(FeatureShape::Spatial([out_channels, h, w])),
                Padding::Valid if kernel > h || kernel > w => {
                    Err(format!("kernel {kernel} larger than {h}x{w} input"))
                }
                Padding::Valid => Ok(FeatureShape::Spatial([out_channels, h - kernel + 1, w - kernel + 1])),
            }
        }
        (LayerSpec::MaxPool2d { kernel, stride }, FeatureShape::Spatial([c, h, w])) => {
            if kernel == 0 || stride == 0 {
                return Err("kernel and stride must be positive".into());
            }
            if kernel > h || kernel > w {
                return Err(format!("kernel {kernel} larger than {h}x{w} input"));
            }
            Ok(FeatureShape::Spatial([c, (h - kernel) / stride + 1, (w - kernel) / stride + 1]))
        }
        (LayerSpec::Conv2d { .. } | LayerSpec::MaxPool2d { .. }, FeatureShape::Flat(_)) => {
            Err("needs a spatial input but the features were already flattened".into())
        }
        (LayerSpec::Flatten, FeatureShape::Spatial([c, h, w])) => Ok(FeatureShape::Flat(c * h * w)),
        (LayerSpec::Flatten, flat) => Ok(flat),
        (LayerSpec::Linear { inputs, outputs, .. }, FeatureShape::Flat(n)) => {
            if inputs != n {
                return Err(format!("expects {inputs} inputs, got {n}"));
            }
            Ok(FeatureShape::Flat(outputs))
        }
        (LayerSpec::Linear { .. }, FeatureShape::Spatial(s)) => {
            Err(format!("needs a flattened input, got {s:?}; add a flatten layer"))
        }
        (LayerSpec::Relu | LayerSpec::Tanh, s) => Ok(s),
    }
}

/// Parameter storage for a sequential graph. Layers with weights are
/// kept in declaration order per kind; the ClassifierSpec says how to
/// interleave them.
#[derive(Module, Debug)]
pub struct SequentialNet<B: Backend> {
    pub convs:   Vec<Conv2d<B>>,
    pub pools:   Vec<MaxPool2d>,
    pub linears: Vec<Linear<B>>,
}

enum Features<B: Backend> {
    Spatial(Tensor<B, 4>),
    Flat(Tensor<B, 2>),
}

impl<B: Backend> SequentialNet<B> {
    /// images: [batch, C, H, W] → logits: [batch, classes]
    pub fn forward(&self, images: Tensor<B, 4>, layers: &[LayerSpec]) -> PipelineResult<Tensor<B, 2>> {
        let mut convs   = self.convs.iter();
        let mut pools   = self.pools.iter();
        let mut linears = self.linears.iter();
        let missing = |kind: &str| PipelineError::ModelLoad(format!("graph declares more {kind} layers than were loaded"));

        let mut x = Features::Spatial(images);
        for layer in layers {
            x = match (layer, x) {
                (LayerSpec::Conv2d { .. }, Features::Spatial(t)) => {
                    Features::Spatial(convs.next().ok_or_else(|| missing("conv2d"))?.forward(t))
                }
                (LayerSpec::MaxPool2d { .. }, Features::Spatial(t)) => {
                    Features::Spatial(pools.next().ok_or_else(|| missing("max_pool2d"))?.forward(t))
                }
                (LayerSpec::Linear { .. }, Features::Flat(t)) => {
                    Features::Flat(linears.next().ok_or_else(|| missing("linear"))?.forward(t))
                }
                (LayerSpec::Flatten, Features::Spatial(t)) => Features::Flat(t.flatten(1, 3)),
                (LayerSpec::Relu, Features::Spatial(t)) => Features::Spatial(activation::relu(t)),
                (LayerSpec::Relu, Features::Flat(t)) => Features::Flat(activation::relu(t)),
                (LayerSpec::Tanh, Features::Spatial(t)) => Features::Spatial(activation::tanh(t)),
                (LayerSpec::Tanh, Features::Flat(t)) => Features::Flat(activation::tanh(t)),
                (LayerSpec::Flatten, flat @ Features::Flat(_)) => flat,
                (other, _) => {
                    return Err(PipelineError::ModelLoad(format!("layer {other:?} received the wrong feature rank")));
                }
            };
        }

        match x {
            Features::Flat(t) => Ok(t),
            Features::Spatial(t) => Ok(t.flatten(1, 3)),
        }
    }
}

/// A loaded classifier: its declared graph, the tracked module used
/// for gradient computation, and an untracked copy for inference.
pub struct Classifier<B: AutodiffBackend> {
    spec:        ClassifierSpec,
    net:         SequentialNet<B>,
    frozen:      SequentialNet<B::InnerBackend>,
    num_classes: usize,
}

impl<B: AutodiffBackend> Classifier<B> {
    /// Validate the graph and run it on a zero image to learn the
    /// number of output classes.
    pub fn from_parts(spec: ClassifierSpec, net: SequentialNet<B>, device: &B::Device) -> PipelineResult<Self> {
        let declared = spec.output_width()?;

        let frozen = net.valid();
        let [c, h, w] = spec.input_shape;
        let blank = Tensor::<B::InnerBackend, 4>::zeros([1, c, h, w], device);
        let [_, num_classes] = frozen.forward(blank, &spec.layers)?.dims();
        if num_classes != declared {
            return Err(PipelineError::ModelLoad(format!(
                "graph declares {declared} outputs but a forward pass produced {num_classes}"
            )));
        }

        tracing::info!(
            "Classifier '{}' ready: input {:?}, {} classes, differentiable={}",
            spec.name, spec.input_shape, num_classes, spec.differentiable
        );
        Ok(Self { spec, net, frozen, num_classes })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ClassifierSpec {
        &self.spec
    }

    pub fn input_shape(&self) -> [usize; 3] {
        self.spec.input_shape
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn differentiable(&self) -> bool {
        self.spec.differentiable
    }

    /// Forward pass with gradient tracking.
    pub fn forward(&self, images: Tensor<B, 4>) -> PipelineResult<Tensor<B, 2>> {
        self.net.forward(images, &self.spec.layers)
    }

    /// Forward pass on the inner backend: no autodiff graph is built.
    pub fn forward_untracked(&self, images: Tensor<B::InnerBackend, 4>) -> PipelineResult<Tensor<B::InnerBackend, 2>> {
        self.frozen.forward(images, &self.spec.layers)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    #[test]
    fn test_presets_infer_their_width() {
        assert_eq!(ClassifierSpec::mlp("m", 10).output_width().unwrap(), 10);
        assert_eq!(ClassifierSpec::cnn("c", 4).output_width().unwrap(), 4);
    }

    #[test]
    fn test_missing_flatten_is_model_load_error() {
        let spec = ClassifierSpec {
            name: "broken".into(),
            input_shape: [1, 28, 28],
            layers: vec![LayerSpec::linear(784, 10)],
            differentiable: true,
        };
        assert!(matches!(spec.output_width(), Err(PipelineError::ModelLoad(_))));
    }

    #[test]
    fn test_linear_width_mismatch_names_layer() {
        let spec = ClassifierSpec {
            name: "broken".into(),
            input_shape: [1, 28, 28],
            layers: vec![LayerSpec::Flatten, LayerSpec::linear(100, 10)],
            differentiable: true,
        };
        let msg = spec.output_width().unwrap_err().to_string();
        assert!(msg.contains("layer 1"));
    }

    #[test]
    fn test_valid_conv_and_pool_shapes() {
        let spec = ClassifierSpec {
            name: "valid".into(),
            input_shape: [1, 28, 28],
            layers: vec![
                LayerSpec::conv2d(1, 4, 5, Padding::Valid),
                LayerSpec::MaxPool2d { kernel: 2, stride: 2 },
                LayerSpec::Flatten,
                LayerSpec::linear(4 * 12 * 12, 3),
            ],
            differentiable: true,
        };
        assert_eq!(spec.output_width().unwrap(), 3);
    }

    #[test]
    fn test_classifier_reports_class_count_from_forward_pass() {
        let device = Default::default();
        let spec = ClassifierSpec::cnn("width", 7);
        let net = spec.init::<TestBackend>(&device);
        let classifier = Classifier::from_parts(spec, net, &device).unwrap();
        assert_eq!(classifier.num_classes(), 7);
        assert_eq!(classifier.input_shape(), [1, 28, 28]);
    }

    #[test]
    fn test_bias_flag_defaults_on_and_controls_init() {
        let legacy: LayerSpec = serde_json::from_str(r#"{"kind":"linear","inputs":4,"outputs":2}"#).unwrap();
        assert_eq!(legacy, LayerSpec::linear(4, 2));

        let device = Default::default();
        let spec = ClassifierSpec {
            name: "no-bias".into(),
            input_shape: [1, 2, 2],
            layers: vec![
                LayerSpec::Conv2d { in_channels: 1, out_channels: 2, kernel: 1, padding: Padding::Valid, bias: false },
                LayerSpec::Flatten,
                LayerSpec::Linear { inputs: 8, outputs: 3, bias: false },
            ],
            differentiable: true,
        };
        let net = spec.init::<TestBackend>(&device);
        assert!(net.convs[0].bias.is_none());
        assert!(net.linears[0].bias.is_none());
        assert!(ClassifierSpec::mlp("m", 2).init::<TestBackend>(&device).linears[0].bias.is_some());
    }

    #[test]
    fn test_spec_header_json_is_tagged() {
        let json = serde_json::to_string(&ClassifierSpec::mlp("m", 2)).unwrap();
        assert!(json.contains("\"kind\":\"linear\""));
        let back: ClassifierSpec = serde_json::from_str(&json).unwrap();
        assert!(back.differentiable);
    }
}
