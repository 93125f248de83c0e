// Test fixtures: a hand-weighted classifier that is exactly right on
// "region" images, where class c lights up the c-th horizontal band
// of pixels and leaves everything else black.

use burn::{
    module::Param,
    nn::LinearConfig,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::ml::model::{Classifier, ClassifierSpec, LayerSpec, SequentialNet};

const PIXELS: usize = 784;

fn band(classes: usize) -> usize {
    PIXELS / classes
}

pub fn region_spec(classes: usize) -> ClassifierSpec {
    ClassifierSpec {
        name: format!("region-{classes}"),
        input_shape: [1, 28, 28],
        layers: vec![LayerSpec::Flatten, LayerSpec::Linear { inputs: PIXELS, outputs: classes, bias: false }],
        differentiable: true,
    }
}

pub fn region_net<B: Backend>(classes: usize, device: &B::Device) -> SequentialNet<B> {
    let size = band(classes);
    let mut weights = vec![0.0f32; PIXELS * classes];
    for c in 0..classes {
        for p in c * size..(c + 1) * size {
            weights[p * classes + c] = 1.0;
        }
    }

    let mut linear = LinearConfig::new(PIXELS, classes).with_bias(false).init(device);
    linear.weight = Param::from_tensor(Tensor::from_data(TensorData::new(weights, [PIXELS, classes]), device));
    SequentialNet { convs: Vec::new(), pools: Vec::new(), linears: vec![linear] }
}

pub fn region_classifier<B: AutodiffBackend>(classes: usize, device: &B::Device) -> Classifier<B> {
    Classifier::from_parts(region_spec(classes), region_net::<B>(classes, device), device).unwrap()
}

/// Raw 0..=255 pixels of the region image for `class`.
pub fn region_pixels(class: usize, classes: usize) -> Vec<u8> {
    let size = band(classes);
    (0..PIXELS)
        .map(|p| if (class * size..(class + 1) * size).contains(&p) { 255 } else { 0 })
        .collect()
}

/// CSV with a header row and `per_class` rows of every class, labels
/// cycling 0..classes.
pub fn region_csv(per_class: usize, classes: usize) -> String {
    let mut out = String::from("label");
    for p in 0..PIXELS {
        out.push_str(&format!(",pixel{p}"));
    }
    out.push('\n');
    for k in 0..per_class * classes {
        let label = k % classes;
        out.push_str(&label.to_string());
        for v in region_pixels(label, classes) {
            out.push(',');
            out.push_str(&v.to_string());
        }
        out.push('\n');
    }
    out
}
