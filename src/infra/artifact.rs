// ============================================================
// Layer 6 — Classifier Artifact Store
// ============================================================
// A classifier travels as one self-describing binary blob:
//
//   ┌──────────┬──────────────┬──────────────────┬─────────────────┐
//   │ FGSMCLF1 │ header len   │ ClassifierSpec   │ weights record  │
//   │ 8 bytes  │ u32 LE       │ JSON             │ named MessagePack│
//   └──────────┴──────────────┴──────────────────┴─────────────────┘
//
// The JSON header carries the graph (layer kinds, shapes, input
// shape, differentiable flag) so the module can be rebuilt before
// the weights are loaded into it. The weights are Burn's
// NamedMpkBytesRecorder output at full precision.
//
// Loading never trusts the header: the graph is shape-checked, every
// loaded parameter is compared against the shape the graph expects,
// and finally Classifier::from_parts runs the module on a zero
// image. Any failure is a ModelLoad error.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::Path};

use anyhow::Context;
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::ml::model::{Classifier, ClassifierSpec, SequentialNet, SequentialNetRecord};

pub const MAGIC: &[u8; 8] = b"FGSMCLF1";
const PREFIX_LEN: usize = MAGIC.len() + 4;

fn recorder() -> NamedMpkBytesRecorder<FullPrecisionSettings> {
    NamedMpkBytesRecorder::<FullPrecisionSettings>::default()
}

/// Serialise a graph and its weights into artifact bytes.
pub fn encode_artifact<B: Backend>(spec: &ClassifierSpec, net: &SequentialNet<B>) -> PipelineResult<Vec<u8>> {
    spec.output_width()?;

    let header = serde_json::to_vec(spec)
        .map_err(|e| PipelineError::ModelLoad(format!("cannot encode graph header: {e}")))?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| PipelineError::ModelLoad("graph header exceeds 4 GiB".into()))?;

    let weights = recorder()
        .record(net.clone().into_record(), ())
        .map_err(|e| PipelineError::ModelLoad(format!("cannot encode weights: {e}")))?;

    let mut out = Vec::with_capacity(PREFIX_LEN + header.len() + weights.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&weights);

    tracing::debug!(
        "Encoded classifier '{}': {} header bytes, {} weight bytes",
        spec.name,
        header.len(),
        weights.len()
    );
    Ok(out)
}

/// Split artifact bytes into the graph header and the raw weights.
pub fn read_header(bytes: &[u8]) -> PipelineResult<(ClassifierSpec, &[u8])> {
    if bytes.len() < PREFIX_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(PipelineError::ModelLoad(
            "not a classifier artifact (missing FGSMCLF1 signature)".into(),
        ));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[MAGIC.len()..PREFIX_LEN]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let body = &bytes[PREFIX_LEN..];
    if header_len > body.len() {
        return Err(PipelineError::ModelLoad(format!(
            "header claims {header_len} bytes but only {} follow",
            body.len()
        )));
    }

    let (header, weights) = body.split_at(header_len);
    let spec: ClassifierSpec = serde_json::from_slice(header)
        .map_err(|e| PipelineError::ModelLoad(format!("invalid graph header: {e}")))?;
    Ok((spec, weights))
}

/// Rebuild a ready-to-run classifier from artifact bytes.
pub fn decode_artifact<B: AutodiffBackend>(bytes: &[u8], device: &B::Device) -> PipelineResult<Classifier<B>> {
    let (spec, weights) = read_header(bytes)?;
    spec.output_width()?;

    let fresh = spec.init::<B>(device);
    let expected = parameter_shapes(&fresh);

    let record: SequentialNetRecord<B> = recorder()
        .load(weights.to_vec(), device)
        .map_err(|e| PipelineError::ModelLoad(format!("cannot decode weights: {e}")))?;

    // Checked on the record, before any tensor is swapped into the module
    let loaded = record_shapes(&record);
    if loaded != expected {
        return Err(PipelineError::ModelLoad(format!(
            "weights do not fit graph '{}': expected parameter shapes {expected:?}, found {loaded:?}",
            spec.name
        )));
    }

    let net = fresh.load_record(record);
    Classifier::from_parts(spec, net, device)
}

/// Weight and bias shapes of every parametrised layer, in order.
fn parameter_shapes<B: Backend>(net: &SequentialNet<B>) -> Vec<Vec<usize>> {
    let mut shapes = Vec::new();
    for conv in &net.convs {
        shapes.push(conv.weight.dims().to_vec());
        shapes.extend(conv.bias.as_ref().map(|b| b.dims().to_vec()));
    }
    for linear in &net.linears {
        shapes.push(linear.weight.dims().to_vec());
        shapes.extend(linear.bias.as_ref().map(|b| b.dims().to_vec()));
    }
    shapes
}

fn record_shapes<B: Backend>(record: &SequentialNetRecord<B>) -> Vec<Vec<usize>> {
    let mut shapes = Vec::new();
    for conv in &record.convs {
        shapes.push(conv.weight.dims().to_vec());
        shapes.extend(conv.bias.as_ref().map(|b| b.dims().to_vec()));
    }
    for linear in &record.linears {
        shapes.push(linear.weight.dims().to_vec());
        shapes.extend(linear.bias.as_ref().map(|b| b.dims().to_vec()));
    }
    shapes
}

/// Write an artifact to disk, creating parent directories.
pub fn save_artifact<B: Backend>(path: &Path, spec: &ClassifierSpec, net: &SequentialNet<B>) -> anyhow::Result<usize> {
    let bytes = encode_artifact(spec, net)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    fs::write(path, &bytes)
        .with_context(|| format!("Cannot write classifier artifact to '{}'", path.display()))?;
    tracing::info!("Saved classifier '{}' to '{}'", spec.name, path.display());
    Ok(bytes.len())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::NormalizedBatch;
    use crate::ml::context::{CpuBackend, ExecutionContext};
    use crate::ml::inferencer::Inferencer;

    fn images() -> NormalizedBatch {
        let images = (0..5)
            .map(|k| (0..784).map(|i| ((i * 3 + k * 11) % 200) as f32 / 255.0).collect())
            .collect();
        NormalizedBatch::from_images([1, 28, 28], images).unwrap()
    }

    #[test]
    fn test_reloaded_classifier_predicts_identically() {
        let ctx  = ExecutionContext::cpu(8);
        let spec = ClassifierSpec::cnn("round", 10);
        let net  = spec.init::<CpuBackend>(&ctx.device);
        let bytes = encode_artifact(&spec, &net).unwrap();

        let original = Classifier::from_parts(spec, net, &ctx.device).unwrap();
        let reloaded = decode_artifact::<CpuBackend>(&bytes, &ctx.device).unwrap();
        assert_eq!(reloaded.spec(), original.spec());

        let a = Inferencer::new(&original, &ctx).predict(&images()).unwrap();
        let b = Inferencer::new(&reloaded, &ctx).predict(&images()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bias_free_graph_reloads() {
        use crate::ml::fixtures::{region_classifier, region_net, region_spec};

        let ctx = ExecutionContext::cpu(8);
        let bytes = encode_artifact(&region_spec(10), &region_net::<CpuBackend>(10, &ctx.device)).unwrap();
        let reloaded = decode_artifact::<CpuBackend>(&bytes, &ctx.device).unwrap();
        assert_eq!(reloaded.num_classes(), 10);

        let direct = region_classifier::<CpuBackend>(10, &ctx.device);
        let a = Inferencer::new(&direct, &ctx).predict(&images()).unwrap();
        let b = Inferencer::new(&reloaded, &ctx).predict(&images()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_bytes_are_model_load_errors() {
        let device = Default::default();
        let cases: [&[u8]; 3] = [b"", b"not a model at all", b"FGSMCLF1\xff\xff\xff\x7f{}"];
        for bytes in cases {
            let err = decode_artifact::<CpuBackend>(bytes, &device).err().unwrap();
            assert!(matches!(err, PipelineError::ModelLoad(_)), "{err}");
        }
    }

    #[test]
    fn test_weights_from_another_graph_are_rejected() {
        let device = Default::default();
        let small = ClassifierSpec::mlp("small", 3);
        let big   = ClassifierSpec::mlp("big", 10);
        let net   = small.init::<CpuBackend>(&device);
        let mut bytes = encode_artifact(&small, &net).unwrap();

        // Swap in the header of a wider graph, keep the narrow weights
        let (_, weights) = read_header(&bytes).unwrap();
        let weights = weights.to_vec();
        let header = serde_json::to_vec(&big).unwrap();
        bytes.clear();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&weights);

        let err = decode_artifact::<CpuBackend>(&bytes, &device).err().unwrap();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
    }

    #[test]
    fn test_save_artifact_writes_file() {
        let dir  = std::env::temp_dir().join(format!("fgsm-artifact-{}", std::process::id()));
        let path = dir.join("model.fgsm");
        let spec = ClassifierSpec::mlp("disk", 4);
        let net  = spec.init::<CpuBackend>(&Default::default());
        let written = save_artifact(&path, &spec, &net).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), written);
        fs::remove_dir_all(&dir).ok();
    }
}
