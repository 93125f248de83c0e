// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Drives one Session end to end from files on disk:
//
//   Step 1: Upload the classifier artifact    (Layer 6 - infra)
//   Step 2: Upload the CSV dataset            (Layer 4 - data)
//   Step 3: Apply label edits, if any         (Layer 6 - infra)
//   Step 4: Baseline report                   (Layer 5 - ml, report)
//   Step 5: FGSM report at the chosen epsilon (Layer 5 - ml, report)
//   Step 6: Write heatmaps, reports.json and  (output_dir)
//           the final labels.json
//
// Upload failures are not fatal: they are logged and the panels
// come back as placeholders, exactly as they would in a UI.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::session::{Panel, Session};
use crate::data::loader::FileArtifact;
use crate::domain::labels::LabelPolicy;
use crate::domain::traits::ArtifactSource;
use crate::infra::labels_store::{load_labels, save_labels};
use crate::ml::context::{DeviceKind, ExecutionContext};

// ─── Evaluation Configuration ────────────────────────────────────────────────
// Run-wide settings. Serialisable so a run can be repeated from a
// saved JSON file with --config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub device:       DeviceKind,
    pub batch_size:   usize,
    pub epsilon:      f32,
    pub label_policy: LabelPolicy,
    pub output_dir:   String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            device:       DeviceKind::Cpu,
            batch_size:   256,
            epsilon:      0.0,
            label_policy: LabelPolicy::Merge,
            output_dir:   "reports".to_string(),
        }
    }
}

impl EvalConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid evaluation config", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved evaluation config to '{}'", path.display());
        Ok(())
    }
}

/// The files one run reads.
#[derive(Debug, Clone)]
pub struct EvalInputs {
    pub model:   PathBuf,
    pub dataset: PathBuf,
    pub labels:  Option<PathBuf>,
}

/// Both panels of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub session: String,
    pub epsilon: f32,
    pub before:  Panel,
    pub after:   Panel,
}

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    config: EvalConfig,
    inputs: EvalInputs,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig, inputs: EvalInputs) -> Self {
        Self { config, inputs }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run on the backend named by the config.
    pub fn execute(&self) -> Result<EvaluationOutcome> {
        let bs = self.config.batch_size;
        match self.config.device {
            DeviceKind::Cpu => self.execute_on(ExecutionContext::cpu(bs)),
            DeviceKind::Wgpu => self.execute_on(ExecutionContext::wgpu(bs)),
        }
    }

    pub fn execute_on<B: AutodiffBackend>(&self, ctx: ExecutionContext<B>) -> Result<EvaluationOutcome> {
        let session = open_session(ctx, self.config.label_policy, &self.inputs)?;

        let before = session.baseline();
        let after  = session.attack(self.config.epsilon);

        let outcome = EvaluationOutcome {
            session: session.id().to_string(),
            epsilon: self.config.epsilon,
            before,
            after,
        };
        let dir = Path::new(&self.config.output_dir);
        write_outputs(dir, &outcome)?;
        save_labels(&dir.join("labels.json"), session.labels())?;
        Ok(outcome)
    }
}

/// Build a session and push the model, dataset and labels through its
/// upload commands.
pub fn open_session<B: AutodiffBackend>(
    ctx:    ExecutionContext<B>,
    policy: LabelPolicy,
    inputs: &EvalInputs,
) -> Result<Session<B>> {
    let mut session = Session::new(ctx, policy);
    upload_all(&mut session, &FileArtifact::new(&inputs.model), &FileArtifact::new(&inputs.dataset))?;

    if let Some(path) = &inputs.labels {
        load_labels(path, session.labels_mut())?;
    }
    Ok(session)
}

/// Upload errors are logged, not returned: the session's panels
/// report them. Only failing to read a source is an error.
pub fn upload_all<B: AutodiffBackend>(
    session: &mut Session<B>,
    model:   &dyn ArtifactSource,
    dataset: &dyn ArtifactSource,
) -> Result<()> {
    match session.upload_model(&model.data_url()?) {
        Ok(classes) => tracing::info!("Loaded '{}' with {} classes", model.describe(), classes),
        Err(e) => tracing::warn!("Model upload '{}' rejected: {}", model.describe(), e),
    }

    match session.upload_dataset(&dataset.data_url()?) {
        Ok(rows) => tracing::info!("Loaded '{}' with {} rows", dataset.describe(), rows),
        Err(e) => tracing::warn!("Dataset upload '{}' rejected: {}", dataset.describe(), e),
    }
    Ok(())
}

/// confusion_before.png, confusion_after.png and reports.json.
fn write_outputs(dir: &Path, outcome: &EvaluationOutcome) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

    for (name, panel) in [("confusion_before.png", &outcome.before), ("confusion_after.png", &outcome.after)] {
        let path = dir.join(name);
        match panel.view() {
            Some(view) => fs::write(&path, &view.heatmap_png)
                .with_context(|| format!("Cannot write '{}'", path.display()))?,
            // A stale picture from an earlier run would be misleading
            None => {
                if path.exists() {
                    fs::remove_file(&path)
                        .with_context(|| format!("Cannot remove stale '{}'", path.display()))?;
                }
            }
        }
    }

    let json = serde_json::to_string_pretty(outcome)?;
    let path = dir.join("reports.json");
    fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Wrote reports to '{}'", dir.display());
    Ok(())
}
