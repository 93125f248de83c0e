// ============================================================
// Layer 2 — Evaluation Session
// ============================================================
// One user's working state and the actions they can trigger.
//
//   Commands (mutate state)          Queries (pure pipeline runs)
//   ─────────────────────────        ─────────────────────────────
//   upload_model(data_url)           baseline()        → Panel
//   upload_dataset(data_url)         attack(epsilon)   → Panel
//   set_label(index, name)           sweep(grid)       → rows
//   set_labels(edits)
//
// Every query re-normalizes the dataset and re-renders its report;
// nothing derived is cached between calls. Pipeline errors never
// escape a query: they are logged and turned into a Placeholder with
// the text the user should see.
//
//   baseline: no CSV   → "Please upload a CSV file."
//             no model → "Please upload a model first."
//             failure  → "Error processing CSV file."
//   attack:   missing  → "Please upload the dataset and model before
//                         running the attack."
//             failure  → "Error: <message>"

use burn::tensor::backend::AutodiffBackend;
use serde::Serialize;

use crate::data::{csv_reader::parse_dataset, decoder::decode_data_url, normalizer::Normalizer};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::labels::{LabelPolicy, LabelRegistry, SessionId};
use crate::domain::sample::{Dataset, NormalizedBatch};
use crate::infra::artifact::decode_artifact;
use crate::infra::metrics::SweepMetrics;
use crate::ml::{
    attack::{validate_epsilon, FgsmAttack},
    context::ExecutionContext,
    inferencer::{accuracy, Inferencer},
    model::Classifier,
};
use crate::report::{
    self,
    metrics::{ClassificationReport, ConfusionMatrix},
    EvaluationView,
};

pub const NO_DATASET:       &str = "Please upload a CSV file.";
pub const NO_MODEL:         &str = "Please upload a model first.";
pub const CSV_FAILED:       &str = "Error processing CSV file.";
pub const ATTACK_NOT_READY: &str = "Please upload the dataset and model before running the attack.";

/// What a query hands back for display.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Panel {
    Rendered(Box<EvaluationView>),
    Placeholder(String),
}

impl Panel {
    pub fn view(&self) -> Option<&EvaluationView> {
        match self {
            Panel::Rendered(view) => Some(&**view),
            Panel::Placeholder(_) => None,
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Panel::Rendered(_) => None,
            Panel::Placeholder(text) => Some(text),
        }
    }
}

/// The uploaded CSV: parsed rows, or the reason parsing failed.
enum DatasetState {
    Parsed(Dataset),
    Invalid(PipelineError),
}

pub struct Session<B: AutodiffBackend> {
    id:         SessionId,
    ctx:        ExecutionContext<B>,
    policy:     LabelPolicy,
    classifier: Option<Classifier<B>>,
    dataset:    Option<DatasetState>,
    labels:     LabelRegistry,
}

impl<B: AutodiffBackend> Session<B> {
    pub fn new(ctx: ExecutionContext<B>, policy: LabelPolicy) -> Self {
        let id = SessionId::random();
        tracing::info!("Session {} started (batch size {})", id, ctx.batch_size);
        Self {
            id,
            ctx,
            policy,
            classifier: None,
            dataset: None,
            labels: LabelRegistry::new(id),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut LabelRegistry {
        &mut self.labels
    }

    pub fn classifier(&self) -> Option<&Classifier<B>> {
        self.classifier.as_ref()
    }

    // ─── Commands ────────────────────────────────────────────────────────────

    /// Replace the classifier. On failure the session is left with no
    /// classifier at all, never the previous one.
    pub fn upload_model(&mut self, data_url: &str) -> PipelineResult<usize> {
        self.classifier = None;

        let upload = decode_data_url(data_url)?;
        let classifier = decode_artifact::<B>(&upload.bytes, &self.ctx.device)?;
        let classes = classifier.num_classes();

        self.labels.reconcile(classes, self.policy);
        self.classifier = Some(classifier);
        Ok(classes)
    }

    /// Replace the dataset. A CSV that fails to parse is still kept as
    /// "uploaded but broken" so queries report it as a processing error
    /// rather than a missing upload.
    pub fn upload_dataset(&mut self, data_url: &str) -> PipelineResult<usize> {
        let parsed = decode_data_url(data_url).and_then(|upload| parse_dataset(&upload.bytes));
        match parsed {
            Ok(dataset) => {
                let rows = dataset.len();
                self.dataset = Some(DatasetState::Parsed(dataset));
                Ok(rows)
            }
            Err(e) => {
                self.dataset = Some(DatasetState::Invalid(e.clone()));
                Err(e)
            }
        }
    }

    pub fn set_label(&mut self, index: usize, name: impl Into<String>) {
        self.labels.set(index, name);
    }

    /// Apply edits keyed by stringified index; bad keys are ignored.
    pub fn set_labels<'a, I>(&mut self, edits: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.labels.apply_edits(edits)
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub fn baseline(&self) -> Panel {
        let Some(dataset) = &self.dataset else {
            return Panel::Placeholder(NO_DATASET.into());
        };
        let Some(classifier) = &self.classifier else {
            return Panel::Placeholder(NO_MODEL.into());
        };

        match self.baseline_view(classifier, dataset) {
            Ok(view) => Panel::Rendered(Box::new(view)),
            Err(e) => {
                tracing::warn!("Baseline evaluation failed: {}", e);
                Panel::Placeholder(CSV_FAILED.into())
            }
        }
    }

    pub fn attack(&self, epsilon: f32) -> Panel {
        let (Some(classifier), Some(dataset)) = (&self.classifier, &self.dataset) else {
            return Panel::Placeholder(ATTACK_NOT_READY.into());
        };

        match self.attack_view(classifier, dataset, epsilon) {
            Ok(view) => Panel::Rendered(Box::new(view)),
            Err(e) => {
                tracing::warn!("FGSM attack at epsilon={} failed: {}", epsilon, e);
                Panel::Placeholder(format!("Error: {e}"))
            }
        }
    }

    /// Baseline once, then one attack per epsilon of `grid`.
    pub fn sweep(&self, grid: &[f32]) -> anyhow::Result<Vec<SweepMetrics>> {
        let (Some(classifier), Some(dataset)) = (&self.classifier, &self.dataset) else {
            anyhow::bail!(ATTACK_NOT_READY);
        };
        let (batch, truth) = self.prepare(classifier, dataset)?;

        let inferencer = Inferencer::new(classifier, &self.ctx);
        let baseline_acc = accuracy(&truth, &inferencer.predict(&batch)?.classes);
        let attack = FgsmAttack::new(classifier, &self.ctx);

        let mut rows = Vec::with_capacity(grid.len());
        for &epsilon in grid {
            let perturbed = attack.perturb(&batch, &truth, epsilon)?;
            let predicted = inferencer.predict(&perturbed)?.classes;

            let matrix = ConfusionMatrix::compute(&truth, &predicted, classifier.num_classes())?;
            let report = ClassificationReport::from_matrix(&matrix);

            tracing::info!(
                "epsilon={:.3}: baseline={:.4} attacked={:.4}",
                epsilon,
                baseline_acc,
                report.accuracy
            );
            rows.push(SweepMetrics {
                epsilon,
                baseline_acc,
                attacked_acc: report.accuracy,
                macro_f1: report.macro_avg.f1,
            });
        }
        Ok(rows)
    }

    // ─── Pipeline ────────────────────────────────────────────────────────────

    fn prepare(
        &self,
        classifier: &Classifier<B>,
        dataset:    &DatasetState,
    ) -> PipelineResult<(NormalizedBatch, Vec<usize>)> {
        let dataset = match dataset {
            DatasetState::Parsed(dataset) => dataset,
            DatasetState::Invalid(e) => return Err(e.clone()),
        };
        let labels = dataset.labels();
        let classes = classifier.num_classes();
        if let Some(&label) = labels.iter().find(|&&l| l >= classes) {
            return Err(PipelineError::LabelOutOfRange { label, classes });
        }

        let normalizer = Normalizer::for_input_shape(classifier.input_shape());
        let batch = normalizer.normalize_dataset(dataset)?;
        Ok((batch, labels))
    }

    fn baseline_view(&self, classifier: &Classifier<B>, dataset: &DatasetState) -> PipelineResult<EvaluationView> {
        let (batch, truth) = self.prepare(classifier, dataset)?;
        let predicted = Inferencer::new(classifier, &self.ctx).predict(&batch)?.classes;
        let view = report::evaluate(&truth, &predicted, classifier.num_classes(), &self.labels)?;
        tracing::info!("Baseline accuracy {:.4} over {} images", view.accuracy, truth.len());
        Ok(view)
    }

    fn attack_view(
        &self,
        classifier: &Classifier<B>,
        dataset:    &DatasetState,
        epsilon:    f32,
    ) -> PipelineResult<EvaluationView> {
        let epsilon = validate_epsilon(epsilon)?;
        let (batch, truth) = self.prepare(classifier, dataset)?;
        let perturbed = FgsmAttack::new(classifier, &self.ctx).perturb(&batch, &truth, epsilon)?;
        let predicted = Inferencer::new(classifier, &self.ctx).predict(&perturbed)?.classes;
        let view = report::evaluate(&truth, &predicted, classifier.num_classes(), &self.labels)?;
        tracing::info!("Attack at epsilon={:.3}: accuracy {:.4}", epsilon, view.accuracy);
        Ok(view)
    }
}
