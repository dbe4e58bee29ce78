use std::{fs::File, io::Read, path::Path, sync::Mutex};

use anyhow::{Context, Result, anyhow, bail};
use ort::memory::Allocator;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use tracing::{debug, info};

use crate::data_structures::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};

/// A trained binary classifier. Implementations return the positive-class
/// (fraud) probability for an encoded transaction.
pub trait Classifier {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64>;

    fn feature_importances(&self) -> Option<&FeatureImportances> {
        None
    }
}

/// Per-feature importance scores aligned to [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportances([f64; FEATURE_COUNT]);

impl FeatureImportances {
    pub fn new(scores: [f64; FEATURE_COUNT]) -> Self {
        Self(scores)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open importances file '{}'", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("failed to read importances from '{}'", path.display()))
    }

    /// Reads a JSON array with one score per model feature.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let scores: Vec<f64> = serde_json::from_reader(reader)?;
        let scores: [f64; FEATURE_COUNT] = scores.try_into().map_err(|scores: Vec<f64>| {
            anyhow!(
                "expected {FEATURE_COUNT} importance scores, got {}",
                scores.len()
            )
        })?;

        Ok(Self(scores))
    }

    /// The `n` most influential features, least influential first.
    pub fn top(&self, n: usize) -> Vec<(&'static str, f64)> {
        let mut ranked: Vec<(&'static str, f64)> =
            FEATURE_NAMES.iter().copied().zip(self.0).collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let skip = ranked.len().saturating_sub(n);
        ranked.split_off(skip)
    }
}

/// Classifier backed by an ONNX export of the trained model.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    importances: Option<FeatureImportances>,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(path: P, importances: Option<FeatureImportances>) -> Result<Self> {
        let path = path.as_ref();
        ort::init().commit()?;

        info!(path = %path.display(), "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(path)
            .with_context(|| format!("failed to load model from '{}'", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let output_name = probability_output_name(&output_names)
            .unwrap_or("probabilities")
            .to_string();

        info!(
            input = %input_name,
            output = %output_name,
            importances = importances.is_some(),
            "Model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            importances,
        })
    }

    fn extract_probability(&self, outputs: &ort::session::SessionOutputs) -> Result<f64> {
        if let Some(output) = outputs.get(&self.output_name) {
            if let Some(prob) = probability_from_value(output)? {
                return Ok(prob);
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(prob) = probability_from_value(&output)? {
                debug!(output = %name, prob, "Probability taken from fallback output");
                return Ok(prob);
            }
        }

        bail!("model produced no probability output")
    }
}

impl Classifier for OnnxClassifier {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        let shape = vec![1_i64, FEATURE_COUNT as i64];
        let input =
            Tensor::from_array((shape, features.as_slice().to_vec())).context("failed to build input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("model session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;

        self.extract_probability(&outputs)
    }

    fn feature_importances(&self) -> Option<&FeatureImportances> {
        self.importances.as_ref()
    }
}

/// Picks the output holding class probabilities: a `prob` name first, then
/// an `output` name, then the last output. `label` outputs are never chosen.
pub(crate) fn probability_output_name<'a>(names: &[&'a str]) -> Option<&'a str> {
    let candidates: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| !name.contains("label"))
        .collect();

    candidates
        .iter()
        .find(|name| name.contains("prob"))
        .or_else(|| candidates.iter().find(|name| name.contains("output")))
        .or_else(|| candidates.last())
        .copied()
}

/// Tensor outputs come from most tree exports; label-encoder "zipmap" exports
/// produce `seq(map(int64, float))` instead.
fn probability_from_value(output: &ort::value::DynValue) -> Result<Option<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return probability_from_tensor(&dims, data).map(Some);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return probability_from_sequence_map(output).map(Some);
    }

    Ok(None)
}

fn probability_from_sequence_map(output: &ort::value::DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow!("failed to downcast to sequence: {e}"))?;
    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps.first().context("empty probability sequence")?;
    let pairs = first.try_extract_key_values::<i64, f32>()?;

    probability_from_class_pairs(&pairs)
}

/// Positive-class probability from a `[batch, classes]`, `[classes]` or
/// `[batch, 1]` tensor holding a single row.
pub(crate) fn probability_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64> {
    let classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => bail!("unexpected probability tensor shape {dims:?}"),
    };

    let prob = match classes {
        1 => data.first(),
        c if c >= 2 => data.get(1),
        _ => None,
    };
    prob.map(|&p| f64::from(p))
        .with_context(|| format!("probability tensor of shape {dims:?} is too short"))
}

pub(crate) fn probability_from_class_pairs(pairs: &[(i64, f32)]) -> Result<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(f64::from(*prob));
    }
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - f64::from(*prob));
    }

    bail!("no class probability found in model output")
}
