//! RoBERTa-family sequence classifier run locally with candle.
//!
//! Weights, config and tokenizer are fetched through the Hugging Face hub
//! cache on first use. Inference runs on the CPU.

use candle_core::{D, DType, Device, Tensor};
use candle_nn::ops::softmax;
use candle_nn::{Linear, Module, VarBuilder, linear};
use candle_transformers::models::xlm_roberta::{Config, XLMRobertaModel};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use sentibot_core::config::ClassifierConfig;
use sentibot_core::sentiment::{ClassProbabilities, SentimentModel};
use sentibot_core::{Result, SentibotError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use tokenizers::Tokenizer;

fn model_error(err: impl Display) -> SentibotError {
    SentibotError::model_unavailable(err.to_string())
}

/// Three-way sentiment classifier (negative / neutral / positive).
pub struct RobertaSentimentModel {
    model_id: String,
    model: SequenceClassifier,
    tokenizer: Tokenizer,
    labels: LabelIndices,
    max_tokens: usize,
    device: Device,
}

impl RobertaSentimentModel {
    /// Downloads (or reuses the cached copy of) the configured model.
    ///
    /// Blocking: hub downloads and weight loading are synchronous.
    pub fn load(config: &ClassifierConfig) -> Result<Self> {
        let device = Device::Cpu;
        let api = Api::new().map_err(|e| model_error(format!("Hugging Face hub unavailable: {e}")))?;
        let repo = api.repo(Repo::new(config.model_id.clone(), RepoType::Model));

        let config_path = fetch(&repo, &config.model_id, "config.json")?;
        let weights_path = fetch(&repo, &config.model_id, "model.safetensors")
            .or_else(|_| fetch(&repo, &config.model_id, "pytorch_model.bin"))?;
        let tokenizer_path = fetch(&repo, &config.model_id, "tokenizer.json").or_else(|_| {
            tracing::info!(
                "{} ships no tokenizer.json, using {}",
                config.model_id,
                config.tokenizer_fallback_id
            );
            let fallback = api.model(config.tokenizer_fallback_id.clone());
            fetch(&fallback, &config.tokenizer_fallback_id, "tokenizer.json")
        })?;

        let config_str = std::fs::read_to_string(&config_path)?;
        let model_config: Config = serde_json::from_str(&config_str)
            .map_err(|e| model_error(format!("Unsupported model config: {e}")))?;
        let class_cfg: ClassifierConfigJson = serde_json::from_str(&config_str)?;
        let labels = LabelIndices::from_id2label(&class_cfg.id2label)?;

        let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                    .map_err(model_error)?
            }
        } else {
            VarBuilder::from_pth(&weights_path, DType::F32, &device).map_err(model_error)?
        };

        let model = SequenceClassifier::new(class_cfg.id2label.len(), &model_config, vb)
            .map_err(model_error)?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            model_error(format!(
                "Failed to load tokenizer from '{}': {}",
                tokenizer_path.display(),
                e
            ))
        })?;

        Ok(Self {
            model_id: config.model_id.clone(),
            model,
            tokenizer,
            labels,
            max_tokens: config.max_tokens.max(2),
            device,
        })
    }

    fn logits(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("Tokenization failed: {e}")))?;

        let ids = truncate_keeping_last(encoding.get_ids(), self.max_tokens);
        let len = ids.len();

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::ones((1, len), DType::U32, &self.device)?;
        let token_type_ids = Tensor::zeros((1, len), DType::U32, &self.device)?;

        let logits = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids)?;
        softmax(&logits, D::Minus1)?.squeeze(0)?.to_vec1::<f32>()
    }
}

impl SentimentModel for RobertaSentimentModel {
    fn name(&self) -> &str {
        &self.model_id
    }

    fn predict(&self, text: &str) -> Result<ClassProbabilities> {
        let probs = self.logits(text).map_err(model_error)?;
        self.labels.probabilities(&probs)
    }
}

/// RoBERTa encoder with the `RobertaClassificationHead` layout:
/// `<s>` hidden state, dense, tanh, out_proj.
struct SequenceClassifier {
    roberta: XLMRobertaModel,
    dense: Linear,
    out_proj: Linear,
}

impl SequenceClassifier {
    fn new(num_labels: usize, cfg: &Config, vb: VarBuilder) -> candle_core::Result<Self> {
        let roberta = XLMRobertaModel::new(cfg, vb.pp("roberta"))?;
        let head = vb.pp("classifier");
        let dense = linear(cfg.hidden_size, cfg.hidden_size, head.pp("dense"))?;
        let out_proj = linear(cfg.hidden_size, num_labels, head.pp("out_proj"))?;
        Ok(Self {
            roberta,
            dense,
            out_proj,
        })
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        token_type_ids: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let hidden_states =
            self.roberta
                .forward(input_ids, attention_mask, token_type_ids, None, None, None)?;
        self.classify(&hidden_states)
    }

    fn classify(&self, hidden_states: &Tensor) -> candle_core::Result<Tensor> {
        let cls = hidden_states.get_on_dim(1, 0)?.contiguous()?;
        let pooled = self.dense.forward(&cls)?.tanh()?;
        self.out_proj.forward(&pooled)
    }
}

fn fetch(repo: &ApiRepo, repo_id: &str, file: &str) -> Result<PathBuf> {
    repo.get(file)
        .map_err(|e| model_error(format!("Failed to fetch {file} from {repo_id}: {e}")))
}

#[derive(Deserialize)]
struct ClassifierConfigJson {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Keeps at most `max` token ids, preserving the trailing end-of-sequence id.
fn truncate_keeping_last(ids: &[u32], max: usize) -> Vec<u32> {
    if ids.len() <= max {
        return ids.to_vec();
    }
    let mut kept = ids[..max - 1].to_vec();
    kept.extend(ids.last());
    kept
}

/// Position of each sentiment class in the model's output vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelIndices {
    negative: usize,
    neutral: usize,
    positive: usize,
}

impl LabelIndices {
    fn from_id2label(id2label: &HashMap<String, String>) -> Result<Self> {
        if id2label.len() != 3 {
            return Err(model_error(format!(
                "Expected a three-class sentiment model, config lists {} labels",
                id2label.len()
            )));
        }

        let find = |prefix: &str| {
            id2label.iter().find_map(|(id, name)| {
                name.to_ascii_lowercase()
                    .starts_with(prefix)
                    .then(|| id.parse::<usize>().ok())
                    .flatten()
            })
        };

        match (find("neg"), find("neu"), find("pos")) {
            (Some(negative), Some(neutral), Some(positive))
                if negative.max(neutral).max(positive) < 3 =>
            {
                Ok(Self {
                    negative,
                    neutral,
                    positive,
                })
            }
            _ => {
                // Generic LABEL_0..LABEL_2 names: the usual negative/neutral/positive order
                tracing::warn!(
                    "Classifier labels {:?} are not named by sentiment, assuming negative/neutral/positive order",
                    id2label.values().collect::<Vec<_>>()
                );
                Ok(Self {
                    negative: 0,
                    neutral: 1,
                    positive: 2,
                })
            }
        }
    }

    fn probabilities(&self, probs: &[f32]) -> Result<ClassProbabilities> {
        let at = |i: usize| {
            probs.get(i).copied().ok_or_else(|| {
                model_error(format!("Model returned {} scores, expected 3", probs.len()))
            })
        };
        Ok(ClassProbabilities::new(
            at(self.negative)?,
            at(self.neutral)?,
            at(self.positive)?,
        ))
    }
}
