use std::{path::Path, time::Instant};

use parking_lot::Mutex;
use tch::{Device, Kind, Tensor, no_grad};
use tokenizers::Tokenizer;
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::WorkerConfig,
    error::ServiceError,
    model::{EngineOutput, SamplingParams, sampler::Sampler},
};

/// A TorchScript causal language model plus its tokenizer.
pub struct TorchModel {
    tokenizer: Tokenizer,
    device: Device,
    eos_token_id: Option<i64>,
    module: Mutex<tch::CModule>,
}

impl TorchModel {
    pub fn load(config: &WorkerConfig) -> Result<Self, ServiceError> {
        let tokenizer = Tokenizer::from_file(config.tokenizer_path.as_path())
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        let module = load_module(&config.module_path, config.device)?;

        let eos_token_id = config.eos_token_id.or_else(|| {
            tokenizer
                .token_to_id("</s>")
                .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
                .map(i64::from)
        });

        Ok(Self {
            tokenizer,
            device: config.device,
            eos_token_id,
            module: Mutex::new(module),
        })
    }

    pub fn generate(
        &self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<EngineOutput, ServiceError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        let mut input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        if input_ids.is_empty() {
            input_ids.push(0);
        }
        let prompt_tokens = input_ids.len();

        let mut sampler = Sampler::new(params);
        let mut text = String::new();
        let mut finish_reason = "length";
        let start = Instant::now();

        no_grad(|| {
            let module = self.module.lock();

            for _ in 0..params.max_tokens {
                let input_tensor = Tensor::from_slice(&input_ids)
                    .reshape([1, input_ids.len() as i64])
                    .to(self.device);

                let output = module
                    .forward_is(&[tch::IValue::Tensor(input_tensor)])
                    .map_err(|e| ServiceError::Inference(e.to_string()))?;

                // traced models return either bare logits or (logits, past)
                let logits = match output {
                    tch::IValue::Tensor(t) => t,
                    tch::IValue::Tuple(ref tuple) if !tuple.is_empty() => match &tuple[0] {
                        tch::IValue::Tensor(t) => t.shallow_clone(),
                        _ => {
                            return Err(ServiceError::Inference(
                                "expected tensor as first tuple element".into(),
                            ));
                        }
                    },
                    _ => {
                        return Err(ServiceError::Inference(
                            "unexpected model output format".into(),
                        ));
                    }
                };

                // [1, seq_len, vocab] -> [vocab]
                let last_logits = logits
                    .select(1, -1)
                    .squeeze()
                    .to_kind(Kind::Float)
                    .to(Device::Cpu);
                let last_logits = Vec::<f32>::try_from(&last_logits)
                    .map_err(|e| ServiceError::Inference(e.to_string()))?;

                let next_token_id = sampler.sample(&last_logits);
                sampler.consume_token(next_token_id);
                let next_token_id = next_token_id as i64;

                if Some(next_token_id) == self.eos_token_id {
                    finish_reason = "stop";
                    break;
                }
                input_ids.push(next_token_id);

                text = self.decode(&input_ids[prompt_tokens..])?;
                if let Some(cut) = first_stop(&text, &params.stop) {
                    text.truncate(cut);
                    finish_reason = "stop";
                    break;
                }
            }

            Ok::<(), ServiceError>(())
        })?;

        let completion_tokens = input_ids.len() - prompt_tokens;
        debug!(
            prompt_tokens,
            completion_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "local generation finished"
        );

        Ok(EngineOutput {
            request_id: Uuid::new_v4().simple().to_string(),
            text,
            prompt_tokens,
            completion_tokens,
            finish_reason: Some(finish_reason.to_string()),
        })
    }

    fn decode(&self, ids: &[i64]) -> Result<String, ServiceError> {
        let ids: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        self.tokenizer
            .decode(&ids, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))
    }
}

fn load_module(module_path: &Path, device: Device) -> Result<tch::CModule, ServiceError> {
    if !module_path.exists() {
        return Err(ServiceError::Inference(format!(
            "model artifact missing: {}",
            module_path.display()
        )));
    }
    let mut module = tch::CModule::load_on_device(module_path, device)
        .map_err(|e| ServiceError::Inference(e.to_string()))?;
    module.set_eval();
    Ok(module)
}

/// Byte offset of the earliest stop sequence in `text`, if any.
fn first_stop(text: &str, stop: &[String]) -> Option<usize> {
    stop.iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
}
