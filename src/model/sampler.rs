use std::collections::HashMap;

use crate::model::SamplingParams;

/// Token sampler for the in-process engine.
///
/// Tracks how often each token has been produced so presence and frequency
/// penalties can be applied to the next step's logits.
pub struct Sampler {
    occurrences: HashMap<usize, u32>,
    temperature: f32,
    top_p: f32,
    top_k: i32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

impl Sampler {
    pub fn new(params: &SamplingParams) -> Self {
        Self {
            occurrences: HashMap::new(),
            temperature: params.temperature as f32,
            top_p: params.top_p as f32,
            top_k: params.top_k,
            presence_penalty: params.presence_penalty as f32,
            frequency_penalty: params.frequency_penalty as f32,
        }
    }

    pub fn apply_penalties(&self, logits: &mut [f32]) {
        for (&token, &count) in &self.occurrences {
            if let Some(logit) = logits.get_mut(token) {
                *logit -= self.presence_penalty + count as f32 * self.frequency_penalty;
            }
        }
    }

    /// Picks the next token from raw logits. A non-positive temperature is greedy.
    pub fn sample(&self, logits: &[f32]) -> usize {
        let mut logits = logits.to_vec();
        self.apply_penalties(&mut logits);

        if self.temperature <= 0.0 {
            return argmax(&logits);
        }

        let mut candidates: Vec<(usize, f32)> = logits
            .iter()
            .map(|&logit| logit / self.temperature)
            .enumerate()
            .filter(|(_, logit)| logit.is_finite())
            .collect();
        if candidates.is_empty() {
            return argmax(&logits);
        }
        candidates.sort_unstable_by(|(_, x), (_, y)| y.total_cmp(x));

        if self.top_k > 0 {
            candidates.truncate(self.top_k as usize);
        }

        // softmax over the survivors
        let max = candidates[0].1;
        let mut probs: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|(id, logit)| (id, (logit - max).exp()))
            .collect();
        let sum: f32 = probs.iter().map(|(_, p)| p).sum();
        probs.iter_mut().for_each(|(_, p)| *p /= sum);

        if self.top_p > 0.0 && self.top_p < 1.0 {
            let mut cumulative = 0.0;
            let mut keep = probs.len();
            for (idx, (_, p)) in probs.iter().enumerate() {
                cumulative += p;
                if cumulative >= self.top_p {
                    keep = idx + 1;
                    break;
                }
            }
            probs.truncate(keep);
        }

        let total: f32 = probs.iter().map(|(_, p)| p).sum();
        let dart = fastrand::f32() * total;
        let mut cumulative = 0.0;
        for &(id, p) in &probs {
            cumulative += p;
            if dart <= cumulative {
                return id;
            }
        }
        probs.last().map(|&(id, _)| id).unwrap_or_default()
    }

    pub fn consume_token(&mut self, token: usize) {
        *self.occurrences.entry(token).or_insert(0) += 1;
    }
}

fn argmax(logits: &[f32]) -> usize {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, x), (_, y)| x.total_cmp(y))
        .map(|(id, _)| id)
        .unwrap_or_default()
}
