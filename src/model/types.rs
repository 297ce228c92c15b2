use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_TOP_K: i32 = 50;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_STOP: [&str; 3] = ["</s>", "<|user|>", "<|system|>"];
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.0;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    /// Any role outside the three above, including null or non-string
    /// roles. Never rendered.
    Other,
}

impl Role {
    pub fn from_name(name: &str) -> Self {
        match name {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other,
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Role::from_name).unwrap_or(Role::Other))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: i32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            max_tokens: DEFAULT_MAX_TOKENS,
            stop: DEFAULT_STOP.iter().map(|s| s.to_string()).collect(),
            presence_penalty: DEFAULT_PRESENCE_PENALTY,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
        }
    }
}

/// A serverless job: `{"input": {...}}`.
#[derive(Debug, Default, Deserialize)]
pub struct Job {
    #[serde(default, deserialize_with = "null_as_default")]
    pub input: JobInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobInput {
    /// A null list counts as missing.
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    #[serde(default, deserialize_with = "integral")]
    pub top_k: Option<i32>,
    #[serde(default, deserialize_with = "integral")]
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts whole numbers written either as integers or as floats (`256.0`).
fn integral<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let whole = match number.as_i64() {
        Some(n) => n,
        None => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => f as i64,
            _ => return Err(D::Error::custom(format!("expected a whole number, got {number}"))),
        },
    };
    T::try_from(whole)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("{whole} is out of range")))
}

impl JobInput {
    /// Takes each parameter from the input or falls back to its default.
    /// Values are passed through without range checks.
    pub fn sampling_params(&self) -> SamplingParams {
        let defaults = SamplingParams::default();
        SamplingParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            stop: self.stop.clone().unwrap_or(defaults.stop),
            presence_penalty: self.presence_penalty.unwrap_or(defaults.presence_penalty),
            frequency_penalty: self.frequency_penalty.unwrap_or(defaults.frequency_penalty),
        }
    }
}

/// One engine result for one prompt of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub request_id: String,
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl ChatResponse {
    /// Wraps a single engine output in the chat-completion envelope.
    ///
    /// `finish_reason` is always `"stop"`, whatever the engine reported.
    pub fn from_output(output: EngineOutput, model: &str) -> Self {
        Self {
            id: format!("notus-{}", output.request_id),
            object: "chat.completion".to_string(),
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::new(Role::Assistant, output.text.trim()),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage {
                prompt_tokens: output.prompt_tokens,
                completion_tokens: output.completion_tokens,
                total_tokens: output.prompt_tokens + output.completion_tokens,
            },
        }
    }
}
