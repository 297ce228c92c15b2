use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

#[cfg(feature = "tch-backend")]
use tch::Device;

const DEFAULT_MODEL_NAME: &str = "nvidia/NVIDIA-Nemotron-3-Nano-30B-A3B-BF16";
const DEFAULT_MODEL_PATH: &str = "/workspace/model";
const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8080/v1";
const DEFAULT_AGENT_WORKSPACE: &str = "/home/ubuntu/OpenManus/workspace";

/// Which inference engine the worker drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// OpenAI-compatible completions server (e.g. `vllm serve`).
    Remote,
    /// In-process TorchScript model; requires the `tch-backend` feature.
    Torch,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Remote => "remote",
            EngineKind::Torch => "torch",
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "torch" | "tch" => EngineKind::Torch,
            _ => EngineKind::Remote,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub listen_addr: SocketAddr,
    pub model_name: String,
    pub model_path: PathBuf,
    pub engine: EngineKind,
    pub engine_url: String,
    pub engine_api_key: Option<String>,
    pub engine_connect_timeout: Duration,
    pub tokenizer_path: PathBuf,
    pub module_path: PathBuf,
    pub eos_token_id: Option<i64>,
    #[cfg(feature = "tch-backend")]
    pub device: Device,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = parse_addr("WORKER_ADDR", 8000);

        let model_name = env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string());
        let model_path =
            PathBuf::from(env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.into()));

        let engine = env::var("ENGINE")
            .map(|raw| EngineKind::parse(&raw))
            .unwrap_or(EngineKind::Remote);
        let engine_url = env::var("ENGINE_URL")
            .unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let engine_api_key = env::var("ENGINE_API_KEY").ok().filter(|k| !k.is_empty());
        let engine_connect_timeout = env::var("ENGINE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let tokenizer_path = env::var("TOKENIZER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| model_path.join("tokenizer.json"));
        let module_path = env::var("MODULE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| model_path.join("model.ts"));
        let eos_token_id = env::var("EOS_TOKEN_ID").ok().and_then(|v| v.parse().ok());

        #[cfg(feature = "tch-backend")]
        let device = {
            let raw = env::var("DEVICE").unwrap_or_else(|_| "cpu".into());
            parse_device(&raw)
        };

        Ok(Self {
            listen_addr,
            model_name,
            model_path,
            engine,
            engine_url,
            engine_api_key,
            engine_connect_timeout,
            tokenizer_path,
            module_path,
            eos_token_id,
            #[cfg(feature = "tch-backend")]
            device,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub listen_addr: SocketAddr,
    pub agent_command: String,
    pub agent_args: Vec<String>,
    pub agent_probe_args: Vec<String>,
    pub agent_workdir: Option<PathBuf>,
    pub workspace_dir: PathBuf,
}

impl BridgeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = parse_addr("BRIDGE_ADDR", 8001);

        let agent_command = env::var("AGENT_COMMAND").unwrap_or_else(|_| "openmanus".to_string());
        let agent_args = env::var("AGENT_ARGS")
            .map(|raw| split_args(&raw))
            .unwrap_or_default();
        let agent_probe_args = env::var("AGENT_PROBE_ARGS")
            .map(|raw| split_args(&raw))
            .unwrap_or_else(|_| vec!["--version".to_string()]);
        let agent_workdir = env::var("AGENT_WORKDIR").ok().map(PathBuf::from);
        let workspace_dir = PathBuf::from(
            env::var("AGENT_WORKSPACE").unwrap_or_else(|_| DEFAULT_AGENT_WORKSPACE.to_string()),
        );

        Ok(Self {
            listen_addr,
            agent_command,
            agent_args,
            agent_probe_args,
            agent_workdir,
            workspace_dir,
        })
    }
}

fn parse_addr(var: &str, default_port: u16) -> SocketAddr {
    env::var(var)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), default_port))
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(feature = "tch-backend")]
fn parse_device(raw: &str) -> Device {
    let lower = raw.to_lowercase();
    if lower.starts_with("cuda") {
        let idx = lower
            .split(':')
            .nth(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if tch::Cuda::is_available() {
            Device::Cuda(idx)
        } else {
            Device::Cpu
        }
    } else {
        Device::Cpu
    }
}
