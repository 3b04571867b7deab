use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "RISKPILOT_";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Recognised `RISKPILOT_*` suffixes.
const ENV_KEYS: &[&str] = &[
    "BIND_ADDR",
    "PORT",
    "LOG_DIR",
    "MAX_UPLOAD_BYTES",
    "SESSION_IDLE_SECS",
    "MAX_SESSIONS",
    "ADVISOR_ENABLED",
    "OLLAMA_URL",
    "OLLAMA_MODEL",
    "ADVISOR_TIMEOUT_SECS",
    "SIMULATION_SAMPLES",
    "SIMULATION_PERCENTILE",
    "SEED",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub bind_addr: String,
    pub port: u16,
    pub log_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_idle_secs: u64,
    pub max_sessions: usize,
    pub advisor: AdvisorSettings,
    pub simulation: SimulationSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8501,
            log_dir: PathBuf::from("logs"),
            max_upload_bytes: 10 * 1024 * 1024,
            session_idle_secs: 60 * 60,
            max_sessions: 256,
            advisor: AdvisorSettings::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvisorSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationSettings {
    pub samples: usize,
    pub percentile: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            samples: 1000,
            percentile: 85.0,
            seed: None,
        }
    }
}

impl AppSettings {
    /// Defaults, then the YAML file if given, then `RISKPILOT_*` variables.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|error| AppError::Io(format!("{}: {}", path.display(), error)))?;
                Self::from_yaml_str(&raw)?
            }
            None => Self::default(),
        };
        settings.apply_env(std::env::vars())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn apply_env<I>(&mut self, vars: I) -> AppResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "BIND_ADDR" => self.bind_addr = value,
                "PORT" => self.port = parse_env(&key, &value)?,
                "LOG_DIR" => self.log_dir = PathBuf::from(value),
                "MAX_UPLOAD_BYTES" => self.max_upload_bytes = parse_env(&key, &value)?,
                "SESSION_IDLE_SECS" => self.session_idle_secs = parse_env(&key, &value)?,
                "MAX_SESSIONS" => self.max_sessions = parse_env(&key, &value)?,
                "ADVISOR_ENABLED" => self.advisor.enabled = parse_env(&key, &value)?,
                "OLLAMA_URL" => self.advisor.endpoint = value,
                "OLLAMA_MODEL" => self.advisor.model = value,
                "ADVISOR_TIMEOUT_SECS" => self.advisor.timeout_secs = parse_env(&key, &value)?,
                "SIMULATION_SAMPLES" => self.simulation.samples = parse_env(&key, &value)?,
                "SIMULATION_PERCENTILE" => self.simulation.percentile = parse_env(&key, &value)?,
                "SEED" => self.simulation.seed = Some(parse_env(&key, &value)?),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.simulation.samples == 0 {
            return Err(AppError::Input("simulation.samples must be positive".to_string()));
        }
        if !(0.0..=100.0).contains(&self.simulation.percentile) {
            return Err(AppError::Input(format!(
                "simulation.percentile must be within 0..=100, got {}",
                self.simulation.percentile
            )));
        }
        if self.session_idle_secs == 0 || self.max_sessions == 0 {
            return Err(AppError::Input(
                "sessionIdleSecs and maxSessions must be positive".to_string(),
            ));
        }
        if self.advisor.timeout_secs == 0 {
            return Err(AppError::Input("advisor.timeoutSecs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// `RISKPILOT_*` variables that match no setting. Settings load before logging
/// is up, so the caller reports these once tracing is initialised.
pub fn unknown_env_keys<I>(vars: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut keys: Vec<String> = vars
        .into_iter()
        .filter_map(|(key, _)| {
            let name = key.strip_prefix(ENV_PREFIX)?;
            (!ENV_KEYS.contains(&name)).then(|| key.clone())
        })
        .collect();
    keys.sort();
    keys
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| AppError::Input(format!("{} has an invalid value '{}'", key, value)))
}
