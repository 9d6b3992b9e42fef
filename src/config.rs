use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "toascan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tunables for one extraction run.
///
/// Serializable so a host application can persist user preferences as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Local results with at least this many medications are accepted
    /// without a remote attempt.
    pub min_medications_local: usize,
    /// Zero means the appointment arm accepts any nonempty appointment set.
    pub min_appointments_local: usize,
    /// When false the local result is final even if it fails the thresholds.
    pub remote_enabled: bool,
    pub remote_base_url: String,
    pub remote_model: String,
    pub remote_timeout_secs: u64,
    /// Minimum plausibility score a result must reach to be returned.
    pub reject_below_score: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_medications_local: 5,
            min_appointments_local: 0,
            remote_enabled: true,
            remote_base_url: "http://localhost:11434".to_string(),
            remote_model: "qwen2.5:7b".to_string(),
            remote_timeout_secs: 90,
            reject_below_score: 40,
        }
    }
}

impl PipelineConfig {
    pub fn local_only() -> Self {
        Self {
            remote_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_min_medications(mut self, min: usize) -> Self {
        self.min_medications_local = min;
        self
    }

    pub fn with_remote(mut self, base_url: &str, model: &str) -> Self {
        self.remote_enabled = true;
        self.remote_base_url = base_url.trim_end_matches('/').to_string();
        self.remote_model = model.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_accept_five_medications_locally() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_medications_local, 5);
        assert_eq!(config.min_appointments_local, 0);
        assert!(config.remote_enabled);
    }

    #[test]
    fn local_only_disables_remote() {
        let config = PipelineConfig::local_only();
        assert!(!config.remote_enabled);
        assert_eq!(config.min_medications_local, 5);
    }

    #[test]
    fn with_remote_trims_trailing_slash() {
        let config = PipelineConfig::local_only().with_remote("http://gpu-box:11434/", "gemma2:9b");
        assert!(config.remote_enabled);
        assert_eq!(config.remote_base_url, "http://gpu-box:11434");
        assert_eq!(config.remote_model, "gemma2:9b");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
