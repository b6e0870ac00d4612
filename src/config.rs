use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that overrides the classifier artifact location.
pub const MODEL_PATH_ENV: &str = "TRIAGE_MODEL_PATH";

/// Artifact location used when no override is set, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "data/risk_classifier.json";

/// Whether this is a debug build.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Get the classifier artifact path
/// `TRIAGE_MODEL_PATH` if set, else `data/risk_classifier.json`
pub fn model_path() -> PathBuf {
    std::env::var_os(MODEL_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "triage=debug,triage_lib=debug"
    } else {
        "triage=info,triage_lib=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Both values point at the reference artifact, so other tests that
    /// load the shared model see a valid path while this one runs.
    #[test]
    fn model_path_honours_env_override() {
        let absolute = concat!(env!("CARGO_MANIFEST_DIR"), "/data/risk_classifier.json");

        std::env::remove_var(MODEL_PATH_ENV);
        let path = model_path();
        assert!(path.is_relative());
        assert_eq!(path, PathBuf::from(DEFAULT_MODEL_PATH));

        std::env::set_var(MODEL_PATH_ENV, absolute);
        assert_eq!(model_path(), PathBuf::from(absolute));

        std::env::remove_var(MODEL_PATH_ENV);
        assert_eq!(model_path(), PathBuf::from(DEFAULT_MODEL_PATH));
    }

    #[test]
    fn log_filter_targets_crate() {
        assert!(default_log_filter().contains("triage_lib="));
    }
}
