//! Settings for one transformation pass

use crate::consts::{DEFAULT_PARAMETER_PREFIX, ENV_COMPUTE_FRAMES, ENV_FAIL_FAST, ENV_PARALLEL};

/// What to do when a single entry cannot be transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort before commit; the archive is left unchanged
    #[default]
    FailFast,
    /// Report the entry, keep it untouched and commit everything else
    SkipAndContinue,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Transform entries on the rayon pool
    pub parallel: bool,
    pub failure_policy: FailurePolicy,
    /// Recompute StackMapTable frames when encoding
    pub compute_frames: bool,
    /// Prefix for parameters the mapping leaves unnamed (`arg1`, ...)
    pub parameter_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel: true,
            failure_policy: FailurePolicy::FailFast,
            compute_frames: true,
            parameter_prefix: DEFAULT_PARAMETER_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `JREMAP_PARALLEL`, `JREMAP_FAIL_FAST` and
    /// `JREMAP_COMPUTE_FRAMES` (`0`/`false`/`no`/`off` disable, anything else enables)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(parallel) = env_flag(ENV_PARALLEL) {
            config.parallel = parallel;
        }
        if let Some(fail_fast) = env_flag(ENV_FAIL_FAST) {
            config.failure_policy =
                if fail_fast { FailurePolicy::FailFast } else { FailurePolicy::SkipAndContinue };
        }
        if let Some(compute_frames) = env_flag(ENV_COMPUTE_FRAMES) {
            config.compute_frames = compute_frames;
        }
        config
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_compute_frames(mut self, compute_frames: bool) -> Self {
        self.compute_frames = compute_frames;
        self
    }

    pub fn with_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parameter_prefix = prefix.into();
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}
