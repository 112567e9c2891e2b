// Global safety caps and well-known names

// Hierarchy: maximum superclass/interface nesting followed by any walk
pub const MAX_HIERARCHY_DEPTH: usize = 256;

// Archive entries holding compiled classes end with this suffix
pub const CLASS_SUFFIX: &str = ".class";

// Placeholder prefix for parameters the mapping does not name
pub const DEFAULT_PARAMETER_PREFIX: &str = "arg";

// Environment switches read by `Config::from_env`
pub const ENV_PARALLEL: &str = "JREMAP_PARALLEL";
pub const ENV_FAIL_FAST: &str = "JREMAP_FAIL_FAST";
pub const ENV_COMPUTE_FRAMES: &str = "JREMAP_COMPUTE_FRAMES";
