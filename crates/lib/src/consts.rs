/// Application name used for data directories and environment variable prefixes.
pub const APP_NAME: &str = "kiln";

/// Overrides the data root (default: `$XDG_DATA_HOME/kiln`).
pub const ROOT_ENV: &str = "KILN_ROOT";

/// Overrides the directory that per-formula prefixes are created under.
pub const PREFIX_ENV: &str = "KILN_PREFIX";

/// Name of the install receipt written at the prefix root.
pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Scratch directory created inside the source tree.
pub const SCRATCH_DIR: &str = ".kiln";

/// Number of stderr lines kept when reporting a failed step.
pub const STDERR_TAIL_LINES: usize = 20;

/// Length of truncated plan fingerprints.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;
