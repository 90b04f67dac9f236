//! Configuration for the type oracle and the module scanner.

use crate::compat::oracle::TypeOracle;

/// Display settings of the [`TypeOracle`].
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Namespaces whose types are shown without namespace in diagnostics
    /// (default: `System`, `System.Collections.Generic`).
    pub well_known_namespaces: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            well_known_namespaces: vec![
                "System".to_string(),
                "System.Collections.Generic".to_string(),
            ],
        }
    }
}

impl OracleConfig {
    /// Replace the well-known namespaces.
    #[must_use]
    pub fn well_known_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.well_known_namespaces = namespaces;
        self
    }
}

/// Configuration for [`crate::compat::ModuleScanner`].
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Oracle display settings.
    pub oracle: OracleConfig,

    /// Scan batches on the rayon thread pool (default: true).
    pub parallel: bool,

    /// Decide whether a module was compiled for another platform from its assembly
    /// references when scanning bytes (default: true). When disabled, modules scanned
    /// through [`crate::compat::ModuleScanner::scan_bytes`] are treated as compiled for
    /// the current platform.
    pub detect_platform_change: bool,

    /// Log every applied rewrite at `debug` level (default: true).
    pub log_rewrites: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            oracle: OracleConfig::default(),
            parallel: true,
            detect_platform_change: true,
            log_rewrites: true,
        }
    }
}

impl ScannerConfig {
    /// Set the oracle configuration.
    #[must_use]
    pub fn oracle(mut self, oracle: OracleConfig) -> Self {
        self.oracle = oracle;
        self
    }

    /// Enable or disable parallel batch scans.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable platform change detection.
    #[must_use]
    pub fn detect_platform_change(mut self, detect: bool) -> Self {
        self.detect_platform_change = detect;
        self
    }

    /// Enable or disable rewrite logging.
    #[must_use]
    pub fn log_rewrites(mut self, log_rewrites: bool) -> Self {
        self.log_rewrites = log_rewrites;
        self
    }

    pub(crate) fn build_oracle(&self) -> TypeOracle {
        TypeOracle::new(self.oracle.clone())
    }
}
