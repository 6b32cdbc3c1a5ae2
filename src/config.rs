//! Centralized configuration and builder for UalScope.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - ParseConfig::from_env() reads the UAL_* env vars; builder overrides on top.
//! - Configuration is an explicit value passed into EseDb::open_with_config (no globals),
//!   so several files can be parsed in parallel with different settings.
//!
//! Defaults are forensic-strict:
//! - verify_checksums = true (a checksum mismatch is a CorruptPageError)
//! - shadow_header = true (fall back to the shadow header copy, with a warning)
//! - max_visited_pages = None (budget = number of pages in the file)

use std::fmt;

/// Default cap for a single reassembled long value (64 MiB).
pub const DEFAULT_MAX_VALUE_BYTES: usize = 64 * 1024 * 1024;

/// Top-level configuration for a single-file parse.
#[derive(Clone, Debug)]
pub struct ParseConfig {
    /// Verify page and header checksums.
    /// Env: UAL_VERIFY_CHECKSUMS (default true; "0|false|off|no" => false)
    pub verify_checksums: bool,

    /// Try the shadow header copy when the primary header is invalid.
    /// Env: UAL_SHADOW_HEADER (default true)
    pub shadow_header: bool,

    /// Upper bound of pages one tree traversal may visit.
    /// None => number of pages in the file (any revisit beyond that is a cycle).
    /// Env: UAL_MAX_VISITED_PAGES
    pub max_visited_pages: Option<usize>,

    /// Upper bound for a reassembled long value (bytes).
    /// Env: UAL_MAX_VALUE_BYTES (default 64 MiB)
    pub max_value_bytes: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            shadow_header: true,
            max_visited_pages: None,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    let s = v.trim().to_ascii_lowercase();
    if s == "1" || s == "true" || s == "on" || s == "yes" {
        Some(true)
    } else if s == "0" || s == "false" || s == "off" || s == "no" {
        Some(false)
    } else {
        None
    }
}

impl ParseConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(on) = env_flag("UAL_VERIFY_CHECKSUMS") {
            cfg.verify_checksums = on;
        }

        if let Some(on) = env_flag("UAL_SHADOW_HEADER") {
            cfg.shadow_header = on;
        }

        if let Ok(v) = std::env::var("UAL_MAX_VISITED_PAGES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.max_visited_pages = Some(n);
                }
            }
        }

        if let Ok(v) = std::env::var("UAL_MAX_VALUE_BYTES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.max_value_bytes = n;
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_verify_checksums(mut self, on: bool) -> Self {
        self.verify_checksums = on;
        self
    }

    pub fn with_shadow_header(mut self, on: bool) -> Self {
        self.shadow_header = on;
        self
    }

    pub fn with_max_visited_pages(mut self, pages: Option<usize>) -> Self {
        self.max_visited_pages = pages;
        self
    }

    pub fn with_max_value_bytes(mut self, bytes: usize) -> Self {
        self.max_value_bytes = bytes;
        self
    }

    /// Effective visited-page budget for a file with `pages_in_file` pages.
    pub fn visit_budget(&self, pages_in_file: u32) -> usize {
        let file_bound = (pages_in_file as usize).max(1);
        match self.max_visited_pages {
            Some(n) => n.min(file_bound),
            None => file_bound,
        }
    }
}

impl fmt::Display for ParseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParseConfig {{ \
             verify_checksums: {}, \
             shadow_header: {}, \
             max_visited_pages: {}, \
             max_value_bytes: {} \
             }}",
            self.verify_checksums,
            self.shadow_header,
            self.max_visited_pages
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default(pages in file)".to_string()),
            self.max_value_bytes,
        )
    }
}

/// Lightweight builder that produces a ParseConfig.
/// EseDb exposes `EseDb::builder()` returning this builder.
#[derive(Clone, Debug)]
pub struct ParseBuilder {
    cfg: ParseConfig,
}

impl Default for ParseBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: ParseConfig::from_env(),
        }
    }
}

impl ParseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: ParseConfig::default(),
        }
    }

    pub fn verify_checksums(mut self, on: bool) -> Self {
        self.cfg.verify_checksums = on;
        self
    }

    pub fn shadow_header(mut self, on: bool) -> Self {
        self.cfg.shadow_header = on;
        self
    }

    pub fn max_visited_pages(mut self, pages: Option<usize>) -> Self {
        self.cfg.max_visited_pages = pages;
        self
    }

    pub fn max_value_bytes(mut self, bytes: usize) -> Self {
        self.cfg.max_value_bytes = bytes;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> ParseConfig {
        self.cfg
    }
}
