// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External engine discovery — an ordered, first-match-wins search for the
// Tesseract executable, with a full step-by-step trace for diagnostics.
//
// Discovery is re-run on every OCR invocation: the executable can be
// installed or removed between requests, and the probe is a read-only
// filesystem walk that is safe to run concurrently.

use std::path::{Path, PathBuf};

use scanwerk_core::types::EngineLocation;
use tracing::{debug, instrument};

/// Environment variable naming an explicit engine path.
const ENGINE_ENV_VAR: &str = "TESSERACT_CMD";

/// Executable name looked up on PATH.
#[cfg(windows)]
const ENGINE_EXECUTABLE: &str = "tesseract.exe";
#[cfg(not(windows))]
const ENGINE_EXECUTABLE: &str = "tesseract";

/// Well-known install locations, checked after the env override and PATH.
#[cfg(windows)]
const WELL_KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    r"C:\Users\Public\Tesseract-OCR\tesseract.exe",
];
#[cfg(not(windows))]
const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

/// Access to the process environment and filesystem, injectable so tests
/// can substitute a deterministic fake instead of the real machine state.
pub trait EnvironmentProbe: Send + Sync {
    fn env_var(&self, name: &str) -> Option<String>;
    fn file_exists(&self, path: &Path) -> bool;
    /// Directories from the `PATH` variable, in search order.
    fn path_entries(&self) -> Vec<PathBuf>;
}

/// The real process environment.
pub struct SystemProbe;

impl EnvironmentProbe for SystemProbe {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn path_entries(&self) -> Vec<PathBuf> {
        std::env::var_os("PATH")
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default()
    }
}

/// Locates the external recognition engine.
pub struct EngineLocator {
    probe: Box<dyn EnvironmentProbe>,
}

impl EngineLocator {
    /// A locator probing the real environment.
    pub fn system() -> Self {
        Self::with_probe(Box::new(SystemProbe))
    }

    /// A locator with an injected probe (tests, hermetic environments).
    pub fn with_probe(probe: Box<dyn EnvironmentProbe>) -> Self {
        Self { probe }
    }

    /// Run the ordered discovery search.
    ///
    /// Resolution order:
    /// 1. `TESSERACT_CMD` — only if the named file exists
    /// 2. PATH lookup for the standard executable name
    /// 3. Well-known install directories for the platform
    ///
    /// Every step, hit or miss, is recorded in the discovery log. A fully
    /// failed search yields `path: None` — a reportable operating state for
    /// the caller, not an error.
    #[instrument(skip(self))]
    pub fn locate(&self) -> EngineLocation {
        let mut log = Vec::new();

        // 1. Explicit environment override.
        match self.probe.env_var(ENGINE_ENV_VAR) {
            Some(raw) => {
                let cleaned = raw.trim().trim_matches('"').trim_matches('\'').to_string();
                let candidate = PathBuf::from(&cleaned);
                if self.probe.file_exists(&candidate) {
                    log.push(format!("found via {ENGINE_ENV_VAR}: {cleaned}"));
                    debug!(path = %cleaned, "engine resolved from env override");
                    return EngineLocation {
                        path: Some(candidate),
                        discovery_log: log,
                    };
                }
                log.push(format!(
                    "{ENGINE_ENV_VAR}='{cleaned}' is set but no file exists there"
                ));
            }
            None => log.push(format!("{ENGINE_ENV_VAR} env var not set")),
        }

        // 2. PATH lookup.
        let mut searched_any = false;
        for dir in self.probe.path_entries() {
            searched_any = true;
            let candidate = dir.join(ENGINE_EXECUTABLE);
            if self.probe.file_exists(&candidate) {
                log.push(format!("found via PATH: {}", candidate.display()));
                debug!(path = %candidate.display(), "engine resolved from PATH");
                return EngineLocation {
                    path: Some(candidate),
                    discovery_log: log,
                };
            }
        }
        log.push(if searched_any {
            "not found in system PATH".to_string()
        } else {
            "PATH env var not set".to_string()
        });

        // 3. Well-known install locations.
        for path in WELL_KNOWN_PATHS {
            let candidate = PathBuf::from(path);
            if self.probe.file_exists(&candidate) {
                log.push(format!("found at common location: {path}"));
                debug!(path, "engine resolved from well-known location");
                return EngineLocation {
                    path: Some(candidate),
                    discovery_log: log,
                };
            }
            log.push(format!("checked {path}: not found"));
        }

        log.push("recognition engine not found anywhere".to_string());
        EngineLocation {
            path: None,
            discovery_log: log,
        }
    }
}

impl Default for EngineLocator {
    fn default() -> Self {
        Self::system()
    }
}

// -- Tests --------------------------------------------------------------------
