//! Scam pattern library
//!
//! Loads scam-type definitions from a JSON source and compiles every
//! regex once. Loading never fails: a missing or unparseable source
//! yields an empty library, a bad record or pattern is dropped, and every
//! such degradation is reported back in [`LibraryLoad::issues`].

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::{RiskLevel, ScamTypeDefinition, Whitelist, WhitelistRules};

/// Built-in library shipped with the crate
const EMBEDDED_LIBRARY: &str = include_str!("../data/scam_library.json");

/// Non-fatal problems encountered while loading a library
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LibraryError {
    #[error("Library source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Library source {source_name} is not valid JSON: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Rejected scam type record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Invalid regex in {scam_type}: {pattern} - {reason}")]
    PatternCompile {
        scam_type: String,
        pattern: String,
        reason: String,
    },
}

/// Where library JSON comes from
pub trait LibrarySource {
    /// Name used in logs and error reports
    fn name(&self) -> String;

    /// Read the raw library document
    fn read(&self) -> Result<String, LibraryError>;
}

/// Library stored in a JSON file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl LibrarySource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<String, LibraryError> {
        std::fs::read_to_string(&self.path).map_err(|e| LibraryError::SourceUnavailable {
            source_name: self.name(),
            reason: e.to_string(),
        })
    }
}

/// Library held in memory
#[derive(Debug, Clone)]
pub struct StrSource {
    name: String,
    content: String,
}

impl StrSource {
    pub fn new(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
        }
    }
}

impl LibrarySource for StrSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read(&self) -> Result<String, LibraryError> {
        Ok(self.content.clone())
    }
}

/// The library compiled into this crate
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSource;

impl LibrarySource for EmbeddedSource {
    fn name(&self) -> String {
        "embedded".to_string()
    }

    fn read(&self) -> Result<String, LibraryError> {
        Ok(EMBEDDED_LIBRARY.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawLibrary {
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    scam_types: Vec<serde_json::Value>,
    #[serde(default)]
    whitelist: Option<WhitelistRules>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScamType {
    #[serde(alias = "id")]
    scam_type: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    risk_level: Option<String>,
    #[serde(default)]
    confidence_weight: Option<f64>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    regex_patterns: Vec<String>,
    #[serde(default)]
    intent_signals: Vec<String>,
    #[serde(default)]
    example_messages: Vec<String>,
}

/// Summary of a loaded library
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LibraryStats {
    pub total_scam_types: usize,
    pub total_patterns: usize,
    pub compiled_patterns: usize,
    pub total_keywords: usize,
    pub library_version: String,
    pub last_updated: String,
    /// First 16 hex chars of the SHA-256 of the source document
    pub fingerprint: String,
}

/// Result of loading a library: always usable, possibly degraded
#[derive(Debug)]
pub struct LibraryLoad {
    pub library: PatternLibrary,
    pub issues: Vec<LibraryError>,
}

impl LibraryLoad {
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Immutable set of compiled scam-type definitions plus the whitelist
#[derive(Debug)]
pub struct PatternLibrary {
    scam_types: Vec<ScamTypeDefinition>,
    whitelist: Whitelist,
    version: Option<String>,
    last_updated: Option<String>,
    fingerprint: String,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::empty()
    }
}

impl PatternLibrary {
    /// A library with no scam types and the built-in whitelist
    pub fn empty() -> Self {
        let mut issues = Vec::new();
        Self {
            scam_types: Vec::new(),
            whitelist: Whitelist::compile(&WhitelistRules::default(), &mut issues),
            version: None,
            last_updated: None,
            fingerprint: fingerprint(""),
        }
    }

    /// Load the library shipped with the crate
    pub fn embedded() -> Self {
        Self::load(&EmbeddedSource).library
    }

    /// Load from a JSON file, degrading to empty on failure
    pub fn from_file<P: AsRef<Path>>(path: P) -> LibraryLoad {
        Self::load(&FileSource::new(path))
    }

    /// Load from any source
    pub fn load(source: &dyn LibrarySource) -> LibraryLoad {
        let mut issues = Vec::new();

        let content = match source.read() {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not load scam library: {}", e);
                issues.push(e);
                return LibraryLoad {
                    library: Self::empty(),
                    issues,
                };
            }
        };

        let library = Self::parse(&source.name(), &content, &mut issues);
        info!(
            "Loaded scam library from {}: {} scam types, {} patterns ({} issues)",
            source.name(),
            library.len(),
            library.scam_types.iter().map(|t| t.patterns.len()).sum::<usize>(),
            issues.len()
        );

        LibraryLoad { library, issues }
    }

    fn parse(source_name: &str, content: &str, issues: &mut Vec<LibraryError>) -> Self {
        let raw: RawLibrary = match serde_json::from_str(content) {
            Ok(raw) => raw,
            Err(e) => {
                let err = LibraryError::Parse {
                    source_name: source_name.to_string(),
                    reason: e.to_string(),
                };
                warn!("Could not load scam library: {}", err);
                issues.push(err);
                return Self::empty();
            }
        };

        let mut seen = HashSet::new();
        let mut scam_types = Vec::new();

        for (index, value) in raw.scam_types.into_iter().enumerate() {
            let record: RawScamType = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    reject(issues, index, e.to_string());
                    continue;
                }
            };

            let id = record.scam_type.trim().to_string();
            if id.is_empty() {
                reject(issues, index, "empty scam_type identifier".to_string());
                continue;
            }
            if !seen.insert(id.clone()) {
                reject(issues, index, format!("duplicate scam_type {}", id));
                continue;
            }

            scam_types.push(compile_definition(id, record, issues));
        }

        let rules = raw.whitelist.unwrap_or_default();
        let whitelist = Whitelist::compile(&rules, issues);

        Self {
            scam_types,
            whitelist,
            version: raw.metadata.version,
            last_updated: raw.metadata.last_updated,
            fingerprint: fingerprint(content),
        }
    }

    /// All scam types in library order
    pub fn scam_types(&self) -> &[ScamTypeDefinition] {
        &self.scam_types
    }

    /// Look up a scam type by identifier
    pub fn get(&self, id: &str) -> Option<&ScamTypeDefinition> {
        self.scam_types.iter().find(|t| t.id == id)
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn len(&self) -> usize {
        self.scam_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scam_types.is_empty()
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats {
            total_scam_types: self.scam_types.len(),
            total_patterns: self.scam_types.iter().map(|t| t.declared_patterns).sum(),
            compiled_patterns: self.scam_types.iter().map(|t| t.patterns.len()).sum(),
            total_keywords: self.scam_types.iter().map(|t| t.keywords.len()).sum(),
            library_version: self.version.clone().unwrap_or_else(|| "unknown".to_string()),
            last_updated: self.last_updated.clone().unwrap_or_else(|| "unknown".to_string()),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

fn reject(issues: &mut Vec<LibraryError>, index: usize, reason: String) {
    let err = LibraryError::InvalidRecord { index, reason };
    warn!("{}", err);
    issues.push(err);
}

fn compile_definition(
    id: String,
    record: RawScamType,
    issues: &mut Vec<LibraryError>,
) -> ScamTypeDefinition {
    let declared_patterns = record.regex_patterns.len();
    let mut patterns = Vec::with_capacity(declared_patterns);

    for pattern in &record.regex_patterns {
        match compile_pattern(pattern) {
            Ok(re) => patterns.push(re),
            Err(e) => {
                let err = LibraryError::PatternCompile {
                    scam_type: id.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                };
                warn!("{}", err);
                issues.push(err);
            }
        }
    }

    let risk_level = match record.risk_level.as_deref() {
        None => Some(RiskLevel::Medium),
        Some(label) => {
            let parsed = RiskLevel::parse(label);
            if parsed.is_none() {
                warn!("Unknown risk level '{}' for {}, using default threshold", label, id);
            }
            parsed
        }
    };

    let confidence_weight = record.confidence_weight.map(|w| {
        let clamped = if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 };
        if clamped != w {
            warn!("confidence_weight {} for {} clamped to {}", w, id, clamped);
        }
        clamped
    });

    let keywords = record
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    ScamTypeDefinition {
        id,
        category: record.category,
        risk_level,
        confidence_weight,
        keywords,
        patterns,
        declared_patterns,
        intent_signals: record.intent_signals,
        example_messages: record.example_messages,
    }
}

/// Compile a library pattern the way all library regexes are matched
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}
