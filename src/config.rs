//! Field configuration for MinHash fields.
//!
//! A field is configured by a small key/value node, the same shape whether it
//! comes from a JSON mapping or a YAML settings file:
//!
//! ```yaml
//! version: "1.0"
//! fields:
//!   content_minhash:
//!     analyzer: shingle
//!     hash_function_count: 128
//!     band_width: 1
//!     compress: true
//!     compress_threshold: 4kb
//! ```
//!
//! Unknown keys and malformed values are rejected with a [`ConfigError`]
//! instead of being ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use minhash::{HashFamilyKind, SignatureConfig, SignatureError};
use packing::CompressionGate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Type name of a MinHash field in a mapping.
pub const CONTENT_TYPE: &str = "minhash";

const DEFAULT_HASH_FUNCTION_COUNT: usize = 128;
const DEFAULT_BAND_WIDTH: usize = 1;
const DEFAULT_SEED: u64 = 0xF00D_BAAD_F00D_BAAD;
const DEFAULT_ANALYZER: &str = "whitespace";

/// Errors raised while loading, validating or merging field configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse field node: {0}")]
    NodeParse(#[from] serde_json::Error),

    #[error("invalid byte size '{0}'")]
    InvalidByteSize(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("merge conflict: {}", .0.join("; "))]
    MergeConflict(Vec<String>),

    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Typed configuration of one MinHash field.
///
/// `hash_function_count`, `band_width`, `seed`, `hash_family` and `analyzer`
/// shape the signature and must not change once documents are indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldNode")]
pub struct FieldConfig {
    pub hash_function_count: usize,
    pub band_width: usize,
    pub seed: u64,
    pub hash_family: HashFamilyKind,
    /// Registered name of the analyzer that tokenizes field text.
    pub analyzer: String,
    /// `None` when never configured; treated as `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    /// Values longer than this are compressed. `None` means no threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress_threshold: Option<u64>,
    /// Keep every occurrence as its own stored value.
    pub store: bool,
    /// Pack all occurrences of a document into one doc-values blob.
    pub doc_values: bool,
    pub use_parallel: bool,
}

impl FieldConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hash_function_count(mut self, n: usize) -> Self {
        self.hash_function_count = n;
        self
    }

    pub fn with_band_width(mut self, width: usize) -> Self {
        self.band_width = width;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hash_family(mut self, family: HashFamilyKind) -> Self {
        self.hash_family = family;
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = analyzer.into();
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Setting a threshold also turns compression on.
    pub fn with_compress_threshold(mut self, threshold: u64) -> Self {
        self.compress_threshold = Some(threshold);
        self.compress = Some(true);
        self
    }

    pub fn with_store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    pub fn with_doc_values(mut self, doc_values: bool) -> Self {
        self.doc_values = doc_values;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    /// Parse a field node such as `{"analyzer": "shingle", "compress_threshold": "1kb"}`.
    ///
    /// Keys may be snake_case or camelCase.
    pub fn from_node(node: Value) -> Result<Self, ConfigError> {
        let node: FieldNode = serde_json::from_value(node)?;
        Self::try_from(node)
    }

    /// Render the field back to a node.
    ///
    /// The analyzer is always written; other keys only when they differ from
    /// the defaults, or always when `include_defaults` is set.
    pub fn to_node(&self, include_defaults: bool) -> Value {
        let defaults = Self::default();
        let mut node = Map::new();
        node.insert("type".into(), json!(CONTENT_TYPE));
        node.insert("analyzer".into(), json!(self.analyzer));

        let mut put = |key: &str, value: Value, is_default: bool| {
            if include_defaults || !is_default {
                node.insert(key.into(), value);
            }
        };
        put(
            "hash_function_count",
            json!(self.hash_function_count),
            self.hash_function_count == defaults.hash_function_count,
        );
        put(
            "band_width",
            json!(self.band_width),
            self.band_width == defaults.band_width,
        );
        put("seed", json!(self.seed), self.seed == defaults.seed);
        put(
            "hash_family",
            json!(self.hash_family.as_str()),
            self.hash_family == defaults.hash_family,
        );
        put("store", json!(self.store), self.store == defaults.store);
        put(
            "doc_values",
            json!(self.doc_values),
            self.doc_values == defaults.doc_values,
        );
        put(
            "use_parallel",
            json!(self.use_parallel),
            self.use_parallel == defaults.use_parallel,
        );
        match self.compress {
            Some(compress) => put("compress", json!(compress), false),
            None => put("compress", json!(false), true),
        }
        match self.compress_threshold {
            Some(threshold) => put("compress_threshold", json!(format_byte_size(threshold)), false),
            None => put("compress_threshold", json!(-1), true),
        }
        Value::Object(node)
    }

    /// Check the signature shape and analyzer name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signature_config().validate()?;
        if self.analyzer.trim().is_empty() {
            return Err(ConfigError::Validation(
                "analyzer must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Signature generator settings for this field.
    pub fn signature_config(&self) -> SignatureConfig {
        SignatureConfig::new()
            .with_hash_function_count(self.hash_function_count)
            .with_band_width(self.band_width)
            .with_seed(self.seed)
            .with_family(self.hash_family)
            .with_parallel(self.use_parallel)
    }

    /// Compression gate for stored values and doc-values blobs.
    pub fn compression_gate(&self) -> CompressionGate {
        CompressionGate::from_field(self.compress.unwrap_or(false), self.compress_threshold)
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            hash_function_count: DEFAULT_HASH_FUNCTION_COUNT,
            band_width: DEFAULT_BAND_WIDTH,
            seed: DEFAULT_SEED,
            hash_family: HashFamilyKind::default(),
            analyzer: DEFAULT_ANALYZER.to_string(),
            compress: None,
            compress_threshold: None,
            store: true,
            doc_values: true,
            use_parallel: false,
        }
    }
}

/// Whether [`merge`] commits the incoming settings or only checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Report conflicts; return the base configuration unchanged.
    Simulate,
    /// Report conflicts; otherwise return the merged configuration.
    Apply,
}

/// Merge `incoming` into `base`.
///
/// Signature-shaping keys cannot change on a live field, so any difference
/// there is a conflict in both modes. The compression settings are taken from
/// `incoming` when it sets them.
pub fn merge(
    base: &FieldConfig,
    incoming: &FieldConfig,
    mode: MergeMode,
) -> Result<FieldConfig, ConfigError> {
    let mut conflicts = Vec::new();
    if base.hash_function_count != incoming.hash_function_count {
        conflicts.push(format!(
            "hash_function_count {} -> {}",
            base.hash_function_count, incoming.hash_function_count
        ));
    }
    if base.band_width != incoming.band_width {
        conflicts.push(format!(
            "band_width {} -> {}",
            base.band_width, incoming.band_width
        ));
    }
    if base.seed != incoming.seed {
        conflicts.push(format!("seed {} -> {}", base.seed, incoming.seed));
    }
    if base.hash_family != incoming.hash_family {
        conflicts.push(format!(
            "hash_family {} -> {}",
            base.hash_family.as_str(),
            incoming.hash_family.as_str()
        ));
    }
    if base.analyzer != incoming.analyzer {
        conflicts.push(format!(
            "analyzer {} -> {}",
            base.analyzer, incoming.analyzer
        ));
    }
    if !conflicts.is_empty() {
        return Err(ConfigError::MergeConflict(conflicts));
    }

    let mut merged = base.clone();
    if mode == MergeMode::Apply {
        if incoming.compress.is_some() {
            merged.compress = incoming.compress;
        }
        if incoming.compress_threshold.is_some() {
            merged.compress_threshold = incoming.compress_threshold;
        }
    }
    Ok(merged)
}

/// Settings file: a version tag and the MinHash fields by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinHashSettings {
    pub version: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

impl MinHashSettings {
    /// Settings with one field.
    pub fn single(name: impl Into<String>, config: FieldConfig) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), config);
        Self {
            version: "1.0".to_string(),
            fields,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let settings: MinHashSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigError::UnsupportedVersion(v.to_string())),
        }
        for (name, field) in &self.fields {
            field.validate().map_err(|err| {
                ConfigError::Validation(format!("fields.{name}: {err}"))
            })?;
        }
        Ok(())
    }
}

impl Default for MinHashSettings {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            fields: BTreeMap::new(),
        }
    }
}

/// Wire form of a field node: every key optional, unknown keys rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldNode {
    /// Tolerated so full mapping entries parse; must be `minhash` if present.
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default, alias = "hashFunctionCount")]
    hash_function_count: Option<usize>,
    #[serde(default, alias = "bandWidth")]
    band_width: Option<usize>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default, alias = "hashFamily")]
    hash_family: Option<HashFamilyKind>,
    #[serde(default, alias = "minhash_analyzer", alias = "minhashAnalyzer")]
    analyzer: Option<String>,
    #[serde(default)]
    compress: Option<bool>,
    #[serde(default, alias = "compressThreshold")]
    compress_threshold: Option<ThresholdNode>,
    #[serde(default)]
    store: Option<bool>,
    #[serde(default, alias = "docValues")]
    doc_values: Option<bool>,
    #[serde(default, alias = "useParallel")]
    use_parallel: Option<bool>,
}

/// `compress_threshold` as written: a byte count, `-1`, or a size string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ThresholdNode {
    Bytes(i64),
    Text(String),
}

impl ThresholdNode {
    /// `None` for the disabled sentinel `-1`.
    fn resolve(self) -> Result<Option<u64>, ConfigError> {
        match self {
            ThresholdNode::Bytes(-1) => Ok(None),
            ThresholdNode::Bytes(n) => u64::try_from(n)
                .map(Some)
                .map_err(|_| ConfigError::InvalidByteSize(n.to_string())),
            ThresholdNode::Text(text) if text.trim() == "-1" => Ok(None),
            ThresholdNode::Text(text) => parse_byte_size(&text).map(Some),
        }
    }
}

impl TryFrom<FieldNode> for FieldConfig {
    type Error = ConfigError;

    fn try_from(node: FieldNode) -> Result<Self, Self::Error> {
        if let Some(kind) = node.kind.as_deref() {
            if kind != CONTENT_TYPE {
                return Err(ConfigError::Validation(format!(
                    "field type must be '{CONTENT_TYPE}', got '{kind}'"
                )));
            }
        }
        let defaults = FieldConfig::default();
        let compress_threshold = match node.compress_threshold {
            Some(threshold) => threshold.resolve()?,
            None => None,
        };
        // An explicit threshold implies compression unless compress is set.
        let compress = match (node.compress, compress_threshold) {
            (Some(compress), _) => Some(compress),
            (None, Some(_)) => Some(true),
            (None, None) => None,
        };
        let config = FieldConfig {
            hash_function_count: node
                .hash_function_count
                .unwrap_or(defaults.hash_function_count),
            band_width: node.band_width.unwrap_or(defaults.band_width),
            seed: node.seed.unwrap_or(defaults.seed),
            hash_family: node.hash_family.unwrap_or(defaults.hash_family),
            analyzer: node.analyzer.unwrap_or(defaults.analyzer),
            compress,
            compress_threshold,
            store: node.store.unwrap_or(defaults.store),
            doc_values: node.doc_values.unwrap_or(defaults.doc_values),
            use_parallel: node.use_parallel.unwrap_or(defaults.use_parallel),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse `"512"`, `"512b"`, `"4kb"`, `"1 mb"`, `"2g"` (binary multiples).
pub fn parse_byte_size(text: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidByteSize(text.to_string());
    let lower = text.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (digits, unit) = lower.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        "t" | "tb" => 1 << 40,
        _ => return Err(invalid()),
    };
    value.checked_mul(multiplier).ok_or_else(invalid)
}

/// Largest exact unit: `4096` → `"4kb"`, `1000` → `"1000b"`.
pub fn format_byte_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(1 << 40, "tb"), (1 << 30, "gb"), (1 << 20, "mb"), (1 << 10, "kb")];
    for (size, unit) in UNITS {
        if bytes >= size && bytes % size == 0 {
            return format!("{}{unit}", bytes / size);
        }
    }
    format!("{bytes}b")
}
