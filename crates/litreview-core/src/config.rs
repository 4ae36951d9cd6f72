use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LitReviewError;

/// Top-level configuration loaded from `.litreview.toml`.
///
/// Supports layered resolution: config file > env vars > defaults, followed
/// by [`LitReviewConfig::validate`].
///
/// # Examples
///
/// ```
/// use litreview_core::LitReviewConfig;
///
/// let config = LitReviewConfig::default();
/// assert_eq!(config.review.max_articles, 5);
/// assert_eq!(config.llm.model, "gpt-4o-mini");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LitReviewConfig {
    /// Article table and blob bucket settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Generation endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review selection settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl LitReviewConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Io`] if the file cannot be read, or
    /// [`LitReviewError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use litreview_core::LitReviewConfig;
    /// use std::path::Path;
    ///
    /// let config = LitReviewConfig::from_file(Path::new(".litreview.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LitReviewError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use litreview_core::LitReviewConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// max_articles = 8
    /// "#;
    /// let config = LitReviewConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.max_articles, 8);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LitReviewError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] if a numeric variable cannot be parsed.
    pub fn apply_env(&mut self) -> Result<(), LitReviewError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, which maps variable names to values.
    ///
    /// Recognised names: `LITREVIEW_BUCKET`, `LITREVIEW_TABLE`,
    /// `LITREVIEW_DATABASE`, `LITREVIEW_REVIEW_PREFIX`, `LITREVIEW_MAX_ARTICLES`,
    /// `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`, `OPENAI_TEMPERATURE`.
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] if a numeric variable cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use litreview_core::LitReviewConfig;
    ///
    /// let mut config = LitReviewConfig::default();
    /// config
    ///     .apply_overrides(|key| (key == "OPENAI_MODEL").then(|| "gpt-4o".to_string()))
    ///     .unwrap();
    /// assert_eq!(config.llm.model, "gpt-4o");
    /// ```
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), LitReviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LITREVIEW_BUCKET") {
            self.storage.bucket = Some(PathBuf::from(v));
        }
        if let Some(v) = get("LITREVIEW_TABLE") {
            self.storage.table = Some(v);
        }
        if let Some(v) = get("LITREVIEW_DATABASE") {
            self.storage.database = PathBuf::from(v);
        }
        if let Some(v) = get("LITREVIEW_REVIEW_PREFIX") {
            self.storage.review_prefix = v;
        }
        if let Some(v) = get("LITREVIEW_MAX_ARTICLES") {
            self.review.max_articles = parse_var("LITREVIEW_MAX_ARTICLES", &v)?;
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("OPENAI_TEMPERATURE") {
            self.llm.temperature = parse_var("OPENAI_TEMPERATURE", &v)?;
        }
        Ok(())
    }

    /// Check that the storage and review settings are usable.
    ///
    /// The API key is not checked here: only the `generate` path needs it,
    /// see [`LlmConfig::require_api_key`].
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), LitReviewError> {
        self.storage.bucket()?;
        let table = self.storage.table()?;
        if !is_sql_identifier(table) {
            return Err(LitReviewError::Config(format!(
                "storage.table must be a plain identifier (letters, digits, '_'), got {table:?}"
            )));
        }
        if self.storage.scan_page_size == 0 {
            return Err(LitReviewError::Config(
                "storage.scan_page_size must be greater than 0".into(),
            ));
        }
        if self.review.max_articles == 0 {
            return Err(LitReviewError::Config(
                "review.max_articles must be greater than 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(LitReviewError::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, LitReviewError> {
    value
        .trim()
        .parse()
        .map_err(|_| LitReviewError::Config(format!("{name} has an invalid value: {value:?}")))
}

/// Returns `true` when `name` can be spliced into SQL as a table name.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Where articles are read from and reviews are written to.
///
/// # Examples
///
/// ```
/// use litreview_core::StorageConfig;
///
/// let config = StorageConfig::default();
/// assert_eq!(config.review_prefix, "reviews");
/// assert!(config.bucket.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the blob bucket holding article texts and reviews.
    pub bucket: Option<PathBuf>,
    /// Name of the article table.
    pub table: Option<String>,
    /// SQLite database file holding the article table.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Key prefix for stored review artifacts.
    #[serde(default = "default_review_prefix")]
    pub review_prefix: String,
    /// Records fetched per page when scanning for recent articles.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

impl StorageConfig {
    /// The configured bucket directory.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] if no bucket is set.
    pub fn bucket(&self) -> Result<&Path, LitReviewError> {
        self.bucket
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                LitReviewError::Config(
                    "storage bucket not set: add storage.bucket to .litreview.toml or set LITREVIEW_BUCKET".into(),
                )
            })
    }

    /// The configured article table name.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] if no table is set.
    pub fn table(&self) -> Result<&str, LitReviewError> {
        self.table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                LitReviewError::Config(
                    "article table not set: add storage.table to .litreview.toml or set LITREVIEW_TABLE".into(),
                )
            })
    }
}

fn default_database() -> PathBuf {
    PathBuf::from(".litreview/articles.db")
}

fn default_review_prefix() -> String {
    "reviews".into()
}

fn default_scan_page_size() -> usize {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            table: None,
            database: default_database(),
            review_prefix: default_review_prefix(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

/// Generation endpoint configuration.
///
/// # Examples
///
/// ```
/// use litreview_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// assert_eq!(config.temperature, 0.3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl LlmConfig {
    /// The configured API key.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] if no key is set.
    pub fn require_api_key(&self) -> Result<&str, LitReviewError> {
        self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            LitReviewError::Config(
                "LLM API key not found: set llm.api_key in .litreview.toml or OPENAI_API_KEY env var"
                    .into(),
            )
        })
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f64 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
        }
    }
}

/// Review selection configuration.
///
/// # Examples
///
/// ```
/// use litreview_core::ReviewConfig;
///
/// assert_eq!(ReviewConfig::default().max_articles, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Article count used when a request carries no limit (default: 5).
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
}

fn default_max_articles() -> usize {
    5
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> LitReviewConfig {
        LitReviewConfig::from_toml(
            r#"
[storage]
bucket = "/tmp/bucket"
table = "articles"
"#,
        )
        .unwrap()
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = LitReviewConfig::default();
        assert_eq!(config.review.max_articles, 5);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.3);
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.storage.review_prefix, "reviews");
        assert_eq!(config.storage.scan_page_size, 100);
        assert_eq!(config.storage.database, PathBuf::from(".litreview/articles.db"));
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[storage]
bucket = "/data/bucket"
table = "papers"
database = "/data/papers.db"
review_prefix = "out"
scan_page_size = 25

[llm]
model = "gpt-4o"
base_url = "http://localhost:11434"
temperature = 0.0

[review]
max_articles = 3
"#;
        let config = LitReviewConfig::from_toml(toml).unwrap();
        assert_eq!(config.storage.bucket().unwrap(), Path::new("/data/bucket"));
        assert_eq!(config.storage.table().unwrap(), "papers");
        assert_eq!(config.storage.review_prefix, "out");
        assert_eq!(config.storage.scan_page_size, 25);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.review.max_articles, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = LitReviewConfig::from_toml("").unwrap();
        assert_eq!(config.review.max_articles, 5);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(LitReviewConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("LITREVIEW_BUCKET", "/env/bucket"),
            ("LITREVIEW_TABLE", "env_articles"),
            ("LITREVIEW_MAX_ARTICLES", "7"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_TEMPERATURE", "0.9"),
            ("OPENAI_MODEL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = valid_config();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.storage.bucket().unwrap(), Path::new("/env/bucket"));
        assert_eq!(config.storage.table().unwrap(), "env_articles");
        assert_eq!(config.review.max_articles, 7);
        assert_eq!(config.llm.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.llm.temperature, 0.9);
        // empty values are ignored
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn malformed_numeric_env_is_config_error() {
        let mut config = valid_config();
        let err = config
            .apply_overrides(|k| (k == "LITREVIEW_MAX_ARTICLES").then(|| "five".to_string()))
            .unwrap_err();
        assert!(matches!(err, LitReviewError::Config(_)));
        assert!(err.to_string().contains("LITREVIEW_MAX_ARTICLES"));
    }

    #[test]
    fn validate_requires_bucket_and_table() {
        let err = LitReviewConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("bucket"));

        let mut config = valid_config();
        config.storage.table = None;
        assert!(config.validate().unwrap_err().to_string().contains("table"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = valid_config();
        config.storage.table = Some("articles; DROP TABLE x".into());
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.review.max_articles = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.storage.scan_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_is_required_only_on_demand() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(config.llm.require_api_key().is_err());
    }

    #[test]
    fn sql_identifier_check() {
        assert!(is_sql_identifier("articles"));
        assert!(is_sql_identifier("_papers_2024"));
        assert!(!is_sql_identifier("2024"));
        assert!(!is_sql_identifier("a-b"));
        assert!(!is_sql_identifier(""));
    }
}
