use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Translation key to markup.
pub type Dictionary = BTreeMap<String, String>;

static PT_FALLBACK: LazyLock<Dictionary> = LazyLock::new(|| serde_json::from_str(include_str!("../../assets/i18n/pt.json")).unwrap_or_default());
static EN_FALLBACK: LazyLock<Dictionary> = LazyLock::new(|| serde_json::from_str(include_str!("../../assets/i18n/en.json")).unwrap_or_default());

const MAX_LANGUAGE_CODE_LEN: usize = 16;

/// Local storage key holding the visitor's language preference.
pub const LANGUAGE_STORAGE_KEY: &str = "lang";
/// Ids of the header and mobile-panel language selectors.
pub const LANGUAGE_SELECTORS: [&str; 2] = ["langSwitch", "langSwitch2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Pt,
    En,
}

impl Language {
    /// Only the two bundled languages are recognised; anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pt" => Some(Language::Pt),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
        }
    }

    pub fn fallback_dictionary(&self) -> &'static Dictionary {
        match self {
            Language::Pt => &PT_FALLBACK,
            Language::En => &EN_FALLBACK,
        }
    }
}

/// Stored preference wins, then the `lang` query parameter, then Portuguese.
/// Empty values count as absent.
pub fn initial_language(stored: Option<&str>, query: Option<&str>) -> String {
    [stored, query]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .unwrap_or("pt")
        .to_lowercase()
}

/// What switching language does to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChange {
    /// Value to write under [`LANGUAGE_STORAGE_KEY`].
    pub persist: String,
    /// `(selector id, value)` for every language selector present on the page.
    pub selectors: Vec<(String, String)>,
    /// Language to resolve and apply; `None` when the page has nothing to translate.
    pub resolve: Option<String>,
}

/// Switch to `requested`. The preference is always persisted and every selector on the
/// page is synced; the dictionary is only fetched when the page has translatable elements.
pub fn set_language(requested: &str, present_selectors: &[&str], has_translatable: bool) -> LanguageChange {
    let lang = initial_language(Some(requested.trim()), None);

    LanguageChange {
        selectors: LANGUAGE_SELECTORS
            .iter()
            .filter(|id| present_selectors.contains(*id))
            .map(|id| (id.to_string(), lang.clone()))
            .collect(),
        resolve: has_translatable.then(|| lang.clone()),
        persist: lang,
    }
}

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("unsupported language code: {0}")]
    UnsupportedCode(String),
    #[error("could not read dictionary: {0}")]
    Io(#[from] std::io::Error),
    #[error("dictionary is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where published dictionaries come from.
#[async_trait::async_trait]
pub trait DictionarySource: Send + Sync {
    async fn fetch(&self, language: &str) -> Result<Dictionary, DictionaryError>;
}

/// Reads `{dir}/{language}.json`, as published alongside the site.
pub struct FileDictionarySource {
    dir: PathBuf,
}

impl FileDictionarySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_safe_code(language: &str) -> bool {
    !language.is_empty()
        && language.len() <= MAX_LANGUAGE_CODE_LEN
        && language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait::async_trait]
impl DictionarySource for FileDictionarySource {
    async fn fetch(&self, language: &str) -> Result<Dictionary, DictionaryError> {
        if !is_safe_code(language) {
            return Err(DictionaryError::UnsupportedCode(language.to_string()));
        }

        let path = self.dir.join(format!("{}.json", language));
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// A dictionary together with the language it actually is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDictionary {
    pub lang: String,
    pub fallback: bool,
    pub dictionary: Dictionary,
}

pub struct DictionaryResolver<'a> {
    source: &'a dyn DictionarySource,
}

impl<'a> DictionaryResolver<'a> {
    pub fn new(source: &'a dyn DictionarySource) -> Self {
        Self { source }
    }

    /// The published dictionary, else the bundled one for that language, else Portuguese.
    pub async fn resolve(&self, language: &str) -> ResolvedDictionary {
        let language = language.trim().to_lowercase();

        match self.source.fetch(&language).await {
            Ok(dictionary) => {
                debug!(lang = %language, entries = dictionary.len(), "dictionary loaded");
                ResolvedDictionary {
                    lang: language,
                    fallback: false,
                    dictionary,
                }
            }
            Err(e) => {
                warn!(lang = %language, error = %e, "using bundled dictionary");
                let bundled = Language::parse(&language).unwrap_or(Language::Pt);
                ResolvedDictionary {
                    lang: bundled.code().to_string(),
                    fallback: true,
                    dictionary: bundled.fallback_dictionary().clone(),
                }
            }
        }
    }
}

/// An element carrying `data-i18n`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatableElement {
    pub key: String,
    pub inner_html: String,
}

impl TranslatableElement {
    pub fn new(key: impl Into<String>, inner_html: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            inner_html: inner_html.into(),
        }
    }
}

/// Replace the content of every element whose key is in the dictionary; unknown keys
/// keep their markup. Returns the language the document should declare.
pub fn apply<'d>(resolved: &'d ResolvedDictionary, elements: &mut [TranslatableElement]) -> &'d str {
    for element in elements.iter_mut() {
        if let Some(text) = resolved.dictionary.get(&element.key) {
            element.inner_html.clone_from(text);
        }
    }
    &resolved.lang
}
