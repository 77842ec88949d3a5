//! Localized message tables.
//!
//! Tables are nested JSON objects embedded at compile time and parsed once.
//! Keys are dot paths such as `errors.notFound`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const EN_TABLE: &str = include_str!("../locales/en.json");
const JA_TABLE: &str = include_str!("../locales/ja.json");

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    Ja,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Ja];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ja => "ja",
        }
    }

    /// Pick a locale from an explicit request, then an `Accept-Language`
    /// header, then `fallback`.
    #[must_use]
    pub fn negotiate(
        explicit: Option<&str>,
        accept_language: Option<&str>,
        fallback: Locale,
    ) -> Locale {
        explicit
            .and_then(|raw| raw.parse().ok())
            .or_else(|| accept_language.and_then(Self::from_accept_language))
            .unwrap_or(fallback)
    }

    /// Highest-weighted supported language in an `Accept-Language` value.
    #[must_use]
    pub fn from_accept_language(header: &str) -> Option<Locale> {
        let mut ranked: Vec<(f32, Locale)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.split(';');
                let locale = pieces.next()?.trim().parse::<Locale>().ok()?;
                let weight = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (weight > 0.0).then_some((weight, locale))
            })
            .collect();
        // Stable sort keeps header order among equal weights.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.first().map(|(_, locale)| *locale)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported locale {0:?}")]
pub struct UnsupportedLocale(String);

impl FromStr for Locale {
    type Err = UnsupportedLocale;

    /// Accepts a bare language (`ja`) or a full tag (`en-US`, `ja_JP`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Locale::En),
            "ja" => Ok(Locale::Ja),
            _ => Err(UnsupportedLocale(s.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("message table for {locale} is not valid JSON")]
    Parse {
        locale: Locale,
        #[source]
        source: serde_json::Error,
    },
    #[error("message table for {0} must be a JSON object")]
    NotAnObject(Locale),
    #[error("no message table for default locale {0}")]
    MissingDefault(Locale),
}

/// Parsed message tables keyed by locale.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    default_locale: Locale,
    tables: HashMap<Locale, Value>,
}

impl MessageCatalog {
    /// Load the tables compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if an embedded table is malformed.
    pub fn embedded(default_locale: Locale) -> Result<Self, CatalogError> {
        Self::from_tables(
            default_locale,
            [(Locale::En, EN_TABLE), (Locale::Ja, JA_TABLE)],
        )
    }

    /// Build a catalog from raw JSON tables.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when a table does not parse to a JSON object or
    /// the default locale has no table.
    pub fn from_tables<'a>(
        default_locale: Locale,
        tables: impl IntoIterator<Item = (Locale, &'a str)>,
    ) -> Result<Self, CatalogError> {
        let mut parsed = HashMap::new();
        for (locale, raw) in tables {
            let value: Value = serde_json::from_str(raw)
                .map_err(|source| CatalogError::Parse { locale, source })?;
            if !value.is_object() {
                return Err(CatalogError::NotAnObject(locale));
            }
            parsed.insert(locale, value);
        }
        if !parsed.contains_key(&default_locale) {
            return Err(CatalogError::MissingDefault(default_locale));
        }
        Ok(Self {
            default_locale,
            tables: parsed,
        })
    }

    #[must_use]
    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    /// Resolve a dotted key, falling back to the default locale and then to
    /// the key itself.
    #[must_use]
    pub fn lookup<'a>(&'a self, locale: Locale, key: &'a str) -> &'a str {
        self.find(locale, key)
            .or_else(|| self.find(self.default_locale, key))
            .unwrap_or(key)
    }

    /// The whole table for `locale`, or the default locale's table.
    #[must_use]
    pub fn table(&self, locale: Locale) -> &Value {
        self.tables
            .get(&locale)
            .or_else(|| self.tables.get(&self.default_locale))
            .unwrap_or(&Value::Null)
    }

    fn find(&self, locale: Locale, key: &str) -> Option<&str> {
        key.split('.')
            .try_fold(self.tables.get(&locale)?, |node, segment| node.get(segment))?
            .as_str()
    }
}
