//! Parsing of `;`-separated cache entries.
//!
//! Path entries have the form `subtree;options` and pattern entries
//! `subtree;regex;options`. Options are `;`-separated too: either a bare
//! integer, taken as the max age, or `key:value` pairs of which only
//! `maxAge` is understood. Empty fields after the subtree are skipped.

use stash_http::CacheConfig;

use crate::error::ConfigError;

const MAX_AGE: &str = "maxAge";

/// Parses a `subtree;maxAge` entry.
pub fn parse_path_entry(entry: &str) -> Result<CacheConfig, ConfigError> {
    let mut fields = fields(entry);
    let subtree = subtree(entry, fields.next())?;
    let max_age = max_age(entry, fields)?;
    Ok(CacheConfig::subtree(subtree, max_age))
}

/// Parses a `subtree;regex;maxAge` entry.
pub fn parse_pattern_entry(entry: &str) -> Result<CacheConfig, ConfigError> {
    let mut fields = fields(entry);
    let subtree = subtree(entry, fields.next())?;
    let pattern = fields.next().ok_or_else(|| ConfigError::InvalidEntry {
        entry: entry.to_owned(),
        reason: "missing pattern",
    })?;
    let max_age = max_age(entry, fields)?;
    CacheConfig::pattern(subtree, pattern, max_age).map_err(|source| {
        ConfigError::InvalidPattern {
            entry: entry.to_owned(),
            source,
        }
    })
}

/// The subtree field followed by the non-empty remaining fields.
fn fields(entry: &str) -> impl Iterator<Item = &str> {
    let mut fields = entry.split(';').map(str::trim);
    let subtree = fields.next();
    subtree
        .into_iter()
        .chain(fields.filter(|field| !field.is_empty()))
}

fn subtree<'a>(entry: &str, field: Option<&'a str>) -> Result<&'a str, ConfigError> {
    let reason = match field {
        Some(subtree) if subtree.is_empty() => "empty subtree",
        Some(subtree) if subtree.contains('/') => "subtree must be a single path segment",
        Some(subtree) => return Ok(subtree),
        None => "empty subtree",
    };
    Err(ConfigError::InvalidEntry {
        entry: entry.to_owned(),
        reason,
    })
}

/// The last `maxAge` among `options`.
fn max_age<'a>(
    entry: &str,
    options: impl Iterator<Item = &'a str>,
) -> Result<u32, ConfigError> {
    let mut max_age = None;
    for option in options {
        let value = match option.split_once(':') {
            Some((key, value)) if key.trim() == MAX_AGE => value.trim(),
            Some((key, _)) => {
                tracing::debug!(entry, option = key.trim(), "ignoring unknown cache option");
                continue;
            }
            None => option,
        };
        let parsed = value.parse::<u32>().map_err(|_| ConfigError::InvalidMaxAge {
            entry: entry.to_owned(),
            value: value.to_owned(),
        })?;
        max_age = Some(parsed);
    }
    max_age.ok_or_else(|| ConfigError::MissingMaxAge {
        entry: entry.to_owned(),
    })
}
