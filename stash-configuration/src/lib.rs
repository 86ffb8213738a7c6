//! YAML configuration for the stash cache-control filter.
//!
//! Configuration is read once at startup. Every entry is parsed and every
//! pattern compiled while loading, so a filter built from a [`Settings`]
//! never meets a malformed rule at request time.
//!
//! ```
//! use stash_configuration::Settings;
//!
//! let settings = Settings::from_yaml(
//!     r#"
//! cache:
//!   paths:
//!     - "dev;900"
//!   patterns:
//!     - "root;.*(js|css)$;maxAge:60"
//! filter:
//!   priority: 5
//! "#,
//! )
//! .unwrap();
//!
//! let rules = settings.rules().unwrap();
//! assert_eq!(rules.resolve("/dev/index.html").unwrap().max_age(), 900);
//! assert_eq!(rules.resolve("/app.js").unwrap().max_age(), 60);
//! ```

pub mod entry;
pub mod error;
pub mod settings;

pub use entry::{parse_path_entry, parse_pattern_entry};
pub use error::ConfigError;
pub use settings::{CacheSettings, CaptureSettings, FilterSettings, Settings};
