//! Message catalog for all user-facing text.

use std::sync::LazyLock;

use anyhow::{bail, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use tracing::warn;
use unic_langid::LanguageIdentifier;

const EN_CATALOG: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the bot
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
    /// Number of catalog entries that failed to parse or load
    load_errors: usize,
}

impl LocalizationManager {
    /// Create a manager from the built-in English catalog
    pub fn new() -> Self {
        Self::from_source("en", EN_CATALOG)
    }

    /// Create a manager from Fluent source text
    pub fn from_source(locale: &str, source: &str) -> Self {
        let locale: LanguageIdentifier = locale.parse().unwrap_or_default();
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        bundle.set_use_isolating(false);

        let mut load_errors = 0;
        let resource = match FluentResource::try_new(source.to_string()) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                load_errors += errors.len();
                resource
            }
        };
        if let Err(errors) = bundle.add_resource(resource) {
            load_errors += errors.len();
        }

        Self {
            bundle,
            load_errors,
        }
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let Some(msg) = self.bundle.get_message(key) else {
            return format!("Missing translation: {}", key);
        };

        let Some(pattern) = msg.value() else {
            return format!("Missing value for key: {}", key);
        };

        let mut errors = vec![];
        let value = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Message formatted with errors");
        }

        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.get_message(key, Some(&fluent_args))
    }

    pub fn load_errors(&self) -> usize {
        self.load_errors
    }
}

impl Default for LocalizationManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(LocalizationManager::new);

/// Load the catalog eagerly and fail if it is broken
pub fn init_localization() -> Result<()> {
    let errors = LOCALIZATION_MANAGER.load_errors();
    if errors > 0 {
        bail!("message catalog has {errors} invalid entries");
    }
    Ok(())
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    get_localization_manager().get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    get_localization_manager().get_message_with_args(key, args)
}
