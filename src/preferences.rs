use std::sync::Arc;

use crate::storage::{KeyValueStore, THEME_KEY, TUTORIAL_SEEN_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// Small persisted UI flags: theme and whether the tutorial was dismissed
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn theme(&self) -> Theme {
        match self.store.get(THEME_KEY) {
            Ok(Some(value)) => Theme::parse(&value).unwrap_or_default(),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read theme");
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) {
        if let Err(e) = self.store.set(THEME_KEY, &theme.to_string()) {
            tracing::warn!(error = %e, "failed to save theme");
        }
    }

    /// Flip the theme, persist it, and return the new value
    pub fn toggle_theme(&self) -> Theme {
        let theme = self.theme().toggle();
        self.set_theme(theme);
        theme
    }

    pub fn tutorial_seen(&self) -> bool {
        matches!(self.store.get(TUTORIAL_SEEN_KEY), Ok(Some(v)) if v == "true")
    }

    pub fn mark_tutorial_seen(&self) {
        if let Err(e) = self.store.set(TUTORIAL_SEEN_KEY, "true") {
            tracing::warn!(error = %e, "failed to save tutorial flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn prefs() -> (Arc<MemoryStore>, Preferences) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Preferences::new(store))
    }

    #[test]
    fn test_theme_defaults_to_light() {
        let (_, prefs) = prefs();
        assert_eq!(prefs.theme(), Theme::Light);
    }

    #[test]
    fn test_unknown_theme_value_falls_back() {
        let (store, prefs) = prefs();
        store.set(THEME_KEY, "solarized").unwrap();
        assert_eq!(prefs.theme(), Theme::Light);
    }

    #[test]
    fn test_toggle_theme_persists() {
        let (store, prefs) = prefs();
        assert_eq!(prefs.toggle_theme(), Theme::Dark);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(prefs.toggle_theme(), Theme::Light);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_tutorial_flag() {
        let (_, prefs) = prefs();
        assert!(!prefs.tutorial_seen());
        prefs.mark_tutorial_seen();
        assert!(prefs.tutorial_seen());
    }
}
