use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::db::LocalStore;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

pub struct ThemeStore {
    store: LocalStore,
}

impl ThemeStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Unknown stored values fall back to the default theme.
    pub fn load(&self) -> Result<Theme> {
        Ok(self
            .store
            .get(THEME_KEY)?
            .and_then(|raw| Theme::parse(&raw))
            .unwrap_or_default())
    }

    pub fn save(&self, theme: Theme) -> Result<()> {
        self.store.set(THEME_KEY, theme.as_str())
    }

    pub fn toggle(&self) -> Result<Theme> {
        let next = self.load()?.toggled();
        self.save(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_light() {
        let themes = ThemeStore::new(LocalStore::open_in_memory().unwrap());
        assert_eq!(themes.load().unwrap(), Theme::Light);
    }

    #[test]
    fn toggle_persists_choice() {
        let store = LocalStore::open_in_memory().unwrap();
        let themes = ThemeStore::new(store.clone());

        assert_eq!(themes.toggle().unwrap(), Theme::Dark);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(themes.toggle().unwrap(), Theme::Light);
    }

    #[test]
    fn unrecognised_value_reads_as_default() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(ThemeStore::new(store).load().unwrap(), Theme::Light);
    }
}
