//! Theme preference (Auto/Light/Dark) and its resolution to dark or light.
//!
//! The chosen option is persisted as an integer under `theme_option`.
//! Resolution is done per frame from explicit inputs, so a change of the
//! system dark-mode signal takes effect while Auto is selected without any
//! user action.

use crate::prefs::PreferenceStore;
use serde::{Deserialize, Serialize};

pub const KEY_THEME_OPTION: &str = "theme_option";

/// User-selectable theme: follow the system (Auto), force Light, or force Dark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ThemeOption {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeOption {
    pub const ALL: [ThemeOption; 3] = [ThemeOption::Auto, ThemeOption::Light, ThemeOption::Dark];

    /// Persisted integer code.
    pub fn code(self) -> i64 {
        match self {
            ThemeOption::Auto => 0,
            ThemeOption::Light => 1,
            ThemeOption::Dark => 2,
        }
    }

    /// Decode a persisted code. Anything unknown falls back to Auto.
    pub fn from_code(code: i64) -> Self {
        Self::ALL
            .into_iter()
            .find(|option| option.code() == code)
            .unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeOption::Auto => "Auto",
            ThemeOption::Light => "Light",
            ThemeOption::Dark => "Dark",
        }
    }

    /// Whether to draw dark, given the system's dark-mode signal.
    pub fn resolve(self, system_dark: bool) -> bool {
        match self {
            ThemeOption::Auto => system_dark,
            ThemeOption::Light => false,
            ThemeOption::Dark => true,
        }
    }
}

/// Holds the current theme option and writes changes through to a store.
pub struct ThemeController<S: PreferenceStore> {
    store: S,
    current: ThemeOption,
}

impl<S: PreferenceStore> ThemeController<S> {
    /// Read the persisted option. Never fails; a missing key means Auto.
    pub fn load(store: S) -> Self {
        let current = store
            .get_int(KEY_THEME_OPTION)
            .map(ThemeOption::from_code)
            .unwrap_or_default();
        tracing::info!("Theme preference: {}", current.label());
        Self { store, current }
    }

    pub fn current(&self) -> ThemeOption {
        self.current
    }

    /// Switch to `option` and persist it. A failed write is logged and
    /// otherwise ignored; the in-memory choice still applies.
    pub fn select(&mut self, option: ThemeOption) {
        self.current = option;
        if let Err(e) = self.store.put_int(KEY_THEME_OPTION, option.code()) {
            tracing::warn!("Failed to save theme preference: {}", e);
        }
        tracing::info!("Theme set to {}", option.label());
    }

    pub fn effective_dark(&self, system_dark: bool) -> bool {
        self.current.resolve(system_dark)
    }

    /// Give back the store, e.g. to simulate a restart in tests.
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Hours during which the host reports "system dark mode".
///
/// A panel has no OS-level theme, so the night window stands in for it.
/// `start_hour == end_hour` means never dark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NightWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl NightWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour: start_hour % 24,
            end_hour: end_hour % 24,
        }
    }

    pub fn contains(&self, hour: u32) -> bool {
        let hour = hour % 24;
        if self.start_hour <= self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            // Wraps past midnight
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for NightWindow {
    fn default() -> Self {
        Self::new(19, 7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{JsonFilePreferences, MemoryPreferences};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    /// Store whose writes always fail.
    struct ReadOnlyPreferences;

    impl PreferenceStore for ReadOnlyPreferences {
        fn get_int(&self, _key: &str) -> Option<i64> {
            Some(2)
        }

        fn put_int(&mut self, _key: &str, _value: i64) -> Result<(), Box<dyn std::error::Error>> {
            Err("read-only".into())
        }
    }

    #[rstest]
    #[case(0, ThemeOption::Auto)]
    #[case(1, ThemeOption::Light)]
    #[case(2, ThemeOption::Dark)]
    #[case(3, ThemeOption::Auto)]
    #[case(-1, ThemeOption::Auto)]
    #[case(i64::MAX, ThemeOption::Auto)]
    fn test_from_code(#[case] code: i64, #[case] expected: ThemeOption) {
        assert_eq!(ThemeOption::from_code(code), expected);
    }

    #[test]
    fn codes_round_trip() {
        for option in ThemeOption::ALL {
            assert_eq!(ThemeOption::from_code(option.code()), option);
        }
    }

    #[rstest]
    #[case(ThemeOption::Auto, false, false)]
    #[case(ThemeOption::Auto, true, true)]
    #[case(ThemeOption::Light, true, false)]
    #[case(ThemeOption::Light, false, false)]
    #[case(ThemeOption::Dark, false, true)]
    #[case(ThemeOption::Dark, true, true)]
    fn test_resolve(#[case] option: ThemeOption, #[case] system_dark: bool, #[case] dark: bool) {
        assert_eq!(option.resolve(system_dark), dark);
    }

    #[test]
    fn load_with_unset_key_is_auto() {
        let controller = ThemeController::load(MemoryPreferences::new());
        assert_eq!(controller.current(), ThemeOption::Auto);
    }

    #[test]
    fn load_with_stored_two_is_dark() {
        let mut store = MemoryPreferences::new();
        store.put_int(KEY_THEME_OPTION, 2).unwrap();
        let controller = ThemeController::load(store);
        assert_eq!(controller.current(), ThemeOption::Dark);
    }

    #[test]
    fn select_light_survives_restart() {
        let tmp = TempDir::new().unwrap();
        let mut controller = ThemeController::load(JsonFilePreferences::open(tmp.path()));
        controller.select(ThemeOption::Light);
        drop(controller);

        let reloaded = ThemeController::load(JsonFilePreferences::open(tmp.path()));
        assert_eq!(reloaded.current(), ThemeOption::Light);
    }

    #[test]
    fn select_persists_the_integer_code() {
        let mut controller = ThemeController::load(MemoryPreferences::new());
        controller.select(ThemeOption::Dark);
        let store = controller.into_store();
        assert_eq!(store.get_int(KEY_THEME_OPTION), Some(2));
    }

    #[test]
    fn failed_write_still_switches_theme() {
        let mut controller = ThemeController::load(ReadOnlyPreferences);
        assert_eq!(controller.current(), ThemeOption::Dark);
        controller.select(ThemeOption::Light);
        assert_eq!(controller.current(), ThemeOption::Light);
        assert!(!controller.effective_dark(true));
    }

    #[test]
    fn auto_tracks_system_signal_without_reselecting() {
        let controller = ThemeController::load(MemoryPreferences::new());
        assert!(!controller.effective_dark(false));
        assert!(controller.effective_dark(true));
    }

    #[rstest]
    #[case(19, true)]
    #[case(23, true)]
    #[case(0, true)]
    #[case(6, true)]
    #[case(7, false)]
    #[case(12, false)]
    #[case(18, false)]
    fn default_night_window_wraps_midnight(#[case] hour: u32, #[case] dark: bool) {
        assert_eq!(NightWindow::default().contains(hour), dark);
    }

    #[test]
    fn same_day_window_and_empty_window() {
        let window = NightWindow::new(1, 5);
        assert!(window.contains(1));
        assert!(window.contains(4));
        assert!(!window.contains(5));
        assert!(!window.contains(0));

        let never = NightWindow::new(8, 8);
        assert!((0..24).all(|hour| !never.contains(hour)));
    }

    #[test]
    fn option_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ThemeOption::Dark).unwrap(), "\"dark\"");
        let parsed: ThemeOption = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(parsed, ThemeOption::Light);
    }
}
