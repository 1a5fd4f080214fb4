//! Supported locales and wake words.
//!
//! The locale list comes from `config.toml`. Devices with wake word enabled
//! support "ALEXA" in every locale; no locale-specific wake words exist.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

pub type Locale = String;
pub type LanguageTag = String;
pub type Locales = Vec<Locale>;
pub type WakeWords = BTreeSet<String>;
pub type WakeWordsSets = BTreeSet<WakeWords>;
pub type LocaleCombinations = Vec<Locales>;

const DEFAULT_WAKE_WORD: &str = "ALEXA";

/// Locale section of the configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocaleSettings {
    pub supported: Vec<Locale>,
    pub combinations: LocaleCombinations,
    pub default: Locale,
}

#[derive(Error, Debug, PartialEq)]
pub enum LocaleAssetsError {
    #[error("no supported locales configured")]
    NoSupportedLocales,

    #[error("default locale {0} is not supported")]
    UnsupportedDefaultLocale(Locale),

    #[error("locale combination {0:?} contains unsupported locales")]
    InvalidCombination(Locales),

    #[error("no locale requested")]
    EmptyLocales,

    #[error("locales {0:?} are not supported")]
    UnsupportedLocales(Locales),

    #[error("wake word {0} is not supported")]
    UnsupportedWakeWord(String),
}

/// Notified after the active locale assets changed.
pub trait LocaleAssetsObserver: Send + Sync {
    fn on_locale_assets_changed(&self, locales: &[Locale], wake_words: &WakeWords);
}

pub struct LocaleAssetsManager {
    supported_wake_words: WakeWordsSets,
    supported_locales: BTreeSet<Locale>,
    supported_combinations: LocaleCombinations,
    default_locale: Locale,
    active: Mutex<(Locales, WakeWords)>,
    observers: Mutex<Vec<Arc<dyn LocaleAssetsObserver>>>,
}

impl LocaleAssetsManager {
    pub fn create(
        settings: &LocaleSettings,
        enable_wake_word: bool,
    ) -> Result<Self, LocaleAssetsError> {
        let supported_locales: BTreeSet<Locale> = settings.supported.iter().cloned().collect();
        if supported_locales.is_empty() {
            return Err(LocaleAssetsError::NoSupportedLocales);
        }
        if !supported_locales.contains(&settings.default) {
            return Err(LocaleAssetsError::UnsupportedDefaultLocale(
                settings.default.clone(),
            ));
        }
        for combination in &settings.combinations {
            if combination.is_empty() || !combination.iter().all(|l| supported_locales.contains(l)) {
                return Err(LocaleAssetsError::InvalidCombination(combination.clone()));
            }
        }

        let mut supported_wake_words = WakeWordsSets::new();
        if enable_wake_word {
            supported_wake_words.insert(WakeWords::from([DEFAULT_WAKE_WORD.to_string()]));
        }

        let default_wake_words = supported_wake_words.iter().next().cloned().unwrap_or_default();
        log::info!(
            "Locale assets: {} locales, {} combinations, default {}",
            supported_locales.len(),
            settings.combinations.len(),
            settings.default
        );

        Ok(Self {
            supported_wake_words,
            supported_locales,
            supported_combinations: settings.combinations.clone(),
            default_locale: settings.default.clone(),
            active: Mutex::new((vec![settings.default.clone()], default_wake_words)),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Switches the active locales and wake words.
    ///
    /// `locales` is either one supported locale or one of the supported
    /// combinations, primary locale first.
    pub fn change_assets(
        &self,
        locales: &[Locale],
        wake_words: &WakeWords,
    ) -> Result<(), LocaleAssetsError> {
        match locales {
            [] => return Err(LocaleAssetsError::EmptyLocales),
            [locale] if self.supported_locales.contains(locale) => {}
            _ if self
                .supported_combinations
                .iter()
                .any(|c| c.as_slice() == locales) => {}
            _ => return Err(LocaleAssetsError::UnsupportedLocales(locales.to_vec())),
        }

        let available = self.supported_wake_words(&locales[0]);
        for word in wake_words {
            if !available.iter().any(|set| set.contains(word)) {
                return Err(LocaleAssetsError::UnsupportedWakeWord(word.clone()));
            }
        }

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            *active = (locales.to_vec(), wake_words.clone());
        }
        log::info!("Locale assets changed to {:?} {:?}", locales, wake_words);

        let observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for observer in observers {
            observer.on_locale_assets_changed(locales, wake_words);
        }
        Ok(())
    }

    /// Changes are applied synchronously, so there is never one to cancel.
    pub fn cancel_ongoing_change(&self) {
        log::debug!("cancel_ongoing_change: nothing in progress");
    }

    pub fn active_assets(&self) -> (Locales, WakeWords) {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn default_supported_wake_words(&self) -> WakeWordsSets {
        self.supported_wake_words.clone()
    }

    pub fn language_specific_wake_words(&self) -> BTreeMap<LanguageTag, WakeWordsSets> {
        BTreeMap::new()
    }

    pub fn locale_specific_wake_words(&self) -> BTreeMap<Locale, WakeWordsSets> {
        BTreeMap::new()
    }

    pub fn supported_wake_words(&self, _locale: &str) -> WakeWordsSets {
        self.supported_wake_words.clone()
    }

    pub fn supported_locales(&self) -> BTreeSet<Locale> {
        self.supported_locales.clone()
    }

    pub fn supported_locale_combinations(&self) -> LocaleCombinations {
        self.supported_combinations.clone()
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale.clone()
    }

    pub fn add_observer(&self, observer: Arc<dyn LocaleAssetsObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        if !observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn remove_observer(&self, observer: &Arc<dyn LocaleAssetsObserver>) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    pub fn shutdown(&self) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
