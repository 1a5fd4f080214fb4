//! Shared application state for the front end: file paths, menus,
//! authorization status and logging level.

use crate::channel_volume::{AVS_SET_VOLUME_MAX, AVS_SET_VOLUME_MIN};
use anyhow::Context;
use log::LevelFilter;
use mac_address::get_mac_address;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

pub const CBL_AUTHORIZATION: &str = "alexa:cbl";
pub const AUTH_PROVIDER_AUTHORIZATION: &str = "alexa:auth-provider";

#[derive(Default)]
struct ContextState {
    audio_file_paths: VecDeque<String>,
    config_file_paths: Vec<String>,
    menu_register: BTreeMap<String, Value>,
    active_authorization: String,
    authorization_in_progress: String,
    authorization_data: HashMap<String, HashMap<String, String>>,
    level: Option<LevelFilter>,
    network_identifier: String,
    audio_input_device: String,
    messaging_responses_enabled: bool,
}

pub struct ApplicationContext {
    application_path: PathBuf,
    state: Mutex<ContextState>,
}

impl ApplicationContext {
    pub fn new(application_path: impl Into<PathBuf>) -> Self {
        let network_identifier = match get_mac_address() {
            Ok(Some(mac)) => mac.to_string().to_lowercase(),
            _ => Uuid::new_v4().to_string(),
        };
        Self {
            application_path: application_path.into(),
            state: Mutex::new(ContextState {
                network_identifier,
                messaging_responses_enabled: true,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn application_path(&self) -> &Path {
        &self.application_path
    }

    pub fn application_dir_path(&self) -> PathBuf {
        Self::dir_path(&self.application_path)
    }

    pub fn dir_path(path: &Path) -> PathBuf {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn build_identifier(&self) -> String {
        format!("{} {}", env!("APP_NAME"), env!("APP_VERSION"))
    }

    // --- files ---

    pub fn add_audio_file_path(&self, path: impl Into<String>) {
        self.lock().audio_file_paths.push_back(path.into());
    }

    pub fn pop_audio_file_path(&self) -> Option<String> {
        self.lock().audio_file_paths.pop_front()
    }

    pub fn add_config_file_path(&self, path: impl Into<String>) {
        self.lock().config_file_paths.push(path.into());
    }

    pub fn config_file_path(&self, index: usize) -> Option<String> {
        self.lock().config_file_paths.get(index).cloned()
    }

    pub fn config_file_paths(&self) -> Vec<String> {
        self.lock().config_file_paths.clone()
    }

    /// A unique path in the system temp directory.
    pub fn make_temp_path(&self, name: &str, extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{}-{}.{}", name, Uuid::new_v4(), extension))
    }

    pub fn save_content(&self, path: &Path, content: &str) -> anyhow::Result<()> {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to save content to {}", path.display()))
    }

    // --- menus ---

    /// Registers (or replaces) a menu and returns the number of menus.
    pub fn register_menu(&self, id: impl Into<String>, menu: Value) -> usize {
        let mut state = self.lock();
        state.menu_register.insert(id.into(), menu);
        state.menu_register.len()
    }

    pub fn has_menu(&self, id: &str) -> bool {
        self.lock().menu_register.contains_key(id)
    }

    pub fn menu(&self, id: &str) -> Option<Value> {
        self.lock().menu_register.get(id).cloned()
    }

    /// Value of the first item with a matching `"id"` across all menus.
    pub fn menu_item_value(&self, id: &str, default: Value) -> Value {
        let state = self.lock();
        state
            .menu_register
            .values()
            .filter_map(|menu| menu.get("item").and_then(Value::as_array))
            .flatten()
            .find(|item| item.get("id").and_then(Value::as_str) == Some(id))
            .and_then(|item| item.get("value").cloned())
            .unwrap_or(default)
    }

    // --- authorization state ---

    pub fn set_active_authorization(&self, service: &str) {
        self.lock().active_authorization = service.to_string();
    }

    pub fn set_authorization_in_progress(&self, service: &str) {
        self.lock().authorization_in_progress = service.to_string();
    }

    pub fn is_authorization_active(&self, service: &str) -> bool {
        self.lock().active_authorization == service
    }

    pub fn is_authorization_in_progress(&self, service: &str) -> bool {
        self.lock().authorization_in_progress == service
    }

    pub fn is_cbl_authorization_active(&self) -> bool {
        self.is_authorization_active(CBL_AUTHORIZATION)
    }

    pub fn is_auth_provider_authorization_active(&self) -> bool {
        self.is_authorization_active(AUTH_PROVIDER_AUTHORIZATION)
    }

    pub fn authorization_data(&self, service: &str, key: &str) -> Option<String> {
        self.lock()
            .authorization_data
            .get(service)
            .and_then(|data| data.get(key))
            .cloned()
    }

    pub fn set_authorization_data(&self, service: &str, key: &str, data: &str) {
        self.lock()
            .authorization_data
            .entry(service.to_string())
            .or_default()
            .insert(key.to_string(), data.to_string());
    }

    // --- misc ---

    pub fn level(&self) -> Option<LevelFilter> {
        self.lock().level
    }

    pub fn set_level(&self, level: LevelFilter) {
        self.lock().level = Some(level);
    }

    pub fn clear_level(&self) {
        self.lock().level = None;
    }

    pub fn minimum_volume(&self) -> i8 {
        AVS_SET_VOLUME_MIN
    }

    pub fn maximum_volume(&self) -> i8 {
        AVS_SET_VOLUME_MAX
    }

    pub fn network_identifier(&self) -> String {
        self.lock().network_identifier.clone()
    }

    pub fn set_network_identifier(&self, identifier: &str) {
        self.lock().network_identifier = identifier.to_string();
    }

    pub fn audio_input_device(&self) -> String {
        self.lock().audio_input_device.clone()
    }

    pub fn set_audio_input_device(&self, device: &str) {
        self.lock().audio_input_device = device.to_string();
    }

    pub fn is_messaging_responses_enabled(&self) -> bool {
        self.lock().messaging_responses_enabled
    }

    pub fn set_messaging_responses(&self, enabled: bool) {
        self.lock().messaging_responses_enabled = enabled;
    }
}
