//! Settings persistence and per-key defaulting.
//!
//! The settings record is a flat map of named options. Every key has a
//! default that is backfilled on every load, so a partial or empty file on
//! disk always deserializes into a fully populated record.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

pub const DEFAULT_API_URL: &str = "https://api.openai.com";
pub const DEFAULT_API_URL_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_PROVIDER: &str = "OpenAI";
pub const DEFAULT_API_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_CHATGPT_MODEL: &str = "text-davinci-002-render-sha";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_USER_LANGUAGE: &str = "zh-Hans";
pub const DEFAULT_YOUGLISH_LANGUAGE: &str = "en";
pub const DEFAULT_I18N: &str = "en";

/// Proxy configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    pub enabled: bool,
    pub protocol: String,
    pub server: String,
    pub port: String,
    pub basic_auth_username: String,
    pub basic_auth_password: String,
    pub no_proxy: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            protocol: "HTTP".into(),
            server: "127.0.0.1".into(),
            port: "1080".into(),
            basic_auth_username: String::new(),
            basic_auth_password: String::new(),
            no_proxy: "localhost,127.0.0.1".into(),
        }
    }
}

/// Per-language TTS voice override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsVoice {
    pub lang: String,
    pub voice: String,
}

/// Text-to-speech configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsSettings {
    pub provider: String,
    pub volume: u8,
    pub rate: u8,
    #[serde(default)]
    pub voices: Vec<TtsVoice>,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: "WebSpeech".into(),
            volume: 100,
            rate: 10,
            voices: Vec::new(),
        }
    }
}

/// The persisted settings record.
///
/// Field names mirror the keys the UI reads and writes, hence camelCase on
/// the wire. Each field defaults independently; cross-key backfill rules
/// (Azure inheriting the generic API fields, ChatGPT web inheriting the
/// API model) run in [`Settings::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    // Core provider selection
    pub provider: String,
    pub api_keys: String,
    #[serde(rename = "apiURL")]
    pub api_url: String,
    #[serde(rename = "apiURLPath")]
    pub api_url_path: String,
    pub api_model: String,
    pub custom_model_name: String,

    // ChatGPT web session
    pub chatgpt_model: String,
    pub chatgpt_arkose_req_url: String,
    pub chatgpt_arkose_req_form: String,

    // Azure
    #[serde(rename = "azureAPIKeys")]
    pub azure_api_keys: String,
    #[serde(rename = "azureAPIURL")]
    pub azure_api_url: String,
    #[serde(rename = "azureAPIURLPath")]
    pub azure_api_url_path: String,
    #[serde(rename = "azureAPIModel")]
    pub azure_api_model: String,
    pub az_max_words: u32,

    // Gemini
    #[serde(rename = "geminiAPIURL")]
    pub gemini_api_url: String,
    #[serde(rename = "geminiAPIKey")]
    pub gemini_api_key: String,
    #[serde(rename = "geminiAPIModel")]
    pub gemini_api_model: String,

    // MiniMax
    pub mini_max_group_id: String,
    #[serde(rename = "miniMaxAPIKey")]
    pub mini_max_api_key: String,
    #[serde(rename = "miniMaxAPIModel")]
    pub mini_max_api_model: String,

    // Moonshot / Kimi
    #[serde(rename = "moonshotAPIKey")]
    pub moonshot_api_key: String,
    #[serde(rename = "moonshotAPIModel")]
    pub moonshot_api_model: String,
    pub kimi_refresh_token: String,
    pub kimi_access_token: String,

    // ChatGLM
    pub chatglm_access_token: String,
    pub chatglm_refresh_token: String,

    // DeepSeek
    #[serde(rename = "deepSeekAPIKey")]
    pub deep_seek_api_key: String,
    #[serde(rename = "deepSeekAPIModel")]
    pub deep_seek_api_model: String,

    // Groq
    #[serde(rename = "groqAPIURL")]
    pub groq_api_url: String,
    #[serde(rename = "groqAPIURLPath")]
    pub groq_api_url_path: String,
    #[serde(rename = "groqAPIKey")]
    pub groq_api_key: String,
    #[serde(rename = "groqAPIModel")]
    pub groq_api_model: String,
    pub groq_custom_model_name: String,

    // Claude
    #[serde(rename = "claudeAPIURL")]
    pub claude_api_url: String,
    #[serde(rename = "claudeAPIURLPath")]
    pub claude_api_url_path: String,
    #[serde(rename = "claudeAPIKey")]
    pub claude_api_key: String,
    #[serde(rename = "claudeAPIModel")]
    pub claude_api_model: String,
    pub claude_custom_model_name: String,

    // Ollama
    #[serde(rename = "ollamaAPIURL")]
    pub ollama_api_url: String,
    #[serde(rename = "ollamaAPIModel")]
    pub ollama_api_model: String,
    pub ollama_custom_model_name: String,

    // OpenRouter / OneAPI
    #[serde(rename = "openRouterAPIKey")]
    pub open_router_api_key: String,
    #[serde(rename = "openRouterAPIModel")]
    pub open_router_api_model: String,
    #[serde(rename = "OneAPIAPIKey")]
    pub one_api_api_key: String,
    #[serde(rename = "OneAPIAPIModel")]
    pub one_api_api_model: String,

    // Languages and learning profile
    pub default_user_language: String,
    pub default_learning_language: Vec<String>,
    pub default_youglish_language: String,
    pub input_language_level: String,
    pub output_language_level: String,
    pub user_background: String,
    pub language_detection_engine: String,
    pub i18n: String,

    // Translate behavior
    pub default_translate_mode: String,
    pub auto_translate: bool,
    pub chat_context: bool,

    // Feature toggles
    pub is_first_time_use: bool,
    pub automatic_check_for_updates: bool,
    pub always_show_icons: bool,
    pub select_input_elements_text: bool,
    pub read_selected_words_from_input_elements_text: bool,
    pub allow_using_clipboard_when_selected_text_not_available: bool,
    pub disable_collecting_statistics: bool,
    pub restore_previous_position: bool,
    pub run_at_startup: bool,
    pub pinned: bool,
    pub auto_collect: bool,
    pub hide_the_icon_in_the_dock: bool,
    pub auto_hide_window_when_out_of_focus: bool,
    pub enable_background_blur: bool,
    #[serde(rename = "enableMica")]
    pub enable_mica: Option<bool>,

    // Hotkeys
    pub hotkey: String,
    pub display_window_hotkey: String,
    pub ocr_hotkey: String,
    pub writing_hotkey: String,
    pub writing_newline_hotkey: String,
    pub writing_target_language: String,

    // Appearance
    pub theme_type: String,
    pub font_size: u32,
    pub ui_font_size: u32,
    pub icon_size: u32,

    // Structured blocks
    pub tts: TtsSettings,
    pub proxy: ProxySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.into(),
            api_keys: String::new(),
            api_url: DEFAULT_API_URL.into(),
            api_url_path: DEFAULT_API_URL_PATH.into(),
            api_model: DEFAULT_API_MODEL.into(),
            custom_model_name: String::new(),
            chatgpt_model: DEFAULT_CHATGPT_MODEL.into(),
            chatgpt_arkose_req_url: String::new(),
            chatgpt_arkose_req_form: String::new(),
            azure_api_keys: String::new(),
            azure_api_url: String::new(),
            azure_api_url_path: String::new(),
            azure_api_model: String::new(),
            az_max_words: 1024,
            gemini_api_url: DEFAULT_GEMINI_API_URL.into(),
            gemini_api_key: String::new(),
            gemini_api_model: "gemini-pro".into(),
            mini_max_group_id: String::new(),
            mini_max_api_key: String::new(),
            mini_max_api_model: "abab5.5-chat".into(),
            moonshot_api_key: String::new(),
            moonshot_api_model: "moonshot-v1-8k".into(),
            kimi_refresh_token: String::new(),
            kimi_access_token: String::new(),
            chatglm_access_token: String::new(),
            chatglm_refresh_token: String::new(),
            deep_seek_api_key: String::new(),
            deep_seek_api_model: "deepseek-chat".into(),
            groq_api_url: "https://api.groq.com".into(),
            groq_api_url_path: "/openai/v1/chat/completions".into(),
            groq_api_key: String::new(),
            groq_api_model: "llama3-70b-8192".into(),
            groq_custom_model_name: String::new(),
            claude_api_url: "https://api.anthropic.com".into(),
            claude_api_url_path: "/v1/messages".into(),
            claude_api_key: String::new(),
            claude_api_model: "claude-3-haiku-20240307".into(),
            claude_custom_model_name: String::new(),
            ollama_api_url: "http://localhost:11434".into(),
            ollama_api_model: String::new(),
            ollama_custom_model_name: String::new(),
            open_router_api_key: String::new(),
            open_router_api_model: String::new(),
            one_api_api_key: String::new(),
            one_api_api_model: String::new(),
            default_user_language: DEFAULT_USER_LANGUAGE.into(),
            default_learning_language: vec!["en".into()],
            default_youglish_language: DEFAULT_YOUGLISH_LANGUAGE.into(),
            input_language_level: String::new(),
            output_language_level: String::new(),
            user_background: String::new(),
            language_detection_engine: "baidu".into(),
            i18n: DEFAULT_I18N.into(),
            default_translate_mode: "translate".into(),
            auto_translate: false,
            chat_context: true,
            is_first_time_use: true,
            automatic_check_for_updates: true,
            always_show_icons: true,
            select_input_elements_text: true,
            read_selected_words_from_input_elements_text: false,
            allow_using_clipboard_when_selected_text_not_available: false,
            disable_collecting_statistics: false,
            restore_previous_position: false,
            run_at_startup: false,
            pinned: false,
            auto_collect: false,
            hide_the_icon_in_the_dock: false,
            auto_hide_window_when_out_of_focus: false,
            enable_background_blur: false,
            enable_mica: None,
            hotkey: String::new(),
            display_window_hotkey: String::new(),
            ocr_hotkey: String::new(),
            writing_hotkey: String::new(),
            writing_newline_hotkey: String::new(),
            writing_target_language: String::new(),
            theme_type: "followTheSystem".into(),
            font_size: 15,
            ui_font_size: 12,
            icon_size: 15,
            tts: TtsSettings::default(),
            proxy: ProxySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from file, applying defaults for any missing keys.
    pub fn load(settings_path: &Path) -> Self {
        let mut settings: Settings = std::fs::read_to_string(settings_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        // Env var as fallback for the primary key material
        if settings.api_keys.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                settings.api_keys = key;
            }
        }

        settings.normalize();
        settings
    }

    /// Cross-key backfill rules that cannot be expressed as per-field
    /// defaults.
    pub fn normalize(&mut self) {
        if self.provider == "Azure" {
            if self.azure_api_keys.is_empty() {
                self.azure_api_keys = self.api_keys.clone();
            }
            if self.azure_api_url.is_empty() {
                self.azure_api_url = self.api_url.clone();
            }
            if self.azure_api_url_path.is_empty() {
                self.azure_api_url_path = self.api_url_path.clone();
            }
            if self.azure_api_model.is_empty() {
                self.azure_api_model = self.api_model.clone();
            }
        }
        if self.provider == "ChatGPT" && self.chatgpt_model.is_empty() {
            self.chatgpt_model = self.api_model.clone();
        }
        // Legacy mica flag carries over to the renamed blur toggle
        if let Some(mica) = self.enable_mica.take() {
            self.enable_background_blur = self.enable_background_blur || mica;
        }
    }

    /// Save settings to disk as pretty JSON.
    pub fn save(&self, settings_path: &Path) -> Result<()> {
        if let Some(parent) = settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(settings_path, json)?;
        info!("Saved settings to {}", settings_path.display());
        Ok(())
    }

    /// Merge a partial JSON update into this record, key by key.
    ///
    /// Unknown keys are ignored; known keys replace the current value.
    pub fn merge_update(&mut self, update: &serde_json::Value) -> Result<()> {
        let mut current = serde_json::to_value(&*self)?;
        if let (Some(dst), Some(src)) = (current.as_object_mut(), update.as_object()) {
            for (k, v) in src {
                dst.insert(k.clone(), v.clone());
            }
        }
        let mut merged: Settings = serde_json::from_value(current)?;
        merged.normalize();
        *self = merged;
        Ok(())
    }

    /// Pick one API key at random from the comma-separated `apiKeys` list.
    pub fn pick_api_key(&self) -> Option<String> {
        let keys: Vec<&str> = self
            .api_keys
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if keys.is_empty() {
            return None;
        }
        use rand::seq::IndexedRandom;
        keys.choose(&mut rand::rng()).map(|k| k.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_backfilled_from_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.provider, "OpenAI");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.api_url_path, DEFAULT_API_URL_PATH);
        assert_eq!(settings.api_model, DEFAULT_API_MODEL);
        assert!(settings.chat_context);
        assert!(!settings.auto_translate);
        assert_eq!(settings.default_user_language, "zh-Hans");
        assert_eq!(settings.default_learning_language, vec!["en".to_string()]);
        assert_eq!(settings.theme_type, "followTheSystem");
        assert_eq!(settings.proxy.port, "1080");
        assert_eq!(settings.tts.volume, 100);
    }

    #[test]
    fn test_partial_file_keeps_explicit_values() {
        let settings: Settings =
            serde_json::from_str(r#"{"apiModel": "gpt-4o", "autoTranslate": true}"#).unwrap();
        assert_eq!(settings.api_model, "gpt-4o");
        assert!(settings.auto_translate);
        // Untouched keys still get defaults
        assert_eq!(settings.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_azure_backfill_on_normalize() {
        let mut settings = Settings {
            provider: "Azure".into(),
            api_keys: "k1".into(),
            ..Settings::default()
        };
        settings.normalize();
        assert_eq!(settings.azure_api_keys, "k1");
        assert_eq!(settings.azure_api_url, DEFAULT_API_URL);
        assert_eq!(settings.azure_api_model, DEFAULT_API_MODEL);
    }

    #[test]
    fn test_mica_flag_migrates_to_blur() {
        let mut settings: Settings = serde_json::from_str(r#"{"enableMica": true}"#).unwrap();
        settings.normalize();
        assert!(settings.enable_background_blur);
        assert!(settings.enable_mica.is_none());
    }

    #[test]
    fn test_load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.api_keys = "abc".into();
        settings.font_size = 18;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.api_keys, "abc");
        assert_eq!(loaded.font_size, 18);
    }

    #[test]
    fn test_merge_update_replaces_known_keys_only() {
        let mut settings = Settings::default();
        let update = serde_json::json!({"fontSize": 20, "i18n": "zh"});
        settings.merge_update(&update).unwrap();
        assert_eq!(settings.font_size, 20);
        assert_eq!(settings.i18n, "zh");
        assert_eq!(settings.api_model, DEFAULT_API_MODEL);
    }

    #[test]
    fn test_pick_api_key() {
        let mut settings = Settings::default();
        assert!(settings.pick_api_key().is_none());
        settings.api_keys = "k1, k2 ,k3".into();
        let key = settings.pick_api_key().unwrap();
        assert!(["k1", "k2", "k3"].contains(&key.as_str()));

        settings.api_keys = "only".into();
        assert_eq!(settings.pick_api_key().unwrap(), "only");
    }
}
