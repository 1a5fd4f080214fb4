use crate::locale_assets::LocaleSettings;

#[derive(Debug, Clone)]
pub struct Config {
    // 音频进程配置
    pub audio_local_port: u16,
    pub audio_remote_port: u16,
    pub audio_local_ip: &'static str,
    pub audio_remote_ip: &'static str,
    pub audio_buffer_size: usize,

    // GUI进程配置
    pub gui_local_port: u16,
    pub gui_remote_port: u16,
    pub gui_local_ip: &'static str,
    pub gui_remote_ip: &'static str,
    pub gui_buffer_size: usize,

    /// Initial value of the "may duck" flag handed to the ducking policy.
    pub allow_ducking: bool,

    pub enable_wake_word: bool,
    pub locale: LocaleSettings,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            audio_local_port: env!("AUDIO_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse AUDIO_LOCAL_PORT")?,
            audio_remote_port: env!("AUDIO_REMOTE_PORT").parse()
                .map_err(|_| "Failed to parse AUDIO_REMOTE_PORT")?,
            audio_local_ip: env!("AUDIO_LOCAL_IP"),
            audio_remote_ip: env!("AUDIO_REMOTE_IP"),
            audio_buffer_size: env!("AUDIO_BUFFER_SIZE").parse()
                .map_err(|_| "Failed to parse AUDIO_BUFFER_SIZE")?,

            gui_local_port: env!("GUI_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse GUI_LOCAL_PORT")?,
            gui_remote_port: env!("GUI_REMOTE_PORT").parse()
                .map_err(|_| "Failed to parse GUI_REMOTE_PORT")?,
            gui_local_ip: env!("GUI_LOCAL_IP"),
            gui_remote_ip: env!("GUI_REMOTE_IP"),
            gui_buffer_size: env!("GUI_BUFFER_SIZE").parse()
                .map_err(|_| "Failed to parse GUI_BUFFER_SIZE")?,

            allow_ducking: env!("ALLOW_DUCKING").parse()
                .map_err(|_| "Failed to parse ALLOW_DUCKING")?,

            enable_wake_word: env!("ENABLE_WAKE_WORD").parse()
                .map_err(|_| "Failed to parse ENABLE_WAKE_WORD")?,
            locale: LocaleSettings {
                supported: split_list(env!("SUPPORTED_LOCALES"), ','),
                combinations: split_list(env!("LOCALE_COMBINATIONS"), ';')
                    .iter()
                    .map(|combination| split_list(combination, '/'))
                    .collect(),
                default: env!("DEFAULT_LOCALE").to_string(),
            },
        })
    }
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_empty_entries() {
        assert_eq!(split_list("en-US, es-US,,", ','), vec!["en-US", "es-US"]);
        assert!(split_list("", ';').is_empty());
    }

    #[test]
    fn build_time_config_is_consistent() {
        let config = Config::new().unwrap();
        assert!(!config.locale.supported.is_empty());
        assert!(config.locale.supported.contains(&config.locale.default));
        assert!(config.locale.combinations.iter().all(|c| c.len() > 1));
        assert_ne!(config.audio_local_port, config.gui_local_port);
    }
}
