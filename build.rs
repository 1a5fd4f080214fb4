use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    audio: Endpoint,
    gui: Endpoint,
    volume: Volume,
    locale: Locale,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Endpoint {
    local_port: u16,
    remote_port: u16,
    local_ip: String,
    remote_ip: String,
    buffer_size: usize,
}

#[derive(Deserialize)]
struct Volume {
    allow_ducking: bool,
}

#[derive(Deserialize)]
struct Locale {
    enable_wake_word: bool,
    default: String,
    supported: Vec<String>,
    #[serde(default)]
    combinations: Vec<Vec<String>>,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 音频进程
    println!("cargo:rustc-env=AUDIO_LOCAL_PORT={}", config.audio.local_port);
    println!("cargo:rustc-env=AUDIO_REMOTE_PORT={}", config.audio.remote_port);
    println!("cargo:rustc-env=AUDIO_LOCAL_IP={}", config.audio.local_ip);
    println!("cargo:rustc-env=AUDIO_REMOTE_IP={}", config.audio.remote_ip);
    println!("cargo:rustc-env=AUDIO_BUFFER_SIZE={}", config.audio.buffer_size);

    // GUI 进程
    println!("cargo:rustc-env=GUI_LOCAL_PORT={}", config.gui.local_port);
    println!("cargo:rustc-env=GUI_REMOTE_PORT={}", config.gui.remote_port);
    println!("cargo:rustc-env=GUI_LOCAL_IP={}", config.gui.local_ip);
    println!("cargo:rustc-env=GUI_REMOTE_IP={}", config.gui.remote_ip);
    println!("cargo:rustc-env=GUI_BUFFER_SIZE={}", config.gui.buffer_size);

    println!("cargo:rustc-env=ALLOW_DUCKING={}", config.volume.allow_ducking);

    // Lists are flattened: locales by ',', combinations by ';' then '/'
    println!("cargo:rustc-env=ENABLE_WAKE_WORD={}", config.locale.enable_wake_word);
    println!("cargo:rustc-env=DEFAULT_LOCALE={}", config.locale.default);
    println!("cargo:rustc-env=SUPPORTED_LOCALES={}", config.locale.supported.join(","));
    let combinations: Vec<String> = config
        .locale
        .combinations
        .iter()
        .map(|c| c.join("/"))
        .collect();
    println!("cargo:rustc-env=LOCALE_COMBINATIONS={}", combinations.join(";"));
}
