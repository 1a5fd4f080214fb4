use anyhow::Context;
use auto_volume_core::app_context::ApplicationContext;
use auto_volume_core::channel_volume::{ChannelVolumeManager, ChannelVolumeType};
use auto_volume_core::config::Config;
use auto_volume_core::controller::CoreController;
use auto_volume_core::ducking_policy::DuckingPolicy;
use auto_volume_core::gui_bridge::{GuiBridge, GuiEvent};
use auto_volume_core::locale_assets::LocaleAssetsManager;
use auto_volume_core::speaker_bridge::{SpeakerBridge, SpeakerEvent};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;

const CHANNELS: [ChannelVolumeType; 2] = [
    ChannelVolumeType::AvsSpeakerVolume,
    ChannelVolumeType::AvsAlertsVolume,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    let config = Config::new().map_err(anyhow::Error::msg)?;

    let mut args = std::env::args();
    let application_path = args.next().unwrap_or_default();
    let context = Arc::new(ApplicationContext::new(application_path));
    for path in args {
        context.add_config_file_path(path);
    }
    log::info!(
        "{} starting, network identifier {}",
        context.build_identifier(),
        context.network_identifier()
    );

    let locale_assets = Arc::new(
        LocaleAssetsManager::create(&config.locale, config.enable_wake_word)
            .context("Invalid locale configuration")?,
    );
    let ducking_policy = Arc::new(DuckingPolicy::new(config.allow_ducking));

    let (tx_speaker_event, mut rx_speaker_event) = mpsc::channel::<SpeakerEvent>(100);
    let (tx_gui_event, mut rx_gui_event) = mpsc::channel::<GuiEvent>(100);

    // 启动GUI桥，与GUI进程通信
    let gui_bridge = Arc::new(GuiBridge::new(&config, tx_gui_event).await?);
    let gui_bridge_clone = gui_bridge.clone();
    tokio::spawn(async move {
        if let Err(e) = gui_bridge_clone.run().await {
            log::error!("GuiBridge error: {}", e);
        }
    });

    // 启动音频桥，每个声道对应音频进程中的一个扬声器
    let speaker_bridge = Arc::new(SpeakerBridge::new(&config, tx_speaker_event)?);
    let mut controller = CoreController::new(
        ducking_policy.clone(),
        locale_assets.clone(),
        context.clone(),
    );
    for channel in CHANNELS {
        let manager = ChannelVolumeManager::builder()
            .speaker(speaker_bridge.speaker(channel))
            .channel_type(channel)
            .ducking(ducking_policy.clone())
            .build()?;
        controller.add_channel(Arc::new(manager));
    }

    let speaker_bridge_clone = speaker_bridge.clone();
    tokio::spawn(async move {
        if let Err(e) = speaker_bridge_clone.run().await {
            log::error!("SpeakerBridge error: {}", e);
        }
    });

    log::info!("Core started");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down...");
                break;
            }

            Some(event) = rx_gui_event.recv() => {
                let GuiEvent::Message(text) = event;
                if let Some(status) = controller.handle_gui_message(&text) {
                    if let Err(e) = gui_bridge.send_status(&status).await {
                        log::error!("Failed to send to GUI: {}", e);
                    }
                }
            }

            // 音频进程上报的音量变化先同步到声道，再通知GUI
            Some(event) = rx_speaker_event.recv() => {
                let status = controller.handle_speaker_event(event);
                if let Err(e) = gui_bridge.send_status(&status).await {
                    log::error!("Failed to send to GUI: {}", e);
                }
            }
        }
    }

    locale_assets.shutdown();
    Ok(())
}
