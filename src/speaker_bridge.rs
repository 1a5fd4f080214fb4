//! UDP link to the external audio process, exposed as one speaker per channel.

use crate::channel_volume::{
    ChannelVolumeType, SpeakerError, SpeakerInterface, SpeakerSettings, AVS_SET_VOLUME_MAX,
    AVS_SET_VOLUME_MIN,
};
use crate::config::Config;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum SpeakerEvent {
    /// The audio process reported settings changed outside this process.
    Changed(ChannelVolumeType, SpeakerSettings),
}

/// Commands sent to the audio process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeakerCommand {
    Volume { channel: ChannelVolumeType, volume: i8 },
    Mute { channel: ChannelVolumeType, mute: bool },
}

/// Reports received from the audio process.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SpeakerReport {
    SpeakerSettings {
        channel: ChannelVolumeType,
        volume: i8,
        mute: bool,
    },
}

/// A speaker channel of the audio process.
///
/// Commands go out with a non-blocking send; the last accepted values are
/// mirrored locally and returned by `get_speaker_settings`.
pub struct UdpSpeaker {
    sender: Arc<std::net::UdpSocket>,
    target_addr: SocketAddr,
    channel: ChannelVolumeType,
    settings: Mutex<SpeakerSettings>,
}

impl UdpSpeaker {
    pub fn channel(&self) -> ChannelVolumeType {
        self.channel
    }

    fn send(&self, command: &SpeakerCommand) -> Result<(), SpeakerError> {
        let payload =
            serde_json::to_vec(command).map_err(|e| SpeakerError::Rejected(e.to_string()))?;
        self.sender.send_to(&payload, self.target_addr)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut SpeakerSettings)) {
        let mut settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut settings);
    }
}

impl SpeakerInterface for UdpSpeaker {
    fn set_volume(&self, volume: i8) -> Result<(), SpeakerError> {
        if !(AVS_SET_VOLUME_MIN..=AVS_SET_VOLUME_MAX).contains(&volume) {
            return Err(SpeakerError::Rejected(format!("volume {} out of range", volume)));
        }
        self.send(&SpeakerCommand::Volume {
            channel: self.channel,
            volume,
        })?;
        self.update(|s| s.volume = volume);
        Ok(())
    }

    fn set_mute(&self, mute: bool) -> Result<(), SpeakerError> {
        self.send(&SpeakerCommand::Mute {
            channel: self.channel,
            mute,
        })?;
        self.update(|s| s.mute = mute);
        Ok(())
    }

    fn get_speaker_settings(&self) -> Result<SpeakerSettings, SpeakerError> {
        self.settings
            .lock()
            .map(|settings| *settings)
            .map_err(|_| SpeakerError::Unavailable)
    }
}

pub struct SpeakerBridge {
    socket: UdpSocket,
    sender: Arc<std::net::UdpSocket>,
    target_addr: SocketAddr,
    tx: mpsc::Sender<SpeakerEvent>,
    buffer_size: usize,
    speakers: Mutex<HashMap<ChannelVolumeType, Arc<UdpSpeaker>>>,
}

impl SpeakerBridge {
    /// Binds the audio socket. Must be called from within a tokio runtime.
    pub fn new(config: &Config, tx: mpsc::Sender<SpeakerEvent>) -> anyhow::Result<Self> {
        Self::bind(
            &format!("{}:{}", config.audio_local_ip, config.audio_local_port),
            &format!("{}:{}", config.audio_remote_ip, config.audio_remote_port),
            config.audio_buffer_size,
            tx,
        )
    }

    pub fn bind(
        local_addr: &str,
        target_addr: &str,
        buffer_size: usize,
        tx: mpsc::Sender<SpeakerEvent>,
    ) -> anyhow::Result<Self> {
        let std_socket = std::net::UdpSocket::bind(local_addr)
            .with_context(|| format!("Failed to bind audio socket on {}", local_addr))?;
        // Sends happen under channel locks and must never block.
        std_socket.set_nonblocking(true)?;
        let sender = std_socket.try_clone()?;
        let socket = UdpSocket::from_std(std_socket)?;
        let target_addr = target_addr
            .parse()
            .with_context(|| format!("Invalid audio process address {}", target_addr))?;

        Ok(Self {
            socket,
            sender: Arc::new(sender),
            target_addr,
            tx,
            buffer_size,
            speakers: Mutex::new(HashMap::new()),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Returns the speaker for `channel`, creating it on first use.
    pub fn speaker(&self, channel: ChannelVolumeType) -> Arc<UdpSpeaker> {
        let mut speakers = self.speakers.lock().unwrap_or_else(PoisonError::into_inner);
        speakers
            .entry(channel)
            .or_insert_with(|| {
                Arc::new(UdpSpeaker {
                    sender: self.sender.clone(),
                    target_addr: self.target_addr,
                    channel,
                    settings: Mutex::new(SpeakerSettings::default()),
                })
            })
            .clone()
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            if len == 0 {
                continue;
            }

            let report: SpeakerReport = match serde_json::from_slice(&buf[..len]) {
                Ok(report) => report,
                Err(e) => {
                    log::warn!("Ignoring malformed audio report: {}", e);
                    continue;
                }
            };

            let SpeakerReport::SpeakerSettings {
                channel,
                volume,
                mute,
            } = report;
            let speaker = {
                let speakers = self.speakers.lock().unwrap_or_else(PoisonError::into_inner);
                speakers.get(&channel).cloned()
            };
            let Some(speaker) = speaker else {
                log::warn!("Audio report for unmanaged channel {}", channel);
                continue;
            };

            let volume = volume.clamp(AVS_SET_VOLUME_MIN, AVS_SET_VOLUME_MAX);
            speaker.update(|s| {
                s.volume = volume;
                s.mute = mute;
            });
            if let Err(e) = self
                .tx
                .send(SpeakerEvent::Changed(channel, SpeakerSettings { volume, mute }))
                .await
            {
                log::error!("Failed to send speaker event: {}", e);
                break;
            }
        }
        Ok(())
    }
}
