//! Volume and ducking state for a single audio channel.

use std::sync::{Arc, Mutex, MutexGuard};

use super::curve::{default_volume_attenuate, VolumeCurveFunction};
use super::error::ChannelVolumeError;
use super::speaker::{
    ChannelVolumeType, DuckingInterface, SpeakerInterface, SpeakerSettings, AVS_SET_VOLUME_MAX,
    AVS_SET_VOLUME_MIN,
};

struct ChannelState {
    is_ducked: bool,
    unducked_volume: i8,
    volume_curve: VolumeCurveFunction,
}

impl ChannelState {
    /// The volume the speaker should be playing at right now.
    fn applied_volume(&mut self) -> i8 {
        if self.is_ducked {
            (self.volume_curve)(self.unducked_volume).clamp(AVS_SET_VOLUME_MIN, AVS_SET_VOLUME_MAX)
        } else {
            self.unducked_volume
        }
    }
}

/// Controls one speaker and attenuates it while the channel is ducked.
///
/// Every operation runs under one lock, including the call forwarded to the
/// speaker, so the speaker always sees commands in the order the state
/// changed. A rejected command rolls the state back.
pub struct ChannelVolumeManager {
    state: Mutex<ChannelState>,
    speaker: Arc<dyn SpeakerInterface>,
    ducking: Option<Arc<dyn DuckingInterface>>,
    channel_type: ChannelVolumeType,
}

impl ChannelVolumeManager {
    pub fn builder() -> ChannelVolumeManagerBuilder {
        ChannelVolumeManagerBuilder::default()
    }

    pub fn speaker_type(&self) -> ChannelVolumeType {
        self.channel_type
    }

    /// Identifies the underlying speaker; two managers share an id only if
    /// they drive the same speaker instance.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.speaker).cast::<()>() as usize
    }

    pub fn start_ducking(&self) -> Result<(), ChannelVolumeError> {
        let mut state = self.lock()?;

        if let Some(ducking) = &self.ducking {
            if !ducking.is_ducking_allowed() {
                log::warn!("{}: ducking requested but not allowed", self.channel_type);
                return Err(ChannelVolumeError::DuckingDenied);
            }
        }

        let was_ducked = state.is_ducked;
        state.is_ducked = true;
        let volume = state.applied_volume();
        if let Err(e) = self.speaker.set_volume(volume) {
            state.is_ducked = was_ducked;
            log::error!("{}: failed to apply ducked volume {}: {}", self.channel_type, volume, e);
            return Err(e.into());
        }

        log::info!(
            "{}: ducked {} -> {}",
            self.channel_type,
            state.unducked_volume,
            volume
        );
        Ok(())
    }

    pub fn stop_ducking(&self) -> Result<(), ChannelVolumeError> {
        let mut state = self.lock()?;

        let was_ducked = state.is_ducked;
        state.is_ducked = false;
        if let Err(e) = self.speaker.set_volume(state.unducked_volume) {
            state.is_ducked = was_ducked;
            log::error!(
                "{}: failed to restore volume {}: {}",
                self.channel_type,
                state.unducked_volume,
                e
            );
            return Err(e.into());
        }

        log::info!("{}: unducked, volume {}", self.channel_type, state.unducked_volume);
        Ok(())
    }

    /// Sets the baseline volume. While ducked the speaker receives the
    /// attenuated value instead.
    pub fn set_unducked_volume(&self, volume: i8) -> Result<(), ChannelVolumeError> {
        if !(AVS_SET_VOLUME_MIN..=AVS_SET_VOLUME_MAX).contains(&volume) {
            log::warn!("{}: rejected volume {}", self.channel_type, volume);
            return Err(ChannelVolumeError::VolumeOutOfRange(volume.into()));
        }

        let mut state = self.lock()?;

        let previous = state.unducked_volume;
        state.unducked_volume = volume;
        let applied = state.applied_volume();
        if let Err(e) = self.speaker.set_volume(applied) {
            state.unducked_volume = previous;
            log::error!("{}: failed to set volume {}: {}", self.channel_type, applied, e);
            return Err(e.into());
        }

        log::debug!(
            "{}: unducked volume {} (applied {}, ducked: {})",
            self.channel_type,
            volume,
            applied,
            state.is_ducked
        );
        Ok(())
    }

    pub fn set_mute(&self, mute: bool) -> Result<(), ChannelVolumeError> {
        let _state = self.lock()?;
        self.speaker.set_mute(mute)?;
        log::debug!("{}: mute {}", self.channel_type, mute);
        Ok(())
    }

    pub fn get_speaker_settings(&self) -> Result<SpeakerSettings, ChannelVolumeError> {
        let _state = self.lock()?;
        Ok(self.speaker.get_speaker_settings()?)
    }

    /// Speaker settings together with the ducking state, read under one lock.
    pub fn settings_snapshot(&self) -> Result<(SpeakerSettings, bool), ChannelVolumeError> {
        let state = self.lock()?;
        let settings = self.speaker.get_speaker_settings()?;
        Ok((settings, state.is_ducked))
    }

    /// Records settings the speaker reported on its own (hardware knob, other
    /// clients). Nothing is sent back to the speaker.
    ///
    /// While unducked the reported volume becomes the new unducked volume.
    /// While ducked the speaker plays the attenuated value, so the report says
    /// nothing about the baseline and the unducked volume is kept.
    ///
    /// Returns whether the channel is ducked.
    pub fn on_speaker_settings_changed(
        &self,
        settings: SpeakerSettings,
    ) -> Result<bool, ChannelVolumeError> {
        let mut state = self.lock()?;
        if state.is_ducked {
            log::debug!(
                "{}: ignoring reported volume {} while ducked",
                self.channel_type,
                settings.volume
            );
        } else {
            let volume = settings.volume.clamp(AVS_SET_VOLUME_MIN, AVS_SET_VOLUME_MAX);
            if volume != state.unducked_volume {
                log::info!(
                    "{}: speaker reported volume {}, was {}",
                    self.channel_type,
                    volume,
                    state.unducked_volume
                );
                state.unducked_volume = volume;
            }
        }
        Ok(state.is_ducked)
    }

    pub fn is_ducked(&self) -> Result<bool, ChannelVolumeError> {
        Ok(self.lock()?.is_ducked)
    }

    pub fn unducked_volume(&self) -> Result<i8, ChannelVolumeError> {
        Ok(self.lock()?.unducked_volume)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChannelState>, ChannelVolumeError> {
        self.state.lock().map_err(|_| ChannelVolumeError::LockPoisoned)
    }
}

/// Collects construction parameters for a [`ChannelVolumeManager`].
#[derive(Default)]
pub struct ChannelVolumeManagerBuilder {
    speaker: Option<Arc<dyn SpeakerInterface>>,
    channel_type: ChannelVolumeType,
    volume_curve: Option<VolumeCurveFunction>,
    ducking: Option<Arc<dyn DuckingInterface>>,
}

impl ChannelVolumeManagerBuilder {
    pub fn speaker(mut self, speaker: Arc<dyn SpeakerInterface>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn channel_type(mut self, channel_type: ChannelVolumeType) -> Self {
        self.channel_type = channel_type;
        self
    }

    /// Replaces the default attenuation curve.
    pub fn volume_curve<F>(mut self, curve: F) -> Self
    where
        F: FnMut(i8) -> i8 + Send + 'static,
    {
        self.volume_curve = Some(Box::new(curve));
        self
    }

    pub fn ducking(mut self, ducking: Arc<dyn DuckingInterface>) -> Self {
        self.ducking = Some(ducking);
        self
    }

    pub fn build(self) -> Result<ChannelVolumeManager, ChannelVolumeError> {
        let speaker = self.speaker.ok_or_else(|| {
            log::error!("{}: cannot create channel without a speaker", self.channel_type);
            ChannelVolumeError::MissingSpeaker
        })?;

        let unducked_volume = match speaker.get_speaker_settings() {
            Ok(settings) => settings.volume.clamp(AVS_SET_VOLUME_MIN, AVS_SET_VOLUME_MAX),
            Err(e) => {
                log::warn!(
                    "{}: unable to read initial speaker settings ({}), starting at {}",
                    self.channel_type,
                    e,
                    AVS_SET_VOLUME_MIN
                );
                AVS_SET_VOLUME_MIN
            }
        };

        let volume_curve = self
            .volume_curve
            .unwrap_or_else(|| Box::new(default_volume_attenuate) as VolumeCurveFunction);

        Ok(ChannelVolumeManager {
            state: Mutex::new(ChannelState {
                is_ducked: false,
                unducked_volume,
                volume_curve,
            }),
            speaker,
            ducking: self.ducking,
            channel_type: self.channel_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_volume::SpeakerError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Command {
        Volume(i8),
        Mute(bool),
    }

    struct MockSpeaker {
        settings: Mutex<SpeakerSettings>,
        commands: Mutex<Vec<Command>>,
        reject: AtomicBool,
    }

    impl MockSpeaker {
        fn new(volume: i8) -> Arc<Self> {
            Arc::new(Self {
                settings: Mutex::new(SpeakerSettings { volume, mute: false }),
                commands: Mutex::new(Vec::new()),
                reject: AtomicBool::new(false),
            })
        }

        fn commands(&self) -> Vec<Command> {
            self.commands.lock().unwrap().clone()
        }

        fn volume(&self) -> i8 {
            self.settings.lock().unwrap().volume
        }
    }

    impl SpeakerInterface for MockSpeaker {
        fn set_volume(&self, volume: i8) -> Result<(), SpeakerError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(SpeakerError::Rejected("mock".into()));
            }
            self.commands.lock().unwrap().push(Command::Volume(volume));
            self.settings.lock().unwrap().volume = volume;
            Ok(())
        }

        fn set_mute(&self, mute: bool) -> Result<(), SpeakerError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(SpeakerError::Rejected("mock".into()));
            }
            self.commands.lock().unwrap().push(Command::Mute(mute));
            self.settings.lock().unwrap().mute = mute;
            Ok(())
        }

        fn get_speaker_settings(&self) -> Result<SpeakerSettings, SpeakerError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(SpeakerError::Unavailable);
            }
            Ok(*self.settings.lock().unwrap())
        }
    }

    struct FixedDucking(bool);

    impl DuckingInterface for FixedDucking {
        fn is_ducking_allowed(&self) -> bool {
            self.0
        }
    }

    fn manager(speaker: &Arc<MockSpeaker>) -> ChannelVolumeManager {
        ChannelVolumeManager::builder()
            .speaker(speaker.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_speaker() {
        let result = ChannelVolumeManager::builder()
            .channel_type(ChannelVolumeType::AvsAlertsVolume)
            .build();
        assert!(matches!(result, Err(ChannelVolumeError::MissingSpeaker)));
    }

    #[test]
    fn test_initial_volume_from_speaker() {
        let speaker = MockSpeaker::new(55);
        let manager = manager(&speaker);
        assert_eq!(manager.unducked_volume().unwrap(), 55);
        assert!(!manager.is_ducked().unwrap());
        assert_eq!(manager.speaker_type(), ChannelVolumeType::AvsSpeakerVolume);
        assert!(speaker.commands().is_empty());
    }

    #[test]
    fn test_initial_volume_falls_back_to_min() {
        let speaker = MockSpeaker::new(55);
        speaker.reject.store(true, Ordering::SeqCst);
        let manager = manager(&speaker);
        assert_eq!(manager.unducked_volume().unwrap(), AVS_SET_VOLUME_MIN);
    }

    #[test]
    fn test_duck_round_trip_restores_volume() {
        let speaker = MockSpeaker::new(60);
        let manager = manager(&speaker);

        manager.start_ducking().unwrap();
        assert!(manager.is_ducked().unwrap());
        assert_eq!(speaker.volume(), 20);

        manager.stop_ducking().unwrap();
        assert!(!manager.is_ducked().unwrap());
        assert_eq!(speaker.volume(), 60);
        assert_eq!(
            speaker.commands(),
            vec![Command::Volume(20), Command::Volume(60)]
        );
    }

    #[test]
    fn test_ducking_is_idempotent() {
        let speaker = MockSpeaker::new(30);
        let manager = manager(&speaker);

        manager.start_ducking().unwrap();
        manager.start_ducking().unwrap();
        assert_eq!(speaker.volume(), 10);

        manager.stop_ducking().unwrap();
        manager.stop_ducking().unwrap();
        assert_eq!(speaker.volume(), 30);
    }

    #[test]
    fn test_set_volume_while_ducked_applies_curve() {
        let speaker = MockSpeaker::new(80);
        let manager = manager(&speaker);
        manager.start_ducking().unwrap();

        manager.set_unducked_volume(35).unwrap();
        assert_eq!(speaker.volume(), 15);
        assert_eq!(manager.unducked_volume().unwrap(), 35);

        manager.stop_ducking().unwrap();
        assert_eq!(speaker.volume(), 35);
    }

    #[test]
    fn test_set_volume_unducked_forwards_directly() {
        let speaker = MockSpeaker::new(10);
        let manager = manager(&speaker);
        manager.set_unducked_volume(AVS_SET_VOLUME_MAX).unwrap();
        assert_eq!(speaker.volume(), AVS_SET_VOLUME_MAX);
    }

    #[test]
    fn test_out_of_range_volume_rejected() {
        let speaker = MockSpeaker::new(40);
        let manager = manager(&speaker);

        for volume in [-1, AVS_SET_VOLUME_MAX + 1, i8::MIN, i8::MAX] {
            assert!(matches!(
                manager.set_unducked_volume(volume),
                Err(ChannelVolumeError::VolumeOutOfRange(v)) if v == i64::from(volume)
            ));
        }
        assert_eq!(manager.unducked_volume().unwrap(), 40);
        assert!(speaker.commands().is_empty());
    }

    #[test]
    fn test_ducking_denied_leaves_state() {
        let speaker = MockSpeaker::new(70);
        let manager = ChannelVolumeManager::builder()
            .speaker(speaker.clone())
            .ducking(Arc::new(FixedDucking(false)))
            .build()
            .unwrap();

        assert!(matches!(
            manager.start_ducking(),
            Err(ChannelVolumeError::DuckingDenied)
        ));
        assert!(!manager.is_ducked().unwrap());
        assert_eq!(speaker.volume(), 70);
        assert!(speaker.commands().is_empty());
    }

    #[test]
    fn test_ducking_allowed_by_policy() {
        let speaker = MockSpeaker::new(70);
        let manager = ChannelVolumeManager::builder()
            .speaker(speaker.clone())
            .ducking(Arc::new(FixedDucking(true)))
            .build()
            .unwrap();

        manager.start_ducking().unwrap();
        assert_eq!(speaker.volume(), 20);
    }

    #[test]
    fn test_speaker_failure_rolls_back() {
        let speaker = MockSpeaker::new(50);
        let manager = manager(&speaker);
        speaker.reject.store(true, Ordering::SeqCst);

        assert!(matches!(
            manager.start_ducking(),
            Err(ChannelVolumeError::Speaker(_))
        ));
        assert!(!manager.is_ducked().unwrap());

        assert!(manager.set_unducked_volume(90).is_err());
        assert_eq!(manager.unducked_volume().unwrap(), 50);

        speaker.reject.store(false, Ordering::SeqCst);
        manager.start_ducking().unwrap();
        speaker.reject.store(true, Ordering::SeqCst);
        assert!(manager.stop_ducking().is_err());
        assert!(manager.is_ducked().unwrap());
    }

    #[test]
    fn test_mute_does_not_touch_volume_state() {
        let speaker = MockSpeaker::new(45);
        let manager = manager(&speaker);
        manager.start_ducking().unwrap();

        manager.set_mute(true).unwrap();
        let settings = manager.get_speaker_settings().unwrap();
        assert!(settings.mute);
        assert_eq!(settings.volume, 20);
        assert!(manager.is_ducked().unwrap());
        assert_eq!(manager.unducked_volume().unwrap(), 45);

        manager.set_mute(false).unwrap();
        assert!(!manager.get_speaker_settings().unwrap().mute);
    }

    #[test]
    fn test_get_speaker_settings_failure() {
        let speaker = MockSpeaker::new(45);
        let manager = manager(&speaker);
        speaker.reject.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.get_speaker_settings(),
            Err(ChannelVolumeError::Speaker(SpeakerError::Unavailable))
        ));
    }

    #[test]
    fn test_reported_volume_becomes_baseline() {
        let speaker = MockSpeaker::new(0);
        let manager = manager(&speaker);

        let ducked = manager
            .on_speaker_settings_changed(SpeakerSettings {
                volume: 60,
                mute: false,
            })
            .unwrap();
        assert!(!ducked);
        assert_eq!(manager.unducked_volume().unwrap(), 60);
        assert!(speaker.commands().is_empty());

        manager.start_ducking().unwrap();
        manager.stop_ducking().unwrap();
        assert_eq!(
            speaker.commands(),
            vec![Command::Volume(20), Command::Volume(60)]
        );
    }

    #[test]
    fn test_reported_volume_ignored_while_ducked() {
        let speaker = MockSpeaker::new(70);
        let manager = manager(&speaker);
        manager.start_ducking().unwrap();

        let ducked = manager
            .on_speaker_settings_changed(SpeakerSettings {
                volume: 20,
                mute: true,
            })
            .unwrap();
        assert!(ducked);
        assert_eq!(manager.unducked_volume().unwrap(), 70);

        manager.stop_ducking().unwrap();
        assert_eq!(speaker.volume(), 70);
    }

    #[test]
    fn test_settings_snapshot() {
        let speaker = MockSpeaker::new(90);
        let manager = manager(&speaker);
        assert_eq!(
            manager.settings_snapshot().unwrap(),
            (SpeakerSettings { volume: 90, mute: false }, false)
        );

        manager.start_ducking().unwrap();
        assert_eq!(
            manager.settings_snapshot().unwrap(),
            (SpeakerSettings { volume: 20, mute: false }, true)
        );

        speaker.reject.store(true, Ordering::SeqCst);
        assert!(matches!(
            manager.settings_snapshot(),
            Err(ChannelVolumeError::Speaker(SpeakerError::Unavailable))
        ));
    }

    #[test]
    fn test_custom_curve_is_used_and_clamped() {
        let speaker = MockSpeaker::new(50);
        let mut calls = 0u32;
        let manager = ChannelVolumeManager::builder()
            .speaker(speaker.clone())
            .volume_curve(move |volume| {
                calls += 1;
                volume / 2 - calls as i8 * 100
            })
            .build()
            .unwrap();

        manager.start_ducking().unwrap();
        assert_eq!(speaker.volume(), AVS_SET_VOLUME_MIN);

        let speaker = MockSpeaker::new(50);
        let manager = ChannelVolumeManager::builder()
            .speaker(speaker.clone())
            .volume_curve(|volume| volume / 2)
            .build()
            .unwrap();
        manager.start_ducking().unwrap();
        assert_eq!(speaker.volume(), 25);
    }

    #[test]
    fn test_id_follows_speaker_identity() {
        let shared = MockSpeaker::new(50);
        let first = ChannelVolumeManager::builder()
            .speaker(shared.clone())
            .build()
            .unwrap();
        let second = ChannelVolumeManager::builder()
            .speaker(shared.clone())
            .channel_type(ChannelVolumeType::AvsAlertsVolume)
            .build()
            .unwrap();
        let other = manager(&MockSpeaker::new(50));

        assert_eq!(first.id(), second.id());
        assert_ne!(first.id(), other.id());
        assert_eq!(other.speaker_type(), ChannelVolumeType::AvsSpeakerVolume);
    }

    #[test]
    fn test_concurrent_set_volume_is_serialized() {
        let speaker = MockSpeaker::new(0);
        let manager = Arc::new(manager(&speaker));
        manager.start_ducking().unwrap();
        manager.stop_ducking().unwrap();

        let handles: Vec<_> = (0..8i8)
            .map(|t| {
                let manager = manager.clone();
                thread::spawn(move || {
                    for i in 0..10i8 {
                        manager.set_unducked_volume(t * 10 + i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let volumes: Vec<i8> = speaker
            .commands()
            .into_iter()
            .skip(2)
            .map(|c| match c {
                Command::Volume(v) => v,
                Command::Mute(_) => panic!("unexpected mute"),
            })
            .collect();
        assert_eq!(volumes.len(), 80);
        let unique: HashSet<i8> = volumes.iter().copied().collect();
        assert_eq!(unique.len(), 80);
        assert_eq!(*volumes.last().unwrap(), manager.unducked_volume().unwrap());
    }
}
