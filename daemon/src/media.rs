//! Audio cue fired when camera capture starts or stops.
//!
//! The cue briefly raises the master volume to a floor so it stays audible,
//! then restores the user's level. The controller keeps its own latch,
//! independent of the camera indicator.

use std::path::Path;

use tracing::{info, warn};

use crate::config::MediaConfig;
use crate::error::{CueError, DeviceError, PlaybackError};
use crate::latch::Latch;

/// Master volume of the default output device. Levels are scalars in [0, 1].
pub trait VolumeControl {
    fn set_mute(&mut self, muted: bool) -> Result<(), DeviceError>;
    fn level(&mut self) -> Result<f32, DeviceError>;
    fn set_level(&mut self, level: f32) -> Result<(), DeviceError>;
}

/// Plays a sound file to completion.
pub trait AudioPlayer {
    fn play(&mut self, path: &str) -> Result<(), PlaybackError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Started,
    Ended,
}

pub struct MediaCue {
    latch: Latch,
    volume: Box<dyn VolumeControl>,
    player: Box<dyn AudioPlayer>,
    floor: f32,
    start_cue: String,
    end_cue: String,
}

impl MediaCue {
    pub fn new(
        config: &MediaConfig,
        volume: Box<dyn VolumeControl>,
        player: Box<dyn AudioPlayer>,
    ) -> Self {
        Self {
            latch: Latch::new(),
            volume,
            player,
            floor: config.effective_volume_floor(),
            start_cue: config.start_cue.clone(),
            end_cue: config.end_cue.clone(),
        }
    }

    pub fn is_on(&self) -> bool {
        self.latch.is_on()
    }

    /// Whether a fresh camera reading could turn the latch on, i.e. whether
    /// the caller needs a traffic measurement to gate it.
    pub fn awaiting_start(&self, camera_present: bool) -> bool {
        camera_present && !self.latch.is_on()
    }

    /// Applies one camera reading.
    ///
    /// Turning on additionally requires that outbound traffic is not low, so
    /// no cue plays during bandwidth-constrained capture. Turning off ignores
    /// traffic. Cue failures are logged and swallowed; the latch still moves.
    pub fn update(&mut self, camera_present: bool, traffic_low: bool) -> Option<Cue> {
        let cue = if camera_present {
            if traffic_low || self.latch.is_on() {
                return None;
            }
            Cue::Started
        } else {
            if !self.latch.is_on() {
                return None;
            }
            Cue::Ended
        };

        let path = match cue {
            Cue::Started => self.start_cue.clone(),
            Cue::Ended => self.end_cue.clone(),
        };
        match play_with_floor(self.volume.as_mut(), self.player.as_mut(), self.floor, &path) {
            Ok(true) => info!(?cue, path = %path, "cue played"),
            Ok(false) => info!(?cue, "volume already audible; cue skipped"),
            Err(e) => warn!("Error playing sound or adjusting volume: {e}"),
        }
        self.latch.update(cue == Cue::Started);
        Some(cue)
    }
}

/// Unmutes, raises the level to `floor` if it is below, plays `path`, then
/// restores the original level.
///
/// When the level is already at or above `floor` nothing is played and the
/// volume is left untouched; returns `Ok(false)` in that case. The original
/// level is restored even if playback fails.
pub fn play_with_floor(
    volume: &mut dyn VolumeControl,
    player: &mut dyn AudioPlayer,
    floor: f32,
    path: &str,
) -> Result<bool, CueError> {
    volume.set_mute(false)?;
    let original = volume.level()?;
    if original >= floor {
        return Ok(false);
    }

    volume.set_level(floor)?;
    let played = player.play(path);
    let restored = volume.set_level(original);
    played?;
    restored?;
    Ok(true)
}

/// Default output device volume.
pub struct SystemVolume;

impl VolumeControl for SystemVolume {
    fn set_mute(&mut self, muted: bool) -> Result<(), DeviceError> {
        #[cfg(windows)]
        {
            imp::set_mute(muted)
        }
        #[cfg(not(windows))]
        {
            let _ = muted;
            Err(DeviceError::Unsupported)
        }
    }

    fn level(&mut self) -> Result<f32, DeviceError> {
        #[cfg(windows)]
        {
            imp::level()
        }
        #[cfg(not(windows))]
        {
            Err(DeviceError::Unsupported)
        }
    }

    fn set_level(&mut self, level: f32) -> Result<(), DeviceError> {
        #[cfg(windows)]
        {
            imp::set_level(level.clamp(0.0, 1.0))
        }
        #[cfg(not(windows))]
        {
            let _ = level;
            Err(DeviceError::Unsupported)
        }
    }
}

/// Synchronous playback of `.wav` files.
pub struct SystemPlayer;

impl AudioPlayer for SystemPlayer {
    fn play(&mut self, path: &str) -> Result<(), PlaybackError> {
        if !Path::new(path).exists() {
            return Err(PlaybackError::Missing(path.to_string()));
        }
        #[cfg(windows)]
        {
            imp::play(path)
        }
        #[cfg(not(windows))]
        {
            Err(PlaybackError::Unsupported)
        }
    }
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::BOOL;
    use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
    use windows::Win32::Media::Audio::{
        eConsole, eRender, IMMDeviceEnumerator, MMDeviceEnumerator, PlaySoundW, SND_FILENAME,
        SND_NODEFAULT, SND_SYNC,
    };
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
    };

    use crate::error::{DeviceError, PlaybackError};

    fn device_error(e: windows::core::Error) -> DeviceError {
        DeviceError::Endpoint(e.to_string())
    }

    /// Resolves the default render endpoint on every call so a device switch
    /// between cues is picked up.
    fn endpoint() -> Result<IAudioEndpointVolume, DeviceError> {
        unsafe {
            // S_FALSE when COM is already initialised on this thread.
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);

            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(device_error)?;
            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(device_error)?;
            device.Activate(CLSCTX_ALL, None).map_err(device_error)
        }
    }

    pub fn set_mute(muted: bool) -> Result<(), DeviceError> {
        let endpoint = endpoint()?;
        unsafe { endpoint.SetMute(BOOL::from(muted), std::ptr::null()) }.map_err(device_error)
    }

    pub fn level() -> Result<f32, DeviceError> {
        let endpoint = endpoint()?;
        unsafe { endpoint.GetMasterVolumeLevelScalar() }.map_err(device_error)
    }

    pub fn set_level(level: f32) -> Result<(), DeviceError> {
        let endpoint = endpoint()?;
        unsafe { endpoint.SetMasterVolumeLevelScalar(level, std::ptr::null()) }
            .map_err(device_error)
    }

    pub fn play(path: &str) -> Result<(), PlaybackError> {
        let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();
        let ok = unsafe {
            PlaySoundW(
                PCWSTR(wide.as_ptr()),
                None,
                SND_FILENAME | SND_SYNC | SND_NODEFAULT,
            )
        };
        if ok.as_bool() {
            Ok(())
        } else {
            Err(PlaybackError::Failed(path.to_string()))
        }
    }
}
