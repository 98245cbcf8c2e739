//! Animation playback state

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, ComponentKind, ComponentType};

/// Playback options for one clip of the entity's scene object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationParams {
    /// Clip name
    pub name: String,
    /// Restart at the end of the clip
    #[serde(default)]
    pub looping: bool,
    /// Start playing when the entity starts
    #[serde(default)]
    pub autoplay: bool,
    /// Hold the last frame instead of resetting when a non-looping clip ends
    #[serde(default)]
    pub clamp_when_finished: bool,
}

/// Plays a named clip on the entity's scene object
///
/// The viewport system advances playing clips each rendered frame.
#[derive(Debug, Clone)]
pub struct AnimationComponent {
    params: AnimationParams,
    time: f32,
    playing: bool,
    // playing when paused, restored on resume
    suspended: bool,
}

impl AnimationComponent {
    /// Create a stopped animation
    pub fn new(params: AnimationParams) -> Self {
        Self {
            params,
            time: 0.0,
            playing: false,
            suspended: false,
        }
    }

    /// Playback options
    pub fn params(&self) -> &AnimationParams {
        &self.params
    }

    /// Clip name
    pub fn name(&self) -> &str {
        &self.params.name
    }

    /// Current position in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Whether the clip is playing
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        self.playing = true;
        self.suspended = false;
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) {
        self.playing = false;
        self.suspended = false;
        self.time = 0.0;
    }

    /// Advance playback by `delta` seconds through a clip of `duration`
    pub fn advance(&mut self, delta: f32, duration: f32) {
        if !self.playing || duration <= 0.0 {
            return;
        }
        self.time += delta;
        if self.time < duration {
            return;
        }
        if self.params.looping {
            self.time %= duration;
        } else {
            self.playing = false;
            self.time = if self.params.clamp_when_finished { duration } else { 0.0 };
        }
    }
}

impl Component for AnimationComponent {
    fn component_type(&self) -> ComponentType {
        Self::TYPE
    }

    fn start(&mut self) {
        if self.params.autoplay {
            self.play();
        }
    }

    fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.suspended = true;
        }
    }

    fn resume(&mut self) {
        if self.suspended {
            self.play();
        }
    }

    fn destroy(&mut self) {
        self.stop();
    }
}

impl ComponentKind for AnimationComponent {
    const TYPE: ComponentType = ComponentType::new("AnimationComponent");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(looping: bool, clamp: bool) -> AnimationParams {
        AnimationParams {
            name: "Wave".to_string(),
            looping,
            autoplay: true,
            clamp_when_finished: clamp,
        }
    }

    #[test]
    fn test_autoplay_starts_on_start() {
        let mut animation = AnimationComponent::new(params(false, false));
        assert!(!animation.is_playing());
        animation.start();
        assert!(animation.is_playing());
    }

    #[test]
    fn test_resume_restores_playback() {
        let mut animation = AnimationComponent::new(params(true, false));
        animation.start();
        animation.advance(0.25, 1.0);
        animation.pause();
        assert!(!animation.is_playing());
        animation.advance(0.5, 1.0);
        animation.resume();
        assert!(animation.is_playing());
        assert_relative_eq!(animation.time(), 0.25);
    }

    #[test]
    fn test_resume_keeps_stopped_clip_stopped() {
        let mut animation = AnimationComponent::new(params(false, false));
        animation.pause();
        animation.resume();
        assert!(!animation.is_playing());
    }

    #[test]
    fn test_looping_wraps() {
        let mut animation = AnimationComponent::new(params(true, false));
        animation.play();
        animation.advance(2.5, 1.0);
        assert!(animation.is_playing());
        assert_relative_eq!(animation.time(), 0.5);
    }

    #[test]
    fn test_clamped_clip_holds_last_frame() {
        let mut animation = AnimationComponent::new(params(false, true));
        animation.play();
        animation.advance(3.0, 1.0);
        assert!(!animation.is_playing());
        assert_relative_eq!(animation.time(), 1.0);
    }

    #[test]
    fn test_unclamped_clip_rewinds() {
        let mut animation = AnimationComponent::new(params(false, false));
        animation.play();
        animation.advance(3.0, 1.0);
        assert_relative_eq!(animation.time(), 0.0);
    }
}
