//! Four-axis emotional coloring carried by links and walkers.

use serde::{Deserialize, Serialize};

/// Plutchik-style opposing pairs, each an independent axis in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionVector {
    pub joy_sadness: f32,
    pub trust_disgust: f32,
    pub fear_anger: f32,
    pub surprise_anticipation: f32,
}

impl EmotionVector {
    pub const NEUTRAL: EmotionVector = EmotionVector {
        joy_sadness: 0.0,
        trust_disgust: 0.0,
        fear_anger: 0.0,
        surprise_anticipation: 0.0,
    };

    pub fn new(joy_sadness: f32, trust_disgust: f32, fear_anger: f32, surprise_anticipation: f32) -> Self {
        Self {
            joy_sadness,
            trust_disgust,
            fear_anger,
            surprise_anticipation,
        }
        .clamped()
    }

    /// Every axis forced into [-1, 1]; NaN collapses to 0.
    pub fn clamped(self) -> Self {
        fn axis(v: f32) -> f32 {
            if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
        }
        Self {
            joy_sadness: axis(self.joy_sadness),
            trust_disgust: axis(self.trust_disgust),
            fear_anger: axis(self.fear_anger),
            surprise_anticipation: axis(self.surprise_anticipation),
        }
    }

    /// Move each axis a fraction `rate` of the way toward `other`.
    pub fn drift_toward(&mut self, other: &EmotionVector, rate: f32) {
        let r = rate.clamp(0.0, 1.0);
        self.joy_sadness += (other.joy_sadness - self.joy_sadness) * r;
        self.trust_disgust += (other.trust_disgust - self.trust_disgust) * r;
        self.fear_anger += (other.fear_anger - self.fear_anger) * r;
        self.surprise_anticipation += (other.surprise_anticipation - self.surprise_anticipation) * r;
        *self = self.clamped();
    }

    pub fn axes(&self) -> [f32; 4] {
        [self.joy_sadness, self.trust_disgust, self.fear_anger, self.surprise_anticipation]
    }
}
