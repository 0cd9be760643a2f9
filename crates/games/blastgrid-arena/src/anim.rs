use serde::{Deserialize, Serialize};

/// A one-shot frame animation driven by tick deltas.
///
/// Owners poll `finished()` and drop the entity themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    elapsed: f32,
    duration: f32,
    frames: u8,
}

impl Animation {
    pub fn new(duration: f32, frames: u8) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(0.0),
            frames: frames.max(1),
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
    }

    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        }
    }

    pub fn frame(&self) -> u8 {
        let frame = (self.progress() * self.frames as f32) as u8;
        frame.min(self.frames - 1)
    }
}

/// Frame index of a looping animation after `elapsed` seconds.
pub fn looping_frame(elapsed: f32, frame_secs: f32, frames: u8) -> u8 {
    if frame_secs <= 0.0 || frames == 0 {
        return 0;
    }
    ((elapsed / frame_secs) as u32 % frames as u32) as u8
}
