//! Done → countdown → fade → delete cycle of a single note.

use crate::settings::License;

/// Delay between a note becoming complete and its countdown starting.
pub const CONFIRM_DELAY_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadePhase {
    Active,
    ConfirmedDone { waited: f64 },
    Counting { progress: f64 },
    Disappeared,
}

/// What the window should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeEffect {
    Unchanged,
    /// Opacity changed; once below 1 the window drops to normal level,
    /// loses its shadow and hides its close button.
    Opacity { alpha: f32 },
    /// Back to a fully opaque floating window.
    Restore,
    /// Close the window and delete the list.
    Disappear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FadeOut {
    phase: FadePhase,
    already_done: bool,
    timeout: f64,
}

impl FadeOut {
    /// Notes that open already complete show the done overlay but never
    /// count down during this session.
    pub fn opened(is_complete: bool, timeout: f64) -> Self {
        FadeOut {
            phase: if is_complete {
                FadePhase::ConfirmedDone { waited: 0.0 }
            } else {
                FadePhase::Active
            },
            already_done: is_complete,
            timeout,
        }
    }

    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    pub fn already_done(&self) -> bool {
        self.already_done
    }

    pub fn is_done(&self) -> bool {
        !matches!(self.phase, FadePhase::Active)
    }

    /// Whether the countdown bar is shown.
    pub fn shows_progress(&self) -> bool {
        self.is_done() && !self.already_done
    }

    pub fn progress(&self) -> f64 {
        match self.phase {
            FadePhase::Counting { progress } => progress,
            FadePhase::Disappeared => self.timeout,
            _ => 0.0,
        }
    }

    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    pub fn alpha(&self) -> f32 {
        if self.timeout <= 0.0 {
            return 1.0;
        }
        (1.0 - self.progress() / self.timeout).clamp(0.0, 1.0) as f32
    }

    pub fn is_fading(&self) -> bool {
        self.alpha() < 1.0
    }

    pub fn can_cancel(&self, license: License) -> bool {
        license == License::Pro
            && !self.already_done
            && matches!(
                self.phase,
                FadePhase::ConfirmedDone { .. } | FadePhase::Counting { .. }
            )
    }

    pub fn completion_changed(&mut self, is_complete: bool) -> FadeEffect {
        match (self.phase, is_complete) {
            (FadePhase::Active, true) => {
                self.phase = FadePhase::ConfirmedDone { waited: 0.0 };
                FadeEffect::Unchanged
            }
            (FadePhase::ConfirmedDone { .. } | FadePhase::Counting { .. }, false) => {
                self.reset()
            }
            _ => FadeEffect::Unchanged,
        }
    }

    /// Explicit user cancel; returns `None` when not offered.
    pub fn cancel(&mut self, license: License) -> Option<FadeEffect> {
        if !self.can_cancel(license) {
            return None;
        }
        Some(self.reset())
    }

    pub fn tick(&mut self, elapsed: f64) -> FadeEffect {
        match self.phase {
            FadePhase::ConfirmedDone { waited } => {
                if self.already_done {
                    return FadeEffect::Unchanged;
                }
                let waited = waited + elapsed;
                if waited >= CONFIRM_DELAY_SECONDS {
                    self.phase = FadePhase::Counting { progress: 0.0 };
                } else {
                    self.phase = FadePhase::ConfirmedDone { waited };
                }
                FadeEffect::Unchanged
            }
            FadePhase::Counting { progress } => {
                let progress = (progress + elapsed).min(self.timeout);
                if progress >= self.timeout {
                    self.phase = FadePhase::Disappeared;
                    FadeEffect::Disappear
                } else {
                    self.phase = FadePhase::Counting { progress };
                    FadeEffect::Opacity {
                        alpha: self.alpha(),
                    }
                }
            }
            FadePhase::Active | FadePhase::Disappeared => FadeEffect::Unchanged,
        }
    }

    fn reset(&mut self) -> FadeEffect {
        let was_fading = self.is_fading();
        self.phase = FadePhase::Active;
        if was_fading {
            FadeEffect::Restore
        } else {
            FadeEffect::Unchanged
        }
    }
}
