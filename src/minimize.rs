use crate::geometry::{Frame, Size};
use crate::model::TaskList;

pub const GAUGE_SIZE: Size = Size::new(96, 66);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinimizeState {
    #[default]
    Expanded,
    Minimized {
        restore: Frame,
    },
}

impl MinimizeState {
    pub fn is_minimized(&self) -> bool {
        matches!(self, MinimizeState::Minimized { .. })
    }

    /// Remembers `current` and returns the gauge frame, or `None` if already minimized.
    pub fn minimize(&mut self, current: Frame) -> Option<Frame> {
        if self.is_minimized() {
            return None;
        }
        *self = MinimizeState::Minimized { restore: current };
        Some(current.with_size(GAUGE_SIZE))
    }

    /// Returns the frame captured when minimizing.
    pub fn restore(&mut self) -> Option<Frame> {
        match *self {
            MinimizeState::Minimized { restore } => {
                *self = MinimizeState::Expanded;
                Some(restore)
            }
            MinimizeState::Expanded => None,
        }
    }

    /// Frame to remember for the note: the expanded one even while minimized.
    pub fn expanded_frame(&self, current: Frame) -> Frame {
        match self {
            MinimizeState::Minimized { restore } => *restore,
            MinimizeState::Expanded => current,
        }
    }
}

/// Content of a minimized note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeView {
    pub done: usize,
    pub total: usize,
}

impl GaugeView {
    pub fn of(list: &TaskList) -> Self {
        GaugeView {
            done: list.done_count(),
            total: list.items.len(),
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.done as f64 / self.total as f64
        }
    }

    pub fn label(&self) -> String {
        if self.done < self.total {
            format!("{}/{}", self.done, self.total)
        } else if self.total == 0 {
            "No tasks".to_string()
        } else {
            "All done".to_string()
        }
    }
}
