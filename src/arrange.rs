use crate::geometry::{Frame, Screen, ScreenId};
use crate::settings::{Axis, Corner, Settings, Spacing};
use crate::window::WindowId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrangement {
    pub corner: Corner,
    pub axis: Axis,
    pub corner_margin: Spacing,
    pub spacing: Spacing,
}

/// Which windows a pass touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Expanded,
    Minimized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub window: WindowId,
    pub frame: Frame,
    pub screen: Option<Screen>,
    pub minimized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub window: WindowId,
    pub frame: Frame,
}

impl From<&Settings> for Arrangement {
    fn from(settings: &Settings) -> Self {
        Arrangement {
            corner: settings.arrangement_corner,
            axis: settings.arrangement_axis,
            corner_margin: settings.arrangement_corner_margin,
            spacing: settings.arrangement_spacing,
        }
    }
}

impl Arrangement {
    /// Whether the corner sits on the high end of the primary axis.
    fn inverse(&self) -> bool {
        match self.axis {
            Axis::Horizontal => self.corner.is_right(),
            Axis::Vertical => self.corner.is_top(),
        }
    }

    fn primary(&self, frame: &Frame) -> i32 {
        match self.axis {
            Axis::Horizontal => frame.x,
            Axis::Vertical => frame.y,
        }
    }

    fn extent(&self, frame: &Frame) -> i32 {
        match self.axis {
            Axis::Horizontal => frame.width,
            Axis::Vertical => frame.height,
        }
    }
}

/// Computes the frame of every candidate in `scope`, screen by screen.
/// Candidates without a screen are left out.
pub fn plan(candidates: &[Candidate], arrangement: &Arrangement, scope: Scope) -> Vec<Placement> {
    let mut by_screen: BTreeMap<ScreenId, (Screen, Vec<&Candidate>)> = BTreeMap::new();
    for candidate in candidates {
        let in_scope = match scope {
            Scope::Expanded => !candidate.minimized,
            Scope::Minimized => candidate.minimized,
        };
        let Some(screen) = candidate.screen else {
            continue;
        };
        if !in_scope {
            continue;
        }
        by_screen
            .entry(screen.id)
            .or_insert_with(|| (screen, Vec::new()))
            .1
            .push(candidate);
    }

    let mut placements = Vec::with_capacity(candidates.len());
    for (screen, mut windows) in by_screen.into_values() {
        windows.sort_by(|a, b| {
            let ordering = arrangement
                .primary(&a.frame)
                .cmp(&arrangement.primary(&b.frame));
            let ordering = if arrangement.inverse() {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| a.window.cmp(&b.window))
        });
        placements.extend(place_on_screen(&windows, &screen, arrangement));
    }
    placements
}

fn place_on_screen(
    windows: &[&Candidate],
    screen: &Screen,
    arrangement: &Arrangement,
) -> Vec<Placement> {
    let margin = arrangement.corner_margin.points();
    let horizontal = arrangement.axis == Axis::Horizontal;
    let mut cursor = 0;
    let mut placements = Vec::with_capacity(windows.len());
    for (idx, candidate) in windows.iter().enumerate() {
        let gap = if idx == 0 {
            margin
        } else {
            arrangement.spacing.points()
        };
        let along = cursor + gap;
        let (offset_x, offset_y) = if horizontal {
            (along, margin)
        } else {
            (margin, along)
        };
        let width = candidate.frame.width;
        let height = candidate.frame.height;
        let x = if arrangement.corner.is_right() {
            screen.frame.width - offset_x - width
        } else {
            offset_x
        };
        let y = if arrangement.corner.is_top() {
            screen.frame.height - screen.menu_bar_height - offset_y - height
        } else {
            offset_y
        };
        let frame = Frame::new(x + screen.frame.x, y + screen.frame.y, width, height);
        tracing::debug!(window = candidate.window, ?frame, "arranged window");
        placements.push(Placement {
            window: candidate.window,
            frame,
        });
        cursor = along + arrangement.extent(&candidate.frame);
    }
    placements
}
