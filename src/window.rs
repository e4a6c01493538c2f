use crate::geometry::{Frame, Point, Screen, Size};
use std::collections::BTreeMap;

pub type WindowId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowLevel {
    Floating,
    Normal,
}

/// Window host collaborator: creates native surfaces and mutates them.
/// Operations on a closed or unknown window are ignored.
pub trait WindowHost {
    fn open(&mut self, title: &str, frame: Frame) -> WindowId;
    fn frame(&self, id: WindowId) -> Option<Frame>;
    fn set_frame(&mut self, id: WindowId, frame: Frame, animated: bool);
    fn close(&mut self, id: WindowId);
    fn set_close_button_enabled(&mut self, id: WindowId, enabled: bool);
    fn set_close_button_hidden(&mut self, id: WindowId, hidden: bool);
    fn set_level(&mut self, id: WindowId, level: WindowLevel);
    fn set_alpha(&mut self, id: WindowId, alpha: f32);
    fn set_shadow(&mut self, id: WindowId, shadow: bool);
    fn set_blurred(&mut self, id: WindowId, blurred: bool);
    /// Raises the window and makes it key.
    fn focus(&mut self, id: WindowId);
    /// Screen the window currently occupies, if any.
    fn screen(&self, id: WindowId) -> Option<Screen>;
    fn main_screen(&self) -> Option<Screen>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualWindow {
    pub title: String,
    /// Frame the window is at, or animating toward.
    pub frame: Frame,
    /// Frame currently on display.
    pub shown: Frame,
    pub level: WindowLevel,
    pub alpha: f32,
    pub shadow: bool,
    pub blurred: bool,
    pub close_enabled: bool,
    pub close_hidden: bool,
}

/// In-memory window host: keeps window state, z-order and animation progress.
/// The terminal desktop renders it; headless commands and tests drive it directly.
#[derive(Debug, Default)]
pub struct VirtualHost {
    screens: Vec<Screen>,
    windows: BTreeMap<WindowId, VirtualWindow>,
    z_order: Vec<WindowId>,
    key_window: Option<WindowId>,
    next_id: WindowId,
}

const ANIMATION_STEP: f32 = 0.35;

impl VirtualHost {
    pub fn new(screens: Vec<Screen>) -> Self {
        VirtualHost {
            screens,
            next_id: 1,
            ..VirtualHost::default()
        }
    }

    pub fn set_screens(&mut self, screens: Vec<Screen>) {
        self.screens = screens;
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn window(&self, id: WindowId) -> Option<&VirtualWindow> {
        self.windows.get(&id)
    }

    pub fn is_open(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn open_count(&self) -> usize {
        self.windows.len()
    }

    pub fn key_window(&self) -> Option<WindowId> {
        self.key_window
    }

    /// Back-to-front: normal level first, then floating, each by z-order.
    pub fn stacking_order(&self) -> Vec<WindowId> {
        let mut ordered: Vec<WindowId> = self
            .z_order
            .iter()
            .copied()
            .filter(|id| self.window(*id).map(|w| w.level) == Some(WindowLevel::Normal))
            .collect();
        ordered.extend(
            self.z_order
                .iter()
                .copied()
                .filter(|id| self.window(*id).map(|w| w.level) == Some(WindowLevel::Floating)),
        );
        ordered
    }

    /// Advances every running animation one step; returns whether any moved.
    pub fn step_animations(&mut self) -> bool {
        let mut moved = false;
        for window in self.windows.values_mut() {
            if window.shown != window.frame {
                window.shown = window.shown.step_toward(&window.frame, ANIMATION_STEP);
                moved = true;
            }
        }
        moved
    }

    pub fn finish_animations(&mut self) {
        for window in self.windows.values_mut() {
            window.shown = window.frame;
        }
    }

    fn with_window(&mut self, id: WindowId, f: impl FnOnce(&mut VirtualWindow)) {
        if let Some(window) = self.windows.get_mut(&id) {
            f(window);
        }
    }
}

impl WindowHost for VirtualHost {
    fn open(&mut self, title: &str, frame: Frame) -> WindowId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.windows.insert(
            id,
            VirtualWindow {
                title: title.to_string(),
                frame,
                shown: frame,
                level: WindowLevel::Floating,
                alpha: 1.0,
                shadow: true,
                blurred: false,
                close_enabled: true,
                close_hidden: false,
            },
        );
        self.z_order.push(id);
        self.key_window = Some(id);
        id
    }

    fn frame(&self, id: WindowId) -> Option<Frame> {
        self.window(id).map(|w| w.frame)
    }

    fn set_frame(&mut self, id: WindowId, frame: Frame, animated: bool) {
        self.with_window(id, |w| {
            w.frame = frame;
            if !animated {
                w.shown = frame;
            }
        });
    }

    fn close(&mut self, id: WindowId) {
        self.windows.remove(&id);
        self.z_order.retain(|w| *w != id);
        if self.key_window == Some(id) {
            self.key_window = self.z_order.last().copied();
        }
    }

    fn set_close_button_enabled(&mut self, id: WindowId, enabled: bool) {
        self.with_window(id, |w| w.close_enabled = enabled);
    }

    fn set_close_button_hidden(&mut self, id: WindowId, hidden: bool) {
        self.with_window(id, |w| w.close_hidden = hidden);
    }

    fn set_level(&mut self, id: WindowId, level: WindowLevel) {
        self.with_window(id, |w| w.level = level);
    }

    fn set_alpha(&mut self, id: WindowId, alpha: f32) {
        self.with_window(id, |w| w.alpha = alpha.clamp(0.0, 1.0));
    }

    fn set_shadow(&mut self, id: WindowId, shadow: bool) {
        self.with_window(id, |w| w.shadow = shadow);
    }

    fn set_blurred(&mut self, id: WindowId, blurred: bool) {
        self.with_window(id, |w| w.blurred = blurred);
    }

    fn focus(&mut self, id: WindowId) {
        if !self.windows.contains_key(&id) {
            return;
        }
        self.z_order.retain(|w| *w != id);
        self.z_order.push(id);
        self.key_window = Some(id);
    }

    fn screen(&self, id: WindowId) -> Option<Screen> {
        let frame = self.window(id)?.frame;
        let center = frame.center();
        if let Some(screen) = self.screens.iter().find(|s| s.frame.contains(center)) {
            return Some(*screen);
        }
        self.screens
            .iter()
            .map(|s| (s.frame.intersection_area(&frame), s))
            .filter(|(area, _)| *area > 0)
            .max_by_key(|(area, _)| *area)
            .map(|(_, s)| *s)
    }

    fn main_screen(&self) -> Option<Screen> {
        self.screens.first().copied()
    }
}

/// Single main screen of the given size, with a menu bar.
pub fn main_screen(size: Size, menu_bar_height: i32) -> Screen {
    Screen {
        id: 0,
        frame: Frame::from_parts(Point::new(0, 0), size),
        menu_bar_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> VirtualHost {
        VirtualHost::new(vec![
            main_screen(Size::new(1440, 900), 25),
            Screen {
                id: 1,
                frame: Frame::new(1440, 0, 1920, 1080),
                menu_bar_height: 0,
            },
        ])
    }

    #[test]
    fn screen_is_resolved_from_window_center() {
        let mut host = host();
        let left = host.open("a", Frame::new(100, 100, 250, 300));
        let right = host.open("b", Frame::new(1400, 100, 250, 300));
        let offscreen = host.open("c", Frame::new(-5000, -5000, 250, 300));
        assert_eq!(host.screen(left).map(|s| s.id), Some(0));
        assert_eq!(host.screen(right).map(|s| s.id), Some(1));
        assert_eq!(host.screen(offscreen), None);
    }

    #[test]
    fn animated_frames_settle_over_steps() {
        let mut host = host();
        let id = host.open("a", Frame::new(0, 0, 250, 300));
        host.set_frame(id, Frame::new(400, 40, 250, 300), true);
        assert_eq!(host.frame(id), Some(Frame::new(400, 40, 250, 300)));
        assert_eq!(host.window(id).unwrap().shown, Frame::new(0, 0, 250, 300));
        let mut steps = 0;
        while host.step_animations() {
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(host.window(id).unwrap().shown, Frame::new(400, 40, 250, 300));
    }

    #[test]
    fn focus_raises_and_close_hands_key_back() {
        let mut host = host();
        let a = host.open("a", Frame::default());
        let b = host.open("b", Frame::default());
        host.focus(a);
        assert_eq!(host.stacking_order(), vec![b, a]);
        host.set_level(a, WindowLevel::Normal);
        assert_eq!(host.stacking_order(), vec![a, b]);
        host.close(a);
        assert_eq!(host.key_window(), Some(b));
        assert!(!host.is_open(a));
    }
}
