use serde::{Deserialize, Serialize};

/// Screen coordinates use a bottom-left origin with y growing upward, in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

pub type ScreenId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub id: ScreenId,
    pub frame: Frame,
    /// Points reserved at the top edge; only the main screen has a menu bar.
    pub menu_bar_height: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Size { width, height }
    }
}

impl Frame {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Frame {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Frame::new(origin.x, origin.y, size.width, size.height)
    }

    /// A frame of `size` whose center sits on `center`.
    pub fn centered_at(center: Point, size: Size) -> Self {
        Frame::new(
            center.x - size.width / 2,
            center.y - size.height / 2,
            size.width,
            size.height,
        )
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> i32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn with_size(&self, size: Size) -> Self {
        Frame::from_parts(self.origin(), size)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    pub fn intersection_area(&self, other: &Frame) -> i64 {
        let w = self.max_x().min(other.max_x()) - self.x.max(other.x);
        let h = self.max_y().min(other.max_y()) - self.y.max(other.y);
        if w <= 0 || h <= 0 {
            0
        } else {
            w as i64 * h as i64
        }
    }

    /// Moves every edge a `fraction` of the way toward `target`, snapping when close.
    pub fn step_toward(&self, target: &Frame, fraction: f32) -> Frame {
        fn step(from: i32, to: i32, fraction: f32) -> i32 {
            let delta = to - from;
            if delta.abs() <= 1 {
                return to;
            }
            let moved = (delta as f32 * fraction).round() as i32;
            if moved == 0 {
                from + delta.signum()
            } else {
                from + moved
            }
        }
        Frame::new(
            step(self.x, target.x, fraction),
            step(self.y, target.y, fraction),
            step(self.width, target.width, fraction),
            step(self.height, target.height, fraction),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_frame_places_center_on_point() {
        let frame = Frame::centered_at(Point::new(500, 400), Size::new(250, 300));
        assert_eq!(frame, Frame::new(375, 250, 250, 300));
        assert_eq!(frame.center(), Point::new(500, 400));
    }

    #[test]
    fn intersection_of_disjoint_frames_is_empty() {
        let a = Frame::new(0, 0, 100, 100);
        let b = Frame::new(100, 0, 100, 100);
        assert_eq!(a.intersection_area(&b), 0);
        assert_eq!(a.intersection_area(&Frame::new(50, 50, 100, 100)), 2500);
    }

    #[test]
    fn stepping_converges_on_target() {
        let target = Frame::new(300, 20, 96, 66);
        let mut frame = Frame::new(0, 400, 250, 300);
        for _ in 0..50 {
            frame = frame.step_toward(&target, 0.35);
        }
        assert_eq!(frame, target);
    }
}
