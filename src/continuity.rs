//! Positional continuity between qualifying frames.
//!
//! Displacement is measured between top-left corners, in raw bbox pixel units.
//! It is not normalised to frame resolution, so the same threshold is stricter
//! on low-resolution video than on 4K footage.

use serde::Serialize;

use crate::detect::BBox;

/// Default jump threshold in bbox pixel units.
pub const DEFAULT_JUMP_THRESHOLD: f32 = 200.0;

/// A flagged displacement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Jump {
    pub frame_index: u64,
    pub dx: f32,
    pub dy: f32,
}

impl Jump {
    pub fn magnitude(&self) -> f32 {
        self.dx.max(self.dy)
    }
}

/// Compare the current best box with the last seen one.
///
/// Returns a jump when either axis moved strictly more than `threshold`.
pub fn check_jump(
    frame_index: u64,
    last: Option<&BBox>,
    current: &BBox,
    threshold: f32,
) -> Option<Jump> {
    let last = last?;
    let dx = (current.x1 - last.x1).abs();
    let dy = (current.y1 - last.y1).abs();
    if dx > threshold || dy > threshold {
        Some(Jump {
            frame_index,
            dx,
            dy,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> BBox {
        BBox::new(x, y, x + 50.0, y + 50.0)
    }

    #[test]
    fn first_box_never_jumps() {
        assert!(check_jump(0, None, &at(900.0, 900.0), 200.0).is_none());
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(check_jump(1, Some(&at(0.0, 0.0)), &at(200.0, 0.0), 200.0).is_none());
        let jump = check_jump(1, Some(&at(0.0, 0.0)), &at(200.5, 0.0), 200.0).unwrap();
        assert_eq!(jump.dx, 200.5);
    }

    #[test]
    fn either_axis_triggers() {
        let jump = check_jump(7, Some(&at(100.0, 400.0)), &at(90.0, 50.0), 200.0).unwrap();
        assert_eq!(jump.frame_index, 7);
        assert_eq!(jump.dx, 10.0);
        assert_eq!(jump.dy, 350.0);
        assert_eq!(jump.magnitude(), 350.0);
    }

    #[test]
    fn only_top_left_corner_counts() {
        // Same corner, box grew a lot: not a jump.
        let last = BBox::new(10.0, 10.0, 20.0, 20.0);
        let current = BBox::new(10.0, 10.0, 900.0, 900.0);
        assert!(check_jump(2, Some(&last), &current, 200.0).is_none());
    }
}
