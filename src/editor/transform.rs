//! Gestures applied to a prop while the picture is being previewed

use super::props::Placement;

pub const MIN_SCALE: f64 = 0.05;
pub const MAX_SCALE: f64 = 20.0;

/// A single user manipulation of a prop's placement
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlacementChange {
    /// Drag by a pixel offset
    MoveBy { dx: i64, dy: i64 },
    /// Drop at an absolute position
    MoveTo { x: i64, y: i64 },
    /// Pinch, multiplying the current scale
    ScaleBy(f64),
    SetScale(f64),
    /// Twist by a number of degrees (clockwise)
    RotateBy(f64),
    SetRotation(f64),
}

impl Placement {
    pub fn apply(&mut self, change: PlacementChange) {
        match change {
            PlacementChange::MoveBy { dx, dy } => {
                self.x = self.x.saturating_add(dx);
                self.y = self.y.saturating_add(dy);
            }
            PlacementChange::MoveTo { x, y } => {
                self.x = x;
                self.y = y;
            }
            PlacementChange::ScaleBy(factor) => self.set_scale(self.scale * factor),
            PlacementChange::SetScale(scale) => self.set_scale(scale),
            PlacementChange::RotateBy(degrees) => self.set_rotation(self.rotation + degrees),
            PlacementChange::SetRotation(degrees) => self.set_rotation(degrees),
        }
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        }
    }

    /// Store the rotation normalised to `[0, 360)`
    pub fn set_rotation(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.rotation = degrees.rem_euclid(360.0);
        }
    }
}
