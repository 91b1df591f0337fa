use serde::{Deserialize, Serialize};

/// Frame geometry of a window, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A frame is valid when all components are finite and it has positive area.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 800.0,
            height: 600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_rect() {
        assert!(Rect::new(0.0, 0.0, 1800.0, 600.0).is_valid());
        assert!(Rect::default().is_valid());
    }

    #[test]
    fn invalid_rects() {
        assert!(!Rect::new(0.0, 0.0, 0.0, 600.0).is_valid());
        assert!(!Rect::new(0.0, 0.0, -100.0, 600.0).is_valid());
        assert!(!Rect::new(f64::NAN, 0.0, 100.0, 100.0).is_valid());
        assert!(!Rect::new(0.0, f64::INFINITY, 100.0, 100.0).is_valid());
    }
}
