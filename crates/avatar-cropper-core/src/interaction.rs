//! Gesture translation: wheel to scale steps, pointer drags to normalized
//! offset deltas.
//!
//! The controller only tracks gesture state. The host owns the actual
//! listeners and attaches or detaches them when told to via
//! [`ListenerChange`].

use crate::geometry::{Position, Size};

/// Scale change per wheel event.
pub const WHEEL_SCALE_STEP: f64 = 0.1;

/// What the host must do with its document-level move/up listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerChange {
    /// A drag started: listen for move/up on the document.
    Attach,
    /// The drag ended: remove the move/up listeners.
    Detach,
    /// Nothing to do.
    Unchanged,
}

/// Map a wheel event's vertical delta to a scale step.
///
/// Scrolling up (negative delta) zooms in. A zero delta is not a zoom.
pub fn wheel_step(delta_y: f64) -> Option<f64> {
    if delta_y < 0.0 {
        Some(WHEEL_SCALE_STEP)
    } else if delta_y > 0.0 {
        Some(-WHEEL_SCALE_STEP)
    } else {
        None
    }
}

/// Tracks a single pointer drag.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    last: Option<Position>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }

    /// Start a drag at client coordinates `(x, y)`. A second pointer while
    /// dragging is ignored.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> ListenerChange {
        if self.is_dragging() {
            return ListenerChange::Unchanged;
        }
        self.last = Some(Position::new(x, y));
        ListenerChange::Attach
    }

    /// Normalized offset delta since the last sample.
    ///
    /// The pixel displacement is divided by the rendered image size so drag
    /// speed does not depend on resolution. Returns `None` outside a drag.
    pub fn pointer_move(&mut self, x: f64, y: f64, render_size: Size) -> Option<Position> {
        let last = self.last.replace(Position::new(x, y))?;

        let normalize = |delta: f64, extent: f64| if extent > 0.0 { delta / extent } else { 0.0 };
        Some(Position::new(
            normalize(x - last.x, render_size.width),
            normalize(y - last.y, render_size.height),
        ))
    }

    /// Finish the drag.
    pub fn pointer_up(&mut self) -> ListenerChange {
        match self.last.take() {
            Some(_) => ListenerChange::Detach,
            None => ListenerChange::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_direction() {
        assert_eq!(wheel_step(-120.0), Some(0.1));
        assert_eq!(wheel_step(3.0), Some(-0.1));
        assert_eq!(wheel_step(0.0), None);
    }

    #[test]
    fn test_drag_lifecycle() {
        let mut drag = DragController::new();
        assert!(!drag.is_dragging());
        assert_eq!(drag.pointer_up(), ListenerChange::Unchanged);

        assert_eq!(drag.pointer_down(10.0, 10.0), ListenerChange::Attach);
        assert!(drag.is_dragging());
        assert_eq!(drag.pointer_down(50.0, 50.0), ListenerChange::Unchanged);

        assert_eq!(drag.pointer_up(), ListenerChange::Detach);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_move_outside_drag_is_ignored() {
        let mut drag = DragController::new();
        assert!(drag
            .pointer_move(5.0, 5.0, Size::new(100.0, 100.0))
            .is_none());
    }

    #[test]
    fn test_move_normalizes_by_render_size() {
        let mut drag = DragController::new();
        drag.pointer_down(100.0, 100.0);

        let delta = drag
            .pointer_move(140.0, 90.0, Size::new(400.0, 200.0))
            .unwrap();
        assert_eq!(delta, Position::new(0.1, -0.05));

        // Deltas are relative to the previous sample, not the drag start
        let delta = drag
            .pointer_move(180.0, 90.0, Size::new(400.0, 200.0))
            .unwrap();
        assert_eq!(delta, Position::new(0.1, 0.0));
    }

    #[test]
    fn test_move_with_empty_render_size() {
        let mut drag = DragController::new();
        drag.pointer_down(0.0, 0.0);
        let delta = drag.pointer_move(10.0, 10.0, Size::default()).unwrap();
        assert_eq!(delta, Position::ORIGIN);
    }
}
