//! Pointer events for unified mouse/touch/pen handling.

use crate::coords::ClientPoint;
use serde::{Deserialize, Serialize};

/// Host-assigned pointer identifier, stable for the lifetime of a contact.
pub type PointerId = i64;

/// A pointer event in client coordinates.
///
/// The host is expected to capture the pointer on `Down`, so a gesture
/// keeps receiving `Move`/`Up` even after leaving the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        id: PointerId,
        position: ClientPoint,
    },
    Move {
        id: PointerId,
        position: ClientPoint,
        /// Whether any button is held; hover moves only update the cursor.
        #[serde(default = "default_pressed")]
        pressed: bool,
    },
    Up {
        id: PointerId,
        position: ClientPoint,
    },
    /// Pointer left the surface without capture.
    Leave { id: PointerId },
    /// Capture was lost (OS interruption); treated as an implicit up.
    CaptureLost { id: PointerId },
}

fn default_pressed() -> bool {
    true
}

impl PointerEvent {
    pub fn id(&self) -> PointerId {
        match *self {
            PointerEvent::Down { id, .. }
            | PointerEvent::Move { id, .. }
            | PointerEvent::Up { id, .. }
            | PointerEvent::Leave { id }
            | PointerEvent::CaptureLost { id } => id,
        }
    }

    /// Reported position, if the event carries one.
    pub fn position(&self) -> Option<ClientPoint> {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position, .. }
            | PointerEvent::Up { position, .. } => Some(position),
            PointerEvent::Leave { .. } | PointerEvent::CaptureLost { .. } => None,
        }
    }

    /// Whether this event ends the pointer's contact.
    pub fn is_release(&self) -> bool {
        matches!(
            self,
            PointerEvent::Up { .. } | PointerEvent::Leave { .. } | PointerEvent::CaptureLost { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let down = PointerEvent::Down {
            id: 3,
            position: ClientPoint::new(1.0, 2.0),
        };
        assert_eq!(down.id(), 3);
        assert_eq!(down.position(), Some(ClientPoint::new(1.0, 2.0)));
        assert!(!down.is_release());

        let lost = PointerEvent::CaptureLost { id: 3 };
        assert_eq!(lost.position(), None);
        assert!(lost.is_release());
    }

    #[test]
    fn test_move_defaults_to_pressed() {
        let event: PointerEvent =
            serde_json::from_str(r#"{"kind":"move","id":1,"position":{"x":4.0,"y":5.0}}"#)
                .unwrap();
        assert!(matches!(event, PointerEvent::Move { pressed: true, .. }));
    }
}
