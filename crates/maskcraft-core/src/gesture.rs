//! Single- versus multi-pointer gesture arbitration.
//!
//! One explicit state machine decides whether the live pointers form a
//! single-pointer action (paint, click, drag) or a two-pointer pan/zoom,
//! so the two can never both act on the same input.

use crate::coords::ClientPoint;
use crate::input::PointerId;
use crate::view::PinchStep;
use kurbo::Point;
use std::collections::BTreeMap;

/// Centroid and spread of the two tracked pointers at the last sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchSample {
    pub center: Point,
    pub distance: f64,
}

/// Current arbitration state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureMode {
    #[default]
    Idle,
    /// One pointer owns the interaction.
    Single {
        pointer: PointerId,
        origin: ClientPoint,
        /// Movement exceeded the tap threshold at some point.
        dragged: bool,
    },
    /// Two pointers drive pan/zoom. `pinch` is `None` until the first move.
    Multi { pinch: Option<PinchSample> },
    /// A pan/zoom ended but pointers are still down; they are ignored
    /// until every pointer lifts.
    Draining,
}

/// What the caller should do in response to a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    /// Pointer moved with nothing pressed.
    Hover(ClientPoint),
    SingleStart(ClientPoint),
    SingleMove {
        position: ClientPoint,
        dragged: bool,
    },
    SingleEnd {
        position: ClientPoint,
        dragged: bool,
    },
    /// A second pointer landed; discard the in-flight single action.
    SingleCancel,
    PinchBaseline,
    Pinch(PinchStep),
    MultiEnd,
}

#[derive(Debug, Clone)]
pub struct GestureArbiter {
    pointers: BTreeMap<PointerId, ClientPoint>,
    mode: GestureMode,
    tap_threshold: f64,
}

impl Default for GestureArbiter {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl GestureArbiter {
    pub fn new(tap_threshold: f64) -> Self {
        Self {
            pointers: BTreeMap::new(),
            mode: GestureMode::Idle,
            tap_threshold,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.mode, GestureMode::Multi { .. })
    }

    pub fn last_position(&self, id: PointerId) -> Option<ClientPoint> {
        self.pointers.get(&id).copied()
    }

    /// Register a pointer.
    ///
    /// `allow_multi` is false in contexts where two-finger gestures have
    /// no meaning; a second pointer is then tracked but ignored.
    pub fn pointer_down(
        &mut self,
        id: PointerId,
        position: ClientPoint,
        allow_multi: bool,
    ) -> GestureOutcome {
        self.pointers.insert(id, position);
        let count = self.pointers.len();

        match self.mode {
            GestureMode::Idle if count == 1 => {
                self.mode = GestureMode::Single {
                    pointer: id,
                    origin: position,
                    dragged: false,
                };
                GestureOutcome::SingleStart(position)
            }
            GestureMode::Idle | GestureMode::Single { .. } if count == 2 && allow_multi => {
                let was_single = matches!(self.mode, GestureMode::Single { .. });
                self.mode = GestureMode::Multi { pinch: None };
                log::debug!("gesture: entering two-pointer mode");
                if was_single {
                    GestureOutcome::SingleCancel
                } else {
                    GestureOutcome::Ignored
                }
            }
            _ => GestureOutcome::Ignored,
        }
    }

    /// Update a pointer. `container_origin` is the client-space origin of
    /// the surface container, used to express the pinch centroid locally.
    pub fn pointer_move(
        &mut self,
        id: PointerId,
        position: ClientPoint,
        container_origin: Point,
    ) -> GestureOutcome {
        let Some(slot) = self.pointers.get_mut(&id) else {
            return if self.pointers.is_empty() {
                GestureOutcome::Hover(position)
            } else {
                GestureOutcome::Ignored
            };
        };
        *slot = position;

        match &mut self.mode {
            GestureMode::Single {
                pointer,
                origin,
                dragged,
            } if *pointer == id => {
                if origin.distance(position) > self.tap_threshold {
                    *dragged = true;
                }
                GestureOutcome::SingleMove {
                    position,
                    dragged: *dragged,
                }
            }
            GestureMode::Multi { pinch } => {
                let Some(sample) = pair_sample(&self.pointers, container_origin) else {
                    return GestureOutcome::Ignored;
                };
                match pinch.replace(sample) {
                    None => GestureOutcome::PinchBaseline,
                    Some(previous) => {
                        let scale_factor = if previous.distance > 0.0 {
                            sample.distance / previous.distance
                        } else {
                            1.0
                        };
                        GestureOutcome::Pinch(PinchStep {
                            center: sample.center,
                            scale_factor,
                            delta: sample.center - previous.center,
                        })
                    }
                }
            }
            _ => GestureOutcome::Ignored,
        }
    }

    /// Deregister a pointer. `position` overrides the last known position.
    pub fn pointer_up(&mut self, id: PointerId, position: Option<ClientPoint>) -> GestureOutcome {
        let Some(last) = self.pointers.remove(&id) else {
            return GestureOutcome::Ignored;
        };
        let position = position.unwrap_or(last);
        let remaining = self.pointers.len();
        let after = if remaining == 0 {
            GestureMode::Idle
        } else {
            GestureMode::Draining
        };

        match self.mode {
            GestureMode::Single {
                pointer, dragged, ..
            } if pointer == id => {
                self.mode = after;
                GestureOutcome::SingleEnd { position, dragged }
            }
            GestureMode::Multi { .. } if remaining < 2 => {
                self.mode = after;
                log::debug!("gesture: two-pointer mode ended");
                GestureOutcome::MultiEnd
            }
            GestureMode::Multi { .. } => {
                // The tracked pair changed; start a fresh baseline.
                self.mode = GestureMode::Multi { pinch: None };
                GestureOutcome::Ignored
            }
            GestureMode::Draining if remaining == 0 => {
                self.mode = GestureMode::Idle;
                GestureOutcome::Ignored
            }
            _ => GestureOutcome::Ignored,
        }
    }

    /// Forget all pointers and return to idle.
    pub fn cancel(&mut self) {
        self.pointers.clear();
        self.mode = GestureMode::Idle;
    }
}

fn pair_sample(
    pointers: &BTreeMap<PointerId, ClientPoint>,
    origin: Point,
) -> Option<PinchSample> {
    let mut iter = pointers.values();
    let a = iter.next()?.0;
    let b = iter.next()?.0;
    Some(PinchSample {
        center: a.midpoint(b) - origin.to_vec2(),
        distance: a.distance(b),
    })
}
