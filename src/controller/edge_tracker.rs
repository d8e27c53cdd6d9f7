//! Edge detection for the wheel's digital inputs
//!
//! Every button and every hat direction is a two-state machine
//! (`released` / `pressed`). Only transitions produce an [`EdgeEvent`].
//!
//! Inputs are tracked lazily: the first observation seeds the table without
//! producing an event. A button that is already held when the engine starts
//! therefore never reports its press, only its later release.

use crate::controller::frame::{HatDirection, RawDeviceFrame};
use std::collections::HashMap;
use tracing::debug;

/// Identifies one digital input of the wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputId {
    Button(u32),
    Hat(u32, HatDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub input: InputId,
    pub edge: Edge,
}

#[derive(Debug, Default, Clone)]
pub struct EdgeTracker {
    last_states: HashMap<InputId, bool>,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one frame through the tracker and returns the transitions it caused.
    ///
    /// Every button index and every hat direction is visited, changed or not.
    pub fn update(&mut self, frame: &RawDeviceFrame) -> Vec<EdgeEvent> {
        let mut events = Vec::new();

        for (idx, pressed) in frame.buttons.iter().enumerate() {
            self.observe(InputId::Button(idx as u32), *pressed, &mut events);
        }

        for (hat_id, position) in frame.hats.iter().enumerate() {
            for direction in HatDirection::ALL {
                self.observe(
                    InputId::Hat(hat_id as u32, direction),
                    position.is_pressed(direction),
                    &mut events,
                );
            }
        }

        if !events.is_empty() {
            debug!("Detected {} input edges: {:?}", events.len(), events);
        }
        events
    }

    fn observe(&mut self, input: InputId, pressed: bool, events: &mut Vec<EdgeEvent>) {
        match self.last_states.insert(input, pressed) {
            Some(false) if pressed => events.push(EdgeEvent {
                input,
                edge: Edge::Pressed,
            }),
            Some(true) if !pressed => events.push(EdgeEvent {
                input,
                edge: Edge::Released,
            }),
            _ => {}
        }
    }

    /// Last observed state, `None` if the input was never seen
    pub fn state(&self, input: InputId) -> Option<bool> {
        self.last_states.get(&input).copied()
    }

    pub fn tracked_inputs(&self) -> usize {
        self.last_states.len()
    }
}
