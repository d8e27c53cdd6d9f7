use crate::output::{MouseInjector, OutputSink, SinkError};
use tracing::debug;

/// Relative mouse motion sink. Motion is never "held", so release is trivial.
pub struct MouseSink {
    injector: Box<dyn MouseInjector>,
}

impl MouseSink {
    pub fn new(injector: Box<dyn MouseInjector>) -> Self {
        Self { injector }
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) -> Result<(), SinkError> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        self.injector.move_relative(dx, dy)?;
        debug!("Mouse moved by ({}, {})", dx, dy);
        Ok(())
    }
}

impl OutputSink for MouseSink {
    fn name(&self) -> &'static str {
        "mouse"
    }

    fn release_all(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn is_idle(&self) -> bool {
        true
    }
}
