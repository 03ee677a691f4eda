//! Terminal input polling, kept non-blocking so background watch events and
//! notice expiry keep flowing while the user is idle.

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use std::time::Duration;

pub struct EventHandler {
    tick: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick: Duration::from_millis(50),
        }
    }

    /// Returns the next key press, or `None` after one tick of quiet.
    pub fn poll_key(&mut self) -> Result<Option<KeyEvent>> {
        if event::poll(self.tick)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(Some(key)),
                _ => {}
            }
        }
        Ok(None)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
