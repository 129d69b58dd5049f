/// Two-state elapsed-time tracker. Only the accumulated seconds value
/// (owned by `GameState`) persists; running/stopped does not.
#[derive(Debug, Default)]
pub struct Timer {
    running: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance `seconds` by one if running. Driven once per second by the
    /// session's scheduler.
    pub fn tick(&self, seconds: &mut u64) {
        if self.running {
            *seconds += 1;
        }
    }
}
