// Text diagnostics for a HUD / inspector pane.
//
// The engine writes numbered info lines here; a host draws them however it
// likes. Nothing in the simulation ever reads these lines back.

/// Fixed line slots so different writers don't overwrite each other.
pub mod line {
    pub const FLOCK_LEVEL: usize = 13;
    pub const BOUNDS: usize = 14;
    pub const AGENT_LOCATION: usize = 15;
    pub const AGENT_GOAL: usize = 16;
    pub const AGENT_TURNS: usize = 17;
    pub const AGENT_DONE: usize = 18;
    pub const AGENT_MODE: usize = 19;
}

/// Receiver for diagnostic text.
pub trait InfoSink {
    fn set_info(&mut self, index: usize, text: String);
}

/// Discards everything. Handy for tests and headless runs.
pub struct NullSink;

impl InfoSink for NullSink {
    fn set_info(&mut self, _index: usize, _text: String) {}
}

/// In-memory pane of numbered lines.
#[derive(Debug, Default, Clone)]
pub struct InfoPane {
    lines: Vec<String>,
}

impl InfoPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Non-empty lines in slot order, for printing a status block.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .map(|(i, s)| (i, s.as_str()))
    }
}

impl InfoSink for InfoPane {
    fn set_info(&mut self, index: usize, text: String) {
        if index >= self.lines.len() {
            self.lines.resize(index + 1, String::new());
        }
        log::trace!("info[{}] {}", index, text);
        self.lines[index] = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pane_keeps_latest_text_per_slot() {
        let mut pane = InfoPane::new();
        pane.set_info(line::AGENT_GOAL, "first".into());
        pane.set_info(line::AGENT_GOAL, "second".into());
        pane.set_info(2, "other".into());

        assert_eq!(pane.line(line::AGENT_GOAL), Some("second"));
        assert_eq!(pane.line(0), None);
        let collected: Vec<_> = pane.lines().collect();
        assert_eq!(collected, vec![(2, "other"), (line::AGENT_GOAL, "second")]);
    }
}
