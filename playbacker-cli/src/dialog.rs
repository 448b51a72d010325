use std::io::{self, Write};

use crossbeam_channel::Receiver;

use playbacker_core::gate::Dialog;

use crate::input::parse_answer;

/// Asks on the terminal and takes answers from the command input.
pub struct TerminalDialog {
    lines: Receiver<String>,
}

impl TerminalDialog {
    pub fn new(lines: Receiver<String>) -> Self {
        Self { lines }
    }

    fn prompt(&self, message: &str) {
        print!("{} ", message);
        let _ = io::stdout().flush();
    }
}

impl Dialog for TerminalDialog {
    fn confirm(&self, message: &str) -> bool {
        loop {
            self.prompt(&format!("{} [y/n]", message));
            match self.lines.recv() {
                Ok(line) => {
                    if let Some(answer) = parse_answer(&line) {
                        return answer;
                    }
                }
                // Input is gone, nobody can agree.
                Err(_) => return false,
            }
        }
    }

    fn alert(&self, message: &str) {
        self.prompt(&format!("{} (press enter)", message));
        let _ = self.lines.recv();
    }
}
