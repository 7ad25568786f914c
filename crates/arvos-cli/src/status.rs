use std::io::Write;

use arvos_core::StatusSink;

/// Prints status text to a writer whenever it changes
pub struct ConsoleStatus<W: Write + Send> {
    out: W,
    last: String,
}

impl ConsoleStatus<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleStatus<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: String::new(),
        }
    }
}

impl<W: Write + Send> StatusSink for ConsoleStatus<W> {
    fn set_status_text(&mut self, text: &str) {
        if text == self.last {
            return;
        }
        self.last = text.to_string();
        if !text.is_empty() {
            // status output is best effort
            let _ = writeln!(self.out, "{text}");
        }
    }
}
