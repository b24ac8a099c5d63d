use unicode_width::UnicodeWidthChar;
use vte::{Params, Perform};

use super::grid::{Cell, Color, Grid};

/// Implements [`vte::Perform`] over a [`Grid`], the same parser the teacher
/// used for its passthrough xterm.js backend — here driving a full cell
/// buffer instead of just cursor/title bookkeeping.
///
/// Malformed or unsupported sequences never panic: `csi_dispatch` and
/// `esc_dispatch` fall through to a no-op for any `action`/intermediate byte
/// combination they don't recognize, and private-marker CSI sequences
/// (leading `?`, `>`, `<`, `=` in `intermediates`) are parsed but discarded
/// rather than applied to the grid.
pub struct VteHandler {
    pub grid: Grid,
    pending_sgr: CellAttrs,
    /// Lines pushed out of the top of the grid by a scroll, oldest first.
    /// Drained by [`super::Terminal::drain_evicted_lines`] into pane
    /// scrollback; left to accumulate here between drains otherwise.
    pub evicted_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct CellAttrs {
    fg: Color,
    bg: Color,
    bold: bool,
    dim: bool,
    italic: bool,
    underline: bool,
    reverse: bool,
}

impl VteHandler {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            grid: Grid::new(cols, rows),
            pending_sgr: CellAttrs::default(),
            evicted_lines: Vec::new(),
        }
    }

    fn advance_cursor(&mut self, width: u16) {
        let grid = &mut self.grid;
        grid.cursor_col = grid.cursor_col.saturating_add(width);
        if grid.cursor_col >= grid.cols {
            grid.cursor_col = 0;
            self.line_feed();
        }
    }

    fn line_feed(&mut self) {
        if self.grid.cursor_row + 1 >= self.grid.rows {
            let evicted = self.grid.scroll_up_one();
            self.evicted_lines.push(evicted);
        } else {
            self.grid.cursor_row += 1;
        }
    }

    fn carriage_return(&mut self) {
        self.grid.cursor_col = 0;
    }
}

impl Perform for VteHandler {
    fn print(&mut self, c: char) {
        let width = UnicodeWidthChar::width(c).unwrap_or(1).max(1) as u16;
        let attrs = self.pending_sgr;
        let row = self.grid.cursor_row;
        let col = self.grid.cursor_col;
        self.grid.set_cell(
            row,
            col,
            Cell {
                ch: c,
                fg: attrs.fg,
                bg: attrs.bg,
                bold: attrs.bold,
                dim: attrs.dim,
                italic: attrs.italic,
                underline: attrs.underline,
                reverse: attrs.reverse,
            },
        );
        self.advance_cursor(width);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => self.line_feed(),
            b'\r' => self.carriage_return(),
            0x08 => self.grid.cursor_col = self.grid.cursor_col.saturating_sub(1), // backspace
            b'\t' => {
                let next_tab = ((self.grid.cursor_col / 8) + 1) * 8;
                self.grid.cursor_col = next_tab.min(self.grid.cols.saturating_sub(1));
            }
            _ => {}
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}
    fn put(&mut self, _byte: u8) {}
    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        // OSC 0/2 set the window/tab title; everything else is ignored.
        if params.len() >= 2 && (params[0] == b"0" || params[0] == b"2") {
            self.grid.title = String::from_utf8_lossy(params[1]).into_owned();
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        if ignore || !intermediates.is_empty() {
            // Private-marker sequences (DEC modes etc.) are parsed but
            // intentionally not applied to the grid.
            return;
        }
        let values: Vec<u16> = params.iter().map(|p| p[0]).collect();
        match action {
            'm' => self.sgr(&values),
            'H' | 'f' => {
                let row = values.first().copied().unwrap_or(1).saturating_sub(1);
                let col = values.get(1).copied().unwrap_or(1).saturating_sub(1);
                self.grid.cursor_row = row.min(self.grid.rows.saturating_sub(1));
                self.grid.cursor_col = col.min(self.grid.cols.saturating_sub(1));
            }
            'A' => self.grid.cursor_row = self.grid.cursor_row.saturating_sub(values.first().copied().unwrap_or(1)),
            'B' => {
                let n = values.first().copied().unwrap_or(1);
                self.grid.cursor_row = (self.grid.cursor_row + n).min(self.grid.rows.saturating_sub(1));
            }
            'C' => {
                let n = values.first().copied().unwrap_or(1);
                self.grid.cursor_col = (self.grid.cursor_col + n).min(self.grid.cols.saturating_sub(1));
            }
            'D' => self.grid.cursor_col = self.grid.cursor_col.saturating_sub(values.first().copied().unwrap_or(1)),
            'J' => self.erase_display(values.first().copied().unwrap_or(0)),
            'K' => self.erase_line(values.first().copied().unwrap_or(0)),
            _ => {} // unsupported — absorbed silently
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}

impl VteHandler {
    fn sgr(&mut self, values: &[u16]) {
        if values.is_empty() {
            self.pending_sgr = CellAttrs::default();
            return;
        }
        let mut i = 0;
        while i < values.len() {
            match values[i] {
                0 => self.pending_sgr = CellAttrs::default(),
                1 => self.pending_sgr.bold = true,
                2 => self.pending_sgr.dim = true,
                3 => self.pending_sgr.italic = true,
                4 => self.pending_sgr.underline = true,
                7 => self.pending_sgr.reverse = true,
                22 => {
                    self.pending_sgr.bold = false;
                    self.pending_sgr.dim = false;
                }
                23 => self.pending_sgr.italic = false,
                24 => self.pending_sgr.underline = false,
                27 => self.pending_sgr.reverse = false,
                30..=37 => self.pending_sgr.fg = Color::Indexed((values[i] - 30) as u8),
                39 => self.pending_sgr.fg = Color::Default,
                40..=47 => self.pending_sgr.bg = Color::Indexed((values[i] - 40) as u8),
                49 => self.pending_sgr.bg = Color::Default,
                90..=97 => self.pending_sgr.fg = Color::Indexed((values[i] - 90 + 8) as u8),
                100..=107 => self.pending_sgr.bg = Color::Indexed((values[i] - 100 + 8) as u8),
                38 | 48 => {
                    let is_fg = values[i] == 38;
                    if let Some(&mode) = values.get(i + 1) {
                        if mode == 5 {
                            if let Some(&idx) = values.get(i + 2) {
                                let color = Color::Indexed(idx as u8);
                                if is_fg { self.pending_sgr.fg = color } else { self.pending_sgr.bg = color }
                            }
                            i += 2;
                        } else if mode == 2 {
                            if let (Some(&r), Some(&g), Some(&b)) =
                                (values.get(i + 2), values.get(i + 3), values.get(i + 4))
                            {
                                let color = Color::Rgb(r as u8, g as u8, b as u8);
                                if is_fg { self.pending_sgr.fg = color } else { self.pending_sgr.bg = color }
                            }
                            i += 4;
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    fn erase_display(&mut self, mode: u16) {
        match mode {
            2 | 3 => self.grid.clear(),
            0 => {
                let (row, col) = (self.grid.cursor_row, self.grid.cursor_col);
                for c in col..self.grid.cols {
                    self.grid.set_cell(row, c, Cell::default());
                }
                for r in (row + 1)..self.grid.rows {
                    for c in 0..self.grid.cols {
                        self.grid.set_cell(r, c, Cell::default());
                    }
                }
            }
            1 => {
                let (row, col) = (self.grid.cursor_row, self.grid.cursor_col);
                for r in 0..row {
                    for c in 0..self.grid.cols {
                        self.grid.set_cell(r, c, Cell::default());
                    }
                }
                for c in 0..=col {
                    self.grid.set_cell(row, c, Cell::default());
                }
            }
            _ => {}
        }
    }

    fn erase_line(&mut self, mode: u16) {
        let row = self.grid.cursor_row;
        let col = self.grid.cursor_col;
        match mode {
            0 => {
                for c in col..self.grid.cols {
                    self.grid.set_cell(row, c, Cell::default());
                }
            }
            1 => {
                for c in 0..=col {
                    self.grid.set_cell(row, c, Cell::default());
                }
            }
            2 => {
                for c in 0..self.grid.cols {
                    self.grid.set_cell(row, c, Cell::default());
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vte::Parser;

    #[test]
    fn prints_plain_text_into_grid() {
        let mut handler = VteHandler::new(10, 2);
        let mut parser = Parser::new();
        for byte in b"hi" {
            parser.advance(&mut handler, &[*byte]);
        }
        assert_eq!(handler.grid.cell(0, 0).unwrap().ch, 'h');
        assert_eq!(handler.grid.cell(0, 1).unwrap().ch, 'i');
    }

    #[test]
    fn malformed_csi_sequence_does_not_panic() {
        let mut handler = VteHandler::new(10, 2);
        let mut parser = Parser::new();
        let bytes = b"\x1b[?999zgarbage";
        for byte in bytes {
            parser.advance(&mut handler, &[*byte]);
        }
        // Survives the sequence and keeps printing regular text afterward.
        assert_eq!(handler.grid.cell(0, 0).unwrap().ch, 'g');
    }

    #[test]
    fn sgr_bold_and_color_apply_to_subsequent_cells() {
        let mut handler = VteHandler::new(10, 2);
        let mut parser = Parser::new();
        let bytes = b"\x1b[1;31mX";
        for byte in bytes {
            parser.advance(&mut handler, &[*byte]);
        }
        let cell = handler.grid.cell(0, 0).unwrap();
        assert!(cell.bold);
        assert_eq!(cell.fg, Color::Indexed(1));
    }
}
