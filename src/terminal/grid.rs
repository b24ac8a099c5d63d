/// A terminal color: either a basic/256-color index or a 24-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

/// A single cell in the terminal grid: one displayed codepoint plus the SGR
/// attributes in effect when it was written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub reverse: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Default,
            bg: Color::Default,
            bold: false,
            dim: false,
            italic: false,
            underline: false,
            reverse: false,
        }
    }
}

/// The fixed-size cell buffer backing one workstream's pane. Resizing
/// preserves as much of the prior contents and the cursor's relative
/// position as the new dimensions allow, rather than clearing the screen.
#[derive(Debug, Clone)]
pub struct Grid {
    pub cols: u16,
    pub rows: u16,
    cells: Vec<Cell>,
    pub cursor_row: u16,
    pub cursor_col: u16,
    pub cursor_visible: bool,
    pub alternate_screen: bool,
    pub title: String,
}

impl Grid {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols as usize * rows as usize],
            cursor_row: 0,
            cursor_col: 0,
            cursor_visible: true,
            alternate_screen: false,
            title: String::new(),
        }
    }

    fn index(&self, row: u16, col: u16) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(self.index(row, col))
    }

    pub fn set_cell(&mut self, row: u16, col: u16, cell: Cell) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let idx = self.index(row, col);
        self.cells[idx] = cell;
    }

    /// Resizes the grid in place, preserving overlapping content and
    /// clamping the cursor into the new bounds rather than resetting it —
    /// a mid-scrollback resize should not visually jump the cursor to (0,0).
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if cols == self.cols && rows == self.rows {
            return;
        }
        let mut new_cells = vec![Cell::default(); cols as usize * rows as usize];
        let copy_rows = rows.min(self.rows);
        let copy_cols = cols.min(self.cols);
        for r in 0..copy_rows {
            for c in 0..copy_cols {
                if let Some(cell) = self.cell(r, c) {
                    let idx = r as usize * cols as usize + c as usize;
                    new_cells[idx] = *cell;
                }
            }
        }
        self.cells = new_cells;
        self.cols = cols;
        self.rows = rows;
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
        self.cursor_col = self.cursor_col.min(cols.saturating_sub(1));
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
        self.cursor_row = 0;
        self.cursor_col = 0;
    }

    /// Scrolls the whole grid up by one line, as a bare line-feed at the
    /// bottom row does in a real terminal. Returns the evicted top line
    /// rendered to plain text (trailing blanks trimmed), so callers can
    /// append it to a pane's scrollback before it's gone for good.
    pub fn scroll_up_one(&mut self) -> String {
        let cols = self.cols as usize;
        let evicted: String = self.cells[0..cols].iter().map(|c| c.ch).collect();
        self.cells.drain(0..cols);
        self.cells.resize(self.cols as usize * self.rows as usize, Cell::default());
        evicted.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_preserves_overlapping_cells() {
        let mut grid = Grid::new(4, 2);
        grid.set_cell(0, 0, Cell { ch: 'x', ..Cell::default() });
        grid.resize(6, 3);
        assert_eq!(grid.cell(0, 0).unwrap().ch, 'x');
        assert_eq!(grid.cols, 6);
        assert_eq!(grid.rows, 3);
    }

    #[test]
    fn resize_clamps_cursor_into_bounds() {
        let mut grid = Grid::new(10, 10);
        grid.cursor_row = 9;
        grid.cursor_col = 9;
        grid.resize(4, 4);
        assert!(grid.cursor_row < 4);
        assert!(grid.cursor_col < 4);
    }
}
