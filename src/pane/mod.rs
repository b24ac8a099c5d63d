use serde::{Deserialize, Serialize};

mod pane;
mod set;

pub use pane::{Pane, Spinner};
pub use set::PaneSet;

/// One of the five supported pane arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    Grid,
    MainStack,
    MainRow,
    Rows,
    Columns,
}

/// A pane's rectangle in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

const MIN_PANE_W: u16 = 10;
const MIN_PANE_H: u16 = 4;

/// Splits `total` cells into `n` spans as evenly as possible, distributing
/// any remainder one cell at a time to the earliest spans — deterministic
/// for a given `(total, n)` pair, which is what the spatial navigation and
/// layout-determinism properties require.
fn even_split(total: u16, n: u16) -> Vec<u16> {
    if n == 0 {
        return Vec::new();
    }
    let base = total / n;
    let remainder = total % n;
    (0..n)
        .map(|i| base + if i < remainder { 1 } else { 0 })
        .collect()
}

fn grid_dims(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = (n + cols - 1) / cols;
    (cols, rows)
}

/// Computes pane rectangles for `n` panes under `layout` in a `width x
/// height` cell area. Pure and deterministic: the same inputs always
/// produce the same output, and every pane honors the minimum pane size
/// where the area allows it.
pub fn calculate_layout(layout: Layout, n: usize, width: u16, height: u16) -> Vec<Rect> {
    if n == 0 {
        return Vec::new();
    }

    match layout {
        Layout::Grid => {
            let (cols, rows) = grid_dims(n);
            let col_widths = even_split(width, cols as u16);
            let row_heights = even_split(height, rows as u16);
            let mut rects = Vec::with_capacity(n);
            for i in 0..n {
                let col = i % cols;
                let row = i / cols;
                let x: u16 = col_widths[..col].iter().sum();
                let y: u16 = row_heights[..row].iter().sum();
                rects.push(Rect {
                    x,
                    y,
                    w: col_widths[col],
                    h: row_heights[row],
                });
            }
            rects
        }
        Layout::Rows => {
            let heights = even_split(height, n as u16);
            let mut y = 0u16;
            heights
                .into_iter()
                .map(|h| {
                    let rect = Rect { x: 0, y, w: width, h };
                    y += h;
                    rect
                })
                .collect()
        }
        Layout::Columns => {
            let widths = even_split(width, n as u16);
            let mut x = 0u16;
            widths
                .into_iter()
                .map(|w| {
                    let rect = Rect { x, y: 0, w, h: height };
                    x += w;
                    rect
                })
                .collect()
        }
        Layout::MainStack => {
            if n == 1 {
                return vec![Rect { x: 0, y: 0, w: width, h: height }];
            }
            let main_w = ((width as u32 * 2 / 3) as u16).max(MIN_PANE_W).min(width.saturating_sub(MIN_PANE_W).max(1));
            let stack_w = width - main_w;
            let stack_n = (n - 1) as u16;
            let stack_heights = even_split(height, stack_n);
            let mut rects = vec![Rect { x: 0, y: 0, w: main_w, h: height }];
            let mut y = 0u16;
            for h in stack_heights {
                rects.push(Rect { x: main_w, y, w: stack_w, h });
                y += h;
            }
            rects
        }
        Layout::MainRow => {
            if n == 1 {
                return vec![Rect { x: 0, y: 0, w: width, h: height }];
            }
            let main_h = ((height as u32 * 2 / 3) as u16).max(MIN_PANE_H).min(height.saturating_sub(MIN_PANE_H).max(1));
            let row_h = height - main_h;
            let row_n = (n - 1) as u16;
            let row_widths = even_split(width, row_n);
            let mut rects = vec![Rect { x: 0, y: 0, w: width, h: main_h }];
            let mut x = 0u16;
            for w in row_widths {
                rects.push(Rect { x, y: main_h, w, h: row_h });
                x += w;
            }
            rects
        }
    }
}

/// Cardinal directions for spatial pane navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

fn center(r: &Rect) -> (i32, i32) {
    (r.x as i32 + r.w as i32 / 2, r.y as i32 + r.h as i32 / 2)
}

/// Finds the index of the pane spatially nearest `from` in `direction`,
/// among `rects`. Never returns `from` itself. Ties (equal distance) are
/// broken by the smaller index, making the result deterministic and
/// guaranteeing the navigation graph has no self-loops.
pub fn find_neighbor(rects: &[Rect], from: usize, direction: Direction) -> Option<usize> {
    let origin = *rects.get(from)?;
    let (ox, oy) = center(&origin);

    let mut best: Option<(usize, i32)> = None;
    for (i, rect) in rects.iter().enumerate() {
        if i == from {
            continue;
        }
        let (cx, cy) = center(rect);
        let in_direction = match direction {
            Direction::Up => cy < oy,
            Direction::Down => cy > oy,
            Direction::Left => cx < ox,
            Direction::Right => cx > ox,
        };
        if !in_direction {
            continue;
        }
        let primary_axis_dist = match direction {
            Direction::Up | Direction::Down => (cy - oy).abs(),
            Direction::Left | Direction::Right => (cx - ox).abs(),
        };
        let cross_axis_dist = match direction {
            Direction::Up | Direction::Down => (cx - ox).abs(),
            Direction::Left | Direction::Right => (cy - oy).abs(),
        };
        let score = primary_axis_dist * 1000 + cross_axis_dist;
        match best {
            Some((_, best_score)) if best_score <= score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Returns the index of the pane containing `(x, y)`, or `None` if no pane
/// covers that cell (e.g. a click outside the layout area).
pub fn find_pane_at_position(rects: &[Rect], x: u16, y: u16) -> Option<usize> {
    rects
        .iter()
        .position(|r| x >= r.x && x < r.x + r.w && y >= r.y && y < r.y + r.h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_layout_covers_full_area_with_no_overlap() {
        let rects = calculate_layout(Layout::Grid, 4, 100, 40);
        let total_area: u32 = rects.iter().map(|r| r.w as u32 * r.h as u32).sum();
        assert_eq!(total_area, 100 * 40);
    }

    #[test]
    fn layout_is_deterministic_for_same_inputs() {
        let a = calculate_layout(Layout::Grid, 5, 123, 61);
        let b = calculate_layout(Layout::Grid, 5, 123, 61);
        assert_eq!(a, b);
    }

    #[test]
    fn find_neighbor_never_returns_the_origin_pane() {
        let rects = calculate_layout(Layout::Grid, 4, 100, 40);
        for i in 0..rects.len() {
            for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
                if let Some(n) = find_neighbor(&rects, i, dir) {
                    assert_ne!(n, i);
                }
            }
        }
    }

    #[test]
    fn rows_layout_stacks_full_width_rows() {
        let rects = calculate_layout(Layout::Rows, 3, 80, 30);
        assert!(rects.iter().all(|r| r.w == 80));
    }
}
