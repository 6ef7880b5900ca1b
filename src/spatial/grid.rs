//! Bounded grid world: a wall border with randomly scattered obstacles

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::GridError;
use crate::core::types::Position;

/// Smallest side that still leaves an interior ring inside the border
pub const MIN_GRID_SIDE: usize = 3;

/// Contents of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Free,
    /// Density-placed cell; the agent can stand on it
    Obstacle,
    /// Border cell; blocks motion
    Wall,
}

impl Cell {
    /// Glyph for ASCII map dumps
    pub fn glyph(self) -> char {
        match self {
            Cell::Free => '.',
            Cell::Obstacle => 'L',
            Cell::Wall => '#',
        }
    }
}

/// Rectangular grid, row-major, immutable once generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWorld {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl GridWorld {
    /// Generate a grid with a wall border and obstacles at `density`
    ///
    /// Each interior cell is an obstacle independently with probability
    /// `density`, drawn from `rng`.
    pub fn generate<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        density: f64,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        if rows < MIN_GRID_SIDE || cols < MIN_GRID_SIDE {
            return Err(GridError::InvalidDimension {
                rows,
                cols,
                min: MIN_GRID_SIDE,
            });
        }
        if !(0.0..=1.0).contains(&density) {
            return Err(GridError::InvalidDensity(density));
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let on_border = r == 0 || r == rows - 1 || c == 0 || c == cols - 1;
                let cell = if on_border {
                    Cell::Wall
                } else if rng.gen_bool(density) {
                    Cell::Obstacle
                } else {
                    Cell::Free
                };
                cells.push(cell);
            }
        }

        let grid = Self { rows, cols, cells };
        tracing::debug!(
            rows,
            cols,
            density,
            obstacles = grid.obstacle_count(),
            "Generated grid world"
        );
        Ok(grid)
    }

    /// Build a grid from ASCII rows (`#` wall, `L` obstacle, anything else free)
    ///
    /// Used for hand-made scenarios; the border is not forced to be wall.
    pub fn from_ascii(lines: &[&str]) -> Result<Self, GridError> {
        let rows = lines.len();
        let cols = lines.first().map(|l| l.chars().count()).unwrap_or(0);
        if rows < MIN_GRID_SIDE
            || cols < MIN_GRID_SIDE
            || lines.iter().any(|l| l.chars().count() != cols)
        {
            return Err(GridError::InvalidDimension {
                rows,
                cols,
                min: MIN_GRID_SIDE,
            });
        }

        let cells = lines
            .iter()
            .flat_map(|line| line.chars())
            .map(|ch| match ch {
                '#' => Cell::Wall,
                'L' => Cell::Obstacle,
                _ => Cell::Free,
            })
            .collect();

        Ok(Self { rows, cols, cells })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    #[inline]
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        if self.in_bounds(pos) {
            Some(self.cells[pos.row * self.cols + pos.col])
        } else {
            None
        }
    }

    /// Cell at a signed offset from `pos`, `None` when it falls off the grid
    #[inline]
    pub fn cell_at_offset(&self, pos: Position, d_row: isize, d_col: isize) -> Option<Cell> {
        pos.offset(d_row, d_col).and_then(|p| self.cell(p))
    }

    /// True if `pos` is inside the grid and not a wall
    pub fn is_walkable(&self, pos: Position) -> bool {
        matches!(self.cell(pos), Some(Cell::Free | Cell::Obstacle))
    }

    /// True if `pos` lies strictly inside the border ring
    pub fn is_interior(&self, pos: Position) -> bool {
        pos.row > 0 && pos.col > 0 && pos.row + 1 < self.rows && pos.col + 1 < self.cols
    }

    /// Iterate every cell with its position, row-major
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &cell)| (Position::new(i / self.cols, i % self.cols), cell))
    }

    pub fn obstacle_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Obstacle).count()
    }

    /// Render the map as text, optionally marking one position with `marker`
    pub fn render_ascii(&self, marker: Option<(Position, char)>) -> String {
        let mut out = String::with_capacity(self.rows * (self.cols + 1));
        for r in 0..self.rows {
            for c in 0..self.cols {
                let pos = Position::new(r, c);
                match marker {
                    Some((at, glyph)) if at == pos => out.push(glyph),
                    _ => out.push(self.cells[r * self.cols + c].glyph()),
                }
            }
            out.push('\n');
        }
        out
    }
}
