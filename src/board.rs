//! Board representation: stones, walls, and grid geometry.
//!
//! Each cell stores its own stone plus the walls on its top and left edges.
//! The bottom and right edges of a cell are the top and left edges of the
//! neighbor below and to the right, so every interior edge has exactly one
//! storage location. Walls are append-only: once set they are never cleared.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PLAYERS, N};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Red,
    Blue,
    Green,
    Yellow,
}

impl Player {
    /// Every player the data model supports, in seating order.
    pub const ALL: [Player; MAX_PLAYERS] =
        [Player::Red, Player::Blue, Player::Green, Player::Yellow];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-letter symbol used when rendering the board.
    pub fn symbol(self) -> char {
        match self {
            Player::Red => 'R',
            Player::Blue => 'B',
            Player::Green => 'G',
            Player::Yellow => 'Y',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Player::Red => "red",
            Player::Blue => "blue",
            Player::Green => "green",
            Player::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

/// A cell coordinate, `x` is the column and `y` the row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn manhattan(self, other: Pos) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four edges of a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Right => Direction::Left,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub stone: Option<Player>,
    pub wall_top: Option<Player>,
    pub wall_left: Option<Player>,
}

/// The square grid of cells, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(N)
    }
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size * size],
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Row-major index of a position. The position must be on the board.
    #[inline]
    pub fn index(&self, pos: Pos) -> usize {
        debug_assert!(self.contains(pos));
        pos.y * self.size + pos.x
    }

    #[inline]
    pub fn pos_at(&self, index: usize) -> Pos {
        Pos::new(index % self.size, index / self.size)
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    pub fn cell(&self, pos: Pos) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn stone(&self, pos: Pos) -> Option<Player> {
        if !self.contains(pos) {
            return None;
        }
        self.cell(pos).stone
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.cells.len()).map(|i| self.pos_at(i))
    }

    /// Every stone on the board with its owner, in row-major order.
    pub fn stones(&self) -> impl Iterator<Item = (Pos, Player)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.stone.map(|p| (self.pos_at(i), p)))
    }

    /// Positions of one player's stones, in row-major order.
    pub fn stones_of(&self, player: Player) -> impl Iterator<Item = Pos> + '_ {
        self.stones()
            .filter(move |&(_, p)| p == player)
            .map(|(pos, _)| pos)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.positions().filter(|&p| self.cell(p).stone.is_none())
    }

    /// Put a stone on an empty cell. Returns `false` if the cell is off the
    /// board or occupied.
    pub fn place_stone(&mut self, pos: Pos, player: Player) -> bool {
        if !self.contains(pos) || self.cell(pos).stone.is_some() {
            return false;
        }
        let i = self.index(pos);
        self.cells[i].stone = Some(player);
        true
    }

    /// Relocate a stone. Returns `false` if `from` is empty or `to` is taken.
    pub fn move_stone(&mut self, from: Pos, to: Pos) -> bool {
        let Some(player) = self.stone(from) else {
            return false;
        };
        if !self.contains(to) || self.cell(to).stone.is_some() {
            return false;
        }
        let (fi, ti) = (self.index(from), self.index(to));
        self.cells[fi].stone = None;
        self.cells[ti].stone = Some(player);
        true
    }

    /// The in-bounds neighbor across one edge of a cell.
    pub fn neighbor(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        let next = match dir {
            Direction::Top => Pos::new(pos.x, pos.y.checked_sub(1)?),
            Direction::Right => Pos::new(pos.x + 1, pos.y),
            Direction::Bottom => Pos::new(pos.x, pos.y + 1),
            Direction::Left => Pos::new(pos.x.checked_sub(1)?, pos.y),
        };
        self.contains(next).then_some(next)
    }

    /// The up-to-four orthogonal neighbors of a cell with the edge leading to each.
    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = (Direction, Pos)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.neighbor(pos, d).map(|n| (d, n)))
    }

    /// The cell and direction where an edge is stored, or `None` for the
    /// outer boundary.
    fn canonical_edge(&self, pos: Pos, dir: Direction) -> Option<(usize, Direction)> {
        let neighbor = self.neighbor(pos, dir)?;
        Some(match dir {
            Direction::Top | Direction::Left => (self.index(pos), dir),
            Direction::Right | Direction::Bottom => (self.index(neighbor), dir.opposite()),
        })
    }

    /// Owner of the wall on an edge, `None` if unwalled or on the boundary.
    pub fn wall_owner(&self, pos: Pos, dir: Direction) -> Option<Player> {
        let (i, edge) = self.canonical_edge(pos, dir)?;
        match edge {
            Direction::Top => self.cells[i].wall_top,
            _ => self.cells[i].wall_left,
        }
    }

    /// Whether an edge blocks movement. The outer boundary always blocks.
    pub fn has_wall(&self, pos: Pos, dir: Direction) -> bool {
        self.canonical_edge(pos, dir).is_none() || self.wall_owner(pos, dir).is_some()
    }

    /// Whether a wall separates two cells. Cells that are not orthogonally
    /// adjacent have no shared edge and are reported as separated.
    pub fn wall_between(&self, a: Pos, b: Pos) -> bool {
        match Direction::ALL
            .into_iter()
            .find(|&d| self.neighbor(a, d) == Some(b))
        {
            Some(dir) => self.has_wall(a, dir),
            None => true,
        }
    }

    /// An edge accepts a wall if it is interior and not yet walled.
    pub fn can_build_wall(&self, pos: Pos, dir: Direction) -> bool {
        self.contains(pos)
            && self.canonical_edge(pos, dir).is_some()
            && self.wall_owner(pos, dir).is_none()
    }

    /// Wall off one edge of a cell. Returns `false` without touching the
    /// board if the edge is on the boundary or already walled.
    pub fn set_wall(&mut self, pos: Pos, dir: Direction, owner: Player) -> bool {
        if !self.can_build_wall(pos, dir) {
            return false;
        }
        let Some((i, edge)) = self.canonical_edge(pos, dir) else {
            return false;
        };
        match edge {
            Direction::Top => self.cells[i].wall_top = Some(owner),
            _ => self.cells[i].wall_left = Some(owner),
        }
        true
    }

    /// Directions in which a wall can still be built on a cell.
    pub fn open_edges(&self, pos: Pos) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(move |&d| self.can_build_wall(pos, d))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.size {
            for x in 0..self.size {
                let top = if self.has_wall(Pos::new(x, y), Direction::Top) {
                    "---"
                } else {
                    "   "
                };
                write!(f, "+{top}")?;
            }
            writeln!(f, "+")?;
            for x in 0..self.size {
                let pos = Pos::new(x, y);
                let left = if self.has_wall(pos, Direction::Left) { '|' } else { ' ' };
                let ch = self.stone(pos).map_or('.', Player::symbol);
                write!(f, "{left} {ch} ")?;
            }
            writeln!(f, "|")?;
        }
        for _ in 0..self.size {
            write!(f, "+---")?;
        }
        writeln!(f, "+")
    }
}
