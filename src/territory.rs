//! Region detection and territory scoring.
//!
//! The board is partitioned into wall-bounded regions by flood fill. Only
//! walls separate cells here: stones sit inside regions but never split them.
//! A region belongs to a player when that player is the only one with
//! stones inside it.

use std::collections::BTreeMap;

use crate::board::{Board, Player, Pos};

/// A maximal set of cells mutually reachable without crossing a wall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Member cells in flood-fill order.
    pub cells: Vec<Pos>,
    /// Stones found inside the region, per player.
    pub borders_by_player: BTreeMap<Player, usize>,
}

impl Region {
    #[inline]
    pub fn area(&self) -> usize {
        self.cells.len()
    }

    /// The single player with stones inside, if exactly one has any.
    pub fn owner(&self) -> Option<Player> {
        let mut present = self
            .borders_by_player
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(&p, _)| p);
        let first = present.next()?;
        present.next().is_none().then_some(first)
    }

    /// Stones outside the region sitting on a cell orthogonally adjacent to it.
    pub fn border_stone_count(&self, board: &Board) -> usize {
        let mut member = vec![false; board.cell_count()];
        for &pos in &self.cells {
            member[board.index(pos)] = true;
        }
        let mut counted = vec![false; board.cell_count()];
        let mut count = 0;
        for &pos in &self.cells {
            for (_, n) in board.neighbors(pos) {
                let i = board.index(n);
                if !member[i] && !counted[i] && board.stone(n).is_some() {
                    counted[i] = true;
                    count += 1;
                }
            }
        }
        count
    }
}

/// Region id of every cell, plus the number of regions.
fn label_regions(board: &Board) -> (Vec<usize>, usize) {
    let mut labels = vec![usize::MAX; board.cell_count()];
    let mut next = 0;
    for start in board.positions() {
        if labels[board.index(start)] != usize::MAX {
            continue;
        }
        let mut stack = vec![start];
        labels[board.index(start)] = next;
        while let Some(pos) = stack.pop() {
            for (dir, n) in board.neighbors(pos) {
                let ni = board.index(n);
                if labels[ni] == usize::MAX && !board.has_wall(pos, dir) {
                    labels[ni] = next;
                    stack.push(n);
                }
            }
        }
        next += 1;
    }
    (labels, next)
}

/// Partition the board into regions. Every cell lands in exactly one.
pub fn regions(board: &Board) -> Vec<Region> {
    let (labels, count) = label_regions(board);
    let mut out: Vec<Region> = (0..count)
        .map(|_| Region {
            cells: Vec::new(),
            borders_by_player: BTreeMap::new(),
        })
        .collect();
    for pos in board.positions() {
        let region = &mut out[labels[board.index(pos)]];
        region.cells.push(pos);
        if let Some(p) = board.stone(pos) {
            *region.borders_by_player.entry(p).or_insert(0) += 1;
        }
    }
    out
}

/// Per-cell territory owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryMap {
    size: usize,
    owners: Vec<Option<Player>>,
}

impl TerritoryMap {
    pub fn owner(&self, pos: Pos) -> Option<Player> {
        self.owners[pos.y * self.size + pos.x]
    }

    /// Owners in row-major order.
    pub fn owners(&self) -> &[Option<Player>] {
        &self.owners
    }

    pub fn area(&self, player: Player) -> usize {
        self.owners.iter().filter(|&&o| o == Some(player)).count()
    }

    /// True when no cell is left unclaimed.
    pub fn is_fully_claimed(&self) -> bool {
        self.owners.iter().all(Option::is_some)
    }
}

pub fn territory_map(board: &Board) -> TerritoryMap {
    let mut owners = vec![None; board.cell_count()];
    for region in regions(board) {
        if let Some(owner) = region.owner() {
            for pos in &region.cells {
                owners[board.index(*pos)] = Some(owner);
            }
        }
    }
    TerritoryMap {
        size: board.size(),
        owners,
    }
}

/// Claimed area for each listed player.
pub fn scores(board: &Board, players: &[Player]) -> BTreeMap<Player, usize> {
    let map = territory_map(board);
    players.iter().map(|&p| (p, map.area(p))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction;

    #[test]
    fn test_open_board_is_one_region() {
        let mut board = Board::new(4);
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(3, 3), Player::Blue);
        let regions = regions(&board);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area(), 16);
        assert_eq!(regions[0].owner(), None);
        assert!(territory_map(&board).owners().iter().all(Option::is_none));
    }

    #[test]
    fn test_stoneless_region_is_unowned() {
        let board = Board::new(3);
        assert_eq!(regions(&board)[0].owner(), None);
    }

    #[test]
    fn test_split_board_assigns_owners() {
        let mut board = Board::new(4);
        for y in 0..4 {
            board.set_wall(Pos::new(1, y), Direction::Right, Player::Red);
        }
        board.place_stone(Pos::new(0, 0), Player::Red);
        board.place_stone(Pos::new(3, 3), Player::Blue);
        board.place_stone(Pos::new(2, 0), Player::Blue);

        let map = territory_map(&board);
        assert_eq!(map.owner(Pos::new(1, 3)), Some(Player::Red));
        assert_eq!(map.owner(Pos::new(2, 2)), Some(Player::Blue));
        assert_eq!(map.area(Player::Red), 8);
        assert_eq!(map.area(Player::Blue), 8);
        assert!(map.is_fully_claimed());

        let s = scores(&board, &[Player::Red, Player::Blue]);
        assert_eq!(s[&Player::Red], 8);
        assert_eq!(s[&Player::Blue], 8);
    }

    #[test]
    fn test_border_stones_are_outside_neighbors() {
        let mut board = Board::new(3);
        let center = Pos::new(1, 1);
        for dir in Direction::ALL {
            board.set_wall(center, dir, Player::Red);
        }
        board.place_stone(center, Player::Red);
        board.place_stone(Pos::new(1, 0), Player::Blue);
        board.place_stone(Pos::new(0, 0), Player::Blue);

        let regions = regions(&board);
        let inner = regions.iter().find(|r| r.area() == 1).expect("sealed cell");
        assert_eq!(inner.owner(), Some(Player::Red));
        assert_eq!(inner.border_stone_count(&board), 1);
    }
}
