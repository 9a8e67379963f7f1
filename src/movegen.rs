//! Move legality: step-limited reachability under wall obstruction.
//!
//! A stone moves orthogonally, one cell per step, and may not cross a wall
//! or enter an occupied cell. All legality questions reduce to a breadth-first
//! search over the board with those two edge rules.

use std::collections::{BTreeSet, VecDeque};

use crate::board::{Board, Player, Pos};

/// Whether a single step from `from` into the adjacent `to` is open.
#[inline]
pub fn can_step(board: &Board, from: Pos, to: Pos) -> bool {
    board.stone(to).is_none() && !board.wall_between(from, to)
}

/// Multi-source BFS distances, `None` for cells that cannot be reached.
///
/// Sources sit at distance 0 even when occupied. Expansion stops at
/// `limit` steps when one is given.
pub fn distance_field<I>(board: &Board, sources: I, limit: Option<u32>) -> Vec<Option<u32>>
where
    I: IntoIterator<Item = Pos>,
{
    let mut dist = vec![None; board.cell_count()];
    let mut queue = VecDeque::new();
    for src in sources {
        let i = board.index(src);
        if dist[i].is_none() {
            dist[i] = Some(0);
            queue.push_back(src);
        }
    }

    while let Some(pos) = queue.pop_front() {
        let d = dist[board.index(pos)].unwrap_or(0);
        if limit.is_some_and(|l| d >= l) {
            continue;
        }
        for (_, next) in board.neighbors(pos) {
            let ni = board.index(next);
            if dist[ni].is_none() && can_step(board, pos, next) {
                dist[ni] = Some(d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

/// All destinations a stone at `origin` can reach in at most `max_steps`
/// steps. The origin itself is never included.
pub fn moves_from(board: &Board, origin: Pos, max_steps: u8) -> BTreeSet<Pos> {
    if max_steps == 0 || !board.contains(origin) {
        return BTreeSet::new();
    }
    distance_field(board, [origin], Some(u32::from(max_steps)))
        .into_iter()
        .enumerate()
        .filter_map(|(i, d)| match d {
            Some(d) if d > 0 => Some(board.pos_at(i)),
            _ => None,
        })
        .collect()
}

pub fn is_legal(board: &Board, origin: Pos, destination: Pos, max_steps: u8) -> bool {
    moves_from(board, origin, max_steps).contains(&destination)
}

/// Union of the destinations of every stone a player owns.
pub fn reachable_cells(board: &Board, player: Player, max_steps: u8) -> BTreeSet<Pos> {
    board
        .stones_of(player)
        .flat_map(|s| moves_from(board, s, max_steps))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Direction;

    #[test]
    fn test_open_board_two_steps() {
        let mut board = Board::new(7);
        let origin = Pos::new(3, 3);
        board.place_stone(origin, Player::Red);
        let moves = moves_from(&board, origin, 2);
        assert_eq!(moves.len(), 12);
        assert!(!moves.contains(&origin));
        assert!(moves.iter().all(|p| p.manhattan(origin) <= 2));
        assert!(moves.contains(&Pos::new(4, 4)));
    }

    #[test]
    fn test_corner_one_step() {
        let mut board = Board::new(7);
        board.place_stone(Pos::new(0, 0), Player::Red);
        let moves = moves_from(&board, Pos::new(0, 0), 1);
        let expected: BTreeSet<Pos> = [Pos::new(1, 0), Pos::new(0, 1)].into_iter().collect();
        assert_eq!(moves, expected);
    }

    #[test]
    fn test_walls_and_stones_block() {
        let mut board = Board::new(7);
        let origin = Pos::new(3, 3);
        board.place_stone(origin, Player::Red);
        board.place_stone(Pos::new(4, 3), Player::Blue);
        board.set_wall(origin, Direction::Top, Player::Blue);

        let moves = moves_from(&board, origin, 2);
        assert!(!moves.contains(&Pos::new(3, 2)));
        assert!(!moves.contains(&Pos::new(4, 3)));
        assert!(!moves.contains(&Pos::new(5, 3)));
        // (3,1) is only reachable through the walled edge.
        assert!(!moves.contains(&Pos::new(3, 1)));
        // Both two-step paths to (4,2) are cut.
        assert!(!moves.contains(&Pos::new(4, 2)));
        assert!(moves.contains(&Pos::new(2, 2)));
    }

    #[test]
    fn test_zero_budget_has_no_moves() {
        let mut board = Board::new(3);
        board.place_stone(Pos::new(1, 1), Player::Red);
        assert!(moves_from(&board, Pos::new(1, 1), 0).is_empty());
    }

    #[test]
    fn test_is_legal_agrees_with_moves_from() {
        let mut board = Board::new(5);
        board.place_stone(Pos::new(2, 2), Player::Red);
        board.set_wall(Pos::new(2, 2), Direction::Left, Player::Red);
        let moves = moves_from(&board, Pos::new(2, 2), 2);
        for pos in board.positions() {
            assert_eq!(is_legal(&board, Pos::new(2, 2), pos, 2), moves.contains(&pos));
        }
    }
}
