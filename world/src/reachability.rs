//! Reachability analysis over a room array.
//!
//! Mines act as walls here. That is a planning precondition of the
//! generator, not a gameplay rule: players may still walk into a mine room.

use std::collections::VecDeque;

use fantomo_core::{Direction, GridGeometry, RoomFlags};

/// Reusable traversal buffers for repeated reachability queries.
///
/// The generator recomputes reachability after every candidate mutation, so
/// the visited bitmap and frontier queue are kept between calls.
#[derive(Clone, Debug, Default)]
pub struct Reachability {
    visited: Vec<bool>,
    queue: VecDeque<usize>,
}

impl Reachability {
    /// Creates empty traversal buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the rooms reachable from `start` through open, mine-free doors.
    ///
    /// The start room is included. A mine in the start room yields zero.
    ///
    /// # Panics
    ///
    /// Panics when `rooms.len()` differs from `width * width` or `start` lies
    /// outside the grid.
    pub fn count(&mut self, rooms: &[RoomFlags], width: usize, start: usize) -> usize {
        let geometry = checked_geometry(rooms, width);
        assert!(
            start < rooms.len(),
            "start room {start} lies outside a grid of {} rooms",
            rooms.len()
        );

        if rooms[start].has_mine() {
            return 0;
        }

        if self.visited.len() != rooms.len() {
            self.visited = vec![false; rooms.len()];
        } else {
            self.visited.fill(false);
        }
        self.queue.clear();

        self.visited[start] = true;
        self.queue.push_back(start);
        let mut reached = 1;

        while let Some(index) = self.queue.pop_front() {
            for direction in Direction::ALL {
                let Some(neighbor) = open_neighbor(rooms, &geometry, index, direction) else {
                    continue;
                };

                if self.visited[neighbor] || rooms[neighbor].has_mine() {
                    continue;
                }

                self.visited[neighbor] = true;
                reached += 1;
                self.queue.push_back(neighbor);
            }
        }

        reached
    }
}

/// Counts the rooms reachable from `start` through open, mine-free doors.
///
/// # Panics
///
/// Panics when `rooms.len()` differs from `width * width` or `start` lies
/// outside the grid.
#[must_use]
pub fn reachable_count(rooms: &[RoomFlags], width: usize, start: usize) -> usize {
    Reachability::new().count(rooms, width, start)
}

/// Reports whether any mine has a mine on all four sides.
///
/// Missing neighbours at the grid edge count as "not a mine", so edge and
/// corner mines are never surrounded.
///
/// # Panics
///
/// Panics when `rooms.len()` differs from `width * width`.
#[must_use]
pub fn has_surrounded_mine(rooms: &[RoomFlags], width: usize) -> bool {
    surrounded_mine(rooms, width).is_some()
}

/// Lowest-index mine whose four neighbours all hold mines.
///
/// # Panics
///
/// Panics when `rooms.len()` differs from `width * width`.
#[must_use]
pub fn surrounded_mine(rooms: &[RoomFlags], width: usize) -> Option<usize> {
    let geometry = checked_geometry(rooms, width);

    rooms.iter().enumerate().find_map(|(index, room)| {
        if !room.has_mine() {
            return None;
        }

        let mined_neighbors = Direction::ALL
            .into_iter()
            .filter(|direction| {
                geometry
                    .neighbor_index(index, *direction)
                    .is_some_and(|neighbor| rooms[neighbor].has_mine())
            })
            .count();

        (mined_neighbors == Direction::ALL.len()).then_some(index)
    })
}

/// Lowest-index room without a mine.
#[must_use]
pub fn first_walkable(rooms: &[RoomFlags]) -> Option<usize> {
    rooms.iter().position(|room| !room.has_mine())
}

/// Reports whether the door between `index` and its neighbour in `direction`
/// is open from both sides.
///
/// # Panics
///
/// Panics when `rooms.len()` differs from `width * width`.
#[must_use]
pub fn is_passage_open(rooms: &[RoomFlags], width: usize, index: usize, direction: Direction) -> bool {
    let geometry = checked_geometry(rooms, width);
    index < rooms.len() && open_neighbor(rooms, &geometry, index, direction).is_some()
}

/// First door, in index then direction order, open on one side only.
///
/// # Panics
///
/// Panics when `rooms.len()` differs from `width * width`.
#[must_use]
pub fn one_sided_door(rooms: &[RoomFlags], width: usize) -> Option<(usize, Direction)> {
    let geometry = checked_geometry(rooms, width);

    (0..rooms.len()).find_map(|index| {
        geometry
            .neighbors(index)
            .find(|(direction, neighbor)| {
                rooms[index].is_open(*direction) && !rooms[*neighbor].is_open(direction.inverse())
            })
            .map(|(direction, _)| (index, direction))
    })
}

fn open_neighbor(
    rooms: &[RoomFlags],
    geometry: &GridGeometry,
    index: usize,
    direction: Direction,
) -> Option<usize> {
    if !rooms[index].is_open(direction) {
        return None;
    }

    let neighbor = geometry.neighbor_index(index, direction)?;
    rooms[neighbor]
        .is_open(direction.inverse())
        .then_some(neighbor)
}

fn checked_geometry(rooms: &[RoomFlags], width: usize) -> GridGeometry {
    let geometry = GridGeometry::new(width);
    assert_eq!(
        rooms.len(),
        geometry.room_count(),
        "room array does not match a {width}x{width} grid"
    );
    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use fantomo_core::create_identity_grid;

    fn with_mines(width: usize, mines: &[usize]) -> Vec<RoomFlags> {
        let mut rooms = create_identity_grid(width);
        for &index in mines {
            rooms[index].insert(RoomFlags::HAS_MINE);
        }
        rooms
    }

    fn close(rooms: &mut [RoomFlags], width: usize, index: usize, direction: Direction) {
        rooms[index].remove(direction.bit());
        if let Some(neighbor) = GridGeometry::new(width).neighbor_index(index, direction) {
            rooms[neighbor].remove(direction.inverse().bit());
        }
    }

    #[test]
    fn identity_grid_is_reachable_from_every_room() {
        let rooms = create_identity_grid(4);
        for start in 0..rooms.len() {
            assert_eq!(reachable_count(&rooms, 4, start), 16);
        }
    }

    #[test]
    fn single_room_grid_reaches_itself() {
        let rooms = create_identity_grid(1);
        assert_eq!(reachable_count(&rooms, 1, 0), 1);
    }

    #[test]
    fn mines_block_traversal() {
        // Column 1 of a 3x3 grid is mined, cutting column 2 off from column 0.
        let rooms = with_mines(3, &[1, 4, 7]);
        assert_eq!(reachable_count(&rooms, 3, 0), 3);
        assert_eq!(reachable_count(&rooms, 3, 2), 3);
    }

    #[test]
    fn mine_start_reaches_nothing() {
        let rooms = with_mines(3, &[0]);
        assert_eq!(reachable_count(&rooms, 3, 0), 0);
        assert_eq!(reachable_count(&rooms, 3, 1), 8);
    }

    #[test]
    fn a_door_closed_on_either_side_blocks_traversal() {
        let mut rooms = create_identity_grid(2);
        // Only the neighbour side of the 0 -> 1 door is closed.
        rooms[1].remove(RoomFlags::WEST);
        close(&mut rooms, 2, 0, Direction::South);
        assert_eq!(reachable_count(&rooms, 2, 0), 1);
        assert!(!is_passage_open(&rooms, 2, 0, Direction::East));
        assert!(is_passage_open(&rooms, 2, 1, Direction::South));
    }

    #[test]
    fn cycles_are_counted_once() {
        // 2x2 grid forms a single cycle of four rooms.
        let rooms = create_identity_grid(2);
        assert_eq!(reachable_count(&rooms, 2, 3), 4);
    }

    #[test]
    fn scratch_buffers_resize_between_grids() {
        let mut reachability = Reachability::new();
        assert_eq!(reachability.count(&create_identity_grid(3), 3, 0), 9);
        assert_eq!(reachability.count(&create_identity_grid(2), 2, 0), 4);
        assert_eq!(reachability.count(&with_mines(3, &[1, 4, 7]), 3, 0), 3);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn mismatched_width_panics() {
        let rooms = create_identity_grid(3);
        let _ = reachable_count(&rooms, 4, 0);
    }

    #[test]
    fn corner_mine_with_mined_neighbors_is_not_surrounded() {
        let rooms = with_mines(3, &[0, 1, 3]);
        assert!(!has_surrounded_mine(&rooms, 3));
    }

    #[test]
    fn centre_mine_with_four_mined_neighbors_is_surrounded() {
        let rooms = with_mines(3, &[4, 1, 3, 5, 7]);
        assert!(has_surrounded_mine(&rooms, 3));
        assert_eq!(surrounded_mine(&rooms, 3), Some(4));
    }

    #[test]
    fn three_mined_neighbors_are_not_enough() {
        let rooms = with_mines(3, &[4, 1, 3, 5]);
        assert!(!has_surrounded_mine(&rooms, 3));
    }

    #[test]
    fn one_sided_doors_are_reported() {
        let mut rooms = create_identity_grid(2);
        rooms[0].remove(RoomFlags::EAST);
        assert_eq!(one_sided_door(&rooms, 2), Some((1, Direction::West)));

        close(&mut rooms, 2, 0, Direction::East);
        assert_eq!(one_sided_door(&rooms, 2), None);
    }

    #[test]
    fn closed_boundary_bits_are_not_one_sided() {
        let mut rooms = create_identity_grid(2);
        rooms[0].remove(RoomFlags::NORTH);
        rooms[3].remove(RoomFlags::EAST);
        assert_eq!(one_sided_door(&rooms, 2), None);
        assert_eq!(reachable_count(&rooms, 2, 0), 4);
    }

    #[test]
    fn first_walkable_skips_mines() {
        let rooms = with_mines(2, &[0, 1]);
        assert_eq!(first_walkable(&rooms), Some(2));
        assert_eq!(first_walkable(&with_mines(1, &[0])), None);
    }
}
