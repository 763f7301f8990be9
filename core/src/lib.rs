#![no_std]

extern crate alloc;

use core::ops::{Index, IndexMut};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use engine::*;
pub use error::*;
pub use generator::*;
pub use mint::*;
pub use palette::*;
pub use publish::*;
pub use scorecard::*;
pub use share::*;
pub use tile::*;
pub use types::*;

mod engine;
mod error;
mod generator;
mod mint;
mod palette;
mod publish;
mod scorecard;
mod share;
mod tile;
mod types;

/// Board width and height, 16 tiles in total.
pub const BOARD_SIZE: Coord2 = (4, 4);

/// Length of a session in seconds.
pub const SESSION_SECONDS: Seconds = 30;

/// Fixed-size grid of bottles owned by the current session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    tiles: Array2<Tile>,
}

impl Board {
    pub fn from_tiles(tiles: Array2<Tile>) -> Self {
        Self { tiles }
    }

    /// Builds a board of `size` from colors listed row by row.
    pub fn from_colors(size: Coord2, colors: &[Color]) -> Result<Self> {
        if colors.len() != usize::from(mult(size.0, size.1)) {
            return Err(GameError::InvalidBoardShape);
        }
        let tiles = Array2::from_shape_fn(size.to_nd_index(), |(x, y)| {
            Tile::new(colors[y * usize::from(size.0) + x])
        });
        Ok(Self { tiles })
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.tiles.dim();
        (dim.0 as Coord, dim.1 as Coord)
    }

    pub fn total_tiles(&self) -> TileCount {
        self.tiles.len() as TileCount
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let size = self.size();
        if coords.0 < size.0 && coords.1 < size.1 {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Colors of all tiles that are still on the board.
    pub fn visible_colors(&self) -> ColorSet {
        self.tiles
            .iter()
            .filter(|tile| tile.visible)
            .map(|tile| ColorSet::from(tile.color))
            .fold(ColorSet::empty(), |acc, color| acc | color)
    }

    /// Number of visible tiles of `color`.
    pub fn remaining(&self, color: Color) -> TileCount {
        self.tiles
            .iter()
            .filter(|tile| tile.visible && tile.color == color)
            .count() as TileCount
    }

    pub fn visible_count(&self) -> TileCount {
        self.tiles.iter().filter(|tile| tile.visible).count() as TileCount
    }
}

impl Index<Coord2> for Board {
    type Output = Tile;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.tiles[coords.to_nd_index()]
    }
}

impl IndexMut<Coord2> for Board {
    fn index_mut(&mut self, coords: Coord2) -> &mut Self::Output {
        &mut self.tiles[coords.to_nd_index()]
    }
}
