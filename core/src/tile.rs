use serde::{Deserialize, Serialize};

use crate::Color;

/// One clickable bottle on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub color: Color,
    pub visible: bool,
}

impl Tile {
    pub const fn new(color: Color) -> Self {
        Self {
            color,
            visible: true,
        }
    }
}

