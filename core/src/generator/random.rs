use rand::prelude::*;
use rand::rngs::SmallRng;

use super::*;

/// Upper bound on re-draws when trying to move away from the previous target.
pub const MAX_TARGET_DRAWS: u8 = 32;

/// Uniform generator: every tile gets an independent palette color and targets are drawn uniformly from the visible
/// colors.
#[derive(Clone, Debug)]
pub struct RandomGenerator {
    size: Coord2,
    rng: SmallRng,
}

impl RandomGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_size(seed, BOARD_SIZE)
    }

    pub fn with_size(seed: u64, size: Coord2) -> Self {
        Self {
            size,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn random_color(&mut self) -> Color {
        Color::ALL[self.rng.random_range(0..Color::ALL.len())]
    }
}

impl BoardGenerator for RandomGenerator {
    fn generate(&mut self) -> Board {
        let tiles = Array2::from_shape_simple_fn(self.size.to_nd_index(), || {
            Tile::new(self.random_color())
        });
        Board::from_tiles(tiles)
    }
}

impl TargetSelector for RandomGenerator {
    fn pick(&mut self, visible: ColorSet, previous: Option<Color>) -> Option<Color> {
        let count = visible.len();
        if count == 0 {
            return None;
        }

        let mut choice = visible.nth(self.rng.random_range(0..count))?;
        if count > 1 {
            // retries are capped, a repeat is accepted once the budget runs out
            let mut draws = 1;
            while Some(choice) == previous && draws < MAX_TARGET_DRAWS {
                choice = visible.nth(self.rng.random_range(0..count))?;
                draws += 1;
            }
            if Some(choice) == previous {
                log::warn!("Target draw budget exhausted, repeating {:?}", choice);
            }
        }
        Some(choice)
    }
}
