use crate::*;
pub use random::*;

mod random;

/// Produces fresh boards for a session.
pub trait BoardGenerator {
    fn generate(&mut self) -> Board;
}

/// Chooses the next color the player has to clear.
pub trait TargetSelector {
    /// Returns `None` when `visible` is empty.
    fn pick(&mut self, visible: ColorSet, previous: Option<Color>) -> Option<Color>;
}
