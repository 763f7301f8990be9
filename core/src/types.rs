/// Single coordinate axis used for board width, height, and positions.
pub type Coord = u8;

/// Count type used for tile counts.
pub type TileCount = u8;

/// Two-dimensional coordinates `(x, y)`.
pub type Coord2 = (Coord, Coord);

/// Player score, one point per matching bottle.
pub type Score = u32;

/// Whole seconds left on the countdown.
pub type Seconds = u8;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> TileCount {
    a.saturating_mul(b)
}
