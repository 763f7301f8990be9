use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Bottle colors, in palette order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Pink,
}

impl Color {
    pub const ALL: [Color; 7] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Purple,
        Color::Orange,
        Color::Pink,
    ];

    /// CSS color keyword, also used as the lower-case display name.
    pub const fn name(self) -> &'static str {
        use Color::*;
        match self {
            Red => "red",
            Blue => "blue",
            Green => "green",
            Yellow => "yellow",
            Purple => "purple",
            Orange => "orange",
            Pink => "pink",
        }
    }

    pub const fn shout(self) -> &'static str {
        use Color::*;
        match self {
            Red => "RED",
            Blue => "BLUE",
            Green => "GREEN",
            Yellow => "YELLOW",
            Purple => "PURPLE",
            Orange => "ORANGE",
            Pink => "PINK",
        }
    }
}

bitflags! {
    /// Set of palette colors, iterated in palette order.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ColorSet: u8 {
        const RED    = 1;
        const BLUE   = 1 << 1;
        const GREEN  = 1 << 2;
        const YELLOW = 1 << 3;
        const PURPLE = 1 << 4;
        const ORANGE = 1 << 5;
        const PINK   = 1 << 6;
    }
}

impl ColorSet {
    pub fn contains_color(self, color: Color) -> bool {
        self.contains(ColorSet::from(color))
    }

    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }

    pub fn colors(self) -> impl Iterator<Item = Color> {
        Color::ALL
            .into_iter()
            .filter(move |&color| self.contains_color(color))
    }

    /// The `n`-th member in palette order.
    pub fn nth(self, n: usize) -> Option<Color> {
        self.colors().nth(n)
    }
}

impl From<Color> for ColorSet {
    fn from(color: Color) -> Self {
        ColorSet::from_bits_truncate(1 << (color as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_set_iterates_in_palette_order() {
        let set = ColorSet::PINK | ColorSet::RED | ColorSet::GREEN;
        let mut colors = set.colors();

        assert_eq!(set.len(), 3);
        assert_eq!(colors.next(), Some(Color::Red));
        assert_eq!(colors.next(), Some(Color::Green));
        assert_eq!(colors.next(), Some(Color::Pink));
        assert_eq!(colors.next(), None);
    }

    #[test]
    fn every_color_maps_to_its_own_flag() {
        let all = Color::ALL
            .into_iter()
            .fold(ColorSet::empty(), |acc, color| acc | ColorSet::from(color));

        assert_eq!(all, ColorSet::all());
        assert_eq!(ColorSet::from(Color::Orange), ColorSet::ORANGE);
    }
}
