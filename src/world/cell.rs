use serde::{Deserialize, Serialize};

/// State of a single tile of the fire automaton.
///
/// The discriminants double as the digits of the scenario text format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellKind {
    #[default]
    Barren = 0,
    Fire = 1,
    Water = 2,
    Tree = 3,
}

impl CellKind {
    pub const ALL: [CellKind; 4] = [
        CellKind::Barren,
        CellKind::Fire,
        CellKind::Water,
        CellKind::Tree,
    ];

    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '0' => Some(CellKind::Barren),
            '1' => Some(CellKind::Fire),
            '2' => Some(CellKind::Water),
            '3' => Some(CellKind::Tree),
            _ => None,
        }
    }

    pub fn to_digit(self) -> char {
        char::from(b'0' + self as u8)
    }

    pub fn is_fire(self) -> bool {
        self == CellKind::Fire
    }
}
