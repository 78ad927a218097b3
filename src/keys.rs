//! Keystroke tables for the game's command set
//!
//! Single source of truth for the keys the engine sends: compass
//! movement, menu/page navigation, and the character-creation menus.

/// Cancels the current prompt or menu.
pub const CANCEL: char = '\x1b';
/// Acknowledges a `--More--` pagination marker.
pub const CONTINUE: char = ' ';
/// Advances a paginated select dialog.
pub const NEXT_PAGE: char = '>';
/// Rewinds a paginated select dialog.
pub const PREV_PAGE: char = '<';
/// Confirms a cursor position (travel, look).
pub const CONFIRM: char = '.';
/// Redraw request, used around the human hand-off.
pub const REDRAW: char = '\x12';

/// A movement answer: the eight compass points, the two staircase
/// directions, and standing still.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compass {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Up,
    Down,
    Stay,
}

impl Compass {
    pub const ALL: [Compass; 11] = [
        Compass::North,
        Compass::South,
        Compass::East,
        Compass::West,
        Compass::NorthEast,
        Compass::NorthWest,
        Compass::SouthEast,
        Compass::SouthWest,
        Compass::Up,
        Compass::Down,
        Compass::Stay,
    ];

    /// The keystroke the game expects for this direction.
    pub fn key(self) -> char {
        match self {
            Compass::North => 'k',
            Compass::South => 'j',
            Compass::East => 'l',
            Compass::West => 'h',
            Compass::NorthEast => 'u',
            Compass::NorthWest => 'y',
            Compass::SouthEast => 'n',
            Compass::SouthWest => 'b',
            Compass::Up => '<',
            Compass::Down => '>',
            Compass::Stay => '.',
        }
    }

    pub fn from_key(key: char) -> Option<Compass> {
        Compass::ALL.iter().copied().find(|d| d.key() == key)
    }
}

const ROLES: &[(&str, char)] = &[
    ("Archeologist", 'a'),
    ("Barbarian", 'b'),
    ("Caveman", 'c'),
    ("Healer", 'h'),
    ("Knight", 'k'),
    ("Monk", 'm'),
    ("Priest", 'p'),
    ("Rogue", 'r'),
    ("Ranger", 'R'),
    ("Samurai", 's'),
    ("Tourist", 't'),
    ("Valkyrie", 'v'),
    ("Wizard", 'w'),
];

const RACES: &[(&str, char)] = &[
    ("human", 'h'),
    ("elf", 'e'),
    ("dwarf", 'd'),
    ("gnome", 'g'),
    ("orc", 'o'),
];

const GENDERS: &[(&str, char)] = &[("male", 'm'), ("female", 'f')];

const ALIGNMENTS: &[(&str, char)] = &[("lawful", 'l'), ("neutral", 'n'), ("chaotic", 'c')];

fn lookup(table: &[(&str, char)], name: &str) -> Option<char> {
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, k)| k)
}

/// Menu key for a character role ("Valkyrie" -> 'v').
pub fn role_key(name: &str) -> Option<char> {
    lookup(ROLES, name)
}

/// Menu key for a character race ("dwarf" -> 'd').
pub fn race_key(name: &str) -> Option<char> {
    lookup(RACES, name)
}

/// Menu key for a gender ("female" -> 'f').
pub fn gender_key(name: &str) -> Option<char> {
    lookup(GENDERS, name)
}

/// Menu key for an alignment ("lawful" -> 'l').
pub fn alignment_key(name: &str) -> Option<char> {
    lookup(ALIGNMENTS, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compass_keys_round_trip() {
        for dir in Compass::ALL {
            assert_eq!(Compass::from_key(dir.key()), Some(dir));
        }
    }

    #[test]
    fn test_compass_key_values() {
        assert_eq!(Compass::North.key(), 'k');
        assert_eq!(Compass::SouthWest.key(), 'b');
        assert_eq!(Compass::Down.key(), '>');
        assert_eq!(Compass::Stay.key(), '.');
    }

    #[test]
    fn test_creation_tables() {
        assert_eq!(role_key("Valkyrie"), Some('v'));
        assert_eq!(role_key("valkyrie"), Some('v'));
        // Ranger needs the upper-case key to disambiguate from Rogue.
        assert_eq!(role_key("Ranger"), Some('R'));
        assert_eq!(race_key("dwarf"), Some('d'));
        assert_eq!(gender_key("female"), Some('f'));
        assert_eq!(alignment_key("chaotic"), Some('c'));
        assert_eq!(role_key("Jester"), None);
    }
}
