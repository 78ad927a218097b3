//! Option records scraped from select dialogs
//!
//! Dialog pages come in two shapes. Item pages interleave category
//! headers with selectable rows:
//!
//! ```text
//! Weapons
//!  a - a blessed +1 quarterstaff (weapon in hands)
//! Comestibles
//!  b - 2 food rations
//! ```
//!
//! Spell pages are two-column tables, recognized by a header that names
//! the Level/Category/Fail fields:
//!
//! ```text
//!     Name                 Level Category     Fail
//!  a - force bolt              1 attack         0%
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

/// Blessed/uncursed/cursed status parsed from an item description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buc {
    Blessed,
    Uncursed,
    Cursed,
}

/// A selectable inventory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub key: char,
    pub description: String,
    pub category: Option<String>,
}

impl Item {
    /// True for worn armor and accessories.
    pub fn worn(&self) -> bool {
        self.description.contains("(being worn)")
    }

    /// True for the weapon currently in hand(s).
    pub fn wielded(&self) -> bool {
        self.description.contains("(weapon in hand")
    }

    /// Known blessed/uncursed/cursed status, when the description shows it.
    pub fn buc(&self) -> Option<Buc> {
        for word in self.description.split_whitespace() {
            match word {
                "blessed" => return Some(Buc::Blessed),
                "uncursed" => return Some(Buc::Uncursed),
                "cursed" => return Some(Buc::Cursed),
                _ => {}
            }
        }
        None
    }

    /// True when the description carries an erosion marker.
    pub fn eroded(&self) -> bool {
        ["rusty", "corroded", "burnt", "rotted"]
            .iter()
            .any(|m| self.description.contains(m))
    }
}

/// A castable spell entry from the two-column spell list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spell {
    pub key: char,
    pub name: String,
    pub level: u8,
    pub category: String,
    /// Failure chance in percent.
    pub fail: u8,
}

/// One harvested dialog option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Item(Item),
    Spell(Spell),
}

impl MenuItem {
    pub fn key(&self) -> char {
        match self {
            MenuItem::Item(item) => item.key,
            MenuItem::Spell(spell) => spell.key,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            MenuItem::Item(item) => &item.description,
            MenuItem::Spell(spell) => &spell.name,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            MenuItem::Item(item) => item.category.as_deref(),
            MenuItem::Spell(spell) => Some(&spell.category),
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            MenuItem::Item(item) => Some(item),
            MenuItem::Spell(_) => None,
        }
    }

    pub fn as_spell(&self) -> Option<&Spell> {
        match self {
            MenuItem::Spell(spell) => Some(spell),
            MenuItem::Item(_) => None,
        }
    }
}

static SPELL_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Name\s+Level\s+Category\s+Fail").unwrap());

/// Parses the rows of one dialog page into option records.
///
/// Rows with a `" - "` separator select; rows without one become the
/// category for the rows beneath them. A page whose header matches the
/// spell-table columns parses as spells instead.
pub(crate) fn parse_menu_rows(rows: &[String]) -> Vec<MenuItem> {
    if let Some(header) = rows.iter().find(|r| SPELL_HEADER.is_match(r)) {
        return parse_spell_rows(rows, header)
            .into_iter()
            .map(MenuItem::Spell)
            .collect();
    }

    let mut out = Vec::new();
    let mut category: Option<String> = None;
    for row in rows {
        let trimmed = row.trim();
        if trimmed.is_empty() {
            continue;
        }
        match split_option_row(trimmed) {
            Some((key, description)) => out.push(MenuItem::Item(Item {
                key,
                description: description.to_string(),
                category: category.clone(),
            })),
            None => category = Some(trimmed.to_string()),
        }
    }
    out
}

fn split_option_row(row: &str) -> Option<(char, &str)> {
    let (left, right) = row.split_once(" - ")?;
    let mut keys = left.trim().chars();
    let key = keys.next()?;
    if keys.next().is_some() {
        return None;
    }
    Some((key, right.trim_end()))
}

fn parse_spell_rows(rows: &[String], header: &str) -> Vec<Spell> {
    // Column offsets come from the header itself; the grid is plain
    // ASCII, so byte offsets are character offsets.
    let (name_col, level_col, category_col, fail_col) = match (
        header.find("Name"),
        header.find("Level"),
        header.find("Category"),
        header.find("Fail"),
    ) {
        (Some(n), Some(l), Some(c), Some(f)) => (n, l, c, f),
        _ => return Vec::new(),
    };

    let mut out = Vec::new();
    for row in rows {
        if SPELL_HEADER.is_match(row) {
            continue;
        }
        let Some((key, _)) = split_option_row(row.trim_end()) else {
            continue;
        };
        let column = |start: usize, end: usize| -> String {
            row.get(start..end.min(row.len()))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        let name = column(name_col, level_col);
        let level = column(level_col, category_col).parse().unwrap_or(0);
        let category = column(category_col, fail_col);
        let fail = column(fail_col, row.len())
            .trim_end_matches('%')
            .parse()
            .unwrap_or(0);
        if name.is_empty() {
            continue;
        }
        out.push(Spell {
            key,
            name,
            level,
            category,
            fail,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_items_with_categories() {
        let parsed = parse_menu_rows(&rows(&[
            "Weapons",
            " a - a blessed +1 quarterstaff (weapon in hands)",
            "Comestibles",
            " b - 2 food rations",
            " c - an uncursed carrot",
        ]));
        assert_eq!(parsed.len(), 3);
        let a = parsed[0].as_item().unwrap();
        assert_eq!(a.key, 'a');
        assert_eq!(a.category.as_deref(), Some("Weapons"));
        assert!(a.wielded());
        assert!(!a.worn());
        assert_eq!(a.buc(), Some(Buc::Blessed));
        let c = parsed[2].as_item().unwrap();
        assert_eq!(c.key, 'c');
        assert_eq!(c.category.as_deref(), Some("Comestibles"));
        assert_eq!(c.buc(), Some(Buc::Uncursed));
    }

    #[test]
    fn test_rows_without_separator_are_categories_not_options() {
        let parsed = parse_menu_rows(&rows(&["Pick up what?", " a - a rock"]));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].category(), Some("Pick up what?"));
    }

    #[test]
    fn test_parse_spell_page() {
        let parsed = parse_menu_rows(&rows(&[
            "    Name                 Level Category     Fail",
            " a - force bolt              1 attack         0%",
            " b - sleep                   1 enchantment   23%",
        ]));
        assert_eq!(parsed.len(), 2);
        let b = parsed[1].as_spell().unwrap();
        assert_eq!(b.key, 'b');
        assert_eq!(b.name, "sleep");
        assert_eq!(b.level, 1);
        assert_eq!(b.category, "enchantment");
        assert_eq!(b.fail, 23);
    }

    #[test]
    fn test_item_predicates() {
        let item = Item {
            key: 'd',
            description: "a rusty corroded -1 long sword (being worn)".to_string(),
            category: None,
        };
        assert!(item.worn());
        assert!(item.eroded());
        assert_eq!(item.buc(), None);
    }
}
