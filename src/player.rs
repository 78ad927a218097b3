//! Player layer: named game actions on top of a session
//!
//! A [`Player`] owns a [`Session`] and turns keystroke-level play into
//! named operations: `go`, `eat`, `wield`, `inventory`, and so on. Each
//! action sends its command key, watches, and answers the prompt the
//! command is known to raise; anything unexpected is handed back as the
//! raw [`Event`] for the caller to deal with.
//!
//! The status readers at the bottom scrape the two status rows the game
//! keeps at the bottom of the screen: row 22 carries the character
//! sheet (`St: Dx: Co: In: Wi: Ch:`, alignment), row 23 the game state
//! (`Dlvl: $: HP: Pw: AC: Exp: T:` plus hunger and affliction flags).

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::CharacterConfig;
use crate::core::interaction::{Choice, CursorPoint, Interaction};
use crate::core::screen::{Cell, HEIGHT, WIDTH};
use crate::core::session::{Event, Session};
use crate::core::transport::Transport;
use crate::error::{Error, Result};
use crate::items::{Item, MenuItem, Spell};
use crate::keys::{self, Compass};

/// Character-sheet row (name, attributes, alignment).
const ATTRIBUTE_ROW: usize = HEIGHT - 2;
/// Game-state row (Dlvl, gold, HP, flags).
const STATUS_ROW: usize = HEIGHT - 1;
/// Rows of maze between the message row and the status rows.
const MAZE_HEIGHT: usize = HEIGHT - 3;

static STRENGTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"St:(\d+)(?:/(\d+|\*\*))?").unwrap());
static DEXTERITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Dx:(\d+)").unwrap());
static CONSTITUTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Co:(\d+)").unwrap());
static INTELLIGENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"In:(\d+)").unwrap());
static WISDOM: Lazy<Regex> = Lazy::new(|| Regex::new(r"Wi:(\d+)").unwrap());
static CHARISMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"Ch:(\d+)").unwrap());
static DUNGEON_LEVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Dlvl:(\d+)").unwrap());
static GOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$:(\d+)").unwrap());
static HIT_POINTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"HP:(\d+)\((\d+)\)").unwrap());
static POWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Pw:(\d+)\((\d+)\)").unwrap());
static ARMOR_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"AC:(-?\d+)").unwrap());
static EXPERIENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:Exp|Xp):(\d+)(?:/(\d+))?").unwrap());
static TURN_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"T:(\d+)").unwrap());

/// Messages that announce a pick-a-position mode.
const POINT_HINTS: [&str; 2] = ["Pick an object.", "(For instructions type a ?)"];

/// Strength as the game shows it: `18/03` reads as base 18,
/// percentile 3; `18/**` as percentile 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength {
    pub base: u8,
    pub percentile: Option<u8>,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentile {
            Some(100) => write!(f, "{}/**", self.base),
            Some(p) => write!(f, "{}/{:02}", self.base, p),
            None => write!(f, "{}", self.base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Lawful,
    Neutral,
    Chaotic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hunger {
    Satiated,
    NotHungry,
    Hungry,
    Weak,
    Fainting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encumbrance {
    Unencumbered,
    Burdened,
    Stressed,
    Strained,
    Overtaxed,
    Overloaded,
}

/// A playing character: a session plus the creation choices.
pub struct Player<T: Transport> {
    session: Session<T>,
    character: CharacterConfig,
}

impl<T: Transport> Player<T> {
    pub fn new(session: Session<T>, character: CharacterConfig) -> Self {
        Player { session, character }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<T> {
        self.session
    }

    /// Starts a new game: declines the auto-pick offer, then walks the
    /// role/race/gender/alignment menus with the configured choices and
    /// answers the name prompt. Returns the first event past creation.
    pub fn play(&mut self) -> Result<Event> {
        info!(
            role = %self.character.role,
            race = %self.character.race,
            "starting a new game"
        );
        let mut event = self.session.watch()?;
        event = match event {
            Event::Prompt(Interaction::YesNoQuit(p)) => p.answer(&mut self.session, Choice::No)?,
            other => other,
        };
        loop {
            event = match event {
                Event::Prompt(Interaction::SelectDialog(dialog)) => {
                    let question = dialog.question().to_string();
                    let key = if question.contains("Role") {
                        creation_key(keys::role_key, &self.character.role, "role")?
                    } else if question.contains("Race") {
                        creation_key(keys::race_key, &self.character.race, "race")?
                    } else if question.contains("Gender") {
                        creation_key(keys::gender_key, &self.character.gender, "gender")?
                    } else if question.contains("Alignment") {
                        creation_key(keys::alignment_key, &self.character.alignment, "alignment")?
                    } else {
                        return Ok(Event::Prompt(Interaction::SelectDialog(dialog)));
                    };
                    debug!(%question, %key, "answering creation menu");
                    dialog.answer(&mut self.session, key)?
                }
                Event::Prompt(Interaction::FreeText(p)) if p.question().contains("Who are you") => {
                    let name = self.character.name.clone();
                    p.answer(&mut self.session, &name)?
                }
                other => return Ok(other),
            };
        }
    }

    // --- actions --------------------------------------------------------

    /// Walks (or climbs, or stands still) one step.
    pub fn go(&mut self, direction: Compass) -> Result<Event> {
        debug!(?direction, "going");
        self.session.send_key(&direction.key().to_string())?;
        self.session.watch()
    }

    /// Opens a door in the given direction.
    pub fn open(&mut self, direction: Compass) -> Result<Event> {
        self.direction_command("o", direction)
    }

    /// Closes a door in the given direction.
    pub fn close(&mut self, direction: Compass) -> Result<Event> {
        self.direction_command("c", direction)
    }

    /// Kicks (doors, chests, monsters) in the given direction.
    pub fn kick(&mut self, direction: Compass) -> Result<Event> {
        self.direction_command("\x04", direction)
    }

    /// Attacks in the given direction, even without a sensed monster.
    pub fn fight(&mut self, direction: Compass) -> Result<Event> {
        self.session.send_key(&format!("F{}", direction.key()))?;
        self.session.watch()
    }

    /// Searches the adjacent squares for hidden stuff.
    pub fn search(&mut self) -> Result<Event> {
        self.session.send_key("s")?;
        self.session.watch()
    }

    /// Waits in place for one turn.
    pub fn rest(&mut self) -> Result<Event> {
        self.session.send_key(".")?;
        self.session.watch()
    }

    /// Sits down on whatever occupies this square.
    pub fn sit(&mut self) -> Result<Event> {
        self.session.send_text_line("#sit")?;
        self.session.watch()
    }

    /// Prays to the gods for help, confirming the are-you-sure check.
    pub fn pray(&mut self) -> Result<Event> {
        self.session.send_text_line("#pray")?;
        match self.session.watch()? {
            Event::Prompt(Interaction::YesNo(p)) if p.question().contains("Are you sure") => {
                p.answer(&mut self.session, true)
            }
            other => Ok(other),
        }
    }

    /// Eats an item from the inventory.
    pub fn eat(&mut self, food: &Item) -> Result<Event> {
        self.select_command("e", food.key)
    }

    /// Quaffs a potion. At a fountain the game asks to drink from it
    /// first; that prompt is returned unanswered.
    pub fn quaff(&mut self, potion: &Item) -> Result<Event> {
        self.select_command("q", potion.key)
    }

    /// Reads a scroll or book.
    pub fn read(&mut self, item: &Item) -> Result<Event> {
        self.select_command("r", item.key)
    }

    /// Wears a piece of armor.
    pub fn wear(&mut self, item: &Item) -> Result<Event> {
        self.select_command("W", item.key)
    }

    /// Takes off a worn piece of armor.
    pub fn take_off(&mut self, item: &Item) -> Result<Event> {
        self.select_command("T", item.key)
    }

    /// Puts on an accessory such as a ring or an amulet.
    pub fn put_on(&mut self, item: &Item) -> Result<Event> {
        self.select_command("P", item.key)
    }

    /// Wields a weapon.
    pub fn wield(&mut self, item: &Item) -> Result<Event> {
        self.select_command("w", item.key)
    }

    /// Swaps primary and secondary weapons.
    pub fn exchange(&mut self) -> Result<Event> {
        self.session.send_key("x")?;
        self.session.watch()
    }

    /// Zaps a wand.
    pub fn zap(&mut self, wand: &Item) -> Result<Event> {
        self.select_command("z", wand.key)
    }

    /// Applies a tool such as a key, a pick-axe or a tinning kit.
    pub fn apply(&mut self, tool: &Item) -> Result<Event> {
        self.select_command("a", tool.key)
    }

    /// Casts a known spell from the spellcasting menu.
    pub fn cast(&mut self, spell: &Spell) -> Result<Event> {
        self.session.send_key("Z")?;
        match self.session.watch()? {
            Event::Prompt(Interaction::SelectDialog(dialog)) => {
                dialog.answer(&mut self.session, spell.key)
            }
            other => Ok(other),
        }
    }

    /// Drops an item, optionally only `amount` of a stack.
    pub fn drop_item(&mut self, item: &Item, amount: Option<u32>) -> Result<Event> {
        let mut cmd = String::from("d");
        if let Some(amount) = amount {
            cmd.push_str(&amount.to_string());
        }
        self.select_command(&cmd, item.key)
    }

    /// Throws an item in the given direction.
    pub fn throw(&mut self, item: &Item, direction: Compass) -> Result<Event> {
        self.session.send_key("t")?;
        let event = match self.session.watch()? {
            Event::Prompt(Interaction::Select(p)) => p.answer(&mut self.session, item.key)?,
            other => other,
        };
        match event {
            Event::Prompt(Interaction::Direction(p)) => p.answer(&mut self.session, direction),
            other => Ok(other),
        }
    }

    /// Fires the readied ammunition in the given direction. With an
    /// empty quiver the game asks what to fire; that prompt is
    /// returned unanswered.
    pub fn fire(&mut self, direction: Compass) -> Result<Event> {
        self.direction_command("f", direction)
    }

    /// Readies ammunition in the quiver for [`Player::fire`].
    pub fn quiver(&mut self, ammo: &Item) -> Result<Event> {
        self.select_command("Q", ammo.key)
    }

    /// Writes a message in the dust on the floor. The `-` slot writes
    /// with your fingers.
    pub fn engrave(&mut self, with: &Item, message: &str) -> Result<Event> {
        self.session.send_key("E")?;
        let event = match self.session.watch()? {
            Event::Prompt(Interaction::Select(p)) => p.answer(&mut self.session, with.key)?,
            other => other,
        };
        match event {
            Event::Prompt(Interaction::FreeText(p)) => p.answer(&mut self.session, message),
            other => Ok(other),
        }
    }

    /// Picks up whatever is on this square. Several objects raise a
    /// multi-select dialog, returned for the caller to answer.
    pub fn pick_up(&mut self) -> Result<Event> {
        self.session.send_key(",")?;
        self.session.watch()
    }

    /// Scrapes the inventory dialog and returns its items. An empty
    /// pack reports "Not carrying anything." and yields no items.
    pub fn inventory(&mut self) -> Result<Vec<Item>> {
        self.session.send_key("i")?;
        match self.session.watch()? {
            Event::Prompt(Interaction::SelectDialog(dialog)) => {
                let items: Vec<Item> = dialog
                    .options()
                    .iter()
                    .filter_map(MenuItem::as_item)
                    .cloned()
                    .collect();
                debug!(items = items.len(), "inventory scraped");
                dialog.answer_default(&mut self.session)?;
                Ok(items)
            }
            Event::Turn(_) => Ok(Vec::new()),
            other => {
                warn!(?other, "inventory raised an unexpected event");
                Ok(Vec::new())
            }
        }
    }

    /// Looks at what is at (x, y) in the maze, walking the game cursor
    /// there.
    pub fn describe(&mut self, x: usize, y: usize) -> Result<Event> {
        self.session.send_key(";")?;
        self.point_at(x, y)
    }

    /// Travels to (x, y) in the maze via the game's own pathfinding.
    pub fn travel(&mut self, x: usize, y: usize) -> Result<Event> {
        self.session.send_key("_")?;
        self.point_at(x, y)
    }

    /// Saves the game and exits.
    pub fn save(&mut self) -> Result<Event> {
        self.session.send_key("S")?;
        match self.session.watch()? {
            Event::Prompt(Interaction::YesNo(p)) => p.answer(&mut self.session, true),
            other => Ok(other),
        }
    }

    /// Abandons the game, confirming the really-quit check.
    pub fn quit(&mut self) -> Result<Event> {
        self.session.send_text_line("#quit")?;
        match self.session.watch()? {
            Event::Prompt(Interaction::YesNo(p)) => p.answer(&mut self.session, true),
            Event::Prompt(Interaction::YesNoQuit(p)) => p.answer(&mut self.session, Choice::Yes),
            other => Ok(other),
        }
    }

    /// Hands the terminal to a human until Ctrl-A, then resumes
    /// watching.
    pub fn interact(&mut self) -> Result<Event> {
        self.session.interact()?;
        self.session.watch()
    }

    fn direction_command(&mut self, cmd: &str, direction: Compass) -> Result<Event> {
        self.session.send_key(cmd)?;
        match self.session.watch()? {
            Event::Prompt(Interaction::Direction(p)) => p.answer(&mut self.session, direction),
            other => Ok(other),
        }
    }

    fn select_command(&mut self, cmd: &str, key: char) -> Result<Event> {
        self.session.send_key(cmd)?;
        match self.session.watch()? {
            Event::Prompt(Interaction::Select(p)) => p.answer(&mut self.session, key),
            other => Ok(other),
        }
    }

    /// After a command that enters pick-a-position mode, walks the game
    /// cursor to (x, y) and confirms. Anything else is returned as-is.
    fn point_at(&mut self, x: usize, y: usize) -> Result<Event> {
        match self.session.watch()? {
            Event::Turn(info) if POINT_HINTS.iter().any(|hint| info.contains(hint)) => {
                let question = info.lines().first().cloned().unwrap_or_default();
                let point = CursorPoint::new(&mut self.session, question)?;
                point.answer(&mut self.session, x, y + 1)
            }
            other => Ok(other),
        }
    }

    // --- status readers -------------------------------------------------
    //
    // All read the current screen; they are meaningful on a free turn,
    // when the status rows are visible and current.

    /// Current strength, including the exceptional 18/xx form.
    pub fn strength(&self) -> Option<Strength> {
        let row = self.attribute_row();
        let caps = STRENGTH.captures(&row)?;
        let base = caps.get(1)?.as_str().parse().ok()?;
        let percentile = match caps.get(2) {
            Some(m) if m.as_str() == "**" => Some(100),
            Some(m) => m.as_str().parse().ok(),
            None => None,
        };
        Some(Strength { base, percentile })
    }

    pub fn dexterity(&self) -> Option<u32> {
        field(&self.attribute_row(), &DEXTERITY, 1)
    }

    pub fn constitution(&self) -> Option<u32> {
        field(&self.attribute_row(), &CONSTITUTION, 1)
    }

    pub fn intelligence(&self) -> Option<u32> {
        field(&self.attribute_row(), &INTELLIGENCE, 1)
    }

    pub fn wisdom(&self) -> Option<u32> {
        field(&self.attribute_row(), &WISDOM, 1)
    }

    pub fn charisma(&self) -> Option<u32> {
        field(&self.attribute_row(), &CHARISMA, 1)
    }

    pub fn alignment(&self) -> Option<Alignment> {
        let row = self.attribute_row();
        for token in row.split_whitespace() {
            match token {
                "Lawful" => return Some(Alignment::Lawful),
                "Neutral" => return Some(Alignment::Neutral),
                "Chaotic" => return Some(Alignment::Chaotic),
                _ => {}
            }
        }
        None
    }

    pub fn dungeon_level(&self) -> Option<u32> {
        field(&self.status_row(), &DUNGEON_LEVEL, 1)
    }

    pub fn gold(&self) -> Option<u32> {
        field(&self.status_row(), &GOLD, 1)
    }

    pub fn hit_points(&self) -> Option<u32> {
        field(&self.status_row(), &HIT_POINTS, 1)
    }

    pub fn max_hit_points(&self) -> Option<u32> {
        field(&self.status_row(), &HIT_POINTS, 2)
    }

    pub fn power(&self) -> Option<u32> {
        field(&self.status_row(), &POWER, 1)
    }

    pub fn max_power(&self) -> Option<u32> {
        field(&self.status_row(), &POWER, 2)
    }

    /// Armor class; lower is better and negative values are common.
    pub fn armor_class(&self) -> Option<i32> {
        field(&self.status_row(), &ARMOR_CLASS, 1)
    }

    pub fn experience_level(&self) -> Option<u32> {
        field(&self.status_row(), &EXPERIENCE, 1)
    }

    /// Experience points, shown only with the showexp option on.
    pub fn experience(&self) -> Option<u64> {
        field(&self.status_row(), &EXPERIENCE, 2)
    }

    /// Turn counter, shown only with the time option on.
    pub fn turn_count(&self) -> Option<u64> {
        field(&self.status_row(), &TURN_COUNT, 1)
    }

    pub fn hunger(&self) -> Hunger {
        let row = self.status_row();
        for token in row.split_whitespace() {
            match token {
                "Satiated" => return Hunger::Satiated,
                "Hungry" => return Hunger::Hungry,
                "Weak" => return Hunger::Weak,
                "Fainting" => return Hunger::Fainting,
                _ => {}
            }
        }
        Hunger::NotHungry
    }

    pub fn encumbrance(&self) -> Encumbrance {
        let row = self.status_row();
        for token in row.split_whitespace() {
            match token {
                "Burdened" => return Encumbrance::Burdened,
                "Stressed" => return Encumbrance::Stressed,
                "Strained" => return Encumbrance::Strained,
                "Overtaxed" => return Encumbrance::Overtaxed,
                "Overloaded" => return Encumbrance::Overloaded,
                _ => {}
            }
        }
        Encumbrance::Unencumbered
    }

    pub fn confused(&self) -> bool {
        self.has_flag("Conf")
    }

    pub fn stunned(&self) -> bool {
        self.has_flag("Stun")
    }

    pub fn food_poisoned(&self) -> bool {
        self.has_flag("FoodPois")
    }

    pub fn ill(&self) -> bool {
        self.has_flag("Ill")
    }

    pub fn blind(&self) -> bool {
        self.has_flag("Blind")
    }

    pub fn hallucinating(&self) -> bool {
        self.has_flag("Hallu")
    }

    pub fn slimed(&self) -> bool {
        self.has_flag("Slime")
    }

    /// The character's maze position, read from the cursor: the game
    /// parks it on the `@` between turns. Maze coordinates, so y = 0 is
    /// the first row below the message row.
    pub fn position(&self) -> (usize, usize) {
        let (x, y) = self.session.screen().cursor();
        (x, y.saturating_sub(1))
    }

    /// The cell at maze position (x, y), attributes intact. None
    /// outside the maze.
    pub fn look(&self, x: usize, y: usize) -> Option<Cell> {
        if x >= WIDTH || y >= MAZE_HEIGHT {
            return None;
        }
        self.session.screen().cell(x, y + 1)
    }

    fn attribute_row(&self) -> String {
        self.session.screen().row(ATTRIBUTE_ROW)
    }

    fn status_row(&self) -> String {
        self.session.screen().row(STATUS_ROW)
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.status_row().split_whitespace().any(|t| t == flag)
    }
}

fn creation_key(lookup: fn(&str) -> Option<char>, name: &str, what: &str) -> Result<char> {
    lookup(name).ok_or_else(|| Error::InvalidAnswer {
        answer: name.to_string(),
        options: format!("known {what} names"),
    })
}

fn field<F: std::str::FromStr>(row: &str, re: &Regex, group: usize) -> Option<F> {
    re.captures(row)?.get(group)?.as_str().parse().ok()
}
