use std::collections::HashSet;
use std::fmt::Display;
use std::time::{SystemTime, UNIX_EPOCH};

use itertools::Itertools;
use thiserror::Error;

use crate::{
    player::{Player, PlayerColor},
    PlayerId,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    PlayerName,
    Color,
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::PlayerName => f.write_str("Player Name"),
            Field::Color => f.write_str("Color"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error(
        "Please fill out the following fields:\n{}\n",
        .0.iter().map(|field| format!("- {field}")).join("\n")
    )]
    MissingFields(Vec<Field>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RosterAction {
    Add {
        name: String,
        color: Option<PlayerColor>,
    },
    Remove(PlayerId),
    MoveUp(usize),
    MoveDown(usize),
}

/// The ordered list of players.
///
/// Every structural change renumbers the whole list so that a player's
/// `turn_order` is always its index plus one.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    players: Vec<Player>,
    last_issued: u64,
}

impl PartialEq for Roster {
    fn eq(&self, other: &Self) -> bool {
        self.players == other.players
    }
}

impl Eq for Roster {}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Applies `action`, returning whether the roster changed.
    ///
    /// A `true` result is the signal to persist the roster.
    pub fn apply(&mut self, action: RosterAction) -> Result<bool, RosterError> {
        match action {
            RosterAction::Add { name, color } => self.add_player(&name, color).map(|_| true),
            RosterAction::Remove(id) => Ok(self.remove_player(id)),
            RosterAction::MoveUp(index) => Ok(self.move_player_up(index)),
            RosterAction::MoveDown(index) => Ok(self.move_player_down(index)),
        }
    }

    pub fn add_player(
        &mut self,
        name: &str,
        color: Option<PlayerColor>,
    ) -> Result<PlayerId, RosterError> {
        let name = name.trim();
        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push(Field::PlayerName);
        }
        let Some(color) = color else {
            missing.push(Field::Color);
            return Err(RosterError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(RosterError::MissingFields(missing));
        }

        let id = self.next_id();
        let mut player = Player::new(id, name, color);
        player.turn_order = self.players.len() as u32 + 1;
        tracing::debug!(%id, name, %color, "Added player");
        self.players.push(player);
        Ok(id)
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return false;
        }
        self.renumber();
        tracing::debug!(%id, "Removed player");
        true
    }

    pub fn move_player_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.players.len() {
            return false;
        }
        self.players.swap(index, index - 1);
        self.renumber();
        true
    }

    pub fn move_player_down(&mut self, index: usize) -> bool {
        if index >= self.players.len().saturating_sub(1) {
            return false;
        }
        self.players.swap(index, index + 1);
        self.renumber();
        true
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.players)
    }

    /// Parses a stored roster, renumbering in case the stored turn orders drifted.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let players = serde_json::from_str(json)?;
        Ok(Self::from_players(players))
    }

    pub fn from_players(players: Vec<Player>) -> Self {
        let last_issued = players.iter().map(|p| p.id.0).max().unwrap_or_default();
        let mut roster = Self {
            players,
            last_issued,
        };
        roster.renumber();
        roster
    }

    fn renumber(&mut self) {
        for (i, player) in self.players.iter_mut().enumerate() {
            player.turn_order = i as u32 + 1;
        }
    }

    fn next_id(&mut self) -> PlayerId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let id = self
            .last_issued
            .checked_add(1)
            .map(|next| now.max(next))
            .filter(|id| !self.players.iter().any(|p| p.id.0 == *id))
            .unwrap_or_else(|| {
                tracing::warn!("Next player id is unavailable, using the lowest free id");
                self.lowest_free_id()
            });
        self.last_issued = id;
        id.into()
    }

    /// Always found since the roster can't hold `u64::MAX` players.
    fn lowest_free_id(&self) -> u64 {
        let used: HashSet<u64> = self.players.iter().map(|p| p.id.0).collect();
        (0..u64::MAX).find(|id| !used.contains(id)).unwrap_or_default()
    }
}
