//! Lottery game table and best-guess game inference.
//!
//! Several games share overlapping ranges, so inference cannot be exact:
//! it returns the first game, in priority order, whose ranges contain every
//! observed number. The order is a configurable list.

use tracing::warn;

use crate::models::game::GameConstraint;

/// Id of the fallback game used before anything is inferred
pub const DEFAULT_GAME_ID: &str = "us_mega_millions";

/// Built-in catalog in default priority order: US multi-state games,
/// then US regional, then international.
static GAMES: &[GameConstraint] = &[
    GameConstraint::new("us_powerball", 69, 26),
    GameConstraint::new("us_mega_millions", 70, 25),
    GameConstraint::new("us_lotto_america", 52, 10),
    GameConstraint::new("us_lucky_for_life", 48, 18),
    GameConstraint::new("us_cash4life", 60, 4),
    GameConstraint::new("ca_superlotto_plus", 47, 27),
    GameConstraint::new("tx_two_step", 35, 35),
    GameConstraint::new("fl_cash_pop", 15, 0),
    GameConstraint::new("ny_take5", 39, 0),
    GameConstraint::new("uk_thunderball", 39, 14),
    GameConstraint::new("uk_set_for_life", 47, 10),
    GameConstraint::new("uk_lotto", 59, 0),
    GameConstraint::new("euromillions", 50, 12),
    GameConstraint::new("eurojackpot", 50, 12),
    GameConstraint::new("fr_loto", 49, 10),
    GameConstraint::new("es_el_gordo", 54, 9),
    GameConstraint::new("de_lotto_6aus49", 49, 9),
    GameConstraint::new("au_powerball", 35, 20),
    GameConstraint::new("za_powerball", 50, 20),
    GameConstraint::new("nz_powerball", 40, 10),
    GameConstraint::new("ca_lotto_max", 50, 0),
    GameConstraint::new("it_superenalotto", 90, 0),
];

/// Game catalog with an inference priority order
#[derive(Debug, Clone)]
pub struct GameCatalog {
    priority: Vec<GameConstraint>,
    default_game: GameConstraint,
}

impl Default for GameCatalog {
    fn default() -> Self {
        Self {
            priority: GAMES.to_vec(),
            default_game: Self::builtin(DEFAULT_GAME_ID).unwrap_or(GAMES[0]),
        }
    }
}

impl GameCatalog {
    /// Catalog ordered by the given ids; unknown ids are skipped.
    /// An empty list keeps the built-in order.
    pub fn with_priority<S: AsRef<str>>(ids: &[S]) -> Self {
        if ids.is_empty() {
            return Self::default();
        }

        let priority = ids
            .iter()
            .filter_map(|id| {
                let found = Self::builtin(id.as_ref());
                if found.is_none() {
                    warn!(game_id = id.as_ref(), "unknown game id in priority list, skipping");
                }
                found
            })
            .collect();

        Self {
            priority,
            ..Self::default()
        }
    }

    /// Replace the constraint assumed before inference
    pub fn with_default_game(mut self, game_id: &str) -> Self {
        match Self::builtin(game_id) {
            Some(game) => self.default_game = game,
            None => warn!(game_id, "unknown default game, keeping {}", self.default_game.game_id),
        }
        self
    }

    /// Look up a built-in game by id
    pub fn builtin(game_id: &str) -> Option<GameConstraint> {
        GAMES.iter().find(|g| g.game_id == game_id).copied()
    }

    pub fn get(&self, game_id: &str) -> Option<GameConstraint> {
        Self::builtin(game_id)
    }

    pub fn default_game(&self) -> GameConstraint {
        self.default_game
    }

    /// Games in inference order
    pub fn entries(&self) -> &[GameConstraint] {
        &self.priority
    }

    /// Best-guess game for the observed numbers.
    ///
    /// Non-positive values (sentinels) are ignored. Falls back to the default
    /// game when nothing in the priority list contains the observed maxima.
    pub fn infer_game(&self, numbers: &[i32], specials: &[i32]) -> GameConstraint {
        let max_regular = numbers.iter().copied().filter(|&n| n > 0).max().unwrap_or(0);
        let max_special = specials.iter().copied().filter(|&n| n > 0).max().unwrap_or(0);

        self.priority
            .iter()
            .find(|game| game.contains(max_regular, max_special))
            .copied()
            .unwrap_or(self.default_game)
    }
}
