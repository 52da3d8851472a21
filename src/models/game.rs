use serde::Serialize;

/// Number ranges of one lottery game.
///
/// `max_special == 0` means the game has no special number.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GameConstraint {
    pub game_id: &'static str,
    pub max_regular: i32,
    pub max_special: i32,
}

impl GameConstraint {
    pub const fn new(game_id: &'static str, max_regular: i32, max_special: i32) -> Self {
        Self {
            game_id,
            max_regular,
            max_special,
        }
    }

    /// Upper bound for a cell of the given kind
    pub fn max_for(&self, is_special: bool) -> i32 {
        if is_special {
            self.max_special
        } else {
            self.max_regular
        }
    }

    /// Whether `value` is an acceptable reading for a cell of the given kind
    pub fn accepts(&self, value: i32, is_special: bool) -> bool {
        value >= 1 && value <= self.max_for(is_special)
    }

    /// Whether both observed maxima fit inside this game's ranges
    pub fn contains(&self, max_regular: i32, max_special: i32) -> bool {
        max_regular <= self.max_regular && max_special <= self.max_special
    }

    pub fn has_special(&self) -> bool {
        self.max_special > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ranges() {
        let game = GameConstraint::new("test", 69, 26);

        assert!(game.accepts(1, false));
        assert!(game.accepts(69, false));
        assert!(!game.accepts(70, false));
        assert!(!game.accepts(0, false));
        assert!(game.accepts(26, true));
        assert!(!game.accepts(27, true));
    }

    #[test]
    fn test_no_special_game_rejects_special() {
        let game = GameConstraint::new("six_of_49", 49, 0);
        assert!(!game.has_special());
        assert!(!game.accepts(1, true));
        assert!(game.contains(49, 0));
        assert!(!game.contains(49, 1));
    }
}
