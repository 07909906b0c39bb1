//! XP and Level system
//!
//! Defines level thresholds, titles, and the xp -> level mapping.

/// Level definition
#[derive(Debug, Clone)]
pub struct Level {
    pub level: u32,
    pub xp_required: u64,
    pub title: &'static str,
}

/// All level definitions (must be sorted by level)
pub static LEVELS: &[Level] = &[
    Level {
        level: 1,
        xp_required: 0,
        title: "New Leaf",
    },
    Level {
        level: 2,
        xp_required: 100,
        title: "Scribbler",
    },
    Level {
        level: 3,
        xp_required: 250,
        title: "Diarist",
    },
    Level {
        level: 4,
        xp_required: 500,
        title: "Storyteller",
    },
    Level {
        level: 5,
        xp_required: 850,
        title: "Wordsmith",
    },
    Level {
        level: 6,
        xp_required: 1300,
        title: "Chronicler",
    },
    Level {
        level: 7,
        xp_required: 2000,
        title: "Memoirist",
    },
    Level {
        level: 8,
        xp_required: 3000,
        title: "Essayist",
    },
    Level {
        level: 9,
        xp_required: 4500,
        title: "Archivist",
    },
    Level {
        level: 10,
        xp_required: 6500,
        title: "Sage",
    },
    Level {
        level: 11,
        xp_required: 9000,
        title: "Luminary",
    },
    Level {
        level: 12,
        xp_required: 12000,
        title: "Laureate",
    },
];

impl Level {
    /// Calculate level and title for given XP
    pub fn for_xp(xp: u64) -> &'static Level {
        LEVELS
            .iter()
            .rev()
            .find(|l| xp >= l.xp_required)
            .unwrap_or(&LEVELS[0])
    }

    /// Get XP needed for next level (None if max level)
    pub fn xp_for_next(current_level: u32) -> Option<u64> {
        LEVELS
            .iter()
            .find(|l| l.level == current_level + 1)
            .map(|l| l.xp_required)
    }

    /// Get max level
    pub fn max_level() -> u32 {
        LEVELS.last().map(|l| l.level).unwrap_or(1)
    }
}

/// Level position derived from a user's total XP
#[derive(Debug, Clone, Default)]
pub struct LevelSnapshot {
    pub xp: u64,
    pub level: u32,
    pub title: String,
    /// XP threshold of the current level
    pub current_level_xp: u64,
    /// XP threshold of the next level (None if max)
    pub next_level_xp: Option<u64>,
}

impl LevelSnapshot {
    /// Derive the snapshot for a total XP value
    pub fn new(xp: u64) -> Self {
        let level_info = Level::for_xp(xp);
        let next_xp = Level::xp_for_next(level_info.level);

        Self {
            xp,
            level: level_info.level,
            title: level_info.title.to_string(),
            current_level_xp: level_info.xp_required,
            next_level_xp: next_xp,
        }
    }

    /// Calculate progress percentage to next level (0.0 - 1.0)
    pub fn progress_to_next(&self) -> f32 {
        match self.next_level_xp {
            Some(next) => {
                let xp_in_level = self.xp - self.current_level_xp;
                let xp_for_level = next - self.current_level_xp;
                if xp_for_level == 0 {
                    1.0
                } else {
                    (xp_in_level as f32) / (xp_for_level as f32)
                }
            }
            None => 1.0, // Max level
        }
    }

    /// Check if at max level
    pub fn is_max_level(&self) -> bool {
        self.next_level_xp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_xp() {
        assert_eq!(Level::for_xp(0).level, 1);
        assert_eq!(Level::for_xp(95).level, 1);
        assert_eq!(Level::for_xp(99).level, 1);
        assert_eq!(Level::for_xp(100).level, 2);
        assert_eq!(Level::for_xp(250).level, 3);
        assert_eq!(Level::for_xp(12000).level, 12);
        assert_eq!(Level::for_xp(1_000_000).level, 12); // Beyond max
    }

    #[test]
    fn test_level_monotonic() {
        let mut last = 0;
        for xp in (0..15000).step_by(7) {
            let level = Level::for_xp(xp).level;
            assert!(level >= last, "level dropped at xp={xp}");
            last = level;
        }
    }

    #[test]
    fn test_level_stable() {
        assert_eq!(Level::for_xp(850).level, Level::for_xp(850).level);
    }

    #[test]
    fn test_snapshot_progress() {
        let snapshot = LevelSnapshot::new(175); // Between level 2 (100) and level 3 (250)
        assert_eq!(snapshot.level, 2);
        assert!((snapshot.progress_to_next() - 0.5).abs() < 0.01); // 75/150 = 0.5
    }

    #[test]
    fn test_snapshot_max_level() {
        let snapshot = LevelSnapshot::new(500_000);
        assert_eq!(snapshot.level, Level::max_level());
        assert!(snapshot.is_max_level());
        assert_eq!(snapshot.progress_to_next(), 1.0);
    }
}
