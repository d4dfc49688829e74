//! Round progression: story, menu, levels, podium holds and the end of round

use std::time::{Duration, Instant};

use tracing::info;

use super::ingress::RoundGate;
use super::level::LevelDescriptor;
use super::tuning::Tuning;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Intro slides, zero-based page
    StorySlides { page: usize },
    /// Waiting for the operator to start
    Menu,
    /// A level is running
    Playing,
    /// Podium between levels; play resumes at `until`
    LevelTransition { until: Instant },
    /// Sequence exhausted
    Finished,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::StorySlides { .. } => "story",
            Phase::Menu => "menu",
            Phase::Playing => "playing",
            Phase::LevelTransition { .. } => "level_transition",
            Phase::Finished => "finished",
        }
    }
}

/// What the session must do after a phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Story is over
    Menu,
    /// Install level `index`. `previous` is the duration of the level just
    /// left, `None` when this is the first level.
    Level {
        index: usize,
        previous: Option<Duration>,
    },
    /// Podium hold is over and the level clock started
    Resume,
    /// Last level ended
    Finished { previous: Duration },
}

/// Drives the level sequence.
///
/// Pure state machine: the caller feeds it the clock and applies the
/// returned transitions to players, grid and trivia.
pub struct LevelDirector {
    levels: Vec<LevelDescriptor>,
    /// Index of the next level to install
    next_level: usize,
    current: Option<usize>,
    phase: Phase,
    level_started_at: Option<Instant>,
    story_pages: usize,
    slide_started_at: Instant,
    slide_duration: Duration,
    podium_hold: Duration,
    early_finish: bool,
}

impl LevelDirector {
    pub fn new(levels: Vec<LevelDescriptor>, story_pages: usize, tuning: &Tuning, now: Instant) -> Self {
        let phase = if story_pages > 0 {
            Phase::StorySlides { page: 0 }
        } else {
            Phase::Menu
        };

        Self {
            levels,
            next_level: 0,
            current: None,
            phase,
            level_started_at: None,
            story_pages,
            slide_started_at: now,
            slide_duration: tuning.story_slide,
            podium_hold: tuning.podium_hold,
            early_finish: tuning.early_finish,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_level(&self) -> Option<&LevelDescriptor> {
        self.current.and_then(|idx| self.levels.get(idx))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Time since the current level's clock started
    pub fn level_elapsed(&self, now: Instant) -> Duration {
        self.level_started_at
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start))
    }

    /// Time left on the current level clock
    pub fn level_remaining(&self, now: Instant) -> Duration {
        match (self.phase, self.current_level()) {
            (Phase::Playing, Some(level)) => level.duration.saturating_sub(self.level_elapsed(now)),
            (Phase::LevelTransition { .. }, Some(level)) => level.duration,
            _ => Duration::ZERO,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Which controller commands count in the current phase
    pub fn gate(&self) -> RoundGate {
        RoundGate {
            accepts_players: !self.is_finished(),
            accepts_answers: matches!(self.phase, Phase::Playing | Phase::LevelTransition { .. }),
            accepts_controls: self.is_playing(),
        }
    }

    /// Advance on the clock. `all_out` is true when every player is out of
    /// the current level.
    pub fn poll(&mut self, now: Instant, all_out: bool) -> Option<Transition> {
        match self.phase {
            Phase::StorySlides { page } => {
                if now.saturating_duration_since(self.slide_started_at) < self.slide_duration {
                    return None;
                }
                if page + 1 < self.story_pages {
                    self.phase = Phase::StorySlides { page: page + 1 };
                    self.slide_started_at = now;
                    None
                } else {
                    self.phase = Phase::Menu;
                    Some(Transition::Menu)
                }
            }
            Phase::Menu | Phase::Finished => None,
            Phase::LevelTransition { until } => {
                if now < until {
                    return None;
                }
                self.phase = Phase::Playing;
                self.level_started_at = Some(now);
                Some(Transition::Resume)
            }
            Phase::Playing => {
                let duration = self.current_level().map_or(Duration::ZERO, |l| l.duration);
                let timed_out = self.level_elapsed(now) >= duration;
                if timed_out || (self.early_finish && all_out) {
                    Some(self.advance(now))
                } else {
                    None
                }
            }
        }
    }

    /// Operator override: skip the story, start from the menu, or end the
    /// running level. Starting needs at least one registered player.
    pub fn proceed(&mut self, now: Instant, has_players: bool) -> Option<Transition> {
        match self.phase {
            Phase::StorySlides { .. } => {
                self.phase = Phase::Menu;
                Some(Transition::Menu)
            }
            Phase::Menu if has_players => Some(self.advance(now)),
            Phase::Playing => Some(self.advance(now)),
            Phase::Menu | Phase::LevelTransition { .. } | Phase::Finished => None,
        }
    }

    fn advance(&mut self, now: Instant) -> Transition {
        // Configured length of the level being left
        let previous = self.current_level().map(|l| l.duration);

        if self.next_level >= self.levels.len() {
            self.phase = Phase::Finished;
            self.level_started_at = None;
            info!("Level sequence exhausted, round finished");
            return Transition::Finished {
                previous: previous.unwrap_or(Duration::ZERO),
            };
        }

        let index = self.next_level;
        self.next_level += 1;
        self.current = Some(index);

        // No podium before the first level
        let hold = if previous.is_some() {
            self.podium_hold
        } else {
            Duration::ZERO
        };
        if hold.is_zero() {
            self.phase = Phase::Playing;
            self.level_started_at = Some(now);
        } else {
            self.phase = Phase::LevelTransition { until: now + hold };
            self.level_started_at = None;
        }

        info!(level = %self.levels[index].id, index, hold_ms = hold.as_millis() as u64, "Level installed");
        Transition::Level { index, previous }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::{CellCoord, TileGrid};
    use std::sync::Arc;

    fn level(id: &str, secs: u64) -> LevelDescriptor {
        LevelDescriptor {
            id: id.to_string(),
            duration: Duration::from_secs(secs),
            spawn: CellCoord::new(0, 0),
            grid: Arc::new(TileGrid::empty(2, 2)),
        }
    }

    fn director(story: usize) -> (LevelDirector, Instant) {
        let now = Instant::now();
        let levels = vec![level("1", 10), level("2", 20)];
        (LevelDirector::new(levels, story, &Tuning::default(), now), now)
    }

    #[test]
    fn story_pages_advance_to_menu() {
        let (mut director, t0) = director(2);
        assert_eq!(director.phase(), Phase::StorySlides { page: 0 });

        assert_eq!(director.poll(t0 + Duration::from_secs(1), false), None);
        assert_eq!(director.poll(t0 + Duration::from_secs(2), false), None);
        assert_eq!(director.phase(), Phase::StorySlides { page: 1 });
        assert_eq!(director.poll(t0 + Duration::from_secs(4), false), Some(Transition::Menu));
        assert_eq!(director.phase(), Phase::Menu);
    }

    #[test]
    fn no_story_starts_at_menu() {
        let (director, _) = director(0);
        assert_eq!(director.phase(), Phase::Menu);
        assert!(director.gate().accepts_players);
        assert!(!director.gate().accepts_controls);
    }

    #[test]
    fn menu_needs_a_player_to_start() {
        let (mut director, t0) = director(0);
        assert_eq!(director.proceed(t0, false), None);
        assert_eq!(
            director.proceed(t0, true),
            Some(Transition::Level {
                index: 0,
                previous: None
            })
        );
        assert!(director.is_playing());
        assert_eq!(director.level_remaining(t0), Duration::from_secs(10));
    }

    #[test]
    fn full_sequence_with_podium_holds() {
        let (mut director, t0) = director(0);
        director.proceed(t0, true);

        assert_eq!(director.poll(t0 + Duration::from_secs(9), false), None);
        let t1 = t0 + Duration::from_secs(10);
        assert_eq!(
            director.poll(t1, false),
            Some(Transition::Level {
                index: 1,
                previous: Some(Duration::from_secs(10))
            })
        );
        assert!(matches!(director.phase(), Phase::LevelTransition { .. }));
        let gate = director.gate();
        assert!(gate.accepts_answers && !gate.accepts_controls);

        // The level clock waits for the hold
        assert_eq!(director.poll(t1 + Duration::from_secs(4), false), None);
        let t2 = t1 + Duration::from_secs(5);
        assert_eq!(director.poll(t2, false), Some(Transition::Resume));
        assert_eq!(director.level_remaining(t2), Duration::from_secs(20));

        assert_eq!(
            director.poll(t2 + Duration::from_secs(20), false),
            Some(Transition::Finished {
                previous: Duration::from_secs(20)
            })
        );
        assert!(director.is_finished());
        assert!(!director.gate().accepts_players);
        assert_eq!(director.poll(t2 + Duration::from_secs(60), true), None);
        assert_eq!(director.proceed(t2 + Duration::from_secs(60), true), None);
    }

    #[test]
    fn level_ends_early_when_everyone_is_out() {
        let (mut director, t0) = director(0);
        director.proceed(t0, true);
        let transition = director.poll(t0 + Duration::from_secs(1), true);
        assert_eq!(
            transition,
            Some(Transition::Level {
                index: 1,
                previous: Some(Duration::from_secs(10))
            })
        );
    }

    #[test]
    fn early_finish_can_be_disabled() {
        let tuning = Tuning {
            early_finish: false,
            ..Tuning::default()
        };
        let t0 = Instant::now();
        let mut director = LevelDirector::new(vec![level("1", 10)], 0, &tuning, t0);
        director.proceed(t0, true);
        assert_eq!(director.poll(t0 + Duration::from_secs(1), true), None);
    }

    #[test]
    fn operator_can_cut_a_level_short() {
        let (mut director, t0) = director(1);
        assert_eq!(director.proceed(t0, false), Some(Transition::Menu));
        director.proceed(t0, true);
        assert_eq!(
            director.proceed(t0 + Duration::from_secs(1), true),
            Some(Transition::Level {
                index: 1,
                previous: Some(Duration::from_secs(10))
            })
        );
        // Holding: override does nothing until play resumes
        assert_eq!(director.proceed(t0 + Duration::from_secs(2), true), None);
    }

    #[test]
    fn empty_sequence_finishes_immediately() {
        let t0 = Instant::now();
        let mut director = LevelDirector::new(Vec::new(), 0, &Tuning::default(), t0);
        assert_eq!(
            director.proceed(t0, true),
            Some(Transition::Finished {
                previous: Duration::ZERO
            })
        );
    }
}
