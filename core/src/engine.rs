use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Playing,
    Ended,
}

impl SessionState {
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }

    pub const fn is_ended(self) -> bool {
        matches!(self, Self::Ended)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    /// The tile was already gone.
    NoChange,
    /// Wrong color, nothing happens.
    Missed,
    Scored,
    /// The last target tile was hit and a new board with a new target is up.
    BoardCleared,
}

impl TapOutcome {
    pub const fn has_update(self) -> bool {
        use TapOutcome::*;
        match self {
            NoChange | Missed => false,
            Scored | BoardCleared => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    NoChange,
    Ticked,
    /// Countdown reached zero on this tick, the session is over.
    Expired,
}

/// A single play session: score, countdown, board and the current target.
///
/// The session is restartable, `start` always wipes the previous run.
#[derive(Clone, Debug)]
pub struct PlaySession<G> {
    generator: G,
    board: Option<Board>,
    target: Option<Color>,
    score: Score,
    time_left: Seconds,
    duration: Seconds,
    state: SessionState,
}

impl<G: BoardGenerator + TargetSelector> PlaySession<G> {
    pub fn new(generator: G) -> Self {
        Self::with_duration(generator, SESSION_SECONDS)
    }

    pub fn with_duration(generator: G, duration: Seconds) -> Self {
        Self {
            generator,
            board: None,
            target: None,
            score: 0,
            time_left: duration,
            duration,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn time_left(&self) -> Seconds {
        self.time_left
    }

    pub fn target(&self) -> Option<Color> {
        self.target
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn size(&self) -> Coord2 {
        self.board.as_ref().map_or(BOARD_SIZE, Board::size)
    }

    pub fn tile_at(&self, coords: Coord2) -> Option<Tile> {
        let board = self.board.as_ref()?;
        board.validate_coords(coords).ok().map(|coords| board[coords])
    }

    /// Visible tiles of the current target color.
    pub fn remaining_targets(&self) -> TileCount {
        match (&self.board, self.target) {
            (Some(board), Some(target)) => board.remaining(target),
            _ => 0,
        }
    }

    pub fn start(&mut self) {
        self.score = 0;
        self.time_left = self.duration;
        self.board = None;
        // the last target of the previous game is kept so the first pick moves away from it
        self.next_round();
        self.state = SessionState::Playing;
        log::debug!(
            "session started, target {:?}, {}s on the clock",
            self.target,
            self.time_left
        );
    }

    pub fn tap(&mut self, coords: Coord2) -> Result<TapOutcome> {
        self.check_playing()?;
        let target = self.target;
        let Some(board) = self.board.as_mut() else {
            return Err(GameError::NotPlaying);
        };
        let coords = board.validate_coords(coords)?;

        let tile = &mut board[coords];
        if !tile.visible {
            return Ok(TapOutcome::NoChange);
        }

        let outcome = if Some(tile.color) == target {
            tile.visible = false;
            self.score = self.score.saturating_add(1);
            TapOutcome::Scored
        } else {
            TapOutcome::Missed
        };

        if self.remaining_targets() == 0 {
            log::debug!("round cleared at score {}", self.score);
            self.next_round();
            return Ok(TapOutcome::BoardCleared);
        }

        Ok(outcome)
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_playing() {
            return TickOutcome::NoChange;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.state = SessionState::Ended;
            log::debug!("session ended with score {}", self.score);
            TickOutcome::Expired
        } else {
            TickOutcome::Ticked
        }
    }

    fn next_round(&mut self) {
        let board = self.generator.generate();
        let previous = self.target;
        self.target = self.generator.pick(board.visible_colors(), previous);
        self.board = Some(board);
    }

    fn check_playing(&self) -> Result<()> {
        if self.state.is_playing() {
            Ok(())
        } else {
            Err(GameError::NotPlaying)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;
    use Color::*;

    /// Hands out prepared boards and targets in order, then falls back to random ones.
    struct Scripted {
        boards: VecDeque<Board>,
        targets: VecDeque<Color>,
        fallback: RandomGenerator,
        picks: Vec<(ColorSet, Option<Color>)>,
    }

    impl Scripted {
        fn new(boards: &[&[Color]], targets: &[Color]) -> Self {
            Self {
                boards: boards
                    .iter()
                    .map(|colors| Board::from_colors((colors.len() as Coord, 1), colors).unwrap())
                    .collect(),
                targets: targets.iter().copied().collect(),
                fallback: RandomGenerator::new(0),
                picks: Vec::new(),
            }
        }
    }

    impl BoardGenerator for Scripted {
        fn generate(&mut self) -> Board {
            self.boards
                .pop_front()
                .unwrap_or_else(|| self.fallback.generate())
        }
    }

    impl TargetSelector for Scripted {
        fn pick(&mut self, visible: ColorSet, previous: Option<Color>) -> Option<Color> {
            self.picks.push((visible, previous));
            match self.targets.pop_front() {
                Some(target) => Some(target),
                None => self.fallback.pick(visible, previous),
            }
        }
    }

    fn started(boards: &[&[Color]], targets: &[Color]) -> PlaySession<Scripted> {
        let mut session = PlaySession::new(Scripted::new(boards, targets));
        session.start();
        session
    }

    #[test]
    fn new_session_is_idle_and_ignores_input() {
        let mut session = PlaySession::new(RandomGenerator::new(1));

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.tap((0, 0)), Err(GameError::NotPlaying));
        assert_eq!(session.tick(), TickOutcome::NoChange);
        assert_eq!(session.time_left(), SESSION_SECONDS);
    }

    #[test]
    fn start_deals_board_and_target_from_it() {
        let mut session = PlaySession::new(RandomGenerator::new(5));
        session.start();

        let board = session.board().unwrap();
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(board.total_tiles(), 16);
        assert!(board.visible_colors().contains_color(session.target().unwrap()));
        assert_eq!(session.score(), 0);
        assert_eq!(session.time_left(), 30);
    }

    #[test]
    fn thirty_ticks_end_the_session() {
        let mut session = PlaySession::new(RandomGenerator::new(2));
        session.start();

        for _ in 0..29 {
            assert_eq!(session.tick(), TickOutcome::Ticked);
        }
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.state(), SessionState::Ended);
        assert_eq!(session.time_left(), 0);
        assert_eq!(session.tick(), TickOutcome::NoChange);
    }

    #[test]
    fn wrong_color_changes_nothing() {
        let mut session = started(&[&[Red, Blue, Red]], &[Red]);

        let outcome = session.tap((1, 0)).unwrap();
        assert_eq!(outcome, TapOutcome::Missed);
        assert!(!outcome.has_update());
        assert_eq!(session.score(), 0);
        assert!(session.tile_at((1, 0)).unwrap().visible);
    }

    #[test]
    fn matching_tap_scores_and_hides() {
        let mut session = started(&[&[Red, Blue, Red]], &[Red]);

        let outcome = session.tap((0, 0)).unwrap();
        assert_eq!(outcome, TapOutcome::Scored);
        assert!(outcome.has_update());
        assert_eq!(session.score(), 1);
        assert!(!session.tile_at((0, 0)).unwrap().visible);
        assert_eq!(session.remaining_targets(), 1);

        assert_eq!(session.tap((0, 0)), Ok(TapOutcome::NoChange));
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn clearing_last_target_deals_a_new_board() {
        let next: &[Color] = &[Green, Yellow, Green, Pink];
        let mut session = started(&[&[Red, Blue, Red], next], &[Red, Green]);

        session.tap((0, 0)).unwrap();
        assert_eq!(session.tap((2, 0)), Ok(TapOutcome::BoardCleared));

        let board = session.board().unwrap();
        assert_eq!(board.size(), (4, 1));
        assert!(board.iter().all(|tile| tile.visible));
        assert_eq!(session.target(), Some(Green));
        assert_eq!(session.score(), 2);

        let picks = &session.generator.picks;
        assert_eq!(picks.len(), 2);
        assert_eq!(
            picks[1],
            (ColorSet::GREEN | ColorSet::YELLOW | ColorSet::PINK, Some(Red))
        );
    }

    #[test]
    fn target_is_always_on_the_board() {
        let mut session = PlaySession::new(RandomGenerator::new(11));
        session.start();

        let (cols, rows) = session.size();
        for _ in 0..200 {
            let target = session.target().unwrap();
            let coords = (0..rows)
                .flat_map(|y| (0..cols).map(move |x| (x, y)))
                .find(|&pos| {
                    session
                        .tile_at(pos)
                        .is_some_and(|tile| tile.visible && tile.color == target)
                })
                .unwrap();
            session.tap(coords).unwrap();
            let board = session.board().unwrap();
            assert!(board.visible_colors().contains_color(session.target().unwrap()));
        }
        assert_eq!(session.score(), 200);
    }

    #[test]
    fn cleared_boards_are_full_and_fresh() {
        let mut session = PlaySession::new(RandomGenerator::new(11));
        session.start();

        let (cols, rows) = session.size();
        let mut cleared = 0;
        for _ in 0..300 {
            let target = session.target().unwrap();
            let coords = (0..rows)
                .flat_map(|y| (0..cols).map(move |x| (x, y)))
                .find(|&pos| {
                    session
                        .tile_at(pos)
                        .is_some_and(|tile| tile.visible && tile.color == target)
                })
                .unwrap();
            if session.tap(coords) == Ok(TapOutcome::BoardCleared) {
                cleared += 1;
                let board = session.board().unwrap();
                assert_eq!(board.total_tiles(), 16);
                assert_eq!(board.visible_count(), 16);
            }
        }
        assert!(cleared > 10, "only {} boards cleared", cleared);
    }

    #[test]
    fn restart_steers_away_from_last_target() {
        let mut session = started(&[&[Red, Blue], &[Red, Green]], &[Red]);
        session.tick();

        session.start();

        let picks = &session.generator.picks;
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].1, None);
        assert_eq!(picks[1], (ColorSet::RED | ColorSet::GREEN, Some(Red)));
        assert_eq!(session.target(), Some(Green));
    }

    #[test]
    fn taps_after_expiry_are_ignored() {
        let mut session = PlaySession::with_duration(Scripted::new(&[&[Red, Red]], &[Red]), 1);
        session.start();

        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.tap((0, 0)), Err(GameError::NotPlaying));
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn restart_resets_score_and_clock() {
        let mut session = started(&[&[Red, Red, Blue]], &[Red]);
        session.tap((0, 0)).unwrap();
        session.tick();

        session.start();

        assert_eq!(session.score(), 0);
        assert_eq!(session.time_left(), 30);
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn out_of_range_tap_is_rejected() {
        let mut session = started(&[&[Red, Blue]], &[Red]);

        assert_eq!(session.tap((5, 0)), Err(GameError::InvalidCoords));
    }
}
