use chrono::Utc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::{Outcome, PlayerRecord, SessionState};
use super::store::SaveStore;
use crate::tower::{Catalog, LOBBY_FLOOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoomCause {
    DefeatFloor(u32),
    AttemptsExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No one is climbing.
    Idle,
    Playing,
    /// Failure is scheduled and lands once `remaining` runs out.
    Doomed { remaining: Duration, cause: DoomCause },
    Won,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    PlayerStarted { player_id: String, attempts: u32 },
    Resumed { player_id: String, floor: u32 },
    FloorChanged { floor: u32 },
    DefeatScheduled { floor: u32, delay: Duration },
    Cleared { floor: u32 },
    Retry { attempts_left: u32 },
    AttemptsExhausted { delay: Duration },
    Won { floor: u32 },
    Defeated,
}

impl Signal {
    pub fn message(&self) -> String {
        match self {
            Signal::PlayerStarted { player_id, attempts } => format!(
                "Welcome, {}. You have {} attempts. Choose a floor.",
                player_id, attempts
            ),
            Signal::Resumed { player_id, floor } => {
                format!("Welcome back, {}. You are on floor {}.", player_id, floor)
            }
            Signal::FloorChanged { floor } => format!("The elevator opens on floor {}.", floor),
            Signal::DefeatScheduled { floor, .. } => {
                format!("Floor {}... something is wrong. The lights go out.", floor)
            }
            Signal::Cleared { floor } => format!(
                "Correct! Floor {} is cleared. Back to the lobby.",
                floor
            ),
            Signal::Retry { attempts_left } => format!(
                "Wrong answer. {} attempt(s) left. Back to the lobby.",
                attempts_left
            ),
            Signal::AttemptsExhausted { .. } => {
                "Wrong answer. No attempts left. The tower closes in...".to_string()
            }
            Signal::Won { floor } => format!("Correct! You conquered floor {}. You win!", floor),
            Signal::Defeated => "You have been ejected from the tower.".to_string(),
        }
    }
}

/// User-facing rejections. The display text is shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("Floor {floor} does not exist. Pick a floor from 1 to {total}.")]
    InvalidFloor { floor: i64, total: u32 },
    #[error("You already cleared floor {floor}. Pick another floor.")]
    AlreadyCleared { floor: u32 },
    #[error("There is nothing to answer on floor {floor}.")]
    CannotSubmit { floor: u32 },
    #[error("'{player_id}' has already entered the tower. Everyone gets one attempt.")]
    DuplicatePlayer { player_id: String },
    #[error("Please enter a name.")]
    EmptyPlayerId,
    #[error("Nobody is in the tower right now.")]
    NoActivePlayer,
    #[error("{player_id} is still in the tower. Finish that run first.")]
    RunInProgress { player_id: String },
    #[error("This run is over.")]
    SessionOver,
    #[error("This run cannot be recorded as a {}.", .outcome.label())]
    OutcomeMismatch { outcome: Outcome },
}

pub type Progress = Result<Signal, ProgressionError>;

/// What the front end should show for the current floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub heading: String,
    pub body: String,
    pub can_submit: bool,
    pub can_change_floor: bool,
}

impl Panel {
    fn closed(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
            can_submit: false,
            can_change_floor: false,
        }
    }
}

/// Owns the catalog, the persisted state and the save slot for one tower.
pub struct Session {
    catalog: Catalog,
    state: SessionState,
    phase: Phase,
    store: SaveStore,
}

impl Session {
    pub fn open(catalog: Catalog, store: SaveStore) -> Self {
        let state = store.load();
        Self::with_state(catalog, state, store)
    }

    pub fn with_state(catalog: Catalog, mut state: SessionState, store: SaveStore) -> Self {
        if !catalog.contains(state.current_floor) {
            warn!(
                floor = state.current_floor,
                total = catalog.total_floors(),
                "saved floor is outside the tower, returning to lobby"
            );
            state.current_floor = LOBBY_FLOOR;
        }
        let mut session = Self {
            catalog,
            state,
            phase: Phase::Idle,
            store,
        };
        session.settle_interrupted_run();
        session
    }

    /// Records a run that had already ended when the previous launch stopped.
    fn settle_interrupted_run(&mut self) {
        let Some(player_id) = self.current_player().map(str::to_string) else {
            return;
        };
        let outcome = match self.state.run_over {
            Some(outcome) => outcome,
            None if self.state.attempts_left == 0 => Outcome::Fail,
            None => return,
        };

        warn!(
            player = %player_id,
            floor = self.state.current_floor,
            outcome = outcome.label(),
            "recording a run that ended before its memo was written"
        );
        self.write_record("", outcome);
        self.persist();
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_floor(&self) -> u32 {
        self.state.current_floor
    }

    pub fn attempts_left(&self) -> u32 {
        self.state.attempts_left
    }

    pub fn current_player(&self) -> Option<&str> {
        self.state.current_player.as_deref()
    }

    pub fn is_floor_cleared(&self, player_id: &str, floor: u32) -> bool {
        self.state.is_floor_cleared(player_id, floor)
    }

    /// Finished runs, newest first.
    pub fn memo_board(&self) -> Vec<&PlayerRecord> {
        self.state.player_history.iter().rev().collect()
    }

    /// A run left unfinished by a previous launch.
    pub fn resumable(&self) -> Option<&str> {
        match self.phase {
            Phase::Idle if self.state.run_over.is_none() && self.state.attempts_left > 0 => {
                self.current_player()
            }
            _ => None,
        }
    }

    fn active_player(&self) -> Result<String, ProgressionError> {
        match self.phase {
            Phase::Playing => self
                .state
                .current_player
                .clone()
                .ok_or(ProgressionError::NoActivePlayer),
            Phase::Idle => Err(ProgressionError::NoActivePlayer),
            Phase::Doomed { .. } | Phase::Won | Phase::Failed => {
                Err(ProgressionError::SessionOver)
            }
        }
    }

    pub fn start_new_player(&mut self, player_id: &str) -> Progress {
        if self.phase != Phase::Idle {
            let player_id = self.current_player().unwrap_or_default().to_string();
            return Err(ProgressionError::RunInProgress { player_id });
        }

        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(ProgressionError::EmptyPlayerId);
        }
        if self.state.all_players.contains(player_id) {
            info!(player = player_id, "rejected returning player");
            return Err(ProgressionError::DuplicatePlayer {
                player_id: player_id.to_string(),
            });
        }

        let attempts = self.catalog.settings.starting_attempts;
        self.state.all_players.insert(player_id.to_string());
        self.state.current_player = Some(player_id.to_string());
        self.state.current_floor = LOBBY_FLOOR;
        self.state.attempts_left = attempts;
        self.phase = Phase::Playing;
        info!(player = player_id, attempts, "player entered the tower");

        // Registering the name right away keeps the one-run rule across crashes
        self.persist();

        Ok(Signal::PlayerStarted {
            player_id: player_id.to_string(),
            attempts,
        })
    }

    pub fn resume(&mut self) -> Progress {
        let player_id = self
            .resumable()
            .ok_or(ProgressionError::NoActivePlayer)?
            .to_string();
        self.phase = Phase::Playing;
        info!(player = %player_id, floor = self.state.current_floor, "run resumed");
        Ok(Signal::Resumed {
            player_id,
            floor: self.state.current_floor,
        })
    }

    /// Ends the run for good. The outcome is saved with it so a relaunch cannot undo it.
    fn end_run(&mut self, phase: Phase, outcome: Outcome) {
        self.phase = phase;
        self.state.run_over = Some(outcome);
        self.persist();
    }

    pub fn change_floor(&mut self, target: i64) -> Progress {
        let player_id = self.active_player()?;
        let total = self.catalog.total_floors();

        let floor = match u32::try_from(target) {
            Ok(floor) if self.catalog.contains(floor) => floor,
            _ => return Err(ProgressionError::InvalidFloor { floor: target, total }),
        };
        if self.state.is_floor_cleared(&player_id, floor) {
            return Err(ProgressionError::AlreadyCleared { floor });
        }

        self.state.current_floor = floor;
        debug!(player = %player_id, floor, "floor changed");

        if self.catalog.is_defeat_floor(floor) {
            let delay = Duration::from_millis(self.catalog.settings.defeat_delay_ms);
            let doomed = Phase::Doomed {
                remaining: delay,
                cause: DoomCause::DefeatFloor(floor),
            };
            self.end_run(doomed, Outcome::Fail);
            warn!(player = %player_id, floor, ?delay, "defeat floor reached");
            return Ok(Signal::DefeatScheduled { floor, delay });
        }

        self.persist();
        Ok(Signal::FloorChanged { floor })
    }

    pub fn submit_answer(&mut self, answer: &str) -> Progress {
        let player_id = self.active_player()?;
        let floor = self.state.current_floor;

        let riddle = match self.catalog.floor(floor) {
            Some(data) if !data.is_quiet() => data.riddle.as_ref(),
            _ => None,
        };
        let riddle = match riddle {
            Some(riddle) if !self.state.is_floor_cleared(&player_id, floor) => riddle,
            _ => return Err(ProgressionError::CannotSubmit { floor }),
        };

        if riddle.accepts(answer) {
            self.state.mark_cleared(&player_id, floor);
            info!(player = %player_id, floor, "riddle solved");

            if floor == self.catalog.final_floor() {
                self.end_run(Phase::Won, Outcome::Success);
                info!(player = %player_id, floor, "tower conquered");
                return Ok(Signal::Won { floor });
            }

            self.state.current_floor = LOBBY_FLOOR;
            self.persist();
            return Ok(Signal::Cleared { floor });
        }

        self.state.attempts_left = self.state.attempts_left.saturating_sub(1);
        let attempts_left = self.state.attempts_left;
        info!(player = %player_id, floor, attempts_left, "wrong answer");

        if attempts_left > 0 {
            self.state.current_floor = LOBBY_FLOOR;
            self.persist();
            return Ok(Signal::Retry { attempts_left });
        }

        let delay = Duration::from_millis(self.catalog.settings.exhausted_delay_ms);
        let doomed = Phase::Doomed {
            remaining: delay,
            cause: DoomCause::AttemptsExhausted,
        };
        self.end_run(doomed, Outcome::Fail);
        warn!(player = %player_id, floor, ?delay, "attempts exhausted");
        Ok(Signal::AttemptsExhausted { delay })
    }

    /// Advances a scheduled failure. Returns `Signal::Defeated` the moment it lands.
    pub fn tick(&mut self, elapsed: Duration) -> Option<Signal> {
        let Phase::Doomed { remaining, cause } = self.phase else {
            return None;
        };

        let remaining = remaining.saturating_sub(elapsed);
        if !remaining.is_zero() {
            self.phase = Phase::Doomed { remaining, cause };
            return None;
        }

        self.phase = Phase::Failed;
        warn!(
            player = self.current_player().unwrap_or_default(),
            floor = self.state.current_floor,
            ?cause,
            "player defeated"
        );
        Some(Signal::Defeated)
    }

    /// Writes the run's record. `Success` needs a win; `Fail` covers defeat and walking out.
    pub fn finalize_session(
        &mut self,
        memo: &str,
        outcome: Outcome,
    ) -> Result<PlayerRecord, ProgressionError> {
        let matches_phase = match (outcome, self.phase) {
            (_, Phase::Idle) => return Err(ProgressionError::NoActivePlayer),
            (Outcome::Success, Phase::Won) => true,
            (Outcome::Fail, Phase::Playing | Phase::Doomed { .. } | Phase::Failed) => true,
            _ => false,
        };
        if !matches_phase {
            warn!(outcome = outcome.label(), phase = ?self.phase, "rejected run record");
            return Err(ProgressionError::OutcomeMismatch { outcome });
        }

        let record = self
            .write_record(memo, outcome)
            .ok_or(ProgressionError::NoActivePlayer)?;
        self.persist();
        Ok(record)
    }

    fn write_record(&mut self, memo: &str, outcome: Outcome) -> Option<PlayerRecord> {
        let player_id = self.state.current_player.take()?;

        let floor_reached = match outcome {
            Outcome::Success => self.catalog.final_floor(),
            Outcome::Fail => self.state.current_floor,
        };
        let record = PlayerRecord {
            player_id,
            floor_reached,
            memo: memo.trim().to_string(),
            outcome,
            timestamp: Utc::now(),
        };
        info!(
            player = %record.player_id,
            floor_reached,
            outcome = outcome.label(),
            "run finished"
        );

        self.state.player_history.push(record.clone());
        self.state.current_floor = LOBBY_FLOOR;
        self.state.attempts_left = 0;
        self.state.run_over = None;
        self.phase = Phase::Idle;
        Some(record)
    }

    /// Saves the live state. A run that has ended is stored with its outcome, so it
    /// comes back as a finished record rather than a resumable climb.
    pub fn save(&self) {
        self.persist();
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.state) {
            warn!(
                path = %self.store.path().display(),
                error = %format!("{err:#}"),
                "failed to save"
            );
        }
    }

    pub fn panel(&self) -> Panel {
        let name = &self.catalog.settings.name;
        match self.phase {
            Phase::Idle => return Panel::closed(name.as_str(), "Nobody is climbing right now."),
            Phase::Won => {
                return Panel::closed(
                    "Rooftop",
                    "You solved the last riddle. Leave a memo for those who follow.",
                )
            }
            Phase::Failed => {
                return Panel::closed(
                    "Ejected",
                    "The tower has thrown you out. Leave a memo for those who follow.",
                )
            }
            Phase::Doomed { cause, .. } => {
                let body = match cause {
                    DoomCause::DefeatFloor(floor) => self
                        .catalog
                        .floor(floor)
                        .and_then(|f| f.message.clone())
                        .unwrap_or_else(|| "Something is terribly wrong here.".to_string()),
                    DoomCause::AttemptsExhausted => "You have run out of attempts.".to_string(),
                };
                return Panel::closed(format!("Floor {}", self.state.current_floor), body);
            }
            Phase::Playing => {}
        }

        let number = self.state.current_floor;
        let Some(floor) = self.catalog.floor(number) else {
            return Panel::closed(name.as_str(), "");
        };
        let cleared = self
            .current_player()
            .is_some_and(|player| self.is_floor_cleared(player, number));

        if floor.is_quiet() {
            let body = floor.message.clone().unwrap_or_else(|| {
                if number == LOBBY_FLOOR {
                    "Pick the next floor.".to_string()
                } else {
                    "Take a break. No answers are taken here.".to_string()
                }
            });
            return Panel {
                heading: floor.heading(),
                body,
                can_submit: false,
                can_change_floor: true,
            };
        }

        if cleared {
            return Panel {
                heading: format!("{} (cleared)", floor.heading()),
                body: "You already cleared this floor. Pick another.".to_string(),
                can_submit: false,
                can_change_floor: true,
            };
        }

        let body = match &floor.riddle {
            Some(riddle) if riddle.flavor.is_empty() => riddle.prompt.clone(),
            Some(riddle) => format!("[{}]\n\n{}", riddle.flavor, riddle.prompt),
            None => String::new(),
        };
        Panel {
            heading: floor.heading(),
            body,
            can_submit: true,
            can_change_floor: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tower::default_catalog;
    use crate::tower::loader::parse_catalog;
    use tempfile::TempDir;

    const SMALL: &str = r#"
[tower]
starting_attempts = 2
defeat_floor = 3
defeat_delay_ms = 500
exhausted_delay_ms = 200

[[floor]]
number = 1
rest_stop = true

[[floor]]
number = 2
[floor.riddle]
prompt = "What has keys but opens no locks?"
answer = "Piano"
flavor = "Music room"

[[floor]]
number = 3
message = "The floor gives way."

[[floor]]
number = 4
rest_stop = true

[[floor]]
number = 5
[floor.riddle]
prompt = "What gets wetter the more it dries?"
answer = "towel"
"#;

    fn session_with(catalog: Catalog) -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        let store = SaveStore::new(dir.path().join("game_state.json"));
        (dir, Session::open(catalog, store))
    }

    fn small_session() -> (TempDir, Session) {
        session_with(parse_catalog(SMALL).unwrap())
    }

    fn playing(player: &str) -> (TempDir, Session) {
        let (dir, mut session) = small_session();
        session.start_new_player(player).unwrap();
        (dir, session)
    }

    #[test]
    fn new_player_starts_in_lobby_with_full_budget() {
        let (_dir, mut session) = small_session();
        let signal = session.start_new_player("  ana ").unwrap();

        assert_eq!(
            signal,
            Signal::PlayerStarted {
                player_id: "ana".to_string(),
                attempts: 2
            }
        );
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.current_floor(), 1);
        assert_eq!(session.attempts_left(), 2);
        assert_eq!(session.current_player(), Some("ana"));
    }

    #[test]
    fn blank_player_id_is_rejected() {
        let (_dir, mut session) = small_session();
        assert_eq!(
            session.start_new_player("   "),
            Err(ProgressionError::EmptyPlayerId)
        );
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn returning_player_is_rejected_even_after_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game_state.json");
        let catalog = parse_catalog(SMALL).unwrap();

        let mut session = Session::open(catalog.clone(), SaveStore::new(&path));
        session.start_new_player("ana").unwrap();
        session.finalize_session("bye", Outcome::Fail).unwrap();
        assert!(matches!(
            session.start_new_player("ana"),
            Err(ProgressionError::DuplicatePlayer { .. })
        ));

        let mut reopened = Session::open(catalog, SaveStore::new(&path));
        assert!(matches!(
            reopened.start_new_player("ana"),
            Err(ProgressionError::DuplicatePlayer { .. })
        ));
        assert!(reopened.start_new_player("ben").is_ok());
    }

    #[test]
    fn cannot_start_while_a_run_is_active() {
        let (_dir, mut session) = playing("ana");
        assert_eq!(
            session.start_new_player("ben"),
            Err(ProgressionError::RunInProgress {
                player_id: "ana".to_string()
            })
        );
    }

    #[test]
    fn actions_need_an_active_player() {
        let (_dir, mut session) = small_session();
        assert_eq!(session.change_floor(2), Err(ProgressionError::NoActivePlayer));
        assert_eq!(session.submit_answer("x"), Err(ProgressionError::NoActivePlayer));
        assert_eq!(
            session.finalize_session("", Outcome::Fail),
            Err(ProgressionError::NoActivePlayer)
        );
    }

    #[test]
    fn out_of_range_floors_leave_position_unchanged() {
        let (_dir, mut session) = playing("ana");
        session.change_floor(4).unwrap();

        for target in [-3, 0, 6, 100, i64::MAX] {
            assert_eq!(
                session.change_floor(target),
                Err(ProgressionError::InvalidFloor {
                    floor: target,
                    total: 5
                })
            );
            assert_eq!(session.current_floor(), 4);
        }
    }

    #[test]
    fn correct_answer_clears_floor_and_returns_to_lobby() {
        let (_dir, mut session) = playing("ana");
        session.change_floor(2).unwrap();

        assert_eq!(
            session.submit_answer("  pIaNo "),
            Ok(Signal::Cleared { floor: 2 })
        );
        assert_eq!(session.current_floor(), 1);
        assert_eq!(session.attempts_left(), 2);
        assert!(session.is_floor_cleared("ana", 2));
        assert_eq!(
            session.change_floor(2),
            Err(ProgressionError::AlreadyCleared { floor: 2 })
        );
        assert_eq!(session.current_floor(), 1);
    }

    #[test]
    fn cleared_floors_do_not_carry_over_to_other_players() {
        let (_dir, mut session) = playing("ana");
        session.change_floor(2).unwrap();
        session.submit_answer("piano").unwrap();
        session.finalize_session("", Outcome::Fail).unwrap();

        session.start_new_player("ben").unwrap();
        assert_eq!(session.change_floor(2), Ok(Signal::FloorChanged { floor: 2 }));
    }

    #[test]
    fn cannot_submit_on_quiet_floors() {
        let (_dir, mut session) = playing("ana");
        assert_eq!(
            session.submit_answer("piano"),
            Err(ProgressionError::CannotSubmit { floor: 1 })
        );

        session.change_floor(4).unwrap();
        assert_eq!(
            session.submit_answer("piano"),
            Err(ProgressionError::CannotSubmit { floor: 4 })
        );
        assert_eq!(session.attempts_left(), 2);
    }

    #[test]
    fn wrong_answer_costs_an_attempt_and_returns_to_lobby() {
        let (_dir, mut session) = playing("ana");
        session.change_floor(2).unwrap();

        assert_eq!(
            session.submit_answer("guitar"),
            Ok(Signal::Retry { attempts_left: 1 })
        );
        assert_eq!(session.current_floor(), 1);
        assert_eq!(session.phase(), Phase::Playing);
        assert!(!session.is_floor_cleared("ana", 2));
    }

    #[test]
    fn two_wrong_answers_end_in_failure() {
        let (_dir, mut session) = playing("ana");
        let mut seen = vec![session.attempts_left()];

        session.change_floor(2).unwrap();
        session.submit_answer("guitar").unwrap();
        seen.push(session.attempts_left());

        session.change_floor(5).unwrap();
        let signal = session.submit_answer("sponge").unwrap();
        seen.push(session.attempts_left());

        assert_eq!(
            signal,
            Signal::AttemptsExhausted {
                delay: Duration::from_millis(200)
            }
        );
        assert_eq!(seen, vec![2, 1, 0]);
        assert!(matches!(
            session.phase(),
            Phase::Doomed {
                cause: DoomCause::AttemptsExhausted,
                ..
            }
        ));
        assert_eq!(session.current_floor(), 5);

        assert_eq!(session.submit_answer("towel"), Err(ProgressionError::SessionOver));
        assert_eq!(session.tick(Duration::from_millis(150)), None);
        assert_eq!(session.tick(Duration::from_millis(50)), Some(Signal::Defeated));
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.attempts_left(), 0);
        assert_eq!(session.tick(Duration::from_millis(50)), None);
    }

    #[test]
    fn defeat_floor_fails_regardless_of_attempts() {
        let (_dir, mut session) = playing("ana");

        assert_eq!(
            session.change_floor(3),
            Ok(Signal::DefeatScheduled {
                floor: 3,
                delay: Duration::from_millis(500)
            })
        );
        assert_eq!(session.attempts_left(), 2);
        assert_eq!(session.change_floor(1), Err(ProgressionError::SessionOver));

        assert_eq!(session.tick(Duration::from_millis(499)), None);
        assert_eq!(session.tick(Duration::from_millis(1)), Some(Signal::Defeated));
        assert_eq!(session.phase(), Phase::Failed);

        let record = session.finalize_session("tripped", Outcome::Fail).unwrap();
        assert_eq!(record.floor_reached, 3);
        assert_eq!(record.outcome, Outcome::Fail);
    }

    #[test]
    fn solving_final_floor_wins() {
        let (_dir, mut session) = playing("ana");
        session.change_floor(5).unwrap();

        assert_eq!(session.submit_answer("Towel"), Ok(Signal::Won { floor: 5 }));
        assert_eq!(session.phase(), Phase::Won);
        assert_eq!(session.current_floor(), 5);

        let record = session.finalize_session("  easy  ", Outcome::Success).unwrap();
        assert_eq!(record.floor_reached, 5);
        assert_eq!(record.memo, "easy");
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.current_player(), None);
        assert_eq!(session.state().player_history.len(), 1);
    }

    #[test]
    fn default_tower_final_floor_is_thirty() {
        let catalog = default_catalog().unwrap();
        let answer = catalog.floor(30).unwrap().riddle.clone().unwrap().answer;
        let (_dir, mut session) = session_with(catalog);

        session.start_new_player("ana").unwrap();
        session.change_floor(30).unwrap();
        assert_eq!(session.submit_answer(&answer), Ok(Signal::Won { floor: 30 }));

        let record = session.finalize_session("top", Outcome::Success).unwrap();
        assert_eq!(record.floor_reached, 30);
    }

    #[test]
    fn default_tower_floor_seventeen_is_fatal() {
        let (_dir, mut session) = session_with(default_catalog().unwrap());
        session.start_new_player("ana").unwrap();

        assert!(matches!(
            session.change_floor(17),
            Ok(Signal::DefeatScheduled { floor: 17, .. })
        ));
        assert_eq!(session.tick(Duration::from_secs(3)), Some(Signal::Defeated));
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.attempts_left(), 2);
    }

    #[test]
    fn finalize_persists_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game_state.json");
        let catalog = parse_catalog(SMALL).unwrap();

        let mut session = Session::open(catalog.clone(), SaveStore::new(&path));
        session.start_new_player("ana").unwrap();
        session.change_floor(2).unwrap();
        session.submit_answer("piano").unwrap();
        session.change_floor(4).unwrap();
        session.finalize_session("left early", Outcome::Fail).unwrap();

        let reopened = Session::open(catalog, SaveStore::new(&path));
        assert_eq!(reopened.state(), session.state());
        assert_eq!(reopened.state().player_history[0].floor_reached, 4);
        assert!(reopened.is_floor_cleared("ana", 2));
    }

    #[test]
    fn unfinished_run_can_be_resumed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game_state.json");
        let catalog = parse_catalog(SMALL).unwrap();

        let mut session = Session::open(catalog.clone(), SaveStore::new(&path));
        session.start_new_player("ana").unwrap();
        session.change_floor(2).unwrap();
        session.submit_answer("drum").unwrap();
        session.change_floor(4).unwrap();
        session.save();

        let mut reopened = Session::open(catalog, SaveStore::new(&path));
        assert_eq!(reopened.phase(), Phase::Idle);
        assert_eq!(reopened.resumable(), Some("ana"));
        assert_eq!(
            reopened.resume(),
            Ok(Signal::Resumed {
                player_id: "ana".to_string(),
                floor: 4
            })
        );
        assert_eq!(reopened.attempts_left(), 1);
        assert_eq!(reopened.phase(), Phase::Playing);
    }

    #[test]
    fn saved_floor_outside_tower_resets_to_lobby() {
        let dir = TempDir::new().unwrap();
        let state = SessionState {
            current_floor: 99,
            ..SessionState::default()
        };
        let session = Session::with_state(
            parse_catalog(SMALL).unwrap(),
            state,
            SaveStore::new(dir.path().join("game_state.json")),
        );
        assert_eq!(session.current_floor(), 1);
    }

    #[test]
    fn panel_flags_follow_the_floor() {
        let (_dir, mut session) = small_session();
        let idle = session.panel();
        assert!(!idle.can_submit && !idle.can_change_floor);

        session.start_new_player("ana").unwrap();
        let lobby = session.panel();
        assert!(!lobby.can_submit);
        assert!(lobby.can_change_floor);

        session.change_floor(2).unwrap();
        let quiz = session.panel();
        assert!(quiz.can_submit);
        assert!(!quiz.can_change_floor);
        assert!(quiz.body.contains("Music room"));
        assert!(quiz.body.contains("What has keys"));

        session.change_floor(4).unwrap();
        let rest = session.panel();
        assert!(!rest.can_submit);
        assert!(rest.can_change_floor);

        session.change_floor(3).unwrap();
        let doomed = session.panel();
        assert!(!doomed.can_submit && !doomed.can_change_floor);
        assert_eq!(doomed.body, "The floor gives way.");
    }

    #[test]
    fn memo_board_lists_newest_first() {
        let (_dir, mut session) = small_session();
        for name in ["ana", "ben", "cy"] {
            session.start_new_player(name).unwrap();
            session.finalize_session(&format!("{name} was here"), Outcome::Fail).unwrap();
        }

        let board: Vec<_> = session
            .memo_board()
            .into_iter()
            .map(|r| r.player_id.as_str())
            .collect();
        assert_eq!(board, vec!["cy", "ben", "ana"]);
    }

    fn reopen(dir: &TempDir) -> Session {
        Session::open(
            parse_catalog(SMALL).unwrap(),
            SaveStore::new(dir.path().join("game_state.json")),
        )
    }

    #[test]
    fn spent_attempts_survive_a_crash() {
        let (dir, mut session) = playing("ana");
        session.change_floor(2).unwrap();
        session.submit_answer("drum").unwrap();
        session.change_floor(4).unwrap();
        drop(session);

        let mut reopened = reopen(&dir);
        assert_eq!(reopened.resumable(), Some("ana"));
        reopened.resume().unwrap();
        assert_eq!(reopened.attempts_left(), 1);
        assert_eq!(reopened.current_floor(), 4);
    }

    #[test]
    fn crash_during_defeat_countdown_still_records_a_failure() {
        let (dir, mut session) = playing("ana");
        session.change_floor(2).unwrap();
        session.submit_answer("drum").unwrap();
        assert!(matches!(
            session.change_floor(3),
            Ok(Signal::DefeatScheduled { .. })
        ));
        drop(session);

        let mut reopened = reopen(&dir);
        assert_eq!(reopened.resumable(), None);
        assert_eq!(reopened.resume(), Err(ProgressionError::NoActivePlayer));
        assert_eq!(reopened.current_player(), None);

        let record = &reopened.state().player_history[0];
        assert_eq!(record.player_id, "ana");
        assert_eq!(record.outcome, Outcome::Fail);
        assert_eq!(record.floor_reached, 3);
        assert!(matches!(
            reopened.start_new_player("ana"),
            Err(ProgressionError::DuplicatePlayer { .. })
        ));
    }

    #[test]
    fn crash_after_running_out_of_attempts_is_not_resumable() {
        let (dir, mut session) = playing("ana");
        session.change_floor(2).unwrap();
        session.submit_answer("drum").unwrap();
        session.change_floor(5).unwrap();
        session.submit_answer("sponge").unwrap();
        drop(session);

        let reopened = reopen(&dir);
        assert_eq!(reopened.resumable(), None);
        assert_eq!(reopened.state().player_history.len(), 1);
        assert_eq!(reopened.state().player_history[0].floor_reached, 5);
    }

    #[test]
    fn saving_after_a_win_keeps_the_win() {
        let (dir, mut session) = playing("ana");
        session.change_floor(5).unwrap();
        session.submit_answer("towel").unwrap();
        session.save();
        drop(session);

        let reopened = reopen(&dir);
        assert_eq!(reopened.resumable(), None);
        let record = &reopened.state().player_history[0];
        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(record.floor_reached, 5);
    }

    #[test]
    fn success_cannot_be_recorded_without_a_win() {
        let (_dir, mut session) = playing("ana");
        assert_eq!(
            session.finalize_session("", Outcome::Success),
            Err(ProgressionError::OutcomeMismatch {
                outcome: Outcome::Success
            })
        );
        assert_eq!(session.phase(), Phase::Playing);
        assert!(session.state().player_history.is_empty());

        session.change_floor(3).unwrap();
        assert!(session.finalize_session("", Outcome::Success).is_err());
        let record = session.finalize_session("", Outcome::Fail).unwrap();
        assert_eq!(record.floor_reached, 3);
    }

    #[test]
    fn failure_cannot_be_recorded_after_a_win() {
        let (_dir, mut session) = playing("ana");
        session.change_floor(5).unwrap();
        session.submit_answer("towel").unwrap();

        assert_eq!(
            session.finalize_session("", Outcome::Fail),
            Err(ProgressionError::OutcomeMismatch {
                outcome: Outcome::Fail
            })
        );
        assert_eq!(session.phase(), Phase::Won);
        assert!(session.finalize_session("", Outcome::Success).is_ok());
    }
}
