//! Per-room actor. One task owns each room's [`Session`] and live
//! connections; WebSocket handlers talk to it through [`RoomCommand`]s, so
//! every action in a room is applied and broadcast in acceptance order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use quizboard_core::error::GameError;
use quizboard_core::net::messages::{
    AnswerJudgedMsg, AnsweringAllowedMsg, GameCompletedMsg, GameStartedMsg, NextTurnMsg,
    PlayerAnsweringMsg, PlayerDisconnectedMsg, PlayerJoinedMsg, PlayerLeftMsg,
    PlayerReconnectedMsg, PlayerRemovedMsg, QuestionAnswerMsg, QuestionSelectedMsg,
    QuestionSkippedMsg, RemovedFromRoomMsg, RolesUpdatedMsg, RoomClosedMsg, RoomCreatedMsg,
    RoomJoinedMsg, ScoreAdjustedMsg, ServerMessage,
};
use quizboard_core::player::{ConnectionId, PlayerRole};
use quizboard_core::quiz::{QuestionRef, Quiz, QuizBoard};
use quizboard_core::room::SessionStatus;
use quizboard_core::session::{DisconnectOutcome, JoinOutcome, Resolution, Session};

use crate::broadcast::{Members, PlayerSender};
use crate::store::SessionStore;

/// Reply channel for commands that can be rejected.
pub type Reply = oneshot::Sender<Result<(), GameError>>;

/// Requests a room actor accepts.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        connection: ConnectionId,
        nickname: String,
        sender: PlayerSender,
        /// Fired when the room detaches this connection on its own.
        evict: oneshot::Sender<()>,
        reply: Reply,
    },
    Action {
        connection: ConnectionId,
        action: RoomAction,
        reply: Reply,
    },
    Disconnect {
        connection: ConnectionId,
    },
    /// Buzz-in delay for the question stamped `seq` has elapsed.
    AnsweringWindowElapsed {
        seq: u64,
    },
}

/// Room-scoped actions from a seated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    UpdateRole {
        player_id: ConnectionId,
        role: PlayerRole,
    },
    RemovePlayer {
        player_id: ConnectionId,
    },
    StartGame,
    SelectQuestion(QuestionRef),
    AttemptAnswer,
    JudgeAnswer {
        correct: bool,
    },
    SkipQuestion,
    AdjustScore {
        player_id: ConnectionId,
        points: i64,
    },
}

/// Timing and persistence shared by every room.
#[derive(Clone)]
pub struct RoomSettings {
    pub answer_delay: Duration,
    pub idle_timeout: Duration,
    pub command_buffer: usize,
    pub store: Arc<dyn SessionStore>,
}

/// The connection that created the room. Already seated in the session.
pub struct Creator {
    pub connection: ConnectionId,
    pub sender: PlayerSender,
    pub evict: oneshot::Sender<()>,
}

/// Spawn the actor for a freshly created (and already persisted) session.
pub fn spawn_room(
    session: Session,
    quiz: Arc<Quiz>,
    creator: Creator,
    settings: RoomSettings,
) -> (mpsc::Sender<RoomCommand>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(settings.command_buffer);
    let mut members = Members::new(session.code.clone());
    members.insert(creator.connection, creator.sender);
    let actor = RoomActor {
        board: quiz.board(),
        quiz,
        members,
        evictions: HashMap::from([(creator.connection, creator.evict)]),
        timer: None,
        self_tx: tx.downgrade(),
        settings,
        session,
        unsaved: false,
    };
    let handle = tokio::spawn(actor.run(rx, creator.connection));
    (tx, handle)
}

enum Step {
    /// An action was accepted; resets the idle clock.
    Active,
    Idle,
    Stop,
}

struct RoomActor {
    session: Session,
    quiz: Arc<Quiz>,
    board: QuizBoard,
    members: Members,
    evictions: HashMap<ConnectionId, oneshot::Sender<()>>,
    /// Pending buzz-in delay for the open question.
    timer: Option<JoinHandle<()>>,
    self_tx: mpsc::WeakSender<RoomCommand>,
    settings: RoomSettings,
    /// The live session is ahead of the stored record.
    unsaved: bool,
}

impl RoomActor {
    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>, creator: ConnectionId) {
        tracing::info!(room = %self.session.code, quiz = %self.quiz.id, "Room created");
        self.members.send_to(
            creator,
            &ServerMessage::RoomCreated(RoomCreatedMsg {
                code: self.session.code.clone(),
                player_id: creator,
                quiz: self.board.clone(),
                players: self.session.players.clone(),
            }),
        );

        let mut last_activity = Instant::now();
        loop {
            let deadline = last_activity + self.settings.idle_timeout;
            let cmd = tokio::select! {
                cmd = rx.recv() => cmd,
                () = tokio::time::sleep_until(deadline) => {
                    self.close("idle timeout");
                    break;
                }
            };
            let Some(cmd) = cmd else {
                break;
            };
            match self.handle(cmd) {
                Step::Active => last_activity = Instant::now(),
                Step::Idle => {},
                Step::Stop => break,
            }
        }

        self.cancel_timer();
        tracing::info!(room = %self.session.code, "Room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Step {
        match cmd {
            RoomCommand::Join {
                connection,
                nickname,
                sender,
                evict,
                reply,
            } => {
                let result = self.join(connection, &nickname, sender, evict);
                let accepted = result.is_ok();
                let _ = reply.send(result);
                if accepted { Step::Active } else { Step::Idle }
            },
            RoomCommand::Action {
                connection,
                action,
                reply,
            } => {
                let result = self.act(connection, action);
                let accepted = result.is_ok();
                if let Err(e) = &result {
                    tracing::debug!(room = %self.session.code, player_id = connection, error = %e, "Action rejected");
                }
                let _ = reply.send(result);
                if accepted { Step::Active } else { Step::Idle }
            },
            RoomCommand::Disconnect { connection } => self.disconnect(connection),
            RoomCommand::AnsweringWindowElapsed { seq } => {
                self.open_answering(seq);
                Step::Idle
            },
        }
    }

    /// Apply `f` to a copy of the session, persist it, then commit. A
    /// rejection or failed write leaves the live session untouched.
    fn transition<T>(
        &mut self,
        f: impl FnOnce(&mut Session) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut next = self.session.clone();
        let out = f(&mut next)?;
        if let Err(e) = self.settings.store.save(&next) {
            tracing::error!(room = %self.session.code, error = %e, "Failed to persist session");
            return Err(e.into());
        }
        if std::mem::take(&mut self.unsaved) {
            tracing::info!(room = %self.session.code, "Persisted earlier unsaved changes");
        }
        self.session = next;
        Ok(out)
    }

    fn join(
        &mut self,
        connection: ConnectionId,
        nickname: &str,
        sender: PlayerSender,
        evict: oneshot::Sender<()>,
    ) -> Result<(), GameError> {
        if !self.session.is_active {
            return Err(GameError::RoomNotFound);
        }
        let outcome = self.transition(|s| s.join(connection, nickname))?;
        self.members.insert(connection, sender);
        self.evictions.insert(connection, evict);
        self.members.send_to(connection, &self.room_joined(connection));

        match outcome {
            JoinOutcome::Seated(player) => {
                tracing::info!(room = %self.session.code, player_id = connection, nickname = %player.nickname, "Player joined");
                self.members.broadcast_except(
                    connection,
                    &ServerMessage::PlayerJoined(PlayerJoinedMsg {
                        player,
                        players: self.session.players.clone(),
                    }),
                );
            },
            JoinOutcome::Rebound {
                previous_id,
                player,
            } => {
                tracing::info!(room = %self.session.code, previous_id, player_id = connection, nickname = %player.nickname, "Player reconnected");
                self.members.remove(previous_id);
                self.evictions.remove(&previous_id);
                self.members.broadcast_except(
                    connection,
                    &ServerMessage::PlayerReconnected(PlayerReconnectedMsg {
                        previous_id,
                        player_id: connection,
                        players: self.session.players.clone(),
                    }),
                );
                if player.role.is_judge()
                    && let Some(at) = self.session.current_question
                {
                    self.send_answer_to_judge(at);
                }
            },
        }
        Ok(())
    }

    fn act(&mut self, connection: ConnectionId, action: RoomAction) -> Result<(), GameError> {
        if self.session.player(connection).is_none() {
            return Err(GameError::NotInRoom);
        }
        let quiz = Arc::clone(&self.quiz);

        match action {
            RoomAction::UpdateRole { player_id, role } => {
                self.transition(|s| s.update_role(connection, player_id, role))?;
                tracing::info!(room = %self.session.code, player_id, %role, "Role updated");
                self.members
                    .broadcast(&ServerMessage::RolesUpdated(RolesUpdatedMsg {
                        players: self.session.players.clone(),
                    }));
            },
            RoomAction::RemovePlayer { player_id } => {
                self.transition(|s| s.remove_player(connection, player_id))?;
                tracing::info!(room = %self.session.code, player_id, "Player removed");
                self.members.send_to(
                    player_id,
                    &ServerMessage::RemovedFromRoom(RemovedFromRoomMsg {
                        code: self.session.code.clone(),
                    }),
                );
                self.detach(player_id);
                self.members
                    .broadcast(&ServerMessage::PlayerRemoved(PlayerRemovedMsg {
                        player_id,
                        players: self.session.players.clone(),
                    }));
            },
            RoomAction::StartGame => {
                let first = self.transition(|s| s.start_game(&quiz, connection))?;
                tracing::info!(room = %self.session.code, first_turn = first, "Game started");
                self.members
                    .broadcast(&ServerMessage::GameStarted(GameStartedMsg {
                        current_player_turn: first,
                        players: self.session.players.clone(),
                    }));
            },
            RoomAction::SelectQuestion(at) => {
                let opened = self.transition(|s| s.select_question(&quiz, connection, at))?;
                self.members
                    .broadcast(&ServerMessage::QuestionSelected(QuestionSelectedMsg {
                        question: opened.at,
                        text: opened.question.text,
                        points: opened.question.points,
                        selected_by: connection,
                        answer_delay_ms: self.settings.answer_delay.as_millis() as u64,
                        players: self.session.players.clone(),
                    }));
                self.send_answer_to_judge(opened.at);
                self.schedule_answering_window(opened.seq);
            },
            RoomAction::AttemptAnswer => {
                self.transition(|s| s.attempt_answer(connection))?;
                self.members
                    .broadcast(&ServerMessage::PlayerAnswering(PlayerAnsweringMsg {
                        player_id: connection,
                        players: self.session.players.clone(),
                    }));
            },
            RoomAction::JudgeAnswer { correct } => {
                let outcome = self.transition(|s| s.judge(&quiz, connection, correct))?;
                self.cancel_timer();
                self.members
                    .broadcast(&ServerMessage::AnswerJudged(AnswerJudgedMsg {
                        question: outcome.at,
                        player_id: outcome.player_id,
                        correct: outcome.correct,
                        points: outcome.points,
                        answer: outcome.answer,
                        players: self.session.players.clone(),
                    }));
                self.after_question(outcome.next_turn, outcome.resolution);
            },
            RoomAction::SkipQuestion => {
                let outcome = self.transition(|s| s.skip(&quiz, connection))?;
                self.cancel_timer();
                self.members
                    .broadcast(&ServerMessage::QuestionSkipped(QuestionSkippedMsg {
                        question: outcome.at,
                        answer: outcome.answer,
                        players: self.session.players.clone(),
                    }));
                self.after_question(outcome.turn, outcome.resolution);
            },
            RoomAction::AdjustScore { player_id, points } => {
                let score = self.transition(|s| s.adjust_score(connection, player_id, points))?;
                self.members
                    .broadcast(&ServerMessage::ScoreAdjusted(ScoreAdjustedMsg {
                        player_id,
                        points,
                        score,
                        players: self.session.players.clone(),
                    }));
            },
        }
        Ok(())
    }

    fn after_question(&mut self, turn: ConnectionId, resolution: Resolution) {
        match resolution {
            Resolution::Grid => {
                self.members.broadcast(&ServerMessage::NextTurn(NextTurnMsg {
                    player_id: turn,
                    players: self.session.players.clone(),
                }));
            },
            Resolution::Completed(leaderboard) => {
                tracing::info!(room = %self.session.code, "Game completed");
                self.members
                    .broadcast(&ServerMessage::GameCompleted(GameCompletedMsg { leaderboard }));
            },
        }
    }

    fn disconnect(&mut self, connection: ConnectionId) -> Step {
        self.members.remove(connection);
        self.evictions.remove(&connection);

        // Applied even if the write fails; the next successful save carries it.
        let mut next = self.session.clone();
        let outcome = next.disconnect(connection);
        match self.settings.store.save(&next) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                tracing::error!(room = %self.session.code, player_id = connection, error = %e, "Failed to persist disconnect");
                self.unsaved = true;
            },
        }
        self.session = next;
        match outcome {
            DisconnectOutcome::NotSeated | DisconnectOutcome::Ignored => {},
            DisconnectOutcome::Left {
                room_emptied: true,
                ..
            } => {
                tracing::info!(room = %self.session.code, "Last player left, room retired");
                return Step::Stop;
            },
            DisconnectOutcome::Left {
                player, promoted, ..
            } => {
                tracing::info!(room = %self.session.code, player_id = player.id, ?promoted, "Player left");
                self.members.broadcast(&ServerMessage::PlayerLeft(PlayerLeftMsg {
                    player_id: player.id,
                    promoted,
                    players: self.session.players.clone(),
                }));
            },
            DisconnectOutcome::Disconnected { player_id } => {
                tracing::info!(room = %self.session.code, player_id, "Player disconnected mid-game");
                self.members
                    .broadcast(&ServerMessage::PlayerDisconnected(PlayerDisconnectedMsg {
                        player_id,
                        players: self.session.players.clone(),
                    }));
            },
        }

        if self.session.status == SessionStatus::Completed && self.members.is_empty() {
            if self
                .transition(|s| {
                    s.retire();
                    Ok(())
                })
                .is_ok()
            {
                tracing::info!(room = %self.session.code, "Completed room retired");
            }
            return Step::Stop;
        }
        Step::Idle
    }

    fn open_answering(&mut self, seq: u64) {
        self.timer = None;
        let mut next = self.session.clone();
        if !next.open_answering(seq) {
            tracing::debug!(room = %self.session.code, seq, "Ignoring stale buzz-in timer");
            return;
        }
        if let Err(e) = self.settings.store.save(&next) {
            tracing::error!(room = %self.session.code, error = %e, "Failed to persist buzz-in window");
            return;
        }
        self.session = next;
        if let Some(question) = self.session.current_question {
            self.members
                .broadcast(&ServerMessage::AnsweringAllowed(AnsweringAllowedMsg {
                    question,
                    players: self.session.players.clone(),
                }));
        }
    }

    fn schedule_answering_window(&mut self, seq: u64) {
        self.cancel_timer();
        let tx = self.self_tx.clone();
        let delay = self.settings.answer_delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(RoomCommand::AnsweringWindowElapsed { seq }).await;
            }
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn send_answer_to_judge(&self, at: QuestionRef) {
        let (Some(judge), Some(question)) = (self.session.judge_seat(), self.quiz.question(at)) else {
            return;
        };
        self.members.send_to(
            judge.id,
            &ServerMessage::QuestionAnswer(QuestionAnswerMsg {
                question: at,
                answer: question.answer.clone(),
            }),
        );
    }

    /// Drop a connection from the room and tell its handler.
    fn detach(&mut self, connection: ConnectionId) {
        self.members.remove(connection);
        if let Some(evict) = self.evictions.remove(&connection) {
            let _ = evict.send(());
        }
    }

    /// Retire the room and release every connection.
    fn close(&mut self, reason: &str) {
        let retired = self.transition(|s| {
            s.retire();
            Ok(())
        });
        if retired.is_err() {
            // The record stays active in the store; the actor still stops.
            tracing::warn!(room = %self.session.code, "Closing room without persisting retirement");
        }
        tracing::info!(room = %self.session.code, reason, "Room closed");
        self.members.broadcast(&ServerMessage::RoomClosed(RoomClosedMsg {
            code: self.session.code.clone(),
            reason: reason.to_string(),
        }));
        for (_, evict) in self.evictions.drain() {
            let _ = evict.send(());
        }
    }

    fn room_joined(&self, player_id: ConnectionId) -> ServerMessage {
        let s = &self.session;
        ServerMessage::RoomJoined(Box::new(RoomJoinedMsg {
            code: s.code.clone(),
            player_id,
            quiz: self.board.clone(),
            status: s.status,
            players: s.players.clone(),
            answered_questions: s.answered_questions.clone(),
            current_question: s.current_question,
            current_player_turn: s.current_player_turn,
            current_answering_player_id: s.current_answering_player_id,
            answering_open: s.answering_open,
        }))
    }
}
