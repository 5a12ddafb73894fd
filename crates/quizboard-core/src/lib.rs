pub mod error;
pub mod net;
pub mod player;
pub mod quiz;
pub mod room;
pub mod session;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::player::PlayerRole;
    use crate::quiz::{Category, Question, Quiz};
    use crate::room::SeatPolicy;
    use crate::session::Session;

    /// Build a quiz with `categories` x `questions` cells. Points grow by 100
    /// per row; answers read `Answer {category}-{question}`.
    pub fn make_quiz(categories: usize, questions: usize) -> Quiz {
        Quiz {
            id: format!("quiz-{categories}x{questions}"),
            title: "Test Quiz".to_string(),
            description: String::new(),
            categories: (0..categories)
                .map(|c| Category {
                    name: format!("Category {c}"),
                    questions: (0..questions)
                        .map(|q| Question {
                            text: format!("Question {c}-{q}"),
                            answer: format!("Answer {c}-{q}"),
                            points: 100 * (q as i64 + 1),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// A waiting room created by "Alice" (id 1, host_player) with `names`
    /// joined after her as players with ids 2, 3, ...
    pub fn waiting_session(names: &[&str]) -> Session {
        let mut session = Session::new(
            "TEST01".to_string(),
            "quiz".to_string(),
            1,
            "Alice",
            SeatPolicy::default(),
        )
        .expect("valid creator nickname");
        for (i, name) in names.iter().enumerate() {
            session
                .join(i as u64 + 2, name)
                .expect("test join should succeed");
        }
        debug_assert!(
            session
                .players
                .iter()
                .skip(1)
                .all(|p| p.role == PlayerRole::Player)
        );
        session
    }

    /// [`waiting_session`] already started against `quiz`. Alice holds the
    /// first turn.
    pub fn started_session(quiz: &Quiz, names: &[&str]) -> Session {
        let mut session = waiting_session(names);
        session.quiz_id = quiz.id.clone();
        session
            .start_game(quiz, 1)
            .expect("test start should succeed");
        session
    }
}
