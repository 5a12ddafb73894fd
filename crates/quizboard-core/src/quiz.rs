use serde::{Deserialize, Serialize};

/// Identifier of a quiz in the external catalog.
pub type QuizId = String;

/// Read-only snapshot of a quiz as served by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub answer: String,
    pub points: i64,
}

/// Position of a question on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionRef {
    pub category_index: usize,
    pub question_index: usize,
}

impl QuestionRef {
    pub fn new(category_index: usize, question_index: usize) -> Self {
        Self {
            category_index,
            question_index,
        }
    }
}

impl Quiz {
    pub fn question(&self, at: QuestionRef) -> Option<&Question> {
        self.categories
            .get(at.category_index)?
            .questions
            .get(at.question_index)
    }

    pub fn total_questions(&self) -> usize {
        self.categories.iter().map(|c| c.questions.len()).sum()
    }

    /// The board as shown to every client: names and point values only.
    pub fn board(&self) -> QuizBoard {
        QuizBoard {
            id: self.id.clone(),
            title: self.title.clone(),
            categories: self
                .categories
                .iter()
                .map(|c| BoardCategory {
                    name: c.name.clone(),
                    points: c.questions.iter().map(|q| q.points).collect(),
                })
                .collect(),
        }
    }
}

/// Client-facing view of a quiz with question text and answers withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizBoard {
    pub id: QuizId,
    pub title: String,
    pub categories: Vec<BoardCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCategory {
    pub name: String,
    pub points: Vec<i64>,
}
