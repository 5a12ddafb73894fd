//! Read-only quiz catalog. Rooms hold an `Arc<Quiz>` snapshot taken at
//! creation, so nothing here is ever mutated after load.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quizboard_core::quiz::{Quiz, QuizId};

use crate::config::CatalogConfig;

const SAMPLE_CATALOG: &str = include_str!("../quizzes/sample.toml");

/// Source of quiz snapshots.
pub trait QuizCatalog: Send + Sync {
    fn get(&self, id: &str) -> Option<Arc<Quiz>>;
    fn list(&self) -> Vec<QuizSummary>;
}

/// Listing entry for `GET /api/v1/quizzes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: QuizId,
    pub title: String,
    pub description: String,
    pub categories: usize,
    pub questions: usize,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            categories: quiz.categories.len(),
            questions: quiz.total_questions(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate quiz id {0:?}")]
    DuplicateId(QuizId),
    #[error("quiz {0:?} has no questions")]
    Empty(QuizId),
    #[error("quiz {id:?} category {category:?} has a question worth {points} points")]
    BadPoints {
        id: QuizId,
        category: String,
        points: i64,
    },
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    quizzes: Vec<Quiz>,
}

/// Catalog held entirely in memory, keyed by quiz id.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    quizzes: BTreeMap<QuizId, Arc<Quiz>>,
}

impl InMemoryCatalog {
    pub fn from_quizzes(quizzes: Vec<Quiz>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for quiz in quizzes {
            validate_quiz(&quiz)?;
            if map.contains_key(&quiz.id) {
                return Err(CatalogError::DuplicateId(quiz.id));
            }
            map.insert(quiz.id.clone(), Arc::new(quiz));
        }
        Ok(Self { quizzes: map })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_quizzes(file.quizzes)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// The catalog bundled with the binary.
    pub fn sample() -> Result<Self, CatalogError> {
        Self::from_toml_str(SAMPLE_CATALOG)
    }

    /// Load the configured catalog file, or the bundled sample without one.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let catalog = match &config.path {
            Some(path) => Self::load(Path::new(path))?,
            None => Self::sample()?,
        };
        tracing::info!(
            quizzes = catalog.len(),
            source = config.path.as_deref().unwrap_or("built-in"),
            "Quiz catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }
}

impl QuizCatalog for InMemoryCatalog {
    fn get(&self, id: &str) -> Option<Arc<Quiz>> {
        self.quizzes.get(id).cloned()
    }

    fn list(&self) -> Vec<QuizSummary> {
        self.quizzes.values().map(|q| QuizSummary::from(&**q)).collect()
    }
}

fn validate_quiz(quiz: &Quiz) -> Result<(), CatalogError> {
    if quiz.total_questions() == 0 {
        return Err(CatalogError::Empty(quiz.id.clone()));
    }
    for category in &quiz.categories {
        if let Some(q) = category.questions.iter().find(|q| q.points <= 0) {
            return Err(CatalogError::BadPoints {
                id: quiz.id.clone(),
                category: category.name.clone(),
                points: q.points,
            });
        }
    }
    Ok(())
}
