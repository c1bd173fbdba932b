//! crates/study_assistant_core/src/stores/study_cards.rs
//!
//! Flashcard decks and generated quizzes.
//!
//! Every deck's `card_count` equals the number of flashcards whose `deck_id`
//! points at it. Only `add_flashcards`, `delete_flashcard` and `delete_deck`
//! touch cards, and each of them adjusts the counter in the same step.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Persistor, QUIZ_RECORD};
use crate::domain::{
    now, CardContent, Deck, Flashcard, FlashcardEdit, Quiz, QuizQuestion, INITIAL_EASE_FACTOR,
};
use crate::ports::{PortError, PortResult, SnapshotStorage};

/// Persisted state of the deck and quiz store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizState {
    pub decks: Vec<Deck>,
    pub flashcards: Vec<Flashcard>,
    pub quizzes: Vec<Quiz>,
}

pub struct StudyCardStore {
    state: QuizState,
    persistor: Persistor,
}

impl StudyCardStore {
    /// Opens the store, loading the last saved snapshot if there is one.
    pub fn open(storage: Arc<dyn SnapshotStorage>) -> PortResult<Self> {
        let persistor = Persistor::new(storage, QUIZ_RECORD);
        let state = persistor.load()?;
        Ok(Self { state, persistor })
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn decks(&self) -> &[Deck] {
        &self.state.decks
    }

    pub fn deck(&self, id: Uuid) -> Option<&Deck> {
        self.state.decks.iter().find(|d| d.id == id)
    }

    pub fn flashcards(&self) -> &[Flashcard] {
        &self.state.flashcards
    }

    pub fn deck_flashcards(&self, deck_id: Uuid) -> Vec<&Flashcard> {
        self.state
            .flashcards
            .iter()
            .filter(|f| f.deck_id == deck_id)
            .collect()
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.state.quizzes
    }

    pub fn quiz(&self, id: Uuid) -> Option<&Quiz> {
        self.state.quizzes.iter().find(|q| q.id == id)
    }

    //-------------------------------------------------------------------------------------
    // Decks and flashcards
    //-------------------------------------------------------------------------------------

    pub fn create_deck(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> PortResult<Uuid> {
        let deck = Deck {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            created_at: now(),
            card_count: 0,
        };
        let id = self.persistor.commit(&mut self.state, |state| {
            let id = deck.id;
            state.decks.insert(0, deck);
            Ok(id)
        })?;
        debug!(deck_id = %id, "Deck created");
        Ok(id)
    }

    /// Removes a deck together with all of its flashcards.
    pub fn delete_deck(&mut self, id: Uuid) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let before = state.decks.len();
            state.decks.retain(|d| d.id != id);
            if state.decks.len() == before {
                return Err(PortError::NotFound(format!("Deck {}", id)));
            }
            state.flashcards.retain(|f| f.deck_id != id);
            Ok(())
        })?;
        debug!(deck_id = %id, "Deck deleted");
        Ok(())
    }

    /// Appends new cards to an existing deck and returns their ids.
    pub fn add_flashcards(
        &mut self,
        deck_id: Uuid,
        cards: Vec<CardContent>,
    ) -> PortResult<Vec<Uuid>> {
        let created_at = now();
        let new_cards: Vec<Flashcard> = cards
            .into_iter()
            .map(|card| Flashcard {
                id: Uuid::new_v4(),
                front: card.front,
                back: card.back,
                deck_id,
                created_at,
                next_review: created_at,
                interval: 0,
                ease_factor: INITIAL_EASE_FACTOR,
                repetitions: 0,
            })
            .collect();

        self.persistor.commit(&mut self.state, |state| {
            let deck = state
                .decks
                .iter_mut()
                .find(|d| d.id == deck_id)
                .ok_or_else(|| PortError::NotFound(format!("Deck {}", deck_id)))?;
            deck.card_count += new_cards.len();
            let ids = new_cards.iter().map(|f| f.id).collect();
            state.flashcards.extend(new_cards);
            Ok(ids)
        })
    }

    /// Rewrites the faces of a card. Deck membership and review fields are untouched.
    pub fn update_flashcard(&mut self, id: Uuid, edit: FlashcardEdit) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let card = state
                .flashcards
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| PortError::NotFound(format!("Flashcard {}", id)))?;
            if let Some(front) = edit.front {
                card.front = front;
            }
            if let Some(back) = edit.back {
                card.back = back;
            }
            Ok(())
        })
    }

    pub fn delete_flashcard(&mut self, id: Uuid) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let position = state
                .flashcards
                .iter()
                .position(|f| f.id == id)
                .ok_or_else(|| PortError::NotFound(format!("Flashcard {}", id)))?;
            let card = state.flashcards.remove(position);

            match state.decks.iter_mut().find(|d| d.id == card.deck_id) {
                Some(deck) => deck.card_count = deck.card_count.saturating_sub(1),
                None => warn!(
                    flashcard_id = %id,
                    deck_id = %card.deck_id,
                    "Deleted flashcard had no deck"
                ),
            }
            Ok(())
        })
    }

    //-------------------------------------------------------------------------------------
    // Quizzes
    //-------------------------------------------------------------------------------------

    /// Stores a quiz whose questions already carry their ids.
    pub fn create_quiz(
        &mut self,
        topic: impl Into<String>,
        questions: Vec<QuizQuestion>,
    ) -> PortResult<Uuid> {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            topic: topic.into(),
            questions,
            created_at: now(),
            score: None,
            completed_at: None,
        };
        let id = self.persistor.commit(&mut self.state, |state| {
            let id = quiz.id;
            state.quizzes.insert(0, quiz);
            Ok(id)
        })?;
        debug!(quiz_id = %id, "Quiz created");
        Ok(id)
    }

    /// Records the user's choice for one question. The index is not range-checked.
    /// A question that already has an answer keeps it.
    pub fn update_quiz_answer(
        &mut self,
        quiz_id: Uuid,
        question_id: Uuid,
        answer_index: usize,
    ) -> PortResult<()> {
        let existing = self
            .quiz(quiz_id)
            .ok_or_else(|| PortError::NotFound(format!("Quiz {}", quiz_id)))?
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| question_not_found(quiz_id, question_id))?
            .user_answer;
        if let Some(existing) = existing {
            debug!(
                %quiz_id,
                %question_id,
                existing,
                "Question already answered; keeping first answer"
            );
            return Ok(());
        }

        self.persistor.commit(&mut self.state, |state| {
            let question = quiz_mut(state, quiz_id)?
                .questions
                .iter_mut()
                .find(|q| q.id == question_id)
                .ok_or_else(|| question_not_found(quiz_id, question_id))?;
            question.user_answer = Some(answer_index);
            Ok(())
        })
    }

    /// Records a caller-computed score. Calling again overwrites score and timestamp.
    pub fn complete_quiz(&mut self, quiz_id: Uuid, score: u32) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let quiz = quiz_mut(state, quiz_id)?;
            quiz.score = Some(score);
            quiz.completed_at = Some(now());
            Ok(())
        })
    }

    pub fn delete_quiz(&mut self, id: Uuid) -> PortResult<()> {
        self.persistor.commit(&mut self.state, |state| {
            let before = state.quizzes.len();
            state.quizzes.retain(|q| q.id != id);
            if state.quizzes.len() == before {
                return Err(PortError::NotFound(format!("Quiz {}", id)));
            }
            Ok(())
        })
    }
}

fn quiz_mut(state: &mut QuizState, id: Uuid) -> PortResult<&mut Quiz> {
    state
        .quizzes
        .iter_mut()
        .find(|q| q.id == id)
        .ok_or_else(|| PortError::NotFound(format!("Quiz {}", id)))
}

fn question_not_found(quiz_id: Uuid, question_id: Uuid) -> PortError {
    PortError::NotFound(format!("Question {} in quiz {}", question_id, quiz_id))
}
