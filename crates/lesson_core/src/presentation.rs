//! crates/lesson_core/src/presentation.rs
//!
//! View state over one generated bundle: the slide deck, the interactive quiz,
//! the expandable Q&A list and the static puzzle section.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::backfill::BackfillReport;
use crate::domain::{ContentBundle, CrosswordEntry, LogicPuzzle, MiniGame, QaEntry, Question, Slide};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresentationError {
    #[error("The quiz has been scored; reset it to answer again")]
    QuizLocked,
    #[error("There is no question {0}")]
    QuestionOutOfRange(usize),
    #[error("There is no Q&A entry {0}")]
    QaOutOfRange(usize),
}

/// Which side of the slide the image sits on. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideLayout {
    ImageRight,
    ImageLeft,
}

impl SlideLayout {
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            SlideLayout::ImageRight
        } else {
            SlideLayout::ImageLeft
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
}

/// An answer matches when it equals the canonical one ignoring case and
/// surrounding whitespace, whatever the question kind.
pub fn answer_matches(given: &str, canonical: &str) -> bool {
    given.trim().to_lowercase() == canonical.trim().to_lowercase()
}

/// Counts correct answers; unanswered questions count as wrong.
pub fn score_quiz(questions: &[Question], answers: &BTreeMap<usize, String>) -> QuizScore {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(i, q)| answers.get(i).is_some_and(|a| answer_matches(a, &q.answer)))
        .count();
    QuizScore {
        correct,
        total: questions.len(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct QuizState {
    answers: BTreeMap<usize, String>,
    score: Option<QuizScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatus {
    pub generating: bool,
    pub quota_exceeded: bool,
    /// Slides carrying an image from the image model (placeholders excluded).
    pub generated: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideView<'a> {
    pub index: usize,
    pub layout: SlideLayout,
    #[serde(flatten)]
    pub slide: &'a Slide,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ancillary<'a> {
    pub crossword: &'a [CrosswordEntry],
    pub logic_puzzle: &'a LogicPuzzle,
    pub mini_game: &'a MiniGame,
}

#[derive(Debug, Clone, Serialize)]
pub struct QaView<'a> {
    pub index: usize,
    pub question: &'a str,
    /// Present only while the entry is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizView<'a> {
    pub questions: &'a [Question],
    pub answers: &'a BTreeMap<usize, String>,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<QuizScore>,
}

/// A serializable snapshot of everything the view shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationView<'a> {
    pub bundle_id: &'a str,
    pub subject: &'a str,
    pub topic: &'a str,
    pub slides: Vec<SlideView<'a>>,
    pub images: &'a ImageStatus,
    pub quiz: QuizView<'a>,
    pub qa: Vec<QaView<'a>>,
    pub ancillary: Ancillary<'a>,
}

#[derive(Debug, Clone)]
pub struct Presentation {
    bundle: ContentBundle,
    quiz: QuizState,
    open_qa: BTreeSet<usize>,
    images: ImageStatus,
}

impl Presentation {
    pub fn new(bundle: ContentBundle) -> Self {
        let mut presentation = Self {
            bundle,
            quiz: QuizState::default(),
            open_qa: BTreeSet::new(),
            images: ImageStatus::default(),
        };
        presentation.refresh_image_counts();
        presentation
    }

    pub fn bundle(&self) -> &ContentBundle {
        &self.bundle
    }

    pub fn image_status(&self) -> &ImageStatus {
        &self.images
    }

    // --- Slides ---

    pub fn slides(&self) -> Vec<SlideView<'_>> {
        self.bundle
            .presentation
            .iter()
            .enumerate()
            .map(|(index, slide)| SlideView {
                index,
                layout: SlideLayout::for_index(index),
                slide,
            })
            .collect()
    }

    /// True when at least one slide still wants an image.
    pub fn needs_images(&self) -> bool {
        self.bundle
            .presentation
            .iter()
            .any(|s| !s.has_image() && s.image_prompt.as_deref().is_some_and(|p| !p.trim().is_empty()))
    }

    pub fn begin_image_backfill(&mut self) {
        self.images.generating = true;
        self.images.quota_exceeded = false;
    }

    /// Installs the slides produced by a backfill run.
    pub fn finish_image_backfill(&mut self, slides: Vec<Slide>, report: &BackfillReport) {
        if slides.len() == self.bundle.presentation.len() {
            self.bundle.presentation = slides;
        }
        self.images.generating = false;
        self.images.quota_exceeded = report.quota_exceeded;
        self.refresh_image_counts();
    }

    fn refresh_image_counts(&mut self) {
        self.images.total = self.bundle.presentation.len();
        self.images.generated = self
            .bundle
            .presentation
            .iter()
            .filter(|s| s.has_generated_image())
            .count();
    }

    // --- Quiz ---

    pub fn answer(&mut self, question: usize, answer: &str) -> Result<(), PresentationError> {
        if self.quiz.score.is_some() {
            return Err(PresentationError::QuizLocked);
        }
        if question >= self.bundle.tests.len() {
            return Err(PresentationError::QuestionOutOfRange(question));
        }
        self.quiz.answers.insert(question, answer.to_string());
        Ok(())
    }

    /// Scores the current answers and locks the quiz until `reset_quiz`.
    pub fn submit_quiz(&mut self) -> QuizScore {
        let score = score_quiz(&self.bundle.tests, &self.quiz.answers);
        self.quiz.score = Some(score);
        score
    }

    pub fn reset_quiz(&mut self) {
        self.quiz = QuizState::default();
    }

    pub fn quiz_score(&self) -> Option<QuizScore> {
        self.quiz.score
    }

    pub fn is_quiz_locked(&self) -> bool {
        self.quiz.score.is_some()
    }

    // --- Q&A ---

    /// Flips one entry open or closed and returns whether it is now open.
    pub fn toggle_qa(&mut self, index: usize) -> Result<bool, PresentationError> {
        if index >= self.bundle.qa.len() {
            return Err(PresentationError::QaOutOfRange(index));
        }
        if self.open_qa.remove(&index) {
            Ok(false)
        } else {
            self.open_qa.insert(index);
            Ok(true)
        }
    }

    pub fn is_qa_open(&self, index: usize) -> bool {
        self.open_qa.contains(&index)
    }

    fn qa_views(&self) -> Vec<QaView<'_>> {
        self.bundle
            .qa
            .iter()
            .enumerate()
            .map(|(index, QaEntry { question, answer })| QaView {
                index,
                question,
                answer: self.is_qa_open(index).then_some(answer.as_str()),
            })
            .collect()
    }

    // --- Ancillary ---

    pub fn ancillary(&self) -> Ancillary<'_> {
        Ancillary {
            crossword: &self.bundle.crossword,
            logic_puzzle: &self.bundle.logic_puzzle,
            mini_game: &self.bundle.mini_game,
        }
    }

    pub fn view(&self) -> PresentationView<'_> {
        PresentationView {
            bundle_id: &self.bundle.id,
            subject: &self.bundle.subject,
            topic: &self.bundle.topic,
            slides: self.slides(),
            images: &self.images,
            quiz: QuizView {
                questions: &self.bundle.tests,
                answers: &self.quiz.answers,
                locked: self.is_quiz_locked(),
                score: self.quiz.score,
            },
            qa: self.qa_views(),
            ancillary: self.ancillary(),
        }
    }
}
