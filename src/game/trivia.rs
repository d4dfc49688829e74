//! Trivia questions that gate extra bombs

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::ws::protocol::ServerMsg;

/// One bank entry: a prompt with one correct and two wrong answers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    #[serde(rename = "Question")]
    pub prompt: String,
    #[serde(rename = "Correct")]
    pub correct: String,
    #[serde(rename = "Alt1")]
    pub alt1: String,
    #[serde(rename = "Alt2")]
    pub alt2: String,
}

/// Immutable question bank, loaded once at startup
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self, TriviaError> {
        if questions.is_empty() {
            return Err(TriviaError::Empty);
        }
        Ok(Self { questions })
    }

    /// Load a JSON array of questions
    pub fn load(path: &Path) -> Result<Self, TriviaError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TriviaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let questions: Vec<Question> =
            serde_json::from_str(&raw).map_err(|source| TriviaError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let bank = Self::new(questions)?;
        info!(path = %path.display(), questions = bank.len(), "Loaded question bank");
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Alt1,
    Alt2,
    Correct,
}

/// The six orderings of the three answers
const ORDERINGS: [[Slot; 3]; 6] = [
    [Slot::Alt1, Slot::Alt2, Slot::Correct],
    [Slot::Alt1, Slot::Correct, Slot::Alt2],
    [Slot::Alt2, Slot::Alt1, Slot::Correct],
    [Slot::Alt2, Slot::Correct, Slot::Alt1],
    [Slot::Correct, Slot::Alt1, Slot::Alt2],
    [Slot::Correct, Slot::Alt2, Slot::Alt1],
];

/// A question as it was put to the players
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskedQuestion {
    pub prompt: String,
    pub choices: [String; 3],
    /// 1-based position of the correct answer in `choices`
    pub correct: u8,
}

/// Asks questions and holds the single round-wide expected answer
pub struct TriviaGate {
    bank: QuestionBank,
    expected: Option<u8>,
    outbound_tx: broadcast::Sender<ServerMsg>,
}

impl TriviaGate {
    pub fn new(bank: QuestionBank, outbound_tx: broadcast::Sender<ServerMsg>) -> Self {
        Self {
            bank,
            expected: None,
            outbound_tx,
        }
    }

    /// Pick a question, shuffle its answers, broadcast it to every controller
    /// and make its correct position the expected answer.
    pub fn ask_question<R: Rng + ?Sized>(&mut self, rng: &mut R) -> AskedQuestion {
        let question = &self.bank.questions[rng.gen_range(0..self.bank.questions.len())];
        let ordering = ORDERINGS[rng.gen_range(0..ORDERINGS.len())];

        let pick = |slot: Slot| match slot {
            Slot::Alt1 => question.alt1.clone(),
            Slot::Alt2 => question.alt2.clone(),
            Slot::Correct => question.correct.clone(),
        };
        let correct = ordering
            .iter()
            .position(|slot| matches!(slot, Slot::Correct))
            .map_or(1, |idx| idx as u8 + 1);

        let asked = AskedQuestion {
            prompt: question.prompt.clone(),
            choices: ordering.map(pick),
            correct,
        };
        self.expected = Some(correct);

        let receivers = self
            .outbound_tx
            .send(ServerMsg::Question {
                prompt: asked.prompt.clone(),
                choices: asked.choices.clone(),
            })
            .unwrap_or(0);
        debug!(receivers, prompt = %asked.prompt, "Trivia question broadcast");

        asked
    }

    /// Compare a submitted answer with the expected one.
    /// `None` until the first question has been asked.
    pub fn check(&self, submitted: &str) -> Option<bool> {
        self.expected
            .map(|expected| submitted.trim() == expected.to_string())
    }

    pub fn expected(&self) -> Option<u8> {
        self.expected
    }
}

/// Question bank errors
#[derive(Debug, thiserror::Error)]
pub enum TriviaError {
    #[error("failed to read question bank {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse question bank {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("question bank is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bank() -> QuestionBank {
        let raw = r#"[
            {"Question": "Capital of France?", "Correct": "Paris", "Alt1": "Lyon", "Alt2": "Nice"},
            {"Question": "2 + 2?", "Correct": "4", "Alt1": "3", "Alt2": "5"},
            {"Question": "Largest planet?", "Correct": "Jupiter", "Alt1": "Mars", "Alt2": "Venus"}
        ]"#;
        QuestionBank::new(serde_json::from_str(raw).unwrap()).unwrap()
    }

    #[test]
    fn correct_position_points_at_correct_answer() {
        let bank = bank();
        let (tx, _rx) = broadcast::channel(16);
        let mut gate = TriviaGate::new(bank.clone(), tx);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen_positions = [false; 3];

        for _ in 0..200 {
            let asked = gate.ask_question(&mut rng);
            assert!((1..=3).contains(&asked.correct));
            seen_positions[asked.correct as usize - 1] = true;

            let source = bank
                .questions
                .iter()
                .find(|q| q.prompt == asked.prompt)
                .unwrap();
            assert_eq!(asked.choices[asked.correct as usize - 1], source.correct);
            let mut shown = asked.choices.to_vec();
            shown.sort();
            let mut expected = vec![source.correct.clone(), source.alt1.clone(), source.alt2.clone()];
            expected.sort();
            assert_eq!(shown, expected);
            assert_eq!(gate.expected(), Some(asked.correct));
        }

        assert_eq!(seen_positions, [true; 3]);
    }

    #[test]
    fn question_is_broadcast_to_controllers() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut gate = TriviaGate::new(bank(), tx);
        let asked = gate.ask_question(&mut ChaCha8Rng::seed_from_u64(1));

        let msg = rx.try_recv().unwrap();
        assert_eq!(
            msg,
            ServerMsg::Question {
                prompt: asked.prompt,
                choices: asked.choices,
            }
        );
    }

    #[test]
    fn answer_check_is_shared_and_replaced() {
        let (tx, _rx) = broadcast::channel(16);
        let mut gate = TriviaGate::new(bank(), tx);
        assert_eq!(gate.check("1"), None);

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let first = gate.ask_question(&mut rng);
        assert_eq!(gate.check(&first.correct.to_string()), Some(true));
        assert_eq!(gate.check(&format!(" {} ", first.correct)), Some(true));
        assert_eq!(gate.check("4"), Some(false));

        let second = gate.ask_question(&mut rng);
        assert_eq!(gate.check(&second.correct.to_string()), Some(true));
    }

    #[test]
    fn asking_without_listeners_is_fine() {
        let (tx, rx) = broadcast::channel(1);
        drop(rx);
        let mut gate = TriviaGate::new(bank(), tx);
        let asked = gate.ask_question(&mut ChaCha8Rng::seed_from_u64(2));
        assert!((1..=3).contains(&asked.correct));
    }

    #[test]
    fn empty_bank_is_rejected() {
        assert!(matches!(QuestionBank::new(Vec::new()), Err(TriviaError::Empty)));
        assert!(matches!(
            QuestionBank::load(Path::new("/definitely/not/here.json")),
            Err(TriviaError::Read { .. })
        ));
    }
}
