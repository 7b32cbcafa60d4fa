pub mod board;
pub mod loaders;
pub mod outcome;
pub mod word;

pub use board::{BoardChunk, BoardState, BoardWordCell, GameStatus};
pub use loaders::{load_word_list, parse_word_list};
pub use outcome::{BatchRunSummary, CallOutcome, FailureKind, SuccessPayload};
pub use word::{PersistedWord, WorkItem};
