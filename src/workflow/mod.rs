pub mod clue_flow;
pub mod curate;
pub mod generate;
pub mod prompt;

pub use clue_flow::{ClueFlow, WORDS_COLLECTION};
pub use curate::{load_curation_items, CurateClues};
pub use generate::GenerateClues;
