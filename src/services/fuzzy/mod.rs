//! Fuzzy entity resolution.
//!
//! Turns an imprecise mention into scored graph records through a cascade of
//! increasingly expensive strategies, then folds the records into the
//! response shape clients consume.
//!
//! | Stage | Score | Match type |
//! |-------|-------|------------|
//! | exact name | 1.0 | `exact` |
//! | substring | 0.8 | `contains` |
//! | edit distance | similarity | `edit_distance` |
//! | pinyin | pinyin similarity | `pinyin` |

mod assembler;
mod phonetic;
mod ranker;
mod resolver;
mod similarity;

pub use assembler::ResultAssembler;
pub use phonetic::{phonetic_similarity, syllable, to_phonetic};
pub use ranker::{CandidateRanker, RankerConfig};
pub use resolver::{FuzzyResolver, ResolverConfig};
pub use similarity::{edit_distance, similarity};
