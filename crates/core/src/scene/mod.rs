//! Canonical scene keys: title normalization and release grouping.

mod grouper;
mod normalizer;

pub use grouper::{
    group_releases, SceneGroup, MIN_GROUPABLE_LEN, MIN_LEN_RATIO, MIN_PREFIX_LEN,
};
pub use normalizer::{CleanRule, TitleNormalizer};
