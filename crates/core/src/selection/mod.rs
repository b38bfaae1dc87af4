//! Release selection: quality-profile walks and discovery reporting.

mod discovery;
mod quality;

pub use discovery::{DiscoveryNotice, DiscoveryReporter};
pub use quality::{
    AnyLiteral, ProfileError, QualityProfile, QualityProfileItem, QualityProfileStore,
    QualitySelector, SeederRule, TagRule,
};
