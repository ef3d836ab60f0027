//! Entity linking: mention → canonical company
//!
//! - `normalize`: text folding shared by every comparison
//! - `index`: the known-entity catalog and its lookup indexes
//! - `mention`: literal name spans inside an utterance
//! - `descriptor`: descriptive references ("the cloud company")
//! - `resolver`: the `EntityNormalizer` tying them together

pub mod descriptor;
pub mod index;
pub mod mention;
pub mod normalize;
pub mod resolver;

pub use descriptor::{Descriptor, DescriptorTable};
pub use index::{EntityId, EntityIndex, EntityRecord};
pub use mention::{MentionExtractor, MentionSpan};
pub use resolver::{Candidate, EntityNormalizer, Resolution, ResolutionMethod};
