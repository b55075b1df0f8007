pub mod engine;
pub mod states;

pub use engine::{ensure_post_slot, owner_targets, reviewer_targets, LifecycleEngine, LifecycleError};
pub use states::{
    ActorKind, DirectOperation, TransitionEffect, TransitionOutcome, TransitionRequest,
};
