mod definition;
mod ids;
mod item;
mod sequence;
mod session;

pub use definition::{
    validate_weights, BlendDefinition, CreateBlendDefinition, PlaybackOrder, PoolWeight,
    RepeatMode, ScheduledReweight, MAX_CROSSFADE_SECONDS, WEIGHT_TOLERANCE,
};
pub use ids::{BlendId, PoolId, SequenceId, SessionId, SessionItemId, TrackId, UserId};
pub use item::{DrawnItem, ProviderItem, SessionItem, SessionTrack, UNKNOWN_POOL_NAME};
pub use sequence::{CreateSequence, Sequence, SequenceStage, MAX_STAGE_MINUTES};
pub use session::{PlaybackSession, SequenceLink, StageTransition};
