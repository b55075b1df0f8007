use serde::{Deserialize, Serialize};

use crate::domain::listing::ListingStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Owner,
    Reviewer,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Reviewer => "reviewer",
        }
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub current: ListingStatus,
    pub requested: ListingStatus,
    pub actor: ActorKind,
    pub has_modified_attachments: bool,
}

impl TransitionRequest {
    pub fn new(current: ListingStatus, requested: ListingStatus, actor: ActorKind) -> Self {
        Self { current, requested, actor, has_modified_attachments: false }
    }

    pub fn with_modified_attachments(mut self, modified: bool) -> Self {
        self.has_modified_attachments = modified;
        self
    }
}

/// Status-gated operations outside the per-actor transition tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectOperation {
    Unpublish,
    Republish,
    Reserve,
    Unreserve,
    Sell,
    Recover,
    Pending,
    Cancel,
    MoveToBin,
    Publish,
}

impl DirectOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpublish => "unpublish",
            Self::Republish => "republish",
            Self::Reserve => "reserve",
            Self::Unreserve => "unreserve",
            Self::Sell => "sell",
            Self::Recover => "recover",
            Self::Pending => "pending",
            Self::Cancel => "cancel",
            Self::MoveToBin => "move_to_bin",
            Self::Publish => "publish",
        }
    }

    pub fn allowed_from(&self) -> &'static [ListingStatus] {
        use ListingStatus::*;

        match self {
            Self::Unpublish => &[Published, PendingEditApproval, NeedAction],
            Self::Republish => &[Expired],
            Self::Reserve => &[Published, PendingEditApproval, NeedAction, Expired],
            Self::Unreserve => &[Reserved],
            Self::Sell => &[Published, Reserved, PendingEditApproval, NeedAction, Expired],
            Self::Recover => &[Deleted],
            Self::Pending => &[Draft],
            Self::Cancel => &[PendingApproval, ActionRequired, PendingEditApproval, NeedAction],
            Self::MoveToBin => &[Draft, PendingApproval, ActionRequired],
            Self::Publish => &[PendingApproval, PendingEditApproval],
        }
    }

    pub fn target(&self) -> ListingStatus {
        match self {
            Self::Unpublish | Self::Recover | Self::Cancel => ListingStatus::Draft,
            Self::Republish | Self::Unreserve | Self::Publish => ListingStatus::Published,
            Self::Reserve => ListingStatus::Reserved,
            Self::Sell => ListingStatus::SoldOut,
            Self::Pending => ListingStatus::PendingApproval,
            Self::MoveToBin => ListingStatus::Deleted,
        }
    }

    pub fn actor(&self) -> ActorKind {
        match self {
            Self::Publish => ActorKind::Reviewer,
            _ => ActorKind::Owner,
        }
    }
}

/// Side effects the caller must apply together with an accepted status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionEffect {
    CheckPostLimit,
    StampSubmitted,
    StampPublished,
    StampRejected,
    StampReserved,
    ClearReserved,
    StampSold,
    StampDumped,
    ClearDumped,
    ClearPublishMetadata,
    RemoveBookmarks,
    ActivateIntents,
    RefundIntents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ListingStatus,
    pub to: ListingStatus,
    pub actor: ActorKind,
    pub effects: Vec<TransitionEffect>,
}

impl TransitionOutcome {
    pub fn has_effect(&self, effect: TransitionEffect) -> bool {
        self.effects.contains(&effect)
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.effects.is_empty()
    }
}
