use crate::audit;
use crate::domain::request::{Actor, ActorRole, CommentEntry, HistoryEntry, RequestStatus};
use crate::errors::DomainError;

/// Outcome of an accepted status change: the new status plus the audit
/// entries to append alongside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionDecision {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub history: HistoryEntry,
    pub comment: Option<CommentEntry>,
}

/// Tunable enforcement knobs for the engine.
///
/// Role gating is off by default: the observed contract lets any
/// authenticated caller set any status, and the stricter policy is an open
/// product question. Flipping `gate_roles` enables the per-target role
/// table without changing the engine's call shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionPolicy {
    pub gate_roles: bool,
}

/// Decides whether a requested status change is legal. Pure and stateless;
/// persistence of the decision belongs to the store.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitionEngine {
    policy: TransitionPolicy,
}

impl TransitionEngine {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self { policy }
    }

    /// Statuses reachable from `current`. Any non-terminal state may move
    /// to any other state in the enumerated set; terminal states reach
    /// nothing.
    pub fn allowed_targets(current: RequestStatus) -> &'static [RequestStatus] {
        use RequestStatus::{
            ApprovedCeo, ApprovedManager, Pending, RejectedCeo, RejectedManager, UnderReview,
        };

        match current {
            Pending => {
                &[UnderReview, ApprovedManager, RejectedManager, ApprovedCeo, RejectedCeo]
            }
            UnderReview => {
                &[Pending, ApprovedManager, RejectedManager, ApprovedCeo, RejectedCeo]
            }
            ApprovedManager | RejectedManager | ApprovedCeo | RejectedCeo => &[],
        }
    }

    /// Roles permitted to set `target`, or `None` when any role may.
    pub fn allowed_roles(target: RequestStatus) -> Option<&'static [ActorRole]> {
        use ActorRole::{Admin, Ceo, Manager};

        match target {
            RequestStatus::ApprovedManager | RequestStatus::RejectedManager => {
                Some(&[Manager, Admin])
            }
            RequestStatus::ApprovedCeo | RequestStatus::RejectedCeo => Some(&[Ceo, Admin]),
            RequestStatus::Pending | RequestStatus::UnderReview => None,
        }
    }

    /// Validates `current -> target` for `actor` and, if legal, synthesizes
    /// the history entry (and comment entry, when a comment accompanies the
    /// change) to append. Rejections cause no mutation anywhere.
    pub fn decide(
        &self,
        current: RequestStatus,
        target: RequestStatus,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<TransitionDecision, DomainError> {
        if target == current {
            return Err(DomainError::NoOpTransition { status: current });
        }
        if current.is_terminal() {
            return Err(DomainError::InvalidTransition { from: current, to: target });
        }
        if self.policy.gate_roles {
            if let Some(roles) = Self::allowed_roles(target) {
                if !roles.contains(&actor.role) {
                    return Err(DomainError::RoleDenied {
                        role: actor.role.as_str().to_owned(),
                        target,
                    });
                }
            }
        }

        Ok(TransitionDecision {
            from: current,
            to: target,
            history: audit::status_entry(target, actor.name.clone()),
            comment: comment
                .map(|text| audit::comment_entry(actor.name.clone(), actor.role, text)),
        })
    }
}
