use super::{Action, AuthError, Role};
use crate::common::entity_ids::AccountId;
use serde::{Deserialize, Serialize};

/// The authenticated caller, as resolved from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
}

impl Principal {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    /// Start an authorization check for this principal
    pub fn actor(&self) -> Actor {
        Actor::new(self.account_id, self.role)
    }
}

/// Outcome of the authorization gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The authorization gate.
///
/// Pure policy over `(actor, role, action, resource owner)`. Every mutating
/// operation in the core goes through here before touching the store.
pub fn authorize(
    actor: AccountId,
    role: Role,
    action: Action,
    resource_owner: Option<AccountId>,
) -> Decision {
    let owns = resource_owner == Some(actor);

    match action {
        Action::ReviewListing | Action::ManageReconciliation => match role {
            Role::Admin => Decision::Allow,
            _ => Decision::Deny("admin access required"),
        },
        Action::SubmitListing => match role {
            Role::Seller => Decision::Allow,
            _ => Decision::Deny("only sellers can list domains"),
        },
        Action::SubmitDraft => match (role, owns) {
            (Role::Seller, true) => Decision::Allow,
            _ => Decision::Deny("only the listing owner can submit a draft"),
        },
        Action::DelistListing => match (role, owns) {
            (Role::Admin, _) | (_, true) => Decision::Allow,
            _ => Decision::Deny("only the owner or an admin can delist"),
        },
        Action::PurchaseListing => match (role, owns) {
            (Role::Admin, _) => Decision::Deny("admins cannot purchase listings"),
            (_, true) => Decision::Deny("cannot purchase your own listing"),
            _ => Decision::Allow,
        },
        Action::CompletePurchase => match owns {
            true => Decision::Allow,
            false => Decision::Deny("only the buyer can complete a purchase"),
        },
        Action::ViewPurchase | Action::ViewWallet => match (role, owns) {
            (Role::Admin, _) | (_, true) => Decision::Allow,
            _ => Decision::Deny("not visible to this account"),
        },
    }
}

/// Entry point for authorization checks
///
/// Usage:
/// ```text
/// Actor::new(account_id, Role::Seller)
///     .can(Action::DelistListing)
///     .on(listing.owner_id)
///     .check()?;
/// ```
pub struct Actor {
    actor_id: AccountId,
    role: Role,
}

impl Actor {
    pub fn new(actor_id: AccountId, role: Role) -> Self {
        Self { actor_id, role }
    }

    /// Specify what action the actor wants to perform
    pub fn can(self, action: Action) -> CapabilityBuilder {
        CapabilityBuilder {
            actor_id: self.actor_id,
            role: self.role,
            action,
            owner: None,
        }
    }
}

/// Builder after specifying the action
pub struct CapabilityBuilder {
    actor_id: AccountId,
    role: Role,
    action: Action,
    owner: Option<AccountId>,
}

impl CapabilityBuilder {
    /// The account that owns the resource being acted on
    pub fn on(mut self, owner: AccountId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn decide(&self) -> Decision {
        authorize(self.actor_id, self.role, self.action, self.owner)
    }

    /// Perform the authorization check
    pub fn check(self) -> Result<(), AuthError> {
        match self.decide() {
            Decision::Allow => Ok(()),
            Decision::Deny(_) if self.action.requires_admin() => Err(AuthError::AdminRequired),
            Decision::Deny(reason) => Err(AuthError::PermissionDenied(reason.to_string())),
        }
    }
}
