//! Capability resolution and the authorization seam.
//!
//! Default capability sets derive from a role/department pair through the pure
//! [`capabilities_for`] function; the workflow core only ever consults the
//! [`Authorizer`] trait, so role logic never leaks into transition code.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Actor roles known to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProductionManager,
    SalesRep,
    QualityInspector,
    Viewer,
}

/// Departments an actor can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Management,
    Production,
    Sales,
    Quality,
}

/// Actions the workflow core gates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReviewDeal,
    SendQuote,
    CounterOffer,
    AcceptQuote,
    RejectQuote,
    CancelDeal,
    UpdateStage,
    SubmitQuality,
    RevertStage,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ReviewDeal,
        Capability::SendQuote,
        Capability::CounterOffer,
        Capability::AcceptQuote,
        Capability::RejectQuote,
        Capability::CancelDeal,
        Capability::UpdateStage,
        Capability::SubmitQuality,
        Capability::RevertStage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ReviewDeal => "review_deal",
            Capability::SendQuote => "send_quote",
            Capability::CounterOffer => "counter_offer",
            Capability::AcceptQuote => "accept_quote",
            Capability::RejectQuote => "reject_quote",
            Capability::CancelDeal => "cancel_deal",
            Capability::UpdateStage => "update_stage",
            Capability::SubmitQuality => "submit_quality",
            Capability::RevertStage => "revert_stage",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved set of capabilities for one actor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(HashSet<Capability>);

impl CapabilitySet {
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn grant(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn revoke(&mut self, capability: Capability) {
        self.0.remove(&capability);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A per-actor adjustment applied on top of the role/department defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityOverride {
    pub capability: Capability,
    pub allowed: bool,
}

/// Resolve the capability set for a role/department pair plus explicit
/// per-actor overrides. Pure: same inputs, same set.
pub fn capabilities_for(
    role: Role,
    department: Department,
    overrides: &[CapabilityOverride],
) -> CapabilitySet {
    let mut set: CapabilitySet = match role {
        Role::Admin => Capability::ALL.into_iter().collect(),
        Role::SalesRep => [
            Capability::ReviewDeal,
            Capability::SendQuote,
            Capability::CounterOffer,
            Capability::AcceptQuote,
            Capability::RejectQuote,
            Capability::CancelDeal,
        ]
        .into_iter()
        .collect(),
        Role::ProductionManager => [
            Capability::UpdateStage,
            Capability::SubmitQuality,
            Capability::RevertStage,
        ]
        .into_iter()
        .collect(),
        Role::QualityInspector => [Capability::SubmitQuality].into_iter().collect(),
        Role::Viewer => CapabilitySet::default(),
    };

    // Department grants widen the defaults
    match department {
        Department::Production => set.grant(Capability::UpdateStage),
        Department::Quality => set.grant(Capability::SubmitQuality),
        Department::Management | Department::Sales => {}
    }

    // Explicit overrides win, in order
    for o in overrides {
        if o.allowed {
            set.grant(o.capability);
        } else {
            set.revoke(o.capability);
        }
    }

    set
}

/// The external authorization seam: a boolean capability check
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, actor_id: i64, capability: Capability, company_id: i64) -> bool;
}

/// One entry in the actor directory backing [`RoleAuthorizer`]
#[derive(Debug, Clone)]
pub struct ActorProfile {
    pub role: Role,
    pub department: Department,
    pub company_id: i64,
    pub overrides: Vec<CapabilityOverride>,
}

/// Authorizer backed by a static actor directory and [`capabilities_for`].
/// Actors act only within their own company; admins cross companies.
pub struct RoleAuthorizer {
    actors: HashMap<i64, ActorProfile>,
}

impl RoleAuthorizer {
    pub fn new(actors: HashMap<i64, ActorProfile>) -> Self {
        Self { actors }
    }
}

#[async_trait]
impl Authorizer for RoleAuthorizer {
    async fn authorize(&self, actor_id: i64, capability: Capability, company_id: i64) -> bool {
        let Some(profile) = self.actors.get(&actor_id) else {
            return false;
        };
        if profile.company_id != company_id && profile.role != Role::Admin {
            return false;
        }
        capabilities_for(profile.role, profile.department, &profile.overrides)
            .contains(capability)
    }
}

/// Grants everything. Test and wiring aid for contexts where permissions are
/// resolved upstream.
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _actor_id: i64, _capability: Capability, _company_id: i64) -> bool {
        true
    }
}
