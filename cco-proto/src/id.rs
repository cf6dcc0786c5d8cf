//! Typed identifiers.
//!
//! Every entity id in this crate is a thin wrapper around `String` rather
//! than a bare `String`, so a `WorkspaceId` can never be passed where a
//! `TaskId` is expected even though both are opaque strings at rest.

use std::fmt;

macro_rules! typed_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing opaque string as this id type.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

typed_id!(WorkspaceId, "Top-level container scoping threads, events, tasks, and timeline items.");
typed_id!(ThreadId, "A conversation slice within a workspace.");
typed_id!(ProjectId, "A project a workspace's activity may be assigned to.");
typed_id!(ProfileId, "The human account behind a turn; owns IntentCards.");
typed_id!(EventId, "Opaque, caller-assigned identifier for an Event Log entry.");
typed_id!(MessageId, "Identifier of the user turn that produced a Task, TimelineItem, or hook run.");
typed_id!(TaskId, "Identifier of a unit of work spawned by a plan.");
typed_id!(ExecutionId, "Opaque correlator between an ExecutionPlan's dispatch and the Task Store.");
typed_id!(TimelineItemId, "Identifier of a derived UI result card.");
typed_id!(PlanId, "Identifier of an ExecutionPlan.");
typed_id!(IntentCardId, "Identifier of a long-lived IntentCard.");
typed_id!(IntentSignalId, "Identifier of a transient IntentSignal.");
typed_id!(IntentLogId, "Identifier of an audit IntentLog entry.");
typed_id!(RunId, "Identifier correlating pipeline_stage events within one turn's stream.");
typed_id!(BackgroundJobId, "Identifier of a fire-and-forget turn dispatched through the Background Runner.");
