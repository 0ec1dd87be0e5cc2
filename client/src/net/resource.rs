//! Collection metadata for the generic CRUD calls in [`super::api`].
//!
//! Each record type names its collection path and its create/patch bodies,
//! so `ApiClient::list::<Ticket>` and friends need no per-resource code.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::*;

/// A record type served under `/api/<PATH>`.
pub trait Resource: DeserializeOwned + Send + 'static {
    /// Collection segment, e.g. `tickets`.
    const PATH: &'static str;
    /// Blocked for non-GET calls while the demo flag is set.
    const DEMO_LOCKED: bool = false;
    /// Body accepted by `POST /api/<PATH>`.
    type New: Serialize + Sync;
}

/// A resource that accepts `PATCH /api/<PATH>/{id}`.
pub trait Updatable: Resource {
    type Patch: Serialize + Sync;
}

macro_rules! resource {
    ($ty:ty, $path:literal, $new:ty, $patch:ty) => {
        resource!($ty, $path, $new, $patch, false);
    };
    ($ty:ty, $path:literal, $new:ty, $patch:ty, $locked:literal) => {
        impl Resource for $ty {
            const PATH: &'static str = $path;
            const DEMO_LOCKED: bool = $locked;
            type New = $new;
        }

        impl Updatable for $ty {
            type Patch = $patch;
        }
    };
}

resource!(Ticket, "tickets", NewTicket, TicketPatch);
resource!(Comment, "comments", NewComment, CommentPatch);
resource!(Task, "tasks", NewTask, TaskPatch);
resource!(TimelineItem, "timeline", NewTimelineItem, TimelinePatch);
resource!(Link, "links", NewLink, LinkPatch);
resource!(File, "files", NewFile, FilePatch, true);
resource!(TicketType, "types", NewTicketType, TicketTypePatch);
resource!(User, "users", NewUser, UserPatch, true);
resource!(Group, "groups", NewGroup, GroupPatch, true);
resource!(Reaction, "reactions", NewReaction, ReactionPatch, true);
resource!(Webhook, "webhooks", NewWebhook, WebhookPatch, true);
resource!(Template, "templates", NewTemplate, TemplatePatch);

/// Jobs are started and read, never patched.
impl Resource for Job {
    const PATH: &'static str = "jobs";
    type New = JobForm;
}
