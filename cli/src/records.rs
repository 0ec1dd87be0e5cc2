//! Record CRUD commands shared by every collection, plus the ticket and job
//! commands that need more than CRUD.

use clap::{Args, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use client::format::human_size;
use client::net::resource::{Resource, Updatable};
use client::net::types::{File, Job, NewTicket, Ticket, TicketPatch, TicketType};
use client::schema::validate_state;
use client::toast::Toast;
use client::{ListFilter, SearchFilter};

use crate::{CliError, Session, announce, print_json, read_json, require_token, sync_app_config};

#[derive(Args, Debug)]
pub(crate) struct RecordCommand {
    #[command(subcommand)]
    pub(crate) command: RecordSubcommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum RecordSubcommand {
    List {
        /// Only records belonging to this ticket.
        #[arg(long)]
        ticket: Option<String>,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
    Get {
        id: String,
    },
    Create {
        #[arg(long, help = "Record JSON, or - for stdin")]
        data: String,
    },
    Update {
        id: String,
        #[arg(long, help = "Patch JSON, or - for stdin")]
        data: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
pub(crate) struct TicketCommand {
    #[command(subcommand)]
    pub(crate) command: TicketSubcommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum TicketSubcommand {
    #[command(flatten)]
    Record(RecordSubcommand),
    /// Search tickets with an optional CAQL filter.
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        open: Option<bool>,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// List a ticket's files with readable sizes.
    Files {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum JobSubcommand {
    List {
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
    Get {
        id: String,
    },
    /// Start an automation run.
    Run {
        automation: String,
        #[arg(long, default_value = "null", help = "Payload JSON, or - for stdin")]
        payload: String,
    },
}

/// Generic CRUD for one collection.
pub(crate) async fn run<R>(session: &mut Session, command: RecordSubcommand) -> Result<(), CliError>
where
    R: Updatable + Serialize,
    R::New: DeserializeOwned,
    R::Patch: DeserializeOwned,
{
    require_token(session)?;
    match command {
        RecordSubcommand::List { ticket, offset, limit } => {
            let filter = ListFilter { offset, limit, ticket };
            print_json(&session.api.list::<R>(&filter).await?)
        }
        RecordSubcommand::Get { id } => print_json(&session.api.get::<R>(&id).await?),
        RecordSubcommand::Create { data } => create::<R>(session, &read_json(&data)?).await,
        RecordSubcommand::Update { id, data } => update::<R>(session, &id, &read_json(&data)?).await,
        RecordSubcommand::Delete { id } => {
            sync_app_config(session).await?;
            session.api.delete::<R>(&id).await?;
            announce(&Toast::success(format!("Deleted {}/{id}", R::PATH)));
            Ok(())
        }
    }
}

async fn create<R>(session: &mut Session, new: &R::New) -> Result<(), CliError>
where
    R: Resource + Serialize,
{
    sync_app_config(session).await?;
    let created = session.api.create::<R>(new).await?;
    print_json(&created)?;
    announce(&Toast::success(format!("Created {} record", R::PATH)));
    Ok(())
}

async fn update<R>(session: &mut Session, id: &str, patch: &R::Patch) -> Result<(), CliError>
where
    R: Updatable + Serialize,
{
    sync_app_config(session).await?;
    let updated = session.api.update::<R>(id, patch).await?;
    print_json(&updated)?;
    announce(&Toast::success(format!("Updated {}/{id}", R::PATH)));
    Ok(())
}

pub(crate) async fn run_ticket(session: &mut Session, command: TicketSubcommand) -> Result<(), CliError> {
    match command {
        TicketSubcommand::Record(RecordSubcommand::Create { data }) => {
            let new: NewTicket = read_json(&data)?;
            require_token(session)?;
            check_state(session, &new.kind, &new.state).await?;
            create::<Ticket>(session, &new).await
        }
        TicketSubcommand::Record(RecordSubcommand::Update { id, data }) => {
            let patch: TicketPatch = read_json(&data)?;
            require_token(session)?;
            if let Some(state) = &patch.state {
                let kind = match &patch.kind {
                    Some(kind) => kind.clone(),
                    None => require_token(session)?.get::<Ticket>(&id).await?.kind,
                };
                check_state(session, &kind, state).await?;
            }
            update::<Ticket>(session, &id, &patch).await
        }
        TicketSubcommand::Record(other) => run::<Ticket>(session, other).await,
        TicketSubcommand::Search {
            query,
            kind,
            open,
            offset,
            limit,
        } => {
            let filter = SearchFilter {
                query,
                kind,
                open,
                offset,
                limit,
            };
            print_json(&require_token(session)?.search_tickets(&filter).await?)
        }
        TicketSubcommand::Files { id } => {
            let page = require_token(session)?
                .list::<File>(&ListFilter::for_ticket(&id))
                .await?;
            for file in page.items {
                println!("{}\t{}\t{}", file.id, human_size(file.size), file.name);
            }
            Ok(())
        }
    }
}

/// Reject ticket state that does not fit the type's schema before sending.
async fn check_state(session: &Session, kind: &str, state: &Value) -> Result<(), CliError> {
    let ticket_type = require_token(session)?.get::<TicketType>(kind).await?;
    validate_state(&ticket_type.schema, state).map_err(|errors| CliError::Schema {
        kind: kind.to_owned(),
        details: errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    })
}

pub(crate) async fn run_job(session: &mut Session, command: JobSubcommand) -> Result<(), CliError> {
    let api = require_token(session)?;
    match command {
        JobSubcommand::List { offset, limit } => {
            let filter = ListFilter {
                offset,
                limit,
                ticket: None,
            };
            print_json(&api.list::<Job>(&filter).await?)
        }
        JobSubcommand::Get { id } => print_json(&api.get::<Job>(&id).await?),
        JobSubcommand::Run { automation, payload } => {
            let payload: Value = read_json(&payload)?;
            let job = api.run_job(&automation, payload).await?;
            print_json(&job)?;
            announce(&Toast::success(format!("Started job {}", job.id)));
            Ok(())
        }
    }
}
