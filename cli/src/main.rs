//! `catalyst`: command-line front end for a Catalyst server.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every command drives the same stores, guard and API bindings a browser
//! front end would. Results go to stdout as pretty JSON; confirmations and
//! failures go to stderr as toasts, so output can be piped into `jq`.
//!
//! ERROR HANDLING
//! ==============
//! Commands return `CliError`. `main` renders it as a destructive toast and
//! exits non-zero; it never panics on server or input errors.

mod records;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use client::error::{ApiError, RealtimeError, StorageError};
use client::net::types::{
    Comment, File, Group, Link, Reaction, Settings, Task, TicketType, TimelineItem, Template, User,
    Webhook,
};
use client::router::{Navigation, navigate};
use client::state::auth::AuthState;
use client::state::ui::UiState;
use client::storage::LocalStorage;
use client::toast::{Toast, ToastVariant};
use client::{ApiClient, ClientConfig, Invalidation, spawn_realtime};

use records::{JobSubcommand, RecordCommand, TicketCommand};

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
    #[error("not signed in; run `catalyst login` first")]
    NotSignedIn,
    #[error("realtime updates are disabled; unset CATALYST_REALTIME=false")]
    RealtimeDisabled,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid query: {0}")]
    Syntax(#[from] caql::SyntaxError),
    #[error("query evaluation failed: {0}")]
    Eval(#[from] caql::EvalError),
    #[error("ticket state does not match the `{kind}` schema: {details}")]
    Schema { kind: String, details: String },
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("could not load app config, refusing to modify data: {0}")]
    AppConfig(#[source] ApiError),
}

#[derive(Parser, Debug)]
#[command(name = "catalyst", version, about = "Catalyst ticketing API and realtime CLI")]
struct Cli {
    #[arg(long, env = "CATALYST_BASE_URL")]
    base_url: Option<String>,

    /// Session token; defaults to the one saved by `catalyst login`.
    #[arg(long, env = "CATALYST_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "CATALYST_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate, format or evaluate CAQL locally.
    Caql(CaqlCommand),
    #[command(flatten)]
    Session(SessionCommand),
}

impl Command {
    fn failure_title(&self) -> &'static str {
        match self {
            Self::Caql(_) => "Query failed",
            Self::Session(command) => command.failure_title(),
        }
    }
}

/// Commands that run against the configured server and local storage.
#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Sign in and save the session token.
    Login {
        #[arg(long, env = "CATALYST_EMAIL")]
        email: String,
        #[arg(long, env = "CATALYST_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the saved session token.
    Logout,
    Whoami,
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Server feature flags, permissions and tables.
    Config,
    Sidebar,
    Dashboard,
    /// Resolve a front-end path through the navigation guard.
    Route {
        path: String,
    },
    Ticket(TicketCommand),
    Comment(RecordCommand),
    Task(RecordCommand),
    Timeline(RecordCommand),
    Link(RecordCommand),
    File(RecordCommand),
    Type(RecordCommand),
    User(RecordCommand),
    Group(RecordCommand),
    Reaction(RecordCommand),
    Webhook(RecordCommand),
    Template(RecordCommand),
    Job(JobCommand),
    Members(MembersCommand),
    Settings(SettingsCommand),
    Ui(UiCommand),
    /// Stream realtime invalidations as JSON lines.
    Watch {
        /// Stop after this many invalidations.
        #[arg(long)]
        count: Option<usize>,
    },
}

impl SessionCommand {
    fn failure_title(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Login failed",
            Self::Logout => "Logout failed",
            Self::Whoami => "Failed to load user",
            Self::ResetPassword { .. } => "Failed to send reset mail",
            Self::Config | Self::Sidebar | Self::Dashboard => "Failed to load overview",
            Self::Route { .. } => "Navigation failed",
            Self::Ticket(_) => "Ticket request failed",
            Self::Comment(_) => "Comment request failed",
            Self::Task(_) => "Task request failed",
            Self::Timeline(_) => "Timeline request failed",
            Self::Link(_) => "Link request failed",
            Self::File(_) => "File request failed",
            Self::Type(_) => "Type request failed",
            Self::User(_) => "User request failed",
            Self::Group(_) => "Group request failed",
            Self::Reaction(_) => "Reaction request failed",
            Self::Webhook(_) => "Webhook request failed",
            Self::Template(_) => "Template request failed",
            Self::Job(_) => "Job request failed",
            Self::Members(_) => "Membership request failed",
            Self::Settings(_) => "Settings request failed",
            Self::Ui(_) => "Failed to save preferences",
            Self::Watch { .. } => "Realtime connection failed",
        }
    }
}

#[derive(Args, Debug)]
struct JobCommand {
    #[command(subcommand)]
    command: JobSubcommand,
}

#[derive(Args, Debug)]
struct MembersCommand {
    #[command(subcommand)]
    command: MembersSubcommand,
}

#[derive(Subcommand, Debug)]
enum MembersSubcommand {
    UserGroups { user: String },
    UserPermissions { user: String },
    GroupUsers { group: String },
    GroupParents { group: String },
    GroupChildren { group: String },
    GroupPermissions { group: String },
    Add { user: String, group: String },
    Remove { user: String, group: String },
    AddParent { group: String, parent: String },
    RemoveParent { group: String, parent: String },
}

#[derive(Args, Debug)]
struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SettingsSubcommand {
    Show,
    /// Replace the whole settings document.
    Update {
        #[arg(long, help = "Settings JSON, or - for stdin")]
        data: String,
    },
}

#[derive(Args, Debug)]
struct CaqlCommand {
    #[command(subcommand)]
    command: CaqlSubcommand,
}

#[derive(Subcommand, Debug)]
enum CaqlSubcommand {
    Validate { query: String },
    /// Print the query in canonical form.
    Format { query: String },
    Eval {
        query: String,
        #[arg(long, default_value = "{}", help = "Document JSON, or - for stdin")]
        doc: String,
    },
}

#[derive(Args, Debug)]
struct UiCommand {
    #[command(subcommand)]
    command: UiSubcommand,
}

#[derive(Subcommand, Debug)]
enum UiSubcommand {
    Show,
    ToggleSidebar,
}

/// Resolved configuration plus the durable store.
pub(crate) struct Session {
    pub(crate) api: ApiClient,
    pub(crate) storage: LocalStorage,
}

impl Session {
    /// Environment config overridden by command-line flags. An explicit
    /// token wins over the saved one.
    fn open(
        base_url: Option<String>,
        token: Option<String>,
        state_dir: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let mut config = ClientConfig::from_env();
        if let Some(base_url) = base_url {
            config.base_url = base_url.trim_end_matches('/').to_owned();
        }
        if let Some(state_dir) = state_dir {
            config.state_dir = Some(state_dir);
        }
        let storage = LocalStorage::open(&config)?;
        let mut api = ApiClient::new(config)?;
        api.set_token(token.or_else(|| storage.token()));
        Ok(Self { api, storage })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let title = cli.command.failure_title();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", failure_toast(title, &err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn failure_toast(title: &str, err: &CliError) -> Toast {
    match err {
        CliError::Api(api) => Toast::from_error(title, api),
        other => Toast {
            title: title.to_owned(),
            description: Some(other.to_string()),
            variant: ToastVariant::Destructive,
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Caql(caql) => run_caql(caql),
        Command::Session(command) => {
            let mut session = Session::open(cli.base_url, cli.token, cli.state_dir)?;
            run_session(&mut session, command).await
        }
    }
}

async fn run_session(session: &mut Session, command: SessionCommand) -> Result<(), CliError> {
    match command {
        SessionCommand::Login { email, password } => run_login(session, &email, &password).await,
        SessionCommand::Logout => run_logout(session),
        SessionCommand::Whoami => run_whoami(session).await,
        SessionCommand::ResetPassword { email } => {
            session.api.request_password_reset(&email).await?;
            announce(&Toast::success(format!("Password reset mail sent to {email}")));
            Ok(())
        }
        SessionCommand::Config => print_json(&session.api.app_config().await?),
        SessionCommand::Sidebar => print_json(&require_token(session)?.sidebar().await?),
        SessionCommand::Dashboard => print_json(&require_token(session)?.dashboard_counts().await?),
        SessionCommand::Route { path } => run_route(session, &path).await,
        SessionCommand::Ticket(ticket) => records::run_ticket(session, ticket.command).await,
        SessionCommand::Comment(cmd) => records::run::<Comment>(session, cmd.command).await,
        SessionCommand::Task(cmd) => records::run::<Task>(session, cmd.command).await,
        SessionCommand::Timeline(cmd) => records::run::<TimelineItem>(session, cmd.command).await,
        SessionCommand::Link(cmd) => records::run::<Link>(session, cmd.command).await,
        SessionCommand::File(cmd) => records::run::<File>(session, cmd.command).await,
        SessionCommand::Type(cmd) => records::run::<TicketType>(session, cmd.command).await,
        SessionCommand::User(cmd) => records::run::<User>(session, cmd.command).await,
        SessionCommand::Group(cmd) => records::run::<Group>(session, cmd.command).await,
        SessionCommand::Reaction(cmd) => records::run::<Reaction>(session, cmd.command).await,
        SessionCommand::Webhook(cmd) => records::run::<Webhook>(session, cmd.command).await,
        SessionCommand::Template(cmd) => records::run::<Template>(session, cmd.command).await,
        SessionCommand::Job(job) => records::run_job(session, job.command).await,
        SessionCommand::Members(members) => run_members(session, members.command).await,
        SessionCommand::Settings(settings) => run_settings(session, settings.command).await,
        SessionCommand::Ui(ui) => run_ui(session, ui.command),
        SessionCommand::Watch { count } => run_watch(session, count).await,
    }
}

// =============================================================================
// SESSION
// =============================================================================

async fn run_login(session: &mut Session, email: &str, password: &str) -> Result<(), CliError> {
    let token = session.api.login(email, password).await?;
    session.storage.set_token(Some(&token))?;
    session.api.set_token(Some(token.clone()));

    let mut auth = AuthState::default();
    auth.set_token(Some(token));
    auth.load_user(&session.api).await?;
    let name = auth.user.map_or_else(|| email.to_owned(), |u| u.username);
    announce(&Toast::success(format!("Signed in as {name}")));
    Ok(())
}

fn run_logout(session: &mut Session) -> Result<(), CliError> {
    session.storage.set_token(None)?;
    session.api.set_token(None);
    announce(&Toast::success("Signed out"));
    Ok(())
}

async fn run_whoami(session: &Session) -> Result<(), CliError> {
    let auth = load_auth(session).await?;
    if !auth.is_authenticated() {
        return Err(CliError::NotSignedIn);
    }
    print_json(&json!({"user": auth.user, "permissions": auth.permissions}))
}

async fn load_auth(session: &Session) -> Result<AuthState, CliError> {
    let mut auth = AuthState::default();
    auth.set_token(session.api.token().map(ToOwned::to_owned));
    auth.load_user(&session.api).await?;
    Ok(auth)
}

async fn run_route(session: &Session, path: &str) -> Result<(), CliError> {
    let auth = load_auth(session).await?;
    let outcome = match navigate(path, &auth) {
        Navigation::Render(route) => json!({"render": route.path()}),
        Navigation::Redirect(to) => json!({"redirect": to}),
    };
    print_json(&outcome)
}

pub(crate) fn require_token(session: &Session) -> Result<&ApiClient, CliError> {
    if session.api.token().is_none() {
        return Err(CliError::NotSignedIn);
    }
    Ok(&session.api)
}

/// Adopt the server's flags before a mutation so demo mode is honoured.
///
/// # Errors
///
/// `CliError::AppConfig` when the flags cannot be fetched; the mutation must
/// not run with an unknown demo state.
pub(crate) async fn sync_app_config(session: &mut Session) -> Result<(), CliError> {
    let config = session.api.app_config().await.map_err(|e| {
        warn!(error = %e, "could not load app config");
        CliError::AppConfig(e)
    })?;
    session.api.apply_app_config(&config);
    Ok(())
}

// =============================================================================
// MEMBERS & SETTINGS
// =============================================================================

async fn run_members(session: &mut Session, command: MembersSubcommand) -> Result<(), CliError> {
    require_token(session)?;
    let api = &session.api;
    match command {
        MembersSubcommand::UserGroups { user } => print_json(&api.user_groups(&user).await?),
        MembersSubcommand::UserPermissions { user } => print_json(&api.user_permissions(&user).await?),
        MembersSubcommand::GroupUsers { group } => print_json(&api.group_users(&group).await?),
        MembersSubcommand::GroupParents { group } => print_json(&api.group_parents(&group).await?),
        MembersSubcommand::GroupChildren { group } => print_json(&api.group_children(&group).await?),
        MembersSubcommand::GroupPermissions { group } => {
            print_json(&api.group_permissions(&group).await?)
        }
        mutation => {
            sync_app_config(session).await?;
            let api = &session.api;
            let message = match mutation {
                MembersSubcommand::Add { user, group } => {
                    api.add_user_to_group(&user, &group).await?;
                    format!("Added {user} to {group}")
                }
                MembersSubcommand::Remove { user, group } => {
                    api.remove_user_from_group(&user, &group).await?;
                    format!("Removed {user} from {group}")
                }
                MembersSubcommand::AddParent { group, parent } => {
                    api.add_group_parent(&group, &parent).await?;
                    format!("{parent} is now a parent of {group}")
                }
                MembersSubcommand::RemoveParent { group, parent } => {
                    api.remove_group_parent(&group, &parent).await?;
                    format!("{parent} is no longer a parent of {group}")
                }
                _ => return Ok(()),
            };
            announce(&Toast::success(message));
            Ok(())
        }
    }
}

async fn run_settings(session: &mut Session, command: SettingsSubcommand) -> Result<(), CliError> {
    require_token(session)?;
    match command {
        SettingsSubcommand::Show => print_json(&session.api.settings().await?),
        SettingsSubcommand::Update { data } => {
            let settings: Settings = read_json(&data)?;
            sync_app_config(session).await?;
            let saved = session.api.update_settings(&settings).await?;
            print_json(&saved)?;
            announce(&Toast::success("Settings saved"));
            Ok(())
        }
    }
}

// =============================================================================
// LOCAL COMMANDS
// =============================================================================

fn run_caql(command: CaqlCommand) -> Result<(), CliError> {
    match command.command {
        CaqlSubcommand::Validate { query } => {
            if let Some(err) = caql::validate(&query) {
                return Err(err.into());
            }
            println!("ok");
            Ok(())
        }
        CaqlSubcommand::Format { query } => {
            println!("{}", caql::parse(&query)?);
            Ok(())
        }
        CaqlSubcommand::Eval { query, doc } => {
            let query = caql::parse(&query)?;
            let doc: Value = read_json(&doc)?;
            print_json(&query.eval_value(&doc)?)
        }
    }
}

fn run_ui(session: &mut Session, command: UiSubcommand) -> Result<(), CliError> {
    let mut ui = UiState::load(&session.storage);
    if let UiSubcommand::ToggleSidebar = command {
        ui.toggle_sidebar();
        ui.save(&mut session.storage)?;
    }
    print_json(&json!({"sidebar_collapsed": ui.sidebar_collapsed}))
}

// =============================================================================
// REALTIME
// =============================================================================

async fn run_watch(session: &Session, count: Option<usize>) -> Result<(), CliError> {
    let config = session.api.config();
    if !config.realtime_enabled {
        return Err(CliError::RealtimeDisabled);
    }
    let handle = spawn_realtime(config, session.api.token())?;
    let mut updates = handle.subscribe();
    let mut seen = 0usize;

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(invalidation) => {
                    println!("{}", serde_json::to_string(&invalidation_json(&invalidation))?);
                    seen += 1;
                    if count.is_some_and(|limit| seen >= limit) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "watch fell behind; invalidations skipped"),
                Err(RecvError::Closed) => return Err(RealtimeError::Closed.into()),
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("watch interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn invalidation_json(invalidation: &Invalidation) -> Value {
    json!({
        "collection": invalidation.collection(),
        "id": invalidation.record_id(),
    })
}

// =============================================================================
// OUTPUT
// =============================================================================

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn announce(toast: &Toast) {
    eprintln!("{toast}");
}

/// Parse `data` as JSON; `-` reads stdin.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, CliError> {
    if data == "-" {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        return Ok(serde_json::from_str(&raw)?);
    }
    Ok(serde_json::from_str(data)?)
}
