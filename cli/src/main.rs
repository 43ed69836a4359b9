use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use finance_client::net::types::{
    Account, AccountInput, Budget, Category, Item, RegisterRequest, Report, Subcategory, Transaction,
};
use finance_client::state::guard::{LOGIN_ROUTE, landing_route};
use finance_client::util::redirect::install_unauth_redirect;
use finance_client::{
    ApiError, AuthFlowError, ClientConfig, ConfigError, FileStorage, FinanceApi, Route, RouteDecision, RouteGuard,
    SessionStore, StorageError, TransportError,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("session storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("could not build HTTP client: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthFlowError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("cannot determine home directory; pass --session-dir or set FINANCE_SESSION_DIR")]
    NoHomeDir,
    #[error("not signed in; run `finance login` first")]
    NotSignedIn,
    #[error("your role may not open {0}")]
    Forbidden(String),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            Self::Auth(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "finance", about = "Personal finance API client")]
struct Cli {
    #[arg(long, env = "FINANCE_API_URL")]
    api_url: Option<String>,

    /// Directory holding the persisted session record.
    #[arg(long, env = "FINANCE_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FINANCE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "FINANCE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// Follow session changes made by other processes until interrupted.
    Watch {
        /// Quiet period before a burst of file changes is reported.
        #[arg(long, default_value_t = 100)]
        debounce_ms: u64,
    },
    Account(ResourceCommand),
    Category(ResourceCommand),
    Subcategory(ResourceCommand),
    Budget(ResourceCommand),
    Transaction(TransactionCommand),
    Item(ItemCommand),
    Report(ReportCommand),
}

#[derive(Args, Debug)]
struct ResourceCommand {
    #[command(subcommand)]
    command: ResourceSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourceSubcommand {
    List,
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct TransactionCommand {
    #[command(subcommand)]
    command: TransactionSubcommand,
}

#[derive(Subcommand, Debug)]
enum TransactionSubcommand {
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Follow pagination and print every transaction.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct ItemCommand {
    #[command(subcommand)]
    command: ItemSubcommand,
}

#[derive(Subcommand, Debug)]
enum ItemSubcommand {
    List {
        #[arg(long)]
        transaction_id: i64,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct ReportCommand {
    #[command(subcommand)]
    command: ReportSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReportSubcommand {
    List,
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
}

struct CliContext {
    api: FinanceApi,
    guard: RouteGuard,
    storage: Arc<FileStorage>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = open_context(cli.api_url.as_deref(), cli.session_dir)?;

    match cli.command {
        Command::Login { email, password } => {
            let credential = ctx.api.login(&email, &password).await?;
            println!("signed in as {}; landing {}", credential.role(), landing_route(credential.role()).path());
            Ok(())
        }
        Command::Register { first_name, last_name, email, password } => {
            let user = RegisterRequest::user(&first_name, &last_name, &email, &password);
            let credential = ctx.api.register(&user).await?;
            println!("registered and signed in as {}", credential.role());
            Ok(())
        }
        Command::Logout => {
            ctx.api.logout();
            println!("signed out");
            Ok(())
        }
        Command::Whoami => print_json(&whoami(&ctx.guard)),
        Command::Watch { debounce_ms } => run_watch(&ctx, Duration::from_millis(debounce_ms.max(10))).await,
        Command::Account(account) => run_account(&ctx, account).await,
        Command::Category(category) => run_category(&ctx, category).await,
        Command::Subcategory(subcategory) => run_subcategory(&ctx, subcategory).await,
        Command::Budget(budget) => run_budget(&ctx, budget).await,
        Command::Transaction(transaction) => run_transaction(&ctx, transaction).await,
        Command::Item(item) => run_item(&ctx, item).await,
        Command::Report(report) => run_report(&ctx, report).await,
    }
}

fn open_context(api_url: Option<&str>, session_dir: Option<PathBuf>) -> Result<CliContext, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = api_url {
        config = config.with_api_url(url)?;
    }
    let storage = Arc::new(FileStorage::open(resolve_session_dir(session_dir)?)?);
    let session = SessionStore::with_key(storage.clone(), config.session_key.clone());
    let guard = RouteGuard::new(session.clone());
    let api = FinanceApi::connect(&config, session)?;
    debug!(api_url = %config.api_url, dir = %storage.dir().display(), "context ready");
    Ok(CliContext { api, guard, storage })
}

fn resolve_session_dir(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(dir) => Ok(dir),
        None => dirs::home_dir().map(|home| home.join(".finance")).ok_or(CliError::NoHomeDir),
    }
}

/// Apply the view-layer gate for `route` before touching the API.
fn require(guard: &RouteGuard, route: Route) -> Result<(), CliError> {
    match guard.decide(route) {
        RouteDecision::Render => Ok(()),
        RouteDecision::Redirect(LOGIN_ROUTE) => Err(CliError::NotSignedIn),
        RouteDecision::Redirect(_) => Err(CliError::Forbidden(route.path())),
    }
}

fn whoami(guard: &RouteGuard) -> serde_json::Value {
    let credential = guard.session().read();
    let visible = |route: Route| guard.decide(route) == RouteDecision::Render;
    json!({
        "authenticated": credential.is_some(),
        "role": credential.as_ref().map(|c| c.role().as_str()),
        "landing": credential.as_ref().map(|c| landing_route(c.role()).path()),
        "dashboard": visible(Route::Dashboard),
        "admin_dashboard": visible(Route::AdminDashboard),
    })
}

async fn run_watch(ctx: &CliContext, debounce: Duration) -> Result<(), CliError> {
    let session = ctx.api.session();
    let _watcher = ctx.storage.watch(debounce)?;
    let sync = session.spawn_sync();
    let redirect = install_unauth_redirect(session, |route| eprintln!("session ended; sign in again ({route})"));
    let mut projection = session.subscribe();

    println!("{}", describe_session(session));
    loop {
        tokio::select! {
            changed = projection.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", describe_session(session));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    sync.abort();
    redirect.abort();
    Ok(())
}

fn describe_session(session: &SessionStore) -> String {
    match session.role() {
        Some(role) => format!("signed in as {role}"),
        None => "signed out".to_owned(),
    }
}

async fn run_account(ctx: &CliContext, account: ResourceCommand) -> Result<(), CliError> {
    match account.command {
        ResourceSubcommand::List => {
            require(&ctx.guard, Route::Dashboard)?;
            print_json(&ctx.api.list_accounts().await?)
        }
        ResourceSubcommand::Create { data } => {
            require(&ctx.guard, Route::Dashboard)?;
            let input: AccountInput = parse_data(&data)?;
            print_json(&ctx.api.create_account(&input).await?)
        }
        ResourceSubcommand::Update { id, data } => {
            require(&ctx.guard, Route::EditAccount(id))?;
            let input: AccountInput = parse_data(&data)?;
            let updated: Account = ctx.api.update_account(id, &input).await?;
            print_json(&updated)
        }
        ResourceSubcommand::Delete { id } => {
            require(&ctx.guard, Route::Dashboard)?;
            ctx.api.delete_account(id).await?;
            print_deleted("account", id)
        }
    }
}

async fn run_category(ctx: &CliContext, category: ResourceCommand) -> Result<(), CliError> {
    require(&ctx.guard, Route::Categories)?;
    match category.command {
        ResourceSubcommand::List => print_json(&ctx.api.list_categories().await?),
        ResourceSubcommand::Create { data } => {
            let category: Category = parse_data(&data)?;
            print_json(&ctx.api.create_category(&category).await?)
        }
        ResourceSubcommand::Update { id, data } => {
            let category: Category = parse_data(&data)?;
            print_json(&ctx.api.update_category(id, &category).await?)
        }
        ResourceSubcommand::Delete { id } => {
            ctx.api.delete_category(id).await?;
            print_deleted("category", id)
        }
    }
}

async fn run_subcategory(ctx: &CliContext, subcategory: ResourceCommand) -> Result<(), CliError> {
    require(&ctx.guard, Route::Subcategories)?;
    match subcategory.command {
        ResourceSubcommand::List => print_json(&ctx.api.list_subcategories().await?),
        ResourceSubcommand::Create { data } => {
            let subcategory: Subcategory = parse_data(&data)?;
            print_json(&ctx.api.create_subcategory(&subcategory).await?)
        }
        ResourceSubcommand::Update { id, data } => {
            let subcategory: Subcategory = parse_data(&data)?;
            print_json(&ctx.api.update_subcategory(id, &subcategory).await?)
        }
        ResourceSubcommand::Delete { id } => {
            ctx.api.delete_subcategory(id).await?;
            print_deleted("subcategory", id)
        }
    }
}

async fn run_budget(ctx: &CliContext, budget: ResourceCommand) -> Result<(), CliError> {
    require(&ctx.guard, Route::Budgets)?;
    match budget.command {
        ResourceSubcommand::List => print_json(&ctx.api.list_budgets().await?),
        ResourceSubcommand::Create { data } => {
            let budget: Budget = parse_data(&data)?;
            print_json(&ctx.api.create_budget(&budget).await?)
        }
        ResourceSubcommand::Update { id, data } => {
            let budget: Budget = parse_data(&data)?;
            print_json(&ctx.api.update_budget(id, &budget).await?)
        }
        ResourceSubcommand::Delete { id } => {
            ctx.api.delete_budget(id).await?;
            print_deleted("budget", id)
        }
    }
}

/// Whether a page follows the one just requested. Pages are zero-based and
/// counted from the request, not from the server's `currentPage`.
fn has_more_pages(requested: u32, total_pages: u32) -> bool {
    requested.saturating_add(1) < total_pages
}

async fn run_transaction(ctx: &CliContext, transaction: TransactionCommand) -> Result<(), CliError> {
    require(&ctx.guard, Route::Transactions)?;
    match transaction.command {
        TransactionSubcommand::List { page, all: false } => print_json(&ctx.api.list_transactions(page).await?),
        TransactionSubcommand::List { page, all: true } => {
            let mut collected: Vec<Transaction> = Vec::new();
            let mut next = page;
            loop {
                let current = ctx.api.list_transactions(next).await?;
                let more = has_more_pages(next, current.total_pages);
                collected.extend(current.transactions);
                if !more {
                    break;
                }
                next += 1;
            }
            print_json(&collected)
        }
        TransactionSubcommand::Get { id } => print_json(&ctx.api.get_transaction(id).await?),
        TransactionSubcommand::Create { data } => {
            let transaction: Transaction = parse_data(&data)?;
            print_json(&ctx.api.create_transaction(&transaction).await?)
        }
        TransactionSubcommand::Update { id, data } => {
            let transaction: Transaction = parse_data(&data)?;
            print_json(&ctx.api.update_transaction(id, &transaction).await?)
        }
        TransactionSubcommand::Delete { id } => {
            ctx.api.delete_transaction(id).await?;
            print_deleted("transaction", id)
        }
    }
}

async fn run_item(ctx: &CliContext, item: ItemCommand) -> Result<(), CliError> {
    match item.command {
        ItemSubcommand::List { transaction_id } => {
            require(&ctx.guard, Route::Items(transaction_id))?;
            print_json(&ctx.api.list_items(transaction_id).await?)
        }
        ItemSubcommand::Create { data } => {
            let item: Item = parse_data(&data)?;
            require(&ctx.guard, Route::Items(item.transaction_id))?;
            print_json(&ctx.api.create_item(&item).await?)
        }
        ItemSubcommand::Update { id, data } => {
            let item: Item = parse_data(&data)?;
            require(&ctx.guard, Route::Items(item.transaction_id))?;
            print_json(&ctx.api.update_item(id, &item).await?)
        }
        ItemSubcommand::Delete { id } => {
            require(&ctx.guard, Route::Transactions)?;
            ctx.api.delete_item(id).await?;
            print_deleted("item", id)
        }
    }
}

async fn run_report(ctx: &CliContext, report: ReportCommand) -> Result<(), CliError> {
    require(&ctx.guard, Route::Reports)?;
    match report.command {
        ReportSubcommand::List => print_json(&ctx.api.list_reports().await?),
        ReportSubcommand::Create { data } => {
            let report: Report = parse_data(&data)?;
            print_json(&ctx.api.create_report(&report).await?)
        }
        ReportSubcommand::Update { id, data } => {
            let report: Report = parse_data(&data)?;
            print_json(&ctx.api.update_report(id, &report).await?)
        }
    }
}

fn parse_data<T: DeserializeOwned>(data: &str) -> Result<T, CliError> {
    Ok(serde_json::from_str(data.trim())?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn print_deleted(kind: &str, id: i64) -> Result<(), CliError> {
    print_json(&json!({ "deleted": kind, "id": id }))
}
