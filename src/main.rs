use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pos_client::api::ApiClient;
use pos_client::config::ClientConfig;
use pos_client::context::BrowserContext;
use pos_client::dashboard::admin::AdminDashboard;
use pos_client::dashboard::cashier::CashierDashboard;
use pos_client::dashboard::waiter::WaiterDashboard;
use pos_client::dashboard::{Notice, NoticeLevel, Notices};
use pos_client::error::ClientError;
use pos_client::models::Period;
use pos_client::navigator::{MemoryNavigator, Navigator};
use pos_client::role::Role;
use pos_client::scheduler::{PageEvent, Refresh, RefreshScheduler};
use pos_client::session::{LoginOutcome, SessionGuard};
use pos_client::storage::{FileStore, MemoryStore, StorageError};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("login failed: {0}")]
    Login(String),
    #[error("no valid session for {0}; pass --username and --password")]
    Unauthenticated(String),
    #[error("no dashboard is served at {0}")]
    NoDashboard(String),
    #[error("signal handler failed: {0}")]
    Signal(std::io::Error),
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::Client(ClientError::Storage(e))
    }
}

#[derive(Parser, Debug)]
#[command(name = "pos-client", about = "Headless point-of-sale dashboard client")]
struct Cli {
    #[arg(long, env = "POS_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "POS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "POS_STATE_DIR", default_value = ".pos-client", help = "Directory for stored credential and cookies")]
    state_dir: PathBuf,

    #[arg(long, help = "Page to open; defaults to the dashboard for the signed-in role")]
    route: Option<String>,

    #[arg(long, value_parser = parse_period, help = "Admin metrics window: today, week, month or year")]
    period: Option<Period>,

    #[arg(long, default_value_t = false, help = "Sign out and clear stored state, then exit")]
    logout: bool,
}

fn parse_period(raw: &str) -> Result<Period, String> {
    Period::parse(raw).ok_or_else(|| format!("unknown period '{raw}'"))
}

/// The dashboard mounted for the current page.
enum Page {
    Admin(Arc<AdminDashboard>),
    Cashier(Arc<CashierDashboard>),
    Waiter(Arc<WaiterDashboard>),
}

impl Page {
    fn for_path(path: &str, guard: &Arc<SessionGuard>, api: &Arc<ApiClient>, config: &ClientConfig) -> Option<Self> {
        let guard = Arc::clone(guard);
        let api = Arc::clone(api);
        if path.starts_with(Role::Admin.dashboard_route()) {
            Some(Self::Admin(Arc::new(AdminDashboard::new(guard, api))))
        } else if path.starts_with(Role::Cashier.dashboard_route()) {
            Some(Self::Cashier(Arc::new(CashierDashboard::new(guard, api, config.payment_retries))))
        } else if path.starts_with(Role::Waiter.dashboard_route()) {
            Some(Self::Waiter(Arc::new(WaiterDashboard::new(guard, api))))
        } else {
            None
        }
    }

    async fn init(&self) -> bool {
        match self {
            Self::Admin(page) => page.init().await,
            Self::Cashier(page) => page.init().await,
            Self::Waiter(page) => page.init().await,
        }
    }

    fn refresher(&self) -> Arc<dyn Refresh> {
        match self {
            Self::Admin(page) => page.clone(),
            Self::Cashier(page) => page.clone(),
            Self::Waiter(page) => page.clone(),
        }
    }

    fn notices(&self) -> &Notices {
        match self {
            Self::Admin(page) => page.notices(),
            Self::Cashier(page) => page.notices(),
            Self::Waiter(page) => page.notices(),
        }
    }
}

fn log_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Error => warn!(message = %notice.message, "notice"),
        NoticeLevel::Info | NoticeLevel::Success => info!(message = %notice.message, "notice"),
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Err(e) = dotenv {
        debug!(error = %e, "no .env loaded");
    }

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    std::fs::create_dir_all(&cli.state_dir)
        .map_err(|source| StorageError::Io { path: cli.state_dir.clone(), source })?;
    let local = Arc::new(FileStore::open(cli.state_dir.join("storage.json"))?);
    let cookies = Arc::new(FileStore::open(cli.state_dir.join("cookies.json"))?);
    debug!(storage = %local.path().display(), cookies = %cookies.path().display(), "state files opened");
    let navigator = Arc::new(MemoryNavigator::new(cli.route.as_deref().unwrap_or(pos_client::role::ROOT_ROUTE)));
    let ctx = BrowserContext::new(local, Arc::new(MemoryStore::new()), cookies, navigator.clone());

    let api = Arc::new(ApiClient::new(&config, ctx.clone())?);
    let guard = Arc::new(SessionGuard::new(ctx, api.clone(), &config));

    if cli.logout {
        guard.logout().await;
        info!("signed out");
        return Ok(());
    }

    if let (Some(username), Some(password)) = (cli.username.as_deref(), cli.password.as_deref()) {
        if let LoginOutcome::Failure { error } = guard.login(username, password).await {
            return Err(CliError::Login(error));
        }
    }
    if cli.route.is_none() {
        guard.redirect_based_on_role();
    }

    let path = navigator.current_path();
    if !guard.check_auth().await {
        return Err(CliError::Unauthenticated(path));
    }

    let Some(page) = Page::for_path(&path, &guard, &api, &config) else {
        return Err(CliError::NoDashboard(path));
    };
    if !page.init().await {
        return Err(CliError::NoDashboard(navigator.current_path()));
    }
    info!(%path, role = ?guard.role(), "dashboard mounted");
    if let (Page::Admin(admin), Some(period)) = (&page, cli.period) {
        admin.set_period(period).await;
    }

    let mut scheduler = RefreshScheduler::new(config.refresh_interval);
    scheduler.register(page.refresher());
    scheduler.start();

    let mut ticker = tokio::time::interval(config.refresh_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    error!(error = %e, "ctrl-c handler failed");
                    scheduler.on_lifecycle(PageEvent::Unload);
                    return Err(CliError::Signal(e));
                }
                info!("shutting down");
                break;
            }
            _ = ticker.tick() => {
                page.notices().drain().iter().for_each(log_notice);
                if !guard.is_authenticated() {
                    warn!(to = %navigator.current_path(), "session ended");
                    break;
                }
            }
        }
    }

    scheduler.on_lifecycle(PageEvent::Unload);
    page.notices().drain().iter().for_each(log_notice);
    Ok(())
}
