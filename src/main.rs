use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use puschelz_client::config::mask_token;
use puschelz_client::sync::resolve_sync_url;
use puschelz_client::{
    parse_saved_variables, AddonWatcher, CommonPathDetector, ConfigStore, JsonConfigStore,
    SavedVariablesLocator, SavedVariablesResolver, SyncConfig, SyncDispatcher, SyncOutcome,
    SyncService, SyncStatus, WatchState,
};

/// Puschelz Client
///
/// 监听 Puschelz 插件的 SavedVariables 并同步到公会网站
#[derive(Parser)]
#[command(name = "puschelz-client")]
#[command(author, version, about)]
#[command(
    long_about = "Watches the Puschelz addon SavedVariables file and syncs guild bank\n\
                  and calendar snapshots to the Puschelz site."
)]
struct Cli {
    /// 配置文件路径（默认：<config_dir>/Puschelz Client/config.json）
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// 覆盖同步站点地址
    #[arg(long, global = true, env = "PUSCHELZ_ENDPOINT_URL")]
    endpoint: Option<String>,

    /// 覆盖 API token
    #[arg(long, global = true, env = "PUSCHELZ_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// 覆盖 WoW 安装路径
    #[arg(long, global = true, env = "PUSCHELZ_WOW_PATH")]
    wow_path: Option<String>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 监听 SavedVariables 并在变更时同步，Ctrl-C 退出
    Watch,

    /// 立即同步一次
    Sync,

    /// 解析 SavedVariables 文件并输出 JSON
    Parse {
        /// Puschelz.lua 路径
        file: PathBuf,

        /// 单行输出
        #[arg(long)]
        compact: bool,
    },

    /// 显示找到的 SavedVariables 文件
    Locate,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// 配置子命令
#[derive(Subcommand)]
enum ConfigCommands {
    /// 显示当前配置（token 已遮蔽）
    Show,

    /// 修改并保存一项配置
    Set {
        key: ConfigKey,
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigKey {
    EndpointUrl,
    ApiToken,
    WowPath,
}

// ═══════════════════════════════════════════════════════════════════
// 配置加载
// ═══════════════════════════════════════════════════════════════════

fn open_store(cli: &Cli) -> Result<JsonConfigStore> {
    match &cli.config_file {
        Some(path) => Ok(JsonConfigStore::new(path)),
        None => JsonConfigStore::at_default_location(),
    }
}

/// 读取配置，填充默认值并应用命令行覆盖
fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let store = open_store(cli)?;
    let mut config = store.load()?;
    config.apply_defaults(&CommonPathDetector::default());

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint_url = endpoint.clone();
    }
    if let Some(token) = &cli.token {
        config.api_token = token.clone();
    }
    if let Some(wow_path) = &cli.wow_path {
        config.wow_path = wow_path.clone();
    }

    Ok(config)
}

/// 缺少必需设置时拒绝启动
fn ensure_configured(config: &SyncConfig) -> Result<()> {
    let missing = config.missing_settings();
    if !missing.is_empty() {
        bail!(
            "Missing required settings: {}. Use `puschelz-client config set` to configure them.",
            missing.join(", ")
        );
    }
    Ok(())
}

fn build_watcher() -> Result<AddonWatcher> {
    let dispatcher = SyncDispatcher::new().context("Failed to create HTTP client")?;
    Ok(AddonWatcher::new(
        Arc::new(SavedVariablesResolver),
        SyncService::new(dispatcher),
    ))
}

// ═══════════════════════════════════════════════════════════════════
// 命令实现
// ═══════════════════════════════════════════════════════════════════

fn print_status(status: &SyncStatus) {
    let time = Local::now().format("%H:%M:%S").to_string();
    let state = format!("{:<8}", status.state.as_str());
    let state = match status.state {
        WatchState::Idle => state.white(),
        WatchState::Watching => state.green(),
        WatchState::Syncing => state.cyan(),
        WatchState::Error => state.red(),
    };
    println!("[{}] {} {}", time.dimmed(), state, status.label());
}

async fn watch(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    ensure_configured(&config)?;

    let watcher = build_watcher()?;
    let mut rx = watcher.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(status) => print_status(&status),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let file = watcher.start(&config).await?;
    println!(
        "👀 Watching {} {}",
        file.display().to_string().yellow(),
        "(Ctrl-C to stop)".dimmed()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.stop();
    // 让最后的 Idle 状态打印出来
    tokio::task::yield_now().await;
    printer.abort();

    Ok(())
}

async fn sync_once(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    ensure_configured(&config)?;

    let watcher = build_watcher()?;
    match watcher.sync_now(&config).await? {
        SyncOutcome::Synced => println!("{} SavedVariables synced", "✓".green()),
        SyncOutcome::Unchanged => println!("{} No changes since last sync", "○".white()),
    }

    Ok(())
}

fn parse_file(file: &Path, compact: bool) -> Result<()> {
    let source = std::fs::read(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let db = parse_saved_variables(&String::from_utf8_lossy(&source))
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let output = if compact {
        serde_json::to_string(&db)?
    } else {
        serde_json::to_string_pretty(&db)?
    };
    println!("{}", output);

    Ok(())
}

fn locate(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    if config.wow_path.trim().is_empty() {
        bail!("Missing required settings: WoW path");
    }

    match SavedVariablesResolver.locate(&config.wow_path) {
        Some(file) => {
            println!("{}", file.display());
            Ok(())
        }
        None => bail!(
            "Could not locate Puschelz.lua under the configured WoW path ({})",
            config.wow_path
        ),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let config = load_config(cli)?;

    let or_unset = |value: &str| {
        if value.trim().is_empty() {
            "(not set)".red().to_string()
        } else {
            value.yellow().to_string()
        }
    };

    println!("{}", "⚙️  Puschelz Client Configuration".cyan().bold());
    println!();
    println!("   Config file:  {}", store.path().display());
    println!("   Endpoint URL: {}", or_unset(&config.endpoint_url));
    if !config.endpoint_url.trim().is_empty() {
        println!("   Sync URL:     {}", resolve_sync_url(&config.endpoint_url).cyan());
    }
    println!("   API token:    {}", mask_token(&config.api_token).yellow());
    println!("   WoW path:     {}", or_unset(&config.wow_path));

    let missing = config.missing_settings();
    println!();
    if missing.is_empty() {
        println!("{}", "✅ Ready to sync".green());
    } else {
        println!("{}", format!("⚠️  Missing: {}", missing.join(", ")).yellow());
    }

    Ok(())
}

fn set_config(cli: &Cli, key: ConfigKey, value: String) -> Result<()> {
    let store = open_store(cli)?;
    let mut config = store.load()?;

    let value = value.trim().to_string();
    let name = match key {
        ConfigKey::EndpointUrl => {
            config.endpoint_url = value;
            "endpointUrl"
        }
        ConfigKey::ApiToken => {
            config.api_token = value;
            "apiToken"
        }
        ConfigKey::WowPath => {
            config.wow_path = value;
            "wowPath"
        }
    };

    store
        .save(&config)
        .with_context(|| format!("Failed to save {}", store.path().display()))?;
    println!("{} Saved {} to {}", "✓".green(), name.cyan(), store.path().display());

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
// 入口
// ═══════════════════════════════════════════════════════════════════

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "puschelz_client=debug"
    } else {
        "puschelz_client=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Watch => watch(&cli).await,
        Commands::Sync => sync_once(&cli).await,
        Commands::Parse { file, compact } => parse_file(file, *compact),
        Commands::Locate => locate(&cli),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => show_config(&cli),
            ConfigCommands::Set { key, value } => set_config(&cli, *key, value.clone()),
        },
    }
}
