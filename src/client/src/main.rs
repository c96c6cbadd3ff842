//! estate-cli：验证码登录命令行客户端

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use estate_client::{ApiClient, AuthApi, ClientConfig, FileStorage, SessionManager};
use estate_common::Role;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "estate-cli", version, about = "Phone OTP login client")]
struct Cli {
    /// API 根地址，例如 http://localhost:5000/api
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// 会话文件路径
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    /// 请求超时（秒）
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 请求发送验证码
    SendOtp {
        #[arg(long)]
        phone: String,
        /// 可重复：--role buyer --role agent
        #[arg(long = "role", required = true)]
        roles: Vec<Role>,
    },
    /// 校验验证码并保存会话
    VerifyOtp {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        code: String,
    },
    /// 查看当前用户资料
    Profile,
    /// 查看本地会话状态
    Status,
    /// 清除本地会话
    Logout,
    /// 注销账户
    DeleteAccount,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Failed to load client configuration")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(storage) = cli.storage {
        config.storage_path = storage;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    let storage = Arc::new(FileStorage::new(&config.storage_path));
    let session = Arc::new(SessionManager::new(storage));
    session.init().await;

    let client = Arc::new(ApiClient::new(config, session.clone())?);
    let api = AuthApi::new(client);

    match cli.command {
        Command::SendOtp { phone, roles } => {
            let response = api.send_otp(&phone, &roles).await?;
            println!("{}", response.message);
        }
        Command::VerifyOtp { phone, code } => {
            let session = api.verify_otp(&phone, &code).await?;
            println!("Logged in as {} ({})", session.user.phone, session.user.id);
        }
        Command::Profile => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let profile = api.profile_cancellable(&cancel).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Status => match session.current() {
            Some(current) => println!(
                "Signed in as {} ({})",
                current.user.phone,
                current
                    .user
                    .role
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None => println!("Not signed in"),
        },
        Command::Logout => {
            api.logout().await?;
            println!("Logged out");
        }
        Command::DeleteAccount => {
            let response = api.delete_account().await?;
            println!("{}", response.message);
        }
    }

    Ok(())
}
