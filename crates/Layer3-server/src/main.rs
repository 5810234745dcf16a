//! OpsGate CLI - Main entry point

mod bootstrap;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use opsgate_engine::Request;
use opsgate_foundation::{AuditLogger, AuditLoggerConfig, ConfigLoader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// OpsGate - policy-gated command execution gateway
#[derive(Parser, Debug)]
#[command(name = "opsgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to settings.json (overrides OPSGATE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to policy.json (overrides the settings value)
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway on stdio (default)
    Serve,
    /// List tools registered in the policy
    Tools,
    /// Call a single tool and print the response envelope
    Call {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Confirm a gated tool
        #[arg(long)]
        confirm: bool,
    },
    /// Validate settings and policy without serving
    Check,
    /// Show recent audit records
    Audit {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout 은 와이어 전용. 로그는 stderr 로.
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = args.config.as_deref();
    let policy_path = args.policy.as_deref();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let gateway = bootstrap::build(config_path, policy_path).await?;
            server::run(gateway.engine).await
        }
        Command::Tools => {
            let gateway = bootstrap::build(config_path, policy_path).await?;
            tools_cmd(&gateway);
            Ok(())
        }
        Command::Call {
            name,
            args: call_args,
            confirm,
        } => {
            let gateway = bootstrap::build(config_path, policy_path).await?;
            call_cmd(&gateway, &name, call_args.as_deref(), confirm).await
        }
        Command::Check => {
            let gateway = bootstrap::build(config_path, policy_path).await?;
            check_cmd(&gateway);
            Ok(())
        }
        Command::Audit { limit } => audit_cmd(config_path, limit).await,
    }
}

/// 등록된 도구 목록 출력
fn tools_cmd(gateway: &bootstrap::Gateway) {
    let catalog = gateway.engine.registry().catalog();

    if catalog.is_empty() {
        println!("No tools registered.");
        return;
    }

    println!("\n📋 Registered Tools\n");
    println!(
        "{:<20} {:<8} {:<8} {}",
        "NAME", "MUTATES", "CONFIRM", "DESCRIPTION"
    );
    println!("{}", "-".repeat(72));

    for entry in catalog {
        println!(
            "{:<20} {:<8} {:<8} {}",
            entry.name,
            yes_no(entry.mutates),
            yes_no(entry.requires_confirm),
            entry.description
        );
    }
    println!();
}

/// 도구 하나 호출 후 응답 봉투 출력
///
/// 종료 코드: 성공 0, 확인 필요 2, 그 외 실패 1
async fn call_cmd(
    gateway: &bootstrap::Gateway,
    name: &str,
    args: Option<&str>,
    confirm: bool,
) -> anyhow::Result<()> {
    let parsed_args = match args {
        Some(raw) => Some(
            serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("--args is not valid JSON: {}", e))?,
        ),
        None => None,
    };

    let request = Request::call_tool(name, parsed_args, confirm);
    let envelope = gateway.engine.handle(&request).await;

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if envelope.ok {
        Ok(())
    } else if envelope.need_confirm {
        std::process::exit(2);
    } else {
        std::process::exit(1);
    }
}

/// 설정/정책 검증 결과 요약 출력
fn check_cmd(gateway: &bootstrap::Gateway) {
    let config = &gateway.config;
    let registry = gateway.engine.registry();

    println!(
        "✓ Settings valid ({} root(s), {} allowed program(s))",
        config.roots.len(),
        config.exec.allowed_programs.len()
    );
    println!("✓ Policy valid ({} tool(s))", registry.len());
    for name in registry.names() {
        println!("  - {}", name);
    }
}

/// 최근 감사 기록 출력
async fn audit_cmd(config_path: Option<&std::path::Path>, limit: usize) -> anyhow::Result<()> {
    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    if !config.audit.enabled {
        println!("Audit logging is disabled in settings.");
        return Ok(());
    }

    let logger = AuditLogger::new(AuditLoggerConfig {
        path: config
            .audit
            .path
            .clone()
            .unwrap_or_else(opsgate_foundation::default_audit_path),
        enabled: true,
    })
    .await;

    let records = logger.recent(limit).await?;
    if records.is_empty() {
        println!("No audit records found at {}.", logger.path().display());
        return Ok(());
    }

    println!("\n📋 Recent Audit Records ({})\n", logger.path().display());
    println!(
        "{:<20} {:<18} {:<12} {:>5} {:>8}  {}",
        "TIMESTAMP", "TOOL", "STATUS", "EXIT", "MS", "DIGEST"
    );
    println!("{}", "-".repeat(80));

    for record in records {
        println!(
            "{:<20} {:<18} {:<12} {:>5} {:>8}  {}",
            record.ts.format("%Y-%m-%d %H:%M:%S"),
            record.tool,
            record.status.as_str(),
            record.exit_code,
            record.elapsed_ms,
            record.args_digest.get(..12).unwrap_or(&record.args_digest)
        );
    }
    println!();

    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
