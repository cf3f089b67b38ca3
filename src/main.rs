use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use activate::config::{self, Config};
use activate::domain::abi::data_contract::{self, DEFAULT_CONTRACT_ADDRESS};
use activate::domain::transaction::parse_address;
use activate::domain::{SendDataForm, TopicFormat, TopicInput};
use activate::infrastructure::abi::DecodeMode;
use activate::infrastructure::ethereum::ProviderConfig;
use activate::infrastructure::runtime::{
    RuntimeBridge, RuntimeCommand, RuntimeEvent, SessionSettings,
};
use activate::tracing_setup::init_tracing;

#[derive(Debug, Parser)]
#[command(
    name = "activate",
    version,
    about = "ACTivate: send and watch DataSentToTarget notifications"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545); logs are polled
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long, global = true)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long, global = true)]
    ipc: Option<PathBuf>,

    /// Data contract address
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Node-managed account that signs submissions
    #[arg(long, global = true)]
    sender: Option<String>,

    /// Reject logs with fewer topics than indexed parameters
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print DataSentToTarget events until the subscription ends
    Listen,
    /// Submit sendDataToTarget
    Send(SendArgs),
    /// Print the contract admin
    Admin,
    /// Print signatures, topic hashes and selectors of the contract ABI
    Abi,
}

#[derive(Debug, clap::Args)]
struct SendArgs {
    /// Recipient address
    #[arg(long)]
    target: String,

    /// Owner address
    #[arg(long)]
    owner: String,

    /// ACT reference, hex
    #[arg(long)]
    act_ref: String,

    /// Topic string sent verbatim
    #[arg(long, conflicts_with_all = ["public_key", "reference"], required_unless_present = "public_key")]
    topic: Option<String>,

    /// Public key hex; combined with --reference into the topic
    #[arg(long, requires = "reference")]
    public_key: Option<String>,

    /// Content reference hex
    #[arg(long, requires = "public_key")]
    reference: Option<String>,

    /// Build a tagged topic record instead of the bare concatenation
    #[arg(long)]
    tagged: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    // Tracing is configured from this file, so report problems directly
    let config = match config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("activate: {err:#}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.log);

    if let Command::Abi = args.command {
        return print_abi();
    }

    // Reject malformed input before connecting
    let request = match &args.command {
        Command::Send(send) => Some(send_form(send, &config).validate()?),
        _ => None,
    };

    let endpoint = endpoint_from_args_and_config(&args, &config)?;
    let settings = session_settings(&args, &config)?;
    info!(endpoint = %endpoint.display(), contract = %settings.contract, "starting");
    if !endpoint.supports_push() {
        warn!("HTTP endpoint: logs are polled");
    }

    let runtime = RuntimeBridge::new(endpoint, settings)?;

    match (args.command, request) {
        (Command::Listen, _) => {
            runtime.send(RuntimeCommand::Subscribe)?;
            run_listen(&runtime)
        }
        (Command::Send(_), Some(request)) => {
            runtime.send(RuntimeCommand::SendData(request))?;
            wait_for_receipt(&runtime)
        }
        (Command::Admin, _) => {
            runtime.send(RuntimeCommand::QueryAdmin)?;
            wait_for_admin(&runtime)
        }
        _ => Ok(()),
    }
}

fn print_abi() -> Result<()> {
    let descriptor = data_contract::descriptor().context("Embedded ABI is invalid")?;

    let mut events: Vec<_> = descriptor.events().collect();
    events.sort_by(|a, b| a.name.cmp(&b.name));
    for event in events {
        println!("event    {}  {}", event.signature, event.topic);
    }

    let mut functions: Vec<_> = descriptor.functions().collect();
    functions.sort_by(|a, b| a.name.cmp(&b.name));
    for function in functions {
        let access = if function.read_only { "view" } else { "write" };
        println!(
            "function {}  {}  {}",
            function.signature,
            function.selector_hex(),
            access
        );
    }
    Ok(())
}

fn send_form(send: &SendArgs, config: &Config) -> SendDataForm {
    let topic = match (&send.topic, &send.public_key, &send.reference) {
        (Some(topic), _, _) => TopicInput::Raw(topic.clone()),
        (None, public_key, reference) => {
            let format = if send.tagged {
                TopicFormat::Tagged
            } else {
                config.topic_format.into()
            };
            TopicInput::Parts {
                public_key: public_key.clone().unwrap_or_default(),
                reference: reference.clone().unwrap_or_default(),
                format,
            }
        }
    };

    SendDataForm {
        target: send.target.clone(),
        owner: send.owner.clone(),
        act_ref: send.act_ref.clone(),
        topic,
    }
}

fn session_settings(args: &Args, config: &Config) -> Result<SessionSettings> {
    let contract = match args.contract.as_deref().or(config.contract_address.as_deref()) {
        Some(value) => parse_address("contract", value)?,
        None => DEFAULT_CONTRACT_ADDRESS,
    };
    let sender = args
        .sender
        .as_deref()
        .or(config.sender.as_deref())
        .map(|value| parse_address("sender", value))
        .transpose()?;
    let mode = if args.strict || config.strict_decode {
        DecodeMode::Strict
    } else {
        DecodeMode::Lenient
    };

    Ok(SessionSettings {
        contract,
        sender,
        mode,
    })
}

fn endpoint_from_args_and_config(args: &Args, config: &Config) -> Result<ProviderConfig> {
    // CLI arguments take precedence
    if let Some(ipc) = args.ipc.clone() {
        #[cfg(unix)]
        {
            return Ok(ProviderConfig::Ipc(ipc));
        }
        #[cfg(not(unix))]
        {
            let _ = ipc;
            bail!("IPC is not supported on this platform");
        }
    }
    if let Some(ws) = args.ws.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(ProviderConfig::WebSocket(ws.to_string()));
    }
    if let Some(rpc) = args.rpc.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(ProviderConfig::Http(normalize_http_endpoint(rpc)));
    }

    // Config file endpoints
    if let Some(entry) = config.default_endpoint() {
        if let Some(rpc) = entry.rpc.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(match ProviderConfig::from_url(rpc) {
                ProviderConfig::Http(url) => ProviderConfig::Http(normalize_http_endpoint(&url)),
                other => other,
            });
        }
        #[cfg(unix)]
        {
            if let Some(ipc) = entry.ipc.as_deref().and_then(expand_path) {
                return Ok(ProviderConfig::Ipc(ipc));
            }
        }
    }

    // Default fallback
    Ok(ProviderConfig::WebSocket("ws://localhost:8546".to_string()))
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(unix)]
fn expand_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return Some(home.join(rest));
        }
    }

    let mut buf = PathBuf::from(trimmed);
    if buf.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            buf = cwd.join(buf);
        }
    }
    Some(buf)
}

fn run_listen(runtime: &RuntimeBridge) -> Result<()> {
    while let Some(event) = runtime.recv() {
        match event {
            RuntimeEvent::Connected { endpoint } => info!(%endpoint, "connected"),
            RuntimeEvent::Subscribed => info!("listening for DataSentToTarget"),
            RuntimeEvent::Event { event, summary } => {
                println!("{summary}");
                if let Some(payload) = &event.payload {
                    println!("  Public Key: {}", payload.public_key);
                    println!("  Reference: {}", payload.reference);
                }
            }
            RuntimeEvent::DecodeFailed { message } => warn!(%message, "log rejected"),
            RuntimeEvent::SubscriptionError { reason } => bail!("subscription ended: {reason}"),
            RuntimeEvent::Error { message } => bail!(message),
            _ => {}
        }
    }
    bail!("runtime worker stopped")
}

fn wait_for_receipt(runtime: &RuntimeBridge) -> Result<()> {
    while let Some(event) = runtime.recv() {
        match event {
            RuntimeEvent::Connected { endpoint } => info!(%endpoint, "connected"),
            RuntimeEvent::TransactionConfirmed { receipt } => {
                println!(
                    "Transaction {} confirmed in block {} (gas used {})",
                    receipt.tx_hash, receipt.block_number, receipt.gas_used
                );
                return Ok(());
            }
            RuntimeEvent::TransactionFailed { message } => bail!("transaction failed: {message}"),
            RuntimeEvent::Error { message } => bail!(message),
            _ => {}
        }
    }
    bail!("runtime worker stopped")
}

fn wait_for_admin(runtime: &RuntimeBridge) -> Result<()> {
    while let Some(event) = runtime.recv() {
        match event {
            RuntimeEvent::Connected { endpoint } => info!(%endpoint, "connected"),
            RuntimeEvent::AdminReady { admin } => {
                println!("{}", admin.to_checksum(None));
                return Ok(());
            }
            RuntimeEvent::Error { message } => bail!(message),
            _ => {}
        }
    }
    bail!("runtime worker stopped")
}
