use clap::{Args, Parser, Subcommand};
use propdesk::config::{
    ClientConfig, DEFAULT_ACTIVITY_INTERVAL, DEFAULT_CACHE_NAME, DEFAULT_SETTINGS_KEY,
    HeartbeatConfig, ServerConfig, SessionConfig, WorkerConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) enum RunOutcome {
    Serve {
        addr: SocketAddr,
        config: ServerConfig,
    },
    Session(Box<SessionConfig>),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match cli.command {
        Command::Init(args) => RunOutcome::Exit(run_init(args)),
        Command::Serve(args) => RunOutcome::Serve {
            addr: args.addr,
            config: ServerConfig {
                vapid_private_key: args.vapid_private_key,
                vapid_public_key: args.vapid_public_key,
                vapid_subject: args.vapid_subject,
            },
        },
        Command::Session(args) => match resolve_session_config(args) {
            Ok(config) => RunOutcome::Session(Box::new(config)),
            Err(err) => {
                tracing::error!("{err}");
                RunOutcome::Exit(2)
            }
        },
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "propdesk",
    version,
    about = "Push notifications and admin presence for the property back office"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the development API server.
    Serve(ServeArgs),
    /// Run a headless page and worker driven by stdin commands.
    Session(SessionArgs),
    /// Generate VAPID credentials.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "PROPDESK_ADDR", default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
    #[arg(long, env = "PROPDESK_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "PROPDESK_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "PROPDESK_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
}

#[derive(Args, Debug)]
struct SessionArgs {
    #[arg(long, env = "PROPDESK_API_BASE")]
    api_base: String,
    #[arg(long, env = "PROPDESK_ADMIN_ID")]
    admin_id: String,
    #[arg(long, env = "PROPDESK_SESSION_COOKIE")]
    session_cookie: Option<String>,
    #[arg(long, env = "PROPDESK_REQUEST_TIMEOUT")]
    request_timeout: Option<String>,
    #[arg(long, env = "PROPDESK_ACTIVITY_INTERVAL")]
    activity_interval: Option<String>,
    #[arg(long, env = "PROPDESK_CHECK_INTERVAL")]
    check_interval: Option<String>,
    #[arg(long, env = "PROPDESK_SETTINGS_PATH")]
    settings_path: Option<PathBuf>,
    #[arg(long, env = "PROPDESK_SETTINGS_KEY", default_value = DEFAULT_SETTINGS_KEY)]
    settings_key: String,
    #[arg(long, env = "PROPDESK_START_URL", default_value = "/agent-pannel")]
    start_url: String,
    #[arg(long, env = "PROPDESK_CACHE_NAME", default_value = DEFAULT_CACHE_NAME)]
    cache_name: String,
    #[arg(
        long,
        env = "PROPDESK_PUSH_SERVICE",
        default_value = "https://push.propdesk.test"
    )]
    push_service: String,
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match propdesk::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            tracing::error!(error = %err, "failed to generate VAPID credentials");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("PROPDESK_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("PROPDESK_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("PROPDESK_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace PROPDESK_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn resolve_session_config(args: SessionArgs) -> Result<SessionConfig, String> {
    if args.api_base.trim().is_empty() {
        return Err("api base cannot be empty".to_string());
    }
    let admin_id = args.admin_id.trim();
    if admin_id.is_empty() {
        return Err("admin id cannot be empty".to_string());
    }

    let activity_interval = match args.activity_interval.as_deref() {
        Some(raw) => parse_interval("activity interval", raw)?,
        None => DEFAULT_ACTIVITY_INTERVAL,
    };
    let check_interval = match args.check_interval.as_deref() {
        Some(raw) => parse_interval("check interval", raw)?,
        None => activity_interval,
    };
    let request_timeout = args
        .request_timeout
        .as_deref()
        .map(|raw| parse_interval("request timeout", raw))
        .transpose()?;

    Ok(SessionConfig {
        client: ClientConfig {
            api_base: args.api_base.trim().to_string(),
            session_cookie: args.session_cookie,
            request_timeout,
        },
        worker: WorkerConfig {
            cache_name: args.cache_name,
            ..WorkerConfig::default()
        },
        heartbeat: HeartbeatConfig {
            activity_interval,
            check_interval,
        },
        admin_id: admin_id.to_string(),
        settings_path: args.settings_path,
        settings_key: args.settings_key,
        start_url: args.start_url,
        push_service: args.push_service,
    })
}

fn parse_interval(name: &str, raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{name} cannot be empty"));
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("invalid {name} '{value}'; expected <number>[s|m|h]"))?;

    if amount == 0 {
        return Err(format!("{name} must be greater than 0"));
    }

    match unit {
        's' => Ok(Duration::from_secs(amount)),
        'm' => Ok(Duration::from_secs(amount * 60)),
        'h' => Ok(Duration::from_secs(amount * 60 * 60)),
        _ => Err(format!(
            "invalid {name} '{value}'; expected <number>[s|m|h]"
        )),
    }
}
