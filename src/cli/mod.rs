use std::{borrow::Cow, net::SocketAddr, time::Duration};

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{
    identities::{config::AccountsConfig, domain::email::EmailDomainPolicy, provider::StytchEnvironment},
    server,
};

mod create_user;
mod migrate;

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// DSN to tell Sentry where to send events.
    ///
    /// If provided, errors will be sent to Sentry.
    #[clap(long = "sentry-dsn", env = "SENTRY_DSN")]
    sentry_dsn: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user from the command line.
    CreateUser(CreateUserOpts),
    Migrate(MigrateOpts),
    Serve(ServeOpts),
}

#[derive(Args)]
struct CreateUserOpts {
    /// Connection string for the database.
    #[clap(long = "database-url", env = "DATABASE_URL")]
    database_url: String,

    #[clap(long = "email")]
    email: String,

    /// The user's password. Without one, the user has no usable password.
    #[clap(long = "password")]
    password: Option<String>,

    /// Give the user staff access.
    #[clap(long = "staff")]
    staff: bool,
}

impl From<CreateUserOpts> for create_user::CreateUserOpts {
    fn from(opts: CreateUserOpts) -> Self {
        Self {
            database_url: opts.database_url,
            email: opts.email,
            password: opts.password,
            staff: opts.staff,
        }
    }
}

#[derive(Args)]
struct MigrateOpts {
    /// Connection string for the database.
    #[clap(long = "database-url", env = "DATABASE_URL")]
    database_url: String,
}

impl From<MigrateOpts> for migrate::MigrationOpts {
    fn from(opts: MigrateOpts) -> Self {
        Self {
            database_url: opts.database_url,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OtpProviderKind {
    /// Codes are issued locally and sent by email.
    Local,
    Stytch,
}

#[derive(Clone, Copy, ValueEnum)]
enum StytchEnv {
    Test,
    Live,
}

impl From<StytchEnv> for StytchEnvironment {
    fn from(env: StytchEnv) -> Self {
        match env {
            StytchEnv::Test => Self::Test,
            StytchEnv::Live => Self::Live,
        }
    }
}

#[derive(Args)]
struct ServeOpts {
    /// Email domains allowed to sign up, separated by commas.
    ///
    /// If empty, every domain may sign up.
    #[clap(
        long = "allowed-email-domains",
        env = "ALLOWED_EMAIL_DOMAINS",
        value_delimiter = ','
    )]
    allowed_email_domains: Vec<String>,

    /// Address to listen on.
    #[clap(long = "bind-address", default_value = "0.0.0.0:8000", env = "BIND_ADDRESS")]
    bind_address: SocketAddr,

    /// The number of connections to use for the database pool.
    #[clap(long = "database-pool-size", default_value = "16")]
    database_pool_size: u32,

    /// The number of seconds before a database connection times out.
    #[clap(long = "database-timeout", default_value = "5")]
    database_timeout: u8,

    /// Connection string for the application database.
    ///
    /// If this is not set, all data is kept in memory and lost on restart.
    #[clap(long = "database-url", env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Address to send emails from.
    #[clap(
        long = "email-from-address",
        default_value = "admin@localhost",
        env = "EMAIL_FROM_ADDRESS"
    )]
    email_from_address: String,

    /// Display name to send emails from.
    #[clap(
        long = "email-from-name",
        default_value = "Exchange",
        env = "EMAIL_FROM_NAME"
    )]
    email_from_name: String,

    /// The number of digits in codes issued by the local provider.
    ///
    /// Stytch always sends six digit codes.
    #[clap(
        long = "otp-length",
        default_value = "6",
        env = "OTP_LENGTH",
        value_parser = clap::value_parser!(u8).range(4..=10)
    )]
    otp_length: u8,

    /// Where verification codes come from.
    #[clap(
        long = "otp-provider",
        value_enum,
        default_value = "stytch",
        env = "OTP_PROVIDER"
    )]
    otp_provider: OtpProviderKind,

    /// The number of minutes a verification code stays valid.
    #[clap(long = "otp-ttl-minutes", default_value = "10", env = "OTP_TTL_MINUTES")]
    otp_ttl_minutes: u16,

    /// The number of seconds to wait for the OTP provider.
    #[clap(long = "provider-timeout", default_value = "10", env = "PROVIDER_TIMEOUT")]
    provider_timeout: u64,

    /// Connection string for Redis.
    ///
    /// If this is not set, rate limits are tracked in memory.
    #[clap(long = "redis-url", env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Secret key for encrypting application cookies.
    ///
    /// If this is changed, existing session cookies will become invalid.
    /// Generate with: openssl rand -base64 32
    #[clap(long = "secret-key", env = "SECRET_KEY")]
    secret_key: String,

    /// API key for SendGrid.
    ///
    /// If provided, emails will be sent using SendGrid. If this is not set,
    /// emails will be printed to stdout.
    #[clap(long = "sendgrid-key", env = "SENDGRID_KEY")]
    sendgrid_key: Option<String>,

    #[clap(long = "stytch-env", value_enum, default_value = "test", env = "STYTCH_ENV")]
    stytch_env: StytchEnv,

    #[clap(long = "stytch-project-id", env = "STYTCH_PROJECT_ID")]
    stytch_project_id: Option<String>,

    #[clap(long = "stytch-secret", env = "STYTCH_SECRET")]
    stytch_secret: Option<String>,
}

impl TryFrom<ServeOpts> for server::Options {
    type Error = anyhow::Error;

    fn try_from(opts: ServeOpts) -> anyhow::Result<Self> {
        let otp_provider = match opts.otp_provider {
            OtpProviderKind::Local => server::ProviderOptions::Local,
            OtpProviderKind::Stytch => match (opts.stytch_project_id, opts.stytch_secret) {
                (Some(project_id), Some(secret)) => server::ProviderOptions::Stytch {
                    environment: opts.stytch_env.into(),
                    project_id,
                    secret,
                },
                _ => {
                    return Err(anyhow!(
                        "The Stytch provider requires --stytch-project-id and --stytch-secret."
                    ))
                }
            },
        };

        Ok(Self {
            accounts: AccountsConfig {
                email_policy: EmailDomainPolicy::new(&opts.allowed_email_domains),
                otp_length: opts.otp_length.into(),
                otp_ttl_minutes: opts.otp_ttl_minutes.into(),
                provider_timeout: Duration::from_secs(opts.provider_timeout),
            },
            bind_address: opts.bind_address,
            database: opts.database_url.map(|url| server::DatabaseOptions {
                pool_size: opts.database_pool_size,
                timeout_seconds: opts.database_timeout,
                url,
            }),
            email_from_address: opts.email_from_address,
            email_from_name: opts.email_from_name,
            otp_provider,
            redis_url: opts.redis_url,
            secret_key: opts.secret_key,
            sendgrid_key: opts.sendgrid_key,
        })
    }
}

/// Install the tracing subscriber, along with Sentry reporting when a DSN is
/// given. The returned guard flushes pending events when dropped.
fn init_telemetry(sentry_dsn: Option<String>) -> Option<sentry::ClientInitGuard> {
    use tracing_subscriber::prelude::*;

    let sentry_guard = sentry_dsn.map(|dsn| {
        let release = option_env!("GIT_SHA")
            .map(Cow::from)
            .or_else(|| sentry::release_name!());

        sentry::init((
            dsn,
            sentry::ClientOptions {
                release,
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env()))
        .with(sentry_guard.as_ref().map(|_| sentry_tracing::layer()))
        .init();

    if sentry_guard.is_some() {
        debug!("Enabled sentry.");
    }

    sentry_guard
}

pub async fn run_with_sys_args() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _sentry_guard = init_telemetry(cli.sentry_dsn);

    match cli.command {
        Commands::CreateUser(opts) => create_user::create_user(opts.into()).await,
        Commands::Migrate(opts) => migrate::run_migrations(opts.into()).await,
        Commands::Serve(opts) => {
            if let Some(database_url) = opts.database_url.clone() {
                let migrate_opts = MigrateOpts { database_url };

                migrate::run_migrations(migrate_opts.into()).await?;
            }

            server::serve(server::Options::try_from(opts)?).await
        }
    }
}
