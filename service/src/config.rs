use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default GitHub authorize endpoint used when `GITHUB_AUTHORIZE_URL` is not set.
pub const DEFAULT_GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

/// Default GitHub token endpoint used when `GITHUB_TOKEN_URL` is not set.
/// Override in tests to point at a mock server.
pub const DEFAULT_GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The client ID of the GitHub OAuth App the editor signs in through.
    /// Must be visible to the runtime serving the auth endpoints, not merely
    /// to a build step.
    #[arg(long, env = "GITHUB_CLIENT_ID")]
    github_client_id: Option<String>,

    /// The client secret of the GitHub OAuth App, used only for the
    /// code-for-token exchange on the callback endpoint.
    #[arg(long, env = "GITHUB_CLIENT_SECRET")]
    github_client_secret: Option<String>,

    /// The externally visible origin of the site (e.g. https://www.example.com).
    /// When unset, the origin is derived per request from the
    /// x-forwarded-proto/x-forwarded-host headers.
    #[arg(long, env = "SITE_URL")]
    site_url: Option<String>,

    /// The GitHub authorize endpoint the start endpoint redirects to.
    #[arg(long, env, default_value = DEFAULT_GITHUB_AUTHORIZE_URL)]
    github_authorize_url: String,

    /// The GitHub token endpoint the authorization code is exchanged against.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_GITHUB_TOKEN_URL)]
    github_token_url: String,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the GitHub OAuth App client ID, if configured.
    pub fn github_client_id(&self) -> Option<String> {
        self.github_client_id.clone()
    }

    /// Returns the GitHub OAuth App client secret, if configured.
    pub fn github_client_secret(&self) -> Option<String> {
        self.github_client_secret.clone()
    }

    /// Returns the configured externally visible site origin, if any.
    pub fn site_url(&self) -> Option<String> {
        self.site_url.clone()
    }

    /// Returns the GitHub authorize endpoint URL.
    pub fn github_authorize_url(&self) -> &str {
        &self.github_authorize_url
    }

    /// Returns the GitHub token endpoint URL.
    pub fn github_token_url(&self) -> &str {
        &self.github_token_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        // This could check an environment variable, or a config field
        self.runtime_env() == RustEnv::Production
    }
}
