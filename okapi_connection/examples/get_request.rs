use clap::Parser;
use okapi_connection::{
    strategies::{FixedCredentials, FixedTokenStrategy},
    AccessToken, Connection, Tenant, Username,
};
use reqwest::header::HeaderMap;

#[derive(Debug, Parser)]
struct Opts {
    /// The base address of the Okapi gateway
    #[arg(short, long, env = "OKAPI_URL")]
    okapi_url: url::Url,

    /// The tenant to act for
    #[arg(short, long, env = "OKAPI_TENANT")]
    tenant: Tenant,

    /// The user to log in as
    #[arg(short, long, env = "OKAPI_USERNAME", required_unless_present = "token")]
    username: Option<Username>,

    /// The password of the user
    #[arg(short, long, env = "OKAPI_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// A token issued beforehand, used instead of logging in
    #[arg(long, env = "OKAPI_TOKEN", hide_env_values = true)]
    token: Option<AccessToken>,

    /// Query parameters, given as `key=value`
    #[arg(short, long = "query", value_parser = parse_pair)]
    query: Vec<(String, String)>,

    /// The path to request, relative to the base address
    path: String,
}

fn parse_pair(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected `key=value`, got `{}`", arg))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let connection = match (opts.token, opts.username) {
        (Some(token), _) => {
            Connection::new(opts.okapi_url, opts.tenant, FixedTokenStrategy::new(token))?
        }
        (None, Some(username)) => Connection::new(
            opts.okapi_url,
            opts.tenant,
            FixedCredentials::login_with_username(username, opts.password.unwrap_or_default()),
        )?,
        (None, None) => color_eyre::eyre::bail!("either a token or a username is required"),
    };

    let query: Vec<(&str, &str)> = opts
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let response = connection
        .get(&opts.path, &query, &HeaderMap::new())
        .await?;

    if response.is_json() {
        let value: serde_json::Value = response.json()?;
        println!("{:#}", value);
    } else {
        println!("{}", response.text());
    }

    Ok(())
}
