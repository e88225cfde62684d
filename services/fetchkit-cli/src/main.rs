//! fetchkit command-line client
//!
//! Issues one JSON request or multipart upload through a `fetchkit::Client`
//! and prints the decoded response:
//!
//! ```text
//! fetchkit [--config PATH] <get|post|put|patch|delete> <url> [json-body]
//! fetchkit [--config PATH] upload <url> <file>...
//! ```
//!
//! A bearer token (from `FETCHKIT_TOKEN` or `[auth] token_file`) is attached
//! to every request; a 401 re-reads `token_file` and retries once.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use fetchkit::header::{AUTHORIZATION, HeaderValue};
use fetchkit::{
    CancellationToken, Client, HttpMethod, RequestOptions, UploadFile, UploadOptions,
};
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug, PartialEq)]
enum Command {
    Request {
        method: HttpMethod,
        url: String,
        body: Option<Value>,
    },
    Upload {
        url: String,
        files: Vec<PathBuf>,
    },
}

/// Split `--config PATH` out of the arguments, returning it and the rest.
fn split_config_flag(args: &[String]) -> (Option<&str>, Vec<&str>) {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next().map(String::as_str);
        } else {
            rest.push(arg.as_str());
        }
    }
    (config, rest)
}

fn parse_command(args: &[&str]) -> Result<Command> {
    let Some((verb, rest)) = args.split_first() else {
        bail!("usage: fetchkit [--config PATH] <get|post|put|patch|delete|upload> <url> ...");
    };
    let Some((url, rest)) = rest.split_first() else {
        bail!("missing url for {verb}");
    };
    let url = url.to_string();

    if verb.eq_ignore_ascii_case("upload") {
        if rest.is_empty() {
            bail!("upload needs at least one file");
        }
        let files = rest.iter().map(PathBuf::from).collect();
        return Ok(Command::Upload { url, files });
    }

    let method: HttpMethod = verb
        .parse()
        .with_context(|| format!("unknown command {verb}"))?;
    let body = match rest {
        [] => None,
        [json] => Some(serde_json::from_str(json).context("request body is not valid JSON")?),
        _ => bail!("too many arguments for {verb}"),
    };
    if body.is_some() && matches!(method, HttpMethod::Get | HttpMethod::Delete) {
        bail!("{verb} does not take a body");
    }

    Ok(Command::Request { method, url, body })
}

/// Attach the configured token and wire `token_file` re-reads as the refresh
/// handler.
fn install_auth(client: &Client, config: &Config) {
    if let Some(token) = config.token.clone() {
        client.add_request_interceptor(move |mut request| {
            let token = token.clone();
            async move {
                if !request.headers.contains_key(AUTHORIZATION) {
                    let mut value = HeaderValue::from_str(&token.bearer())
                        .map_err(|e| fetchkit::Error::InvalidHeader(format!("authorization: {e}")))?;
                    value.set_sensitive(true);
                    request.headers.insert(AUTHORIZATION, value);
                }
                Ok::<_, fetchkit::Error>(request)
            }
        });
    }

    if let Some(path) = config.auth.token_file.clone() {
        client.set_refresh_token_handler(move || {
            let path = path.clone();
            async move {
                let token = tokio::task::spawn_blocking(move || crate::config::read_token_file(&path))
                    .await
                    .map_err(|e| common::Error::Config(format!("token reader panicked: {e}")))??;
                if token.is_empty() {
                    return Err(common::Error::Config("token_file is empty".into()));
                }
                info!("re-read token from token_file");
                Ok::<_, common::Error>(token.expose().to_owned())
            }
        });
    }
}

async fn run(client: &Client, command: Command, signal: CancellationToken) -> Result<Value> {
    match command {
        Command::Request { method, url, body } => {
            let options = RequestOptions::new().signal(signal);
            client
                .send_request(method, &url, options, body.as_ref())
                .await
                .with_context(|| format!("{method} {url} failed"))
        }
        Command::Upload { url, files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let file = UploadFile::from_path(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                uploads.push(file);
            }
            let options = UploadOptions::new()
                .signal(signal)
                .on_progress(|percent| debug!(percent, "upload progress"));
            client
                .upload(&url, uploads, options)
                .await
                .with_context(|| format!("upload to {url} failed"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the response
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config_path, rest) = split_config_flag(&args);
    let command = parse_command(&rest)?;

    let (config_path, explicit) = Config::resolve_path(cli_config_path);
    debug!(path = %config_path.display(), explicit, "loading configuration");
    let config = if explicit {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.client.base_url,
        retries = config.client.retries,
        authenticated = config.token.is_some(),
        "configuration loaded"
    );

    let client = Client::new(config.client.clone());
    install_auth(&client, &config);

    let signal = CancellationToken::new();
    let on_interrupt = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, aborting request");
            on_interrupt.cancel();
        }
    });

    let value = run(&client, command, signal).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn config_flag_is_split_out() {
        let raw = args(&["--config", "/tmp/f.toml", "get", "/users"]);
        let (config, rest) = split_config_flag(&raw);
        assert_eq!(config, Some("/tmp/f.toml"));
        assert_eq!(rest, vec!["get", "/users"]);
    }

    #[test]
    fn config_flag_may_follow_command() {
        let raw = args(&["get", "/users", "--config", "f.toml"]);
        let (config, rest) = split_config_flag(&raw);
        assert_eq!(config, Some("f.toml"));
        assert_eq!(rest, vec!["get", "/users"]);
    }

    #[test]
    fn parses_get() {
        assert_eq!(
            parse_command(&["get", "/users"]).unwrap(),
            Command::Request {
                method: HttpMethod::Get,
                url: "/users".into(),
                body: None,
            }
        );
    }

    #[test]
    fn parses_post_with_body() {
        assert_eq!(
            parse_command(&["POST", "/users", r#"{"name":"test"}"#]).unwrap(),
            Command::Request {
                method: HttpMethod::Post,
                url: "/users".into(),
                body: Some(serde_json::json!({"name": "test"})),
            }
        );
    }

    #[test]
    fn parses_upload() {
        assert_eq!(
            parse_command(&["upload", "https://files.test/up", "a.txt", "b.png"]).unwrap(),
            Command::Upload {
                url: "https://files.test/up".into(),
                files: vec![PathBuf::from("a.txt"), PathBuf::from("b.png")],
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command(&[]).is_err());
        assert!(parse_command(&["get"]).is_err());
        assert!(parse_command(&["options", "/"]).is_err());
        assert!(parse_command(&["post", "/", "{not json"]).is_err());
        assert!(parse_command(&["get", "/", "{}"]).is_err());
        assert!(parse_command(&["upload", "/"]).is_err());
        assert!(parse_command(&["put", "/", "{}", "extra"]).is_err());
    }

    #[tokio::test]
    async fn token_interceptor_adds_bearer() {
        let client = Client::default();
        let config = Config {
            token: Some(common::Secret::new("abc")),
            ..Config::default()
        };
        install_auth(&client, &config);

        let request = client
            .interceptors()
            .apply_request(fetchkit::HttpRequest::new(HttpMethod::Get, "/"))
            .await
            .unwrap();
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer abc");
    }

    #[tokio::test]
    async fn refresh_handler_rereads_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "first\n").unwrap();

        let client = Client::default();
        let mut config = Config::default();
        config.auth.token_file = Some(path.clone());
        install_auth(&client, &config);

        assert_eq!(client.refresh_token().await.unwrap(), "first");
        std::fs::write(&path, "rotated").unwrap();
        assert_eq!(client.refresh_token().await.unwrap(), "rotated");
    }

    #[tokio::test]
    async fn empty_token_file_fails_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();

        let client = Client::default();
        let mut config = Config::default();
        config.auth.token_file = Some(path);
        install_auth(&client, &config);

        assert!(client.refresh_token().await.is_err());
    }
}
