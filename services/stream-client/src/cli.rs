//! Argument parsing: `[--config PATH] [--metrics] [METHOD PATH]...`

use reqwest::Method;
use transport::ApiRequest;

use crate::error::{Error, Result};

/// Parsed command line.
#[derive(Debug, Default)]
pub struct Cli {
    pub config_path: Option<String>,
    /// Print a Prometheus snapshot of the auth metrics to stderr on exit
    pub metrics: bool,
    pub requests: Vec<ApiRequest>,
}

impl Cli {
    /// Parse arguments (without the program name).
    ///
    /// With no requests given, defaults to `GET /recommendedmovies`.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut cli = Cli::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    cli.config_path = Some(args.next().ok_or(Error::MissingConfigPath)?);
                }
                "--metrics" => cli.metrics = true,
                flag if flag.starts_with("--") => {
                    return Err(Error::UnknownFlag(flag.to_string()));
                }
                method => {
                    let parsed = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                        .map_err(|_| Error::InvalidMethod(method.to_string()))?;
                    let path = args
                        .next()
                        .ok_or_else(|| Error::MissingPath(method.to_string()))?;
                    cli.requests.push(ApiRequest::new(parsed, path));
                }
            }
        }
        if cli.requests.is_empty() {
            cli.requests.push(ApiRequest::get("/recommendedmovies"));
        }
        Ok(cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli> {
        Cli::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn defaults_to_recommended_movies() {
        let cli = parse(&[]).unwrap();
        assert!(cli.config_path.is_none());
        assert!(!cli.metrics);
        assert_eq!(cli.requests.len(), 1);
        assert_eq!(cli.requests[0].method, Method::GET);
        assert_eq!(cli.requests[0].path, "/recommendedmovies");
    }

    #[test]
    fn parses_config_and_requests() {
        let cli = parse(&[
            "--config",
            "client.toml",
            "get",
            "/movies",
            "--metrics",
            "GET",
            "/movie/tt0111161",
        ])
        .unwrap();
        assert_eq!(cli.config_path.as_deref(), Some("client.toml"));
        assert!(cli.metrics);
        let paths: Vec<_> = cli.requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/movies", "/movie/tt0111161"]);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(parse(&["--config"]).unwrap_err(), Error::MissingConfigPath);
        assert_eq!(
            parse(&["GET"]).unwrap_err(),
            Error::MissingPath("GET".into())
        );
        assert_eq!(
            parse(&["--verbose"]).unwrap_err(),
            Error::UnknownFlag("--verbose".into())
        );
        assert!(matches!(
            parse(&["G(T", "/movies"]).unwrap_err(),
            Error::InvalidMethod(_)
        ));
    }
}
