//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use clinic_portal_platform_access::{ClientConfig, ProfileUpdate};
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Clinic portal command-line client", long_about = None)]
pub struct Cli {
    /// Backend API base URL (overrides CLINIC__API_BASE_URL)
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Credential file (overrides CLINIC__CREDENTIAL_FILE)
    #[arg(long, global = true)]
    pub credential_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Applies command-line overrides on top of the environment.
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.api_base_url {
            config.api_base_url.clone_from(url);
        }
        if let Some(path) = &self.credential_file {
            config.credential_file.clone_from(path);
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the issued credentials
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account (does not sign in)
    Register(RegisterArgs),
    /// Sign out and remove stored credentials
    Logout,
    /// Show the signed-in user (verified with the backend only when no profile is cached)
    Status,
    /// Update the signed-in user's profile
    UpdateProfile(ProfileArgs),
    /// Call an API path with the stored credentials
    Request {
        /// HTTP method, e.g. GET or POST
        #[arg(value_parser = parse_method)]
        method: Method,
        /// Path below the API base URL, e.g. /patients
        path: String,
        /// JSON request body
        #[arg(long, value_parser = parse_json)]
        body: Option<Value>,
    },
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
    pub password: String,
    #[arg(long)]
    pub full_name: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub clinic_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub full_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        Self {
            email: args.email,
            full_name: args.full_name,
            phone: args.phone,
        }
    }
}

fn parse_method(raw: &str) -> Result<Method, String> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid HTTP method '{raw}': {e}"))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn status_help_describes_cached_profile() {
        let command = Cli::command();
        let about = command
            .find_subcommand("status")
            .and_then(|status| status.get_about())
            .map(ToString::to_string)
            .expect("status about");
        assert!(about.contains("only when no profile is cached"));
    }

    #[test]
    fn request_parses_method_and_body() {
        let cli = Cli::try_parse_from([
            "clinic-portal",
            "request",
            "post",
            "/patients",
            "--body",
            r#"{"name":"Rui"}"#,
        ])
        .expect("parse");

        match cli.command {
            Command::Request { method, path, body } => {
                assert_eq!(method, Method::POST);
                assert_eq!(path, "/patients");
                assert_eq!(body, Some(serde_json::json!({ "name": "Rui" })));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn invalid_body_is_rejected() {
        let result =
            Cli::try_parse_from(["clinic-portal", "request", "PUT", "/x", "--body", "{oops"]);
        assert!(result.is_err());
    }

    #[test]
    fn overrides_replace_environment() {
        let cli = Cli::try_parse_from([
            "clinic-portal",
            "status",
            "--api-base-url",
            "https://api.clinic.example",
            "--credential-file",
            "/tmp/session.json",
        ])
        .expect("parse");

        let mut config = ClientConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.api_base_url, "https://api.clinic.example");
        assert_eq!(config.credential_file, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.sign_in_path, "/signin");
    }

    #[test]
    fn profile_args_become_partial_update() {
        let update = ProfileUpdate::from(ProfileArgs {
            email: None,
            full_name: Some("Ana".to_string()),
            phone: None,
        });
        assert_eq!(update.full_name.as_deref(), Some("Ana"));
        assert!(update.email.is_none());
        assert!(!update.is_empty());
    }
}
