//! Command implementations on top of the session controller.

use clinic_portal_platform_access::{
    ApiRequest, LoginCredentials, Navigator, Profile, ProfileUpdate, Registration,
    SessionController,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Command, RegisterArgs};
use crate::error::CliError;

/// Turns navigation requests into hints for the terminal user.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        debug!(page = path, "Navigation requested");
    }
}

pub async fn run(
    command: Command,
    session: &SessionController,
) -> clinic_portal_core::Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let profile = session
                .login(&LoginCredentials::new(email, password))
                .await
                .map_err(CliError::from)?;
            println!("Signed in as {}", describe(&profile));
        }
        Command::Register(args) => {
            let receipt = session
                .register(&registration(args))
                .await
                .map_err(CliError::from)?;
            let message = receipt
                .and_then(|r| r.message)
                .unwrap_or_else(|| "Account created".to_string());
            println!("{message}. Sign in with `login` to continue.");
        }
        Command::Logout => {
            session.logout().await;
            println!("Signed out");
        }
        Command::Status => {
            session.initialize().await;
            if session.is_authenticated() {
                if let Some(profile) = session.user() {
                    println!("{}", summary(&profile));
                }
            } else {
                println!("Not signed in");
                if let Some(error) = session.state().error {
                    println!("{error}");
                }
            }
        }
        Command::UpdateProfile(args) => {
            let update = ProfileUpdate::from(args);
            if update.is_empty() {
                return Err(CliError::NothingToDo {
                    details: "pass at least one of --email, --full-name or --phone".to_string(),
                }
                .into());
            }
            let profile = session
                .update_profile(&update)
                .await
                .map_err(CliError::from)?;
            println!("{}", summary(&profile));
        }
        Command::Request { method, path, body } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = session.execute::<Value>(&request).await;
            let status = response.status;
            let data = response
                .into_result()
                .map_err(|error| CliError::Api { status, error })?;
            println!("{}", render(&data));
        }
    }

    Ok(())
}

fn registration(args: RegisterArgs) -> Registration {
    Registration {
        email: args.email,
        password: args.password,
        full_name: args.full_name,
        phone: args.phone,
        clinic_name: args.clinic_name,
    }
}

fn render(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

fn describe(profile: &Profile) -> String {
    match profile.full_name().or(profile.email()) {
        Some(name) => format!("{name} ({})", profile.role()),
        None => format!("{} ({})", profile.id(), profile.role()),
    }
}

fn summary(profile: &Profile) -> String {
    let mut lines = vec![
        format!("User:        {}", describe(profile)),
        format!("Id:          {}", profile.id()),
    ];
    if let Some(email) = profile.email() {
        lines.push(format!("Email:       {email}"));
    }
    if let Some(clinic) = profile.clinic_id() {
        lines.push(format!("Clinic:      {clinic}"));
    }
    let permissions: Vec<&str> = profile.permissions().iter().collect();
    lines.push(format!(
        "Permissions: {}",
        if permissions.is_empty() {
            "none".to_string()
        } else {
            permissions.join(", ")
        }
    ));
    lines.join("\n")
}
