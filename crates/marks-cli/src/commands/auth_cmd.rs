use crate::auth::{clear_stored_session, load_stored_session, AuthSession, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::commands::common::auth_error;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            email,
            password,
            refresh_token,
        } => {
            let (profile_name, auth_service) =
                require_auth_service(profile.as_deref().or(global_profile))?;
            let credentials = LoginCredentials::from_args(email, password, refresh_token)?;
            let session = match credentials {
                LoginCredentials::Password { email, password } => {
                    auth_service.sign_in(&email, &password).await
                }
                LoginCredentials::RefreshToken(token) => {
                    auth_service.refresh_session(&token).await
                }
            }
            .map_err(auth_error)?;
            println!(
                "Signed in profile '{profile_name}' as {}",
                email_label(&session)
            );
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let Some(profile) = config.profile(&profile_name) else {
                println!("Profile '{profile_name}' is not configured.");
                return Ok(());
            };

            let session = match SupabaseAuthService::new_for_profile(&profile_name, profile)
                .map_err(auth_error)?
            {
                Some(service) => service.restore_session().await.map_err(auth_error)?,
                None => load_stored_session(&profile_name).map_err(auth_error)?,
            };

            if let Some(session) = session {
                println!(
                    "Profile '{}' is signed in as {} (user_id={}, expires_at={})",
                    profile_name,
                    email_label(&session),
                    session.user.id,
                    session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let stored_session = load_stored_session(&profile_name).map_err(auth_error)?;

            let auth_service = match config.profile(&profile_name) {
                Some(profile) => {
                    SupabaseAuthService::new_for_profile(&profile_name, profile).map_err(auth_error)?
                }
                None => None,
            };
            if let (Some(service), Some(session)) = (auth_service, stored_session) {
                service
                    .sign_out(&session.access_token)
                    .await
                    .map_err(auth_error)?;
            } else {
                clear_stored_session(&profile_name).map_err(auth_error)?;
            }

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
        AuthCommands::OauthUrl {
            profile,
            provider,
            redirect_to,
        } => {
            let (_, auth_service) = require_auth_service(profile.as_deref().or(global_profile))?;
            let url = auth_service
                .authorize_url(&provider, redirect_to.as_deref())
                .map_err(auth_error)?;
            println!("{url}");
            println!(
                "After signing in, run `marks auth login --refresh-token <token>` with the refresh_token from the redirect."
            );
            Ok(())
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoginCredentials {
    Password { email: String, password: String },
    RefreshToken(String),
}

impl LoginCredentials {
    pub fn from_args(
        email: Option<String>,
        password: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<Self, CliError> {
        match (email, password, refresh_token) {
            (Some(email), Some(password), None) => Ok(Self::Password { email, password }),
            (None, None, Some(token)) if !token.trim().is_empty() => {
                Ok(Self::RefreshToken(token.trim().to_string()))
            }
            _ => Err(CliError::Auth(
                "Provide --email and --password, or --refresh-token".to_string(),
            )),
        }
    }
}

fn require_auth_service(profile: Option<&str>) -> Result<(String, SupabaseAuthService), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile_config = config.profile(&profile_name).ok_or_else(|| {
        CliError::Config(format!(
            "Profile '{profile_name}' is not configured. Run `marks config init --profile {profile_name}` first."
        ))
    })?;
    let auth_service = SupabaseAuthService::new_for_profile(&profile_name, profile_config)
        .map_err(auth_error)?
        .ok_or_else(|| {
            CliError::Config(format!(
                "Profile '{profile_name}' missing Supabase auth config. Set SUPABASE_URL and SUPABASE_ANON_KEY via `marks config init`."
            ))
        })?;
    Ok((profile_name, auth_service))
}

pub fn email_label(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or("(no email)")
}
