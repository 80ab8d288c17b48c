use std::env;

use marks_core::config::{
    normalize_table_name, ENV_POLL_INTERVAL_SECS, ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL,
    ENV_TABLE,
};

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            table,
            poll_interval_secs,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileOverrides {
                supabase_url,
                supabase_anon_key,
                table,
                poll_interval_secs,
            },
            no_activate,
        ),
    }
}

/// Values given on the command line; unset fields fall back to the
/// environment, then to the stored profile.
#[derive(Debug, Default)]
pub struct ProfileOverrides {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub table: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

pub fn run_config_init(
    profile_name: Option<&str>,
    overrides: ProfileOverrides,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(&existing, overrides, |key| env::var(key).ok())?;
    *config.profile_mut_or_default(&profile_name) = merged;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profile(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_fields(profile);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `marks auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Combine explicit values, environment, and the stored profile, then check
/// the result is usable.
pub fn merge_profile(
    existing: &CliProfile,
    overrides: ProfileOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CliProfile, CliError> {
    let poll_from_env = normalize_text_option(lookup(ENV_POLL_INTERVAL_SECS))
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                CliError::Config(format!(
                    "{ENV_POLL_INTERVAL_SECS} must be a whole number of seconds"
                ))
            })
        })
        .transpose()?;

    let merged = CliProfile {
        supabase_url: normalize_text_option(overrides.supabase_url)
            .or_else(|| normalize_text_option(lookup(ENV_SUPABASE_URL)))
            .or_else(|| existing.supabase_url()),
        supabase_anon_key: normalize_text_option(overrides.supabase_anon_key)
            .or_else(|| normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)))
            .or_else(|| existing.supabase_anon_key()),
        table: normalize_text_option(overrides.table)
            .or_else(|| normalize_text_option(lookup(ENV_TABLE)))
            .or_else(|| existing.table()),
        poll_interval_secs: overrides
            .poll_interval_secs
            .or(poll_from_env)
            .or(existing.poll_interval_secs),
    };

    validate_profile(&merged)?;
    Ok(merged)
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !marks_core::config::is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    if let Some(table) = profile.table() {
        normalize_table_name(&table)?;
    }
    if profile.poll_interval_secs == Some(0) {
        return Err(CliError::Config(
            "poll_interval_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}
