use std::{fs, io::IsTerminal as _, path::Path};

use anyhow::{Context as _, Result, anyhow};
use matrix_sdk::{
    Client, SessionMeta,
    authentication::{SessionTokens, matrix::MatrixSession},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct SavedSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user_id: String,
    device_id: String,
}

#[derive(Debug)]
pub(crate) struct Credentials<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: Option<&'a str>,
    pub(crate) device_name: &'a str,
    pub(crate) session_file: &'a Path,
}

/// Restore the stored session, or log in with a password and store the new one.
pub(crate) async fn sign_in(client: &Client, creds: &Credentials<'_>) -> Result<()> {
    if let Some(session) = load_session(creds.session_file)? {
        info!(user_id = %session.user_id, "Restoring session");
        let matrix_session = MatrixSession {
            meta: SessionMeta {
                user_id: session.user_id.parse().context("invalid stored user_id")?,
                device_id: session.device_id.into(),
            },
            tokens: SessionTokens {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
            },
        };
        return client
            .restore_session(matrix_session)
            .await
            .context("restoring session");
    }

    let password = match creds.password.map(str::trim).filter(|s| !s.is_empty()) {
        Some(p) => p.to_owned(),
        None => prompt_password(creds.session_file)?,
    };

    info!(username = %creds.username, "Logging in");
    let response = client
        .matrix_auth()
        .login_username(creds.username, &password)
        .initial_device_display_name(creds.device_name)
        .request_refresh_token()
        .send()
        .await
        .context("login failed")?;

    let session = SavedSession {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        user_id: response.user_id.to_string(),
        device_id: response.device_id.to_string(),
    };
    save_session(creds.session_file, &session)?;
    info!(user_id = %session.user_id, device_id = %session.device_id, "Logged in");
    Ok(())
}

fn prompt_password(session_file: &Path) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return Err(anyhow!(
            "No MATRIX_PASSWORD provided and no stored session at {}",
            session_file.display()
        ));
    }
    warn!("No password provided via --password or MATRIX_PASSWORD. Prompting...");
    read_password()
}

#[cfg(feature = "rpassword")]
fn read_password() -> Result<String> {
    rpassword::prompt_password("Matrix password: ").map_err(|e| anyhow!("Failed to read password: {e}"))
}

#[cfg(not(feature = "rpassword"))]
fn read_password() -> Result<String> {
    Err(anyhow!("rpassword feature is not enabled. Cannot prompt for password."))
}

fn load_session(path: &Path) -> Result<Option<SavedSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading session file at {}", path.display()))?;
    let session = serde_json::from_str(&data).context("parsing session JSON")?;
    Ok(Some(session))
}

fn save_session(path: &Path, session: &SavedSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(session)?;
    fs::write(path, data).with_context(|| format!("writing session file at {}", path.display()))?;
    Ok(())
}
