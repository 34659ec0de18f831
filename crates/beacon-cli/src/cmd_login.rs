use anyhow::{bail, Result};
use beacon_store::StorePaths;
use serde_json::Value as Json;
use tracing::info;

/// `beacon login --dev`
pub fn login(dev: bool) -> Result<()> {
    if !dev {
        bail!("Only development login is available from the terminal. Use `beacon login --dev`.");
    }
    let paths = StorePaths::discover();
    let (client, config) = crate::api_client(&paths)?;

    let rt = tokio::runtime::Runtime::new()?;
    let tokens = rt.block_on(client.dev_login())?;
    info!(api_url = %config.api_url, "logged in");
    println!(
        "Logged in to {} as {}",
        config.api_url,
        display_user(tokens.user.as_ref())
    );
    Ok(())
}

/// `beacon logout`
pub fn logout() -> Result<()> {
    let paths = StorePaths::discover();
    let (client, _) = crate::api_client(&paths)?;
    if !client.is_logged_in() {
        println!("Not logged in.");
        return Ok(());
    }
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(client.logout());
    println!("Logged out.");
    Ok(())
}

/// `beacon whoami`
pub fn whoami() -> Result<()> {
    let paths = StorePaths::discover();
    let (client, config) = crate::api_client(&paths)?;
    client.require_login()?;

    let rt = tokio::runtime::Runtime::new()?;
    let user = rt.block_on(client.current_user())?;
    println!("{} on {}", display_user(Some(&user)), config.api_url);
    Ok(())
}

/// Email, else id, of a user object from the auth endpoints.
fn display_user(user: Option<&Json>) -> &str {
    user.and_then(|u| u.get("email").or_else(|| u.get("id")))
        .and_then(Json::as_str)
        .unwrap_or("dev user")
}
