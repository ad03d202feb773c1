//! `login`, `logout` and `status`

use std::time::Duration;

use anyhow::{bail, Context as _};
use tracing::warn;
use tunestats_common::auth::{LoginOutcome, SessionState};
use tunestats_infra::OAuthCallbackServer;

use crate::context::AppContext;

/// Sign in. With `code` the pending attempt is finished directly; otherwise
/// the browser is opened and the redirect caught on the loopback URI.
pub async fn login(ctx: &AppContext, code: Option<&str>, timeout_secs: u64) -> anyhow::Result<()> {
    if let Some(code) = code {
        return finish_login(ctx, code).await;
    }

    let redirect_uri = &ctx.config.auth.redirect_uri;
    let server = match OAuthCallbackServer::bind(redirect_uri).await {
        Ok(server) => Some(server),
        Err(e) => {
            warn!(error = %e, redirect_uri = %redirect_uri, "Callback listener unavailable");
            None
        }
    };

    match ctx.service.login(None).await.context("could not start authorization")? {
        LoginOutcome::Redirected => {}
        LoginOutcome::Authenticated => return Ok(()),
    }

    let Some(server) = server else {
        println!("Finish signing in in the browser, then run:");
        println!("  tunestats login --code <CODE>");
        println!("with the `code` parameter from the address you were sent to.");
        return Ok(());
    };

    println!("Waiting for the browser redirect on {} ...", server.callback_url());
    let received = server.wait_for_code(Duration::from_secs(timeout_secs)).await;
    if let Err(e) = server.shutdown().await {
        warn!(error = %e, "Callback listener did not shut down cleanly");
    }
    let code = received.context("no authorization code received")?;

    finish_login(ctx, &code).await
}

async fn finish_login(ctx: &AppContext, code: &str) -> anyhow::Result<()> {
    match ctx.service.login(Some(code)).await.context("login failed")? {
        LoginOutcome::Authenticated => {}
        LoginOutcome::Redirected => bail!("authorization code was empty"),
    }

    match ctx.service.profile().await {
        Ok(profile) => println!("Signed in as {}", profile.name()),
        Err(e) => {
            warn!(error = %e, "Signed in but profile unavailable");
            println!("Signed in");
        }
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.service.logout().await.context("logout failed")?;
    println!("Signed out");
    Ok(())
}

/// Print the session state without touching the network.
pub async fn status(ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.state() {
        SessionState::Authenticated | SessionState::Expired => {
            match ctx.service.user_profile().await {
                Some(profile) => println!("Signed in as {}", profile.name()),
                None => println!("Signed in"),
            }
        }
        SessionState::Authenticating => println!("Sign-in in progress"),
        SessionState::Unauthenticated => println!("Not signed in. Run `tunestats login`."),
    }
    Ok(())
}
