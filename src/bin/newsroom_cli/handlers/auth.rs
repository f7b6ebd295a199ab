#![deny(clippy::all, clippy::pedantic)]

use newsroom::auth::{ProfileForm, SignUpForm};
use newsroom::error::ApiError;
use newsroom::navigation::Navigation;
use newsroom::session::BearerToken;
use serde_json::json;

use crate::args::AuthCmd;
use crate::client::{CliError, Ctx};
use crate::io::{confirm, read_opt_blob, read_password, read_secret};
use crate::print::print_json;

pub async fn handle(ctx: &mut Ctx, cmd: AuthCmd) -> Result<(), CliError> {
    match cmd {
        AuthCmd::SignIn { email, password } => {
            let password = read_password(password)?.ok_or_else(password_required)?;
            let next = ctx.auth.sign_in(&email, &password).await?;
            signed_in(ctx, &next)
        }
        AuthCmd::SignUp {
            username,
            email,
            password,
            avatar,
        } => {
            let form = SignUpForm {
                username,
                email,
                password: read_password(password)?.ok_or_else(password_required)?,
                profile_image: read_opt_blob(avatar).await?,
            };
            let next = ctx.auth.sign_up(form).await?;
            print_json(&json!({ "message": "Account created", "next": next.path() }))
        }
        AuthCmd::Oauth {
            token_file,
            token_env,
        } => {
            let token = read_secret(token_file, token_env)?.ok_or_else(|| {
                CliError::InvalidInput(
                    "token required (use --token-file or NEWSROOM_OAUTH_TOKEN)".into(),
                )
            })?;
            let next = ctx.auth.complete_oauth(BearerToken::new(token)).await?;
            signed_in(ctx, &next)
        }
        AuthCmd::Whoami => {
            let session = ctx.auth.context().current().ok_or(ApiError::AuthMissing)?;
            print_json(session.user())
        }
        AuthCmd::UpdateProfile {
            username,
            email,
            password,
            avatar,
        } => {
            let form = ProfileForm {
                username,
                email,
                password: read_password(password)?,
                profile_image: read_opt_blob(avatar).await?,
            };
            let user = ctx.auth.update_profile(form).await?;
            print_json(&user)
        }
        AuthCmd::SignOut => {
            let next = ctx.auth.sign_out().await?;
            print_json(&json!({ "message": "Signed out", "next": next.path() }))
        }
        AuthCmd::DeleteAccount => {
            let session = ctx.auth.context().current().ok_or(ApiError::AuthMissing)?;
            let prompt = format!("Delete account {}? This cannot be undone.", session.email());
            if !confirm(&prompt, ctx.assume_yes)? {
                eprintln!("Cancelled");
                return Ok(());
            }
            let next = ctx.auth.delete_account().await?;
            print_json(&json!({ "message": "Account deleted", "next": next.path() }))
        }
    }
}

fn signed_in(ctx: &Ctx, next: &Navigation) -> Result<(), CliError> {
    let session = ctx.auth.context().current().ok_or(ApiError::AuthMissing)?;
    print_json(&json!({ "user": session.user(), "next": next.path() }))
}

fn password_required() -> CliError {
    CliError::InvalidInput("password required (use --password-file or NEWSROOM_PASSWORD)".into())
}
