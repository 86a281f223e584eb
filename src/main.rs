use anyhow::anyhow;
use ballot_auth::domain_model::{Identity, UserId};
use ballot_auth::logger::*;
use ballot_auth::server::*;
use ballot_auth::settings::*;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let server = Server::try_new(&project_settings).await?;
    let tokens = server.token_service.as_ref();

    let Some(command) = cli.command else {
        info!("key material and revocation store ready");
        return Ok(());
    };

    let output = match command {
        Command::Issue {
            uid,
            email,
            previous,
        } => {
            let uid = uid.parse::<UserId>().map_err(|e| anyhow!(e))?;
            let pair = tokens
                .new_pair_from_user(&Identity::new(uid, email), previous.as_deref())
                .await?;
            json!({
                "tokens": pair,
                "tokenId": pair.refresh_token.id,
                "idTokenExpiresAt": pair.id_token.expires_at,
                "refreshTokenExpiresAt": pair.refresh_token.expires_at,
            })
        }
        Command::ValidateId { token } => {
            let identity = tokens.validate_id_token(&token)?;
            json!({ "user": identity })
        }
        Command::ValidateRefresh { token, check_store } => {
            let info = if check_store {
                tokens.validate_active_refresh_token(&token).await?
            } else {
                tokens.validate_refresh_token(&token)?
            };
            json!({
                "tokenId": info.token_id,
                "subject": info.subject,
                "expiresAt": info.expires_at,
            })
        }
        Command::SignOut { uid } => {
            let uid = uid.parse::<UserId>().map_err(|e| anyhow!(e))?;
            let removed = tokens.sign_out(&uid).await?;
            json!({ "uid": uid, "revoked": removed })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
