use crate::{
    cli::{actions::Action, globals::GlobalArgs},
    db,
    flow::{validate::SignInInput, SignInFlow, Submission, TracingNavigator},
    provider::HttpIdentityProvider,
};
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Handle the run action: verify startup configuration, then drive an
/// interactive sign-in through the real flow controller.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Run {
        dsn,
        provider_url,
        post_auth_path,
    } = action;

    let globals = GlobalArgs::new(provider_url, SecretString::from(dsn), post_auth_path);

    // Missing or unreachable database is fatal before any flow runs.
    let pool = db::connect(globals.dsn.expose_secret()).await?;
    db::ping(&pool).await?;
    info!("database reachable");

    let provider = HttpIdentityProvider::new(&globals.provider_url)?;

    let flow = SignInFlow::new(provider, TracingNavigator)
        .with_post_auth_path(globals.post_auth_path.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("identifier:");
        let Some(identifier) = lines.next_line().await? else {
            break;
        };

        println!("password:");
        let Some(password) = lines.next_line().await? else {
            break;
        };

        let input = SignInInput {
            identifier,
            password,
        };

        flow.submit(&input).await;

        match flow.submission() {
            Submission::Succeeded => {
                println!("signed in, continue at {}", globals.post_auth_path);
                break;
            }
            Submission::Failed(message) => {
                for (field, error) in flow.field_errors() {
                    println!("{field}: {error}");
                }
                println!("{message}");
                flow.edited();
            }
            Submission::Idle | Submission::Submitting => {}
        }
    }

    Ok(())
}
