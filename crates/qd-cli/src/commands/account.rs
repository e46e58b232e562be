use crate::context::{user_facing, AppContext};
use crate::output::Output;
use crate::AccountCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use qd_core::{AccountService, QueueError};
use qd_models::UserId;
use qd_sources::DocumentStore;
use serde_json::json;

pub async fn run_account(cmd: AccountCommands, mut ctx: AppContext, output: &Output) -> Result<()> {
    match cmd {
        AccountCommands::Create { name, email, id } => create(&mut ctx, name, email, id, output).await,
        AccountCommands::Use { user_id } => use_account(&mut ctx, user_id, output).await,
        AccountCommands::Show => show(&ctx, output).await,
    }
}

async fn create(ctx: &mut AppContext, name: String, email: String, id: Option<String>, output: &Output) -> Result<()> {
    let user_id = UserId::new(id.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()));
    let accounts = AccountService::new(ctx.store.clone(), ctx.mailer(), ctx.config.notifications.clone());

    let signed_up = accounts.sign_up(&user_id, &name, &email).await.map_err(user_facing)?;
    if let Some(welcome) = signed_up.welcome {
        // let delivery finish before the process exits; its outcome is already logged
        let _ = welcome.await;
    }

    ctx.credentials.set_session_user_id(user_id.to_string());
    ctx.credentials
        .save()
        .map_err(|e| eyre!("Account created but the session could not be saved: {}", e))?;

    let user = signed_up.user;
    output.emit(&json!({ "id": user_id, "user": user }), || {
        output.success(format!("Created account for {} ({})", user.display_name, user_id));
        output.info(format!("You are now signed in as {}", user_id));
    });
    Ok(())
}

async fn use_account(ctx: &mut AppContext, user_id: String, output: &Output) -> Result<()> {
    let user_id = UserId::new(user_id.trim());
    let user = ctx
        .store
        .get_user(&user_id)
        .await
        .map_err(|e| user_facing(QueueError::from_store("load account", e)))?
        .ok_or_else(|| user_facing(QueueError::UserNotFound(user_id.clone())))?;

    ctx.credentials.set_session_user_id(user_id.to_string());
    ctx.credentials
        .save()
        .map_err(|e| eyre!("Failed to save session: {}", e))?;

    output.success(format!("Signed in as {} ({})", user.display_name, user_id));
    Ok(())
}

async fn show(ctx: &AppContext, output: &Output) -> Result<()> {
    let session = ctx.session()?;
    let user = ctx
        .store
        .get_user(session.user_id())
        .await
        .map_err(|e| user_facing(QueueError::from_store("load account", e)))?
        .ok_or_else(|| user_facing(QueueError::UserNotFound(session.user_id().clone())))?;

    output.emit(&json!({ "id": session.user_id(), "user": user }), || {
        output.info(format!("{} <{}>", user.display_name, user.email));
        output.info(format!("ID:       {}", session.user_id()));
        output.info(format!("Queue:    {} item(s), {} watched", user.queue.len(), user.watched_queue_items.len()));
        output.info(format!("Groups:   {}", user.groups.len()));
        if let Some(created) = user.created_at {
            output.info(format!("Joined:   {}", created.format("%Y-%m-%d")));
        }
    });
    Ok(())
}
