use super::{groups_json, print_groups, print_queue, print_summaries};
use crate::context::{user_facing, AppContext};
use crate::output::Output;
use crate::GroupCommands;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use qd_core::{GroupDirectory, GroupRegistry, PosterUpload, SharedQueueSynchronizer};
use qd_models::{GroupId, QueueView, ServiceFilter, SortOption};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How often `group watch` checks the store file for writes from other processes
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run_group(cmd: GroupCommands, ctx: AppContext, output: &Output) -> Result<()> {
    let registry = Arc::new(
        GroupRegistry::new(ctx.store.clone(), ctx.blobs())
            .with_config(ctx.config.uploads.clone(), ctx.config.discovery.clone()),
    );

    match cmd {
        GroupCommands::Create { name, poster } => create(&ctx, &registry, name, poster, output).await,
        GroupCommands::Join { group_id } => {
            let session = ctx.session()?;
            let group = registry
                .join_by_id(&session, &GroupId::new(group_id))
                .await
                .map_err(user_facing)?;
            output.emit(&groups_json(std::slice::from_ref(&group)), || {
                output.success(format!("Joined '{}' ({} members)", group.name, group.members.len()));
            });
            Ok(())
        }
        GroupCommands::List { all } => {
            let mut directory = GroupDirectory::new(registry);
            directory.load_first_page().await.map_err(user_facing)?;
            if all {
                while directory.load_more().await.map_err(user_facing)? > 0 {}
            }
            output.emit(&groups_json(directory.groups()), || {
                print_groups(directory.groups());
                if directory.has_more() {
                    output.info("More groups available. Use --all to list every group.");
                }
            });
            Ok(())
        }
        GroupCommands::Search { term } => {
            let mut directory = GroupDirectory::new(registry);
            let groups = directory.search(&term).await.map_err(user_facing)?;
            output.emit(&groups_json(groups), || print_groups(groups));
            Ok(())
        }
        GroupCommands::Mine => {
            let session = ctx.session()?;
            let groups = registry.my_groups(&session).await.map_err(user_facing)?;
            output.emit(&groups, || print_summaries(&groups));
            Ok(())
        }
        GroupCommands::Add { group_id, name, service } => {
            let session = ctx.session()?;
            let shared = SharedQueueSynchronizer::new(ctx.store.clone(), ctx.lookup()?);
            let item = shared
                .add_shared_item(&session, &GroupId::new(group_id.trim()), &name, &service)
                .await
                .map_err(user_facing)?;
            output.emit(&item, || {
                output.success(format!("Added '{}' ({}) to the group queue [{}]", item.name, item.service, item.id));
            });
            Ok(())
        }
        GroupCommands::Show { group_id, sort, service } => {
            let session = ctx.session()?;
            let shared = SharedQueueSynchronizer::new(ctx.store.clone(), ctx.lookup_or_offline());
            let view = view_for(&ctx, sort, service);
            let items = shared
                .list_shared(&session, &GroupId::new(group_id.trim()), &view)
                .await
                .map_err(user_facing)?;
            output.emit(&items, || print_queue(&items));
            Ok(())
        }
        GroupCommands::Watch { group_id, sort, service } => watch(&ctx, group_id, view_for(&ctx, sort, service), output).await,
    }
}

fn view_for(ctx: &AppContext, sort: Option<SortOption>, service: Option<String>) -> QueueView {
    QueueView::new(sort.unwrap_or(ctx.config.queue.default_sort), ServiceFilter::from(service))
}

async fn create(
    ctx: &AppContext,
    registry: &GroupRegistry,
    name: String,
    poster: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let session = ctx.session()?;

    let upload = match poster {
        Some(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .wrap_err_with(|| format!("Failed to read poster {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| eyre!("Invalid poster file name: {}", path.display()))?;
            Some(PosterUpload::sniff(file_name, bytes))
        }
        None => None,
    };

    let group = registry.create_group(&session, &name, upload).await.map_err(user_facing)?;
    output.emit(&groups_json(std::slice::from_ref(&group)), || {
        output.success(format!("Created group '{}'", group.name));
        output.info(format!("Share this Group ID so friends can join: {}", group.id));
    });
    Ok(())
}

/// Live view until Ctrl-C. Other processes write to the same store file, so
/// the store is reloaded on a timer and the subscription fires on changes.
async fn watch(ctx: &AppContext, group_id: String, view: QueueView, output: &Output) -> Result<()> {
    let session = ctx.session()?;
    let shared = SharedQueueSynchronizer::new(ctx.store.clone(), ctx.lookup_or_offline());
    let mut live = shared.subscribe(&session, &GroupId::new(group_id.trim()), view);

    let initial = live.current().map_err(user_facing)?;
    output.emit(&initial, || print_queue(&initial));
    if output.is_human() {
        output.info("Watching for changes. Press Ctrl-C to stop.");
    }

    let mut poll = tokio::time::interval(WATCH_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Ctrl-C received, stopping watch");
                break;
            }
            _ = poll.tick() => {
                if let Err(e) = ctx.store.reload().await {
                    warn!("Failed to reload store: {}", e);
                }
            }
            update = live.next() => match update {
                Some(Ok(items)) => output.emit(&items, || {
                    println!();
                    print_queue(&items);
                }),
                Some(Err(e)) => output.error(e.user_message()),
                None => break,
            },
        }
    }

    live.unsubscribe();
    Ok(())
}
