use super::print_queue;
use crate::context::{user_facing, AppContext};
use crate::output::Output;
use crate::QueueCommands;
use color_eyre::Result;
use qd_core::{services_in, PersonalQueueManager};
use qd_models::{GroupId, ItemId, QueueView, ServiceFilter};

pub async fn run_queue(cmd: QueueCommands, ctx: AppContext, output: &Output) -> Result<()> {
    let session = ctx.session()?;

    match cmd {
        QueueCommands::Add { name, service } => {
            let queue = PersonalQueueManager::new(ctx.store.clone(), ctx.lookup()?);
            let item = queue.add_item(&session, &name, &service).await.map_err(user_facing)?;
            output.emit(&item, || {
                output.success(format!("Added '{}' ({}) to your queue [{}]", item.name, item.service, item.id));
                if !item.has_poster() {
                    output.warn("No poster available for this title");
                }
            });
        }
        QueueCommands::List { sort, service } => {
            let queue = PersonalQueueManager::new(ctx.store.clone(), ctx.lookup_or_offline());
            let view = QueueView::new(sort.unwrap_or(ctx.config.queue.default_sort), ServiceFilter::from(service));
            let items = queue.list_visible(&session, &view).await.map_err(user_facing)?;
            output.emit(&items, || {
                output.info(format!("Your queue, {}", view.sort.label()));
                print_queue(&items);
                let services = services_in(&items);
                if !services.is_empty() {
                    output.info(format!("Services: {}", services.join(", ")));
                }
            });
        }
        QueueCommands::Watched { item_id } => {
            let queue = PersonalQueueManager::new(ctx.store.clone(), ctx.lookup_or_offline());
            queue
                .mark_watched(&session, &ItemId::new(item_id.trim()))
                .await
                .map_err(user_facing)?;
            output.success("Marked as watched");
        }
        QueueCommands::Copy { group_id, item_id } => {
            let queue = PersonalQueueManager::new(ctx.store.clone(), ctx.lookup_or_offline());
            let item = queue
                .copy_from_group(&session, &GroupId::new(group_id.trim()), &ItemId::new(item_id.trim()))
                .await
                .map_err(user_facing)?;
            output.emit(&item, || {
                output.success(format!("Copied '{}' to your queue", item.name));
            });
        }
    }

    Ok(())
}
