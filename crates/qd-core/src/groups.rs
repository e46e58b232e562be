use crate::error::QueueError;
use crate::session::Session;
use crate::upload::PosterUpload;
use chrono::Utc;
use qd_config::{DiscoveryConfig, UploadConfig};
use qd_models::{Group, GroupCursor, GroupId, GroupSummary};
use qd_sources::{poster_key, BlobStore, DocumentStore, Write, WriteBatch};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Label for ids in `User.groups` whose group document is gone
pub const UNKNOWN_GROUP_NAME: &str = "Unknown Group";

/// One page of the discovery listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPage {
    pub groups: Vec<Group>,
    /// Position after the last returned group; pass back to get the next page
    pub cursor: Option<GroupCursor>,
    pub has_more: bool,
}

/// Group creation, discovery and membership
pub struct GroupRegistry {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    uploads: UploadConfig,
    discovery: DiscoveryConfig,
}

impl GroupRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            uploads: UploadConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }

    pub fn with_config(mut self, uploads: UploadConfig, discovery: DiscoveryConfig) -> Self {
        self.uploads = uploads;
        self.discovery = discovery;
        self
    }

    pub fn discovery(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// Create a group with the caller as its only member.
    ///
    /// A supplied poster is validated and uploaded first; if that fails no
    /// group is created. The group document and the creator's `groups` link
    /// are written in one batch.
    #[instrument(skip(self, session, poster), fields(user = %session.user_id()))]
    pub async fn create_group(
        &self,
        session: &Session,
        name: &str,
        poster: Option<PosterUpload>,
    ) -> Result<Group, QueueError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueueError::validation("Please enter a group name"));
        }

        let poster_url = match poster {
            Some(upload) => Some(self.upload_poster(session, upload).await?),
            None => None,
        };

        let group = Group::new(self.store.allocate_group_id(), name, session.user_id().clone(), poster_url);
        let batch = WriteBatch::new()
            .with(Write::CreateGroup(group.clone()))
            .with(Write::UnionUserGroups {
                user: session.user_id().clone(),
                group: group.id.clone(),
            });

        self.store.commit(batch).await.map_err(|e| {
            warn!("Failed to create group '{}': {}", name, e);
            QueueError::from_store("create group", e)
        })?;

        info!("Created group '{}' ({})", group.name, group.id);
        Ok(group)
    }

    async fn upload_poster(&self, session: &Session, upload: PosterUpload) -> Result<String, QueueError> {
        upload.validate(&self.uploads)?;

        let key = poster_key(session.user_id(), Utc::now(), &upload.file_name);
        let url = self
            .blobs
            .upload(&key, &upload.bytes, &upload.content_type)
            .await
            .map_err(|e| {
                warn!("Poster upload to {} failed: {}", key, e);
                QueueError::from_upload(e)
            })?;

        debug!("Uploaded group poster to {}", url);
        Ok(url)
    }

    /// Join a group by its id. Joining a group the caller already belongs to
    /// is rejected, not silently accepted.
    #[instrument(skip(self, session), fields(user = %session.user_id()))]
    pub async fn join_by_id(&self, session: &Session, group_id: &GroupId) -> Result<Group, QueueError> {
        if group_id.is_empty() {
            return Err(QueueError::validation("Please enter a Group ID"));
        }
        let group_id = GroupId::new(group_id.as_str().trim());

        let mut group = self
            .store
            .get_group(&group_id)
            .await
            .map_err(|e| QueueError::from_store("join group", e))?
            .ok_or_else(|| QueueError::GroupNotFound(group_id.clone()))?;

        if group.has_member(session.user_id()) {
            return Err(QueueError::AlreadyMember {
                user: session.user_id().clone(),
                group: group_id,
            });
        }

        let batch = WriteBatch::new()
            .with(Write::UnionGroupMembers {
                group: group_id.clone(),
                user: session.user_id().clone(),
            })
            .with(Write::UnionUserGroups {
                user: session.user_id().clone(),
                group: group_id.clone(),
            });
        self.store.commit(batch).await.map_err(|e| {
            warn!("Failed to join group {}: {}", group_id, e);
            QueueError::from_store("join group", e)
        })?;

        group.members.push(session.user_id().clone());
        info!("{} joined group '{}' ({})", session.user_id(), group.name, group.id);
        Ok(group)
    }

    /// Join a group picked from the discovery list
    pub async fn join_listed_group(&self, session: &Session, listed: &GroupSummary) -> Result<Group, QueueError> {
        debug!("Joining listed group '{}'", listed.name);
        self.join_by_id(session, &listed.id).await
    }

    /// Groups newest first, one page at a time
    pub async fn list_groups(&self, after: Option<&GroupCursor>) -> Result<GroupPage, QueueError> {
        let page_size = self.discovery.page_size;
        let groups = self
            .store
            .groups_by_created(after, page_size)
            .await
            .map_err(|e| QueueError::from_store("load groups", e))?;

        let has_more = groups.len() == page_size;
        let cursor = groups.last().map(Group::cursor).or_else(|| after.cloned());
        debug!("Listed {} group(s), has_more={}", groups.len(), has_more);

        Ok(GroupPage {
            groups,
            cursor,
            has_more,
        })
    }

    /// Case-insensitive substring search on group names.
    ///
    /// Only the first `search_window` groups in name order are considered, so
    /// matches beyond that window are not found. A blank term returns the
    /// first default page instead.
    pub async fn search_by_name(&self, term: &str) -> Result<GroupPage, QueueError> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.list_groups(None).await;
        }

        let window = self
            .store
            .groups_by_name(self.discovery.search_window)
            .await
            .map_err(|e| QueueError::from_store("search groups", e))?;

        let groups: Vec<Group> = window
            .into_iter()
            .filter(|g| g.name.to_lowercase().contains(&term))
            .collect();
        debug!("Search '{}' matched {} group(s)", term, groups.len());

        Ok(GroupPage {
            groups,
            cursor: None,
            has_more: false,
        })
    }

    /// The caller's groups as id and name
    pub async fn my_groups(&self, session: &Session) -> Result<Vec<GroupSummary>, QueueError> {
        let user = self
            .store
            .get_user(session.user_id())
            .await
            .map_err(|e| QueueError::from_store("load groups", e))?
            .ok_or_else(|| QueueError::UserNotFound(session.user_id().clone()))?;

        let mut summaries = Vec::with_capacity(user.groups.len());
        for id in &user.groups {
            let group = self
                .store
                .get_group(id)
                .await
                .map_err(|e| QueueError::from_store("load groups", e))?;
            summaries.push(match group {
                Some(group) => group.summary(),
                None => GroupSummary {
                    id: id.clone(),
                    name: UNKNOWN_GROUP_NAME.to_string(),
                },
            });
        }
        Ok(summaries)
    }
}
