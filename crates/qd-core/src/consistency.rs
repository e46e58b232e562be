//! Membership symmetry sweep
//!
//! `user.groups` and `group.members` must mirror each other. Every write path
//! in this crate updates both sides in one batch, but documents written by
//! older clients or edited by hand can still disagree.

use crate::error::QueueError;
use qd_models::{Group, GroupId, User, UserId};
use qd_sources::{DocumentStore, StoreError, Write, WriteBatch};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// The group lists the user, the user does not list the group
    MissingUserLink { user: UserId, group: GroupId },
    /// The user lists the group, the group does not list the user
    MissingMember { user: UserId, group: GroupId },
    /// The user lists a group that does not exist
    DanglingGroup { user: UserId, group: GroupId },
    /// The group lists a member with no user document
    UnknownMember { user: UserId, group: GroupId },
}

impl Finding {
    pub fn is_repairable(&self) -> bool {
        matches!(self, Finding::MissingUserLink { .. } | Finding::MissingMember { .. })
    }

    fn repair(&self) -> Option<Write> {
        match self {
            Finding::MissingUserLink { user, group } => Some(Write::UnionUserGroups {
                user: user.clone(),
                group: group.clone(),
            }),
            Finding::MissingMember { user, group } => Some(Write::UnionGroupMembers {
                group: group.clone(),
                user: user.clone(),
            }),
            Finding::DanglingGroup { .. } | Finding::UnknownMember { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub users_checked: usize,
    pub groups_checked: usize,
    pub findings: Vec<Finding>,
    pub repaired: usize,
}

impl SweepReport {
    pub fn is_consistent(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Check every user and group; with `repair`, restore symmetry in one batch.
/// Dangling ids and unknown members are only reported.
pub async fn sweep(store: &dyn DocumentStore, repair: bool) -> Result<SweepReport, QueueError> {
    let load = |e: StoreError| QueueError::from_store("check consistency", e);

    let mut users: BTreeMap<UserId, User> = BTreeMap::new();
    for id in store.user_ids().await.map_err(load)? {
        if let Some(user) = store.get_user(&id).await.map_err(load)? {
            users.insert(id, user);
        }
    }
    let groups: BTreeMap<GroupId, Group> = store
        .groups_by_created(None, usize::MAX)
        .await
        .map_err(load)?
        .into_iter()
        .map(|g| (g.id.clone(), g))
        .collect();

    let mut findings = Vec::new();
    for group in groups.values() {
        for member in &group.members {
            match users.get(member) {
                None => findings.push(Finding::UnknownMember {
                    user: member.clone(),
                    group: group.id.clone(),
                }),
                Some(user) if !user.is_member_of(&group.id) => findings.push(Finding::MissingUserLink {
                    user: member.clone(),
                    group: group.id.clone(),
                }),
                Some(_) => {}
            }
        }
    }
    for user in users.values() {
        for group_id in &user.groups {
            match groups.get(group_id) {
                None => findings.push(Finding::DanglingGroup {
                    user: user.id.clone(),
                    group: group_id.clone(),
                }),
                Some(group) if !group.has_member(&user.id) => findings.push(Finding::MissingMember {
                    user: user.id.clone(),
                    group: group_id.clone(),
                }),
                Some(_) => {}
            }
        }
    }
    for finding in &findings {
        warn!("Consistency: {:?}", finding);
    }

    let mut repaired = 0;
    if repair {
        let mut batch = WriteBatch::new();
        for write in findings.iter().filter_map(Finding::repair) {
            batch.push(write);
        }
        repaired = batch.len();
        if !batch.is_empty() {
            store
                .commit(batch)
                .await
                .map_err(|e| QueueError::from_store("repair memberships", e))?;
            info!("Repaired {} membership link(s)", repaired);
        }
    }

    Ok(SweepReport {
        users_checked: users.len(),
        groups_checked: groups.len(),
        findings,
        repaired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::store_with_users;

    #[tokio::test]
    async fn test_symmetric_store_is_clean() {
        let store = store_with_users(&["alice"]).await;
        let group = Group::new(GroupId::from("g1"), "Movie Night", UserId::from("alice"), None);
        store
            .commit(
                WriteBatch::new().with(Write::CreateGroup(group)).with(Write::UnionUserGroups {
                    user: UserId::from("alice"),
                    group: GroupId::from("g1"),
                }),
            )
            .await
            .unwrap();

        let report = sweep(&*store, false).await.unwrap();
        assert!(report.is_consistent());
        assert_eq!((report.users_checked, report.groups_checked), (1, 1));
    }

    #[tokio::test]
    async fn test_asymmetry_is_reported_and_repaired() {
        let store = store_with_users(&["alice", "bob"]).await;
        // alice is a member but her user doc lacks the link; bob links a group that omits him
        let group = Group::new(GroupId::from("g1"), "Movie Night", UserId::from("alice"), None);
        store
            .commit(
                WriteBatch::new()
                    .with(Write::CreateGroup(group))
                    .with(Write::UnionUserGroups {
                        user: UserId::from("bob"),
                        group: GroupId::from("g1"),
                    })
                    .with(Write::UnionUserGroups {
                        user: UserId::from("bob"),
                        group: GroupId::from("gone"),
                    }),
            )
            .await
            .unwrap();

        let report = sweep(&*store, true).await.unwrap();
        assert_eq!(report.findings.len(), 3);
        assert_eq!(report.repaired, 2);
        assert!(report.findings.contains(&Finding::DanglingGroup {
            user: UserId::from("bob"),
            group: GroupId::from("gone"),
        }));

        let after = sweep(&*store, false).await.unwrap();
        assert_eq!(after.findings.len(), 1);
        assert!(!after.findings[0].is_repairable());

        let g1 = store.get_group(&GroupId::from("g1")).await.unwrap().unwrap();
        assert!(g1.has_member(&UserId::from("bob")));
        let alice = store.get_user(&UserId::from("alice")).await.unwrap().unwrap();
        assert!(alice.is_member_of(&GroupId::from("g1")));
    }

    #[tokio::test]
    async fn test_unknown_member_is_report_only() {
        let store = store_with_users(&[]).await;
        let group = Group::new(GroupId::from("g1"), "Ghosts", UserId::from("ghost"), None);
        store.commit(Write::CreateGroup(group).into()).await.unwrap();

        let report = sweep(&*store, true).await.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.repaired, 0);
    }
}
