use crate::error::QueueError;
use qd_config::NotificationConfig;
use qd_models::{User, UserId};
use qd_sources::{render_welcome, DocumentStore, WelcomeMailer};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a successful sign-up
pub struct SignUp {
    pub user: User,
    /// Background welcome delivery, if notifications are enabled.
    /// Its outcome never affects the account.
    pub welcome: Option<JoinHandle<()>>,
}

pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn WelcomeMailer>,
    notifications: NotificationConfig,
}

impl AccountService {
    pub fn new(store: Arc<dyn DocumentStore>, mailer: Arc<dyn WelcomeMailer>, notifications: NotificationConfig) -> Self {
        Self {
            store,
            mailer,
            notifications,
        }
    }

    /// Create the user document for an already-authenticated id, then send
    /// the welcome email in the background
    pub async fn sign_up(&self, user_id: &UserId, display_name: &str, email: &str) -> Result<SignUp, QueueError> {
        let display_name = display_name.trim();
        let email = email.trim();
        if user_id.is_empty() {
            return Err(QueueError::validation("Missing user ID"));
        }
        if display_name.is_empty() {
            return Err(QueueError::validation("Please enter a display name"));
        }
        if !email.contains('@') {
            return Err(QueueError::validation("Please enter a valid email address"));
        }

        let user = User::new(user_id.clone(), display_name, email);
        self.store
            .create_user(user.clone())
            .await
            .map_err(|e| QueueError::from_store("create account", e))?;
        info!("Created account {} ({})", user.id, user.display_name);

        let welcome = if self.notifications.enabled {
            Some(self.spawn_welcome(&user))
        } else {
            debug!("Welcome notifications disabled");
            None
        };

        Ok(SignUp { user, welcome })
    }

    fn spawn_welcome(&self, user: &User) -> JoinHandle<()> {
        let message = render_welcome(&self.notifications, &user.display_name, &user.email);
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            match mailer.send(&message).await {
                Ok(()) => debug!("Welcome email sent to {}", message.to),
                Err(e) => warn!("Failed to send welcome email to {}: {}", message.to, e),
            }
        })
    }
}
