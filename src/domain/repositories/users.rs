use anyhow::Result;
use async_trait::async_trait;

use crate::domain::value_objects::subscriptions::SubscriptionAssignment;

/// Subscription writes against the user table. Both methods return the
/// number of rows touched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository {
    async fn assign_subscription(
        &self,
        user_id: &str,
        assignment: SubscriptionAssignment,
    ) -> Result<usize>;

    async fn clear_subscription(&self, user_id: &str) -> Result<usize>;
}
