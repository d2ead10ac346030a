use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*, update};
use std::sync::Arc;

use crate::{
    domain::{
        entities::users::UpdateUserSubscriptionEntity,
        repositories::users::UserRepository,
        value_objects::subscriptions::SubscriptionAssignment,
    },
    infra::postgres::{postgres_connection::PgPoolSquad, schema::users},
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn write_subscription(
        &self,
        user_id: &str,
        changes: &UpdateUserSubscriptionEntity,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(users::table.filter(users::id.eq(user_id)))
            .set(changes)
            .execute(&mut conn)?;

        Ok(affected)
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn assign_subscription(
        &self,
        user_id: &str,
        assignment: SubscriptionAssignment,
    ) -> Result<usize> {
        self.write_subscription(user_id, &UpdateUserSubscriptionEntity::assign(&assignment))
    }

    async fn clear_subscription(&self, user_id: &str) -> Result<usize> {
        self.write_subscription(user_id, &UpdateUserSubscriptionEntity::cleared())
    }
}
