use diesel::prelude::*;

use crate::{
    domain::value_objects::subscriptions::SubscriptionAssignment,
    infra::postgres::schema::users,
};

/// Writes all three subscription columns; `None` becomes SQL `NULL`.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateUserSubscriptionEntity {
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub plan: Option<String>,
}

impl UpdateUserSubscriptionEntity {
    pub fn assign(assignment: &SubscriptionAssignment) -> Self {
        Self {
            stripe_subscription_id: Some(assignment.subscription_id.clone()),
            stripe_customer_id: Some(assignment.customer_id.clone()),
            plan: Some(assignment.plan.to_string()),
        }
    }

    pub fn cleared() -> Self {
        Self {
            stripe_subscription_id: None,
            stripe_customer_id: None,
            plan: None,
        }
    }
}
