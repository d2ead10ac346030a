use crate::domain::value_objects::enums::plans::Plan;

/// The three subscription columns written together onto a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionAssignment {
    pub subscription_id: String,
    pub customer_id: String,
    pub plan: Plan,
}
