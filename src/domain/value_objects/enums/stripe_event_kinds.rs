/// Stripe event types this service acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventKind {
    CheckoutSessionCompleted,
    InvoicePaid,
    CustomerSubscriptionDeleted,
    Other,
}

impl StripeEventKind {
    pub fn from_str(value: &str) -> Self {
        match value {
            "checkout.session.completed" => StripeEventKind::CheckoutSessionCompleted,
            "invoice.paid" => StripeEventKind::InvoicePaid,
            "customer.subscription.deleted" => StripeEventKind::CustomerSubscriptionDeleted,
            _ => StripeEventKind::Other,
        }
    }
}
