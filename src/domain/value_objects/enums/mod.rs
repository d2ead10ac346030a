pub mod plans;
pub mod stripe_event_kinds;
