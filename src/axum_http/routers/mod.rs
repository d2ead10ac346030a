pub mod landing;
pub mod stripe_webhook;
