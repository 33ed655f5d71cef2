//! Sample data generation for local testing.

use anyhow::Result;
use courier_core::{NewMessage, Storage};
use rand::Rng;
use tracing::info;

const SAMPLE_MESSAGES: &[&str] = &[
    "Welcome to our service!",
    "Your order has been confirmed",
    "Don't miss our special offer",
    "Thank you for your purchase",
    "Your payment was successful",
    "Reminder: Your appointment is tomorrow",
    "New features are now available",
    "Your subscription expires soon",
    "Flash sale: 50% off everything",
    "Security alert: Login detected",
    "Your delivery is on the way",
    "Happy birthday! Here's a gift",
    "Limited time offer ends today",
    "Your account has been updated",
    "New message from support team",
];

const PHONE_NUMBERS: &[&str] = &[
    "+905551234567",
    "+905552345678",
    "+905553456789",
    "+905554567890",
    "+905555678901",
    "+905556789012",
    "+905557890123",
    "+905558901234",
    "+905559012345",
    "+905550123456",
];

/// Inserts `count` random pending messages.
pub async fn seed_messages(storage: &Storage, count: usize) -> Result<()> {
    let mut rng = rand::rng();

    info!(count, "generating random messages");

    for i in 0..count {
        let new = NewMessage {
            to: PHONE_NUMBERS[rng.random_range(0..PHONE_NUMBERS.len())].to_string(),
            content: SAMPLE_MESSAGES[rng.random_range(0..SAMPLE_MESSAGES.len())].to_string(),
        };

        storage.messages.create(&new).await?;

        if (i + 1) % 10 == 0 {
            info!(generated = i + 1, "seeding progress");
        }
    }

    info!(count, "sample messages generated");
    Ok(())
}
