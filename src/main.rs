use std::sync::Arc;

use messenger_webhook::config::WebhookConfig;
use messenger_webhook::dispatcher::{
    Dispatcher, authentication_handler, delivery_handler, message_handler, postback_handler,
    referral_handler,
};
use messenger_webhook::error::Result;
use messenger_webhook::event::MessagingEvent;
use messenger_webhook::webhook;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = WebhookConfig::from_env().inspect_err(|e| {
        eprintln!("Error: {e}");
        if let Some(hint) = e.env_hint() {
            eprintln!("  {hint}");
        }
    })?;

    eprintln!("Messenger webhook v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening: http://{}{}", config.bind_addr, config.path);
    eprintln!("   Mode: {:?}", config.mode);

    // Demo handlers: log every event kind.
    let dispatcher: Dispatcher<anyhow::Error> = Dispatcher::new([
        message_handler(|entry| -> anyhow::Result<()> {
            if let MessagingEvent::Message(message) = entry.event() {
                tracing::info!(
                    sender = ?entry.sender_id(),
                    mid = %message.mid,
                    text = ?message.text,
                    attachments = message.attachments.len(),
                    "Message received"
                );
            }
            Ok(())
        }),
        delivery_handler(|entry| -> anyhow::Result<()> {
            if let MessagingEvent::Delivery(delivery) = entry.event() {
                tracing::info!(
                    sender = ?entry.sender_id(),
                    mids = delivery.mids.len(),
                    watermark = delivery.watermark,
                    "Delivery confirmed"
                );
            }
            Ok(())
        }),
        postback_handler(|entry| -> anyhow::Result<()> {
            if let MessagingEvent::Postback(postback) = entry.event() {
                tracing::info!(
                    sender = ?entry.sender_id(),
                    payload = %postback.payload,
                    "Postback received"
                );
            }
            Ok(())
        }),
        authentication_handler(|entry| -> anyhow::Result<()> {
            if let MessagingEvent::Authentication(opt_in) = entry.event() {
                tracing::info!(
                    sender = ?entry.sender_id(),
                    reference = ?opt_in.reference,
                    "Authentication received"
                );
            }
            Ok(())
        }),
        referral_handler(|entry| -> anyhow::Result<()> {
            if let MessagingEvent::Referral(referral) = entry.event() {
                tracing::info!(
                    sender = ?entry.sender_id(),
                    source = %referral.source,
                    reference = ?referral.reference,
                    "Referral received"
                );
            }
            Ok(())
        }),
    ]);

    webhook::serve(config, Arc::new(dispatcher)).await?;
    Ok(())
}
