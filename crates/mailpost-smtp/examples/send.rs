//! Sends one message using settings from the environment.
//!
//! ```text
//! SMTP_HOST=smtp.example.com SMTP_USER=alice SMTP_PASSWORD=secret \
//! MAIL_FROM=alice@example.com MAIL_TO=bob@example.com \
//! RUST_LOG=mailpost_smtp=debug cargo run --example send
//! ```
//!
//! Optional: `SMTP_PORT` (defaults to 465, or 587 with `SMTP_SECURE=false`),
//! `SMTP_SECURE=false` for plaintext upgraded with STARTTLS,
//! `SMTP_INSECURE=true` to accept any certificate, `MAIL_ATTACH=<path>`.

use std::env;

use mailpost_mime::{Address, Attachment, Email};
use mailpost_smtp::{Mailer, Options};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpost_smtp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("SMTP_HOST")?;
    let secure = env::var("SMTP_SECURE").map_or(true, |v| v != "false");

    let port = match env::var("SMTP_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => Options::default_port(secure),
    };

    let mut builder = Options::builder(host)
        .port(port)
        .secure(secure)
        .ignore_bad_certificate(env::var("SMTP_INSECURE").is_ok_and(|v| v == "true"));
    if let (Ok(user), Ok(password)) = (env::var("SMTP_USER"), env::var("SMTP_PASSWORD")) {
        builder = builder.credentials(user, password);
    }

    let mut email = Email::new(Address::parse(&env::var("MAIL_FROM")?))
        .to(Address::parse(&env::var("MAIL_TO")?))
        .subject("mailpost test message")
        .text("Sent by the mailpost example.")
        .html("<p>Sent by the <b>mailpost</b> example.</p>");
    if let Ok(path) = env::var("MAIL_ATTACH") {
        email = email.attach(Attachment::from_path(path));
    }

    let delivery = Mailer::new(builder.build()).send(&email).await?;
    println!("{}", delivery.reply);
    Ok(())
}
