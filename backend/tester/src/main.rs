use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Form {
    Contact,
    Waitlist,
}

/// Fires a burst of form posts at a running backend and tallies what came back.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    form: Form,

    #[arg(long, default_value_t = 61)]
    requests: u32,

    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Sent as X-Forwarded-For, to pose as a given client.
    #[arg(long, default_value = "203.0.113.77")]
    ip: String,
}

#[derive(Deserialize)]
struct Reply {
    success: bool,
    message: String,
}

#[derive(Default)]
struct Tally {
    accepted: u32,
    refused: u32,
    limited: u32,
    other: u32,
    last_retry_after: Option<String>,
    last_refusal: Option<String>,
}

fn body(form: Form, index: u32) -> (&'static str, Value) {
    match form {
        Form::Contact => (
            "/api/contact",
            json!({
                "name": "Tester",
                "email": "tester@example.com",
                "subject": format!("Burst {index}"),
                "message": format!("Burst test message number {index}"),
            }),
        ),
        Form::Waitlist => (
            "/api/waitlist",
            json!({ "email": format!("tester+{index}@example.com") }),
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::new();

    let pb = ProgressBar::new(args.requests as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Bad progress template")?
            .progress_chars("=> "),
    );

    let mut tally = Tally::default();

    for index in 0..args.requests {
        let (path, payload) = body(args.form, index);

        let response = client
            .post(format!("{}{path}", args.base_url))
            .header("x-forwarded-for", &args.ip)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Request {index} failed"))?;

        match response.status() {
            StatusCode::OK => {
                let reply: Reply = response.json().await.context("Unreadable reply")?;

                if reply.success {
                    tally.accepted += 1;
                } else {
                    tally.refused += 1;
                    tally.last_refusal = Some(reply.message);
                }
            }
            StatusCode::TOO_MANY_REQUESTS => {
                tally.limited += 1;
                tally.last_retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
            }
            _ => tally.other += 1,
        }

        pb.set_message(format!("{} limited", tally.limited));
        pb.inc(1);
    }

    pb.finish_with_message("Done");

    println!("\nAccepted: {}", tally.accepted);
    println!("Refused: {}", tally.refused);
    println!("Limited (429): {}", tally.limited);
    println!("Other: {}", tally.other);

    if let Some(message) = tally.last_refusal {
        println!("Last refusal: {message}");
    }

    if let Some(retry_after) = tally.last_retry_after {
        println!("Last Retry-After: {retry_after}s");
    }

    Ok(())
}
