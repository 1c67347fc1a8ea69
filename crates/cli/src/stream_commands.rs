//! `tidings streams|subscribe|unsubscribe|run` — the command trigger surface.

use {
    anyhow::{Result, bail},
    clap::{Args, ValueEnum},
    tidings_streams::CommandReply,
};

use crate::app::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryArg {
    /// Direct message to the user.
    Dm,
    /// Post in a channel, mentioning the user.
    Channel,
}

impl DeliveryArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Channel => "channel",
        }
    }
}

#[derive(Debug, Args)]
pub struct SubscribeArgs {
    /// Stream name (case-insensitive).
    pub stream: String,
    /// User id to subscribe.
    #[arg(long = "user")]
    pub user_id: i64,
    #[arg(long, value_enum, default_value_t = DeliveryArg::Dm)]
    pub delivery: DeliveryArg,
    /// Channel id, required with `--delivery channel`.
    #[arg(long = "channel")]
    pub channel_id: Option<i64>,
}

#[derive(Debug, Args)]
pub struct UnsubscribeArgs {
    /// Stream name (case-insensitive).
    pub stream: String,
    #[arg(long = "user")]
    pub user_id: i64,
}

fn finish(reply: CommandReply) -> Result<()> {
    if !reply.ok {
        bail!("{}", reply.message);
    }
    println!("{}", reply.message);
    Ok(())
}

pub async fn list(app: &App) -> Result<()> {
    finish(app.service.list_streams().await)
}

pub async fn subscribe(app: &App, args: SubscribeArgs) -> Result<()> {
    let reply = app
        .service
        .subscribe(
            &args.stream,
            args.user_id,
            args.delivery.as_str(),
            args.channel_id,
        )
        .await;
    finish(reply)
}

pub async fn unsubscribe(app: &App, args: UnsubscribeArgs) -> Result<()> {
    finish(app.service.unsubscribe(&args.stream, args.user_id).await)
}

pub async fn run(app: &App, json: bool) -> Result<()> {
    let reply = app.service.run_once().await;
    if !reply.ok {
        bail!("{}", reply.message);
    }

    let Some(report) = reply.report else {
        println!("{}", reply.message);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", reply.message);
    for (stream, sent) in &report.sent {
        println!("  {stream}: {sent}");
    }
    for d in &report.diagnostics {
        let who = d.user_id.map(|id| format!(" (user {id})")).unwrap_or_default();
        eprintln!("  [{}] {}{who}: {}", d.kind.as_str(), d.stream, d.message);
    }
    Ok(())
}
