// gachabot-core/src/platforms/discord/runtime.rs
//
// Gateway plumbing: runs the shards and forwards non-bot guild messages to
// the server loop, which routes them to the claim handler and the admin
// commands.

use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use twilight_gateway::{
    self as gateway, Config, Event, EventTypeFlags, Intents, Shard, StreamExt,
};
use twilight_http::Client as HttpClient;

use gachabot_common::Error;

/// One inbound chat message, already filtered down to what the bot cares
/// about.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: i64,
    pub message_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
}

async fn shard_runner(mut shard: Shard, tx: UnboundedSender<InboundMessage>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        match item {
            Ok(event) => match &event {
                Event::Ready(ready) => {
                    info!(
                        "Shard {shard_id} => READY as {} (ID={})",
                        ready.user.name, ready.user.id
                    );
                }
                Event::MessageCreate(msg) => {
                    if msg.author.bot {
                        continue;
                    }
                    let _ = tx.send(InboundMessage {
                        channel_id: msg.channel_id.get() as i64,
                        message_id: msg.id.get() as i64,
                        author_id: msg.author.id.get() as i64,
                        author_name: msg.author.name.clone(),
                        content: msg.content.clone(),
                    });
                }
                _ => {
                    trace!("Shard {shard_id} => unhandled event: {event:?}");
                }
            },
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Connects the recommended number of shards and returns the inbound
/// message stream plus the shard task handles.
pub async fn start_gateway(
    http: Arc<HttpClient>,
    token: String,
) -> Result<(UnboundedReceiver<InboundMessage>, Vec<JoinHandle<()>>), Error> {
    let (tx, rx) = unbounded_channel();

    let config = Config::new(
        token,
        Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
    );

    let shards = gateway::create_recommended(&http, config, |_, b| b.build())
        .await
        .map_err(|e| Error::Actuation(format!("create_recommended error: {e}")))?;

    let mut tasks = Vec::new();
    for shard in shards {
        let tx_for_shard = tx.clone();
        tasks.push(tokio::spawn(async move {
            shard_runner(shard, tx_for_shard).await;
        }));
    }

    Ok((rx, tasks))
}
