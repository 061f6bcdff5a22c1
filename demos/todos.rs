//! Todo list client.
//!
//! Connects to a DDP server, subscribes to `todos`, inserts one document and
//! prints collection changes until Ctrl+C.
//!
//! The session is driven from `main` through an event channel, so no
//! callback holds a clone of the client.
//!
//! Usage: cargo run --example todos -- [ws://localhost:3000/websocket]

use std::env;

use serde_json::{Map, Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ddp_client::{CallbackListener, CommandId, DdpClient, ParsedMessage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let address = env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:3000/websocket".to_string());

    let client = DdpClient::builder().address(address).build()?;
    let (_, mut events) = client.events().channel();

    client.connect()?;

    let mut subscription: Option<CommandId> = None;

    loop {
        tokio::select! {
            envelope = events.recv() => {
                let Some(envelope) = envelope else { break };

                match ParsedMessage::parse(&envelope) {
                    Some(ParsedMessage::Connected { .. }) => {
                        let listener = CallbackListener::new()
                            .with_no_sub(|id, error| info!(id, ?error, "subscription refused"))
                            .into_shared();
                        subscription = Some(client.subscribe("todos", vec![], Some(listener)));
                    }
                    Some(ParsedMessage::Ready { subs }) => {
                        let ours = subscription.map(|id| id.to_string());
                        if subs.iter().any(|id| Some(id) == ours.as_ref()) {
                            info!("todos ready, inserting a document");
                            insert_todo(&client);
                        }
                    }
                    Some(ParsedMessage::Added { collection, id, fields }) => {
                        info!(%collection, %id, ?fields, "added");
                    }
                    Some(ParsedMessage::Changed { collection, id, fields, cleared }) => {
                        info!(%collection, %id, ?fields, ?cleared, "changed");
                    }
                    Some(ParsedMessage::Removed { collection, id }) => {
                        info!(%collection, %id, "removed");
                    }
                    Some(ParsedMessage::Closed { code, reason, .. }) => {
                        info!(?code, ?reason, "connection closed");
                        break;
                    }
                    _ => {}
                }
            }

            _ = tokio::signal::ctrl_c() => {
                client.disconnect();
                break;
            }
        }
    }

    Ok(())
}

fn insert_todo(client: &DdpClient) {
    let mut fields = Map::new();
    fields.insert("text".to_string(), Value::from("buy milk"));
    fields.insert("done".to_string(), json!(false));

    let listener = CallbackListener::new()
        .with_result(|envelope| {
            info!(
                result = ?envelope.get("result"),
                error = ?envelope.get("error"),
                "insert finished"
            );
        })
        .into_shared();
    client.collection_insert("todos", fields, Some(listener));
}
