//! Console demo: the survey bot talking over stdin/stdout.
//!
//! Every line typed is an event from the current user:
//!
//! - plain text - a typed answer (also used for menu entries)
//! - `/select <option>` - press an option button
//! - `/done` - press the "Done" button of a multi-select field
//! - `/contact <phone>` - share a contact
//! - `/as <id>` - continue as another user
//! - `/broadcast <text>` - send `text` to every reachable user
//!
//! Run with `cargo run -p example-bot [registration|feedback]`.

use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use chat_survey::{
    Deliverer, DeliveryConfig, EventMeta, EventSource, InboundEvent, Incoming, Keyboard,
    MemoryStore, MessageHandle, MilestoneNotifier, OutboundMessage, RecipientFilter, SurveyBot,
    SurveyMachine, Transport, TransportError, UserId, select_recipients,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Receives staff notifications in the demo.
const STAFF: UserId = UserId(0);

const MILESTONES: [u64; 3] = [1, 10, 100];

struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_text(
        &self,
        recipient: UserId,
        message: &OutboundMessage,
    ) -> Result<MessageHandle, TransportError> {
        println!("[to {recipient}] {}", message.text);
        match &message.keyboard {
            Keyboard::None | Keyboard::Remove => {}
            Keyboard::Inline(buttons) => {
                let labels: Vec<&str> = buttons.iter().map(|b| b.text.as_str()).collect();
                println!("    buttons: [{}]", labels.join("] ["));
            }
            Keyboard::Menu(entries) => println!("    menu: {}", entries.join(" | ")),
            Keyboard::RequestContact { button_text } => {
                println!("    /contact <phone> ({button_text})");
            }
        }
        Ok(MessageHandle(0))
    }
}

struct ConsoleSource {
    lines: Lines<BufReader<Stdin>>,
    user: UserId,
    broadcasts: mpsc::UnboundedSender<String>,
}

impl ConsoleSource {
    fn new(broadcasts: mpsc::UnboundedSender<String>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            user: UserId(1),
            broadcasts,
        }
    }

    fn meta(&self) -> EventMeta {
        let mut meta = EventMeta::default().with_username(format!("user_{}", self.user));
        meta.language_code = Some("en".to_string());
        meta
    }
}

#[async_trait]
impl EventSource for ConsoleSource {
    async fn next_event(&mut self) -> Option<Incoming> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Could not read stdin");
                    return None;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event = if let Some(text) = line.strip_prefix("/broadcast ") {
                if self.broadcasts.send(text.to_string()).is_err() {
                    warn!("Broadcaster stopped");
                }
                continue;
            } else if let Some(id) = line.strip_prefix("/as ") {
                match id.trim().parse() {
                    Ok(id) => {
                        self.user = UserId(id);
                        println!("(now talking as user {})", self.user);
                    }
                    Err(_) => println!("(not a user id: {id})"),
                }
                continue;
            } else if let Some(option) = line.strip_prefix("/select ") {
                InboundEvent::select(option.trim())
            } else if line == "/done" {
                InboundEvent::done()
            } else if let Some(phone) = line.strip_prefix("/contact ") {
                InboundEvent::contact(phone.trim())
            } else {
                InboundEvent::text(line)
            };

            return Some(Incoming::new(self.user, event).with_meta(self.meta()));
        }
    }
}

async fn broadcaster(
    store: Arc<MemoryStore>,
    deliverer: Deliverer,
    mut broadcasts: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = broadcasts.recv().await {
        let recipients =
            match select_recipients(store.as_ref(), &RecipientFilter::AllReachable).await {
                Ok(recipients) => recipients,
                Err(e) => {
                    warn!(error = %e, "Could not select recipients");
                    continue;
                }
            };
        let stats = deliverer
            .send_to_many(&recipients, &OutboundMessage::text(text))
            .await;
        println!("(broadcast: {} delivered, {} failed)", stats.success, stats.failed);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_survey=info,example_bot=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = match std::env::args().nth(1).as_deref() {
        None | Some("registration") => example_surveys::registration(),
        Some("feedback") => example_surveys::feedback(),
        Some(other) => bail!("unknown survey '{other}', expected registration or feedback"),
    }
    .context("survey definition is invalid")?;

    let config = DeliveryConfig::from_env().context("invalid delivery configuration")?;
    info!(?config, fields = registry.len(), "Starting console bot");

    let store = Arc::new(MemoryStore::new());
    let deliverer = Deliverer::new(store.clone(), Arc::new(ConsoleTransport), config);
    let machine = Arc::new(SurveyMachine::new(registry, store.clone()));

    let notifier = MilestoneNotifier::new(
        store.clone(),
        store.clone(),
        deliverer.clone(),
        vec![STAFF],
        MILESTONES,
    );
    tokio::spawn(notifier.run(machine.subscribe()));

    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
    tokio::spawn(broadcaster(store.clone(), deliverer.clone(), broadcast_rx));

    println!("Type an answer, or /select, /done, /contact, /as, /broadcast. Ctrl-D quits.");
    SurveyBot::new(machine, deliverer)
        .run(ConsoleSource::new(broadcast_tx))
        .await;
    Ok(())
}
