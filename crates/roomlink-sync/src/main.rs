//! `roomlink-sync`
//!
//! Command-line front end for room link reconciliation: seed and inspect
//! bookings, run the professional-side publisher or the client-side feed
//! against the shared booking database, or run both roles in-process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use roomlink_core::config::{Config, PollerConfig, PublisherConfig, default_database_path, load_config};
use roomlink_core::tracing_init::init_tracing;
use roomlink_core::routing::keys;
use roomlink_core::{BookingRecord, EntryParams, MeetingStatus};

use roomlink_sync::store::NewBooking;
use roomlink_sync::{
    BookingDatabase, BookingStore, CrossFrameBridge, InMemoryBookingStore, JsonFieldsParent,
    MeetingCodePublisher, PollingFeed, RoleRouter, RoomLinkEvent, RoomLinkFeed,
    UnconfiguredStore, VisibilityController,
};

#[derive(Parser, Debug)]
#[command(name = "roomlink-sync")]
#[command(version, about = "roomlink - meeting room link sync for consultation bookings")]
struct Cli {
    /// Project directory holding `.roomlink/settings.json`
    #[arg(long, global = true, env = "ROOMLINK_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Booking database file path (overrides configuration)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a pending booking with no room link.
    Book {
        /// Booking id (a new UUID when omitted)
        #[arg(long)]
        id: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Scheduled start, shown verbatim to the client
        #[arg(long)]
        scheduled_for: Option<String>,
    },

    /// Print a booking as JSON.
    Show {
        #[arg(long)]
        id: String,
    },

    /// Change a booking's meeting status or schedule.
    Update {
        #[arg(long)]
        id: String,

        /// New meeting status: pending, scheduled or ready
        #[arg(long)]
        status: Option<MeetingStatus>,

        /// New scheduled start
        #[arg(long, conflicts_with = "clear_schedule")]
        scheduled_for: Option<String>,

        /// Remove the scheduled start
        #[arg(long)]
        clear_schedule: bool,
    },

    /// Publish meeting codes typed on stdin (professional view).
    Host {
        /// Entry parameters, e.g. `pro_id=p1&booking_id=<id>`
        #[arg(long)]
        query: String,

        /// JSON file standing in for the embedding page's fields
        #[arg(long)]
        parent_fields: Option<PathBuf>,
    },

    /// Follow a booking's room link and status (client view).
    Join {
        /// Entry parameters, e.g. `booking_id=<id>&auto_join=true`
        #[arg(long)]
        query: String,
    },

    /// Run both roles against an in-process store.
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config_dir.as_deref())?;
    if let Some(path) = &cli.db_path {
        config.store.database_path = Some(path.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    config.logging.json |= cli.log_json;

    let level = &config.logging.level;
    init_tracing(
        &format!("roomlink_sync={level},roomlink_core={level}"),
        config.logging.json,
    );
    info!(version = env!("CARGO_PKG_VERSION"), "Starting roomlink-sync");

    match cli.command {
        Command::Book {
            id,
            name,
            email,
            scheduled_for,
        } => {
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let db = open_database(&config).await?;
            let row = db
                .create_booking(&NewBooking {
                    id: &id,
                    client_name: name.as_deref(),
                    client_email: email.as_deref(),
                    scheduled_for: scheduled_for.as_deref(),
                })
                .await?;
            print_record(&BookingRecord::from(row))
        }
        Command::Show { id } => {
            let db = open_database(&config).await?;
            let row = db
                .find_booking(&id)
                .await?
                .ok_or_else(|| anyhow!("Booking {id} not found"))?;
            print_record(&BookingRecord::from(row))
        }
        Command::Update {
            id,
            status,
            scheduled_for,
            clear_schedule,
        } => {
            let db = open_database(&config).await?;
            if let Some(status) = status {
                db.set_meeting_status(&id, status).await?;
            }
            if scheduled_for.is_some() || clear_schedule {
                db.set_scheduled_for(&id, scheduled_for.as_deref()).await?;
            }
            print_record(&BookingRecord::from(db.get_booking(&id).await?))
        }
        Command::Host {
            query,
            parent_fields,
        } => {
            let store = open_store(&config).await;
            let bridge = parent_fields.map_or_else(CrossFrameBridge::detached, |path| {
                CrossFrameBridge::new(Arc::new(JsonFieldsParent::new(path)))
            });
            run_host(&query, store, bridge, &config.publisher).await
        }
        Command::Join { query } => {
            let store = open_store(&config).await;
            run_join(&query, store, config.poller.clone()).await
        }
        Command::Demo => run_demo().await,
    }
}

async fn open_database(config: &Config) -> anyhow::Result<BookingDatabase> {
    let path = match &config.store.database_path {
        Some(path) => path.clone(),
        None => default_database_path().context("Cannot determine data directory")?,
    };
    info!(path = %path.display(), "Opening booking database");
    Ok(BookingDatabase::open(&path).await?)
}

/// The booking database, or the unconfigured placeholder if it cannot be opened.
async fn open_store(config: &Config) -> Arc<dyn BookingStore> {
    match open_database(config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            warn!(error = %e, "Booking store unavailable; running unconfigured");
            Arc::new(UnconfiguredStore)
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_record(record: &BookingRecord) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_host(
    query: &str,
    store: Arc<dyn BookingStore>,
    bridge: CrossFrameBridge,
    config: &PublisherConfig,
) -> anyhow::Result<()> {
    let router = RoleRouter::from_query(query);
    let classification = router.classification();
    if !classification.is_pro() {
        bail!("Entry parameters describe the client view; host needs a pro_id");
    }

    let publisher = MeetingCodePublisher::spawn(classification.booking_id, store, bridge, config);
    let mut status = publisher.status();
    let printer = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            println!("{}", *status.borrow_and_update());
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(code) => {
                    publisher.notify_change(code);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C; stopping publisher");
                publisher.shutdown().await;
                let _ = printer.await;
                return Ok(());
            }
        }
    }

    publisher.finish().await;
    let _ = printer.await;
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_join(
    query: &str,
    store: Arc<dyn BookingStore>,
    config: PollerConfig,
) -> anyhow::Result<()> {
    let router = RoleRouter::from_query(query);
    let booking_id = router
        .classification()
        .booking_id
        .context("Entry parameters carry no booking id")?;

    let visibility = VisibilityController::default();
    let feed = PollingFeed::new(store, router.subscribe(), visibility.subscribe(), config);
    let mut subscription = feed.subscribe(&booking_id).await?;
    println!("{}", subscription.status());

    loop {
        tokio::select! {
            event = subscription.next() => match event {
                Some(RoomLinkEvent::StatusChanged(status)) => println!("{status}"),
                Some(RoomLinkEvent::RoomLinkChanged { room_link, .. }) => {
                    println!("Room link: {room_link}");
                }
                Some(RoomLinkEvent::AutoJoinRequested { room_link, .. }) => {
                    println!("Joining {room_link}");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C; leaving");
                break;
            }
        }
    }

    subscription.cancel().await;
    Ok(())
}

/// Both roles against one in-process store, with short timings.
#[allow(clippy::print_stdout)]
async fn run_demo() -> anyhow::Result<()> {
    let booking_id = uuid::Uuid::new_v4().to_string();
    let store = InMemoryBookingStore::new();
    store
        .insert(BookingRecord {
            client_name: Some("Demo Client".into()),
            client_email: Some("client@example.com".into()),
            ..BookingRecord::pending(&booking_id)
        })
        .await;
    let shared: Arc<dyn BookingStore> = Arc::new(store.clone());

    let client_router = RoleRouter::new(&demo_params(&booking_id, None));
    let visibility = VisibilityController::default();
    let feed = PollingFeed::new(
        Arc::clone(&shared),
        client_router.subscribe(),
        visibility.subscribe(),
        PollerConfig {
            poll_interval_ms: 250,
            cache_expiry_ms: 0,
            read_timeout_ms: 1_000,
        },
    );
    let mut subscription = feed.subscribe(&booking_id).await?;
    println!("client: {}", subscription.status());

    let pro_router = RoleRouter::new(&demo_params(&booking_id, Some("demo-pro")));
    let publisher = MeetingCodePublisher::spawn(
        pro_router.classification().booking_id,
        Arc::clone(&shared),
        CrossFrameBridge::detached(),
        &PublisherConfig {
            update_delay_ms: 300,
            throttle_window_ms: 1_000,
        },
    );

    let code = format!("room-{}", &booking_id[..8]);
    for end in 1..=code.len() {
        publisher.notify_change(&code[..end]);
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    publisher.finish().await;
    println!("pro: published {code} after {} write(s)", store.write_count());

    let joined = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = subscription.next().await {
            match event {
                RoomLinkEvent::StatusChanged(status) => println!("client: {status}"),
                RoomLinkEvent::RoomLinkChanged { room_link, .. } => {
                    println!("client: room link {room_link}");
                }
                RoomLinkEvent::AutoJoinRequested { room_link, .. } => return Some(room_link),
            }
        }
        None
    })
    .await;

    subscription.cancel().await;
    match joined {
        Ok(Some(room_link)) => {
            println!("client: joining {room_link} ({} read(s))", store.read_count());
            Ok(())
        }
        Ok(None) | Err(_) => bail!("Client never saw the room link"),
    }
}

fn demo_params(booking_id: &str, pro_id: Option<&str>) -> EntryParams {
    let mut params = EntryParams::new();
    match pro_id {
        Some(pro_id) => params.insert(keys::PRO_ID, pro_id),
        None => params.insert(keys::AUTO_JOIN, "true"),
    }
    params.insert(keys::BOOKING_ID, booking_id);
    params
}
