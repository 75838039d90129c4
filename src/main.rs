// Event admin console
// Main entry point

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use event_admin::error::{ApiError, DraftError, LifecycleError};
use event_admin::models::event::{EventDraft, EventFilter, EventId};
use event_admin::models::raffle::RaffleId;
use event_admin::services::api::{Backend, HttpBackend, ImageKind};
use event_admin::services::countdown::{CountdownKey, PersistentCountdownStore};
use event_admin::services::database::Database;
use event_admin::services::drafts::{DraftReceipt, DraftService};
use event_admin::services::lifecycle::{classify_raffle, ControllerUpdate, LifecycleController};
use event_admin::services::session::SessionService;
use event_admin::services::settings::SettingsService;
use event_admin::utils::clock::SystemClock;
use event_admin::utils::time::format_remaining;

type Controller<'a> = LifecycleController<HttpBackend, PersistentCountdownStore<'a>, SystemClock>;

#[derive(Parser, Debug)]
#[command(name = "event-admin", version)]
#[command(about = "Operator console for events, raffles and their countdowns")]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "EVENT_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "EVENT_ADMIN_PASSWORD")]
        password: String,
    },
    /// Forget the session and every stored countdown
    Logout,
    /// List events, optionally limited to one tab
    List {
        /// all, draft, planned, current or past
        #[arg(long, default_value = "all", value_parser = parse_filter)]
        filter: EventFilter,
    },
    /// Show one event with its program and raffles
    Show { id: String },
    /// Submit a draft event described in a TOML file (dates as "YYYY-MM-DD")
    Create { draft: PathBuf },
    /// Finish a draft submission that was interrupted
    ResumeDraft { draft: PathBuf },
    /// Drop the record of an interrupted draft submission
    DiscardDraft,
    StartEvent { id: String },
    EndEvent { id: String },
    /// Start a raffle drawing and its countdown
    StartRaffle {
        event: String,
        raffle: String,
        /// HH:MM:SS, defaults to the raffle's own duration
        #[arg(long)]
        duration: Option<String>,
    },
    /// Follow running raffle countdowns until they are reconciled
    Watch,
    /// Show the winners of an event's finished raffles
    Winners { id: String },
    /// Download an event cover or prize image
    Image {
        kind: ImageKind,
        name: String,
        out: PathBuf,
    },
}

fn parse_filter(value: &str) -> Result<EventFilter, String> {
    EventFilter::parse(value).ok_or_else(|| format!("unknown filter '{value}'"))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings_service = match &cli.config {
        Some(path) => SettingsService::with_path(path),
        None => SettingsService::new(),
    };
    let settings = settings_service.load()?;

    let db_path = SettingsService::database_path(&settings)?;
    let db = Database::open_file(&db_path)?;
    db.initialize_schema()?;
    log::debug!("Using local state at {}", db_path.display());

    let session = SessionService::new(&db);
    let stored = session.load()?;
    let backend = HttpBackend::new(&settings.api)?;
    backend.set_token(stored.token.clone());

    if let Command::Login { email, password } = &cli.command {
        let token = backend.login(email, password)?;
        session.save_login(&token, email)?;
        println!("Signed in as {email}");
        return Ok(());
    }

    let store = PersistentCountdownStore::new(&db);
    if store.is_degraded() {
        eprintln!("warning: countdowns will not survive a restart (local storage unavailable)");
    }
    let mut controller = LifecycleController::new(backend, store, SystemClock, &settings.lifecycle);

    if let Command::Logout = cli.command {
        controller.logout();
        session.clear()?;
        println!("Signed out");
        return Ok(());
    }

    if !stored.is_authenticated() {
        bail!("Not signed in; run `event-admin login` first");
    }

    let result = run(&mut controller, &session, cli.command);
    if let Err(err) = &result {
        if is_unauthorized(err) {
            controller.logout();
            session.clear()?;
        }
    }
    controller.shutdown();
    result
}

fn run(controller: &mut Controller<'_>, session: &SessionService<'_>, command: Command) -> Result<()> {
    match command {
        Command::Login { .. } | Command::Logout => Ok(()),
        Command::List { filter } => list(controller, filter),
        Command::Show { id } => show(controller, &EventId::new(id)),
        Command::Create { draft } => {
            let draft = read_draft(&draft)?;
            let receipt = DraftService::new(controller.backend(), session).submit(&draft)?;
            print_receipt(&receipt);
            Ok(())
        }
        Command::ResumeDraft { draft } => {
            let draft = read_draft(&draft)?;
            let receipt = DraftService::new(controller.backend(), session).resume_draft(&draft)?;
            print_receipt(&receipt);
            Ok(())
        }
        Command::DiscardDraft => {
            DraftService::new(controller.backend(), session).discard()?;
            println!("Draft submission discarded");
            Ok(())
        }
        Command::StartEvent { id } => {
            controller.refresh()?;
            controller.start_event(&EventId::new(id))?;
            let filter = controller.filter();
            list(controller, filter)
        }
        Command::EndEvent { id } => {
            controller.refresh()?;
            controller.end_event(&EventId::new(id))?;
            let filter = controller.filter();
            list(controller, filter)
        }
        Command::StartRaffle {
            event,
            raffle,
            duration,
        } => {
            let event_id = EventId::new(event);
            let raffle_id = RaffleId::new(raffle);
            controller.refresh()?;

            let duration = match duration {
                Some(duration) => duration,
                None => controller
                    .event(&event_id)
                    .and_then(|event| event.raffle(&raffle_id))
                    .and_then(|raffle| raffle.duration)
                    .map(|duration| duration.to_string())
                    .ok_or_else(|| anyhow!("Raffle has no duration; pass --duration HH:MM:SS"))?,
            };

            controller.start_raffle(&event_id, &raffle_id, &duration)?;
            if let Some(remaining) = controller.remaining(&event_id, &raffle_id) {
                println!("Raffle started, countdown {}", format_remaining(remaining));
            }
            Ok(())
        }
        Command::Watch => watch(controller),
        Command::Winners { id } => winners(controller, &EventId::new(id)),
        Command::Image { kind, name, out } => {
            let bytes = controller
                .backend()
                .fetch_image(kind, &name)
                .map_err(LifecycleError::from)?;
            fs::write(&out, &bytes).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Saved {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
    }
}

fn list(controller: &mut Controller<'_>, filter: EventFilter) -> Result<()> {
    controller.set_filter(filter);
    controller.refresh()?;

    let visible = controller.visible_events();
    if visible.is_empty() {
        println!("No {} events", filter);
        return Ok(());
    }

    for (event, bucket) in visible {
        let date = event
            .date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "unscheduled".to_string());
        println!("{:>6}  {:<8}  {}  {}", event.id, bucket, date, event.name);
    }
    Ok(())
}

fn show(controller: &mut Controller<'_>, id: &EventId) -> Result<()> {
    let bucket = controller.refresh_event(id)?;
    let event = controller
        .event(id)
        .ok_or_else(|| anyhow!("Event {} disappeared", id))?;

    println!("{} [{}]", event.name, bucket);
    if let (Some(date), Some(start)) = (event.date, event.start_time) {
        let end = event.end_time.map(|end| end.to_string()).unwrap_or_default();
        println!("{} {}-{}", date, start, end);
    }
    if !event.address.is_empty() {
        println!("{}", event.address);
    }
    if !event.short_description.is_empty() {
        println!("{}", event.short_description);
    }

    for sub_event in &event.sub_events {
        println!("  {}-{}  {}", sub_event.start_time, sub_event.end_time, sub_event.name);
    }

    for raffle in &event.raffles {
        let status = classify_raffle(raffle);
        let countdown = raffle
            .id
            .as_ref()
            .and_then(|raffle_id| controller.remaining(id, raffle_id))
            .map(|remaining| format!(" ({} left)", format_remaining(remaining)))
            .unwrap_or_default();
        let raffle_id = raffle.id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        println!(
            "  raffle {}: {} [{:?}]{}",
            raffle_id, raffle.name, status, countdown
        );
        for prize in &raffle.prizes {
            println!("    prize: {}", prize.name);
        }
    }
    Ok(())
}

fn winners(controller: &mut Controller<'_>, id: &EventId) -> Result<()> {
    controller.refresh_event(id)?;
    let raffles = controller.winners(id)?;
    if raffles.is_empty() {
        println!("No winners published yet");
        return Ok(());
    }

    for raffle in raffles {
        println!("{}", raffle.name);
        for winner in raffle.winners.iter().flatten() {
            let prize = winner
                .prize_name
                .clone()
                .or_else(|| {
                    winner
                        .prize_id
                        .as_ref()
                        .and_then(|prize_id| raffle.prize(prize_id))
                        .map(|prize| prize.name.clone())
                })
                .unwrap_or_default();
            println!(
                "  #{}  {}  {}",
                winner.number,
                winner.participant.display_name(),
                prize
            );
        }
    }
    Ok(())
}

fn watch(controller: &mut Controller<'_>) -> Result<()> {
    // Countdowns that ran out while nothing was watching report first.
    let mut updates = controller.refresh()?;

    loop {
        for update in updates {
            match update {
                ControllerUpdate::Countdown { key, remaining_ms } => {
                    println!("{}  {}", describe(&key), format_remaining(remaining_ms));
                }
                ControllerUpdate::Expired { key } => {
                    println!("{}  countdown finished", describe(&key));
                }
                ControllerUpdate::Reconciled { event_id, bucket } => {
                    println!("event {} refreshed, now {}", event_id, bucket);
                }
                ControllerUpdate::ReconcileFailed { event_id, message } => {
                    eprintln!("event {} could not be refreshed: {}", event_id, message);
                }
                ControllerUpdate::Cancelled { key } => {
                    println!("{}  countdown cancelled", describe(&key));
                }
            }
        }

        match controller.next_tick_in() {
            Some(wait) => thread::sleep(wait),
            None => break,
        }
        updates = controller.poll()?;
    }

    println!("No raffle countdown running");
    Ok(())
}

fn describe(key: &CountdownKey) -> String {
    match key.raffle_id() {
        Some(raffle_id) => format!("event {} raffle {}", key.event_id(), raffle_id),
        None => format!("event {}", key.event_id()),
    }
}

fn read_draft(path: &Path) -> Result<EventDraft> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse draft {}", path.display()))
}

fn print_receipt(receipt: &DraftReceipt) {
    let verb = if receipt.resumed { "Finished" } else { "Created" };
    println!(
        "{} event {}: {} sub-event(s), {} raffle(s), {} prize(s) sent",
        verb,
        receipt.event_id,
        receipt.sub_events_created,
        receipt.raffles_created,
        receipt.prizes_created
    );
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    if let Some(err) = err.downcast_ref::<LifecycleError>() {
        return matches!(err, LifecycleError::Unauthorized);
    }
    if let Some(err) = err.downcast_ref::<DraftError>() {
        return matches!(err, DraftError::Api(ApiError::Unauthorized));
    }
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_unauthorized)
}
