use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use story_recorder::session::SessionSnapshot;
use story_recorder::wizard::Consent;
use story_recorder::{
    create_router, AppState, CaptureSourceFactory, Config, RecordingSessionController,
    SessionHandle, SessionStatus, SourceFactory, StoryMetadata, SubmissionClient, WizardState,
    WizardStep, WizardStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "story-recorder", version, about = "Record and submit a short spoken story")]
struct Cli {
    /// Configuration file, without extension
    #[arg(long, global = true, default_value = "config/story-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the wizard's HTTP API
    Serve,
    /// Run the wizard in this terminal
    Record(RecordArgs),
    /// Print persisted wizard progress
    State,
    /// Forget persisted wizard progress
    Reset,
}

#[derive(Args)]
struct RecordArgs {
    /// I confirm that I am at least 18 years old
    #[arg(long)]
    confirm_adult: bool,
    /// I agree to the story recording terms and privacy notice
    #[arg(long)]
    accept_terms: bool,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    anonymous: bool,
    /// Email me a transcript when my story is ready
    #[arg(long)]
    transcript: bool,
    #[arg(long)]
    email: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    birthdate: String,
    /// Replay a WAV file instead of the microphone
    #[arg(long)]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let store = WizardStore::open_dir(cfg.storage.state_dir())?;

    match cli.command {
        Command::Serve => serve(cfg, store).await,
        Command::Record(args) => record(cfg, store, args).await,
        Command::State => {
            println!("{}", serde_json::to_string_pretty(&store.load())?);
            Ok(())
        }
        Command::Reset => {
            store.clear();
            println!("Wizard progress cleared");
            Ok(())
        }
    }
}

async fn serve(cfg: Config, store: WizardStore) -> Result<()> {
    info!("Starting {}", cfg.service.name);
    info!("Submitting stories to {}", cfg.submission.endpoint);

    let uploader = Arc::new(SubmissionClient::new(
        cfg.submission.endpoint.clone(),
        cfg.submission.timeout(),
    )?);
    let sources = Arc::new(CaptureSourceFactory::new(cfg.audio.clone()));
    let state = AppState::new(store, sources, uploader);
    state.restore().await;

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    state.close_session().await;
    Ok(())
}

fn render(snapshot: &SessionSnapshot) -> String {
    let mut line = format!("[{}] {}", snapshot.status, snapshot.display);
    if let Some(warning) = &snapshot.warning_message {
        line.push_str(&format!("  {}", warning));
    }
    if let Some(error) = &snapshot.error {
        line.push_str(&format!("  ({})", error));
    }
    line
}

async fn record(cfg: Config, store: WizardStore, args: RecordArgs) -> Result<()> {
    let consent = Consent {
        adult: args.confirm_adult,
        terms_accepted: args.accept_terms,
    };
    if !consent.is_granted() {
        bail!("Consent is required: pass --confirm-adult and --accept-terms");
    }

    let metadata = StoryMetadata {
        name: args.name,
        story_title: args.title,
        anonymous: args.anonymous,
        transcript: args.transcript,
        email: args.email,
        birthdate: args.birthdate,
    };
    if let Err(errors) = metadata.validate(chrono::Utc::now().date_naive()) {
        let messages: Vec<String> = errors.iter().map(|e| format!("{}: {}", e.field(), e)).collect();
        bail!("Invalid story details: {}", messages.join("; "));
    }
    let metadata = metadata.normalized();

    store.save(&WizardState {
        step: WizardStep::Recording,
        metadata: Some(metadata.clone()),
    });

    let mut audio = cfg.audio.clone();
    if let Some(input) = args.input {
        audio.input_file = Some(input.display().to_string());
    }

    let uploader = Arc::new(SubmissionClient::new(
        cfg.submission.endpoint.clone(),
        cfg.submission.timeout(),
    )?);
    let controller = RecordingSessionController::new(
        metadata,
        CaptureSourceFactory::new(audio).create(),
        uploader,
        store.clone(),
    );
    let handle = SessionHandle::spawn(controller);

    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = String::new();
        while updates.changed().await.is_ok() {
            let line = render(&updates.borrow_and_update());
            if line != last {
                println!("{}", line);
                last = line;
            }
        }
    });

    println!("Commands: start, pause, resume, stop, rerecord, submit, status, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match line.trim() {
            "start" => handle.start().await,
            "pause" => handle.pause().await,
            "resume" => handle.resume().await,
            "stop" => handle.stop().await,
            "rerecord" => handle.re_record().await,
            "submit" => handle.submit().await,
            "status" => handle.snapshot().await.map(|snapshot| {
                println!("{}", render(&snapshot));
                snapshot
            }),
            "quit" => match handle.latest().leave_warning {
                Some(warning) => {
                    println!("{} Type quit! to leave anyway.", warning);
                    continue;
                }
                None => break,
            },
            "quit!" => break,
            "" => continue,
            other => {
                println!("Unknown command: {}", other);
                continue;
            }
        };

        if let Err(e) = result {
            println!("{}", e.user_message());
        }

        if handle.latest().status == SessionStatus::Submitted {
            println!("Story submitted. Thank you for sharing your story.");
            break;
        }
    }

    handle.shutdown().await;
    printer.abort();
    Ok(())
}
