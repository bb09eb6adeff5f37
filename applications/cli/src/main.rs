/// Weave - weighted multi-pool playback sessions
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weave_cli::args::{parse_pool_weight, parse_reweight, parse_stage};
use weave_cli::config::{AppConfig, DEFAULT_CONFIG_FILE};
use weave_core::{
    BlendId, CreateBlendDefinition, CreateSequence, PlaybackOrder, PoolId, PoolWeight,
    RepeatMode, ScheduledReweight, SequenceId, SequenceStage, SessionId, UserId,
};
use weave_playback::WeaveEngine;
use weave_provider::HttpContentProvider;
use weave_storage::SqliteStorageContext;

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Weighted multi-pool playback sessions", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Acting user
    #[arg(short, long, global = true, env = "WEAVE_USER", default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage blend definitions
    #[command(subcommand)]
    Blend(BlendCommand),

    /// Manage sequences
    #[command(subcommand)]
    Sequence(SequenceCommand),

    /// Drive playback sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand)]
enum BlendCommand {
    /// Create a blend
    Create(CreateBlendArgs),
    /// List your blends
    List,
    /// Show one blend
    Show { id: String },
    /// Replace every editable field of a blend
    Update {
        id: String,
        #[command(flatten)]
        args: CreateBlendArgs,
    },
    /// Replace a blend's weights
    Weights {
        id: String,
        /// Pool weight as POOL=WEIGHT (repeatable)
        #[arg(short, long = "pool", value_parser = parse_pool_weight, required = true)]
        pools: Vec<PoolWeight>,
    },
    /// Delete a blend and end its sessions
    Delete { id: String },
}

#[derive(Args)]
struct CreateBlendArgs {
    /// Display name
    #[arg(short, long)]
    name: String,

    /// Pool weight as POOL=WEIGHT (repeatable)
    #[arg(short, long = "pool", value_parser = parse_pool_weight, required = true)]
    pools: Vec<PoolWeight>,

    /// Scheduled reweight as MINUTES:POOL=WEIGHT,... (repeatable)
    #[arg(short, long = "reweight", value_parser = parse_reweight)]
    reweights: Vec<ScheduledReweight>,

    #[arg(long, value_enum, default_value_t = OrderArg::Sequential)]
    order: OrderArg,

    #[arg(long, value_enum, default_value_t = RepeatArg::None)]
    repeat: RepeatArg,

    /// Allow locking a session to a single pool
    #[arg(long)]
    single_pool_lock: bool,

    /// Crossfade between items, in seconds
    #[arg(long, default_value_t = 0)]
    crossfade: u8,
}

#[derive(Subcommand)]
enum SequenceCommand {
    /// Create a sequence
    Create {
        #[arg(short, long)]
        name: String,
        /// Stage as BLEND[:MINUTES] (repeatable, in order)
        #[arg(short, long = "stage", value_parser = parse_stage, required = true)]
        stages: Vec<SequenceStage>,
    },
    /// Replace a sequence's name and stages, ending its sessions
    Update {
        id: String,
        #[arg(short, long)]
        name: String,
        /// Stage as BLEND[:MINUTES] (repeatable, in order)
        #[arg(short, long = "stage", value_parser = parse_stage, required = true)]
        stages: Vec<SequenceStage>,
    },
    /// List your sequences
    List,
    /// Show one sequence
    Show { id: String },
    /// Delete a sequence and end its sessions
    Delete { id: String },
    /// Start a session on a sequence
    Start { id: String },
    /// Move a sequence session to another stage
    Switch {
        session: String,
        stage: usize,
        /// Cut right away instead of after the next item
        #[arg(long)]
        immediate: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a session on a blend
    Start { blend: String },
    /// Show one session
    Show { session: String },
    /// Draw the next item
    Next { session: String },
    /// Mark every item unplayed again
    Reset { session: String },
    /// Lock draws to one pool (omit --pool to unlock)
    Lock {
        session: String,
        #[arg(short, long)]
        pool: Option<String>,
    },
    /// List a session's items
    Items { session: String },
    /// End a session
    End { session: String },
    /// Remove idle sessions
    Purge,
}

impl From<CreateBlendArgs> for CreateBlendDefinition {
    fn from(args: CreateBlendArgs) -> Self {
        let mut draft = CreateBlendDefinition::new(args.name, args.pools);
        draft.scheduled_reweights = args.reweights;
        draft.playback_order = args.order.into();
        draft.repeat_mode = args.repeat.into();
        draft.single_pool_lock = args.single_pool_lock;
        draft.crossfade_seconds = args.crossfade;
        draft
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Sequential,
    Shuffle,
}

impl From<OrderArg> for PlaybackOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Sequential => PlaybackOrder::Sequential,
            OrderArg::Shuffle => PlaybackOrder::Shuffle,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RepeatArg {
    None,
    All,
    One,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::None => RepeatMode::None,
            RepeatArg::All => RepeatMode::All,
            RepeatArg::One => RepeatMode::One,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weave=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load_from(&config_path)?;
    config.validate()?;

    let engine = build_engine(&config).await?;
    let owner = UserId::new(cli.user);

    match cli.command {
        Commands::Blend(command) => run_blend(&engine, &owner, command).await,
        Commands::Sequence(command) => run_sequence(&engine, &owner, command).await,
        Commands::Session(command) => run_session(&engine, &owner, command).await,
    }
}

async fn build_engine(config: &AppConfig) -> anyhow::Result<WeaveEngine> {
    let pool = weave_storage::create_pool(&config.storage.database_url).await?;
    weave_storage::run_migrations(&pool).await?;
    let storage = Arc::new(SqliteStorageContext::new(pool));

    let provider = HttpContentProvider::new(config.provider.client_config())?;
    tracing::debug!(provider = %provider.url(), "Provider configured");

    Ok(WeaveEngine::new(
        storage,
        Arc::new(provider),
        config.engine.clone(),
    ))
}

async fn run_blend(
    engine: &WeaveEngine,
    owner: &UserId,
    command: BlendCommand,
) -> anyhow::Result<()> {
    match command {
        BlendCommand::Create(args) => {
            print_json(&engine.create_definition(owner, args.into()).await?)
        }
        BlendCommand::Update { id, args } => {
            let updated = engine
                .update_definition(&BlendId::new(id), owner, args.into())
                .await?;
            print_json(&updated)
        }
        BlendCommand::List => print_json(&engine.list_definitions(owner).await?),
        BlendCommand::Show { id } => print_json(&engine.definition(&BlendId::new(id), owner).await?),
        BlendCommand::Weights { id, pools } => {
            print_json(&engine.update_weights(&BlendId::new(id), owner, pools).await?)
        }
        BlendCommand::Delete { id } => {
            engine.delete_definition(&BlendId::new(id), owner).await?;
            Ok(())
        }
    }
}

async fn run_sequence(
    engine: &WeaveEngine,
    owner: &UserId,
    command: SequenceCommand,
) -> anyhow::Result<()> {
    match command {
        SequenceCommand::Create { name, stages } => {
            let sequence = engine
                .create_sequence(owner, CreateSequence { name, stages })
                .await?;
            print_json(&sequence)
        }
        SequenceCommand::Update { id, name, stages } => {
            let sequence = engine
                .update_sequence(&SequenceId::new(id), owner, CreateSequence { name, stages })
                .await?;
            print_json(&sequence)
        }
        SequenceCommand::List => print_json(&engine.list_sequences(owner).await?),
        SequenceCommand::Show { id } => {
            print_json(&engine.sequence(&SequenceId::new(id), owner).await?)
        }
        SequenceCommand::Delete { id } => {
            engine.delete_sequence(&SequenceId::new(id), owner).await?;
            Ok(())
        }
        SequenceCommand::Start { id } => {
            print_json(&engine.start_sequence(&SequenceId::new(id), owner).await?)
        }
        SequenceCommand::Switch {
            session,
            stage,
            immediate,
        } => {
            let session = SessionId::new(session);
            engine.session(&session, owner).await?;
            engine
                .switch_sequence_stage(&session, stage, immediate)
                .await?;
            Ok(())
        }
    }
}

async fn run_session(
    engine: &WeaveEngine,
    owner: &UserId,
    command: SessionCommand,
) -> anyhow::Result<()> {
    match command {
        SessionCommand::Start { blend } => {
            print_json(&engine.start_session(&BlendId::new(blend), owner).await?)
        }
        SessionCommand::Show { session } => {
            print_json(&engine.session(&SessionId::new(session), owner).await?)
        }
        SessionCommand::Next { session } => {
            print_json(&engine.next_item(&SessionId::new(session), owner).await?)
        }
        SessionCommand::Reset { session } => {
            let session = SessionId::new(session);
            engine.session(&session, owner).await?;
            engine.reset_session(&session).await?;
            Ok(())
        }
        SessionCommand::Lock { session, pool } => {
            let locked = engine
                .lock_pool(&SessionId::new(session), owner, pool.map(PoolId::new))
                .await?;
            print_json(&locked)
        }
        SessionCommand::Items { session } => {
            print_json(&engine.session_items(&SessionId::new(session), owner).await?)
        }
        SessionCommand::End { session } => {
            let ended = engine.end_session(&SessionId::new(session), owner).await?;
            print_json(&serde_json::json!({ "ended": ended }))
        }
        SessionCommand::Purge => {
            let removed = engine.purge_idle_sessions().await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
