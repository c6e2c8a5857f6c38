use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use markoslav_core::{
    decode_image, encode_png, Caption, CaptionId, CaptionRenderer, FilterOptions, FontRenderer,
    ModerationQueue, SqliteRepository, UserId, DEFAULT_PAGE_SIZE,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Markoslav: moderate and preview image captions offline
#[derive(Parser, Debug)]
#[command(name = "markoslav")]
#[command(about = "Caption moderation tool for the markoslav bot", long_about = None)]
struct Cli {
    /// Directory holding markoslav.db
    #[arg(long, env = "STATE_DIR", default_value = ".", global = true)]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List stored captions
    List(ListArgs),
    /// Add a pending caption
    Submit(SubmitArgs),
    /// Approve a pending caption
    Approve(IdArgs),
    /// Reject (delete) a caption
    Reject(IdArgs),
    /// Draw a caption onto an image file
    Render(RenderArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Status {
    Pending,
    Approved,
    All,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Which captions to show
    #[arg(long, value_enum, default_value = "pending")]
    status: Status,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    limit: usize,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Print one JSON object per line
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct SubmitArgs {
    text: String,

    /// Author user id recorded with the caption
    #[arg(long)]
    author: i64,
}

#[derive(Parser, Debug)]
struct IdArgs {
    id: CaptionId,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Source image (PNG, JPEG or WebP)
    input: PathBuf,

    /// Where to write the captioned PNG
    output: PathBuf,

    /// Caption text. A random approved caption is drawn when omitted.
    #[arg(long)]
    text: Option<String>,

    #[arg(long, env = "FONT_PATH", default_value = "static/Lobster-Regular.ttf")]
    font: PathBuf,
}

fn open_queue(state_dir: &std::path::Path) -> Result<ModerationQueue> {
    let db_path = state_dir.join("markoslav.db");
    let repository = SqliteRepository::new(&db_path)
        .with_context(|| format!("Failed to open caption database {}", db_path.display()))?;
    Ok(ModerationQueue::new(Arc::new(repository)))
}

fn print_caption(caption: &Caption) {
    let status = if caption.approved { "approved" } else { "pending" };
    println!(
        "{}  {:<8}  author={}  {}  {}",
        caption.id,
        status,
        caption.author_id,
        caption.created_at.format("%Y-%m-%d %H:%M"),
        caption.text
    );
}

fn caption_json(caption: &Caption) -> Result<String> {
    serde_json::to_string(caption).context("Failed to serialize caption")
}

async fn run_list(queue: &ModerationQueue, args: ListArgs) -> Result<()> {
    let filter = match args.status {
        Status::Pending => FilterOptions::pending(),
        Status::Approved => FilterOptions::approved(),
        Status::All => FilterOptions::new(),
    };
    let captions = queue
        .list(args.limit, args.offset, &filter)
        .await
        .context("Failed to list captions")?;

    if args.json {
        for caption in &captions {
            println!("{}", caption_json(caption)?);
        }
        return Ok(());
    }

    if captions.is_empty() {
        println!("No captions found.");
        return Ok(());
    }
    for caption in &captions {
        print_caption(caption);
    }
    Ok(())
}

async fn run_submit(queue: &ModerationQueue, args: SubmitArgs) -> Result<()> {
    let caption = queue
        .submit(&args.text, UserId(args.author))
        .await
        .context("Failed to submit caption")?;
    info!(id = %caption.id, "Caption submitted");
    print_caption(&caption);
    Ok(())
}

async fn run_render(queue: &ModerationQueue, args: RenderArgs) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            queue
                .draw_approved()
                .await
                .context("Failed to draw an approved caption")?
                .text
        }
    };

    let renderer = FontRenderer::from_file(&args.font)
        .with_context(|| format!("Failed to load font from {}", args.font.display()))?;
    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let image = decode_image(&bytes).context("Failed to decode input image")?;
    let rendered = renderer
        .render(&image, &text)
        .context("Failed to render caption")?;
    let png = encode_png(&rendered)?;
    fs::write(&args.output, png)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Wrote {} with caption \"{}\"", args.output.display(), text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let queue = open_queue(&cli.state_dir)?;

    match cli.command {
        Commands::List(args) => run_list(&queue, args).await,
        Commands::Submit(args) => run_submit(&queue, args).await,
        Commands::Approve(args) => {
            queue
                .approve(args.id)
                .await
                .with_context(|| format!("Failed to approve {}", args.id))?;
            println!("Approved {}", args.id);
            Ok(())
        }
        Commands::Reject(args) => {
            queue
                .reject(args.id)
                .await
                .with_context(|| format!("Failed to reject {}", args.id))?;
            println!("Rejected {}", args.id);
            Ok(())
        }
        Commands::Render(args) => run_render(&queue, args).await,
    }
}
