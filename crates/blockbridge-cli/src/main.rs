use std::io::{Read, Write};
use std::path::PathBuf;

use blockbridge_common::telemetry::{self, TelemetryConfig};
use blockbridge_editor_core::{
    MediaFile, MediaId, RemoteMediaId, contains_blocks, is_media_in_body, replace_media,
    strip_legacy_progress,
};
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::debug;

#[derive(Parser)]
#[command(version, about = "Blockbridge - inspect and rewrite block editor post content", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Post content file (reads stdin when omitted)
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print whether the content is in block format
    HasBlocks {
        #[command(flatten)]
        input: Input,
    },
    /// Print whether an image block for a local media id is present
    InBody {
        #[arg(long)]
        local_id: MediaId,

        #[command(flatten)]
        input: Input,
    },
    /// Remove legacy upload-progress markup
    StripProgress {
        #[command(flatten)]
        input: Input,
    },
    /// Point a local image block at its uploaded remote media
    ReplaceMedia {
        #[arg(long)]
        local_id: MediaId,

        #[arg(long)]
        remote_id: RemoteMediaId,

        /// Remote URL of the uploaded media
        #[arg(long)]
        url: String,

        /// The media is a video
        #[arg(long)]
        video: bool,

        #[command(flatten)]
        input: Input,
    },
}

fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("blockbridge"));

    let cli = Cli::parse();
    let output = run(cli.command)?;

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{output}").into_diagnostic()?;
    Ok(())
}

/// Output of `command`. Rewritten content comes back byte for byte; answers
/// get their own line.
fn run(command: Commands) -> Result<String> {
    let output = match command {
        Commands::HasBlocks { input } => {
            let content = read_input(&input)?;
            format!("{}\n", contains_blocks(&content))
        }
        Commands::InBody { local_id, input } => {
            let content = read_input(&input)?;
            format!("{}\n", is_media_in_body(&content, local_id))
        }
        Commands::StripProgress { input } => {
            let content = read_input(&input)?;
            strip_legacy_progress(&content).into_owned()
        }
        Commands::ReplaceMedia {
            local_id,
            remote_id,
            url,
            video,
            input,
        } => {
            let content = read_input(&input)?;
            let media_file = uploaded_media(local_id, remote_id, url, video);
            replace_media(&content, local_id, Some(&media_file))
        }
    };
    Ok(output)
}

fn uploaded_media(
    local_id: MediaId,
    remote_id: RemoteMediaId,
    url: String,
    video: bool,
) -> MediaFile {
    let mime_type = if video { "video/mp4" } else { "image/jpeg" };
    MediaFile::new(local_id, mime_type).uploaded(remote_id, url)
}

fn read_input(input: &Input) -> Result<String> {
    let content = match &input.path {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", path.display()))?,
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            content
        }
    };
    debug!(
        source = %input.path.as_deref().map_or("stdin".into(), |path| path.display().to_string()),
        bytes = content.len(),
        "read post content"
    );
    Ok(content)
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
