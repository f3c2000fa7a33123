use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Context as _;
use brandframe::export::delivery::{download, now_millis};
use brandframe::{
    Adjustments, Artifact, CommandShareTarget, Delivered, DeliveryMode, EditorConfig,
    EditorSession, ExportProgress, ExportState, FontBook, JsonFileSettingsStore, MediaKind,
    Readiness, SettingsService, ShareTarget, SharedSecretVerifier, TextAnnotation, TextEngine,
    VideoExporter, deliver,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "brandframe", version)]
struct Cli {
    /// Editor configuration JSON. Missing file means defaults.
    #[arg(long, global = true, default_value = "brandframe.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a project into a PNG still.
    Still(ExportArgs),
    /// Re-encode a project's video with the overlay burned in (requires `ffmpeg` on PATH).
    Video(ExportArgs),
    /// Manage the shared department list.
    #[command(subcommand)]
    Departments(DepartmentsCmd),
    /// Manage the shared font catalog.
    #[command(subcommand)]
    Fonts(FontsCmd),
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Project JSON describing media, department, adjustments and texts.
    #[arg(long)]
    project: PathBuf,

    /// Output directory. Defaults to the configured export directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeliverChoice::Download)]
    deliver: DeliverChoice,

    /// Program invoked with the artifact path when delivering by share.
    #[arg(long)]
    share_command: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DeliverChoice {
    Download,
    Share,
}

#[derive(Subcommand, Debug)]
enum DepartmentsCmd {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        template_url: String,
        #[arg(long)]
        password: String,
    },
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand, Debug)]
enum FontsCmd {
    List,
    /// Register a font file (path relative to the settings file).
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        file: String,
        #[arg(long)]
        password: String,
    },
    /// Register a name served by the default font.
    AddDefault {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    Delete {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    media: Option<ProjectMedia>,
    #[serde(default)]
    adjustments: Option<Adjustments>,
    #[serde(default)]
    texts: Vec<TextAnnotation>,
    #[serde(default)]
    preview_time_sec: f64,
}

#[derive(Debug, Deserialize)]
struct ProjectMedia {
    path: PathBuf,
    kind: Option<MediaKind>,
}

type Service = SettingsService<JsonFileSettingsStore, SharedSecretVerifier>;

const FONT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = EditorConfig::load(&cli.config)
        .with_context(|| format!("load config '{}'", cli.config.display()))?
        .with_env_overrides();
    brandframe::logging::init_logging(&cfg.logging);

    match cli.cmd {
        Command::Still(args) => cmd_still(&cli.config, &cfg, args),
        Command::Video(args) => cmd_video(&cli.config, &cfg, args),
        Command::Departments(cmd) => cmd_departments(&open_service(&cli.config, &cfg)?, cmd),
        Command::Fonts(cmd) => cmd_fonts(&open_service(&cli.config, &cfg)?, cmd),
    }
}

fn open_service(config_path: &Path, cfg: &EditorConfig) -> anyhow::Result<Service> {
    let path = cfg.settings_path_from(config_path);
    let store = JsonFileSettingsStore::open(&path)
        .with_context(|| format!("open settings '{}'", path.display()))?;
    Ok(SettingsService::new(store, cfg.verifier()))
}

fn read_project(path: &Path) -> anyhow::Result<ProjectFile> {
    let f = File::open(path).with_context(|| format!("open project '{}'", path.display()))?;
    let project: ProjectFile =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse project JSON")?;
    Ok(project)
}

/// Build a session with settings synced and the project applied.
fn open_session(
    config_path: &Path,
    cfg: &EditorConfig,
    project_path: &Path,
) -> anyhow::Result<EditorSession> {
    let service = open_service(config_path, cfg)?;
    let project = read_project(project_path)?;
    let project_dir = project_path.parent().unwrap_or_else(|| Path::new("."));

    let fonts = FontBook::with_default_font(cfg.default_font_path.as_deref());
    let mut session = EditorSession::new(TextEngine::new(fonts), service.store().base_dir());
    session.sync_settings(&service)?;
    session
        .select_department(project.department.as_deref())
        .with_context(|| "select department")?;

    if let Some(media) = &project.media {
        let path = project_dir.join(&media.path);
        let kind = media
            .kind
            .or_else(|| {
                MediaKind::from_declared(None, path.file_name().and_then(|n| n.to_str()))
            })
            .with_context(|| format!("cannot tell media kind of '{}'", path.display()))?;
        session.load_media_path(path.clone(), kind).wait().with_context(|| {
            format!("load media '{}'", path.display())
        })?;
        session.wait_ready();
        if let Some(e) = session.take_error() {
            return Err(e.into());
        }
    }
    if let Some(adj) = project.adjustments {
        session.set_adjustments(adj);
    }
    for text in project.texts {
        session.insert_text(text);
    }
    if project.preview_time_sec > 0.0 {
        session.seek_preview(project.preview_time_sec)?;
    }

    // Fonts install in the background; give them a moment before composing.
    let started = Instant::now();
    while !session.is_ready() && started.elapsed() < FONT_SETTLE_TIMEOUT {
        if session.template().is_some_and(|t| matches!(t.poll(), Readiness::Failed(_))) {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    Ok(session)
}

fn out_dir(cfg: &EditorConfig, args: &ExportArgs) -> PathBuf {
    args.out_dir
        .clone()
        .unwrap_or_else(|| cfg.export.output_dir.clone())
}

fn deliver_artifact(artifact: Artifact, args: &ExportArgs, dir: &Path) -> anyhow::Result<()> {
    let delivered = match args.deliver {
        DeliverChoice::Download => deliver(&artifact, DeliveryMode::Download, None, dir)?,
        DeliverChoice::Share => {
            // Share targets hand a file to another program, so land the bytes on disk first.
            let artifact = match artifact.file_path() {
                Some(_) => artifact,
                None => {
                    let path = download(&artifact, dir)?;
                    Artifact::from_file(artifact.file_name.clone(), artifact.mime.clone(), path)
                }
            };
            let target = args.share_command.as_deref().map(CommandShareTarget::new);
            deliver(
                &artifact,
                DeliveryMode::Share,
                target.as_ref().map(|t| t as &dyn ShareTarget),
                dir,
            )?
        }
    };
    match delivered {
        Delivered::Downloaded(path) => println!("{}", path.display()),
        Delivered::Shared => println!("shared"),
        Delivered::ShareCancelled => println!("share cancelled"),
    }
    Ok(())
}

fn cmd_still(config_path: &Path, cfg: &EditorConfig, args: ExportArgs) -> anyhow::Result<()> {
    let mut session = open_session(config_path, cfg, &args.project)?;
    let still = session
        .export_still(now_millis())
        .with_context(|| "export still")?;
    deliver_artifact(still.artifact, &args, &out_dir(cfg, &args))
}

fn cmd_video(config_path: &Path, cfg: &EditorConfig, args: ExportArgs) -> anyhow::Result<()> {
    let mut session = open_session(config_path, cfg, &args.project)?;
    let settings = cfg.export.encode_settings()?;
    let dir = out_dir(cfg, &args);

    let mut exporter = VideoExporter::new().with_progress(Box::new(|p: ExportProgress| {
        if p.state == ExportState::Recording {
            tracing::debug!(percent = p.percent, frames = p.frames_encoded, "encoding");
        }
    }));
    let artifact = session
        .export_video(&mut exporter, settings, &dir, now_millis())
        .with_context(|| "export video")?;
    deliver_artifact(artifact, &args, &dir)
}

fn cmd_departments(service: &Service, cmd: DepartmentsCmd) -> anyhow::Result<()> {
    match cmd {
        DepartmentsCmd::List => {
            for d in service.departments()? {
                println!("{}\t{}\t{}", d.id, d.name, d.template_url);
            }
        }
        DepartmentsCmd::Add {
            name,
            template_url,
            password,
        } => {
            let d = service.add_department(&name, &template_url, &password)?;
            println!("{}", d.id);
        }
        DepartmentsCmd::Delete { id, password } => {
            if !service.delete_department(&id, &password)? {
                anyhow::bail!("no department with id '{id}'");
            }
        }
    }
    Ok(())
}

fn cmd_fonts(service: &Service, cmd: FontsCmd) -> anyhow::Result<()> {
    match cmd {
        FontsCmd::List => {
            for f in service.fonts()? {
                let source = f.data.as_deref().unwrap_or("(default font)");
                println!("{}\t{}", f.name, source);
            }
        }
        FontsCmd::Add {
            name,
            file,
            password,
        } => {
            service.add_font(&name, &file, &password)?;
        }
        FontsCmd::AddDefault { name, password } => {
            service.add_default_font(&name, &password)?;
        }
        FontsCmd::Delete { name, password } => {
            if !service.delete_font(&name, &password)? {
                anyhow::bail!("no font named '{name}'");
            }
        }
    }
    Ok(())
}
