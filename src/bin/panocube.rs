use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "panocube", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a panorama into six watermarked JPEG cube faces.
    Run(RunArgs),
    /// Pack six existing CubeFace{0..5}.jpeg files into a zip.
    Archive(ArchiveArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input equirectangular panorama.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Directory receiving CubeFace{0..5}.jpeg.
    #[arg(long)]
    out_dir: PathBuf,

    /// Pipeline config JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Face size in pixels.
    #[arg(long)]
    cube_size: Option<u32>,

    /// JPEG quality in [0, 1].
    #[arg(long)]
    quality: Option<f32>,

    /// Top watermark text (empty disables it).
    #[arg(long)]
    watermark: Option<String>,

    /// Logo drawn on face 3 (SVG or raster).
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Font file for overlay text.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Also write a zip archive of all faces.
    #[arg(long)]
    zip: Option<PathBuf>,

    /// Upload each face as it is published.
    #[arg(long)]
    upload: bool,

    /// Process faces concurrently.
    #[arg(long)]
    parallel: bool,

    /// Render backend.
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,
}

#[derive(Parser, Debug)]
struct ArchiveArgs {
    /// Directory holding CubeFace{0..5}.jpeg.
    #[arg(long)]
    dir: PathBuf,

    /// Output zip path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
    Gpu,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Archive(args) => cmd_archive(args),
    }
}

fn build_config(args: &RunArgs) -> anyhow::Result<panocube::PipelineConfig> {
    let mut cfg = match &args.config {
        Some(path) => panocube::PipelineConfig::from_json_file(path)?,
        None => panocube::PipelineConfig::default(),
    };
    if let Some(px) = args.cube_size {
        cfg.cube_size = panocube::CubeSize::new(px)?;
    }
    if !cfg.cube_size.is_preset() {
        tracing::warn!(
            cube_size = cfg.cube_size.get(),
            presets = ?panocube::CubeSize::PRESETS,
            "cube size is not a standard preset"
        );
    }
    if let Some(q) = args.quality {
        cfg.quality = panocube::Quality::new(q)?;
    }
    if let Some(text) = &args.watermark {
        cfg.watermark_text = text.clone();
    }
    if args.logo.is_some() {
        cfg.logo = args.logo.clone();
    }
    if args.font.is_some() {
        cfg.font = args.font.clone();
    }
    if let Some(choice) = args.backend {
        cfg.backend = match choice {
            BackendChoice::Cpu => panocube::BackendKind::Cpu,
            BackendChoice::Gpu => panocube::BackendKind::Gpu,
        };
    }
    if args.parallel {
        cfg.parallel = true;
    }
    if args.upload && cfg.upload.is_none() {
        cfg.upload = Some(panocube::UploadConfig::default());
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args)?;
    let orch = panocube::Orchestrator::from_config(&cfg)?;
    let mut sink = panocube::DirSink::new(&args.out_dir);

    let request = panocube::RunRequest::new(
        panocube::PanoramaSource::Path(args.in_path.clone()),
        cfg,
    );
    let report = orch
        .run(request, &mut sink)?
        .into_report()
        .context("run was ignored")?;

    for upload in &report.uploads {
        match (&upload.error, &upload.tiles) {
            (Some(err), _) => eprintln!("upload face {}: failed: {err}", upload.face),
            (None, Some(tiles)) => eprintln!("upload face {}: tiles {tiles}", upload.face),
            (None, None) => eprintln!("upload face {}: ok", upload.face),
        }
    }

    if let Some(zip) = &args.zip {
        panocube::save_archive(&report.faces, zip)?;
        eprintln!("wrote {}", zip.display());
    }

    eprintln!(
        "wrote 6 faces to {} in {:.2}s ({})",
        args.out_dir.display(),
        report.elapsed.as_secs_f64(),
        report.caption
    );
    Ok(())
}

fn cmd_archive(args: ArchiveArgs) -> anyhow::Result<()> {
    let faces = read_faces(&args.dir)?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    panocube::save_archive(&faces, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn read_faces(dir: &Path) -> anyhow::Result<panocube::EncodedFaces> {
    let mut faces = panocube::EncodedFaces::new();
    for face in panocube::FaceIndex::ALL {
        let path = dir.join(format!("CubeFace{}.jpeg", face.get()));
        let bytes =
            std::fs::read(&path).with_context(|| format!("read face '{}'", path.display()))?;
        let (width, height) = image::ImageReader::new(std::io::Cursor::new(&bytes))
            .with_guessed_format()
            .context("sniff face format")?
            .into_dimensions()
            .with_context(|| format!("read face header '{}'", path.display()))?;
        faces.insert(panocube::EncodedFace {
            face,
            bytes,
            width,
            height,
            caption: String::new(),
        })?;
    }
    Ok(faces)
}
