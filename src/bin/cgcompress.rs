use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cgcompress", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print canvas size, stacks and entries of a container.
    Info(InfoArgs),
    /// Render a single stack as a PNG.
    Render(RenderArgs),
    /// Render every stack into a directory of PNGs.
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input container.
    file: PathBuf,

    /// Print the manifest as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input container.
    file: PathBuf,

    /// Stack index (0-based).
    #[arg(long, default_value_t = 0)]
    stack: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input container.
    file: PathBuf,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// File name prefix; files are named `<prefix><index>.png`.
    #[arg(long, default_value = "stack_")]
    prefix: String,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Render stacks one after another.
    #[arg(long, default_value_t = false)]
    serial: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Render(args) => cmd_render(args),
        Command::Extract(args) => cmd_extract(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &std::path::Path) -> anyhow::Result<cgcompress::ArchiveSession> {
    cgcompress::ArchiveSession::open_path(path)
        .with_context(|| format!("open container '{}'", path.display()))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let sess = open(&args.file)?;
    let manifest = sess.manifest();
    let entries = sess.store().entry_names();

    if args.json {
        let doc = serde_json::json!({
            "manifest": manifest,
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("canvas: {}x{}", manifest.width, manifest.height);
    println!("stacks: {}", manifest.stack_count());
    for (i, stack) in manifest.stacks.iter().enumerate() {
        println!("  stack {i}: {} layers", stack.layers.len());
        for layer in &stack.layers {
            let hidden = if layer.visible { "" } else { " (hidden)" };
            let opacity = if layer.opacity < 1.0 {
                format!(" opacity={}", layer.opacity)
            } else {
                String::new()
            };
            println!(
                "    {} @ {},{} {}{opacity}{hidden}",
                layer.asset_name,
                layer.x,
                layer.y,
                layer.op.id()
            );
        }
    }
    println!("entries: {}", entries.len());
    for entry in entries {
        println!("  {entry}");
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let sess = open(&args.file)?;
    let buffer = sess.render(args.stack)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    cgcompress::write_png(&args.out, &buffer)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let sess = open(&args.file)?;
    let opts = cgcompress::RenderAllOpts {
        parallel: !args.serial,
        threads: args.threads,
    };

    let mut sink = cgcompress::PngDirSink::new(&args.out_dir, args.prefix);
    sess.render_into(&mut sink, &opts)?;

    eprintln!(
        "wrote {} stacks to {}",
        sink.written().len(),
        args.out_dir.display()
    );
    Ok(())
}
