mod cli;

use mediaconv::transport;
use mc_av::ToolRegistry;
use mc_convert::{ConversionJob, Dispatcher, ProgressSink};
use mc_core::config::Config;
use mc_core::MediaKind;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

fn build_dispatcher(config: &Config) -> (Arc<Dispatcher>, Arc<ToolRegistry>) {
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    for tool in ["ffmpeg", "ffprobe"] {
        if !tools.has(tool) {
            tracing::warn!("{tool} not found; video and audio conversions will fail");
        }
    }
    let dispatcher = Dispatcher::with_default_adapters(&config.conversion, tools.clone());
    (Arc::new(dispatcher), tools)
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }
    let (dispatcher, tools) = build_dispatcher(&config);

    tracing::info!("Serving requests on stdin");
    transport::serve(tokio::io::stdin(), tokio::io::stdout(), dispatcher, tools).await?;
    tracing::info!("Shutting down...");
    Ok(())
}

async fn convert_file(
    input: &Path,
    format: &str,
    output_dir: &Path,
    media_type: &str,
    config_path: Option<&Path>,
) -> Result<()> {
    let kind = MediaKind::from_str(media_type)?;
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    if !kind.supports_format(format) {
        tracing::warn!("{format} is not a listed {kind} output format; trying anyway");
    }

    let config = Config::load_or_default(config_path);
    let (dispatcher, _tools) = build_dispatcher(&config);

    let job = ConversionJob::new("cli", kind, input, format, output_dir);
    let id = job.id.clone();
    let sink = ProgressSink::new(|_, progress| println!("{progress:6.1}%"));

    let conversion = dispatcher.handle(job, sink);
    tokio::pin!(conversion);

    let finished = tokio::select! {
        result = &mut conversion => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            println!("Cancelling...");
            dispatcher.cancel(&id);
            conversion.await
        }
    };

    let output = result?;
    println!("Output: {}", output.display());
    Ok(())
}

fn list_formats(media_type: &str) -> Result<()> {
    let kind = MediaKind::from_str(media_type)?;
    for format in kind.formats() {
        println!("{format}");
    }
    Ok(())
}

async fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all().await;
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Image conversion still works; install them for video and audio.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Overwrite outputs: {}", config.conversion.overwrite);
    println!("  Monotonic progress: {}", config.conversion.monotonic_progress);
    for warning in config.validate() {
        println!("  Warning: {warning}");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr.
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediaconv=trace,mc_convert=trace,mc_av=debug,mc_core=debug".to_string()
        } else {
            "mediaconv=info,mc_convert=info,mc_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(config_path))
        }
        Commands::Convert {
            input,
            format,
            output_dir,
            media_type,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(&input, &format, &output_dir, &media_type, config_path))
        }
        Commands::Formats { media_type } => list_formats(&media_type),
        Commands::CheckTools => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_tools(config_path))
        }
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or_else(|| config_path.map(Path::to_path_buf));
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediaconv {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
