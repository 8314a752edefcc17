use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use animatic::config;
use animatic::gemini::{GeminiClient, GeminiError, GEMINI_API_KEY_ENV};
use animatic::luma::{LumaClient, LumaError, LUMA_API_KEY_ENV};
use animatic::pipeline::{self, setup_cancel_flag, Pipeline, PipelineOptions};
use animatic::upload::UploadChain;

/// Parse and validate a polling interval in seconds (1-60)
fn parse_poll_interval(s: &str) -> Result<u64, String> {
    let secs: u64 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=60).contains(&secs) {
        return Err(format!(
            "Poll interval must be between 1 and 60 seconds, got {}",
            secs
        ));
    }
    Ok(secs)
}

/// Parse and validate a poll attempt budget (1-10000)
fn parse_max_attempts(s: &str) -> Result<u32, String> {
    let attempts: u32 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=10_000).contains(&attempts) {
        return Err(format!(
            "Max poll attempts must be between 1 and 10000, got {}",
            attempts
        ));
    }
    Ok(attempts)
}

/// animatic: prompt-to-video generation pipeline
#[derive(Parser)]
#[command(name = "animatic")]
#[command(version, about = "Generate an image from a prompt and animate it into a video")]
#[command(long_about = "Generates a still image from a text prompt, publishes it at a \
    public URL via a chain of file hosts, then animates it with Luma Dream \
    Machine and downloads the resulting clip.")]
#[command(after_help = "EXAMPLES:
    # Full pipeline with default prompts
    animatic run

    # Custom prompts
    animatic run --prompt \"a lighthouse at dusk\" --motion-prompt \"waves rolling in\"

    # Keep outputs in a separate directory
    animatic run --output-dir clips/

    # Serve the image locally if every upload host is down
    animatic run --serve-fallback --port 8000

    # Image only
    animatic image --prompt \"a lighthouse at dusk\"

    # Animate an image that is already online
    animatic animate https://example.com/lighthouse.png

ENVIRONMENT:
    GEMINI_API_KEY    Required for image generation.
    LUMA_API_KEY      Required for video generation.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: image, upload, video, download
    #[command(after_help = "EXAMPLES:
    animatic run
    animatic run --prompt \"a lighthouse at dusk\" --motion-prompt \"waves rolling in\"
    animatic run --poll-interval 5 --max-poll-attempts 60")]
    Run {
        /// Text prompt for the still image
        #[arg(long, short = 'p')]
        prompt: Option<String>,

        /// Motion description passed to the video model
        #[arg(long, short = 'm')]
        motion_prompt: Option<String>,

        /// Image generation model
        #[arg(long)]
        image_model: Option<String>,

        /// Video generation model
        #[arg(long)]
        video_model: Option<String>,

        /// Directory for the image and video outputs (default: current dir)
        #[arg(long, short = 'O')]
        output_dir: Option<PathBuf>,

        /// Seconds between generation status polls (default: 3)
        #[arg(long, value_parser = parse_poll_interval)]
        poll_interval: Option<u64>,

        /// Status polls before giving up (default: 100)
        #[arg(long, value_parser = parse_max_attempts)]
        max_poll_attempts: Option<u32>,

        /// Serve the output directory locally when all upload hosts fail
        #[arg(long)]
        serve_fallback: bool,

        /// Port for the local fallback server (default: 8000)
        #[arg(long)]
        port: Option<u16>,

        /// Custom config file path (default: ~/.config/animatic/config.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Generate and save the still image only
    #[command(after_help = "EXAMPLES:
    animatic image
    animatic image --prompt \"a lighthouse at dusk\" --output-dir art/")]
    Image {
        /// Text prompt for the still image
        #[arg(long, short = 'p')]
        prompt: Option<String>,

        /// Image generation model
        #[arg(long)]
        image_model: Option<String>,

        /// Directory for the image output (default: current dir)
        #[arg(long, short = 'O')]
        output_dir: Option<PathBuf>,

        /// Custom config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Animate an already-public image URL into a video
    #[command(after_help = "EXAMPLES:
    animatic animate https://example.com/lighthouse.png
    animatic animate https://example.com/cat.png --motion-prompt \"tail flicking\"")]
    Animate {
        /// Public URL of the keyframe image
        image_url: String,

        /// Motion description passed to the video model
        #[arg(long, short = 'm')]
        motion_prompt: Option<String>,

        /// Video generation model
        #[arg(long)]
        video_model: Option<String>,

        /// Directory for the video output (default: current dir)
        #[arg(long, short = 'O')]
        output_dir: Option<PathBuf>,

        /// Seconds between generation status polls (default: 3)
        #[arg(long, value_parser = parse_poll_interval)]
        poll_interval: Option<u64>,

        /// Status polls before giving up (default: 100)
        #[arg(long, value_parser = parse_max_attempts)]
        max_poll_attempts: Option<u32>,

        /// Custom config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

/// Load .env and warn about missing API keys
fn load_env() {
    // dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    if std::env::var(GEMINI_API_KEY_ENV).is_err() {
        eprintln!("Warning: {} environment variable not set.", GEMINI_API_KEY_ENV);
        eprintln!("         Image generation will fail without it.\n");
    }
    if std::env::var(LUMA_API_KEY_ENV).is_err() {
        eprintln!("Warning: {} environment variable not set.", LUMA_API_KEY_ENV);
        eprintln!("         Video generation will fail without it.\n");
    }
}

fn missing_gemini_key_message() -> String {
    format!(
        "{} environment variable is not set.\n\n\
        Add your API key to a .env file:\n\
            echo '{}=your-api-key-here' >> .env\n\n\
        Or set it as an environment variable:\n\
            export {}=\"your-api-key-here\"",
        GEMINI_API_KEY_ENV, GEMINI_API_KEY_ENV, GEMINI_API_KEY_ENV
    )
}

fn missing_luma_key_message() -> String {
    format!(
        "{} environment variable is not set.\n\n\
        Add your API key to a .env file:\n\
            echo '{}=your-api-key-here' >> .env\n\n\
        Or set it as an environment variable:\n\
            export {}=\"your-api-key-here\"\n\n\
        Get your API key at: https://lumalabs.ai/",
        LUMA_API_KEY_ENV, LUMA_API_KEY_ENV, LUMA_API_KEY_ENV
    )
}

/// Merge CLI args over config file values into pipeline options.
#[allow(clippy::too_many_arguments)] // Direct mapping from CLI args
fn resolve_options(
    cfg: &config::Config,
    prompt: Option<String>,
    motion_prompt: Option<String>,
    output_dir: Option<PathBuf>,
    poll_interval: Option<u64>,
    max_poll_attempts: Option<u32>,
    serve_fallback: bool,
    port: Option<u16>,
) -> PipelineOptions {
    let defaults = PipelineOptions::default();

    PipelineOptions {
        image_prompt: prompt
            .or_else(|| cfg.image.prompt.clone())
            .unwrap_or(defaults.image_prompt),
        video_prompt: motion_prompt
            .or_else(|| cfg.video.prompt.clone())
            .unwrap_or(defaults.video_prompt),
        image_output: cfg
            .image
            .output
            .clone()
            .unwrap_or(defaults.image_output),
        output_dir: output_dir
            .or_else(|| cfg.video.output_dir.clone())
            .unwrap_or(defaults.output_dir),
        poll_interval: poll_interval
            .or(cfg.video.poll_interval_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval),
        max_poll_attempts: max_poll_attempts
            .or(cfg.video.max_poll_attempts)
            .unwrap_or(defaults.max_poll_attempts),
        serve_fallback: serve_fallback || cfg.serve.enabled,
        serve_port: port.or(cfg.serve.port).unwrap_or(defaults.serve_port),
    }
}

fn build_gemini_client(cfg: &config::Config, model_flag: Option<String>) -> Result<GeminiClient, String> {
    let mut client = GeminiClient::new().map_err(|e| match e {
        GeminiError::MissingApiKey => missing_gemini_key_message(),
        _ => format!("Failed to create Gemini client: {}", e),
    })?;
    if let Some(model) = model_flag.or_else(|| cfg.image.model.clone()) {
        client.set_model(model);
    }
    Ok(client)
}

fn build_luma_client(cfg: &config::Config, model_flag: Option<String>) -> Result<LumaClient, String> {
    let mut client = LumaClient::new().map_err(|e| match e {
        LumaError::MissingApiKey => missing_luma_key_message(),
        _ => format!("Failed to create Luma client: {}", e),
    })?;
    if let Some(model) = model_flag.or_else(|| cfg.video.model.clone()) {
        client.set_model(model);
    }
    Ok(client)
}

fn load_config(path: Option<&PathBuf>) -> config::Config {
    match config::Config::load(path.map(|p| p.as_path())) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: {}", e);
            eprintln!("Using default settings.\n");
            config::Config::default()
        }
    }
}

/// Run the full pipeline
#[allow(clippy::too_many_arguments)] // Direct mapping from CLI args
fn run_pipeline(
    prompt: Option<String>,
    motion_prompt: Option<String>,
    image_model: Option<String>,
    video_model: Option<String>,
    output_dir: Option<PathBuf>,
    poll_interval: Option<u64>,
    max_poll_attempts: Option<u32>,
    serve_fallback: bool,
    port: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<(), String> {
    let cfg = load_config(config_path.as_ref());
    let options = resolve_options(
        &cfg,
        prompt,
        motion_prompt,
        output_dir,
        poll_interval,
        max_poll_attempts,
        serve_fallback,
        port,
    );

    let gemini = build_gemini_client(&cfg, image_model)?;
    let luma = build_luma_client(&cfg, video_model)?;
    let uploads = UploadChain::with_default_services()
        .map_err(|e| format!("Failed to set up upload services: {}", e))?;

    let pipeline = Pipeline::new(gemini, uploads, luma, options);
    let cancel = setup_cancel_flag();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    let outcome = rt
        .block_on(pipeline.run(&cancel))
        .map_err(|e| e.to_string())?;

    println!("Image:  {}", outcome.image_path.display());
    if let Some(upload) = &outcome.upload {
        println!("Hosted: {} ({})", upload.url, upload.service);
    }
    println!("Video:  {}", outcome.video_path.display());
    Ok(())
}

/// Run image generation only
fn run_image(
    prompt: Option<String>,
    image_model: Option<String>,
    output_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<(), String> {
    let cfg = load_config(config_path.as_ref());
    let options = resolve_options(&cfg, prompt, None, output_dir, None, None, false, None);
    let gemini = build_gemini_client(&cfg, image_model)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        let image = gemini
            .generate_image(&options.image_prompt)
            .await
            .map_err(|e| e.to_string())?;

        tokio::fs::create_dir_all(&options.output_dir)
            .await
            .map_err(|e| format!("Failed to create output directory: {}", e))?;
        let path = options.output_dir.join(&options.image_output);
        tokio::fs::write(&path, &image.data)
            .await
            .map_err(|e| format!("Failed to write image: {}", e))?;

        println!("Image saved to {} ({})", path.display(), image.mime_type);
        Ok(())
    })
}

/// Animate an already-public image URL
#[allow(clippy::too_many_arguments)] // Direct mapping from CLI args
fn run_animate(
    image_url: String,
    motion_prompt: Option<String>,
    video_model: Option<String>,
    output_dir: Option<PathBuf>,
    poll_interval: Option<u64>,
    max_poll_attempts: Option<u32>,
    config_path: Option<PathBuf>,
) -> Result<(), String> {
    let cfg = load_config(config_path.as_ref());
    let options = resolve_options(
        &cfg,
        None,
        motion_prompt,
        output_dir,
        poll_interval,
        max_poll_attempts,
        false,
        None,
    );
    let luma = build_luma_client(&cfg, video_model)?;
    let cancel = setup_cancel_flag();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        let generation = luma
            .create_generation_with_retry(&options.video_prompt, &image_url)
            .await
            .map_err(|e| e.to_string())?;

        let video_url = luma
            .poll_until_complete(
                &generation.id,
                options.poll_interval,
                options.max_poll_attempts,
                &cancel,
            )
            .await
            .map_err(|e| e.to_string())?;

        let dest = options.output_dir.join(format!("{}.mp4", generation.id));
        let path = luma
            .download_video(&video_url, &dest)
            .await
            .map_err(|e| e.to_string())?;

        println!("Video downloaded to {}", path.display());
        Ok(())
    })
}

fn main() {
    env_logger::init();
    load_env();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            prompt,
            motion_prompt,
            image_model,
            video_model,
            output_dir,
            poll_interval,
            max_poll_attempts,
            serve_fallback,
            port,
            config,
        }) => {
            if let Err(e) = run_pipeline(
                prompt,
                motion_prompt,
                image_model,
                video_model,
                output_dir,
                poll_interval,
                max_poll_attempts,
                serve_fallback,
                port,
                config,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Image {
            prompt,
            image_model,
            output_dir,
            config,
        }) => {
            if let Err(e) = run_image(prompt, image_model, output_dir, config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Animate {
            image_url,
            motion_prompt,
            video_model,
            output_dir,
            poll_interval,
            max_poll_attempts,
            config,
        }) => {
            if let Err(e) = run_animate(
                image_url,
                motion_prompt,
                video_model,
                output_dir,
                poll_interval,
                max_poll_attempts,
                config,
            ) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("animatic {}", env!("CARGO_PKG_VERSION"));
            println!("Prompt-to-video generation pipeline\n");
            println!("USAGE:");
            println!("    animatic <COMMAND>\n");
            println!("COMMANDS:");
            println!("    run      Run the full pipeline: image, upload, video, download");
            println!("    image    Generate and save the still image only");
            println!("    animate  Animate an already-public image URL into a video");
            println!("    help     Print this message or the help of a subcommand\n");
            println!("Run 'animatic --help' for more details and examples.");
        }
    }
}
