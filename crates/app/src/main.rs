use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use xr_glasses_core::registry::lock;
use xr_glasses_core::{
    DisplayEye, HandEnum, HandState, HandStatesService, InMemoryDevice, NativeInterface,
    ProviderBackend, SdkConfig, Session, Subsystem, Vector3,
};

const FRAME_SECONDS: f32 = 1.0 / 60.0;

fn main() -> xr_glasses_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            backend,
            frames,
        } => run_session(config.as_ref(), backend, frames),
        Commands::Config { backend } => print_config(backend),
    }
}

fn load_config(path: Option<&PathBuf>, backend: Option<Backend>) -> xr_glasses_core::Result<SdkConfig> {
    let mut config = match path {
        Some(path) => SdkConfig::load(path)?,
        None => SdkConfig::default(),
    };
    if let Some(backend) = backend {
        config.backend = backend.into();
    }
    Ok(config)
}

fn run_session(
    path: Option<&PathBuf>,
    backend: Option<Backend>,
    frames: u32,
) -> xr_glasses_core::Result<()> {
    let config = load_config(path, backend)?;
    let native = match config.backend {
        // No glasses are reachable from a plain CLI, so the in-memory device stands in.
        ProviderBackend::Hardware => Some(NativeInterface::from_device(Arc::new(
            InMemoryDevice::new(),
        ))),
        ProviderBackend::Emulated => None,
    };
    let tracking_mode = config.tracking_mode;
    let mut session = Session::new(config, native);

    let tracking = session.tracking()?;
    let display = session.display()?;
    let device = session.device()?;

    {
        let mut tracking = lock(&tracking)?;
        tracking.init_tracking_mode(tracking_mode);
        tracking.start();
    }
    {
        let mut display = lock(&display)?;
        display.listen_main_screen_resolution_changed(|resolution| {
            tracing::info!(?resolution, "main screen resolution changed");
        });
        display.start();
    }
    {
        let mut device = lock(&device)?;
        device.start();
        match device.glasses_model() {
            Ok(model) => tracing::info!(?model, "glasses connected"),
            Err(err) => tracing::warn!(%err, "glasses unavailable"),
        }
        if let Ok(resolution) = device.eye_resolution(DisplayEye::Left) {
            tracing::info!(?resolution, "per-eye resolution");
        }
    }

    let mut hands = session.hand_states_service().ok();
    if let Some(service) = hands.as_mut() {
        service.run_service();
    }
    let mut hand_states = [
        HandState::new(HandEnum::RightHand),
        HandState::new(HandEnum::LeftHand),
    ];

    let pause_at = frames / 2;
    for frame in 0..frames {
        let time = frame as f32 * FRAME_SECONDS;
        session.tick(time);

        if let Some(source) = session.context().scene().head_pose() {
            source.set_yaw(time);
            source.translate(Vector3::new(0.0, 0.0, -0.01));
        }
        if let Some(service) = hands.as_mut() {
            service.update_states(&mut hand_states);
        }

        {
            let tracker = lock(&tracking)?;
            let timestamp = tracker.hmd_time_nanos();
            match tracker.head_pose(timestamp) {
                Some(pose) => tracing::debug!(frame, timestamp, ?pose, "head pose"),
                None => tracing::debug!(frame, "head pose not available yet"),
            }
        }

        if frame == pause_at && frames > 1 {
            session.pause();
            if let Some(service) = hands.as_mut() {
                service.pause_service();
            }
            session.resume();
            if let Some(service) = hands.as_mut() {
                service.resume_service();
            }
        }
    }

    {
        let mut device = lock(&device)?;
        if let Ok(applied) = device.set_brightness(xr_glasses_core::BRIGHTNESS_MAX) {
            tracing::info!(applied, "brightness set");
        }
    }

    if let Some(mut service) = hands {
        let tracked = hand_states.iter().filter(|hand| hand.is_tracked).count();
        tracing::info!(tracked, "hand tracking finished");
        service.stop_service();
        service.destroy_service();
    }

    tracing::info!(frames, "session finished");
    session.teardown();
    Ok(())
}

fn print_config(backend: Option<Backend>) -> xr_glasses_core::Result<()> {
    let config = load_config(None, backend)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Hardware,
    Emulated,
}

impl From<Backend> for ProviderBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Hardware => ProviderBackend::Hardware,
            Backend::Emulated => ProviderBackend::Emulated,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "XR glasses SDK session driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a session, start every subsystem and drive it for a number of frames.
    Run {
        /// JSON configuration file; defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Overrides the backend named in the configuration.
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,
        /// Number of frames to simulate.
        #[arg(short, long, default_value_t = 120)]
        frames: u32,
    },
    /// Print the effective default configuration as JSON.
    Config {
        #[arg(short, long, value_enum)]
        backend: Option<Backend>,
    },
}
