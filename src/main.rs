use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{debug, error, info, warn};

use propcam::app::{config, Alert, Collaborators, Navigator, Settings, WorkflowController};
use propcam::capture::{CaptureProvider, FileCapture};
use propcam::editor::{ImageCompositor, PropOverlay};
use propcam::register::{GraphqlRegistrationClient, PhotoFeed};
use propcam::upload::HttpUploadClient;

const HELP: &str = "\
propcam: capture a photo, add props, upload it

USAGE:
  propcam [OPTIONS] (--photo PATH | --screen)

OPTIONS:
  --photo PATH        Use an existing still as the captured picture
  --screen            Capture the primary monitor (needs the `screen` feature)
  --prop SPEC         Add a prop, SPEC is PATH[@X,Y[,SCALE[,ROTATION]]]; repeatable
  --config PATH       Read settings from PATH instead of the default location
  --init-config       Write default settings to the config path and exit
  -h, --help          Print this help
";

struct Args {
    config: Option<PathBuf>,
    init_config: bool,
    photo: Option<PathBuf>,
    screen: bool,
    props: Vec<PropOverlay>,
}

fn parse_path(s: &OsStr) -> Result<PathBuf, &'static str> {
    Ok(s.into())
}

fn parse_prop(s: &str) -> Result<PropOverlay, String> {
    s.parse()
}

fn parse_args() -> Result<Option<Args>, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{}", HELP);
        return Ok(None);
    }

    let args = Args {
        config: pargs.opt_value_from_os_str("--config", parse_path)?,
        init_config: pargs.contains("--init-config"),
        photo: pargs.opt_value_from_os_str("--photo", parse_path)?,
        screen: pargs.contains("--screen"),
        props: pargs.values_from_fn("--prop", parse_prop)?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        warn!("Ignoring unexpected arguments: {:?}", remaining);
    }

    Ok(Some(args))
}

struct ExitNavigator;

impl Navigator for ExitNavigator {
    fn go_back(&self) {
        debug!("Workflow complete, returning to caller");
    }
}

struct StderrAlert;

impl Alert for StderrAlert {
    fn alert(&self, message: &str) {
        eprintln!("Error: {}", message);
    }
}

fn camera_for(args: &Args, settings: &Settings) -> Result<Box<dyn CaptureProvider>, String> {
    match (&args.photo, args.screen) {
        (Some(_), true) => Err("--photo and --screen cannot be combined".to_string()),
        (Some(path), false) => Ok(Box::new(FileCapture::new(path))),
        (None, true) => screen_camera(settings),
        (None, false) => Err("one of --photo or --screen is required".to_string()),
    }
}

#[cfg(feature = "screen")]
fn screen_camera(settings: &Settings) -> Result<Box<dyn CaptureProvider>, String> {
    Ok(Box::new(propcam::capture::ScreenCapture::new(
        &settings.output_dir,
    )))
}

#[cfg(not(feature = "screen"))]
fn screen_camera(_settings: &Settings) -> Result<Box<dyn CaptureProvider>, String> {
    Err("screen capture is not available in this build".to_string())
}

fn load_settings(args: &Args) -> Result<Settings, String> {
    let loaded = match &args.config {
        Some(path) => config::load_from_path(path),
        None => config::load(),
    };
    loaded.map_err(|e| e.to_string())
}

fn init_config(args: &Args) -> Result<(), String> {
    let path = args
        .config
        .clone()
        .or_else(config::default_path)
        .ok_or("no config directory available")?;
    config::save_to_path(&Settings::default(), &path).map_err(|e| e.to_string())?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

async fn run(args: Args) -> Result<(), String> {
    if args.init_config {
        return init_config(&args);
    }

    let settings = load_settings(&args)?;
    debug!("Running with {:?}", settings);

    let feed = Arc::new(PhotoFeed::new());
    let collaborators = Collaborators {
        camera: camera_for(&args, &settings)?,
        renderer: Box::new(ImageCompositor::new(
            &settings.output_dir,
            settings.composite_quality,
        )),
        uploader: Box::new(
            HttpUploadClient::new(
                settings.upload_endpoint.clone(),
                settings.max_upload_bytes,
                settings.request_timeout(),
            )
            .map_err(|e| e.to_string())?,
        ),
        registrar: Box::new(
            GraphqlRegistrationClient::new(
                settings.graphql_endpoint.clone(),
                feed.clone(),
                settings.request_timeout(),
            )
            .map_err(|e| e.to_string())?,
        ),
        navigator: Box::new(ExitNavigator),
        alert: Box::new(StderrAlert),
    };

    let mut controller = WorkflowController::enter(collaborators, settings.max_props);

    controller.capture().await.map_err(|e| e.to_string())?;
    for prop in args.props {
        controller.add_prop(prop).map_err(|e| e.to_string())?;
    }

    match controller.upload().await {
        Ok(photo) => {
            println!("{}", photo.id);
            if let Some(photos) = feed.snapshot() {
                info!("{} photos now in the feed", photos.len());
            }
            Ok(())
        }
        // Already shown to the user by the alert
        Err(e) if e.is_user_visible() => Err(String::new()),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, HELP);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            if !message.is_empty() {
                error!("{}", message);
            }
            ExitCode::FAILURE
        }
    }
}
