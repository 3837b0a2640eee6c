use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;
use std::f32::consts::{PI, TAU};
use std::path::PathBuf;

use strac_aim::clock::ManualClock;
use strac_aim::config::{ConfigStore, FileConfigStore, TrainerConfig};
use strac_aim::create_headless_app;
use strac_aim::history::FileHistoryStore;
use strac_aim::input::PointerInput;
use strac_aim::session::{SessionCommand, SessionEngine, SessionEvent};
use strac_aim::stats::SessionSummary;

/// headless aim-trainer session with a scripted aim bot
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
struct Cli {
    /// session length in seconds (menu presets: 180, 300, 600, 900)
    #[clap(short = 'd', long)]
    duration: Option<f64>,

    /// pointer sensitivity; anything unparsable reads as 0
    #[clap(short = 's', long)]
    sensitivity: Option<String>,

    /// simulated frames per second
    #[clap(long, default_value_t = 60)]
    fps: u32,

    /// seed for target placement
    #[clap(long)]
    seed: Option<u64>,

    /// crosshair code, e.g. "c;1;0t;2;0l;6;0o;2;0a;1"
    #[clap(long)]
    crosshair: Option<String>,

    /// fraction of the remaining aim error the bot corrects each frame
    #[clap(long, default_value_t = 0.3)]
    aim_speed: f32,

    /// history file (defaults to the platform data directory)
    #[clap(long)]
    history: Option<PathBuf>,

    /// config file (defaults to the platform config directory)
    #[clap(long)]
    config: Option<PathBuf>,

    /// write the merged settings back to the config file
    #[clap(long)]
    save_config: bool,
}

// --- Aim Bot ---

#[derive(Debug, Default)]
struct AimPlan {
    delta: Vec2,
    click: bool,
}

/// Steers the view toward the closest target the way a hand on a mouse would:
/// a fraction of the remaining error per frame, clicking once settled.
struct AimBot {
    aim_speed: f32,
}

impl AimBot {
    fn plan(&self, engine: &SessionEngine) -> AimPlan {
        let profile = engine.sensitivity();
        let radians_per_pixel = profile.radians_per_pixel();
        if radians_per_pixel <= 0.0 {
            return AimPlan::default();
        }

        let eye = engine.eye();
        let view = engine.orientation();
        let best = engine
            .targets()
            .map(|target| {
                let to_target = target.position - eye;
                let yaw = (-to_target.x).atan2(-to_target.z);
                let pitch = to_target.y.atan2(Vec2::new(to_target.x, to_target.z).length());
                let yaw_error = (yaw - view.yaw + PI).rem_euclid(TAU) - PI;
                let error = Vec2::new(yaw_error, pitch - view.pitch);
                let tolerance = (target.hitbox.radius() / to_target.length()).atan() * 0.5;
                (error, tolerance)
            })
            .min_by(|(a, _), (b, _)| a.length().total_cmp(&b.length()));

        let Some((error, tolerance)) = best else {
            return AimPlan::default();
        };
        let correction = if error.length() < tolerance { error } else { error * self.aim_speed };
        AimPlan {
            // Both axes are subtracted by the mapper, so push the opposite way
            delta: -correction / radians_per_pixel,
            click: error.length() < tolerance,
        }
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("Score:    {}", summary.record.score);
    println!("Accuracy: {}%", summary.record.accuracy);
    println!("Reaction: {}ms", summary.record.reaction_ms);
    println!();
    println!("{}", summary.analysis.message);
    println!("Tip: {}", summary.analysis.tip);
}

fn main() {
    let cli = Cli::parse();

    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config: TrainerConfig = config_store.load();
    if let Some(duration) = cli.duration {
        config.session_duration_secs = duration;
    }
    if let Some(input) = &cli.sensitivity {
        config.set_sensitivity_input(input);
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.crosshair.is_some() {
        config.crosshair_code = cli.crosshair.clone();
    }
    if let Err(err) = config.validate() {
        eprintln!("Invalid settings: {err}");
        std::process::exit(2);
    }
    if cli.save_config {
        if let Err(err) = config_store.save(&config) {
            eprintln!("Could not save config: {err}");
        }
    }

    match config.sensitivity_profile().pixels_per_360() {
        Some(pixels) => println!("Sensitivity {} ({pixels:.0} px per 360)", config.sensitivity),
        None => println!("Sensitivity 0: the view will not turn"),
    }

    let history = match &cli.history {
        Some(path) => FileHistoryStore::with_path(path),
        None => FileHistoryStore::new(),
    };
    let history_path = history.path().to_path_buf();

    let fps = cli.fps.max(1);
    let frame_ms = 1000.0 / f64::from(fps);
    let max_frames = ((config.session_duration_secs + 1.0) * f64::from(fps)).ceil() as u64;

    // Simulated time starts now, so stored records carry real dates
    let clock = ManualClock::new(chrono::Utc::now().timestamp_millis() as f64);
    let mut app = create_headless_app(config, clock.clone(), history);
    app.add_plugins(LogPlugin::default());
    app.world_mut().send_event(SessionCommand::Start);

    let bot = AimBot {
        aim_speed: cli.aim_speed.clamp(0.01, 1.0),
    };
    let mut summary = None;
    for _ in 0..max_frames {
        app.update();

        let events: Vec<SessionEvent> = app.world_mut().resource_mut::<Events<SessionEvent>>().drain().collect();
        for event in events {
            match event {
                // Headless host: capture is granted as soon as it is asked for
                SessionEvent::CaptureRequested => app.world_mut().resource_mut::<PointerInput>().capture_changed(true),
                SessionEvent::Ended(done) => summary = Some(done),
                _ => {}
            }
        }
        if summary.is_some() {
            break;
        }

        let plan = bot.plan(app.world().resource::<SessionEngine>());
        let mut input = app.world_mut().resource_mut::<PointerInput>();
        input.push_motion(plan.delta);
        if plan.click {
            input.push_click();
        }
        clock.advance(frame_ms);
    }

    match summary {
        Some(summary) => {
            print_summary(&summary);
            println!();
            println!("History saved to {}", history_path.display());
        }
        None => eprintln!("Session did not finish"),
    }
}
