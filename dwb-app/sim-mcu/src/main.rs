use clap::{Parser, ValueEnum};
use core::cell::RefCell;
use dwb_core::mk_static;
use dwb_core::utils::Delay;
use dwb_core::utils::controllers::{
    ControlConfig, MOTION_CHANNEL, MotionCommand, MotionController, MotionReport,
    REPORT_CHANNEL, TurnDirection,
};
use embassy_executor::{Executor, Spawner};
use static_cell::StaticCell;
use std::path::PathBuf;
use tracing::{error, info, warn};

mod plant;
use plant::{DiffDrivePlant, SimGyro, SimMotors};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Routine {
    /// Four 6in sides joined by 90 degree right turns
    Square,
    /// Forward, backward and timed moves, then a turn each way
    Selftest,
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON file overriding controller defaults
    #[clap(long)]
    config: Option<PathBuf>,
    /// JSON file holding an array of motion commands; replaces the routine
    #[clap(long)]
    script: Option<PathBuf>,
    /// built-in routine to run when no script is given
    #[clap(long, value_enum, default_value = "square")]
    routine: Routine,
    /// constant heading drift of the simulated body (deg/s)
    #[clap(long, default_value_t = 0.0)]
    drift: f32,
    /// simulate wheel encoders so open-loop moves rotate by degrees
    #[clap(long)]
    precise: bool,
}

type SimController = MotionController<SimMotors, SimGyro, Delay>;

fn routine_commands(routine: Routine) -> Vec<MotionCommand> {
    match routine {
        Routine::Square => (0..4)
            .flat_map(|_| {
                [
                    MotionCommand::D {
                        d: 6.0,
                        s: None,
                        m: None,
                    },
                    MotionCommand::T {
                        a: 90.0,
                        dir: TurnDirection::Right,
                        s: None,
                        m: None,
                    },
                ]
            })
            .collect(),
        Routine::Selftest => vec![
            MotionCommand::M { d: 2.0, s: None },
            MotionCommand::R { ms: 2000, s: None },
            MotionCommand::M {
                d: 2.0,
                s: Some(-30.0),
            },
            MotionCommand::R {
                ms: 2000,
                s: Some(-30.0),
            },
            MotionCommand::D {
                d: 2.0,
                s: None,
                m: None,
            },
            MotionCommand::T {
                a: 90.0,
                dir: TurnDirection::Right,
                s: None,
                m: None,
            },
            MotionCommand::T {
                a: 90.0,
                dir: TurnDirection::Left,
                s: None,
                m: None,
            },
        ],
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ControlConfig, String> {
    let Some(path) = path else {
        return Ok(ControlConfig::default());
    };
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    ControlConfig::from_json(&bytes).map_err(|e| format!("{}: {}", path.display(), e))
}

fn load_script(path: &PathBuf) -> Result<Vec<MotionCommand>, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("{}: {}", path.display(), e))
}

#[embassy_executor::task]
async fn motion_task(mut ctrl: SimController) -> ! {
    ctrl.motion_ch().await
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    opts: Opts,
) {
    let config = match load_config(opts.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config: {}", e);
            std::process::exit(2);
        }
    };
    let commands = match &opts.script {
        Some(path) => match load_script(path) {
            Ok(commands) => commands,
            Err(e) => {
                error!("failed to load script: {}", e);
                std::process::exit(2);
            }
        },
        None => routine_commands(opts.routine),
    };

    let plant = &*mk_static!(RefCell<DiffDrivePlant>, RefCell::new(DiffDrivePlant::new(&config, opts.drift)));
    let ctrl = match MotionController::new(
        SimMotors::new(plant, opts.precise),
        SimGyro::new(plant),
        Delay,
        config,
    ) {
        Ok(ctrl) => ctrl,
        Err(e) => {
            error!("invalid config: {:?}", e);
            std::process::exit(2);
        }
    };
    info!(strategy = ?ctrl.strategy(), drift = opts.drift, "simulated robot ready");
    spawner.spawn(motion_task(ctrl)).unwrap();

    let mut failures = 0usize;
    for (i, command) in commands.iter().enumerate() {
        MOTION_CHANNEL.send(*command).await;
        let report: MotionReport = REPORT_CHANNEL.receive().await;
        if !report.is_success() {
            warn!(step = i, ?report, "command did not succeed");
            failures += 1;
        }
        println!("{}", serde_json::to_string(&report).unwrap());
    }

    let (yaw, odometer) = {
        let mut plant = plant.borrow_mut();
        (plant.yaw(), plant.odometer())
    };
    println!(
        "{}",
        serde_json::json!({
            "commands": commands.len(),
            "failures": failures,
            "heading_deg": yaw,
            "odometer_in": odometer,
        })
    );
    std::process::exit(if failures == 0 { 0 } else { 1 });
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts: Opts = Opts::parse();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, opts)).unwrap();
    });
}
