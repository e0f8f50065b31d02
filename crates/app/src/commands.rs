use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use control::{CoSimDriver, RunOutcome, ScenarioConfig};
use mechanics::{PistonEngine, PistonScene};
use simcore::IoConfig;

/// Scenario file written by `init`
const SCENARIO_FILE: &str = "scenario.json";

pub struct RunOptions<'a> {
    pub config: Option<&'a str>,
    pub end_time: Option<f64>,
    pub damping: Option<f64>,
    pub summary: Option<&'a str>,
    pub quiet: bool,
}

fn load_scenario(path: Option<&str>) -> Result<ScenarioConfig> {
    match path {
        Some(path) => ScenarioConfig::from_json_file(Path::new(path))
            .with_context(|| format!("Failed to load scenario {path}")),
        None => Ok(ScenarioConfig::default()),
    }
}

pub fn run(options: RunOptions<'_>) -> Result<()> {
    let mut scenario = load_scenario(options.config)?;
    if let Some(end_time) = options.end_time {
        scenario = scenario.with_end_time(end_time);
    }
    if let Some(damping) = options.damping {
        scenario = scenario.with_damping(damping);
    }

    log::info!(
        "Damping '{}' at {} N·s/m until t = {} s",
        scenario.body_name,
        scenario.damping.coefficient,
        scenario.clock.end_time
    );

    let mut engine = PistonEngine::new();
    let mut driver = CoSimDriver::new(scenario);
    let quiet = options.quiet;
    let summary = driver.run(&mut engine, |record| {
        if !quiet {
            println!("{record}");
        }
    })?;

    let verb = match summary.outcome {
        RunOutcome::Completed => "Completed",
        RunOutcome::Cancelled => "Cancelled",
    };
    println!(
        "{verb} {} iterations, final time {:.3} s",
        summary.iterations, summary.final_time
    );

    if let Some(path) = options.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("Failed to write summary {path}"))?;
        log::info!("Summary written to {path}");
    }
    Ok(())
}

pub fn init(dir: &str) -> Result<()> {
    let root = Path::new(dir);
    let io = IoConfig::new(root.join("Inputs"), root.join("Results")).with_overwrite(true);
    fs::create_dir_all(&io.input_dir)
        .with_context(|| format!("Failed to create {}", io.input_dir.display()))?;

    let scenario_path = root.join(SCENARIO_FILE);
    let scene_path = io.input_dir.join(PistonScene::FILE_NAME);
    let scenario = ScenarioConfig::default().with_io(io);

    write_new(&scenario_path, &scenario.to_json_string()?)?;
    write_new(&scene_path, &serde_json::to_string_pretty(&PistonScene::default())?)?;
    Ok(())
}

fn write_new(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        log::warn!("{} exists, leaving it unchanged", path.display());
        return Ok(());
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn validate(path: &str) -> Result<()> {
    let scenario = load_scenario(Some(path))?;
    let clock = scenario.clock.build()?;
    println!(
        "{path}: OK, session '{}', body '{}', {} steps of {:.4} s",
        scenario.session_name,
        scenario.body_name,
        clock.planned_steps(),
        clock.step_size()
    );

    let scene_path = scenario.io.input_dir.join(PistonScene::FILE_NAME);
    if scene_path.is_file() {
        let scene = PistonScene::from_json_file(&scene_path)?;
        println!("{}: OK, {} objects", scene_path.display(), scene.objects.len());
    }
    Ok(())
}
