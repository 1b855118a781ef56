use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;

use canvas_engine::io::{self, DirStore};
use canvas_engine::tools::settings::ToolSettings;
use canvas_engine::utils::exporter::{ExportFormat, export_composite};
use canvas_engine::utils::profiler::ScopeTimer;
use canvas_engine::{
    Color, Document, EngineConfig, EngineError, InputEvent, SelectionRegion, SelectionShape,
};

/// One scripted editor action.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Event { event: InputEvent },
    Tool { name: String },
    Settings { settings: ToolSettings },
    AddLayer,
    Undo,
    Redo,
    SelectRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        #[serde(default)]
        feather: f32,
    },
    ClearSelection,
    Fill { color: [u8; 4] },
}

#[derive(Debug, Deserialize)]
struct Script {
    width: u32,
    height: u32,
    #[serde(default)]
    steps: Vec<Step>,
}

/// Replay a scripted editing session headlessly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON script of steps to replay
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,

    /// Write the final composite here (format from the extension)
    #[arg(long, value_name = "IMAGE")]
    out: Option<PathBuf>,

    /// Engine configuration JSON
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory to save the document and layer payloads into
    #[arg(long, value_name = "DIR")]
    save: Option<PathBuf>,
}

fn apply(doc: &mut Document, step: Step) -> Result<(), EngineError> {
    match step {
        Step::Event { event } => {
            doc.queue_event(event);
            doc.tick();
        }
        Step::Tool { name } => {
            doc.select_tool_named(&name)?;
        }
        Step::Settings { settings } => doc.update_settings(|s| *s = settings),
        Step::AddLayer => {
            doc.add_layer()?;
        }
        Step::Undo => {
            doc.undo();
        }
        Step::Redo => {
            doc.redo();
        }
        Step::SelectRect {
            x,
            y,
            width,
            height,
            feather,
        } => {
            let region = SelectionRegion::new(SelectionShape::Rectangle {
                x,
                y,
                width,
                height,
            })
            .with_feather(feather);
            doc.set_selection(Some(region))?;
        }
        Step::ClearSelection => {
            doc.clear_selection()?;
        }
        Step::Fill { color } => {
            let [r, g, b, a] = color;
            doc.fill_selection(Color::rgba(r, g, b, a))?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), EngineError> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let script: Script = serde_json::from_str(&std::fs::read_to_string(&args.script)?)?;
    let mut doc = Document::with_config(script.width, script.height, config)?;
    log::info!(
        "replaying {} steps on a {}x{} canvas",
        script.steps.len(),
        script.width,
        script.height
    );

    {
        let _timer = ScopeTimer::new("replay");
        for (i, step) in script.steps.into_iter().enumerate() {
            if let Err(err) = apply(&mut doc, step) {
                log::warn!("step {i} failed: {err}");
            }
        }
    }
    log::info!("history holds {} entries", doc.history().undo_len());

    if let Some(out) = &args.out {
        let format = ExportFormat::from_path(out).unwrap_or(ExportFormat::PNG);
        export_composite(&doc.render()?, out, format)?;
    }
    if let Some(dir) = &args.save {
        let mut store = DirStore::new(dir.join("layers"));
        let json = io::save_json(&doc, &mut store)?;
        std::fs::write(dir.join("document.json"), json)?;
        log::info!("saved document to {}", dir.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_and_long_options() {
        let args = Args::try_parse_from([
            "canvas-engine",
            "session.json",
            "--out",
            "final.png",
            "--save",
            "out/doc",
        ])
        .unwrap();
        assert_eq!(args.script, PathBuf::from("session.json"));
        assert_eq!(args.out, Some(PathBuf::from("final.png")));
        assert_eq!(args.save, Some(PathBuf::from("out/doc")));
        assert!(args.config.is_none());
    }

    #[test]
    fn script_is_required() {
        assert!(Args::try_parse_from(["canvas-engine", "--out", "x.png"]).is_err());
    }

    #[test]
    fn steps_deserialize_by_op_tag() {
        let script: Script = serde_json::from_str(
            r#"{"width": 8, "height": 8, "steps": [
                {"op": "add_layer"},
                {"op": "select_rect", "x": 0, "y": 0, "width": 4, "height": 4},
                {"op": "fill", "color": [255, 0, 0, 255]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 3);
        assert!(matches!(script.steps[1], Step::SelectRect { feather, .. } if feather == 0.0));
    }
}
