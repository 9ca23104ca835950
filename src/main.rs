mod app;
mod canvas;
mod config;
mod crop;
mod flatten;
mod history;
mod object;
mod pointer;
mod scene;
mod state;
mod theme;
mod toolbar;

use std::path::PathBuf;
use std::process::ExitCode;

use eframe::egui::{Vec2, ViewportBuilder};

use crate::app::EditorApp;

fn main() -> ExitCode {
    env_logger::init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: snapcrop <image-file>");
        return ExitCode::from(2);
    };
    if !path.is_file() {
        eprintln!("snapcrop: no such file: {}", path.display());
        return ExitCode::from(2);
    }

    let output_path = annotated_path(&path);
    let on_save: app::SaveCallback = Box::new(move |image: &image::DynamicImage| {
        let bytes = flatten::encode_png(image)?;
        std::fs::write(&output_path, bytes)?;
        log::info!("wrote {}", output_path.display());
        Ok(())
    });

    let options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("SnapCrop")
            .with_inner_size(Vec2::new(1200.0, 840.0))
            .with_min_inner_size(Vec2::new(640.0, 480.0)),
        ..Default::default()
    };

    let result = eframe::run_native(
        "SnapCrop",
        options,
        Box::new(move |_cc| Box::new(EditorApp::new(&path, on_save))),
    );
    if let Err(err) = result {
        eprintln!("snapcrop: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// `shot.png` saves next to itself as `shot_annotated.png`.
fn annotated_path(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());
    input.with_file_name(format!("{stem}_annotated.png"))
}
