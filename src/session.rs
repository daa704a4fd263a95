use std::{fmt, path::PathBuf};

use crate::{
    background::Background,
    brush::Color,
    cmd::Cmd,
    config::{Config, PaletteEntry},
    export::{self, ExportJob, ExportOutcome, Exporter},
    surface::DrawingSurface,
};

/// The result of the most recent save, for display to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Saved(PathBuf),
    Failed(String),
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Saved(path) => write!(f, "saved to {}", path.display()),
            ExportStatus::Failed(reason) => write!(f, "save failed: {reason}"),
        }
    }
}

/// Applies [`Cmd`]s to a [`DrawingSurface`] and routes snapshots to the [`Exporter`].
///
/// Lives on the event loop thread; the only thing crossing threads is the captured pixmap.
pub struct Session {
    surface: DrawingSurface,
    palette: Vec<PaletteEntry>,
    color_index: usize,
    brush_sizes: [f32; 3],
    background_color: Color,
    share_command: Vec<String>,
    exporter: Exporter,
    viewport: (u32, u32),
    status: Option<ExportStatus>,
}

impl Session {
    pub fn new(config: &Config, exporter: Exporter) -> Self {
        let background = match &config.background {
            Some(path) => Background::load(config.background_color, path).unwrap_or_else(|e| {
                log::warn!("{e}");
                Background::solid(config.background_color)
            }),
            None => Background::solid(config.background_color),
        };
        let color_index = config
            .palette
            .iter()
            .position(|entry| entry.name == config.default_color)
            .unwrap_or(0);

        Self {
            surface: DrawingSurface::new(config.initial_brush(), background),
            palette: config.palette.clone(),
            color_index,
            brush_sizes: config.brush_sizes,
            background_color: config.background_color,
            share_command: config.share_command.clone(),
            exporter,
            viewport: (config.width, config.height),
            status: None,
        }
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    /// Size of the drawable area in pixels; saved images have this size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    /// Returns the outcome of a save that finished since the last call.
    pub fn take_status(&mut self) -> Option<ExportStatus> {
        self.status.take()
    }

    pub fn take_redraw(&mut self) -> bool {
        self.surface.take_redraw()
    }

    pub fn handle(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::PointerDown { position } => self.surface.pointer_down(position),
            Cmd::PointerMove { position } => self.surface.pointer_move(position),
            Cmd::PointerUp => self.surface.pointer_up(),
            Cmd::PointerCancel => self.surface.pointer_cancel(),
            Cmd::Undo => {
                if self.surface.undo() {
                    log::info!("undo ({} strokes left)", self.surface.strokes().len());
                }
            }
            Cmd::SetColor { name } => {
                match self.palette.iter().position(|entry| entry.name == name) {
                    Some(index) => self.select_color(index),
                    None => log::warn!("ignoring unknown palette color '{name}'"),
                }
            }
            Cmd::NextColor => self.select_color((self.color_index + 1) % self.palette.len().max(1)),
            Cmd::SetBrushSize { size } => {
                let width = self.brush_sizes[size.index()];
                log::debug!("brush size {size:?} ({width}px)");
                self.surface.set_brush_width(width);
            }
            Cmd::SetBackground { path } => match Background::load(self.background_color, &path) {
                Ok(background) => {
                    log::info!("background set to '{}'", path.display());
                    self.surface.set_background(background);
                }
                Err(e) => log::error!("{e}"),
            },
            Cmd::Save => self.export(false),
            Cmd::Share => self.export(true),
            Cmd::ExportFinished(outcome) => self.export_finished(outcome),
        }
    }

    fn select_color(&mut self, index: usize) {
        let Some(entry) = self.palette.get(index) else {
            return;
        };
        log::debug!("brush color {} ({})", entry.name, entry.value);
        self.color_index = index;
        self.surface.set_brush_color(entry.value);
    }

    fn export(&mut self, share: bool) {
        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            log::warn!("not saving: viewport is {width}x{height}");
            return;
        }
        // Snapshot now, on this thread; the worker only ever sees the pixels.
        let pixmap = self.surface.rasterize(width, height);
        if let Err(e) = self.exporter.submit(ExportJob { pixmap, share }) {
            log::error!("could not save drawing: {e}");
            self.status = Some(ExportStatus::Failed(e.to_string()));
        }
    }

    fn export_finished(&mut self, outcome: ExportOutcome) {
        let path = match outcome.result {
            Ok(path) => path,
            Err(e) => {
                log::error!("could not save drawing: {e}");
                self.status = Some(ExportStatus::Failed(e.to_string()));
                return;
            }
        };
        log::info!("saved drawing to '{}'", path.display());

        if outcome.share {
            if self.share_command.is_empty() {
                log::info!("no share command configured, drawing is at '{}'", path.display());
            } else if let Err(e) = export::share_file(&self.share_command, &path) {
                log::warn!("could not run share command {:?}: {e}", self.share_command);
            }
        }
        self.status = Some(ExportStatus::Saved(path));
    }
}
