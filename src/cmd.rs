use std::path::PathBuf;

use crate::{brush::BrushSize, config::CommandVerb, export::ExportOutcome, math::Vec2f};

#[derive(Debug)]
pub enum Cmd {
    /// Pointer position in view-space pixels.
    PointerDown {
        position: Vec2f,
    },
    PointerMove {
        position: Vec2f,
    },
    PointerUp,
    /// The platform aborted the touch; the in-progress stroke is discarded.
    PointerCancel,

    Undo,
    SetColor {
        name: String,
    },
    NextColor,
    SetBrushSize {
        size: BrushSize,
    },
    SetBackground {
        path: PathBuf,
    },

    Save,
    /// Save, then hand the file to the share command.
    Share,
    /// Sent back by the export worker.
    ExportFinished(ExportOutcome),
}

impl From<&CommandVerb> for Cmd {
    fn from(verb: &CommandVerb) -> Self {
        match verb {
            CommandVerb::Undo => Cmd::Undo,
            CommandVerb::Save => Cmd::Save,
            CommandVerb::Share => Cmd::Share,
            CommandVerb::NextColor => Cmd::NextColor,
            CommandVerb::WidthSmall => Cmd::SetBrushSize {
                size: BrushSize::Small,
            },
            CommandVerb::WidthMedium => Cmd::SetBrushSize {
                size: BrushSize::Medium,
            },
            CommandVerb::WidthLarge => Cmd::SetBrushSize {
                size: BrushSize::Large,
            },
            CommandVerb::Color(name) => Cmd::SetColor { name: name.clone() },
        }
    }
}
