use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ToolConfigError;

/// External utilities the validator knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalTool {
    Jpylyzer,
    Jhove,
    ImageMagick,
    Kakadu,
    Mp3val,
    Shntool,
    Checkmate,
}

impl ExternalTool {
    pub const ALL: [ExternalTool; 7] = [
        ExternalTool::Jpylyzer,
        ExternalTool::Jhove,
        ExternalTool::ImageMagick,
        ExternalTool::Kakadu,
        ExternalTool::Mp3val,
        ExternalTool::Shntool,
        ExternalTool::Checkmate,
    ];

    /// Key used in configuration files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            ExternalTool::Jpylyzer => "jpylyzer",
            ExternalTool::Jhove => "jhove",
            ExternalTool::ImageMagick => "image_magick",
            ExternalTool::Kakadu => "kakadu",
            ExternalTool::Mp3val => "mp3val",
            ExternalTool::Shntool => "shntool",
            ExternalTool::Checkmate => "checkmate",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExternalTool::Jpylyzer => "jpylyzer",
            ExternalTool::Jhove => "JHOVE",
            ExternalTool::ImageMagick => "ImageMagick",
            ExternalTool::Kakadu => "Kakadu",
            ExternalTool::Mp3val => "MP3val",
            ExternalTool::Shntool => "shntool",
            ExternalTool::Checkmate => "Checkmate",
        }
    }
}

impl fmt::Display for ExternalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ExternalTool {
    type Err = ToolConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        ExternalTool::ALL
            .into_iter()
            .find(|tool| tool.key() == normalized)
            .ok_or_else(|| ToolConfigError::UnknownTool {
                name: s.to_string(),
            })
    }
}
