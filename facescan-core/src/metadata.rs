//! Capture metadata encoded in dataset file names.
//!
//! Names look like `S42_in_c_1m_live_001.jpg`: subject, in/out flag, device code, distance,
//! then free tokens that may carry the liveness category. A leading `Subject_42` pair is also
//! accepted as the subject token.

use std::{fmt, path::Path};

use thiserror::Error;

/// Minimum number of positional tokens (subject, in/out, device, distance).
pub const MIN_TOKENS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error(
        "file name '{name}' has {found} underscore-delimited token(s), expected at least {min}",
        min = MIN_TOKENS
    )]
    TooFewTokens { name: String, found: usize },
    #[error("file name is not valid UTF-8: {0}")]
    NotUtf8(String),
}

/// Capture environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Indoor,
    Outdoor,
}

/// Capture device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Camera,
    Mobile,
}

/// Liveness category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    Props,
    Spoof,
    Live,
    #[default]
    Unknown,
}

impl Environment {
    pub fn as_label(self) -> &'static str {
        match self {
            Environment::Indoor => "Indoor",
            Environment::Outdoor => "Outdoor",
        }
    }
}

impl Device {
    pub fn as_label(self) -> &'static str {
        match self {
            Device::Camera => "Camera",
            Device::Mobile => "Mobile",
        }
    }
}

impl Category {
    pub fn as_label(self) -> &'static str {
        match self {
            Category::Props => "Props",
            Category::Spoof => "Spoof",
            Category::Live => "Live",
            Category::Unknown => "Unknown",
        }
    }

    /// Scan free tokens in order.
    ///
    /// `propcat` and `spoof` end the scan immediately; `live` is remembered but scanning
    /// continues, so a later `spoof` or `propcat` token still wins.
    pub fn from_tokens<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut category = Category::Unknown;
        for token in tokens {
            let token = token.to_ascii_lowercase();
            if token.contains("propcat") {
                return Category::Props;
            } else if token.contains("spoof") {
                return Category::Spoof;
            } else if token.contains("live") {
                category = Category::Live;
            }
        }
        category
    }
}

macro_rules! impl_label_display {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_label())
            }
        })*
    };
}

impl_label_display!(Environment, Device, Category);

/// Metadata derived from a single capture file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Digits of the subject token (may be empty when the token has none).
    pub subject_number: String,
    pub environment: Environment,
    pub device: Device,
    /// Distance token, verbatim.
    pub distance: String,
    pub category: Category,
}

/// Parse metadata from a file name (with or without extension).
pub fn parse_filename(file_name: &str) -> Result<ImageMetadata, MetadataError> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let mut tokens: Vec<&str> = stem.split('_').collect();

    // `Subject_42_...`: the subject id itself contains an underscore.
    let subject_token = if tokens.len() > MIN_TOKENS
        && !tokens[0].chars().any(|c| c.is_ascii_digit())
        && !tokens[1].is_empty()
        && tokens[1].chars().all(|c| c.is_ascii_digit())
    {
        tokens.remove(1).to_string()
    } else {
        tokens.first().map(|t| t.to_string()).unwrap_or_default()
    };

    if tokens.len() < MIN_TOKENS {
        return Err(MetadataError::TooFewTokens {
            name: file_name.to_string(),
            found: tokens.len(),
        });
    }

    let subject_number: String = subject_token
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let environment = if tokens[1].eq_ignore_ascii_case("in") {
        Environment::Indoor
    } else {
        Environment::Outdoor
    };
    let device = if tokens[2].eq_ignore_ascii_case("c") {
        Device::Camera
    } else {
        Device::Mobile
    };
    let distance = tokens[3].to_string();
    let category = Category::from_tokens(tokens[MIN_TOKENS..].iter().copied());

    Ok(ImageMetadata {
        subject_number,
        environment,
        device,
        distance,
        category,
    })
}

/// Parse metadata from the file name component of `path`.
pub fn parse_path(path: &Path) -> Result<ImageMetadata, MetadataError> {
    let name = path.file_name().unwrap_or_default();
    let name = name
        .to_str()
        .ok_or_else(|| MetadataError::NotUtf8(name.to_string_lossy().into_owned()))?;
    parse_filename(name)
}
