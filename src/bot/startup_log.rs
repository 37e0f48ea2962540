//! Append-only startup log.
//!
//! One human-readable line per startup, no schema, no rotation.

use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeZone};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub struct StartupLog {
    path: PathBuf,
}

impl StartupLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line for a startup at `at`, creating the file if needed.
    pub async fn record_start<Tz>(&self, at: &DateTime<Tz>) -> io::Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let entry = format!("{}\n", line(at));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        // tokio's File completes writes in the background; flush before drop.
        file.flush().await
    }
}

/// `Bot has started - DD/MM/YYYY HH:MM:SS`
pub fn line<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("Bot has started - {}", at.format(TIMESTAMP_FORMAT))
}
