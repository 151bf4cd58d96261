use std::{fmt, io, net::SocketAddr, path::{Path, PathBuf}, str::FromStr, time::Duration};

use msgs::framing::Framing;

use crate::session::CollectionWindow;

pub const DEFAULT_PORT: u16 = 65432;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawPolicy {
    WithReplacement,
    #[default]
    WithoutReplacement,
}

impl DrawPolicy {
    pub fn exclude_drawn(self) -> bool {
        self == DrawPolicy::WithoutReplacement
    }
}

impl FromStr for DrawPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "with-replacement" => Ok(DrawPolicy::WithReplacement),
            "without-replacement" => Ok(DrawPolicy::WithoutReplacement),
            other => Err(format!("unknown draw policy {other:?}, expected with-replacement or without-replacement")),
        }
    }
}

impl fmt::Display for DrawPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawPolicy::WithReplacement => write!(f, "with-replacement"),
            DrawPolicy::WithoutReplacement => write!(f, "without-replacement"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("at least one participant is required")]
    NoParticipants,
    #[error("grid size must be at least 1")]
    ZeroGridSize,
    #[error("{names} names given for {participants} participants")]
    TooManyNames { names: usize, participants: usize },
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// Bootstrap parameters. Fixed once the session starts.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub participants: usize,
    pub grid_size: usize,
    pub names: Vec<String>,
    pub listen: SocketAddr,
    pub words: PathBuf,
    pub draw_policy: DrawPolicy,
    pub round_millis: u64,
    pub grace_millis: u64,
    pub poll_millis: u64,
    pub countdown_warning_millis: u64,
    pub linger_millis: u64,
    pub framing: Framing,
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            participants: 2,
            grid_size: 5,
            names: Vec::new(),
            listen: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            words: PathBuf::from("words.txt"),
            draw_policy: DrawPolicy::default(),
            round_millis: 30_000,
            grace_millis: 2_000,
            poll_millis: 100,
            countdown_warning_millis: 10_000,
            linger_millis: 2_000,
            framing: Framing::default(),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<SessionConfig, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.participants == 0 {
            return Err(ConfigError::NoParticipants);
        }
        if self.grid_size == 0 {
            return Err(ConfigError::ZeroGridSize);
        }
        if self.names.len() > self.participants {
            return Err(ConfigError::TooManyNames { names: self.names.len(), participants: self.participants });
        }
        if self.poll_millis == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Names are handed out in connect order; missing ones are numbered.
    pub fn display_name(&self, index: usize) -> String {
        match self.names.get(index) {
            Some(name) => name.clone(),
            None => format!("Player {}", index + 1),
        }
    }

    /// Words one grid needs; a smaller pool cannot host a game.
    pub fn required_words(&self) -> usize {
        self.grid_size * self.grid_size
    }

    pub fn window(&self) -> CollectionWindow {
        CollectionWindow {
            round: Duration::from_millis(self.round_millis),
            grace: Duration::from_millis(self.grace_millis),
            poll: Duration::from_millis(self.poll_millis),
            // legacy participants send SCORED and WIN as separate writes
            // after the answer
            settle: match self.framing {
                Framing::Legacy => Duration::from_millis(self.grace_millis),
                Framing::LengthPrefixed => Duration::ZERO,
            },
        }
    }

    pub fn countdown_warning(&self) -> Duration {
        Duration::from_millis(self.countdown_warning_millis)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_millis)
    }
}
