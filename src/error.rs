use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("invalid date `{0}`")]
    InvalidDate(String),
    #[error("death date {death} is before birth date {birth}")]
    DeathBeforeBirth { birth: String, death: String },
    #[error("person `{0}` does not exist")]
    UnknownPerson(String),
    #[error("a person has at most two parents, got {0}")]
    TooManyParents(usize),
    #[error("parent `{0}` is listed twice")]
    DuplicateParent(String),
    #[error("linking `{child}` under `{parent}` would make `{child}` their own ancestor")]
    WouldCreateCycle { parent: String, child: String },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u64),
    #[error("snapshot is not a recognised tree document: {0}")]
    Corrupt(String),
    #[error("remote store worker has shut down")]
    Disconnected,
}

impl PersistError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Sqlite(_) => "sqlite_error",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::Corrupt(_) => "corrupt_snapshot",
            Self::Disconnected => "remote_disconnected",
        }
    }
}

impl ValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::InvalidDate(_) => "invalid_date",
            Self::DeathBeforeBirth { .. } => "death_before_birth",
            Self::UnknownPerson(_) => "unknown_person",
            Self::TooManyParents(_) => "too_many_parents",
            Self::DuplicateParent(_) => "duplicate_parent",
            Self::WouldCreateCycle { .. } => "would_create_cycle",
        }
    }
}
