//! The closed error enumeration from spec §7, realized for the reader/writer
//! boundary. Distinct from `CircuitModelError`: this crate's errors are about
//! the shape of the file on disk, not the model's own invariants.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KicadIoError {
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: sexpr_codec::ParseError,
    },

    #[error("malformed schematic at {path}: {description}")]
    Malformed { path: String, description: String },

    #[error(transparent)]
    Model(#[from] circuit_model::CircuitModelError),

    #[error("sheet file missing: uuid {uuid} expected at {filename}")]
    OrphanedSheet { uuid: String, filename: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, KicadIoError>;

impl KicadIoError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            description: description.into(),
        }
    }
}
