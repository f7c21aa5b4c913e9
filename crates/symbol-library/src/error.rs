use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbolLibraryError {
    #[error("library not found for lib_id '{lib_id}' (searched: {searched_paths:?})")]
    LibraryNotFound {
        lib_id: String,
        searched_paths: Vec<String>,
    },

    #[error("symbol '{symbol}' not defined in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    #[error("malformed lib_id '{0}', expected 'library:symbol'")]
    MalformedLibId(String),

    #[error("failed to read library file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse library file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: sexpr_codec::ParseError,
    },

    #[error("malformed symbol definition '{symbol}' in {path}: {reason}")]
    MalformedSymbol {
        path: String,
        symbol: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SymbolLibraryError>;
