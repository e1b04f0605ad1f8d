//! A bunch of wrap errors.
use chordkv_rpc::error::to_jsonrpc_error;
use chordkv_rpc::jsonrpc::RpcError;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors enum mapping global custom errors.
/// The error type can be expressed in decimal, where the high decs represent
/// the error category and the low decs represent the error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[repr(u32)]
pub enum Error {
    #[error("Connect remote rpc server failed: {0}.")]
    RemoteRpcError(String) = 100,
    #[error("Unknown rpc error.")]
    UnknownRpcError = 101,
    #[error("Internal rpc services error: {0}.")]
    InternalRpcError(#[from] jsonrpc_core::Error) = 102,
    #[error("Decode error: {0}.")]
    DecodeError(String) = 300,
    #[error("Encode error: {0}.")]
    EncodeError(String) = 301,
    #[error("Invalid did: {0}")]
    InvalidDid(String) = 500,
    #[error("Invalid method.")]
    InvalidMethod = 501,
    #[error("Invalid params: {0}")]
    InvalidParams(String) = 502,
    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String) = 804,
    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String) = 809,
    #[error("Http server error: {0}")]
    HttpServerError(String) = 810,
    #[error("Create File Error: {0}")]
    CreateFileError(String) = 900,
    #[error("Open File Error: {0}")]
    OpenFileError(String) = 901,
    #[error("Acquire lock failed")]
    Lock = 902,
    #[error("Cannot find home directory")]
    HomeDirError = 903,
    #[error("Cannot find parent directory")]
    ParentDirError = 904,
    #[error("Serde json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error) = 1000,
    #[error("Serde yaml error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error) = 1001,
    #[error("Core error: {0}")]
    CoreError(#[from] chordkv_core::error::Error) = 1102,
}

impl Error {
    fn discriminant(&self) -> u32 {
        // SAFETY: Because `Self` is marked `repr(u32)`, its layout is a `repr(C)` `union`
        // between `repr(C)` structs, each of which has the `u32` discriminant as its first
        // field, so we can read the discriminant without offsetting the pointer.
        // ref: https://doc.rust-lang.org/std/mem/fn.discriminant.html
        unsafe { *<*const _>::from(self).cast::<u32>() }
    }

    pub fn code(&self) -> u32 {
        self.discriminant()
    }
}

impl From<Error> for jsonrpc_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::CoreError(e) => to_jsonrpc_error(&e),
            Error::InternalRpcError(e) => e,
            Error::InvalidMethod => jsonrpc_core::Error::method_not_found(),
            Error::InvalidParams(msg) => jsonrpc_core::Error::invalid_params(msg),
            e => Self {
                code: jsonrpc_core::ErrorCode::ServerError(e.code().into()),
                message: e.to_string(),
                data: None,
            },
        }
    }
}

impl From<chordkv_rpc::error::Error> for Error {
    fn from(e: chordkv_rpc::error::Error) -> Self {
        match e {
            chordkv_rpc::error::Error::InvalidMethod => Error::InvalidMethod,
            chordkv_rpc::error::Error::InvalidParams(msg) => Error::InvalidParams(msg),
            chordkv_rpc::error::Error::EncodeError(e) => Error::EncodeError(e.to_string()),
            chordkv_rpc::error::Error::DecodeError(e) => Error::DecodeError(e.to_string()),
            chordkv_rpc::error::Error::RpcError(e) => e.into(),
            _ => Error::UnknownRpcError,
        }
    }
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::JsonClientError(e) => {
                Error::CoreError(chordkv_rpc::error::from_jsonrpc_error(e))
            }
            e => Error::RemoteRpcError(e.to_string()),
        }
    }
}
