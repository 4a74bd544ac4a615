use thiserror::Error;

/// Main error type for the token wallet SDK
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("SDK not configured: {0}")]
    NotConfigured(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Errors raised by the RPC transport, passed through to callers unmodified
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC request rejected: code={code}, message={message}")]
    Rejected { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Rate limit exceeded, retry after {seconds} seconds")]
    RateLimit { seconds: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("either provider or provider endpoint must be provided")]
    MissingEndpoint,

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("token contract address not provided")]
    MissingContractAddress,

    #[error("invalid token contract address: {0}")]
    InvalidContractAddress(String),

    #[error("token contract abi not provided")]
    MissingAbi,

    #[error("invalid token contract abi: {0}")]
    InvalidAbi(String),

    #[error("cannot load private key: {0}")]
    InvalidPrivateKey(String),

    #[error("cannot connect to provider endpoint: {0}")]
    Connection(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),
}

/// Input validation errors, raised before any network access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("either from or to must be provided")]
    MissingFilterBounds,

    #[error("Invalid transaction hash: {0}")]
    InvalidTransactionHash(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SdkError>;

/// Structured classification of a transport failure.
///
/// The submitter makes its retry decision on this kind instead of on raw error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The node rejected the transaction because its nonce is already taken
    NonceCollision,
    /// The node rejected the request for any other reason
    Rejected,
    /// The node could not be reached or did not answer in time
    Connectivity,
    /// The node answered with something we could not interpret
    Malformed,
}

/// What a JSON-RPC rejection message says about the submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NonceCollision,
    Other,
}

// Geth reports a pending nonce already taken by an equally priced transaction as
// "replacement transaction underpriced"
const NONCE_COLLISION_MARKERS: &[&str] = &[
    "nonce too low",
    "another transaction with same nonce",
    "replacement transaction underpriced",
];

/// Classify a node rejection message.
///
/// This is the only place where transport error text is inspected.
pub fn classify_rejection(message: &str) -> RejectionKind {
    let message = message.to_lowercase();
    if NONCE_COLLISION_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        RejectionKind::NonceCollision
    } else {
        RejectionKind::Other
    }
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Rejected { message, .. } => match classify_rejection(message) {
                RejectionKind::NonceCollision => TransportErrorKind::NonceCollision,
                RejectionKind::Other => TransportErrorKind::Rejected,
            },
            TransportError::Http(e) if e.is_decode() => TransportErrorKind::Malformed,
            TransportError::Http(_) => TransportErrorKind::Connectivity,
            TransportError::Timeout { .. } => TransportErrorKind::Connectivity,
            TransportError::RateLimit { .. } => TransportErrorKind::Connectivity,
            TransportError::Connection(_) => TransportErrorKind::Connectivity,
            TransportError::Json(_) => TransportErrorKind::Malformed,
            TransportError::InvalidResponse(_) => TransportErrorKind::Malformed,
        }
    }

    pub fn is_nonce_collision(&self) -> bool {
        self.kind() == TransportErrorKind::NonceCollision
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Construction-time problems; the SDK instance cannot be used
    Critical,
    /// The node is unreachable or rejected a request
    High,
    /// Transient problems that may resolve on their own
    Medium,
    /// Caller mistakes caught before any network access
    Low,
}

impl SdkError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SdkError::Config(_) => ErrorSeverity::Critical,
            SdkError::Signing(_) => ErrorSeverity::Critical,

            SdkError::Transport(e) => match e.kind() {
                TransportErrorKind::Connectivity => ErrorSeverity::High,
                TransportErrorKind::Rejected => ErrorSeverity::High,
                TransportErrorKind::NonceCollision => ErrorSeverity::Medium,
                TransportErrorKind::Malformed => ErrorSeverity::Medium,
            },

            SdkError::NotConfigured(_) => ErrorSeverity::Low,
            SdkError::Validation(_) => ErrorSeverity::Low,
        }
    }

    /// Check if retrying the same operation could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            SdkError::Transport(e) => matches!(
                e.kind(),
                TransportErrorKind::NonceCollision | TransportErrorKind::Connectivity
            ),
            SdkError::Config(_)
            | SdkError::NotConfigured(_)
            | SdkError::Validation(_)
            | SdkError::Signing(_) => false,
        }
    }

    /// True when the underlying transport error is a nonce collision
    pub fn is_nonce_collision(&self) -> bool {
        matches!(self, SdkError::Transport(e) if e.is_nonce_collision())
    }
}
