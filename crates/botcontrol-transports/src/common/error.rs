//! Common error types for all socket owners

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create the context or socket
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Failed to bind a server socket
    #[error("Bind to {address} failed: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: zmq::Error,
    },

    /// Failed to connect a client socket
    #[error("Connect to {address} failed: {source}")]
    ConnectFailed {
        address: String,
        #[source]
        source: zmq::Error,
    },

    /// The transport context was closed; the expected shutdown signal
    #[error("Transport context terminated")]
    ContextTerminated,

    /// Termination reached a loop through its interrupt channel rather than a socket call
    #[error("Loop interrupted")]
    Interrupted,

    #[error("Transport is not running")]
    NotRunning,

    #[error("Transport is already running")]
    AlreadyRunning,

    /// `start()` after `terminate()`
    #[error("Transport has been terminated")]
    AlreadyTerminated,

    #[error("Queue full: capacity {capacity}")]
    QueueFull { capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("ZMQ error: {0}")]
    Zmq(zmq::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True for the signals that mean "shut down quietly"
    pub fn is_termination(&self) -> bool {
        matches!(self, Self::ContextTerminated | Self::Interrupted)
    }

    /// True when the socket can no longer be used and its loop must exit
    ///
    /// `EFSM` means a strict request/reply socket lost its send/receive
    /// alternation; nothing but a new socket recovers from that.
    pub fn is_socket_fatal(&self) -> bool {
        match self {
            Self::Zmq(e) => matches!(e, zmq::Error::ENOTSOCK | zmq::Error::EFSM | zmq::Error::EFAULT),
            _ => false,
        }
    }
}

impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        match err {
            zmq::Error::ETERM => Self::ContextTerminated,
            _ => Self::Zmq(err),
        }
    }
}

impl From<botcontrol_config::ConfigError> for TransportError {
    fn from(err: botcontrol_config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
