use thiserror::Error;

/// Faults raised inside a single connector. The registry turns these into
/// per-platform error entries; they never reach sibling connectors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not decode upstream payload: {0}")]
    Decode(String),
    #[error("record sink rejected batch: {0}")]
    Sink(String),
    #[error("connector misconfigured: {0}")]
    Configuration(String),
    #[error("connector task aborted: {0}")]
    Aborted(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("platform `{0}` is not registered")]
    PlatformNotFound(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "The requested CRM platform is not connected.",
            Self::ServiceUnavailable { .. } => {
                "The CRM platform is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::PlatformNotFound(name) => Self::NotFound {
                message: format!("platform `{name}` not found"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Connector(
                ConnectorError::Configuration(message) | ConnectorError::Aborted(message),
            ) => Self::Internal { message, correlation_id: "unassigned".to_owned() },
            ApplicationError::Connector(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, ConnectorError, InterfaceError};

    #[test]
    fn unknown_platform_maps_to_not_found() {
        let interface =
            ApplicationError::PlatformNotFound("pipedrive".to_owned()).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::NotFound { ref correlation_id, ref message }
                if correlation_id == "req-1" && message.contains("pipedrive")
        ));
        assert_eq!(interface.user_message(), "The requested CRM platform is not connected.");
    }

    #[test]
    fn transport_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::from(ConnectorError::Transport(
            "connection reset".to_owned(),
        ))
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn misconfigured_connector_maps_to_internal() {
        let interface = ApplicationError::from(ConnectorError::Configuration(
            "http client could not be built".to_owned(),
        ))
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
