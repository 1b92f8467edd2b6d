//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use lessonhub_domain::ApiError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ApiError);

impl From<InfraError> for ApiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoApiError {
    fn into_api_error(self) -> ApiError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for HttpError {
    fn into_api_error(self) -> ApiError {
        if self.is_timeout() {
            return ApiError::new(lessonhub_domain::ErrorKind::Timeout, "HTTP request timed out");
        }

        if self.is_builder() {
            return ApiError::invalid_request(format!("Invalid HTTP request: {self}"));
        }

        if self.is_decode() || self.is_body() {
            return ApiError::parse(format!("Failed to read response body: {self}"));
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return ApiError::network_unreachable(format!("HTTP connection failure: {self}"));
        }

        ApiError::network_unreachable(format!("HTTP transport failure: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_api_error())
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for KeyringError {
    fn into_api_error(self) -> ApiError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => ApiError::storage("keychain entry not found"),
            BadEncoding(_) => ApiError::storage("credential in keychain is not valid UTF-8"),
            TooLong(name, limit) => ApiError::storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => {
                ApiError::storage(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            PlatformFailure(err) => ApiError::storage(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                ApiError::storage(format!("unable to access secure storage: {err}"))
            }
            _ => ApiError::storage(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_api_error())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for std::io::Error {
    fn into_api_error(self) -> ApiError {
        ApiError::storage(format!("I/O failure ({:?}): {self}", self.kind()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_api_error())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for url::ParseError {
    fn into_api_error(self) -> ApiError {
        ApiError::invalid_request(format!("Invalid URL: {self}"))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(value.into_api_error())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use lessonhub_domain::ErrorKind;
    use reqwest::Client;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn keyring_no_entry_maps_to_storage() {
        let mapped: ApiError = InfraError::from(KeyringError::NoEntry).into();
        assert_eq!(mapped.kind, ErrorKind::Storage);
        assert!(mapped.message.contains("keychain"));
    }

    #[test]
    fn io_error_maps_to_storage() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let mapped: ApiError = InfraError::from(err).into();
        assert_eq!(mapped.kind, ErrorKind::Storage);
        assert!(mapped.message.contains("PermissionDenied"));
    }

    #[test]
    fn url_error_maps_to_invalid_request() {
        let err = url::Url::parse("not a url").unwrap_err();
        let mapped: ApiError = InfraError::from(err).into();
        assert_eq!(mapped.kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: ApiError = InfraError::from(error).into();
        assert_eq!(mapped.kind, ErrorKind::NetworkUnreachable);
        assert_eq!(mapped.status, None);
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().timeout(Duration::from_millis(50)).build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap_err();

        let mapped: ApiError = InfraError::from(error).into();
        assert_eq!(mapped.kind, ErrorKind::Timeout);
    }
}
