//! Client for the billing platform's callable functions.
//!
//! Callable protocol: `POST {functions_url}/{name}` with `{"data": ...}`,
//! answered by `{"result": ...}` or `{"error": {"status", "message"}}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storeloom_core::AccountId;
use tracing::instrument;
use url::Url;

use super::{BillingError, BillingFunctions, CheckoutRequest, ProductCheckoutRequest, ReturnRequest};

const CHECKOUT_FUNCTION: &str = "createCheckoutSession";
const CONNECT_FUNCTION: &str = "createConnectAccountLink";
const PORTAL_FUNCTION: &str = "createPortalSession";
const PRODUCT_CHECKOUT_FUNCTION: &str = "createProductCheckout";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Billing functions over HTTP.
#[derive(Debug, Clone)]
pub struct BillingClient {
    client: reqwest::Client,
    functions_url: Url,
}

#[derive(Debug, Serialize)]
struct CallableRequest<'a, T> {
    data: AccountScoped<'a, T>,
}

#[derive(Debug, Serialize)]
struct AccountScoped<'a, T> {
    account_id: &'a AccountId,
    #[serde(flatten)]
    payload: &'a T,
}

#[derive(Debug, Deserialize)]
struct CallableResponse {
    result: Option<UrlResult>,
    error: Option<CallableError>,
}

#[derive(Debug, Deserialize)]
struct UrlResult {
    url: Url,
}

#[derive(Debug, Deserialize)]
struct CallableError {
    #[serde(default)]
    status: String,
    message: String,
}

impl BillingClient {
    /// Create a client for functions hosted under `functions_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Config`] if the HTTP client cannot be built.
    pub fn new(functions_url: Url) -> Result<Self, BillingError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BillingError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            functions_url,
        })
    }

    async fn call<T: Serialize + Sync>(
        &self,
        function: &'static str,
        account: &AccountId,
        payload: &T,
    ) -> Result<Url, BillingError> {
        let url = self
            .functions_url
            .join(function)
            .map_err(|e| BillingError::Config(format!("invalid function url: {e}")))?;

        let body = CallableRequest {
            data: AccountScoped {
                account_id: account,
                payload,
            },
        };

        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed = parse_callable_response(function, &text);
        if !status.is_success() && parsed.is_ok() {
            return Err(BillingError::Function {
                function,
                message: format!("unexpected status {status}"),
            });
        }
        parsed
    }
}

/// Interpret a callable function response body.
fn parse_callable_response(function: &'static str, body: &str) -> Result<Url, BillingError> {
    let response: CallableResponse = serde_json::from_str(body)
        .map_err(|e| BillingError::Parse(format!("{function} returned invalid JSON: {e}")))?;

    match (response.result, response.error) {
        (_, Some(error)) => Err(BillingError::Function {
            function,
            message: if error.status.is_empty() {
                error.message
            } else {
                format!("{}: {}", error.status, error.message)
            },
        }),
        (Some(result), None) => Ok(result.url),
        (None, None) => Err(BillingError::Parse(format!("{function} returned no result"))),
    }
}

#[async_trait]
impl BillingFunctions for BillingClient {
    #[instrument(skip_all, fields(account = %account))]
    async fn create_checkout_session(
        &self,
        account: &AccountId,
        request: &CheckoutRequest,
    ) -> Result<Url, BillingError> {
        self.call(CHECKOUT_FUNCTION, account, request).await
    }

    #[instrument(skip_all, fields(account = %account))]
    async fn create_connect_link(
        &self,
        account: &AccountId,
        request: &ReturnRequest,
    ) -> Result<Url, BillingError> {
        self.call(CONNECT_FUNCTION, account, request).await
    }

    #[instrument(skip_all, fields(account = %account))]
    async fn create_portal_session(
        &self,
        account: &AccountId,
        request: &ReturnRequest,
    ) -> Result<Url, BillingError> {
        self.call(PORTAL_FUNCTION, account, request).await
    }

    #[instrument(skip_all, fields(account = %account, store = %request.store_id))]
    async fn create_product_checkout(
        &self,
        account: &AccountId,
        request: &ProductCheckoutRequest,
    ) -> Result<Url, BillingError> {
        self.call(PRODUCT_CHECKOUT_FUNCTION, account, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_url() {
        let url = parse_callable_response(
            CHECKOUT_FUNCTION,
            r#"{"result": {"url": "https://checkout.example.com/c/pay_123"}}"#,
        )
        .expect("url");
        assert_eq!(url.as_str(), "https://checkout.example.com/c/pay_123");
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_callable_response(
            PORTAL_FUNCTION,
            r#"{"error": {"status": "FAILED_PRECONDITION", "message": "no customer"}}"#,
        )
        .expect_err("error");
        assert_eq!(
            err.to_string(),
            "billing function createPortalSession failed: FAILED_PRECONDITION: no customer"
        );
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(matches!(
            parse_callable_response(CONNECT_FUNCTION, "{}"),
            Err(BillingError::Parse(_))
        ));
    }

    #[test]
    fn test_request_payload_is_account_scoped() {
        let request = ReturnRequest {
            return_url: Url::parse("https://storeloom.example.com/settings").expect("url"),
        };
        let account = AccountId::new("acct-1");
        let body = CallableRequest {
            data: AccountScoped {
                account_id: &account,
                payload: &request,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            serde_json::json!({
                "data": {
                    "account_id": "acct-1",
                    "return_url": "https://storeloom.example.com/settings"
                }
            })
        );
    }
}
