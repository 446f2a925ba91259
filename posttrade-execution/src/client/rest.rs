use crate::{
    client::SettlementClient, error::ClientError, settlement::SettlementInstruction,
};
use async_trait::async_trait;
use posttrade_integration::{
    error::TransportError,
    protocol::http::rest::{RestClient, RestRequest},
    retry::RetryPolicy,
};
use std::{borrow::Cow, time::Duration};
use tracing::{debug, warn};

/// Default bound on how long a single instruction is retried before it dead-letters.
pub const DEFAULT_SEND_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// `POST /v1/settlements` request carrying one [`SettlementInstruction`].
#[derive(Debug)]
pub struct PostSettlement<'a>(pub &'a SettlementInstruction);

impl RestRequest for PostSettlement<'_> {
    type Response = serde_json::Value;
    type Body = SettlementInstruction;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/v1/settlements")
    }

    fn method() -> reqwest::Method {
        reqwest::Method::POST
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(self.0)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![("Idempotency-Key", self.0.settle_id.to_string())]
    }
}

/// [`SettlementClient`] speaking the gateway REST contract.
///
/// Success is any 2xx (the gateway acks with 202). Network errors, 5xx, 408 and 429 retry with
/// exponential backoff until the send TTL elapses; any other 4xx is terminal.
#[derive(Debug)]
pub struct RestSettlementClient {
    client: RestClient<'static>,
    policy: RetryPolicy,
    send_ttl: Duration,
}

impl RestSettlementClient {
    pub fn new(
        base_url: impl Into<String>,
        policy: RetryPolicy,
        send_ttl: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into();

        // Fail fast on a malformed gateway Url rather than on the first settlement
        url::Url::parse(&base_url)?;

        Ok(Self {
            client: RestClient::new(base_url),
            policy,
            send_ttl,
        })
    }
}

#[async_trait]
impl SettlementClient for RestSettlementClient {
    async fn send(&self, instruction: &SettlementInstruction) -> Result<(), ClientError> {
        let request = PostSettlement(instruction);
        let deadline = tokio::time::Instant::now() + self.send_ttl;
        let mut attempt: u32 = 0;

        loop {
            match self.client.execute(&request).await {
                Ok((status, _)) if status.is_success() => {
                    debug!(
                        settle_id = %instruction.settle_id,
                        %status,
                        attempt,
                        "settlement instruction accepted"
                    );
                    return Ok(());
                }
                Ok((status, _)) if is_retryable_status(status) => {
                    warn!(
                        settle_id = %instruction.settle_id,
                        %status,
                        attempt,
                        "retryable gateway response"
                    );
                }
                Ok((status, payload)) => {
                    return Err(ClientError::Terminal {
                        status: status.as_u16(),
                        body: String::from_utf8_lossy(&payload).into_owned(),
                    });
                }
                Err(TransportError::Http(error)) => {
                    warn!(
                        settle_id = %instruction.settle_id,
                        %error,
                        attempt,
                        "transient gateway transport failure"
                    );
                }
                Err(error) => return Err(ClientError::Build(error.to_string())),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ClientError::TtlExceeded {
                    attempts: attempt + 1,
                });
            }

            tokio::time::sleep(self.policy.delay(attempt)).await;
            attempt += 1;
        }
    }
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            reqwest::StatusCode::REQUEST_TIMEOUT | reqwest::StatusCode::TOO_MANY_REQUESTS
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{AllocId, SettleId};
    use posttrade_instrument::{account::AccountId, calendar::BusinessDate, instrument::name::Isin};
    use crate::settlement::SettleMethod;
    use rust_decimal_macros::dec;

    fn instruction() -> SettlementInstruction {
        SettlementInstruction::new(
            SettleId::new("stl-1"),
            AllocId::new("alc-1"),
            AccountId::new("acct-1"),
            Isin::new("US0378331005"),
            BusinessDate::from_yyyymmdd(20240117).unwrap(),
            SettleMethod::Dvp,
            dec!(1000.00),
        )
    }

    #[test]
    fn test_post_settlement_request_shape() {
        let instruction = instruction();
        let request = PostSettlement(&instruction);

        assert_eq!(request.path(), "/v1/settlements");
        assert_eq!(PostSettlement::method(), reqwest::Method::POST);
        assert_eq!(
            request.headers(),
            vec![("Idempotency-Key", "stl-1".to_string())]
        );
        assert_eq!(request.body(), Some(&instruction));
    }

    #[test]
    fn test_retryable_status_classification() {
        use reqwest::StatusCode;

        for retryable in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            assert!(is_retryable_status(retryable), "{retryable}");
        }

        for terminal in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNPROCESSABLE_ENTITY,
            StatusCode::CONFLICT,
        ] {
            assert!(!is_retryable_status(terminal), "{terminal}");
        }
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        assert!(
            RestSettlementClient::new("not a url", RetryPolicy::default(), DEFAULT_SEND_TTL)
                .is_err()
        );
    }
}
