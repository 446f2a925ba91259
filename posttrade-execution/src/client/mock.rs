use crate::{
    client::SettlementClient, error::ClientError, settlement::SettlementInstruction,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// In-memory [`SettlementClient`] that records accepted instructions.
///
/// Failures can be scripted ahead of time; each scripted failure is consumed by one `send`
/// call, after which sends succeed again (mirroring a gateway that recovers).
#[derive(Debug, Clone, Default)]
pub struct MockSettlementClient {
    sent: Arc<Mutex<Vec<SettlementInstruction>>>,
    scripted_failures: Arc<Mutex<VecDeque<ClientError>>>,
}

impl MockSettlementClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure to be returned by the next `send` call.
    pub fn script_failure(&self, error: ClientError) {
        self.scripted_failures.lock().push_back(error);
    }

    /// Instructions accepted so far, in send order.
    pub fn sent(&self) -> Vec<SettlementInstruction> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl SettlementClient for MockSettlementClient {
    async fn send(&self, instruction: &SettlementInstruction) -> Result<(), ClientError> {
        if let Some(error) = self.scripted_failures.lock().pop_front() {
            return Err(error);
        }

        self.sent.lock().push(instruction.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{AllocId, SettleId};
    use crate::settlement::SettleMethod;
    use posttrade_instrument::{account::AccountId, calendar::BusinessDate, instrument::name::Isin};
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
    fn test_mock_records_sends_and_scripted_failures() {
        tokio_test::block_on(async {
            let client = MockSettlementClient::new();
            client.script_failure(ClientError::Terminal {
                status: 422,
                body: "unknown isin".to_string(),
            });

            let instruction = instruction();

            assert!(client.send(&instruction).await.is_err());
            assert_eq!(client.sent_count(), 0);

            client.send(&instruction).await.unwrap();
            assert_eq!(client.sent(), vec![instruction]);
        });
    }
}
